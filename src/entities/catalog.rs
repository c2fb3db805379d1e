//! Catalog of billable services and stocked parts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::{active_label, default_active, Entity};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::schema::rules::{self, ValidationErrors};

/// A labor item offered by the shop (e.g. "Troca de óleo")
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceItem {
    pub id: EntityId,

    /// Optional internal code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Suggested price
    pub price: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<u32>,

    #[serde(default = "default_active")]
    pub active: bool,

    pub created: DateTime<Utc>,

    pub author: String,
}

impl ServiceItem {
    pub fn new(name: String, price: f64, author: String) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Svc),
            code: None,
            name,
            description: None,
            price,
            estimated_minutes: None,
            active: true,
            created: Utc::now(),
            author,
        }
    }

    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        rules::require_text(&mut errors, "name", &self.name, "name");
        rules::require_non_negative(&mut errors, "price", self.price, "price");
        errors
    }

    /// Case-insensitive substring match on name or code
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.name.to_lowercase().contains(&term)
            || self
                .code
                .as_deref()
                .is_some_and(|c| c.to_lowercase().contains(&term))
    }
}

impl Entity for ServiceItem {
    const PREFIX: EntityPrefix = EntityPrefix::Svc;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn title(&self) -> String {
        self.name.clone()
    }

    fn status(&self) -> &str {
        active_label(self.active)
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }

    fn author(&self) -> &str {
        &self.author
    }
}

/// A stocked part (peça)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartItem {
    pub id: EntityId,

    /// Part number / SKU
    pub code: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,

    /// Sale price
    pub price: f64,

    /// Purchase cost
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,

    #[serde(default)]
    pub stock: u32,

    /// Reorder threshold
    #[serde(default)]
    pub min_stock: u32,

    #[serde(default = "default_active")]
    pub active: bool,

    pub created: DateTime<Utc>,

    pub author: String,
}

impl PartItem {
    pub fn new(code: String, name: String, price: f64, author: String) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Pec),
            code,
            name,
            brand: None,
            price,
            cost: None,
            stock: 0,
            min_stock: 0,
            active: true,
            created: Utc::now(),
            author,
        }
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }

    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        rules::require_text(&mut errors, "code", &self.code, "part code");
        rules::require_text(&mut errors, "name", &self.name, "name");
        rules::require_non_negative(&mut errors, "price", self.price, "price");
        if let Some(cost) = self.cost {
            rules::require_non_negative(&mut errors, "cost", cost, "cost");
        }
        errors
    }

    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.name.to_lowercase().contains(&term) || self.code.to_lowercase().contains(&term)
    }
}

impl Entity for PartItem {
    const PREFIX: EntityPrefix = EntityPrefix::Pec;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn title(&self) -> String {
        format!("{} {}", self.code, self.name)
    }

    fn status(&self) -> &str {
        active_label(self.active)
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }

    fn author(&self) -> &str {
        &self.author
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_matches_name_and_code() {
        let mut oil = ServiceItem::new("Troca de óleo".to_string(), 80.0, "t".to_string());
        oil.code = Some("S-OLEO".to_string());
        assert!(oil.matches("ÓLEO"));
        assert!(oil.matches("s-ol"));
        assert!(!oil.matches("freio"));

        let pad = PartItem::new("PF-100".to_string(), "Pastilha de freio".to_string(), 45.0, "t".to_string());
        assert!(pad.matches("pf-1"));
        assert!(pad.matches("FREIO"));
    }

    #[test]
    fn test_part_validation() {
        let mut part = PartItem::new(String::new(), "Filtro".to_string(), -1.0, "t".to_string());
        let errors = part.validate();
        assert!(errors.has("code"));
        assert!(errors.has("price"));

        part.code = "F-1".to_string();
        part.price = 0.0;
        assert!(part.validate().is_empty());
    }

    #[test]
    fn test_low_stock() {
        let mut part = PartItem::new("F-1".to_string(), "Filtro".to_string(), 30.0, "t".to_string());
        part.stock = 5;
        part.min_stock = 2;
        assert!(!part.is_low_stock());
        part.stock = 2;
        assert!(part.is_low_stock());
    }
}
