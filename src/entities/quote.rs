//! Quote entity (orçamento) - estimate presented before work begins

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::workflow::Lifecycle;
use crate::entities::line_items::LineItems;
use crate::schema::rules::ValidationErrors;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    /// Waiting for the customer
    #[default]
    Pending,
    Approved,
    Rejected,
    /// A work order was opened from this quote
    #[serde(rename = "converted")]
    ConvertedToOrder,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Pending => "pending",
            QuoteStatus::Approved => "approved",
            QuoteStatus::Rejected => "rejected",
            QuoteStatus::ConvertedToOrder => "converted",
        }
    }
}

impl std::fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for QuoteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" | "pendente" => Ok(QuoteStatus::Pending),
            "approved" | "aprovado" => Ok(QuoteStatus::Approved),
            "rejected" | "rejeitado" => Ok(QuoteStatus::Rejected),
            "converted" | "convertido" => Ok(QuoteStatus::ConvertedToOrder),
            _ => Err(format!(
                "Invalid quote status: {}. Use pending, approved, rejected, or converted",
                s
            )),
        }
    }
}

impl Lifecycle for QuoteStatus {
    const KIND: &'static str = "quote";

    fn allowed_transitions(&self) -> &'static [Self] {
        match self {
            QuoteStatus::Pending => &[QuoteStatus::Approved, QuoteStatus::Rejected],
            QuoteStatus::Approved => &[QuoteStatus::ConvertedToOrder, QuoteStatus::Rejected],
            QuoteStatus::Rejected => &[QuoteStatus::Pending],
            QuoteStatus::ConvertedToOrder => &[],
        }
    }

    fn is_editable(&self) -> bool {
        matches!(self, QuoteStatus::Pending)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub id: EntityId,

    /// Sequential human number (Orçamento #12)
    pub number: u32,

    pub customer: EntityId,

    pub vehicle: EntityId,

    #[serde(flatten)]
    pub items: LineItems,

    #[serde(default)]
    pub status: QuoteStatus,

    /// Last day the customer may approve
    pub valid_until: NaiveDate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,

    /// Attendant, or "portal" when the customer decided online
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,

    /// Work order opened from this quote
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_order: Option<EntityId>,

    pub created: DateTime<Utc>,

    pub author: String,
}

impl Quote {
    pub fn new(
        number: u32,
        customer: EntityId,
        vehicle: EntityId,
        items: LineItems,
        valid_until: NaiveDate,
        author: String,
    ) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Orc),
            number,
            customer,
            vehicle,
            items,
            status: QuoteStatus::Pending,
            valid_until,
            notes: None,
            decided_at: None,
            decided_by: None,
            rejection_reason: None,
            work_order: None,
            created: Utc::now(),
            author,
        }
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        today > self.valid_until
    }

    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if self.customer.prefix() != EntityPrefix::Cli {
            errors.push("customer", "customer is required");
        }
        if self.vehicle.prefix() != EntityPrefix::Vei {
            errors.push("vehicle", "vehicle is required");
        }
        let items = self.items.validate();
        for e in items.errors() {
            errors.push(e.field.clone(), e.message.clone());
        }
        errors
    }
}

impl Entity for Quote {
    const PREFIX: EntityPrefix = EntityPrefix::Orc;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn title(&self) -> String {
        format!("Orçamento #{}", self.number)
    }

    fn status(&self) -> &str {
        self.status.as_str()
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
    use crate::entities::line_items::ServiceInput;

    fn sample() -> Quote {
        let mut items = LineItems::new();
        items
            .add_service(ServiceInput {
                description: "Troca de óleo".to_string(),
                value: 80.0,
                ..Default::default()
            })
            .unwrap();
        Quote::new(
            1,
            EntityId::new(EntityPrefix::Cli),
            EntityId::new(EntityPrefix::Vei),
            items,
            NaiveDate::from_ymd_opt(2026, 3, 15).unwrap(),
            "test".to_string(),
        )
    }

    #[test]
    fn test_expiry_is_inclusive_of_last_day() {
        let quote = sample();
        assert!(!quote.is_expired(NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()));
        assert!(quote.is_expired(NaiveDate::from_ymd_opt(2026, 3, 16).unwrap()));
    }

    #[test]
    fn test_yaml_layout_flattens_items() {
        let quote = sample();
        let yaml = serde_yml::to_string(&quote).unwrap();
        assert!(yaml.contains("services:"));
        assert!(yaml.contains("status: pending"));
        assert!(!yaml.contains("items:"));

        let back: Quote = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(back.items, quote.items);
    }

    #[test]
    fn test_converted_status_serializes_short() {
        let mut quote = sample();
        quote.status = QuoteStatus::ConvertedToOrder;
        let yaml = serde_yml::to_string(&quote).unwrap();
        assert!(yaml.contains("status: converted"));
    }

    #[test]
    fn test_validate_requires_items() {
        let mut quote = sample();
        assert!(quote.validate().is_empty());
        quote.items.remove_line(1);
        assert!(quote.validate().has("items"));
    }
}
