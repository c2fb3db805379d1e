//! Service and part lines shared by quotes, work orders and sales

use serde::{Deserialize, Serialize};

use crate::core::identity::EntityId;
use crate::core::totals::{self, DiscountPolicy, PartAmount, ServiceAmount, Totals};
use crate::schema::rules::{self, ValidationErrors};

/// Message shown when a document has no lines at submission
pub const EMPTY_ITEMS_MESSAGE: &str = "Add at least one service or part";

/// A labor line on a quote or work order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceLine {
    /// Line number within the document
    pub id: u32,

    /// Catalog service this line was taken from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<EntityId>,

    pub description: String,

    pub value: f64,
}

impl ServiceLine {
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        rules::require_text(&mut errors, "description", &self.description, "description");
        rules::require_non_negative(&mut errors, "value", self.value, "value");
        errors
    }
}

impl ServiceAmount for ServiceLine {
    fn value(&self) -> f64 {
        self.value
    }
}

/// A part line: unit price times quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartLine {
    pub id: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<EntityId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    pub name: String,

    pub quantity: u32,

    pub unit_price: f64,
}

impl PartLine {
    pub fn line_total(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }

    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        rules::require_text(&mut errors, "name", &self.name, "part name");
        if self.quantity < 1 {
            errors.push("quantity", "quantity must be at least 1");
        }
        rules::require_non_negative(&mut errors, "unit_price", self.unit_price, "unit price");
        errors
    }
}

impl PartAmount for PartLine {
    fn unit_price(&self) -> f64 {
        self.unit_price
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }
}

/// Unvalidated service line as typed by the user
#[derive(Debug, Clone, Default)]
pub struct ServiceInput {
    pub catalog: Option<EntityId>,
    pub description: String,
    pub value: f64,
}

/// Unvalidated part line; quantity is signed so that zero and negative
/// input reach validation instead of failing to parse
#[derive(Debug, Clone, Default)]
pub struct PartInput {
    pub catalog: Option<EntityId>,
    pub code: Option<String>,
    pub name: String,
    pub quantity: i64,
    pub unit_price: f64,
}

impl PartInput {
    fn validated_quantity(&self, errors: &mut ValidationErrors) -> u32 {
        match u32::try_from(self.quantity) {
            Ok(q) if q >= 1 => q,
            _ => {
                errors.push("quantity", "quantity must be at least 1");
                0
            }
        }
    }
}

/// The editable body of a quote or work order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItems {
    #[serde(default)]
    pub services: Vec<ServiceLine>,

    #[serde(default)]
    pub parts: Vec<PartLine>,

    /// Flat discount in reais
    #[serde(default)]
    pub discount: f64,
}

impl LineItems {
    pub fn new() -> Self {
        Self::default()
    }

    /// Line numbers run across services and parts
    fn next_line_id(&self) -> u32 {
        let max_service = self.services.iter().map(|s| s.id).max().unwrap_or(0);
        let max_part = self.parts.iter().map(|p| p.id).max().unwrap_or(0);
        max_service.max(max_part) + 1
    }

    /// Validate and append a service line, returning its line number
    pub fn add_service(&mut self, input: ServiceInput) -> Result<u32, ValidationErrors> {
        let line = ServiceLine {
            id: self.next_line_id(),
            catalog: input.catalog,
            description: input.description.trim().to_string(),
            value: input.value,
        };
        line.validate().into_result()?;
        let id = line.id;
        self.services.push(line);
        Ok(id)
    }

    /// Validate and append a part line, returning its line number
    pub fn add_part(&mut self, input: PartInput) -> Result<u32, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let quantity = input.validated_quantity(&mut errors);
        let line = PartLine {
            id: self.next_line_id(),
            catalog: input.catalog,
            code: input.code,
            name: input.name.trim().to_string(),
            quantity: quantity.max(1),
            unit_price: input.unit_price,
        };
        for e in line.validate().errors() {
            if !errors.has(&e.field) {
                errors.push(e.field.clone(), e.message.clone());
            }
        }
        errors.into_result()?;

        let id = line.id;
        self.parts.push(line);
        Ok(id)
    }

    /// Change description and/or value of a service line
    pub fn update_service(
        &mut self,
        id: u32,
        description: Option<String>,
        value: Option<f64>,
    ) -> Result<bool, ValidationErrors> {
        let Some(line) = self.services.iter_mut().find(|s| s.id == id) else {
            return Ok(false);
        };
        let mut updated = line.clone();
        if let Some(d) = description {
            updated.description = d;
        }
        if let Some(v) = value {
            updated.value = v;
        }
        updated.validate().into_result()?;
        *line = updated;
        Ok(true)
    }

    /// Change quantity and/or unit price of a part line
    pub fn update_part(
        &mut self,
        id: u32,
        quantity: Option<i64>,
        unit_price: Option<f64>,
    ) -> Result<bool, ValidationErrors> {
        let Some(line) = self.parts.iter_mut().find(|p| p.id == id) else {
            return Ok(false);
        };
        let mut updated = line.clone();
        if let Some(q) = quantity {
            let mut errors = ValidationErrors::new();
            let input = PartInput {
                quantity: q,
                ..Default::default()
            };
            updated.quantity = input.validated_quantity(&mut errors);
            errors.into_result()?;
        }
        if let Some(p) = unit_price {
            updated.unit_price = p;
        }
        updated.validate().into_result()?;
        *line = updated;
        Ok(true)
    }

    pub fn remove_service(&mut self, id: u32) -> bool {
        let before = self.services.len();
        self.services.retain(|s| s.id != id);
        self.services.len() != before
    }

    pub fn remove_part(&mut self, id: u32) -> bool {
        let before = self.parts.len();
        self.parts.retain(|p| p.id != id);
        self.parts.len() != before
    }

    /// Remove a line of either kind by number
    pub fn remove_line(&mut self, id: u32) -> bool {
        self.remove_service(id) || self.remove_part(id)
    }

    pub fn set_discount(&mut self, discount: f64) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        rules::require_non_negative(&mut errors, "discount", discount, "discount");
        errors.into_result()?;
        self.discount = discount;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty() && self.parts.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.services.len() + self.parts.len()
    }

    pub fn totals(&self, policy: DiscountPolicy) -> Totals {
        totals::compute(&self.services, &self.parts, self.discount, policy)
    }

    /// Rules checked before a quote or order may be saved
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for (i, s) in self.services.iter().enumerate() {
            errors.extend_nested(&format!("services[{}]", i), s.validate());
        }
        for (i, p) in self.parts.iter().enumerate() {
            errors.extend_nested(&format!("parts[{}]", i), p.validate());
        }
        rules::require_non_negative(&mut errors, "discount", self.discount, "discount");
        if self.is_empty() {
            errors.push("items", EMPTY_ITEMS_MESSAGE);
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(desc: &str, value: f64) -> ServiceInput {
        ServiceInput {
            description: desc.to_string(),
            value,
            ..Default::default()
        }
    }

    fn part(name: &str, quantity: i64, unit_price: f64) -> PartInput {
        PartInput {
            name: name.to_string(),
            quantity,
            unit_price,
            ..Default::default()
        }
    }

    fn reference_items() -> LineItems {
        let mut items = LineItems::new();
        items.add_service(service("Alinhamento", 150.0)).unwrap();
        items.add_service(service("Balanceamento", 120.0)).unwrap();
        items.add_part(part("Pastilha", 4, 45.0)).unwrap();
        items.add_part(part("Fluido", 1, 35.0)).unwrap();
        items.set_discount(20.0).unwrap();
        items
    }

    #[test]
    fn test_reference_totals() {
        let totals = reference_items().totals(DiscountPolicy::Unclamped);
        assert_eq!(totals.service_subtotal, 270.0);
        assert_eq!(totals.part_subtotal, 215.0);
        assert_eq!(totals.gross_total, 485.0);
        assert_eq!(totals.net_total, 465.0);
    }

    #[test]
    fn test_line_ids_are_sequential_across_kinds() {
        let items = reference_items();
        let ids: Vec<u32> = items
            .services
            .iter()
            .map(|s| s.id)
            .chain(items.parts.iter().map(|p| p.id))
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_zero_and_negative_quantity_rejected() {
        let mut items = LineItems::new();
        let err = items.add_part(part("Filtro", 0, 30.0)).unwrap_err();
        assert!(err.has("quantity"));

        let err = items.add_part(part("Filtro", -2, 30.0)).unwrap_err();
        assert!(err.has("quantity"));
        assert!(items.parts.is_empty());
    }

    #[test]
    fn test_blank_service_rejected() {
        let mut items = LineItems::new();
        let err = items.add_service(service("   ", 10.0)).unwrap_err();
        assert!(err.has("description"));

        let err = items.add_service(service("Revisão", -1.0)).unwrap_err();
        assert!(err.has("value"));
    }

    #[test]
    fn test_removing_all_lines_fails_validation() {
        let mut items = reference_items();
        assert!(items.validate().is_empty());

        for id in 1..=4 {
            assert!(items.remove_line(id));
        }
        assert!(!items.remove_line(1));

        let errors = items.validate();
        assert!(errors.has("items"));
        assert!(errors.to_string().contains(EMPTY_ITEMS_MESSAGE));
    }

    #[test]
    fn test_update_part_revalidates() {
        let mut items = reference_items();
        assert!(items.update_part(3, Some(2), None).unwrap());
        assert_eq!(items.totals(DiscountPolicy::Unclamped).part_subtotal, 125.0);

        assert!(items.update_part(3, Some(0), None).is_err());
        assert_eq!(items.parts[0].quantity, 2);
        assert!(!items.update_part(99, Some(1), None).unwrap());
    }

    #[test]
    fn test_update_service_keeps_line_on_error() {
        let mut items = reference_items();
        assert!(items.update_service(2, None, Some(100.0)).unwrap());
        assert_eq!(items.totals(DiscountPolicy::Unclamped).service_subtotal, 250.0);

        assert!(items.update_service(1, Some(" ".to_string()), None).is_err());
        assert_eq!(items.services[0].description, "Alinhamento");
        assert!(!items.update_service(3, None, Some(1.0)).unwrap());
    }

    #[test]
    fn test_negative_discount_rejected() {
        let mut items = reference_items();
        assert!(items.set_discount(-5.0).is_err());
        assert_eq!(items.discount, 20.0);
    }
}
