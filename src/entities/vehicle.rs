//! Vehicle registry record (veículo)

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::schema::rules::{self, ValidationErrors};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: EntityId,

    /// Owner
    pub customer: EntityId,

    /// Plate, normalized to upper case without dash
    pub plate: String,

    pub brand: String,

    pub model: String,

    /// Model year
    pub year: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    /// Odometer reading in km at registration or last visit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mileage: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub created: DateTime<Utc>,

    pub author: String,
}

impl Vehicle {
    pub fn new(
        customer: EntityId,
        plate: &str,
        brand: String,
        model: String,
        year: u16,
        author: String,
    ) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Vei),
            customer,
            plate: rules::normalize_plate(plate),
            brand,
            model,
            year,
            color: None,
            mileage: None,
            notes: None,
            created: Utc::now(),
            author,
        }
    }

    /// "Fiat Uno 2015"
    pub fn description(&self) -> String {
        format!("{} {} {}", self.brand, self.model, self.year)
    }

    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if self.customer.prefix() != EntityPrefix::Cli {
            errors.push("customer", "owner must be a customer (CLI-...)");
        }
        rules::check_plate(&mut errors, "plate", &self.plate);
        rules::require_text(&mut errors, "brand", &self.brand, "brand");
        rules::require_text(&mut errors, "model", &self.model, "model");

        let next_year = Utc::now().year() + 1;
        if i32::from(self.year) < 1900 || i32::from(self.year) > next_year {
            errors.push("year", format!("year must be between 1900 and {}", next_year));
        }
        errors
    }
}

impl Entity for Vehicle {
    const PREFIX: EntityPrefix = EntityPrefix::Vei;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn title(&self) -> String {
        format!("{} {}", self.plate, self.description())
    }

    fn status(&self) -> &str {
        "active"
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

    fn sample() -> Vehicle {
        Vehicle::new(
            EntityId::new(EntityPrefix::Cli),
            "abc-1d23",
            "Fiat".to_string(),
            "Uno".to_string(),
            2015,
            "test".to_string(),
        )
    }

    #[test]
    fn test_plate_is_normalized() {
        let vehicle = sample();
        assert_eq!(vehicle.plate, "ABC1D23");
        assert!(vehicle.validate().is_empty());
        assert_eq!(vehicle.title(), "ABC1D23 Fiat Uno 2015");
    }

    #[test]
    fn test_year_bounds() {
        let mut vehicle = sample();
        vehicle.year = 1899;
        assert!(vehicle.validate().has("year"));

        vehicle.year = (Utc::now().year() + 2) as u16;
        assert!(vehicle.validate().has("year"));
    }

    #[test]
    fn test_owner_must_be_customer() {
        let mut vehicle = sample();
        vehicle.customer = EntityId::new(EntityPrefix::Fun);
        vehicle.brand = String::new();

        let errors = vehicle.validate();
        assert!(errors.has("customer"));
        assert!(errors.has("brand"));
    }
}
