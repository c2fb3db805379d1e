//! Employee registry record (funcionário)

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::{active_label, default_active, Entity};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::schema::rules::{self, ValidationErrors};

/// Job role in the shop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Mechanic,
    Electrician,
    Attendant,
    Manager,
}

impl Role {
    /// Roles that can be assigned to work orders and appointments
    pub fn works_on_vehicles(&self) -> bool {
        matches!(self, Role::Mechanic | Role::Electrician)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Mechanic => write!(f, "mechanic"),
            Role::Electrician => write!(f, "electrician"),
            Role::Attendant => write!(f, "attendant"),
            Role::Manager => write!(f, "manager"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mechanic" | "mecanico" | "mecânico" => Ok(Role::Mechanic),
            "electrician" | "eletricista" => Ok(Role::Electrician),
            "attendant" | "atendente" => Ok(Role::Attendant),
            "manager" | "gerente" => Ok(Role::Manager),
            _ => Err(format!(
                "Invalid role: {}. Use mechanic, electrician, attendant, or manager",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: EntityId,

    pub name: String,

    #[serde(default)]
    pub role: Role,

    /// CPF
    pub document: String,

    pub phone: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hired_on: Option<NaiveDate>,

    /// Commission on labor, in percent
    #[serde(default)]
    pub commission_pct: f64,

    #[serde(default = "default_active")]
    pub active: bool,

    pub created: DateTime<Utc>,

    pub author: String,
}

impl Employee {
    pub fn new(name: String, role: Role, document: String, phone: String, author: String) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Fun),
            name,
            role,
            document,
            phone,
            email: None,
            hired_on: None,
            commission_pct: 0.0,
            active: true,
            created: Utc::now(),
            author,
        }
    }

    /// Active mechanic or electrician
    pub fn can_take_work(&self) -> bool {
        self.active && self.role.works_on_vehicles()
    }

    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        rules::require_min_chars(&mut errors, "name", &self.name, 3, "name");
        rules::check_cpf(&mut errors, "document", &self.document);
        rules::check_phone(&mut errors, "phone", &self.phone);
        if let Some(email) = self.email.as_deref().filter(|e| !e.trim().is_empty()) {
            rules::check_email(&mut errors, "email", email);
        }
        if !(0.0..=100.0).contains(&self.commission_pct) {
            errors.push("commission_pct", "commission must be between 0 and 100%");
        }
        errors
    }
}

impl Entity for Employee {
    const PREFIX: EntityPrefix = EntityPrefix::Fun;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn title(&self) -> String {
        format!("{} ({})", self.name, self.role)
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
    fn test_role_parsing_accepts_portuguese() {
        assert_eq!("mecanico".parse::<Role>().unwrap(), Role::Mechanic);
        assert_eq!("Eletricista".parse::<Role>().unwrap(), Role::Electrician);
        assert!("chef".parse::<Role>().is_err());
    }

    #[test]
    fn test_can_take_work() {
        let mut emp = Employee::new(
            "Carlos Pereira".to_string(),
            Role::Mechanic,
            "98765432100".to_string(),
            "11912345678".to_string(),
            "test".to_string(),
        );
        assert!(emp.can_take_work());
        assert!(emp.validate().is_empty());

        emp.active = false;
        assert!(!emp.can_take_work());

        emp.active = true;
        emp.role = Role::Attendant;
        assert!(!emp.can_take_work());
    }

    #[test]
    fn test_commission_range() {
        let mut emp = Employee::new(
            "Carlos Pereira".to_string(),
            Role::Mechanic,
            "98765432100".to_string(),
            "11912345678".to_string(),
            "test".to_string(),
        );
        emp.commission_pct = 120.0;
        assert!(emp.validate().has("commission_pct"));
    }
}
