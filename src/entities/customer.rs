//! Customer registry record (cliente)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::{active_label, default_active, Entity};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::schema::rules::{self, ValidationErrors};

/// A registered customer, person (CPF) or company (CNPJ)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: EntityId,

    /// Full name or company name
    pub name: String,

    /// CPF or CNPJ, stored as typed
    pub document: String,

    pub phone: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    /// Two-letter state code (UF)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default = "default_active")]
    pub active: bool,

    pub created: DateTime<Utc>,

    pub author: String,
}

impl Customer {
    pub fn new(name: String, document: String, phone: String, author: String) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Cli),
            name,
            document,
            phone,
            email: None,
            address: None,
            city: None,
            state: None,
            notes: None,
            active: true,
            created: Utc::now(),
            author,
        }
    }

    /// Document digits only, for lookups
    pub fn document_digits(&self) -> String {
        rules::digits_only(&self.document)
    }

    /// "CPF" or "CNPJ" depending on the document length
    pub fn document_kind(&self) -> &'static str {
        if self.document_digits().len() == 14 {
            "CNPJ"
        } else {
            "CPF"
        }
    }

    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        rules::require_min_chars(&mut errors, "name", &self.name, 3, "name");
        rules::check_document(&mut errors, "document", &self.document);
        rules::check_phone(&mut errors, "phone", &self.phone);
        if let Some(email) = self.email.as_deref().filter(|e| !e.trim().is_empty()) {
            rules::check_email(&mut errors, "email", email);
        }
        if let Some(state) = self.state.as_deref().filter(|s| !s.is_empty()) {
            if state.len() != 2 || !state.chars().all(|c| c.is_ascii_alphabetic()) {
                errors.push("state", "state must be a two-letter code (e.g. SP)");
            }
        }
        errors
    }
}

impl Entity for Customer {
    const PREFIX: EntityPrefix = EntityPrefix::Cli;

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

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Customer {
        Customer::new(
            "Maria Souza".to_string(),
            "123.456.789-09".to_string(),
            "(11) 98765-4321".to_string(),
            "test".to_string(),
        )
    }

    #[test]
    fn test_valid_customer() {
        let customer = sample();
        assert!(customer.validate().is_empty());
        assert_eq!(customer.document_kind(), "CPF");
        assert_eq!(customer.document_digits(), "12345678909");
        assert!(customer.id.to_string().starts_with("CLI-"));
    }

    #[test]
    fn test_invalid_fields_are_reported() {
        let mut customer = sample();
        customer.name = "Al".to_string();
        customer.phone = "1234".to_string();
        customer.email = Some("not-an-email".to_string());

        let errors = customer.validate();
        assert!(errors.has("name"));
        assert!(errors.has("phone"));
        assert!(errors.has("email"));
        assert!(!errors.has("document"));
    }

    #[test]
    fn test_company_document() {
        let mut customer = sample();
        customer.document = "12.345.678/0001-90".to_string();
        assert!(customer.validate().is_empty());
        assert_eq!(customer.document_kind(), "CNPJ");
    }

    #[test]
    fn test_yaml_roundtrip_defaults_active() {
        let yaml = format!(
            "id: {}\nname: Joao Lima\ndocument: '12345678909'\nphone: '1134567890'\ncreated: 2026-01-05T10:00:00Z\nauthor: ana\n",
            EntityId::new(EntityPrefix::Cli)
        );
        let customer: Customer = serde_yml::from_str(&yaml).unwrap();
        assert!(customer.active);
        assert_eq!(customer.status(), "active");
    }
}
