//! Embedded JSON Schemas, one per record type

use rust_embed::Embed;
use std::collections::HashMap;

use crate::core::EntityPrefix;

#[derive(Embed)]
#[folder = "schemas/"]
struct EmbeddedSchemas;

/// Schema sources keyed by record type
pub struct SchemaRegistry {
    schemas: HashMap<EntityPrefix, String>,
}

impl SchemaRegistry {
    /// File name of the schema for a record type
    pub fn file_name(prefix: EntityPrefix) -> &'static str {
        match prefix {
            EntityPrefix::Cli => "customer.schema.json",
            EntityPrefix::Vei => "vehicle.schema.json",
            EntityPrefix::Fun => "employee.schema.json",
            EntityPrefix::Svc => "service.schema.json",
            EntityPrefix::Pec => "part.schema.json",
            EntityPrefix::Orc => "quote.schema.json",
            EntityPrefix::Os => "work_order.schema.json",
            EntityPrefix::Vnd => "sale.schema.json",
            EntityPrefix::Agd => "appointment.schema.json",
            EntityPrefix::Chk => "checklist_template.schema.json",
            EntityPrefix::Ins => "inspection.schema.json",
        }
    }

    pub fn get(&self, prefix: EntityPrefix) -> Option<&str> {
        self.schemas.get(&prefix).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        let mut schemas = HashMap::new();
        for prefix in EntityPrefix::all() {
            let name = Self::file_name(*prefix);
            match EmbeddedSchemas::get(name) {
                Some(file) => match std::str::from_utf8(&file.data) {
                    Ok(text) => {
                        schemas.insert(*prefix, text.to_string());
                    }
                    Err(_) => tracing::warn!(schema = name, "schema is not valid UTF-8"),
                },
                None => tracing::warn!(schema = name, "schema missing from build"),
            }
        }
        Self { schemas }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_record_type_has_a_schema() {
        let registry = SchemaRegistry::default();
        assert_eq!(registry.len(), EntityPrefix::all().len());
        for prefix in EntityPrefix::all() {
            let text = registry.get(*prefix).unwrap();
            let json: serde_json::Value = serde_json::from_str(text).unwrap();
            assert_eq!(json["type"], "object");
        }
    }
}
