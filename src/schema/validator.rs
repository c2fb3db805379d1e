//! Schema validation of record files with source-span diagnostics

use jsonschema::error::ValidationErrorKind;
use jsonschema::{validator_for, ValidationError as JsonSchemaError, Validator as JsonValidator};
use miette::{Diagnostic, NamedSource, SourceSpan};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::core::EntityPrefix;
use crate::entities::{
    Appointment, ChecklistTemplate, Customer, Employee, PartItem, Quote, Sale, ServiceItem,
    Vehicle, WorkOrder,
};
use crate::schema::registry::SchemaRegistry;
use crate::schema::rules::ValidationErrors;

/// All schema violations found in one file
#[derive(Debug, Error, Diagnostic)]
#[error("{filename}: {summary}")]
#[diagnostic(code(oficina::schema::invalid))]
pub struct ValidationError {
    filename: String,
    summary: String,

    #[source_code]
    src: NamedSource<String>,

    #[related]
    violations: Vec<SchemaViolation>,
}

#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
pub struct SchemaViolation {
    #[label("{}", self.hint)]
    span: SourceSpan,

    message: String,
    hint: String,

    #[help]
    help: Option<String>,
}

impl ValidationError {
    fn new(filename: &str, source: &str, violations: Vec<SchemaViolation>) -> Self {
        let summary = match violations.len() {
            1 => "1 schema error".to_string(),
            n => format!("{} schema errors", n),
        };
        Self {
            filename: filename.to_string(),
            summary,
            src: NamedSource::new(filename, source.to_string()),
            violations,
        }
    }

    pub fn violation_count(&self) -> usize {
        self.violations.len()
    }

    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(|v| v.message.clone()).collect()
    }
}

/// Compiled schemas for every record type
pub struct Validator {
    compiled: HashMap<EntityPrefix, JsonValidator>,
}

impl Validator {
    pub fn new(registry: &SchemaRegistry) -> Self {
        let mut compiled = HashMap::new();
        for prefix in EntityPrefix::all() {
            let Some(text) = registry.get(*prefix) else {
                continue;
            };
            let schema = match serde_json::from_str::<JsonValue>(text) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(%prefix, error = %e, "schema is not valid JSON");
                    continue;
                }
            };
            match validator_for(&schema) {
                Ok(v) => {
                    compiled.insert(*prefix, v);
                }
                Err(e) => tracing::warn!(%prefix, error = %e, "schema failed to compile"),
            }
        }
        Self { compiled }
    }

    /// Check YAML text against the schema for `prefix`, reporting every violation
    pub fn validate(
        &self,
        content: &str,
        filename: &str,
        prefix: EntityPrefix,
    ) -> Result<(), ValidationError> {
        let yaml_value: serde_yml::Value = serde_yml::from_str(content).map_err(|e| {
            let violation = SchemaViolation {
                span: find_error_span(content, e.location()),
                message: format!("YAML parse error: {}", e),
                hint: "invalid YAML".to_string(),
                help: Some("check indentation, colons and quoting".to_string()),
            };
            ValidationError::new(filename, content, vec![violation])
        })?;

        let json_value: JsonValue = serde_json::to_value(&yaml_value).map_err(|e| {
            let violation = SchemaViolation {
                span: (0, content.len()).into(),
                message: format!("cannot convert YAML to JSON: {}", e),
                hint: "conversion error".to_string(),
                help: None,
            };
            ValidationError::new(filename, content, vec![violation])
        })?;

        let Some(schema) = self.compiled.get(&prefix) else {
            return Ok(());
        };

        let violations: Vec<SchemaViolation> = schema
            .iter_errors(&json_value)
            .map(|e| error_to_violation(content, &e))
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(filename, content, violations))
        }
    }

    /// Validate a record file, inferring its type from the name or directory.
    /// Files of unknown type are skipped.
    pub fn validate_file(&self, path: &Path) -> Result<Option<EntityPrefix>, FileCheckError> {
        let content = std::fs::read_to_string(path).map_err(|source| FileCheckError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let filename = path.file_name().unwrap_or_default().to_string_lossy();

        let Some(prefix) = EntityPrefix::from_path(path) else {
            return Ok(None);
        };
        self.validate(&content, &filename, prefix)?;
        Ok(Some(prefix))
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(&SchemaRegistry::default())
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum FileCheckError {
    #[error("cannot read {path}: {source}")]
    #[diagnostic(code(oficina::schema::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Schema(#[from] ValidationError),
}

/// Field rules for a record that already passed its schema.
///
/// Inspections are checked against their template by the caller.
pub fn check_rules(prefix: EntityPrefix, content: &str) -> Result<ValidationErrors, String> {
    fn run<T: DeserializeOwned>(
        content: &str,
        rules: impl Fn(&T) -> ValidationErrors,
    ) -> Result<ValidationErrors, String> {
        let record: T = serde_yml::from_str(content).map_err(|e| e.to_string())?;
        Ok(rules(&record))
    }

    match prefix {
        EntityPrefix::Cli => run(content, Customer::validate),
        EntityPrefix::Vei => run(content, Vehicle::validate),
        EntityPrefix::Fun => run(content, Employee::validate),
        EntityPrefix::Svc => run(content, ServiceItem::validate),
        EntityPrefix::Pec => run(content, PartItem::validate),
        EntityPrefix::Orc => run(content, Quote::validate),
        EntityPrefix::Os => run(content, WorkOrder::validate),
        EntityPrefix::Vnd => run(content, Sale::validate),
        EntityPrefix::Agd => run(content, Appointment::validate),
        EntityPrefix::Chk => run(content, ChecklistTemplate::validate),
        EntityPrefix::Ins => Ok(ValidationErrors::new()),
    }
}

fn error_to_violation(content: &str, error: &JsonSchemaError) -> SchemaViolation {
    let path = error.instance_path.to_string();
    SchemaViolation {
        span: find_path_span(content, &path),
        message: format_schema_error(error),
        hint: format_error_hint(error),
        help: generate_help_message(error),
    }
}

fn property_name(property: &JsonValue) -> String {
    property
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| property.to_string())
}

fn format_schema_error(error: &JsonSchemaError) -> String {
    let path = if error.instance_path.as_str().is_empty() {
        "document root".to_string()
    } else {
        format!("'{}'", error.instance_path)
    };

    match &error.kind {
        ValidationErrorKind::Required { property } => {
            format!("missing required field '{}' at {}", property_name(property), path)
        }
        ValidationErrorKind::Type { kind } => format!("wrong type at {}: expected {:?}", path, kind),
        ValidationErrorKind::Enum { options } => format!(
            "invalid value at {}: must be one of {}",
            path,
            format_enum_options(options)
        ),
        ValidationErrorKind::Pattern { pattern } => {
            format!("value at {} does not match {}", path, pattern)
        }
        ValidationErrorKind::MinLength { limit } => {
            format!("value at {} is too short: minimum {} characters", path, limit)
        }
        ValidationErrorKind::MaxLength { limit } => {
            format!("value at {} is too long: maximum {} characters", path, limit)
        }
        ValidationErrorKind::Minimum { limit } => format!("value at {} is below {}", path, limit),
        ValidationErrorKind::Maximum { limit } => format!("value at {} is above {}", path, limit),
        ValidationErrorKind::MinItems { limit } => {
            format!("{} needs at least {} item(s)", path, limit)
        }
        ValidationErrorKind::AdditionalProperties { unexpected } => {
            format!("unknown field(s) at {}: {}", path, unexpected.join(", "))
        }
        _ => format!("invalid value at {}: {}", path, error),
    }
}

fn format_enum_options(options: &JsonValue) -> String {
    match options.as_array() {
        Some(arr) => arr
            .iter()
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            .collect::<Vec<_>>()
            .join(", "),
        None => options.to_string(),
    }
}

fn format_error_hint(error: &JsonSchemaError) -> String {
    match &error.kind {
        ValidationErrorKind::Required { .. } => "required field missing",
        ValidationErrorKind::Type { .. } => "wrong type",
        ValidationErrorKind::Enum { .. } => "invalid value",
        ValidationErrorKind::Pattern { .. } => "pattern mismatch",
        ValidationErrorKind::MinLength { .. } => "too short",
        ValidationErrorKind::MaxLength { .. } => "too long",
        ValidationErrorKind::Minimum { .. } | ValidationErrorKind::Maximum { .. } => "out of range",
        ValidationErrorKind::AdditionalProperties { .. } => "unknown field",
        _ => "validation error",
    }
    .to_string()
}

fn generate_help_message(error: &JsonSchemaError) -> Option<String> {
    match &error.kind {
        ValidationErrorKind::Required { property } => {
            Some(format!("add the '{}' field", property_name(property)))
        }
        ValidationErrorKind::Enum { options } => {
            Some(format!("valid values: {}", format_enum_options(options)))
        }
        ValidationErrorKind::Pattern { pattern } => {
            let prefix = pattern
                .trim_start_matches('^')
                .split('-')
                .next()
                .filter(|p| p.parse::<EntityPrefix>().is_ok())?;
            Some(format!(
                "ID format: {}-[26 alphanumeric characters], e.g. {}-01J9Z3QK5V8M4T2R6W0XYB7CDE",
                prefix, prefix
            ))
        }
        ValidationErrorKind::AdditionalProperties { unexpected } if unexpected.len() == 1 => {
            Some(format!("remove '{}' or check its spelling", unexpected[0]))
        }
        ValidationErrorKind::AdditionalProperties { .. } => {
            Some("remove unknown fields or check their spelling".to_string())
        }
        _ => None,
    }
}

fn first_line_span(content: &str) -> SourceSpan {
    let len = content.find('\n').unwrap_or(content.len()).max(1);
    (0, len).into()
}

fn find_error_span(content: &str, location: Option<serde_yml::Location>) -> SourceSpan {
    let Some(loc) = location else {
        return first_line_span(content);
    };
    let line = loc.line().saturating_sub(1);
    let column = loc.column().saturating_sub(1);

    let mut offset = 0;
    for (i, line_content) in content.lines().enumerate() {
        if i == line {
            offset += column;
            break;
        }
        offset += line_content.len() + 1;
    }

    let rest = &content[offset.min(content.len())..];
    let len = rest.find('\n').unwrap_or(rest.len()).max(1);
    (offset, len).into()
}

/// Span for a JSON pointer like `/services/0/value` in YAML text
fn find_path_span(content: &str, json_path: &str) -> SourceSpan {
    let parts: Vec<&str> = json_path.split('/').filter(|s| !s.is_empty()).collect();
    let Some(last) = parts.last() else {
        return first_line_span(content);
    };

    // array index: point at the parent key
    if last.parse::<usize>().is_ok() && parts.len() >= 2 {
        if let Some(span) = find_key_span(content, parts[parts.len() - 2]) {
            return span;
        }
    }

    find_key_span(content, last).unwrap_or_else(|| first_line_span(content))
}

fn find_key_span(content: &str, key: &str) -> Option<SourceSpan> {
    let pattern = format!("{}:", key);
    let mut offset = 0;
    for line in content.lines() {
        let trimmed = line.trim_start().trim_start_matches("- ");
        if trimmed.starts_with(&pattern) {
            let start = offset + (line.len() - trimmed.len());
            return Some((start, trimmed.len()).into());
        }
        offset += line.len() + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUSTOMER: &str = r#"
id: CLI-01J9Z3QK5V8M4T2R6W0XYB7CDE
name: Maria Souza
document: "12345678909"
phone: "11987654321"
created: 2026-01-05T10:00:00Z
author: ana
"#;

    fn validator() -> Validator {
        Validator::default()
    }

    #[test]
    fn test_every_schema_compiles() {
        let v = validator();
        for prefix in EntityPrefix::all() {
            assert!(v.compiled.contains_key(prefix), "no schema for {}", prefix);
        }
    }

    #[test]
    fn test_valid_customer() {
        let result = validator().validate(CUSTOMER, "c.yaml", EntityPrefix::Cli);
        assert!(result.is_ok(), "{:?}", result);
    }

    #[test]
    fn test_missing_field_and_unknown_field() {
        let yaml = CUSTOMER.replace("phone: \"11987654321\"\n", "nickname: Mari\n");
        let err = validator()
            .validate(&yaml, "c.yaml", EntityPrefix::Cli)
            .unwrap_err();
        assert_eq!(err.violation_count(), 2);
        let messages = err.messages().join("\n");
        assert!(messages.contains("missing required field 'phone'"));
        assert!(messages.contains("nickname"));
    }

    #[test]
    fn test_bad_id_pattern() {
        let yaml = CUSTOMER.replace("CLI-01J9Z3QK5V8M4T2R6W0XYB7CDE", "CLI-123");
        let err = validator()
            .validate(&yaml, "c.yaml", EntityPrefix::Cli)
            .unwrap_err();
        assert!(err.messages()[0].contains("'/id'"));
    }

    #[test]
    fn test_quote_line_quantity_minimum() {
        let yaml = r#"
id: ORC-01J9Z3QK5V8M4T2R6W0XYB7CDE
number: 1
customer: CLI-01J9Z3QK5V8M4T2R6W0XYB7CDE
vehicle: VEI-01J9Z3QK5V8M4T2R6W0XYB7CDE
parts:
  - id: 1
    name: Pastilha
    quantity: 0
    unit_price: 45.0
status: pending
valid_until: 2026-01-20
created: 2026-01-05T10:00:00Z
author: ana
"#;
        let err = validator()
            .validate(yaml, "q.yaml", EntityPrefix::Orc)
            .unwrap_err();
        assert_eq!(err.violation_count(), 1);
    }

    #[test]
    fn test_yaml_syntax_error() {
        let err = validator()
            .validate("name: [unclosed", "bad.yaml", EntityPrefix::Cli)
            .unwrap_err();
        assert!(err.messages()[0].starts_with("YAML parse error"));
    }

    #[test]
    fn test_rules_after_schema() {
        let yaml = CUSTOMER.replace("\"12345678909\"", "\"123456789\"");
        let errors = check_rules(EntityPrefix::Cli, &yaml).unwrap();
        assert!(errors.has("document"));

        let ok = check_rules(EntityPrefix::Cli, CUSTOMER).unwrap();
        assert!(ok.is_empty());
    }

    #[test]
    fn test_find_key_span() {
        let content = "id: X\nservices:\n  - id: 1\n    value: 10\n";
        let span = find_key_span(content, "value").unwrap();
        assert_eq!(span.offset(), content.find("value").unwrap());
    }
}
