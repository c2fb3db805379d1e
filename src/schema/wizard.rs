//! Interactive prompts
//!
//! [`SchemaWizard`] walks a record schema and asks for each editable field;
//! [`ChecklistWizard`] asks each checklist item with the prompt matching
//! its kind. Neither is used when stdin is not a terminal.

use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, MultiSelect, Select};
use miette::{IntoDiagnostic, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::io::IsTerminal;

use crate::core::identity::EntityPrefix;
use crate::entities::{AnswerValue, ChecklistItem, ChecklistTemplate, Inspection, ItemKind};
use crate::schema::registry::SchemaRegistry;

/// True when prompts can be shown
pub fn is_interactive() -> bool {
    std::io::stdin().is_terminal() && std::io::stderr().is_terminal()
}

/// Values collected by [`SchemaWizard::run`]
#[derive(Debug, Default)]
pub struct WizardResult {
    pub values: HashMap<String, Value>,
}

impl WizardResult {
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_str())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.values.get(key).and_then(|v| v.as_u64())
    }
}

#[derive(Debug)]
struct FieldInfo {
    name: String,
    field_type: FieldType,
    required: bool,
}

#[derive(Debug)]
enum FieldType {
    String,
    Enum { values: Vec<String> },
    Integer,
    Number,
}

/// Fields filled by the program, never prompted
const AUTO_FIELDS: &[&str] = &[
    "id", "created", "author", "active", "status", "customer", "vehicle", "mechanic",
];

/// Prompt order; remaining fields follow in schema order
const FIELD_ORDER: &[&str] = &[
    "name", "document", "phone", "email", "role", "code", "plate", "brand", "model", "year",
    "color", "mileage", "price", "address", "city", "state", "notes",
];

pub struct SchemaWizard {
    registry: SchemaRegistry,
    theme: ColorfulTheme,
}

impl SchemaWizard {
    pub fn new() -> Self {
        Self {
            registry: SchemaRegistry::default(),
            theme: ColorfulTheme::default(),
        }
    }

    /// Ask for every editable scalar field of a record type
    pub fn run(&self, prefix: EntityPrefix) -> Result<WizardResult> {
        let schema_str = self
            .registry
            .get(prefix)
            .ok_or_else(|| miette::miette!("no schema for {}", prefix.label()))?;
        let schema: Value = serde_json::from_str(schema_str).into_diagnostic()?;

        eprintln!();
        eprintln!("{} New {}", style("◆").cyan(), style(prefix.label()).bold());
        eprintln!("{}", style("─".repeat(50)).dim());

        let mut result = WizardResult::default();
        for field in extract_fields(&schema) {
            if let Some(v) = self.prompt_field(&field)? {
                result.values.insert(field.name, v);
            }
        }
        Ok(result)
    }

    fn prompt_field(&self, field: &FieldInfo) -> Result<Option<Value>> {
        let prompt = format_prompt(&field.name);

        match &field.field_type {
            FieldType::Enum { values } => {
                let selection = Select::with_theme(&self.theme)
                    .with_prompt(&prompt)
                    .items(values)
                    .default(0)
                    .interact()
                    .into_diagnostic()?;
                Ok(Some(Value::String(values[selection].clone())))
            }

            FieldType::String => {
                let value: String = Input::with_theme(&self.theme)
                    .with_prompt(&prompt)
                    .allow_empty(!field.required)
                    .interact_text()
                    .into_diagnostic()?;
                if value.trim().is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(Value::String(value.trim().to_string())))
                }
            }

            FieldType::Integer => {
                let value: String = Input::with_theme(&self.theme)
                    .with_prompt(&prompt)
                    .allow_empty(!field.required)
                    .validate_with(|s: &String| -> std::result::Result<(), &str> {
                        if s.is_empty() || s.trim().parse::<u64>().is_ok() {
                            Ok(())
                        } else {
                            Err("enter a whole number")
                        }
                    })
                    .interact_text()
                    .into_diagnostic()?;
                Ok(value.trim().parse::<u64>().ok().map(|n| Value::Number(n.into())))
            }

            FieldType::Number => {
                let value: String = Input::with_theme(&self.theme)
                    .with_prompt(&prompt)
                    .allow_empty(!field.required)
                    .validate_with(|s: &String| -> std::result::Result<(), String> {
                        if s.is_empty() {
                            return Ok(());
                        }
                        crate::core::money::parse_amount(s)
                            .map(|_| ())
                            .map_err(|e| e.to_string())
                    })
                    .interact_text()
                    .into_diagnostic()?;
                Ok(crate::core::money::parse_amount(&value)
                    .ok()
                    .filter(|_| !value.trim().is_empty())
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number))
            }
        }
    }
}

impl Default for SchemaWizard {
    fn default() -> Self {
        Self::new()
    }
}

fn extract_fields(schema: &Value) -> Vec<FieldInfo> {
    let Some(props) = schema.get("properties").and_then(|p| p.as_object()) else {
        return Vec::new();
    };
    let required: Vec<&str> = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    let mut names: Vec<&str> = FIELD_ORDER
        .iter()
        .copied()
        .filter(|n| props.contains_key(*n))
        .collect();
    for name in props.keys() {
        if !names.contains(&name.as_str()) {
            names.push(name);
        }
    }

    names
        .into_iter()
        .filter(|n| !AUTO_FIELDS.contains(n))
        .filter_map(|n| {
            let field_type = parse_field_type(&props[n])?;
            Some(FieldInfo {
                name: n.to_string(),
                field_type,
                required: required.contains(&n),
            })
        })
        .collect()
}

fn parse_field_type(schema: &Value) -> Option<FieldType> {
    if let Some(values) = schema.get("enum").and_then(|e| e.as_array()) {
        return Some(FieldType::Enum {
            values: values
                .iter()
                .filter_map(|v| v.as_str())
                .map(String::from)
                .collect(),
        });
    }
    match schema.get("type").and_then(|t| t.as_str()) {
        // dates and timestamps are set by commands
        Some("string") if schema.get("format").is_some() => None,
        Some("string") => Some(FieldType::String),
        Some("integer") => Some(FieldType::Integer),
        Some("number") => Some(FieldType::Number),
        _ => None,
    }
}

fn format_prompt(name: &str) -> String {
    name.split('_')
        .enumerate()
        .map(|(i, w)| {
            let mut chars = w.chars();
            match (i, chars.next()) {
                (0, Some(c)) => c.to_uppercase().chain(chars).collect(),
                (_, Some(c)) => std::iter::once(c).chain(chars).collect(),
                (_, None) => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Prompts for filling an inspection
pub struct ChecklistWizard {
    theme: ColorfulTheme,
}

impl ChecklistWizard {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }

    /// Ask every item not already answered
    pub fn fill(&self, template: &ChecklistTemplate, inspection: &mut Inspection) -> Result<()> {
        eprintln!();
        eprintln!("{} {}", style("◆").cyan(), style(&template.name).bold());
        eprintln!("{}", style("─".repeat(50)).dim());

        for item in &template.items {
            if inspection.answer(item.id).is_some() {
                continue;
            }
            if let Some(value) = self.ask(item)? {
                inspection.set_answer(item.id, value);
            }
        }
        Ok(())
    }

    fn ask(&self, item: &ChecklistItem) -> Result<Option<AnswerValue>> {
        let prompt = if item.required {
            format!("{} *", item.label)
        } else {
            item.label.clone()
        };

        let value = match item.kind {
            ItemKind::ShortText | ItemKind::LongText | ItemKind::Photo => {
                let hint = match item.kind {
                    ItemKind::Photo => format!("{} (photo path)", prompt),
                    ItemKind::LongText => format!("{} (one line per answer, \\n for breaks)", prompt),
                    _ => prompt,
                };
                let text: String = Input::with_theme(&self.theme)
                    .with_prompt(hint)
                    .allow_empty(!item.required)
                    .interact_text()
                    .into_diagnostic()?;
                if text.trim().is_empty() {
                    return Ok(None);
                }
                match item.kind {
                    ItemKind::Photo => AnswerValue::Photo(text.trim().to_string()),
                    _ => AnswerValue::Text(text.replace("\\n", "\n")),
                }
            }
            ItemKind::YesNo => AnswerValue::YesNo(
                Confirm::with_theme(&self.theme)
                    .with_prompt(prompt)
                    .interact()
                    .into_diagnostic()?,
            ),
            ItemKind::SingleChoice => {
                let idx = Select::with_theme(&self.theme)
                    .with_prompt(prompt)
                    .items(&item.options)
                    .default(0)
                    .interact()
                    .into_diagnostic()?;
                AnswerValue::Choice(item.options[idx].clone())
            }
            ItemKind::MultiChoice => {
                let picked = MultiSelect::with_theme(&self.theme)
                    .with_prompt(prompt)
                    .items(&item.options)
                    .interact()
                    .into_diagnostic()?;
                AnswerValue::Choices(picked.into_iter().map(|i| item.options[i].clone()).collect())
            }
        };
        Ok(Some(value))
    }
}

impl Default for ChecklistWizard {
    fn default() -> Self {
        Self::new()
    }
}
