//! Checklist templates and filled inspections
//!
//! A template is a list of typed items. An inspection records one answer
//! per item against a vehicle, optionally tied to a work order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::{active_label, default_active, Entity};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::schema::rules::{self, ValidationErrors};

/// Kind of input an item expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    #[default]
    ShortText,
    LongText,
    YesNo,
    SingleChoice,
    MultiChoice,
    /// Stores a path to the picture; the file itself is not managed
    Photo,
}

impl ItemKind {
    pub fn needs_options(&self) -> bool {
        matches!(self, ItemKind::SingleChoice | ItemKind::MultiChoice)
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemKind::ShortText => write!(f, "short_text"),
            ItemKind::LongText => write!(f, "long_text"),
            ItemKind::YesNo => write!(f, "yes_no"),
            ItemKind::SingleChoice => write!(f, "single_choice"),
            ItemKind::MultiChoice => write!(f, "multi_choice"),
            ItemKind::Photo => write!(f, "photo"),
        }
    }
}

impl std::str::FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "short_text" | "text" => Ok(ItemKind::ShortText),
            "long_text" => Ok(ItemKind::LongText),
            "yes_no" | "bool" => Ok(ItemKind::YesNo),
            "single_choice" | "choice" => Ok(ItemKind::SingleChoice),
            "multi_choice" => Ok(ItemKind::MultiChoice),
            "photo" | "foto" => Ok(ItemKind::Photo),
            _ => Err(format!(
                "Invalid item kind: {}. Use short_text, long_text, yes_no, single_choice, multi_choice, or photo",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    /// Position within the template, starting at 1
    pub id: u32,

    pub label: String,

    #[serde(default)]
    pub kind: ItemKind,

    #[serde(default)]
    pub required: bool,

    /// Choices for single/multi choice items
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl ChecklistItem {
    /// Parse an item definition of the form `kind:label[:opt1|opt2][:required]`,
    /// e.g. `yes_no:Luzes funcionando:required`
    pub fn parse_spec(id: u32, spec: &str) -> Result<Self, String> {
        let mut parts = spec.split(':');
        let kind: ItemKind = parts
            .next()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| format!("item '{}' is missing a kind", spec))?
            .parse()?;
        let label = parts
            .next()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .ok_or_else(|| format!("item '{}' is missing a label", spec))?
            .to_string();

        let mut required = false;
        let mut options = Vec::new();
        for extra in parts {
            if extra.eq_ignore_ascii_case("required") || extra.eq_ignore_ascii_case("obrigatorio") {
                required = true;
            } else {
                options = extra
                    .split('|')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect();
            }
        }

        Ok(Self {
            id,
            label,
            kind,
            required,
            options,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistTemplate {
    pub id: EntityId,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub items: Vec<ChecklistItem>,

    #[serde(default = "default_active")]
    pub active: bool,

    pub created: DateTime<Utc>,

    pub author: String,
}

impl ChecklistTemplate {
    pub fn new(name: String, items: Vec<ChecklistItem>, author: String) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Chk),
            name,
            description: None,
            items,
            active: true,
            created: Utc::now(),
            author,
        }
    }

    pub fn item(&self, id: u32) -> Option<&ChecklistItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        rules::require_text(&mut errors, "name", &self.name, "template name");
        if self.items.is_empty() {
            errors.push("items", "a checklist needs at least one item");
        }
        for (i, item) in self.items.iter().enumerate() {
            let field = format!("items[{}]", i);
            if item.label.trim().is_empty() {
                errors.push(format!("{}.label", field), "item label is required");
            }
            if item.kind.needs_options() && item.options.len() < 2 {
                errors.push(
                    format!("{}.options", field),
                    "choice items need at least two options",
                );
            }
        }
        errors
    }
}

impl Entity for ChecklistTemplate {
    const PREFIX: EntityPrefix = EntityPrefix::Chk;

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

/// A recorded answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
    Text(String),
    YesNo(bool),
    Choice(String),
    Choices(Vec<String>),
    Photo(String),
}

impl AnswerValue {
    /// Parse a typed command-line answer for an item of the given kind
    pub fn parse(kind: ItemKind, input: &str) -> Result<Self, String> {
        let input = input.trim();
        match kind {
            ItemKind::ShortText | ItemKind::LongText => Ok(AnswerValue::Text(input.to_string())),
            ItemKind::YesNo => match input.to_lowercase().as_str() {
                "yes" | "y" | "sim" | "s" | "true" => Ok(AnswerValue::YesNo(true)),
                "no" | "n" | "nao" | "não" | "false" => Ok(AnswerValue::YesNo(false)),
                _ => Err(format!("'{}' is not a yes/no answer", input)),
            },
            ItemKind::SingleChoice => Ok(AnswerValue::Choice(input.to_string())),
            ItemKind::MultiChoice => Ok(AnswerValue::Choices(
                input
                    .split(',')
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect(),
            )),
            ItemKind::Photo => Ok(AnswerValue::Photo(input.to_string())),
        }
    }

    pub fn fits(&self, kind: ItemKind) -> bool {
        matches!(
            (self, kind),
            (AnswerValue::Text(_), ItemKind::ShortText | ItemKind::LongText)
                | (AnswerValue::YesNo(_), ItemKind::YesNo)
                | (AnswerValue::Choice(_), ItemKind::SingleChoice)
                | (AnswerValue::Choices(_), ItemKind::MultiChoice)
                | (AnswerValue::Photo(_), ItemKind::Photo)
        )
    }

    pub fn is_blank(&self) -> bool {
        match self {
            AnswerValue::Text(s) | AnswerValue::Choice(s) | AnswerValue::Photo(s) => {
                s.trim().is_empty()
            }
            AnswerValue::Choices(c) => c.is_empty(),
            AnswerValue::YesNo(_) => false,
        }
    }
}

impl std::fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnswerValue::Text(s) | AnswerValue::Choice(s) => write!(f, "{}", s),
            AnswerValue::YesNo(true) => write!(f, "sim"),
            AnswerValue::YesNo(false) => write!(f, "não"),
            AnswerValue::Choices(c) => write!(f, "{}", c.join(", ")),
            AnswerValue::Photo(p) => write!(f, "[foto] {}", p),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Template item id
    pub item: u32,

    #[serde(flatten)]
    pub value: AnswerValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inspection {
    pub id: EntityId,

    pub template: EntityId,

    /// Template name at the time of filling
    pub template_name: String,

    pub vehicle: EntityId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_order: Option<EntityId>,

    pub answers: Vec<Answer>,

    pub created: DateTime<Utc>,

    pub author: String,
}

impl Inspection {
    pub fn new(template: &ChecklistTemplate, vehicle: EntityId, author: String) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Ins),
            template: template.id.clone(),
            template_name: template.name.clone(),
            vehicle,
            work_order: None,
            answers: Vec::new(),
            created: Utc::now(),
            author,
        }
    }

    pub fn answer(&self, item: u32) -> Option<&AnswerValue> {
        self.answers.iter().find(|a| a.item == item).map(|a| &a.value)
    }

    /// Set or replace the answer to an item
    pub fn set_answer(&mut self, item: u32, value: AnswerValue) {
        match self.answers.iter_mut().find(|a| a.item == item) {
            Some(existing) => existing.value = value,
            None => self.answers.push(Answer { item, value }),
        }
    }

    /// Check answers against the template they were filled from
    pub fn validate_against(&self, template: &ChecklistTemplate) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        for item in &template.items {
            let field = format!("answers[{}]", item.id);
            match self.answer(item.id) {
                None => {
                    if item.required {
                        errors.push(field, format!("'{}' is required", item.label));
                    }
                }
                Some(value) if !value.fits(item.kind) => {
                    errors.push(
                        field,
                        format!("'{}' expects a {} answer", item.label, item.kind),
                    );
                }
                Some(value) if item.required && value.is_blank() => {
                    errors.push(field, format!("'{}' is required", item.label));
                }
                Some(AnswerValue::Choice(choice)) => {
                    if !choice.is_empty() && !item.options.contains(choice) {
                        errors.push(
                            field,
                            format!(
                                "'{}' is not an option for '{}' ({})",
                                choice,
                                item.label,
                                item.options.join(", ")
                            ),
                        );
                    }
                }
                Some(AnswerValue::Choices(choices)) => {
                    for choice in choices.iter().filter(|c| !item.options.contains(c)) {
                        errors.push(
                            field.clone(),
                            format!("'{}' is not an option for '{}'", choice, item.label),
                        );
                    }
                }
                Some(_) => {}
            }
        }

        for answer in &self.answers {
            if template.item(answer.item).is_none() {
                errors.push(
                    format!("answers[{}]", answer.item),
                    "answer refers to an item not in the template",
                );
            }
        }
        errors
    }
}

impl Entity for Inspection {
    const PREFIX: EntityPrefix = EntityPrefix::Ins;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn title(&self) -> String {
        self.template_name.clone()
    }

    fn status(&self) -> &str {
        "filled"
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }

    fn author(&self) -> &str {
        &self.author
    }
}
