//! Record schemas, field rules, documents and prompts

pub mod registry;
pub mod rules;
pub mod template;
pub mod validator;
pub mod wizard;

pub use registry::SchemaRegistry;
pub use rules::{FieldError, ValidationErrors};
pub use template::{DocumentRenderer, TemplateError};
pub use validator::{ValidationError, Validator};
pub use wizard::{ChecklistWizard, SchemaWizard, WizardResult};
