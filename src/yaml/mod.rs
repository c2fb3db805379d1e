//! YAML parsing with source-span diagnostics

pub mod diagnostics;

pub use diagnostics::{parse_record, YamlError, YamlSyntaxError};
