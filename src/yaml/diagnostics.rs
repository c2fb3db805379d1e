//! YAML error diagnostics pointing at the offending line

use miette::{Diagnostic, NamedSource, SourceSpan};
use serde::de::DeserializeOwned;
use std::path::Path;
use thiserror::Error;

/// A record file that does not parse, with the location of the problem
#[derive(Debug, Error, Diagnostic)]
#[error("{filename}: {message}")]
#[diagnostic(code(oficina::yaml::syntax))]
pub struct YamlSyntaxError {
    filename: String,

    #[source_code]
    src: NamedSource<String>,

    #[label("here")]
    span: SourceSpan,

    #[help]
    help: Option<String>,

    message: String,
}

impl YamlSyntaxError {
    pub fn from_serde_error(err: &serde_yml::Error, source: &str, filename: &str) -> Self {
        let (line, column) = err
            .location()
            .map(|loc| (loc.line(), loc.column()))
            .unwrap_or((1, 1));
        let offset = line_col_to_offset(source, line, column);
        let message = err.to_string();

        Self {
            filename: filename.to_string(),
            src: NamedSource::new(filename, source.to_string()),
            span: SourceSpan::from(offset..offset.saturating_add(1)),
            help: generate_help(&message),
            message,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum YamlError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] YamlSyntaxError),

    #[error("cannot read {path}: {source}")]
    #[diagnostic(code(oficina::yaml::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Read and parse a record file, reporting syntax or shape errors with a span
pub fn parse_record<T: DeserializeOwned>(path: &Path) -> Result<T, YamlError> {
    let source = std::fs::read_to_string(path).map_err(|source| YamlError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let filename = path
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    serde_yml::from_str(&source)
        .map_err(|e| YamlSyntaxError::from_serde_error(&e, &source, &filename).into())
}

/// Byte offset of a 1-based line and column
fn line_col_to_offset(source: &str, line: usize, column: usize) -> usize {
    let mut offset = 0;
    for (i, text) in source.split_inclusive('\n').enumerate() {
        if i + 1 == line {
            let col = column.saturating_sub(1);
            let within = text
                .char_indices()
                .nth(col)
                .map(|(b, _)| b)
                .unwrap_or(text.len().saturating_sub(1));
            return offset + within;
        }
        offset += text.len();
    }
    source.len().saturating_sub(1)
}

fn generate_help(message: &str) -> Option<String> {
    let msg = message.to_lowercase();

    if msg.contains("tab") {
        return Some("indent with spaces, not tabs".to_string());
    }
    if msg.contains("duplicate") {
        return Some("each field may appear only once".to_string());
    }
    if msg.contains("mapping values are not allowed") || msg.contains("expected block end") {
        return Some("check the indentation and the space after ':'".to_string());
    }
    if msg.contains("missing field") {
        return Some("a required field was removed; restore it or recreate the record".to_string());
    }
    if msg.contains("unknown variant") {
        return Some("use one of the values listed in the message".to_string());
    }
    if msg.contains("invalid type") {
        return Some("numbers must be plain (150.5), text may need quotes".to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Customer;

    #[test]
    fn test_line_col_to_offset() {
        let source = "line1\nline2\nline3";
        assert_eq!(line_col_to_offset(source, 1, 1), 0);
        assert_eq!(line_col_to_offset(source, 2, 1), 6);
        assert_eq!(line_col_to_offset(source, 3, 3), 14);
    }

    #[test]
    fn test_help_generation() {
        assert!(generate_help("found a tab character").is_some());
        assert!(generate_help("missing field `phone`").is_some());
        assert!(generate_help("something else").is_none());
    }

    #[test]
    fn test_parse_record_reports_missing_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("CLI-01J9Z3QK5V8M4T2R6W0XYB7CDE.yaml");
        std::fs::write(
            &path,
            "id: CLI-01J9Z3QK5V8M4T2R6W0XYB7CDE\nname: Maria\ndocument: '12345678909'\n",
        )
        .unwrap();

        match parse_record::<Customer>(&path) {
            Err(YamlError::Syntax(e)) => assert!(e.message().contains("missing field")),
            other => panic!("expected a syntax error, got {:?}", other.map(|c| c.name)),
        }
    }
}
