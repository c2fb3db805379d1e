//! Record identity using type-prefixed ULIDs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use ulid::Ulid;

/// Record type prefixes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityPrefix {
    /// Customer (cliente)
    Cli,
    /// Vehicle (veículo)
    Vei,
    /// Employee (funcionário)
    Fun,
    /// Catalog service
    Svc,
    /// Catalog part (peça)
    Pec,
    /// Quote (orçamento)
    Orc,
    /// Work order (ordem de serviço)
    Os,
    /// Counter sale (venda PDV)
    Vnd,
    /// Appointment (agendamento)
    Agd,
    /// Checklist template
    Chk,
    /// Filled checklist (inspeção)
    Ins,
}

impl EntityPrefix {
    /// Get the string representation of the prefix
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityPrefix::Cli => "CLI",
            EntityPrefix::Vei => "VEI",
            EntityPrefix::Fun => "FUN",
            EntityPrefix::Svc => "SVC",
            EntityPrefix::Pec => "PEC",
            EntityPrefix::Orc => "ORC",
            EntityPrefix::Os => "OS",
            EntityPrefix::Vnd => "VND",
            EntityPrefix::Agd => "AGD",
            EntityPrefix::Chk => "CHK",
            EntityPrefix::Ins => "INS",
        }
    }

    /// Human-readable singular name used in CLI messages
    pub fn label(&self) -> &'static str {
        match self {
            EntityPrefix::Cli => "customer",
            EntityPrefix::Vei => "vehicle",
            EntityPrefix::Fun => "employee",
            EntityPrefix::Svc => "service",
            EntityPrefix::Pec => "part",
            EntityPrefix::Orc => "quote",
            EntityPrefix::Os => "work order",
            EntityPrefix::Vnd => "sale",
            EntityPrefix::Agd => "appointment",
            EntityPrefix::Chk => "checklist template",
            EntityPrefix::Ins => "inspection",
        }
    }

    /// Get all valid prefixes
    pub fn all() -> &'static [EntityPrefix] {
        &[
            EntityPrefix::Cli,
            EntityPrefix::Vei,
            EntityPrefix::Fun,
            EntityPrefix::Svc,
            EntityPrefix::Pec,
            EntityPrefix::Orc,
            EntityPrefix::Os,
            EntityPrefix::Vnd,
            EntityPrefix::Agd,
            EntityPrefix::Chk,
            EntityPrefix::Ins,
        ]
    }

    /// Try to determine the prefix from a filename like "ORC-01J....yaml"
    pub fn from_filename(filename: &str) -> Option<Self> {
        let upper = filename.to_uppercase();
        let (head, _) = upper.split_once('-')?;
        head.parse().ok()
    }

    /// Try to determine the prefix from a file path, falling back to the
    /// directory the file sits in
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        if let Some(filename) = path.file_name() {
            if let Some(prefix) = Self::from_filename(&filename.to_string_lossy()) {
                return Some(prefix);
            }
        }

        for component in path.components().rev() {
            if let std::path::Component::Normal(os_str) = component {
                let dir_name = os_str.to_string_lossy().to_lowercase();
                match dir_name.as_str() {
                    "clientes" => return Some(EntityPrefix::Cli),
                    "veiculos" => return Some(EntityPrefix::Vei),
                    "funcionarios" => return Some(EntityPrefix::Fun),
                    "servicos" => return Some(EntityPrefix::Svc),
                    "pecas" => return Some(EntityPrefix::Pec),
                    "orcamentos" => return Some(EntityPrefix::Orc),
                    "ordens" => return Some(EntityPrefix::Os),
                    "vendas" => return Some(EntityPrefix::Vnd),
                    "agenda" => return Some(EntityPrefix::Agd),
                    "modelos" => return Some(EntityPrefix::Chk),
                    "inspecoes" => return Some(EntityPrefix::Ins),
                    _ => {}
                }
            }
        }
        None
    }
}

impl fmt::Display for EntityPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityPrefix {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CLI" => Ok(EntityPrefix::Cli),
            "VEI" => Ok(EntityPrefix::Vei),
            "FUN" => Ok(EntityPrefix::Fun),
            "SVC" => Ok(EntityPrefix::Svc),
            "PEC" => Ok(EntityPrefix::Pec),
            "ORC" => Ok(EntityPrefix::Orc),
            "OS" => Ok(EntityPrefix::Os),
            "VND" => Ok(EntityPrefix::Vnd),
            "AGD" => Ok(EntityPrefix::Agd),
            "CHK" => Ok(EntityPrefix::Chk),
            "INS" => Ok(EntityPrefix::Ins),
            _ => Err(IdParseError::InvalidPrefix(s.to_string())),
        }
    }
}

/// A unique record identifier combining a type prefix and ULID
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    prefix: EntityPrefix,
    ulid: Ulid,
}

impl EntityId {
    /// Create a new EntityId with the given prefix
    pub fn new(prefix: EntityPrefix) -> Self {
        Self {
            prefix,
            ulid: Ulid::new(),
        }
    }

    pub fn prefix(&self) -> EntityPrefix {
        self.prefix
    }

    pub fn ulid(&self) -> Ulid {
        self.ulid
    }

    /// Parse an EntityId from a string
    pub fn parse(s: &str) -> Result<Self, IdParseError> {
        s.parse()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.prefix, self.ulid)
    }
}

impl FromStr for EntityId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix_str, ulid_str) = s
            .split_once('-')
            .ok_or_else(|| IdParseError::MissingDelimiter(s.to_string()))?;

        let prefix = prefix_str.parse()?;
        let ulid = Ulid::from_string(ulid_str)
            .map_err(|e| IdParseError::InvalidUlid(ulid_str.to_string(), e.to_string()))?;

        Ok(Self { prefix, ulid })
    }
}

impl Serialize for EntityId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors that can occur when parsing record IDs
#[derive(Debug, Error)]
pub enum IdParseError {
    #[error("invalid record prefix: '{0}' (valid: CLI, VEI, FUN, SVC, PEC, ORC, OS, VND, AGD, CHK, INS)")]
    InvalidPrefix(String),

    #[error("missing '-' delimiter in record ID: '{0}'")]
    MissingDelimiter(String),

    #[error("invalid ULID '{0}': {1}")]
    InvalidUlid(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_generation() {
        let id = EntityId::new(EntityPrefix::Orc);
        assert!(id.to_string().starts_with("ORC-"));
        assert_eq!(id.to_string().len(), 30); // ORC- (4) + ULID (26)
    }

    #[test]
    fn test_two_letter_prefix() {
        let id = EntityId::new(EntityPrefix::Os);
        assert!(id.to_string().starts_with("OS-"));
        let parsed = EntityId::parse(&id.to_string()).unwrap();
        assert_eq!(parsed.prefix(), EntityPrefix::Os);
    }

    #[test]
    fn test_entity_id_roundtrip() {
        let original = EntityId::new(EntityPrefix::Cli);
        let parsed = EntityId::parse(&original.to_string()).unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_entity_id_invalid_prefix() {
        let err = EntityId::parse("XXX-01HQ3K4N5M6P7R8S9T0UVWXYZ").unwrap_err();
        assert!(matches!(err, IdParseError::InvalidPrefix(_)));
    }

    #[test]
    fn test_entity_id_missing_delimiter() {
        let err = EntityId::parse("CLI01HQ3K4N5M6P7R8S9T0UVWXYZ").unwrap_err();
        assert!(matches!(err, IdParseError::MissingDelimiter(_)));
    }

    #[test]
    fn test_entity_id_invalid_ulid() {
        let err = EntityId::parse("VEI-notaulid").unwrap_err();
        assert!(matches!(err, IdParseError::InvalidUlid(_, _)));
    }

    #[test]
    fn test_all_prefixes_parse() {
        for prefix in EntityPrefix::all() {
            let id = EntityId::new(*prefix);
            let parsed = EntityId::parse(&id.to_string()).unwrap();
            assert_eq!(parsed.prefix(), *prefix);
        }
    }

    #[test]
    fn test_prefix_from_path() {
        let path = std::path::Path::new("orcamentos/ORC-01HQ3K4N5M6P7R8S9T0UVWXYZA.yaml");
        assert_eq!(EntityPrefix::from_path(path), Some(EntityPrefix::Orc));

        let path = std::path::Path::new("checklists/inspecoes/record.yaml");
        assert_eq!(EntityPrefix::from_path(path), Some(EntityPrefix::Ins));

        let path = std::path::Path::new("notes/readme.yaml");
        assert_eq!(EntityPrefix::from_path(path), None);
    }
}
