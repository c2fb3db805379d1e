//! Oficina: auto-repair shop management
//!
//! Customers, vehicles, staff, catalog, quotes (orçamentos), work orders
//! (OS), counter sales (PDV), appointments and checklists, each kept as a
//! plain YAML file under a project's `.oficina` directory.

pub mod cli;
pub mod core;
pub mod entities;
pub mod schema;
pub mod yaml;
