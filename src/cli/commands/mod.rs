//! CLI command implementations

pub mod lines;
pub mod utils;

pub mod catalog;
pub mod checklist;
pub mod completions;
pub mod customer;
pub mod employee;
pub mod import;
pub mod init;
pub mod order;
pub mod pdv;
pub mod portal;
pub mod quote;
pub mod schedule;
pub mod status;
pub mod validate;
pub mod vehicle;
