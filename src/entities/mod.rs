//! Record types
//!
//! **Registries:**
//! - [`Customer`], [`Vehicle`], [`Employee`]
//!
//! **Catalog:**
//! - [`ServiceItem`] - labor offered by the shop
//! - [`PartItem`] - stocked parts with quantity on hand
//!
//! **Documents:**
//! - [`Quote`] - orçamento, built from [`LineItems`]
//! - [`WorkOrder`] - OS, usually converted from an approved quote
//! - [`Sale`] - PDV counter sale
//!
//! **Scheduling and inspection:**
//! - [`Appointment`]
//! - [`ChecklistTemplate`] and [`Inspection`]

pub mod appointment;
pub mod catalog;
pub mod checklist;
pub mod customer;
pub mod employee;
pub mod line_items;
pub mod quote;
pub mod sale;
pub mod vehicle;
pub mod work_order;

pub use appointment::{Appointment, AppointmentStatus};
pub use catalog::{PartItem, ServiceItem};
pub use checklist::{Answer, AnswerValue, ChecklistItem, ChecklistTemplate, Inspection, ItemKind};
pub use customer::Customer;
pub use employee::{Employee, Role};
pub use line_items::{LineItems, PartInput, PartLine, ServiceInput, ServiceLine};
pub use quote::{Quote, QuoteStatus};
pub use sale::{PaymentMethod, Sale, SaleStatus};
pub use vehicle::Vehicle;
pub use work_order::{OrderStatus, WorkOrder};
