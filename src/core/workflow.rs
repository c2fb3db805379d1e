//! Status transitions for quotes, work orders, appointments and sales
//!
//! Each status enum lists the states it may move to. Anything outside
//! that table is rejected before a record is written.

use chrono::NaiveDate;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum WorkflowError {
    #[error("invalid {kind} status transition: {from} -> {to} (allowed: {allowed})")]
    InvalidTransition {
        kind: &'static str,
        from: String,
        to: String,
        allowed: String,
    },

    #[error("{kind} cannot be edited while {status}")]
    NotEditable { kind: &'static str, status: String },

    #[error("quote expired on {0}; run 'oficina quote renew' before approving")]
    Expired(NaiveDate),
}

/// A status enum with a fixed transition table
pub trait Lifecycle: Copy + PartialEq + fmt::Display + 'static {
    /// Record type name used in error messages
    const KIND: &'static str;

    /// States reachable from `self`
    fn allowed_transitions(&self) -> &'static [Self];

    /// Whether line items and header fields may change in this state
    fn is_editable(&self) -> bool;

    fn can_transition(&self, to: Self) -> bool {
        self.allowed_transitions().contains(&to)
    }
}

/// Validate a status change, returning the new state
pub fn transition<S: Lifecycle>(from: S, to: S) -> Result<S, WorkflowError> {
    if from.can_transition(to) {
        return Ok(to);
    }

    let allowed = from.allowed_transitions();
    Err(WorkflowError::InvalidTransition {
        kind: S::KIND,
        from: from.to_string(),
        to: to.to_string(),
        allowed: if allowed.is_empty() {
            "none, final state".to_string()
        } else {
            allowed
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        },
    })
}

/// Fail unless the record may still be edited
pub fn ensure_editable<S: Lifecycle>(status: S) -> Result<(), WorkflowError> {
    if status.is_editable() {
        Ok(())
    } else {
        Err(WorkflowError::NotEditable {
            kind: S::KIND,
            status: status.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::appointment::AppointmentStatus;
    use crate::entities::quote::QuoteStatus;
    use crate::entities::sale::SaleStatus;
    use crate::entities::work_order::OrderStatus;

    #[test]
    fn test_quote_transitions() {
        assert!(transition(QuoteStatus::Pending, QuoteStatus::Approved).is_ok());
        assert!(transition(QuoteStatus::Rejected, QuoteStatus::Pending).is_ok());
        assert!(transition(QuoteStatus::Approved, QuoteStatus::ConvertedToOrder).is_ok());

        let err = transition(QuoteStatus::Pending, QuoteStatus::ConvertedToOrder).unwrap_err();
        assert!(err.to_string().contains("pending -> converted"));
    }

    #[test]
    fn test_converted_quote_is_final() {
        let err = transition(QuoteStatus::ConvertedToOrder, QuoteStatus::Pending).unwrap_err();
        assert!(err.to_string().contains("final state"));
    }

    #[test]
    fn test_order_transitions() {
        assert!(transition(OrderStatus::Open, OrderStatus::InProgress).is_ok());
        assert!(transition(OrderStatus::InProgress, OrderStatus::WaitingParts).is_ok());
        assert!(transition(OrderStatus::WaitingParts, OrderStatus::InProgress).is_ok());
        assert!(transition(OrderStatus::Completed, OrderStatus::Delivered).is_ok());
        assert!(transition(OrderStatus::Completed, OrderStatus::InProgress).is_ok());

        assert!(transition(OrderStatus::Open, OrderStatus::Delivered).is_err());
        assert!(transition(OrderStatus::Delivered, OrderStatus::Open).is_err());
        assert!(transition(OrderStatus::Cancelled, OrderStatus::Open).is_err());
    }

    #[test]
    fn test_editable_states() {
        assert!(ensure_editable(QuoteStatus::Pending).is_ok());
        assert!(ensure_editable(QuoteStatus::Approved).is_err());
        assert!(ensure_editable(OrderStatus::WaitingParts).is_ok());
        assert!(ensure_editable(OrderStatus::Completed).is_err());
    }

    #[test]
    fn test_appointment_and_sale_transitions() {
        assert!(transition(AppointmentStatus::Scheduled, AppointmentStatus::NoShow).is_ok());
        assert!(transition(AppointmentStatus::Confirmed, AppointmentStatus::Scheduled).is_err());
        assert!(transition(SaleStatus::Completed, SaleStatus::Cancelled).is_ok());
        assert!(transition(SaleStatus::Cancelled, SaleStatus::Completed).is_err());
    }
}
