//! Line-item totals for quotes, work orders and counter sales
//!
//! A pure function of the current line items: totals are recomputed on
//! every call and never stored alongside the record.

use serde::Serialize;

/// How a discount larger than the gross total is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscountPolicy {
    /// Net total may go negative (quote and work-order screens)
    #[default]
    Unclamped,
    /// Net total never drops below zero (point of sale)
    ClampAtZero,
}

/// Anything that contributes a flat value to the service subtotal
pub trait ServiceAmount {
    fn value(&self) -> f64;
}

/// Anything that contributes `unit_price × quantity` to the part subtotal
pub trait PartAmount {
    fn unit_price(&self) -> f64;
    fn quantity(&self) -> u32;
}

/// Derived totals for a set of line items
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Totals {
    pub service_subtotal: f64,
    pub part_subtotal: f64,
    pub gross_total: f64,
    pub discount: f64,
    pub net_total: f64,
}

impl Totals {
    /// True when the discount is larger than what is being charged
    pub fn exceeds_gross(&self) -> bool {
        self.discount > self.gross_total
    }
}

/// Compute the four totals for services, parts and a flat discount
pub fn compute<S, P>(services: &[S], parts: &[P], discount: f64, policy: DiscountPolicy) -> Totals
where
    S: ServiceAmount,
    P: PartAmount,
{
    let service_subtotal: f64 = services.iter().map(|s| s.value()).sum();
    let part_subtotal: f64 = parts
        .iter()
        .map(|p| p.unit_price() * f64::from(p.quantity()))
        .sum();
    let gross_total = service_subtotal + part_subtotal;

    let net_total = match policy {
        DiscountPolicy::Unclamped => gross_total - discount,
        DiscountPolicy::ClampAtZero => (gross_total - discount).max(0.0),
    };

    Totals {
        service_subtotal,
        part_subtotal,
        gross_total,
        discount,
        net_total,
    }
}

impl ServiceAmount for f64 {
    fn value(&self) -> f64 {
        *self
    }
}

impl PartAmount for (f64, u32) {
    fn unit_price(&self) -> f64 {
        self.0
    }

    fn quantity(&self) -> u32 {
        self.1
    }
}
