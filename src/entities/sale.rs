//! Counter sale entity (venda PDV)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::totals::{self, DiscountPolicy, Totals};
use crate::core::workflow::Lifecycle;
use crate::entities::line_items::PartLine;
use crate::schema::rules::{self, ValidationErrors};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Debit,
    Credit,
    Pix,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "cash"),
            PaymentMethod::Debit => write!(f, "debit"),
            PaymentMethod::Credit => write!(f, "credit"),
            PaymentMethod::Pix => write!(f, "pix"),
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cash" | "dinheiro" => Ok(PaymentMethod::Cash),
            "debit" | "debito" | "débito" => Ok(PaymentMethod::Debit),
            "credit" | "credito" | "crédito" => Ok(PaymentMethod::Credit),
            "pix" => Ok(PaymentMethod::Pix),
            _ => Err(format!(
                "Invalid payment method: {}. Use cash, debit, credit, or pix",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    #[default]
    Completed,
    Cancelled,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Completed => "completed",
            SaleStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Lifecycle for SaleStatus {
    const KIND: &'static str = "sale";

    fn allowed_transitions(&self) -> &'static [Self] {
        match self {
            SaleStatus::Completed => &[SaleStatus::Cancelled],
            SaleStatus::Cancelled => &[],
        }
    }

    fn is_editable(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: EntityId,

    /// Sequential receipt number
    pub number: u32,

    /// Walk-in sales may be anonymous
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<EntityId>,

    pub items: Vec<PartLine>,

    #[serde(default)]
    pub discount: f64,

    #[serde(default)]
    pub payment: PaymentMethod,

    /// Cash handed over; change is derived
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_received: Option<f64>,

    #[serde(default)]
    pub status: SaleStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,

    pub created: DateTime<Utc>,

    pub author: String,
}

impl Sale {
    pub fn new(number: u32, items: Vec<PartLine>, payment: PaymentMethod, author: String) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Vnd),
            number,
            customer: None,
            items,
            discount: 0.0,
            payment,
            amount_received: None,
            status: SaleStatus::Completed,
            cancelled_at: None,
            created: Utc::now(),
            author,
        }
    }

    /// Counter sales never go below zero
    pub fn totals(&self) -> Totals {
        const NO_SERVICES: [f64; 0] = [];
        totals::compute(
            &NO_SERVICES,
            &self.items,
            self.discount,
            DiscountPolicy::ClampAtZero,
        )
    }

    /// Change owed for cash payments
    pub fn change(&self) -> Option<f64> {
        match (self.payment, self.amount_received) {
            (PaymentMethod::Cash, Some(received)) => Some(received - self.totals().net_total),
            _ => None,
        }
    }

    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if self.items.is_empty() {
            errors.push("items", "Add at least one item to the sale");
        }
        for (i, line) in self.items.iter().enumerate() {
            errors.extend_nested(&format!("items[{}]", i), line.validate());
        }
        rules::require_non_negative(&mut errors, "discount", self.discount, "discount");

        if self.payment == PaymentMethod::Cash {
            if let Some(received) = self.amount_received {
                let net = self.totals().net_total;
                if received < net {
                    errors.push(
                        "amount_received",
                        format!(
                            "amount received ({:.2}) is less than the total ({:.2})",
                            received, net
                        ),
                    );
                }
            }
        }
        errors
    }
}

impl Entity for Sale {
    const PREFIX: EntityPrefix = EntityPrefix::Vnd;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn title(&self) -> String {
        format!("Venda #{}", self.number)
    }

    fn status(&self) -> &str {
        self.status.as_str()
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }

    fn author(&self) -> &str {
        &self.author
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: u32, quantity: u32, unit_price: f64) -> PartLine {
        PartLine {
            id,
            catalog: None,
            code: None,
            name: "Lâmpada H4".to_string(),
            quantity,
            unit_price,
        }
    }

    #[test]
    fn test_discount_clamps_at_zero() {
        let mut sale = Sale::new(1, vec![line(1, 1, 50.0)], PaymentMethod::Pix, "t".to_string());
        sale.discount = 80.0;

        let totals = sale.totals();
        assert_eq!(totals.gross_total, 50.0);
        assert_eq!(totals.net_total, 0.0);
        assert!(sale.validate().is_empty());
    }

    #[test]
    fn test_cash_change() {
        let mut sale = Sale::new(1, vec![line(1, 2, 17.5)], PaymentMethod::Cash, "t".to_string());
        sale.amount_received = Some(50.0);
        assert_eq!(sale.change(), Some(15.0));

        sale.amount_received = Some(20.0);
        assert!(sale.validate().has("amount_received"));
    }

    #[test]
    fn test_empty_sale_rejected() {
        let sale = Sale::new(1, Vec::new(), PaymentMethod::Debit, "t".to_string());
        assert!(sale.validate().has("items"));
        assert_eq!(sale.change(), None);
    }
}
