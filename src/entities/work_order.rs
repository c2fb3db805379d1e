//! Work order entity (OS - ordem de serviço)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::workflow::Lifecycle;
use crate::entities::line_items::LineItems;
use crate::schema::rules::ValidationErrors;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Open,
    InProgress,
    /// Stopped until ordered parts arrive
    WaitingParts,
    Completed,
    /// Vehicle handed back to the customer
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Open => "open",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::WaitingParts => "waiting_parts",
            OrderStatus::Completed => "completed",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn all() -> &'static [OrderStatus] {
        &[
            OrderStatus::Open,
            OrderStatus::InProgress,
            OrderStatus::WaitingParts,
            OrderStatus::Completed,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ]
    }

    /// Still occupying the shop floor
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            OrderStatus::Open | OrderStatus::InProgress | OrderStatus::WaitingParts
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "open" | "aberta" => Ok(OrderStatus::Open),
            "in_progress" | "em_andamento" => Ok(OrderStatus::InProgress),
            "waiting_parts" | "aguardando_pecas" => Ok(OrderStatus::WaitingParts),
            "completed" | "concluida" => Ok(OrderStatus::Completed),
            "delivered" | "entregue" => Ok(OrderStatus::Delivered),
            "cancelled" | "canceled" | "cancelada" => Ok(OrderStatus::Cancelled),
            _ => Err(format!(
                "Invalid order status: {}. Use open, in_progress, waiting_parts, completed, delivered, or cancelled",
                s
            )),
        }
    }
}

impl Lifecycle for OrderStatus {
    const KIND: &'static str = "work order";

    fn allowed_transitions(&self) -> &'static [Self] {
        match self {
            OrderStatus::Open => &[OrderStatus::InProgress, OrderStatus::Cancelled],
            OrderStatus::InProgress => &[
                OrderStatus::WaitingParts,
                OrderStatus::Completed,
                OrderStatus::Cancelled,
            ],
            OrderStatus::WaitingParts => &[OrderStatus::InProgress, OrderStatus::Cancelled],
            OrderStatus::Completed => &[OrderStatus::Delivered, OrderStatus::InProgress],
            OrderStatus::Delivered | OrderStatus::Cancelled => &[],
        }
    }

    fn is_editable(&self) -> bool {
        self.is_active()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOrder {
    pub id: EntityId,

    /// Sequential human number (OS #7)
    pub number: u32,

    /// Quote this order was converted from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<EntityId>,

    pub customer: EntityId,

    pub vehicle: EntityId,

    /// Responsible mechanic or electrician
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mechanic: Option<EntityId>,

    /// Odometer at check-in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mileage: Option<u32>,

    /// What the customer reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complaint: Option<String>,

    #[serde(flatten)]
    pub items: LineItems,

    #[serde(default)]
    pub status: OrderStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub created: DateTime<Utc>,

    pub author: String,
}

impl WorkOrder {
    pub fn new(
        number: u32,
        customer: EntityId,
        vehicle: EntityId,
        items: LineItems,
        author: String,
    ) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Os),
            number,
            quote: None,
            customer,
            vehicle,
            mechanic: None,
            mileage: None,
            complaint: None,
            items,
            status: OrderStatus::Open,
            started_at: None,
            completed_at: None,
            delivered_at: None,
            notes: None,
            created: Utc::now(),
            author,
        }
    }

    /// Stamp the time of a status change
    pub fn stamp(&mut self, status: OrderStatus, at: DateTime<Utc>) {
        match status {
            OrderStatus::InProgress if self.started_at.is_none() => self.started_at = Some(at),
            OrderStatus::Completed => self.completed_at = Some(at),
            OrderStatus::Delivered => self.delivered_at = Some(at),
            _ => {}
        }
    }

    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if self.customer.prefix() != EntityPrefix::Cli {
            errors.push("customer", "customer is required");
        }
        if self.vehicle.prefix() != EntityPrefix::Vei {
            errors.push("vehicle", "vehicle is required");
        }
        if let Some(m) = &self.mechanic {
            if m.prefix() != EntityPrefix::Fun {
                errors.push("mechanic", "mechanic must be an employee (FUN-...)");
            }
        }
        for e in self.items.validate().errors() {
            errors.push(e.field.clone(), e.message.clone());
        }
        errors
    }
}

impl Entity for WorkOrder {
    const PREFIX: EntityPrefix = EntityPrefix::Os;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn title(&self) -> String {
        format!("OS #{}", self.number)
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

    #[test]
    fn test_status_parse_accepts_dashes_and_portuguese() {
        assert_eq!("in-progress".parse::<OrderStatus>().unwrap(), OrderStatus::InProgress);
        assert_eq!("aguardando_pecas".parse::<OrderStatus>().unwrap(), OrderStatus::WaitingParts);
        assert!("done".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_stamp_keeps_first_start() {
        let mut order = WorkOrder::new(
            1,
            EntityId::new(EntityPrefix::Cli),
            EntityId::new(EntityPrefix::Vei),
            LineItems::new(),
            "test".to_string(),
        );
        let first = Utc::now();
        order.stamp(OrderStatus::InProgress, first);
        order.stamp(OrderStatus::InProgress, first + chrono::Duration::hours(2));
        assert_eq!(order.started_at, Some(first));

        order.stamp(OrderStatus::Completed, first);
        assert_eq!(order.completed_at, Some(first));
    }

    #[test]
    fn test_empty_order_fails_validation() {
        let order = WorkOrder::new(
            1,
            EntityId::new(EntityPrefix::Cli),
            EntityId::new(EntityPrefix::Vei),
            LineItems::new(),
            "test".to_string(),
        );
        assert!(order.validate().has("items"));
    }
}
