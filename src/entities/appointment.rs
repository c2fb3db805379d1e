//! Appointment entity (agendamento)

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::workflow::Lifecycle;
use crate::schema::rules::{self, ValidationErrors};

pub const MIN_DURATION_MINUTES: u32 = 15;
pub const MAX_DURATION_MINUTES: u32 = 480;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no_show",
        }
    }

    /// Still holds its time slot
    pub fn blocks_slot(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Scheduled | AppointmentStatus::Confirmed
        )
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "scheduled" | "agendado" => Ok(AppointmentStatus::Scheduled),
            "confirmed" | "confirmado" => Ok(AppointmentStatus::Confirmed),
            "completed" | "concluido" => Ok(AppointmentStatus::Completed),
            "cancelled" | "canceled" | "cancelado" => Ok(AppointmentStatus::Cancelled),
            "no_show" | "faltou" => Ok(AppointmentStatus::NoShow),
            _ => Err(format!(
                "Invalid appointment status: {}. Use scheduled, confirmed, completed, cancelled, or no_show",
                s
            )),
        }
    }
}

impl Lifecycle for AppointmentStatus {
    const KIND: &'static str = "appointment";

    fn allowed_transitions(&self) -> &'static [Self] {
        match self {
            AppointmentStatus::Scheduled => &[
                AppointmentStatus::Confirmed,
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
                AppointmentStatus::NoShow,
            ],
            AppointmentStatus::Confirmed => &[
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
                AppointmentStatus::NoShow,
            ],
            _ => &[],
        }
    }

    fn is_editable(&self) -> bool {
        self.blocks_slot()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: EntityId,

    pub customer: EntityId,

    pub vehicle: EntityId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mechanic: Option<EntityId>,

    /// Local shop time
    pub starts_at: NaiveDateTime,

    pub duration_minutes: u32,

    /// What will be done, e.g. "Revisão 30.000 km"
    pub service: String,

    #[serde(default)]
    pub status: AppointmentStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub created: DateTime<Utc>,

    pub author: String,
}

impl Appointment {
    pub fn new(
        customer: EntityId,
        vehicle: EntityId,
        starts_at: NaiveDateTime,
        duration_minutes: u32,
        service: String,
        author: String,
    ) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Agd),
            customer,
            vehicle,
            mechanic: None,
            starts_at,
            duration_minutes,
            service,
            status: AppointmentStatus::Scheduled,
            notes: None,
            created: Utc::now(),
            author,
        }
    }

    pub fn ends_at(&self) -> NaiveDateTime {
        self.starts_at + Duration::minutes(i64::from(self.duration_minutes))
    }

    pub fn date(&self) -> NaiveDate {
        self.starts_at.date()
    }

    /// Half-open interval overlap
    pub fn overlaps(&self, other: &Appointment) -> bool {
        self.starts_at < other.ends_at() && other.starts_at < self.ends_at()
    }

    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        rules::require_text(&mut errors, "service", &self.service, "service description");
        if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&self.duration_minutes) {
            errors.push(
                "duration_minutes",
                format!(
                    "duration must be between {} and {} minutes",
                    MIN_DURATION_MINUTES, MAX_DURATION_MINUTES
                ),
            );
        }
        errors
    }
}

impl Entity for Appointment {
    const PREFIX: EntityPrefix = EntityPrefix::Agd;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn title(&self) -> String {
        format!("{} {}", self.starts_at.format("%d/%m %H:%M"), self.service)
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

    fn at(hour: u32, minute: u32, duration: u32) -> Appointment {
        let start = NaiveDate::from_ymd_opt(2026, 5, 4)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap();
        Appointment::new(
            EntityId::new(EntityPrefix::Cli),
            EntityId::new(EntityPrefix::Vei),
            start,
            duration,
            "Revisão".to_string(),
            "t".to_string(),
        )
    }

    #[test]
    fn test_overlap() {
        let a = at(9, 0, 60);
        assert!(a.overlaps(&at(9, 30, 30)));
        assert!(a.overlaps(&at(8, 30, 45)));
        assert!(!a.overlaps(&at(10, 0, 60)));
        assert!(!a.overlaps(&at(8, 0, 60)));
    }

    #[test]
    fn test_duration_bounds() {
        assert!(at(9, 0, 10).validate().has("duration_minutes"));
        assert!(at(9, 0, 481).validate().has("duration_minutes"));
        assert!(at(9, 0, 15).validate().is_empty());
        assert!(at(9, 0, 480).validate().is_empty());
    }

    #[test]
    fn test_ends_at() {
        let a = at(17, 30, 90);
        assert_eq!(a.ends_at().format("%H:%M").to_string(), "19:00");
    }
}
