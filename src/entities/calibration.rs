//! Calibration entity - measuring equipment and its calibration cycle

use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::entity::{default_revision, Entity};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::numbering::SequenceFamily;

/// Whether the instrument may be used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentStatus {
    #[default]
    InService,
    OutOfService,
}

impl std::fmt::Display for EquipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EquipmentStatus::InService => write!(f, "in_service"),
            EquipmentStatus::OutOfService => write!(f, "out_of_service"),
        }
    }
}

/// Calibration state on a given day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationState {
    Valid,
    DueSoon,
    Overdue,
    OutOfService,
}

impl std::fmt::Display for CalibrationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalibrationState::Valid => write!(f, "valid"),
            CalibrationState::DueSoon => write!(f, "due_soon"),
            CalibrationState::Overdue => write!(f, "overdue"),
            CalibrationState::OutOfService => write!(f, "out_of_service"),
        }
    }
}

/// One past calibration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationEvent {
    pub date: NaiveDate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub laboratory: Option<String>,

    /// Whether the instrument passed
    #[serde(default = "default_approved")]
    pub approved: bool,
}

fn default_approved() -> bool {
    true
}

/// Errors from recording a calibration
#[derive(Debug, Error, PartialEq)]
pub enum CalibrationError {
    #[error("calibration date {date} is before the last calibration ({last})")]
    BeforeLast { date: NaiveDate, last: NaiveDate },
}

/// Calibrated instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Calibration {
    pub id: EntityId,

    /// Sequential number (e.g., "CAL-0012")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,

    /// Equipment tag stamped on the instrument (e.g., "PQ-014")
    pub equipment_tag: String,

    /// Instrument description (e.g., "Paquímetro digital 0-150 mm")
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Laboratory that performs the calibration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub laboratory: Option<String>,

    /// Certificate of the latest calibration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,

    pub last_calibration: NaiveDate,

    /// Calibration interval in calendar months
    pub interval_months: u32,

    #[serde(default)]
    pub status: EquipmentStatus,

    /// Earlier calibrations, oldest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<CalibrationEvent>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    pub created: DateTime<Utc>,

    pub author: String,

    #[serde(default = "default_revision")]
    pub revision: u32,
}

impl Entity for Calibration {
    const PREFIX: EntityPrefix = EntityPrefix::Cal;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn number(&self) -> Option<&str> {
        self.number.as_deref()
    }

    fn family(&self) -> SequenceFamily {
        SequenceFamily::Calibration
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn state(&self) -> String {
        self.status.to_string()
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }

    fn author(&self) -> &str {
        &self.author
    }
}

impl Calibration {
    pub fn new(
        equipment_tag: String,
        title: String,
        last_calibration: NaiveDate,
        interval_months: u32,
        author: String,
    ) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Cal),
            number: None,
            equipment_tag,
            title,
            manufacturer: None,
            serial_number: None,
            location: None,
            laboratory: None,
            certificate: None,
            last_calibration,
            interval_months,
            status: EquipmentStatus::default(),
            history: Vec::new(),
            tags: Vec::new(),
            created: Utc::now(),
            author,
            revision: 1,
        }
    }

    /// Date the next calibration is due (end-of-month clamped)
    pub fn next_due(&self) -> Option<NaiveDate> {
        self.last_calibration
            .checked_add_months(Months::new(self.interval_months))
    }

    /// Days until due; negative once overdue
    pub fn days_remaining(&self, today: NaiveDate) -> Option<i64> {
        self.next_due().map(|due| (due - today).num_days())
    }

    /// Classify the instrument on `today`.
    ///
    /// The due date itself still counts as valid use.
    pub fn state_on(&self, today: NaiveDate, warning_days: i64) -> CalibrationState {
        if self.status == EquipmentStatus::OutOfService {
            return CalibrationState::OutOfService;
        }
        match self.days_remaining(today) {
            Some(days) if days < 0 => CalibrationState::Overdue,
            Some(days) if days <= warning_days => CalibrationState::DueSoon,
            Some(_) => CalibrationState::Valid,
            None => CalibrationState::Overdue,
        }
    }

    /// Register a new calibration and restart the cycle.
    ///
    /// A failed calibration takes the instrument out of service.
    pub fn record(
        &mut self,
        date: NaiveDate,
        certificate: Option<String>,
        laboratory: Option<String>,
        approved: bool,
    ) -> Result<(), CalibrationError> {
        if date < self.last_calibration {
            return Err(CalibrationError::BeforeLast {
                date,
                last: self.last_calibration,
            });
        }

        self.history.push(CalibrationEvent {
            date: self.last_calibration,
            certificate: self.certificate.take(),
            laboratory: self.laboratory.clone(),
            approved: true,
        });

        self.last_calibration = date;
        self.certificate = certificate;
        if laboratory.is_some() {
            self.laboratory = laboratory;
        }
        self.status = if approved {
            EquipmentStatus::InService
        } else {
            EquipmentStatus::OutOfService
        };
        self.revision += 1;
        Ok(())
    }
}
