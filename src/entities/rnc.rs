//! RNC entity - Relatório de Não Conformidade (non-conformance report)

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::entity::{default_revision, Entity};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::numbering::SequenceFamily;

/// Where the non-conformance originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RncOrigin {
    /// Found in our own production
    #[default]
    Internal,
    /// Caused by a supplier
    Supplier,
    /// Reported by a customer
    Customer,
}

impl std::fmt::Display for RncOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RncOrigin::Internal => write!(f, "internal"),
            RncOrigin::Supplier => write!(f, "supplier"),
            RncOrigin::Customer => write!(f, "customer"),
        }
    }
}

impl std::str::FromStr for RncOrigin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "internal" => Ok(RncOrigin::Internal),
            "supplier" => Ok(RncOrigin::Supplier),
            "customer" => Ok(RncOrigin::Customer),
            _ => Err(format!(
                "Invalid RNC origin: {}. Use internal, supplier, or customer",
                s
            )),
        }
    }
}

/// Severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Minor,
    Major,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Minor => write!(f, "minor"),
            Severity::Major => write!(f, "major"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "minor" => Ok(Severity::Minor),
            "major" => Ok(Severity::Major),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!(
                "Invalid severity: {}. Use minor, major, or critical",
                s
            )),
        }
    }
}

/// Category of the non-conformance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RncCategory {
    #[default]
    Dimensional,
    Material,
    Welding,
    Coating,
    Documentation,
    Process,
    Packaging,
}

impl RncCategory {
    pub const NAMES: [&'static str; 7] = [
        "dimensional",
        "material",
        "welding",
        "coating",
        "documentation",
        "process",
        "packaging",
    ];
}

impl std::fmt::Display for RncCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RncCategory::Dimensional => write!(f, "dimensional"),
            RncCategory::Material => write!(f, "material"),
            RncCategory::Welding => write!(f, "welding"),
            RncCategory::Coating => write!(f, "coating"),
            RncCategory::Documentation => write!(f, "documentation"),
            RncCategory::Process => write!(f, "process"),
            RncCategory::Packaging => write!(f, "packaging"),
        }
    }
}

impl std::str::FromStr for RncCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dimensional" => Ok(RncCategory::Dimensional),
            "material" => Ok(RncCategory::Material),
            "welding" => Ok(RncCategory::Welding),
            "coating" => Ok(RncCategory::Coating),
            "documentation" => Ok(RncCategory::Documentation),
            "process" => Ok(RncCategory::Process),
            "packaging" => Ok(RncCategory::Packaging),
            _ => Err(format!(
                "Invalid RNC category: {}. Use {}",
                s,
                Self::NAMES.join(", ")
            )),
        }
    }
}

/// Detection stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStage {
    /// Receiving inspection
    Incoming,
    /// In-process inspection
    #[default]
    InProcess,
    /// Final inspection
    Final,
    /// At the customer
    Customer,
}

/// Detection information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Detection {
    #[serde(default)]
    pub found_at: DetectionStage,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub found_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub found_date: Option<NaiveDate>,
}

/// Affected items information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AffectedItems {
    /// Part or drawing number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_number: Option<String>,

    /// Lot / heat number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity_affected: Option<u32>,
}

/// Defect description
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Defect {
    /// Characteristic affected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub characteristic: Option<String>,

    /// Specification/tolerance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specification: Option<String>,

    /// Actual measured value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

/// Containment action
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainmentAction {
    pub action: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_by: Option<String>,

    #[serde(default)]
    pub done: bool,
}

/// Disposition decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispositionDecision {
    UseAsIs,
    Rework,
    Scrap,
    ReturnToSupplier,
}

impl std::fmt::Display for DispositionDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispositionDecision::UseAsIs => write!(f, "use_as_is"),
            DispositionDecision::Rework => write!(f, "rework"),
            DispositionDecision::Scrap => write!(f, "scrap"),
            DispositionDecision::ReturnToSupplier => write!(f, "return_to_supplier"),
        }
    }
}

impl std::str::FromStr for DispositionDecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "use_as_is" => Ok(DispositionDecision::UseAsIs),
            "rework" => Ok(DispositionDecision::Rework),
            "scrap" => Ok(DispositionDecision::Scrap),
            "return_to_supplier" => Ok(DispositionDecision::ReturnToSupplier),
            _ => Err(format!(
                "Invalid disposition: {}. Use use_as_is, rework, scrap, or return_to_supplier",
                s
            )),
        }
    }
}

/// Disposition information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Disposition {
    pub decision: DispositionDecision,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
}

/// RNC workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RncStatus {
    #[default]
    Open,
    Analysis,
    Action,
    Closed,
}

impl std::fmt::Display for RncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RncStatus::Open => write!(f, "open"),
            RncStatus::Analysis => write!(f, "analysis"),
            RncStatus::Action => write!(f, "action"),
            RncStatus::Closed => write!(f, "closed"),
        }
    }
}

/// Links to other records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RncLinks {
    /// Inspection report that found the problem
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inspection: Option<EntityId>,

    /// Corrective-action plan opened for it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_plan: Option<EntityId>,
}

/// Errors from closing a report
#[derive(Debug, Error, PartialEq)]
pub enum RncError {
    #[error("{0} is already closed")]
    AlreadyClosed(String),

    #[error("{0} has no disposition; record one before closing")]
    NoDisposition(String),
}

/// Non-conformance report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rnc {
    pub id: EntityId,

    /// Sequential number (e.g., "RNC-0042")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub origin: RncOrigin,

    #[serde(default)]
    pub severity: Severity,

    #[serde(default)]
    pub category: RncCategory,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection: Option<Detection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected_items: Option<AffectedItems>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defect: Option<Defect>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub containment: Vec<ContainmentAction>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disposition: Option<Disposition>,

    #[serde(default)]
    pub status: RncStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_by: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default)]
    pub links: RncLinks,

    pub created: DateTime<Utc>,

    pub author: String,

    #[serde(default = "default_revision")]
    pub revision: u32,
}

impl Entity for Rnc {
    const PREFIX: EntityPrefix = EntityPrefix::Rnc;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn number(&self) -> Option<&str> {
        self.number.as_deref()
    }

    fn family(&self) -> SequenceFamily {
        SequenceFamily::Rnc
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

impl Rnc {
    /// Create a new RNC with the given parameters
    pub fn new(title: String, origin: RncOrigin, severity: Severity, author: String) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Rnc),
            number: None,
            title,
            description: None,
            origin,
            severity,
            category: RncCategory::default(),
            report_date: Some(chrono::Local::now().date_naive()),
            detection: None,
            affected_items: None,
            defect: None,
            containment: Vec::new(),
            disposition: None,
            status: RncStatus::default(),
            closed_date: None,
            closed_by: None,
            tags: Vec::new(),
            links: RncLinks::default(),
            created: Utc::now(),
            author,
            revision: 1,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.status == RncStatus::Closed
    }

    /// Close the report.
    ///
    /// Fails if it is already closed or no disposition was recorded.
    pub fn close(&mut self, by: String, date: NaiveDate) -> Result<(), RncError> {
        if self.is_closed() {
            return Err(RncError::AlreadyClosed(self.display_ref()));
        }
        if self.disposition.is_none() {
            return Err(RncError::NoDisposition(self.display_ref()));
        }
        self.status = RncStatus::Closed;
        self.closed_by = Some(by);
        self.closed_date = Some(date);
        self.revision += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Rnc {
        Rnc::new(
            "Bore diameter out of tolerance".to_string(),
            RncOrigin::Internal,
            Severity::Minor,
            "test".to_string(),
        )
    }

    #[test]
    fn test_rnc_creation() {
        let rnc = sample();
        assert!(rnc.id.to_string().starts_with("RNC-"));
        assert_eq!(rnc.status, RncStatus::Open);
        assert!(rnc.number.is_none());
        assert_eq!(rnc.display_ref(), rnc.id.to_string());
    }

    #[test]
    fn test_rnc_yaml_keeps_number() {
        let mut rnc = sample();
        rnc.number = Some("RNC-0007".to_string());

        let yaml = serde_yml::to_string(&rnc).unwrap();
        assert!(yaml.contains("number: RNC-0007"));

        let parsed: Rnc = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(parsed.number(), Some("RNC-0007"));
        assert_eq!(parsed.display_ref(), "RNC-0007");
    }

    #[test]
    fn test_close_requires_disposition() {
        let mut rnc = sample();
        let today = NaiveDate::from_ymd_opt(2025, 4, 2).unwrap();
        assert!(matches!(
            rnc.close("qa".to_string(), today),
            Err(RncError::NoDisposition(_))
        ));

        rnc.disposition = Some(Disposition {
            decision: DispositionDecision::Rework,
            decision_date: Some(today),
            decision_by: None,
            justification: None,
        });
        rnc.close("qa".to_string(), today).unwrap();
        assert!(rnc.is_closed());
        assert_eq!(rnc.revision, 2);
        assert!(matches!(
            rnc.close("qa".to_string(), today),
            Err(RncError::AlreadyClosed(_))
        ));
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("supplier".parse::<RncOrigin>().unwrap(), RncOrigin::Supplier);
        assert_eq!("CRITICAL".parse::<Severity>().unwrap(), Severity::Critical);
        assert_eq!("coating".parse::<RncCategory>().unwrap(), RncCategory::Coating);
        assert_eq!(
            "use-as-is".parse::<DispositionDecision>().unwrap(),
            DispositionDecision::UseAsIs
        );
        assert!("bogus".parse::<RncCategory>().is_err());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::Major);
        assert!(Severity::Major > Severity::Minor);
    }
}
