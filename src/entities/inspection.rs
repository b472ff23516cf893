//! Inspection report entity - raw material, dimensional, NDT and painting

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::core::entity::{default_revision, Entity};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::numbering::SequenceFamily;
use crate::core::tolerance::{ToleranceRange, ToleranceSpec, Verdict};

/// Inspection discipline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum InspectionDiscipline {
    RawMaterial,
    Dimensional,
    Welding,
    LiquidPenetrant,
    Ultrasound,
    Painting,
}

impl InspectionDiscipline {
    pub fn all() -> &'static [InspectionDiscipline] {
        &[
            InspectionDiscipline::RawMaterial,
            InspectionDiscipline::Dimensional,
            InspectionDiscipline::Welding,
            InspectionDiscipline::LiquidPenetrant,
            InspectionDiscipline::Ultrasound,
            InspectionDiscipline::Painting,
        ]
    }

    /// Numbering family; the three NDT methods share one counter
    pub fn family(&self) -> SequenceFamily {
        match self {
            InspectionDiscipline::RawMaterial => SequenceFamily::RawMaterial,
            InspectionDiscipline::Dimensional => SequenceFamily::Dimensional,
            InspectionDiscipline::Welding
            | InspectionDiscipline::LiquidPenetrant
            | InspectionDiscipline::Ultrasound => SequenceFamily::Ndt,
            InspectionDiscipline::Painting => SequenceFamily::Painting,
        }
    }

    /// Detail keys usually filled for this discipline
    pub fn suggested_details(&self) -> &'static [&'static str] {
        match self {
            InspectionDiscipline::RawMaterial => &["heat_number", "material_grade", "mill_certificate"],
            InspectionDiscipline::Dimensional => &["instrument", "temperature"],
            InspectionDiscipline::Welding => &["wps", "welder", "process"],
            InspectionDiscipline::LiquidPenetrant => &["penetrant_batch", "developer_batch", "dwell_minutes"],
            InspectionDiscipline::Ultrasound => &["probe", "couplant", "calibration_block"],
            InspectionDiscipline::Painting => &["coating_system", "dft_microns", "humidity"],
        }
    }
}

impl std::fmt::Display for InspectionDiscipline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InspectionDiscipline::RawMaterial => write!(f, "raw_material"),
            InspectionDiscipline::Dimensional => write!(f, "dimensional"),
            InspectionDiscipline::Welding => write!(f, "welding"),
            InspectionDiscipline::LiquidPenetrant => write!(f, "liquid_penetrant"),
            InspectionDiscipline::Ultrasound => write!(f, "ultrasound"),
            InspectionDiscipline::Painting => write!(f, "painting"),
        }
    }
}

impl std::str::FromStr for InspectionDiscipline {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "raw_material" => Ok(InspectionDiscipline::RawMaterial),
            "dimensional" => Ok(InspectionDiscipline::Dimensional),
            "welding" => Ok(InspectionDiscipline::Welding),
            "liquid_penetrant" | "lp" => Ok(InspectionDiscipline::LiquidPenetrant),
            "ultrasound" | "us" => Ok(InspectionDiscipline::Ultrasound),
            "painting" => Ok(InspectionDiscipline::Painting),
            _ => Err(format!(
                "Invalid discipline: {}. Use raw_material, dimensional, welding, liquid_penetrant, ultrasound, or painting",
                s
            )),
        }
    }
}

/// One measured characteristic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
    /// What was measured (e.g., "Ø bore", "DFT")
    pub characteristic: String,

    #[serde(deserialize_with = "finite")]
    pub nominal: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance_a: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance_b: Option<String>,

    #[serde(deserialize_with = "finite")]
    pub measured: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// Stored outcome, refreshed by [`Measurement::evaluate`]
    pub result: Verdict,
}

/// Reject `.nan` and `.inf` coming from hand-edited files
fn finite<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = f64::deserialize(deserializer)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(serde::de::Error::custom(format!("{} is not a finite number", value)))
    }
}

impl Measurement {
    /// Build a measurement and evaluate it immediately
    pub fn new(
        characteristic: String,
        nominal: f64,
        tolerance_a: Option<String>,
        tolerance_b: Option<String>,
        measured: f64,
    ) -> Self {
        let mut m = Self {
            characteristic,
            nominal,
            tolerance_a,
            tolerance_b,
            measured,
            unit: None,
            result: Verdict::Conforme,
        };
        m.evaluate();
        m
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn tolerance(&self) -> ToleranceSpec {
        ToleranceSpec::from_strings(
            self.nominal,
            self.tolerance_a.as_deref(),
            self.tolerance_b.as_deref(),
        )
    }

    pub fn range(&self) -> ToleranceRange {
        self.tolerance().range()
    }

    /// Recompute and store the result
    pub fn evaluate(&mut self) -> Verdict {
        self.result = self.tolerance().classify(self.measured);
        self.result
    }
}

/// Inspection report status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectionStatus {
    #[default]
    Draft,
    Released,
}

impl std::fmt::Display for InspectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InspectionStatus::Draft => write!(f, "draft"),
            InspectionStatus::Released => write!(f, "released"),
        }
    }
}

/// Inspection report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionReport {
    pub id: EntityId,

    /// Sequential number (e.g., "DIM-0031", "END-0104")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,

    pub discipline: InspectionDiscipline,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drawing: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,

    /// Sales order or work order reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_ref: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inspector: Option<String>,

    pub inspection_date: NaiveDate,

    /// Discipline-specific fields (heat number, WPS, penetrant batch, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub measurements: Vec<Measurement>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default)]
    pub status: InspectionStatus,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    pub created: DateTime<Utc>,

    pub author: String,

    #[serde(default = "default_revision")]
    pub revision: u32,
}

impl Entity for InspectionReport {
    const PREFIX: EntityPrefix = EntityPrefix::Insp;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn number(&self) -> Option<&str> {
        self.number.as_deref()
    }

    fn family(&self) -> SequenceFamily {
        self.discipline.family()
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

impl InspectionReport {
    pub fn new(
        discipline: InspectionDiscipline,
        title: String,
        inspection_date: NaiveDate,
        author: String,
    ) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Insp),
            number: None,
            discipline,
            title,
            part_number: None,
            drawing: None,
            customer: None,
            order_ref: None,
            inspector: None,
            inspection_date,
            details: BTreeMap::new(),
            measurements: Vec::new(),
            notes: None,
            status: InspectionStatus::default(),
            tags: Vec::new(),
            created: Utc::now(),
            author,
            revision: 1,
        }
    }

    /// Append a measurement, evaluating it first. Returns its result.
    pub fn add_measurement(&mut self, mut measurement: Measurement) -> Verdict {
        let verdict = measurement.evaluate();
        self.measurements.push(measurement);
        verdict
    }

    /// Re-run every measurement against its tolerance.
    ///
    /// Returns how many stored results changed (hand-edited files).
    pub fn reevaluate(&mut self) -> usize {
        self.measurements
            .iter_mut()
            .map(|m| {
                let before = m.result;
                m.evaluate() != before
            })
            .filter(|changed| *changed)
            .count()
    }

    /// Overall result; `None` until something has been measured
    pub fn verdict(&self) -> Option<Verdict> {
        if self.measurements.is_empty() {
            return None;
        }
        if self.measurements.iter().any(|m| !m.result.is_conforming()) {
            Some(Verdict::NaoConforme)
        } else {
            Some(Verdict::Conforme)
        }
    }

    pub fn nonconforming(&self) -> Vec<&Measurement> {
        self.measurements
            .iter()
            .filter(|m| !m.result.is_conforming())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(discipline: InspectionDiscipline) -> InspectionReport {
        InspectionReport::new(
            discipline,
            "Flange lot 12".to_string(),
            NaiveDate::from_ymd_opt(2025, 5, 6).unwrap(),
            "inspector".to_string(),
        )
    }

    fn measure(nominal: f64, a: Option<&str>, b: Option<&str>, measured: f64) -> Measurement {
        Measurement::new(
            "Ø bore".to_string(),
            nominal,
            a.map(String::from),
            b.map(String::from),
            measured,
        )
    }

    #[test]
    fn test_discipline_family_mapping() {
        assert_eq!(InspectionDiscipline::Welding.family(), SequenceFamily::Ndt);
        assert_eq!(InspectionDiscipline::LiquidPenetrant.family(), SequenceFamily::Ndt);
        assert_eq!(InspectionDiscipline::Ultrasound.family(), SequenceFamily::Ndt);
        assert_eq!(InspectionDiscipline::Painting.family(), SequenceFamily::Painting);
        assert_eq!(InspectionDiscipline::RawMaterial.family(), SequenceFamily::RawMaterial);
        assert_eq!(report(InspectionDiscipline::Ultrasound).family(), SequenceFamily::Ndt);
    }

    #[test]
    fn test_discipline_parsing() {
        assert_eq!(
            "liquid-penetrant".parse::<InspectionDiscipline>().unwrap(),
            InspectionDiscipline::LiquidPenetrant
        );
        assert_eq!("US".parse::<InspectionDiscipline>().unwrap(), InspectionDiscipline::Ultrasound);
        assert!("xray".parse::<InspectionDiscipline>().is_err());
    }

    #[test]
    fn test_measurement_evaluates_on_entry() {
        let mut rep = report(InspectionDiscipline::Dimensional);
        assert_eq!(rep.verdict(), None);

        assert_eq!(
            rep.add_measurement(measure(10.0, Some("+0.1"), Some("-0.1"), 10.05)),
            Verdict::Conforme
        );
        assert_eq!(rep.verdict(), Some(Verdict::Conforme));

        assert_eq!(
            rep.add_measurement(measure(10.0, Some("0.2"), None, 10.3)),
            Verdict::NaoConforme
        );
        assert_eq!(rep.verdict(), Some(Verdict::NaoConforme));
        assert_eq!(rep.nonconforming().len(), 1);
    }

    #[test]
    fn test_no_tolerance_needs_exact_value() {
        let exact = measure(25.0, None, None, 25.0);
        assert_eq!(exact.result, Verdict::Conforme);
        let off = measure(25.0, Some("abc"), None, 25.01);
        assert_eq!(off.result, Verdict::NaoConforme);
    }

    #[test]
    fn test_reevaluate_fixes_stale_results() {
        let mut rep = report(InspectionDiscipline::Dimensional);
        rep.add_measurement(measure(50.0, Some("0.5"), None, 50.2));
        rep.measurements[0].result = Verdict::NaoConforme;

        assert_eq!(rep.reevaluate(), 1);
        assert_eq!(rep.measurements[0].result, Verdict::Conforme);
        assert_eq!(rep.reevaluate(), 0);
    }

    #[test]
    fn test_non_finite_values_rejected_on_load() {
        let yaml = "characteristic: bore\nnominal: 10.0\nmeasured: .nan\nresult: Conforme\n";
        let err = serde_yml::from_str::<Measurement>(yaml).unwrap_err();
        assert!(err.to_string().contains("not a finite number"));

        let yaml = "characteristic: bore\nnominal: -.inf\nmeasured: 10.0\nresult: Conforme\n";
        assert!(serde_yml::from_str::<Measurement>(yaml).is_err());

        let yaml = "characteristic: bore\nnominal: 10.0\nmeasured: 10.0\nresult: Conforme\n";
        assert_eq!(serde_yml::from_str::<Measurement>(yaml).unwrap().measured, 10.0);
    }

    #[test]
    fn test_result_serializes_in_portuguese() {
        let mut rep = report(InspectionDiscipline::Painting);
        rep.details.insert("coating_system".to_string(), "N-2677".to_string());
        rep.add_measurement(measure(120.0, Some("+40"), Some("-0"), 170.0).with_unit("µm"));

        let yaml = serde_yml::to_string(&rep).unwrap();
        assert!(yaml.contains("Não Conforme"));
        assert!(yaml.contains("discipline: painting"));

        let parsed: InspectionReport = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(parsed.verdict(), Some(Verdict::NaoConforme));
        assert_eq!(parsed.details.get("coating_system").map(String::as_str), Some("N-2677"));
    }
}
