//! Sequence families and store-backed number allocation
//!
//! Ties the pure allocator in [`crate::core::sequence`] to the project store:
//! each family knows its default format and where its records live, and the
//! project implements [`NumberSource`] by scanning those records.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::core::config::Config;
use crate::core::identity::EntityPrefix;
use crate::core::project::Project;
use crate::core::sequence::{allocate_from, NumberSource, SequenceFormat};

/// A group of records sharing one numbering counter
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum SequenceFamily {
    /// Non-conformance reports (RNC-####)
    Rnc,
    /// Calibration records (CAL-####)
    Calibration,
    /// Raw-material inspection reports (MP-####)
    RawMaterial,
    /// Dimensional inspection reports (DIM-####)
    Dimensional,
    /// Welding, liquid-penetrant and ultrasound reports (END-####, shared)
    Ndt,
    /// Painting inspection reports (PIN-####)
    Painting,
    /// Lessons learned (LA-YYYY-###)
    Lesson,
    /// Corrective-action plans (PA-####)
    ActionPlan,
    /// Sales quotations (ORC-####)
    Quote,
    /// Sales orders (PED-####)
    Order,
}

impl SequenceFamily {
    pub fn all() -> &'static [SequenceFamily] {
        &[
            SequenceFamily::Rnc,
            SequenceFamily::Calibration,
            SequenceFamily::RawMaterial,
            SequenceFamily::Dimensional,
            SequenceFamily::Ndt,
            SequenceFamily::Painting,
            SequenceFamily::Lesson,
            SequenceFamily::ActionPlan,
            SequenceFamily::Quote,
            SequenceFamily::Order,
        ]
    }

    /// Key used in config files and on the command line
    pub fn key(&self) -> &'static str {
        match self {
            SequenceFamily::Rnc => "rnc",
            SequenceFamily::Calibration => "calibration",
            SequenceFamily::RawMaterial => "raw-material",
            SequenceFamily::Dimensional => "dimensional",
            SequenceFamily::Ndt => "ndt",
            SequenceFamily::Painting => "painting",
            SequenceFamily::Lesson => "lesson",
            SequenceFamily::ActionPlan => "action-plan",
            SequenceFamily::Quote => "quote",
            SequenceFamily::Order => "order",
        }
    }

    /// Built-in numbering convention
    pub fn default_format(&self) -> SequenceFormat {
        match self {
            SequenceFamily::Rnc => SequenceFormat::new("RNC-", 4),
            SequenceFamily::Calibration => SequenceFormat::new("CAL-", 4),
            SequenceFamily::RawMaterial => SequenceFormat::new("MP-", 4),
            SequenceFamily::Dimensional => SequenceFormat::new("DIM-", 4),
            SequenceFamily::Ndt => SequenceFormat::new("END-", 4),
            SequenceFamily::Painting => SequenceFormat::new("PIN-", 4),
            SequenceFamily::Lesson => SequenceFormat::year_scoped("LA-", 3),
            SequenceFamily::ActionPlan => SequenceFormat::new("PA-", 4),
            SequenceFamily::Quote => SequenceFormat::new("ORC-", 4),
            SequenceFamily::Order => SequenceFormat::new("PED-", 4),
        }
    }

    /// Default format with any configured overrides applied
    pub fn format(&self, config: &Config) -> SequenceFormat {
        let mut format = self.default_format();
        if let Some(over) = config.numbering_for(self.key()) {
            if let Some(ref prefix) = over.prefix {
                format.prefix = prefix.clone();
            }
            if let Some(width) = over.width {
                format.pad_width = width;
            }
            if let Some(floor) = over.floor {
                format.floor = floor;
            }
        }
        format
    }

    /// Record type whose files carry this family's numbers
    pub fn record_prefix(&self) -> EntityPrefix {
        match self {
            SequenceFamily::Rnc => EntityPrefix::Rnc,
            SequenceFamily::Calibration => EntityPrefix::Cal,
            SequenceFamily::RawMaterial
            | SequenceFamily::Dimensional
            | SequenceFamily::Ndt
            | SequenceFamily::Painting => EntityPrefix::Insp,
            SequenceFamily::Lesson => EntityPrefix::Lsn,
            SequenceFamily::ActionPlan => EntityPrefix::Plan,
            SequenceFamily::Quote => EntityPrefix::Quot,
            SequenceFamily::Order => EntityPrefix::Ord,
        }
    }
}

impl fmt::Display for SequenceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for SequenceFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_lowercase().replace('_', "-");
        Self::all()
            .iter()
            .copied()
            .find(|f| f.key() == normalized)
            .ok_or_else(|| {
                let keys: Vec<&str> = Self::all().iter().map(|f| f.key()).collect();
                format!("Unknown sequence family: {}. Use one of: {}", s, keys.join(", "))
            })
    }
}

/// Errors reading numbers from the store
#[derive(Debug, Error)]
pub enum NumberSourceError {
    #[error("failed to read {path:?}: {message}")]
    Io { path: PathBuf, message: String },
}

/// Only the field the allocator needs; everything else in the file is ignored
#[derive(Deserialize)]
struct NumberProbe {
    #[serde(default)]
    number: Option<String>,
}

impl NumberSource<SequenceFamily> for Project {
    type Error = NumberSourceError;

    fn existing_numbers(&self, family: &SequenceFamily) -> Result<Vec<String>, Self::Error> {
        let mut numbers = Vec::new();

        for path in self.iter_entity_files(family.record_prefix()) {
            let content = std::fs::read_to_string(&path).map_err(|e| NumberSourceError::Io {
                path: path.clone(),
                message: e.to_string(),
            })?;

            match serde_yml::from_str::<NumberProbe>(&content) {
                Ok(NumberProbe { number: Some(n) }) => numbers.push(n),
                Ok(NumberProbe { number: None }) => {}
                Err(e) => tracing::warn!("Skipping unreadable record {}: {}", path.display(), e),
            }
        }

        tracing::debug!(
            family = family.key(),
            count = numbers.len(),
            "Scanned existing numbers"
        );
        Ok(numbers)
    }
}

/// Allocate the next number for `family` from whatever `source` holds.
///
/// Year-scoped families take their year from `today`.
pub fn next_number<N>(
    source: &N,
    family: SequenceFamily,
    config: &Config,
    today: NaiveDate,
) -> Result<String, N::Error>
where
    N: NumberSource<SequenceFamily> + ?Sized,
{
    let format = family.format(config).for_year(today.year());
    let number = allocate_from(source, &family, &format)?;
    tracing::debug!(family = family.key(), %number, "Allocated number");
    Ok(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::EntityId;
    use tempfile::tempdir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_family_keys_roundtrip() {
        for family in SequenceFamily::all() {
            assert_eq!(family.key().parse::<SequenceFamily>().unwrap(), *family);
        }
        assert_eq!(
            "RAW_MATERIAL".parse::<SequenceFamily>().unwrap(),
            SequenceFamily::RawMaterial
        );
        assert!("welding".parse::<SequenceFamily>().is_err());
    }

    #[test]
    fn test_config_overrides_format() {
        let config =
            Config::from_yaml("numbering:\n  quote:\n    prefix: \"COT-\"\n    floor: 500\n").unwrap();
        let format = SequenceFamily::Quote.format(&config);
        assert_eq!(format.prefix, "COT-");
        assert_eq!(format.pad_width, 4);
        assert_eq!(format.floor, 500);
    }

    #[test]
    fn test_next_number_from_memory() {
        let existing = vec!["RNC-0003".to_string(), "RNC-0001".to_string()];
        let next = next_number(&existing, SequenceFamily::Rnc, &Config::default(), date(2025, 3, 1));
        assert_eq!(next.unwrap(), "RNC-0004");
    }

    #[test]
    fn test_lesson_numbers_restart_each_year() {
        let existing = vec!["LA-2024-009".to_string(), "LA-2025-001".to_string()];
        let config = Config::default();

        let this_year = next_number(&existing, SequenceFamily::Lesson, &config, date(2025, 6, 1));
        assert_eq!(this_year.unwrap(), "LA-2025-002");

        let next_year = next_number(&existing, SequenceFamily::Lesson, &config, date(2026, 1, 2));
        assert_eq!(next_year.unwrap(), "LA-2026-001");
    }

    #[test]
    fn test_project_source_reads_number_fields() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        let dir = project.entity_dir(EntityPrefix::Rnc);

        for (i, body) in [
            "number: RNC-0004\ntitle: a\n",
            "number: RNC-0011\ntitle: b\n",
            "title: no number yet\n",
            ": not yaml : [",
        ]
        .iter()
        .enumerate()
        {
            let id = EntityId::new(EntityPrefix::Rnc);
            std::fs::write(dir.join(format!("{}-{}.qms.yaml", id, i)), body).unwrap();
        }

        let mut numbers = project.existing_numbers(&SequenceFamily::Rnc).unwrap();
        numbers.sort();
        assert_eq!(numbers, vec!["RNC-0004", "RNC-0011"]);

        let next = next_number(&project, SequenceFamily::Rnc, &Config::default(), date(2025, 1, 1));
        assert_eq!(next.unwrap(), "RNC-0012");
    }

    #[test]
    fn test_inspection_families_share_directory_but_not_counter() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        let dir = project.entity_dir(EntityPrefix::Insp);
        std::fs::write(dir.join("a.qms.yaml"), "number: END-0007\n").unwrap();
        std::fs::write(dir.join("b.qms.yaml"), "number: DIM-0002\n").unwrap();

        let config = Config::default();
        let today = date(2025, 1, 1);
        assert_eq!(
            next_number(&project, SequenceFamily::Ndt, &config, today).unwrap(),
            "END-0008"
        );
        assert_eq!(
            next_number(&project, SequenceFamily::Dimensional, &config, today).unwrap(),
            "DIM-0003"
        );
        assert_eq!(
            next_number(&project, SequenceFamily::Painting, &config, today).unwrap(),
            "PIN-0001"
        );
    }
}
