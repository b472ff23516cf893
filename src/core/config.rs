//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::Project;

/// Default lead, in days, for flagging calibrations as due soon
pub const DEFAULT_CALIBRATION_WARNING_DAYS: i64 = 30;

/// Per-family numbering override
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NumberingOverride {
    /// Replacement prefix (e.g. "NC-")
    pub prefix: Option<String>,

    /// Zero-padding width
    pub width: Option<usize>,

    /// Numbers at or below this value are never issued
    pub floor: Option<u64>,
}

/// QMS configuration with layered hierarchy
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default author for new records
    pub author: Option<String>,

    /// Editor command for `qms ... edit`
    pub editor: Option<String>,

    /// Days before a calibration's due date at which it is flagged
    pub calibration_warning_days: Option<i64>,

    /// Numbering overrides keyed by family name (e.g. "rnc", "quote")
    pub numbering: BTreeMap<String, NumberingOverride>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Self {
        match Project::discover() {
            Ok(project) => Self::load_for(&project),
            Err(_) => Self::load_layers(None),
        }
    }

    /// Load configuration for a known project
    pub fn load_for(project: &Project) -> Self {
        Self::load_layers(Some(&project.qms_dir().join("config.yaml")))
    }

    fn load_layers(project_config: Option<&Path>) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/qms/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Project config (.qms/config.yaml)
        if let Some(path) = project_config {
            if let Some(project_config) = Self::read_file(path) {
                config.merge(project_config);
            }
        }

        // 4. Environment variables
        if let Ok(author) = std::env::var("QMS_AUTHOR") {
            config.author = Some(author);
        }
        if let Ok(editor) = std::env::var("QMS_EDITOR") {
            config.editor = Some(editor);
        }

        config
    }

    fn read_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match Self::from_yaml(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("Ignoring invalid config {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Parse a single config layer
    pub fn from_yaml(contents: &str) -> Result<Self, serde_yml::Error> {
        // An all-comment file deserializes as null
        if contents.lines().all(|l| l.trim().is_empty() || l.trim_start().starts_with('#')) {
            return Ok(Config::default());
        }
        serde_yml::from_str(contents)
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "qms")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Config) {
        if other.author.is_some() {
            self.author = other.author;
        }
        if other.editor.is_some() {
            self.editor = other.editor;
        }
        if other.calibration_warning_days.is_some() {
            self.calibration_warning_days = other.calibration_warning_days;
        }
        for (family, entry) in other.numbering {
            let current = self.numbering.entry(family).or_default();
            if entry.prefix.is_some() {
                current.prefix = entry.prefix;
            }
            if entry.width.is_some() {
                current.width = entry.width;
            }
            if entry.floor.is_some() {
                current.floor = entry.floor;
            }
        }
    }

    /// Numbering override for a family, if any
    pub fn numbering_for(&self, family: &str) -> Option<&NumberingOverride> {
        self.numbering.get(family)
    }

    /// Calibration warning window in days
    pub fn calibration_warning_days(&self) -> i64 {
        self.calibration_warning_days
            .unwrap_or(DEFAULT_CALIBRATION_WARNING_DAYS)
    }

    /// Get the author name, falling back to git config or username
    pub fn author(&self) -> String {
        if let Some(ref author) = self.author {
            return author.clone();
        }

        // Try git config
        if let Ok(output) = std::process::Command::new("git")
            .args(["config", "user.name"])
            .output()
        {
            if output.status.success() {
                let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !name.is_empty() {
                    return name;
                }
            }
        }

        // Fall back to username
        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string())
    }

    /// Get the editor command
    pub fn editor(&self) -> String {
        self.editor
            .clone()
            .or_else(|| std::env::var("EDITOR").ok())
            .or_else(|| std::env::var("VISUAL").ok())
            .unwrap_or_else(|| "vi".to_string())
    }

    /// Run the editor on a file, properly handling commands with arguments
    /// (e.g., "emacsclient -nw" or "code --wait")
    pub fn run_editor(&self, file_path: &Path) -> std::io::Result<std::process::ExitStatus> {
        let editor = self.editor();
        let mut parts = editor.split_whitespace();

        match parts.next() {
            Some(cmd) => std::process::Command::new(cmd)
                .args(parts)
                .arg(file_path)
                .status(),
            None => std::process::Command::new("vi").arg(file_path).status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_only_file_is_default() {
        let config = Config::from_yaml("# nothing here\n\n# author: x\n").unwrap();
        assert!(config.author.is_none());
        assert!(config.numbering.is_empty());
    }

    #[test]
    fn test_parse_numbering_overrides() {
        let yaml = r#"
author: Inspector
numbering:
  quote:
    prefix: "ORC-"
    floor: 1000
  rnc:
    width: 5
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.author.as_deref(), Some("Inspector"));
        let quote = config.numbering_for("quote").unwrap();
        assert_eq!(quote.prefix.as_deref(), Some("ORC-"));
        assert_eq!(quote.floor, Some(1000));
        assert_eq!(quote.width, None);
        assert_eq!(config.numbering_for("rnc").unwrap().width, Some(5));
    }

    #[test]
    fn test_merge_numbering_field_by_field() {
        let mut base = Config::from_yaml("numbering:\n  rnc:\n    width: 5\n    floor: 10\n").unwrap();
        let overlay = Config::from_yaml("numbering:\n  rnc:\n    floor: 200\n").unwrap();
        base.merge(overlay);

        let rnc = base.numbering_for("rnc").unwrap();
        assert_eq!(rnc.width, Some(5));
        assert_eq!(rnc.floor, Some(200));
    }

    #[test]
    fn test_calibration_warning_default() {
        let config = Config::default();
        assert_eq!(config.calibration_warning_days(), DEFAULT_CALIBRATION_WARNING_DAYS);

        let config = Config::from_yaml("calibration_warning_days: 15\n").unwrap();
        assert_eq!(config.calibration_warning_days(), 15);
    }
}
