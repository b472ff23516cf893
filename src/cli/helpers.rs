//! Shared helper functions for CLI commands
//!
//! This module contains utility functions that are used across multiple
//! command modules to avoid code duplication.

use chrono::NaiveDate;
use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::Path;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::Entity;
use crate::core::identity::EntityId;
use crate::core::loader;
use crate::core::numbering::{next_number, SequenceFamily};
use crate::core::project::Project;
use crate::core::shortid::ShortIdIndex;
use crate::core::Config;

/// Open the project named by `--project`, or discover it from the cwd
pub fn open_project(global: &GlobalOpts) -> Result<Project> {
    Project::open(global.project.as_deref()).map_err(|e| miette::miette!("{}", e))
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// clap value parser for `YYYY-MM-DD`
pub fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| format!("Invalid date '{}'. Use YYYY-MM-DD", s))
}

/// clap value parser for measured and nominal values; NaN and infinities are refused
pub fn parse_finite(s: &str) -> std::result::Result<f64, String> {
    match s.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        Ok(_) => Err(format!("'{}' is not a finite number", s)),
        Err(_) => Err(format!("'{}' is not a number", s)),
    }
}

/// Allocate the next number for a family from the project store
pub fn allocate_number(project: &Project, config: &Config, family: SequenceFamily) -> Result<String> {
    next_number(project, family, config, today()).map_err(|e| miette::miette!("{}", e))
}

/// Format an EntityId for display, truncating if too long
///
/// IDs longer than 16 characters are truncated to 13 chars with "..." suffix.
pub fn format_short_id(id: &EntityId) -> String {
    truncate_str(&id.to_string(), 16)
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Escape a string for CSV output
///
/// Handles commas, quotes, and newlines according to RFC 4180.
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Print a value as JSON or YAML; returns false for table formats
pub fn print_structured<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<bool> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
            Ok(true)
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(value).into_diagnostic()?);
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Assign short IDs to listed records and persist the index
pub fn refresh_short_ids<'a, T: Entity + 'a>(
    project: &Project,
    records: impl IntoIterator<Item = &'a T>,
) -> ShortIdIndex {
    let mut short_ids = ShortIdIndex::load(project);
    short_ids.ensure_all(records.into_iter().map(|r| r.id().to_string()));
    if let Err(e) = short_ids.save(project) {
        tracing::warn!("Could not save short ID index: {}", e);
    }
    short_ids
}

/// Save a freshly created record, register its short ID and report it
pub fn save_new<T: Entity>(project: &Project, record: &T, global: &GlobalOpts) -> Result<std::path::PathBuf> {
    let path = loader::save_entity(project, record)?;

    let mut short_ids = ShortIdIndex::load(project);
    let short_id = short_ids.add(record.id().to_string());
    if let Err(e) = short_ids.save(project) {
        tracing::warn!("Could not save short ID index: {}", e);
    }
    tracing::info!(id = %record.id(), number = record.number().unwrap_or("-"), "Created record");

    if global.format == OutputFormat::Id {
        println!("{}", record.id());
    } else if !global.quiet {
        println!(
            "{} Created {} {}",
            style("✓").green(),
            style(record.display_ref()).cyan().bold(),
            style(short_id.unwrap_or_else(|| format_short_id(record.id()))).cyan()
        );
        println!("   {}", style(path.display()).dim());
    }
    Ok(path)
}

/// Persist an updated record at its existing path and report it
pub fn save_updated<T: Entity>(path: &Path, record: &T, message: &str, global: &GlobalOpts) -> Result<()> {
    loader::save_entity_at(path, record)?;
    if !global.quiet {
        println!(
            "{} {} {}",
            style("✓").green(),
            message,
            style(record.display_ref()).cyan()
        );
    }
    Ok(())
}

/// Open a record file in the configured editor
pub fn open_in_editor(config: &Config, path: &Path) -> Result<()> {
    println!(
        "Opening {} in {}...",
        style(path.display()).cyan(),
        style(config.editor()).yellow()
    );
    let status = config.run_editor(path).into_diagnostic()?;
    if !status.success() {
        return Err(miette::miette!("Editor exited with {}", status));
    }
    Ok(())
}

/// Print a `label: value` line for show views, skipping empty values
pub fn print_field(label: &str, value: Option<impl std::fmt::Display>) {
    if let Some(value) = value {
        println!("{:<16} {}", style(format!("{}:", label)).bold(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::EntityPrefix;

    #[test]
    fn test_format_short_id() {
        let id = EntityId::new(EntityPrefix::Rnc);
        let formatted = format_short_id(&id);
        assert!(formatted.chars().count() <= 16);
        assert!(formatted.ends_with("..."));
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hi", 2), "hi");
        // Multi-byte characters are never split
        assert_eq!(truncate_str("Inspeção de solda", 10), "Inspeçã...");
    }

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("simple"), "simple");
        assert_eq!(escape_csv("with,comma"), "\"with,comma\"");
        assert_eq!(escape_csv("with\"quote"), "\"with\"\"quote\"");
        assert_eq!(escape_csv("with\nnewline"), "\"with\nnewline\"");
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2025-02-28").unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()
        );
        assert!(parse_date("28/02/2025").is_err());
    }

    #[test]
    fn test_parse_finite() {
        assert_eq!(parse_finite("10.05").unwrap(), 10.05);
        assert_eq!(parse_finite("-3").unwrap(), -3.0);
        assert!(parse_finite("NaN").is_err());
        assert!(parse_finite("inf").is_err());
        assert!(parse_finite("ten").is_err());
    }
}
