//! Table formatting utilities for CLI list commands
//!
//! One formatter serves every record list: commands build [`TableRow`]s of
//! typed [`CellValue`]s and pick the columns, the formatter handles TSV, CSV,
//! Markdown and ID output.

use chrono::NaiveDate;
use console::style;

use crate::cli::helpers::{escape_csv, truncate_str};
use crate::cli::OutputFormat;
use crate::core::shortid::ShortIdIndex;
use crate::core::tolerance::Verdict;
use crate::entities::rnc::Severity;

/// A typed cell value with semantic meaning for formatting
#[derive(Debug, Clone)]
pub enum CellValue {
    /// Record number (e.g. "RNC-0007"), or "-" when none was allocated
    Number(Option<String>),
    /// Plain text, truncated to the column width
    Text(String),
    /// Workflow state with color coding
    State(String),
    /// RNC severity with color coding
    Severity(Severity),
    /// Inspection verdict; `None` when nothing was measured
    Verdict(Option<Verdict>),
    /// Calendar date; "-" when missing
    Date(Option<NaiveDate>),
    /// Integer, right-aligned
    Count(i64),
    /// Float value with precision
    Float(f64, usize),
    /// Money, two decimals
    Money(f64),
    /// Empty/placeholder
    Empty,
}

impl CellValue {
    /// Plain text form shared by every output format
    pub fn raw(&self) -> String {
        match self {
            CellValue::Number(n) => n.clone().unwrap_or_else(|| "-".to_string()),
            CellValue::Text(s) | CellValue::State(s) => s.clone(),
            CellValue::Severity(s) => s.to_string(),
            CellValue::Verdict(v) => v.map_or_else(|| "-".to_string(), |v| v.to_string()),
            CellValue::Date(d) => d.map_or_else(|| "-".to_string(), |d| d.format("%Y-%m-%d").to_string()),
            CellValue::Count(n) => n.to_string(),
            CellValue::Float(f, precision) => format!("{:.prec$}", f, prec = precision),
            CellValue::Money(m) => format!("{:.2}", m),
            CellValue::Empty => "-".to_string(),
        }
    }

    /// Format for TSV output (with colors if terminal)
    pub fn format_tsv(&self, width: usize) -> String {
        let raw = self.raw();
        match self {
            CellValue::Number(_) => format!("{:<width$}", style(raw).cyan(), width = width),
            CellValue::Text(s) => {
                format!("{:<width$}", truncate_str(s, width.saturating_sub(2)), width = width)
            }
            CellValue::State(s) => {
                let styled = match s.as_str() {
                    "closed" | "completed" | "verified" | "approved" | "converted" | "delivered"
                    | "valid" | "released" | "published" => style(raw).green(),
                    "due_soon" | "in_progress" | "sent" | "in_production" | "analysis" | "action" => {
                        style(raw).yellow()
                    }
                    "overdue" | "rejected" | "out_of_service" => style(raw).red().bold(),
                    "draft" | "archived" => style(raw).dim(),
                    _ => style(raw).white(),
                };
                format!("{:<width$}", styled, width = width)
            }
            CellValue::Severity(s) => {
                let styled = match s {
                    Severity::Critical => style(raw).red().bold(),
                    Severity::Major => style(raw).yellow(),
                    Severity::Minor => style(raw).white(),
                };
                format!("{:<width$}", styled, width = width)
            }
            CellValue::Verdict(v) => {
                let styled = match v {
                    Some(Verdict::Conforme) => style(raw).green(),
                    Some(Verdict::NaoConforme) => style(raw).red().bold(),
                    None => style(raw).dim(),
                };
                format!("{:<width$}", styled, width = width)
            }
            CellValue::Count(_) | CellValue::Float(..) | CellValue::Money(_) => {
                format!("{:>width$}", raw, width = width)
            }
            CellValue::Date(_) | CellValue::Empty => format!("{:<width$}", raw, width = width),
        }
    }

    /// Format for CSV output (RFC 4180, no colors)
    pub fn format_csv(&self) -> String {
        match self {
            CellValue::Number(None) | CellValue::Date(None) | CellValue::Verdict(None) | CellValue::Empty => {
                String::new()
            }
            _ => escape_csv(&self.raw()),
        }
    }

    /// Format for Markdown output (no colors, escaped pipes)
    pub fn format_md(&self) -> String {
        self.raw().replace('|', "\\|")
    }

    /// Get the display width of this cell's content (for dynamic column sizing)
    pub fn display_width(&self) -> usize {
        self.raw().chars().count()
    }
}

/// Column definition with header label and maximum width
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub key: &'static str,
    pub header: &'static str,
    pub width: usize,
}

impl ColumnDef {
    pub const fn new(key: &'static str, header: &'static str, width: usize) -> Self {
        Self { key, header, width }
    }
}

/// A row of cell values for table output
pub struct TableRow {
    pub short_id: String,
    pub full_id: String,
    pub cells: Vec<(&'static str, CellValue)>,
}

impl TableRow {
    pub fn new(full_id: String, short_ids: &ShortIdIndex) -> Self {
        let short_id = short_ids.get_short_id(&full_id).unwrap_or_default();
        Self {
            short_id,
            full_id,
            cells: Vec::new(),
        }
    }

    pub fn cell(mut self, key: &'static str, value: CellValue) -> Self {
        self.cells.push((key, value));
        self
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.cells.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }
}

/// Table formatter that outputs rows in various formats
pub struct TableFormatter<'a> {
    columns: &'a [ColumnDef],
    entity_name: &'static str,
    entity_prefix: &'static str,
    show_summary: bool,
}

impl<'a> TableFormatter<'a> {
    pub fn new(columns: &'a [ColumnDef], entity_name: &'static str, entity_prefix: &'static str) -> Self {
        Self {
            columns,
            entity_name,
            entity_prefix,
            show_summary: true,
        }
    }

    /// Drop the trailing "N found" line (used with --quiet)
    pub fn without_summary(mut self) -> Self {
        self.show_summary = false;
        self
    }

    /// Output rows in the specified format
    pub fn output<I>(&self, rows: I, format: OutputFormat)
    where
        I: IntoIterator<Item = TableRow>,
    {
        let rows: Vec<TableRow> = rows.into_iter().collect();

        match format {
            OutputFormat::Csv => self.output_csv(&rows),
            OutputFormat::Md => self.output_md(&rows),
            OutputFormat::Id => {
                for row in &rows {
                    println!("{}", row.full_id);
                }
            }
            _ => self.output_tsv(&rows),
        }
    }

    /// Column widths from content, capped at each column's maximum
    fn calculate_widths(&self, rows: &[TableRow]) -> Vec<usize> {
        let short_width = rows
            .iter()
            .map(|r| r.short_id.len())
            .max()
            .unwrap_or(5)
            .max(5);

        std::iter::once(short_width)
            .chain(self.columns.iter().map(|col| {
                let max_content = rows
                    .iter()
                    .filter_map(|r| r.get(col.key))
                    .map(CellValue::display_width)
                    .max()
                    .unwrap_or(0);
                col.header.len().max(max_content + 2).min(col.width)
            }))
            .collect()
    }

    fn output_tsv(&self, rows: &[TableRow]) {
        let widths = self.calculate_widths(rows);

        let mut header = vec![format!("{:<w$}", style("SHORT").bold().dim(), w = widths[0])];
        for (col, w) in self.columns.iter().zip(&widths[1..]) {
            header.push(format!("{:<w$}", style(col.header).bold(), w = *w));
        }
        println!("{}", header.join(" "));

        let total_width: usize = widths.iter().sum::<usize>() + widths.len() - 1;
        println!("{}", "-".repeat(total_width));

        for row in rows {
            let mut parts = vec![format!("{:<w$}", style(&row.short_id).cyan(), w = widths[0])];
            for (col, w) in self.columns.iter().zip(&widths[1..]) {
                parts.push(match row.get(col.key) {
                    Some(value) => value.format_tsv(*w),
                    None => format!("{:<w$}", "-", w = *w),
                });
            }
            println!("{}", parts.join(" "));
        }

        if self.show_summary {
            println!();
            println!(
                "{} {}(s) found. Use {} to reference by short ID.",
                style(rows.len()).cyan(),
                self.entity_name,
                style(format!("{}@N", self.entity_prefix)).cyan()
            );
        }
    }

    fn output_csv(&self, rows: &[TableRow]) {
        let mut headers = vec!["short_id", "id"];
        headers.extend(self.columns.iter().map(|c| c.key));
        println!("{}", headers.join(","));

        for row in rows {
            let mut values = vec![escape_csv(&row.short_id), escape_csv(&row.full_id)];
            values.extend(
                self.columns
                    .iter()
                    .map(|col| row.get(col.key).map(CellValue::format_csv).unwrap_or_default()),
            );
            println!("{}", values.join(","));
        }
    }

    fn output_md(&self, rows: &[TableRow]) {
        let mut headers = vec!["Short", "ID"];
        headers.extend(self.columns.iter().map(|c| c.header));
        println!("| {} |", headers.join(" | "));
        println!("|{}|", vec!["---"; headers.len()].join("|"));

        for row in rows {
            let mut values = vec![row.short_id.clone(), row.full_id.clone()];
            values.extend(
                self.columns
                    .iter()
                    .map(|col| row.get(col.key).map_or_else(|| "-".to_string(), CellValue::format_md)),
            );
            println!("| {} |", values.join(" | "));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_value_text_format() {
        let cell = CellValue::Text("Hello World".to_string());
        assert!(cell.format_tsv(20).contains("Hello World"));
        assert_eq!(cell.format_csv(), "Hello World");
        assert_eq!(cell.format_md(), "Hello World");
    }

    #[test]
    fn test_cell_value_verdict() {
        let nc = CellValue::Verdict(Some(Verdict::NaoConforme));
        assert_eq!(nc.format_csv(), "Não Conforme");
        assert_eq!(nc.display_width(), 12);

        let none = CellValue::Verdict(None);
        assert_eq!(none.format_csv(), "");
        assert_eq!(none.format_md(), "-");
    }

    #[test]
    fn test_cell_value_number_and_money() {
        assert_eq!(CellValue::Number(Some("RNC-0007".to_string())).format_csv(), "RNC-0007");
        assert_eq!(CellValue::Number(None).format_md(), "-");
        assert_eq!(CellValue::Money(1150.0).format_csv(), "1150.00");
        assert_eq!(CellValue::Float(0.12345, 3).raw(), "0.123");
    }

    #[test]
    fn test_cell_value_date() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(CellValue::Date(Some(d)).format_csv(), "2025-03-01");
        assert_eq!(CellValue::Date(None).format_csv(), "");
    }

    #[test]
    fn test_cell_value_md_escapes_pipes() {
        let cell = CellValue::Text("a|b|c".to_string());
        assert_eq!(cell.format_md(), "a\\|b\\|c");
    }

    #[test]
    fn test_table_row_builder() {
        let short_ids = ShortIdIndex::default();
        let row = TableRow::new("RNC-123".to_string(), &short_ids)
            .cell("title", CellValue::Text("My Title".to_string()))
            .cell("severity", CellValue::Severity(Severity::Major));

        assert_eq!(row.short_id, "");
        assert!(matches!(row.get("title"), Some(CellValue::Text(t)) if t == "My Title"));
        assert!(row.get("missing").is_none());
    }

    #[test]
    fn test_widths_capped_by_column() {
        let columns = [ColumnDef::new("title", "TITLE", 10)];
        let formatter = TableFormatter::new(&columns, "RNC", "RNC");
        let short_ids = ShortIdIndex::default();
        let rows = vec![TableRow::new("X".to_string(), &short_ids)
            .cell("title", CellValue::Text("a very long title indeed".to_string()))];
        assert_eq!(formatter.calculate_widths(&rows), vec![5, 10]);
    }
}
