//! Table output for `list` subcommands
//!
//! Every list builds [`TableRow`]s of typed [`CellValue`]s and hands them to
//! a [`TableFormatter`], which prints them as aligned TSV, CSV, a Markdown
//! table, or bare IDs. JSON and YAML are printed by the caller from the
//! records themselves.

use chrono::{DateTime, Local, Utc};
use console::style;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{escape_csv, truncate_str};
use crate::cli::OutputFormat;
use crate::core::money::format_brl;
use crate::core::shortid::ShortIdIndex;

/// A typed cell value with semantic meaning for formatting
#[derive(Debug, Clone)]
pub enum CellValue {
    /// Plain text, truncated to the column width
    Text(String),
    /// Lifecycle status, colored by meaning
    Status(String),
    /// Amount in reais, right-aligned
    Money(f64),
    Number(i64),
    /// Timestamp shown as a local date
    Date(DateTime<Utc>),
    /// Yes/no flag
    Flag(bool),
    /// Value that needs attention, shown in red
    Alert(String),
    /// Placeholder shown as "-"
    Empty,
}

impl CellValue {
    /// Unstyled text, used for CSV, Markdown and width calculation
    pub fn raw(&self) -> String {
        match self {
            CellValue::Text(s) | CellValue::Status(s) | CellValue::Alert(s) => s.clone(),
            CellValue::Money(v) => format_brl(*v),
            CellValue::Number(n) => n.to_string(),
            CellValue::Date(d) => d.with_timezone(&Local).format("%d/%m/%Y").to_string(),
            CellValue::Flag(true) => "yes".to_string(),
            CellValue::Flag(false) => "no".to_string(),
            CellValue::Empty => "-".to_string(),
        }
    }

    pub fn display_width(&self) -> usize {
        self.raw().chars().count()
    }

    /// Padded (and colored when on a terminal) for TSV output
    pub fn format_tsv(&self, width: usize) -> String {
        match self {
            CellValue::Text(s) => {
                format!("{:<width$}", truncate_str(s, width), width = width)
            }
            CellValue::Status(s) => {
                let styled = match s.as_str() {
                    "pending" | "open" | "scheduled" | "waiting_parts" => style(s.as_str()).yellow(),
                    "approved" | "completed" | "delivered" | "confirmed" | "converted_to_order" => {
                        style(s.as_str()).green()
                    }
                    "rejected" | "cancelled" | "no_show" => style(s.as_str()).red(),
                    "in_progress" => style(s.as_str()).cyan(),
                    _ => style(s.as_str()),
                };
                format!("{:<width$}", styled, width = width)
            }
            CellValue::Money(v) => {
                let text = format_brl(*v);
                if *v < 0.0 {
                    format!("{:>width$}", style(text).red(), width = width)
                } else {
                    format!("{:>width$}", text, width = width)
                }
            }
            CellValue::Number(_) => format!("{:>width$}", self.raw(), width = width),
            CellValue::Alert(s) => format!("{:>width$}", style(s).red().bold(), width = width),
            CellValue::Flag(false) | CellValue::Empty => {
                format!("{:<width$}", style(self.raw()).dim(), width = width)
            }
            CellValue::Date(_) | CellValue::Flag(true) => {
                format!("{:<width$}", self.raw(), width = width)
            }
        }
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

    fn value(&self, key: &str) -> String {
        self.get(key).map(CellValue::raw).unwrap_or_else(|| "-".to_string())
    }
}

/// Table formatter that outputs rows in various formats
pub struct TableFormatter<'a> {
    columns: &'a [ColumnDef],
    entity_name: &'static str,
    entity_prefix: &'static str,
}

impl<'a> TableFormatter<'a> {
    pub fn new(columns: &'a [ColumnDef], entity_name: &'static str, entity_prefix: &'static str) -> Self {
        Self {
            columns,
            entity_name,
            entity_prefix,
        }
    }

    pub fn output(&self, rows: Vec<TableRow>, format: OutputFormat) {
        match format {
            OutputFormat::Csv => self.output_csv(&rows),
            OutputFormat::Md => self.output_md(&rows),
            OutputFormat::Id => rows.iter().for_each(|r| println!("{}", r.full_id)),
            OutputFormat::ShortId => rows.iter().for_each(|r| println!("{}", r.short_id)),
            _ => self.output_tsv(&rows),
        }
    }

    /// Widths sized to the content, capped at each column's maximum
    fn calculate_widths(&self, rows: &[TableRow]) -> Vec<usize> {
        let short_width = rows
            .iter()
            .map(|r| r.short_id.len())
            .max()
            .unwrap_or(5)
            .max(5);

        std::iter::once(short_width)
            .chain(self.columns.iter().map(|col| {
                let content = rows
                    .iter()
                    .filter_map(|r| r.get(col.key))
                    .map(CellValue::display_width)
                    .max()
                    .unwrap_or(0);
                col.header.len().max(content).min(col.width)
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

        let total: usize = widths.iter().sum::<usize>() + widths.len() - 1;
        println!("{}", "-".repeat(total));

        for row in rows {
            let mut parts = vec![format!("{:<w$}", style(&row.short_id).cyan(), w = widths[0])];
            for (col, w) in self.columns.iter().zip(&widths[1..]) {
                parts.push(match row.get(col.key) {
                    Some(value) => value.format_tsv(*w),
                    None => CellValue::Empty.format_tsv(*w),
                });
            }
            println!("{}", parts.join(" ").trim_end());
        }

        println!();
        println!(
            "{} {}(s) found. Use {} to reference by short ID.",
            style(rows.len()).cyan(),
            self.entity_name,
            style(format!("{}@N", self.entity_prefix)).cyan()
        );
    }

    fn output_csv(&self, rows: &[TableRow]) {
        let mut header = vec!["short_id", "id"];
        header.extend(self.columns.iter().map(|c| c.key));
        println!("{}", header.join(","));

        for row in rows {
            let mut parts = vec![row.short_id.clone(), row.full_id.clone()];
            parts.extend(self.columns.iter().map(|c| escape_csv(&row.value(c.key))));
            println!("{}", parts.join(","));
        }
    }

    fn output_md(&self, rows: &[TableRow]) {
        let mut builder = Builder::default();
        let mut header = vec!["Short".to_string()];
        header.extend(self.columns.iter().map(|c| c.header.to_string()));
        builder.push_record(header);

        for row in rows {
            let mut record = vec![row.short_id.clone()];
            record.extend(self.columns.iter().map(|c| row.value(c.key)));
            builder.push_record(record);
        }
        println!("{}", builder.build().with(Style::markdown()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_values() {
        assert_eq!(CellValue::Money(1234.56).raw(), "R$ 1.234,56");
        assert_eq!(CellValue::Flag(true).raw(), "yes");
        assert_eq!(CellValue::Empty.raw(), "-");
        assert_eq!(CellValue::Number(-3).raw(), "-3");
    }

    #[test]
    fn test_widths_follow_content_up_to_cap() {
        const COLUMNS: &[ColumnDef] = &[
            ColumnDef::new("name", "NAME", 10),
            ColumnDef::new("total", "TOTAL", 20),
        ];
        let index = ShortIdIndex::new();
        let rows = vec![TableRow::new("CLI-1".into(), &index)
            .cell("name", CellValue::Text("Maria da Silva Santos".into()))
            .cell("total", CellValue::Money(5.0))];

        let widths = TableFormatter::new(COLUMNS, "customer", "CLI").calculate_widths(&rows);
        assert_eq!(widths, vec![5, 10, 7]);
    }

    #[test]
    fn test_tsv_text_is_truncated() {
        let cell = CellValue::Text("Alinhamento e balanceamento".into());
        assert_eq!(cell.format_tsv(12), "Alinhamen...");
    }
}
