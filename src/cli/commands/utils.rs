//! Shared utilities for CLI commands

use chrono::{Local, NaiveDate};
use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::Entity;
use crate::core::identity::EntityId;
use crate::core::project::Project;
use crate::core::repository::Repository;
use crate::core::shortid::ShortIdIndex;
use crate::core::totals::Totals;
use crate::core::{Config, Shop, ShopSettings};
use crate::entities::{Quote, Sale, WorkOrder};

/// Everything a command needs from the current shop directory
pub struct Workspace {
    pub project: Project,
    pub config: Config,
    pub shop: Shop,
    pub short_ids: ShortIdIndex,
}

impl Workspace {
    /// Find the shop directory (`--project` or the nearest `.oficina/`)
    pub fn open(global: &GlobalOpts) -> Result<Self> {
        let project = match &global.project {
            Some(path) => Project::discover_from(path),
            None => Project::discover(),
        }
        .map_err(|e| miette::miette!("{}", e))?;

        let config = Config::load_for(&project);
        let shop = Shop::open(&project, ShopSettings::from_config(&config));
        let short_ids = ShortIdIndex::load(&project);
        Ok(Self {
            project,
            config,
            shop,
            short_ids,
        })
    }

    /// Expand a short ID; anything else passes through for the shop lookups
    pub fn resolve(&self, reference: &str) -> String {
        self.short_ids
            .resolve(reference)
            .unwrap_or_else(|| reference.to_string())
    }

    /// Short alias for a record, assigning one if it has none yet
    pub fn remember(&mut self, id: &EntityId) -> String {
        let short = self.short_ids.add(id.to_string());
        if let Err(e) = self.short_ids.save(&self.project) {
            tracing::warn!(error = %e, "could not save short ID index");
        }
        short
    }

    /// Make sure every listed record has an alias
    pub fn remember_all<'a>(&mut self, ids: impl IntoIterator<Item = &'a EntityId>) {
        self.short_ids.ensure_all(ids.into_iter().map(|id| id.to_string()));
        if let Err(e) = self.short_ids.save(&self.project) {
            tracing::warn!(error = %e, "could not save short ID index");
        }
    }

    /// Alias if known, otherwise the full ID
    pub fn display_id(&self, id: &EntityId) -> String {
        self.short_ids
            .get_short_id(&id.to_string())
            .unwrap_or_else(|| id.to_string())
    }

    /// Quote by ID, short ID or number (`7` or `#7`)
    pub fn quote(&self, reference: &str) -> Result<Quote> {
        find_numbered(self.shop.quotes.as_ref(), &self.resolve(reference), |q| q.number)
    }

    /// Work order by ID, short ID or number
    pub fn order(&self, reference: &str) -> Result<WorkOrder> {
        find_numbered(self.shop.orders.as_ref(), &self.resolve(reference), |o| o.number)
    }

    /// Sale by ID, short ID or number
    pub fn sale(&self, reference: &str) -> Result<Sale> {
        find_numbered(self.shop.sales.as_ref(), &self.resolve(reference), |s| s.number)
    }

    pub fn path_of(&self, id: &EntityId) -> PathBuf {
        self.project.entity_path(id)
    }

    /// Format for list subcommands: config default, then TSV
    pub fn list_format(&self, global: &GlobalOpts) -> OutputFormat {
        match self.effective_format(global) {
            OutputFormat::Auto => OutputFormat::Tsv,
            f => f,
        }
    }

    pub fn effective_format(&self, global: &GlobalOpts) -> OutputFormat {
        match global.format {
            OutputFormat::Auto => self
                .config
                .default_format
                .as_deref()
                .and_then(OutputFormat::from_config)
                .unwrap_or(OutputFormat::Auto),
            f => f,
        }
    }
}

fn find_numbered<T: Entity>(
    repo: &dyn Repository<T>,
    reference: &str,
    number_of: impl Fn(&T) -> u32,
) -> Result<T> {
    let found = match reference.trim_start_matches('#').parse::<u32>() {
        Ok(number) => repo.list()?.into_iter().find(|r| number_of(r) == number),
        Err(_) => repo.find(reference)?,
    };
    found.ok_or_else(|| miette::miette!("{} not found: {}", T::PREFIX.label(), reference))
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Print a record as JSON or YAML when asked; returns false for the
/// human-readable formats so the caller can print its own view
pub fn print_structured<T: Serialize>(value: &T, format: OutputFormat) -> Result<bool> {
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

/// Confirmation line after a record is created
pub fn print_created(kind: &str, short_id: &str, path: &std::path::Path, global: &GlobalOpts) {
    if global.quiet {
        println!("{}", short_id);
        return;
    }
    println!(
        "{} Created {} {}",
        style("✓").green(),
        kind,
        style(short_id).cyan()
    );
    println!("   {}", style(path.display()).dim());
}

/// Confirmation line after a change
pub fn print_done(message: impl std::fmt::Display, global: &GlobalOpts) {
    if !global.quiet {
        println!("{} {}", style("✓").green(), message);
    }
}

/// Section header used by the `show` views
pub fn print_header(title: impl std::fmt::Display) {
    println!("{}", style("─".repeat(60)).dim());
    println!("{}", style(title).bold());
    println!("{}", style("─".repeat(60)).dim());
}

pub fn print_field(label: &str, value: impl std::fmt::Display) {
    println!("{}: {}", style(label).bold(), value);
}

/// Totals block shared by quote, order and sale views
pub fn print_totals(totals: &Totals) {
    use crate::core::money::format_brl;
    println!();
    print_field("Services", format_brl(totals.service_subtotal));
    print_field("Parts", format_brl(totals.part_subtotal));
    print_field("Gross", format_brl(totals.gross_total));
    print_field("Discount", format_brl(totals.discount));
    let net = format_brl(totals.net_total);
    if totals.net_total < 0.0 {
        print_field("Total", style(net).red().bold());
    } else {
        print_field("Total", style(net).green().bold());
    }
}

/// Warn on stderr when a discount is larger than the gross total
pub fn warn_discount(totals: &Totals) {
    if totals.exceeds_gross() {
        eprintln!(
            "{} discount is larger than the gross total; net total is {}",
            style("!").yellow(),
            crate::core::money::format_brl(totals.net_total)
        );
    }
}

/// Print a rendered document, or write it to a file
pub fn emit_document(text: &str, output: Option<&std::path::Path>, global: &GlobalOpts) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text).into_diagnostic()?;
            print_done(format!("Wrote {}", path.display()), global);
        }
        None => print!("{}", text),
    }
    Ok(())
}
