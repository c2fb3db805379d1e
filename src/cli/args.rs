//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    catalog::CatalogCommands, checklist::ChecklistCommands, completions::CompletionsArgs,
    customer::CustomerCommands, employee::EmployeeCommands, import::ImportArgs, init::InitArgs,
    order::OrderCommands, pdv::PdvCommands, portal::PortalCommands, quote::QuoteCommands,
    schedule::ScheduleCommands, status::StatusArgs, validate::ValidateArgs,
    vehicle::VehicleCommands,
};

#[derive(Parser)]
#[command(name = "oficina")]
#[command(author, version, about = "Auto-repair shop manager")]
#[command(long_about = "Customers, vehicles, quotes, work orders, counter sales, scheduling and checklists for an auto-repair shop, kept as plain YAML files.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// More log output (-v info, -vv debug)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Shop directory (default: auto-detect by finding .oficina/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new shop directory
    Init(InitArgs),

    /// Customer registry
    #[command(subcommand, visible_alias = "cliente")]
    Customer(CustomerCommands),

    /// Vehicle registry
    #[command(subcommand, visible_alias = "veiculo")]
    Vehicle(VehicleCommands),

    /// Employee registry
    #[command(subcommand, visible_alias = "funcionario")]
    Employee(EmployeeCommands),

    /// Service and part catalog
    #[command(subcommand, visible_alias = "catalogo")]
    Catalog(CatalogCommands),

    /// Quotes (orçamentos)
    #[command(subcommand, visible_alias = "orcamento")]
    Quote(QuoteCommands),

    /// Work orders (OS)
    #[command(subcommand, visible_alias = "os")]
    Order(OrderCommands),

    /// Counter sales
    #[command(subcommand)]
    Pdv(PdvCommands),

    /// Appointments
    #[command(subcommand, visible_alias = "agenda")]
    Schedule(ScheduleCommands),

    /// Checklist templates and vehicle inspections
    #[command(subcommand)]
    Checklist(ChecklistCommands),

    /// What a customer sees: vehicles, quotes, orders, appointments
    #[command(subcommand)]
    Portal(PortalCommands),

    /// Shop dashboard
    Status(StatusArgs),

    /// Validate record files against schemas and field rules
    Validate(ValidateArgs),

    /// Import customers, parts or services from CSV
    Import(ImportArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context (details for show, tsv for list)
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
    /// Just IDs, one per line
    Id,
    /// Just short IDs, one per line
    ShortId,
}

impl OutputFormat {
    /// Parse the `default_format` config value
    pub fn from_config(value: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(value, true).ok()
    }
}
