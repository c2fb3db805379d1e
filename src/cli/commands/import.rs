//! `oficina import` command - Load customers and catalog items from CSV

use clap::ValueEnum;
use console::style;
use csv::ReaderBuilder;
use miette::{IntoDiagnostic, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use crate::cli::commands::utils::Workspace;
use crate::cli::helpers::truncate_str;
use crate::cli::GlobalOpts;
use crate::core::identity::EntityId;
use crate::core::money::parse_price;
use crate::core::Shop;
use crate::entities::{Customer, PartItem, ServiceItem};

/// Record types that can be imported
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ImportKind {
    #[value(alias = "clientes")]
    Customers,
    #[value(alias = "pecas")]
    Parts,
    #[value(alias = "servicos")]
    Services,
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// What the file holds
    pub kind: ImportKind,

    /// CSV file to import
    #[arg(required_unless_present = "template")]
    pub file: Option<PathBuf>,

    /// Print a CSV header with an example row
    #[arg(long)]
    pub template: bool,

    /// Check every row without saving anything
    #[arg(long)]
    pub dry_run: bool,

    /// Continue importing after errors (default: stop on first error)
    #[arg(long)]
    pub skip_errors: bool,
}

#[derive(Default)]
struct ImportStats {
    rows_processed: usize,
    created: usize,
    errors: usize,
}

/// One parsed row, ready to register
enum Row {
    Customer(Customer),
    Part(PartItem),
    Service(ServiceItem),
}

impl Row {
    fn label(&self) -> String {
        match self {
            Row::Customer(c) => c.name.clone(),
            Row::Part(p) => format!("{} {}", p.code, p.name),
            Row::Service(s) => s.name.clone(),
        }
    }

    fn validate(&self) -> crate::schema::rules::ValidationErrors {
        match self {
            Row::Customer(c) => c.validate(),
            Row::Part(p) => p.validate(),
            Row::Service(s) => s.validate(),
        }
    }

    fn register(self, shop: &mut Shop) -> crate::core::shop::Result<EntityId> {
        Ok(match self {
            Row::Customer(c) => shop.register_customer(c)?.id,
            Row::Part(p) => shop.add_part_item(p)?.id,
            Row::Service(s) => shop.add_service_item(s)?.id,
        })
    }
}

fn headers(kind: ImportKind) -> &'static [&'static str] {
    match kind {
        ImportKind::Customers => &[
            "name", "document", "phone", "email", "address", "city", "state", "notes",
        ],
        ImportKind::Parts => &["code", "name", "price", "cost", "brand", "stock", "min_stock"],
        ImportKind::Services => &["name", "price", "code", "description", "minutes"],
    }
}

fn example(kind: ImportKind) -> &'static [&'static str] {
    match kind {
        ImportKind::Customers => &[
            "Maria da Silva",
            "529.982.247-25",
            "(11) 98765-4321",
            "maria@example.com",
            "Rua das Flores 10",
            "São Paulo",
            "SP",
            "",
        ],
        ImportKind::Parts => &["PF-100", "Pastilha de freio", "\"89,90\"", "\"45,00\"", "Cobreq", "10", "2"],
        ImportKind::Services => &["Alinhamento", "\"150,00\"", "ALN", "", "40"],
    }
}

pub fn run(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    if args.template {
        println!("{}", headers(args.kind).join(","));
        println!("{}", example(args.kind).join(","));
        return Ok(());
    }

    let file_path = args
        .file
        .clone()
        .ok_or_else(|| miette::miette!("CSV file required. Usage: oficina import customers data.csv"))?;
    if !file_path.exists() {
        return Err(miette::miette!("File not found: {}", file_path.display()));
    }

    let mut ws = Workspace::open(global)?;
    let author = ws.shop.settings().author.clone();

    println!(
        "{} Importing {:?} from {}{}",
        style("→").blue(),
        args.kind,
        style(file_path.display()).yellow(),
        if args.dry_run {
            style(" (dry run)").dim().to_string()
        } else {
            String::new()
        }
    );
    println!();

    let file = File::open(&file_path).into_diagnostic()?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file));
    let header_map = build_header_map(rdr.headers().into_diagnostic()?);

    let mut stats = ImportStats::default();
    let mut created = Vec::new();

    for (row_idx, result) in rdr.records().enumerate() {
        let row_num = row_idx + 2;
        stats.rows_processed += 1;

        let outcome = result
            .map_err(|e| format!("CSV parse error: {}", e))
            .and_then(|record| parse_row(args.kind, &record, &header_map, &author))
            .and_then(|row| {
                let errors = row.validate();
                if errors.is_empty() {
                    Ok(row)
                } else {
                    Err(errors.to_string())
                }
            });

        let row = match outcome {
            Ok(row) => row,
            Err(e) => {
                eprintln!("{} Row {}: {}", style("✗").red(), row_num, e);
                stats.errors += 1;
                if !args.skip_errors {
                    break;
                }
                continue;
            }
        };

        let label = truncate_str(&row.label(), 40);
        if args.dry_run {
            println!("{} Row {}: would create {}", style("○").dim(), row_num, label);
            continue;
        }

        match row.register(&mut ws.shop) {
            Ok(id) => {
                println!("{} Row {}: created {}", style("✓").green(), row_num, label);
                created.push(id);
                stats.created += 1;
            }
            Err(e) => {
                eprintln!("{} Row {}: {}", style("✗").red(), row_num, e);
                stats.errors += 1;
                if !args.skip_errors {
                    break;
                }
            }
        }
    }
    ws.remember_all(created.iter());
    tracing::info!(kind = ?args.kind, created = stats.created, errors = stats.errors, "import finished");

    println!();
    println!("{}", style("─".repeat(50)).dim());
    println!("{}", style("Import Summary").bold());
    println!("{}", style("─".repeat(50)).dim());
    println!("  Rows processed: {}", style(stats.rows_processed).cyan());
    println!("  Created:        {}", style(stats.created).green());
    if stats.errors > 0 {
        println!("  Errors:         {}", style(stats.errors).red());
    }
    if args.dry_run {
        println!();
        println!("{}", style("Dry run complete. Nothing was saved.").yellow());
    }

    if stats.errors > 0 && !args.skip_errors {
        return Err(miette::miette!("Import stopped with {} error(s)", stats.errors));
    }
    Ok(())
}

fn parse_row(
    kind: ImportKind,
    record: &csv::StringRecord,
    header_map: &HashMap<String, usize>,
    author: &str,
) -> std::result::Result<Row, String> {
    let field = |name: &str| get_field(record, header_map, name);
    let required = |name: &str| field(name).ok_or_else(|| format!("missing required field '{}'", name));
    let price = |name: &str| -> std::result::Result<Option<f64>, String> {
        field(name)
            .map(|v| parse_price(&v).map_err(|e| format!("{}: {}", name, e)))
            .transpose()
    };
    let count = |name: &str| -> std::result::Result<Option<u32>, String> {
        field(name)
            .map(|v| v.parse::<u32>().map_err(|_| format!("{}: '{}' is not a whole number", name, v)))
            .transpose()
    };

    match kind {
        ImportKind::Customers => {
            let mut customer = Customer::new(
                required("name")?,
                required("document")?,
                required("phone")?,
                author.to_string(),
            );
            customer.email = field("email");
            customer.address = field("address");
            customer.city = field("city");
            customer.state = field("state");
            customer.notes = field("notes");
            Ok(Row::Customer(customer))
        }
        ImportKind::Parts => {
            let price_value = price("price")?.ok_or("missing required field 'price'")?;
            let mut part = PartItem::new(
                required("code")?,
                required("name")?,
                price_value,
                author.to_string(),
            );
            part.cost = price("cost")?;
            part.brand = field("brand");
            part.stock = count("stock")?.unwrap_or(0);
            part.min_stock = count("min_stock")?.unwrap_or(0);
            Ok(Row::Part(part))
        }
        ImportKind::Services => {
            let price_value = price("price")?.ok_or("missing required field 'price'")?;
            let mut service = ServiceItem::new(required("name")?, price_value, author.to_string());
            service.code = field("code");
            service.description = field("description");
            service.estimated_minutes = count("minutes")?;
            Ok(Row::Service(service))
        }
    }
}

fn build_header_map(headers: &csv::StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_lowercase(), i))
        .collect()
}

fn get_field(
    record: &csv::StringRecord,
    header_map: &HashMap<String, usize>,
    field: &str,
) -> Option<String> {
    header_map
        .get(field)
        .and_then(|&idx| record.get(idx))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
