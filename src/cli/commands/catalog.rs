//! `oficina catalog` command - Services and parts offered by the shop

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::commands::utils::{print_created, print_done, print_structured, Workspace};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::money::{format_brl, parse_price_arg};
use crate::entities::{PartItem, ServiceItem};

#[derive(Subcommand, Debug)]
pub enum CatalogCommands {
    /// Add a labor service
    ServiceNew(ServiceNewArgs),

    /// Add a stocked part
    PartNew(PartNewArgs),

    /// List services and parts
    List(ListArgs),

    /// Search services and parts by name or code
    Search(SearchArgs),

    /// Adjust the quantity on hand of a part
    Stock(StockArgs),
}

#[derive(clap::Args, Debug)]
pub struct ServiceNewArgs {
    #[arg(long, short = 'n')]
    pub name: String,

    /// Price (150, 150,00 or R$ 1.234,56)
    #[arg(long, short = 'p', value_parser = parse_price_arg)]
    pub price: f64,

    #[arg(long, short = 'c')]
    pub code: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Expected labor time in minutes
    #[arg(long)]
    pub minutes: Option<u32>,
}

#[derive(clap::Args, Debug)]
pub struct PartNewArgs {
    #[arg(long, short = 'c')]
    pub code: String,

    #[arg(long, short = 'n')]
    pub name: String,

    /// Sale price per unit
    #[arg(long, short = 'p', value_parser = parse_price_arg)]
    pub price: f64,

    /// Purchase cost per unit
    #[arg(long, value_parser = parse_price_arg)]
    pub cost: Option<f64>,

    #[arg(long, short = 'b')]
    pub brand: Option<String>,

    /// Units on hand
    #[arg(long, default_value_t = 0)]
    pub stock: u32,

    /// Warn when stock falls to this level
    #[arg(long, default_value_t = 0)]
    pub min_stock: u32,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only services
    #[arg(long, conflicts_with = "parts")]
    pub services: bool,

    /// Only parts
    #[arg(long)]
    pub parts: bool,

    /// Only parts at or below their minimum stock
    #[arg(long)]
    pub low_stock: bool,
}

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Text to look for in names and codes
    pub term: String,
}

#[derive(clap::Args, Debug)]
pub struct StockArgs {
    /// Part code, ID or short ID (PEC@1)
    pub part: String,

    /// Units received (negative to write off)
    #[arg(long, allow_negative_numbers = true, conflicts_with = "set")]
    pub add: Option<i64>,

    /// Set the quantity on hand after a count
    #[arg(long)]
    pub set: Option<u32>,
}

const SERVICE_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("code", "CODE", 10),
    ColumnDef::new("name", "SERVICE", 32),
    ColumnDef::new("price", "PRICE", 14),
    ColumnDef::new("minutes", "MIN", 5),
];

const PART_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("code", "CODE", 12),
    ColumnDef::new("name", "PART", 30),
    ColumnDef::new("brand", "BRAND", 12),
    ColumnDef::new("price", "PRICE", 14),
    ColumnDef::new("stock", "STOCK", 6),
];

pub fn run(cmd: CatalogCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        CatalogCommands::ServiceNew(args) => run_service_new(args, global),
        CatalogCommands::PartNew(args) => run_part_new(args, global),
        CatalogCommands::List(args) => run_list(args, global),
        CatalogCommands::Search(args) => run_search(args, global),
        CatalogCommands::Stock(args) => run_stock(args, global),
    }
}

fn run_service_new(args: ServiceNewArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let mut item = ServiceItem::new(args.name, args.price, ws.shop.settings().author.clone());
    item.code = args.code;
    item.description = args.description;
    item.estimated_minutes = args.minutes;

    let item = ws.shop.add_service_item(item)?;
    let short_id = ws.remember(&item.id);
    print_created("service", &short_id, &ws.path_of(&item.id), global);
    Ok(())
}

fn run_part_new(args: PartNewArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let mut item = PartItem::new(
        args.code,
        args.name,
        args.price,
        ws.shop.settings().author.clone(),
    );
    item.cost = args.cost;
    item.brand = args.brand;
    item.stock = args.stock;
    item.min_stock = args.min_stock;

    let item = ws.shop.add_part_item(item)?;
    let short_id = ws.remember(&item.id);
    print_created(
        &format!("part {}", item.code),
        &short_id,
        &ws.path_of(&item.id),
        global,
    );
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let services: Vec<ServiceItem> = if args.parts || args.low_stock {
        Vec::new()
    } else {
        ws.shop.services.list()?.into_iter().filter(|s| s.active).collect()
    };
    let parts: Vec<PartItem> = if args.services {
        Vec::new()
    } else {
        ws.shop
            .parts
            .list()?
            .into_iter()
            .filter(|p| p.active && (!args.low_stock || p.is_low_stock()))
            .collect()
    };
    print_catalog(ws, services, parts, global)
}

fn run_search(args: SearchArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let matches = ws.shop.search_catalog(&args.term)?;
    if matches.services.is_empty() && matches.parts.is_empty() {
        println!("Nothing in the catalog matches '{}'.", args.term);
        return Ok(());
    }
    print_catalog(ws, matches.services, matches.parts, global)
}

fn print_catalog(
    mut ws: Workspace,
    mut services: Vec<ServiceItem>,
    mut parts: Vec<PartItem>,
    global: &GlobalOpts,
) -> Result<()> {
    services.sort_by(|a, b| a.name.cmp(&b.name));
    parts.sort_by(|a, b| a.code.cmp(&b.code));

    let format = ws.list_format(global);
    if matches!(format, OutputFormat::Json | OutputFormat::Yaml) {
        #[derive(serde::Serialize)]
        struct Catalog<'a> {
            services: &'a [ServiceItem],
            parts: &'a [PartItem],
        }
        print_structured(
            &Catalog {
                services: &services,
                parts: &parts,
            },
            format,
        )?;
        return Ok(());
    }

    ws.remember_all(services.iter().map(|s| &s.id));
    ws.remember_all(parts.iter().map(|p| &p.id));

    if !services.is_empty() {
        let rows = services
            .iter()
            .map(|s| {
                TableRow::new(s.id.to_string(), &ws.short_ids)
                    .cell(
                        "code",
                        s.code.clone().map(CellValue::Text).unwrap_or(CellValue::Empty),
                    )
                    .cell("name", CellValue::Text(s.name.clone()))
                    .cell("price", CellValue::Money(s.price))
                    .cell(
                        "minutes",
                        s.estimated_minutes
                            .map(|m| CellValue::Number(i64::from(m)))
                            .unwrap_or(CellValue::Empty),
                    )
            })
            .collect();
        TableFormatter::new(SERVICE_COLUMNS, "service", "SVC").output(rows, format);
    }

    if !parts.is_empty() {
        if !services.is_empty() && format == OutputFormat::Tsv {
            println!();
        }
        let rows = parts
            .iter()
            .map(|p| {
                TableRow::new(p.id.to_string(), &ws.short_ids)
                    .cell("code", CellValue::Text(p.code.clone()))
                    .cell("name", CellValue::Text(p.name.clone()))
                    .cell(
                        "brand",
                        p.brand.clone().map(CellValue::Text).unwrap_or(CellValue::Empty),
                    )
                    .cell("price", CellValue::Money(p.price))
                    .cell(
                        "stock",
                        if p.is_low_stock() {
                            CellValue::Alert(p.stock.to_string())
                        } else {
                            CellValue::Number(i64::from(p.stock))
                        },
                    )
            })
            .collect();
        TableFormatter::new(PART_COLUMNS, "part", "PEC").output(rows, format);
    }

    if services.is_empty() && parts.is_empty() {
        println!("The catalog is empty.");
    }
    Ok(())
}

fn run_stock(args: StockArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let reference = ws.resolve(&args.part);
    let mut part = ws
        .shop
        .find_part(&reference)?
        .ok_or_else(|| miette::miette!("part not found: {}", args.part))?;
    let before = part.stock;

    part.stock = match (args.add, args.set) {
        (_, Some(count)) => count,
        (Some(delta), None) => {
            let next = i64::from(part.stock) + delta;
            u32::try_from(next).map_err(|_| {
                miette::miette!(
                    "{} has {} on hand; cannot remove {}",
                    part.code,
                    part.stock,
                    -delta
                )
            })?
        }
        (None, None) => {
            println!(
                "{} {}: {} on hand (minimum {}), {} each",
                style(&part.code).cyan(),
                part.name,
                part.stock,
                part.min_stock,
                format_brl(part.price)
            );
            return Ok(());
        }
    };

    let part = ws.shop.update_part_item(part)?;
    tracing::info!(code = %part.code, before, after = part.stock, "stock adjusted");
    print_done(
        format!("{} stock {} → {}", part.code, before, part.stock),
        global,
    );
    if part.is_low_stock() {
        eprintln!(
            "{} {} is at or below its minimum stock ({})",
            style("!").yellow(),
            part.code,
            part.min_stock
        );
    }
    Ok(())
}
