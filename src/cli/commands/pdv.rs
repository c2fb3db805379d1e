//! `oficina pdv` command - Counter sales of parts

use chrono::Utc;
use clap::Subcommand;
use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::commands::lines::parse_part_spec;
use crate::cli::commands::utils::{
    emit_document, print_created, print_done, print_field, print_header, print_structured,
    print_totals, today, Workspace,
};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::GlobalOpts;
use crate::core::money::{format_brl, parse_price_arg};
use crate::core::shop::{SaleDraft, SaleLine};
use crate::entities::{LineItems, PaymentMethod, Sale, SaleStatus};
use crate::schema::template::DocumentRenderer;

#[derive(Subcommand, Debug)]
pub enum PdvCommands {
    /// Ring up a sale and take the parts out of stock
    Sell(SellArgs),

    /// List sales
    List(ListArgs),

    /// Show a sale
    Show(RefArgs),

    /// Cancel a sale and return its parts to stock
    Cancel(RefArgs),

    /// Print the receipt of a sale
    Receipt(ReceiptArgs),
}

#[derive(clap::Args, Debug)]
pub struct SellArgs {
    /// Part with quantity: `PF-100` or `PF-100:2` (repeatable)
    #[arg(long = "part", short = 'p', required = true)]
    pub parts: Vec<String>,

    /// Customer (walk-in sales may omit it)
    #[arg(long, short = 'c')]
    pub customer: Option<String>,

    /// Flat discount in reais; the total never goes below zero
    #[arg(long, value_parser = parse_price_arg, default_value = "0")]
    pub discount: f64,

    /// cash, debit, credit or pix
    #[arg(long, default_value = "cash")]
    pub payment: PaymentMethod,

    /// Cash handed over, to compute change
    #[arg(long, value_parser = parse_price_arg)]
    pub received: Option<f64>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only sales of today
    #[arg(long)]
    pub today: bool,

    /// Include cancelled sales
    #[arg(long, short = 'a')]
    pub all: bool,

    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct RefArgs {
    /// Sale ID, short ID (VND@1) or number
    pub sale: String,
}

#[derive(clap::Args, Debug)]
pub struct ReceiptArgs {
    /// Sale ID, short ID (VND@1) or number
    pub sale: String,

    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("number", "#", 5),
    ColumnDef::new("date", "DATE", 10),
    ColumnDef::new("items", "ITEMS", 5),
    ColumnDef::new("payment", "PAYMENT", 7),
    ColumnDef::new("total", "TOTAL", 14),
    ColumnDef::new("status", "STATUS", 10),
];

pub fn run(cmd: PdvCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        PdvCommands::Sell(args) => run_sell(args, global),
        PdvCommands::List(args) => run_list(args, global),
        PdvCommands::Show(args) => run_show(args, global),
        PdvCommands::Cancel(args) => run_cancel(args, global),
        PdvCommands::Receipt(args) => run_receipt(args, global),
    }
}

fn run_sell(args: SellArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let customer = match &args.customer {
        Some(c) => Some(ws.shop.require_customer(&ws.resolve(c))?.id),
        None => None,
    };
    let lines = args
        .parts
        .iter()
        .map(|spec| {
            let (part, quantity) = parse_part_spec(spec)?;
            Ok(SaleLine {
                part: ws.resolve(part),
                quantity,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let sale = ws.shop.create_sale(SaleDraft {
        customer,
        lines,
        discount: args.discount,
        payment: args.payment,
        amount_received: args.received,
    })?;
    let totals = sale.totals();

    let short_id = ws.remember(&sale.id);
    print_created(
        &format!("sale #{}", sale.number),
        &short_id,
        &ws.path_of(&sale.id),
        global,
    );
    if !global.quiet {
        println!(
            "   Total {} ({})",
            style(format_brl(totals.net_total)).bold(),
            sale.payment
        );
        if let Some(change) = sale.change() {
            println!("   Change {}", style(format_brl(change)).green());
        }
    }
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let today = today();

    let mut sales: Vec<Sale> = ws
        .shop
        .sales
        .list()?
        .into_iter()
        .filter(|s| args.all || s.status == SaleStatus::Completed)
        .filter(|s| !args.today || s.created.with_timezone(&chrono::Local).date_naive() == today)
        .collect();
    sales.sort_by(|a, b| b.number.cmp(&a.number));

    if let Some(limit) = args.limit {
        sales.truncate(limit);
    }
    if args.count {
        println!("{}", sales.len());
        return Ok(());
    }

    let format = ws.list_format(global);
    if print_structured(&sales, format)? {
        return Ok(());
    }
    if sales.is_empty() {
        println!("No sales found.");
        return Ok(());
    }

    ws.remember_all(sales.iter().map(|s| &s.id));
    let rows = sales
        .iter()
        .map(|s| {
            TableRow::new(s.id.to_string(), &ws.short_ids)
                .cell("number", CellValue::Number(i64::from(s.number)))
                .cell("date", CellValue::Date(s.created))
                .cell("items", CellValue::Number(s.items.len() as i64))
                .cell("payment", CellValue::Text(s.payment.to_string()))
                .cell("total", CellValue::Money(s.totals().net_total))
                .cell("status", CellValue::Status(s.status.to_string()))
        })
        .collect();
    TableFormatter::new(COLUMNS, "sale", "VND").output(rows, format);

    if format == crate::cli::OutputFormat::Tsv && !global.quiet {
        let total: f64 = sales
            .iter()
            .filter(|s| s.status == SaleStatus::Completed)
            .map(|s| s.totals().net_total)
            .sum();
        println!("Completed total: {}", style(format_brl(total)).bold());
    }
    Ok(())
}

fn run_show(args: RefArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let sale = ws.sale(&args.sale)?;

    if print_structured(&sale, ws.effective_format(global))? {
        return Ok(());
    }

    let short_id = ws.remember(&sale.id);
    print_header(format!("{} Sale #{}", style(&short_id).cyan(), sale.number));
    print_field(
        "Date",
        sale.created.with_timezone(&chrono::Local).format("%d/%m/%Y %H:%M"),
    );
    if let Some(c) = &sale.customer {
        let name = ws
            .shop
            .customers
            .find_by_id(c)?
            .map(|c| c.name)
            .unwrap_or_else(|| c.to_string());
        print_field("Customer", name);
    }
    print_field("Payment", sale.payment);
    if sale.status == SaleStatus::Cancelled {
        print_field("Status", style("cancelled").red());
    }

    println!();
    // reuse the document line table; a sale only has part lines
    let items = LineItems {
        parts: sale.items.clone(),
        ..LineItems::new()
    };
    crate::cli::commands::lines::print_items(&items);
    print_totals(&sale.totals());
    if let Some(received) = sale.amount_received {
        print_field("Received", format_brl(received));
    }
    if let Some(change) = sale.change() {
        print_field("Change", format_brl(change));
    }
    Ok(())
}

fn run_cancel(args: RefArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let sale = ws.sale(&args.sale)?;
    let sale = ws.shop.cancel_sale(&sale.id, Utc::now())?;
    print_done(
        format!(
            "Sale #{} cancelled; {} item(s) returned to stock",
            sale.number,
            sale.items.iter().filter(|l| l.catalog.is_some()).count()
        ),
        global,
    );
    Ok(())
}

fn run_receipt(args: ReceiptArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let sale = ws.sale(&args.sale)?;
    let customer = match &sale.customer {
        Some(c) => ws.shop.customers.find_by_id(c)?,
        None => None,
    };

    let renderer =
        DocumentRenderer::new(ws.config.shop_name()).map_err(|e| miette::miette!("{}", e))?;
    let text = renderer
        .render_receipt(&sale, customer.as_ref())
        .map_err(|e| miette::miette!("{}", e))?;
    emit_document(&text, args.output.as_deref(), global)
}
