//! `oficina portal` command - What a customer sees and can decide
//!
//! The portal is keyed by the customer's CPF/CNPJ. A customer only ever
//! sees their own vehicles, quotes, work orders and upcoming appointments,
//! and may approve or reject their own pending quotes. Decisions are
//! recorded as made by "portal".

use clap::Subcommand;
use console::style;
use miette::Result;
use serde::Serialize;

use crate::cli::commands::utils::{print_done, print_header, print_structured, today, Workspace};
use crate::cli::GlobalOpts;
use crate::core::identity::EntityId;
use crate::core::money::format_brl;
use crate::core::totals::Totals;
use crate::entities::{Appointment, Customer, Quote, QuoteStatus, Vehicle, WorkOrder};

#[derive(Subcommand, Debug)]
pub enum PortalCommands {
    /// Show the customer's vehicles, quotes, orders and appointments
    Show(ShowArgs),

    /// Approve one of the customer's pending quotes
    Approve(DecisionArgs),

    /// Reject one of the customer's pending quotes
    Reject(RejectArgs),
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Customer CPF/CNPJ or ID
    pub customer: String,
}

#[derive(clap::Args, Debug)]
pub struct DecisionArgs {
    /// Customer CPF/CNPJ or ID
    pub customer: String,

    /// Quote number
    pub quote: String,
}

#[derive(clap::Args, Debug)]
pub struct RejectArgs {
    /// Customer CPF/CNPJ or ID
    pub customer: String,

    /// Quote number
    pub quote: String,

    #[arg(long, short = 'r')]
    pub reason: Option<String>,
}

#[derive(Serialize)]
struct DocumentSummary<'a, T> {
    #[serde(flatten)]
    record: &'a T,
    totals: &'a Totals,
}

#[derive(Serialize)]
struct PortalOutput<'a> {
    customer: &'a Customer,
    vehicles: &'a [Vehicle],
    quotes: Vec<DocumentSummary<'a, Quote>>,
    orders: Vec<DocumentSummary<'a, WorkOrder>>,
    appointments: &'a [Appointment],
}

pub fn run(cmd: PortalCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        PortalCommands::Show(args) => run_show(args, global),
        PortalCommands::Approve(args) => run_approve(args, global),
        PortalCommands::Reject(args) => run_reject(args, global),
    }
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let customer = ws.shop.require_customer(&ws.resolve(&args.customer))?;
    let today = today();
    let mut view = ws.shop.portal(&customer.id, today)?;
    view.quotes.sort_by(|a, b| b.0.number.cmp(&a.0.number));
    view.orders.sort_by(|a, b| b.0.number.cmp(&a.0.number));

    let output = PortalOutput {
        customer: &view.customer,
        vehicles: &view.vehicles,
        quotes: view
            .quotes
            .iter()
            .map(|(q, t)| DocumentSummary { record: q, totals: t })
            .collect(),
        orders: view
            .orders
            .iter()
            .map(|(o, t)| DocumentSummary { record: o, totals: t })
            .collect(),
        appointments: &view.appointments,
    };
    if print_structured(&output, ws.effective_format(global))? {
        return Ok(());
    }

    print_header(format!("Olá, {}", view.customer.name));

    println!("{}", style("Vehicles").bold());
    if view.vehicles.is_empty() {
        println!("  {}", style("none").dim());
    }
    let plate_of = |id: &EntityId| {
        view.vehicles
            .iter()
            .find(|v| &v.id == id)
            .map(|v| v.plate.clone())
            .unwrap_or_default()
    };
    for v in &view.vehicles {
        println!("  {} {}", style(&v.plate).cyan(), v.description());
    }

    println!();
    println!("{}", style("Quotes").bold());
    if view.quotes.is_empty() {
        println!("  {}", style("none").dim());
    }
    for (q, totals) in &view.quotes {
        let status = if q.status == QuoteStatus::Pending && q.is_expired(today) {
            style("expired".to_string()).red()
        } else if q.status == QuoteStatus::Pending {
            style(format!("awaiting your answer until {}", q.valid_until.format("%d/%m/%Y"))).yellow()
        } else {
            style(q.status.to_string())
        };
        println!(
            "  #{:<4} {:<8} {:>14}  {}",
            q.number,
            plate_of(&q.vehicle),
            format_brl(totals.net_total),
            status
        );
    }

    println!();
    println!("{}", style("Work orders").bold());
    if view.orders.is_empty() {
        println!("  {}", style("none").dim());
    }
    for (o, totals) in &view.orders {
        println!(
            "  OS #{:<4} {:<8} {:>14}  {}",
            o.number,
            plate_of(&o.vehicle),
            format_brl(totals.net_total),
            o.status
        );
    }

    if !view.appointments.is_empty() {
        println!();
        println!("{}", style("Upcoming appointments").bold());
        for a in &view.appointments {
            println!(
                "  {} {:<8} {}",
                a.starts_at.format("%d/%m/%Y %H:%M"),
                plate_of(&a.vehicle),
                a.service
            );
        }
    }
    Ok(())
}

/// The quote as this customer knows it; other customers' quotes stay hidden
fn customer_quote(ws: &Workspace, customer: &Customer, reference: &str) -> Result<Quote> {
    let hidden = || miette::miette!("quote not found: {}", reference);
    let quote = ws.quote(reference).map_err(|_| hidden())?;
    if quote.customer != customer.id {
        return Err(hidden());
    }
    Ok(quote)
}

fn run_approve(args: DecisionArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let customer = ws.shop.require_customer(&ws.resolve(&args.customer))?;
    let quote = customer_quote(&ws, &customer, &args.quote)?;
    let quote = ws.shop.portal_approve(&customer.id, &quote.id, today())?;
    print_done(
        format!("Quote #{} approved. The shop will open your work order.", quote.number),
        global,
    );
    Ok(())
}

fn run_reject(args: RejectArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let customer = ws.shop.require_customer(&ws.resolve(&args.customer))?;
    let quote = customer_quote(&ws, &customer, &args.quote)?;
    let quote = ws.shop.portal_reject(&customer.id, &quote.id, args.reason)?;
    print_done(format!("Quote #{} rejected", quote.number), global);
    Ok(())
}
