//! `oficina quote` command - Quotes (orçamentos)

use clap::{Subcommand, ValueEnum};
use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::commands::lines::{
    part_input, print_items, service_input, AddPartArgs, AddServiceArgs, DiscountArgs, LineOpts,
    RemoveArgs,
};
use crate::cli::commands::utils::{
    emit_document, print_created, print_done, print_field, print_header, print_structured,
    print_totals, today, warn_discount, Workspace,
};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::GlobalOpts;
use crate::core::money::format_brl;
use crate::core::shop::DocumentDraft;
use crate::entities::{Quote, QuoteStatus};
use crate::schema::template::DocumentRenderer;
use crate::yaml::parse_record;

#[derive(Subcommand, Debug)]
pub enum QuoteCommands {
    /// Create a quote for a customer's vehicle
    New(NewArgs),

    /// List quotes
    List(ListArgs),

    /// Show a quote with its lines and totals
    Show(RefArgs),

    /// Add a service line
    AddService(AddServiceArgs),

    /// Add a part line
    AddPart(AddPartArgs),

    /// Remove a line by number
    Remove(RemoveArgs),

    /// Set the flat discount
    Discount(DiscountArgs),

    /// Record the customer's approval
    Approve(DecisionArgs),

    /// Record the customer's refusal
    Reject(RejectArgs),

    /// Extend validity from today (reopens a rejected quote)
    Renew(RefArgs),

    /// Open a work order from an approved quote
    Convert(RefArgs),

    /// Print the quote for the customer
    Print(PrintArgs),

    /// Edit the quote file in your editor
    Edit(RefArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Customer ID, short ID or CPF/CNPJ
    #[arg(long, short = 'c')]
    pub customer: String,

    /// Vehicle plate or ID (optional when the customer has one vehicle)
    #[arg(long)]
    pub vehicle: Option<String>,

    #[command(flatten)]
    pub lines: LineOpts,

    #[arg(long)]
    pub notes: Option<String>,
}

/// Status filter
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusFilter {
    Pending,
    Approved,
    Rejected,
    Converted,
    /// Pending quotes past their validity date
    Expired,
    All,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    #[arg(long, short = 's', default_value = "all")]
    pub status: StatusFilter,

    /// Only quotes of this customer
    #[arg(long, short = 'c')]
    pub customer: Option<String>,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct RefArgs {
    /// Quote ID, short ID (ORC@1) or number
    pub quote: String,
}

#[derive(clap::Args, Debug)]
pub struct DecisionArgs {
    /// Quote ID, short ID (ORC@1) or number
    pub quote: String,

    /// Who gave the answer (default: configured author)
    #[arg(long)]
    pub by: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct RejectArgs {
    /// Quote ID, short ID (ORC@1) or number
    pub quote: String,

    #[arg(long, short = 'r')]
    pub reason: Option<String>,

    #[arg(long)]
    pub by: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct PrintArgs {
    /// Quote ID, short ID (ORC@1) or number
    pub quote: String,

    /// Write to a file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("number", "#", 5),
    ColumnDef::new("customer", "CUSTOMER", 24),
    ColumnDef::new("vehicle", "VEHICLE", 9),
    ColumnDef::new("total", "TOTAL", 14),
    ColumnDef::new("status", "STATUS", 18),
    ColumnDef::new("valid", "VALID UNTIL", 11),
];

pub fn run(cmd: QuoteCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        QuoteCommands::New(args) => run_new(args, global),
        QuoteCommands::List(args) => run_list(args, global),
        QuoteCommands::Show(args) => run_show(args, global),
        QuoteCommands::AddService(args) => run_add_service(args, global),
        QuoteCommands::AddPart(args) => run_add_part(args, global),
        QuoteCommands::Remove(args) => run_remove(args, global),
        QuoteCommands::Discount(args) => run_discount(args, global),
        QuoteCommands::Approve(args) => run_approve(args, global),
        QuoteCommands::Reject(args) => run_reject(args, global),
        QuoteCommands::Renew(args) => run_renew(args, global),
        QuoteCommands::Convert(args) => run_convert(args, global),
        QuoteCommands::Print(args) => run_print(args, global),
        QuoteCommands::Edit(args) => run_edit(args, global),
    }
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let customer = ws.shop.require_customer(&ws.resolve(&args.customer))?;
    let vehicle = pick_vehicle(&ws, &customer, args.vehicle.as_deref())?;

    let draft = DocumentDraft {
        customer: Some(customer.id.clone()),
        vehicle: Some(vehicle),
        items: args.lines.build(&ws.shop)?,
        notes: args.notes,
        ..Default::default()
    };
    let quote = ws.shop.create_quote(draft, today())?;
    let totals = ws.shop.document_totals(&quote.items);

    let short_id = ws.remember(&quote.id);
    print_created(
        &format!("quote #{} for {}", quote.number, customer.name),
        &short_id,
        &ws.path_of(&quote.id),
        global,
    );
    if !global.quiet {
        println!(
            "   Total {} valid until {}",
            style(format_brl(totals.net_total)).bold(),
            quote.valid_until.format("%d/%m/%Y")
        );
    }
    warn_discount(&totals);
    Ok(())
}

/// The named vehicle, or the customer's only vehicle
pub(crate) fn pick_vehicle(
    ws: &Workspace,
    customer: &crate::entities::Customer,
    reference: Option<&str>,
) -> Result<crate::core::identity::EntityId> {
    match reference {
        Some(r) => Ok(ws.shop.require_vehicle(&ws.resolve(r))?.id),
        None => {
            let mut vehicles = ws.shop.vehicles_of(&customer.id)?;
            match vehicles.len() {
                1 => Ok(vehicles.remove(0).id),
                0 => Err(miette::miette!(
                    "{} has no vehicles; register one with `oficina vehicle new`",
                    customer.name
                )),
                _ => Err(miette::miette!(
                    "{} has {} vehicles; choose one with --vehicle",
                    customer.name,
                    vehicles.len()
                )),
            }
        }
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let today = today();

    let customer = match &args.customer {
        Some(r) => Some(ws.shop.require_customer(&ws.resolve(r))?),
        None => None,
    };

    let mut quotes: Vec<Quote> = ws
        .shop
        .quotes
        .list()?
        .into_iter()
        .filter(|q| customer.as_ref().map_or(true, |c| q.customer == c.id))
        .filter(|q| match args.status {
            StatusFilter::Pending => q.status == QuoteStatus::Pending,
            StatusFilter::Approved => q.status == QuoteStatus::Approved,
            StatusFilter::Rejected => q.status == QuoteStatus::Rejected,
            StatusFilter::Converted => q.status == QuoteStatus::ConvertedToOrder,
            StatusFilter::Expired => q.status == QuoteStatus::Pending && q.is_expired(today),
            StatusFilter::All => true,
        })
        .collect();
    quotes.sort_by(|a, b| b.number.cmp(&a.number));

    if let Some(limit) = args.limit {
        quotes.truncate(limit);
    }
    if args.count {
        println!("{}", quotes.len());
        return Ok(());
    }

    let format = ws.list_format(global);
    if print_structured(&quotes, format)? {
        return Ok(());
    }
    if quotes.is_empty() {
        println!("No quotes found.");
        return Ok(());
    }

    let customers = ws.shop.customers.list()?;
    let vehicles = ws.shop.vehicles.list()?;
    ws.remember_all(quotes.iter().map(|q| &q.id));

    let rows = quotes
        .iter()
        .map(|q| {
            let totals = ws.shop.document_totals(&q.items);
            let name = customers
                .iter()
                .find(|c| c.id == q.customer)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| q.customer.to_string());
            let plate = vehicles
                .iter()
                .find(|v| v.id == q.vehicle)
                .map(|v| CellValue::Text(v.plate.clone()))
                .unwrap_or(CellValue::Empty);
            let valid = q.valid_until.format("%d/%m/%Y").to_string();
            TableRow::new(q.id.to_string(), &ws.short_ids)
                .cell("number", CellValue::Number(i64::from(q.number)))
                .cell("customer", CellValue::Text(name))
                .cell("vehicle", plate)
                .cell("total", CellValue::Money(totals.net_total))
                .cell("status", CellValue::Status(q.status.to_string()))
                .cell(
                    "valid",
                    if q.status == QuoteStatus::Pending && q.is_expired(today) {
                        CellValue::Alert(valid)
                    } else {
                        CellValue::Text(valid)
                    },
                )
        })
        .collect();
    TableFormatter::new(COLUMNS, "quote", "ORC").output(rows, format);
    Ok(())
}

fn run_show(args: RefArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let quote = ws.quote(&args.quote)?;

    if print_structured(&quote, ws.effective_format(global))? {
        return Ok(());
    }

    let customer = ws.shop.customers.find_by_id(&quote.customer)?;
    let vehicle = ws.shop.vehicles.find_by_id(&quote.vehicle)?;
    let totals = ws.shop.document_totals(&quote.items);
    let short_id = ws.remember(&quote.id);

    print_header(format!("{} Quote #{}", style(&short_id).cyan(), quote.number));
    print_field(
        "Customer",
        customer.map(|c| c.name).unwrap_or_else(|| quote.customer.to_string()),
    );
    print_field(
        "Vehicle",
        vehicle
            .map(|v| format!("{} {}", v.plate, v.description()))
            .unwrap_or_else(|| quote.vehicle.to_string()),
    );
    print_field("Status", &quote.status);
    if quote.status == QuoteStatus::Pending && quote.is_expired(today()) {
        print_field(
            "Valid until",
            style(format!("{} (expired)", quote.valid_until.format("%d/%m/%Y"))).red(),
        );
    } else {
        print_field("Valid until", quote.valid_until.format("%d/%m/%Y"));
    }
    if let Some(by) = &quote.decided_by {
        print_field("Decided by", by);
    }
    if let Some(reason) = &quote.rejection_reason {
        print_field("Reason", reason);
    }
    if let Some(order) = &quote.work_order {
        print_field("Work order", ws.display_id(order));
    }
    if let Some(notes) = &quote.notes {
        print_field("Notes", notes);
    }

    println!();
    print_items(&quote.items);
    print_totals(&totals);
    warn_discount(&totals);
    Ok(())
}

fn edit_lines<F>(reference: &str, global: &GlobalOpts, edit: F) -> Result<()>
where
    F: FnOnce(&mut crate::entities::LineItems) -> crate::core::shop::Result<String>,
{
    let mut ws = Workspace::open(global)?;
    let quote = ws.quote(reference)?;
    let mut message = String::new();
    let quote = ws.shop.edit_quote(&quote.id, |items| {
        message = edit(items)?;
        Ok(())
    })?;
    let totals = ws.shop.document_totals(&quote.items);
    print_done(
        format!(
            "{} on quote #{}; total now {}",
            message,
            quote.number,
            format_brl(totals.net_total)
        ),
        global,
    );
    warn_discount(&totals);
    Ok(())
}

fn run_add_service(args: AddServiceArgs, global: &GlobalOpts) -> Result<()> {
    let input = {
        let ws = Workspace::open(global)?;
        service_input(&ws.shop, &args)?
    };
    edit_lines(&args.document, global, |items| {
        let line = items.add_service(input)?;
        Ok(format!("Added service line {}", line))
    })
}

fn run_add_part(args: AddPartArgs, global: &GlobalOpts) -> Result<()> {
    let input = {
        let ws = Workspace::open(global)?;
        part_input(&ws.shop, &args)?
    };
    edit_lines(&args.document, global, |items| {
        let line = items.add_part(input)?;
        Ok(format!("Added part line {}", line))
    })
}

fn run_remove(args: RemoveArgs, global: &GlobalOpts) -> Result<()> {
    let line = args.line;
    edit_lines(&args.document, global, |items| {
        if items.remove_line(line) {
            Ok(format!("Removed line {}", line))
        } else {
            Err(crate::core::ShopError::NotFound {
                kind: "line",
                reference: line.to_string(),
            })
        }
    })
}

fn run_discount(args: DiscountArgs, global: &GlobalOpts) -> Result<()> {
    let amount = args.amount;
    edit_lines(&args.document, global, |items| {
        items.set_discount(amount)?;
        Ok(format!("Discount set to {}", format_brl(amount)))
    })
}

fn run_approve(args: DecisionArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let quote = ws.quote(&args.quote)?;
    let by = args.by.unwrap_or_else(|| ws.shop.settings().author.clone());
    let quote = ws.shop.approve_quote(&quote.id, &by, today())?;
    print_done(
        format!(
            "Quote #{} approved. Convert it with {}",
            quote.number,
            style(format!("oficina quote convert {}", quote.number)).yellow()
        ),
        global,
    );
    Ok(())
}

fn run_reject(args: RejectArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let quote = ws.quote(&args.quote)?;
    let by = args.by.unwrap_or_else(|| ws.shop.settings().author.clone());
    let quote = ws.shop.reject_quote(&quote.id, &by, args.reason)?;
    print_done(format!("Quote #{} rejected", quote.number), global);
    Ok(())
}

fn run_renew(args: RefArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let quote = ws.quote(&args.quote)?;
    let quote = ws.shop.renew_quote(&quote.id, today())?;
    print_done(
        format!(
            "Quote #{} is pending and valid until {}",
            quote.number,
            quote.valid_until.format("%d/%m/%Y")
        ),
        global,
    );
    Ok(())
}

fn run_convert(args: RefArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let quote = ws.quote(&args.quote)?;
    let (quote, order) = ws.shop.convert_quote(&quote.id)?;
    let short_id = ws.remember(&order.id);
    print_created(
        &format!("work order #{} from quote #{}", order.number, quote.number),
        &short_id,
        &ws.path_of(&order.id),
        global,
    );
    Ok(())
}

fn run_print(args: PrintArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let quote = ws.quote(&args.quote)?;
    let customer = ws.shop.require_customer(&quote.customer.to_string())?;
    let vehicle = ws.shop.require_vehicle(&quote.vehicle.to_string())?;
    let totals = ws.shop.document_totals(&quote.items);

    let renderer =
        DocumentRenderer::new(ws.config.shop_name()).map_err(|e| miette::miette!("{}", e))?;
    let text = renderer
        .render_quote(&quote, &customer, &vehicle, &totals)
        .map_err(|e| miette::miette!("{}", e))?;
    emit_document(&text, args.output.as_deref(), global)
}

fn run_edit(args: RefArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let quote = ws.quote(&args.quote)?;
    crate::core::workflow::ensure_editable(quote.status).map_err(crate::core::ShopError::from)?;
    let path = ws.path_of(&quote.id);

    println!(
        "Opening {} in {}...",
        style(path.display()).cyan(),
        style(ws.config.editor()).yellow()
    );
    ws.config.run_editor(&path).into_diagnostic()?;

    let edited: Quote = parse_record(&path)?;
    if edited.id != quote.id || edited.number != quote.number {
        // put the stored copy back so the file matches the last valid state
        ws.shop.quotes.update(quote)?;
        return Err(miette::miette!("the id and number of a quote cannot be changed"));
    }
    match ws.shop.save_quote(edited) {
        Ok(saved) => {
            let totals = ws.shop.document_totals(&saved.items);
            print_done(
                format!("Saved quote #{}; total {}", saved.number, format_brl(totals.net_total)),
                global,
            );
            warn_discount(&totals);
            Ok(())
        }
        Err(e) => {
            ws.shop.quotes.update(quote)?;
            Err(e.into())
        }
    }
}
