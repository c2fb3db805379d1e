//! `oficina order` command - Work orders (OS)

use chrono::Utc;
use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::commands::lines::{
    part_input, print_items, service_input, AddPartArgs, AddServiceArgs, DiscountArgs, LineOpts,
    RemoveArgs,
};
use crate::cli::commands::quote::pick_vehicle;
use crate::cli::commands::utils::{
    emit_document, print_created, print_done, print_field, print_header, print_structured,
    print_totals, warn_discount, Workspace,
};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::GlobalOpts;
use crate::core::money::format_brl;
use crate::core::shop::DocumentDraft;
use crate::core::ShopError;
use crate::entities::{LineItems, OrderStatus, WorkOrder};
use crate::schema::template::DocumentRenderer;
use crate::yaml::parse_record;

#[derive(Subcommand, Debug)]
pub enum OrderCommands {
    /// Open a work order directly (without a quote)
    New(NewArgs),

    /// List work orders
    List(ListArgs),

    /// Show a work order with its lines and totals
    Show(RefArgs),

    /// Add a service line
    AddService(AddServiceArgs),

    /// Add a part line
    AddPart(AddPartArgs),

    /// Remove a line by number
    Remove(RemoveArgs),

    /// Set the flat discount
    Discount(DiscountArgs),

    /// Assign the responsible mechanic
    Assign(AssignArgs),

    /// Move the order through its lifecycle
    Status(StatusArgs),

    /// Print the work order
    Print(PrintArgs),

    /// Edit the work order file in your editor
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

    /// What the customer reported
    #[arg(long)]
    pub complaint: Option<String>,

    /// Odometer at check-in
    #[arg(long)]
    pub mileage: Option<u32>,

    /// Responsible mechanic (ID or short ID)
    #[arg(long, short = 'm')]
    pub mechanic: Option<String>,

    #[command(flatten)]
    pub lines: LineOpts,

    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only orders in this status
    #[arg(long, short = 's')]
    pub status: Option<OrderStatus>,

    /// Only orders still in the shop (open, in progress, waiting parts)
    #[arg(long, conflicts_with = "status")]
    pub active: bool,

    /// Only orders of this mechanic
    #[arg(long, short = 'm')]
    pub mechanic: Option<String>,

    /// Only orders of this customer
    #[arg(long, short = 'c')]
    pub customer: Option<String>,

    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct RefArgs {
    /// Work order ID, short ID (OS@1) or number
    pub order: String,
}

#[derive(clap::Args, Debug)]
pub struct AssignArgs {
    /// Work order ID, short ID (OS@1) or number
    pub order: String,

    /// Mechanic or electrician (ID or short ID)
    pub mechanic: String,
}

#[derive(clap::Args, Debug)]
pub struct StatusArgs {
    /// Work order ID, short ID (OS@1) or number
    pub order: String,

    /// in_progress, waiting_parts, completed, delivered or cancelled
    pub status: OrderStatus,
}

#[derive(clap::Args, Debug)]
pub struct PrintArgs {
    /// Work order ID, short ID (OS@1) or number
    pub order: String,

    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("number", "#", 5),
    ColumnDef::new("customer", "CUSTOMER", 22),
    ColumnDef::new("vehicle", "VEHICLE", 9),
    ColumnDef::new("mechanic", "MECHANIC", 16),
    ColumnDef::new("total", "TOTAL", 14),
    ColumnDef::new("status", "STATUS", 14),
    ColumnDef::new("opened", "OPENED", 10),
];

pub fn run(cmd: OrderCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        OrderCommands::New(args) => run_new(args, global),
        OrderCommands::List(args) => run_list(args, global),
        OrderCommands::Show(args) => run_show(args, global),
        OrderCommands::AddService(args) => run_add_service(args, global),
        OrderCommands::AddPart(args) => run_add_part(args, global),
        OrderCommands::Remove(args) => run_remove(args, global),
        OrderCommands::Discount(args) => run_discount(args, global),
        OrderCommands::Assign(args) => run_assign(args, global),
        OrderCommands::Status(args) => run_status(args, global),
        OrderCommands::Print(args) => run_print(args, global),
        OrderCommands::Edit(args) => run_edit(args, global),
    }
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let customer = ws.shop.require_customer(&ws.resolve(&args.customer))?;
    let vehicle = pick_vehicle(&ws, &customer, args.vehicle.as_deref())?;
    let mechanic = match &args.mechanic {
        Some(m) => Some(ws.shop.require_employee(&ws.resolve(m))?.id),
        None => None,
    };

    let draft = DocumentDraft {
        customer: Some(customer.id.clone()),
        vehicle: Some(vehicle),
        items: args.lines.build(&ws.shop)?,
        notes: args.notes,
        complaint: args.complaint,
        mileage: args.mileage,
        mechanic,
    };
    let order = ws.shop.create_order(draft)?;
    let totals = ws.shop.document_totals(&order.items);

    let short_id = ws.remember(&order.id);
    print_created(
        &format!("work order #{} for {}", order.number, customer.name),
        &short_id,
        &ws.path_of(&order.id),
        global,
    );
    warn_discount(&totals);
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;

    let mechanic = match &args.mechanic {
        Some(m) => Some(ws.shop.require_employee(&ws.resolve(m))?.id),
        None => None,
    };
    let customer = match &args.customer {
        Some(c) => Some(ws.shop.require_customer(&ws.resolve(c))?.id),
        None => None,
    };

    let mut orders: Vec<WorkOrder> = ws
        .shop
        .orders
        .list()?
        .into_iter()
        .filter(|o| args.status.map_or(true, |s| o.status == s))
        .filter(|o| !args.active || o.status.is_active())
        .filter(|o| mechanic.as_ref().map_or(true, |m| o.mechanic.as_ref() == Some(m)))
        .filter(|o| customer.as_ref().map_or(true, |c| &o.customer == c))
        .collect();
    orders.sort_by(|a, b| b.number.cmp(&a.number));

    if let Some(limit) = args.limit {
        orders.truncate(limit);
    }
    if args.count {
        println!("{}", orders.len());
        return Ok(());
    }

    let format = ws.list_format(global);
    if print_structured(&orders, format)? {
        return Ok(());
    }
    if orders.is_empty() {
        println!("No work orders found.");
        return Ok(());
    }

    let customers = ws.shop.customers.list()?;
    let vehicles = ws.shop.vehicles.list()?;
    let employees = ws.shop.employees.list()?;
    ws.remember_all(orders.iter().map(|o| &o.id));

    let rows = orders
        .iter()
        .map(|o| {
            let totals = ws.shop.document_totals(&o.items);
            let name = customers
                .iter()
                .find(|c| c.id == o.customer)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| o.customer.to_string());
            let plate = vehicles
                .iter()
                .find(|v| v.id == o.vehicle)
                .map(|v| CellValue::Text(v.plate.clone()))
                .unwrap_or(CellValue::Empty);
            let mechanic = o
                .mechanic
                .as_ref()
                .and_then(|m| employees.iter().find(|e| &e.id == m))
                .map(|e| CellValue::Text(e.name.clone()))
                .unwrap_or(CellValue::Empty);
            TableRow::new(o.id.to_string(), &ws.short_ids)
                .cell("number", CellValue::Number(i64::from(o.number)))
                .cell("customer", CellValue::Text(name))
                .cell("vehicle", plate)
                .cell("mechanic", mechanic)
                .cell("total", CellValue::Money(totals.net_total))
                .cell("status", CellValue::Status(o.status.to_string()))
                .cell("opened", CellValue::Date(o.created))
        })
        .collect();
    TableFormatter::new(COLUMNS, "work order", "OS").output(rows, format);
    Ok(())
}

fn run_show(args: RefArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let order = ws.order(&args.order)?;

    if print_structured(&order, ws.effective_format(global))? {
        return Ok(());
    }

    let customer = ws.shop.customers.find_by_id(&order.customer)?;
    let vehicle = ws.shop.vehicles.find_by_id(&order.vehicle)?;
    let totals = ws.shop.document_totals(&order.items);
    let short_id = ws.remember(&order.id);

    print_header(format!("{} OS #{}", style(&short_id).cyan(), order.number));
    print_field(
        "Customer",
        customer.map(|c| c.name).unwrap_or_else(|| order.customer.to_string()),
    );
    print_field(
        "Vehicle",
        vehicle
            .map(|v| format!("{} {}", v.plate, v.description()))
            .unwrap_or_else(|| order.vehicle.to_string()),
    );
    print_field("Status", order.status);
    if let Some(m) = &order.mechanic {
        let name = ws
            .shop
            .employees
            .find_by_id(m)?
            .map(|e| e.name)
            .unwrap_or_else(|| m.to_string());
        print_field("Mechanic", name);
    }
    if let Some(km) = order.mileage {
        print_field("Mileage", format!("{} km", km));
    }
    if let Some(complaint) = &order.complaint {
        print_field("Complaint", complaint);
    }
    if let Some(q) = &order.quote {
        if let Some(quote) = ws.shop.quotes.find_by_id(q)? {
            print_field("Quote", format!("#{}", quote.number));
        }
    }
    let local = |t: chrono::DateTime<Utc>| t.with_timezone(&chrono::Local).format("%d/%m/%Y %H:%M");
    print_field("Opened", local(order.created));
    if let Some(t) = order.started_at {
        print_field("Started", local(t));
    }
    if let Some(t) = order.completed_at {
        print_field("Completed", local(t));
    }
    if let Some(t) = order.delivered_at {
        print_field("Delivered", local(t));
    }
    if let Some(notes) = &order.notes {
        print_field("Notes", notes);
    }

    println!();
    print_items(&order.items);
    print_totals(&totals);
    warn_discount(&totals);
    Ok(())
}

fn edit_lines<F>(reference: &str, global: &GlobalOpts, edit: F) -> Result<()>
where
    F: FnOnce(&mut LineItems) -> crate::core::shop::Result<String>,
{
    let mut ws = Workspace::open(global)?;
    let order = ws.order(reference)?;
    let mut message = String::new();
    let order = ws.shop.edit_order(&order.id, |items| {
        message = edit(items)?;
        Ok(())
    })?;
    let totals = ws.shop.document_totals(&order.items);
    print_done(
        format!(
            "{} on OS #{}; total now {}",
            message,
            order.number,
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
            Err(ShopError::NotFound {
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

fn run_assign(args: AssignArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let order = ws.order(&args.order)?;
    let employee = ws.shop.require_employee(&ws.resolve(&args.mechanic))?;
    let order = ws.shop.assign_mechanic(&order.id, &employee.id)?;
    print_done(
        format!("OS #{} assigned to {}", order.number, employee.name),
        global,
    );
    Ok(())
}

fn run_status(args: StatusArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let order = ws.order(&args.order)?;
    let from = order.status;
    let order = ws.shop.transition_order(&order.id, args.status, Utc::now())?;
    print_done(
        format!(
            "OS #{}: {} → {}",
            order.number,
            from,
            style(order.status).bold()
        ),
        global,
    );
    if order.status == OrderStatus::Completed && !global.quiet {
        let totals = ws.shop.document_totals(&order.items);
        println!(
            "   Ready for delivery; amount due {}",
            style(format_brl(totals.net_total)).bold()
        );
    }
    Ok(())
}

fn run_print(args: PrintArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let order = ws.order(&args.order)?;
    let customer = ws.shop.require_customer(&order.customer.to_string())?;
    let vehicle = ws.shop.require_vehicle(&order.vehicle.to_string())?;
    let mechanic = match &order.mechanic {
        Some(m) => ws.shop.employees.find_by_id(m)?,
        None => None,
    };
    let quote_number = match &order.quote {
        Some(q) => ws.shop.quotes.find_by_id(q)?.map(|q| q.number),
        None => None,
    };
    let totals = ws.shop.document_totals(&order.items);

    let renderer =
        DocumentRenderer::new(ws.config.shop_name()).map_err(|e| miette::miette!("{}", e))?;
    let text = renderer
        .render_work_order(
            &order,
            &customer,
            &vehicle,
            mechanic.as_ref(),
            quote_number,
            &totals,
        )
        .map_err(|e| miette::miette!("{}", e))?;
    emit_document(&text, args.output.as_deref(), global)
}

fn run_edit(args: RefArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let order = ws.order(&args.order)?;
    crate::core::workflow::ensure_editable(order.status).map_err(ShopError::from)?;
    let path = ws.path_of(&order.id);

    println!(
        "Opening {} in {}...",
        style(path.display()).cyan(),
        style(ws.config.editor()).yellow()
    );
    ws.config.run_editor(&path).into_diagnostic()?;

    let edited: WorkOrder = parse_record(&path)?;
    if edited.id != order.id || edited.number != order.number {
        ws.shop.orders.update(order)?;
        return Err(miette::miette!("the id and number of a work order cannot be changed"));
    }
    match ws.shop.save_order(edited) {
        Ok(saved) => {
            print_done(format!("Saved OS #{}", saved.number), global);
            Ok(())
        }
        Err(e) => {
            ws.shop.orders.update(order)?;
            Err(e.into())
        }
    }
}
