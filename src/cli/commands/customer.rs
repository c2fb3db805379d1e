//! `oficina customer` command - Customer registry

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::commands::utils::{
    print_created, print_done, print_field, print_header, print_structured, Workspace,
};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::GlobalOpts;
use crate::core::identity::EntityPrefix;
use crate::entities::Customer;
use crate::schema::wizard::{is_interactive, SchemaWizard};
use crate::yaml::parse_record;

#[derive(Subcommand, Debug)]
pub enum CustomerCommands {
    /// Register a new customer
    New(NewArgs),

    /// List customers
    List(ListArgs),

    /// Show a customer and their vehicles
    Show(RefArgs),

    /// Edit a customer file in your editor
    Edit(RefArgs),

    /// Delete a customer that nothing refers to
    Delete(RefArgs),

    /// Keep the customer on file but hide them from lists
    Deactivate(RefArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Full name or company name
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    /// CPF or CNPJ, with or without punctuation
    #[arg(long, short = 'd')]
    pub document: Option<String>,

    #[arg(long, short = 'p')]
    pub phone: Option<String>,

    #[arg(long, short = 'e')]
    pub email: Option<String>,

    #[arg(long)]
    pub address: Option<String>,

    #[arg(long)]
    pub city: Option<String>,

    /// Two-letter state (UF)
    #[arg(long)]
    pub state: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,

    /// Prompt for each field
    #[arg(long, short = 'i')]
    pub interactive: bool,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Search in name, document, phone and email
    #[arg(long)]
    pub search: Option<String>,

    #[arg(long)]
    pub city: Option<String>,

    /// Include deactivated customers
    #[arg(long, short = 'a')]
    pub all: bool,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct RefArgs {
    /// Customer ID, short ID (CLI@1) or CPF/CNPJ
    pub customer: String,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("name", "NAME", 28),
    ColumnDef::new("document", "DOCUMENT", 18),
    ColumnDef::new("phone", "PHONE", 15),
    ColumnDef::new("city", "CITY", 16),
    ColumnDef::new("active", "ACTIVE", 6),
];

pub fn run(cmd: CustomerCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        CustomerCommands::New(args) => run_new(args, global),
        CustomerCommands::List(args) => run_list(args, global),
        CustomerCommands::Show(args) => run_show(args, global),
        CustomerCommands::Edit(args) => run_edit(args, global),
        CustomerCommands::Delete(args) => run_delete(args, global),
        CustomerCommands::Deactivate(args) => run_deactivate(args, global),
    }
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let author = ws.shop.settings().author.clone();

    let customer = if args.interactive {
        if !is_interactive() {
            return Err(miette::miette!("--interactive needs a terminal"));
        }
        let result = SchemaWizard::new().run(EntityPrefix::Cli)?;
        let field = |key: &str| result.get_string(key).map(String::from);
        let mut customer = Customer::new(
            field("name").unwrap_or_default(),
            field("document").unwrap_or_default(),
            field("phone").unwrap_or_default(),
            author,
        );
        customer.email = field("email");
        customer.address = field("address");
        customer.city = field("city");
        customer.state = field("state");
        customer.notes = field("notes");
        customer
    } else {
        let name = args
            .name
            .ok_or_else(|| miette::miette!("--name is required (or use --interactive)"))?;
        let document = args
            .document
            .ok_or_else(|| miette::miette!("--document is required (CPF or CNPJ)"))?;
        let phone = args
            .phone
            .ok_or_else(|| miette::miette!("--phone is required"))?;
        let mut customer = Customer::new(name, document, phone, author);
        customer.email = args.email;
        customer.address = args.address;
        customer.city = args.city;
        customer.state = args.state.map(|s| s.to_uppercase());
        customer.notes = args.notes;
        customer
    };

    let customer = ws.shop.register_customer(customer)?;
    let short_id = ws.remember(&customer.id);
    print_created("customer", &short_id, &ws.path_of(&customer.id), global);
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let search = args.search.as_ref().map(|s| s.to_lowercase());

    let mut customers: Vec<Customer> = ws
        .shop
        .customers
        .list()?
        .into_iter()
        .filter(|c| args.all || c.active)
        .filter(|c| {
            args.city.as_ref().map_or(true, |city| {
                c.city
                    .as_deref()
                    .is_some_and(|v| v.eq_ignore_ascii_case(city))
            })
        })
        .filter(|c| {
            search.as_ref().map_or(true, |term| {
                c.name.to_lowercase().contains(term)
                    || c.document_digits().contains(term.as_str())
                    || c.phone.contains(term.as_str())
                    || c.email
                        .as_deref()
                        .is_some_and(|e| e.to_lowercase().contains(term))
            })
        })
        .collect();
    customers.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

    if let Some(limit) = args.limit {
        customers.truncate(limit);
    }

    if args.count {
        println!("{}", customers.len());
        return Ok(());
    }

    let format = ws.list_format(global);
    if print_structured(&customers, format)? {
        return Ok(());
    }

    if customers.is_empty() {
        println!("No customers found.");
        return Ok(());
    }

    ws.remember_all(customers.iter().map(|c| &c.id));
    let rows = customers
        .iter()
        .map(|c| {
            TableRow::new(c.id.to_string(), &ws.short_ids)
                .cell("name", CellValue::Text(c.name.clone()))
                .cell("document", CellValue::Text(c.document.clone()))
                .cell("phone", CellValue::Text(c.phone.clone()))
                .cell(
                    "city",
                    c.city
                        .clone()
                        .map(CellValue::Text)
                        .unwrap_or(CellValue::Empty),
                )
                .cell("active", CellValue::Flag(c.active))
        })
        .collect();
    TableFormatter::new(COLUMNS, "customer", "CLI").output(rows, format);
    Ok(())
}

fn run_show(args: RefArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let customer = ws.shop.require_customer(&ws.resolve(&args.customer))?;
    let vehicles = ws.shop.vehicles_of(&customer.id)?;

    if print_structured(&customer, ws.effective_format(global))? {
        return Ok(());
    }

    let short_id = ws.remember(&customer.id);
    print_header(format!("{} {}", style(&short_id).cyan(), customer.name));
    print_field(customer.document_kind(), &customer.document);
    print_field("Phone", &customer.phone);
    if let Some(email) = &customer.email {
        print_field("Email", email);
    }
    let place: Vec<&str> = [&customer.address, &customer.city, &customer.state]
        .into_iter()
        .filter_map(|v| v.as_deref())
        .collect();
    if !place.is_empty() {
        print_field("Address", place.join(", "));
    }
    if !customer.active {
        print_field("Status", style("inactive").red());
    }
    if let Some(notes) = &customer.notes {
        print_field("Notes", notes);
    }

    println!();
    if vehicles.is_empty() {
        println!("{}", style("No vehicles registered.").dim());
    } else {
        println!("{}", style("Vehicles").bold());
        ws.remember_all(vehicles.iter().map(|v| &v.id));
        for v in &vehicles {
            println!(
                "  {:<8} {:<9} {}",
                style(ws.display_id(&v.id)).cyan(),
                v.plate,
                v.description()
            );
        }
    }
    Ok(())
}

fn run_edit(args: RefArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let customer = ws.shop.require_customer(&ws.resolve(&args.customer))?;
    let path = ws.path_of(&customer.id);

    println!(
        "Opening {} in {}...",
        style(path.display()).cyan(),
        style(ws.config.editor()).yellow()
    );
    ws.config.run_editor(&path).into_diagnostic()?;

    let edited: Customer = parse_record(&path)?;
    if edited.id != customer.id {
        return Err(miette::miette!("the id field cannot be changed"));
    }
    ws.shop.update_customer(edited)?;
    print_done(format!("Saved {}", ws.display_id(&customer.id)), global);
    Ok(())
}

fn run_delete(args: RefArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let customer = ws.shop.require_customer(&ws.resolve(&args.customer))?;
    let label = ws.display_id(&customer.id);
    ws.shop.delete(&customer.id)?;
    print_done(format!("Deleted customer {} ({})", label, customer.name), global);
    Ok(())
}

fn run_deactivate(args: RefArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let customer = ws.shop.require_customer(&ws.resolve(&args.customer))?;
    let customer = ws.shop.deactivate_customer(&customer.id)?;
    print_done(
        format!("Deactivated customer {} ({})", ws.display_id(&customer.id), customer.name),
        global,
    );
    Ok(())
}
