//! `oficina vehicle` command - Vehicle registry

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::commands::utils::{
    print_created, print_done, print_field, print_header, print_structured, Workspace,
};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::GlobalOpts;
use crate::core::identity::EntityPrefix;
use crate::entities::Vehicle;
use crate::schema::wizard::{is_interactive, SchemaWizard};

#[derive(Subcommand, Debug)]
pub enum VehicleCommands {
    /// Register a vehicle for a customer
    New(NewArgs),

    /// List vehicles
    List(ListArgs),

    /// Show a vehicle and its service history
    Show(RefArgs),

    /// Delete a vehicle with no quotes, orders or appointments
    Delete(RefArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Owner: customer ID, short ID or CPF/CNPJ
    #[arg(long, short = 'c')]
    pub customer: String,

    /// License plate (ABC-1234 or Mercosul ABC1D23)
    #[arg(long)]
    pub plate: Option<String>,

    #[arg(long, short = 'b')]
    pub brand: Option<String>,

    #[arg(long, short = 'm')]
    pub model: Option<String>,

    #[arg(long, short = 'y')]
    pub year: Option<u16>,

    #[arg(long)]
    pub color: Option<String>,

    /// Odometer reading in km
    #[arg(long)]
    pub mileage: Option<u32>,

    #[arg(long)]
    pub notes: Option<String>,

    /// Prompt for each field
    #[arg(long, short = 'i')]
    pub interactive: bool,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only vehicles of this customer
    #[arg(long, short = 'c')]
    pub customer: Option<String>,

    /// Search in plate, brand and model
    #[arg(long)]
    pub search: Option<String>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct RefArgs {
    /// Vehicle ID, short ID (VEI@1) or plate
    pub vehicle: String,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("plate", "PLATE", 9),
    ColumnDef::new("vehicle", "VEHICLE", 28),
    ColumnDef::new("color", "COLOR", 10),
    ColumnDef::new("mileage", "KM", 9),
    ColumnDef::new("owner", "OWNER", 24),
];

pub fn run(cmd: VehicleCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        VehicleCommands::New(args) => run_new(args, global),
        VehicleCommands::List(args) => run_list(args, global),
        VehicleCommands::Show(args) => run_show(args, global),
        VehicleCommands::Delete(args) => run_delete(args, global),
    }
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let owner = ws.shop.require_customer(&ws.resolve(&args.customer))?;
    let author = ws.shop.settings().author.clone();

    let vehicle = if args.interactive {
        if !is_interactive() {
            return Err(miette::miette!("--interactive needs a terminal"));
        }
        let result = SchemaWizard::new().run(EntityPrefix::Vei)?;
        let field = |key: &str| result.get_string(key).map(String::from);
        let year = result
            .get_u64("year")
            .and_then(|y| u16::try_from(y).ok())
            .unwrap_or_default();
        let mut vehicle = Vehicle::new(
            owner.id.clone(),
            &field("plate").unwrap_or_default(),
            field("brand").unwrap_or_default(),
            field("model").unwrap_or_default(),
            year,
            author,
        );
        vehicle.color = field("color");
        vehicle.mileage = result.get_u64("mileage").and_then(|m| u32::try_from(m).ok());
        vehicle.notes = field("notes");
        vehicle
    } else {
        let plate = args
            .plate
            .ok_or_else(|| miette::miette!("--plate is required (or use --interactive)"))?;
        let brand = args
            .brand
            .ok_or_else(|| miette::miette!("--brand is required"))?;
        let model = args
            .model
            .ok_or_else(|| miette::miette!("--model is required"))?;
        let year = args.year.ok_or_else(|| miette::miette!("--year is required"))?;
        let mut vehicle = Vehicle::new(owner.id.clone(), &plate, brand, model, year, author);
        vehicle.color = args.color;
        vehicle.mileage = args.mileage;
        vehicle.notes = args.notes;
        vehicle
    };

    let vehicle = ws.shop.register_vehicle(vehicle)?;
    let short_id = ws.remember(&vehicle.id);
    print_created(
        &format!("vehicle {} for {}", vehicle.plate, owner.name),
        &short_id,
        &ws.path_of(&vehicle.id),
        global,
    );
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;

    let owner = match &args.customer {
        Some(reference) => Some(ws.shop.require_customer(&ws.resolve(reference))?),
        None => None,
    };
    let search = args.search.as_ref().map(|s| s.to_lowercase());

    let mut vehicles: Vec<Vehicle> = match &owner {
        Some(c) => ws.shop.vehicles_of(&c.id)?,
        None => ws.shop.vehicles.list()?,
    };
    vehicles.retain(|v| {
        search.as_ref().map_or(true, |term| {
            v.plate.to_lowercase().contains(term)
                || v.brand.to_lowercase().contains(term)
                || v.model.to_lowercase().contains(term)
        })
    });
    vehicles.sort_by(|a, b| a.plate.cmp(&b.plate));

    if args.count {
        println!("{}", vehicles.len());
        return Ok(());
    }

    let format = ws.list_format(global);
    if print_structured(&vehicles, format)? {
        return Ok(());
    }
    if vehicles.is_empty() {
        println!("No vehicles found.");
        return Ok(());
    }

    let owners = ws.shop.customers.list()?;
    ws.remember_all(vehicles.iter().map(|v| &v.id));
    let rows = vehicles
        .iter()
        .map(|v| {
            let owner = owners
                .iter()
                .find(|c| c.id == v.customer)
                .map(|c| CellValue::Text(c.name.clone()))
                .unwrap_or(CellValue::Empty);
            TableRow::new(v.id.to_string(), &ws.short_ids)
                .cell("plate", CellValue::Text(v.plate.clone()))
                .cell("vehicle", CellValue::Text(v.description()))
                .cell(
                    "color",
                    v.color.clone().map(CellValue::Text).unwrap_or(CellValue::Empty),
                )
                .cell(
                    "mileage",
                    v.mileage
                        .map(|m| CellValue::Number(i64::from(m)))
                        .unwrap_or(CellValue::Empty),
                )
                .cell("owner", owner)
        })
        .collect();
    TableFormatter::new(COLUMNS, "vehicle", "VEI").output(rows, format);
    Ok(())
}

fn run_show(args: RefArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let vehicle = ws.shop.require_vehicle(&ws.resolve(&args.vehicle))?;

    if print_structured(&vehicle, ws.effective_format(global))? {
        return Ok(());
    }

    let owner = ws.shop.customers.find_by_id(&vehicle.customer)?;
    let mut orders: Vec<_> = ws
        .shop
        .orders
        .list()?
        .into_iter()
        .filter(|o| o.vehicle == vehicle.id)
        .collect();
    orders.sort_by_key(|o| o.number);

    let short_id = ws.remember(&vehicle.id);
    print_header(format!(
        "{} {} {}",
        style(&short_id).cyan(),
        vehicle.plate,
        vehicle.description()
    ));
    print_field(
        "Owner",
        owner
            .map(|c| c.name)
            .unwrap_or_else(|| vehicle.customer.to_string()),
    );
    if let Some(color) = &vehicle.color {
        print_field("Color", color);
    }
    if let Some(km) = vehicle.mileage {
        print_field("Mileage", format!("{} km", km));
    }
    if let Some(notes) = &vehicle.notes {
        print_field("Notes", notes);
    }

    println!();
    if orders.is_empty() {
        println!("{}", style("No work orders yet.").dim());
    } else {
        println!("{}", style("Work orders").bold());
        for o in &orders {
            println!(
                "  OS #{:<5} {:<14} {}",
                o.number,
                o.status,
                o.complaint.as_deref().unwrap_or("-")
            );
        }
    }
    Ok(())
}

fn run_delete(args: RefArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let vehicle = ws.shop.require_vehicle(&ws.resolve(&args.vehicle))?;
    let label = ws.display_id(&vehicle.id);
    ws.shop.delete(&vehicle.id)?;
    print_done(format!("Deleted vehicle {} ({})", label, vehicle.plate), global);
    Ok(())
}
