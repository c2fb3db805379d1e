//! `oficina schedule` command - Appointments (agenda)

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::commands::quote::pick_vehicle;
use crate::cli::commands::utils::{print_created, print_done, print_structured, today, Workspace};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::GlobalOpts;
use crate::core::shop::AppointmentDraft;
use crate::entities::{Appointment, AppointmentStatus};

#[derive(Subcommand, Debug)]
pub enum ScheduleCommands {
    /// Book a vehicle into a time slot
    New(NewArgs),

    /// List upcoming appointments
    List(ListArgs),

    /// Show the agenda of one day
    Day(DayArgs),

    /// Confirm, complete, cancel or mark a no-show
    Status(StatusArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Customer ID, short ID or CPF/CNPJ
    #[arg(long, short = 'c')]
    pub customer: String,

    /// Vehicle plate or ID (optional when the customer has one vehicle)
    #[arg(long)]
    pub vehicle: Option<String>,

    /// Day (YYYY-MM-DD or DD/MM/YYYY)
    #[arg(long, short = 'd', value_parser = parse_date)]
    pub date: NaiveDate,

    /// Start time (HH:MM)
    #[arg(long, short = 't', value_parser = parse_time)]
    pub time: NaiveTime,

    /// Length in minutes
    #[arg(long, default_value_t = 60)]
    pub duration: u32,

    /// What will be done
    #[arg(long, short = 's')]
    pub service: String,

    /// Mechanic to reserve (ID or short ID)
    #[arg(long, short = 'm')]
    pub mechanic: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Include past and closed appointments
    #[arg(long, short = 'a')]
    pub all: bool,

    /// Number of days ahead to show
    #[arg(long, default_value_t = 7)]
    pub days: u32,

    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct DayArgs {
    /// Day to show (default: today)
    #[arg(value_parser = parse_date)]
    pub date: Option<NaiveDate>,
}

#[derive(clap::Args, Debug)]
pub struct StatusArgs {
    /// Appointment ID or short ID (AGD@1)
    pub appointment: String,

    /// confirmed, completed, cancelled or no_show
    pub status: AppointmentStatus,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("when", "WHEN", 16),
    ColumnDef::new("until", "UNTIL", 5),
    ColumnDef::new("vehicle", "VEHICLE", 9),
    ColumnDef::new("customer", "CUSTOMER", 22),
    ColumnDef::new("service", "SERVICE", 28),
    ColumnDef::new("mechanic", "MECHANIC", 16),
    ColumnDef::new("status", "STATUS", 10),
];

/// `YYYY-MM-DD` or `DD/MM/YYYY`
pub fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .map_err(|_| format!("'{}' is not a date; use YYYY-MM-DD or DD/MM/YYYY", s))
}

/// `HH:MM`, also `14h` and `14h30`
pub fn parse_time(s: &str) -> std::result::Result<NaiveTime, String> {
    let s = s.trim().to_lowercase();
    let normalized = match s.split_once('h') {
        Some((h, "")) => format!("{}:00", h),
        Some((h, m)) => format!("{}:{}", h, m),
        None => s.clone(),
    };
    NaiveTime::parse_from_str(&normalized, "%H:%M")
        .map_err(|_| format!("'{}' is not a time; use HH:MM", s))
}

pub fn run(cmd: ScheduleCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ScheduleCommands::New(args) => run_new(args, global),
        ScheduleCommands::List(args) => run_list(args, global),
        ScheduleCommands::Day(args) => run_day(args, global),
        ScheduleCommands::Status(args) => run_status(args, global),
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

    let starts_at = NaiveDateTime::new(args.date, args.time);
    if args.date < today() {
        eprintln!(
            "{} {} is in the past",
            style("!").yellow(),
            args.date.format("%d/%m/%Y")
        );
    }

    let appointment = ws.shop.schedule(AppointmentDraft {
        customer: customer.id.clone(),
        vehicle,
        mechanic,
        starts_at,
        duration_minutes: args.duration,
        service: args.service,
        notes: args.notes,
    })?;

    let short_id = ws.remember(&appointment.id);
    print_created(
        &format!(
            "appointment for {} on {} {}-{}",
            customer.name,
            appointment.starts_at.format("%d/%m/%Y"),
            appointment.starts_at.format("%H:%M"),
            appointment.ends_at().format("%H:%M"),
        ),
        &short_id,
        &ws.path_of(&appointment.id),
        global,
    );
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let start = today();
    let end = start + Duration::days(i64::from(args.days));

    let mut appointments: Vec<Appointment> = ws
        .shop
        .appointments
        .list()?
        .into_iter()
        .filter(|a| args.all || (a.status.blocks_slot() && a.date() >= start && a.date() < end))
        .collect();
    appointments.sort_by_key(|a| a.starts_at);

    if args.count {
        println!("{}", appointments.len());
        return Ok(());
    }
    print_agenda(ws, appointments, global, "No appointments in the next days.")
}

fn run_day(args: DayArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let date = args.date.unwrap_or_else(today);
    let appointments = ws.shop.appointments_on(date)?;
    let empty = format!("Nothing booked on {}.", date.format("%d/%m/%Y"));
    print_agenda(ws, appointments, global, &empty)
}

fn print_agenda(
    mut ws: Workspace,
    appointments: Vec<Appointment>,
    global: &GlobalOpts,
    empty: &str,
) -> Result<()> {
    let format = ws.list_format(global);
    if print_structured(&appointments, format)? {
        return Ok(());
    }
    if appointments.is_empty() {
        println!("{}", empty);
        return Ok(());
    }

    let customers = ws.shop.customers.list()?;
    let vehicles = ws.shop.vehicles.list()?;
    let employees = ws.shop.employees.list()?;
    ws.remember_all(appointments.iter().map(|a| &a.id));

    let rows = appointments
        .iter()
        .map(|a| {
            let customer = customers
                .iter()
                .find(|c| c.id == a.customer)
                .map(|c| CellValue::Text(c.name.clone()))
                .unwrap_or(CellValue::Empty);
            let plate = vehicles
                .iter()
                .find(|v| v.id == a.vehicle)
                .map(|v| CellValue::Text(v.plate.clone()))
                .unwrap_or(CellValue::Empty);
            let mechanic = a
                .mechanic
                .as_ref()
                .and_then(|m| employees.iter().find(|e| &e.id == m))
                .map(|e| CellValue::Text(e.name.clone()))
                .unwrap_or(CellValue::Empty);
            TableRow::new(a.id.to_string(), &ws.short_ids)
                .cell(
                    "when",
                    CellValue::Text(a.starts_at.format("%d/%m/%Y %H:%M").to_string()),
                )
                .cell("until", CellValue::Text(a.ends_at().format("%H:%M").to_string()))
                .cell("vehicle", plate)
                .cell("customer", customer)
                .cell("service", CellValue::Text(a.service.clone()))
                .cell("mechanic", mechanic)
                .cell("status", CellValue::Status(a.status.to_string()))
        })
        .collect();
    TableFormatter::new(COLUMNS, "appointment", "AGD").output(rows, format);
    Ok(())
}

fn run_status(args: StatusArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let reference = ws.resolve(&args.appointment);
    let appointment = ws
        .shop
        .appointments
        .find(&reference)?
        .ok_or_else(|| miette::miette!("appointment not found: {}", args.appointment))?;
    let appointment = ws.shop.transition_appointment(&appointment.id, args.status)?;
    print_done(
        format!(
            "Appointment {} on {} is now {}",
            ws.display_id(&appointment.id),
            appointment.starts_at.format("%d/%m/%Y %H:%M"),
            appointment.status
        ),
        global,
    );
    Ok(())
}
