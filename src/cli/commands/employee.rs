//! `oficina employee` command - Employee registry

use chrono::NaiveDate;
use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::commands::utils::{
    print_created, print_done, print_field, print_header, print_structured, Workspace,
};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::GlobalOpts;
use crate::entities::{Employee, OrderStatus, Role};

#[derive(Subcommand, Debug)]
pub enum EmployeeCommands {
    /// Register an employee
    New(NewArgs),

    /// List employees
    List(ListArgs),

    /// Show an employee and their open work orders
    Show(RefArgs),

    /// Mark an employee as no longer working at the shop
    Deactivate(RefArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    #[arg(long, short = 'n')]
    pub name: String,

    /// mechanic, electrician, attendant or manager
    #[arg(long, short = 'r', default_value = "mechanic")]
    pub role: Role,

    /// CPF
    #[arg(long, short = 'd')]
    pub document: String,

    #[arg(long, short = 'p')]
    pub phone: String,

    #[arg(long, short = 'e')]
    pub email: Option<String>,

    /// Hiring date (YYYY-MM-DD)
    #[arg(long)]
    pub hired: Option<NaiveDate>,

    /// Commission on labor, in percent
    #[arg(long, default_value_t = 0.0)]
    pub commission: f64,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    #[arg(long, short = 'r')]
    pub role: Option<Role>,

    /// Include former employees
    #[arg(long, short = 'a')]
    pub all: bool,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct RefArgs {
    /// Employee ID or short ID (FUN@1)
    pub employee: String,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("name", "NAME", 28),
    ColumnDef::new("role", "ROLE", 12),
    ColumnDef::new("phone", "PHONE", 15),
    ColumnDef::new("active", "ACTIVE", 6),
];

pub fn run(cmd: EmployeeCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        EmployeeCommands::New(args) => run_new(args, global),
        EmployeeCommands::List(args) => run_list(args, global),
        EmployeeCommands::Show(args) => run_show(args, global),
        EmployeeCommands::Deactivate(args) => run_deactivate(args, global),
    }
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let author = ws.shop.settings().author.clone();

    let mut employee = Employee::new(args.name, args.role, args.document, args.phone, author);
    employee.email = args.email;
    employee.hired_on = args.hired;
    employee.commission_pct = args.commission;

    let employee = ws.shop.register_employee(employee)?;
    let short_id = ws.remember(&employee.id);
    print_created(
        &format!("{} {}", employee.role, employee.name),
        &short_id,
        &ws.path_of(&employee.id),
        global,
    );
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let mut employees: Vec<Employee> = ws
        .shop
        .employees
        .list()?
        .into_iter()
        .filter(|e| args.all || e.active)
        .filter(|e| args.role.map_or(true, |r| e.role == r))
        .collect();
    employees.sort_by(|a, b| a.name.cmp(&b.name));

    if args.count {
        println!("{}", employees.len());
        return Ok(());
    }

    let format = ws.list_format(global);
    if print_structured(&employees, format)? {
        return Ok(());
    }
    if employees.is_empty() {
        println!("No employees found.");
        return Ok(());
    }

    ws.remember_all(employees.iter().map(|e| &e.id));
    let rows = employees
        .iter()
        .map(|e| {
            TableRow::new(e.id.to_string(), &ws.short_ids)
                .cell("name", CellValue::Text(e.name.clone()))
                .cell("role", CellValue::Text(e.role.to_string()))
                .cell("phone", CellValue::Text(e.phone.clone()))
                .cell("active", CellValue::Flag(e.active))
        })
        .collect();
    TableFormatter::new(COLUMNS, "employee", "FUN").output(rows, format);
    Ok(())
}

fn run_show(args: RefArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let employee = ws.shop.require_employee(&ws.resolve(&args.employee))?;

    if print_structured(&employee, ws.effective_format(global))? {
        return Ok(());
    }

    let mut orders: Vec<_> = ws
        .shop
        .orders
        .list()?
        .into_iter()
        .filter(|o| o.mechanic.as_ref() == Some(&employee.id) && o.status.is_active())
        .collect();
    orders.sort_by_key(|o| o.number);

    let short_id = ws.remember(&employee.id);
    print_header(format!("{} {}", style(&short_id).cyan(), employee.name));
    print_field("Role", employee.role);
    print_field("CPF", &employee.document);
    print_field("Phone", &employee.phone);
    if let Some(email) = &employee.email {
        print_field("Email", email);
    }
    if let Some(hired) = employee.hired_on {
        print_field("Hired", hired.format("%d/%m/%Y"));
    }
    if employee.commission_pct > 0.0 {
        print_field("Commission", format!("{}%", employee.commission_pct));
    }
    if !employee.active {
        print_field("Status", style("inactive").red());
    }

    if employee.role.works_on_vehicles() {
        println!();
        if orders.is_empty() {
            println!("{}", style("No open work orders.").dim());
        } else {
            println!("{}", style("Open work orders").bold());
            for o in &orders {
                let flag = if o.status == OrderStatus::WaitingParts {
                    style(o.status.to_string()).yellow()
                } else {
                    style(o.status.to_string())
                };
                println!("  OS #{:<5} {}", o.number, flag);
            }
        }
    }
    Ok(())
}

fn run_deactivate(args: RefArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let employee = ws.shop.require_employee(&ws.resolve(&args.employee))?;
    let employee = ws.shop.deactivate_employee(&employee.id)?;
    print_done(
        format!("Deactivated {} ({})", ws.display_id(&employee.id), employee.name),
        global,
    );
    Ok(())
}
