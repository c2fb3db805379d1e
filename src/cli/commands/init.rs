//! `oficina init` command - Create a shop directory

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::Path;

use crate::core::project::{Project, ProjectError, PROJECT_DIR};
use crate::core::shop::DocumentDraft;
use crate::core::{Config, Shop, ShopSettings};
use crate::entities::{
    ChecklistItem, ChecklistTemplate, Customer, Employee, LineItems, PartItem, Role, ServiceItem,
    Vehicle,
};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: std::path::PathBuf,

    /// Rewrite the configuration even if .oficina/ already exists
    #[arg(long)]
    pub force: bool,

    /// Seed a sample catalog, customer, mechanic and quote
    #[arg(long)]
    pub demo: bool,
}

pub fn run(args: InitArgs) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).into_diagnostic()?;
        println!(
            "{} Created directory {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
    }

    let project = if args.force {
        Project::init_force(&path)
    } else {
        Project::init(&path)
    };

    match project {
        Ok(project) => {
            println!(
                "{} Initialized shop at {}",
                style("✓").green(),
                style(project.root().display()).cyan()
            );
            println!();
            println!("Created structure:");
            print_structure(project.root());

            if args.demo {
                let config = Config::load_for(&project);
                let mut shop = Shop::open(&project, ShopSettings::from_config(&config));
                seed_demo(&mut shop, chrono::Local::now().date_naive())?;
                println!();
                println!("{} Seeded demo records", style("✓").green());
            }

            println!();
            println!("Next steps:");
            println!(
                "  {} Register a customer",
                style("oficina customer new").yellow()
            );
            println!(
                "  {} Add services and parts",
                style("oficina catalog service-new").yellow()
            );
            println!("  {} See the dashboard", style("oficina status").yellow());
            Ok(())
        }
        Err(ProjectError::AlreadyExists(path)) => {
            println!(
                "{} Shop already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            println!();
            println!(
                "Use {} to rewrite the configuration",
                style("oficina init --force").yellow()
            );
            Ok(())
        }
        Err(e) => Err(miette::miette!("{}", e)),
    }
}

fn print_structure(root: &Path) {
    let config = format!("{}/config.yaml", PROJECT_DIR);
    let mut entries = vec![config];
    entries.extend(
        crate::core::identity::EntityPrefix::all()
            .iter()
            .map(|p| format!("{}/", Project::entity_directory(*p))),
    );
    for entry in entries {
        if root.join(&entry).exists() {
            println!("  {}", style(entry).dim());
        }
    }
}

/// Sample records so every command has something to show
fn seed_demo(shop: &mut Shop, today: chrono::NaiveDate) -> Result<()> {
    let author = shop.settings().author.clone();

    let mut alignment = ServiceItem::new("Alinhamento e balanceamento".into(), 150.0, author.clone());
    alignment.code = Some("ALN".into());
    alignment.estimated_minutes = Some(60);
    let alignment = shop.add_service_item(alignment)?;

    let mut oil = ServiceItem::new("Troca de óleo".into(), 80.0, author.clone());
    oil.code = Some("OLEO".into());
    oil.estimated_minutes = Some(30);
    shop.add_service_item(oil)?;

    let mut pads = PartItem::new("PF-100".into(), "Pastilha de freio dianteira".into(), 120.0, author.clone());
    pads.brand = Some("Cobreq".into());
    pads.stock = 8;
    pads.min_stock = 2;
    let pads = shop.add_part_item(pads)?;

    let mut filter = PartItem::new("FO-20".into(), "Filtro de óleo".into(), 35.0, author.clone());
    filter.stock = 15;
    filter.min_stock = 5;
    shop.add_part_item(filter)?;

    let mut customer = Customer::new(
        "Maria da Silva".into(),
        "529.982.247-25".into(),
        "(11) 98765-4321".into(),
        author.clone(),
    );
    customer.city = Some("São Paulo".into());
    customer.state = Some("SP".into());
    let customer = shop.register_customer(customer)?;

    let mut vehicle = Vehicle::new(
        customer.id.clone(),
        "ABC1D23",
        "Volkswagen".into(),
        "Gol".into(),
        2018,
        author.clone(),
    );
    vehicle.mileage = Some(72_000);
    let vehicle = shop.register_vehicle(vehicle)?;

    shop.register_employee(Employee::new(
        "João Pereira".into(),
        Role::Mechanic,
        "111.444.777-35".into(),
        "(11) 91234-5678".into(),
        author.clone(),
    ))?;

    let mut items = LineItems::new();
    items.add_service(shop.service_line_from_catalog(&alignment.code.clone().unwrap_or_default(), None)?)?;
    items.add_part(shop.part_line_from_catalog(&pads.code, 2, None)?)?;
    shop.create_quote(
        DocumentDraft {
            customer: Some(customer.id),
            vehicle: Some(vehicle.id),
            items,
            ..Default::default()
        },
        today,
    )?;

    let checklist_items = [
        "yes_no:Luzes funcionando:required",
        "single_choice:Nível de combustível:reserva|1/4|1/2|3/4|cheio:required",
        "multi_choice:Avarias na lataria:para-choque|portas|capô|teto",
        "long_text:Observações",
    ]
    .iter()
    .enumerate()
    .map(|(i, spec)| ChecklistItem::parse_spec(i as u32 + 1, spec))
    .collect::<std::result::Result<Vec<_>, String>>()
    .map_err(|e| miette::miette!("{}", e))?;
    shop.create_template(ChecklistTemplate::new(
        "Entrada de veículo".into(),
        checklist_items,
        author,
    ))?;

    tracing::info!("demo records seeded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_seed_is_consistent() {
        let mut shop = Shop::in_memory(ShopSettings::default());
        let today = chrono::NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        seed_demo(&mut shop, today).unwrap();

        let quotes = shop.quotes.list().unwrap();
        assert_eq!(quotes.len(), 1);
        // 150 labor + 2 x 120 pads
        let totals = shop.document_totals(&quotes[0].items);
        assert_eq!(totals.net_total, 390.0);
        assert_eq!(shop.templates.list().unwrap()[0].items.len(), 4);
    }
}
