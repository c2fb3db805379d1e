//! `oficina checklist` command - Inspection templates and filled checklists

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::commands::utils::{
    print_created, print_field, print_header, print_structured, Workspace,
};
use crate::cli::helpers::split_pair;
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::GlobalOpts;
use crate::entities::{AnswerValue, ChecklistItem, ChecklistTemplate, Inspection};
use crate::schema::wizard::{is_interactive, ChecklistWizard};

#[derive(Subcommand, Debug)]
pub enum ChecklistCommands {
    /// Create an inspection template
    TemplateNew(TemplateNewArgs),

    /// List templates
    Templates,

    /// Fill a checklist for a vehicle
    Fill(FillArgs),

    /// List filled checklists
    List(ListArgs),

    /// Show a filled checklist
    Show(ShowArgs),
}

#[derive(clap::Args, Debug)]
pub struct TemplateNewArgs {
    #[arg(long, short = 'n')]
    pub name: String,

    /// Item as `kind:label[:opt1|opt2][:required]` (repeatable),
    /// e.g. `yes_no:Luzes funcionando:required`
    #[arg(long = "item", short = 'i', required = true)]
    pub items: Vec<String>,

    #[arg(long)]
    pub description: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct FillArgs {
    /// Template ID, short ID (CHK@1) or name
    pub template: String,

    /// Vehicle plate or ID
    #[arg(long)]
    pub vehicle: String,

    /// Work order the inspection belongs to
    #[arg(long, short = 'o')]
    pub order: Option<String>,

    /// Answer as `ITEM=VALUE`, where ITEM is the item number or label (repeatable)
    #[arg(long = "answer", short = 'a')]
    pub answers: Vec<String>,

    /// Never prompt for unanswered items
    #[arg(long)]
    pub no_prompt: bool,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only checklists of this vehicle
    #[arg(long)]
    pub vehicle: Option<String>,

    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Inspection ID or short ID (INS@1)
    pub inspection: String,
}

const TEMPLATE_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("name", "TEMPLATE", 30),
    ColumnDef::new("items", "ITEMS", 5),
    ColumnDef::new("required", "REQUIRED", 8),
];

const INSPECTION_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("date", "DATE", 10),
    ColumnDef::new("template", "TEMPLATE", 28),
    ColumnDef::new("vehicle", "VEHICLE", 9),
    ColumnDef::new("answers", "ANSWERS", 7),
];

pub fn run(cmd: ChecklistCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ChecklistCommands::TemplateNew(args) => run_template_new(args, global),
        ChecklistCommands::Templates => run_templates(global),
        ChecklistCommands::Fill(args) => run_fill(args, global),
        ChecklistCommands::List(args) => run_list(args, global),
        ChecklistCommands::Show(args) => run_show(args, global),
    }
}

fn run_template_new(args: TemplateNewArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let items = args
        .items
        .iter()
        .enumerate()
        .map(|(i, spec)| ChecklistItem::parse_spec(i as u32 + 1, spec))
        .collect::<std::result::Result<Vec<_>, String>>()
        .map_err(|e| miette::miette!("{}", e))?;

    let mut template = ChecklistTemplate::new(args.name, items, ws.shop.settings().author.clone());
    template.description = args.description;
    let template = ws.shop.create_template(template)?;

    let short_id = ws.remember(&template.id);
    print_created(
        &format!("checklist '{}' with {} items", template.name, template.items.len()),
        &short_id,
        &ws.path_of(&template.id),
        global,
    );
    Ok(())
}

fn run_templates(global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let mut templates: Vec<ChecklistTemplate> = ws
        .shop
        .templates
        .list()?
        .into_iter()
        .filter(|t| t.active)
        .collect();
    templates.sort_by(|a, b| a.name.cmp(&b.name));

    let format = ws.list_format(global);
    if print_structured(&templates, format)? {
        return Ok(());
    }
    if templates.is_empty() {
        println!("No checklist templates. Create one with `oficina checklist template-new`.");
        return Ok(());
    }

    ws.remember_all(templates.iter().map(|t| &t.id));
    let rows = templates
        .iter()
        .map(|t| {
            TableRow::new(t.id.to_string(), &ws.short_ids)
                .cell("name", CellValue::Text(t.name.clone()))
                .cell("items", CellValue::Number(t.items.len() as i64))
                .cell(
                    "required",
                    CellValue::Number(t.items.iter().filter(|i| i.required).count() as i64),
                )
        })
        .collect();
    TableFormatter::new(TEMPLATE_COLUMNS, "template", "CHK").output(rows, format);
    Ok(())
}

fn find_template(ws: &Workspace, reference: &str) -> Result<ChecklistTemplate> {
    let resolved = ws.resolve(reference);
    if let Some(t) = ws.shop.templates.find(&resolved)? {
        return Ok(t);
    }
    let lower = reference.to_lowercase();
    ws.shop
        .templates
        .list()?
        .into_iter()
        .find(|t| t.name.to_lowercase() == lower)
        .ok_or_else(|| miette::miette!("checklist template not found: {}", reference))
}

/// The item an `--answer` key refers to: its number or its label
fn answer_target<'a>(template: &'a ChecklistTemplate, key: &str) -> Option<&'a ChecklistItem> {
    match key.parse::<u32>() {
        Ok(id) => template.item(id),
        Err(_) => template
            .items
            .iter()
            .find(|i| i.label.eq_ignore_ascii_case(key)),
    }
}

fn run_fill(args: FillArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let template = find_template(&ws, &args.template)?;
    let vehicle = ws.shop.require_vehicle(&ws.resolve(&args.vehicle))?;

    let mut inspection = Inspection::new(&template, vehicle.id.clone(), ws.shop.settings().author.clone());
    if let Some(o) = &args.order {
        inspection.work_order = Some(ws.order(o)?.id);
    }

    for raw in &args.answers {
        let (key, value) = split_pair(raw).map_err(|e| miette::miette!("{}", e))?;
        let item = answer_target(&template, &key).ok_or_else(|| {
            miette::miette!("'{}' has no item '{}'", template.name, key)
        })?;
        let value = AnswerValue::parse(item.kind, &value)
            .map_err(|e| miette::miette!("{}: {}", item.label, e))?;
        inspection.set_answer(item.id, value);
    }

    if !args.no_prompt && is_interactive() {
        ChecklistWizard::new().fill(&template, &mut inspection)?;
    }

    let inspection = ws.shop.record_inspection(inspection)?;
    let short_id = ws.remember(&inspection.id);
    print_created(
        &format!("checklist '{}' for {}", template.name, vehicle.plate),
        &short_id,
        &ws.path_of(&inspection.id),
        global,
    );
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let vehicle = match &args.vehicle {
        Some(v) => Some(ws.shop.require_vehicle(&ws.resolve(v))?.id),
        None => None,
    };

    let mut inspections: Vec<Inspection> = ws
        .shop
        .inspections
        .list()?
        .into_iter()
        .filter(|i| vehicle.as_ref().map_or(true, |v| &i.vehicle == v))
        .collect();
    inspections.sort_by(|a, b| b.created.cmp(&a.created));

    if args.count {
        println!("{}", inspections.len());
        return Ok(());
    }

    let format = ws.list_format(global);
    if print_structured(&inspections, format)? {
        return Ok(());
    }
    if inspections.is_empty() {
        println!("No checklists found.");
        return Ok(());
    }

    let vehicles = ws.shop.vehicles.list()?;
    ws.remember_all(inspections.iter().map(|i| &i.id));
    let rows = inspections
        .iter()
        .map(|i| {
            let plate = vehicles
                .iter()
                .find(|v| v.id == i.vehicle)
                .map(|v| CellValue::Text(v.plate.clone()))
                .unwrap_or(CellValue::Empty);
            TableRow::new(i.id.to_string(), &ws.short_ids)
                .cell("date", CellValue::Date(i.created))
                .cell("template", CellValue::Text(i.template_name.clone()))
                .cell("vehicle", plate)
                .cell("answers", CellValue::Number(i.answers.len() as i64))
        })
        .collect();
    TableFormatter::new(INSPECTION_COLUMNS, "checklist", "INS").output(rows, format);
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    let reference = ws.resolve(&args.inspection);
    let inspection = ws
        .shop
        .inspections
        .find(&reference)?
        .ok_or_else(|| miette::miette!("checklist not found: {}", args.inspection))?;

    if print_structured(&inspection, ws.effective_format(global))? {
        return Ok(());
    }

    let template = ws.shop.templates.find_by_id(&inspection.template)?;
    let vehicle = ws.shop.vehicles.find_by_id(&inspection.vehicle)?;
    let short_id = ws.remember(&inspection.id);

    print_header(format!("{} {}", style(&short_id).cyan(), inspection.template_name));
    print_field(
        "Vehicle",
        vehicle
            .map(|v| format!("{} {}", v.plate, v.description()))
            .unwrap_or_else(|| inspection.vehicle.to_string()),
    );
    print_field(
        "Date",
        inspection
            .created
            .with_timezone(&chrono::Local)
            .format("%d/%m/%Y %H:%M"),
    );
    print_field("By", &inspection.author);
    println!();

    match template {
        Some(template) => {
            for item in &template.items {
                let answer = match inspection.answer(item.id) {
                    Some(AnswerValue::YesNo(false)) => style("não".to_string()).red().to_string(),
                    Some(value) => value.to_string(),
                    None => style("-".to_string()).dim().to_string(),
                };
                println!("  {:>2}. {}: {}", item.id, item.label, answer);
            }
        }
        // template removed since; show the raw answers
        None => {
            for answer in &inspection.answers {
                println!("  {:>2}. {}", answer.item, answer.value);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> ChecklistTemplate {
        let items = vec![
            ChecklistItem::parse_spec(1, "yes_no:Luzes:required").unwrap(),
            ChecklistItem::parse_spec(2, "single_choice:Pneus:bom|gasto").unwrap(),
        ];
        ChecklistTemplate::new("Entrada".into(), items, "t".into())
    }

    #[test]
    fn test_answer_target_by_number_or_label() {
        let t = template();
        assert_eq!(answer_target(&t, "1").map(|i| i.id), Some(1));
        assert_eq!(answer_target(&t, "pneus").map(|i| i.id), Some(2));
        assert!(answer_target(&t, "3").is_none());
        assert!(answer_target(&t, "Freios").is_none());
    }
}
