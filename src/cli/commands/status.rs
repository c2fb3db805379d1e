//! `oficina status` command - Shop dashboard

use console::style;
use miette::Result;

use crate::cli::commands::utils::{print_structured, today, Workspace};
use crate::cli::GlobalOpts;
use crate::core::money::format_brl;
use crate::core::shop::Dashboard;

#[derive(clap::Args, Debug)]
pub struct StatusArgs {
    /// Day to report on (default: today)
    #[arg(long, value_parser = crate::cli::commands::schedule::parse_date)]
    pub date: Option<chrono::NaiveDate>,
}

pub fn run(args: StatusArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let day = args.date.unwrap_or_else(today);
    let dashboard = ws.shop.dashboard(day)?;

    if print_structured(&dashboard, ws.effective_format(global))? {
        return Ok(());
    }

    let width = 66;
    let title = format!("{} - {}", ws.config.shop_name(), day.format("%d/%m/%Y"));
    println!("{}", style(title).bold().underlined());
    println!("{}", "═".repeat(width));
    println!();

    print_two_columns(
        "REGISTRY",
        &registry_lines(&dashboard),
        "TODAY",
        &today_lines(&dashboard),
    );
    println!();
    print_two_columns(
        "QUOTES",
        &quote_lines(&dashboard),
        "WORK ORDERS",
        &order_lines(&dashboard),
    );

    println!();
    println!("{}", "═".repeat(width));
    if dashboard.low_stock_parts > 0 {
        println!(
            "{} {} part(s) at or below minimum stock; see {}",
            style("!").yellow(),
            dashboard.low_stock_parts,
            style("oficina catalog list --low-stock").yellow()
        );
    } else {
        println!("{}", style("Stock levels OK").green());
    }
    Ok(())
}

fn registry_lines(d: &Dashboard) -> Vec<String> {
    vec![
        format!("Customers:  {}", d.customers),
        format!("Vehicles:   {}", d.vehicles),
        format!("Employees:  {}", d.active_employees),
    ]
}

fn today_lines(d: &Dashboard) -> Vec<String> {
    vec![
        format!("Appointments: {}", d.appointments_today),
        format!("Sales:        {}", d.sales_today),
        format!("Sold:         {}", format_brl(d.sales_today_total)),
    ]
}

fn quote_lines(d: &Dashboard) -> Vec<String> {
    vec![
        format!("Pending:  {}", d.pending_quotes),
        format!("Value:    {}", format_brl(d.pending_quote_value)),
    ]
}

fn order_lines(d: &Dashboard) -> Vec<String> {
    if d.orders_by_status.is_empty() {
        return vec!["none".to_string()];
    }
    d.orders_by_status
        .iter()
        .map(|(status, n)| format!("{:<14} {}", format!("{}:", status), n))
        .collect()
}

fn print_two_columns(title1: &str, lines1: &[String], title2: &str, lines2: &[String]) {
    let col_width = 32;

    println!("{:<col_width$} {}", style(title1).bold(), style(title2).bold());
    println!("{:-<col_width$} {:-<col_width$}", "", "");

    for i in 0..lines1.len().max(lines2.len()) {
        let l1 = lines1.get(i).map(String::as_str).unwrap_or("");
        let l2 = lines2.get(i).map(String::as_str).unwrap_or("");
        println!("  {:<30} {}", l1, l2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_lines() {
        let mut d = Dashboard::default();
        assert_eq!(order_lines(&d), vec!["none"]);

        d.orders_by_status = vec![("open".into(), 2), ("in_progress".into(), 1)];
        let lines = order_lines(&d);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("open:"));
        assert!(lines[0].ends_with('2'));
    }
}
