//! `oficina validate` command - Check record files against schemas and rules

use console::style;
use miette::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::cli::commands::utils::Workspace;
use crate::cli::GlobalOpts;
use crate::core::identity::EntityPrefix;
use crate::entities::Inspection;
use crate::schema::registry::SchemaRegistry;
use crate::schema::rules::ValidationErrors;
use crate::schema::validator::{check_rules, FileCheckError, Validator};

#[derive(clap::Args, Debug)]
pub struct ValidateArgs {
    /// Files or directories to check (default: the whole shop)
    pub paths: Vec<PathBuf>,

    /// Continue after the first failing file
    #[arg(long)]
    pub keep_going: bool,

    /// Show the summary only
    #[arg(long)]
    pub summary: bool,
}

#[derive(Default)]
struct ValidationStats {
    files_checked: usize,
    files_passed: usize,
    files_failed: usize,
    total_errors: usize,
}

pub fn run(args: ValidateArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let registry = SchemaRegistry::default();
    let validator = Validator::new(&registry);

    let files: Vec<PathBuf> = if args.paths.is_empty() {
        let mut all: Vec<PathBuf> = ws.project.iter_all_files().collect();
        all.sort();
        all
    } else {
        expand_paths(&args.paths)
    };

    if !global.quiet {
        println!(
            "{} Validating {} file(s)...\n",
            style("→").blue(),
            files.len()
        );
    }

    let mut stats = ValidationStats::default();

    for path in &files {
        let prefix = match validator.validate_file(path) {
            Ok(Some(prefix)) => prefix,
            Ok(None) => {
                if !args.summary {
                    println!(
                        "{} {} - unknown record type (skipped)",
                        style("?").yellow(),
                        path.display()
                    );
                }
                continue;
            }
            Err(e) => {
                stats.files_checked += 1;
                stats.files_failed += 1;
                stats.total_errors += match &e {
                    FileCheckError::Schema(v) => v.violation_count(),
                    FileCheckError::Io { .. } => 1,
                };
                if !args.summary {
                    println!("{} {}", style("✗").red(), path.display());
                    println!("{:?}", miette::Report::new(e));
                }
                if !args.keep_going {
                    break;
                }
                continue;
            }
        };
        stats.files_checked += 1;

        let errors = match rule_errors(&ws, prefix, path) {
            Ok(errors) => errors,
            Err(message) => {
                let mut errors = ValidationErrors::new();
                errors.push("record", message);
                errors
            }
        };

        if errors.is_empty() {
            stats.files_passed += 1;
            if !args.summary && !global.quiet {
                println!("{} {}", style("✓").green(), path.display());
            }
            continue;
        }

        stats.files_failed += 1;
        stats.total_errors += errors.len();
        if !args.summary {
            println!(
                "{} {} - {} error(s)",
                style("✗").red(),
                path.display(),
                errors.len()
            );
            for e in errors.errors() {
                println!("    {}", style(e).red());
            }
        }
        if !args.keep_going {
            break;
        }
    }

    println!();
    println!("{}", style("─".repeat(60)).dim());
    println!("{}", style("Validation Summary").bold());
    println!("{}", style("─".repeat(60)).dim());
    println!("  Files checked:  {}", style(stats.files_checked).cyan());
    println!("  Files passed:   {}", style(stats.files_passed).green());
    println!("  Files failed:   {}", style(stats.files_failed).red());
    println!("  Total errors:   {}", style(stats.total_errors).red());
    println!();

    match stats.files_failed {
        0 => {
            println!("{} All files passed validation!", style("✓").green().bold());
            Ok(())
        }
        1 => Err(miette::miette!("Validation failed: 1 file has errors")),
        n => Err(miette::miette!("Validation failed: {} files have errors", n)),
    }
}

/// Field rules; inspections are checked against the template they were filled from
fn rule_errors(
    ws: &Workspace,
    prefix: EntityPrefix,
    path: &Path,
) -> std::result::Result<ValidationErrors, String> {
    let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    if prefix != EntityPrefix::Ins {
        return check_rules(prefix, &content);
    }

    let inspection: Inspection = serde_yml::from_str(&content).map_err(|e| e.to_string())?;
    match ws
        .shop
        .templates
        .find_by_id(&inspection.template)
        .map_err(|e| e.to_string())?
    {
        Some(template) => Ok(inspection.validate_against(&template)),
        None => {
            let mut errors = ValidationErrors::new();
            errors.push(
                "template",
                format!("checklist template {} no longer exists", inspection.template),
            );
            Ok(errors)
        }
    }
}

fn expand_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = paths
        .iter()
        .flat_map(|p| {
            if p.is_dir() {
                WalkDir::new(p)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file())
                    .filter(|e| e.path().extension().is_some_and(|ext| ext == "yaml"))
                    .map(|e| e.path().to_path_buf())
                    .collect()
            } else {
                vec![p.clone()]
            }
        })
        .collect();
    files.sort();
    files
}
