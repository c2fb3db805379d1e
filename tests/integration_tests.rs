//! Integration tests for the oficina CLI
//!
//! These tests run the binary end-to-end against a shop in a temp directory.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const MARIA: &str = "52998224725";

fn oficina() -> Command {
    Command::cargo_bin("oficina").unwrap()
}

/// Empty shop in a temp directory
fn setup_shop() -> TempDir {
    let tmp = TempDir::new().unwrap();
    oficina().current_dir(tmp.path()).arg("init").assert().success();
    tmp
}

/// Shop seeded with the demo catalog, Maria's Gol (ABC1D23), a mechanic and quote #1
fn setup_demo_shop() -> TempDir {
    let tmp = TempDir::new().unwrap();
    oficina()
        .current_dir(tmp.path())
        .args(["init", "--demo"])
        .assert()
        .success();
    tmp
}

/// Run a command in quiet mode and return the short ID it prints
fn create(tmp: &TempDir, args: &[&str]) -> String {
    let output = oficina()
        .current_dir(tmp.path())
        .arg("-q")
        .args(args)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

// ============================================================================
// Basics
// ============================================================================

#[test]
fn test_help_displays() {
    oficina()
        .arg("-h")
        .assert()
        .success()
        .stdout(predicate::str::contains("Auto-repair shop manager"))
        .stdout(predicate::str::contains("quote"))
        .stdout(predicate::str::contains("pdv"));
}

#[test]
fn test_version_displays() {
    oficina()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("oficina"));
}

#[test]
fn test_init_creates_structure() {
    let tmp = TempDir::new().unwrap();
    oficina()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized shop at"));

    assert!(tmp.path().join(".oficina/config.yaml").is_file());
    assert!(tmp.path().join("cadastros/clientes").is_dir());
    assert!(tmp.path().join("catalogo/pecas").is_dir());
    assert!(tmp.path().join("ordens").is_dir());
}

#[test]
fn test_init_twice_reports_existing_shop() {
    let tmp = setup_shop();
    oficina()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_commands_outside_a_shop_fail() {
    let tmp = TempDir::new().unwrap();
    oficina()
        .current_dir(tmp.path())
        .args(["customer", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not an oficina project"));
}

// ============================================================================
// Registries
// ============================================================================

#[test]
fn test_customer_new_and_list() {
    let tmp = setup_shop();
    let id = create(
        &tmp,
        &[
            "customer", "new", "-n", "Carlos Souza", "-d", "111.444.777-35", "-p",
            "(21) 99876-5432", "--city", "Niterói",
        ],
    );
    assert_eq!(id, "CLI@1");

    oficina()
        .current_dir(tmp.path())
        .args(["customer", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Carlos Souza"))
        .stdout(predicate::str::contains("1 customer"));
}

#[test]
fn test_customer_invalid_document_rejected() {
    let tmp = setup_shop();
    oficina()
        .current_dir(tmp.path())
        .args(["customer", "new", "-n", "Fulano", "-d", "123", "-p", "11987654321"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CPF must have 11 digits or CNPJ 14 digits"));

    let files = fs::read_dir(tmp.path().join("cadastros/clientes")).unwrap().count();
    assert_eq!(files, 0);
}

#[test]
fn test_customer_duplicate_document_rejected() {
    let tmp = setup_demo_shop();
    oficina()
        .current_dir(tmp.path())
        .args(["customer", "new", "-n", "Outra Maria", "-d", MARIA, "-p", "11912345678"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_vehicle_new_normalizes_plate() {
    let tmp = setup_shop();
    create(
        &tmp,
        &["customer", "new", "-n", "Carlos Souza", "-d", "11144477735", "-p", "21998765432"],
    );
    let id = create(
        &tmp,
        &[
            "vehicle", "new", "-c", "11144477735", "--plate", "xyz-9a87", "-b", "Fiat", "-m",
            "Uno", "-y", "2015",
        ],
    );
    assert_eq!(id, "VEI@1");

    oficina()
        .current_dir(tmp.path())
        .args(["vehicle", "show", "XYZ9A87"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fiat Uno"));
}

#[test]
fn test_referenced_customer_cannot_be_deleted() {
    let tmp = setup_demo_shop();
    oficina()
        .current_dir(tmp.path())
        .args(["customer", "delete", MARIA])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is referenced by"))
        .stderr(predicate::str::contains("deactivate"));
}

// ============================================================================
// Quotes and work orders
// ============================================================================

#[test]
fn test_quote_totals() {
    let tmp = setup_demo_shop();
    // 150 alignment + 225 labor + 2 x 120 pads
    oficina()
        .current_dir(tmp.path())
        .args([
            "quote", "new", "-c", MARIA, "-s", "ALN", "--labor", "Diagnóstico=225", "-p",
            "PF-100:2",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created quote"))
        .stdout(predicate::str::contains("R$ 615,00"));
}

#[test]
fn test_empty_quote_rejected() {
    let tmp = setup_demo_shop();
    oficina()
        .current_dir(tmp.path())
        .args(["quote", "new", "-c", MARIA])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Add at least one service or part"));
}

#[test]
fn test_zero_quantity_part_rejected() {
    let tmp = setup_demo_shop();
    oficina()
        .current_dir(tmp.path())
        .args(["quote", "new", "-c", MARIA, "-p", "PF-100:0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("quantity must be at least 1"));
}

#[test]
fn test_discount_above_gross_warns() {
    let tmp = setup_demo_shop();
    oficina()
        .current_dir(tmp.path())
        .args(["quote", "discount", "1", "500"])
        .assert()
        .success()
        .stderr(predicate::str::contains("discount is larger than the gross total"))
        .stderr(predicate::str::contains("-R$ 110,00"));
}

#[test]
fn test_quote_approve_and_convert() {
    let tmp = setup_demo_shop();
    oficina()
        .current_dir(tmp.path())
        .args(["quote", "approve", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Quote #1 approved"));

    let order = create(&tmp, &["quote", "convert", "1"]);
    assert_eq!(order, "OS@1");

    oficina()
        .current_dir(tmp.path())
        .args(["order", "show", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("R$ 390,00"));

    // a converted quote is closed for edits
    oficina()
        .current_dir(tmp.path())
        .args(["quote", "add-service", "1", "-s", "OLEO"])
        .assert()
        .failure();
}

#[test]
fn test_order_status_transitions() {
    let tmp = setup_demo_shop();
    create(
        &tmp,
        &["order", "new", "-c", MARIA, "--complaint", "Barulho na suspensão", "-s", "ALN"],
    );

    oficina()
        .current_dir(tmp.path())
        .args(["order", "status", "1", "in_progress"])
        .assert()
        .success()
        .stdout(predicate::str::contains("open → in_progress"));

    oficina()
        .current_dir(tmp.path())
        .args(["order", "status", "1", "completed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ready for delivery"));

    oficina()
        .current_dir(tmp.path())
        .args(["order", "status", "1", "open"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid work order status transition"));
}

#[test]
fn test_quote_print_writes_document() {
    let tmp = setup_demo_shop();
    let out = tmp.path().join("orcamento-1.txt");
    oficina()
        .current_dir(tmp.path())
        .args(["quote", "print", "1", "-o"])
        .arg(&out)
        .assert()
        .success();

    let text = fs::read_to_string(out).unwrap();
    assert!(text.contains("Maria da Silva"));
    assert!(text.contains("ABC1D23"));
    assert!(text.contains("R$ 390,00"));
}

// ============================================================================
// Counter sales
// ============================================================================

#[test]
fn test_sale_clamps_total_and_moves_stock() {
    let tmp = setup_demo_shop();
    oficina()
        .current_dir(tmp.path())
        .args(["pdv", "sell", "-p", "PF-100:1", "--discount", "200"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total R$ 0,00"));

    oficina()
        .current_dir(tmp.path())
        .args(["catalog", "stock", "PF-100"])
        .assert()
        .success()
        .stdout(predicate::str::contains("7 on hand"));

    oficina()
        .current_dir(tmp.path())
        .args(["pdv", "cancel", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("returned to stock"));

    oficina()
        .current_dir(tmp.path())
        .args(["catalog", "stock", "PF-100"])
        .assert()
        .success()
        .stdout(predicate::str::contains("8 on hand"));
}

#[test]
fn test_sale_insufficient_stock() {
    let tmp = setup_demo_shop();
    oficina()
        .current_dir(tmp.path())
        .args(["pdv", "sell", "-p", "PF-100:9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not enough stock for"));

    let sales = fs::read_dir(tmp.path().join("vendas")).unwrap().count();
    assert_eq!(sales, 0);
}

#[test]
fn test_sale_change() {
    let tmp = setup_demo_shop();
    oficina()
        .current_dir(tmp.path())
        .args(["pdv", "sell", "-p", "FO-20:2", "--received", "100"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total R$ 70,00"))
        .stdout(predicate::str::contains("Change R$ 30,00"));
}

// ============================================================================
// Scheduling and checklists
// ============================================================================

#[test]
fn test_schedule_conflict() {
    let tmp = setup_demo_shop();
    let args = [
        "schedule", "new", "-c", MARIA, "-d", "2030-03-04", "-t", "09:00", "-s", "Revisão",
    ];
    let id = create(&tmp, &args);
    assert_eq!(id, "AGD@1");

    oficina()
        .current_dir(tmp.path())
        .args([
            "schedule", "new", "-c", MARIA, "-d", "04/03/2030", "-t", "9h30", "-s", "Alinhamento",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already booked"));
}

#[test]
fn test_checklist_fill() {
    let tmp = setup_demo_shop();
    let id = create(
        &tmp,
        &[
            "checklist", "fill", "Entrada de veículo", "--vehicle", "ABC1D23", "--no-prompt",
            "-a", "1=sim", "-a", "Nível de combustível=1/2", "-a", "3=portas",
        ],
    );
    assert_eq!(id, "INS@1");

    oficina()
        .current_dir(tmp.path())
        .args(["checklist", "show", "INS@1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1/2"));
}

#[test]
fn test_checklist_missing_required_answer() {
    let tmp = setup_demo_shop();
    oficina()
        .current_dir(tmp.path())
        .args([
            "checklist", "fill", "Entrada de veículo", "--vehicle", "ABC1D23", "--no-prompt",
            "-a", "1=sim",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("'Nível de combustível' is required"));
}

// ============================================================================
// Portal and dashboard
// ============================================================================

#[test]
fn test_portal_shows_own_quotes() {
    let tmp = setup_demo_shop();
    oficina()
        .current_dir(tmp.path())
        .args(["portal", "show", MARIA])
        .assert()
        .success()
        .stdout(predicate::str::contains("Olá, Maria da Silva"))
        .stdout(predicate::str::contains("R$ 390,00"));
}

#[test]
fn test_portal_hides_other_customers_quotes() {
    let tmp = setup_demo_shop();
    create(
        &tmp,
        &["customer", "new", "-n", "Carlos Souza", "-d", "11144477735", "-p", "21998765432"],
    );
    oficina()
        .current_dir(tmp.path())
        .args(["portal", "approve", "11144477735", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("quote not found"));

    oficina()
        .current_dir(tmp.path())
        .args(["portal", "approve", MARIA, "1"])
        .assert()
        .success();
}

#[test]
fn test_status_json() {
    let tmp = setup_demo_shop();
    oficina()
        .current_dir(tmp.path())
        .args(["status", "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"pending_quotes\": 1"));
}

// ============================================================================
// Validate, import, completions
// ============================================================================

#[test]
fn test_validate_passes_on_demo_shop() {
    let tmp = setup_demo_shop();
    oficina()
        .current_dir(tmp.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("All files passed validation!"));
}

#[test]
fn test_validate_detects_broken_record() {
    let tmp = setup_demo_shop();
    let dir = tmp.path().join("cadastros/clientes");
    let file = fs::read_dir(&dir).unwrap().next().unwrap().unwrap().path();
    let content = fs::read_to_string(&file).unwrap();
    let broken = content.replace("529.982.247-25", "123");
    assert_ne!(content, broken);
    fs::write(&file, broken).unwrap();

    oficina()
        .current_dir(tmp.path())
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Validation failed"));
}

#[test]
fn test_import_customers_csv() {
    let tmp = setup_shop();
    let csv = tmp.path().join("clientes.csv");
    fs::write(
        &csv,
        "name,document,phone,city\n\
         Carlos Souza,111.444.777-35,(21) 99876-5432,Niterói\n\
         Ana Lima,529.982.247-25,11987654321,São Paulo\n",
    )
    .unwrap();

    oficina()
        .current_dir(tmp.path())
        .args(["import", "customers"])
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("Created:        2"));

    oficina()
        .current_dir(tmp.path())
        .args(["customer", "list", "--count"])
        .assert()
        .success()
        .stdout(predicate::str::diff("2\n"));
}

#[test]
fn test_import_template() {
    oficina()
        .args(["import", "parts", "--template"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("code,name,price"));
}

#[test]
fn test_completions_bash() {
    oficina()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("oficina"));
}
