use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use factel_core::report::read_xlsx;
use factel_core::Cell;

const ENERO: &str = "Periodo facturación: 01/01/2024 al 31/01/2024
Término de potencia
Periodo Energía Activa Energía Reactiva Potencia Contratada Potencia Máxima Importe Potencia
P1 100,00 kWh 10,00 kVArh 15,000 kW 12,500 kW 50,00 €
P2 80,00 kWh 5,00 kVArh 15,000 kW 9,000 kW 25,50 €
Total Factura 123,45 €
";

const FEBRERO: &str = "Periodo facturación: 01/02/2024 al 29/02/2024
Término de potencia Potencia Máxima Importe Potencia
P1 90,00 kWh 0,00 kVArh 15,000 kW 14,000 kW 40,00 €
Total Factura 99,00 €
";

fn factel() -> Command {
    Command::cargo_bin("factel").unwrap()
}

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_templates_list() {
    factel()
        .args(["templates", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("endesa-periodos"))
        .stdout(predicate::str::contains("endesa-potencia"))
        .stdout(predicate::str::contains("secciones"));
}

#[test]
fn test_templates_detect() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "enero.txt", ENERO);

    factel()
        .args(["templates", "detect"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Detected template: endesa-potencia"));
}

#[test]
fn test_process_text_output() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "enero.txt", ENERO);

    factel()
        .arg("process")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Periodo de Facturación"))
        .stdout(predicate::str::contains("01/01/2024 al 31/01/2024"))
        .stdout(predicate::str::contains("123,45"))
        .stdout(predicate::str::contains("75,50"));
}

#[test]
fn test_process_xlsx_output() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "enero.txt", ENERO);
    let output = dir.path().join("enero.xlsx");

    factel()
        .arg("process")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    let report = read_xlsx(&output).unwrap();
    let power = report.table("Potencia").unwrap();
    let total = power.column("Importe Potencia (€)").unwrap();
    assert_eq!(power.rows[2][total], Cell::Number(75.5));
}

#[test]
fn test_process_json_output() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "enero.txt", ENERO);

    factel()
        .args(["process", "-f", "json"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"template\": \"endesa-potencia\""))
        .stdout(predicate::str::contains("\"total_amount\": 123.45"));
}

#[test]
fn test_process_missing_file() {
    factel()
        .args(["process", "no-existe.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_process_unknown_template() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "enero.txt", ENERO);

    factel()
        .args(["process", "-t", "iberdrola"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown template: iberdrola"));
}

#[test]
fn test_batch_reports_failures() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a-enero.txt", ENERO);
    write(dir.path(), "b-febrero.txt", FEBRERO);
    write(dir.path(), "c-vacia.txt", "");
    let output = dir.path().join("facturas.xlsx");
    let summary = dir.path().join("resumen.csv");
    let pattern = dir.path().join("*.txt");

    factel()
        .arg("batch")
        .arg(pattern.to_str().unwrap())
        .arg("-o")
        .arg(&output)
        .arg("--summary")
        .arg(&summary)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 succeeded"))
        .stdout(predicate::str::contains("1 failed"))
        .stdout(predicate::str::contains("c-vacia.txt"));

    let report = read_xlsx(&output).unwrap();
    assert_eq!(report.table("Resumen Facturas").unwrap().row_count(), 2);
    // enero: 2 rows + TOTAL, febrero: 1 row + TOTAL, grand TOTAL
    assert_eq!(report.table("Potencia").unwrap().row_count(), 6);

    let summary = fs::read_to_string(&summary).unwrap();
    assert_eq!(summary.lines().count(), 4);
    assert!(summary.contains("c-vacia.txt,error"));
}

#[test]
fn test_batch_continues_past_corrupt_pdf() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a-roto.pdf"), b"garbage bytes").unwrap();
    write(dir.path(), "b-enero.txt", ENERO);
    let output = dir.path().join("facturas.xlsx");
    let pattern = dir.path().join("*");

    factel()
        .arg("batch")
        .arg(pattern.to_str().unwrap())
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 succeeded"))
        .stdout(predicate::str::contains("1 failed"))
        .stdout(predicate::str::contains("a-roto.pdf"));

    let report = read_xlsx(&output).unwrap();
    let summary = report.table("Resumen Facturas").unwrap();
    assert_eq!(summary.row_count(), 1);
    assert_eq!(
        summary.cell(0, "Archivo").and_then(|c| c.as_text()),
        Some("b-enero.txt")
    );
}

#[test]
fn test_batch_without_data() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "vacia.txt", "   ");
    let pattern = dir.path().join("*.txt");

    factel()
        .arg("batch")
        .arg(pattern.to_str().unwrap())
        .arg("-o")
        .arg(dir.path().join("facturas.xlsx"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("no data could be extracted"));
}

#[test]
fn test_config_init_get_set() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");

    factel()
        .arg("-c")
        .arg(&config)
        .args(["config", "init"])
        .assert()
        .success();
    assert!(config.exists());

    factel()
        .arg("-c")
        .arg(&config)
        .args(["config", "set", "extraction.numeric_policy", "drop_row"])
        .assert()
        .success();

    factel()
        .arg("-c")
        .arg(&config)
        .args(["config", "get", "extraction.numeric_policy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"drop_row\""));

    factel()
        .arg("-c")
        .arg(&config)
        .args(["config", "set", "extraction.numeric_policy", "round"])
        .assert()
        .failure();
}
