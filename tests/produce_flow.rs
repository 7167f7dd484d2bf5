//! End-to-end ledger flow: incoming lots, traceability validation, lot-code
//! generation, and the append-only CSV on the store.

mod common;

use common::{read_text, TestFixture};

const LEDGER_REL: &str = "HACCP_Registri/Registro_Semilavorati.csv";

fn register_pomodoro(fixture: &TestFixture) {
    fixture.run_ok(&[
        "lot",
        "add",
        "--name",
        "Pomodoro",
        "--code",
        "LTN-20251021-01",
        "--purchased",
        "2025-10-20",
        "--supplier",
        "Az. Agricola Rossi",
    ]);
}

#[test]
fn produce_appends_a_validated_row_with_a_generated_lot_code() {
    let fixture = TestFixture::new();
    register_pomodoro(&fixture);

    let stdout = fixture.run_ok(&[
        "produce",
        "--product",
        "Salsa piccante",
        "--production-date",
        "2025-10-21",
        "--expiry-date",
        "2025-11-21",
        "--ingredient",
        "Pomodoro=LTN-20251021-01",
    ]);
    assert!(stdout.contains("SAPI211025"), "stdout: {stdout}");

    let ledger = read_text(&fixture.store_path(LEDGER_REL));
    let lines: Vec<&str> = ledger.lines().collect();
    assert_eq!(lines.len(), 2, "header plus one row:\n{ledger}");
    assert!(lines[0].starts_with("Data Produzione;Data Scadenza;Prodotto;Lotto Prodotto"));
    let row = lines[1];
    assert!(row.starts_with("21/10/2025;21/11/2025;Salsa piccante;SAPI211025"));
    assert!(row.contains(";Pomodoro;LTN-20251021-01"));
    assert!(ledger.contains("\r\n"));
}

#[test]
fn collisions_resolve_with_an_integer_suffix() {
    let fixture = TestFixture::new();
    register_pomodoro(&fixture);

    let produce = |fixture: &TestFixture| {
        fixture.run_ok(&[
            "produce",
            "--product",
            "Salsa piccante",
            "--production-date",
            "2025-10-21",
            "--expiry-date",
            "2025-11-21",
            "--ingredient",
            "Pomodoro=LTN-20251021-01",
        ])
    };
    let first = produce(&fixture);
    let second = produce(&fixture);
    assert!(first.contains("SAPI211025"));
    assert!(second.contains("SAPI2110252"));

    let ledger = read_text(&fixture.store_path(LEDGER_REL));
    assert_eq!(ledger.lines().count(), 3);
}

#[test]
fn unregistered_lots_block_the_append_and_leave_the_ledger_unchanged() {
    let fixture = TestFixture::new();
    register_pomodoro(&fixture);

    fixture.run_ok(&[
        "produce",
        "--product",
        "Salsa piccante",
        "--production-date",
        "2025-10-21",
        "--expiry-date",
        "2025-11-21",
        "--ingredient",
        "Pomodoro=LTN-20251021-01",
    ]);
    let before = std::fs::read(fixture.store_path(LEDGER_REL)).expect("ledger exists");

    let output = fixture.run(&[
        "produce",
        "--product",
        "Salsa piccante",
        "--production-date",
        "2025-10-22",
        "--expiry-date",
        "2025-11-22",
        "--ingredient",
        "Pomodoro=LTN-WRONG",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("LTN-WRONG"), "stderr: {stderr}");

    let after = std::fs::read(fixture.store_path(LEDGER_REL)).expect("ledger exists");
    assert_eq!(before.len(), after.len(), "ledger byte length changed");
    assert_eq!(before, after);
}

#[test]
fn ledger_show_reads_back_the_appended_rows() {
    let fixture = TestFixture::new();
    register_pomodoro(&fixture);
    fixture.run_ok(&[
        "produce",
        "--product",
        "Salsa piccante",
        "--production-date",
        "2025-10-21",
        "--expiry-date",
        "2025-11-21",
        "--ingredient",
        "Pomodoro=LTN-20251021-01",
    ]);

    let stdout = fixture.run_ok(&["ledger", "show"]);
    assert!(stdout.contains("10 ingredient slots"));
    assert!(stdout.contains("Salsa piccante"));
    assert!(stdout.contains("SAPI211025"));
    assert!(stdout.contains("Pomodoro (LTN-20251021-01)"));
}

#[test]
fn incoming_registry_uploads_as_csv() {
    let fixture = TestFixture::new();
    register_pomodoro(&fixture);
    fixture.run_ok(&["lot", "push"]);

    let csv = read_text(&fixture.store_path("HACCP_Registri/Registro_Alimenti_Ingresso.csv"));
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "Nome alimento;Lotto;Data di acquisto;Fornitore");
    assert_eq!(lines[1], "Pomodoro;LTN-20251021-01;20/10/2025;Az. Agricola Rossi");
}
