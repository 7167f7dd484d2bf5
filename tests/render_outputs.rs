//! Rendering and packaging flows: monthly registers, day sheets, the
//! production register, and the downloadable archive.

mod common;

use common::TestFixture;
use std::io::Cursor;

fn seed_march_records(fixture: &TestFixture) {
    fixture.run_ok(&[
        "init",
        "--company",
        "Trattoria Da Mario",
        "--piva",
        "01234567890",
    ]);
    for (date, freezer) in [("2025-03-05", "-19.5"), ("2025-03-18", "-20.0")] {
        fixture.run_ok(&[
            "record", "add", "--date", date, "--freezer", freezer, "--fridge1", "2.0",
            "--fridge2", "3.5",
        ]);
    }
}

#[test]
fn monthly_register_renders_to_a_pdf_file() {
    let fixture = TestFixture::new();
    seed_march_records(&fixture);

    let out = fixture.config.path().join("temperature.pdf");
    fixture.run_ok(&[
        "render",
        "--kind",
        "temperature",
        "--month",
        "2025-03",
        "--out",
        out.to_str().expect("utf-8 path"),
    ]);
    let bytes = std::fs::read(&out).expect("rendered pdf");
    assert!(bytes.starts_with(b"%PDF-"));
}

#[test]
fn day_sheet_renders_for_an_existing_record_only() {
    let fixture = TestFixture::new();
    seed_march_records(&fixture);

    let out = fixture.config.path().join("day.pdf");
    fixture.run_ok(&[
        "render",
        "--kind",
        "sanitation",
        "--date",
        "2025-03-05",
        "--out",
        out.to_str().expect("utf-8 path"),
    ]);
    assert!(std::fs::read(&out).expect("rendered pdf").starts_with(b"%PDF-"));

    let missing = fixture.run(&[
        "render",
        "--kind",
        "sanitation",
        "--date",
        "2025-03-06",
        "--out",
        out.to_str().expect("utf-8 path"),
    ]);
    assert!(!missing.status.success());
}

#[test]
fn sync_month_uploads_both_registers_to_the_store() {
    let fixture = TestFixture::new();
    seed_march_records(&fixture);
    fixture.run_ok(&["sync", "month", "--month", "2025-03"]);

    for name in [
        "HACCP_Registri/HACCP_Temperature_marzo_2025.pdf",
        "HACCP_Registri/HACCP_Sanificazione_marzo_2025.pdf",
    ] {
        let bytes = std::fs::read(fixture.store_path(name)).expect("uploaded register");
        assert!(bytes.starts_with(b"%PDF-"), "{name} is not a PDF");
    }
}

#[test]
fn render_push_lands_in_the_month_folder() {
    let fixture = TestFixture::new();
    seed_march_records(&fixture);
    fixture.run_ok(&["render", "--kind", "temperature", "--month", "2025-03", "--push"]);

    let uploaded =
        fixture.store_path("HACCP_Registri/marzo 2025/HACCP_Temperature_marzo_2025.pdf");
    assert!(uploaded.is_file(), "missing {}", uploaded.display());
}

#[test]
fn archive_bundles_one_entry_per_register_and_month() {
    let fixture = TestFixture::new();
    seed_march_records(&fixture);
    // A second month doubles the expected entries.
    fixture.run_ok(&[
        "record", "add", "--date", "2025-04-02", "--freezer", "-18.5", "--fridge1", "1.0",
        "--fridge2", "2.0",
    ]);

    let out = fixture.config.path().join("registri.zip");
    fixture.run_ok(&["archive", "--out", out.to_str().expect("utf-8 path")]);

    let bytes = std::fs::read(&out).expect("archive");
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("open archive");
    assert_eq!(archive.len(), 4);
    let mut names = Vec::new();
    for index in 0..archive.len() {
        names.push(archive.by_index(index).expect("entry").name().to_string());
    }
    names.sort();
    assert_eq!(
        names,
        vec![
            "HACCP_Sanificazione_2025-03.pdf",
            "HACCP_Sanificazione_2025-04.pdf",
            "HACCP_Temperature_2025-03.pdf",
            "HACCP_Temperature_2025-04.pdf",
        ]
    );
}

#[test]
fn production_register_pdf_renders_from_the_remote_ledger() {
    let fixture = TestFixture::new();
    fixture.run_ok(&[
        "lot", "add", "--name", "Pomodoro", "--code", "LTN-01", "--purchased", "2025-10-20",
    ]);
    fixture.run_ok(&[
        "produce",
        "--product",
        "Salsa base",
        "--production-date",
        "2025-10-21",
        "--expiry-date",
        "2025-11-21",
        "--ingredient",
        "Pomodoro=LTN-01",
    ]);

    let out = fixture.config.path().join("semilavorati.pdf");
    fixture.run_ok(&["ledger", "pdf", "--out", out.to_str().expect("utf-8 path"), "--push"]);
    assert!(std::fs::read(&out).expect("pdf").starts_with(b"%PDF-"));
    assert!(fixture
        .store_path("HACCP_Registri/Registro_Semilavorati_aggiornato.pdf")
        .is_file());
}
