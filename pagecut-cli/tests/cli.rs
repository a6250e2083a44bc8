use assert_cmd::Command;
use tempfile::tempdir;

fn pagecut() -> Command {
    Command::cargo_bin("pagecut").unwrap()
}

#[test]
fn help_lists_the_options() {
    let output = pagecut().arg("--help").assert().success().get_output().stdout.clone();
    let help = String::from_utf8(output).unwrap();
    for flag in ["--output-dir", "--config", "--page"] {
        assert!(help.contains(flag), "missing {flag} in:\n{help}");
    }
}

#[test]
fn version_is_printed() {
    let output = pagecut().arg("--version").assert().success().get_output().stdout.clone();
    assert!(String::from_utf8(output).unwrap().starts_with("pagecut "));
}

#[test]
fn non_pdf_file_is_rejected_before_start() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "hello").unwrap();

    let output = pagecut().arg(&path).assert().failure().get_output().stderr.clone();
    let stderr = String::from_utf8(output).unwrap();
    assert!(stderr.contains("is not a PDF file"), "stderr was:\n{stderr}");
}

#[test]
fn missing_pdf_is_reported() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("gone.pdf");

    let output = pagecut().arg(&path).assert().failure().get_output().stderr.clone();
    let stderr = String::from_utf8(output).unwrap();
    assert!(stderr.contains("failed to read"), "stderr was:\n{stderr}");
}

#[test]
fn page_must_be_a_number() {
    pagecut().args(["--page", "two"]).assert().failure();
}
