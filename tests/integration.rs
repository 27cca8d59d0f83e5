use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn pbase_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("pbase");
    path
}

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("catalog.xml")
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/pricebase.sqlite"

[import]
concurrency = 2

[server]
bind = "127.0.0.1:7341"
"#,
        root.display()
    );

    let config_path = config_dir.join("pbase.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_pbase(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = pbase_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run pbase binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn imported_env() -> (TempDir, PathBuf) {
    let (tmp, config_path) = setup_test_env();
    let (_, stderr, success) = run_pbase(&config_path, &["init"]);
    assert!(success, "init failed: {}", stderr);
    let catalog = fixture();
    let (stdout, stderr, success) =
        run_pbase(&config_path, &["import", catalog.to_str().unwrap()]);
    assert!(success, "import failed: stdout={}, stderr={}", stdout, stderr);
    (tmp, config_path)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_pbase(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/pricebase.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_pbase(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_pbase(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_import_reports_counts_and_duplicate() {
    let (_tmp, config_path) = setup_test_env();
    run_pbase(&config_path, &["init"]);

    let catalog = fixture();
    let (stdout, stderr, success) =
        run_pbase(&config_path, &["import", catalog.to_str().unwrap()]);
    assert!(success, "import failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("sections: 5"), "{}", stdout);
    assert!(stdout.contains("works: 2"), "{}", stdout);
    assert!(stdout.contains("issues: 1"), "{}", stdout);
    assert!(
        stdout.contains("duplicate resource 1-100-20 for work 01-01-001-01"),
        "{}",
        stdout
    );
    assert!(stdout.contains("ok"));
}

#[test]
fn test_import_malformed_document_fails_and_writes_nothing() {
    let (tmp, config_path) = setup_test_env();
    run_pbase(&config_path, &["init"]);

    let broken = tmp.path().join("broken.xml");
    fs::write(&broken, "<Base><ResourcesDirectory></Base>").unwrap();

    let (_, stderr, success) = run_pbase(&config_path, &["import", broken.to_str().unwrap()]);
    assert!(!success, "malformed import should fail");
    assert!(stderr.contains("malformed catalog document"), "{}", stderr);

    let (stdout, _, _) = run_pbase(&config_path, &["stats"]);
    assert!(stdout.contains("bases:"), "{}", stdout);
    let bases_line = stdout.lines().find(|l| l.contains("bases:")).unwrap();
    assert!(bases_line.trim().ends_with(" 0"), "{}", bases_line);
}

#[test]
fn test_import_without_init_fails() {
    let (_tmp, config_path) = setup_test_env();
    let catalog = fixture();

    let (_, stderr, success) = run_pbase(&config_path, &["import", catalog.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("store unavailable"), "{}", stderr);
}

#[test]
fn test_search_prints_ancestor_chain() {
    let (_tmp, config_path) = imported_env();

    let (stdout, stderr, success) = run_pbase(&config_path, &["search", "траншеи"]);
    assert!(success, "search failed: {}", stderr);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3, "{}", stdout);
    assert!(lines[0].starts_with("[1] Земляные работы"));
    assert!(lines[1].starts_with("  [2] Разработка грунта"));
    assert!(lines[2].starts_with("    [3] Котлованы и траншеи"));
}

#[test]
fn test_search_empty_substring_lists_all_sections() {
    let (_tmp, config_path) = imported_env();

    let (stdout, _, success) = run_pbase(&config_path, &["search"]);
    assert!(success);
    assert_eq!(stdout.lines().count(), 5, "{}", stdout);
}

#[test]
fn test_search_no_results() {
    let (_tmp, config_path) = imported_env();

    let (stdout, _, success) = run_pbase(&config_path, &["search", "сталь"]);
    assert!(success);
    assert!(stdout.contains("No sections match"));
}

#[test]
fn test_roots_and_children() {
    let (_tmp, config_path) = imported_env();

    let (stdout, _, success) = run_pbase(&config_path, &["roots"]);
    assert!(success);
    assert!(stdout.contains("Земляные работы"));
    assert!(stdout.contains("Бетонные работы"));
    assert!(!stdout.contains("Разработка грунта"));

    let (stdout, _, success) = run_pbase(&config_path, &["children", "1"]);
    assert!(success);
    assert!(stdout.contains("Разработка грунта"));
    assert!(stdout.contains("Обратная засыпка"));
}

#[test]
fn test_groups_works_and_work_detail() {
    let (_tmp, config_path) = imported_env();

    let (stdout, _, success) = run_pbase(&config_path, &["groups", "3"]);
    assert!(success);
    assert!(stdout.contains("Разработка грунта в котлованах"));

    let (stdout, _, success) = run_pbase(&config_path, &["works", "1"]);
    assert!(success);
    assert!(stdout.contains("01-01-001-01"));
    assert!(stdout.contains("01-01-001-02"));

    let (stdout, stderr, success) = run_pbase(&config_path, &["work", "1"]);
    assert!(success, "work failed: {}", stderr);
    assert!(stdout.contains("nr/sp:        101 / 55"));
    assert!(stdout.contains("--- Items (2) ---"));
    assert!(stdout.contains("--- Resources (2) ---"));
    assert!(stdout.contains("Машины землеройные"));
}

#[test]
fn test_get_missing_work() {
    let (_tmp, config_path) = imported_env();

    let (_, stderr, success) = run_pbase(&config_path, &["work", "4040"]);
    assert!(!success, "missing work should exit non-zero");
    assert!(stderr.contains("not found"), "{}", stderr);
}

#[test]
fn test_stats_counts_tables() {
    let (_tmp, config_path) = imported_env();

    let (stdout, _, success) = run_pbase(&config_path, &["stats"]);
    assert!(success);
    let line = |label: &str| {
        stdout
            .lines()
            .find(|l| l.trim_start().starts_with(label))
            .unwrap_or_else(|| panic!("no {} line in {}", label, stdout))
            .split_whitespace()
            .last()
            .unwrap()
            .to_string()
    };
    assert_eq!(line("work resources:"), "4");
    assert_eq!(line("items:"), "2");
    assert_eq!(line("corrections:"), "1");
}

#[test]
fn test_invalid_concurrency_config() {
    let (tmp, _) = setup_test_env();
    let bad = tmp.path().join("config/bad.toml");
    fs::write(
        &bad,
        "[db]\npath = \"x.sqlite\"\n[import]\nconcurrency = 0\n",
    )
    .unwrap();

    let (_, stderr, success) = run_pbase(&bad, &["init"]);
    assert!(!success);
    assert!(stderr.contains("import.concurrency must be >= 1"), "{}", stderr);
}
