use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::{fs, path::PathBuf, process::Command};

fn bin_cmd() -> Command {
    Command::cargo_bin("cisync-cli").expect("binary built")
}

fn workspace_root() -> PathBuf {
    // crates/cisync-cli -> <workspace root>
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap() // crates/
        .parent()
        .unwrap() // <workspace root>
        .to_path_buf()
}

fn fixture(rel: &str) -> PathBuf {
    workspace_root().join("test/fixtures").join(rel)
}

fn run_ok(cmd: &mut Command) -> String {
    let assert = cmd.assert().success();
    String::from_utf8_lossy(assert.get_output().stdout.as_ref()).to_string()
}

#[test]
fn help_works() {
    bin_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("PLM admin-object synchronization"));
}

#[test]
fn export_file_prints_canonical_script() {
    let mut cmd = bin_cmd();
    cmd.args(["export", "--xml"]).arg(fixture("exports/command_Search.xml"));
    let out = run_ok(&mut cmd);
    assert!(out.starts_with("mod command \"Search\""), "unexpected output:\n{out}");
    assert!(out.contains("add setting \"Target Location\" \"popup\""));
}

#[test]
fn export_dir_lays_out_by_kind() {
    let tmp = tempfile::tempdir().expect("tempdir");

    let mut cmd = bin_cmd();
    cmd.args(["export", "--xml"])
        .arg(fixture("exports"))
        .args(["--out"])
        .arg(tmp.path());
    let out = run_ok(&mut cmd);
    assert!(out.contains("3 объект"), "unexpected output:\n{out}");

    assert!(tmp.path().join("commands/command_Search.ci").exists());
    assert!(tmp.path().join("menus/menu_Main.ci").exists());
    let inquiry = tmp.path().join("inquiries/inquiry_FindParts.ci");
    let text = fs::read_to_string(&inquiry).expect("inquiry exported");
    assert!(text.contains("############ inquiry code ############"));
    assert!(text.ends_with("temp query bus Part * *;\n"));
}

#[test]
fn export_matches_checked_in_canonical_file() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out_ci = tmp.path().join("command_Search.ci");

    let mut cmd = bin_cmd();
    cmd.args(["export", "--xml"])
        .arg(fixture("exports/command_Search.xml"))
        .args(["--out"])
        .arg(&out_ci);
    cmd.assert().success();

    // Генерация детерминирована: байт в байт с файлом в репозитории
    let generated = fs::read_to_string(&out_ci).expect("ci written");
    let checked_in = fs::read_to_string(fixture("ci/command_Search.ci")).expect("fixture");
    assert_eq!(generated, checked_in);
}

#[test]
fn scan_outputs_csv_rows() {
    let mut cmd = bin_cmd();
    cmd.args(["scan", "--xml"]).arg(fixture("exports/command_Search.xml"));
    let out = run_ok(&mut cmd);
    // Заголовок CSV не локализуется
    assert!(out.starts_with("kind,name,attr,value"), "unexpected output:\n{out}");
    assert!(out.contains("command,Search,label,Open search"));
    assert!(out.contains("setting/Target Location,popup"));
}

#[test]
fn scan_writes_csv_file() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out_csv = tmp.path().join("out.csv");

    let mut cmd = bin_cmd();
    cmd.args(["scan", "--xml"])
        .arg(fixture("exports/menu_Main.xml"))
        .args(["--out-csv"])
        .arg(&out_csv);
    cmd.assert().success();

    let text = fs::read_to_string(&out_csv).expect("csv written");
    assert!(text.starts_with("kind,name,attr,value"));
    assert!(text.contains("menu,Main,child/menu Admin,1"));
    assert!(text.contains("menu,Main,child/command Search,2"));
}

#[test]
fn validate_clean_file_passes() {
    let mut cmd = bin_cmd();
    cmd.args(["validate", "--ci"]).arg(fixture("ci/menu_Main.ci"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Всё чисто"));
}

#[test]
fn validate_reports_macros_without_failing() {
    let mut cmd = bin_cmd();
    cmd.args(["validate", "--ci"]).arg(fixture("ci/command_Search.ci"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("[macro-check]"))
        .stdout(predicate::str::contains("${ROOT}"));
}

#[test]
fn validate_fatal_issue_sets_exit_code() {
    let mut cmd = bin_cmd();
    cmd.args(["validate", "--ci"]).arg(fixture("ci_bad/command_Broken.ci"));
    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("[empty-name]"));
}

#[test]
fn diff_equal_objects_report_clean() {
    let mut cmd = bin_cmd();
    cmd.args(["diff", "--live-xml"])
        .arg(fixture("exports/command_Search.xml"))
        .args(["--ci"])
        .arg(fixture("ci/command_Search.ci"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Нет расхождений"));
}

#[test]
fn diff_reports_changed_and_one_sided_rows() {
    let mut cmd = bin_cmd();
    cmd.args(["diff", "--live-xml"])
        .arg(fixture("exports/command_Search.xml"))
        .args(["--ci"])
        .arg(fixture("ci_changed/command_Search.ci"));
    let out = run_ok(&mut cmd);
    assert!(out.contains("~ label = Renamed search"), "unexpected output:\n{out}");
    assert!(out.contains("- setting/Target Location"), "unexpected output:\n{out}");
}

#[test]
fn update_without_live_export_creates_the_object() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let script = tmp.path().join("batch.mql");

    let mut cmd = bin_cmd();
    cmd.args(["update", "--ci"])
        .arg(fixture("ci/command_Search.ci"))
        .args(["--out-script"])
        .arg(&script);
    let out = run_ok(&mut cmd);
    assert!(out.contains("создание"), "unexpected output:\n{out}");

    let text = fs::read_to_string(&script).expect("batch written");
    assert!(text.starts_with("add command \"Search\";\n\n"), "unexpected batch:\n{text}");
    assert!(text.contains("mod command \"Search\""));
}

#[test]
fn update_resets_live_state_before_reapplying() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let script = tmp.path().join("batch.mql");

    let mut cmd = bin_cmd();
    cmd.args(["update", "--ci"])
        .arg(fixture("ci_changed/command_Search.ci"))
        .args(["--live-xml"])
        .arg(fixture("exports/command_Search.xml"))
        .args(["--out-script"])
        .arg(&script);
    let out = run_ok(&mut cmd);
    assert!(out.contains("обновление"), "unexpected output:\n{out}");

    let text = fs::read_to_string(&script).expect("batch written");
    let clear = text.find("mod command \"Search\" label \"\" href \"\";").expect("scalar clears");
    let remove = text.find("remove setting \"Target Location\";").expect("setting removal");
    let update = text.find("\n\nmod command \"Search\"").expect("update script");
    assert!(clear < remove && remove < update, "bad batch order:\n{text}");
    assert!(text.contains("label \"Renamed search\""));
}

#[test]
fn update_menu_in_tree_removes_from_container_first() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let script = tmp.path().join("batch.mql");

    let mut cmd = bin_cmd();
    cmd.args(["update", "--ci"])
        .arg(fixture("ci/menu_Main.ci"))
        .args(["--live-xml"])
        .arg(fixture("exports/menu_Main.xml"))
        .args(["--menu-in-tree", "Main", "--out-script"])
        .arg(&script);
    cmd.assert().success();

    let text = fs::read_to_string(&script).expect("batch written");
    let tree = text.find("mod menu \"Tree\" remove menu \"Main\";").expect("tree removal");
    let children = text.find("mod menu \"Main\" remove command \"Search\";").expect("child removal");
    assert!(tree < children, "tree removal must come first:\n{text}");
    assert!(text.contains("mod menu \"Main\" remove menu \"Admin\";"));
}

#[test]
fn update_inquiry_references_a_script_file() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let script = tmp.path().join("batch.mql");

    let mut cmd = bin_cmd();
    cmd.args(["update", "--ci"])
        .arg(fixture("ci/inquiry_FindParts.ci"))
        .args(["--out-script"])
        .arg(&script);
    cmd.assert().success();

    let text = fs::read_to_string(&script).expect("batch written");
    assert!(text.contains("run file \""), "missing script reference:\n{text}");
    // Содержимое временного файла дописано в батч для оффлайн-просмотра
    assert!(text.contains("mod inquiry \"FindParts\""));
    assert!(text.contains("file \""));
}

#[test]
fn health_clean_directory_passes() {
    let mut cmd = bin_cmd();
    cmd.args(["health", "--root"]).arg(fixture("ci"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("проблем нет"));
}

#[test]
fn health_reports_issues_and_fails() {
    let mut cmd = bin_cmd();
    cmd.args(["health", "--root"]).arg(fixture("ci_bad"));
    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("[empty-name]"));
}

#[test]
fn schema_dumps_report_schemas() {
    let tmp = tempfile::tempdir().expect("tempdir");

    let mut cmd = bin_cmd();
    cmd.args(["schema", "--out-dir"]).arg(tmp.path());
    cmd.assert().success();

    for name in [
        "validation_msg.schema.json",
        "diff_output.schema.json",
        "sync_summary.schema.json",
        "health_report.schema.json",
        "flat_attr.schema.json",
    ] {
        let path = tmp.path().join(name);
        let text = fs::read_to_string(&path).unwrap_or_else(|_| panic!("{name} missing"));
        assert!(text.contains("schema_version"), "{name} has no schema_version");
    }
}
