use assert_cmd::cargo::cargo_bin_cmd;
use doke::doke::testing::{
    DAMAGE_SOURCE, LABEL_SOURCE, ROOT_CONFIG, SAMPLE_DOCUMENT, STAT_MODIFIER_SOURCE, WEATHER_SOURCE,
};
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Lay the walkthrough grammar out on disk the way the root config expects.
fn walkthrough_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("effects")).unwrap();
    fs::create_dir_all(root.join("conditions")).unwrap();
    fs::write(root.join("root.yaml"), ROOT_CONFIG).unwrap();
    fs::write(root.join("effects/damage.yaml"), DAMAGE_SOURCE).unwrap();
    fs::write(root.join("effects/stat_modifier.yaml"), STAT_MODIFIER_SOURCE).unwrap();
    fs::write(root.join("conditions/weather.yaml"), WEATHER_SOURCE).unwrap();
    fs::write(root.join("labels.yaml"), LABEL_SOURCE).unwrap();
    fs::write(root.join("potion.md"), SAMPLE_DOCUMENT).unwrap();
    dir
}

fn path(dir: &Path, name: &str) -> PathBuf {
    dir.join(name)
}

#[test]
fn parse_prints_json_value_graph() {
    let dir = walkthrough_dir();
    let mut cmd = cargo_bin_cmd!("doke");
    cmd.arg("parse")
        .arg("--config")
        .arg(path(dir.path(), "root.yaml"))
        .arg(path(dir.path(), "potion.md"));

    let output_pred = predicate::str::contains("\"$type\": \"Item\"")
        .and(predicate::str::contains("\"$type\": \"StatModifier\""))
        .and(predicate::str::contains("\"label\": \"a tonic for 100 gold\""))
        .and(predicate::str::contains("\"price\": 100"));

    cmd.assert().success().stdout(output_pred);
}

#[test]
fn parse_debug_format() {
    let dir = walkthrough_dir();
    let mut cmd = cargo_bin_cmd!("doke");
    cmd.arg("parse")
        .arg("--config")
        .arg(path(dir.path(), "root.yaml"))
        .arg("--format")
        .arg("debug")
        .arg(path(dir.path(), "potion.md"));

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Resource {").and(predicate::str::contains("\"WeatherCondition\"")));
}

#[test]
fn parse_trace_goes_to_stderr() {
    let dir = walkthrough_dir();
    let mut cmd = cargo_bin_cmd!("doke");
    cmd.arg("parse")
        .arg("--config")
        .arg(path(dir.path(), "root.yaml"))
        .arg("--trace")
        .arg(path(dir.path(), "potion.md"));

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("line 11: \"Deals 10 damage\""))
        .stdout(predicate::str::contains("line 11").not());
}

#[test]
fn parse_reports_failing_statement_and_exits_nonzero() {
    let dir = walkthrough_dir();
    fs::write(dir.path().join("bad.md"), "- Adds 4 health to you\n\nno label here\n").unwrap();
    let config = ROOT_CONFIG.replace("label?: Label", "label: Label");
    fs::write(dir.path().join("strict.yaml"), config).unwrap();

    let mut cmd = cargo_bin_cmd!("doke");
    cmd.arg("parse")
        .arg("--config")
        .arg(path(dir.path(), "strict.yaml"))
        .arg(path(dir.path(), "bad.md"));

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("required field 'label'"));
}

#[test]
fn parse_settings_file_enables_exhaustive_mode() {
    let dir = walkthrough_dir();
    fs::write(dir.path().join("strict.toml"), "[assembly]\nexhaustive = true\n").unwrap();

    let mut cmd = cargo_bin_cmd!("doke");
    cmd.arg("parse")
        .arg("--config")
        .arg(path(dir.path(), "root.yaml"))
        .arg("--settings")
        .arg(path(dir.path(), "strict.toml"))
        .arg(path(dir.path(), "potion.md"));

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("line 5: cannot read \"Potion of Vigor\""))
        .stderr(predicate::str::contains("caused by:"));
}

#[test]
fn parse_reads_project_settings_beside_root_config() {
    let dir = walkthrough_dir();
    fs::write(dir.path().join("doke.toml"), "[assembly]\nexhaustive = true\n").unwrap();

    let mut cmd = cargo_bin_cmd!("doke");
    cmd.arg("parse")
        .arg("--config")
        .arg(path(dir.path(), "root.yaml"))
        .arg(path(dir.path(), "potion.md"));

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("line 5: cannot read \"Potion of Vigor\""));
}

#[test]
fn settings_flag_overrides_project_settings() {
    let dir = walkthrough_dir();
    fs::write(dir.path().join("doke.toml"), "[assembly]\nexhaustive = true\n").unwrap();
    fs::write(dir.path().join("lenient.toml"), "[assembly]\nexhaustive = false\n").unwrap();

    let mut cmd = cargo_bin_cmd!("doke");
    cmd.arg("parse")
        .arg("--config")
        .arg(path(dir.path(), "root.yaml"))
        .arg("--settings")
        .arg(path(dir.path(), "lenient.toml"))
        .arg(path(dir.path(), "potion.md"));

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"$type\": \"Item\""));
}

#[test]
fn check_lists_types() {
    let dir = walkthrough_dir();
    let mut cmd = cargo_bin_cmd!("doke");
    cmd.arg("check").arg("--config").arg(path(dir.path(), "root.yaml"));

    let output_pred = predicate::str::contains("root: Item")
        .and(predicate::str::contains("effects: [Effect]"))
        .and(predicate::str::contains("label?: Label"))
        .and(predicate::str::contains("Effect (5 rules)"))
        .and(predicate::str::contains("conditions: [Condition]"))
        .and(predicate::str::contains("Stat (1 table)"));

    cmd.assert().success().stdout(output_pred);
}

#[test]
fn check_rejects_unknown_children_type() {
    let dir = walkthrough_dir();
    fs::write(
        dir.path().join("broken.yaml"),
        "root: Item\nchildren:\n  - spells: [Spell]\n",
    )
    .unwrap();

    let mut cmd = cargo_bin_cmd!("doke");
    cmd.arg("check").arg("--config").arg(path(dir.path(), "broken.yaml"));

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unknown type 'Spell'"));
}

#[test]
fn split_shows_statement_tree() {
    let dir = walkthrough_dir();
    let mut cmd = cargo_bin_cmd!("doke");
    cmd.arg("split").arg(path(dir.path(), "potion.md"));

    let output_pred = predicate::str::contains("name = Potion of Vigor")
        .and(predicate::str::contains("body (from line 5):"))
        .and(predicate::str::contains("      12: when raining"))
        .and(predicate::str::contains("Brewed by the guild."));

    cmd.assert().success().stdout(output_pred);
}

#[test]
fn split_lists_wiki_links() {
    let dir = walkthrough_dir();
    fs::write(
        dir.path().join("summons.md"),
        "- Summons [[Wolf]] near [[Den|the den]]\n- **Heals** `2`\n",
    )
    .unwrap();

    let mut cmd = cargo_bin_cmd!("doke");
    cmd.arg("split").arg(path(dir.path(), "summons.md"));

    let output_pred = predicate::str::contains("   1: Summons Wolf near the den")
        .and(predicate::str::contains("        links: Wolf, Den"))
        .and(predicate::str::contains("   2: Heals 2"));

    cmd.assert().success().stdout(output_pred);
}

#[test]
fn missing_document_fails() {
    let dir = walkthrough_dir();
    let mut cmd = cargo_bin_cmd!("doke");
    cmd.arg("parse")
        .arg("--config")
        .arg(path(dir.path(), "root.yaml"))
        .arg(path(dir.path(), "absent.md"));

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Error reading"));
}
