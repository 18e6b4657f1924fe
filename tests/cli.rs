use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn fixture_dir() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/project"))
}

fn copy_fixture(dest: &Path) {
    for rel in ["draft.json", "data/notes.md", "data/figures.csv"] {
        let target = dest.join(rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::copy(fixture_dir().join(rel), target).unwrap();
    }
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn docpack(root: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("docpack"));
    cmd.arg("--root").arg(root).env_remove("RUST_LOG");
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is json")
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn build_prints_nested_outline() {
    let temp = tempdir().unwrap();
    copy_fixture(temp.path());

    let assert = docpack(temp.path()).arg("build").arg("draft.json").assert().success();
    let outline = stdout_json(assert.get_output());

    assert_eq!(outline["title"], "Quarterly Report");
    assert_eq!(outline["general_instruction"], "Write in a formal tone.");
    let sections = outline["sections"].as_array().unwrap();
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0]["title"], "Summary");
    assert_eq!(sections[0]["resource_key"], "resource_1");
    assert_eq!(sections[0]["sections"][0]["prompt"], "Describe the figures.");
    assert_eq!(sections[0]["sections"][0]["refs"][0], "resource_2");
    assert_eq!(sections[1]["resource_key"], "inline_resource_1");
}

#[test]
fn build_tree_format() {
    let temp = tempdir().unwrap();
    copy_fixture(temp.path());

    docpack(temp.path())
        .args(["--format", "tree", "build", "draft.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Quarterly Report\n  [text] Summary <resource_1>\n    [ai] Numbers <resource_2>\n  [text] Closing <inline_resource_1>",
        ));
}

#[test]
fn build_output_writes_inline_text_beside_outline() {
    let temp = tempdir().unwrap();
    copy_fixture(temp.path());

    let assert = docpack(temp.path())
        .args(["build", "draft.json", "--output", "out/outline.json"])
        .assert()
        .success();
    let summary = stdout_json(assert.get_output());
    assert_eq!(summary["sections"], 3);

    let outline = read_json(&temp.path().join("out/outline.json"));
    let inline = outline["resources"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["key"] == "inline_resource_1")
        .expect("inline resource listed");
    assert_eq!(inline["is_inline"], true);
    let text = fs::read_to_string(inline["path"].as_str().unwrap()).unwrap();
    assert_eq!(text, "Thanks for reading.");
}

#[test]
fn save_then_load_restores_the_draft() {
    let temp = tempdir().unwrap();
    copy_fixture(temp.path());

    let assert = docpack(temp.path())
        .args(["save", "draft.json", "--output", "report.docpack"])
        .assert()
        .success();
    let report = stdout_json(assert.get_output());
    assert_eq!(report["omitted"].as_array().unwrap().len(), 0);
    assert_eq!(report["packed"].as_array().unwrap().len(), 3);

    docpack(temp.path())
        .args([
            "load",
            "report.docpack",
            "--dest",
            "restored",
            "--output",
            "loaded.json",
        ])
        .assert()
        .success();

    let loaded = read_json(&temp.path().join("loaded.json"));
    assert_eq!(loaded["title"], "Quarterly Report");
    let blocks = loaded["blocks"].as_array().unwrap();
    assert_eq!(blocks.len(), 3);
    assert_eq!(blocks[0]["content"], "# Notes\n\nRevenue grew.\n");
    assert_eq!(blocks[1]["indent_level"], 1);
    assert_eq!(blocks[2]["content"], "Thanks for reading.");
    assert_eq!(blocks[2]["edited"], true);
    // inline text is folded back into its block
    assert_eq!(loaded["resources"].as_array().unwrap().len(), 2);
    assert!(temp.path().join("restored/resource_1.md").exists());
}

#[test]
fn save_names_package_after_title() {
    let temp = tempdir().unwrap();
    copy_fixture(temp.path());

    docpack(temp.path())
        .args(["save", "draft.json", "--out-dir", "packages"])
        .assert()
        .success();

    let names: Vec<String> = fs::read_dir(temp.path().join("packages"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names.len(), 1);
    assert!(names[0].starts_with("Quarterly Report_"));
    assert!(names[0].ends_with(".docpack"));
}

#[test]
fn extract_suffixes_clashing_files() {
    let temp = tempdir().unwrap();
    copy_fixture(temp.path());

    docpack(temp.path())
        .args(["save", "draft.json", "--output", "report.docpack"])
        .assert()
        .success();
    write_file(&temp.path().join("restored/resource_1.md"), "keep me");

    let assert = docpack(temp.path())
        .args(["extract", "report.docpack", "--dest", "restored"])
        .assert()
        .success();
    let extracted = stdout_json(assert.get_output());

    assert_eq!(extracted["collisions"].as_array().unwrap().len(), 1);
    let path = extracted["manifest"]["resources"][0]["path"].as_str().unwrap();
    assert!(path.ends_with("resource_1_1.md"));
    assert_eq!(
        fs::read_to_string(temp.path().join("restored/resource_1.md")).unwrap(),
        "keep me"
    );
}

#[test]
fn load_rejects_non_docpack_files() {
    let temp = tempdir().unwrap();
    write_file(&temp.path().join("report.zip"), "not a package");

    docpack(temp.path())
        .args(["load", "report.zip"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("only .docpack files are supported"));
}

#[test]
fn extract_rejects_archive_without_manifest() {
    let temp = tempdir().unwrap();
    write_file(&temp.path().join("broken.docpack"), "plain text");

    docpack(temp.path())
        .args(["extract", "broken.docpack", "--dest", "out"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid package"));
    assert!(!temp.path().join("out").exists());
}

#[test]
fn strict_lint_fails_on_indent_jump() {
    let temp = tempdir().unwrap();
    write_file(
        &temp.path().join("draft.json"),
        r#"{"title": "T", "blocks": [
            {"id": "a", "type": "ai", "heading": "A"},
            {"id": "b", "type": "ai", "heading": "B", "indent_level": 2}
        ]}"#,
    );

    let assert = docpack(temp.path())
        .args(["lint", "draft.json"])
        .assert()
        .success();
    let issues = stdout_json(assert.get_output());
    assert_eq!(issues[0]["code"], "INDENT_JUMP");

    docpack(temp.path())
        .args(["lint", "draft.json", "--strict"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("lint error"));
}

#[test]
fn edit_commands_update_draft_in_place() {
    let temp = tempdir().unwrap();
    copy_fixture(temp.path());

    let assert = docpack(temp.path())
        .args([
            "edit", "draft.json", "add", "--kind", "text", "--after", "b-numbers",
        ])
        .assert()
        .success();
    let id = stdout_json(assert.get_output())["id"]
        .as_str()
        .unwrap()
        .to_string();

    docpack(temp.path())
        .args(["edit", "draft.json", "heading", id.as_str(), "Appendix"])
        .assert()
        .success();
    docpack(temp.path())
        .args(["edit", "draft.json", "outdent", id.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"changed\":true"));

    let draft = read_json(&temp.path().join("draft.json"));
    let added = &draft["blocks"][3];
    assert_eq!(added["id"], id.as_str());
    assert_eq!(added["type"], "text");
    assert_eq!(added["heading"], "Appendix");
    assert_eq!(added["indent_level"], 0);
}

#[test]
fn attach_by_relative_path_reuses_the_catalogued_file() {
    let temp = tempdir().unwrap();
    copy_fixture(temp.path());

    let assert = docpack(temp.path())
        .args(["edit", "draft.json", "attach", "b-numbers", "data/notes.md"])
        .assert()
        .success();
    assert_eq!(stdout_json(assert.get_output())["key"], "resource_1");

    let draft = read_json(&temp.path().join("draft.json"));
    assert_eq!(draft["resources"].as_array().unwrap().len(), 2);
    let attached = draft["blocks"][2]["resources"].as_array().unwrap();
    assert_eq!(attached.len(), 2);
    assert_eq!(attached[1]["path"], "data/notes.md");

    let assert = docpack(temp.path())
        .args(["save", "draft.json", "--output", "report.docpack"])
        .assert()
        .success();
    let report = stdout_json(assert.get_output());
    assert_eq!(report["omitted"].as_array().unwrap().len(), 0);

    // the absolute spelling names the same file
    let absolute = temp.path().join("data/notes.md");
    docpack(temp.path())
        .args(["edit", "draft.json", "detach", "b-numbers"])
        .arg(&absolute)
        .assert()
        .success();
    let draft = read_json(&temp.path().join("draft.json"));
    assert_eq!(draft["blocks"][2]["resources"].as_array().unwrap().len(), 1);
    assert_eq!(draft["resources"].as_array().unwrap().len(), 2);
}

#[test]
fn edit_unknown_block_fails() {
    let temp = tempdir().unwrap();
    copy_fixture(temp.path());

    docpack(temp.path())
        .args(["edit", "draft.json", "delete", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no block with id missing"));
}

#[test]
fn inspect_lists_entries_without_extracting() {
    let temp = tempdir().unwrap();
    copy_fixture(temp.path());

    docpack(temp.path())
        .args(["save", "draft.json", "--output", "report.docpack"])
        .assert()
        .success();

    let assert = docpack(temp.path())
        .args(["inspect", "report.docpack"])
        .assert()
        .success();
    let listing = stdout_json(assert.get_output());
    let mut entries: Vec<&str> = listing["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e.as_str().unwrap())
        .collect();
    entries.sort();
    assert_eq!(
        entries,
        vec![
            "outline.json",
            "resources/inline_resource_1.txt",
            "resources/resource_1.md",
            "resources/resource_2.csv"
        ]
    );
    assert_eq!(listing["manifest"]["title"], "Quarterly Report");
    assert!(!temp.path().join("restored").exists());
}

#[test]
fn flatten_loads_text_relative_to_root() {
    let temp = tempdir().unwrap();
    copy_fixture(temp.path());

    docpack(temp.path())
        .args(["build", "draft.json", "--output", "outline.json"])
        .assert()
        .success();

    let assert = docpack(temp.path())
        .args(["flatten", "outline.json"])
        .assert()
        .success();
    let draft = stdout_json(assert.get_output());

    let blocks = draft["blocks"].as_array().unwrap();
    assert_eq!(blocks.len(), 3);
    assert_eq!(blocks[0]["content"], "# Notes\n\nRevenue grew.\n");
    assert_eq!(blocks[0]["collapsed"], false);
    assert_eq!(blocks[2]["content"], "Thanks for reading.");
}
