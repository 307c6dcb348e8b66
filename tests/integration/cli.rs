//! `mpdeps build` end to end.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn write(root: &std::path::Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn sample_project() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(
        root,
        "mpdeps.toml",
        "app = \"src/main.js\"\npages = [\"src/pages/index/main.js\"]\n\n[readiness]\ntimeout_ms = 10000\n",
    );
    write(root, "src/main.js", "---\nglobal_components:\n  HeaderBar: ./components/header-bar.vue\n---\n");
    write(root, "src/pages/index/main.js", "---\nroot_component: ./index.vue\n---\n");
    write(
        root,
        "src/pages/index/index.vue",
        "---\nmixins:\n  - ../../mixins/text.js\n---\n<view><header-bar />{{ upper(title) }}</view>",
    );
    write(root, "src/components/header-bar.vue", "<view>header</view>");
    write(root, "src/mixins/text.js", "---\nfilters:\n  upper: \"function (s) { return s.toUpperCase() }\"\n---\n");
    temp
}

#[test]
fn test_build_writes_artifacts() {
    let project = sample_project();

    Command::cargo_bin("mpdeps")
        .unwrap()
        .arg("build")
        .arg("--project")
        .arg(project.path())
        .env_remove("MPDEPS_CONFIG")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 units for"));

    let dist = project.path().join("dist");
    let index = std::fs::read_to_string(dist.join("pages/index/index.wxml")).unwrap();
    assert!(index.contains("<import src=\"/components/header-bar.wxml\" />"));
    assert!(index.contains("<wxs src=\"./index.wxs\" module=\"indexFilters\" />"));
    assert!(dist.join("pages/index/main.wxml").exists());
    assert!(dist.join("pages/index/index.wxs").exists());
    assert!(dist.join("mixins/text.wxs").exists());
    assert!(dist.join("components/header-bar.wxml").exists());
}

#[test]
fn test_build_json_summary() {
    let project = sample_project();

    Command::cargo_bin("mpdeps")
        .unwrap()
        .args(["--quiet", "build", "--json", "--project"])
        .arg(project.path())
        .env_remove("MPDEPS_CONFIG")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"registry_version\": 1"))
        .stdout(predicate::str::contains("\"global_components\": 1"))
        .stdout(predicate::str::contains("\"mixins_extracted\": 1"));
}

#[test]
fn test_build_reports_failed_unit() {
    let project = sample_project();
    write(project.path(), "src/components/broken.vue", "---\ncomponents: [oops\n---\n<view />");

    Command::cargo_bin("mpdeps")
        .unwrap()
        .arg("build")
        .arg("--project")
        .arg(project.path())
        .env_remove("MPDEPS_CONFIG")
        .assert()
        .failure()
        .stdout(predicate::str::contains("broken.vue"))
        .stderr(predicate::str::contains("1 of 3 units failed"));
}

#[test]
fn test_missing_explicit_config() {
    let temp = TempDir::new().unwrap();

    Command::cargo_bin("mpdeps")
        .unwrap()
        .arg("build")
        .arg("--config")
        .arg(temp.path().join("absent.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration file not found"))
        .stderr(predicate::str::contains("suggestion"));
}

#[test]
fn test_help_lists_build() {
    Command::cargo_bin("mpdeps")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"));
}
