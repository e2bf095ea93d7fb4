use predicates::prelude::*;

use super::common::TestEnv;

fn built_env() -> TestEnv {
  let env = TestEnv::new();
  env.layer("coast.toml", "coastlines", "Coastlines", ("coast", "only"), &[]);
  env.cmd().arg("build").assert().success();
  env
}

#[test]
fn clean_removes_final_by_default() {
  let env = built_env();

  env
    .cmd()
    .arg("clean")
    .assert()
    .success()
    .stdout(predicate::str::contains("Clean complete"));

  assert!(!env.final_path().exists());
  assert!(env.output_path().join("fetch").join("coast.only").exists());
}

#[test]
fn clean_dry_run_keeps_everything() {
  let env = built_env();

  env
    .cmd()
    .args(["clean", "--all-fetch", "--dry-run"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Dry run"));

  assert!(env.final_path().exists());
  assert!(env.output_path().join("fetch").exists());
}

#[test]
fn clean_fetch_glob_forces_refetch() {
  let env = built_env();

  env
    .cmd()
    .args(["clean", "--fetch", "coast.*", "--keep-final"])
    .assert()
    .success();
  assert!(!env.output_path().join("fetch").join("coast.only").exists());
  assert!(env.final_path().exists());

  // Final output still exists, so nothing upstream is needed.
  let output = env.cmd().args(["build", "-o", "json"]).output().unwrap();
  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["tasks"]["executed"], 0);
}

#[test]
fn clean_json_output_is_valid() {
  let env = built_env();

  let output = env.cmd().args(["clean", "-o", "json"]).output().unwrap();
  assert!(output.status.success());
  let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(result["dry_run"], false);
  assert_eq!(result["removed"].as_array().unwrap().len(), 1);
}

#[test]
fn clean_rejects_invalid_glob() {
  let env = built_env();

  env
    .cmd()
    .args(["clean", "--wip", "["])
    .assert()
    .failure()
    .stderr(predicate::str::contains("invalid pattern"));
}
