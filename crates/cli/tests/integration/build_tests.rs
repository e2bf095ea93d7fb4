use predicates::prelude::*;

use super::common::TestEnv;

const COPY_STEP: &[&str] = &["cp", "{input_dir}/coast.gpkg", "{output_dir}/coast.gpkg"];

#[test]
fn build_finalizes_layer_without_steps() {
  let env = TestEnv::new();
  env.layer("Reference/coast.toml", "coastlines", "Coastlines", ("coast", "only"), &[]);

  env
    .cmd()
    .arg("build")
    .assert()
    .success()
    .stdout(predicate::str::contains("Build complete"));

  let out = env.final_path().join("Reference").join("Coastlines");
  assert_eq!(std::fs::read_to_string(out.join("coastlines.gpkg")).unwrap(), "gpkg");
  assert!(out.join("provenance.txt").exists());
  assert!(env.output_path().join("fetch").join("coast.only").join("coast.gpkg").exists());
}

#[cfg(unix)]
#[test]
fn build_runs_command_steps() {
  let env = TestEnv::new();
  env.layer("coast.toml", "coastlines", "Coastlines", ("coast", "only"), &[COPY_STEP]);

  env.cmd().arg("build").assert().success();

  let wip = env.output_path().join("wip").join("coastlines").join("00-command-cp");
  assert!(wip.join("coast.gpkg").exists());
  let provenance = std::fs::read_to_string(env.final_path().join("Coastlines").join("provenance.txt")).unwrap();
  assert!(provenance.starts_with("cp "));
}

#[test]
fn second_build_runs_nothing() {
  let env = TestEnv::new();
  env.layer("coast.toml", "coastlines", "Coastlines", ("coast", "only"), &[]);

  env.cmd().arg("build").assert().success();

  let output = env.cmd().args(["build", "-o", "json"]).output().unwrap();
  assert!(output.status.success());
  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["success"], true);
  assert_eq!(report["tasks"]["executed"], 0);
  assert_eq!(report["tasks"]["cached"], 2);
}

#[test]
fn online_layers_are_skipped() {
  let env = TestEnv::new();
  env.layer("imagery.toml", "satellite", "Satellite", ("imagery", "wms"), &[]);

  let output = env.cmd().args(["build", "-o", "json"]).output().unwrap();
  assert!(output.status.success());
  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["layers"][0]["outcome"], "skipped");
  assert!(!env.final_path().exists());
}

#[test]
fn fetch_only_leaves_final_empty() {
  let env = TestEnv::new();
  env.layer("coast.toml", "coastlines", "Coastlines", ("coast", "only"), &[]);

  env.cmd().args(["build", "--fetch-only"]).assert().success();

  assert!(env.output_path().join("fetch").join("coast.only").exists());
  assert!(!env.final_path().exists());
}

#[test]
fn pattern_limits_build() {
  let env = TestEnv::new();
  env.layer("coast.toml", "coastlines", "Coastlines", ("coast", "only"), &[]);
  env.layer("coast.toml", "shoreline", "Shoreline", ("coast", "only"), &[]);

  env.cmd().args(["build", "-p", "shore*"]).assert().success();

  assert!(env.final_path().join("Shoreline").exists());
  assert!(!env.final_path().join("Coastlines").exists());
}

#[test]
fn output_flag_overrides_environment() {
  let env = TestEnv::new();
  env.layer("coast.toml", "coastlines", "Coastlines", ("coast", "only"), &[]);
  let elsewhere = env.root().join("elsewhere");

  env.cmd().arg("build").arg("--output").arg(&elsewhere).assert().success();

  assert!(elsewhere.join("final").join("Coastlines").join("coastlines.gpkg").exists());
  assert!(!env.final_path().exists());
}

#[cfg(unix)]
#[test]
fn failed_step_fails_build_and_resumes() {
  let env = TestEnv::new();
  env.layer("coast.toml", "coastlines", "Coastlines", ("coast", "only"), &[&["false"]]);
  env.layer("other.toml", "shoreline", "Shoreline", ("coast", "only"), &[]);

  env
    .cmd()
    .arg("build")
    .assert()
    .failure()
    .stdout(predicate::str::contains("failed at step:coastlines#00-command-false"))
    .stderr(predicate::str::contains("1 of 2 layers did not build"));

  assert!(env.final_path().join("Shoreline").join("shoreline.gpkg").exists());
  assert!(!env.output_path().join("wip").join("coastlines").join("00-command-false").exists());

  // Fix the step; only the failed chain runs again.
  std::fs::remove_file(env.root().join("layers").join("coast.toml")).unwrap();
  env.layer("coast.toml", "coastlines", "Coastlines", ("coast", "only"), &[COPY_STEP]);

  let output = env.cmd().args(["build", "-o", "json"]).output().unwrap();
  assert!(output.status.success());
  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["tasks"]["executed"], 2);
}
