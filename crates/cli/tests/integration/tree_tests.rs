use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn tree_prints_groups_and_layers() {
  let env = TestEnv::new();
  env.layer("Reference/coast.toml", "coastlines", "Coastlines", ("coast", "only"), &[]);
  env.layer("Basemaps/imagery.toml", "satellite", "Satellite", ("imagery", "wms"), &[]);

  env
    .cmd()
    .arg("tree")
    .assert()
    .success()
    .stdout(predicate::str::contains("Reference"))
    .stdout(predicate::str::contains("Coastlines [coastlines]"))
    .stdout(predicate::str::contains("Satellite [satellite]"))
    .stdout(predicate::str::contains("not selected").not());
}

#[test]
fn tree_marks_unselected_layers() {
  let env = TestEnv::new();
  env.layer("Reference/coast.toml", "coastlines", "Coastlines", ("coast", "only"), &[]);
  env.layer("Basemaps/imagery.toml", "satellite", "Satellite", ("imagery", "wms"), &[]);

  env
    .cmd()
    .args(["tree", "--pattern", "coast*"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Satellite [satellite] (not selected)"))
    .stdout(predicate::str::contains("1 of 2 layers"));
}

#[test]
fn tree_rejects_unknown_dataset() {
  let env = TestEnv::new();
  env.layer("broken.toml", "broken", "Broken", ("nope", "only"), &[]);

  env
    .cmd()
    .arg("tree")
    .assert()
    .failure()
    .stderr(predicate::str::contains("unknown dataset 'nope'"));
}

#[test]
fn tree_rejects_pattern_matching_nothing() {
  let env = TestEnv::new();
  env.layer("coast.toml", "coastlines", "Coastlines", ("coast", "only"), &[]);

  env
    .cmd()
    .args(["tree", "-p", "rivers*"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("no layers found matching pattern 'rivers*'"));
}

#[test]
fn missing_project_dir_fails() {
  let env = TestEnv::new();

  env
    .cmd()
    .arg("-C")
    .arg(env.root().join("does-not-exist"))
    .arg("tree")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to load project"));
}

#[test]
fn tree_rejects_layers_sharing_a_final_directory() {
  let env = TestEnv::new();
  env.layer("a.toml", "first", "Same", ("coast", "only"), &[]);
  env.layer("a.toml", "second", "Same", ("coast", "only"), &[]);

  env
    .cmd()
    .arg("tree")
    .assert()
    .failure()
    .stderr(predicate::str::contains("layers 'first' and 'second' both build into final/Same"));
}
