use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn list_shows_selected_layers() {
  let env = TestEnv::new();
  env.layer("Reference/coast.toml", "coastlines", "Coastlines", ("coast", "only"), &[]);
  env.layer("Basemaps/imagery.toml", "satellite", "Satellite", ("imagery", "wms"), &[]);

  env
    .cmd()
    .args(["list", "--pattern", "coast*"])
    .assert()
    .success()
    .stdout(predicate::str::contains("coastlines (Reference / Coastlines) coast.only [repository]"))
    .stdout(predicate::str::contains("satellite").not());
}

#[test]
fn list_json_output_is_valid() {
  let env = TestEnv::new();
  env.layer(
    "Reference/coast.toml",
    "coastlines",
    "Coastlines",
    ("coast", "only"),
    &[&["cp", "{input_dir}/coast.gpkg", "{output_dir}/coast.gpkg"]],
  );

  let output = env.cmd().args(["list", "-o", "json"]).output().unwrap();
  assert!(output.status.success());

  let items: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let items = items.as_array().unwrap();
  assert_eq!(items.len(), 1);
  assert_eq!(items[0]["id"], "coastlines");
  assert_eq!(items[0]["group"], serde_json::json!(["Reference"]));
  assert_eq!(items[0]["kind"], "repository");
  assert_eq!(items[0]["steps"], 1);
}
