use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::{TempDir, tempdir};

fn write_json(path: &Path, value: &Value) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

fn flow_ref(id: &str) -> Value {
    json!({ "@refObjectId": id, "@type": "flow data set", "@version": "01.00.000" })
}

fn exchange(slot: &str, direction: &str, flow: &str) -> Value {
    json!({
        "@dataSetInternalID": slot,
        "exchangeDirection": direction,
        "referenceToFlowDataSet": flow_ref(flow)
    })
}

/// Store with one flow and two processes, a -> b connectable on slots 3 / 7
fn fixture() -> TempDir {
    let dir = tempdir().unwrap();
    let store = dir.path().join("store");

    write_json(
        &store.join("flows/steel_01.00.000.json"),
        &json!({ "flowDataSet": { "flowInformation": {} } }),
    );
    write_json(
        &store.join("processes/a_01.00.000.json"),
        &json!({ "processDataSet": {
            "processInformation": { "quantitativeReference": { "referenceToReferenceFlow": "3" } },
            "exchanges": { "exchange": [exchange("3", "Output", "steel")] }
        }}),
    );
    write_json(
        &store.join("processes/b_01.00.000.json"),
        &json!({ "processDataSet": {
            "exchanges": { "exchange": [exchange("7", "Input", "steel")] }
        }}),
    );

    write_json(
        &dir.path().join("process.json"),
        &json!({ "processDataSet": {
            "exchanges": { "exchange": [
                { "@dataSetInternalID": "0", "referenceToFlowDataSet": flow_ref("steel") }
            ]}
        }}),
    );
    write_json(
        &dir.path().join("broken.json"),
        &json!({ "processDataSet": {
            "processInformation": { "dataSetInformation": {
                "referenceToExternalDocumentation": {
                    "@refObjectId": "missing-source", "@type": "source data set", "@version": "01.00.000"
                }
            }},
            "exchanges": { "exchange": [
                { "@dataSetInternalID": "0", "referenceToFlowDataSet": flow_ref("steel") }
            ]}
        }}),
    );

    dir
}

fn lcaref(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("lcaref").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("LCAREF_STORE")
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn locate_lists_reference_paths() {
    let dir = fixture();
    lcaref(&dir)
        .args(["locate", "broken.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "/processDataSet/exchanges/exchange/0/referenceToFlowDataSet",
        ))
        .stdout(predicate::str::contains("2 reference(s) found"));
}

#[test]
fn validate_clean_document_succeeds() {
    let dir = fixture();
    lcaref(&dir)
        .args(["validate", "process.json", "--store", "store"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 reference(s), 0 failed"));
}

#[test]
fn validate_reports_dangling_reference_and_section() {
    let dir = fixture();
    lcaref(&dir)
        .args(["validate", "broken.json", "--store", "store"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("does not exist"))
        .stdout(predicate::str::contains("processInformation"))
        .stderr(predicate::str::contains("1 reference(s) failed validation"));
}

#[test]
fn validate_json_output_is_machine_readable() -> Result<(), Box<dyn std::error::Error>> {
    let dir = fixture();
    let output = lcaref(&dir)
        .env("LCAREF_STORE", "store")
        .args(["--format", "json", "validate", "process.json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let parsed: Value = serde_json::from_slice(&output)?;
    assert_eq!(parsed["kind"], "process");
    assert_eq!(parsed["outcomes"][0]["status"], "valid");
    assert_eq!(parsed["outcomes"][0]["resolvedVersion"], "01.00.000");
    assert_eq!(parsed["distinctLookups"], 1);
    assert_eq!(parsed["sections"]["sections"]["exchanges"], false);
    assert_eq!(parsed["sections"]["sections"]["unmapped"], false);
    Ok(())
}

#[test]
fn validate_without_store_fails() {
    let dir = fixture();
    lcaref(&dir)
        .args(["validate", "process.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No dataset store configured"));
}

#[test]
fn config_file_supplies_store_root() {
    let dir = fixture();
    fs::write(dir.path().join("lcaref.yml"), "store:\n  root: store\n").unwrap();
    lcaref(&dir)
        .args(["validate", "process.json"])
        .assert()
        .success();
}

#[test]
fn invalid_config_is_reported() {
    let dir = fixture();
    fs::write(dir.path().join("lcaref.yml"), "validation:\n  max_concurrent_lookups: 0\n").unwrap();
    lcaref(&dir)
        .args(["validate", "process.json", "--store", "store"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn model_with_valid_edge_succeeds() {
    let dir = fixture();
    write_json(
        &dir.path().join("model.json"),
        &json!({
            "nodes": [
                { "@refObjectId": "a", "@version": "01.00.000" },
                { "@refObjectId": "b", "@version": "01.00.000" }
            ],
            "edges": [{
                "sourceProcess": { "@refObjectId": "a", "@version": "01.00.000" },
                "sourceOutputFlowInternalID": "3",
                "targetProcess": { "@refObjectId": "b", "@version": "01.00.000" },
                "targetInputFlowInternalID": "7"
            }]
        }),
    );

    lcaref(&dir)
        .args(["model", "model.json", "--store", "store"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[valid]"))
        .stdout(predicate::str::contains("no reference flow"));
}

#[test]
fn model_with_numeric_slot_ids_succeeds() {
    let dir = fixture();
    write_json(
        &dir.path().join("model.json"),
        &json!({
            "nodes": [
                { "@refObjectId": "a", "@version": "01.00.000" },
                { "@refObjectId": "b", "@version": "01.00.000" }
            ],
            "edges": [{
                "sourceProcess": { "@refObjectId": "a", "@version": "01.00.000" },
                "sourceOutputFlowInternalID": 3,
                "targetProcess": { "@refObjectId": "b", "@version": "01.00.000" },
                "targetInputFlowInternalID": 7
            }]
        }),
    );

    lcaref(&dir)
        .args(["model", "model.json", "--store", "store"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[valid]"));
}

#[test]
fn model_with_reversed_edge_fails() {
    let dir = fixture();
    write_json(
        &dir.path().join("model.json"),
        &json!({
            "nodes": [
                { "@refObjectId": "a", "@version": "01.00.000" },
                { "@refObjectId": "b", "@version": "01.00.000" }
            ],
            "edges": [{
                "sourceProcess": { "@refObjectId": "b", "@version": "01.00.000" },
                "sourceOutputFlowInternalID": "7",
                "targetProcess": { "@refObjectId": "a", "@version": "01.00.000" },
                "targetInputFlowInternalID": "3"
            }]
        }),
    );

    lcaref(&dir)
        .args(["model", "model.json", "--store", "store"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("direction mismatch"))
        .stderr(predicate::str::contains("1 edge(s) need repair"));
}
