// tests/manifest.rs

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::sync::Arc;

use serde_json::{json, Value};

use buildgraph::errors::BuildgraphError;
use buildgraph::exec::{Action, ActionContext};
use buildgraph::fs::{FileSystem, MockFileSystem};
use buildgraph::manifest::{derive, derive_from_str, CaretRanges, ManifestAction, ManifestSpec};

type TestResult = Result<(), Box<dyn Error>>;

fn library_spec() -> ManifestSpec {
    ManifestSpec {
        name: "ng2-sharebuttons".to_string(),
        fields: ["version", "description", "license"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        main: Some("index.js".to_string()),
        module: Some("index.js".to_string()),
        typings: Some("index.d.ts".to_string()),
    }
}

#[test]
fn exact_dependency_becomes_caret_peer() -> TestResult {
    let out = derive(&json!({ "dependencies": { "x": "1.2.3" } }), &ManifestSpec::default())?;
    assert_eq!(out["peerDependencies"], json!({ "x": "^1.2.3" }));
    Ok(())
}

#[test]
fn ranges_are_kept_verbatim() -> TestResult {
    let ranges = CaretRanges::new()?;
    let caret_range = |v: &str| ranges.widen(v);
    assert_eq!(caret_range("1.2.3"), "^1.2.3");
    assert_eq!(caret_range("v2.0.0"), "^2.0.0");
    assert_eq!(caret_range("=3.1.4-beta.1"), "^3.1.4-beta.1");
    assert_eq!(caret_range("^1.2.3"), "^1.2.3");
    assert_eq!(caret_range("~4.0.0"), "~4.0.0");
    assert_eq!(caret_range(">=1.0.0 <2.0.0"), ">=1.0.0 <2.0.0");
    assert_eq!(caret_range("*"), "*");
    assert_eq!(caret_range("latest"), "latest");
    Ok(())
}

#[test]
fn field_order_and_entry_points() -> TestResult {
    let source = json!({
        "name": "my-lib-dev",
        "license": "MIT",
        "version": "1.0.0",
        "scripts": { "build": "gulp" },
        "dependencies": { "@angular/core": "2.4.0", "rxjs": "^5.0.1" },
        "devDependencies": { "gulp": "3.9.1" }
    });

    let out = derive(&source, &library_spec())?;
    let keys: Vec<&str> = out.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec!["name", "version", "license", "main", "module", "typings", "peerDependencies"]
    );
    assert_eq!(out["name"], "ng2-sharebuttons");
    assert_eq!(
        out["peerDependencies"],
        json!({ "@angular/core": "^2.4.0", "rxjs": "^5.0.1" })
    );
    assert!(out.get("scripts").is_none());
    assert!(out.get("devDependencies").is_none());
    Ok(())
}

#[test]
fn dependency_fields_are_never_copied() -> TestResult {
    let spec = ManifestSpec {
        fields: vec!["devDependencies".to_string(), "version".to_string()],
        ..library_spec()
    };
    let out = derive(
        &json!({ "version": "1.0.0", "devDependencies": { "a": "1.0.0" } }),
        &spec,
    )?;
    assert!(out.get("devDependencies").is_none());
    assert_eq!(out["peerDependencies"], json!({}));
    Ok(())
}

#[test]
fn empty_name_keeps_source_name() -> TestResult {
    let out = derive(&json!({ "name": "from-source" }), &ManifestSpec::default())?;
    assert_eq!(out["name"], "from-source");
    Ok(())
}

#[test]
fn derivation_is_idempotent() -> TestResult {
    let text = r#"{"name":"x","version":"0.1.0","dependencies":{"a":"1.0.0","b":"~2.0.0"}}"#;
    let first = derive_from_str(text, &library_spec())?;
    let second = derive_from_str(text, &library_spec())?;
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string_pretty(&first)?,
        serde_json::to_string_pretty(&second)?
    );
    Ok(())
}

#[test]
fn non_object_and_invalid_json_are_manifest_errors() {
    assert!(matches!(
        derive(&json!([1, 2, 3]), &library_spec()),
        Err(BuildgraphError::ManifestRead(_))
    ));
    assert!(matches!(
        derive_from_str("{ not json", &library_spec()),
        Err(BuildgraphError::ManifestRead(_))
    ));
}

#[tokio::test]
async fn manifest_action_writes_package_json_and_extra_files() -> TestResult {
    init_tracing();
    let fs = Arc::new(MockFileSystem::new());
    fs.add_file(
        "/project/package.json",
        r#"{"name":"dev","version":"1.2.0","dependencies":{"core-js":"2.4.1"}}"#,
    );
    fs.add_file("/project/README.md", "# readme");
    fs.add_file("/project/LICENSE", "MIT");

    let action = ManifestAction {
        spec: library_spec(),
        source: "package.json".into(),
        dest: "dist".into(),
        extra_files: vec!["README.md".into(), "LICENSE".into(), "CHANGELOG.md".into()],
    };
    let ctx = ActionContext::new("/project").with_fs(fs.clone());
    action.run(&ctx).await?;

    let written = fs.read_to_string("/project/dist/package.json".as_ref())?;
    assert!(written.starts_with("{\n  \"name\": \"ng2-sharebuttons\""), "{written}");
    let parsed: Value = serde_json::from_str(&written)?;
    assert_eq!(parsed["peerDependencies"]["core-js"], "^2.4.1");

    assert_eq!(fs.read_to_string("/project/dist/README.md".as_ref())?, "# readme");
    assert!(fs.exists("/project/dist/LICENSE".as_ref()));
    assert!(!fs.exists("/project/dist/CHANGELOG.md".as_ref()));
    Ok(())
}

#[tokio::test]
async fn manifest_action_fails_on_missing_source() {
    let fs = Arc::new(MockFileSystem::new());
    let action = ManifestAction {
        spec: library_spec(),
        source: "package.json".into(),
        dest: "dist".into(),
        extra_files: Vec::new(),
    };
    let ctx = ActionContext::new("/project").with_fs(fs);
    let err = action.run(&ctx).await.unwrap_err();
    assert!(format!("{err:#}").contains("manifest"), "{err:#}");
}
