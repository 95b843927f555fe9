// src/manifest.rs

//! Distribution manifest derivation.
//!
//! The published package gets a trimmed copy of the project manifest: a
//! fixed name, a whitelist of descriptive fields, the compiled entry points
//! and the project's runtime dependencies re-declared as peer dependencies.

use std::path::PathBuf;

use anyhow::Context;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::errors::{BuildgraphError, Result};
use crate::exec::{Action, ActionContext, BoxFuture};

const DEPENDENCY_FIELDS: [&str; 4] = [
    "dependencies",
    "devDependencies",
    "peerDependencies",
    "optionalDependencies",
];

/// What goes into the distribution manifest.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ManifestSpec {
    /// Name of the published package; empty keeps the source's name.
    pub name: String,
    /// Fields copied from the source, in output order.
    pub fields: Vec<String>,
    pub main: Option<String>,
    pub module: Option<String>,
    pub typings: Option<String>,
}

/// Derive the distribution manifest from a parsed source manifest.
pub fn derive(source: &Value, spec: &ManifestSpec) -> Result<Value> {
    let source = source.as_object().ok_or_else(|| {
        BuildgraphError::ManifestRead("source manifest is not a JSON object".to_string())
    })?;

    let mut out = Map::new();
    let name = if spec.name.is_empty() {
        source.get("name").cloned().unwrap_or(Value::Null)
    } else {
        Value::String(spec.name.clone())
    };
    out.insert("name".to_string(), name);

    for field in &spec.fields {
        if DEPENDENCY_FIELDS.contains(&field.as_str()) {
            warn!(field = %field, "dependency fields are not copied into the manifest");
            continue;
        }
        if field == "name" {
            continue;
        }
        match source.get(field) {
            Some(value) => {
                out.insert(field.clone(), value.clone());
            }
            None => debug!(field = %field, "field absent from source manifest"),
        }
    }

    let entry_points = [
        ("main", &spec.main),
        ("module", &spec.module),
        ("typings", &spec.typings),
    ];
    for (key, value) in entry_points {
        if let Some(value) = value {
            out.insert(key.to_string(), Value::String(value.clone()));
        }
    }

    out.insert(
        "peerDependencies".to_string(),
        Value::Object(peer_dependencies(source.get("dependencies"))?),
    );

    Ok(Value::Object(out))
}

/// Parse `text` and derive from it. Invalid JSON is a `ManifestRead` error.
pub fn derive_from_str(text: &str, spec: &ManifestSpec) -> Result<Value> {
    let source: Value = serde_json::from_str(text)
        .map_err(|e| BuildgraphError::ManifestRead(format!("invalid JSON: {e}")))?;
    derive(&source, spec)
}

fn peer_dependencies(deps: Option<&Value>) -> Result<Map<String, Value>> {
    let mut peers = Map::new();
    let Some(Value::Object(deps)) = deps else {
        return Ok(peers);
    };

    let ranges = CaretRanges::new()?;
    for (name, version) in deps {
        let version = match version {
            Value::String(v) => Value::String(ranges.widen(v)),
            other => other.clone(),
        };
        peers.insert(name.clone(), version);
    }
    Ok(peers)
}

/// Turns exact version pins into caret ranges.
#[derive(Debug, Clone)]
pub struct CaretRanges {
    exact: Regex,
}

impl CaretRanges {
    pub fn new() -> Result<Self> {
        let exact = Regex::new(r"^\s*[=v]?(\d+\.\d+\.\d+(?:[-+][0-9A-Za-z.+-]*)?)\s*$")
            .map_err(|e| BuildgraphError::Config(format!("invalid version pattern: {e}")))?;
        Ok(Self { exact })
    }

    /// `1.2.3` / `v1.2.3` / `=1.2.3` become `^1.2.3`; anything else is kept.
    pub fn widen(&self, version: &str) -> String {
        match self.exact.captures(version) {
            Some(caps) => format!("^{}", &caps[1]),
            None => version.to_string(),
        }
    }
}

/// Action that writes `<dest>/package.json` and copies the listed extra
/// files next to it.
#[derive(Debug, Clone)]
pub struct ManifestAction {
    pub spec: ManifestSpec,
    pub source: PathBuf,
    pub dest: PathBuf,
    pub extra_files: Vec<PathBuf>,
}

impl ManifestAction {
    async fn execute(&self, ctx: &ActionContext) -> anyhow::Result<()> {
        let source_path = ctx.resolve(&self.source);
        let text = ctx.fs.read_to_string(&source_path).map_err(|e| {
            BuildgraphError::ManifestRead(format!("{}: {e:#}", source_path.display()))
        })?;

        let manifest = derive_from_str(&text, &self.spec)?;
        let mut rendered = serde_json::to_string_pretty(&manifest)?;
        rendered.push('\n');

        let dest = ctx.resolve(&self.dest);
        let out = dest.join("package.json");
        ctx.fs
            .write(&out, rendered.as_bytes())
            .with_context(|| format!("writing {}", out.display()))?;
        info!(task = %ctx.task, path = %out.display(), "manifest written");

        for extra in &self.extra_files {
            let from = ctx.resolve(extra);
            if !ctx.fs.is_file(&from) {
                debug!(task = %ctx.task, file = %from.display(), "extra file absent; skipping");
                continue;
            }
            let Some(file_name) = from.file_name() else {
                continue;
            };
            let to = dest.join(file_name);
            let bytes = ctx.fs.read(&from)?;
            ctx.fs.write(&to, &bytes)?;
        }

        Ok(())
    }
}

impl Action for ManifestAction {
    fn describe(&self) -> String {
        format!(
            "manifest {} -> {}/package.json",
            self.source.display(),
            self.dest.display()
        )
    }

    fn run<'a>(&'a self, ctx: &'a ActionContext) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(self.execute(ctx))
    }
}
