// src/pipeline/inline.rs

//! Component resource inlining.
//!
//! Rewrites `templateUrl: './x.html'` into `template: "<contents>"` and
//! `styleUrls: ['./x.scss']` into `styles: ["<contents>"]`, so compiled
//! components no longer reference external files. Referenced stylesheets
//! written in Sass are read from the compiled `.css` sibling.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use regex::{Captures, Regex};

use super::transform::{FileEntry, Transform};
use crate::exec::{ActionContext, BoxFuture};

#[derive(Debug, Clone)]
pub struct InlineTemplates {
    template_url: Regex,
    style_urls: Regex,
    quoted: Regex,
}

impl InlineTemplates {
    pub fn new() -> crate::errors::Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| {
                crate::errors::BuildgraphError::Config(format!("invalid inline pattern: {e}"))
            })
        };
        Ok(Self {
            template_url: compile(r#"templateUrl\s*:\s*['"`]([^'"`]+)['"`]"#)?,
            style_urls: compile(r"styleUrls\s*:\s*\[([^\]]*)\]")?,
            quoted: compile(r#"['"`]([^'"`]+)['"`]"#)?,
        })
    }

    /// Inline every resource reference in `source`, a component file living
    /// in `dir`.
    pub fn inline(&self, ctx: &ActionContext, dir: &Path, source: &str) -> Result<String> {
        let with_template = replace_all(&self.template_url, source, |caps| {
            let contents = read_resource(ctx, dir, &caps[1])?;
            Ok(format!("template: {}", serde_json::to_string(&contents)?))
        })?;

        replace_all(&self.style_urls, &with_template, |caps| {
            let mut styles = Vec::new();
            for url in self.quoted.captures_iter(&caps[1]) {
                let contents = read_resource(ctx, dir, &url[1])?;
                styles.push(serde_json::to_string(&contents)?);
            }
            Ok(format!("styles: [{}]", styles.join(", ")))
        })
    }
}

impl Transform for InlineTemplates {
    fn name(&self) -> String {
        "inline_templates".to_string()
    }

    fn apply<'a>(
        &'a self,
        file: FileEntry,
        ctx: &'a ActionContext,
    ) -> BoxFuture<'a, Result<FileEntry>> {
        Box::pin(async move {
            let dir = file
                .source
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| ctx.root.clone());
            let inlined = self
                .inline(ctx, &dir, file.text()?)
                .with_context(|| format!("inlining resources of {}", file.source.display()))?;
            Ok(FileEntry {
                contents: inlined.into_bytes(),
                ..file
            })
        })
    }
}

/// `Regex::replace_all` with a fallible replacer.
fn replace_all<F>(re: &Regex, haystack: &str, mut replacer: F) -> Result<String>
where
    F: FnMut(&Captures<'_>) -> Result<String>,
{
    let mut out = String::with_capacity(haystack.len());
    let mut last = 0;
    for caps in re.captures_iter(haystack) {
        let Some(m) = caps.get(0) else { continue };
        out.push_str(&haystack[last..m.start()]);
        out.push_str(&replacer(&caps)?);
        last = m.end();
    }
    out.push_str(&haystack[last..]);
    Ok(out)
}

fn resource_path(dir: &Path, url: &str) -> PathBuf {
    let path = normalize(&dir.join(url));
    match path.extension().and_then(|e| e.to_str()) {
        Some("scss") | Some("sass") => path.with_extension("css"),
        _ => path,
    }
}

fn read_resource(ctx: &ActionContext, dir: &Path, url: &str) -> Result<String> {
    let path = resource_path(dir, url);
    ctx.fs
        .read_to_string(&path)
        .with_context(|| format!("referenced resource '{url}' not found at {}", path.display()))
}

/// Lexically fold `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
