// src/pipeline/transform.rs

//! Per-file transforms applied by a pipeline.

use std::fmt;
use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::exec::process::{invoke, CommandSpec, ProcessOptions};
use crate::exec::{ActionContext, BoxFuture};

/// A file travelling through a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute path the file was read from.
    pub source: PathBuf,
    /// Output path relative to the pipeline destination.
    pub rel_path: PathBuf,
    pub contents: Vec<u8>,
}

impl FileEntry {
    pub fn text(&self) -> Result<&str> {
        Ok(std::str::from_utf8(&self.contents)?)
    }
}

/// One step of a pipeline. A failing transform fails the whole pipeline.
pub trait Transform: Send + Sync {
    fn name(&self) -> String;

    fn apply<'a>(&'a self, file: FileEntry, ctx: &'a ActionContext)
        -> BoxFuture<'a, Result<FileEntry>>;
}

impl fmt::Debug for dyn Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transform({})", self.name())
    }
}

/// Pipe the file through an external filter: contents on stdin, result
/// from stdout.
#[derive(Debug, Clone)]
pub struct CommandTransform {
    pub command: CommandSpec,
}

impl Transform for CommandTransform {
    fn name(&self) -> String {
        format!("command `{}`", self.command)
    }

    fn apply<'a>(
        &'a self,
        file: FileEntry,
        ctx: &'a ActionContext,
    ) -> BoxFuture<'a, Result<FileEntry>> {
        Box::pin(async move {
            let opts = ProcessOptions {
                root: ctx.root.clone(),
                timeout: ctx.process_timeout,
                stdin: Some(file.contents.clone()),
                log_tag: ctx.task.clone(),
                log_stdout: false,
            };
            let result = invoke(&self.command, &opts).await?;
            if !result.success() {
                bail!(
                    "`{}` exited with {:?}: {}",
                    self.command,
                    result.exit_code,
                    result.stderr_lossy().trim()
                );
            }
            Ok(FileEntry {
                contents: result.stdout,
                ..file
            })
        })
    }
}

/// Drop `//` line comments from stylesheet sources.
#[derive(Debug, Clone, Default)]
pub struct StripLineComments;

impl Transform for StripLineComments {
    fn name(&self) -> String {
        "strip_line_comments".to_string()
    }

    fn apply<'a>(
        &'a self,
        file: FileEntry,
        _ctx: &'a ActionContext,
    ) -> BoxFuture<'a, Result<FileEntry>> {
        Box::pin(async move {
            let stripped = strip_line_comments(file.text()?);
            Ok(FileEntry {
                contents: stripped.into_bytes(),
                ..file
            })
        })
    }
}

/// Remove `//` comments outside string literals, `url(...)` and `/* */`
/// blocks. A `//` directly after `:` (as in `http://...`) is kept. Lines
/// that held only a comment disappear.
pub fn strip_line_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut in_block = false;

    for line in source.split_inclusive('\n') {
        let (body, newline) = match line.strip_suffix('\n') {
            Some(body) => (body, "\n"),
            None => (line, ""),
        };

        match comment_start(body, &mut in_block) {
            None => out.push_str(line),
            Some(idx) => {
                let kept = body[..idx].trim_end();
                if !kept.is_empty() {
                    out.push_str(kept);
                    out.push_str(newline);
                }
            }
        }
    }

    out
}

/// Byte offset of the first line comment in `line`. `in_block` carries an
/// open `/*` across lines.
fn comment_start(line: &str, in_block: &mut bool) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut quote: Option<u8> = None;
    let mut in_url = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();

        if *in_block {
            if b == b'*' && next == Some(b'/') {
                *in_block = false;
                i += 1;
            }
        } else if let Some(q) = quote {
            if b == b'\\' {
                i += 1;
            } else if b == q {
                quote = None;
            }
        } else if in_url {
            if b == b')' {
                in_url = false;
            }
        } else {
            match (b, next) {
                (b'"' | b'\'', _) => quote = Some(b),
                (b'/', Some(b'*')) => {
                    *in_block = true;
                    i += 1;
                }
                (b'(', _) if i >= 3 && bytes[i - 3..i].eq_ignore_ascii_case(b"url") => {
                    in_url = true;
                }
                (b'/', Some(b'/')) if i == 0 || bytes[i - 1] != b':' => return Some(i),
                _ => {}
            }
        }
        i += 1;
    }

    None
}

/// Change the extension of the output path (`scss` -> `css`).
#[derive(Debug, Clone)]
pub struct RenameExtension {
    pub extension: String,
}

impl Transform for RenameExtension {
    fn name(&self) -> String {
        format!("rename_extension({})", self.extension)
    }

    fn apply<'a>(
        &'a self,
        file: FileEntry,
        _ctx: &'a ActionContext,
    ) -> BoxFuture<'a, Result<FileEntry>> {
        Box::pin(async move {
            let rel_path = file.rel_path.with_extension(self.extension.trim_start_matches('.'));
            Ok(FileEntry { rel_path, ..file })
        })
    }
}

/// Identity transform: plain copy.
#[derive(Debug, Clone, Default)]
pub struct CopyFile;

impl Transform for CopyFile {
    fn name(&self) -> String {
        "copy".to_string()
    }

    fn apply<'a>(
        &'a self,
        file: FileEntry,
        _ctx: &'a ActionContext,
    ) -> BoxFuture<'a, Result<FileEntry>> {
        Box::pin(async move { Ok(file) })
    }
}
