// src/pipeline/mod.rs

//! File pipelines: glob a set of sources, push each file through an
//! ordered list of transforms, and write the results under a destination
//! directory with their base-relative paths preserved.

pub mod glob;
pub mod inline;
pub mod transform;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::exec::{Action, ActionContext, BoxFuture};

pub use glob::{build_globset, GlobResolver};
pub use inline::InlineTemplates;
pub use transform::{
    CommandTransform, CopyFile, FileEntry, RenameExtension, StripLineComments, Transform,
};

/// Action that runs a file pipeline.
///
/// Files are processed independently, at most `max_parallel_files` at a
/// time. The first failing file aborts the remaining work; outputs already
/// written stay on disk.
#[derive(Debug, Clone)]
pub struct PipelineAction {
    resolver: GlobResolver,
    /// Directory the patterns and output paths are relative to.
    base: PathBuf,
    dest: PathBuf,
    transforms: Arc<[Arc<dyn Transform>]>,
}

impl PipelineAction {
    pub fn new(
        resolver: GlobResolver,
        base: impl Into<PathBuf>,
        dest: impl Into<PathBuf>,
        transforms: Vec<Arc<dyn Transform>>,
    ) -> Self {
        Self {
            resolver,
            base: base.into(),
            dest: dest.into(),
            transforms: transforms.into(),
        }
    }

    pub fn transforms(&self) -> &[Arc<dyn Transform>] {
        &self.transforms
    }

    async fn execute(&self, ctx: &ActionContext) -> Result<usize> {
        let base = ctx.resolve(&self.base);
        let dest = ctx.resolve(&self.dest);

        let files = self
            .resolver
            .resolve(ctx.fs.as_ref(), &base)
            .with_context(|| format!("resolving {:?}", self.resolver.patterns()))?;

        if files.is_empty() {
            warn!(
                task = %ctx.task,
                patterns = ?self.resolver.patterns(),
                "pipeline matched no files"
            );
            return Ok(0);
        }

        let count = files.len();
        let semaphore = Arc::new(Semaphore::new(ctx.max_parallel_files.max(1)));
        let mut set = JoinSet::new();

        for source in files {
            let semaphore = Arc::clone(&semaphore);
            let transforms = Arc::clone(&self.transforms);
            let ctx = ctx.clone();
            let base = base.clone();
            let dest = dest.clone();
            set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| anyhow!("pipeline worker pool closed: {e}"))?;
                process_file(&ctx, &base, &dest, source, &transforms).await
            });
        }

        while let Some(joined) = set.join_next().await {
            let outcome = joined
                .map_err(|e| anyhow!("pipeline worker panicked: {e}"))
                .and_then(|r| r);
            if let Err(err) = outcome {
                set.abort_all();
                return Err(err);
            }
        }

        Ok(count)
    }
}

async fn process_file(
    ctx: &ActionContext,
    base: &Path,
    dest: &Path,
    source: PathBuf,
    transforms: &[Arc<dyn Transform>],
) -> Result<()> {
    let rel_path = source
        .strip_prefix(base)
        .map(Path::to_path_buf)
        .with_context(|| format!("{} is outside {}", source.display(), base.display()))?;
    let contents = ctx.fs.read(&source)?;

    let mut file = FileEntry {
        source,
        rel_path,
        contents,
    };
    for transform in transforms {
        let name = transform.name();
        file = transform
            .apply(file, ctx)
            .await
            .with_context(|| format!("transform {name} failed"))?;
    }

    let out = dest.join(&file.rel_path);
    debug!(task = %ctx.task, from = %file.source.display(), to = %out.display(), "writing");
    ctx.fs.write(&out, &file.contents)
}

impl Action for PipelineAction {
    fn describe(&self) -> String {
        let steps: Vec<String> = self.transforms.iter().map(|t| t.name()).collect();
        format!(
            "pipeline {:?} -> {} [{}]",
            self.resolver.patterns(),
            self.dest.display(),
            steps.join(", ")
        )
    }

    fn run<'a>(&'a self, ctx: &'a ActionContext) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let count = self.execute(ctx).await?;
            if count > 0 {
                info!(task = %ctx.task, files = count, dest = %self.dest.display(), "pipeline done");
            }
            Ok(())
        })
    }
}
