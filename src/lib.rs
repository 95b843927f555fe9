// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod manifest;
pub mod pipeline;
pub mod testing;
pub mod types;
pub mod watch;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::config::build::{process_timeout, watch_defaults, watch_specs};
use crate::config::{build_graph, load_and_validate, project_root, resolve_request, ConfigFile};
use crate::dag::{RunReport, Scheduler, TaskGraph};
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason};
use crate::errors::{BuildgraphError, Result};
use crate::exec::{ActionBackend, ActionContext, Environment};
use crate::fs::RealFileSystem;
use crate::types::{RunMode, RunRequest};
use crate::watch::{build_task_watch_profiles, spawn_watcher, TriggerFilter};

/// High-level entry point used by `main.rs`.
///
/// Loads the config, builds the task graph and then lists, dry-runs, runs
/// once or watches, depending on the flags.
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;
    let root = project_root(&args.config);
    let graph = Arc::new(build_graph(&cfg)?);

    if args.list {
        print_task_list(&cfg, &graph);
        return Ok(());
    }

    let request = resolve_request(&cfg, &args.target, args.watch)?;

    if args.dry_run {
        print_dry_run(&graph, &request)?;
        return Ok(());
    }

    let env = Environment::detect(&cfg.config().ci_env_var);
    if env.ci {
        info!(var = %cfg.config().ci_env_var, "CI environment detected");
    }

    let mut ctx = ActionContext::new(&root).with_env(env);
    ctx.process_timeout = process_timeout(&cfg)?;
    ctx.max_parallel_files = cfg.config().max_parallel_files;

    let fail_fast = args.fail_fast || cfg.config().fail_fast;
    let scheduler = Scheduler::new(Arc::clone(&graph)).with_fail_fast(fail_fast);

    match request.mode {
        RunMode::Once => run_once(&cfg, scheduler, ctx, request).await,
        RunMode::Watch => run_watch(&cfg, scheduler, ctx, request, &root).await,
    }
}

/// Run the targets once; the first failed task becomes the error.
pub async fn run_once(
    cfg: &ConfigFile,
    scheduler: Scheduler,
    ctx: ActionContext,
    request: RunRequest,
) -> Result<()> {
    let (tx, rx) = mpsc::channel::<RuntimeEvent>(64);
    let core = CoreRuntime::new(
        scheduler,
        cfg.config().triggered_while_running_behaviour,
        cfg.config().queue_length,
        RuntimeOptions {
            exit_when_idle: true,
        },
    );
    let runtime = Runtime::new(core, rx, ActionBackend::new(tx.clone(), ctx));

    send_event(
        &tx,
        RuntimeEvent::TaskTriggered {
            tasks: request.targets.clone(),
            reason: TriggerReason::Manual,
        },
    )
    .await?;
    spawn_ctrl_c_handler(tx);

    let reports = runtime.run().await?;
    finish_once(&request, reports)
}

fn finish_once(request: &RunRequest, reports: Vec<RunReport>) -> Result<()> {
    let Some(report) = reports.into_iter().last() else {
        return Err(anyhow::anyhow!("interrupted before {:?} finished", request.targets).into());
    };
    let report = report.into_result()?;
    info!(
        targets = ?request.targets,
        tasks = report.succeeded.len(),
        "build finished"
    );
    Ok(())
}

/// Watch the sources of the targets' dependency closure until Ctrl-C.
pub async fn run_watch(
    cfg: &ConfigFile,
    scheduler: Scheduler,
    ctx: ActionContext,
    request: RunRequest,
    root: &Path,
) -> Result<()> {
    let graph = Arc::clone(scheduler.graph());
    let closure = graph.closure(&request.targets)?;

    let specs = watch_specs(cfg, closure.iter());
    let profiles = build_task_watch_profiles(&watch_defaults(cfg), &specs)?;
    if profiles.is_empty() {
        warn!(targets = ?request.targets, "no task in the target closure declares watch patterns");
    }

    // notify reports canonical paths.
    let watch_root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());

    let (tx, rx) = mpsc::channel::<RuntimeEvent>(64);
    let core = CoreRuntime::new(
        scheduler,
        cfg.config().triggered_while_running_behaviour,
        cfg.config().queue_length,
        RuntimeOptions {
            exit_when_idle: false,
        },
    );
    let runtime = Runtime::new(core, rx, ActionBackend::new(tx.clone(), ctx));

    let filter = TriggerFilter::new(watch_root, profiles, graph, Arc::new(RealFileSystem));
    let _watcher = spawn_watcher(
        filter,
        Duration::from_millis(cfg.config().debounce_ms),
        tx.clone(),
    )?;

    if cfg.config().watch_initial_run {
        send_event(
            &tx,
            RuntimeEvent::TaskTriggered {
                tasks: request.targets.clone(),
                reason: TriggerReason::Manual,
            },
        )
        .await?;
    }
    spawn_ctrl_c_handler(tx);

    info!(targets = ?request.targets, "watching for changes; press Ctrl-C to stop");
    let reports = runtime.run().await?;
    let failed = reports.iter().filter(|r| !r.is_success()).count();
    info!(runs = reports.len(), failed, "watch mode stopped");
    Ok(())
}

async fn send_event(tx: &mpsc::Sender<RuntimeEvent>, event: RuntimeEvent) -> Result<()> {
    tx.send(event)
        .await
        .map_err(|e| BuildgraphError::Other(anyhow::anyhow!("runtime channel closed: {e}")))
}

fn spawn_ctrl_c_handler(tx: mpsc::Sender<RuntimeEvent>) {
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl-C: {err}");
            return;
        }
        info!("Ctrl-C received; shutting down");
        let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
    });
}

fn print_task_list(cfg: &ConfigFile, graph: &TaskGraph) {
    println!("Tasks:");
    for name in graph.tasks() {
        let deps = graph.dependencies_of(name);
        let action = graph
            .action_of(name)
            .map(|a| a.describe())
            .unwrap_or_else(|| "group".to_string());
        let description = cfg
            .tasks()
            .get(name)
            .and_then(|t| t.description.as_deref())
            .unwrap_or("");
        if deps.is_empty() {
            println!("  {name:<20} {action}");
        } else {
            println!("  {name:<20} {action} (after: {})", deps.join(", "));
        }
        if !description.is_empty() {
            println!("  {:<20} {description}", "");
        }
    }

    if !cfg.aliases().is_empty() {
        println!();
        println!("Aliases:");
        for (name, alias) in cfg.aliases() {
            println!("  {name:<20} {:?} [{}]", alias.mode, alias.targets.join(", "));
        }
    }
}

fn print_dry_run(graph: &TaskGraph, request: &RunRequest) -> Result<()> {
    let order = graph.execution_order(&request.targets)?;
    println!(
        "buildgraph dry-run: {} ({:?})",
        request.targets.join(", "),
        request.mode
    );
    for (idx, name) in order.iter().enumerate() {
        let action = graph
            .action_of(name)
            .map(|a| a.describe())
            .unwrap_or_else(|| "group".to_string());
        println!("  {:>2}. {name}: {action}", idx + 1);
    }
    Ok(())
}
