// tests/process.rs
#![cfg(unix)]

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use buildgraph::errors::BuildgraphError;
use buildgraph::exec::{
    invoke, Action, ActionContext, CleanAction, CommandAction, CommandSpec, ProcessOptions,
};
use buildgraph::fs::{FileSystem, MockFileSystem};
use buildgraph::pipeline::{CommandTransform, FileEntry, Transform};

type TestResult = Result<(), Box<dyn Error>>;

fn opts() -> ProcessOptions {
    ProcessOptions {
        log_tag: "test".to_string(),
        ..ProcessOptions::default()
    }
}

#[tokio::test]
async fn captures_exit_code_and_output() -> TestResult {
    init_tracing();
    let spec = CommandSpec::shell("echo out; echo err >&2; exit 3");
    let result = invoke(&spec, &opts()).await?;

    assert_eq!(result.exit_code, Some(3));
    assert!(!result.success());
    assert!(!result.timed_out);
    assert_eq!(result.stdout_lossy(), "out\n");
    assert_eq!(result.stderr_lossy(), "err\n");
    Ok(())
}

#[tokio::test]
async fn child_env_and_cwd_are_applied() -> TestResult {
    let dir = tempfile::tempdir()?;
    std::fs::create_dir(dir.path().join("sub"))?;

    let spec = CommandSpec::shell("echo \"$NODE_ENV\"; pwd")
        .env("NODE_ENV", "test")
        .cwd("sub");
    let options = ProcessOptions {
        root: dir.path().to_path_buf(),
        ..opts()
    };
    let result = invoke(&spec, &options).await?;

    let out = result.stdout_lossy();
    let mut lines = out.lines();
    assert_eq!(lines.next(), Some("test"));
    assert!(lines.next().is_some_and(|l| l.ends_with("/sub")), "{out}");
    Ok(())
}

#[tokio::test]
async fn missing_program_is_a_spawn_error() {
    let spec = CommandSpec::new("definitely-not-a-real-program-4711");
    let err = invoke(&spec, &opts()).await.unwrap_err();
    assert!(
        matches!(err, BuildgraphError::Spawn { ref command, .. } if command.contains("4711")),
        "{err:?}"
    );
}

#[tokio::test]
async fn success_codes_widen_the_predicate() -> TestResult {
    let ctx = ActionContext::new("").for_task("lint");

    let strict = CommandAction::new(CommandSpec::shell("exit 2"));
    let err = strict.execute(&ctx).await.unwrap_err();
    assert!(err.to_string().contains("exited with status 2"), "{err}");

    let lenient = CommandAction::new(CommandSpec::shell("exit 2")).with_success_codes(vec![0, 2]);
    let result = lenient.execute(&ctx).await?;
    assert_eq!(result.exit_code, Some(2));
    Ok(())
}

#[tokio::test]
async fn timeout_kills_the_child() {
    let ctx = ActionContext::new("").for_task("slow");
    let action = CommandAction::new(CommandSpec::shell("exec sleep 5"))
        .with_timeout(Some(Duration::from_millis(100)));

    let started = Instant::now();
    let err = action.run(&ctx).await.unwrap_err();

    assert!(err.to_string().contains("timed out"), "{err}");
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn timeout_covers_grandchildren_of_the_shell() {
    let ctx = ActionContext::new("").for_task("slow");
    let action = CommandAction::new(CommandSpec::shell("sleep 5; echo done"))
        .with_timeout(Some(Duration::from_millis(100)));

    let started = Instant::now();
    let err = action.run(&ctx).await.unwrap_err();

    assert!(err.to_string().contains("timed out"), "{err}");
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "took {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn cleanup_runs_only_after_success() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    let fs = Arc::new(MockFileSystem::new());
    fs.add_file(root.join("dist/inlined/a.ts"), "x");
    fs.add_file(root.join("dist/index.js"), "y");
    let ctx = ActionContext::new(root).with_fs(fs.clone());

    let failing = CommandAction::new(CommandSpec::shell("exit 1"))
        .with_cleanup(vec![PathBuf::from("dist/inlined")]);
    assert!(failing.run(&ctx).await.is_err());
    assert!(fs.exists(&root.join("dist/inlined/a.ts")));

    let ok = CommandAction::new(CommandSpec::shell("true"))
        .with_cleanup(vec![PathBuf::from("dist/inlined")]);
    ok.run(&ctx).await?;
    assert!(!fs.exists(&root.join("dist/inlined/a.ts")));
    assert!(fs.exists(&root.join("dist/index.js")));
    Ok(())
}

#[tokio::test]
async fn clean_action_removes_real_directories() -> TestResult {
    let dir = tempfile::tempdir()?;
    std::fs::create_dir_all(dir.path().join("dist/nested"))?;
    std::fs::write(dir.path().join("dist/nested/a.js"), "x")?;
    std::fs::write(dir.path().join("keep.txt"), "k")?;

    let ctx = ActionContext::new(dir.path());
    CleanAction::new(["dist", "coverage"]).run(&ctx).await?;

    assert!(!dir.path().join("dist").exists());
    assert!(dir.path().join("keep.txt").exists());
    Ok(())
}

#[tokio::test]
async fn command_transform_pipes_contents_through_stdin() -> TestResult {
    let ctx = ActionContext::new("");
    let file = FileEntry {
        source: PathBuf::from("/project/src/a.scss"),
        rel_path: PathBuf::from("a.scss"),
        contents: b"hello\n".to_vec(),
    };

    let upper = CommandTransform {
        command: CommandSpec::new("tr").args(["a-z", "A-Z"]),
    };
    let out = upper.apply(file.clone(), &ctx).await?;
    assert_eq!(out.contents, b"HELLO\n");
    assert_eq!(out.rel_path, file.rel_path);

    let broken = CommandTransform {
        command: CommandSpec::shell("echo bad input >&2; exit 1"),
    };
    let err = broken.apply(file, &ctx).await.unwrap_err();
    assert!(err.to_string().contains("bad input"), "{err}");
    Ok(())
}
