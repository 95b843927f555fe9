// src/exec/mod.rs

//! Action execution layer.
//!
//! - [`action`] defines the [`Action`] trait, the per-task context and the
//!   clean action. Group tasks have no action at all.
//! - [`process`] is the external process invoker.
//! - [`command`] wraps the invoker as a task action with a success predicate.
//! - [`backend`] provides the `ExecutorBackend` trait and the production
//!   `ActionBackend` that runs actions on Tokio tasks.

pub mod action;
pub mod backend;
pub mod command;
pub mod process;

pub use action::{Action, ActionContext, BoxFuture, CleanAction, Environment};
pub use backend::{ActionBackend, ExecutorBackend};
pub use command::CommandAction;
pub use process::{invoke, CommandSpec, ProcessOptions, ProcessResult};
