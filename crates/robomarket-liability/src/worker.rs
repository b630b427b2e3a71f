//! Worker strategies: the pluggable "do the work" step.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use robomarket_core::{Liability, MarketError, Result, WorkResult, WorkerConfig, WorkerKind};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Input handed to a worker strategy.
#[derive(Debug, Clone)]
pub struct WorkContext {
    pub liability: Liability,

    /// Objective bytes, when the liability names an objective.
    pub objective: Option<Vec<u8>>,
}

impl WorkContext {
    fn failure(&self, message: impl Into<String>) -> MarketError {
        MarketError::WorkerFailed {
            address: self.liability.address.clone(),
            message: message.into(),
        }
    }
}

/// Performs the task a liability stands for.
///
/// The result is opaque to the coordinator and forwarded as is.
#[async_trait]
pub trait WorkerStrategy: Send + Sync {
    async fn execute(&self, context: WorkContext) -> Result<WorkResult>;

    fn name(&self) -> &str;
}

/// Returns the objective (or the liability itself) as the result.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoWorker;

#[async_trait]
impl WorkerStrategy for EchoWorker {
    async fn execute(&self, context: WorkContext) -> Result<WorkResult> {
        match context.objective {
            Some(bytes) => Ok(serde_json::Value::String(
                String::from_utf8_lossy(&bytes).into_owned(),
            )),
            None => Ok(serde_json::to_value(&context.liability)?),
        }
    }

    fn name(&self) -> &str {
        "echo"
    }
}

/// Runs an external program with the objective on stdin.
///
/// Stdout becomes the result: parsed as JSON when possible, otherwise a string.
/// A non-zero exit status is a failure.
#[derive(Debug, Clone)]
pub struct CommandWorker {
    program: String,
    args: Vec<String>,
}

impl CommandWorker {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from an argv array; `None` when it is empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }
}

#[async_trait]
impl WorkerStrategy for CommandWorker {
    async fn execute(&self, context: WorkContext) -> Result<WorkResult> {
        let address = context.liability.address.to_string();
        debug!(address = %address, program = %self.program, "Spawning worker command");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env("ROBOMARKET_LIABILITY", &address)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| context.failure(format!("spawn {}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            let input = context.objective.clone().unwrap_or_default();
            stdin
                .write_all(&input)
                .await
                .map_err(|e| context.failure(format!("write stdin: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| context.failure(format!("wait: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(context.failure(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let trimmed = stdout.trim();
        Ok(serde_json::from_str(trimmed)
            .unwrap_or_else(|_| serde_json::Value::String(trimmed.to_string())))
    }

    fn name(&self) -> &str {
        &self.program
    }
}

/// Worker strategy selected by configuration.
pub fn worker_from_config(config: &WorkerConfig) -> Result<Arc<dyn WorkerStrategy>> {
    match config.kind {
        WorkerKind::Echo => Ok(Arc::new(EchoWorker)),
        WorkerKind::Command => CommandWorker::from_argv(&config.command)
            .map(|worker| Arc::new(worker) as Arc<dyn WorkerStrategy>)
            .ok_or_else(|| MarketError::ConfigError("worker.command is empty".into())),
    }
}
