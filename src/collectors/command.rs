//! External command execution.
//!
//! Commands run without a shell and without a timeout: a hung stats command
//! blocks the sampler until it returns or a shutdown signal arrives.

use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::error::{CollectError, FetchError};

/// Placeholder replaced by the comma-joined node list.
pub const NODES_PLACEHOLDER: &str = "{nodes}";

/// Program plus argument template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTemplate {
    program: String,
    args: Vec<String>,
}

impl CommandTemplate {
    /// Build from an argv-style list; the first element is the program.
    pub fn from_argv<S: AsRef<str>>(argv: &[S]) -> Result<Self, CollectError> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| CollectError::Config("command must not be empty".into()))?;
        Ok(Self {
            program: program.as_ref().to_string(),
            args: args.iter().map(|a| a.as_ref().to_string()).collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Arguments with the node placeholder substituted.
    pub fn render(&self, nodes: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.replace(NODES_PLACEHOLDER, nodes))
            .collect()
    }

    /// Location of the program on `PATH`, if it can be found.
    pub fn resolve(&self) -> Option<PathBuf> {
        which::which(&self.program).ok()
    }
}

/// Run a command and return its standard output as text.
#[instrument(skip(args), fields(argc = args.len()))]
pub async fn run_capture(program: &str, args: &[String]) -> Result<String, FetchError> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => FetchError::NotFound {
                program: program.to_string(),
            },
            _ => FetchError::Spawn {
                program: program.to_string(),
                source: e,
            },
        })?;

    if !output.status.success() {
        return Err(FetchError::Exit {
            program: program.to_string(),
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    debug!(bytes = output.stdout.len(), "Command output captured");
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Runs the cluster stats command for a fixed node list and parses its JSON.
#[derive(Debug, Clone)]
pub struct StatsFetcher {
    template: CommandTemplate,
    nodes: String,
}

impl StatsFetcher {
    pub fn new(template: CommandTemplate, nodes: impl Into<String>) -> Self {
        Self {
            template,
            nodes: nodes.into(),
        }
    }

    /// Fetch one stats blob.
    pub async fn fetch(&self) -> Result<serde_json::Value, CollectError> {
        let args = self.template.render(&self.nodes);
        let stdout = run_capture(self.template.program(), &args).await?;
        let blob = serde_json::from_str(stdout.trim())?;
        Ok(blob)
    }
}
