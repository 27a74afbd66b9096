//! External version-control sync tool.
//!
//! Changes are applied to the local checkout by running
//! `<tool> download <project> <change-number>/<patchset-number>`.
//! The tool's output is streamed live to the operator: its stdout is
//! redirected to our stderr because stdout carries the MCP protocol.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Default sync tool binary.
pub const DEFAULT_SYNC_COMMAND: &str = "repo";

/// Applies a remote patchset to the local workspace.
#[async_trait]
pub trait SyncTool: Send + Sync {
    /// Download `<change>/<patchset>` of `project`, blocking until done.
    async fn download(&self, project: &str, change_ref: &str) -> Result<()>;
}

/// Sync tool backed by a child process.
#[derive(Debug, Clone)]
pub struct CommandSyncTool {
    program: String,
}

impl CommandSyncTool {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for CommandSyncTool {
    fn default() -> Self {
        Self::new(DEFAULT_SYNC_COMMAND)
    }
}

#[async_trait]
impl SyncTool for CommandSyncTool {
    async fn download(&self, project: &str, change_ref: &str) -> Result<()> {
        debug!(
            program = %self.program,
            project = project,
            change = change_ref,
            "Running sync command"
        );

        let status = Command::new(&self.program)
            .arg("download")
            .arg(project)
            .arg(change_ref)
            .stdin(Stdio::null())
            .stdout(std::io::stderr())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| Error::Sync(format!("failed to run {}: {}", self.program, e)))?;

        if !status.success() {
            warn!(program = %self.program, status = %status, "Sync command failed");
            return Err(Error::Sync(format!(
                "{} download {} {} exited with {}",
                self.program, project, change_ref, status
            )));
        }

        Ok(())
    }
}
