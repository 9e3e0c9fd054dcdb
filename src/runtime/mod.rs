//! Container engine seam.
//!
//! Route handlers only talk to [`ContainerRuntime`]; `DockerRuntime` is the
//! production engine, tests plug in their own.

mod docker;

pub use docker::DockerRuntime;

use crate::error::RuntimeError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::pin::Pin;
use tokio::io::AsyncWrite;

/// Result of creating (not starting) a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedContainer {
    pub id: String,
    pub status: String,
}

/// Captured result of a one-shot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i64,
    /// Standard output only.
    pub output: Vec<u8>,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

pub type TerminalOutput = BoxStream<'static, Result<Vec<u8>, RuntimeError>>;
pub type TerminalInput = Pin<Box<dyn AsyncWrite + Send>>;

/// Both ends of an interactive tty exec.
pub struct TerminalIo {
    pub output: TerminalOutput,
    pub input: TerminalInput,
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Make sure the image is available locally.
    async fn pull_image(&self, image: &str) -> Result<(), RuntimeError>;

    async fn create_container(&self, image: &str) -> Result<CreatedContainer, RuntimeError>;

    /// Current engine status string (`created`, `running`, `exited`, ...).
    async fn container_status(&self, id: &str) -> Result<String, RuntimeError>;

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError>;

    async fn stop_container(&self, id: &str) -> Result<(), RuntimeError>;

    async fn remove_container(&self, id: &str) -> Result<(), RuntimeError>;

    /// Run `argv` (no shell) and wait for it to finish.
    async fn exec(&self, id: &str, argv: Vec<String>) -> Result<ExecOutput, RuntimeError>;

    /// Extract a tar archive into `dest_dir` inside the container.
    async fn upload_archive(
        &self,
        id: &str,
        dest_dir: &str,
        archive: Vec<u8>,
    ) -> Result<(), RuntimeError>;

    /// Start `shell` with a tty and stdin attached.
    async fn open_terminal(&self, id: &str, shell: &str) -> Result<TerminalIo, RuntimeError>;
}
