use super::{ContainerRuntime, CreatedContainer, ExecOutput, TerminalIo};
use crate::error::RuntimeError;
use async_trait::async_trait;
use bollard::Docker;
use bollard::container::{
    Config as ContainerConfig, CreateContainerOptions, InspectContainerOptions, LogOutput,
    RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
    UploadToContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::exec::{CreateExecOptions, StartExecOptions, StartExecResults};
use bollard::image::CreateImageOptions;
use futures::StreamExt;
use tracing::{debug, info};

const TERMINAL_ENV: &str = "TERM=xterm-256color";

/// [`ContainerRuntime`] backed by the local Docker daemon.
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
    /// Working directory for exec'd commands and shells.
    workdir: String,
}

impl DockerRuntime {
    /// Connects using `DOCKER_HOST` or the platform default socket.
    pub fn connect(workdir: impl Into<String>) -> Result<Self, RuntimeError> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self {
            docker,
            workdir: workdir.into(),
        })
    }
}

/// 304 means the container was already in the requested state.
fn ignore_not_modified(res: Result<(), BollardError>) -> Result<(), RuntimeError> {
    match res {
        Ok(()) => Ok(()),
        Err(BollardError::DockerResponseServerError {
            status_code: 304, ..
        }) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn pull_image(&self, image: &str) -> Result<(), RuntimeError> {
        let opts = CreateImageOptions {
            from_image: image.to_string(),
            ..Default::default()
        };
        let mut progress = self.docker.create_image(Some(opts), None, None);
        while let Some(item) = progress.next().await {
            match item {
                Ok(info) => {
                    if let Some(err) = info.error {
                        return Err(if err.contains("not found") || err.contains("does not exist")
                        {
                            RuntimeError::ImageNotFound(image.to_string())
                        } else {
                            RuntimeError::Engine(err)
                        });
                    }
                    debug!(image, status = ?info.status, "pull progress");
                }
                Err(BollardError::DockerResponseServerError {
                    status_code: 404, ..
                }) => return Err(RuntimeError::ImageNotFound(image.to_string())),
                Err(e) => return Err(e.into()),
            }
        }
        info!(image, "image ready");
        Ok(())
    }

    async fn create_container(&self, image: &str) -> Result<CreatedContainer, RuntimeError> {
        let config = ContainerConfig {
            image: Some(image.to_string()),
            tty: Some(true),
            open_stdin: Some(true),
            ..Default::default()
        };
        let created = self
            .docker
            .create_container(None::<CreateContainerOptions<String>>, config)
            .await?;
        for warning in &created.warnings {
            debug!(container_id = %created.id, warning = %warning, "create warning");
        }
        let status = self.container_status(&created.id).await?;
        Ok(CreatedContainer {
            id: created.id,
            status,
        })
    }

    async fn container_status(&self, id: &str) -> Result<String, RuntimeError> {
        let inspect = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await?;
        Ok(inspect
            .state
            .and_then(|s| s.status)
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown".to_string()))
    }

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError> {
        ignore_not_modified(
            self.docker
                .start_container(id, None::<StartContainerOptions<String>>)
                .await,
        )
    }

    async fn stop_container(&self, id: &str) -> Result<(), RuntimeError> {
        ignore_not_modified(
            self.docker
                .stop_container(id, None::<StopContainerOptions>)
                .await,
        )
    }

    async fn remove_container(&self, id: &str) -> Result<(), RuntimeError> {
        let opts = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        self.docker.remove_container(id, Some(opts)).await?;
        Ok(())
    }

    async fn exec(&self, id: &str, argv: Vec<String>) -> Result<ExecOutput, RuntimeError> {
        let exec = self
            .docker
            .create_exec(
                id,
                CreateExecOptions {
                    cmd: Some(argv),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    working_dir: Some(self.workdir.clone()),
                    ..Default::default()
                },
            )
            .await?;

        let mut output = Vec::new();
        if let StartExecResults::Attached { output: mut stream, .. } = self
            .docker
            .start_exec(&exec.id, None::<StartExecOptions>)
            .await?
        {
            while let Some(chunk) = stream.next().await {
                match chunk? {
                    LogOutput::StdOut { message } | LogOutput::Console { message } => {
                        output.extend_from_slice(&message)
                    }
                    LogOutput::StdErr { message } => {
                        debug!(container_id = id, stderr = %String::from_utf8_lossy(&message), "exec stderr");
                    }
                    LogOutput::StdIn { .. } => {}
                }
            }
        }

        let inspect = self.docker.inspect_exec(&exec.id).await?;
        Ok(ExecOutput {
            exit_code: inspect.exit_code.unwrap_or(-1),
            output,
        })
    }

    async fn upload_archive(
        &self,
        id: &str,
        dest_dir: &str,
        archive: Vec<u8>,
    ) -> Result<(), RuntimeError> {
        let opts = UploadToContainerOptions {
            path: dest_dir.to_string(),
            ..Default::default()
        };
        self.docker
            .upload_to_container(id, Some(opts), archive.into())
            .await?;
        Ok(())
    }

    async fn open_terminal(&self, id: &str, shell: &str) -> Result<TerminalIo, RuntimeError> {
        let exec = self
            .docker
            .create_exec(
                id,
                CreateExecOptions {
                    cmd: Some(vec![shell.to_string()]),
                    attach_stdin: Some(true),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    tty: Some(true),
                    env: Some(vec![TERMINAL_ENV.to_string()]),
                    working_dir: Some(self.workdir.clone()),
                    ..Default::default()
                },
            )
            .await?;

        let started = self
            .docker
            .start_exec(
                &exec.id,
                Some(StartExecOptions {
                    detach: false,
                    tty: true,
                    ..Default::default()
                }),
            )
            .await?;

        match started {
            StartExecResults::Attached { output, input } => Ok(TerminalIo {
                output: output
                    .map(|chunk| {
                        chunk
                            .map(|log| log.into_bytes().to_vec())
                            .map_err(RuntimeError::from)
                    })
                    .boxed(),
                input,
            }),
            StartExecResults::Detached => Err(RuntimeError::Engine(
                "terminal exec started detached".to_string(),
            )),
        }
    }
}
