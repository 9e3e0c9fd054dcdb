use thiserror::Error as ThisError;

/// Failures reported by a container engine.
#[derive(Debug, ThisError)]
pub enum RuntimeError {
    #[error("Docker container not found")]
    ContainerNotFound,

    #[error("Docker image {0} not found.")]
    ImageNotFound(String),

    #[error("Container engine error: {0}")]
    Engine(String),
}

impl From<bollard::errors::Error> for RuntimeError {
    fn from(e: bollard::errors::Error) -> Self {
        match e {
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            } => RuntimeError::ContainerNotFound,
            other => RuntimeError::Engine(other.to_string()),
        }
    }
}
