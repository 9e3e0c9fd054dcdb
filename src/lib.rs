pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod runtime;
pub mod server;
pub mod terminal;
pub mod workspace;

mod utils;

pub use error::{CodeboxError, RuntimeError};
pub use runtime::{ContainerRuntime, DockerRuntime};
