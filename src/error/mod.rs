mod codebox;
mod runtime;

pub use codebox::{ApiErrorBody, ApiErrorObject, CodeboxError};
pub use runtime::RuntimeError;
