pub mod auth;
pub mod containers;
pub mod filesystem;
pub mod terminal;

use serde::Serialize;

/// `{"message": "..."}` body for successful mutations.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

impl MessageResponse {
    pub fn new(message: &'static str) -> Self {
        Self { message }
    }
}
