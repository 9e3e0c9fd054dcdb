pub mod guards;
pub mod router;
pub mod routes;
pub mod state;

pub use router::codebox_router;
pub use state::CodeboxState;
