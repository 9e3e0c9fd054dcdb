//! Database module: models and schema for persistent storage.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `patch.rs`: create payloads and the container patch
//! - `schema.rs`: SQL DDL for initializing the database (SQLite)
//! - `actor.rs`: the single owner of the connection pool

pub mod actor;
pub mod models;
pub mod patch;
pub mod schema;

pub use actor::{DbActorHandle, normalize_email, spawn};
pub use models::{DbContainer, DbUser};
pub use patch::{ContainerCreate, ContainerPatch, DbPatchable, UserCreate};
pub use schema::SQLITE_INIT;
