//! HTTP collaborator layer over the reclaim core.
//!
//! Everything race-sensitive lives in the core crates; this layer only
//! authenticates callers, shapes JSON, and makes sure CPU-bound evidence work
//! and the matching pass run to completion before a response goes out.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::start_server;
pub use state::ServerState;
