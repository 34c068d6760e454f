//! HTTP adapter module
//!
//! Maps HTTP verbs and paths onto store operations and store outcomes onto
//! status codes. Holds no state of its own besides a handle to the store.

mod handlers;
mod server;

pub use handlers::AppState;
pub use server::{router, run};
