//! Dashboard API server

pub mod routes;
pub mod server;
pub mod state;

pub use server::{shutdown, start_server};
pub use state::AppState;
