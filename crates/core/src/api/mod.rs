//! Control API (spec.md §6.1) and streaming API (spec.md §6.2), gated behind
//! the `http-api` feature.

pub mod routes;
pub mod server;
pub mod types;
pub mod ws_handler;
pub mod ws_types;

pub use server::build_router;
