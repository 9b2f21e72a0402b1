//! AlignView web layer
//!
//! Thin HTTP surface over a comparison session: JSON commands in, table
//! projections out, static assets on the side.

pub mod server;

pub use server::{router, serve, WebServerConfig};
