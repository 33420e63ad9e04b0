//! Forge client (C1): paginated PR list/detail/files/contents/repo lookup
//! against a GitHub-shaped REST API, with rate-limit-aware retries.

pub mod client;
pub mod error;
pub mod types;

pub use client::ForgeClient;
pub use error::{ForgeError, Result};
