//! A terminal chat client for OpenAI-compatible completion services.
//!
//! The crate ships the `palaver` CLI. The pieces it is assembled from are
//! also available as a library, so another front end can drive the same
//! session.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod config;
pub mod input;

/// Re-exports of [`palaver_core`] crate.
pub mod core {
    pub use palaver_core::*;
}

/// Re-exports of [`palaver_model`] crate, for implementing other providers.
pub mod model {
    pub use palaver_model::*;
}

/// Re-exports of [`palaver_openai_model`] crate.
pub mod openai {
    pub use palaver_openai_model::*;
}
