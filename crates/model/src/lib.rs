//! The protocol between a chat session and a text-completion service.
//!
//! This crate only describes the shape of a completion exchange: what the
//! session sends, what it gets back, and how failures are classified. It
//! doesn't talk to any service itself. Implementors live in their own crates
//! (for example an OpenAI-compatible HTTP client, or a scripted fake for
//! tests), so the session logic can switch between them freely.

#![deny(missing_docs)]

mod credential;
mod error;
mod provider;
mod request;
mod response;

pub use credential::*;
pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
