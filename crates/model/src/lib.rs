//! An abstraction layer for story-generation backends.
//!
//! This crate establishes a unified protocol for the client to request
//! the next beat of an interactive story from a generative model, so
//! that the session logic can seamlessly switch between backends
//! without modifying the core codebase.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
