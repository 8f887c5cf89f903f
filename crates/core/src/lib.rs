//! Core session logic: the conversation transcript, its persistence,
//! and the turn controller that implements the retry protocol.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod controller;
mod generator_client;
pub mod narrator;
pub mod session;
pub mod store;

pub use controller::{
    GENERATION_FAILED_ERROR, SessionSnapshot, Status, StoryController,
    StoryControllerBuilder,
};
