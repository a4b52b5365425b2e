// SPDX-License-Identifier: MIT OR Apache-2.0

//! Answer composition - turns ranked handbook sections into a final answer.
//!
//! The composer prefers a completion model when one is configured and falls
//! back to a deterministic template on any model failure, so callers always
//! get an answer string.

pub mod composer;
pub mod model;

pub use composer::AnswerComposer;
pub use model::{AnthropicModel, CompletionModel, CompletionRequest};
