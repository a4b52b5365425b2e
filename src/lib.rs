// SPDX-License-Identifier: MIT OR Apache-2.0

//! askbook - Retrieval-augmented question answering over student handbooks
//!
//! Shared modules for the askbook CLI tool.

pub mod answer;
pub mod config;
pub mod embedding;
pub mod errors;
pub mod index;
pub mod ingest;
pub mod output;
pub mod service;
pub mod similarity;
pub mod store;
