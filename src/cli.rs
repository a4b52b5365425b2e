// SPDX-License-Identifier: MIT OR Apache-2.0

//! CLI argument parsing using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// askbook - Ask questions about university student handbooks
///
/// Retrieval-augmented answering over ingested handbook sections: questions
/// are embedded, matched against a school's sections by cosine similarity,
/// and answered with cited sources.
#[derive(Parser, Debug)]
#[command(name = "askbook")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output results as JSON instead of colored text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a question about a school's handbook
    Ask {
        /// The question, in natural language
        question: String,

        /// School slug to answer from (e.g. demo_u)
        #[arg(short, long)]
        school: Option<String>,

        /// Number of sections to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Load handbook sections from a JSONL file into the warehouse
    Ingest {
        /// Path to the JSONL file (one section object per line)
        file: PathBuf,
    },

    /// List schools in the warehouse with their section counts
    Schools,

    /// Show a school's index state (unbuilt, building, or ready)
    Status {
        /// School slug
        #[arg(short, long)]
        school: String,
    },

    /// Build a school's index ahead of traffic
    Warm {
        /// School slug
        #[arg(short, long)]
        school: String,
    },

    /// Discard a school's built index; the next ask rebuilds it
    Invalidate {
        /// School slug
        #[arg(short, long)]
        school: String,
    },
}
