// SPDX-License-Identifier: MIT OR Apache-2.0

//! askbook - Ask questions about university student handbooks
//!
//! Answers are grounded in ingested handbook sections, ranked by embedding
//! similarity and cited by exact section title.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use tracing::error;
use tracing_subscriber::EnvFilter;

use askbook::config::Config;
use askbook::errors::AskError;
use askbook::ingest::ingest_jsonl;
use askbook::output;
use askbook::service::RetrievalService;
use askbook::store::SqliteSectionStore;

/// Exit code for user-correctable input problems (missing school, bad args).
const EXIT_USAGE: i32 = 2;

fn main() {
    // Initialize tracing with ASKBOOK_LOG env var (e.g., ASKBOOK_LOG=debug askbook ask ...)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("ASKBOOK_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        if let Some(AskError::MissingTenant) = err.downcast_ref::<AskError>() {
            eprintln!("Please specify which school you're asking about.");
            std::process::exit(EXIT_USAGE);
        }

        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load();
    let json = cli.json;

    match cli.command {
        Commands::Ask {
            question,
            school,
            top_k,
        } => {
            if let Some(k) = top_k {
                config.search.top_k = Some(k);
            }
            let service = RetrievalService::from_config(&config)?;
            let outcome = service.ask(&question, school.as_deref().unwrap_or(""))?;
            if json {
                output::print_json(&outcome)?;
            } else {
                output::print_ask_outcome(&outcome);
            }
        }
        Commands::Ingest { file } => {
            let store = SqliteSectionStore::open(config.store().path())?;
            let report = ingest_jsonl(&store, &file)?;
            if json {
                output::print_json(&report)?;
            } else {
                output::print_ingest_report(&report);
            }
        }
        Commands::Schools => {
            let store = SqliteSectionStore::open(config.store().path())?;
            let schools = store.list_schools()?;
            if json {
                output::print_json(&schools)?;
            } else {
                output::print_schools(&schools);
            }
        }
        Commands::Status { school } => {
            let service = RetrievalService::from_config(&config)?;
            let status = service.status(&school)?;
            if json {
                output::print_json(&status)?;
            } else {
                output::print_status(&school, status);
            }
        }
        Commands::Warm { school } => {
            let service = RetrievalService::from_config(&config)?;
            let report = service.warm(&school)?;
            if json {
                output::print_json(&report)?;
            } else {
                output::print_warm_report(&report);
            }
        }
        Commands::Invalidate { school } => {
            let service = RetrievalService::from_config(&config)?;
            service.invalidate(&school)?;
            if !json {
                println!("{}: index discarded", school);
            }
        }
    }

    Ok(())
}
