// SPDX-License-Identifier: MIT OR Apache-2.0

//! Output and color utilities for consistent terminal formatting
//!
//! Renders ask results, school listings, and index status either as colored
//! text or as JSON. Respects the NO_COLOR environment variable.

use colored::Colorize;
use serde::Serialize;

use crate::index::TenantStatus;
use crate::ingest::IngestReport;
use crate::service::{AskOutcome, WarmReport};
use crate::store::SchoolSummary;

/// Check if colors should be used (respects NO_COLOR env var)
pub fn use_colors() -> bool {
    std::env::var("NO_COLOR").is_err()
}

/// Print any serializable value as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print the answer followed by its numbered sources.
pub fn print_ask_outcome(outcome: &AskOutcome) {
    let color = use_colors();

    println!("{}", outcome.answer);

    if outcome.sources.is_empty() {
        return;
    }

    println!();
    println!("{}", heading("Sources", color));
    for (i, source) in outcome.sources.iter().enumerate() {
        println!(
            "  {}. {} ({}, similarity {:.3})",
            i + 1,
            name(&source.title, color),
            kind(&source.category, color),
            source.similarity,
        );
        if let Some(excerpt) = &source.excerpt {
            println!("     {}", dim(excerpt, color));
        }
    }
}

/// Print the school listing with section counts.
pub fn print_schools(schools: &[SchoolSummary]) {
    let color = use_colors();

    if schools.is_empty() {
        println!("No schools ingested yet. Run `askbook ingest <file.jsonl>` first.");
        return;
    }

    for school in schools {
        println!(
            "{}  {} ({} sections)",
            name(&school.slug, color),
            school.name,
            school.sections,
        );
    }
}

pub fn print_status(school: &str, status: TenantStatus) {
    let color = use_colors();
    println!("{}: {}", name(school, color), kind(&status.to_string(), color));
}

pub fn print_warm_report(report: &WarmReport) {
    let color = use_colors();
    if report.ready {
        println!(
            "{}: index ready ({} sections)",
            name(&report.tenant, color),
            report.sections,
        );
    } else {
        let reason = report.reason.as_deref().unwrap_or("unknown");
        println!("{}: not built: {}", name(&report.tenant, color), reason);
    }
}

pub fn print_ingest_report(report: &IngestReport) {
    println!(
        "Ingested {} sections across {} handbooks ({} rows skipped)",
        report.sections, report.handbooks, report.skipped,
    );
}

fn heading(text: &str, use_color: bool) -> String {
    if use_color {
        text.bold().underline().to_string()
    } else {
        text.to_string()
    }
}

fn name(text: &str, use_color: bool) -> String {
    if use_color {
        text.cyan().bold().to_string()
    } else {
        text.to_string()
    }
}

fn kind(text: &str, use_color: bool) -> String {
    if use_color {
        text.green().to_string()
    } else {
        text.to_string()
    }
}

fn dim(text: &str, use_color: bool) -> String {
    if use_color {
        text.dimmed().to_string()
    } else {
        text.to_string()
    }
}
