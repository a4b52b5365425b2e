// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSONL ingestion into the section warehouse.
//!
//! One JSON object per line, one handbook section each. Rows are grouped by
//! (school, handbook, academic year) and each group replaces that handbook
//! wholesale. The `summary` key is accepted as a legacy alias for `excerpt`
//! and resolved here so the rest of the crate only ever sees `excerpt`.

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{debug, warn};

use crate::store::{NewSection, SqliteSectionStore};

const DEFAULT_HANDBOOK_TITLE: &str = "Student Handbook";
const DEFAULT_CATEGORY: &str = "General";

/// One JSONL row as written by the extraction pipeline.
#[derive(Debug, Deserialize)]
struct IngestRow {
    school: String,
    #[serde(default)]
    school_name: Option<String>,
    #[serde(default)]
    handbook: Option<String>,
    #[serde(default)]
    academic_year: Option<String>,
    #[serde(default)]
    section_id: Option<String>,
    title: String,
    #[serde(default)]
    category: Option<String>,
    content: String,
    #[serde(default, alias = "summary")]
    excerpt: Option<String>,
}

/// Counts from one ingest run.
#[derive(Debug, Serialize)]
pub struct IngestReport {
    pub handbooks: usize,
    pub sections: usize,
    pub skipped: usize,
}

struct PreparedSection {
    section_id: String,
    title: String,
    category: String,
    content: String,
    excerpt: Option<String>,
}

struct HandbookGroup {
    school_name: Option<String>,
    sections: Vec<PreparedSection>,
    seen_ids: HashSet<String>,
}

/// Loads a JSONL file into the warehouse.
///
/// Malformed JSON fails the run with the offending line number; rows with an
/// empty title or content are skipped and counted instead, as are duplicate
/// section ids within one handbook (first occurrence wins).
pub fn ingest_jsonl(store: &SqliteSectionStore, path: &Path) -> Result<IngestReport> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let whitespace = Regex::new(r"\s+").context("Failed to compile whitespace pattern")?;

    let mut groups: BTreeMap<(String, String, String), HandbookGroup> = BTreeMap::new();
    let mut skipped = 0usize;

    for (line_no, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let row: IngestRow = serde_json::from_str(line)
            .with_context(|| format!("Invalid JSON on line {} of {}", line_no + 1, path.display()))?;

        let school = normalize(&whitespace, &row.school);
        let title = normalize(&whitespace, &row.title);
        let content = normalize(&whitespace, &row.content);
        if school.is_empty() || title.is_empty() || content.is_empty() {
            warn!(line = line_no + 1, "skipping row with empty school, title, or content");
            skipped += 1;
            continue;
        }

        let handbook = row
            .handbook
            .as_deref()
            .map(|h| normalize(&whitespace, h))
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_HANDBOOK_TITLE.to_string());
        let academic_year = row
            .academic_year
            .as_deref()
            .map(|y| normalize(&whitespace, y))
            .unwrap_or_default();
        let category = row
            .category
            .as_deref()
            .map(|c| normalize(&whitespace, c))
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        let excerpt = row
            .excerpt
            .as_deref()
            .map(|e| normalize(&whitespace, e))
            .filter(|e| !e.is_empty());

        let section_id = match row.section_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => stable_section_id(&school, &handbook, &title, &content),
        };

        let key = (school.clone(), handbook, academic_year);
        let group = groups.entry(key).or_insert_with(|| HandbookGroup {
            school_name: None,
            sections: Vec::new(),
            seen_ids: HashSet::new(),
        });

        if group.school_name.is_none() {
            group.school_name = row
                .school_name
                .as_deref()
                .map(|n| normalize(&whitespace, n))
                .filter(|n| !n.is_empty());
        }

        if !group.seen_ids.insert(section_id.clone()) {
            warn!(line = line_no + 1, section_id = %section_id, "skipping duplicate section id");
            skipped += 1;
            continue;
        }

        group.sections.push(PreparedSection {
            section_id,
            title,
            category,
            content,
            excerpt,
        });
    }

    let mut report = IngestReport {
        handbooks: 0,
        sections: 0,
        skipped,
    };

    for ((school, handbook, academic_year), group) in &groups {
        let school_name = group.school_name.as_deref().unwrap_or(school);
        let sections: Vec<NewSection<'_>> = group
            .sections
            .iter()
            .map(|s| NewSection {
                section_id: &s.section_id,
                title: &s.title,
                category: &s.category,
                content: &s.content,
                excerpt: s.excerpt.as_deref(),
            })
            .collect();

        let written = store.replace_handbook(school, school_name, handbook, academic_year, &sections)?;
        debug!(
            school = %school,
            handbook = %handbook,
            sections = written,
            "handbook ingested"
        );
        report.handbooks += 1;
        report.sections += written;
    }

    Ok(report)
}

fn normalize(whitespace: &Regex, text: &str) -> String {
    whitespace.replace_all(text.trim(), " ").to_string()
}

/// Stable id for sections the extraction pipeline did not tag.
fn stable_section_id(school: &str, handbook: &str, title: &str, content: &str) -> String {
    let input = format!("{}:{}:{}:{}", school, handbook, title, content);
    let hash = blake3::hash(input.as_bytes());
    hash.to_hex()[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SectionStore;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_jsonl(dir: &Path, lines: &[&str]) -> std::path::PathBuf {
        let path = dir.join("sections.jsonl");
        let mut file = std::fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        path
    }

    fn body(word: &str) -> String {
        format!("{} ", word).repeat(20).trim().to_string()
    }

    #[test]
    fn test_ingest_basic_rows() {
        let dir = tempdir().unwrap();
        let store = SqliteSectionStore::open(dir.path().join("db.sqlite")).unwrap();
        let line_a = format!(
            r#"{{"school":"demo_u","school_name":"Demo University","handbook":"Student Handbook","academic_year":"2024-2025","section_id":"sec-1","title":"Academic Integrity Policy","category":"Academic Policies","content":"{}","excerpt":"Short."}}"#,
            body("plagiarism")
        );
        let line_b = format!(
            r#"{{"school":"demo_u","title":"Housing","content":"{}"}}"#,
            body("housing")
        );
        let path = write_jsonl(dir.path(), &[&line_a, &line_b]);

        let report = ingest_jsonl(&store, &path).unwrap();
        assert_eq!(report.sections, 2);
        assert_eq!(report.skipped, 0);
        // Two groups: explicit 2024-2025 handbook and the default one.
        assert_eq!(report.handbooks, 2);

        let records = store.fetch_sections("demo_u").unwrap();
        assert_eq!(records.len(), 2);
        let integrity = records
            .iter()
            .find(|r| r.section_id == "sec-1")
            .expect("ingested section");
        assert_eq!(integrity.school_name, "Demo University");
        assert_eq!(integrity.category, "Academic Policies");
        assert_eq!(integrity.excerpt.as_deref(), Some("Short."));
        let housing = records.iter().find(|r| r.title == "Housing").unwrap();
        assert_eq!(housing.category, "General");
        assert_eq!(housing.handbook_title, "Student Handbook");
    }

    #[test]
    fn test_summary_alias_resolves_to_excerpt() {
        let dir = tempdir().unwrap();
        let store = SqliteSectionStore::open(dir.path().join("db.sqlite")).unwrap();
        let line = format!(
            r#"{{"school":"demo_u","title":"Grading","content":"{}","summary":"Grades are final."}}"#,
            body("grading")
        );
        let path = write_jsonl(dir.path(), &[&line]);

        ingest_jsonl(&store, &path).unwrap();
        let records = store.fetch_sections("demo_u").unwrap();
        assert_eq!(records[0].excerpt.as_deref(), Some("Grades are final."));
    }

    #[test]
    fn test_missing_section_id_gets_stable_hash() {
        let dir = tempdir().unwrap();
        let store = SqliteSectionStore::open(dir.path().join("db.sqlite")).unwrap();
        let line = format!(
            r#"{{"school":"demo_u","title":"Library","content":"{}"}}"#,
            body("borrowing")
        );
        let path = write_jsonl(dir.path(), &[&line]);

        ingest_jsonl(&store, &path).unwrap();
        let first = store.fetch_sections("demo_u").unwrap()[0].section_id.clone();
        assert_eq!(first.len(), 16);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));

        // Re-ingesting the same content keeps the same id.
        ingest_jsonl(&store, &path).unwrap();
        let second = store.fetch_sections("demo_u").unwrap()[0].section_id.clone();
        assert_eq!(first, second);
    }

    #[test]
    fn test_whitespace_normalized() {
        let dir = tempdir().unwrap();
        let store = SqliteSectionStore::open(dir.path().join("db.sqlite")).unwrap();
        let line = format!(
            r#"{{"school":"demo_u","title":"  Academic\n\tIntegrity  ","content":"{}"}}"#,
            body("policy")
        );
        let path = write_jsonl(dir.path(), &[&line]);

        ingest_jsonl(&store, &path).unwrap();
        let records = store.fetch_sections("demo_u").unwrap();
        assert_eq!(records[0].title, "Academic Integrity");
    }

    #[test]
    fn test_empty_rows_are_skipped() {
        let dir = tempdir().unwrap();
        let store = SqliteSectionStore::open(dir.path().join("db.sqlite")).unwrap();
        let good = format!(
            r#"{{"school":"demo_u","title":"Dining","content":"{}"}}"#,
            body("meals")
        );
        let path = write_jsonl(
            dir.path(),
            &[
                r#"{"school":"demo_u","title":"","content":"long enough content for the threshold check here"}"#,
                r#"{"school":"demo_u","title":"No Body","content":"   "}"#,
                &good,
            ],
        );

        let report = ingest_jsonl(&store, &path).unwrap();
        assert_eq!(report.sections, 1);
        assert_eq!(report.skipped, 2);
    }

    #[test]
    fn test_duplicate_section_ids_first_wins() {
        let dir = tempdir().unwrap();
        let store = SqliteSectionStore::open(dir.path().join("db.sqlite")).unwrap();
        let first = format!(
            r#"{{"school":"demo_u","section_id":"dup","title":"First","content":"{}"}}"#,
            body("first")
        );
        let second = format!(
            r#"{{"school":"demo_u","section_id":"dup","title":"Second","content":"{}"}}"#,
            body("second")
        );
        let path = write_jsonl(dir.path(), &[&first, &second]);

        let report = ingest_jsonl(&store, &path).unwrap();
        assert_eq!(report.sections, 1);
        assert_eq!(report.skipped, 1);
        let records = store.fetch_sections("demo_u").unwrap();
        assert_eq!(records[0].title, "First");
    }

    #[test]
    fn test_malformed_line_reports_line_number() {
        let dir = tempdir().unwrap();
        let store = SqliteSectionStore::open(dir.path().join("db.sqlite")).unwrap();
        let good = format!(
            r#"{{"school":"demo_u","title":"Ok","content":"{}"}}"#,
            body("fine")
        );
        let path = write_jsonl(dir.path(), &[&good, "{not json"]);

        let err = ingest_jsonl(&store, &path).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }

    #[test]
    fn test_blank_lines_ignored() {
        let dir = tempdir().unwrap();
        let store = SqliteSectionStore::open(dir.path().join("db.sqlite")).unwrap();
        let good = format!(
            r#"{{"school":"demo_u","title":"Ok","content":"{}"}}"#,
            body("fine")
        );
        let path = write_jsonl(dir.path(), &["", &good, "   "]);

        let report = ingest_jsonl(&store, &path).unwrap();
        assert_eq!(report.sections, 1);
        assert_eq!(report.skipped, 0);
    }
}
