// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed section warehouse.
//!
//! Holds ingested handbook sections per school and serves the read side of
//! index builds. Sections are read-only once written; reprocessing a handbook
//! replaces its sections in one transaction.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Minimum content length for a section to be worth indexing.
///
/// Shorter rows are headings or fragments with no retrieval signal.
pub const MIN_CONTENT_CHARS: usize = 50;

/// One retrievable unit of handbook content, with citation metadata joined in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionRecord {
    /// Opaque identifier, unique within a tenant, stable across rebuilds.
    pub section_id: String,
    /// School slug this section belongs to.
    pub tenant_id: String,
    pub title: String,
    pub category: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub handbook_title: String,
    pub academic_year: String,
    pub school_name: String,
}

/// Read interface the index layer builds from.
pub trait SectionStore: Send + Sync {
    /// Fetches all indexable sections for a tenant.
    ///
    /// Filters out sections at or below [`MIN_CONTENT_CHARS`] and returns the
    /// rest ordered longest-content-first, which keeps tie-breaks during
    /// ranking reproducible across rebuilds. Unknown tenants yield an empty
    /// list, not an error.
    fn fetch_sections(&self, tenant_id: &str) -> Result<Vec<SectionRecord>>;
}

/// Input row for bulk section writes.
pub struct NewSection<'a> {
    pub section_id: &'a str,
    pub title: &'a str,
    pub category: &'a str,
    pub content: &'a str,
    pub excerpt: Option<&'a str>,
}

/// A school with its ingested section count, for operational listings.
#[derive(Debug, Clone, Serialize)]
pub struct SchoolSummary {
    pub slug: String,
    pub name: String,
    pub sections: u64,
}

/// SQLite warehouse for handbook sections.
///
/// The connection sits behind a mutex so the store can be shared across
/// request threads; queries are short and contention is negligible next to
/// embedding cost.
pub struct SqliteSectionStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteSectionStore {
    /// Opens or creates the warehouse at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        let store = Self {
            conn: Mutex::new(conn),
            path,
        };
        store.init_schema()?;

        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS schools (
                id INTEGER PRIMARY KEY,
                slug TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS handbooks (
                id INTEGER PRIMARY KEY,
                school_id INTEGER NOT NULL REFERENCES schools(id),
                title TEXT NOT NULL,
                academic_year TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS handbook_sections (
                id INTEGER PRIMARY KEY,
                handbook_id INTEGER NOT NULL REFERENCES handbooks(id),
                section_id TEXT NOT NULL,
                title TEXT NOT NULL,
                category TEXT NOT NULL,
                content TEXT NOT NULL,
                excerpt TEXT
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_sections_handbook_section
                ON handbook_sections(handbook_id, section_id);

            CREATE INDEX IF NOT EXISTS idx_handbooks_school
                ON handbooks(school_id);

            INSERT OR IGNORE INTO meta (key, value) VALUES ('schema_version', '1');
            "#,
        )
        .context("Failed to initialize warehouse schema")?;

        Ok(())
    }

    /// Returns the path to the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces one handbook's sections in a single transaction.
    ///
    /// The school row is created on first sight; an existing handbook with
    /// the same school, title, and academic year is superseded wholesale.
    /// Returns the number of sections written.
    pub fn replace_handbook(
        &self,
        school_slug: &str,
        school_name: &str,
        handbook_title: &str,
        academic_year: &str,
        sections: &[NewSection<'_>],
    ) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO schools (slug, name) VALUES (?1, ?2)
             ON CONFLICT(slug) DO UPDATE SET name = excluded.name",
            params![school_slug, school_name],
        )?;
        let school_id: i64 = tx.query_row(
            "SELECT id FROM schools WHERE slug = ?1",
            params![school_slug],
            |row| row.get(0),
        )?;

        tx.execute(
            "DELETE FROM handbook_sections WHERE handbook_id IN (
                 SELECT id FROM handbooks
                 WHERE school_id = ?1 AND title = ?2 AND academic_year = ?3
             )",
            params![school_id, handbook_title, academic_year],
        )?;
        tx.execute(
            "DELETE FROM handbooks
             WHERE school_id = ?1 AND title = ?2 AND academic_year = ?3",
            params![school_id, handbook_title, academic_year],
        )?;

        tx.execute(
            "INSERT INTO handbooks (school_id, title, academic_year) VALUES (?1, ?2, ?3)",
            params![school_id, handbook_title, academic_year],
        )?;
        let handbook_id = tx.last_insert_rowid();

        let written = {
            let mut stmt = tx.prepare(
                "INSERT INTO handbook_sections
                     (handbook_id, section_id, title, category, content, excerpt)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;

            let mut written = 0usize;
            for section in sections {
                stmt.execute(params![
                    handbook_id,
                    section.section_id,
                    section.title,
                    section.category,
                    section.content,
                    section.excerpt,
                ])?;
                written += 1;
            }
            written
        };

        tx.commit().context("Failed to commit handbook sections")?;
        Ok(written)
    }

    /// Lists all schools with their indexable section counts.
    pub fn list_schools(&self) -> Result<Vec<SchoolSummary>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT sc.slug, sc.name, COUNT(s.id)
            FROM schools sc
            LEFT JOIN handbooks h ON h.school_id = sc.id
            LEFT JOIN handbook_sections s
                ON s.handbook_id = h.id AND LENGTH(s.content) > ?1
            GROUP BY sc.id
            ORDER BY sc.slug
            "#,
        )?;

        let schools = stmt
            .query_map(params![MIN_CONTENT_CHARS as i64], |row| {
                Ok(SchoolSummary {
                    slug: row.get(0)?,
                    name: row.get(1)?,
                    sections: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(schools)
    }
}

impl SectionStore for SqliteSectionStore {
    fn fetch_sections(&self, tenant_id: &str) -> Result<Vec<SectionRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT s.section_id, sc.slug, s.title, s.category, s.content, s.excerpt,
                   h.title, h.academic_year, sc.name
            FROM handbook_sections s
            JOIN handbooks h ON h.id = s.handbook_id
            JOIN schools sc ON sc.id = h.school_id
            WHERE sc.slug = ?1 AND LENGTH(s.content) > ?2
            ORDER BY LENGTH(s.content) DESC
            "#,
        )?;

        let records = stmt
            .query_map(params![tenant_id, MIN_CONTENT_CHARS as i64], |row| {
                Ok(SectionRecord {
                    section_id: row.get(0)?,
                    tenant_id: row.get(1)?,
                    title: row.get(2)?,
                    category: row.get(3)?,
                    content: row.get(4)?,
                    excerpt: row.get(5)?,
                    handbook_title: row.get(6)?,
                    academic_year: row.get(7)?,
                    school_name: row.get(8)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_temp() -> (tempfile::TempDir, SqliteSectionStore) {
        let dir = tempdir().unwrap();
        let store = SqliteSectionStore::open(dir.path().join("handbook.sqlite")).unwrap();
        (dir, store)
    }

    fn long_content(seed: &str, len: usize) -> String {
        seed.chars().cycle().take(len).collect()
    }

    #[test]
    fn test_replace_and_fetch_sections() {
        let (_dir, store) = open_temp();

        let body = long_content("integrity ", 200);
        let written = store
            .replace_handbook(
                "demo_u",
                "Demo University",
                "Student Handbook",
                "2024-2025",
                &[NewSection {
                    section_id: "sec-1",
                    title: "Academic Integrity Policy",
                    category: "Academic Policies",
                    content: &body,
                    excerpt: Some("Plagiarism is prohibited."),
                }],
            )
            .unwrap();
        assert_eq!(written, 1);

        let records = store.fetch_sections("demo_u").unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.section_id, "sec-1");
        assert_eq!(record.tenant_id, "demo_u");
        assert_eq!(record.school_name, "Demo University");
        assert_eq!(record.handbook_title, "Student Handbook");
        assert_eq!(record.academic_year, "2024-2025");
        assert_eq!(record.excerpt.as_deref(), Some("Plagiarism is prohibited."));
    }

    #[test]
    fn test_short_sections_filtered_out() {
        let (_dir, store) = open_temp();

        let exactly_threshold = long_content("x", MIN_CONTENT_CHARS);
        let just_over = long_content("y", MIN_CONTENT_CHARS + 1);
        store
            .replace_handbook(
                "demo_u",
                "Demo University",
                "Student Handbook",
                "2024-2025",
                &[
                    NewSection {
                        section_id: "short",
                        title: "Heading Only",
                        category: "Misc",
                        content: &exactly_threshold,
                        excerpt: None,
                    },
                    NewSection {
                        section_id: "long",
                        title: "Real Section",
                        category: "Misc",
                        content: &just_over,
                        excerpt: None,
                    },
                ],
            )
            .unwrap();

        let records = store.fetch_sections("demo_u").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].section_id, "long");
    }

    #[test]
    fn test_fetch_orders_longest_first() {
        let (_dir, store) = open_temp();

        store
            .replace_handbook(
                "demo_u",
                "Demo University",
                "Student Handbook",
                "2024-2025",
                &[
                    NewSection {
                        section_id: "mid",
                        title: "Mid",
                        category: "A",
                        content: &long_content("m", 100),
                        excerpt: None,
                    },
                    NewSection {
                        section_id: "big",
                        title: "Big",
                        category: "A",
                        content: &long_content("b", 300),
                        excerpt: None,
                    },
                    NewSection {
                        section_id: "small",
                        title: "Small",
                        category: "A",
                        content: &long_content("s", 60),
                        excerpt: None,
                    },
                ],
            )
            .unwrap();

        let ids: Vec<String> = store
            .fetch_sections("demo_u")
            .unwrap()
            .into_iter()
            .map(|r| r.section_id)
            .collect();
        assert_eq!(ids, vec!["big", "mid", "small"]);
    }

    #[test]
    fn test_unknown_tenant_yields_empty() {
        let (_dir, store) = open_temp();
        let records = store.fetch_sections("unknown_school").unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_reingest_supersedes_handbook() {
        let (_dir, store) = open_temp();

        let body = long_content("old ", 120);
        store
            .replace_handbook(
                "demo_u",
                "Demo University",
                "Student Handbook",
                "2024-2025",
                &[NewSection {
                    section_id: "sec-1",
                    title: "Old Title",
                    category: "A",
                    content: &body,
                    excerpt: None,
                }],
            )
            .unwrap();

        let body = long_content("new ", 120);
        store
            .replace_handbook(
                "demo_u",
                "Demo University",
                "Student Handbook",
                "2024-2025",
                &[NewSection {
                    section_id: "sec-1",
                    title: "New Title",
                    category: "A",
                    content: &body,
                    excerpt: None,
                }],
            )
            .unwrap();

        let records = store.fetch_sections("demo_u").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "New Title");
    }

    #[test]
    fn test_list_schools_counts_indexable_only() {
        let (_dir, store) = open_temp();

        store
            .replace_handbook(
                "demo_u",
                "Demo University",
                "Student Handbook",
                "2024-2025",
                &[
                    NewSection {
                        section_id: "a",
                        title: "A",
                        category: "X",
                        content: &long_content("a", 80),
                        excerpt: None,
                    },
                    NewSection {
                        section_id: "b",
                        title: "B",
                        category: "X",
                        content: "too short",
                        excerpt: None,
                    },
                ],
            )
            .unwrap();
        store
            .replace_handbook("empty_u", "Empty University", "Handbook", "2024-2025", &[])
            .unwrap();

        let schools = store.list_schools().unwrap();
        assert_eq!(schools.len(), 2);
        assert_eq!(schools[0].slug, "demo_u");
        assert_eq!(schools[0].sections, 1);
        assert_eq!(schools[1].slug, "empty_u");
        assert_eq!(schools[1].sections, 0);
    }
}
