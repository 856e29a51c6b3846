use crate::error::{MapError, Result};
use crate::path::normalize_path;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

pub struct Database {
    conn: Connection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: i64,
    pub name: String,
    pub created_at: i64,
}

/// Summary of a captured request, as consumed by the sitemap builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedRecord {
    pub id: i64,
    pub method: String,
    pub url: String,
    pub status_code: Option<u16>,
    pub response_size: Option<i64>,
    pub is_favorite: bool,
}

/// A full row from the capture log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedRequest {
    pub id: i64,
    pub target_id: i64,
    pub page_id: Option<i64>,
    pub method: String,
    pub url: String,
    pub status_code: Option<u16>,
    pub response_size: Option<i64>,
    pub is_favorite: bool,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Default)]
pub struct NewRequest {
    pub method: String,
    pub url: String,
    pub status_code: Option<u16>,
    pub response_size: Option<i64>,
    pub page_id: Option<i64>,
}

/// Filters and pagination for listing captured requests
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub method: Option<String>,
    pub status_code: Option<u16>,
    pub favorites_only: bool,
    pub url_contains: Option<String>,
    pub limit: Option<usize>,
    pub offset: usize,
}

/// A hand-curated sitemap entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualEntry {
    pub id: i64,
    pub folder_path: String,
    pub method: String,
    pub path: String,
    pub notes: Option<String>,
    pub source_log_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct NewManualEntry {
    pub folder_path: String,
    pub method: String,
    pub path: String,
    pub notes: Option<String>,
    pub source_log_id: Option<i64>,
}

/// A recorded browsing session that groups captured requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSession {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub start_time: i64,
    pub end_time: Option<i64>,
}

/// One distinct (method, url) pair seen during a page session, represented
/// by the lowest log id that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageUrl {
    pub log_id: i64,
    pub method: String,
    pub url: String,
}

fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

fn expect_changed(changed: usize, what: &str, id: i64) -> Result<()> {
    if changed == 0 {
        return Err(MapError::NotFound(format!("{} {}", what, id)));
    }
    Ok(())
}

impl Database {
    pub fn drop(path: &Path) -> Result<()> {
        fs::remove_file(path)?;
        Ok(())
    }
    pub fn exists(path: &Path) -> bool {
        path.exists()
    }
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA foreign_keys = ON;
            ",
        )?;

        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS targets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT UNIQUE NOT NULL,
    created_at INTEGER NOT NULL
);

-- Recorded browsing sessions
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    target_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    description TEXT,
    start_time INTEGER NOT NULL,
    end_time INTEGER,
    FOREIGN KEY(target_id) REFERENCES targets(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_pages_target ON pages(target_id);

-- Append-only capture log
CREATE TABLE IF NOT EXISTS http_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    target_id INTEGER NOT NULL,
    page_id INTEGER,
    method TEXT NOT NULL,
    url TEXT NOT NULL,
    status_code INTEGER,
    response_size INTEGER,
    is_favorite BOOLEAN NOT NULL DEFAULT 0,
    timestamp INTEGER NOT NULL,
    FOREIGN KEY(target_id) REFERENCES targets(id) ON DELETE CASCADE,
    FOREIGN KEY(page_id) REFERENCES pages(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_http_logs_target ON http_logs(target_id);
CREATE INDEX IF NOT EXISTS idx_http_logs_page ON http_logs(page_id);
CREATE INDEX IF NOT EXISTS idx_http_logs_favorite ON http_logs(target_id, is_favorite);

-- Manually curated sitemap entries
CREATE TABLE IF NOT EXISTS sitemap_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    target_id INTEGER NOT NULL,
    folder_path TEXT NOT NULL,
    method TEXT NOT NULL,
    path TEXT NOT NULL,
    notes TEXT,
    source_log_id INTEGER,
    created_at INTEGER NOT NULL,
    FOREIGN KEY(target_id) REFERENCES targets(id) ON DELETE CASCADE,
    FOREIGN KEY(source_log_id) REFERENCES http_logs(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_sitemap_entries_target ON sitemap_entries(target_id);
            ",
        )?;

        Ok(())
    }

    // Targets
    pub fn create_target(&self, name: &str) -> Result<i64> {
        if name.trim().is_empty() {
            return Err(MapError::InvalidInput("target name is empty".to_string()));
        }

        self.conn.execute(
            "INSERT INTO targets (name, created_at) VALUES (?1, ?2)",
            params![name, current_timestamp()],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_target_by_name(&self, name: &str) -> Result<Target> {
        self.conn
            .query_row(
                "SELECT id, name, created_at FROM targets WHERE name = ?1",
                params![name],
                |row| {
                    Ok(Target {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| MapError::NotFound(format!("target '{}'", name)))
    }

    pub fn list_targets(&self) -> Result<Vec<Target>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at FROM targets ORDER BY name")?;

        let targets = stmt
            .query_map([], |row| {
                Ok(Target {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(targets)
    }

    pub fn delete_target(&self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM targets WHERE id = ?1", params![id])?;
        expect_changed(changed, "target", id)
    }

    // Capture log
    pub fn log_request(&self, target_id: i64, request: &NewRequest) -> Result<i64> {
        if let Some(page_id) = request.page_id {
            self.check_page_owner(target_id, page_id)?;
        }

        self.conn.execute(
            "INSERT INTO http_logs (
                target_id, page_id, method, url, status_code, response_size, is_favorite, timestamp
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
            params![
                target_id,
                request.page_id,
                &request.method,
                &request.url,
                request.status_code,
                request.response_size,
                current_timestamp(),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    // A page only collects requests captured for its own target
    fn check_page_owner(&self, target_id: i64, page_id: i64) -> Result<()> {
        let owner: Option<i64> = self
            .conn
            .query_row(
                "SELECT target_id FROM pages WHERE id = ?1",
                params![page_id],
                |row| row.get(0),
            )
            .optional()?;

        match owner {
            Some(owner) if owner == target_id => Ok(()),
            Some(_) => Err(MapError::InvalidInput(format!(
                "page {} belongs to another target",
                page_id
            ))),
            None => Err(MapError::NotFound(format!("page {}", page_id))),
        }
    }

    pub fn get_request(&self, id: i64) -> Result<LoggedRequest> {
        self.conn
            .query_row(
                "SELECT id, target_id, page_id, method, url, status_code, response_size, is_favorite, timestamp
                 FROM http_logs WHERE id = ?1",
                params![id],
                Self::map_logged_request,
            )
            .optional()?
            .ok_or_else(|| MapError::NotFound(format!("request {}", id)))
    }

    fn map_logged_request(row: &rusqlite::Row<'_>) -> rusqlite::Result<LoggedRequest> {
        Ok(LoggedRequest {
            id: row.get(0)?,
            target_id: row.get(1)?,
            page_id: row.get(2)?,
            method: row.get(3)?,
            url: row.get(4)?,
            status_code: row.get(5)?,
            response_size: row.get(6)?,
            is_favorite: row.get(7)?,
            timestamp: row.get(8)?,
        })
    }

    fn filter_clause(target_id: i64, filter: &RequestFilter) -> (String, Vec<Value>) {
        let mut clause = String::from("WHERE target_id = ?");
        let mut values = vec![Value::Integer(target_id)];

        if let Some(ref method) = filter.method {
            clause.push_str(" AND method = ?");
            values.push(Value::Text(method.clone()));
        }
        if let Some(status) = filter.status_code {
            clause.push_str(" AND status_code = ?");
            values.push(Value::Integer(i64::from(status)));
        }
        if filter.favorites_only {
            clause.push_str(" AND is_favorite = 1");
        }
        if let Some(ref needle) = filter.url_contains {
            clause.push_str(" AND instr(url, ?) > 0");
            values.push(Value::Text(needle.clone()));
        }

        (clause, values)
    }

    pub fn list_requests(&self, target_id: i64, filter: &RequestFilter) -> Result<Vec<LoggedRequest>> {
        let (clause, mut values) = Self::filter_clause(target_id, filter);
        let mut sql = format!(
            "SELECT id, target_id, page_id, method, url, status_code, response_size, is_favorite, timestamp
             FROM http_logs {} ORDER BY id",
            clause
        );

        // SQLite needs a LIMIT before it accepts an OFFSET
        if filter.limit.is_some() || filter.offset > 0 {
            sql.push_str(" LIMIT ? OFFSET ?");
            values.push(Value::Integer(filter.limit.map(|l| l as i64).unwrap_or(-1)));
            values.push(Value::Integer(filter.offset as i64));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let requests = stmt
            .query_map(params_from_iter(values.iter()), Self::map_logged_request)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(requests)
    }

    pub fn count_requests(&self, target_id: i64, filter: &RequestFilter) -> Result<i64> {
        let (clause, values) = Self::filter_clause(target_id, filter);
        let sql = format!("SELECT COUNT(*) FROM http_logs {}", clause);

        let count = self
            .conn
            .query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
        Ok(count)
    }

    pub fn set_favorite(&self, id: i64, favorite: bool) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE http_logs SET is_favorite = ?1 WHERE id = ?2",
            params![favorite, id],
        )?;
        expect_changed(changed, "request", id)
    }

    pub fn delete_request(&self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM http_logs WHERE id = ?1", params![id])?;
        expect_changed(changed, "request", id)
    }

    pub fn get_request_summaries(&self, target_id: i64) -> Result<Vec<CapturedRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, method, url, status_code, response_size, is_favorite
             FROM http_logs WHERE target_id = ?1",
        )?;

        let records = stmt
            .query_map(params![target_id], |row| {
                Ok(CapturedRecord {
                    id: row.get(0)?,
                    method: row.get(1)?,
                    url: row.get(2)?,
                    status_code: row.get(3)?,
                    response_size: row.get(4)?,
                    is_favorite: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!("Fetched {} captured records for target {}", records.len(), target_id);
        Ok(records)
    }

    // Manual sitemap entries
    pub fn add_manual_entry(&self, target_id: i64, entry: &NewManualEntry) -> Result<i64> {
        if entry.method.trim().is_empty() {
            return Err(MapError::InvalidInput("method is empty".to_string()));
        }

        self.conn.execute(
            "INSERT INTO sitemap_entries (
                target_id, folder_path, method, path, notes, source_log_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                target_id,
                normalize_path(&entry.folder_path),
                &entry.method,
                &entry.path,
                &entry.notes,
                entry.source_log_id,
                current_timestamp(),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    pub fn update_manual_notes(&self, id: i64, notes: Option<&str>) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE sitemap_entries SET notes = ?1 WHERE id = ?2",
            params![notes, id],
        )?;
        expect_changed(changed, "manual entry", id)
    }

    pub fn delete_manual_entry(&self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM sitemap_entries WHERE id = ?1", params![id])?;
        expect_changed(changed, "manual entry", id)
    }

    pub fn get_manual_entries(&self, target_id: i64) -> Result<Vec<ManualEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, folder_path, method, path, notes, source_log_id
             FROM sitemap_entries WHERE target_id = ?1",
        )?;

        let entries = stmt
            .query_map(params![target_id], |row| {
                Ok(ManualEntry {
                    id: row.get(0)?,
                    folder_path: row.get(1)?,
                    method: row.get(2)?,
                    path: row.get(3)?,
                    notes: row.get(4)?,
                    source_log_id: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!("Fetched {} manual entries for target {}", entries.len(), target_id);
        Ok(entries)
    }

    // Page sessions
    pub fn start_page(&self, target_id: i64, name: &str, description: Option<&str>) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO pages (target_id, name, description, start_time) VALUES (?1, ?2, ?3, ?4)",
            params![target_id, name, description, current_timestamp()],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    pub fn end_page(&self, id: i64) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE pages SET end_time = ?1 WHERE id = ?2",
            params![current_timestamp(), id],
        )?;
        expect_changed(changed, "page", id)
    }

    pub fn list_pages(&self, target_id: i64) -> Result<Vec<PageSession>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, start_time, end_time
             FROM pages WHERE target_id = ?1 ORDER BY id",
        )?;

        let pages = stmt
            .query_map(params![target_id], |row| {
                Ok(PageSession {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    start_time: row.get(3)?,
                    end_time: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(pages)
    }

    pub fn get_distinct_page_urls(&self, page_id: i64) -> Result<Vec<PageUrl>> {
        let mut stmt = self.conn.prepare(
            "SELECT MIN(id), method, url FROM http_logs
             WHERE page_id = ?1
               AND target_id = (SELECT target_id FROM pages WHERE id = ?1)
             GROUP BY method, url
             ORDER BY MIN(id)",
        )?;

        let urls = stmt
            .query_map(params![page_id], |row| {
                Ok(PageUrl {
                    log_id: row.get(0)?,
                    method: row.get(1)?,
                    url: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(urls)
    }

    pub fn get_connection(&self) -> &Connection {
        &self.conn
    }
}
