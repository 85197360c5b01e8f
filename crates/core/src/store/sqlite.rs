//! SQLite-backed plugin store implementation.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::debug;

use super::{
    CounterKind, MergeOutcome, NewPlugin, NewPluginVersion, Plugin, PluginFilter, PluginStore,
    PluginUpsert, PluginVersion, StoreError, VersionUpsert,
};
use crate::timestamp::{format_iso8601, parse_iso8601};

const PLUGIN_COLUMNS: &str = "id, upstream_id, name, author, description, tags, visible, image_url, downloads, updates, created, updated";

const VERSION_COLUMNS: &str = "id, plugin_id, name, hash, artifact, created, downloads, updates";

/// SQLite-backed plugin store.
pub struct SqlitePluginStore {
    conn: Mutex<Connection>,
}

impl SqlitePluginStore {
    /// Create a new SQLite store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Database(format!(
                        "Failed to create database directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let conn = Connection::open(path).map_err(db_err)?;
        Self::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize(conn: &Connection) -> Result<(), StoreError> {
        // Cascading deletes depend on foreign key enforcement, which SQLite
        // leaves off per connection.
        conn.pragma_update(None, "foreign_keys", true)
            .map_err(db_err)?;
        conn.busy_timeout(Duration::from_secs(5)).map_err(db_err)?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS plugins (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                upstream_id INTEGER,
                name TEXT NOT NULL,
                author TEXT,
                description TEXT,
                tags TEXT,
                visible INTEGER NOT NULL DEFAULT 0,
                image_url TEXT,
                downloads INTEGER NOT NULL DEFAULT 0,
                updates INTEGER NOT NULL DEFAULT 0,
                created TEXT,
                updated TEXT
            );

            -- NULLs are distinct, so curated plugins never collide here
            CREATE UNIQUE INDEX IF NOT EXISTS idx_plugins_upstream_id ON plugins(upstream_id);
            CREATE INDEX IF NOT EXISTS idx_plugins_name ON plugins(name);

            CREATE TABLE IF NOT EXISTS plugin_versions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                plugin_id INTEGER NOT NULL REFERENCES plugins(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                hash TEXT NOT NULL,
                artifact TEXT,
                created TEXT,
                downloads INTEGER NOT NULL DEFAULT 0,
                updates INTEGER NOT NULL DEFAULT 0,
                UNIQUE(plugin_id, name, hash)
            );

            CREATE INDEX IF NOT EXISTS idx_plugin_versions_plugin ON plugin_versions(plugin_id);
            "#,
        )
        .map_err(db_err)?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection mutex poisoned".to_string()))
    }

    fn row_to_plugin(row: &rusqlite::Row) -> rusqlite::Result<Plugin> {
        let tags_json: Option<String> = row.get(5)?;
        let created: Option<String> = row.get(10)?;
        let updated: Option<String> = row.get(11)?;

        Ok(Plugin {
            id: row.get(0)?,
            upstream_id: row.get(1)?,
            name: row.get(2)?,
            author: row.get(3)?,
            description: row.get(4)?,
            tags: tags_json
                .and_then(|json| serde_json::from_str(&json).ok())
                .unwrap_or_default(),
            visible: row.get(6)?,
            image_url: row.get(7)?,
            downloads: row.get(8)?,
            updates: row.get(9)?,
            created: created.as_deref().and_then(parse_iso8601),
            updated: updated.as_deref().and_then(parse_iso8601),
            versions: Vec::new(), // Will be loaded separately
        })
    }

    fn row_to_version(row: &rusqlite::Row) -> rusqlite::Result<PluginVersion> {
        let created: Option<String> = row.get(5)?;

        Ok(PluginVersion {
            id: row.get(0)?,
            plugin_id: row.get(1)?,
            name: row.get(2)?,
            hash: row.get(3)?,
            artifact: row.get(4)?,
            created: created.as_deref().and_then(parse_iso8601),
            downloads: row.get(6)?,
            updates: row.get(7)?,
        })
    }

    /// Load versions for a plugin, oldest first.
    fn load_versions(conn: &Connection, plugin_id: i64) -> Result<Vec<PluginVersion>, StoreError> {
        let sql = format!(
            "SELECT {} FROM plugin_versions WHERE plugin_id = ? ORDER BY id ASC",
            VERSION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql).map_err(db_err)?;

        let rows = stmt
            .query_map(params![plugin_id], Self::row_to_version)
            .map_err(db_err)?;

        let mut versions = Vec::new();
        for row in rows {
            versions.push(row.map_err(db_err)?);
        }
        Ok(versions)
    }

    /// Load a plugin with its versions.
    fn load_plugin(conn: &Connection, id: i64) -> Result<Plugin, StoreError> {
        let sql = format!("SELECT {} FROM plugins WHERE id = ?", PLUGIN_COLUMNS);
        let mut plugin = conn
            .query_row(&sql, params![id], Self::row_to_plugin)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::PluginNotFound(id.to_string()),
                _ => db_err(e),
            })?;

        plugin.versions = Self::load_versions(conn, id)?;
        Ok(plugin)
    }

    fn plugin_exists(conn: &Connection, id: i64) -> Result<bool, StoreError> {
        let found = conn
            .query_row("SELECT 1 FROM plugins WHERE id = ?", params![id], |_| Ok(()))
            .optional()
            .map_err(db_err)?;
        Ok(found.is_some())
    }

    fn build_where_clause(filter: &PluginFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if filter.visible_only {
            conditions.push("visible = 1");
        }

        // LIKE folds ASCII letters only; "ü" does not match "Ü"
        if let Some(ref search) = filter.search {
            conditions.push("(name LIKE ?1 ESCAPE '\\' OR description LIKE ?1 ESCAPE '\\')");
            params.push(Box::new(like_pattern(search)));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    fn plugin_id_for_upstream(conn: &Connection, upstream_id: i64) -> Result<Option<i64>, StoreError> {
        conn.query_row(
            "SELECT id FROM plugins WHERE upstream_id = ?",
            params![upstream_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(db_err)
    }

    /// Insert a plugin seen upstream for the first time.
    ///
    /// Returns `None` when another writer inserted the same upstream id first.
    fn insert_upstream_plugin(
        conn: &Connection,
        upsert: &PluginUpsert,
    ) -> Result<Option<i64>, StoreError> {
        let tags = serde_json::to_string(upsert.tags.as_deref().unwrap_or(&[]))
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let inserted = conn
            .execute(
                "INSERT INTO plugins (upstream_id, name, author, description, tags, visible, image_url, downloads, updates, created, updated)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(upstream_id) DO NOTHING",
                params![
                    upsert.upstream_id,
                    upsert.name.as_deref().unwrap_or_default(),
                    &upsert.author,
                    &upsert.description,
                    tags,
                    &upsert.image_url,
                    upsert.downloads.unwrap_or(0),
                    upsert.updates.unwrap_or(0),
                    format_optional(&upsert.created),
                    format_optional(&upsert.updated),
                ],
            )
            .map_err(db_err)?;

        if inserted == 0 {
            Ok(None)
        } else {
            Ok(Some(conn.last_insert_rowid()))
        }
    }

    /// Overwrite upstream-owned columns that the upsert supplies.
    fn update_upstream_plugin(
        conn: &Connection,
        plugin_id: i64,
        upsert: &PluginUpsert,
    ) -> Result<(), StoreError> {
        let tags = upsert
            .tags
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StoreError::Database(e.to_string()))?;

        conn.execute(
            "UPDATE plugins SET
                name = COALESCE(?1, name),
                author = COALESCE(?2, author),
                description = COALESCE(?3, description),
                tags = COALESCE(?4, tags),
                image_url = COALESCE(?5, image_url),
                downloads = COALESCE(?6, downloads),
                updates = COALESCE(?7, updates),
                created = COALESCE(?8, created),
                updated = COALESCE(?9, updated)
             WHERE id = ?10",
            params![
                &upsert.name,
                &upsert.author,
                &upsert.description,
                tags,
                &upsert.image_url,
                upsert.downloads,
                upsert.updates,
                format_optional(&upsert.created),
                format_optional(&upsert.updated),
                plugin_id,
            ],
        )
        .map_err(db_err)?;

        Ok(())
    }

    fn version_ids_by_key(
        conn: &Connection,
        plugin_id: i64,
    ) -> Result<HashMap<(String, String), i64>, StoreError> {
        let mut stmt = conn
            .prepare("SELECT id, name, hash FROM plugin_versions WHERE plugin_id = ?")
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![plugin_id], |row| {
                Ok(((row.get(1)?, row.get(2)?), row.get(0)?))
            })
            .map_err(db_err)?;

        let mut keys = HashMap::new();
        for row in rows {
            let (key, id) = row.map_err(db_err)?;
            keys.insert(key, id);
        }
        Ok(keys)
    }

    fn version_id(
        conn: &Connection,
        plugin_id: i64,
        name: &str,
        hash: &str,
    ) -> Result<Option<i64>, StoreError> {
        conn.query_row(
            "SELECT id FROM plugin_versions WHERE plugin_id = ? AND name = ? AND hash = ?",
            params![plugin_id, name, hash],
            |row| row.get(0),
        )
        .optional()
        .map_err(db_err)
    }

    /// Returns `None` when the `(plugin, name, hash)` row already exists.
    fn insert_upstream_version(
        conn: &Connection,
        plugin_id: i64,
        version: &VersionUpsert,
    ) -> Result<Option<i64>, StoreError> {
        let inserted = conn
            .execute(
                "INSERT INTO plugin_versions (plugin_id, name, hash, artifact, created, downloads, updates)
                 VALUES (?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(plugin_id, name, hash) DO NOTHING",
                params![
                    plugin_id,
                    &version.name,
                    &version.hash,
                    &version.artifact,
                    format_optional(&version.created),
                    version.downloads.unwrap_or(0),
                    version.updates.unwrap_or(0),
                ],
            )
            .map_err(db_err)?;

        if inserted == 0 {
            Ok(None)
        } else {
            Ok(Some(conn.last_insert_rowid()))
        }
    }

    /// Only `created`, the counters and a non-null `artifact` are taken from upstream.
    fn update_upstream_version(
        conn: &Connection,
        version_id: i64,
        version: &VersionUpsert,
    ) -> Result<(), StoreError> {
        conn.execute(
            "UPDATE plugin_versions SET
                created = COALESCE(?1, created),
                downloads = COALESCE(?2, downloads),
                updates = COALESCE(?3, updates),
                artifact = COALESCE(?4, artifact)
             WHERE id = ?5",
            params![
                format_optional(&version.created),
                version.downloads,
                version.updates,
                &version.artifact,
                version_id,
            ],
        )
        .map_err(db_err)?;

        Ok(())
    }
}

impl PluginStore for SqlitePluginStore {
    fn merge_upstream(&self, upsert: &PluginUpsert) -> Result<MergeOutcome, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err)?;

        let (plugin_id, plugin_created) =
            match Self::plugin_id_for_upstream(&tx, upsert.upstream_id)? {
                Some(id) => {
                    Self::update_upstream_plugin(&tx, id, upsert)?;
                    (id, false)
                }
                None => match Self::insert_upstream_plugin(&tx, upsert)? {
                    Some(id) => (id, true),
                    None => {
                        // Someone else inserted it between our read and write
                        let id = Self::plugin_id_for_upstream(&tx, upsert.upstream_id)?
                            .ok_or_else(|| {
                                StoreError::Database(format!(
                                    "upstream plugin {} vanished during merge",
                                    upsert.upstream_id
                                ))
                            })?;
                        Self::update_upstream_plugin(&tx, id, upsert)?;
                        (id, false)
                    }
                },
            };

        let mut outcome = MergeOutcome {
            plugin_id,
            plugin_created,
            ..Default::default()
        };

        let mut existing = Self::version_ids_by_key(&tx, plugin_id)?;

        for version in &upsert.versions {
            let key = (version.name.clone(), version.hash.clone());

            if let Some(&version_id) = existing.get(&key) {
                Self::update_upstream_version(&tx, version_id, version)?;
                outcome.versions_updated += 1;
                continue;
            }

            let version_id = match Self::insert_upstream_version(&tx, plugin_id, version)? {
                Some(id) => {
                    outcome.versions_created += 1;
                    id
                }
                None => {
                    let id = Self::version_id(&tx, plugin_id, &version.name, &version.hash)?
                        .ok_or_else(|| {
                            StoreError::Database(format!(
                                "version {} ({}) vanished during merge",
                                version.name, version.hash
                            ))
                        })?;
                    Self::update_upstream_version(&tx, id, version)?;
                    outcome.versions_updated += 1;
                    id
                }
            };
            existing.insert(key, version_id);
        }

        tx.commit().map_err(db_err)?;

        debug!(
            upstream_id = upsert.upstream_id,
            plugin_id,
            plugin_created,
            versions_created = outcome.versions_created,
            versions_updated = outcome.versions_updated,
            "Merged upstream plugin"
        );

        Ok(outcome)
    }

    fn list_plugins(&self, filter: &PluginFilter) -> Result<Vec<Plugin>, StoreError> {
        let conn = self.lock()?;

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!(
            "SELECT {} FROM plugins {} ORDER BY id ASC",
            PLUGIN_COLUMNS, where_clause
        );

        let mut stmt = conn.prepare(&sql).map_err(db_err)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), Self::row_to_plugin)
            .map_err(db_err)?;

        let mut plugins = Vec::new();
        for row in rows {
            let mut plugin = row.map_err(db_err)?;
            plugin.versions = Self::load_versions(&conn, plugin.id)?;
            plugins.push(plugin);
        }

        Ok(plugins)
    }

    fn get_plugin(&self, id: i64) -> Result<Plugin, StoreError> {
        let conn = self.lock()?;
        Self::load_plugin(&conn, id)
    }

    fn find_by_upstream_id(&self, upstream_id: i64) -> Result<Option<Plugin>, StoreError> {
        let conn = self.lock()?;
        match Self::plugin_id_for_upstream(&conn, upstream_id)? {
            Some(id) => Self::load_plugin(&conn, id).map(Some),
            None => Ok(None),
        }
    }

    fn create_plugin(&self, plugin: NewPlugin) -> Result<Plugin, StoreError> {
        let conn = self.lock()?;
        let now = format_iso8601(&Utc::now());
        let tags =
            serde_json::to_string(&plugin.tags).map_err(|e| StoreError::Database(e.to_string()))?;

        conn.execute(
            "INSERT INTO plugins (upstream_id, name, author, description, tags, visible, image_url, downloads, updates, created, updated)
             VALUES (NULL, ?, ?, ?, ?, 0, ?, 0, 0, ?, ?)",
            params![
                &plugin.name,
                &plugin.author,
                &plugin.description,
                tags,
                &plugin.image_url,
                &now,
                &now,
            ],
        )
        .map_err(db_err)?;

        Self::load_plugin(&conn, conn.last_insert_rowid())
    }

    fn publish_version(
        &self,
        plugin_id: i64,
        version: NewPluginVersion,
    ) -> Result<PluginVersion, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err)?;

        if !Self::plugin_exists(&tx, plugin_id)? {
            return Err(StoreError::PluginNotFound(plugin_id.to_string()));
        }

        let created = version.created.unwrap_or_else(Utc::now);

        tx.execute(
            "INSERT INTO plugin_versions (plugin_id, name, hash, artifact, created, downloads, updates)
             VALUES (?, ?, ?, ?, ?, 0, 0)",
            params![
                plugin_id,
                &version.name,
                &version.hash,
                &version.artifact,
                format_iso8601(&created),
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(ref err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Conflict(format!(
                    "version {} ({}) already exists for plugin {}",
                    version.name, version.hash, plugin_id
                ))
            }
            _ => db_err(e),
        })?;

        let version_id = tx.last_insert_rowid();
        tx.commit().map_err(db_err)?;

        Ok(PluginVersion {
            id: version_id,
            plugin_id,
            name: version.name,
            hash: version.hash,
            artifact: version.artifact,
            created: parse_iso8601(&format_iso8601(&created)),
            downloads: 0,
            updates: 0,
        })
    }

    fn set_visibility(&self, plugin_id: i64, visible: bool) -> Result<Plugin, StoreError> {
        let conn = self.lock()?;

        let rows_affected = conn
            .execute(
                "UPDATE plugins SET visible = ? WHERE id = ?",
                params![visible, plugin_id],
            )
            .map_err(db_err)?;

        if rows_affected == 0 {
            return Err(StoreError::PluginNotFound(plugin_id.to_string()));
        }

        Self::load_plugin(&conn, plugin_id)
    }

    fn list_versions(&self, plugin_id: i64) -> Result<Vec<PluginVersion>, StoreError> {
        let conn = self.lock()?;

        if !Self::plugin_exists(&conn, plugin_id)? {
            return Err(StoreError::PluginNotFound(plugin_id.to_string()));
        }

        Self::load_versions(&conn, plugin_id)
    }

    fn increment_counters(
        &self,
        plugin_name: &str,
        version_name: &str,
        kind: CounterKind,
    ) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err)?;

        let plugin_id: i64 = tx
            .query_row(
                "SELECT id FROM plugins WHERE name = ? ORDER BY id ASC LIMIT 1",
                params![plugin_name],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?
            .ok_or_else(|| StoreError::PluginNotFound(plugin_name.to_string()))?;

        let version_id: i64 = tx
            .query_row(
                "SELECT id FROM plugin_versions WHERE plugin_id = ? AND name = ? ORDER BY id ASC LIMIT 1",
                params![plugin_id, version_name],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?
            .ok_or_else(|| StoreError::VersionNotFound {
                plugin: plugin_name.to_string(),
                version: version_name.to_string(),
            })?;

        let column = kind.column();
        tx.execute(
            &format!("UPDATE plugins SET {0} = {0} + 1 WHERE id = ?", column),
            params![plugin_id],
        )
        .map_err(db_err)?;
        tx.execute(
            &format!("UPDATE plugin_versions SET {0} = {0} + 1 WHERE id = ?", column),
            params![version_id],
        )
        .map_err(db_err)?;

        tx.commit().map_err(db_err)?;
        Ok(())
    }

    fn delete_plugin(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.lock()?;

        // Versions go with it (ON DELETE CASCADE)
        let rows_affected = conn
            .execute("DELETE FROM plugins WHERE id = ?", params![id])
            .map_err(db_err)?;

        if rows_affected == 0 {
            return Err(StoreError::PluginNotFound(id.to_string()));
        }

        Ok(())
    }
}

fn db_err(e: rusqlite::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

fn format_optional(dt: &Option<DateTime<Utc>>) -> Option<String> {
    dt.as_ref().map(format_iso8601)
}

/// `%term%` with LIKE wildcards in the term escaped.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
