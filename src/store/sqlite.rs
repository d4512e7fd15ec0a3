//! SQLite-based response store implementation.
//!
//! Responses are kept in insertion order by an explicit `position` column.
//! Embeddings are stored as little-endian f32 blobs and ranked in Rust.

use super::{parse_form_id, Field, Form, FormSummary, NewForm, Response, ResponseStore};
use crate::error::{FormragError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument};
use uuid::Uuid;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS forms (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        fields_json TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS responses (
        id TEXT PRIMARY KEY,
        form_id TEXT NOT NULL REFERENCES forms(id),
        position INTEGER NOT NULL,
        data_json TEXT NOT NULL,
        embedding BLOB NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE UNIQUE INDEX IF NOT EXISTS idx_responses_form_position
        ON responses(form_id, position);
"#;

/// SQLite-based response store.
///
/// Queries run on the blocking thread pool, one at a time.
pub struct SqliteResponseStore {
    conn: Arc<Mutex<Connection>>,
}

type FormRow = (String, String, String, String);

impl SqliteResponseStore {
    /// Open (or create) a store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite response store at {:?}", path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory SQLite store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|e| FormragError::Store(format!("Failed to acquire lock: {}", e)))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| FormragError::Store(format!("Store task failed: {}", e)))?
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Result<Vec<f32>> {
        if bytes.len() % 4 != 0 {
            return Err(FormragError::Store(format!(
                "Corrupt embedding blob of {} bytes",
                bytes.len()
            )));
        }
        Ok(bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect())
    }

    fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| FormragError::Store(format!("Bad timestamp {:?}: {}", value, e)))
    }

    fn parse_uuid(value: &str) -> Result<Uuid> {
        Uuid::parse_str(value).map_err(|e| FormragError::Store(format!("Bad id {:?}: {}", value, e)))
    }

    fn insert_responses(
        tx: &Transaction<'_>,
        form_id: &str,
        start: i64,
        responses: &[Response],
    ) -> Result<()> {
        let mut stmt = tx.prepare(
            r#"
            INSERT INTO responses (id, form_id, position, data_json, embedding, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )?;

        for (offset, response) in responses.iter().enumerate() {
            stmt.execute(params![
                response.id.to_string(),
                form_id,
                start + offset as i64,
                serde_json::to_string(&response.data)?,
                Self::embedding_to_bytes(&response.embedding),
                response.created_at.to_rfc3339(),
            ])?;
        }
        Ok(())
    }

    fn load_form_row(conn: &Connection, form_id: &str) -> Result<FormRow> {
        conn.query_row(
            "SELECT id, name, fields_json, created_at FROM forms WHERE id = ?1",
            params![form_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .optional()?
        .ok_or_else(|| FormragError::FormNotFound(form_id.to_string()))
    }

    fn load_responses(conn: &Connection, form_id: &str) -> Result<Vec<Response>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, data_json, embedding, created_at
            FROM responses
            WHERE form_id = ?1
            ORDER BY position
            "#,
        )?;

        let rows = stmt
            .query_map(params![form_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let responses = rows
            .into_iter()
            .map(|(id, data_json, embedding, created_at)| {
                Ok(Response {
                    id: Self::parse_uuid(&id)?,
                    data: serde_json::from_str(&data_json)?,
                    embedding: Self::bytes_to_embedding(&embedding)?,
                    created_at: Self::parse_timestamp(&created_at)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("Loaded {} responses for form {}", responses.len(), form_id);
        Ok(responses)
    }
}

#[async_trait]
impl ResponseStore for SqliteResponseStore {
    #[instrument(skip(self, form), fields(name = %form.name, responses = form.responses.len()))]
    async fn create_form(&self, form: NewForm) -> Result<Form> {
        let form = Form {
            id: Uuid::new_v4(),
            name: form.name,
            fields: form.fields,
            responses: form.responses,
            created_at: Utc::now(),
        };
        self.with_conn(move |conn| {
            let form_id = form.id.to_string();
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO forms (id, name, fields_json, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    form_id,
                    form.name,
                    serde_json::to_string(&form.fields)?,
                    form.created_at.to_rfc3339(),
                ],
            )?;
            Self::insert_responses(&tx, &form_id, 0, &form.responses)?;
            tx.commit()?;

            info!("Created form {} with {} responses", form_id, form.responses.len());
            Ok(form)
        })
        .await
    }

    #[instrument(skip(self, responses), fields(count = responses.len()))]
    async fn append_responses(&self, form_id: &str, responses: Vec<Response>) -> Result<usize> {
        let id = parse_form_id(form_id)?.to_string();
        let requested = form_id.to_string();

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;

            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM forms WHERE id = ?1)",
                params![id],
                |row| row.get(0),
            )?;
            if !exists {
                return Err(FormragError::FormNotFound(requested));
            }

            let next: i64 = tx.query_row(
                "SELECT COALESCE(MAX(position) + 1, 0) FROM responses WHERE form_id = ?1",
                params![id],
                |row| row.get(0),
            )?;
            Self::insert_responses(&tx, &id, next, &responses)?;

            let total: i64 = tx.query_row(
                "SELECT COUNT(*) FROM responses WHERE form_id = ?1",
                params![id],
                |row| row.get(0),
            )?;
            tx.commit()?;

            info!("Appended {} responses to form {}", responses.len(), id);
            Ok(total as usize)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn list_forms(&self) -> Result<Vec<FormSummary>> {
        let rows = self
            .with_conn(|conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT f.id, f.name, COUNT(r.id), f.created_at
                    FROM forms f
                    LEFT JOIN responses r ON r.form_id = f.id
                    GROUP BY f.id
                    ORDER BY f.created_at, f.id
                    "#,
                )?;

                let rows = stmt
                    .query_map([], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, i64>(2)?,
                            row.get::<_, String>(3)?,
                        ))
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;

        rows.into_iter()
            .map(|(id, name, count, created_at)| {
                Ok(FormSummary {
                    id: Self::parse_uuid(&id)?,
                    name,
                    response_count: count as usize,
                    created_at: Self::parse_timestamp(&created_at)?,
                })
            })
            .collect()
    }

    #[instrument(skip(self))]
    async fn get_form(&self, form_id: &str) -> Result<Form> {
        let id = parse_form_id(form_id)?.to_string();

        self.with_conn(move |conn| {
            let (row_id, name, fields_json, created_at) = Self::load_form_row(conn, &id)?;
            let fields: Vec<Field> = serde_json::from_str(&fields_json)?;
            let responses = Self::load_responses(conn, &id)?;

            Ok(Form {
                id: Self::parse_uuid(&row_id)?,
                name,
                fields,
                responses,
                created_at: Self::parse_timestamp(&created_at)?,
            })
        })
        .await
    }

    #[instrument(skip(self))]
    async fn fetch_responses(&self, form_id: &str) -> Result<Vec<Response>> {
        let id = parse_form_id(form_id)?.to_string();

        self.with_conn(move |conn| {
            Self::load_form_row(conn, &id)?;
            Self::load_responses(conn, &id)
        })
        .await
    }
}
