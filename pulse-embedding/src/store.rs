//! SQLite storage for embeddings using rusqlite
//!
//! Doubles as the brute-force search backend: a query scans the most
//! recently updated `scan_limit` rows of a domain and ranks them by cosine
//! similarity.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info, instrument};

use crate::{
    error::{EmbeddingError, Result},
    similarity::{cosine_similarity, rank_matches},
    similarity_store::VectorStore,
    types::{IndexDomain, IndexedVector, SimilarityMatch},
};

/// Default number of recent rows scanned per brute-force query
pub const DEFAULT_SCAN_LIMIT: usize = 1000;

/// SQLite store for embeddings
pub struct EmbeddingStore {
    conn: Arc<Mutex<Connection>>,
    dimension: usize,
    scan_limit: usize,
}

impl EmbeddingStore {
    /// Create a new embedding store
    ///
    /// # Arguments
    /// * `database_path` - Path to SQLite database file
    /// * `dimension` - Dimension every stored vector must have
    #[instrument(skip(database_path))]
    pub fn new<P: AsRef<Path> + std::fmt::Debug>(database_path: P, dimension: usize) -> Result<Self> {
        info!("Opening embedding database: {:?}", database_path.as_ref());
        let conn = Connection::open(database_path.as_ref())
            .map_err(|e| EmbeddingError::Database(format!("Failed to open database: {}", e)))?;
        Self::from_connection(conn, dimension)
    }

    /// Create an in-memory store (for testing)
    pub fn new_in_memory(dimension: usize) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            EmbeddingError::Database(format!("Failed to create in-memory DB: {}", e))
        })?;
        Self::from_connection(conn, dimension)
    }

    fn from_connection(conn: Connection, dimension: usize) -> Result<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            dimension,
            scan_limit: DEFAULT_SCAN_LIMIT,
        };
        store.init_tables()?;
        Ok(store)
    }

    /// Cap the number of rows a brute-force search considers
    pub fn with_scan_limit(mut self, scan_limit: usize) -> Self {
        self.scan_limit = scan_limit;
        self
    }

    /// Initialize database tables
    fn init_tables(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS vectors (
                domain TEXT NOT NULL,
                id TEXT NOT NULL,
                dimension INTEGER NOT NULL,
                embedding BLOB NOT NULL,
                metadata TEXT NOT NULL,
                text TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (domain, id)
            );

            CREATE INDEX IF NOT EXISTS idx_vectors_domain_updated
            ON vectors(domain, updated_at);",
        )?;

        info!("Embedding database tables initialized");
        Ok(())
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(EmbeddingError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    /// Fetch one stored vector
    pub fn get(&self, domain: IndexDomain, id: &str) -> Result<Option<IndexedVector>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT id, embedding, metadata, text FROM vectors WHERE domain = ? AND id = ?",
                params![domain.as_str(), id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;
        drop(conn);

        row.map(|(id, bytes, metadata, text)| self.decode_row(id, bytes, metadata, text))
            .transpose()
    }

    /// Load the most recently updated vectors of a domain (newest first)
    #[instrument(skip(self))]
    pub fn load_recent(&self, domain: IndexDomain, limit: usize) -> Result<Vec<IndexedVector>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, embedding, metadata, text
             FROM vectors
             WHERE domain = ?
             ORDER BY updated_at DESC, rowid DESC
             LIMIT ?",
        )?;

        let rows = stmt.query_map(params![domain.as_str(), limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut results = Vec::new();
        for row in rows {
            let (id, bytes, metadata, text) = row?;
            results.push(self.decode_row(id, bytes, metadata, text)?);
        }

        debug!("Loaded {} vectors from {}", results.len(), domain);
        Ok(results)
    }

    /// Load every vector of a domain
    pub fn load_all(&self, domain: IndexDomain) -> Result<Vec<IndexedVector>> {
        self.load_recent(domain, i64::MAX as usize)
    }

    fn decode_row(
        &self,
        id: String,
        bytes: Vec<u8>,
        metadata: String,
        text: String,
    ) -> Result<IndexedVector> {
        let vector = decode_vector(&id, &bytes, self.dimension)?;
        let metadata = serde_json::from_str(&metadata)?;
        Ok(IndexedVector {
            id,
            vector,
            metadata,
            text,
        })
    }

    /// Get statistics about stored embeddings
    pub fn get_stats(&self) -> Result<EmbeddingStats> {
        let conn = self.conn.lock();

        let count = |domain: IndexDomain| -> usize {
            conn.query_row(
                "SELECT COUNT(*) FROM vectors WHERE domain = ?",
                params![domain.as_str()],
                |row| row.get::<_, i64>(0),
            )
            .unwrap_or(0) as usize
        };

        Ok(EmbeddingStats {
            scraped_item_count: count(IndexDomain::ScrapedItems),
            article_count: count(IndexDomain::Articles),
            topic_count: count(IndexDomain::Topics),
        })
    }
}

impl VectorStore for EmbeddingStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[instrument(skip(self, vector, metadata, text))]
    fn upsert(
        &self,
        domain: IndexDomain,
        id: &str,
        vector: &[f32],
        metadata: serde_json::Value,
        text: &str,
    ) -> Result<()> {
        self.check_dimension(vector)?;
        let metadata = serde_json::to_string(&metadata)?;
        let conn = self.conn.lock();

        conn.execute(
            "INSERT INTO vectors (domain, id, dimension, embedding, metadata, text, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(domain, id) DO UPDATE SET
                dimension = excluded.dimension,
                embedding = excluded.embedding,
                metadata = excluded.metadata,
                text = excluded.text,
                updated_at = excluded.updated_at",
            params![
                domain.as_str(),
                id,
                vector.len() as i64,
                encode_vector(vector),
                metadata,
                text,
                Utc::now().timestamp_millis(),
            ],
        )?;

        debug!("Saved {} vector: {}", domain, id);
        Ok(())
    }

    fn search(
        &self,
        domain: IndexDomain,
        query: &[f32],
        k: usize,
        min_similarity: f64,
    ) -> Result<Vec<SimilarityMatch>> {
        self.check_dimension(query)?;

        let candidates = self.load_recent(domain, self.scan_limit)?;
        let mut hits = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let similarity = cosine_similarity(query, &candidate.vector)?;
            hits.push(SimilarityMatch {
                id: candidate.id,
                similarity,
                metadata: candidate.metadata,
                text: candidate.text,
            });
        }

        Ok(rank_matches(hits, k, min_similarity))
    }

    fn contains(&self, domain: IndexDomain, id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let found = conn
            .query_row(
                "SELECT 1 FROM vectors WHERE domain = ? AND id = ?",
                params![domain.as_str(), id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

/// Statistics about embedding storage
#[derive(Debug, Clone)]
pub struct EmbeddingStats {
    pub scraped_item_count: usize,
    pub article_count: usize,
    pub topic_count: usize,
}

/// Encode a vector as little-endian f32 bytes
pub fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|x| x.to_le_bytes()).collect()
}

/// Decode little-endian f32 bytes, rejecting blobs of the wrong length
pub fn decode_vector(id: &str, bytes: &[u8], dimension: usize) -> Result<Vec<f32>> {
    let expected = dimension * 4;
    if bytes.len() != expected {
        return Err(EmbeddingError::MalformedVector {
            id: id.to_string(),
            bytes: bytes.len(),
            expected,
        });
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}
