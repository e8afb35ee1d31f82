//! Document storage for items, topics and articles
//!
//! SQLite-backed. Topics are keyed by label and articles by a UNIQUE slug;
//! the topic -> article link is only ever written by a conditional update
//! so a topic gains at most one article.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use pulse_core::{
    Article, Engagement, PulseError, PulseResult, RelatedInstruments, ScrapedItem, SourceType,
    TrendingTopic,
};
use pulse_embedding::store::encode_vector;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use serde::Serialize;
use tracing::{debug, info, instrument};

/// Result of inserting an article
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// Another article already owns the slug; nothing was written
    DuplicateSlug,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentStats {
    pub items: usize,
    pub pending_items: usize,
    pub topics: usize,
    pub pending_topics: usize,
    pub rejected_topics: usize,
    pub articles: usize,
}

/// Persistence seam for the pipeline's documents
pub trait DocumentStore: Send + Sync {
    /// Insert or refresh scraped items; an item's embedding and processed flag survive re-ingest
    fn upsert_items(&self, items: &[ScrapedItem]) -> PulseResult<usize>;

    /// The newest `limit` unprocessed items published at or after `since`, returned in scrape order
    ///
    /// Items that never make it into an article stay unprocessed, so taking the
    /// oldest rows would let them starve fresher items for the whole window.
    fn pending_items(&self, since: DateTime<Utc>, limit: usize) -> PulseResult<Vec<ScrapedItem>>;

    fn attach_embedding(&self, item_id: &str, embedding: &[f32]) -> PulseResult<()>;

    /// Returns how many items changed state
    fn mark_items_processed(&self, item_ids: &[String]) -> PulseResult<usize>;

    /// Overwrite a topic's statistics, keeping its article links
    fn upsert_topic(&self, topic: &TrendingTopic) -> PulseResult<()>;

    fn get_topic(&self, label: &str) -> PulseResult<Option<TrendingTopic>>;

    /// Topics without an article that were never rejected, highest score first
    fn pending_topics(&self, limit: usize) -> PulseResult<Vec<TrendingTopic>>;

    /// Record a validation rejection; the topic leaves the pending queue for good
    fn reject_topic(&self, label: &str, reason: &str) -> PulseResult<bool>;

    /// Link an article to a topic only if the topic has none yet
    fn link_article(&self, label: &str, article_id: &str) -> PulseResult<bool>;

    fn insert_article(&self, article: &Article) -> PulseResult<InsertOutcome>;

    fn article_id_by_slug(&self, slug: &str) -> PulseResult<Option<String>>;

    fn get_article(&self, id: &str) -> PulseResult<Option<Article>>;

    fn stats(&self) -> PulseResult<DocumentStats>;
}

fn db_err(e: rusqlite::Error) -> PulseError {
    PulseError::database(e.to_string())
}

fn to_json<T: Serialize>(value: &T) -> PulseResult<String> {
    serde_json::to_string(value).map_err(|e| PulseError::internal(e.to_string()))
}

fn millis_to_utc(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

/// Raw little-endian f32s; the caller decides whether the dimension fits
fn decode_embedding(item_id: &str, bytes: &[u8]) -> PulseResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(PulseError::data_integrity(format!(
            "item {} has a malformed embedding ({} bytes)",
            item_id,
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// SQLite implementation of [`DocumentStore`]
pub struct SqliteDocumentStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDocumentStore {
    /// Open (creating if needed) the database at `db_path`
    #[instrument(skip(db_path))]
    pub fn new<P: AsRef<Path>>(db_path: P) -> PulseResult<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    PulseError::database(format!("Failed to create database directory: {}", e))
                })?;
            }
        }

        info!("Opening document database: {}", db_path.as_ref().display());
        let conn = Connection::open(db_path).map_err(db_err)?;
        Self::from_connection(conn)
    }

    /// In-memory store (for testing)
    pub fn new_in_memory() -> PulseResult<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> PulseResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> PulseResult<()> {
        let conn = self.conn.lock();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                source_type TEXT NOT NULL,
                source_url TEXT NOT NULL,
                published_at INTEGER NOT NULL,
                scraped_at INTEGER NOT NULL,
                related_instruments TEXT NOT NULL,
                engagement TEXT NOT NULL,
                embedding BLOB,
                processed INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_items_pending
            ON items(processed, published_at);

            CREATE TABLE IF NOT EXISTS topics (
                topic TEXT PRIMARY KEY,
                category TEXT NOT NULL,
                trending_score REAL NOT NULL,
                detected_at INTEGER NOT NULL,
                data TEXT NOT NULL,
                articles_generated TEXT NOT NULL DEFAULT '[]',
                rejected_at INTEGER,
                reject_reason TEXT
            );

            CREATE TABLE IF NOT EXISTS articles (
                id TEXT PRIMARY KEY,
                slug TEXT NOT NULL,
                title TEXT NOT NULL,
                category TEXT NOT NULL,
                related_symbol TEXT,
                published_at INTEGER NOT NULL,
                data TEXT NOT NULL
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_articles_slug ON articles(slug);
            "#,
        )
        .map_err(db_err)?;

        // Databases created before rejections were persisted
        let has_rejections: bool = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('topics') WHERE name = 'rejected_at'",
                [],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n > 0)
            .map_err(db_err)?;
        if !has_rejections {
            info!("Adding rejection columns to topics");
            conn.execute_batch(
                "ALTER TABLE topics ADD COLUMN rejected_at INTEGER; \
                 ALTER TABLE topics ADD COLUMN reject_reason TEXT;",
            )
            .map_err(db_err)?;
        }

        debug!("Document schema initialized");
        Ok(())
    }

    fn row_to_item(row: &Row<'_>) -> rusqlite::Result<(ScrapedItem, Option<Vec<u8>>)> {
        let id: String = row.get(0)?;
        let source_type: String = row.get(3)?;
        let instruments: String = row.get(7)?;
        let engagement: String = row.get(8)?;
        let embedding: Option<Vec<u8>> = row.get(9)?;
        let processed: i64 = row.get(10)?;

        let item = ScrapedItem {
            title: row.get(1)?,
            body: row.get(2)?,
            source_type: serde_json::from_value(serde_json::Value::String(source_type))
                .unwrap_or(SourceType::Site),
            source_url: row.get(4)?,
            published_at: millis_to_utc(row.get(5)?),
            scraped_at: millis_to_utc(row.get(6)?),
            related_instruments: serde_json::from_str::<RelatedInstruments>(&instruments)
                .unwrap_or_default(),
            engagement: serde_json::from_str::<Engagement>(&engagement).unwrap_or_default(),
            embedding: None,
            processed: processed != 0,
            id,
        };
        Ok((item, embedding))
    }

    fn read_topic(data: &str, articles: &str) -> PulseResult<TrendingTopic> {
        let mut topic: TrendingTopic = serde_json::from_str(data)
            .map_err(|e| PulseError::parse(format!("Corrupt topic row: {}", e)))?;
        topic.articles_generated = serde_json::from_str(articles)
            .map_err(|e| PulseError::parse(format!("Corrupt article links: {}", e)))?;
        Ok(topic)
    }
}

const ITEM_COLUMNS: &str = "id, title, body, source_type, source_url, published_at, scraped_at, \
                            related_instruments, engagement, embedding, processed";

impl DocumentStore for SqliteDocumentStore {
    fn upsert_items(&self, items: &[ScrapedItem]) -> PulseResult<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db_err)?;
        {
            let mut stmt = tx
                .prepare(
                    r#"
                    INSERT INTO items (id, title, body, source_type, source_url, published_at,
                                       scraped_at, related_instruments, engagement, embedding, processed)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                    ON CONFLICT(id) DO UPDATE SET
                        title = excluded.title,
                        body = excluded.body,
                        engagement = excluded.engagement,
                        related_instruments = excluded.related_instruments,
                        embedding = COALESCE(items.embedding, excluded.embedding),
                        processed = MAX(items.processed, excluded.processed)
                    "#,
                )
                .map_err(db_err)?;

            for item in items {
                stmt.execute(params![
                    item.id,
                    item.title,
                    item.body,
                    item.source_type.as_str(),
                    item.source_url,
                    item.published_at.timestamp_millis(),
                    item.scraped_at.timestamp_millis(),
                    to_json(&item.related_instruments)?,
                    to_json(&item.engagement)?,
                    item.embedding.as_deref().map(encode_vector),
                    item.processed as i64,
                ])
                .map_err(db_err)?;
            }
        }
        tx.commit().map_err(db_err)?;

        debug!(count = items.len(), "Items upserted");
        Ok(items.len())
    }

    fn pending_items(&self, since: DateTime<Utc>, limit: usize) -> PulseResult<Vec<ScrapedItem>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {cols} FROM (\
                     SELECT {cols} FROM items WHERE processed = 0 AND published_at >= ?1 \
                     ORDER BY scraped_at DESC, id DESC LIMIT ?2\
                 ) ORDER BY scraped_at ASC, id ASC",
                cols = ITEM_COLUMNS
            ))
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![since.timestamp_millis(), limit as i64], Self::row_to_item)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;

        rows.into_iter()
            .map(|(mut item, blob)| {
                if let Some(bytes) = blob {
                    item.embedding = Some(decode_embedding(&item.id, &bytes)?);
                }
                Ok(item)
            })
            .collect()
    }

    fn attach_embedding(&self, item_id: &str, embedding: &[f32]) -> PulseResult<()> {
        let conn = self.conn.lock();
        let updated = conn
            .execute(
                "UPDATE items SET embedding = ?2 WHERE id = ?1",
                params![item_id, encode_vector(embedding)],
            )
            .map_err(db_err)?;
        if updated == 0 {
            return Err(PulseError::not_found(format!("item {}", item_id)));
        }
        Ok(())
    }

    fn mark_items_processed(&self, item_ids: &[String]) -> PulseResult<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db_err)?;
        let mut changed = 0;
        {
            let mut stmt = tx
                .prepare("UPDATE items SET processed = 1 WHERE id = ?1 AND processed = 0")
                .map_err(db_err)?;
            for id in item_ids {
                changed += stmt.execute(params![id]).map_err(db_err)?;
            }
        }
        tx.commit().map_err(db_err)?;
        Ok(changed)
    }

    fn upsert_topic(&self, topic: &TrendingTopic) -> PulseResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT INTO topics (topic, category, trending_score, detected_at, data, articles_generated)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(topic) DO UPDATE SET
                category = excluded.category,
                trending_score = excluded.trending_score,
                detected_at = excluded.detected_at,
                data = excluded.data
            "#,
            params![
                topic.topic,
                topic.category.as_str(),
                topic.trending_score,
                topic.detected_at.timestamp_millis(),
                to_json(topic)?,
                to_json(&topic.articles_generated)?,
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn get_topic(&self, label: &str) -> PulseResult<Option<TrendingTopic>> {
        let conn = self.conn.lock();
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT data, articles_generated FROM topics WHERE topic = ?1",
                params![label],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(db_err)?;

        row.map(|(data, articles)| Self::read_topic(&data, &articles))
            .transpose()
    }

    fn pending_topics(&self, limit: usize) -> PulseResult<Vec<TrendingTopic>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT data, articles_generated FROM topics \
                 WHERE articles_generated = '[]' AND rejected_at IS NULL \
                 ORDER BY trending_score DESC, detected_at DESC, topic ASC LIMIT ?1",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;

        rows.iter()
            .map(|(data, articles)| Self::read_topic(data, articles))
            .collect()
    }

    fn reject_topic(&self, label: &str, reason: &str) -> PulseResult<bool> {
        let conn = self.conn.lock();
        let updated = conn
            .execute(
                "UPDATE topics SET rejected_at = ?2, reject_reason = ?3 \
                 WHERE topic = ?1 AND rejected_at IS NULL",
                params![label, Utc::now().timestamp_millis(), reason],
            )
            .map_err(db_err)?;
        Ok(updated == 1)
    }

    fn link_article(&self, label: &str, article_id: &str) -> PulseResult<bool> {
        let conn = self.conn.lock();
        let links = to_json(&vec![article_id])?;
        let updated = conn
            .execute(
                "UPDATE topics SET articles_generated = ?2 \
                 WHERE topic = ?1 AND articles_generated = '[]'",
                params![label, links],
            )
            .map_err(db_err)?;
        Ok(updated == 1)
    }

    fn insert_article(&self, article: &Article) -> PulseResult<InsertOutcome> {
        let conn = self.conn.lock();
        let result = conn.execute(
            r#"
            INSERT INTO articles (id, slug, title, category, related_symbol, published_at, data)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                article.id,
                article.slug,
                article.title,
                article.category.as_str(),
                article.related_symbol,
                article.published_at.timestamp_millis(),
                to_json(article)?,
            ],
        );

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                debug!(slug = %article.slug, "Slug already taken");
                Ok(InsertOutcome::DuplicateSlug)
            }
            Err(e) => Err(db_err(e)),
        }
    }

    fn article_id_by_slug(&self, slug: &str) -> PulseResult<Option<String>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id FROM articles WHERE slug = ?1",
            params![slug],
            |row| row.get(0),
        )
        .optional()
        .map_err(db_err)
    }

    fn get_article(&self, id: &str) -> PulseResult<Option<Article>> {
        let conn = self.conn.lock();
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM articles WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;

        data.map(|d| {
            serde_json::from_str(&d).map_err(|e| PulseError::parse(format!("Corrupt article row: {}", e)))
        })
        .transpose()
    }

    fn stats(&self) -> PulseResult<DocumentStats> {
        let conn = self.conn.lock();
        let count = |sql: &str| -> PulseResult<usize> {
            conn.query_row(sql, [], |row| row.get::<_, i64>(0))
                .map(|n| n as usize)
                .map_err(db_err)
        };

        Ok(DocumentStats {
            items: count("SELECT COUNT(*) FROM items")?,
            pending_items: count("SELECT COUNT(*) FROM items WHERE processed = 0")?,
            topics: count("SELECT COUNT(*) FROM topics")?,
            pending_topics: count(
                "SELECT COUNT(*) FROM topics WHERE articles_generated = '[]' AND rejected_at IS NULL",
            )?,
            rejected_topics: count("SELECT COUNT(*) FROM topics WHERE rejected_at IS NOT NULL")?,
            articles: count("SELECT COUNT(*) FROM articles")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pulse_core::TopicCategory;

    fn item(id: &str, minutes_ago: i64) -> ScrapedItem {
        let at = Utc::now() - Duration::minutes(minutes_ago);
        ScrapedItem {
            id: id.to_string(),
            title: format!("title {}", id),
            body: "body".to_string(),
            source_type: SourceType::Feed,
            source_url: format!("https://example.com/{}", id),
            published_at: at,
            scraped_at: at,
            related_instruments: RelatedInstruments {
                symbols: vec!["XYZ".to_string()],
                metals: vec![],
            },
            engagement: Engagement {
                upvotes: 3,
                comments: 1,
                shares: 0,
            },
            embedding: None,
            processed: false,
        }
    }

    fn topic(label: &str, score: f64) -> TrendingTopic {
        TrendingTopic {
            topic: label.to_string(),
            category: TopicCategory::Stocks,
            related_symbols: vec!["XYZ".to_string()],
            related_metals: vec![],
            mention_count: 2,
            sources: vec!["feed".to_string()],
            source_urls: vec![],
            item_ids: vec!["a".to_string()],
            trending_score: score,
            detected_at: Utc::now(),
            articles_generated: vec![],
        }
    }

    fn article(id: &str, slug: &str) -> Article {
        Article {
            id: id.to_string(),
            title: "XYZ rallies".to_string(),
            slug: slug.to_string(),
            content: "content".to_string(),
            summary: "summary".to_string(),
            category: TopicCategory::Stocks,
            related_symbol: Some("XYZ".to_string()),
            sources: vec![],
            tldr: vec![],
            faqs: vec![],
            tags: vec![],
            entities: vec![],
            topics: vec![],
            embedding: vec![],
            image: None,
            word_count: 1,
            used_fallback: false,
            published_at: Utc::now(),
        }
    }

    #[test]
    fn test_items_roundtrip_in_scrape_order() {
        let store = SqliteDocumentStore::new_in_memory().unwrap();
        store.upsert_items(&[item("b", 10), item("a", 20), item("old", 60 * 48)]).unwrap();

        let pending = store
            .pending_items(Utc::now() - Duration::hours(24), 10)
            .unwrap();
        let ids: Vec<_> = pending.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(pending[0].engagement.upvotes, 3);
        assert_eq!(pending[0].related_instruments.symbols, vec!["XYZ"]);
        assert_eq!(pending[0].source_type, SourceType::Feed);
    }

    #[test]
    fn test_reingest_keeps_embedding_and_processed() {
        let store = SqliteDocumentStore::new_in_memory().unwrap();
        store.upsert_items(&[item("a", 5), item("b", 5)]).unwrap();
        store.attach_embedding("a", &[0.5, 0.25]).unwrap();
        assert_eq!(store.mark_items_processed(&["b".to_string()]).unwrap(), 1);
        assert_eq!(store.mark_items_processed(&["b".to_string()]).unwrap(), 0);

        store.upsert_items(&[item("a", 5), item("b", 5)]).unwrap();
        let pending = store.pending_items(Utc::now() - Duration::hours(1), 10).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].embedding.as_deref(), Some(&[0.5, 0.25][..]));
    }

    #[test]
    fn test_attach_embedding_unknown_item() {
        let store = SqliteDocumentStore::new_in_memory().unwrap();
        assert!(matches!(
            store.attach_embedding("missing", &[1.0]),
            Err(PulseError::NotFound(_))
        ));
    }

    #[test]
    fn test_topic_upsert_keeps_links() {
        let store = SqliteDocumentStore::new_in_memory().unwrap();
        store.upsert_topic(&topic("XYZ", 0.6)).unwrap();
        assert!(store.link_article("XYZ", "art-1").unwrap());

        // Re-detection overwrites statistics only
        store.upsert_topic(&topic("XYZ", 0.9)).unwrap();
        let stored = store.get_topic("XYZ").unwrap().unwrap();
        assert_eq!(stored.trending_score, 0.9);
        assert_eq!(stored.articles_generated, vec!["art-1"]);
        assert!(store.pending_topics(10).unwrap().is_empty());
    }

    #[test]
    fn test_link_article_is_conditional() {
        let store = SqliteDocumentStore::new_in_memory().unwrap();
        store.upsert_topic(&topic("XYZ", 0.6)).unwrap();
        assert!(store.link_article("XYZ", "first").unwrap());
        assert!(!store.link_article("XYZ", "second").unwrap());
        assert!(!store.link_article("missing", "x").unwrap());

        let stored = store.get_topic("XYZ").unwrap().unwrap();
        assert_eq!(stored.articles_generated, vec!["first"]);
    }

    #[test]
    fn test_pending_topics_by_score() {
        let store = SqliteDocumentStore::new_in_memory().unwrap();
        store.upsert_topic(&topic("low", 0.55)).unwrap();
        store.upsert_topic(&topic("high", 0.9)).unwrap();
        store.upsert_topic(&topic("mid", 0.7)).unwrap();

        let labels: Vec<_> = store
            .pending_topics(2)
            .unwrap()
            .into_iter()
            .map(|t| t.topic)
            .collect();
        assert_eq!(labels, vec!["high", "mid"]);
    }

    #[test]
    fn test_pending_items_prefers_newest() {
        let store = SqliteDocumentStore::new_in_memory().unwrap();
        store
            .upsert_items(&[item("old1", 50), item("old2", 40), item("new1", 20), item("new2", 10)])
            .unwrap();

        let ids: Vec<_> = store
            .pending_items(Utc::now() - Duration::hours(1), 2)
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec!["new1", "new2"]);
    }

    #[test]
    fn test_rejected_topic_leaves_queue() {
        let store = SqliteDocumentStore::new_in_memory().unwrap();
        store.upsert_topic(&topic("QQQQ", 0.9)).unwrap();
        store.upsert_topic(&topic("XYZ", 0.6)).unwrap();

        assert!(store.reject_topic("QQQQ", "unknown instrument").unwrap());
        assert!(!store.reject_topic("QQQQ", "unknown instrument").unwrap());

        // Re-detection does not bring it back
        store.upsert_topic(&topic("QQQQ", 0.95)).unwrap();
        let labels: Vec<_> = store
            .pending_topics(1)
            .unwrap()
            .into_iter()
            .map(|t| t.topic)
            .collect();
        assert_eq!(labels, vec!["XYZ"]);

        let stats = store.stats().unwrap();
        assert_eq!(stats.pending_topics, 1);
        assert_eq!(stats.rejected_topics, 1);
    }

    #[test]
    fn test_legacy_topics_table_gains_rejection_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE topics (
                    topic TEXT PRIMARY KEY,
                    category TEXT NOT NULL,
                    trending_score REAL NOT NULL,
                    detected_at INTEGER NOT NULL,
                    data TEXT NOT NULL,
                    articles_generated TEXT NOT NULL DEFAULT '[]'
                );",
            )
            .unwrap();
        }

        let store = SqliteDocumentStore::new(&path).unwrap();
        store.upsert_topic(&topic("QQQQ", 0.9)).unwrap();
        assert!(store.reject_topic("QQQQ", "too generic").unwrap());
        assert!(store.pending_topics(10).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_slug_rejected() {
        let store = SqliteDocumentStore::new_in_memory().unwrap();
        assert_eq!(store.insert_article(&article("1", "xyz-rallies")).unwrap(), InsertOutcome::Inserted);
        assert_eq!(
            store.insert_article(&article("2", "xyz-rallies")).unwrap(),
            InsertOutcome::DuplicateSlug
        );
        assert_eq!(store.article_id_by_slug("xyz-rallies").unwrap().as_deref(), Some("1"));
        assert!(store.get_article("2").unwrap().is_none());
        assert_eq!(store.get_article("1").unwrap().unwrap().slug, "xyz-rallies");
        assert_eq!(store.stats().unwrap().articles, 1);
    }

    #[test]
    fn test_file_backed_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("pulse.db");
        {
            let store = SqliteDocumentStore::new(&path).unwrap();
            store.upsert_items(&[item("a", 1)]).unwrap();
        }
        let store = SqliteDocumentStore::new(&path).unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.items, 1);
        assert_eq!(stats.pending_items, 1);
    }
}
