//! SQLite storage backend for citewalk

use super::traits::{
    MetadataUpdate, OpenStore, PaperQuery, PaperStore, StorageError, StorageResult,
};
use crate::paper::{
    Author, EvaluationRecord, PaperId, PaperRecord, PaperState, Relevance, SearchId,
    SearchInvocation, SearchKind,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Paper columns in the order `read_paper_row` expects, qualified by the `p` alias.
const PAPER_COLUMNS: &str = "p.paper_id, p.title, p.abstract, p.authors_json, p.year, \
     p.citation_count, p.reference_count, p.relevance_score, p.relevance_reasoning, p.state, \
     p.venue, p.journal, p.url, p.is_open_access, p.pdf_url, p.created_at, p.updated_at";

/// SQLite-backed paper store
///
/// Uses a single SQLite database file holding papers, their reference and
/// citation edges, the search log with its provenance join table, concepts
/// and evaluations. Thread-safe via internal mutex on the connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

/// Raw column values of one `papers` row
struct PaperRow {
    paper_id: String,
    title: Option<String>,
    abstract_text: Option<String>,
    authors_json: String,
    year: Option<i32>,
    citation_count: i64,
    reference_count: i64,
    relevance_score: Option<f64>,
    relevance_reasoning: Option<String>,
    state: i64,
    venue: Option<String>,
    journal: Option<String>,
    url: Option<String>,
    is_open_access: Option<bool>,
    pdf_url: Option<String>,
    created_at: String,
    updated_at: String,
}

impl SqliteStore {
    /// Initialize the database schema
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            -- Papers keyed by source paper id; stubs have a NULL title
            CREATE TABLE IF NOT EXISTS papers (
                paper_id TEXT PRIMARY KEY,
                title TEXT,
                abstract TEXT,
                authors_json TEXT NOT NULL DEFAULT '[]',
                year INTEGER,
                citation_count INTEGER NOT NULL DEFAULT 0,
                reference_count INTEGER NOT NULL DEFAULT 0,
                relevance_score REAL,
                relevance_reasoning TEXT,
                state INTEGER NOT NULL DEFAULT 1,
                venue TEXT,
                journal TEXT,
                url TEXT,
                is_open_access INTEGER,
                pdf_url TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_papers_state
                ON papers(state);

            -- paper_id references reference_id
            CREATE TABLE IF NOT EXISTS paper_references (
                paper_id TEXT NOT NULL,
                reference_id TEXT NOT NULL,
                PRIMARY KEY (paper_id, reference_id),
                FOREIGN KEY (paper_id) REFERENCES papers(paper_id),
                FOREIGN KEY (reference_id) REFERENCES papers(paper_id)
            );

            -- citation_id cites paper_id
            CREATE TABLE IF NOT EXISTS paper_citations (
                paper_id TEXT NOT NULL,
                citation_id TEXT NOT NULL,
                PRIMARY KEY (paper_id, citation_id),
                FOREIGN KEY (paper_id) REFERENCES papers(paper_id),
                FOREIGN KEY (citation_id) REFERENCES papers(paper_id)
            );

            CREATE TABLE IF NOT EXISTS search_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                query TEXT NOT NULL,
                results_count INTEGER NOT NULL,
                search_type TEXT NOT NULL,
                timestamp TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS paper_query_sources (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                paper_id TEXT NOT NULL,
                search_log_id INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (paper_id, search_log_id),
                FOREIGN KEY (paper_id) REFERENCES papers(paper_id),
                FOREIGN KEY (search_log_id) REFERENCES search_logs(id)
            );

            CREATE INDEX IF NOT EXISTS idx_query_sources_search
                ON paper_query_sources(search_log_id);

            -- Append-only; no foreign key so history survives any paper rewrite
            CREATE TABLE IF NOT EXISTS paper_evaluations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                paper_id TEXT NOT NULL,
                support_level REAL NOT NULL,
                reasoning TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_evaluations_paper
                ON paper_evaluations(paper_id);

            CREATE TABLE IF NOT EXISTS paper_concepts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                paper_id TEXT NOT NULL,
                concept TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (paper_id) REFERENCES papers(paper_id)
            );

            CREATE INDEX IF NOT EXISTS idx_concepts_paper
                ON paper_concepts(paper_id);

            -- Enable foreign keys
            PRAGMA foreign_keys = ON;

            -- Enable WAL mode for concurrent reads during writes
            PRAGMA journal_mode = WAL;
            "#,
        )?;

        Ok(())
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Insert an id-only stub unless the paper already exists
    fn ensure_stub(tx: &Transaction<'_>, paper_id: &PaperId, now: &str) -> StorageResult<()> {
        tx.execute(
            "INSERT OR IGNORE INTO papers (paper_id, created_at, updated_at) VALUES (?1, ?2, ?2)",
            params![paper_id.as_str(), now],
        )?;
        Ok(())
    }

    fn read_paper_row(row: &Row<'_>) -> rusqlite::Result<PaperRow> {
        Ok(PaperRow {
            paper_id: row.get(0)?,
            title: row.get(1)?,
            abstract_text: row.get(2)?,
            authors_json: row.get(3)?,
            year: row.get(4)?,
            citation_count: row.get(5)?,
            reference_count: row.get(6)?,
            relevance_score: row.get(7)?,
            relevance_reasoning: row.get(8)?,
            state: row.get(9)?,
            venue: row.get(10)?,
            journal: row.get(11)?,
            url: row.get(12)?,
            is_open_access: row.get(13)?,
            pdf_url: row.get(14)?,
            created_at: row.get(15)?,
            updated_at: row.get(16)?,
        })
    }

    /// Deserialize a paper from its raw columns
    fn row_to_paper(row: PaperRow) -> StorageResult<PaperRecord> {
        let authors: Vec<Author> = serde_json::from_str(&row.authors_json)?;
        let relevance = row.relevance_score.map(|score| {
            Relevance::new(score, row.relevance_reasoning.unwrap_or_default())
        });

        Ok(PaperRecord {
            paper_id: PaperId::from_string(row.paper_id),
            title: row.title,
            abstract_text: row.abstract_text,
            authors,
            year: row.year,
            citation_count: row.citation_count.max(0) as u32,
            reference_count: row.reference_count.max(0) as u32,
            relevance,
            state: PaperState::from_code(row.state),
            venue: row.venue,
            journal: row.journal,
            url: row.url,
            is_open_access: row.is_open_access,
            pdf_url: row.pdf_url,
            created_at: Some(parse_timestamp(&row.created_at)?),
            updated_at: Some(parse_timestamp(&row.updated_at)?),
        })
    }

    fn query_papers(
        conn: &Connection,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> StorageResult<Vec<PaperRecord>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, Self::read_paper_row)?;

        let mut papers = Vec::new();
        for row in rows {
            papers.push(Self::row_to_paper(row?)?);
        }
        Ok(papers)
    }

    fn query_ids(conn: &Connection, sql: &str, paper_id: &PaperId) -> StorageResult<Vec<PaperId>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![paper_id.as_str()], |row| row.get::<_, String>(0))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(PaperId::from_string(row?));
        }
        Ok(ids)
    }
}

fn parse_timestamp(value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::DateParse(e.to_string()))
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl PaperStore for SqliteStore {
    // === Paper Operations ===

    fn upsert_paper(&self, paper: &PaperRecord) -> StorageResult<()> {
        let conn = self.conn()?;
        let now = now_rfc3339();
        let authors_json = serde_json::to_string(&paper.authors)?;
        let (score, reasoning) = match &paper.relevance {
            Some(r) => (Some(r.score), Some(r.reasoning.as_str())),
            None => (None, None),
        };

        // Optional columns keep the stored value when the incoming one is
        // absent, so a sparse re-fetch never erases known data. Lifecycle
        // state is owned by the filter pass and is not touched here.
        conn.execute(
            r#"
            INSERT INTO papers (paper_id, title, abstract, authors_json, year, citation_count,
                                reference_count, relevance_score, relevance_reasoning, state,
                                venue, journal, url, is_open_access, pdf_url, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)
            ON CONFLICT(paper_id) DO UPDATE SET
                title = COALESCE(excluded.title, papers.title),
                abstract = COALESCE(excluded.abstract, papers.abstract),
                authors_json = CASE WHEN excluded.authors_json = '[]'
                                    THEN papers.authors_json
                                    ELSE excluded.authors_json END,
                year = COALESCE(excluded.year, papers.year),
                citation_count = excluded.citation_count,
                reference_count = excluded.reference_count,
                relevance_score = COALESCE(excluded.relevance_score, papers.relevance_score),
                relevance_reasoning = COALESCE(excluded.relevance_reasoning, papers.relevance_reasoning),
                venue = COALESCE(excluded.venue, papers.venue),
                journal = COALESCE(excluded.journal, papers.journal),
                url = COALESCE(excluded.url, papers.url),
                is_open_access = COALESCE(excluded.is_open_access, papers.is_open_access),
                pdf_url = COALESCE(excluded.pdf_url, papers.pdf_url),
                updated_at = excluded.updated_at
            "#,
            params![
                paper.paper_id.as_str(),
                paper.title,
                paper.abstract_text,
                authors_json,
                paper.year,
                paper.citation_count,
                paper.reference_count,
                score,
                reasoning,
                paper.state.code(),
                paper.venue,
                paper.journal,
                paper.url,
                paper.is_open_access,
                paper.pdf_url,
                now,
            ],
        )?;

        Ok(())
    }

    fn get_paper(&self, paper_id: &PaperId) -> StorageResult<Option<PaperRecord>> {
        let conn = self.conn()?;

        let row = conn
            .query_row(
                &format!("SELECT {} FROM papers p WHERE p.paper_id = ?1", PAPER_COLUMNS),
                params![paper_id.as_str()],
                Self::read_paper_row,
            )
            .optional()?;

        row.map(Self::row_to_paper).transpose()
    }

    fn find_papers(&self, query: &PaperQuery) -> StorageResult<Vec<PaperRecord>> {
        let conn = self.conn()?;

        let mut sql = format!("SELECT {} FROM papers p WHERE 1 = 1", PAPER_COLUMNS);
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(state) = query.state {
            sql.push_str(" AND p.state = ?");
            params_vec.push(Box::new(state.code()));
        }

        if let Some(min) = query.min_relevance {
            sql.push_str(" AND p.relevance_score >= ?");
            params_vec.push(Box::new(min));
        }

        if query.has_abstract {
            sql.push_str(" AND p.abstract IS NOT NULL AND TRIM(p.abstract) != ''");
        }

        if query.exclude_stubs {
            sql.push_str(" AND p.title IS NOT NULL");
        }

        sql.push_str(" ORDER BY p.created_at, p.paper_id");

        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();
        Self::query_papers(&conn, &sql, params_refs.as_slice())
    }

    fn count_papers(&self) -> StorageResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM papers", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn set_paper_state(&self, paper_id: &PaperId, state: PaperState) -> StorageResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "UPDATE papers SET state = ?2, updated_at = ?3 WHERE paper_id = ?1",
            params![paper_id.as_str(), state.code(), now_rfc3339()],
        )?;
        Ok(rows > 0)
    }

    fn update_metadata(&self, paper_id: &PaperId, update: &MetadataUpdate) -> StorageResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute(
            r#"
            UPDATE papers SET
                year = COALESCE(?2, year),
                venue = COALESCE(?3, venue),
                journal = COALESCE(?4, journal),
                url = COALESCE(?5, url),
                is_open_access = COALESCE(?6, is_open_access),
                pdf_url = COALESCE(?7, pdf_url),
                updated_at = ?8
            WHERE paper_id = ?1
            "#,
            params![
                paper_id.as_str(),
                update.year,
                update.venue,
                update.journal,
                update.url,
                update.is_open_access,
                update.pdf_url,
                now_rfc3339(),
            ],
        )?;
        Ok(rows > 0)
    }

    // === Edge Operations ===

    fn add_references(&self, paper_id: &PaperId, reference_ids: &[PaperId]) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let now = now_rfc3339();
        let tx = conn.transaction()?;

        Self::ensure_stub(&tx, paper_id, &now)?;
        for reference_id in reference_ids {
            Self::ensure_stub(&tx, reference_id, &now)?;
            tx.execute(
                "INSERT OR IGNORE INTO paper_references (paper_id, reference_id) VALUES (?1, ?2)",
                params![paper_id.as_str(), reference_id.as_str()],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn add_citations(&self, paper_id: &PaperId, citation_ids: &[PaperId]) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let now = now_rfc3339();
        let tx = conn.transaction()?;

        Self::ensure_stub(&tx, paper_id, &now)?;
        for citation_id in citation_ids {
            Self::ensure_stub(&tx, citation_id, &now)?;
            tx.execute(
                "INSERT OR IGNORE INTO paper_citations (paper_id, citation_id) VALUES (?1, ?2)",
                params![paper_id.as_str(), citation_id.as_str()],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn references_of(&self, paper_id: &PaperId) -> StorageResult<Vec<PaperId>> {
        let conn = self.conn()?;
        Self::query_ids(
            &conn,
            "SELECT reference_id FROM paper_references WHERE paper_id = ?1 ORDER BY reference_id",
            paper_id,
        )
    }

    fn citations_of(&self, paper_id: &PaperId) -> StorageResult<Vec<PaperId>> {
        let conn = self.conn()?;
        Self::query_ids(
            &conn,
            "SELECT citation_id FROM paper_citations WHERE paper_id = ?1 ORDER BY citation_id",
            paper_id,
        )
    }

    // === Search Provenance ===

    fn record_search(
        &self,
        query: &str,
        results_count: usize,
        kind: SearchKind,
    ) -> StorageResult<SearchId> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO search_logs (query, results_count, search_type, timestamp) VALUES (?1, ?2, ?3, ?4)",
            params![query, results_count as i64, kind.as_str(), now_rfc3339()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn list_searches(&self) -> StorageResult<Vec<SearchInvocation>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, query, results_count, search_type, timestamp FROM search_logs ORDER BY id",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut searches = Vec::new();
        for row in rows {
            let (id, query, results_count, kind, timestamp) = row?;
            let kind: SearchKind = kind.parse().map_err(StorageError::InvalidValue)?;
            searches.push(SearchInvocation {
                id,
                query,
                results_count: results_count.max(0) as usize,
                kind,
                timestamp: parse_timestamp(&timestamp)?,
            });
        }

        Ok(searches)
    }

    fn link_paper_to_search(&self, paper_id: &PaperId, search_id: SearchId) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let now = now_rfc3339();
        let tx = conn.transaction()?;

        Self::ensure_stub(&tx, paper_id, &now)?;
        tx.execute(
            "INSERT OR IGNORE INTO paper_query_sources (paper_id, search_log_id, created_at) VALUES (?1, ?2, ?3)",
            params![paper_id.as_str(), search_id, now],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn searches_for_paper(&self, paper_id: &PaperId) -> StorageResult<Vec<SearchId>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT search_log_id FROM paper_query_sources WHERE paper_id = ?1 ORDER BY search_log_id",
        )?;
        let rows = stmt.query_map(params![paper_id.as_str()], |row| row.get::<_, i64>(0))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    // === Concepts ===

    fn replace_concepts(&self, paper_id: &PaperId, concepts: &[String]) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let now = now_rfc3339();
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM paper_concepts WHERE paper_id = ?1",
            params![paper_id.as_str()],
        )?;
        for concept in concepts.iter().map(|c| c.trim()).filter(|c| !c.is_empty()) {
            tx.execute(
                "INSERT INTO paper_concepts (paper_id, concept, created_at) VALUES (?1, ?2, ?3)",
                params![paper_id.as_str(), concept, now],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn concepts_for(&self, paper_id: &PaperId) -> StorageResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT concept FROM paper_concepts WHERE paper_id = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![paper_id.as_str()], |row| row.get::<_, String>(0))?;

        let mut concepts = Vec::new();
        for row in rows {
            concepts.push(row?);
        }
        Ok(concepts)
    }

    // === Evaluations ===

    fn append_evaluation(
        &self,
        paper_id: &PaperId,
        support_level: f64,
        reasoning: &str,
    ) -> StorageResult<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO paper_evaluations (paper_id, support_level, reasoning, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![paper_id.as_str(), support_level, reasoning, now_rfc3339()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn evaluations_for(&self, paper_id: &PaperId) -> StorageResult<Vec<EvaluationRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, paper_id, support_level, reasoning, created_at
             FROM paper_evaluations WHERE paper_id = ?1 ORDER BY id",
        )?;

        let rows = stmt.query_map(params![paper_id.as_str()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut evaluations = Vec::new();
        for row in rows {
            let (id, paper_id, support_level, reasoning, created_at) = row?;
            evaluations.push(EvaluationRecord {
                id,
                paper_id: PaperId::from_string(paper_id),
                support_level,
                reasoning,
                created_at: parse_timestamp(&created_at)?,
            });
        }

        Ok(evaluations)
    }

    fn papers_above_support(&self, threshold: f64) -> StorageResult<Vec<PaperRecord>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM papers p
             JOIN paper_evaluations e ON e.paper_id = p.paper_id
             WHERE p.state = ?1
               AND e.id = (SELECT MAX(id) FROM paper_evaluations WHERE paper_id = p.paper_id)
               AND e.support_level >= ?2
             ORDER BY p.paper_id",
            PAPER_COLUMNS
        );
        Self::query_papers(&conn, &sql, params![PaperState::Active.code(), threshold])
    }

    // === Health ===

    fn ping(&self) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn create_test_paper(id: &str, title: &str) -> PaperRecord {
        PaperRecord {
            title: Some(title.to_string()),
            abstract_text: Some(format!("Abstract of {}", title)),
            authors: vec![Author::new("Ada Lovelace", "a1")],
            year: Some(2023),
            citation_count: 4,
            reference_count: 2,
            relevance: Some(Relevance::new(0.8, "on topic")),
            ..PaperRecord::stub(id)
        }
    }

    fn ids(values: &[&str]) -> Vec<PaperId> {
        values.iter().map(|v| PaperId::from(*v)).collect()
    }

    #[test]
    fn test_save_and_load_paper() {
        let store = create_test_store();
        store.upsert_paper(&create_test_paper("p1", "Graphs")).unwrap();

        let loaded = store.get_paper(&PaperId::from("p1")).unwrap().unwrap();
        assert_eq!(loaded.title.as_deref(), Some("Graphs"));
        assert_eq!(loaded.authors, vec![Author::new("Ada Lovelace", "a1")]);
        assert_eq!(loaded.year, Some(2023));
        assert_eq!(loaded.relevance_score(), Some(0.8));
        assert_eq!(loaded.state, PaperState::Active);
        assert!(loaded.created_at.is_some());
    }

    #[test]
    fn test_missing_paper_is_none() {
        let store = create_test_store();
        assert!(store.get_paper(&PaperId::from("nope")).unwrap().is_none());
    }

    #[test]
    fn test_upsert_is_idempotent_and_merges() {
        let store = create_test_store();
        store.upsert_paper(&create_test_paper("p1", "Graphs")).unwrap();

        // A sparser re-write keeps known values and takes new scalars
        let mut sparse = PaperRecord::stub("p1");
        sparse.title = Some("Graphs (revised)".to_string());
        sparse.citation_count = 10;
        store.upsert_paper(&sparse).unwrap();

        assert_eq!(store.count_papers().unwrap(), 1);
        let loaded = store.get_paper(&PaperId::from("p1")).unwrap().unwrap();
        assert_eq!(loaded.title.as_deref(), Some("Graphs (revised)"));
        assert_eq!(loaded.abstract_text.as_deref(), Some("Abstract of Graphs"));
        assert_eq!(loaded.authors.len(), 1);
        assert_eq!(loaded.citation_count, 10);
        assert_eq!(loaded.relevance_score(), Some(0.8));
    }

    #[test]
    fn test_upsert_does_not_reenable_disabled_paper() {
        let store = create_test_store();
        let id = PaperId::from("p1");
        store.upsert_paper(&create_test_paper("p1", "Graphs")).unwrap();
        assert!(store.set_paper_state(&id, PaperState::Disabled).unwrap());

        store.upsert_paper(&create_test_paper("p1", "Graphs")).unwrap();
        let loaded = store.get_paper(&id).unwrap().unwrap();
        assert_eq!(loaded.state, PaperState::Disabled);
    }

    #[test]
    fn test_references_create_stub_endpoints() {
        let store = create_test_store();
        let id = PaperId::from("p1");

        store.add_references(&id, &ids(&["r1", "r2"])).unwrap();

        assert_eq!(store.count_papers().unwrap(), 3);
        assert!(store.get_paper(&id).unwrap().unwrap().is_stub());
        assert!(store.get_paper(&PaperId::from("r1")).unwrap().unwrap().is_stub());
        assert_eq!(store.references_of(&id).unwrap(), ids(&["r1", "r2"]));
    }

    #[test]
    fn test_repeated_edges_are_noops() {
        let store = create_test_store();
        let id = PaperId::from("p1");
        store.upsert_paper(&create_test_paper("p1", "Graphs")).unwrap();

        store.add_references(&id, &ids(&["r1"])).unwrap();
        store.add_references(&id, &ids(&["r1", "r1"])).unwrap();
        store.add_citations(&id, &ids(&["c1"])).unwrap();
        store.add_citations(&id, &ids(&["c1"])).unwrap();

        assert_eq!(store.references_of(&id).unwrap(), ids(&["r1"]));
        assert_eq!(store.citations_of(&id).unwrap(), ids(&["c1"]));
        // Edge endpoints never downgrade an existing full record to a stub
        assert!(!store.get_paper(&id).unwrap().unwrap().is_stub());
    }

    #[test]
    fn test_search_log_and_provenance() {
        let store = create_test_store();
        let id = PaperId::from("p1");
        store.upsert_paper(&create_test_paper("p1", "Graphs")).unwrap();

        let first = store.record_search("graph search", 1, SearchKind::Keyword).unwrap();
        let second = store.record_search("graph expansion", 1, SearchKind::Expansion).unwrap();
        store.link_paper_to_search(&id, first).unwrap();
        store.link_paper_to_search(&id, first).unwrap();
        store.link_paper_to_search(&id, second).unwrap();

        assert_eq!(store.searches_for_paper(&id).unwrap(), vec![first, second]);

        let searches = store.list_searches().unwrap();
        assert_eq!(searches.len(), 2);
        assert_eq!(searches[0].query, "graph search");
        assert_eq!(searches[0].kind, SearchKind::Keyword);
        assert_eq!(searches[0].results_count, 1);
        assert_eq!(searches[1].kind, SearchKind::Expansion);
    }

    #[test]
    fn test_link_creates_stub_for_unknown_paper() {
        let store = create_test_store();
        let search = store.record_search("q", 1, SearchKind::Keyword).unwrap();

        store.link_paper_to_search(&PaperId::from("ghost"), search).unwrap();
        assert!(store.get_paper(&PaperId::from("ghost")).unwrap().unwrap().is_stub());
    }

    #[test]
    fn test_link_to_unknown_search_fails() {
        let store = create_test_store();
        store.upsert_paper(&create_test_paper("p1", "Graphs")).unwrap();

        let result = store.link_paper_to_search(&PaperId::from("p1"), 999);
        assert!(result.is_err());
        // The failed link rolled back entirely
        assert!(store.searches_for_paper(&PaperId::from("p1")).unwrap().is_empty());
    }

    #[test]
    fn test_replace_concepts_is_full_replacement() {
        let store = create_test_store();
        let id = PaperId::from("p1");
        store.upsert_paper(&create_test_paper("p1", "Graphs")).unwrap();

        store
            .replace_concepts(&id, &["graph theory".to_string(), "citation networks".to_string()])
            .unwrap();
        store
            .replace_concepts(&id, &["learning analytics".to_string(), "  ".to_string()])
            .unwrap();

        assert_eq!(store.concepts_for(&id).unwrap(), vec!["learning analytics".to_string()]);
    }

    #[test]
    fn test_concepts_for_unknown_paper_fail() {
        let store = create_test_store();
        let result = store.replace_concepts(&PaperId::from("ghost"), &["x".to_string()]);
        assert!(result.is_err());
    }

    #[test]
    fn test_evaluations_are_append_only() {
        let store = create_test_store();
        let id = PaperId::from("p1");
        store.upsert_paper(&create_test_paper("p1", "Graphs")).unwrap();

        store.append_evaluation(&id, 4.0, "weak").unwrap();
        store.append_evaluation(&id, 8.0, "strong").unwrap();

        let history = store.evaluations_for(&id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].support_level, 4.0);
        assert_eq!(history[1].reasoning, "strong");
    }

    #[test]
    fn test_papers_above_support_uses_latest_evaluation() {
        let store = create_test_store();
        for id in ["p1", "p2", "p3"] {
            store.upsert_paper(&create_test_paper(id, id)).unwrap();
        }

        // p1: was weak, now strong
        store.append_evaluation(&PaperId::from("p1"), 3.0, "").unwrap();
        store.append_evaluation(&PaperId::from("p1"), 7.0, "").unwrap();
        // p2: was strong, now weak
        store.append_evaluation(&PaperId::from("p2"), 9.0, "").unwrap();
        store.append_evaluation(&PaperId::from("p2"), 2.0, "").unwrap();
        // p3: strong but disabled
        store.append_evaluation(&PaperId::from("p3"), 9.0, "").unwrap();
        store.set_paper_state(&PaperId::from("p3"), PaperState::Disabled).unwrap();

        let papers = store.papers_above_support(6.0).unwrap();
        let found: Vec<_> = papers.iter().map(|p| p.paper_id.as_str()).collect();
        assert_eq!(found, vec!["p1"]);
    }

    #[test]
    fn test_find_papers_by_filter() {
        let store = create_test_store();
        store.upsert_paper(&create_test_paper("p1", "Graphs")).unwrap();

        let mut low = create_test_paper("p2", "Sets");
        low.relevance = Some(Relevance::new(0.2, "off topic"));
        low.abstract_text = None;
        store.upsert_paper(&low).unwrap();

        store.add_references(&PaperId::from("p1"), &ids(&["stub"])).unwrap();
        store.set_paper_state(&PaperId::from("p2"), PaperState::Disabled).unwrap();

        assert_eq!(store.find_papers(&PaperQuery::new()).unwrap().len(), 3);
        assert_eq!(store.find_papers(&PaperQuery::new().without_stubs()).unwrap().len(), 2);
        assert_eq!(store.find_papers(&PaperQuery::new().with_abstract()).unwrap().len(), 1);
        assert_eq!(
            store.find_papers(&PaperQuery::new().with_min_relevance(0.5)).unwrap().len(),
            1
        );
        assert_eq!(
            store
                .find_papers(&PaperQuery::new().with_state(PaperState::Disabled))
                .unwrap()
                .len(),
            1
        );
        assert_eq!(store.find_papers(&PaperQuery::new().with_limit(1)).unwrap().len(), 1);
    }

    #[test]
    fn test_update_metadata_merges() {
        let store = create_test_store();
        let id = PaperId::from("p1");
        store.upsert_paper(&create_test_paper("p1", "Graphs")).unwrap();

        let update = MetadataUpdate {
            venue: Some("CHI".to_string()),
            is_open_access: Some(true),
            ..Default::default()
        };
        assert!(store.update_metadata(&id, &update).unwrap());
        assert!(!store.update_metadata(&PaperId::from("ghost"), &update).unwrap());

        let loaded = store.get_paper(&id).unwrap().unwrap();
        assert_eq!(loaded.venue.as_deref(), Some("CHI"));
        assert_eq!(loaded.is_open_access, Some(true));
        assert_eq!(loaded.year, Some(2023));
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("citewalk.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.upsert_paper(&create_test_paper("p1", "Graphs")).unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        reopened.ping().unwrap();
        assert_eq!(reopened.count_papers().unwrap(), 1);
    }
}
