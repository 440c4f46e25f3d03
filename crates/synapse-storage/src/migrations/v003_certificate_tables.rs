//! v003: recall_certificates, certificate_chunks.

pub const MIGRATION_SQL: &str = "
CREATE TABLE IF NOT EXISTS recall_certificates (
    id              TEXT PRIMARY KEY,
    query_id        TEXT NOT NULL,
    query_text      TEXT NOT NULL,
    requirements    TEXT NOT NULL DEFAULT '[]',
    minimal_why     TEXT NOT NULL DEFAULT '[]',
    unsatisfied     TEXT NOT NULL DEFAULT '[]',
    merkle_root     TEXT NOT NULL,
    access_level    TEXT NOT NULL,
    chunk_count     INTEGER NOT NULL,
    created_at_ms   INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_recall_certificates_query ON recall_certificates(query_id);

CREATE TABLE IF NOT EXISTS certificate_chunks (
    certificate_id  TEXT NOT NULL REFERENCES recall_certificates(id) ON DELETE CASCADE,
    position        INTEGER NOT NULL,
    chunk_id        TEXT NOT NULL,
    chunk_type      TEXT NOT NULL,
    content         TEXT NOT NULL,
    relevance       REAL NOT NULL,
    tags            TEXT NOT NULL DEFAULT '[]',
    PRIMARY KEY (certificate_id, position)
);
";
