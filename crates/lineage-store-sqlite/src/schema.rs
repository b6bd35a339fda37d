//! SQL schema for the lineage SQLite store.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per downloaded asset. A key is written once and never replaced.
CREATE TABLE IF NOT EXISTS media_assets (
    media_key    TEXT PRIMARY KEY,   -- 'person:<index>:<id>' | 'citation:<id>'
    remote_ref   TEXT NOT NULL,
    category     TEXT NOT NULL,      -- 'photo' | 'document' | 'record'
    path         TEXT NOT NULL,      -- relative to the media directory
    content_hash TEXT NOT NULL,      -- SHA-256 hex
    byte_len     INTEGER NOT NULL,
    title        TEXT,
    recorded_at  TEXT NOT NULL       -- RFC 3339 UTC
);

-- One row per citation ID; refreshed on every run that materialises it.
CREATE TABLE IF NOT EXISTS citations (
    citation_id TEXT PRIMARY KEY,
    title       TEXT NOT NULL,
    database_id TEXT,
    record_id   TEXT,
    source_id   TEXT,
    image_ref   TEXT,
    asset_key   TEXT REFERENCES media_assets(media_key),
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS snapshots (
    run_id      TEXT PRIMARY KEY,
    started_at  TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    tree_json   TEXT NOT NULL,
    report_json TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS snapshots_finished_idx ON snapshots(finished_at);

PRAGMA user_version = 1;
";
