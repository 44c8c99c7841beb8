use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::batch::BatchResult;
use crate::model::QualityTier;

pub fn connect(path: &str) -> Result<Connection> {
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {:?}", parent))?;
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS runs (
            id          INTEGER PRIMARY KEY,
            title       TEXT NOT NULL,
            total       INTEGER NOT NULL,
            successes   INTEGER NOT NULL,
            missing     INTEGER NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS records (
            id             INTEGER PRIMARY KEY,
            run_id         INTEGER NOT NULL REFERENCES runs(id),
            word           TEXT NOT NULL,
            sentence       TEXT NOT NULL,
            transcription  TEXT,
            translation    TEXT,
            source_lemma   TEXT NOT NULL,
            quality        TEXT NOT NULL CHECK(quality IN ('complete','good','basic','incomplete')),
            source         TEXT NOT NULL,
            captured_at    TEXT NOT NULL,
            UNIQUE(run_id, word)
        );
        CREATE INDEX IF NOT EXISTS idx_records_word ON records(word);

        CREATE TABLE IF NOT EXISTS missing_words (
            id        INTEGER PRIMARY KEY,
            run_id    INTEGER NOT NULL REFERENCES runs(id),
            position  INTEGER NOT NULL,
            word      TEXT NOT NULL,
            reason    TEXT NOT NULL,
            UNIQUE(run_id, position)
        );
        CREATE INDEX IF NOT EXISTS idx_missing_reason ON missing_words(reason);
        ",
    )?;
    Ok(())
}

/// Store one finished batch in a single transaction. Returns the run id.
pub fn save_batch(conn: &Connection, title: &str, result: &BatchResult) -> Result<i64> {
    let tx = conn.unchecked_transaction()?;
    let run_id;
    {
        tx.execute(
            "INSERT INTO runs (title, total, successes, missing) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![title, result.total(), result.records.len(), result.missing.len()],
        )?;
        run_id = tx.last_insert_rowid();

        let mut r_stmt = tx.prepare(
            "INSERT OR REPLACE INTO records
             (run_id, word, sentence, transcription, translation, source_lemma, quality, source, captured_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;
        for r in &result.records {
            r_stmt.execute(rusqlite::params![
                run_id,
                r.word,
                r.sentence,
                r.transcription,
                r.translation,
                r.source_lemma,
                r.quality.as_str(),
                r.source,
                r.captured_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ])?;
        }

        let mut m_stmt = tx.prepare(
            "INSERT OR IGNORE INTO missing_words (run_id, position, word, reason)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for m in &result.missing {
            m_stmt.execute(rusqlite::params![run_id, m.position, m.word, m.reason.to_string()])?;
        }
    }
    tx.commit()?;
    Ok(run_id)
}

// ── Stats ──

pub struct RunRow {
    pub id: i64,
    pub title: String,
    pub total: usize,
    pub successes: usize,
    pub missing: usize,
    pub created_at: String,
}

pub fn fetch_runs(conn: &Connection, limit: usize) -> Result<Vec<RunRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, total, successes, missing, created_at
         FROM runs ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([limit], |row| {
            Ok(RunRow {
                id: row.get(0)?,
                title: row.get(1)?,
                total: row.get(2)?,
                successes: row.get(3)?,
                missing: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub struct Stats {
    pub runs: usize,
    pub records: usize,
    pub missing: usize,
    pub distinct_words: usize,
    pub by_quality: Vec<(QualityTier, usize)>,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let runs: usize = conn.query_row("SELECT COUNT(*) FROM runs", [], |r| r.get(0))?;
    let records: usize = conn.query_row("SELECT COUNT(*) FROM records", [], |r| r.get(0))?;
    let missing: usize = conn.query_row("SELECT COUNT(*) FROM missing_words", [], |r| r.get(0))?;
    let distinct_words: usize =
        conn.query_row("SELECT COUNT(DISTINCT word) FROM records", [], |r| r.get(0))?;

    let mut stmt = conn.prepare("SELECT quality, COUNT(*) FROM records GROUP BY quality")?;
    let mut by_quality = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, usize>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .filter_map(|(q, n)| q.parse::<QualityTier>().ok().map(|t| (t, n)))
        .collect::<Vec<_>>();
    by_quality.sort_by(|a, b| b.0.cmp(&a.0));

    Ok(Stats {
        runs,
        records,
        missing,
        distinct_words,
        by_quality,
    })
}
