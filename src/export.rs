use std::fmt::Write as _;
use std::fs::File;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::Local;
use regex::Regex;
use serde::Serialize;
use serde_json::json;

use crate::batch::BatchResult;
use crate::model::{MissingEntry, QualityTier, SelectedRecord};

static UNSAFE_FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[\\/:*?"<>|]"#).unwrap());

const MISSING_PER_ROW: usize = 10;

/// Spreadsheet apps need the BOM to open UTF-8 CSV as UTF-8.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub struct ExportPaths {
    pub dir: PathBuf,
    pub json: PathBuf,
    pub report: PathBuf,
    /// Only written when the batch has records.
    pub records_csv: Option<PathBuf>,
    /// Only written when the batch has missing words.
    pub missing_csv: Option<PathBuf>,
}

#[derive(Serialize)]
struct RecordRow<'a> {
    word: &'a str,
    sentence: &'a str,
    transcription: Option<&'a str>,
    translation: Option<&'a str>,
    source_lemma: &'a str,
    quality: QualityTier,
    captured_at: String,
    source: &'a str,
}

impl<'a> From<&'a SelectedRecord> for RecordRow<'a> {
    fn from(r: &'a SelectedRecord) -> Self {
        RecordRow {
            word: &r.word,
            sentence: &r.sentence,
            transcription: r.transcription.as_deref(),
            translation: r.translation.as_deref(),
            source_lemma: &r.source_lemma,
            quality: r.quality,
            captured_at: r.captured_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            source: &r.source,
        }
    }
}

pub fn safe_title(title: &str) -> String {
    UNSAFE_FILENAME_RE.replace_all(title, "_").to_string()
}

/// Write `final_<title>/<title>_final_<ts>.json` and the matching text report.
pub fn write_all(root: &Path, title: &str, source_url: &str, result: &BatchResult) -> Result<ExportPaths> {
    let safe = safe_title(title);
    let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let dir = root.join(format!("final_{}", safe));
    std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create {:?}", dir))?;

    let json_path = dir.join(format!("{}_final_{}.json", safe, stamp));
    let doc = to_json(result, source_url, &stamp);
    std::fs::write(&json_path, serde_json::to_string_pretty(&doc)?)
        .with_context(|| format!("Failed to write {:?}", json_path))?;

    let records_csv = if result.records.is_empty() {
        None
    } else {
        let path = dir.join(format!("{}_successful_{}.csv", safe, stamp));
        write_records_csv(&path, &result.records)?;
        Some(path)
    };

    let missing_csv = if result.missing.is_empty() {
        None
    } else {
        let path = dir.join(format!("{}_missing_words_{}.csv", safe, stamp));
        write_missing_csv(&path, &result.missing)?;
        Some(path)
    };

    let report_path = dir.join(format!("{}_report_{}.txt", safe, stamp));
    std::fs::write(&report_path, render_report(title, &stamp, result))
        .with_context(|| format!("Failed to write {:?}", report_path))?;

    Ok(ExportPaths {
        dir,
        json: json_path,
        report: report_path,
        records_csv,
        missing_csv,
    })
}

/// Best tier first, then by word.
pub fn write_records_csv(path: &Path, records: &[SelectedRecord]) -> Result<()> {
    let mut sorted: Vec<&SelectedRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.quality.cmp(&a.quality).then_with(|| a.word.cmp(&b.word)));

    let mut wtr = bom_writer(path)?;
    for r in sorted {
        wtr.serialize(RecordRow::from(r))?;
    }
    wtr.flush().with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

/// In input order.
pub fn write_missing_csv(path: &Path, missing: &[MissingEntry]) -> Result<()> {
    let mut sorted: Vec<&MissingEntry> = missing.iter().collect();
    sorted.sort_by_key(|m| m.position);

    let mut wtr = bom_writer(path)?;
    for m in sorted {
        wtr.serialize(m)?;
    }
    wtr.flush().with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

fn bom_writer(path: &Path) -> Result<csv::Writer<File>> {
    let mut file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    file.write_all(UTF8_BOM)?;
    Ok(csv::Writer::from_writer(file))
}

pub fn to_json(result: &BatchResult, source_url: &str, stamp: &str) -> serde_json::Value {
    let summary = result.summary();
    let quality_stats: serde_json::Map<String, serde_json::Value> = QualityTier::all()
        .iter()
        .map(|&t| (t.as_str().to_string(), json!(summary.quality_count(t))))
        .collect();

    let mut missing = result.missing.clone();
    missing.sort_by_key(|m| m.position);

    json!({
        "metadata": {
            "source_url": source_url,
            "extraction_date": stamp,
            "statistics": {
                "total_words": summary.total,
                "successful_extractions": summary.successes,
                "missing_words": summary.missing,
                "success_rate": summary.success_label(),
                "quality_stats": quality_stats,
            },
        },
        "successful_records": result.records,
        "missing_words": missing,
    })
}

pub fn render_report(title: &str, stamp: &str, result: &BatchResult) -> String {
    let summary = result.summary();
    let mut out = String::new();

    let _ = writeln!(out, "Example extraction report - {}", title);
    let _ = writeln!(out, "{}", "=".repeat(80));
    let _ = writeln!(out, "Total words:   {}", summary.total);
    let _ = writeln!(out, "Extracted:     {}", summary.successes);
    let _ = writeln!(out, "Missing:       {}", summary.missing);
    let _ = writeln!(out, "Success rate:  {}", summary.success_label());
    let _ = writeln!(out, "Captured:      {}\n", stamp);

    for &tier in QualityTier::all() {
        let records: Vec<&SelectedRecord> = result.records.iter().filter(|r| r.quality == tier).collect();
        if records.is_empty() {
            continue;
        }
        let _ = writeln!(out, "[{}] {} records", tier, records.len());
        let _ = writeln!(out, "{}", "-".repeat(60));
        for (i, r) in records.iter().enumerate() {
            write_record(&mut out, i + 1, r);
        }
    }

    if !summary.reasons.is_empty() {
        let _ = writeln!(out, "Missing words");
        let _ = writeln!(out, "{}", "=".repeat(60));
        let _ = writeln!(out, "{} words had no usable example:\n", summary.missing);

        for (reason, count) in &summary.reasons {
            let _ = writeln!(out, "{} ({}):", reason, count);
            let words: Vec<&str> = result
                .missing
                .iter()
                .filter(|m| m.reason.to_string() == *reason)
                .map(|m| m.word.as_str())
                .collect();
            for row in words.chunks(MISSING_PER_ROW) {
                let line: String = row.iter().map(|w| format!("{:<8}", w)).collect();
                let _ = writeln!(out, "   {}", line.trim_end());
            }
            out.push('\n');
        }
    }

    out
}

fn write_record(out: &mut String, n: usize, r: &SelectedRecord) {
    let _ = writeln!(out, "{:2}. {}", n, r.word);
    let _ = writeln!(out, "    sentence:      {}", r.sentence);
    if let Some(t) = &r.transcription {
        let _ = writeln!(out, "    transcription: {}", t);
    }
    if let Some(t) = &r.translation {
        let _ = writeln!(out, "    translation:   {}", t);
    }
    if r.source_lemma != r.word {
        let _ = writeln!(out, "    source lemma:  {}", r.source_lemma);
    }
    out.push('\n');
}
