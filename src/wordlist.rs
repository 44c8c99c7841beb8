use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use calamine::{open_workbook_auto, Data, Range, Reader};
use regex::Regex;
use thiserror::Error;

use crate::charclass::{char_len, is_han};

static LEADING_ORDINAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.?\s*").unwrap());
static ANNOTATION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^)]*\)").unwrap());

/// Column headers and category labels that show up in the vocabulary sheets.
const LABEL_WORDS: &[&str] = &["其他", "備註", "說明", "類別"];

/// Index sheet of the vocabulary workbook; lists categories, not words.
pub const INDEX_SHEET: &str = "工作表分類清單";

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods"];

#[derive(Error, Debug)]
pub enum WordListError {
    #[error("cannot read word list {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("word list {0} has no usable words")]
    Empty(String),

    #[error("cannot open workbook {path}: {source}")]
    Workbook {
        path: String,
        source: calamine::Error,
    },

    #[error("sheet {sheet:?} not found in {path} (available: {})", .available.join(", "))]
    SheetNotFound {
        path: String,
        sheet: String,
        available: Vec<String>,
    },

    #[error("workbook {0} has no word sheets")]
    NoSheets(String),
}

/// Words plus the name of the sheet they came from, if any.
#[derive(Debug)]
pub struct WordList {
    pub sheet: Option<String>,
    pub words: Vec<String>,
}

pub fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| WORKBOOK_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// Workbooks go through the sheet reader, anything else is read as text.
pub fn load_any(path: &Path, sheet: Option<&str>) -> Result<WordList, WordListError> {
    if is_workbook(path) {
        load_workbook(path, sheet)
    } else {
        Ok(WordList {
            sheet: None,
            words: load(path)?,
        })
    }
}

/// Read one sheet of a vocabulary workbook. Without `sheet`, the first sheet
/// other than the index sheet is used.
pub fn load_workbook(path: &Path, sheet: Option<&str>) -> Result<WordList, WordListError> {
    let display = path.display().to_string();
    let mut workbook = open_workbook_auto(path).map_err(|source| WordListError::Workbook {
        path: display.clone(),
        source,
    })?;

    let available = word_sheets(&workbook.sheet_names());
    let name = pick_sheet(&available, sheet).ok_or_else(|| match sheet {
        Some(s) => WordListError::SheetNotFound {
            path: display.clone(),
            sheet: s.to_string(),
            available: available.clone(),
        },
        None => WordListError::NoSheets(display.clone()),
    })?;

    let range = workbook
        .worksheet_range(&name)
        .map_err(|source| WordListError::Workbook {
            path: display.clone(),
            source,
        })?;
    let words = collect(range_cells(&range));
    if words.is_empty() {
        return Err(WordListError::Empty(format!("{} [{}]", display, name)));
    }
    Ok(WordList {
        sheet: Some(name),
        words,
    })
}

fn word_sheets(names: &[String]) -> Vec<String> {
    names.iter().filter(|n| n.as_str() != INDEX_SHEET).cloned().collect()
}

fn pick_sheet(available: &[String], requested: Option<&str>) -> Option<String> {
    match requested {
        Some(want) => available.iter().find(|n| n.as_str() == want).cloned(),
        None => available.first().cloned(),
    }
}

/// Text cells column by column, skipping the header row.
fn range_cells(range: &Range<Data>) -> Vec<&str> {
    let (height, width) = range.get_size();
    let mut cells = Vec::new();
    for col in 0..width {
        for row in 1..height {
            if let Some(Data::String(s)) = range.get((row, col)) {
                cells.push(s.as_str());
            }
        }
    }
    cells
}

pub fn load(path: &Path) -> Result<Vec<String>, WordListError> {
    let raw = std::fs::read_to_string(path).map_err(|source| WordListError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let words = parse(&raw);
    if words.is_empty() {
        return Err(WordListError::Empty(path.display().to_string()));
    }
    Ok(words)
}

/// Split a sheet export into cells and keep the ones that look like
/// headwords. Order of first appearance is kept; duplicates are dropped.
pub fn parse(raw: &str) -> Vec<String> {
    collect(raw.split(['\n', '\r', '\t', ',']))
}

fn collect<'a>(cells: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    cells
        .into_iter()
        .filter_map(clean_cell)
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

fn clean_cell(cell: &str) -> Option<String> {
    let cell = cell.trim().trim_matches('"').trim();
    if cell.is_empty()
        || cell.eq_ignore_ascii_case("nan")
        || cell.chars().all(|c| c.is_ascii_digit())
        || char_len(cell) <= 1
        || !cell.chars().any(is_han)
    {
        return None;
    }

    let word = LEADING_ORDINAL_RE.replace(cell, "");
    let word = ANNOTATION_RE.replace_all(&word, "");
    let word = word.trim();

    if char_len(word) <= 1 || LABEL_WORDS.contains(&word) {
        return None;
    }
    Some(word.to_string())
}
