//! Sentence data source.
//!
//! The drill's sentences live in sheets: tab-separated files whose header
//! row names the language of each column. A session loads its whole range
//! once at start; an unreadable sheet is fatal to session start and the
//! scheduler never runs.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::info;

use parlo_core::types::Sentence;
use parlo_core::{Error, Result};

pub trait SentenceSource {
    /// Ordered sentences for rows `start_row..=end_row` (1-based,
    /// inclusive). A language the sheet lacks reads as empty text, not as
    /// an error; a range past the end of the sheet is simply truncated.
    fn load(&self, sheet: &str, start_row: usize, end_row: usize) -> Result<Vec<Sentence>>;
}

/// Sheets as `<dir>/<sheet>.tsv` files.
pub struct SheetDirSource {
    dir: PathBuf,
}

impl SheetDirSource {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Sheet names available in the directory, sorted.
    pub fn list_sheets(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.dir)
            .into_iter()
            .flatten()
            .filter_map(|entry| {
                let name = entry.ok()?.file_name().to_string_lossy().into_owned();
                name.strip_suffix(".tsv").map(str::to_string)
            })
            .collect();
        names.sort();
        names
    }
}

impl SentenceSource for SheetDirSource {
    fn load(&self, sheet: &str, start_row: usize, end_row: usize) -> Result<Vec<Sentence>> {
        if start_row == 0 || end_row < start_row {
            return Err(Error::DataSource(format!(
                "invalid range {start_row}..{end_row}"
            )));
        }

        let path = self.dir.join(format!("{sheet}.tsv"));
        let contents = std::fs::read_to_string(&path)
            .map_err(|e| Error::DataSource(format!("cannot read {}: {e}", path.display())))?;

        let mut lines = contents.lines();
        let header = lines
            .next()
            .ok_or_else(|| Error::DataSource(format!("{sheet}: empty sheet")))?;
        let languages: Vec<&str> = header.split('\t').map(str::trim).collect();
        if languages.iter().all(|l| l.is_empty()) {
            return Err(Error::DataSource(format!("{sheet}: missing header row")));
        }

        let sentences: Vec<Sentence> = lines
            .enumerate()
            .map(|(i, line)| (i + 1, line)) // data rows are 1-based
            .skip_while(|(row, _)| *row < start_row)
            .take_while(|(row, _)| *row <= end_row)
            .map(|(row, line)| {
                let mut texts = HashMap::new();
                for (lang, text) in languages.iter().zip(line.split('\t')) {
                    if !lang.is_empty() {
                        texts.insert(lang.to_string(), text.trim().to_string());
                    }
                }
                Sentence { index: row, texts }
            })
            .collect();

        info!(
            sheet,
            start_row,
            end_row,
            loaded = sentences.len(),
            "sentence range loaded"
        );
        Ok(sentences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet_dir(contents: &str) -> (SheetDirSource, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("basics.tsv"), contents).unwrap();
        (SheetDirSource::new(dir.path().to_path_buf()), dir)
    }

    const SHEET: &str = "english\tkorean\nHello.\t안녕하세요.\nThank you.\t감사합니다.\nGoodbye.\t안녕히 가세요.\n";

    #[test]
    fn loads_the_requested_range() {
        let (source, _dir) = sheet_dir(SHEET);
        let sentences = source.load("basics", 2, 3).unwrap();
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0].index, 2);
        assert_eq!(sentences[0].text_for("english"), "Thank you.");
        assert_eq!(sentences[1].text_for("korean"), "안녕히 가세요.");
    }

    #[test]
    fn range_past_the_end_truncates() {
        let (source, _dir) = sheet_dir(SHEET);
        let sentences = source.load("basics", 1, 50).unwrap();
        assert_eq!(sentences.len(), 3);
    }

    #[test]
    fn missing_language_reads_empty() {
        let (source, _dir) = sheet_dir(SHEET);
        let sentences = source.load("basics", 1, 1).unwrap();
        assert_eq!(sentences[0].text_for("thai"), "");
    }

    #[test]
    fn ragged_row_reads_empty_for_trailing_columns() {
        let (source, _dir) = sheet_dir("english\tkorean\nHello.\n");
        let sentences = source.load("basics", 1, 1).unwrap();
        assert_eq!(sentences[0].text_for("english"), "Hello.");
        assert_eq!(sentences[0].text_for("korean"), "");
    }

    #[test]
    fn missing_sheet_is_a_data_source_error() {
        let (source, _dir) = sheet_dir(SHEET);
        let err = source.load("nope", 1, 10).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn invalid_range_is_rejected() {
        let (source, _dir) = sheet_dir(SHEET);
        assert!(source.load("basics", 0, 5).is_err());
        assert!(source.load("basics", 5, 2).is_err());
    }

    #[test]
    fn list_sheets_finds_tsv_files() {
        let (source, dir) = sheet_dir(SHEET);
        std::fs::write(dir.path().join("travel.tsv"), SHEET).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        assert_eq!(source.list_sheets(), vec!["basics", "travel"]);
    }
}
