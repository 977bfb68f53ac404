//! Line-oriented corpus input.
//!
//! Labeled files carry the category digit as the first character of each
//! line; unlabeled files are plain text, one message per line. Bad lines are
//! counted and skipped.

use crate::index::{Category, Document, Label};
use crate::store::DocumentStore;
use crate::tokenizer::tokenize;
use anyhow::Result;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

const PROGRESS_EVERY: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Labeled,
    Unlabeled,
}

impl Source {
    fn title_prefix(self) -> &'static str {
        match self {
            Source::Labeled => "Labeled",
            Source::Unlabeled => "Unlabeled",
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub lines: usize,
    pub loaded: usize,
    pub malformed: usize,
    pub empty: usize,
}

/// Splits a labeled line into its category and text. `None` when the first
/// character is not a digit below `n_categories`.
pub fn parse_labeled_line(line: &str, n_categories: usize) -> Option<(Category, &str)> {
    let first = line.chars().next()?;
    let category = first.to_digit(10)? as Category;
    if category >= n_categories {
        return None;
    }
    Some((category, line[first.len_utf8()..].trim()))
}

/// Reads every line of `reader` into `store`. Lines that are not valid UTF-8
/// count as malformed; only I/O failures end the load.
pub fn load_lines<R: BufRead>(mut reader: R, source: Source, n_categories: usize, store: &mut DocumentStore) -> Result<LoadReport> {
    let mut report = LoadReport::default();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        report.lines += 1;
        let line_no = report.lines;
        if line_no % PROGRESS_EVERY == 0 {
            tracing::info!(source = source.title_prefix(), lines = line_no, "loading");
        }

        let raw = buf.strip_suffix(b"\n").unwrap_or(&buf);
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let line = match std::str::from_utf8(raw) {
            Ok(line) => line,
            Err(err) => {
                tracing::debug!(line_no, %err, "skipping line that is not UTF-8");
                report.malformed += 1;
                continue;
            }
        };

        let (label, text) = match source {
            Source::Labeled => match parse_labeled_line(line, n_categories) {
                Some((category, text)) => (Label::Category(category), text),
                None => {
                    tracing::debug!(line_no, "skipping malformed labeled line");
                    report.malformed += 1;
                    continue;
                }
            },
            Source::Unlabeled => (Label::Unlabeled, line.trim()),
        };

        let tokens = tokenize(text);
        let title = format!("{} #{}", source.title_prefix(), line_no);
        match store.push(Document::new(title, text, tokens, label)) {
            Some(_) => report.loaded += 1,
            None => report.empty += 1,
        }
    }
    tracing::info!(source = source.title_prefix(), ?report, "finished loading");
    Ok(report)
}

pub fn load_file<P: AsRef<Path>>(path: P, source: Source, n_categories: usize, store: &mut DocumentStore) -> Result<LoadReport> {
    let f = File::open(path.as_ref())?;
    load_lines(BufReader::new(f), source, n_categories, store)
}
