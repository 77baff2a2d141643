use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone};
use fs_err as fs;
use std::path::{Path, PathBuf};

use crate::wire::Idea;

pub const CSV_HEADER: [&str; 5] = ["Filename", "Title", "Keywords", "Category", "Releases"];
const PLACEHOLDER_FILENAME: &str = "image_filename.jpg";
const CATEGORY: &str = "3";

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// One upload row. The keyword cell is wrapped in quotes as-is.
pub fn csv_row(idea: &Idea) -> String {
    let title = quote(&idea.object);
    let keywords = format!("\"{}\"", idea.keywords.join(", "));
    [PLACEHOLDER_FILENAME, title.as_str(), keywords.as_str(), CATEGORY, ""].join(",")
}

/// Header plus one row per idea, newline-separated, no trailing newline.
pub fn csv_content(ideas: &[Idea]) -> String {
    std::iter::once(CSV_HEADER.join(","))
        .chain(ideas.iter().map(csv_row))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `YYYY-MM-DD-HH-MM-SS.csv`
pub fn export_filename<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{}.csv", now.format("%Y-%m-%d-%H-%M-%S"))
}

pub fn write_export<Tz: TimeZone>(dir: &Path, ideas: &[Idea], now: &DateTime<Tz>) -> Result<PathBuf>
where
    Tz::Offset: std::fmt::Display,
{
    fs::create_dir_all(dir)?;
    let path = dir.join(export_filename(now));
    fs::write(&path, csv_content(ideas)).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}
