//! Newline-delimited resume artifacts
//!
//! The names and links lists are written after their stage completes. On the
//! next run a non-empty list short-circuits the stage that produced it.

use crate::crawler::EntryLink;
use crate::HarvestError;
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::Path;
use url::Url;

/// Reads a newline-delimited list, skipping blank lines
///
/// A missing file reads as an empty list.
pub fn read_lines(path: &Path) -> Result<Vec<String>, HarvestError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Writes one item per line, creating parent directories as needed
///
/// Items are written as [`read_lines`] will read them back: trimmed, with
/// blank items and items containing a line break skipped. Returns the number
/// of lines written.
pub fn write_lines<I, S>(path: &Path, lines: I) -> Result<usize, HarvestError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = BufWriter::new(fs::File::create(path)?);
    let mut count = 0;
    for line in lines {
        let line = line.as_ref().trim();
        if line.is_empty() {
            continue;
        }
        if line.contains(['\n', '\r']) {
            tracing::warn!("Not saving {:?} to {}: contains a line break", line, path.display());
            continue;
        }
        writeln!(writer, "{}", line)?;
        count += 1;
    }
    writer.flush()?;

    Ok(count)
}

/// Loads a saved links list
///
/// Lines that are not absolute URLs are logged and skipped. Saved links carry
/// no display name.
pub fn read_links(path: &Path, id_param: Option<&str>) -> Result<Vec<EntryLink>, HarvestError> {
    let mut links = Vec::new();

    for line in read_lines(path)? {
        match Url::parse(&line) {
            Ok(url) => links.push(EntryLink::new(None, url, id_param)),
            Err(e) => tracing::warn!("Skipping invalid link '{}' in {}: {}", line, path.display(), e),
        }
    }

    Ok(links)
}

/// Saves a links list, one URL per line
pub fn write_links(path: &Path, links: &[EntryLink]) -> Result<usize, HarvestError> {
    write_lines(path, links.iter().map(|link| link.url.as_str()))
}
