//! Line-oriented manifest editing
//!
//! A manifest is the text file the external build tool reads to know which
//! source files belong to a module: one relative path per line, `#` lines
//! and blank lines preserved as comments/spacing. Amendment rewrites the
//! file in place, keeping every existing line untouched.

use std::fs;
use std::io;
use std::path::Path;

/// Source-file entries listed in the manifest, in file order.
///
/// # Errors
/// Propagates the underlying read error.
pub fn read_entries(path: &Path) -> io::Result<Vec<String>> {
    let text = fs::read_to_string(path)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Add entries that are not yet listed; returns the ones actually added.
///
/// Existing lines are preserved byte-for-byte; new entries are appended at
/// the end, one per line. Calling twice with the same entries is a no-op
/// the second time.
///
/// # Errors
/// Propagates read/write errors; on error the manifest is unchanged or
/// fully rewritten, never truncated halfway (the rewrite is a single write).
pub fn add_entries(path: &Path, entries: &[String]) -> io::Result<Vec<String>> {
    let text = fs::read_to_string(path)?;
    let existing = read_lines_set(&text);

    let added: Vec<String> = entries
        .iter()
        .filter(|e| !existing.iter().any(|x| x.eq_ignore_ascii_case(e)))
        .cloned()
        .collect();
    if added.is_empty() {
        return Ok(added);
    }

    let mut rewritten = text;
    if !rewritten.is_empty() && !rewritten.ends_with('\n') {
        rewritten.push('\n');
    }
    for entry in &added {
        rewritten.push_str(entry);
        rewritten.push('\n');
    }
    fs::write(path, rewritten)?;
    Ok(added)
}

/// Remove exactly the given entries; returns how many lines were removed.
///
/// Lines that do not match any entry are preserved byte-for-byte.
///
/// # Errors
/// Propagates read/write errors.
pub fn remove_entries(path: &Path, entries: &[String]) -> io::Result<usize> {
    let text = fs::read_to_string(path)?;
    let mut removed = 0usize;
    let mut kept = Vec::new();
    for line in text.lines() {
        let candidate = line.trim();
        if entries.iter().any(|e| e.eq_ignore_ascii_case(candidate)) {
            removed += 1;
        } else {
            kept.push(line);
        }
    }
    if removed == 0 {
        return Ok(0);
    }
    let mut rewritten = kept.join("\n");
    if text.ends_with('\n') && !rewritten.is_empty() {
        rewritten.push('\n');
    }
    fs::write(path, rewritten)?;
    Ok(removed)
}

fn read_lines_set(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}
