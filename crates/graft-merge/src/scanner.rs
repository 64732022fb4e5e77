//! Brace/string-literal scanner
//!
//! Finds the matching close delimiter for a block while skipping delimiters
//! that appear inside string literals, character literals, verbatim
//! (multi-line) strings, and comments. Modeled as an explicit finite-state
//! machine so each edge case is independently testable.
//!
//! The scan works on bytes: every state transition is driven by an ASCII
//! character, and multi-byte characters can only occur inside literals,
//! comments, or identifiers where the scanner does not inspect them.

/// Scanner state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Plain code
    Normal,
    /// Inside a `"..."` literal
    InString,
    /// Inside a `"..."` literal, previous byte was a backslash
    InStringEscape,
    /// Inside a `'...'` literal
    InChar,
    /// Inside a `'...'` literal, previous byte was a backslash
    InCharEscape,
    /// Inside a verbatim/raw multi-line string (`@"..."`), where a doubled
    /// quote is an escaped quote
    InVerbatimString,
    /// Inside a `//` comment
    InLineComment,
    /// Inside a `/* ... */` comment
    InBlockComment,
}

/// Find the end of the block opened at `open_idx`.
///
/// `source[open_idx]` must be `open`. Returns the byte index one past the
/// matching `close`, or `None` when the block never closes.
#[must_use]
pub fn find_block_end(source: &str, open_idx: usize, open: u8, close: u8) -> Option<usize> {
    let bytes = source.as_bytes();
    if bytes.get(open_idx) != Some(&open) {
        return None;
    }

    let mut state = ScanState::Normal;
    let mut depth = 0usize;
    let mut i = open_idx;
    while i < bytes.len() {
        let b = bytes[i];
        match state {
            ScanState::Normal => {
                if b == open {
                    depth += 1;
                } else if b == close {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some(i + 1);
                    }
                } else {
                    match b {
                        b'"' => {
                            state = if verbatim_prefix(bytes, i) {
                                ScanState::InVerbatimString
                            } else {
                                ScanState::InString
                            };
                        }
                        b'\'' => state = ScanState::InChar,
                        b'/' if bytes.get(i + 1) == Some(&b'/') => {
                            state = ScanState::InLineComment;
                            i += 1;
                        }
                        b'/' if bytes.get(i + 1) == Some(&b'*') => {
                            state = ScanState::InBlockComment;
                            i += 1;
                        }
                        _ => {}
                    }
                }
            }
            ScanState::InString => match b {
                b'\\' => state = ScanState::InStringEscape,
                b'"' => state = ScanState::Normal,
                // Ordinary strings do not span lines; treat an unterminated
                // one as closed so a malformed literal cannot swallow the file.
                b'\n' => state = ScanState::Normal,
                _ => {}
            },
            ScanState::InStringEscape => state = ScanState::InString,
            ScanState::InChar => match b {
                b'\\' => state = ScanState::InCharEscape,
                b'\'' => state = ScanState::Normal,
                b'\n' => state = ScanState::Normal,
                _ => {}
            },
            ScanState::InCharEscape => state = ScanState::InChar,
            ScanState::InVerbatimString => {
                if b == b'"' {
                    if bytes.get(i + 1) == Some(&b'"') {
                        // Doubled quote: escaped, stay inside.
                        i += 1;
                    } else {
                        state = ScanState::Normal;
                    }
                }
            }
            ScanState::InLineComment => {
                if b == b'\n' {
                    state = ScanState::Normal;
                }
            }
            ScanState::InBlockComment => {
                if b == b'*' && bytes.get(i + 1) == Some(&b'/') {
                    state = ScanState::Normal;
                    i += 1;
                }
            }
        }
        i += 1;
    }
    None
}

/// Whether the quote at `quote_idx` opens a verbatim string.
///
/// True when the quote is immediately preceded by `@`, allowing an
/// interpolation marker in either order (`$@"`, `@$"`).
fn verbatim_prefix(bytes: &[u8], quote_idx: usize) -> bool {
    let mut saw_at = false;
    let mut j = quote_idx;
    while j > 0 {
        j -= 1;
        match bytes[j] {
            b'@' => saw_at = true,
            b'$' => {}
            _ => break,
        }
    }
    saw_at
}
