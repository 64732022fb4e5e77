//! Method span extraction
//!
//! Locates a named method inside a source text: the declaration line, the
//! parameter list, the brace-delimited body, and any contiguous leading
//! comment/attribute lines. The declaration is found by pattern, the body
//! by the scanner in [`crate::scanner`].

use crate::scanner::find_block_end;
use once_cell::sync::Lazy;
use regex::Regex;

/// Placeholder for the escaped method name inside the declaration template.
const NAME_SLOT: &str = "{NAME}";

/// Declaration template: optional modifiers, a return type, the method
/// name, optional generics, then the opening parenthesis. Anchored to the
/// start of a line.
static DEFAULT_DECL_TEMPLATE: &str = concat!(
    r"(?m)^[ \t]*",
    r"(?:(?:public|private|protected|internal|static|virtual|override|abstract|sealed|async|partial|extern|unsafe|new)\s+)*",
    r"[A-Za-z_][A-Za-z0-9_.]*(?:\s*<[^(){};]*>)?(?:\[\s*\])?\??\s+",
    "{NAME}",
    r"\s*(?:<[^(){};]*>)?\s*\(",
);

static DEFAULT_IMPORT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:using|import)\s+(?:static\s+)?([A-Za-z_][A-Za-z0-9_.]*)\s*;")
        .expect("import pattern is valid")
});

/// Errors related to merge pattern construction
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// Custom declaration template did not contain the `{NAME}` slot
    #[error("declaration template is missing the {NAME_SLOT} slot")]
    MissingNameSlot,

    /// Template expanded to an invalid pattern
    #[error("declaration template is not a valid pattern: {0}")]
    InvalidTemplate(#[from] regex::Error),
}

/// Compiled/configured patterns for method extraction and import rewriting.
///
/// Constructed once and passed by reference. The defaults cover the
/// dotted-namespace, brace-delimited source family the generator emits.
#[derive(Debug, Clone)]
pub struct MergePatterns {
    decl_template: String,
    import_line: Regex,
    /// Import namespaces with any of these prefixes are generator
    /// placeholders and get stripped during test rebinding.
    placeholder_namespaces: Vec<String>,
}

impl Default for MergePatterns {
    fn default() -> Self {
        Self {
            decl_template: DEFAULT_DECL_TEMPLATE.to_string(),
            import_line: DEFAULT_IMPORT_LINE.clone(),
            placeholder_namespaces: vec![
                "Placeholder".to_string(),
                "Placeholders".to_string(),
                "GeneratedStubs".to_string(),
            ],
        }
    }
}

impl MergePatterns {
    /// Create patterns with a custom declaration template.
    ///
    /// The template must contain the literal `{NAME}` slot, which is
    /// replaced with the escaped method name at extraction time.
    ///
    /// # Errors
    /// Returns [`MergeError`] when the slot is missing or the expanded
    /// template does not compile.
    pub fn with_decl_template(template: impl Into<String>) -> Result<Self, MergeError> {
        let template = template.into();
        if !template.contains(NAME_SLOT) {
            return Err(MergeError::MissingNameSlot);
        }
        // Compile once against a probe name to validate the template.
        Regex::new(&template.replace(NAME_SLOT, "probe"))?;
        Ok(Self {
            decl_template: template,
            ..Self::default()
        })
    }

    /// Replace the placeholder namespace prefixes.
    #[must_use]
    pub fn with_placeholder_namespaces(mut self, namespaces: Vec<String>) -> Self {
        self.placeholder_namespaces = namespaces;
        self
    }

    /// Placeholder namespace prefixes stripped during test rebinding.
    #[must_use]
    pub fn placeholder_namespaces(&self) -> &[String] {
        &self.placeholder_namespaces
    }

    /// Import-line pattern (`using X;` / `import X;`).
    #[must_use]
    pub(crate) fn import_line(&self) -> &Regex {
        &self.import_line
    }

    fn decl_for(&self, method_name: &str) -> Option<Regex> {
        let expanded = self
            .decl_template
            .replace(NAME_SLOT, &regex::escape(method_name));
        // Template was validated at construction; an escaped name cannot
        // break it, but stay total anyway.
        Regex::new(&expanded).ok()
    }
}

/// Byte range of one extracted method, leading trivia included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSpan {
    /// Start byte offset (beginning of the first trivia/declaration line)
    pub start: usize,
    /// End byte offset (one past the closing brace)
    pub end: usize,
}

impl MethodSpan {
    /// The spanned text.
    #[inline]
    #[must_use]
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

/// Extract the span of the named method from `source`.
///
/// Returns `None` when no block-bodied declaration of that name is found.
/// Declarations whose body is `;` (abstract/extern) or `=>` are skipped in
/// favor of a later block-bodied one.
#[must_use]
pub fn extract_method(source: &str, method_name: &str, patterns: &MergePatterns) -> Option<MethodSpan> {
    let decl = patterns.decl_for(method_name)?;

    for m in decl.find_iter(source) {
        // The match ends on the opening parenthesis of the parameter list.
        let paren_idx = m.end() - 1;
        let Some(params_end) = find_block_end(source, paren_idx, b'(', b')') else {
            continue;
        };
        let Some(body_open) = find_body_open(source, params_end) else {
            continue;
        };
        let Some(end) = find_block_end(source, body_open, b'{', b'}') else {
            continue;
        };
        let start = leading_trivia_start(source, m.start());
        return Some(MethodSpan { start, end });
    }
    None
}

/// Scan past any where-clause to the opening brace of the body.
///
/// Returns `None` when the declaration turns out not to have a block body
/// (`;` terminator or `=>` expression body).
fn find_body_open(source: &str, from: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => return Some(i),
            b';' => return None,
            b'=' if bytes.get(i + 1) == Some(&b'>') => return None,
            _ => i += 1,
        }
    }
    None
}

/// Walk backward from the declaration line over contiguous blank, comment,
/// and attribute lines; the span starts at the first of them.
fn leading_trivia_start(source: &str, decl_start: usize) -> usize {
    let mut start = decl_start;
    loop {
        let Some(line_start) = previous_line_start(source, start) else {
            return start;
        };
        let line = source[line_start..start].trim_end_matches(['\n', '\r']);
        if is_trivia_line(line) {
            start = line_start;
        } else {
            return start;
        }
    }
}

fn previous_line_start(source: &str, current_start: usize) -> Option<usize> {
    if current_start == 0 {
        return None;
    }
    // current_start sits just after a '\n' (or at file start).
    let before = &source[..current_start - 1];
    Some(before.rfind('\n').map_or(0, |idx| idx + 1))
}

fn is_trivia_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty()
        || trimmed.starts_with("//")
        || trimmed.starts_with("/*")
        || trimmed.starts_with('*')
        || trimmed.ends_with("*/")
        || (trimmed.starts_with('[') && trimmed.ends_with(']'))
}
