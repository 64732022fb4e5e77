//! Merge engine
//!
//! Verbatim method splice with full-file-replacement fallback, plus the
//! import-rebinding pass applied to deployed test scaffolding.

use crate::extract::{extract_method, MergePatterns};

/// Outcome of a method-level merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    /// Final file content
    pub content: String,
    /// True when the method could not be found on one side and the whole
    /// file was replaced instead of spliced
    pub degraded: bool,
}

/// Merge the named method from `generated` into `existing`.
///
/// When the method is found in both texts, the existing span is replaced
/// with the generated one and every other byte of `existing` is preserved.
/// When either extraction fails (renamed or malformed method), the result
/// is the full generated text with `degraded` set; the caller gets a file
/// that compiles at the cost of unrelated edits being overwritten.
#[must_use]
pub fn merge_method(
    existing: &str,
    generated: &str,
    method_name: &str,
    patterns: &MergePatterns,
) -> MergeResult {
    let old_span = extract_method(existing, method_name, patterns);
    let new_span = extract_method(generated, method_name, patterns);

    match (old_span, new_span) {
        (Some(old), Some(new)) => {
            let mut content =
                String::with_capacity(existing.len() + new.end - new.start);
            content.push_str(&existing[..old.start]);
            content.push_str(new.text(generated));
            content.push_str(&existing[old.end..]);
            MergeResult {
                content,
                degraded: false,
            }
        }
        (old, _) => {
            tracing::warn!(
                method = method_name,
                found_in_existing = old.is_some(),
                "method not found on both sides; replacing whole file"
            );
            MergeResult {
                content: generated.to_string(),
                degraded: true,
            }
        }
    }
}

/// Rebind test scaffolding imports to the real implementation namespace.
///
/// Inserts an import of `real_namespace` unless one is already present and
/// strips imports of known placeholder namespaces, so tests written against
/// a generated stand-in bind to the real implementation after deployment.
#[must_use]
pub fn rebind_test_imports(
    content: &str,
    real_namespace: &str,
    patterns: &MergePatterns,
) -> String {
    let import_line = patterns.import_line();
    let mut lines: Vec<String> = Vec::new();
    let mut has_real = false;
    let mut last_import_idx: Option<usize> = None;

    for line in content.lines() {
        if let Some(caps) = import_line.captures(line) {
            let ns = &caps[1];
            if is_placeholder(ns, patterns) {
                // Dropped: the stand-in no longer exists after deployment.
                continue;
            }
            if ns == real_namespace {
                has_real = true;
            }
            last_import_idx = Some(lines.len());
        }
        lines.push(line.to_string());
    }

    if !has_real {
        let import = format!("using {real_namespace};");
        match last_import_idx {
            Some(idx) => lines.insert(idx + 1, import),
            None => lines.insert(0, import),
        }
    }

    let mut result = lines.join("\n");
    if content.ends_with('\n') {
        result.push('\n');
    }
    result
}

fn is_placeholder(namespace: &str, patterns: &MergePatterns) -> bool {
    patterns.placeholder_namespaces().iter().any(|p| {
        namespace == p || namespace.starts_with(&format!("{p}."))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const EXISTING: &str = r#"namespace Acme.Billing;

public class InvoiceService
{
    // old total logic
    public decimal ComputeTotal(IEnumerable<Line> lines)
    {
        return 0m;
    }

    // unrelated comment
    public void Reset()
    {
        counter = 0;
    }
}
"#;

    const GENERATED: &str = r#"namespace Acme.Billing;

public class InvoiceService
{
    // summed total
    public decimal ComputeTotal(IEnumerable<Line> lines)
    {
        var total = lines.Sum(l => l.Amount);
        return total;
    }
}
"#;

    #[test]
    fn splices_only_the_target_method() {
        let result = merge_method(EXISTING, GENERATED, "ComputeTotal", &MergePatterns::default());
        assert!(!result.degraded);
        assert!(result.content.contains("lines.Sum(l => l.Amount)"));
        // Everything outside the method's span survives byte for byte.
        assert!(result.content.contains("// unrelated comment"));
        assert!(result.content.contains("counter = 0;"));
        assert!(!result.content.contains("return 0m;"));
        // The comment adjacent to the old declaration belongs to its span
        // and travels with it; the generated unit brings its own trivia.
        assert!(!result.content.contains("// old total logic"));
        assert!(result.content.contains("// summed total"));
    }

    #[test]
    fn merge_then_extract_round_trips() {
        let patterns = MergePatterns::default();
        let result = merge_method(EXISTING, GENERATED, "ComputeTotal", &patterns);
        let new_span = extract_method(GENERATED, "ComputeTotal", &patterns).unwrap();
        let merged_span = extract_method(&result.content, "ComputeTotal", &patterns).unwrap();
        assert_eq!(
            merged_span.text(&result.content).trim(),
            new_span.text(GENERATED).trim()
        );
    }

    #[test]
    fn round_trip_preserves_brace_heavy_and_verbatim_bodies() {
        let existing = "class C {\n    public string Sql()\n    {\n        if (x) { y(); }\n        return \"{ literal }\";\n    }\n}\n";
        let generated = "class C {\n    public string Sql()\n    {\n        if (x) { z(); } else { w(); }\n        return @\"SELECT {\n  nested } \"\" quote\";\n    }\n}\n";
        let patterns = MergePatterns::default();

        let result = merge_method(existing, generated, "Sql", &patterns);
        assert!(!result.degraded);

        let new_span = extract_method(generated, "Sql", &patterns).unwrap();
        let merged_span = extract_method(&result.content, "Sql", &patterns).unwrap();
        assert_eq!(
            merged_span.text(&result.content),
            new_span.text(generated)
        );
        assert!(!result.content.contains("{ literal }"));
    }

    #[test]
    fn missing_method_degrades_to_full_replacement() {
        let result = merge_method(EXISTING, GENERATED, "Renamed", &MergePatterns::default());
        assert!(result.degraded);
        assert_eq!(result.content, GENERATED);
    }

    #[test]
    fn method_only_in_existing_degrades() {
        let result = merge_method(EXISTING, GENERATED, "Reset", &MergePatterns::default());
        assert!(result.degraded);
        assert_eq!(result.content, GENERATED);
    }

    #[test]
    fn merge_is_idempotent() {
        let patterns = MergePatterns::default();
        let once = merge_method(EXISTING, GENERATED, "ComputeTotal", &patterns);
        let twice = merge_method(&once.content, GENERATED, "ComputeTotal", &patterns);
        assert_eq!(once.content, twice.content);
    }

    #[test]
    fn rebind_inserts_missing_import_after_existing_ones() {
        let content = "using System;\nusing System.Linq;\n\nnamespace Tests;\n\nclass FooTests { }\n";
        let rebound = rebind_test_imports(content, "Acme.Billing", &MergePatterns::default());
        assert_eq!(
            rebound,
            "using System;\nusing System.Linq;\nusing Acme.Billing;\n\nnamespace Tests;\n\nclass FooTests { }\n"
        );
    }

    #[test]
    fn rebind_strips_placeholder_imports() {
        let content = "using System;\nusing Placeholder.Billing;\n\nclass FooTests { }\n";
        let rebound = rebind_test_imports(content, "Acme.Billing", &MergePatterns::default());
        assert!(!rebound.contains("Placeholder.Billing"));
        assert!(rebound.contains("using Acme.Billing;"));
    }

    #[test]
    fn rebind_is_idempotent_when_import_present() {
        let content = "using Acme.Billing;\n\nclass FooTests { }\n";
        let rebound = rebind_test_imports(content, "Acme.Billing", &MergePatterns::default());
        assert_eq!(rebound, content);
    }

    #[test]
    fn rebind_with_no_imports_inserts_at_top() {
        let content = "namespace Tests;\n\nclass FooTests { }\n";
        let rebound = rebind_test_imports(content, "Acme.Billing", &MergePatterns::default());
        assert!(rebound.starts_with("using Acme.Billing;\n"));
    }
}
