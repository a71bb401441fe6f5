use crate::files::{collect_files, relative_display, WalkSpec};
use crate::rules::{all_rules, CompiledRule};
use crate::types::{Confidence, FindingSummary, SastFinding, SastScanResult, Severity};
use log::{debug, warn};
use std::fs;
use std::path::Path;
use std::time::Instant;

/// 1-based line and column for a byte offset. Column is measured from the
/// preceding newline, matching editor conventions.
pub(crate) fn line_col(text: &str, offset: usize) -> (usize, usize) {
    let prefix = &text[..offset];
    let line = prefix.bytes().filter(|b| *b == b'\n').count() + 1;
    let column = match prefix.rfind('\n') {
        Some(pos) => offset - pos,
        None => offset + 1,
    };
    (line, column)
}

/// The full source line containing `offset`.
pub(crate) fn line_at(text: &str, offset: usize) -> &str {
    let start = text[..offset].rfind('\n').map(|p| p + 1).unwrap_or(0);
    let end = text[offset..]
        .find('\n')
        .map(|p| offset + p)
        .unwrap_or(text.len());
    &text[start..end]
}

pub(crate) fn truncate_snippet(line: &str, max_chars: usize) -> String {
    line.trim().chars().take(max_chars).collect()
}

const SNIPPET_MAX_CHARS: usize = 200;

/// Pattern-based code vulnerability scanner. Applies the whole rule catalog
/// against each file's full content; rules carry the extension sets they
/// apply to.
pub struct SastScanner {
    rules: &'static [CompiledRule],
}

impl Default for SastScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl SastScanner {
    pub fn new() -> Self {
        Self { rules: all_rules() }
    }

    pub fn scan(&self, root: &Path, extensions: Option<&[&str]>) -> SastScanResult {
        let started = Instant::now();
        let files = collect_files(root, &WalkSpec::sources(extensions));
        debug!("sast: scanning {} files under {}", files.len(), root.display());

        let mut findings = Vec::new();
        let mut files_scanned = 0usize;
        let mut lines_analyzed = 0usize;

        for (file_index, path) in files.iter().enumerate() {
            let content = match fs::read_to_string(path) {
                Ok(content) => content,
                Err(e) => {
                    warn!("sast: skipping unreadable file {}: {e}", path.display());
                    continue;
                }
            };
            files_scanned += 1;
            lines_analyzed += content.lines().count();

            let extension = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_string();
            let display_path = relative_display(root, path);

            for rule in self.rules.iter().filter(|r| r.applies_to(&extension)) {
                // find_iter builds a fresh iterator per file/rule pair, so no
                // match position leaks across files.
                for m in rule.regex.find_iter(&content) {
                    let (line, column) = line_col(&content, m.start());
                    let line_text = line_at(&content, m.start());
                    findings.push(SastFinding {
                        id: format!("{}-{}-{}", rule.rule.id, file_index, m.start()),
                        category: rule.rule.category,
                        severity: rule.rule.severity,
                        title: rule.rule.title.to_string(),
                        file: display_path.clone(),
                        line,
                        column,
                        snippet: truncate_snippet(line_text, SNIPPET_MAX_CHARS),
                        remediation: rule.rule.remediation.to_string(),
                        confidence: classify_confidence(rule.rule.severity, line_text),
                        cwe: rule.rule.cwe,
                        owasp: rule.rule.owasp,
                        auto_fixable: rule.rule.auto_fixable,
                    });
                }
            }
        }

        let summary = FindingSummary::tally(findings.iter().map(|f| f.severity));
        SastScanResult {
            findings,
            files_scanned,
            lines_analyzed,
            duration_ms: started.elapsed().as_millis() as u64,
            summary,
        }
    }
}

/// Heuristic triage confidence. Critical rules always report high confidence
/// (kept for compatibility with the original classifier); lines that mention
/// user input or a request accessor are promoted to high; everything else is
/// medium. SAST findings never use low confidence.
fn classify_confidence(severity: Severity, line_text: &str) -> Confidence {
    if severity == Severity::Critical {
        return Confidence::High;
    }
    let lower = line_text.to_lowercase();
    if lower.contains("user")
        || lower.contains("input")
        || lower.contains("req.")
        || lower.contains("request.")
    {
        Confidence::High
    } else {
        Confidence::Medium
    }
}
