use crate::deps::DependencyScanner;
use crate::sast::SastScanner;
use crate::scoring::calculate_metrics;
use crate::secrets::SecretScanner;
use crate::types::{ComprehensiveSecurityReport, OwaspStatus};
use chrono::Utc;
use log::info;
use std::fmt::Write as _;
use std::path::Path;
use std::time::Instant;

const SUMMARY_WIDTH: usize = 72;

/// Fork-join orchestrator. The three scanners are independent by contract:
/// none reads another's output, no file handle or matcher is shared, and
/// every `scan()` call is a fresh computation with no cross-call state.
pub struct SecurityService {
    sast: SastScanner,
    secrets: SecretScanner,
    deps: DependencyScanner,
}

impl Default for SecurityService {
    fn default() -> Self {
        Self::new()
    }
}

impl SecurityService {
    pub fn new() -> Self {
        Self {
            sast: SastScanner::new(),
            secrets: SecretScanner::new(),
            deps: DependencyScanner::new(),
        }
    }

    /// Explicit-collaborator constructor so callers (and tests) can swap in
    /// their own scanner values.
    pub fn with_scanners(
        sast: SastScanner,
        secrets: SecretScanner,
        deps: DependencyScanner,
    ) -> Self {
        Self { sast, secrets, deps }
    }

    pub fn sast_scanner(&self) -> &SastScanner {
        &self.sast
    }

    pub fn secret_scanner(&self) -> &SecretScanner {
        &self.secrets
    }

    pub fn dependency_scanner(&self) -> &DependencyScanner {
        &self.deps
    }

    /// Run all three scans concurrently, wait for every one of them, then
    /// score. A report is always produced: scanner-internal failures have
    /// already degraded to empty sub-results by the time they reach here.
    pub fn scan(&self, dir: &Path) -> ComprehensiveSecurityReport {
        let started = Instant::now();
        info!("starting security scan of {}", dir.display());

        let (sast, (secrets, dependencies)) = rayon::join(
            || self.sast.scan(dir, None),
            || rayon::join(|| self.secrets.scan(dir), || self.deps.scan(dir)),
        );

        let metrics = calculate_metrics(Some(&sast), Some(&secrets), Some(&dependencies));
        info!(
            "scan finished: score {} ({:?}), {} findings",
            metrics.score.overall, metrics.score.grade, metrics.summary.total
        );

        ComprehensiveSecurityReport {
            metrics,
            sast,
            secrets,
            dependencies,
            scan_timestamp: Utc::now(),
            scan_duration_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// Fixed-width plain-text summary of a report. Presentation only; never
/// feeds back into scoring.
pub fn format_report_summary(report: &ComprehensiveSecurityReport) -> String {
    let mut out = String::new();
    let rule = "=".repeat(SUMMARY_WIDTH);
    let thin = "-".repeat(SUMMARY_WIDTH);
    let score = &report.metrics.score;
    let summary = &report.metrics.summary;

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, " SECURITY SCAN SUMMARY");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(
        out,
        " Score: {:>3}/100  Grade: {:?}  Risk: {}",
        score.overall,
        score.grade,
        score.risk_level.label()
    );
    let _ = writeln!(
        out,
        " Findings: {} total | {} critical | {} high | {} medium | {} low | {} fixable",
        summary.total, summary.critical, summary.high, summary.medium, summary.low, summary.fixable
    );
    let _ = writeln!(
        out,
        " Facets: sast {:>3} | secrets {:>3} | dependencies {:>3} | code quality {:>3}",
        score.breakdown.sast,
        score.breakdown.secrets,
        score.breakdown.dependencies,
        score.breakdown.code_quality
    );
    let _ = writeln!(out, "{thin}");
    let _ = writeln!(out, " OWASP Top 10 (2021)");
    for (id, category) in &report.metrics.owasp {
        let status = match category.status {
            OwaspStatus::Pass => "pass",
            OwaspStatus::Warning => "warn",
            OwaspStatus::Fail => "FAIL",
            OwaspStatus::Unknown => "????",
        };
        let _ = writeln!(
            out,
            "  {id} {:<48} {status} ({})",
            category.name, category.findings
        );
    }

    if !report.metrics.recommendations.is_empty() {
        let _ = writeln!(out, "{thin}");
        let _ = writeln!(out, " Top recommendations");
        for (i, rec) in report.metrics.recommendations.iter().take(3).enumerate() {
            let _ = writeln!(
                out,
                "  {}. [{}] {}",
                i + 1,
                rec.priority.label(),
                rec.title
            );
        }
    }
    let _ = writeln!(out, "{rule}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn scan_always_produces_a_full_report() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.ts"), "const out = eval(payload);\n").unwrap();
        fs::write(
            dir.path().join("config.ts"),
            "const password = \"supersecret123\";\n",
        )
        .unwrap();

        let service = SecurityService::new();
        let report = service.scan(dir.path());

        assert_eq!(report.sast.summary.total, 1);
        assert_eq!(report.secrets.summary.total, 1);
        // No manifest in the fixture tree: dependency facet degrades to
        // an all-zero result instead of failing the scan.
        assert!(report.dependencies.degraded);
        assert_eq!(report.dependencies.summary.total, 0);
        assert!(report.metrics.score.overall < 100);
        assert_eq!(report.metrics.summary.total, 2);
    }

    #[test]
    fn summary_rendering_is_pure_presentation() {
        let dir = TempDir::new().unwrap();
        let service = SecurityService::new();
        let report = service.scan(dir.path());

        let text = format_report_summary(&report);
        assert!(text.contains("SECURITY SCAN SUMMARY"));
        assert!(text.contains("A01"));
        assert!(text.contains("A10"));
        assert!(text.contains("Score: 100/100"));

        // Rendering twice changes nothing.
        assert_eq!(text, format_report_summary(&report));
    }
}
