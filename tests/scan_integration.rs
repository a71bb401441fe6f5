use secaudit::deps::DependencyScanner;
use secaudit::service::{format_report_summary, SecurityService};
use secaudit::types::{AuditSeverity, OwaspStatus};
use std::fs;
use tempfile::TempDir;

fn write_fixture_project(dir: &TempDir) {
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(
        dir.path().join("src/handlers.ts"),
        r#"export function run(payload: string) {
  const result = eval(payload);
  db.query(`SELECT * FROM users WHERE id = ${payload}`);
  return result;
}
"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("src/config.ts"),
        "export const password = \"supersecret123\";\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("src/safe.ts"),
        "// const password = \"commented-out-secret\";\nconst fromEnv = process.env.API_KEY;\n",
    )
    .unwrap();
}

#[test]
fn full_scan_produces_consistent_report() {
    let dir = TempDir::new().unwrap();
    write_fixture_project(&dir);

    let report = SecurityService::new().scan(dir.path());

    // Two SAST findings (eval + SQL template), both critical.
    assert_eq!(report.sast.summary.total, report.sast.findings.len());
    assert!(report.sast.summary.critical >= 2);

    // Exactly one secret: the commented and env-derived lines are suppressed.
    assert_eq!(report.secrets.findings.len(), 1);
    assert_eq!(report.secrets.findings[0].file, "src/config.ts");

    // Summary counts partition the finding lists.
    for summary in [&report.sast.summary, &report.secrets.summary] {
        assert_eq!(
            summary.critical + summary.high + summary.medium + summary.low,
            summary.total
        );
    }

    // Injection findings fail A03; the fused summary covers all scanners.
    assert_eq!(report.metrics.owasp["A03"].status, OwaspStatus::Fail);
    assert!(report.metrics.score.overall < 100);
    assert!(report
        .metrics
        .recommendations
        .iter()
        .any(|r| r.title == "Remove hardcoded secrets"));

    let text = format_report_summary(&report);
    assert!(text.contains("SECURITY SCAN SUMMARY"));
    assert!(text.contains("A06"));
}

#[test]
fn clean_tree_scores_perfect() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("lib.ts"), "export const one = 1;\n").unwrap();

    let report = SecurityService::new().scan(dir.path());
    assert_eq!(report.metrics.summary.total, 0);
    assert_eq!(report.metrics.score.overall, 100);
    assert!(report.metrics.recommendations.is_empty());
    assert!(report
        .metrics
        .owasp
        .values()
        .all(|c| c.status == OwaspStatus::Pass));
}

#[cfg(unix)]
#[test]
fn dependency_scan_parses_stub_audit_despite_nonzero_exit() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("package.json"),
        r#"{"dependencies": {"lodash": "^4.17.0"}, "devDependencies": {"jest": "27.0.0"}}"#,
    )
    .unwrap();
    fs::create_dir_all(dir.path().join("node_modules/lodash")).unwrap();
    fs::write(
        dir.path().join("node_modules/lodash/package.json"),
        r#"{"name": "lodash", "version": "4.17.20"}"#,
    )
    .unwrap();

    // Stub npm: emits canned JSON and exits 1, the way the real tool does
    // when vulnerabilities or outdated packages exist.
    let stub = dir.path().join("fake-npm");
    fs::write(
        &stub,
        r#"#!/bin/sh
if [ "$1" = "audit" ]; then
cat <<'EOF'
{"vulnerabilities": {"lodash": {
  "severity": "high",
  "isDirect": true,
  "range": "<4.17.21",
  "via": [{"title": "Prototype pollution", "severity": "moderate",
           "cwe": ["CWE-1321"], "url": "https://github.com/advisories/x"}],
  "nodes": ["node_modules/lodash"],
  "fixAvailable": {"name": "lodash", "version": "4.17.21", "isSemVerMajor": false}
}}}
EOF
exit 1
elif [ "$1" = "outdated" ]; then
cat <<'EOF'
{"jest": {"current": "27.0.0", "wanted": "27.5.1", "latest": "29.7.0", "type": "devDependencies"}}
EOF
exit 1
fi
"#,
    )
    .unwrap();
    fs::set_permissions(&stub, fs::Permissions::from_mode(0o755)).unwrap();

    let scanner = DependencyScanner::with_program(stub.to_string_lossy());
    let result = scanner.scan(dir.path());

    assert!(!result.degraded);
    assert_eq!(result.direct_dependencies, 1);
    assert_eq!(result.dev_dependencies, 1);
    assert_eq!(result.total_dependencies, 2);

    assert_eq!(result.vulnerabilities.len(), 1);
    let vuln = &result.vulnerabilities[0];
    assert_eq!(vuln.package, "lodash");
    // Installed version from node_modules, not the advisory's range.
    assert_eq!(vuln.version, "4.17.20");
    assert_eq!(vuln.vulnerable_range, "<4.17.21");
    // Entry-level severity wins over the via detail's "moderate".
    assert_eq!(vuln.severity, AuditSeverity::High);
    assert!(vuln.fix_available);
    assert_eq!(vuln.recommendation, "Update lodash to 4.17.21");

    assert_eq!(result.outdated.len(), 1);
    assert_eq!(result.summary.high, 1);
    assert_eq!(result.summary.total, 1);
}
