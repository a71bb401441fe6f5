use crate::types::{
    CategoryRollup, DependencyScanResult, Grade, MetricsSummary, OwaspCategory, OwaspCompliance,
    OwaspStatus, Recommendation, RiskLevel, SastScanResult, ScoreBreakdown, SecretScanResult,
    SecurityMetrics, SecurityScore, Severity,
};
use std::collections::BTreeMap;

/// Facet blend weights.
const SAST_WEIGHT: f64 = 0.35;
const SECRETS_WEIGHT: f64 = 0.35;
const DEPS_WEIGHT: f64 = 0.30;

/// Fractional penalty per outdated package on the dependency facet.
const OUTDATED_PENALTY: f64 = 0.5;

const OWASP_CATEGORIES: &[(&str, &str)] = &[
    ("A01", "Broken Access Control"),
    ("A02", "Cryptographic Failures"),
    ("A03", "Injection"),
    ("A04", "Insecure Design"),
    ("A05", "Security Misconfiguration"),
    ("A06", "Vulnerable and Outdated Components"),
    ("A07", "Identification and Authentication Failures"),
    ("A08", "Software and Data Integrity Failures"),
    ("A09", "Security Logging and Monitoring Failures"),
    ("A10", "Server-Side Request Forgery (SSRF)"),
];

const SECRET_CATEGORY: &str = "hardcoded_secrets";
const SECRET_OWASP: &str = "A02";
const DEPENDENCY_CATEGORY: &str = "vulnerable_dependencies";
const DEPENDENCY_OWASP: &str = "A06";

/// One finding flattened out of whichever scanner produced it. Dependency
/// severities are normalized ("moderate" becomes medium) at this boundary
/// only; the originating sub-result keeps its own labels.
struct FusedFinding {
    severity: Severity,
    category: String,
    owasp: Option<&'static str>,
    fixable: bool,
}

/// Pure fusion of the three scan results into one scored view. Every input
/// is optional; an absent facet contributes a perfect sub-score, so the
/// engine is usable with any subset of scanners run.
pub fn calculate_metrics(
    sast: Option<&SastScanResult>,
    secrets: Option<&SecretScanResult>,
    deps: Option<&DependencyScanResult>,
) -> SecurityMetrics {
    let fused = fuse_findings(sast, secrets, deps);

    let sast_score = match sast {
        None => 100.0,
        Some(r) => clamp_score(100.0 - deduction(r.findings.iter().map(|f| f.severity))),
    };
    let secrets_score = match secrets {
        None => 100.0,
        Some(r) => clamp_score(100.0 - deduction(r.findings.iter().map(|f| f.severity))),
    };
    let outdated_count = deps.map(|r| r.outdated.len()).unwrap_or(0);
    let deps_score = match deps {
        None => 100.0,
        Some(r) => clamp_score(
            100.0
                - deduction(r.vulnerabilities.iter().map(|v| v.severity.normalized()))
                - OUTDATED_PENALTY * r.outdated.len() as f64,
        ),
    };

    let total_deduction = deduction(fused.iter().map(|f| f.severity));
    let blended =
        SAST_WEIGHT * sast_score + SECRETS_WEIGHT * secrets_score + DEPS_WEIGHT * deps_score;
    let overall = (blended - total_deduction.min(100.0) / 2.0)
        .max(0.0)
        .round()
        .min(100.0) as u32;

    let summary = summarize(&fused);
    let fixable = summary.fixable;
    let code_quality = clamp_score(
        100.0 - 2.0 * fixable as f64 - OUTDATED_PENALTY * outdated_count as f64,
    );

    let score = SecurityScore {
        overall,
        grade: Grade::from_score(overall),
        breakdown: ScoreBreakdown {
            sast: sast_score.round() as u32,
            secrets: secrets_score.round() as u32,
            dependencies: deps_score.round() as u32,
            code_quality: code_quality.round() as u32,
        },
        risk_level: risk_level(overall, summary.critical, summary.high),
    };

    SecurityMetrics {
        score,
        owasp: owasp_compliance(&fused),
        summary,
        categories: category_rollup(&fused),
        recommendations: recommendations(sast, secrets, deps),
    }
}

fn fuse_findings(
    sast: Option<&SastScanResult>,
    secrets: Option<&SecretScanResult>,
    deps: Option<&DependencyScanResult>,
) -> Vec<FusedFinding> {
    let mut fused = Vec::new();
    if let Some(result) = sast {
        for f in &result.findings {
            fused.push(FusedFinding {
                severity: f.severity,
                category: f.category.name().to_string(),
                owasp: Some(f.owasp),
                fixable: f.auto_fixable,
            });
        }
    }
    if let Some(result) = secrets {
        for f in &result.findings {
            fused.push(FusedFinding {
                severity: f.severity,
                category: SECRET_CATEGORY.to_string(),
                owasp: Some(SECRET_OWASP),
                fixable: false,
            });
        }
    }
    if let Some(result) = deps {
        for v in &result.vulnerabilities {
            fused.push(FusedFinding {
                severity: v.severity.normalized(),
                category: DEPENDENCY_CATEGORY.to_string(),
                owasp: Some(DEPENDENCY_OWASP),
                fixable: v.fix_available,
            });
        }
    }
    fused
}

fn deduction(severities: impl Iterator<Item = Severity>) -> f64 {
    severities.map(|s| s.weight()).sum()
}

fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, 100.0)
}

/// Evaluated top to bottom; the first matching rung wins.
fn risk_level(score: u32, critical: usize, high: usize) -> RiskLevel {
    if critical > 0 || score < 40 {
        RiskLevel::Critical
    } else if high > 2 || score < 60 {
        RiskLevel::High
    } else if high > 0 || score < 75 {
        RiskLevel::Medium
    } else if score < 90 {
        RiskLevel::Low
    } else {
        RiskLevel::Minimal
    }
}

fn summarize(fused: &[FusedFinding]) -> MetricsSummary {
    let mut summary = MetricsSummary {
        total: fused.len(),
        ..MetricsSummary::default()
    };
    for finding in fused {
        match finding.severity {
            Severity::Critical => summary.critical += 1,
            Severity::High => summary.high += 1,
            Severity::Medium => summary.medium += 1,
            Severity::Low => summary.low += 1,
        }
        if finding.fixable {
            summary.fixable += 1;
        }
    }
    summary
}

/// All ten categories start at "pass". Critical/high findings force "fail"
/// irreversibly; a medium finding only upgrades a still-"pass" category to
/// "warning".
fn owasp_compliance(fused: &[FusedFinding]) -> OwaspCompliance {
    let mut compliance: OwaspCompliance = OWASP_CATEGORIES
        .iter()
        .map(|(id, name)| {
            (
                *id,
                OwaspCategory {
                    name,
                    status: OwaspStatus::Pass,
                    findings: 0,
                },
            )
        })
        .collect();

    for finding in fused {
        let id = match finding.owasp {
            Some(id) => id,
            None => continue,
        };
        if let Some(category) = compliance.get_mut(id) {
            category.findings += 1;
            match finding.severity {
                Severity::Critical | Severity::High => category.status = OwaspStatus::Fail,
                Severity::Medium => {
                    if category.status == OwaspStatus::Pass {
                        category.status = OwaspStatus::Warning;
                    }
                }
                Severity::Low => {}
            }
        }
    }

    compliance
}

fn title_case(raw: &str) -> String {
    raw.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn category_rollup(fused: &[FusedFinding]) -> Vec<CategoryRollup> {
    let mut groups: BTreeMap<&str, (usize, Severity)> = BTreeMap::new();
    for finding in fused {
        let entry = groups
            .entry(finding.category.as_str())
            .or_insert((0, finding.severity));
        entry.0 += 1;
        if finding.severity.rank() > entry.1.rank() {
            entry.1 = finding.severity;
        }
    }

    let mut rollup: Vec<CategoryRollup> = groups
        .into_iter()
        .map(|(name, (count, highest_severity))| CategoryRollup {
            name: title_case(name),
            count,
            highest_severity,
        })
        .collect();
    rollup.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    rollup
}

/// Fixed rule set, evaluated in order, then stably sorted by priority so the
/// rule order is preserved within a tier. Rules are independent, not
/// mutually exclusive.
fn recommendations(
    sast: Option<&SastScanResult>,
    secrets: Option<&SecretScanResult>,
    deps: Option<&DependencyScanResult>,
) -> Vec<Recommendation> {
    use crate::types::VulnCategory;

    let mut recs = Vec::new();

    let secret_count = secrets.map(|r| r.findings.len()).unwrap_or(0);
    if secret_count > 0 {
        recs.push(Recommendation {
            priority: Severity::Critical,
            title: "Remove hardcoded secrets".to_string(),
            description: format!(
                "{secret_count} hardcoded secret(s) found. Move them to environment \
                 variables or a secrets manager and rotate the exposed values."
            ),
        });
    }

    let critical_deps = deps
        .map(|r| {
            r.vulnerabilities
                .iter()
                .filter(|v| v.severity.normalized() == Severity::Critical)
                .count()
        })
        .unwrap_or(0);
    if critical_deps > 0 {
        recs.push(Recommendation {
            priority: Severity::Critical,
            title: "Update critical dependencies".to_string(),
            description: format!(
                "{critical_deps} dependency vulnerabilit(ies) of critical severity. \
                 Apply the patched versions immediately."
            ),
        });
    }

    let injection_count = sast
        .map(|r| {
            r.findings
                .iter()
                .filter(|f| f.category.is_injection())
                .count()
        })
        .unwrap_or(0);
    if injection_count > 0 {
        recs.push(Recommendation {
            priority: Severity::High,
            title: "Fix injection vulnerabilities".to_string(),
            description: format!(
                "{injection_count} SQL/command/XSS injection finding(s). Parameterize \
                 queries and sanitize rendered output."
            ),
        });
    }

    let outdated_count = deps.map(|r| r.outdated.len()).unwrap_or(0);
    if outdated_count > 5 {
        recs.push(Recommendation {
            priority: Severity::Medium,
            title: "Update outdated dependencies".to_string(),
            description: format!(
                "{outdated_count} packages are behind their latest release. Schedule \
                 an upgrade pass."
            ),
        });
    }

    let weak_crypto_count = sast
        .map(|r| {
            r.findings
                .iter()
                .filter(|f| {
                    matches!(
                        f.category,
                        VulnCategory::WeakCrypto | VulnCategory::InsecureRandom
                    )
                })
                .count()
        })
        .unwrap_or(0);
    if weak_crypto_count > 0 {
        recs.push(Recommendation {
            priority: Severity::Medium,
            title: "Upgrade cryptographic functions".to_string(),
            description: format!(
                "{weak_crypto_count} weak-cryptography finding(s). Replace broken \
                 algorithms and predictable random sources."
            ),
        });
    }

    let misconfig_count = sast
        .map(|r| {
            r.findings
                .iter()
                .filter(|f| f.category == VulnCategory::Misconfiguration)
                .count()
        })
        .unwrap_or(0);
    if misconfig_count > 0 {
        recs.push(Recommendation {
            priority: Severity::Low,
            title: "Improve security configuration".to_string(),
            description: format!(
                "{misconfig_count} misconfiguration finding(s). Review CORS, TLS, and \
                 debug settings."
            ),
        });
    }

    // sort_by_key is stable, so rule order survives within each tier.
    recs.sort_by_key(|r| std::cmp::Reverse(r.priority.rank()));
    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        AuditSeverity, Confidence, DependencyVulnerability, SastFinding, VulnCategory,
    };

    fn sast_finding(severity: Severity, category: VulnCategory, owasp: &'static str) -> SastFinding {
        SastFinding {
            id: format!("T-{}-0", category.name()),
            category,
            severity,
            title: "test".to_string(),
            file: "src/app.ts".to_string(),
            line: 1,
            column: 1,
            snippet: String::new(),
            remediation: String::new(),
            confidence: Confidence::Medium,
            cwe: "CWE-0",
            owasp,
            auto_fixable: false,
        }
    }

    fn sast_result(findings: Vec<SastFinding>) -> SastScanResult {
        let summary = crate::types::FindingSummary::tally(findings.iter().map(|f| f.severity));
        SastScanResult {
            findings,
            files_scanned: 1,
            lines_analyzed: 10,
            duration_ms: 1,
            summary,
        }
    }

    fn dep_vuln(severity: AuditSeverity) -> DependencyVulnerability {
        DependencyVulnerability {
            package: "pkg".to_string(),
            version: "1.0.0".to_string(),
            severity,
            vulnerable_range: "<2".to_string(),
            patched_versions: None,
            title: "test".to_string(),
            description: String::new(),
            cves: vec![],
            cwes: vec![],
            recommendation: "update".to_string(),
            fix_available: true,
            direct: true,
            dependency_path: vec!["pkg".to_string()],
        }
    }

    #[test]
    fn all_clean_is_perfect_score() {
        let sast = sast_result(vec![]);
        let secrets = SecretScanResult::default();
        let deps = DependencyScanResult::default();
        let metrics = calculate_metrics(Some(&sast), Some(&secrets), Some(&deps));

        assert_eq!(metrics.score.overall, 100);
        assert_eq!(metrics.score.grade, Grade::A);
        assert_eq!(metrics.score.risk_level, RiskLevel::Minimal);
        assert!(metrics.recommendations.is_empty());
        assert_eq!(metrics.owasp.len(), 10);
        assert!(metrics
            .owasp
            .values()
            .all(|c| c.status == OwaspStatus::Pass && c.findings == 0));
    }

    #[test]
    fn absent_facets_contribute_perfect_subscores() {
        let metrics = calculate_metrics(None, None, None);
        assert_eq!(metrics.score.overall, 100);
        assert_eq!(metrics.score.breakdown.sast, 100);
        assert_eq!(metrics.score.breakdown.secrets, 100);
        assert_eq!(metrics.score.breakdown.dependencies, 100);
    }

    #[test]
    fn dependency_facet_deducts_exactly_for_critical_plus_moderate() {
        let mut deps = DependencyScanResult::default();
        deps.vulnerabilities = vec![dep_vuln(AuditSeverity::Critical), dep_vuln(AuditSeverity::Moderate)];
        deps.summary = crate::types::FindingSummary::tally(
            deps.vulnerabilities.iter().map(|v| v.severity.normalized()),
        );

        let metrics = calculate_metrics(None, None, Some(&deps));
        assert_eq!(metrics.score.breakdown.dependencies, 70);
        assert_eq!(metrics.score.breakdown.sast, 100);
        assert_eq!(metrics.score.breakdown.secrets, 100);
        // blend 91 minus half the 30-point deduction
        assert_eq!(metrics.score.overall, 76);
        assert_eq!(metrics.score.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn score_is_clamped_to_zero() {
        let findings: Vec<_> = (0..20)
            .map(|_| sast_finding(Severity::Critical, VulnCategory::CommandInjection, "A03"))
            .collect();
        let sast = sast_result(findings);
        let metrics = calculate_metrics(Some(&sast), None, None);
        // Facet bottoms out at 0; the absent facets still blend in at 100,
        // so the overall lands at 0.35*0 + 0.35*100 + 0.30*100 - 100/2 = 15.
        assert_eq!(metrics.score.breakdown.sast, 0);
        assert_eq!(metrics.score.overall, 15);
        assert_eq!(metrics.score.grade, Grade::F);

        let secrets = SecretScanResult::default();
        let mut all_facets = SastScanResult::default();
        all_facets.findings = (0..20)
            .map(|_| sast_finding(Severity::Critical, VulnCategory::CommandInjection, "A03"))
            .collect();
        let metrics =
            calculate_metrics(Some(&all_facets), Some(&secrets), Some(&DependencyScanResult::default()));
        assert!(metrics.score.overall <= 100);
    }

    #[test]
    fn scoring_is_idempotent() {
        let sast = sast_result(vec![
            sast_finding(Severity::High, VulnCategory::Xss, "A03"),
            sast_finding(Severity::Medium, VulnCategory::Misconfiguration, "A05"),
        ]);
        let a = calculate_metrics(Some(&sast), None, None);
        let b = calculate_metrics(Some(&sast), None, None);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn adding_a_critical_never_improves_the_score() {
        let base = vec![sast_finding(Severity::High, VulnCategory::Xss, "A03")];
        let mut worse = base.clone();
        worse.push(sast_finding(
            Severity::Critical,
            VulnCategory::SqlInjection,
            "A03",
        ));

        let score_base = calculate_metrics(Some(&sast_result(base)), None, None)
            .score
            .overall;
        let score_worse = calculate_metrics(Some(&sast_result(worse)), None, None)
            .score
            .overall;
        assert!(score_worse <= score_base);
    }

    #[test]
    fn owasp_fail_is_irreversible_within_a_computation() {
        // Critical A03 first, then medium A03: must stay failed.
        let sast = sast_result(vec![
            sast_finding(Severity::Critical, VulnCategory::SqlInjection, "A03"),
            sast_finding(Severity::Medium, VulnCategory::Xss, "A03"),
        ]);
        let metrics = calculate_metrics(Some(&sast), None, None);
        assert_eq!(metrics.owasp["A03"].status, OwaspStatus::Fail);
        assert_eq!(metrics.owasp["A03"].findings, 2);

        // Same findings in the opposite order: same outcome.
        let sast = sast_result(vec![
            sast_finding(Severity::Medium, VulnCategory::Xss, "A03"),
            sast_finding(Severity::Critical, VulnCategory::SqlInjection, "A03"),
        ]);
        let metrics = calculate_metrics(Some(&sast), None, None);
        assert_eq!(metrics.owasp["A03"].status, OwaspStatus::Fail);
    }

    #[test]
    fn medium_upgrades_pass_to_warning_only() {
        let sast = sast_result(vec![sast_finding(
            Severity::Medium,
            VulnCategory::Misconfiguration,
            "A05",
        )]);
        let metrics = calculate_metrics(Some(&sast), None, None);
        assert_eq!(metrics.owasp["A05"].status, OwaspStatus::Warning);
        assert_eq!(metrics.owasp["A01"].status, OwaspStatus::Pass);
    }

    #[test]
    fn owasp_counts_sum_to_tagged_findings() {
        let sast = sast_result(vec![
            sast_finding(Severity::High, VulnCategory::Xss, "A03"),
            sast_finding(Severity::Low, VulnCategory::DebugExposure, "A09"),
        ]);
        let mut deps = DependencyScanResult::default();
        deps.vulnerabilities = vec![dep_vuln(AuditSeverity::High)];

        let metrics = calculate_metrics(Some(&sast), None, Some(&deps));
        let owasp_total: usize = metrics.owasp.values().map(|c| c.findings).sum();
        assert_eq!(owasp_total, 3);
        assert_eq!(metrics.summary.total, 3);
    }

    #[test]
    fn category_names_are_title_cased() {
        let sast = sast_result(vec![sast_finding(
            Severity::Critical,
            VulnCategory::SqlInjection,
            "A03",
        )]);
        let metrics = calculate_metrics(Some(&sast), None, None);
        assert_eq!(metrics.categories[0].name, "Sql Injection");
        assert_eq!(metrics.categories[0].highest_severity, Severity::Critical);
    }

    #[test]
    fn recommendations_sorted_by_priority_with_stable_rule_order() {
        let sast = sast_result(vec![
            sast_finding(Severity::Medium, VulnCategory::WeakCrypto, "A02"),
            sast_finding(Severity::Medium, VulnCategory::Misconfiguration, "A05"),
            sast_finding(Severity::Critical, VulnCategory::SqlInjection, "A03"),
        ]);
        let mut secrets = SecretScanResult::default();
        secrets.findings = vec![];
        let mut deps = DependencyScanResult::default();
        deps.outdated = (0..6)
            .map(|i| crate::types::OutdatedPackage {
                name: format!("pkg{i}"),
                current: "1.0.0".to_string(),
                wanted: "1.1.0".to_string(),
                latest: "2.0.0".to_string(),
                dependency_type: crate::types::DependencyType::Runtime,
                homepage: None,
            })
            .collect();

        let metrics = calculate_metrics(Some(&sast), Some(&secrets), Some(&deps));
        let titles: Vec<_> = metrics
            .recommendations
            .iter()
            .map(|r| r.title.as_str())
            .collect();
        assert_eq!(
            titles,
            vec![
                "Fix injection vulnerabilities",
                "Update outdated dependencies",
                "Upgrade cryptographic functions",
                "Improve security configuration",
            ]
        );
    }

    #[test]
    fn risk_ladder_checks_in_order() {
        assert_eq!(risk_level(95, 1, 0), RiskLevel::Critical);
        assert_eq!(risk_level(39, 0, 0), RiskLevel::Critical);
        assert_eq!(risk_level(95, 0, 3), RiskLevel::High);
        assert_eq!(risk_level(59, 0, 0), RiskLevel::High);
        assert_eq!(risk_level(95, 0, 1), RiskLevel::Medium);
        assert_eq!(risk_level(74, 0, 0), RiskLevel::Medium);
        assert_eq!(risk_level(89, 0, 0), RiskLevel::Low);
        assert_eq!(risk_level(90, 0, 0), RiskLevel::Minimal);
    }
}
