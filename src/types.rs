use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical, // Exploitable from untrusted input, fix before deploy
    High,     // Likely exploitable, fix this sprint
    Medium,   // Exploitable under specific conditions
    Low,      // Hygiene issues
}

impl Severity {
    /// Deduction weight used by the scoring model.
    pub fn weight(&self) -> f64 {
        match self {
            Severity::Critical => 25.0,
            Severity::High => 15.0,
            Severity::Medium => 5.0,
            Severity::Low => 1.0,
        }
    }

    /// Higher rank = more severe. Used for "highest severity seen" rollups.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 4,
            Severity::High => 3,
            Severity::Medium => 2,
            Severity::Low => 1,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

/// Severity as reported by the dependency audit tool. Audit advisories use
/// "moderate" where the rest of the engine says "medium"; the original label
/// stays on the dependency result and is normalized only at the scoring
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSeverity {
    Critical,
    High,
    Moderate,
    Low,
}

impl AuditSeverity {
    pub fn parse(s: &str) -> AuditSeverity {
        match s.to_lowercase().as_str() {
            "critical" => AuditSeverity::Critical,
            "high" => AuditSeverity::High,
            "moderate" | "medium" => AuditSeverity::Moderate,
            _ => AuditSeverity::Low,
        }
    }

    pub fn normalized(&self) -> Severity {
        match self {
            AuditSeverity::Critical => Severity::Critical,
            AuditSeverity::High => Severity::High,
            AuditSeverity::Moderate => Severity::Medium,
            AuditSeverity::Low => Severity::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VulnCategory {
    SqlInjection,
    CommandInjection,
    Xss,
    PathTraversal,
    WeakCrypto,
    InsecureRandom,
    InsecureDeserialization,
    Misconfiguration,
    Ssrf,
    OpenRedirect,
    PrototypePollution,
    InsecureTransport,
    DebugExposure,
}

impl VulnCategory {
    pub fn name(&self) -> &'static str {
        match self {
            VulnCategory::SqlInjection => "sql_injection",
            VulnCategory::CommandInjection => "command_injection",
            VulnCategory::Xss => "xss",
            VulnCategory::PathTraversal => "path_traversal",
            VulnCategory::WeakCrypto => "weak_crypto",
            VulnCategory::InsecureRandom => "insecure_random",
            VulnCategory::InsecureDeserialization => "insecure_deserialization",
            VulnCategory::Misconfiguration => "misconfiguration",
            VulnCategory::Ssrf => "ssrf",
            VulnCategory::OpenRedirect => "open_redirect",
            VulnCategory::PrototypePollution => "prototype_pollution",
            VulnCategory::InsecureTransport => "insecure_transport",
            VulnCategory::DebugExposure => "debug_exposure",
        }
    }

    /// Injection family feeding the "fix injection vulnerabilities"
    /// recommendation.
    pub fn is_injection(&self) -> bool {
        matches!(
            self,
            VulnCategory::SqlInjection | VulnCategory::CommandInjection | VulnCategory::Xss
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretType {
    AwsAccessKey,
    AwsSecretKey,
    GithubToken,
    GitlabToken,
    SlackToken,
    StripeLiveKey,
    StripeTestKey,
    GoogleApiKey,
    PrivateKey,
    Jwt,
    Password,
    GenericApiKey,
    DatabaseUrl,
    NpmToken,
    SendgridKey,
}

impl SecretType {
    pub fn name(&self) -> &'static str {
        match self {
            SecretType::AwsAccessKey => "aws_access_key",
            SecretType::AwsSecretKey => "aws_secret_key",
            SecretType::GithubToken => "github_token",
            SecretType::GitlabToken => "gitlab_token",
            SecretType::SlackToken => "slack_token",
            SecretType::StripeLiveKey => "stripe_live_key",
            SecretType::StripeTestKey => "stripe_test_key",
            SecretType::GoogleApiKey => "google_api_key",
            SecretType::PrivateKey => "private_key",
            SecretType::Jwt => "jwt",
            SecretType::Password => "password",
            SecretType::GenericApiKey => "generic_api_key",
            SecretType::DatabaseUrl => "database_url",
            SecretType::NpmToken => "npm_token",
            SecretType::SendgridKey => "sendgrid_key",
        }
    }

    /// Structurally distinctive formats that are high confidence regardless
    /// of entropy: the shape alone identifies the issuer.
    pub fn is_distinctive(&self) -> bool {
        matches!(
            self,
            SecretType::AwsAccessKey
                | SecretType::GithubToken
                | SecretType::GitlabToken
                | SecretType::StripeLiveKey
                | SecretType::PrivateKey
                | SecretType::Jwt
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SastFinding {
    pub id: String,
    pub category: VulnCategory,
    pub severity: Severity,
    pub title: String,
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub snippet: String,
    pub remediation: String,
    pub confidence: Confidence,
    pub cwe: &'static str,
    pub owasp: &'static str,
    pub auto_fixable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SecretFinding {
    pub id: String,
    pub secret_type: SecretType,
    pub severity: Severity,
    pub title: String,
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub snippet: String,
    pub masked_value: String,
    pub entropy: f64,
    pub remediation: String,
    pub confidence: Confidence,
}

/// Severity-bucketed counts. Always a partition of the finding list.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct FindingSummary {
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl FindingSummary {
    pub fn tally(severities: impl Iterator<Item = Severity>) -> FindingSummary {
        let mut summary = FindingSummary::default();
        for severity in severities {
            summary.total += 1;
            match severity {
                Severity::Critical => summary.critical += 1,
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SastScanResult {
    pub findings: Vec<SastFinding>,
    pub files_scanned: usize,
    pub lines_analyzed: usize,
    pub duration_ms: u64,
    pub summary: FindingSummary,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SecretScanResult {
    pub findings: Vec<SecretFinding>,
    pub files_scanned: usize,
    pub duration_ms: u64,
    pub summary: FindingSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    Runtime,
    Development,
}

#[derive(Debug, Clone, Serialize)]
pub struct DependencyVulnerability {
    pub package: String,
    pub version: String,
    pub severity: AuditSeverity,
    pub vulnerable_range: String,
    pub patched_versions: Option<String>,
    pub title: String,
    pub description: String,
    pub cves: Vec<String>,
    pub cwes: Vec<String>,
    pub recommendation: String,
    pub fix_available: bool,
    pub direct: bool,
    pub dependency_path: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutdatedPackage {
    pub name: String,
    pub current: String,
    pub wanted: String,
    pub latest: String,
    pub dependency_type: DependencyType,
    pub homepage: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DependencyScanResult {
    pub vulnerabilities: Vec<DependencyVulnerability>,
    pub outdated: Vec<OutdatedPackage>,
    pub total_dependencies: usize,
    pub direct_dependencies: usize,
    pub dev_dependencies: usize,
    pub duration_ms: u64,
    /// Set when the manifest was unreadable or a subprocess step failed.
    /// Scoring ignores this; callers that need to distinguish "clean" from
    /// "scan degraded" read it off the report.
    pub degraded: bool,
    pub summary: FindingSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_score(score: u32) -> Grade {
        match score {
            90..=u32::MAX => Grade::A,
            80..=89 => Grade::B,
            70..=79 => Grade::C,
            60..=69 => Grade::D,
            _ => Grade::F,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Critical,
    High,
    Medium,
    Low,
    Minimal,
}

impl RiskLevel {
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Critical => "critical",
            RiskLevel::High => "high",
            RiskLevel::Medium => "medium",
            RiskLevel::Low => "low",
            RiskLevel::Minimal => "minimal",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScoreBreakdown {
    pub sast: u32,
    pub secrets: u32,
    pub dependencies: u32,
    pub code_quality: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SecurityScore {
    pub overall: u32,
    pub grade: Grade,
    pub breakdown: ScoreBreakdown,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OwaspStatus {
    Pass,
    Warning,
    Fail,
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct OwaspCategory {
    pub name: &'static str,
    pub status: OwaspStatus,
    pub findings: usize,
}

/// Keyed by OWASP 2021 category id ("A01".."A10"); BTreeMap keeps the
/// rendering order stable.
pub type OwaspCompliance = BTreeMap<&'static str, OwaspCategory>;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MetricsSummary {
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub fixable: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryRollup {
    pub name: String,
    pub count: usize,
    pub highest_severity: Severity,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub priority: Severity,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SecurityMetrics {
    pub score: SecurityScore,
    pub owasp: OwaspCompliance,
    pub summary: MetricsSummary,
    pub categories: Vec<CategoryRollup>,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComprehensiveSecurityReport {
    pub metrics: SecurityMetrics,
    pub sast: SastScanResult,
    pub secrets: SecretScanResult,
    pub dependencies: DependencyScanResult,
    pub scan_timestamp: DateTime<Utc>,
    pub scan_duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_boundaries_are_exact() {
        assert_eq!(Grade::from_score(90), Grade::A);
        assert_eq!(Grade::from_score(89), Grade::B);
        assert_eq!(Grade::from_score(80), Grade::B);
        assert_eq!(Grade::from_score(70), Grade::C);
        assert_eq!(Grade::from_score(69), Grade::D);
        assert_eq!(Grade::from_score(60), Grade::D);
        assert_eq!(Grade::from_score(59), Grade::F);
        assert_eq!(Grade::from_score(0), Grade::F);
    }

    #[test]
    fn moderate_normalizes_to_medium() {
        assert_eq!(AuditSeverity::parse("moderate").normalized(), Severity::Medium);
        assert_eq!(AuditSeverity::parse("MEDIUM"), AuditSeverity::Moderate);
        assert_eq!(AuditSeverity::parse("critical"), AuditSeverity::Critical);
        assert_eq!(AuditSeverity::parse("garbage"), AuditSeverity::Low);
    }

    #[test]
    fn summary_partitions_severities() {
        let severities = vec![
            Severity::Critical,
            Severity::High,
            Severity::High,
            Severity::Medium,
            Severity::Low,
        ];
        let summary = FindingSummary::tally(severities.into_iter());
        assert_eq!(summary.total, 5);
        assert_eq!(
            summary.critical + summary.high + summary.medium + summary.low,
            summary.total
        );
    }
}
