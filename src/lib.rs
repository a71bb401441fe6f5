//! Multi-pass static security analysis and scoring engine.
//!
//! Three independent scanners (code vulnerability patterns, hardcoded
//! secrets, dependency audit) run fork-join over a project tree; a pure
//! scoring engine fuses their results into one normalized risk score, an
//! OWASP Top 10 compliance matrix, and a prioritized remediation list.

pub mod cli;
pub mod deps;
pub mod error;
pub mod files;
pub mod report;
pub mod rules;
pub mod sast;
pub mod scoring;
pub mod secret_rules;
pub mod secrets;
pub mod service;
pub mod types;

pub use deps::DependencyScanner;
pub use sast::SastScanner;
pub use scoring::calculate_metrics;
pub use secrets::SecretScanner;
pub use service::{format_report_summary, SecurityService};
pub use types::ComprehensiveSecurityReport;
