use crate::error::ScanError;
use crate::types::{
    AuditSeverity, DependencyScanResult, DependencyType, DependencyVulnerability, FindingSummary,
    OutdatedPackage,
};
use log::{debug, warn};
use serde_json::Value;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

const SUBPROCESS_TIMEOUT: Duration = Duration::from_secs(60);
const OUTPUT_CAP_BYTES: usize = 10 * 1024 * 1024;

const NO_FIX_RECOMMENDATION: &str = "No fix available - consider replacing this dependency";

/// Captured subprocess run. Audit tools exit non-zero when they find
/// vulnerabilities, so a non-zero exit with parseable stdout is an expected
/// success path and is kept distinct from process-level failure.
#[derive(Debug)]
pub struct ProcessCapture {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

fn drain_capped<R: Read + Send + 'static>(mut reader: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf: Vec<u8> = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    // Keep draining past the cap so the child never blocks on
                    // a full pipe.
                    if buf.len() < OUTPUT_CAP_BYTES {
                        let take = n.min(OUTPUT_CAP_BYTES - buf.len());
                        buf.extend_from_slice(&chunk[..take]);
                    }
                }
                Err(_) => break,
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

/// Run a command with the project root as working directory, bounded by a
/// timeout and an output cap. Timeout kills the child and reports
/// `timed_out`, which callers treat as subprocess failure.
fn run_command(program: &str, args: &[&str], cwd: &Path) -> Result<ProcessCapture, ScanError> {
    let mut child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ScanError::Subprocess {
            command: format!("{program} {}", args.join(" ")),
            reason: e.to_string(),
        })?;

    let stdout_handle = child.stdout.take().map(drain_capped);
    let stderr_handle = child.stderr.take().map(drain_capped);

    let status = child
        .wait_timeout(SUBPROCESS_TIMEOUT)
        .map_err(ScanError::Io)?;

    let (exit_code, timed_out) = match status {
        Some(status) => (status.code(), false),
        None => {
            let _ = child.kill();
            let _ = child.wait();
            (None, true)
        }
    };

    let stdout = stdout_handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default();
    let stderr = stderr_handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default();

    Ok(ProcessCapture {
        exit_code,
        stdout,
        stderr,
        timed_out,
    })
}

/// Dependency vulnerability and freshness scanner. Shells out to
/// `npm audit --json` and `npm outdated --json`; this is the only component
/// that runs another program, and it never mutates the project.
pub struct DependencyScanner {
    npm_program: String,
}

impl Default for DependencyScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyScanner {
    pub fn new() -> Self {
        Self {
            npm_program: "npm".to_string(),
        }
    }

    /// Point the scanner at a different npm-compatible executable. Used by
    /// tests to substitute a stub.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            npm_program: program.into(),
        }
    }

    pub fn scan(&self, root: &Path) -> DependencyScanResult {
        let started = Instant::now();

        let manifest = match read_manifest(root) {
            Some(manifest) => manifest,
            None => {
                debug!("deps: no readable package.json under {}", root.display());
                return DependencyScanResult {
                    duration_ms: started.elapsed().as_millis() as u64,
                    degraded: true,
                    ..DependencyScanResult::default()
                };
            }
        };

        let direct_dependencies = count_keys(&manifest, "dependencies");
        let dev_dependencies = count_keys(&manifest, "devDependencies");

        let mut degraded = false;

        let vulnerabilities = match self.run_audit(root, &manifest) {
            Ok(vulns) => vulns,
            Err(e) => {
                warn!("deps: audit step failed, continuing without it: {e}");
                degraded = true;
                Vec::new()
            }
        };

        let outdated = match self.run_outdated(root) {
            Ok(outdated) => outdated,
            Err(e) => {
                warn!("deps: outdated step failed, continuing without it: {e}");
                degraded = true;
                Vec::new()
            }
        };

        let summary =
            FindingSummary::tally(vulnerabilities.iter().map(|v| v.severity.normalized()));
        DependencyScanResult {
            vulnerabilities,
            outdated,
            total_dependencies: direct_dependencies + dev_dependencies,
            direct_dependencies,
            dev_dependencies,
            duration_ms: started.elapsed().as_millis() as u64,
            degraded,
            summary,
        }
    }

    fn run_audit(
        &self,
        root: &Path,
        manifest: &Value,
    ) -> Result<Vec<DependencyVulnerability>, ScanError> {
        let command = format!("{} audit --json", self.npm_program);
        let capture = run_command(&self.npm_program, &["audit", "--json"], root)?;
        if capture.timed_out {
            return Err(ScanError::Subprocess {
                command,
                reason: format!("timed out; stderr: {}", stderr_excerpt(&capture.stderr)),
            });
        }
        // npm audit exits 1 when vulnerabilities exist; stdout is still the
        // report we want.
        let json: Value = serde_json::from_str(&capture.stdout).map_err(|e| {
            ScanError::Subprocess {
                command,
                reason: format!(
                    "unparseable output ({e}); stderr: {}",
                    stderr_excerpt(&capture.stderr)
                ),
            }
        })?;
        let mut vulnerabilities = parse_audit(&json);
        for vuln in &mut vulnerabilities {
            vuln.version = installed_version(root, manifest, &vuln.package);
        }
        Ok(vulnerabilities)
    }

    fn run_outdated(&self, root: &Path) -> Result<Vec<OutdatedPackage>, ScanError> {
        let command = format!("{} outdated --json", self.npm_program);
        let capture = run_command(&self.npm_program, &["outdated", "--json"], root)?;
        if capture.timed_out {
            return Err(ScanError::Subprocess {
                command,
                reason: format!("timed out; stderr: {}", stderr_excerpt(&capture.stderr)),
            });
        }
        // npm outdated exits 1 whenever anything is outdated; empty stdout
        // means everything is current.
        if capture.stdout.trim().is_empty() {
            return Ok(Vec::new());
        }
        let json: Value = serde_json::from_str(&capture.stdout).map_err(|e| {
            ScanError::Subprocess {
                command,
                reason: format!(
                    "unparseable output ({e}); stderr: {}",
                    stderr_excerpt(&capture.stderr)
                ),
            }
        })?;
        Ok(parse_outdated(&json))
    }
}

/// First line of stderr, truncated, for failure diagnostics.
fn stderr_excerpt(stderr: &str) -> String {
    let line = stderr.trim().lines().next().unwrap_or("");
    if line.is_empty() {
        return "(empty)".to_string();
    }
    let mut excerpt: String = line.chars().take(200).collect();
    if line.chars().count() > 200 {
        excerpt.push_str("...");
    }
    excerpt
}

fn read_manifest(root: &Path) -> Option<Value> {
    let text = fs::read_to_string(root.join("package.json")).ok()?;
    serde_json::from_str(&text).ok()
}

/// Installed version of a package: the resolved version from its
/// node_modules manifest when present, otherwise the version declared in the
/// project manifest (stripped of range operators), otherwise "unknown".
/// npm audit itself only reports the vulnerable range.
fn installed_version(root: &Path, manifest: &Value, package: &str) -> String {
    let resolved = fs::read_to_string(
        root.join("node_modules").join(package).join("package.json"),
    )
    .ok()
    .and_then(|text| serde_json::from_str::<Value>(&text).ok())
    .and_then(|pkg| {
        pkg.get("version")
            .and_then(|v| v.as_str())
            .map(String::from)
    });
    if let Some(version) = resolved {
        return version;
    }

    for section in ["dependencies", "devDependencies", "optionalDependencies"] {
        if let Some(declared) = manifest
            .get(section)
            .and_then(|deps| deps.get(package))
            .and_then(|v| v.as_str())
        {
            return declared
                .trim_start_matches(['^', '~', '=', '>', '<', 'v', ' '])
                .to_string();
        }
    }
    "unknown".to_string()
}

fn count_keys(manifest: &Value, key: &str) -> usize {
    manifest
        .get(key)
        .and_then(|v| v.as_object())
        .map(|m| m.len())
        .unwrap_or(0)
}

/// Normalize npm audit (v7+ schema) advisories. Entries whose `via` chain is
/// only transitive references carry no advisory detail and are dropped; the
/// entry-level severity wins over the detail severity when both are present.
pub fn parse_audit(json: &Value) -> Vec<DependencyVulnerability> {
    let mut vulnerabilities = Vec::new();
    let entries = match json.get("vulnerabilities").and_then(|v| v.as_object()) {
        Some(entries) => entries,
        None => return vulnerabilities,
    };

    for (package, entry) in entries {
        let detail = match entry
            .get("via")
            .and_then(|v| v.as_array())
            .and_then(|via| via.iter().find(|item| item.is_object()))
        {
            Some(detail) => detail,
            None => continue,
        };

        let severity = entry
            .get("severity")
            .and_then(|s| s.as_str())
            .or_else(|| detail.get("severity").and_then(|s| s.as_str()))
            .map(AuditSeverity::parse)
            .unwrap_or(AuditSeverity::Low);

        let (recommendation, fix_available, patched_versions) =
            fix_recommendation(package, entry.get("fixAvailable"));

        let dependency_path = entry
            .get("nodes")
            .and_then(|n| n.as_array())
            .and_then(|nodes| nodes.first())
            .and_then(|n| n.as_str())
            .map(|node| {
                node.split("node_modules/")
                    .map(|seg| seg.trim_matches('/'))
                    .filter(|seg| !seg.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        vulnerabilities.push(DependencyVulnerability {
            package: package.clone(),
            // The audit report never carries the installed version; the
            // caller resolves it against the project tree.
            version: "unknown".to_string(),
            severity,
            vulnerable_range: entry
                .get("range")
                .and_then(|r| r.as_str())
                .unwrap_or("*")
                .to_string(),
            patched_versions,
            title: detail
                .get("title")
                .and_then(|t| t.as_str())
                .unwrap_or("Known vulnerability")
                .to_string(),
            description: detail
                .get("url")
                .and_then(|u| u.as_str())
                .unwrap_or("")
                .to_string(),
            cves: string_list(detail.get("cves")),
            cwes: string_list(detail.get("cwe")),
            recommendation,
            fix_available,
            direct: entry
                .get("isDirect")
                .and_then(|d| d.as_bool())
                .unwrap_or(false),
            dependency_path,
        });
    }

    vulnerabilities
}

/// npm reports `fixAvailable` as false, true, or an object naming the
/// version that resolves the advisory (flagging semver-major bumps).
fn fix_recommendation(package: &str, fix: Option<&Value>) -> (String, bool, Option<String>) {
    match fix {
        Some(Value::Bool(false)) | None => (NO_FIX_RECOMMENDATION.to_string(), false, None),
        Some(Value::Bool(true)) => (
            "Update to a patched version (npm audit fix)".to_string(),
            true,
            None,
        ),
        Some(Value::Object(obj)) => {
            let name = obj
                .get("name")
                .and_then(|n| n.as_str())
                .unwrap_or(package);
            let version = obj
                .get("version")
                .and_then(|v| v.as_str())
                .unwrap_or("latest");
            let major = obj
                .get("isSemVerMajor")
                .and_then(|m| m.as_bool())
                .unwrap_or(false);
            let recommendation = if major {
                format!("Update {name} to {version} (requires major version bump)")
            } else {
                format!("Update {name} to {version}")
            };
            (recommendation, true, Some(version.to_string()))
        }
        Some(_) => (NO_FIX_RECOMMENDATION.to_string(), false, None),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|i| i.as_str())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

/// Normalize `npm outdated --json`. A package without a declared type is a
/// runtime dependency.
pub fn parse_outdated(json: &Value) -> Vec<OutdatedPackage> {
    let entries = match json.as_object() {
        Some(entries) => entries,
        None => return Vec::new(),
    };

    entries
        .iter()
        .map(|(name, entry)| {
            let field = |key: &str| {
                entry
                    .get(key)
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown")
                    .to_string()
            };
            let dependency_type = match entry.get("type").and_then(|t| t.as_str()) {
                Some("devDependencies") => DependencyType::Development,
                _ => DependencyType::Runtime,
            };
            OutdatedPackage {
                name: name.clone(),
                current: field("current"),
                wanted: field("wanted"),
                latest: field("latest"),
                dependency_type,
                homepage: entry
                    .get("homepage")
                    .and_then(|h| h.as_str())
                    .map(String::from),
            }
        })
        .collect()
}
