use crate::types::{Severity, VulnCategory};
use once_cell::sync::Lazy;
use regex::Regex;

/// One declarative detection rule: a regex plus the metadata that flows onto
/// every finding it produces. Rules are compiled once and never mutated
/// during a scan.
#[derive(Debug)]
pub struct VulnRule {
    pub id: &'static str,
    pub category: VulnCategory,
    pub severity: Severity,
    pub title: &'static str,
    pub description: &'static str,
    pub pattern: &'static str,
    pub extensions: &'static [&'static str],
    pub remediation: &'static str,
    pub cwe: &'static str,
    pub owasp: &'static str,
    pub auto_fixable: bool,
}

pub const JS_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx", "mjs", "cjs"];

static VULN_RULES: &[VulnRule] = &[
    VulnRule {
        id: "SA001",
        category: VulnCategory::CommandInjection,
        severity: Severity::Critical,
        title: "Use of eval()",
        description: "eval() executes arbitrary strings as code",
        pattern: r"\beval\s*\(",
        extensions: JS_EXTENSIONS,
        remediation: "Replace eval() with JSON.parse() or explicit dispatch",
        cwe: "CWE-95",
        owasp: "A03",
        auto_fixable: false,
    },
    VulnRule {
        id: "SA002",
        category: VulnCategory::CommandInjection,
        severity: Severity::High,
        title: "Dynamic Function constructor",
        description: "new Function() compiles strings into executable code",
        pattern: r"new\s+Function\s*\(",
        extensions: JS_EXTENSIONS,
        remediation: "Avoid constructing code from strings",
        cwe: "CWE-95",
        owasp: "A03",
        auto_fixable: false,
    },
    VulnRule {
        id: "SA003",
        category: VulnCategory::CommandInjection,
        severity: Severity::Critical,
        title: "Shell execution with interpolated input",
        description: "exec() with template interpolation allows command injection",
        pattern: r#"\b(?:exec|execSync|spawnSync?)\s*\(\s*`[^`]*\$\{"#,
        extensions: JS_EXTENSIONS,
        remediation: "Use execFile() with an argument array instead of a shell string",
        cwe: "CWE-78",
        owasp: "A03",
        auto_fixable: false,
    },
    VulnRule {
        id: "SA004",
        category: VulnCategory::SqlInjection,
        severity: Severity::Critical,
        title: "SQL built by string concatenation",
        description: "Concatenating values into SQL text allows injection",
        pattern: r#"(?i)["'`]\s*(?:SELECT|INSERT|UPDATE|DELETE)\b[^"'`]*["'`]\s*\+"#,
        extensions: JS_EXTENSIONS,
        remediation: "Use parameterized queries or a query builder",
        cwe: "CWE-89",
        owasp: "A03",
        auto_fixable: false,
    },
    VulnRule {
        id: "SA005",
        category: VulnCategory::SqlInjection,
        severity: Severity::Critical,
        title: "SQL template with interpolated input",
        description: "Template-literal SQL with ${} interpolation allows injection",
        pattern: r"\.query\s*\(\s*`[^`]*\$\{",
        extensions: JS_EXTENSIONS,
        remediation: "Use parameterized queries ($1, $2 placeholders)",
        cwe: "CWE-89",
        owasp: "A03",
        auto_fixable: false,
    },
    VulnRule {
        id: "SA006",
        category: VulnCategory::Xss,
        severity: Severity::High,
        title: "Direct innerHTML assignment",
        description: "Assigning to innerHTML renders unescaped markup",
        pattern: r"\.innerHTML\s*=",
        extensions: JS_EXTENSIONS,
        remediation: "Use textContent, or sanitize with DOMPurify before rendering",
        cwe: "CWE-79",
        owasp: "A03",
        auto_fixable: true,
    },
    VulnRule {
        id: "SA007",
        category: VulnCategory::Xss,
        severity: Severity::High,
        title: "dangerouslySetInnerHTML",
        description: "React escape hatch that renders raw HTML",
        pattern: r"dangerouslySetInnerHTML",
        extensions: &["jsx", "tsx", "js", "ts"],
        remediation: "Sanitize the HTML payload or render as text",
        cwe: "CWE-79",
        owasp: "A03",
        auto_fixable: false,
    },
    VulnRule {
        id: "SA008",
        category: VulnCategory::Xss,
        severity: Severity::Medium,
        title: "document.write()",
        description: "document.write with dynamic content enables DOM XSS",
        pattern: r"document\.write\s*\(",
        extensions: JS_EXTENSIONS,
        remediation: "Build DOM nodes explicitly instead of writing markup",
        cwe: "CWE-79",
        owasp: "A03",
        auto_fixable: true,
    },
    VulnRule {
        id: "SA009",
        category: VulnCategory::PathTraversal,
        severity: Severity::High,
        title: "File read from request input",
        description: "Passing request data into filesystem APIs allows path traversal",
        pattern: r"\b(?:readFile|readFileSync|createReadStream|unlink|unlinkSync)\s*\([^)]*(?:req\.|params\.|query\.)",
        extensions: JS_EXTENSIONS,
        remediation: "Resolve against a fixed base directory and reject '..' segments",
        cwe: "CWE-22",
        owasp: "A01",
        auto_fixable: false,
    },
    VulnRule {
        id: "SA010",
        category: VulnCategory::WeakCrypto,
        severity: Severity::Medium,
        title: "Weak hash algorithm",
        description: "MD5 and SHA-1 are broken for security purposes",
        pattern: r#"createHash\s*\(\s*["'](?:md5|sha1)["']"#,
        extensions: JS_EXTENSIONS,
        remediation: "Use SHA-256 or stronger; use bcrypt/argon2 for passwords",
        cwe: "CWE-328",
        owasp: "A02",
        auto_fixable: true,
    },
    VulnRule {
        id: "SA011",
        category: VulnCategory::WeakCrypto,
        severity: Severity::High,
        title: "Weak cipher algorithm",
        description: "DES and RC4 are cryptographically broken",
        pattern: r#"createCipheriv\s*\(\s*["'](?:des|des3|rc4|rc2)"#,
        extensions: JS_EXTENSIONS,
        remediation: "Use aes-256-gcm",
        cwe: "CWE-327",
        owasp: "A02",
        auto_fixable: false,
    },
    VulnRule {
        id: "SA012",
        category: VulnCategory::InsecureRandom,
        severity: Severity::Medium,
        title: "Math.random() for security value",
        description: "Math.random() is predictable and unfit for tokens or keys",
        pattern: r"(?i)(?:token|secret|key|nonce|otp|password)[^\n]{0,40}Math\.random\s*\(",
        extensions: JS_EXTENSIONS,
        remediation: "Use crypto.randomBytes() or crypto.getRandomValues()",
        cwe: "CWE-338",
        owasp: "A02",
        auto_fixable: true,
    },
    VulnRule {
        id: "SA013",
        category: VulnCategory::InsecureDeserialization,
        severity: Severity::High,
        title: "Unsafe deserialization of request body",
        description: "Deserializing untrusted input without validation",
        pattern: r"(?:unserialize|node-serialize|vm\.runInNewContext)\s*\(",
        extensions: JS_EXTENSIONS,
        remediation: "Validate with a schema (zod/ajv) before use; never use node-serialize",
        cwe: "CWE-502",
        owasp: "A08",
        auto_fixable: false,
    },
    VulnRule {
        id: "SA014",
        category: VulnCategory::Misconfiguration,
        severity: Severity::Medium,
        title: "CORS wildcard origin",
        description: "Access-Control-Allow-Origin: * disables origin checks",
        pattern: r#"(?i)Access-Control-Allow-Origin["']?\s*[:,]\s*["']\*"#,
        extensions: JS_EXTENSIONS,
        remediation: "Allow-list the origins that need access",
        cwe: "CWE-942",
        owasp: "A05",
        auto_fixable: true,
    },
    VulnRule {
        id: "SA015",
        category: VulnCategory::Misconfiguration,
        severity: Severity::High,
        title: "TLS verification disabled",
        description: "rejectUnauthorized: false accepts any certificate",
        pattern: r"rejectUnauthorized\s*:\s*false",
        extensions: JS_EXTENSIONS,
        remediation: "Fix the certificate chain instead of disabling verification",
        cwe: "CWE-295",
        owasp: "A05",
        auto_fixable: true,
    },
    VulnRule {
        id: "SA016",
        category: VulnCategory::Misconfiguration,
        severity: Severity::High,
        title: "Node TLS rejection disabled process-wide",
        description: "NODE_TLS_REJECT_UNAUTHORIZED=0 disables TLS checks globally",
        pattern: r#"NODE_TLS_REJECT_UNAUTHORIZED["']?\s*[:=]\s*["']?0"#,
        extensions: JS_EXTENSIONS,
        remediation: "Remove the override and install the missing CA certificate",
        cwe: "CWE-295",
        owasp: "A05",
        auto_fixable: true,
    },
    VulnRule {
        id: "SA017",
        category: VulnCategory::InsecureTransport,
        severity: Severity::Medium,
        title: "Plain HTTP request",
        description: "Fetching over http:// exposes data in transit",
        pattern: r#"\b(?:fetch|axios\.(?:get|post|put|delete)|axios)\s*\(\s*["'`]http://"#,
        extensions: JS_EXTENSIONS,
        remediation: "Use https:// endpoints",
        cwe: "CWE-319",
        owasp: "A02",
        auto_fixable: true,
    },
    VulnRule {
        id: "SA018",
        category: VulnCategory::Ssrf,
        severity: Severity::High,
        title: "Outbound request built from request input",
        description: "Fetching a URL taken from the request enables SSRF",
        pattern: r"\b(?:fetch|axios|got|request)\s*\([^)]*(?:req\.query|req\.body|req\.params)",
        extensions: JS_EXTENSIONS,
        remediation: "Allow-list target hosts; never fetch caller-supplied URLs directly",
        cwe: "CWE-918",
        owasp: "A10",
        auto_fixable: false,
    },
    VulnRule {
        id: "SA019",
        category: VulnCategory::OpenRedirect,
        severity: Severity::Medium,
        title: "Redirect to request-controlled URL",
        description: "res.redirect with caller input enables phishing redirects",
        pattern: r"res\.redirect\s*\([^)]*req\.",
        extensions: JS_EXTENSIONS,
        remediation: "Validate the target against an allow-list of paths",
        cwe: "CWE-601",
        owasp: "A01",
        auto_fixable: false,
    },
    VulnRule {
        id: "SA020",
        category: VulnCategory::PrototypePollution,
        severity: Severity::Medium,
        title: "__proto__ access",
        description: "Writing through __proto__ pollutes Object.prototype",
        pattern: r#"(?:\[["']__proto__["']\]|\.__proto__\s*=)"#,
        extensions: JS_EXTENSIONS,
        remediation: "Use Object.create(null) maps and reject __proto__ keys",
        cwe: "CWE-1321",
        owasp: "A08",
        auto_fixable: false,
    },
    VulnRule {
        id: "SA021",
        category: VulnCategory::CommandInjection,
        severity: Severity::Medium,
        title: "setTimeout/setInterval with string argument",
        description: "String arguments to timers are evaluated as code",
        pattern: r#"\bset(?:Timeout|Interval)\s*\(\s*["']"#,
        extensions: JS_EXTENSIONS,
        remediation: "Pass a function instead of a string",
        cwe: "CWE-95",
        owasp: "A03",
        auto_fixable: true,
    },
    VulnRule {
        id: "SA022",
        category: VulnCategory::DebugExposure,
        severity: Severity::Low,
        title: "Sensitive value logged",
        description: "Logging credentials leaks them into log aggregation",
        pattern: r"console\.(?:log|debug|info)\s*\([^)]*(?i:password|secret|token|apikey|api_key)",
        extensions: JS_EXTENSIONS,
        remediation: "Remove the log line or redact the value",
        cwe: "CWE-532",
        owasp: "A09",
        auto_fixable: true,
    },
    VulnRule {
        id: "SA023",
        category: VulnCategory::Misconfiguration,
        severity: Severity::Low,
        title: "debugger statement",
        description: "Leftover debugger statements halt execution in dev tools",
        pattern: r"(?m)^\s*debugger\s*;?\s*$",
        extensions: JS_EXTENSIONS,
        remediation: "Remove debugger statements before shipping",
        cwe: "CWE-489",
        owasp: "A05",
        auto_fixable: true,
    },
];

#[derive(Debug)]
pub struct CompiledRule {
    pub rule: &'static VulnRule,
    pub regex: Regex,
}

impl CompiledRule {
    pub fn applies_to(&self, extension: &str) -> bool {
        self.rule.extensions.iter().any(|e| *e == extension)
    }
}

static COMPILED_RULES: Lazy<Vec<CompiledRule>> = Lazy::new(|| {
    VULN_RULES
        .iter()
        .map(|rule| CompiledRule {
            rule,
            regex: Regex::new(rule.pattern)
                .unwrap_or_else(|e| panic!("built-in rule {} must compile: {e}", rule.id)),
        })
        .collect()
});

pub fn all_rules() -> &'static [CompiledRule] {
    &COMPILED_RULES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_rules_compile() {
        assert!(!all_rules().is_empty());
    }

    #[test]
    fn rule_ids_are_unique() {
        let mut ids: Vec<_> = VULN_RULES.iter().map(|r| r.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), VULN_RULES.len());
    }

    #[test]
    fn eval_rule_matches() {
        let rule = all_rules().iter().find(|r| r.rule.id == "SA001").unwrap();
        assert!(rule.regex.is_match("const out = eval(userInput);"));
        assert!(!rule.regex.is_match("medieval history"));
    }

    #[test]
    fn sql_concat_rule_matches() {
        let rule = all_rules().iter().find(|r| r.rule.id == "SA004").unwrap();
        assert!(rule
            .regex
            .is_match(r#"db.run("SELECT * FROM users WHERE id = " + id);"#));
    }

    #[test]
    fn timer_string_rule_matches() {
        let rule = all_rules().iter().find(|r| r.rule.id == "SA021").unwrap();
        assert!(rule.regex.is_match(r#"setTimeout("doWork()", 100)"#));
        assert!(!rule.regex.is_match("setTimeout(() => doWork(), 100)"));
    }
}
