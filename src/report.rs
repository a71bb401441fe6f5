use crate::cli::Args;
use crate::rules;
use crate::service::format_report_summary;
use crate::types::{ComprehensiveSecurityReport, OwaspStatus, Severity};
use colored::*;

pub fn print_banner() {
    println!("\n{}", "═".repeat(80).bright_black());
    println!(
        "{}  {}",
        "secaudit".bold().cyan(),
        "Static security analysis and risk scoring".italic()
    );
    println!("{}", "═".repeat(80).bright_black());
}

pub fn print_legend() {
    println!("\n{}", "SAST RULE LEGEND".bold().white());
    println!("{}", "═".repeat(80).bright_black());
    println!();

    for r in rules::all_rules() {
        println!(
            "{} | {:<26} | {:<8} | {}",
            r.rule.id.cyan().bold(),
            r.rule.category.name(),
            r.rule.severity.label().to_uppercase().yellow(),
            r.rule.title
        );
    }
}

pub fn print_report(report: &ComprehensiveSecurityReport, args: &Args) {
    if args.json {
        match serde_json::to_string_pretty(report) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("failed to serialize report: {e}"),
        }
        return;
    }

    if args.summary {
        print!("{}", format_report_summary(report));
        return;
    }

    let score = &report.metrics.score;
    let summary = &report.metrics.summary;

    println!("\n{}", "═".repeat(80).bright_black());
    println!("{}", "SECURITY REPORT".bold().white());
    println!("{}\n", "═".repeat(80).bright_black());

    let score_line = format!("{}/100 (grade {:?})", score.overall, score.grade);
    let score_colored = match score.grade {
        crate::types::Grade::A | crate::types::Grade::B => score_line.green().bold(),
        crate::types::Grade::C => score_line.yellow().bold(),
        _ => score_line.red().bold(),
    };
    println!(
        "Score: {}   Risk: {}",
        score_colored,
        score.risk_level.label().bold()
    );
    println!(
        "Facets: sast {} | secrets {} | dependencies {} | code quality {}",
        score.breakdown.sast,
        score.breakdown.secrets,
        score.breakdown.dependencies,
        score.breakdown.code_quality
    );
    println!(
        "Scanned: {} source files, {} lines | {} config files | {} dependencies{}",
        report.sast.files_scanned,
        report.sast.lines_analyzed,
        report.secrets.files_scanned,
        report.dependencies.total_dependencies,
        if report.dependencies.degraded {
            " (dependency scan degraded)".yellow().to_string()
        } else {
            String::new()
        }
    );

    if summary.total == 0 {
        println!("\n{}", "No security findings detected.".green().bold());
        return;
    }

    println!("\n{} findings:", summary.total.to_string().bold());
    if summary.critical > 0 {
        println!("   {}", format!("Critical: {}", summary.critical).red().bold());
    }
    if summary.high > 0 {
        println!("   {}", format!("High:     {}", summary.high).yellow().bold());
    }
    if summary.medium > 0 {
        println!("   Medium:   {}", summary.medium);
    }
    if summary.low > 0 {
        println!("   {}", format!("Low:      {}", summary.low).bright_black());
    }

    println!("\n{}", "OWASP TOP 10 (2021)".bold());
    println!("{}", "─".repeat(80).bright_black());
    for (id, category) in &report.metrics.owasp {
        let status = match category.status {
            OwaspStatus::Pass => "pass".green(),
            OwaspStatus::Warning => "warn".yellow(),
            OwaspStatus::Fail => "FAIL".red().bold(),
            OwaspStatus::Unknown => "????".bright_black(),
        };
        println!("  {id} {:<48} {status} ({})", category.name, category.findings);
    }

    print_detailed_findings(report, args.verbose);

    if !report.metrics.recommendations.is_empty() {
        println!("\n{}", "RECOMMENDATIONS".bold());
        println!("{}", "─".repeat(80).bright_black());
        for (i, rec) in report.metrics.recommendations.iter().enumerate() {
            let priority = match rec.priority {
                Severity::Critical => rec.priority.label().red().bold(),
                Severity::High => rec.priority.label().yellow().bold(),
                _ => rec.priority.label().normal(),
            };
            println!("  {}. [{}] {}", i + 1, priority, rec.title.bold());
            println!("     {}", rec.description.bright_black());
        }
    }
}

fn print_detailed_findings(report: &ComprehensiveSecurityReport, verbose: bool) {
    let show = |severity: Severity| {
        verbose || matches!(severity, Severity::Critical | Severity::High)
    };

    let mut shown = 0usize;
    let mut hidden = 0usize;

    println!("\n{}", "FINDINGS".bold());
    println!("{}", "─".repeat(80).bright_black());

    for finding in &report.sast.findings {
        if !show(finding.severity) {
            hidden += 1;
            continue;
        }
        shown += 1;
        println!(
            "\n{}. {} {} {}",
            shown,
            severity_badge(finding.severity),
            finding.title.bold(),
            format!("[{} / {}]", finding.cwe, finding.owasp).bright_black()
        );
        println!(
            "   {}:{}:{}  confidence: {:?}",
            finding.file.bright_black(),
            finding.line.to_string().yellow(),
            finding.column,
            finding.confidence
        );
        println!("   {}", finding.snippet.bright_white());
        println!("   Fix: {}", finding.remediation.cyan());
    }

    for finding in &report.secrets.findings {
        if !show(finding.severity) {
            hidden += 1;
            continue;
        }
        shown += 1;
        println!(
            "\n{}. {} {} {}",
            shown,
            severity_badge(finding.severity),
            finding.title.bold(),
            format!("[entropy {:.2}]", finding.entropy).bright_black()
        );
        println!(
            "   {}:{}:{}  confidence: {:?}",
            finding.file.bright_black(),
            finding.line.to_string().yellow(),
            finding.column,
            finding.confidence
        );
        println!("   Value: {}", finding.masked_value.bright_white());
        println!("   Fix: {}", finding.remediation.cyan());
    }

    for vuln in &report.dependencies.vulnerabilities {
        if !show(vuln.severity.normalized()) {
            hidden += 1;
            continue;
        }
        shown += 1;
        println!(
            "\n{}. {} {} {}",
            shown,
            severity_badge(vuln.severity.normalized()),
            format!("{}@{}", vuln.package, vuln.version).bold(),
            if vuln.direct { "direct" } else { "transitive" }.bright_black()
        );
        println!("   {}", vuln.title);
        println!("   Fix: {}", vuln.recommendation.cyan());
    }

    if hidden > 0 {
        println!(
            "\n💡 {hidden} lower-risk findings hidden. Use --verbose to see all findings."
        );
    }
}

fn severity_badge(severity: Severity) -> ColoredString {
    match severity {
        Severity::Critical => "CRITICAL".red().bold(),
        Severity::High => "HIGH    ".yellow().bold(),
        Severity::Medium => "MEDIUM  ".normal().bold(),
        Severity::Low => "LOW     ".bright_black(),
    }
}
