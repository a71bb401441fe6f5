use anyhow::Result;
use secaudit::cli;
use secaudit::report;
use secaudit::service::SecurityService;
use std::path::PathBuf;

fn main() -> Result<()> {
    env_logger::init();
    let args = cli::parse();

    if args.legend {
        report::print_legend();
        return Ok(());
    }

    let path = PathBuf::from(&args.path);
    if !path.exists() {
        anyhow::bail!("path does not exist: {}", args.path);
    }

    if !args.json {
        report::print_banner();
        println!("\n📂 Scanning {}", path.display());
    }

    let service = SecurityService::new();
    let scan_report = service.scan(&path);

    report::print_report(&scan_report, &args);

    let has_critical = scan_report.metrics.summary.critical > 0;
    if args.fail_on_findings && has_critical {
        if !args.json {
            eprintln!("\n⚠️  Critical findings present - failing as requested.");
        }
        std::process::exit(1);
    }

    Ok(())
}
