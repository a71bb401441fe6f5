use clap::Parser;

const TAGLINE: &str = "Static security analysis and risk scoring for web projects";

#[derive(Parser, Debug)]
#[command(name = "secaudit")]
#[command(version)]
#[command(about = TAGLINE, long_about = None)]
pub struct Args {
    /// Project root to scan
    #[arg(default_value = ".")]
    pub path: String,

    /// Show all severity levels including low-risk findings
    #[arg(short, long)]
    pub verbose: bool,

    /// Output the full report as JSON instead of human readable
    #[arg(long)]
    pub json: bool,

    /// Print the fixed-width summary block only
    #[arg(long)]
    pub summary: bool,

    /// Fail with non-zero exit code if critical findings exist
    #[arg(long)]
    pub fail_on_findings: bool,

    /// Print the SAST rule legend and exit
    #[arg(long)]
    pub legend: bool,
}

pub fn parse() -> Args {
    Args::parse()
}
