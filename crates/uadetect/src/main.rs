use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing::level_filters::LevelFilter;
use uadetect::{Report, Result};
use uadetect_core::{Provider, ProviderConfig, RequestHeaders};

#[derive(Parser, Debug)]
#[command(name = "uadetect")]
#[command(about = "Resolve user agents to device profiles")]
#[command(version)]
struct Args {
    /// Gzip-compressed binary dataset
    #[arg(short, long)]
    data: PathBuf,

    /// JSON provider configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Request header as "Name: value" (repeatable)
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Capability to print for the matched device, or "*" for all (repeatable)
    #[arg(short, long = "capability")]
    capabilities: Vec<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: LevelFilter,

    /// User agents to resolve; read one per line from stdin when omitted
    user_agents: Vec<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    uadetect::tracing::init(args.log_level);

    let config = match &args.config {
        Some(path) => ProviderConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => ProviderConfig::default(),
    };
    let provider = Provider::open_with_config(&args.data, config)?;
    info!(copyright = %provider.copyright(), "dataset ready");

    let headers = args
        .headers
        .iter()
        .map(|line| RequestHeaders::parse_line(line))
        .collect::<std::result::Result<RequestHeaders, _>>()?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.user_agents.is_empty() {
        for line in io::stdin().lock().lines() {
            let line = line?;
            let user_agent = line.trim();
            if !user_agent.is_empty() {
                print_detection(&mut out, &provider, &headers, user_agent, &args.capabilities)?;
            }
        }
    } else {
        for user_agent in &args.user_agents {
            print_detection(&mut out, &provider, &headers, user_agent, &args.capabilities)?;
        }
    }
    out.flush()?;
    Ok(())
}

fn print_detection(
    out: &mut impl Write,
    provider: &Provider,
    headers: &RequestHeaders,
    user_agent: &str,
    capabilities: &[String],
) -> Result<()> {
    let detection = provider.detect(user_agent, headers);
    let report = Report::new(provider, user_agent, detection, capabilities);
    serde_json::to_writer(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}
