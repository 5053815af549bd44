mod policy;
mod reports;
mod simulation;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use policy::Strategy;

#[derive(Debug, Parser)]
#[command(name = "emberfall-sim", version)]
#[command(about = "Headless campaign simulator for Emberfall balance QA")]
struct Args {
    /// Play policies to run (repeat or comma-separate)
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = Strategy::ALL.to_vec())]
    strategies: Vec<Strategy>,

    /// Seeds to run (comma-separated)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Battle budget per campaign
    #[arg(long, default_value_t = 60)]
    battles: u32,

    /// Skip buying weapon upgrades between battles
    #[arg(long)]
    no_shopping: bool,

    /// List the available play policies and exit
    #[arg(long)]
    list_strategies: bool,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.list_strategies {
        let mut output_target = OutputTarget::new(args.output.clone())?;
        writeln!(output_target, "Available strategies:")?;
        for strategy in Strategy::ALL {
            writeln!(output_target, "  {:12} - {}", strategy.label(), describe(strategy))?;
        }
        output_target.flush()?;
        return Ok(());
    }

    if args.report == "console" {
        announce_banner();
    }
    let seeds = parse_seeds(&args.seeds)?;
    let start_time = Instant::now();
    let records =
        simulation::run_matrix(&args.strategies, &seeds, args.battles, !args.no_shopping)?;

    let mut output_target = OutputTarget::new(args.output.clone())?;
    match args.report.as_str() {
        "json" => reports::generate_json_report(&mut output_target, &records)?,
        "markdown" => reports::generate_markdown_report(&mut output_target, &records)?,
        _ => {
            reports::generate_console_report(&mut output_target, &records, start_time.elapsed())?;
            writeln!(output_target)?;
            writeln!(output_target, "🏁 Total time: {:?}", start_time.elapsed())?;
        }
    }
    output_target.flush()?;
    Ok(())
}

fn announce_banner() {
    println!("{}", "🔥 Emberfall Campaign Simulator".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

const fn describe(strategy: Strategy) -> &'static str {
    match strategy {
        Strategy::Brawler => "attack every turn",
        Strategy::Cautious => "defend or heal below 30% hp",
        Strategy::Tactician => "use ready skills first",
    }
}

fn parse_seeds(raw: &str) -> Result<Vec<u64>> {
    let seeds = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>()
                .with_context(|| format!("invalid seed {s:?}"))
        })
        .collect::<Result<Vec<_>>>()?;
    if seeds.is_empty() {
        bail!("at least one seed is required");
    }
    Ok(seeds)
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Self::Stdout(w) => w.write(buf),
            Self::File(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_parse_with_whitespace() {
        assert_eq!(parse_seeds("1, 2,3").unwrap(), vec![1, 2, 3]);
        assert!(parse_seeds("x").is_err());
        assert!(parse_seeds(" , ").is_err());
    }

    #[test]
    fn args_default_to_every_strategy() {
        let args = Args::parse_from(["emberfall-sim"]);
        assert_eq!(args.strategies, Strategy::ALL.to_vec());
        assert_eq!(args.battles, 60);
        let args = Args::parse_from(["emberfall-sim", "--strategies", "brawler,cautious"]);
        assert_eq!(args.strategies, vec![Strategy::Brawler, Strategy::Cautious]);
    }
}
