use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

use crate::policy::Strategy;
use crate::simulation::CampaignRecord;

/// Per-strategy totals across seeds.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyAggregate {
    pub strategy: Strategy,
    pub campaigns: usize,
    pub battles: u32,
    pub victories: u32,
    pub turn_limits: u32,
    pub win_rate: f64,
    pub mean_level: f64,
    pub mean_stages_cleared: f64,
    pub best_stage: String,
}

#[must_use]
pub fn aggregate(records: &[CampaignRecord]) -> Vec<StrategyAggregate> {
    let mut strategies: Vec<Strategy> = Vec::new();
    for record in records {
        if !strategies.contains(&record.strategy) {
            strategies.push(record.strategy);
        }
    }
    strategies
        .into_iter()
        .map(|strategy| {
            let runs: Vec<&CampaignRecord> =
                records.iter().filter(|r| r.strategy == strategy).collect();
            let battles: u32 = runs.iter().map(|r| r.battles).sum();
            let victories: u32 = runs.iter().map(|r| r.victories).sum();
            #[allow(clippy::cast_precision_loss)]
            let count = runs.len().max(1) as f64;
            #[allow(clippy::cast_precision_loss)]
            let stages = runs.iter().map(|r| r.stages_cleared).sum::<usize>() as f64;
            let levels: f64 = runs.iter().map(|r| f64::from(r.level)).sum();
            let best_stage = runs
                .iter()
                .max_by_key(|r| r.stages_cleared)
                .map(|r| r.final_stage.clone())
                .unwrap_or_default();
            StrategyAggregate {
                strategy,
                campaigns: runs.len(),
                battles,
                victories,
                turn_limits: runs.iter().map(|r| r.turn_limits).sum(),
                win_rate: if battles == 0 {
                    0.0
                } else {
                    f64::from(victories) / f64::from(battles)
                },
                mean_level: levels / count,
                mean_stages_cleared: stages / count,
                best_stage,
            }
        })
        .collect()
}

/// # Errors
///
/// Returns an error if the writer fails.
pub fn generate_console_report(
    out: &mut dyn Write,
    records: &[CampaignRecord],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Campaign Simulation Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "==============================".cyan())?;
    writeln!(out, "Campaigns: {}", records.len())?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for summary in aggregate(records) {
        writeln!(out, "{}", summary.strategy.label().bold())?;
        writeln!(
            out,
            "   Battles: {} ({} won, {} turn limits)",
            summary.battles,
            summary.victories.to_string().green(),
            summary.turn_limits
        )?;
        let rate = format!("{:.1}%", summary.win_rate * 100.0);
        let rate = if summary.win_rate >= 0.5 {
            rate.green()
        } else {
            rate.red()
        };
        writeln!(out, "   Win rate: {rate}")?;
        writeln!(out, "   Mean level: {:.1}", summary.mean_level)?;
        writeln!(
            out,
            "   Mean stages cleared: {:.1} (best reached {})",
            summary.mean_stages_cleared, summary.best_stage
        )?;
        writeln!(out)?;
    }

    for record in records {
        writeln!(
            out,
            "  • {} seed {}: {} battles, {:.0}% won, level {}, at {}, {} gold, {} gems, {} ({:?})",
            record.strategy,
            record.seed,
            record.battles,
            record.win_rate() * 100.0,
            record.level,
            record.final_stage,
            record.gold,
            record.gems,
            record.weapon,
            record.wall_time
        )?;
    }
    Ok(())
}

#[derive(Serialize)]
struct JsonReport<'a> {
    aggregates: Vec<StrategyAggregate>,
    campaigns: &'a [CampaignRecord],
}

/// # Errors
///
/// Returns an error if serialisation or the writer fails.
pub fn generate_json_report(out: &mut dyn Write, records: &[CampaignRecord]) -> Result<()> {
    let report = JsonReport {
        aggregates: aggregate(records),
        campaigns: records,
    };
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}

/// # Errors
///
/// Returns an error if the writer fails.
pub fn generate_markdown_report(out: &mut dyn Write, records: &[CampaignRecord]) -> Result<()> {
    writeln!(out, "# Emberfall Campaign Simulation\n")?;
    writeln!(out, "## Summary\n")?;
    writeln!(
        out,
        "| Strategy | Campaigns | Battles | Win rate | Mean level | Mean stages |"
    )?;
    writeln!(out, "|---|---|---|---|---|---|")?;
    for summary in aggregate(records) {
        writeln!(
            out,
            "| {} | {} | {} | {:.1}% | {:.1} | {:.1} |",
            summary.strategy,
            summary.campaigns,
            summary.battles,
            summary.win_rate * 100.0,
            summary.mean_level,
            summary.mean_stages_cleared
        )?;
    }

    writeln!(out, "\n## Campaigns\n")?;
    for record in records {
        writeln!(out, "### {} seed {}\n", record.strategy, record.seed)?;
        writeln!(
            out,
            "- **Battles**: {} ({} won, {} lost)",
            record.battles, record.victories, record.defeats
        )?;
        writeln!(out, "- **Reached**: {} at level {}", record.final_stage, record.level)?;
        writeln!(
            out,
            "- **Wallet**: {} gold, {} gems after {} purchases",
            record.gold, record.gems, record.purchases
        )?;
        writeln!(out, "- **Simulated time**: {}s", record.simulated_secs)?;
        writeln!(out)?;
    }
    Ok(())
}
