//! Console rendering of batch statistics.

use colored::Colorize;
use pandemia_core::BatchSeries;
use std::fmt::Write;

/// Render the batch as a colored console report: header, weekly mean table
/// and summary block.
#[must_use]
pub fn render_console(batch: &BatchSeries, population: usize, seed: u64) -> String {
    let mut out = String::new();
    let means = batch.mean_by_day();
    let summary = batch.summary();

    let _ = writeln!(
        out,
        "{}",
        format!(
            "pandemia — {} runs × {} days, population {population}, seed {seed}",
            batch.runs.len(),
            means.len()
        )
        .bold()
    );
    let _ = writeln!(
        out,
        "{:>5} {:>10} {:>10} {:>13} {:>8} {:>8} {:>10}",
        "day", "healthy", "infected", "hospitalized", "dead", "immune", "new cases"
    );
    for (day, buckets) in means.iter().enumerate() {
        // One row per week plus the final day keeps long horizons readable.
        if day % 7 != 0 && day + 1 != means.len() {
            continue;
        }
        let infected = format!("{:>10.1}", buckets[1]);
        let infected = if buckets[1] > 0.0 {
            infected.yellow()
        } else {
            infected.normal()
        };
        let dead = format!("{:>8.1}", buckets[3]);
        let dead = if buckets[3] > 0.0 { dead.red() } else { dead.normal() };
        let _ = writeln!(
            out,
            "{:>5} {:>10.1} {} {:>13.1} {} {:>8.1} {:>10.1}",
            day, buckets[0], infected, buckets[2], dead, buckets[4], buckets[5]
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", "summary (means across runs)".bold());
    let _ = writeln!(
        out,
        "  peak infected      {:>10.1}  (day {})",
        summary.peak_infected, summary.peak_infected_day
    );
    let _ = writeln!(
        out,
        "  peak hospitalized  {:>10.1}  (day {})",
        summary.peak_hospitalized, summary.peak_hospitalized_day
    );
    let _ = writeln!(
        out,
        "  dead at horizon    {:>10.1}",
        summary.dead_at_horizon
    );
    let _ = writeln!(
        out,
        "  immune at horizon  {:>10.1}",
        summary.immune_at_horizon
    );
    let _ = write!(out, "  total cases        {:>10.1}", summary.total_cases);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pandemia_core::{DayStats, RunSeries};

    #[test]
    fn report_includes_header_and_summary() {
        colored::control::set_override(false);
        let batch = BatchSeries {
            runs: vec![RunSeries {
                days: vec![
                    DayStats {
                        healthy: 9,
                        infected: 1,
                        ..DayStats::default()
                    },
                    DayStats {
                        healthy: 7,
                        infected: 3,
                        new_cases: 2,
                        ..DayStats::default()
                    },
                ],
            }],
        };
        let rendered = render_console(&batch, 10, 42);
        assert!(rendered.contains("1 runs × 2 days"));
        assert!(rendered.contains("peak infected"));
        assert!(rendered.contains("day"));
    }
}
