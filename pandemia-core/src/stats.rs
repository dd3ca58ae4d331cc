//! Per-day statistics and batch aggregation consumed by reporting.

use serde::{Deserialize, Serialize};

/// The six per-day buckets: population counts per health state plus the
/// number of Healthy→Infected transitions recorded that day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DayStats {
    pub healthy: usize,
    pub infected: usize,
    pub hospitalized: usize,
    pub dead: usize,
    pub immune: usize,
    pub new_cases: usize,
}

impl DayStats {
    /// The five state buckets as a fixed array plus new cases, matching the
    /// run × day × 6 layout reporting expects.
    #[must_use]
    pub const fn as_array(&self) -> [usize; 6] {
        [
            self.healthy,
            self.infected,
            self.hospitalized,
            self.dead,
            self.immune,
            self.new_cases,
        ]
    }

    /// Individuals accounted for across the five state buckets.
    #[must_use]
    pub const fn accounted(&self) -> usize {
        self.healthy + self.infected + self.hospitalized + self.dead + self.immune
    }
}

/// One run's day-by-day series.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunSeries {
    pub days: Vec<DayStats>,
}

/// The full run × day × 6 statistics array of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchSeries {
    pub runs: Vec<RunSeries>,
}

impl BatchSeries {
    /// Mean of each bucket across runs, per day.
    #[must_use]
    pub fn mean_by_day(&self) -> Vec<[f64; 6]> {
        let Some(first) = self.runs.first() else {
            return Vec::new();
        };
        let run_count = self.runs.len() as f64;
        (0..first.days.len())
            .map(|day| {
                let mut sums = [0.0_f64; 6];
                for run in &self.runs {
                    let buckets = run.days[day].as_array();
                    for (sum, value) in sums.iter_mut().zip(buckets) {
                        *sum += value as f64;
                    }
                }
                sums.map(|s| s / run_count)
            })
            .collect()
    }

    /// Condensed batch summary for console reporting.
    #[must_use]
    pub fn summary(&self) -> BatchSummary {
        let means = self.mean_by_day();
        let mut summary = BatchSummary::default();
        for (day, buckets) in means.iter().enumerate() {
            if buckets[1] > summary.peak_infected {
                summary.peak_infected = buckets[1];
                summary.peak_infected_day = day;
            }
            if buckets[2] > summary.peak_hospitalized {
                summary.peak_hospitalized = buckets[2];
                summary.peak_hospitalized_day = day;
            }
            summary.total_cases += buckets[5];
        }
        if let Some(last) = means.last() {
            summary.dead_at_horizon = last[3];
            summary.immune_at_horizon = last[4];
        }
        summary
    }
}

/// Batch-level aggregates (means across runs).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub peak_infected: f64,
    pub peak_infected_day: usize,
    pub peak_hospitalized: f64,
    pub peak_hospitalized_day: usize,
    pub dead_at_horizon: f64,
    pub immune_at_horizon: f64,
    pub total_cases: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(infected: usize, new_cases: usize) -> DayStats {
        DayStats {
            healthy: 100 - infected,
            infected,
            new_cases,
            ..DayStats::default()
        }
    }

    #[test]
    fn means_average_across_runs() {
        let batch = BatchSeries {
            runs: vec![
                RunSeries {
                    days: vec![day(10, 10), day(20, 12)],
                },
                RunSeries {
                    days: vec![day(20, 20), day(40, 24)],
                },
            ],
        };
        let means = batch.mean_by_day();
        assert_eq!(means.len(), 2);
        assert!((means[0][1] - 15.0).abs() < f64::EPSILON);
        assert!((means[1][1] - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn summary_tracks_peak_and_cumulative_cases() {
        let batch = BatchSeries {
            runs: vec![RunSeries {
                days: vec![day(5, 5), day(50, 45), day(30, 2)],
            }],
        };
        let summary = batch.summary();
        assert!((summary.peak_infected - 50.0).abs() < f64::EPSILON);
        assert_eq!(summary.peak_infected_day, 1);
        assert!((summary.total_cases - 52.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_batch_produces_empty_means() {
        assert!(BatchSeries::default().mean_by_day().is_empty());
    }
}
