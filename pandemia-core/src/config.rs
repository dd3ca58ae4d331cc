//! Simulation configuration: environment, virus, and batch-run parameters.
//!
//! All parameters are validated eagerly via [`validate`](EnvironmentConfig::validate)
//! before any state is built; a bad parameter is fatal and reported with its
//! name, never silently clamped.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation failure, naming the offending parameter.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("population size must be positive")]
    ZeroPopulation,
    #[error("{name} must lie in [{low}, {high}], got {value}")]
    ProbabilityOutOfRange {
        name: &'static str,
        low: f64,
        high: f64,
        value: f64,
    },
    #[error("{name} must be a positive integer")]
    ZeroCount { name: &'static str },
    #[error("{name} range is empty: ({low}, {high})")]
    EmptyRange {
        name: &'static str,
        low: i32,
        high: i32,
    },
    #[error("age rate table for {name} must be non-empty and monotone in age")]
    MalformedRateTable { name: &'static str },
}

fn check_probability(
    name: &'static str,
    value: f64,
    high_inclusive: bool,
) -> Result<(), ConfigError> {
    let ok = if high_inclusive {
        (0.0..=1.0).contains(&value)
    } else {
        (0.0..1.0).contains(&value)
    };
    if ok {
        Ok(())
    } else {
        Err(ConfigError::ProbabilityOutOfRange {
            name,
            low: 0.0,
            high: 1.0,
            value,
        })
    }
}

/// Inclusive integer range used for countdown draws and size distributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRange {
    pub low: i32,
    pub high: i32,
}

impl CounterRange {
    #[must_use]
    pub const fn new(low: i32, high: i32) -> Self {
        Self { low, high }
    }

    /// Uniform draw over the inclusive range.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> i32 {
        rng.gen_range(self.low..=self.high)
    }

    #[must_use]
    pub const fn contains(&self, value: i32) -> bool {
        self.low <= value && value <= self.high
    }

    fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        if self.low > self.high {
            return Err(ConfigError::EmptyRange {
                name,
                low: self.low,
                high: self.high,
            });
        }
        Ok(())
    }
}

/// The four day-count ranges drawn on every entry into `Infected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRanges {
    pub contagion: CounterRange,
    pub hospitalization: CounterRange,
    pub death: CounterRange,
    pub immunity: CounterRange,
}

impl Default for CounterRanges {
    fn default() -> Self {
        Self {
            contagion: CounterRange::new(2, 7),
            hospitalization: CounterRange::new(7, 21),
            death: CounterRange::new(21, 39),
            immunity: CounterRange::new(35, 65),
        }
    }
}

impl CounterRanges {
    fn validate(&self) -> Result<(), ConfigError> {
        self.contagion.validate("contagion_days")?;
        self.hospitalization.validate("hospitalization_days")?;
        self.death.validate("death_days")?;
        self.immunity.validate("immunity_days")?;
        Ok(())
    }
}

/// Uniform age ranges for the two household roles.
///
/// The only contract is that child ages sit below adult ages; both are drawn
/// independently per individual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRanges {
    pub adult: CounterRange,
    pub child: CounterRange,
}

impl Default for AgeRanges {
    fn default() -> Self {
        Self {
            adult: CounterRange::new(18, 79),
            child: CounterRange::new(1, 17),
        }
    }
}

/// One step of a monotone age-dependent rate function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgeBracket {
    /// Lowest age (inclusive) at which this rate applies.
    pub min_age: i32,
    pub rate: f64,
}

/// Monotone non-decreasing step function of age.
///
/// Brackets are sorted by `min_age`; the rate of the last bracket whose
/// `min_age` does not exceed the queried age applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeRateTable {
    pub brackets: Vec<AgeBracket>,
}

impl AgeRateTable {
    #[must_use]
    pub fn new(brackets: Vec<AgeBracket>) -> Self {
        Self { brackets }
    }

    /// Rate applying to `age`; the first bracket covers everything below it.
    #[must_use]
    pub fn rate_for(&self, age: i32) -> f64 {
        let mut rate = self.brackets.first().map_or(0.0, |b| b.rate);
        for bracket in &self.brackets {
            if age >= bracket.min_age {
                rate = bracket.rate;
            }
        }
        rate
    }

    /// Default hospitalization probabilities per age bracket.
    #[must_use]
    pub fn default_hospitalization() -> Self {
        Self::new(vec![
            AgeBracket { min_age: 0, rate: 0.01 },
            AgeBracket { min_age: 30, rate: 0.025 },
            AgeBracket { min_age: 60, rate: 0.08 },
            AgeBracket { min_age: 75, rate: 0.16 },
        ])
    }

    /// Default mortality probabilities per age bracket.
    #[must_use]
    pub fn default_mortality() -> Self {
        Self::new(vec![
            AgeBracket { min_age: 0, rate: 0.02 },
            AgeBracket { min_age: 50, rate: 0.036 },
            AgeBracket { min_age: 70, rate: 0.10 },
            AgeBracket { min_age: 80, rate: 0.22 },
        ])
    }

    fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        if self.brackets.is_empty() {
            return Err(ConfigError::MalformedRateTable { name });
        }
        for pair in self.brackets.windows(2) {
            if pair[1].min_age <= pair[0].min_age || pair[1].rate < pair[0].rate {
                return Err(ConfigError::MalformedRateTable { name });
            }
        }
        for bracket in &self.brackets {
            check_probability(name, bracket.rate, true)?;
        }
        Ok(())
    }
}

/// Parameters of the contact-graph builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Number of individuals to synthesize.
    pub population: usize,
    /// Threshold against the halving keep-probability of the household walk.
    pub same_house_probability: f64,
    /// Houses served per store; store count = max(1, houses / this).
    pub houses_per_store: usize,
    /// Probability of preferring the nearest store over the second-nearest.
    pub store_preference: f64,
    /// Grid resolution per axis for transportation blocks.
    pub block_count: u32,
    /// Probability an adult works remotely and never joins a workplace.
    pub remote_work_probability: f64,
    pub age_ranges: AgeRanges,
    /// Company headcount drawn per new workplace.
    pub company_size: CounterRange,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            population: 1000,
            same_house_probability: 0.1,
            houses_per_store: 2,
            store_preference: 0.95,
            block_count: 10,
            remote_work_probability: 0.5,
            age_ranges: AgeRanges::default(),
            company_size: CounterRange::new(1, 20),
        }
    }
}

impl EnvironmentConfig {
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the first malformed parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population == 0 {
            return Err(ConfigError::ZeroPopulation);
        }
        check_probability("same_house_probability", self.same_house_probability, false)?;
        check_probability("store_preference", self.store_preference, true)?;
        check_probability(
            "remote_work_probability",
            self.remote_work_probability,
            true,
        )?;
        if self.houses_per_store == 0 {
            return Err(ConfigError::ZeroCount {
                name: "houses_per_store",
            });
        }
        if self.block_count == 0 {
            return Err(ConfigError::ZeroCount { name: "block_count" });
        }
        self.age_ranges.adult.validate("age_ranges.adult")?;
        self.age_ranges.child.validate("age_ranges.child")?;
        self.company_size.validate("company_size")?;
        if self.company_size.low < 1 {
            return Err(ConfigError::ZeroCount {
                name: "company_size.low",
            });
        }
        Ok(())
    }
}

/// Parameters of the epidemic state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirusConfig {
    /// Fraction of the population infected at day zero.
    pub inoculation_fraction: f64,
    pub counters: CounterRanges,
    pub house_rate: f64,
    pub workplace_rate: f64,
    pub transport_rate: f64,
    pub store_rate: f64,
    pub hospitalization_rates: AgeRateTable,
    pub mortality_rates: AgeRateTable,
    /// Whether hospitalized individuals still transmit in the house channel.
    pub hospitalized_transmit_at_home: bool,
}

impl Default for VirusConfig {
    fn default() -> Self {
        Self {
            inoculation_fraction: 0.01,
            counters: CounterRanges::default(),
            house_rate: 0.5,
            workplace_rate: 0.05,
            transport_rate: 0.01,
            store_rate: 0.02,
            hospitalization_rates: AgeRateTable::default_hospitalization(),
            mortality_rates: AgeRateTable::default_mortality(),
            hospitalized_transmit_at_home: false,
        }
    }
}

impl VirusConfig {
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the first malformed parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_probability("inoculation_fraction", self.inoculation_fraction, true)?;
        check_probability("house_rate", self.house_rate, true)?;
        check_probability("workplace_rate", self.workplace_rate, true)?;
        check_probability("transport_rate", self.transport_rate, true)?;
        check_probability("store_rate", self.store_rate, true)?;
        self.counters.validate()?;
        self.hospitalization_rates.validate("hospitalization_rates")?;
        self.mortality_rates.validate("mortality_rates")?;
        Ok(())
    }
}

/// Which weekend day a given house goes shopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShoppingSchedule {
    /// Every house shops on every non-working day.
    #[default]
    EveryOpenDay,
    /// A house shops only when `day % 7` matches its own weekly offset.
    WeeklyOffset,
}

impl ShoppingSchedule {
    #[must_use]
    pub fn shops_today(&self, house: usize, day: u32) -> bool {
        match self {
            Self::EveryOpenDay => true,
            Self::WeeklyOffset => day % 7 == (house % 7) as u32,
        }
    }
}

/// Parameters of the outer Monte Carlo batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub runs: u32,
    pub days: u32,
    /// Values of `day % 7` that count as weekend (non-working) days.
    pub weekend_days: Vec<u32>,
    pub shopping: ShoppingSchedule,
    pub seed: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            runs: 5,
            days: 120,
            weekend_days: vec![5, 6],
            shopping: ShoppingSchedule::default(),
            seed: 42,
        }
    }
}

impl RunConfig {
    #[must_use]
    pub fn is_weekend(&self, day: u32) -> bool {
        self.weekend_days.contains(&(day % 7))
    }

    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the first malformed parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.runs == 0 {
            return Err(ConfigError::ZeroCount { name: "runs" });
        }
        if self.days == 0 {
            return Err(ConfigError::ZeroCount { name: "days" });
        }
        if self.weekend_days.iter().any(|&d| d > 6) {
            return Err(ConfigError::ZeroCount {
                name: "weekend_days",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn default_configs_validate() {
        EnvironmentConfig::default().validate().unwrap();
        VirusConfig::default().validate().unwrap();
        RunConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_population_is_rejected() {
        let cfg = EnvironmentConfig {
            population: 0,
            ..EnvironmentConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroPopulation));
    }

    #[test]
    fn out_of_range_probability_names_parameter() {
        let cfg = VirusConfig {
            house_rate: 1.5,
            ..VirusConfig::default()
        };
        match cfg.validate() {
            Err(ConfigError::ProbabilityOutOfRange { name, .. }) => {
                assert_eq!(name, "house_rate");
            }
            other => panic!("expected probability error, got {other:?}"),
        }
    }

    #[test]
    fn counter_range_draws_stay_inside_bounds() {
        let mut rng = SmallRng::seed_from_u64(12);
        let range = CounterRange::new(2, 7);
        for _ in 0..200 {
            assert!(range.contains(range.sample(&mut rng)));
        }
    }

    #[test]
    fn default_rate_tables_hit_known_points() {
        let hosp = AgeRateTable::default_hospitalization();
        assert!((hosp.rate_for(19) - 0.01).abs() < f64::EPSILON);
        assert!((hosp.rate_for(44) - 0.025).abs() < f64::EPSILON);
        let mort = AgeRateTable::default_mortality();
        assert!((mort.rate_for(31) - 0.02).abs() < f64::EPSILON);
        assert!((mort.rate_for(62) - 0.036).abs() < f64::EPSILON);
    }

    #[test]
    fn rate_tables_are_monotone_in_age() {
        let table = AgeRateTable::default_mortality();
        let mut last = 0.0;
        for age in 0..=100 {
            let rate = table.rate_for(age);
            assert!(rate >= last, "rate decreased at age {age}");
            last = rate;
        }
    }

    #[test]
    fn non_monotone_rate_table_is_rejected() {
        let table = AgeRateTable::new(vec![
            AgeBracket { min_age: 0, rate: 0.5 },
            AgeBracket { min_age: 40, rate: 0.1 },
        ]);
        let cfg = VirusConfig {
            mortality_rates: table,
            ..VirusConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::MalformedRateTable {
                name: "mortality_rates"
            })
        );
    }

    #[test]
    fn weekend_predicate_uses_modulo_week() {
        let cfg = RunConfig::default();
        assert!(!cfg.is_weekend(0));
        assert!(cfg.is_weekend(5));
        assert!(cfg.is_weekend(6));
        assert!(cfg.is_weekend(12));
        assert!(!cfg.is_weekend(7));
    }

    #[test]
    fn weekly_offset_schedule_matches_house_slot() {
        let schedule = ShoppingSchedule::WeeklyOffset;
        assert!(schedule.shops_today(5, 5));
        assert!(!schedule.shops_today(5, 6));
        assert!(schedule.shops_today(12, 5));
        assert!(ShoppingSchedule::EveryOpenDay.shops_today(3, 6));
    }
}
