//! Epidemic state machine: daily channel propagation and state resolution.
//!
//! The machine owns one [`HealthRecord`] per individual and mutates records
//! in place. The driver invokes the four channel operations and
//! [`advance_one_day`](EpidemicStateMachine::advance_one_day) in a fixed
//! daily order; later channels observe infections applied by earlier ones
//! the same day, so the evaluation order is load-bearing. Freshly infected
//! individuals carry a positive contagion counter and therefore cannot
//! transmit before resolution has run at least once.

use log::debug;
use rand::Rng;
use rand::seq::index;

use crate::config::{ConfigError, ShoppingSchedule, VirusConfig};
use crate::health::{HealthRecord, HealthState, draw_infection_profile};
use crate::population::ContactGraph;
use crate::stats::DayStats;

/// Owns per-individual health records and the daily new-case counter.
#[derive(Debug, Clone)]
pub struct EpidemicStateMachine {
    cfg: VirusConfig,
    records: Vec<HealthRecord>,
    new_cases: usize,
}

impl EpidemicStateMachine {
    /// Create the machine and seed the initial infections.
    ///
    /// An inoculation fraction of the population is selected uniformly at
    /// random (at least one individual when the fraction is non-zero) and
    /// set `Infected` with freshly drawn counters. Seed infections do not
    /// count toward the first day's new cases.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the virus configuration is malformed.
    pub fn new<R: Rng + ?Sized>(
        graph: &ContactGraph,
        cfg: VirusConfig,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let n = graph.population();
        let records: Vec<HealthRecord> = graph.ages.iter().map(|&age| HealthRecord::healthy(age)).collect();
        let mut machine = Self {
            cfg,
            records,
            new_cases: 0,
        };

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let mut count = (n as f64 * machine.cfg.inoculation_fraction).round() as usize;
        if machine.cfg.inoculation_fraction > 0.0 {
            count = count.clamp(1, n);
        }
        for individual in index::sample(rng, n, count) {
            let profile = draw_infection_profile(&machine.cfg.counters, rng);
            machine.records[individual].infect(profile);
        }
        debug!("seeded {count} initial infections across {n} individuals");
        Ok(machine)
    }

    #[must_use]
    pub fn population(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn records(&self) -> &[HealthRecord] {
        &self.records
    }

    #[must_use]
    pub fn record(&self, individual: usize) -> &HealthRecord {
        &self.records[individual]
    }

    /// Overwrite one health record for scenario setup in tests and QA
    /// harnesses. The simulation itself never calls this.
    pub fn set_record_for_testing(&mut self, individual: usize, record: HealthRecord) {
        self.records[individual] = record;
    }

    /// Whether `individual` transmits in the house channel today.
    fn transmits_at_home(&self, individual: usize) -> bool {
        let record = &self.records[individual];
        if record.is_contagious() {
            return true;
        }
        self.cfg.hospitalized_transmit_at_home
            && record.state == HealthState::Hospitalized
            && record.contagion_counter <= 0
    }

    fn infect<R: Rng + ?Sized>(&mut self, individual: usize, rng: &mut R) {
        let profile = draw_infection_profile(&self.cfg.counters, rng);
        self.records[individual].infect(profile);
        self.new_cases += 1;
    }

    /// House channel: every Healthy member of a house containing at least
    /// one contagious member is independently infected with `rate`.
    pub fn propagate_within_houses<R: Rng + ?Sized>(
        &mut self,
        graph: &ContactGraph,
        rate: f64,
        rng: &mut R,
    ) {
        for members in &graph.house_members {
            if !members.iter().any(|&i| self.transmits_at_home(i)) {
                continue;
            }
            for &i in members {
                if self.records[i].is_healthy() && rng.r#gen::<f64>() < rate {
                    self.infect(i, rng);
                }
            }
        }
    }

    /// Transport channel (working days): every contagious traveler exposes
    /// each Healthy co-traveler independently with `rate`.
    pub fn propagate_within_transport<R: Rng + ?Sized>(
        &mut self,
        graph: &ContactGraph,
        rate: f64,
        rng: &mut R,
    ) {
        for i in 0..graph.population() {
            if !self.records[i].is_contagious() {
                continue;
            }
            for &j in &graph.co_travelers[i] {
                if j != i && self.records[j].is_healthy() && rng.r#gen::<f64>() < rate {
                    self.infect(j, rng);
                }
            }
        }
    }

    /// Workplace channel (working days): contagious members present at a
    /// workplace expose each Healthy member with `rate`. Hospitalized and
    /// dead members are absent on both sides.
    pub fn propagate_within_workplaces<R: Rng + ?Sized>(
        &mut self,
        graph: &ContactGraph,
        rate: f64,
        rng: &mut R,
    ) {
        for members in &graph.workplace_members {
            if !members.iter().any(|&i| self.records[i].is_contagious()) {
                continue;
            }
            for &i in members {
                if self.records[i].is_healthy() && rng.r#gen::<f64>() < rate {
                    self.infect(i, rng);
                }
            }
        }
    }

    /// Store channel (non-working days): each house due to shop sends one
    /// randomly chosen adult who is neither dead nor hospitalized; if any
    /// shopper at a store is contagious, each Healthy shopper there is
    /// exposed with `rate`. Children never participate.
    pub fn propagate_within_stores<R: Rng + ?Sized>(
        &mut self,
        graph: &ContactGraph,
        rate: f64,
        day: u32,
        schedule: ShoppingSchedule,
        rng: &mut R,
    ) {
        let mut shoppers: Vec<usize> = Vec::new();
        for houses in &graph.store_houses {
            shoppers.clear();
            for &house in houses {
                if !schedule.shops_today(house, day) {
                    continue;
                }
                let adults = &graph.house_adults[house];
                let eligible: Vec<usize> = adults
                    .iter()
                    .copied()
                    .filter(|&i| self.records[i].is_out_and_about())
                    .collect();
                if eligible.is_empty() {
                    continue;
                }
                shoppers.push(eligible[rng.gen_range(0..eligible.len())]);
            }
            if !shoppers.iter().any(|&i| self.records[i].is_contagious()) {
                continue;
            }
            for idx in 0..shoppers.len() {
                let i = shoppers[idx];
                if self.records[i].is_healthy() && rng.r#gen::<f64>() < rate {
                    self.infect(i, rng);
                }
            }
        }
    }

    /// Terminal daily resolution of counters and outcome rolls.
    ///
    /// Infected decrement contagion, hospitalization and death counters;
    /// the hospitalization and death counters trigger their age-dependent
    /// rolls the day they reach exactly zero (no re-trigger). Hospitalized
    /// keep counting down toward the death roll. Immune count down toward
    /// renewed susceptibility with fully redrawn counters. Dead records are
    /// frozen.
    pub fn advance_one_day<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for idx in 0..self.records.len() {
            let age = self.records[idx].age;
            match self.records[idx].state {
                HealthState::Healthy | HealthState::Dead => {}
                HealthState::Infected => {
                    let hospitalization_rate = self.cfg.hospitalization_rates.rate_for(age);
                    let mortality_rate = self.cfg.mortality_rates.rate_for(age);
                    let record = &mut self.records[idx];
                    record.contagion_counter -= 1;
                    record.hospitalization_counter -= 1;
                    record.death_counter -= 1;
                    if record.hospitalization_counter == 0
                        && rng.r#gen::<f64>() < hospitalization_rate
                    {
                        record.state = HealthState::Hospitalized;
                    }
                    if record.death_counter == 0 {
                        record.state = if rng.r#gen::<f64>() < mortality_rate {
                            HealthState::Dead
                        } else {
                            HealthState::Immune
                        };
                    }
                }
                HealthState::Hospitalized => {
                    let mortality_rate = self.cfg.mortality_rates.rate_for(age);
                    let record = &mut self.records[idx];
                    record.death_counter -= 1;
                    if record.death_counter == 0 {
                        record.state = if rng.r#gen::<f64>() < mortality_rate {
                            HealthState::Dead
                        } else {
                            HealthState::Immune
                        };
                    }
                }
                HealthState::Immune => {
                    let record = &mut self.records[idx];
                    record.immunity_counter -= 1;
                    if record.immunity_counter == 0 {
                        let profile = draw_infection_profile(&self.cfg.counters, rng);
                        record.state = HealthState::Healthy;
                        record.contagion_counter = profile.contagion;
                        record.hospitalization_counter = profile.hospitalization;
                        record.death_counter = profile.death;
                        record.immunity_counter = profile.immunity;
                    }
                }
            }
        }
    }

    /// Scan all records into the day's 6-bucket statistic and reset the
    /// new-case counter.
    pub fn daily_statistics(&mut self) -> DayStats {
        let mut stats = DayStats::default();
        for record in &self.records {
            match record.state {
                HealthState::Healthy => stats.healthy += 1,
                HealthState::Infected => stats.infected += 1,
                HealthState::Hospitalized => stats.hospitalized += 1,
                HealthState::Dead => stats.dead += 1,
                HealthState::Immune => stats.immune += 1,
            }
        }
        stats.new_cases = self.new_cases;
        self.new_cases = 0;
        stats
    }
}
