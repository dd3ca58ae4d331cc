//! Per-individual health state and countdown counters.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::CounterRanges;

/// The five-state health model. `Dead` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    #[default]
    Healthy,
    Infected,
    Hospitalized,
    Dead,
    Immune,
}

/// Freshly drawn countdown values applied on every entry into `Infected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfectionProfile {
    pub contagion: i32,
    pub hospitalization: i32,
    pub death: i32,
    pub immunity: i32,
}

/// Stateless counter draw, injected into the state machine rather than
/// captured per record.
pub fn draw_infection_profile<R: Rng + ?Sized>(
    ranges: &CounterRanges,
    rng: &mut R,
) -> InfectionProfile {
    InfectionProfile {
        contagion: ranges.contagion.sample(rng),
        hospitalization: ranges.hospitalization.sample(rng),
        death: ranges.death.sample(rng),
        immunity: ranges.immunity.sample(rng),
    }
}

/// Mutable health record owned by the epidemic state machine.
///
/// Counters are inert placeholders while `Healthy`; they only start counting
/// down once the individual is infected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthRecord {
    pub state: HealthState,
    pub contagion_counter: i32,
    pub hospitalization_counter: i32,
    pub death_counter: i32,
    pub immunity_counter: i32,
    pub age: i32,
}

impl HealthRecord {
    /// Fresh healthy record with inert counters.
    #[must_use]
    pub const fn healthy(age: i32) -> Self {
        Self {
            state: HealthState::Healthy,
            contagion_counter: 0,
            hospitalization_counter: 0,
            death_counter: 0,
            immunity_counter: 0,
            age,
        }
    }

    /// Transition into `Infected`, installing freshly drawn counters.
    pub fn infect(&mut self, profile: InfectionProfile) {
        debug_assert_eq!(
            self.state,
            HealthState::Healthy,
            "only healthy individuals can be infected"
        );
        self.state = HealthState::Infected;
        self.contagion_counter = profile.contagion;
        self.hospitalization_counter = profile.hospitalization;
        self.death_counter = profile.death;
        self.immunity_counter = profile.immunity;
    }

    /// Whether this individual can transmit today.
    ///
    /// The contagion counter models incubation: an infected individual only
    /// transmits once it has run down to zero.
    #[must_use]
    pub const fn is_contagious(&self) -> bool {
        matches!(self.state, HealthState::Infected) && self.contagion_counter <= 0
    }

    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        matches!(self.state, HealthState::Healthy)
    }

    /// Whether the individual leaves the house at all (workplaces, stores).
    #[must_use]
    pub const fn is_out_and_about(&self) -> bool {
        !matches!(self.state, HealthState::Dead | HealthState::Hospitalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CounterRanges;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn profile_draws_respect_ranges() {
        let ranges = CounterRanges::default();
        let mut rng = SmallRng::seed_from_u64(12);
        for _ in 0..100 {
            let p = draw_infection_profile(&ranges, &mut rng);
            assert!(ranges.contagion.contains(p.contagion));
            assert!(ranges.hospitalization.contains(p.hospitalization));
            assert!(ranges.death.contains(p.death));
            assert!(ranges.immunity.contains(p.immunity));
        }
    }

    #[test]
    fn infect_installs_counters() {
        let mut record = HealthRecord::healthy(33);
        record.infect(InfectionProfile {
            contagion: 3,
            hospitalization: 10,
            death: 25,
            immunity: 40,
        });
        assert_eq!(record.state, HealthState::Infected);
        assert_eq!(record.contagion_counter, 3);
        assert_eq!(record.death_counter, 25);
        assert_eq!(record.age, 33);
    }

    #[test]
    fn incubating_individuals_are_not_contagious() {
        let mut record = HealthRecord::healthy(40);
        record.infect(InfectionProfile {
            contagion: 2,
            hospitalization: 10,
            death: 25,
            immunity: 40,
        });
        assert!(!record.is_contagious());
        record.contagion_counter = 0;
        assert!(record.is_contagious());
        record.contagion_counter = -4;
        assert!(record.is_contagious());
    }

    #[test]
    fn only_infected_states_transmit() {
        let mut record = HealthRecord::healthy(40);
        record.contagion_counter = -1;
        for state in [
            HealthState::Healthy,
            HealthState::Hospitalized,
            HealthState::Dead,
            HealthState::Immune,
        ] {
            record.state = state;
            assert!(!record.is_contagious(), "{state:?} must not transmit");
        }
    }
}
