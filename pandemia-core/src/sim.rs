//! Batch simulation driver: owns the (run, day) loops and the weekend
//! gating, and derives independent RNG streams per run.

use hmac::{Hmac, Mac};
use log::{debug, info};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sha2::Sha256;

use crate::config::{ConfigError, EnvironmentConfig, RunConfig, VirusConfig};
use crate::epidemic::EpidemicStateMachine;
use crate::population::ContactGraph;
use crate::stats::{BatchSeries, RunSeries};

/// Derive a domain-separated stream seed from the user-visible master seed.
fn derive_stream_seed(master_seed: u64, domain_tag: &[u8]) -> u64 {
    let mut mac = Hmac::<Sha256>::new_from_slice(&master_seed.to_le_bytes())
        .expect("64-bit seed is valid key");
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let seed_bytes: [u8; 8] = digest[..8].try_into().expect("digest slice length");
    u64::from_le_bytes(seed_bytes)
}

/// Full simulation batch: one contact graph, many independent runs.
///
/// Each day of a run invokes the channel operations in the fixed order
/// houses → transport → workplaces → stores → resolution → statistics;
/// transport and workplaces run on working days, stores on weekend days.
#[derive(Debug, Clone)]
pub struct Simulation {
    env: EnvironmentConfig,
    virus: VirusConfig,
    run: RunConfig,
}

impl Simulation {
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found across the three configs.
    pub fn new(
        env: EnvironmentConfig,
        virus: VirusConfig,
        run: RunConfig,
    ) -> Result<Self, ConfigError> {
        env.validate()?;
        virus.validate()?;
        run.validate()?;
        Ok(Self { env, virus, run })
    }

    #[must_use]
    pub const fn run_config(&self) -> &RunConfig {
        &self.run
    }

    /// Build the contact graph from the batch's dedicated build stream.
    ///
    /// # Errors
    ///
    /// Propagates builder configuration errors.
    pub fn build_graph(&self) -> Result<ContactGraph, ConfigError> {
        let mut rng = ChaCha8Rng::seed_from_u64(derive_stream_seed(self.run.seed, b"graph"));
        ContactGraph::build(&self.env, &mut rng)
    }

    /// Execute the whole batch, producing the run × day × 6 array.
    ///
    /// # Errors
    ///
    /// Propagates configuration errors from graph or machine construction.
    pub fn execute(&self) -> Result<BatchSeries, ConfigError> {
        info!(
            "starting batch: {} runs × {} days, population {}",
            self.run.runs, self.run.days, self.env.population
        );
        let graph = self.build_graph()?;
        let mut runs = Vec::with_capacity(self.run.runs as usize);
        for run_index in 0..self.run.runs {
            runs.push(self.execute_run(&graph, run_index)?);
        }
        Ok(BatchSeries { runs })
    }

    /// Execute one run against a pre-built graph, on its own RNG stream.
    ///
    /// # Errors
    ///
    /// Propagates virus configuration errors.
    pub fn execute_run(
        &self,
        graph: &ContactGraph,
        run_index: u32,
    ) -> Result<RunSeries, ConfigError> {
        let tag = format!("run-{run_index}");
        let mut rng =
            ChaCha8Rng::seed_from_u64(derive_stream_seed(self.run.seed, tag.as_bytes()));
        let mut machine = EpidemicStateMachine::new(graph, self.virus.clone(), &mut rng)?;

        let mut days = Vec::with_capacity(self.run.days as usize);
        for day in 0..self.run.days {
            machine.propagate_within_houses(graph, self.virus.house_rate, &mut rng);
            if self.run.is_weekend(day) {
                machine.propagate_within_stores(
                    graph,
                    self.virus.store_rate,
                    day,
                    self.run.shopping,
                    &mut rng,
                );
            } else {
                machine.propagate_within_transport(graph, self.virus.transport_rate, &mut rng);
                machine.propagate_within_workplaces(graph, self.virus.workplace_rate, &mut rng);
            }
            machine.advance_one_day(&mut rng);
            days.push(machine.daily_statistics());
        }
        if let Some(last) = days.last() {
            debug!(
                "run {run_index} finished: {} dead, {} immune at horizon",
                last.dead, last.immune
            );
        }
        Ok(RunSeries { days })
    }
}
