//! Synthetic population contact-graph builder.
//!
//! Given a handful of rate/probability parameters, the builder assigns
//! individuals to households, marks adults, draws ages, places households,
//! stores and workplaces in the unit square, picks a preferred store per
//! house, batches working adults into workplaces, and derives commuting
//! paths over the block grid. The output is an immutable [`ContactGraph`]
//! consumed by the epidemic state machine.
//!
//! Everything here is deterministic given the RNG stream: iteration happens
//! in id order and only ordered collections are walked while drawing.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use rand::Rng;
use rand::seq::SliceRandom;
use smallvec::SmallVec;

use crate::config::{AgeRanges, ConfigError, CounterRange, EnvironmentConfig};
use crate::grid::{Block, Position, staircase_walk, two_nearest};

pub type IndividualId = usize;
pub type HouseId = usize;
pub type StoreId = usize;
pub type WorkplaceId = usize;

/// Static social/spatial structure of one simulated population.
///
/// Built once per batch and read-only afterwards. Invariants:
/// every individual belongs to exactly one house; the first two members of
/// every house (in creation order) are adults; every working individual
/// belongs to exactly one workplace; co-traveler sets are symmetric.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactGraph {
    pub house_of: Vec<HouseId>,
    pub house_members: Vec<SmallVec<[IndividualId; 8]>>,
    /// Cached adult member ids per house, in creation order.
    pub house_adults: Vec<SmallVec<[IndividualId; 4]>>,
    pub is_adult: Vec<bool>,
    pub ages: Vec<i32>,
    pub house_store: Vec<StoreId>,
    pub store_houses: Vec<Vec<HouseId>>,
    pub workplace_of: Vec<Option<WorkplaceId>>,
    pub workplace_members: Vec<Vec<IndividualId>>,
    /// Deduplicated blocks crossed while commuting; empty for non-workers.
    pub commute_blocks: Vec<Vec<Block>>,
    pub block_travelers: BTreeMap<Block, Vec<IndividualId>>,
    /// Transitive closure of shared commute blocks (includes the individual).
    pub co_travelers: Vec<BTreeSet<IndividualId>>,
}

impl ContactGraph {
    /// Build the full graph from configuration and an owned RNG stream.
    ///
    /// # Errors
    ///
    /// Fails eagerly with a [`ConfigError`] before drawing any state if the
    /// configuration is malformed.
    pub fn build<R: Rng + ?Sized>(
        cfg: &EnvironmentConfig,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let n = cfg.population;

        let house_of = assign_households(n, cfg.same_house_probability, rng);
        let house_count = house_of.last().map_or(0, |&h| h + 1);
        let house_members = invert_house_map(&house_of, house_count);
        let is_adult = mark_adults(&house_of);
        let ages = draw_ages(&house_of, &cfg.age_ranges, rng);
        let house_adults = cache_house_adults(&house_members, &is_adult);

        let house_positions: Vec<Position> =
            (0..house_count).map(|_| Position::uniform(rng)).collect();
        let house_blocks = assign_blocks(&house_positions, cfg.block_count);

        let store_count = (house_count / cfg.houses_per_store).max(1);
        let store_positions: Vec<Position> =
            (0..store_count).map(|_| Position::uniform(rng)).collect();
        let house_store = assign_stores(&house_positions, &store_positions, cfg.store_preference, rng);
        let store_houses = invert_store_map(&house_store, store_count);

        let (workplace_of, workplace_count) = assign_workplaces(
            &is_adult,
            cfg.remote_work_probability,
            cfg.company_size,
            rng,
        );
        let workplace_members = invert_workplace_map(&workplace_of, workplace_count);
        let workplace_positions: Vec<Position> = (0..workplace_count)
            .map(|_| Position::center_squeezed(rng))
            .collect();
        let workplace_blocks = assign_blocks(&workplace_positions, cfg.block_count);

        let commute_blocks =
            derive_commute_blocks(&house_of, &workplace_of, &house_blocks, &workplace_blocks);
        let block_travelers = invert_commute_map(&commute_blocks);
        let co_travelers = derive_transport_contacts(&commute_blocks, &block_travelers);

        debug!(
            "built contact graph: {n} individuals, {house_count} houses, \
             {store_count} stores, {workplace_count} workplaces"
        );

        let graph = Self {
            house_of,
            house_members,
            house_adults,
            is_adult,
            ages,
            house_store,
            store_houses,
            workplace_of,
            workplace_members,
            commute_blocks,
            block_travelers,
            co_travelers,
        };
        graph.assert_invariants();
        Ok(graph)
    }

    #[must_use]
    pub fn population(&self) -> usize {
        self.house_of.len()
    }

    #[must_use]
    pub fn house_count(&self) -> usize {
        self.house_members.len()
    }

    #[must_use]
    pub fn store_count(&self) -> usize {
        self.store_houses.len()
    }

    #[must_use]
    pub fn workplace_count(&self) -> usize {
        self.workplace_members.len()
    }

    #[must_use]
    pub fn is_worker(&self, individual: IndividualId) -> bool {
        self.workplace_of[individual].is_some()
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.house_members.iter().map(SmallVec::len).sum::<usize>() == self.population(),
            "house membership must partition the population"
        );
        debug_assert!(
            self.house_members
                .iter()
                .all(|members| members.iter().take(2).all(|&i| self.is_adult[i])),
            "the first two members of every house must be adults"
        );
        debug_assert!(
            self.house_members.iter().all(|members| !members.is_empty()),
            "no house may be empty"
        );
    }
}

/// Walk individuals in id order, attaching each to the current house while a
/// halving keep-probability stays above the threshold.
///
/// The keep-probability starts at a fresh uniform draw for every house and is
/// halved after each member kept, biasing households toward small, variable
/// sizes. The first individual of a house always attaches.
pub fn assign_households<R: Rng + ?Sized>(
    n: usize,
    same_house_probability: f64,
    rng: &mut R,
) -> Vec<HouseId> {
    let mut house_of = Vec::with_capacity(n);
    let mut house = 0;
    let mut keep = rng.r#gen::<f64>();
    let mut first_person = true;
    while house_of.len() < n {
        if first_person {
            house_of.push(house);
            first_person = false;
        } else if keep > same_house_probability {
            house_of.push(house);
            keep /= 2.0;
        } else {
            house += 1;
            keep = rng.r#gen::<f64>();
            first_person = true;
        }
    }
    house_of
}

/// First two members of each house are adults; children never head a
/// household alone.
#[must_use]
pub fn mark_adults(house_of: &[HouseId]) -> Vec<bool> {
    let mut is_adult = Vec::with_capacity(house_of.len());
    let mut rank_in_house = 0;
    for (i, &house) in house_of.iter().enumerate() {
        if i > 0 && house != house_of[i - 1] {
            rank_in_house = 0;
        }
        is_adult.push(rank_in_house < 2);
        rank_in_house += 1;
    }
    is_adult
}

/// Draw ages with the same first-two-adults rule: adults from the adult
/// range, later members from the child range, independently per individual.
pub fn draw_ages<R: Rng + ?Sized>(
    house_of: &[HouseId],
    ranges: &AgeRanges,
    rng: &mut R,
) -> Vec<i32> {
    let mut ages = Vec::with_capacity(house_of.len());
    let mut rank_in_house = 0;
    for (i, &house) in house_of.iter().enumerate() {
        if i > 0 && house != house_of[i - 1] {
            rank_in_house = 0;
        }
        let range = if rank_in_house < 2 {
            ranges.adult
        } else {
            ranges.child
        };
        ages.push(range.sample(rng));
        rank_in_house += 1;
    }
    ages
}

fn invert_house_map(house_of: &[HouseId], house_count: usize) -> Vec<SmallVec<[IndividualId; 8]>> {
    let mut members = vec![SmallVec::new(); house_count];
    for (individual, &house) in house_of.iter().enumerate() {
        members[house].push(individual);
    }
    members
}

fn cache_house_adults(
    house_members: &[SmallVec<[IndividualId; 8]>],
    is_adult: &[bool],
) -> Vec<SmallVec<[IndividualId; 4]>> {
    house_members
        .iter()
        .map(|members| members.iter().copied().filter(|&i| is_adult[i]).collect())
        .collect()
}

/// Project every position onto the block grid.
#[must_use]
pub fn assign_blocks(positions: &[Position], block_count: u32) -> Vec<Block> {
    positions
        .iter()
        .map(|&pos| Block::containing(pos, block_count))
        .collect()
}

/// Pick a store per house: the nearest with `store_preference` probability,
/// otherwise the second-nearest. Degrades to the unique store when fewer
/// than two exist.
pub fn assign_stores<R: Rng + ?Sized>(
    house_positions: &[Position],
    store_positions: &[Position],
    store_preference: f64,
    rng: &mut R,
) -> Vec<StoreId> {
    house_positions
        .iter()
        .map(|&pos| {
            let (nearest, second) =
                two_nearest(pos, store_positions).expect("store pool validated non-empty");
            match second {
                Some(second) if rng.r#gen::<f64>() >= store_preference => second,
                _ => nearest,
            }
        })
        .collect()
}

fn invert_store_map(house_store: &[StoreId], store_count: usize) -> Vec<Vec<HouseId>> {
    let mut houses = vec![Vec::new(); store_count];
    for (house, &store) in house_store.iter().enumerate() {
        houses[store].push(house);
    }
    houses
}

/// Batch on-site working adults into workplaces of random size.
///
/// Each adult dodges the pool with `remote_work_probability`; the remaining
/// pool is shuffled (seeded from the same stream, keeping runs reproducible)
/// and popped into workplaces whose headcount is drawn per workplace.
/// Returns the individual→workplace map and the number of workplaces.
pub fn assign_workplaces<R: Rng + ?Sized>(
    is_adult: &[bool],
    remote_work_probability: f64,
    company_size: CounterRange,
    rng: &mut R,
) -> (Vec<Option<WorkplaceId>>, usize) {
    let mut pool: Vec<IndividualId> = (0..is_adult.len())
        .filter(|&i| is_adult[i] && rng.r#gen::<f64>() >= remote_work_probability)
        .collect();
    pool.shuffle(rng);

    let mut workplace_of = vec![None; is_adult.len()];
    let mut workplace = 0;
    while !pool.is_empty() {
        let size = company_size.sample(rng).max(1);
        for _ in 0..size {
            let Some(individual) = pool.pop() else { break };
            workplace_of[individual] = Some(workplace);
        }
        workplace += 1;
    }
    (workplace_of, workplace)
}

fn invert_workplace_map(
    workplace_of: &[Option<WorkplaceId>],
    workplace_count: usize,
) -> Vec<Vec<IndividualId>> {
    let mut members = vec![Vec::new(); workplace_count];
    for (individual, workplace) in workplace_of.iter().enumerate() {
        if let Some(wp) = workplace {
            members[*wp].push(individual);
        }
    }
    members
}

/// Deduplicated staircase blocks between home and workplace per worker.
#[must_use]
pub fn derive_commute_blocks(
    house_of: &[HouseId],
    workplace_of: &[Option<WorkplaceId>],
    house_blocks: &[Block],
    workplace_blocks: &[Block],
) -> Vec<Vec<Block>> {
    workplace_of
        .iter()
        .enumerate()
        .map(|(individual, workplace)| {
            workplace.map_or_else(Vec::new, |wp| {
                let home = house_blocks[house_of[individual]];
                let work = workplace_blocks[wp];
                let unique: BTreeSet<Block> = staircase_walk(home, work).into_iter().collect();
                unique.into_iter().collect()
            })
        })
        .collect()
}

fn invert_commute_map(commute_blocks: &[Vec<Block>]) -> BTreeMap<Block, Vec<IndividualId>> {
    let mut travelers: BTreeMap<Block, Vec<IndividualId>> = BTreeMap::new();
    for (individual, blocks) in commute_blocks.iter().enumerate() {
        for &block in blocks {
            travelers.entry(block).or_default().push(individual);
        }
    }
    travelers
}

/// Co-traveler sets: union of all travelers over the blocks an individual
/// passes through. Symmetric by construction; includes the individual.
#[must_use]
pub fn derive_transport_contacts(
    commute_blocks: &[Vec<Block>],
    block_travelers: &BTreeMap<Block, Vec<IndividualId>>,
) -> Vec<BTreeSet<IndividualId>> {
    commute_blocks
        .iter()
        .map(|blocks| {
            let mut contacts = BTreeSet::new();
            for block in blocks {
                if let Some(travelers) = block_travelers.get(block) {
                    contacts.extend(travelers.iter().copied());
                }
            }
            contacts
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvironmentConfig;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn small_config() -> EnvironmentConfig {
        EnvironmentConfig {
            population: 10,
            same_house_probability: 0.1,
            houses_per_store: 2,
            store_preference: 1.0,
            block_count: 5,
            remote_work_probability: 0.5,
            ..EnvironmentConfig::default()
        }
    }

    fn build(seed: u64, population: usize) -> ContactGraph {
        let cfg = EnvironmentConfig {
            population,
            ..small_config()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        ContactGraph::build(&cfg, &mut rng).unwrap()
    }

    #[test]
    fn households_partition_the_population() {
        for n in [1, 2, 10, 137, 1000] {
            let graph = build(12, n);
            assert_eq!(graph.population(), n);
            let mut seen = vec![false; n];
            for members in &graph.house_members {
                assert!(!members.is_empty());
                for &i in members {
                    assert!(!seen[i], "individual {i} in two houses");
                    seen[i] = true;
                    assert!(graph.house_members[graph.house_of[i]].contains(&i));
                }
            }
            assert!(seen.iter().all(|&s| s));
        }
    }

    #[test]
    fn house_ids_are_contiguous_in_id_order() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let house_of = assign_households(500, 0.2, &mut rng);
        assert_eq!(house_of[0], 0);
        for pair in house_of.windows(2) {
            assert!(pair[1] == pair[0] || pair[1] == pair[0] + 1);
        }
    }

    #[test]
    fn first_two_members_are_adults_and_no_house_lacks_one() {
        let graph = build(7, 200);
        for members in &graph.house_members {
            for (rank, &i) in members.iter().enumerate() {
                assert_eq!(graph.is_adult[i], rank < 2);
            }
            assert!(graph.is_adult[members[0]], "house headed by a child");
        }
    }

    #[test]
    fn adult_classification_is_stable_under_rerun() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let house_of = assign_households(300, 0.15, &mut rng);
        assert_eq!(mark_adults(&house_of), mark_adults(&house_of));
    }

    #[test]
    fn ages_respect_role_ranges() {
        let graph = build(21, 400);
        let ranges = AgeRanges::default();
        for i in 0..graph.population() {
            let range = if graph.is_adult[i] {
                ranges.adult
            } else {
                ranges.child
            };
            assert!(range.contains(graph.ages[i]), "age out of range for {i}");
        }
    }

    #[test]
    fn child_ages_sit_below_adult_ages() {
        let graph = build(5, 400);
        let min_adult = (0..graph.population())
            .filter(|&i| graph.is_adult[i])
            .map(|i| graph.ages[i])
            .min()
            .unwrap();
        let max_child = (0..graph.population())
            .filter(|&i| !graph.is_adult[i])
            .map(|i| graph.ages[i])
            .max();
        if let Some(max_child) = max_child {
            assert!(max_child < min_adult);
        }
    }

    #[test]
    fn store_assignment_is_total_and_invertible() {
        let graph = build(4, 500);
        assert_eq!(graph.house_store.len(), graph.house_count());
        for &store in &graph.house_store {
            assert!(store < graph.store_count());
        }
        let mut flattened: Vec<HouseId> = graph
            .store_houses
            .iter()
            .flat_map(|houses| houses.iter().copied())
            .collect();
        flattened.sort_unstable();
        let expected: Vec<HouseId> = (0..graph.house_count()).collect();
        assert_eq!(flattened, expected);
    }

    #[test]
    fn full_preference_always_picks_the_nearest_store() {
        let house_positions = vec![
            Position { x: 0.1, y: 0.1 },
            Position { x: 0.9, y: 0.9 },
        ];
        let store_positions = vec![
            Position { x: 0.0, y: 0.0 },
            Position { x: 1.0, y: 1.0 },
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let assigned = assign_stores(&house_positions, &store_positions, 1.0, &mut rng);
        assert_eq!(assigned, vec![0, 1]);
    }

    #[test]
    fn single_store_pool_degrades_gracefully() {
        let house_positions = vec![Position { x: 0.3, y: 0.7 }; 4];
        let store_positions = vec![Position { x: 0.5, y: 0.5 }];
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let assigned = assign_stores(&house_positions, &store_positions, 0.0, &mut rng);
        assert!(assigned.iter().all(|&s| s == 0));
    }

    #[test]
    fn only_adults_work_and_workers_have_one_workplace() {
        let graph = build(17, 600);
        for i in 0..graph.population() {
            if let Some(wp) = graph.workplace_of[i] {
                assert!(graph.is_adult[i], "child {i} assigned to a workplace");
                assert!(graph.workplace_members[wp].contains(&i));
                let memberships = graph
                    .workplace_members
                    .iter()
                    .filter(|members| members.contains(&i))
                    .count();
                assert_eq!(memberships, 1);
            }
        }
    }

    #[test]
    fn remote_probability_one_empties_the_workforce() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let is_adult = vec![true; 50];
        let (workplace_of, count) =
            assign_workplaces(&is_adult, 1.0, CounterRange::new(1, 5), &mut rng);
        assert_eq!(count, 0);
        assert!(workplace_of.iter().all(Option::is_none));
    }

    #[test]
    fn company_sizes_bound_workplace_membership() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let is_adult = vec![true; 200];
        let (workplace_of, count) =
            assign_workplaces(&is_adult, 0.0, CounterRange::new(2, 6), &mut rng);
        let members = invert_workplace_map(&workplace_of, count);
        for workplace in &members {
            assert!((1..=6).contains(&workplace.len()));
        }
        assert_eq!(members.iter().map(Vec::len).sum::<usize>(), 200);
    }

    #[test]
    fn identical_home_and_work_block_yields_singleton_commute() {
        let house_of = vec![0];
        let workplace_of = vec![Some(0)];
        let house_blocks = vec![Block::new(2, 2)];
        let workplace_blocks = vec![Block::new(2, 2)];
        let commute =
            derive_commute_blocks(&house_of, &workplace_of, &house_blocks, &workplace_blocks);
        assert_eq!(commute[0], vec![Block::new(2, 2)]);
    }

    #[test]
    fn commute_blocks_exist_exactly_for_workers() {
        let graph = build(23, 300);
        for i in 0..graph.population() {
            assert_eq!(graph.commute_blocks[i].is_empty(), !graph.is_worker(i));
        }
        for (block, travelers) in &graph.block_travelers {
            for &i in travelers {
                assert!(graph.commute_blocks[i].contains(block));
            }
        }
    }

    #[test]
    fn co_traveler_sets_are_symmetric() {
        let graph = build(8, 400);
        for i in 0..graph.population() {
            for &j in &graph.co_travelers[i] {
                assert!(
                    graph.co_travelers[j].contains(&i),
                    "co-traveler symmetry broken for ({i}, {j})"
                );
            }
        }
    }

    #[test]
    fn workers_are_their_own_co_travelers() {
        let graph = build(19, 300);
        for i in 0..graph.population() {
            if graph.is_worker(i) {
                assert!(graph.co_travelers[i].contains(&i));
            } else {
                assert!(graph.co_travelers[i].is_empty());
            }
        }
    }

    #[test]
    fn invalid_config_fails_before_building() {
        let cfg = EnvironmentConfig {
            population: 0,
            ..EnvironmentConfig::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(ContactGraph::build(&cfg, &mut rng).is_err());
    }
}
