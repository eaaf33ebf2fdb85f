use super::*;
use crate::naive::NaiveScheduler;
use crate::queue::Queued;
use crate::sched::{Intersection, Schedule, Scheduler};
use crate::score::{car_score, score};
use crate::simulate::{FreeFlow, Outcome, Simulator};
use crate::traffic::proportional;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

static FREE_FLOW: FreeFlow = FreeFlow {};
static QUEUED: Queued = Queued {};

/// Local search over traffic light schedules. Each iteration changes the
/// schedule of one intersection, simulates the cars again and keeps the
/// change if the score improves (or, with annealing, occasionally when it
/// does not). The best schedule seen is always the one returned.
pub struct Optimizer {
    iterations: u64,
    time_limit: Option<Duration>,
    seed: u64,
    temperature: f64,
    max_delta: Time,
    max_green: Time,
    hot_intersections: usize,
    incremental: bool,
    refresh_every: u64,
    queued: bool,
    abort_flag: Arc<AtomicBool>,
}

impl Default for Optimizer {
    fn default() -> Self {
        Self {
            iterations: 1000,
            time_limit: None,
            seed: 0,
            temperature: 0.0,
            max_delta: 2,
            max_green: 5,
            hot_intersections: 20,
            incremental: true,
            refresh_every: 100,
            queued: false,
            abort_flag: Arc::new(AtomicBool::new(false)),
        }
    }
}

pub struct Optimized<'a> {
    pub schedule: Schedule<'a>,
    pub score: Score,
    pub initial_score: Score,
    pub iterations: u64,
    pub improvements: u64,
}

/// A change to the schedule of one intersection. Positions refer to the
/// intersection's list of green lights.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Move {
    Swap(usize, usize),
    Shuffle,
    Extend { turn: usize, delta: Time },
    Shorten { turn: usize, delta: Time },
    Transfer { from: usize, to: usize, delta: Time },
    Proportional,
}

impl Optimizer {
    pub fn set_iterations(&mut self, iterations: u64) {
        self.iterations = iterations;
    }

    pub fn set_time_limit(&mut self, time_limit: Option<Duration>) {
        self.time_limit = time_limit;
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
    }

    /// Initial temperature for simulated annealing; zero means greedy hill
    /// climbing.
    pub fn set_temperature(&mut self, temperature: f64) {
        self.temperature = temperature.max(0.0);
    }

    pub fn set_max_delta(&mut self, max_delta: Time) {
        self.max_delta = max_delta.max(1);
    }

    pub fn set_max_green(&mut self, max_green: Time) {
        self.max_green = max_green.max(1);
    }

    pub fn set_incremental(&mut self, incremental: bool) {
        self.incremental = incremental;
    }

    pub fn set_refresh_every(&mut self, refresh_every: u64) {
        self.refresh_every = refresh_every;
    }

    pub fn set_queued(&mut self, queued: bool) {
        self.queued = queued;
    }

    pub fn set_abort_flag(&mut self, abort_flag: Arc<AtomicBool>) {
        self.abort_flag = abort_flag;
    }

    pub fn simulator(&self) -> &'static dyn Simulator {
        if self.queued {
            &QUEUED
        } else {
            &FREE_FLOW
        }
    }

    pub fn improve<'a>(&self, initial: Schedule<'a>) -> Optimized<'a> {
        self.improve_with(initial, self.simulator())
    }

    pub fn improve_with<'a>(
        &self,
        initial: Schedule<'a>,
        simulator: &dyn Simulator,
    ) -> Optimized<'a> {
        let simulation = initial.simulation;
        let started = Instant::now();
        // Limits too far in the future never expire
        let deadline = self
            .time_limit
            .and_then(|limit| started.checked_add(limit));
        let mut rng = StdRng::seed_from_u64(self.seed);

        let traffic = simulation.street_traffic();
        let cars_by_inter = if self.incremental {
            simulation.cars_by_intersection()
        } else {
            Vec::new()
        };

        let outcome = simulator.simulate(&initial);
        let initial_score = score(simulation, &outcome.arrivals);
        let mut hot = hot_intersections(&initial, &outcome);
        let mut arrivals = outcome.arrivals;

        // Intersections with a single street are always green
        let movable: Vec<IntersectionId> = initial
            .iter()
            .filter(|(_, inter)| inter.len() > 1)
            .map(|(inter_id, _)| inter_id)
            .collect();

        info!(
            "Optimizer: {} iterations, {} movable intersections, \
            temperature {}, initial score {}",
            self.iterations,
            movable.len(),
            self.temperature,
            initial_score,
        );

        let mut current = initial;
        let mut current_score = initial_score;
        let mut best = current.clone();
        let mut best_score = current_score;
        let mut iterations = 0;
        let mut improvements = 0;

        while iterations < self.iterations && !movable.is_empty() {
            if self.abort_flag.load(Ordering::SeqCst) {
                info!("Optimizer aborted after {} iterations", iterations);
                break;
            }
            if deadline.map_or(false, |deadline| Instant::now() >= deadline) {
                info!("Time limit reached after {} iterations", iterations);
                break;
            }
            iterations += 1;

            let inter_id = self.pick_intersection(&mut rng, &movable, &hot);
            let previous = match current.intersection(inter_id) {
                Some(inter) => inter.clone(),
                None => continue,
            };
            let action = Move::random(&mut rng, previous.len(), self.max_delta);
            let changed =
                action.apply(&previous, &traffic, self.max_green, &mut rng);
            if changed == previous {
                continue;
            }
            current.set_intersection(inter_id, changed);

            // Only cars crossing the changed intersection can be affected
            let partial = cars_by_inter.get(inter_id as usize).and_then(|cars| {
                simulator
                    .simulate_cars(&current, cars)
                    .map(|new_arrivals| (cars, new_arrivals))
            });
            let (new_score, update) = match partial {
                Some((cars, new_arrivals)) => {
                    let old_cars: Score = cars
                        .iter()
                        .map(|&car_id| car_score(simulation, arrivals[car_id]))
                        .sum();
                    let new_cars: Score = new_arrivals
                        .iter()
                        .map(|&arrival| car_score(simulation, arrival))
                        .sum();
                    (
                        current_score - old_cars + new_cars,
                        Update::Cars(cars, new_arrivals),
                    )
                }
                None => {
                    let outcome = simulator.simulate(&current);
                    let new_score = score(simulation, &outcome.arrivals);
                    (new_score, Update::Full(outcome))
                }
            };

            let progress = self.progress(iterations, started);
            if self.accept(&mut rng, current_score, new_score, progress) {
                debug!(
                    "Iteration {}: {:?} at intersection {}, score {} -> {}",
                    iterations, action, inter_id, current_score, new_score,
                );
                match update {
                    Update::Cars(cars, new_arrivals) => {
                        for (&car_id, arrival) in
                            cars.iter().zip(new_arrivals)
                        {
                            arrivals[car_id] = arrival;
                        }
                    }
                    Update::Full(outcome) => {
                        hot = hot_intersections(&current, &outcome);
                        arrivals = outcome.arrivals;
                    }
                }
                current_score = new_score;
                if current_score > best_score {
                    info!(
                        "New best score {} after {:?} at intersection {}, \
                        iteration {}",
                        current_score, action, inter_id, iterations,
                    );
                    best = current.clone();
                    best_score = current_score;
                    improvements += 1;
                }
            } else {
                current.set_intersection(inter_id, previous);
            }

            if !cars_by_inter.is_empty()
                && self.refresh_every > 0
                && iterations % self.refresh_every == 0
            {
                let outcome = simulator.simulate(&current);
                debug_assert_eq!(
                    score(simulation, &outcome.arrivals),
                    current_score
                );
                hot = hot_intersections(&current, &outcome);
                arrivals = outcome.arrivals;
            }
        }

        info!(
            "Optimizer finished: {} iterations, {} improvements, \
            score {} -> {}",
            iterations, improvements, initial_score, best_score,
        );

        Optimized {
            schedule: best,
            score: best_score,
            initial_score,
            iterations,
            improvements,
        }
    }

    fn pick_intersection<R: Rng>(
        &self,
        rng: &mut R,
        movable: &[IntersectionId],
        hot: &[IntersectionId],
    ) -> IntersectionId {
        let hot_count = hot.len().min(self.hot_intersections);
        if hot_count > 0 && rng.gen_bool(0.5) {
            hot[rng.gen_range(0..hot_count)]
        } else {
            movable[rng.gen_range(0..movable.len())]
        }
    }

    // Fraction of the budget (iterations or time, whichever is further
    // along) already used
    fn progress(&self, iterations: u64, started: Instant) -> f64 {
        let by_iterations = iterations as f64 / self.iterations.max(1) as f64;
        let by_time = self
            .time_limit
            .map(|limit| {
                started.elapsed().as_secs_f64() / limit.as_secs_f64().max(1e-9)
            })
            .unwrap_or(0.0);
        by_iterations.max(by_time).min(1.0)
    }

    fn accept<R: Rng>(
        &self,
        rng: &mut R,
        current: Score,
        candidate: Score,
        progress: f64,
    ) -> bool {
        if candidate > current {
            return true;
        }
        let temperature = self.temperature * (1.0 - progress);
        if temperature <= 0.0 {
            return false;
        }
        let delta = candidate as f64 - current as f64;
        rng.gen::<f64>() < (delta / temperature).exp()
    }
}

impl Scheduler for Optimizer {
    fn schedule<'a>(&self, simulation: &'a Simulation) -> Schedule<'a> {
        self.improve(NaiveScheduler::default().schedule(simulation))
            .schedule
    }
}

enum Update<'c> {
    Cars(&'c [CarId], Vec<Option<Time>>),
    Full(Outcome),
}

/// Intersections with more than one street, in decreasing order of the
/// total time cars waited there.
fn hot_intersections(
    schedule: &Schedule,
    outcome: &Outcome,
) -> Vec<IntersectionId> {
    let mut inter_wait: HashMap<IntersectionId, u64> = HashMap::new();
    for (&street_id, &time) in outcome.wait_time.iter() {
        if time == 0 || schedule.is_street_always_green(street_id) {
            continue;
        }
        if let Some(inter_id) = schedule.get_intersection_id(street_id) {
            *inter_wait.entry(inter_id).or_insert(0) += time;
        }
    }
    let mut intersections: Vec<(IntersectionId, u64)> =
        inter_wait.into_iter().collect();
    intersections.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    intersections.into_iter().map(|(inter_id, _)| inter_id).collect()
}

impl Move {
    /// Draws a move for an intersection with at least two streets.
    pub fn random<R: Rng>(
        rng: &mut R,
        num_streets: usize,
        max_delta: Time,
    ) -> Self {
        let turn = rng.gen_range(0..num_streets);
        let other = (turn + rng.gen_range(1..num_streets.max(2))) % num_streets;
        let delta = rng.gen_range(1..=max_delta.max(1));
        match rng.gen_range(0..6) {
            0 => Move::Swap(turn, other),
            1 => Move::Shuffle,
            2 => Move::Extend { turn, delta },
            3 => Move::Shorten { turn, delta },
            4 => Move::Transfer {
                from: turn,
                to: other,
                delta,
            },
            _ => Move::Proportional,
        }
    }

    pub fn apply<R: Rng>(
        &self,
        intersection: &Intersection,
        traffic: &[usize],
        max_green: Time,
        rng: &mut R,
    ) -> Intersection {
        let turns = intersection.turns();
        let mut result = intersection.clone();
        match *self {
            Move::Swap(a, b) => result.swap(a, b),
            Move::Shuffle => result.shuffle(rng),
            Move::Extend { turn, delta } => {
                result.add_street_time(turns[turn].0, delta)
            }
            Move::Shorten { turn, delta } => {
                result.sub_street_time(turns[turn].0, delta)
            }
            Move::Transfer { from, to, delta } => {
                // Keeps the cycle length unchanged
                let (from_street, from_time) = turns[from];
                let delta = delta.min(from_time.saturating_sub(1));
                if delta > 0 && from != to {
                    result.sub_street_time(from_street, delta);
                    result.add_street_time(turns[to].0, delta);
                }
            }
            Move::Proportional => {
                result = proportional(intersection, traffic, max_green)
            }
        }
        result
    }
}
