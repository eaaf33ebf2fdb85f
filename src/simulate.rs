use super::*;
use crate::sched::Schedule;
use rayon::prelude::*;

/// Result of driving every car through a schedule.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Time each car reached the end of its path, if it did before the
    /// simulation's duration
    pub arrivals: Vec<Option<Time>>,
    /// Total seconds cars spent waiting at the end of each street
    pub wait_time: HashMap<StreetId, u64>,
}

pub trait Simulator: Sync {
    fn simulate(&self, schedule: &Schedule) -> Outcome;

    /// Re-simulates only the given cars, returning their arrival times in
    /// the same order. Returns `None` when cars interact with each other and
    /// cannot be simulated in isolation.
    fn simulate_cars(
        &self,
        _schedule: &Schedule,
        _cars: &[CarId],
    ) -> Option<Vec<Option<Time>>> {
        None
    }
}

/// Cars never hold each other up: any number of cars may cross a green
/// light in the same second. Cars start at the end of their first street at
/// time 0.
#[derive(Clone, Copy, Debug, Default)]
pub struct FreeFlow {}

struct Trip {
    arrival: Option<Time>,
    waits: Vec<(StreetId, Time)>,
}

impl FreeFlow {
    /// Arrival time of one car, or `None` if it cannot reach the end of its
    /// path before the simulation's duration.
    pub fn arrival(
        &self,
        schedule: &Schedule,
        car_path: &[StreetId],
    ) -> Option<Time> {
        drive(schedule, car_path, |_, _| ())
    }

    fn trip(&self, schedule: &Schedule, car_path: &[StreetId]) -> Trip {
        let mut waits = Vec::new();
        let arrival = drive(schedule, car_path, |street_id, wait| {
            if wait > 0 {
                waits.push((street_id, wait));
            }
        });
        Trip { arrival, waits }
    }
}

fn drive<F>(
    schedule: &Schedule,
    car_path: &[StreetId],
    mut on_wait: F,
) -> Option<Time>
where
    F: FnMut(StreetId, Time),
{
    let simulation = schedule.simulation;
    let duration = u64::from(simulation.duration);
    let mut time: u64 = 0;

    for pair in car_path.windows(2) {
        let (street_id, next_street_id) = (pair[0], pair[1]);
        let at_time = Time::try_from(time).ok()?;
        let wait = schedule.wait_time(street_id, at_time)?;
        on_wait(street_id, wait);
        time += u64::from(wait)
            + u64::from(simulation.streets[next_street_id].travel_time);
        if time >= duration {
            return None;
        }
    }

    Time::try_from(time).ok()
}

impl Simulator for FreeFlow {
    fn simulate(&self, schedule: &Schedule) -> Outcome {
        let trips: Vec<Trip> = schedule
            .simulation
            .car_paths
            .par_iter()
            .map(|car_path| self.trip(schedule, car_path))
            .collect();

        let mut wait_time = HashMap::new();
        let mut arrivals = Vec::with_capacity(trips.len());
        for trip in trips {
            for (street_id, wait) in trip.waits {
                *wait_time.entry(street_id).or_insert(0) += u64::from(wait);
            }
            arrivals.push(trip.arrival);
        }

        Outcome {
            arrivals,
            wait_time,
        }
    }

    fn simulate_cars(
        &self,
        schedule: &Schedule,
        cars: &[CarId],
    ) -> Option<Vec<Option<Time>>> {
        let car_paths = &schedule.simulation.car_paths;
        Some(
            cars.par_iter()
                .map(|&car_id| self.arrival(schedule, &car_paths[car_id]))
                .collect(),
        )
    }
}
