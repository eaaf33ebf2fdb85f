use super::*;
use crate::sched::{Schedule, Scheduler};
use log::info;

/// Baseline schedule: every street that cars need to cross gets a 1 second
/// green light, in the order streets appear in the input.
#[derive(Default)]
pub struct NaiveScheduler {}

impl Scheduler for NaiveScheduler {
    fn schedule<'a>(&self, simulation: &'a Simulation) -> Schedule<'a> {
        let mut schedule = Schedule::new(simulation);
        let traffic = simulation.street_traffic();

        // Cars whose minimum travel time reaches the simulation's duration
        // cannot score, but their streets are still scheduled
        let late_cars = simulation
            .car_paths
            .iter()
            .filter(|car_path| {
                car_path
                    .iter()
                    .skip(1)
                    .map(|&street_id| {
                        u64::from(simulation.streets[street_id].travel_time)
                    })
                    .sum::<u64>()
                    >= u64::from(simulation.duration)
            })
            .count();

        for (street_id, street) in simulation.streets.iter().enumerate() {
            if traffic[street_id] > 0 {
                schedule.add_street(street.end_intersection, street_id, 1);
            }
        }

        info!(
            "Naive scheduler: {} intersections, {} streets, {} late cars",
            schedule.num_intersections(),
            schedule.num_streets(),
            late_cars,
        );

        schedule
    }
}
