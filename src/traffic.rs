use super::*;
use crate::naive::NaiveScheduler;
use crate::sched::{Intersection, Schedule, Scheduler};
use log::info;

/// Gives each street a green light proportional to the number of cars that
/// need to cross it, relative to the quietest street of the intersection.
pub struct TrafficScheduler {
    max_green: Time,
}

impl Default for TrafficScheduler {
    fn default() -> Self {
        Self { max_green: 5 }
    }
}

impl TrafficScheduler {
    pub fn set_max_green(&mut self, max_green: Time) {
        self.max_green = max_green.max(1);
    }
}

impl Scheduler for TrafficScheduler {
    fn schedule<'a>(&self, simulation: &'a Simulation) -> Schedule<'a> {
        let mut schedule = NaiveScheduler::default().schedule(simulation);
        let traffic = simulation.street_traffic();

        info!("Traffic scheduler (max green {})", self.max_green);

        // Report the intersection with the largest difference between its
        // quietest and busiest streets
        let mut max_delta = 0;
        for (inter_id, intersection) in schedule.iter() {
            let counts = intersection
                .turns()
                .iter()
                .map(|&(street_id, _)| traffic[street_id]);
            let min_traffic = counts.clone().min().unwrap_or(0);
            let max_traffic = counts.max().unwrap_or(0);
            if max_traffic - min_traffic > max_delta {
                max_delta = max_traffic - min_traffic;
                info!(
                    "Intersection {}: {} min traffic, {} max traffic",
                    inter_id, min_traffic, max_traffic,
                );
            }
        }

        for inter_id in 0..simulation.num_intersections {
            let seeded = schedule
                .intersection(inter_id)
                .map(|inter| proportional(inter, &traffic, self.max_green));
            if let Some(intersection) = seeded {
                schedule.set_intersection(inter_id, intersection);
            }
        }

        schedule
    }
}

/// Keeps the order of the intersection's streets and sets each green time
/// to the ratio between the street's traffic and the quietest street's,
/// rounded and clamped to `1..=max_green`.
pub fn proportional(
    intersection: &Intersection,
    traffic: &[usize],
    max_green: Time,
) -> Intersection {
    let min_traffic = intersection
        .turns()
        .iter()
        .map(|&(street_id, _)| traffic[street_id])
        .filter(|&count| count > 0)
        .min()
        .unwrap_or(1) as f64;

    let mut result = Intersection::default();
    for &(street_id, _) in intersection.turns() {
        let ratio = traffic[street_id] as f64 / min_traffic;
        let time = ratio.round().max(1.0).min(f64::from(max_green.max(1)));
        result.add_street(street_id, time as Time);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn green_time_follows_traffic() {
        let mut inter = Intersection::new(0, 1);
        inter.add_street(1, 1);
        inter.add_street(2, 1);
        let traffic = vec![2, 5, 30];

        let result = proportional(&inter, &traffic, 4);
        assert_eq!(result.turns(), &[(0, 1), (1, 3), (2, 4)]);
        assert_eq!(result.cycle(), 8);
    }

    #[test]
    fn schedule_is_valid() {
        let simulation: Simulation = "\
10 3 3 3 5
0 1 a 2
2 1 b 2
1 2 c 2
2 a c
2 a c
3 b c b
"
        .parse()
        .unwrap();
        let schedule = TrafficScheduler::default().schedule(&simulation);

        assert!(schedule.validate().is_ok());
        assert_eq!(schedule.intersection(1).unwrap().turns(), &[(0, 2), (1, 1)]);
        assert_eq!(schedule.intersection(2).unwrap().turns(), &[(2, 1)]);
    }
}
