use super::*;
use crate::sched::Schedule;
use crate::simulate::{Outcome, Simulator};
use std::collections::VecDeque;

/// Second by second simulation where only one car per second can cross a
/// green light from each street; the others wait in a queue at the end of
/// the street, in order of arrival (cars that start on the same street are
/// queued in order of car ID).
#[derive(Clone, Copy, Debug, Default)]
pub struct Queued {}

struct Car<'a> {
    path: &'a [StreetId],
    // Index of the street the car is on
    leg: usize,
    // Remaining time to reach the end of the current street
    remain_time: Time,
}

impl<'a> Car<'a> {
    fn new(path: &'a [StreetId]) -> Self {
        Self {
            path,
            leg: 0,
            remain_time: 0,
        }
    }

    fn street(&self) -> StreetId {
        self.path[self.leg]
    }

    fn is_last_street(&self) -> bool {
        self.leg + 1 == self.path.len()
    }

    fn cross_intersection(&mut self, simulation: &Simulation) {
        self.leg += 1;
        self.remain_time = simulation.streets[self.street()].travel_time;
    }
}

impl Simulator for Queued {
    fn simulate(&self, schedule: &Schedule) -> Outcome {
        let simulation = schedule.simulation;
        let mut arrivals = vec![None; simulation.car_paths.len()];
        let mut wait_time = HashMap::new();

        let mut cars: Vec<Car> = simulation
            .car_paths
            .iter()
            .map(|path| Car::new(path))
            .collect();

        // Cars driving along a street
        let mut moving_cars: Vec<CarId> = Vec::new();

        // Queues of cars at the end of streets
        let mut queues: HashMap<StreetId, VecDeque<CarId>> = HashMap::new();

        // Add cars to the queues of their starting street (in order of car ID)
        for (car_id, car) in cars.iter().enumerate() {
            if car.is_last_street() {
                arrivals[car_id] = Some(0).filter(|_| simulation.duration > 0);
            } else {
                queues.entry(car.street()).or_default().push_back(car_id);
            }
        }

        for time in 0..simulation.duration {
            // Let cars move forward, joining the queue at the end of the
            // street or reaching their destination
            moving_cars.retain(|&car_id| {
                let car = &mut cars[car_id];
                car.remain_time -= 1;
                if car.remain_time > 0 {
                    return true;
                }
                if car.is_last_street() {
                    arrivals[car_id] = Some(time);
                } else {
                    queues.entry(car.street()).or_default().push_back(car_id);
                }
                false
            });

            // Let cars at the top of the queue cross intersections
            for (&street_id, queue) in queues.iter_mut() {
                let is_green = schedule
                    .get_intersection_id(street_id)
                    .map(|inter_id| {
                        schedule.is_green(inter_id, street_id, time)
                    })
                    .unwrap_or(false);
                if !is_green {
                    continue;
                }
                if let Some(car_id) = queue.pop_front() {
                    cars[car_id].cross_intersection(simulation);
                    moving_cars.push(car_id);
                }
            }

            // Drop empty traffic light queues
            queues.retain(|_, queue| !queue.is_empty());

            // Every car still in a queue waited one more second
            for (&street_id, queue) in queues.iter() {
                *wait_time.entry(street_id).or_insert(0) += queue.len() as u64;
            }
        }

        Outcome {
            arrivals,
            wait_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naive::NaiveScheduler;
    use crate::sched::Scheduler;
    use crate::simulate::FreeFlow;

    const EXAMPLE: &str = "\
6 4 5 2 1000
2 0 rue-de-londres 1
0 1 rue-d-amsterdam 1
3 1 rue-d-athenes 1
2 3 rue-de-rome 2
1 2 rue-de-moscou 3
4 rue-de-londres rue-d-amsterdam rue-de-moscou rue-de-rome
3 rue-d-athenes rue-de-moscou rue-de-londres
";

    #[test]
    fn cars_queue_behind_each_other() {
        let simulation: Simulation = "\
10 3 2 3 1
0 1 a 1
1 2 b 2
2 a b
2 a b
2 a b
"
        .parse()
        .unwrap();
        let schedule = NaiveScheduler::default().schedule(&simulation);

        let outcome = Queued::default().simulate(&schedule);
        assert_eq!(outcome.arrivals, vec![Some(2), Some(3), Some(4)]);
        // Car 1 waits 1 second, car 2 waits 2 seconds
        assert_eq!(outcome.wait_time.get(&0), Some(&3));

        let outcome = FreeFlow::default().simulate(&schedule);
        assert_eq!(outcome.arrivals, vec![Some(2), Some(2), Some(2)]);
    }

    #[test]
    fn matches_example_submission() {
        let simulation: Simulation = EXAMPLE.parse().unwrap();
        let mut schedule = Schedule::new(&simulation);
        schedule
            .load_from_str(
                "3\n1\n2\nrue-d-athenes 2\nrue-d-amsterdam 1\n0\n1\n\
                 rue-de-londres 2\n2\n1\nrue-de-moscou 1\n",
            )
            .unwrap();

        // Car 0 would only arrive at 7; car 1 arrives at 4
        let outcome = Queued::default().simulate(&schedule);
        assert_eq!(outcome.arrivals, vec![None, Some(4)]);
    }

    #[test]
    fn agrees_with_free_flow_without_congestion() {
        let simulation: Simulation = "\
30 4 4 2 1
0 1 a 2
1 2 b 3
3 1 c 2
1 3 d 4
4 a d c b
2 c b
"
        .parse()
        .unwrap();
        let mut schedule = NaiveScheduler::default().schedule(&simulation);
        schedule.intersection_mut(1).unwrap().set_street_time(0, 2);

        let queued = Queued::default().simulate(&schedule);
        let free_flow = FreeFlow::default().simulate(&schedule);
        assert_eq!(queued.arrivals, free_flow.arrivals);
        assert_eq!(queued.wait_time, free_flow.wait_time);
    }
}
