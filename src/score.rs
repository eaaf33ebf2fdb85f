use super::*;
use crate::sched::Schedule;
use crate::simulate::{Outcome, Simulator};

/// Each car arriving at time `t` before the simulation ends earns the bonus
/// plus one point for every second left; other cars earn nothing.
pub fn score(simulation: &Simulation, arrivals: &[Option<Time>]) -> Score {
    arrivals
        .iter()
        .map(|&arrival| car_score(simulation, arrival))
        .sum()
}

pub fn car_score(simulation: &Simulation, arrival: Option<Time>) -> Score {
    match arrival {
        Some(time) if time < simulation.duration => {
            Score::from(simulation.bonus)
                + Score::from(simulation.duration - time)
        }
        _ => 0,
    }
}

pub struct ScheduleStats {
    pub num_intersections: usize,
    pub num_streets: usize,
    pub num_arrived_cars: usize,
    pub earliest_arrival: Option<Time>,
    pub latest_arrival: Option<Time>,
    pub total_wait_time: u64,
    pub score: Score,
}

impl ScheduleStats {
    pub fn new(schedule: &Schedule, outcome: &Outcome) -> Self {
        let simulation = schedule.simulation;
        let arrived = outcome
            .arrivals
            .iter()
            .filter_map(|&arrival| arrival)
            .filter(|&time| time < simulation.duration);

        Self {
            num_intersections: schedule.num_intersections(),
            num_streets: schedule.num_streets(),
            num_arrived_cars: arrived.clone().count(),
            earliest_arrival: arrived.clone().min(),
            latest_arrival: arrived.max(),
            total_wait_time: outcome
                .wait_time
                .values().sum(),
            score: score(simulation, &outcome.arrivals),
        }
    }

    pub fn collect(schedule: &Schedule, simulator: &dyn Simulator) -> Self {
        Self::new(schedule, &simulator.simulate(schedule))
    }
}

impl Display for ScheduleStats {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let show = |time: Option<Time>| {
            time.map(|t| t.to_string()).unwrap_or_else(|| "-".to_string())
        };
        write!(
            f,
            "\
            Intersections   : {}\n\
            Street lights   : {}\n\
            Arrived cars    : {}\n\
            Earliest arrival: {}\n\
            Latest arrival  : {}\n\
            Total wait time : {}\n\
            Schedule score  : {}",
            self.num_intersections,
            self.num_streets,
            self.num_arrived_cars,
            show(self.earliest_arrival),
            show(self.latest_arrival),
            self.total_wait_time,
            self.score,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naive::NaiveScheduler;
    use crate::sched::Scheduler;
    use crate::simulate::FreeFlow;

    #[test]
    fn only_cars_arriving_before_the_end_score() {
        let simulation: Simulation = "10 2 1 0 100\n0 1 a 1\n".parse().unwrap();
        assert_eq!(car_score(&simulation, Some(0)), 110);
        assert_eq!(car_score(&simulation, Some(9)), 101);
        assert_eq!(car_score(&simulation, Some(10)), 0);
        assert_eq!(car_score(&simulation, Some(12)), 0);
        assert_eq!(car_score(&simulation, None), 0);
        assert_eq!(score(&simulation, &[Some(3), None, Some(10), Some(9)]), 208);
    }

    #[test]
    fn stats_summarise_outcome() {
        let simulation: Simulation = "\
20 3 3 2 10
0 1 a 3
2 1 b 1
1 2 c 2
2 a c
2 b c
"
        .parse()
        .unwrap();
        let schedule = NaiveScheduler::default().schedule(&simulation);
        let stats = ScheduleStats::collect(&schedule, &FreeFlow::default());

        // Car 0 crosses at 0 and arrives at 2, car 1 waits 1 second
        assert_eq!(stats.num_intersections, 1);
        assert_eq!(stats.num_streets, 2);
        assert_eq!(stats.num_arrived_cars, 2);
        assert_eq!(stats.earliest_arrival, Some(2));
        assert_eq!(stats.latest_arrival, Some(3));
        assert_eq!(stats.total_wait_time, 1);
        assert_eq!(stats.score, 10 + 18 + 10 + 17);
        assert!(stats.to_string().contains("Schedule score  : 55"));
    }
}
