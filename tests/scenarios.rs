use std::collections::HashSet;
use traffic_lights::naive::NaiveScheduler;
use traffic_lights::optimize::Optimizer;
use traffic_lights::sched::{Schedule, Scheduler};
use traffic_lights::score::{score, ScheduleStats};
use traffic_lights::simulate::{FreeFlow, Simulator};
use traffic_lights::traffic::TrafficScheduler;
use traffic_lights::{Delimiter, Simulation, StreetId};

const CITY: &str = "\
60 8 12 10 40
0 1 s01 3
1 2 s12 2
2 3 s23 4
3 0 s30 2
4 5 s45 1
5 6 s56 3
6 7 s67 2
7 4 s74 1
0 4 s04 2
5 1 s51 2
2 6 s26 1
7 3 s73 3
4 s01 s12 s26 s67
3 s30 s04 s45
5 s04 s45 s51 s12 s23
3 s51 s12 s26
4 s74 s45 s56 s67
3 s23 s30 s01
2 s67 s73
4 s26 s67 s74 s45
3 s45 s51 s12
5 s73 s30 s04 s45 s56
";

fn baseline_score(simulation: &Simulation) -> u64 {
    let baseline = NaiveScheduler::default().schedule(simulation);
    score(simulation, &FreeFlow::default().simulate(&baseline).arrivals)
}

// Streets whose end intersection some car needs to cross
fn crossed_streets(simulation: &Simulation) -> HashSet<StreetId> {
    simulation
        .car_paths
        .iter()
        .flat_map(|path| path.iter().take(path.len() - 1).copied())
        .collect()
}

fn check_invariants(schedule: &Schedule) {
    let simulation = schedule.simulation;
    let crossed = crossed_streets(simulation);
    let mut seen = HashSet::new();
    for (inter_id, inter) in schedule.iter() {
        assert!(!inter.is_empty());
        for &(street_id, time) in inter.turns() {
            assert!(time >= 1);
            assert!(crossed.contains(&street_id));
            assert_eq!(simulation.streets[street_id].end_intersection, inter_id);
            assert!(seen.insert(street_id));
        }
    }
    assert_eq!(seen, crossed);
    assert!(schedule.validate().is_ok());
}

#[test]
fn single_street_path_needs_no_traffic_light() {
    let simulation: Simulation = "10 2 1 1 1\n0 1 A 5\n1 A\n".parse().unwrap();
    let schedule = NaiveScheduler::default().schedule(&simulation);

    assert_eq!(schedule.num_intersections(), 0);
    assert_eq!(schedule.to_string(), "0\n");

    let outcome = FreeFlow::default().simulate(&schedule);
    assert_eq!(outcome.arrivals, vec![Some(0)]);
    assert_eq!(score(&simulation, &outcome.arrivals), 1 + 10);
}

#[test]
fn car_starts_at_the_end_of_its_first_street() {
    let simulation: Simulation =
        "20 3 2 1 1000\n0 1 A 3\n1 2 B 2\n2 A B\n".parse().unwrap();
    let schedule = NaiveScheduler::default().schedule(&simulation);

    assert_eq!(schedule.to_string(), "1\n1\n1\nA 1\n");

    // No time is spent on A; the light at the end of A is always green and B
    // takes 2 seconds
    let outcome = FreeFlow::default().simulate(&schedule);
    assert_eq!(outcome.arrivals, vec![Some(2)]);
    assert_eq!(score(&simulation, &outcome.arrivals), 1000 + 18);
}

#[test]
fn schedules_cover_exactly_the_crossed_streets() {
    let simulation: Simulation = CITY.parse().unwrap();

    check_invariants(&NaiveScheduler::default().schedule(&simulation));
    check_invariants(&TrafficScheduler::default().schedule(&simulation));

    let mut optimizer = Optimizer::default();
    optimizer.set_iterations(500);
    optimizer.set_temperature(20.0);
    check_invariants(&optimizer.schedule(&simulation));
}

#[test]
fn zero_iterations_is_idempotent() {
    let simulation: Simulation = CITY.parse().unwrap();
    let mut optimizer = Optimizer::default();
    optimizer.set_iterations(0);

    let first = optimizer.schedule(&simulation).to_string();
    let second = optimizer.schedule(&simulation).to_string();
    assert_eq!(first, second);
    assert_eq!(
        first,
        NaiveScheduler::default().schedule(&simulation).to_string()
    );
}

#[test]
fn optimizer_never_loses_to_baseline() {
    let simulation: Simulation = CITY.parse().unwrap();
    let baseline = baseline_score(&simulation);

    for &(iterations, temperature) in
        [(0, 0.0), (1, 0.0), (50, 0.0), (400, 0.0), (400, 100.0)].iter()
    {
        let mut optimizer = Optimizer::default();
        optimizer.set_iterations(iterations);
        optimizer.set_temperature(temperature);
        let schedule = optimizer.schedule(&simulation);
        let stats = ScheduleStats::collect(&schedule, &FreeFlow::default());
        assert!(stats.score >= baseline);
        assert!(stats.score <= simulation.max_theoretical_score());
    }
}

#[test]
fn output_parses_back_to_the_same_schedule() {
    let simulation: Simulation = CITY.parse().unwrap();
    let mut optimizer = Optimizer::default();
    optimizer.set_iterations(300);
    optimizer.set_seed(42);
    let schedule = optimizer.schedule(&simulation);

    let mut reloaded = Schedule::new(&simulation);
    reloaded.load_from_str(&schedule.to_string()).unwrap();

    let entries = |schedule: &Schedule| {
        let mut entries: Vec<(u32, usize, Vec<(String, u32)>)> = schedule
            .iter()
            .map(|(inter_id, inter)| {
                let turns = inter
                    .turns()
                    .iter()
                    .map(|&(street_id, time)| {
                        (simulation.streets[street_id].name.clone(), time)
                    })
                    .collect();
                (inter_id, inter.len(), turns)
            })
            .collect();
        entries.sort();
        entries
    };
    assert_eq!(entries(&schedule), entries(&reloaded));
}

#[test]
fn custom_delimiter_gives_same_problem() {
    let with_commas = CITY.replace(' ', ",");
    let simulation = Simulation::parse(&with_commas, Delimiter::Char(','))
        .expect("comma separated input");
    let reference: Simulation = CITY.parse().unwrap();

    assert_eq!(simulation.car_paths, reference.car_paths);
    assert_eq!(baseline_score(&simulation), baseline_score(&reference));
}
