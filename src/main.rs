use clap::{crate_description, value_t, App, Arg, ArgMatches};
use log::{info, warn};
use std::fs::{read_to_string, write};
use std::process::exit;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use traffic_lights::naive::NaiveScheduler;
use traffic_lights::optimize::Optimizer;
use traffic_lights::render::render_schedule;
use traffic_lights::sched::{Schedule, Scheduler};
use traffic_lights::score::ScheduleStats;
use traffic_lights::traffic::TrafficScheduler;
use traffic_lights::{Delimiter, Simulation};

fn main() {
    env_logger::init();

    let args = App::new(crate_description!())
        .arg(
            Arg::with_name("input")
                .value_name("input file")
                .help("File path to puzzle input")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("algorithm")
                .help("Scheduler algorithm")
                .required(true)
                .possible_values(&["naive", "traffic", "optimize"])
                .index(2),
        )
        .arg(
            Arg::with_name("output")
                .value_name("output file")
                .help("File path to save solution")
                .short("o")
                .long("output")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("delimiter")
                .help("Input field delimiter (default: whitespace)")
                .short("d")
                .long("delimiter")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("iterations")
                .help("Maximum number of optimizer iterations")
                .short("i")
                .long("iterations")
                .takes_value(true)
                .default_value("1000"),
        )
        .arg(
            Arg::with_name("time-limit")
                .help("Maximum optimizer running time in seconds")
                .short("t")
                .long("time-limit")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("seed")
                .help("Random seed for the optimizer")
                .short("s")
                .long("seed")
                .takes_value(true)
                .default_value("0"),
        )
        .arg(
            Arg::with_name("annealing")
                .help("Initial simulated annealing temperature (0: greedy)")
                .short("a")
                .long("annealing")
                .takes_value(true)
                .default_value("0"),
        )
        .arg(
            Arg::with_name("max-delta")
                .help("Maximum seconds added to or removed from a green light")
                .long("max-delta")
                .takes_value(true)
                .default_value("2"),
        )
        .arg(
            Arg::with_name("max-green")
                .help("Maximum green light set by traffic proportions")
                .long("max-green")
                .takes_value(true)
                .default_value("5"),
        )
        .arg(
            Arg::with_name("queued")
                .help("Simulate queues of cars at traffic lights")
                .long("queued"),
        )
        .arg(
            Arg::with_name("full")
                .help("Always re-simulate all cars after each change")
                .long("full"),
        )
        .arg(
            Arg::with_name("initial")
                .value_name("schedule file")
                .help("Schedule to start optimizing from")
                .long("initial")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("image")
                .value_name("image file")
                .help("File path to save a picture of the schedule")
                .long("image")
                .takes_value(true),
        )
        .get_matches();

    println!(crate_description!());

    let delimiter: Delimiter =
        match args.value_of("delimiter").unwrap_or("").parse() {
            Ok(delimiter) => delimiter,
            Err(err) => {
                println!("{}", err);
                exit(2);
            }
        };

    let input = args.value_of("input").unwrap();
    let simulation = match read_input(input, delimiter) {
        Ok(data) => data,
        Err(err) => {
            println!("Failed to read input: {}", err);
            exit(2);
        }
    };

    println!(
        "\n\
        Simulation\n\
        ----------\n\
        {}",
        simulation
    );

    let mut optimizer = build_optimizer(&args);

    let schedule = match args.value_of("algorithm").unwrap() {
        "naive" => NaiveScheduler::default().schedule(&simulation),
        "traffic" => {
            let mut scheduler = TrafficScheduler::default();
            scheduler.set_max_green(parse_arg(&args, "max-green"));
            scheduler.schedule(&simulation)
        }
        "optimize" => {
            optimizer.set_abort_flag(abort_on_ctrlc());
            let initial = match args.value_of("initial") {
                Some(filename) => match read_schedule(filename, &simulation) {
                    Ok(schedule) => best_start(schedule, &optimizer),
                    Err(err) => {
                        println!("Invalid initial schedule: {}", err);
                        exit(3);
                    }
                },
                None => NaiveScheduler::default().schedule(&simulation),
            };
            let result = optimizer.improve(initial);
            println!(
                "\n\
                Optimizer\n\
                ---------\n\
                Iterations   : {}\n\
                Improvements : {}\n\
                Initial score: {}\n\
                Final score  : {}",
                result.iterations,
                result.improvements,
                result.initial_score,
                result.score,
            );
            result.schedule
        }
        _ => unreachable!(),
    };

    let sched_stats = ScheduleStats::collect(&schedule, optimizer.simulator());

    println!(
        "\n\
        Schedule\n\
        --------\n\
        {}",
        sched_stats,
    );

    if let Some(filename) = args.value_of("output") {
        if let Err(err) = write(filename, schedule.to_string()) {
            println!("Failed to write output: {}", err);
            exit(4);
        }
        info!("Schedule saved to {}", filename);
    }

    if let Some(filename) = args.value_of("image") {
        if let Err(err) = render_schedule(&schedule, 100).save(filename) {
            println!("Failed to save image: {}", err);
            exit(4);
        }
        info!("Schedule image saved to {}", filename);
    }

    exit(0);
}

fn build_optimizer(args: &ArgMatches) -> Optimizer {
    let mut optimizer = Optimizer::default();
    optimizer.set_iterations(parse_arg(args, "iterations"));
    optimizer.set_seed(parse_arg(args, "seed"));
    optimizer.set_temperature(parse_arg(args, "annealing"));
    optimizer.set_max_delta(parse_arg(args, "max-delta"));
    optimizer.set_max_green(parse_arg(args, "max-green"));
    optimizer.set_queued(args.is_present("queued"));
    optimizer.set_incremental(!args.is_present("full"));
    if args.is_present("time-limit") {
        let seconds: f64 = parse_arg(args, "time-limit");
        match time_limit(seconds) {
            Some(limit) => optimizer.set_time_limit(Some(limit)),
            None => clap::Error::value_validation_auto(format!(
                "The argument '{}' isn't a valid time limit",
                seconds
            ))
            .exit(),
        }
    }

    optimizer
}

// Stop optimizing on Ctrl-C, keeping the best schedule found so far
fn abort_on_ctrlc() -> Arc<AtomicBool> {
    let abort_flag = Arc::new(AtomicBool::new(false));
    let handler_flag = abort_flag.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    }) {
        warn!("Unable to set Ctrl-C handler: {}", err);
    }
    abort_flag
}

// Negative limits mean no time at all
fn time_limit(seconds: f64) -> Option<Duration> {
    if seconds.is_nan() {
        return None;
    }
    Duration::try_from_secs_f64(seconds.max(0.0)).ok()
}

fn parse_arg<T: FromStr>(args: &ArgMatches, name: &str) -> T {
    value_t!(args, name, T).unwrap_or_else(|err| err.exit())
}

fn read_input(
    filename: &str,
    delimiter: Delimiter,
) -> Result<Simulation, String> {
    let text = read_to_string(filename).map_err(|err| err.to_string())?;
    Simulation::parse(&text, delimiter).map_err(|err| err.to_string())
}

fn read_schedule<'a>(
    filename: &str,
    simulation: &'a Simulation,
) -> Result<Schedule<'a>, String> {
    let text = read_to_string(filename).map_err(|err| err.to_string())?;
    let mut schedule = Schedule::new(simulation);
    schedule
        .load_from_str(&text)
        .map_err(|err| err.to_string())?;
    schedule.validate().map_err(|err| err.to_string())?;
    Ok(schedule)
}

// Never start from a schedule worse than the baseline
fn best_start<'a>(
    schedule: Schedule<'a>,
    optimizer: &Optimizer,
) -> Schedule<'a> {
    let simulation = schedule.simulation;
    let simulator = optimizer.simulator();
    let baseline = NaiveScheduler::default().schedule(simulation);
    let loaded_score = ScheduleStats::collect(&schedule, simulator).score;
    let baseline_score = ScheduleStats::collect(&baseline, simulator).score;
    if loaded_score >= baseline_score {
        schedule
    } else {
        warn!(
            "Initial schedule scores {}, below the baseline's {}",
            loaded_score, baseline_score
        );
        baseline
    }
}
