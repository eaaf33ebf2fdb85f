use std::collections::HashMap;
use std::convert::TryFrom;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub mod error;
pub mod naive;
pub mod optimize;
pub mod queue;
pub mod render;
pub mod sched;
pub mod score;
pub mod simulate;
pub mod traffic;

pub use error::FormatError;
use error::parse_number;

pub type Time = u32;
pub type Score = u64;
pub type CarId = usize;
pub type StreetId = usize;
pub type IntersectionId = u32;

pub struct Simulation {
    pub duration: Time,
    pub num_intersections: u32,
    pub streets: Vec<Street>,
    pub car_paths: Vec<Vec<StreetId>>,
    pub bonus: u32,
    street_index: HashMap<String, StreetId>,
}

pub struct Street {
    pub name: String,
    pub start_intersection: IntersectionId,
    pub end_intersection: IntersectionId,
    pub travel_time: Time,
}

/// How fields are separated on each input line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delimiter {
    Whitespace,
    Char(char),
}

impl Default for Delimiter {
    fn default() -> Self {
        Delimiter::Whitespace
    }
}

impl Delimiter {
    /// Splits a line into its non-empty fields.
    pub fn split<'a>(&self, line: &'a str) -> Vec<&'a str> {
        match *self {
            Delimiter::Whitespace => line.split_whitespace().collect(),
            Delimiter::Char(delim) => line
                .split(delim)
                .map(str::trim)
                .filter(|field| !field.is_empty())
                .collect(),
        }
    }
}

impl FromStr for Delimiter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "whitespace" | "space" => Ok(Delimiter::Whitespace),
            "tab" | "\\t" => Ok(Delimiter::Char('\t')),
            _ => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(delim), None) if delim.is_whitespace() => {
                        Ok(Delimiter::Whitespace)
                    }
                    (Some(delim), None) => Ok(Delimiter::Char(delim)),
                    _ => Err(format!("Invalid delimiter: {}", s)),
                }
            }
        }
    }
}

impl Simulation {
    pub fn parse(s: &str, delimiter: Delimiter) -> Result<Self, FormatError> {
        let mut lines = s.lines().zip(1..);

        let (line, line_num) = lines
            .next()
            .ok_or(FormatError::MissingLine("first line"))?;
        let fields = delimiter
            .split(line)
            .into_iter()
            .map(|num| parse_number::<u32>(num, line_num))
            .collect::<Result<Vec<_>, _>>()?;
        if fields.len() != 5 {
            return Err(FormatError::FieldCount {
                line: line_num,
                expected: 5,
                found: fields.len(),
            });
        }
        let duration = fields[0];
        let num_intersections = fields[1];
        let num_streets = fields[2] as usize;
        let num_cars = fields[3] as usize;
        let bonus = fields[4];

        let mut street_index = HashMap::with_capacity(num_streets);
        let mut streets = Vec::with_capacity(num_streets);
        for street_id in 0..num_streets {
            let (line, line_num) = lines
                .next()
                .ok_or(FormatError::MissingLine("street lines"))?;
            let street = Street::parse(line, line_num, delimiter)?;
            for &inter_id in
                [street.start_intersection, street.end_intersection].iter()
            {
                if inter_id >= num_intersections {
                    return Err(FormatError::IntersectionOutOfBounds {
                        line: line_num,
                        intersection: inter_id,
                    });
                }
            }
            if street_index.insert(street.name.clone(), street_id).is_some() {
                return Err(FormatError::DuplicateStreet {
                    line: line_num,
                    street: street.name,
                });
            }
            streets.push(street);
        }

        let mut car_paths = Vec::with_capacity(num_cars);
        for _ in 0..num_cars {
            let (line, line_num) = lines
                .next()
                .ok_or(FormatError::MissingLine("car lines"))?;
            let fields = delimiter.split(line);
            let (count, names) = fields
                .split_first()
                .ok_or(FormatError::EmptyPath { line: line_num })?;
            let path_len: usize = parse_number(count, line_num)?;
            if path_len == 0 {
                return Err(FormatError::EmptyPath { line: line_num });
            }
            if names.len() != path_len {
                return Err(FormatError::FieldCount {
                    line: line_num,
                    expected: path_len + 1,
                    found: fields.len(),
                });
            }
            let path = names
                .iter()
                .map(|&name| {
                    street_index.get(name).copied().ok_or_else(|| {
                        FormatError::UnknownStreet {
                            line: line_num,
                            street: name.to_string(),
                        }
                    })
                })
                .collect::<Result<Vec<StreetId>, _>>()?;
            for pair in path.windows(2) {
                let (from, to) = (&streets[pair[0]], &streets[pair[1]]);
                if from.end_intersection != to.start_intersection {
                    return Err(FormatError::DisconnectedPath {
                        line: line_num,
                        from: from.name.clone(),
                        to: to.name.clone(),
                    });
                }
            }
            car_paths.push(path);
        }

        if let Some((_, line_num)) =
            lines.find(|(line, _)| !line.trim().is_empty())
        {
            return Err(FormatError::UnexpectedLine { line: line_num });
        }

        Ok(Simulation {
            duration,
            num_intersections,
            streets,
            car_paths,
            bonus,
            street_index,
        })
    }

    pub fn street_id(&self, name: &str) -> Option<StreetId> {
        self.street_index.get(name).copied()
    }

    /// Number of times cars need to cross the intersection at the end of
    /// each street. Streets with zero traffic never need a green light.
    pub fn street_traffic(&self) -> Vec<usize> {
        let mut traffic = vec![0; self.streets.len()];
        for car_path in self.car_paths.iter() {
            let path_len = car_path.len();
            for &street_id in car_path.iter().take(path_len - 1) {
                traffic[street_id] += 1;
            }
        }
        traffic
    }

    /// Cars whose path crosses each intersection, indexed by intersection.
    pub fn cars_by_intersection(&self) -> Vec<Vec<CarId>> {
        let mut cars = vec![Vec::new(); self.num_intersections as usize];
        for (car_id, car_path) in self.car_paths.iter().enumerate() {
            let path_len = car_path.len();
            for &street_id in car_path.iter().take(path_len - 1) {
                let inter_id = self.streets[street_id].end_intersection;
                let crossing = &mut cars[inter_id as usize];
                if crossing.last() != Some(&car_id) {
                    crossing.push(car_id);
                }
            }
        }
        cars
    }

    /// Score obtained if every car drove through green lights only.
    pub fn max_theoretical_score(&self) -> Score {
        self.car_paths
            .iter()
            .map(|streets| {
                let min_travel_time: Score = streets
                    .iter()
                    .skip(1)
                    .map(|&street_id| {
                        Score::from(self.streets[street_id].travel_time)
                    })
                    .sum();
                let duration = Score::from(self.duration);
                if min_travel_time < duration {
                    Score::from(self.bonus) + duration - min_travel_time
                } else {
                    0
                }
            })
            .sum()
    }
}

impl FromStr for Simulation {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Simulation::parse(s, Delimiter::Whitespace)
    }
}

impl Street {
    fn parse(
        line: &str,
        line_num: usize,
        delimiter: Delimiter,
    ) -> Result<Self, FormatError> {
        let mut fields = delimiter.split(line);
        if fields.len() != 4 {
            return Err(FormatError::FieldCount {
                line: line_num,
                expected: 4,
                found: fields.len(),
            });
        }
        let name = fields.remove(2).to_string();
        let numbers = fields
            .iter()
            .map(|num| parse_number::<u32>(num, line_num))
            .collect::<Result<Vec<_>, _>>()?;
        let travel_time = numbers[2];
        if travel_time == 0 {
            return Err(FormatError::ZeroTravelTime {
                line: line_num,
                street: name,
            });
        }
        Ok(Street {
            name,
            start_intersection: numbers[0],
            end_intersection: numbers[1],
            travel_time,
        })
    }
}

impl Display for Simulation {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "\
            Duration     : {}\n\
            Intersections: {}\n\
            Streets      : {}\n\
            Cars         : {}\n\
            Max score    : {}\n\
            Bonus points : {}",
            self.duration,
            self.num_intersections,
            self.streets.len(),
            self.car_paths.len(),
            self.max_theoretical_score(),
            self.bonus,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn parses_example_problem() {
        let simulation: Simulation = EXAMPLE.parse().unwrap();
        assert_eq!(simulation.duration, 6);
        assert_eq!(simulation.num_intersections, 4);
        assert_eq!(simulation.bonus, 1000);
        assert_eq!(simulation.streets.len(), 5);
        assert_eq!(simulation.car_paths, vec![vec![0, 1, 4, 3], vec![2, 4, 0]]);
        assert_eq!(simulation.street_id("rue-de-moscou"), Some(4));
        assert_eq!(simulation.streets[3].travel_time, 2);
    }

    #[test]
    fn parses_custom_delimiter() {
        let text = EXAMPLE.replace(' ', ";");
        let simulation =
            Simulation::parse(&text, Delimiter::Char(';')).unwrap();
        assert_eq!(simulation.car_paths.len(), 2);
        assert_eq!(simulation.streets[0].name, "rue-de-londres");
    }

    #[test]
    fn delimiter_from_str() {
        assert_eq!("".parse(), Ok(Delimiter::Whitespace));
        assert_eq!(" ".parse(), Ok(Delimiter::Whitespace));
        assert_eq!(",".parse(), Ok(Delimiter::Char(',')));
        assert_eq!("tab".parse(), Ok(Delimiter::Char('\t')));
        assert!("ab".parse::<Delimiter>().is_err());
    }

    #[test]
    fn street_traffic_skips_last_street() {
        let simulation: Simulation = EXAMPLE.parse().unwrap();
        assert_eq!(simulation.street_traffic(), vec![1, 1, 1, 0, 2]);
        let cars = simulation.cars_by_intersection();
        assert_eq!(cars[0], vec![0]);
        assert_eq!(cars[1], vec![0, 1]);
        assert_eq!(cars[2], vec![0, 1]);
        assert_eq!(cars[3], Vec::<CarId>::new());
    }

    #[test]
    fn max_theoretical_score_ignores_first_street() {
        let simulation: Simulation = EXAMPLE.parse().unwrap();
        // Car 0 needs 1 + 3 + 2 = 6 seconds, which is not before D
        // Car 1 needs 3 + 1 = 4 seconds
        assert_eq!(simulation.max_theoretical_score(), 1000 + 2);
    }

    #[test]
    fn rejects_duplicate_street() {
        let text = "1 2 2 0 1\n0 1 a 1\n1 0 a 1\n";
        assert_eq!(
            text.parse::<Simulation>().err(),
            Some(FormatError::DuplicateStreet {
                line: 3,
                street: "a".to_string()
            })
        );
    }

    #[test]
    fn rejects_unknown_street() {
        let text = "1 2 1 1 1\n0 1 a 1\n2 a b\n";
        assert_eq!(
            text.parse::<Simulation>().err(),
            Some(FormatError::UnknownStreet {
                line: 3,
                street: "b".to_string()
            })
        );
    }

    #[test]
    fn rejects_missing_lines() {
        let text = "1 2 2 1 1\n0 1 a 1\n";
        assert_eq!(
            text.parse::<Simulation>().err(),
            Some(FormatError::MissingLine("street lines"))
        );
        let text = "1 2 1 2 1\n0 1 a 1\n1 a\n";
        assert_eq!(
            text.parse::<Simulation>().err(),
            Some(FormatError::MissingLine("car lines"))
        );
    }

    #[test]
    fn rejects_extra_lines() {
        let text = "1 2 1 1 1\n0 1 a 1\n1 a\n1 a\n";
        assert_eq!(
            text.parse::<Simulation>().err(),
            Some(FormatError::UnexpectedLine { line: 4 })
        );
        assert!("1 2 1 1 1\n0 1 a 1\n1 a\n\n".parse::<Simulation>().is_ok());
    }

    #[test]
    fn rejects_malformed_fields() {
        assert!(matches!(
            "1 2 x 0 1\n".parse::<Simulation>(),
            Err(FormatError::InvalidNumber { line: 1, .. })
        ));
        assert!(matches!(
            "1 2 1 0\n".parse::<Simulation>(),
            Err(FormatError::FieldCount { line: 1, .. })
        ));
        assert!(matches!(
            "1 2 1 0 1\n0 1 a 0\n".parse::<Simulation>(),
            Err(FormatError::ZeroTravelTime { line: 2, .. })
        ));
        assert!(matches!(
            "1 2 1 0 1\n0 2 a 1\n".parse::<Simulation>(),
            Err(FormatError::IntersectionOutOfBounds {
                line: 2,
                intersection: 2
            })
        ));
        assert!(matches!(
            "1 2 1 1 1\n0 1 a 1\n2 a\n".parse::<Simulation>(),
            Err(FormatError::FieldCount { line: 3, .. })
        ));
        assert!(matches!(
            "1 2 1 1 1\n0 1 a 1\n0\n".parse::<Simulation>(),
            Err(FormatError::EmptyPath { line: 3 })
        ));
    }

    #[test]
    fn rejects_disconnected_path() {
        let text = "1 3 2 1 1\n0 1 a 1\n2 0 b 1\n2 a b\n";
        assert_eq!(
            text.parse::<Simulation>().err(),
            Some(FormatError::DisconnectedPath {
                line: 4,
                from: "a".to_string(),
                to: "b".to_string()
            })
        );
    }
}
