use super::*;
use crate::error::parse_number;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

pub trait Scheduler {
    fn schedule<'a>(&self, simulation: &'a Simulation) -> Schedule<'a>;
}

/// Traffic light schedules of all intersections, indexed by intersection ID.
/// Intersections that no car needs to cross have no schedule.
#[derive(Clone)]
pub struct Schedule<'a> {
    pub simulation: &'a Simulation,
    intersections: Vec<Option<Intersection>>,
}

/// Cyclic sequence of green lights at one intersection: each street is
/// green for its time, in order, then the cycle repeats.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Intersection {
    turns: Vec<(StreetId, Time)>,
    cycle: Time,
}

impl Intersection {
    pub fn new(street_id: StreetId, time: Time) -> Self {
        let turns = vec![(street_id, time)];
        let cycle = time;
        Self { turns, cycle }
    }

    pub fn turns(&self) -> &[(StreetId, Time)] {
        &self.turns
    }

    pub fn cycle(&self) -> Time {
        self.cycle
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn add_street(&mut self, street_id: StreetId, time: Time) {
        self.turns.push((street_id, time));
        self.cycle += time;
    }

    /// Sets the green time of a street already in the intersection. Green
    /// times never go below 1 second, and the cycle never exceeds
    /// `Time::MAX`.
    pub fn set_street_time(&mut self, street_id: StreetId, new_time: Time) {
        if let Some((_, time)) =
            self.turns.iter_mut().find(|(id, _)| *id == street_id)
        {
            let others = self.cycle - *time;
            let new_time = new_time.max(1).min(Time::MAX - others);
            self.cycle = others + new_time;
            *time = new_time;
        }
    }

    pub fn add_street_time(&mut self, street_id: StreetId, add_time: Time) {
        if let Some(time) = self.get_street_time(street_id) {
            self.set_street_time(street_id, time.saturating_add(add_time));
        }
    }

    pub fn sub_street_time(&mut self, street_id: StreetId, sub_time: Time) {
        if let Some(time) = self.get_street_time(street_id) {
            self.set_street_time(street_id, time.saturating_sub(sub_time));
        }
    }

    pub fn swap(&mut self, a: usize, b: usize) {
        self.turns.swap(a, b);
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.turns.shuffle(rng);
    }

    pub fn is_green(&self, street_id: StreetId, at_time: Time) -> bool {
        self.wait_time(street_id, at_time) == Some(0)
    }

    /// Seconds a car arriving at `at_time` on the street must wait until
    /// its light turns green, or `None` if the street never gets a green.
    pub fn wait_time(
        &self,
        street_id: StreetId,
        at_time: Time,
    ) -> Option<Time> {
        if self.cycle == 0 {
            return None;
        }
        let (start, time) = self.green_window(street_id)?;
        if time == 0 {
            return None;
        }
        let cycle = u64::from(self.cycle);
        let (start, time) = (u64::from(start), u64::from(time));
        let pos = u64::from(at_time) % cycle;
        if pos >= start && pos < start + time {
            Some(0)
        } else {
            Time::try_from((start + cycle - pos) % cycle).ok()
        }
    }

    /// Offset within the cycle at which the street turns green, and for how
    /// long it stays green.
    pub fn green_window(&self, street_id: StreetId) -> Option<(Time, Time)> {
        let mut acc_time = 0;
        for &(id, time) in &self.turns {
            if id == street_id {
                return Some((acc_time, time));
            }
            acc_time += time;
        }
        None
    }

    pub fn get_street_time(&self, street_id: StreetId) -> Option<Time> {
        self.turns
            .iter()
            .find(|&(id, _)| *id == street_id)
            .map(|&(_, time)| time)
    }
}

impl<'a> Schedule<'a> {
    pub fn new(simulation: &'a Simulation) -> Self {
        let intersections = vec![None; simulation.num_intersections as usize];
        Self {
            simulation,
            intersections,
        }
    }

    pub fn add_street(
        &mut self,
        inter_id: IntersectionId,
        street_id: StreetId,
        time: Time,
    ) {
        match &mut self.intersections[inter_id as usize] {
            Some(intersection) => intersection.add_street(street_id, time),
            slot => *slot = Some(Intersection::new(street_id, time)),
        }
    }

    pub fn intersection(
        &self,
        inter_id: IntersectionId,
    ) -> Option<&Intersection> {
        self.intersections
            .get(inter_id as usize)
            .and_then(|inter| inter.as_ref())
    }

    pub fn intersection_mut(
        &mut self,
        inter_id: IntersectionId,
    ) -> Option<&mut Intersection> {
        self.intersections
            .get_mut(inter_id as usize)
            .and_then(|inter| inter.as_mut())
    }

    pub fn set_intersection(
        &mut self,
        inter_id: IntersectionId,
        intersection: Intersection,
    ) {
        self.intersections[inter_id as usize] = if intersection.is_empty() {
            None
        } else {
            Some(intersection)
        };
    }

    /// Scheduled intersections in increasing ID order.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (IntersectionId, &Intersection)> {
        self.intersections
            .iter()
            .zip(0..)
            .filter_map(|(inter, inter_id)| {
                inter.as_ref().map(|inter| (inter_id, inter))
            })
    }

    pub fn num_intersections(&self) -> usize {
        self.intersections.iter().filter(|inter| inter.is_some()).count()
    }

    pub fn num_streets(&self) -> usize {
        self.iter().map(|(_, inter)| inter.len()).sum()
    }

    pub fn get_intersection_id(
        &self,
        street_id: StreetId,
    ) -> Option<IntersectionId> {
        self.simulation
            .streets
            .get(street_id)
            .map(|street| street.end_intersection)
    }

    pub fn is_green(
        &self,
        inter_id: IntersectionId,
        street_id: StreetId,
        at_time: Time,
    ) -> bool {
        self.intersection(inter_id)
            .map(|inter| inter.is_green(street_id, at_time))
            .unwrap_or(false)
    }

    /// Seconds a car at the end of the street at `at_time` waits before it
    /// can cross, or `None` if the street never gets a green light.
    pub fn wait_time(
        &self,
        street_id: StreetId,
        at_time: Time,
    ) -> Option<Time> {
        self.get_intersection_id(street_id)
            .and_then(|inter_id| self.intersection(inter_id))
            .and_then(|inter| inter.wait_time(street_id, at_time))
    }

    pub fn is_street_always_green(&self, street_id: StreetId) -> bool {
        self.get_intersection_id(street_id)
            .and_then(|inter_id| self.intersection(inter_id))
            .map(|inter| inter.len() == 1 && inter.turns[0].0 == street_id)
            .unwrap_or(false)
    }

    /// Checks that every intersection schedules exactly the streets cars
    /// need to cross there, each once and for at least 1 second.
    pub fn validate(&self) -> Result<(), FormatError> {
        let traffic = self.simulation.street_traffic();
        let mut scheduled = vec![false; self.simulation.streets.len()];

        for (inter_id, intersection) in self.iter() {
            for &(street_id, time) in intersection.turns() {
                let street = &self.simulation.streets[street_id];
                if street.end_intersection != inter_id {
                    return Err(FormatError::InvalidSchedule(format!(
                        "street {} does not end at intersection {}",
                        street.name, inter_id
                    )));
                }
                if traffic[street_id] == 0 {
                    return Err(FormatError::InvalidSchedule(format!(
                        "no car crosses intersection {} from street {}",
                        inter_id, street.name
                    )));
                }
                if time == 0 {
                    return Err(FormatError::InvalidSchedule(format!(
                        "street {} has zero green time",
                        street.name
                    )));
                }
                if scheduled[street_id] {
                    return Err(FormatError::InvalidSchedule(format!(
                        "street {} appears multiple times",
                        street.name
                    )));
                }
                scheduled[street_id] = true;
            }
        }

        if let Some(street_id) = (0..scheduled.len())
            .find(|&street_id| traffic[street_id] > 0 && !scheduled[street_id])
        {
            return Err(FormatError::InvalidSchedule(format!(
                "street {} is never green",
                self.simulation.streets[street_id].name
            )));
        }

        Ok(())
    }

    /// Replaces this schedule with one read from the submission format.
    pub fn load_from_str(&mut self, s: &str) -> Result<(), FormatError> {
        let mut lines = s.lines().zip(1..);
        let mut intersections = vec![None; self.intersections.len()];
        let mut added_streets = HashSet::new();

        let (line, line_num) = lines
            .next()
            .ok_or(FormatError::MissingLine("first line"))?;
        let num_intersections: usize = parse_number(line.trim(), line_num)?;

        for _ in 0..num_intersections {
            let (line, line_num) = lines
                .next()
                .ok_or(FormatError::MissingLine("intersections"))?;
            let inter_id: IntersectionId = parse_number(line.trim(), line_num)?;
            if inter_id >= self.simulation.num_intersections {
                return Err(FormatError::IntersectionOutOfBounds {
                    line: line_num,
                    intersection: inter_id,
                });
            }
            if intersections[inter_id as usize].is_some() {
                return Err(FormatError::InvalidSchedule(format!(
                    "intersection {} appears multiple times",
                    inter_id
                )));
            }

            let (line, line_num) = lines
                .next()
                .ok_or(FormatError::MissingLine("intersection street count"))?;
            let num_streets: usize = parse_number(line.trim(), line_num)?;

            let mut intersection = Intersection::default();
            for _ in 0..num_streets {
                let (line, line_num) = lines
                    .next()
                    .ok_or(FormatError::MissingLine("intersection streets"))?;
                let fields = line.split_whitespace().collect::<Vec<_>>();
                if fields.len() != 2 {
                    return Err(FormatError::FieldCount {
                        line: line_num,
                        expected: 2,
                        found: fields.len(),
                    });
                }
                let street_id =
                    self.simulation.street_id(fields[0]).ok_or_else(|| {
                        FormatError::UnknownStreet {
                            line: line_num,
                            street: fields[0].to_string(),
                        }
                    })?;
                if !added_streets.insert(street_id) {
                    return Err(FormatError::DuplicateStreet {
                        line: line_num,
                        street: fields[0].to_string(),
                    });
                }
                let time: Time = parse_number(fields[1], line_num)?;
                if intersection.cycle().checked_add(time).is_none() {
                    return Err(FormatError::InvalidSchedule(format!(
                        "cycle of intersection {} is too long",
                        inter_id
                    )));
                }
                intersection.add_street(street_id, time);
            }

            if !intersection.is_empty() {
                intersections[inter_id as usize] = Some(intersection);
            }
        }

        if let Some((_, line_num)) =
            lines.find(|(line, _)| !line.trim().is_empty())
        {
            return Err(FormatError::UnexpectedLine { line: line_num });
        }

        self.intersections = intersections;
        Ok(())
    }
}

impl Display for Schedule<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        writeln!(f, "{}", self.num_intersections())?;
        for (inter_id, light) in self.iter() {
            writeln!(f, "{}\n{}", inter_id, light.len())?;
            for &(street_id, time) in light.turns() {
                let street_name = &self.simulation.streets[street_id].name;
                writeln!(f, "{} {}", street_name, time)?;
            }
        }
        Ok(())
    }
}
