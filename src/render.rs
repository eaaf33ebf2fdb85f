use super::*;
use crate::sched::Schedule;
use image::{ImageBuffer, Rgb, RgbImage};

const GREEN: Rgb<u8> = Rgb([0, 128, 0]);
const LIGHT_GRAY: Rgb<u8> = Rgb([211, 211, 211]);
const LIGHT_GREEN: Rgb<u8> = Rgb([144, 238, 144]);
const RED: Rgb<u8> = Rgb([255, 0, 0]);

/// Draws the traffic lights of the first `max_intersections` scheduled
/// intersections over the whole simulation. Each intersection takes one
/// column per second of its cycle (separated by a gray column) and each row
/// is one second: the green street's block is light green, with the current
/// second of the cycle in dark green, and all other blocks are red.
pub fn render_schedule(
    schedule: &Schedule,
    max_intersections: usize,
) -> RgbImage {
    let intersections: Vec<_> =
        schedule.iter().take(max_intersections).collect();
    let width = intersections
        .iter()
        .map(|(_, inter)| inter.cycle())
        .sum::<Time>()
        + Time::try_from(intersections.len()).unwrap_or(0).saturating_sub(1);
    let height = schedule.simulation.duration + 1;
    let mut image: RgbImage =
        ImageBuffer::from_pixel(width, height, LIGHT_GRAY);

    for time in 0..height {
        let mut inter_col = 0;
        for (_, intersection) in intersections.iter() {
            let cycle = intersection.cycle();
            if cycle == 0 {
                continue;
            }
            let mut street_col = inter_col;
            for &(street_id, street_time) in intersection.turns() {
                let color = if intersection.is_green(street_id, time) {
                    LIGHT_GREEN
                } else {
                    RED
                };
                for col in street_col..street_col + street_time {
                    image.put_pixel(col, time, color);
                }
                street_col += street_time;
            }
            image.put_pixel(inter_col + time % cycle, time, GREEN);
            inter_col += cycle + 1;
        }
    }

    image
}
