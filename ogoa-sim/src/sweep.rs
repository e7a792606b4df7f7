//! Synthetic range-sweep generator.
//!
//! Models a robot driving an L-shaped corridor: a straight hallway, a right
//! turn around the corner, then a side hallway. Each sweep raycasts 360° of
//! wall distances from the robot's current pose, adds measurement noise and
//! occasional dropouts, and smooths per-angle over time, producing the same
//! kind of data a real scanning rangefinder feeds into the link.

use ogoa_link::{SweepChunk, RANGE_NO_RETURN_MM};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Corridor walls as `((x1, y1), (x2, y2))` segments, millimetres.
const WALLS: [((f64, f64), (f64, f64)); 6] = [
    ((-800.0, 0.0), (800.0, 0.0)),
    ((800.0, 0.0), (800.0, -8200.0)),
    ((800.0, -8200.0), (9000.0, -8200.0)),
    ((9000.0, -8200.0), (9000.0, -9800.0)),
    ((9000.0, -9800.0), (-800.0, -9800.0)),
    ((-800.0, -9800.0), (-800.0, 0.0)),
];

/// Ranges at or beyond this are drawn as "no return"
const DRAW_MAX_MM: u16 = 3800;

/// Closest credible measurement
const RANGE_MIN_MM: u16 = 120;

/// Angular step between samples, degrees
const DELTA_THETA: u8 = 2;

/// A robot pose: position in millimetres, heading in degrees.
#[derive(Debug, Clone, Copy)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
}

/// Per-angle smoothed corridor range model.
pub struct HallwayModel {
    smoothed: [u16; 360],
    /// Per-angle temporal smoothing factor, 0..1
    alpha: f64,
    /// Probability of a spurious no-return sample
    dropout_prob: f64,
    /// Duration of one full hallway loop
    loop_ms: u32,
    rng: StdRng,
}

impl HallwayModel {
    pub fn new(seed: u64, loop_ms: u32) -> Self {
        Self {
            smoothed: [RANGE_NO_RETURN_MM; 360],
            alpha: 0.35,
            dropout_prob: 0.01,
            loop_ms: loop_ms.max(1),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Robot pose at a point in the looped corridor drive.
    pub fn pose_at(&self, t_ms: u32) -> Pose {
        let p = f64::from(t_ms % self.loop_ms) / f64::from(self.loop_ms);

        if p < 0.55 {
            // Straight down the main hallway.
            let u = p / 0.55;
            Pose {
                x: 0.0,
                y: -1200.0 - 7400.0 * u,
                heading: 0.0,
            }
        } else if p < 0.75 {
            // Right turn around the corner.
            let u = (p - 0.55) / 0.20;
            Pose {
                x: 1800.0 * u,
                y: -8600.0 - 400.0 * u,
                heading: 90.0 * u,
            }
        } else {
            // Down the side hallway.
            let u = (p - 0.75) / 0.25;
            Pose {
                x: 1800.0 + 5200.0 * u,
                y: -9000.0,
                heading: 90.0,
            }
        }
    }

    /// One measured sample at `theta` degrees (sensor frame).
    fn sample_mm(&mut self, theta: u16, pose: Pose) -> u16 {
        let ray_world = (f64::from(theta) + pose.heading) % 360.0;
        let rad = (ray_world - 90.0).to_radians();
        let (dx, dy) = (rad.cos(), rad.sin());

        let mut nearest: Option<f64> = None;
        for ((x1, y1), (x2, y2)) in WALLS {
            if let Some(hit) = ray_segment_distance(pose.x, pose.y, dx, dy, x1, y1, x2, y2) {
                if nearest.is_none_or(|n| hit < n) {
                    nearest = Some(hit);
                }
            }
        }

        let mut raw = match nearest {
            Some(mm) => mm as i32,
            None => i32::from(RANGE_NO_RETURN_MM),
        };

        // Measurement noise plus the occasional glitch.
        if raw < i32::from(DRAW_MAX_MM) {
            raw += self.rng.random_range(-9..=9);
            if self.rng.random_bool(0.01) {
                raw += self.rng.random_range(-40..=40);
            }
        }
        if self.dropout_prob > 0.0 && self.rng.random_bool(self.dropout_prob) {
            raw = i32::from(RANGE_NO_RETURN_MM);
        }
        let raw = raw.clamp(i32::from(RANGE_MIN_MM), i32::from(RANGE_NO_RETURN_MM)) as u16;

        // Temporal smoothing per angle; decay toward no-return when the
        // target leaves the drawable band.
        let prev = f64::from(self.smoothed[usize::from(theta)]);
        let target = if raw >= DRAW_MAX_MM {
            f64::from(RANGE_NO_RETURN_MM)
        } else {
            f64::from(raw)
        };
        let blended = ((1.0 - self.alpha) * prev + self.alpha * target) as u16;
        let blended = blended.clamp(RANGE_MIN_MM, RANGE_NO_RETURN_MM);

        self.smoothed[usize::from(theta)] = blended;
        blended
    }

    /// Produce one full 360° sweep as wire-sized chunks.
    ///
    /// With a 2° step each half-circle needs two passes (even and odd
    /// phases) for full coverage, matching the sensor's interleaved
    /// scanning: four chunks of 90 points each.
    pub fn sweep(&mut self, t_ms: u32) -> Vec<SweepChunk> {
        let pose = self.pose_at(t_ms);
        let mut chunks = Vec::new();

        for phase in [0u16, 1] {
            for base in [0u16, 180] {
                let start = base + phase;
                let count = (180 - usize::from(phase)).div_ceil(usize::from(DELTA_THETA));

                let mut ranges = Vec::with_capacity(count);
                let mut theta = start;
                for _ in 0..count {
                    ranges.push(self.sample_mm(theta % 360, pose));
                    theta += u16::from(DELTA_THETA);
                }

                // Chunk sizes are far below the wire maximum.
                if let Ok(chunk) = SweepChunk::new(start as u8, DELTA_THETA, &ranges) {
                    chunks.push(chunk);
                }
            }
        }

        chunks
    }
}

/// Distance along the ray `(ox, oy) + t·(dx, dy)` to the segment
/// `(x1, y1)–(x2, y2)`, if the ray hits it.
fn ray_segment_distance(
    ox: f64,
    oy: f64,
    dx: f64,
    dy: f64,
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
) -> Option<f64> {
    let sx = x2 - x1;
    let sy = y2 - y1;
    let denom = dx * sy - dy * sx;
    if denom.abs() < 1e-9 {
        return None;
    }

    let qpx = x1 - ox;
    let qpy = y1 - oy;
    let t = (qpx * sy - qpy * sx) / denom;
    let u = (qpx * dy - qpy * dx) / denom;

    if t > 0.0 && (0.0..=1.0).contains(&u) {
        Some(t)
    } else {
        None
    }
}
