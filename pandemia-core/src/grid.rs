//! Spatial primitives: unit-square positions, the block grid, and the
//! canonical commute walk between blocks.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Continuous position inside the unit square `[0,1)²`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Draw a position uniformly over the unit square.
    pub fn uniform<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            x: rng.r#gen::<f64>(),
            y: rng.r#gen::<f64>(),
        }
    }

    /// Draw a position biased toward the center of the unit square.
    ///
    /// Each coordinate is the mean of two independent uniform draws, which
    /// concentrates mass around 0.5. Used for workplace placement to model
    /// commercial districts.
    pub fn center_squeezed<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            x: (rng.r#gen::<f64>() + rng.r#gen::<f64>()) / 2.0,
            y: (rng.r#gen::<f64>() + rng.r#gen::<f64>()) / 2.0,
        }
    }

    /// Squared Euclidean distance to another position.
    #[must_use]
    pub fn distance_sq(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }
}

/// Discrete grid cell, the unit of transportation contact.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Block {
    pub bx: i32,
    pub by: i32,
}

impl Block {
    #[must_use]
    pub const fn new(bx: i32, by: i32) -> Self {
        Self { bx, by }
    }

    /// Project a continuous position onto the grid by truncating division.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn containing(pos: Position, block_count: u32) -> Self {
        let scale = f64::from(block_count);
        Self {
            bx: (pos.x * scale) as i32,
            by: (pos.y * scale) as i32,
        }
    }
}

/// Ordered sequence of blocks crossed walking from `from` to `to`.
///
/// The walk is one canonical monotone staircase: axis moves alternate
/// (x, then y, then x, ...), skipping an axis once its coordinate matches,
/// until both coordinates match. Equal endpoints yield the singleton path.
#[must_use]
pub fn staircase_walk(from: Block, to: Block) -> Vec<Block> {
    let mut path = vec![from];
    let mut cur = from;
    let mut prefer_x = true;
    while cur != to {
        if prefer_x && cur.bx != to.bx {
            cur.bx += (to.bx - cur.bx).signum();
        } else if cur.by != to.by {
            cur.by += (to.by - cur.by).signum();
        } else {
            cur.bx += (to.bx - cur.bx).signum();
        }
        path.push(cur);
        prefer_x = !prefer_x;
    }
    path
}

/// Indexes of the two nearest candidates to `origin`, nearest first.
///
/// Returns `None` when `candidates` is empty. With a single candidate the
/// second slot is `None`; callers fall back to the unique choice.
#[must_use]
pub fn two_nearest(origin: Position, candidates: &[Position]) -> Option<(usize, Option<usize>)> {
    let mut best: Option<(usize, f64)> = None;
    let mut second: Option<(usize, f64)> = None;
    for (idx, pos) in candidates.iter().enumerate() {
        let d = origin.distance_sq(pos);
        match best {
            Some((_, bd)) if d >= bd => {
                if second.is_none_or(|(_, sd)| d < sd) {
                    second = Some((idx, d));
                }
            }
            _ => {
                second = best;
                best = Some((idx, d));
            }
        }
    }
    best.map(|(b, _)| (b, second.map(|(s, _)| s)))
}
