//! Radial layout engine: seeded on-screen arrangement of menu items.
//!
//! Each menu level is a concentric ring. The root ring gets a seeded item
//! order plus a seeded whole-ring rotation; branch expansions subdivide their
//! parent's wedge exactly, with no rotation of their own, so a child can never
//! leak into a sibling's sector. Depth-agnostic: [`layout_children`] works for
//! any parent wedge at any level.
//!
//! All randomness comes from the trial seed XOR a level- or branch-specific
//! constant, so a replayed trial reproduces the identical arrangement.

use crate::rng::{fnv1a, shuffle, SeededRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Salt for the one-off shuffle applied when an initial is chosen.
pub const INITIAL_SHUFFLE_SALT: u32 = 0xA1B2_C3D4;
/// Per-level item-order salt (multiplied by the level).
pub const LEVEL_ORDER_SALT: u32 = 0xA511_E9B3;
/// Per-level ring-rotation salt (multiplied by the level).
pub const LEVEL_ROTATION_SALT: u32 = 0x9E37_79B9;

/// Half-open angular range `[start_angle, end_angle)` in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wedge {
    pub start_angle: f64,
    pub end_angle: f64,
}

impl Wedge {
    pub fn span(&self) -> f64 {
        self.end_angle - self.start_angle
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ring {
    pub inner_radius: f64,
    pub outer_radius: f64,
}

/// Ring radii grow monotonically with level: levels never overlap.
pub fn ring_for_level(level: u32) -> Ring {
    const WIDTH: f64 = 80.0;
    const GAP: f64 = 6.0;
    let inner = 30.0 + (WIDTH + GAP) * (level.max(1) as f64 - 1.0);
    Ring {
        inner_radius: inner,
        outer_radius: inner + WIDTH,
    }
}

/// Lay out the root ring of `n` items.
///
/// Returns `(original_index, wedge)` per on-screen position. `n == 1` yields
/// the full `[-π, π)` ring: a closed annulus, selectable anywhere.
pub fn layout_root(n: usize, level: u32, trial_seed: u32) -> Vec<(usize, Wedge)> {
    if n == 0 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng_order = SeededRng::new(trial_seed ^ level.wrapping_mul(LEVEL_ORDER_SALT));
    shuffle(&mut order, &mut rng_order);

    if n == 1 {
        return vec![(
            order[0],
            Wedge {
                start_angle: -PI,
                end_angle: PI,
            },
        )];
    }

    let mut rng_rot = SeededRng::new(trial_seed ^ level.wrapping_mul(LEVEL_ROTATION_SALT));
    let rotation = rng_rot.next_f64() * 2.0 * PI;
    let start = -PI / 2.0 + rotation;
    let d = 2.0 * PI / n as f64;

    order
        .into_iter()
        .enumerate()
        .map(|(i, orig)| {
            (
                orig,
                Wedge {
                    start_angle: start + d * i as f64,
                    end_angle: start + d * (i + 1) as f64,
                },
            )
        })
        .collect()
}

/// Lay out `n` children inside their parent's wedge.
///
/// The sub-wedges tile `[parent.start_angle, parent.end_angle)` exactly; a
/// single child inherits the whole parent wedge.
pub fn layout_children(n: usize, parent: Wedge, order_seed: u32) -> Vec<(usize, Wedge)> {
    if n == 0 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = SeededRng::new(order_seed);
    shuffle(&mut order, &mut rng);

    let d = parent.span() / n as f64;
    order
        .into_iter()
        .enumerate()
        .map(|(i, orig)| {
            (
                orig,
                Wedge {
                    start_angle: parent.start_angle + d * i as f64,
                    end_angle: parent.start_angle + d * (i + 1) as f64,
                },
            )
        })
        .collect()
}

/// Branch-scoped order seed, distinct per expanded wedge so sibling branches
/// at the same depth shuffle independently but reproducibly.
pub fn child_order_seed(trial_seed: u32, initial: char, level: u32, parent: &Wedge) -> u32 {
    let key = format!(
        "{initial}|L{level}|{:.4}|{:.4}",
        parent.start_angle, parent.end_angle
    );
    trial_seed ^ fnv1a(&key)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn root_wedges_tile_the_full_circle() {
        for n in [2usize, 3, 7, 12] {
            let placed = layout_root(n, 1, 0x1234_5678);
            assert_eq!(placed.len(), n);

            let total: f64 = placed.iter().map(|(_, w)| w.span()).sum();
            assert!((total - 2.0 * PI).abs() < EPS, "n={n}: total={total}");

            // Adjacent on-screen wedges share boundaries: no gaps, no overlap.
            for pair in placed.windows(2) {
                assert!((pair[0].1.end_angle - pair[1].1.start_angle).abs() < EPS);
            }

            // Every original index appears exactly once.
            let mut seen: Vec<usize> = placed.iter().map(|(i, _)| *i).collect();
            seen.sort_unstable();
            assert_eq!(seen, (0..n).collect::<Vec<_>>());
        }
    }

    #[test]
    fn single_item_spans_the_full_ring() {
        let placed = layout_root(1, 1, 42);
        assert_eq!(placed.len(), 1);
        let w = placed[0].1;
        assert_eq!(w.start_angle, -PI);
        assert_eq!(w.end_angle, PI);
        assert!((w.span() - 2.0 * PI).abs() < EPS);
    }

    #[test]
    fn children_tile_exactly_their_parent_wedge() {
        let parent = Wedge {
            start_angle: 0.7,
            end_angle: 2.3,
        };
        for n in [1usize, 2, 5] {
            let placed = layout_children(n, parent, 77);
            let total: f64 = placed.iter().map(|(_, w)| w.span()).sum();
            assert!((total - parent.span()).abs() < EPS);
            assert!((placed[0].1.start_angle - parent.start_angle).abs() < EPS);
            assert!((placed[placed.len() - 1].1.end_angle - parent.end_angle).abs() < EPS);
            for (_, w) in &placed {
                assert!(w.start_angle >= parent.start_angle - EPS);
                assert!(w.end_angle <= parent.end_angle + EPS);
            }
        }
    }

    #[test]
    fn same_seed_reproduces_the_layout() {
        let a = layout_root(9, 1, 0xCAFE);
        let b = layout_root(9, 1, 0xCAFE);
        assert_eq!(a, b);

        let parent = a[0].1;
        let s = child_order_seed(0xCAFE, 'は', 2, &parent);
        assert_eq!(layout_children(4, parent, s), layout_children(4, parent, s));
    }

    #[test]
    fn different_seeds_rotate_differently() {
        let a = layout_root(6, 1, 1);
        let b = layout_root(6, 1, 2);
        assert!((a[0].1.start_angle - b[0].1.start_angle).abs() > EPS);
    }

    #[test]
    fn sibling_wedges_get_independent_child_seeds() {
        let placed = layout_root(4, 1, 99);
        let s0 = child_order_seed(99, 'は', 2, &placed[0].1);
        let s1 = child_order_seed(99, 'は', 2, &placed[1].1);
        assert_ne!(s0, s1);
    }

    #[test]
    fn rings_are_concentric_and_disjoint() {
        let r1 = ring_for_level(1);
        let r2 = ring_for_level(2);
        let r3 = ring_for_level(3);
        assert_eq!(r1.inner_radius, 30.0);
        assert_eq!(r1.outer_radius, 110.0);
        assert!(r2.inner_radius > r1.outer_radius);
        assert!(r3.inner_radius > r2.outer_radius);
    }
}
