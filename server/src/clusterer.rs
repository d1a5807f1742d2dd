//! Groups entities into contiguous x bands ("groupings").
//!
//! Entities closer than the gap threshold share a grouping; a larger gap
//! starts a new one. Groupings come out sorted by x and never overlap, and
//! every input item lands in exactly one of them.

use rand::Rng;

#[derive(Debug, Clone, PartialEq)]
pub struct Grouping<T> {
    pub x0: f32,
    pub x1: f32,
    pub members: Vec<T>,
}

impl<T> Grouping<T> {
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }
}

pub fn groupings<T>(mut items: Vec<(f32, T)>, gap: f32) -> Vec<Grouping<T>> {
    items.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut result: Vec<Grouping<T>> = Vec::new();
    for (x, item) in items {
        match result.last_mut() {
            Some(current) if x - current.x1 <= gap => {
                current.x1 = x;
                current.members.push(item);
            }
            _ => result.push(Grouping {
                x0: x,
                x1: x,
                members: vec![item],
            }),
        }
    }
    result
}

/// Where to put a new player so it does not land inside an existing
/// grouping: one gap to the right of the rightmost one.
pub fn new_player_x<T>(groupings: &[Grouping<T>], gap: f32) -> f32 {
    groupings.last().map_or(0.0, |last| last.x1 + gap)
}

/// Random x inside a grouping, widened by `padding` on both sides.
pub fn enemy_x_in_grouping<T, R: Rng>(grouping: &Grouping<T>, padding: f32, rng: &mut R) -> f32 {
    let lo = grouping.x0 - padding;
    let hi = grouping.x1 + padding;
    if hi > lo {
        rng.gen_range(lo..hi)
    } else {
        lo
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_split_on_gap() {
        let items = vec![(0.0, 'a'), (2500.0, 'c'), (100.0, 'b'), (2600.0, 'd')];
        let result = groupings(items, 1950.0);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].members, vec!['a', 'b']);
        assert_eq!((result[0].x0, result[0].x1), (0.0, 100.0));
        assert_eq!(result[1].members, vec!['c', 'd']);
    }

    #[test]
    fn test_new_player_position() {
        let empty: Vec<Grouping<u32>> = Vec::new();
        assert_eq!(new_player_x(&empty, 1950.0), 0.0);

        let result = groupings(vec![(10.0, 1), (400.0, 2)], 1950.0);
        assert_eq!(new_player_x(&result, 1950.0), 2350.0);
    }

    #[test]
    fn test_enemy_x_stays_in_padded_band() {
        let mut rng = StdRng::seed_from_u64(1);
        let grouping = Grouping {
            x0: 100.0,
            x1: 300.0,
            members: vec![()],
        };
        for _ in 0..100 {
            let x = enemy_x_in_grouping(&grouping, 50.0, &mut rng);
            assert!((50.0..350.0).contains(&x));
        }
    }

    #[test]
    fn test_groupings_partition_random_input() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let count = rng.gen_range(0..120);
            let gap = rng.gen_range(10.0..500.0);
            let items: Vec<(f32, usize)> = (0..count)
                .map(|i| (rng.gen_range(-10_000.0..10_000.0), i))
                .collect();
            let xs: Vec<f32> = items.iter().map(|(x, _)| *x).collect();

            let result = groupings(items, gap);

            let mut seen: Vec<usize> = result.iter().flat_map(|g| g.members.clone()).collect();
            seen.sort();
            assert_eq!(seen, (0..count).collect::<Vec<_>>());

            for pair in result.windows(2) {
                assert!(pair[0].x1 < pair[1].x0);
                assert!(pair[1].x0 - pair[0].x1 > gap);
            }
            for grouping in &result {
                for member in &grouping.members {
                    assert!(xs[*member] >= grouping.x0 && xs[*member] <= grouping.x1);
                }
            }
        }
    }
}
