//! One-dimensional interval tree over entity x extents.
//!
//! Rebuilt from scratch every tick. Entries are sorted by their low end and
//! laid out as an implicit balanced tree over the sorted array (the middle
//! of every range is that range's root); each root also records the highest
//! high end found in its range so whole subtrees can be skipped.

/// One indexed extent. Points use `min == max`.
#[derive(Debug, Clone)]
struct Entry<T> {
    min: f32,
    max: f32,
    item: T,
}

#[derive(Debug, Clone)]
pub struct IntervalTree<T> {
    entries: Vec<Entry<T>>,
    /// `subtree_max[mid]` is the largest `max` in the range rooted at `mid`.
    subtree_max: Vec<f32>,
}

/// Collects entries before the tree is built.
#[derive(Debug)]
pub struct IntervalTreeBuilder<T> {
    entries: Vec<Entry<T>>,
}

impl<T> IntervalTreeBuilder<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn insert(&mut self, min: f32, max: f32, item: T) {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        self.entries.push(Entry { min, max, item });
    }

    pub fn insert_point(&mut self, x: f32, item: T) {
        self.insert(x, x, item);
    }

    pub fn build(mut self) -> IntervalTree<T> {
        self.entries.sort_by(|a, b| a.min.total_cmp(&b.min));
        let mut subtree_max = vec![f32::NEG_INFINITY; self.entries.len()];
        fill_max(&self.entries, &mut subtree_max, 0, self.entries.len());
        IntervalTree {
            entries: self.entries,
            subtree_max,
        }
    }
}

fn fill_max<T>(entries: &[Entry<T>], subtree_max: &mut [f32], lo: usize, hi: usize) -> f32 {
    if lo >= hi {
        return f32::NEG_INFINITY;
    }
    let mid = lo + (hi - lo) / 2;
    let left = fill_max(entries, subtree_max, lo, mid);
    let right = fill_max(entries, subtree_max, mid + 1, hi);
    let max = entries[mid].max.max(left).max(right);
    subtree_max[mid] = max;
    max
}

impl<T> IntervalTree<T> {
    pub fn builder() -> IntervalTreeBuilder<T> {
        IntervalTreeBuilder::with_capacity(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every item whose extent intersects `[min, max]` (inclusive).
    pub fn search(&self, min: f32, max: f32) -> Vec<&T> {
        let mut found = Vec::new();
        self.visit(min, max, |item| found.push(item));
        found
    }

    pub fn visit<'a, F>(&'a self, min: f32, max: f32, mut visitor: F)
    where
        F: FnMut(&'a T),
    {
        self.visit_range(0, self.entries.len(), min, max, &mut visitor);
    }

    fn visit_range<'a, F>(&'a self, lo: usize, hi: usize, min: f32, max: f32, visitor: &mut F)
    where
        F: FnMut(&'a T),
    {
        if lo >= hi {
            return;
        }
        let mid = lo + (hi - lo) / 2;
        if self.subtree_max[mid] < min {
            return;
        }
        self.visit_range(lo, mid, min, max, visitor);
        let entry = &self.entries[mid];
        if entry.min > max {
            // everything to the right starts even later
            return;
        }
        if entry.max >= min {
            visitor(&entry.item);
        }
        self.visit_range(mid + 1, hi, min, max, visitor);
    }
}
