use std::collections::HashSet;

/// Hands out process-unique entity ids. Ids start at 1 and an id is never
/// handed out again while it is live; after the counter wraps, live ids are
/// skipped until [`IdGenerator::release`] frees them.
#[derive(Debug)]
pub struct IdGenerator {
    next: u32,
    live: HashSet<u32>,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            next: 1,
            live: HashSet::new(),
        }
    }

    pub fn next_id(&mut self) -> u32 {
        loop {
            let id = self.next;
            self.next = self.next.checked_add(1).unwrap_or(1);
            if self.live.insert(id) {
                return id;
            }
        }
    }

    /// Marks an id as no longer referenced by anything.
    pub fn release(&mut self, id: u32) {
        self.live.remove(&id);
    }

    pub fn live(&self) -> usize {
        self.live.len()
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic() {
        let mut ids = IdGenerator::new();
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
        assert_eq!(ids.next_id(), 3);
        assert_eq!(ids.live(), 3);
    }

    #[test]
    fn test_wrapped_counter_skips_live_ids() {
        let mut ids = IdGenerator::new();
        let first = ids.next_id();
        let second = ids.next_id();
        ids.release(first);

        ids.next = u32::MAX;
        assert_eq!(ids.next_id(), u32::MAX);
        // zero is never issued; 1 was released, 2 is still live
        assert_eq!(ids.next_id(), first);
        assert_eq!(ids.next_id(), 3);
        assert_ne!(ids.next_id(), second);
    }
}
