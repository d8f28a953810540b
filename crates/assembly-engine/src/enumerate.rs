//! Cartesian product of the active category lists.

use hookreel_model::{Combination, Segment};

use crate::inventory::SegmentInventory;

/// Lazy, restartable iterator over every combination of an inventory.
///
/// Categories advance like an odometer: the last category (call-to-action)
/// varies fastest, so with hooks `[A, B]` and one body and cta the order is
/// `A-C-D`, `B-C-D`.
#[derive(Debug, Clone)]
pub struct Combinations<'a> {
    lists: Vec<&'a [Segment]>,
    indices: Vec<usize>,
    remaining: usize,
    total: usize,
}

impl<'a> Combinations<'a> {
    pub fn new(inventory: &'a SegmentInventory) -> Self {
        let lists: Vec<&[Segment]> = inventory
            .lists()
            .iter()
            .map(|(_, segments)| segments.as_slice())
            .collect();
        let total = total_for(&lists);
        Self {
            indices: vec![0; lists.len()],
            lists,
            remaining: total,
            total,
        }
    }

    /// Size of the full sequence, independent of how far iteration has gone.
    pub fn total(&self) -> usize {
        self.total
    }

    fn advance(&mut self) {
        for pos in (0..self.indices.len()).rev() {
            self.indices[pos] += 1;
            if self.indices[pos] < self.lists[pos].len() {
                return;
            }
            self.indices[pos] = 0;
        }
    }
}

fn total_for(lists: &[&[Segment]]) -> usize {
    if lists.is_empty() {
        return 0;
    }
    lists.iter().map(|l| l.len()).product()
}

impl Iterator for Combinations<'_> {
    type Item = Combination;

    fn next(&mut self) -> Option<Combination> {
        if self.remaining == 0 {
            return None;
        }
        let segments = self
            .lists
            .iter()
            .zip(&self.indices)
            .map(|(list, &idx)| list[idx].clone())
            .collect();
        self.remaining -= 1;
        self.advance();
        Combination::new(segments)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Combinations<'_> {}
