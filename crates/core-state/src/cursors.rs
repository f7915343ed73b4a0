//! Secondary-cursor storage and deduplication.
//!
//! The primary cursor lives on the buffer; this set holds the secondaries
//! and the flags governing overlap and movement-following. Dedup order is
//! fixed: secondaries coincident with the primary go first (unless overlap
//! is allowed, in which case exactly one survives), then the remainder is
//! sorted and adjacent duplicates collapse.

use crate::rebase::{self, Delta};
use core_text::Position;
use smallvec::SmallVec;

#[derive(Debug, Default)]
pub struct CursorSet {
    secondaries: SmallVec<[Position; 4]>,
    /// When set, one secondary may share the primary's position.
    pub allow_overlap: bool,
    /// When set, plain movement drags secondaries along with the primary.
    pub follow_primary: bool,
}

impl CursorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.secondaries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.secondaries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Position> + '_ {
        self.secondaries.iter().copied()
    }

    /// Add a secondary. Rejects an exact duplicate so toggling is cheap for
    /// callers; batch dedup still runs after edits.
    pub fn add(&mut self, pos: Position) -> bool {
        if self.secondaries.contains(&pos) {
            return false;
        }
        self.secondaries.push(pos);
        true
    }

    /// Remove a secondary at exactly `pos`; returns whether one was there.
    pub fn remove_at(&mut self, pos: Position) -> bool {
        let before = self.secondaries.len();
        self.secondaries.retain(|p| *p != pos);
        before != self.secondaries.len()
    }

    pub fn clear(&mut self) {
        self.secondaries.clear();
    }

    /// All positions with the primary first.
    pub fn positions_with(&self, primary: Position) -> Vec<Position> {
        let mut all = Vec::with_capacity(self.secondaries.len() + 1);
        all.push(primary);
        all.extend(self.secondaries.iter().copied());
        all
    }

    pub fn set_secondaries(&mut self, positions: &[Position]) {
        self.secondaries.clear();
        self.secondaries.extend_from_slice(positions);
    }

    /// Rebase every secondary through one primitive delta.
    pub fn adjust(&mut self, delta: &Delta) {
        for pos in &mut self.secondaries {
            *pos = rebase::transform(*pos, delta);
        }
    }

    /// Drop primary-coincident secondaries (keeping one when overlap is
    /// allowed), then sort and collapse duplicates.
    pub fn dedup(&mut self, primary: Position) {
        let allow_overlap = self.allow_overlap;
        let mut kept_overlap = false;
        self.secondaries.retain(|p| {
            if *p == primary {
                if allow_overlap && !kept_overlap {
                    kept_overlap = true;
                    return true;
                }
                return false;
            }
            true
        });
        self.secondaries.sort();
        self.secondaries.dedup();
    }
}
