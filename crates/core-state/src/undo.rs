//! Grouped, bounded journal of inverse operations.
//!
//! Every mutation appends one entry; a group is a contiguous run of entries
//! sharing a group id, and undo/redo peel or replay one group at a time.
//! Invariants:
//! * group ids are monotonic within the journal;
//! * entries above the applied watermark exist only between an undo and the
//!   next mutation — any new entry truncates them first;
//! * the journal never exceeds [`UNDO_LOG_MAX`] entries; overflow drops the
//!   oldest quarter, rounded down to a group boundary so groups never split.

use core_text::Position;
use std::time::{Duration, Instant};
use tracing::trace;

/// Hard bound on journal entries.
pub const UNDO_LOG_MAX: usize = 10_000;

/// Entries logged within this window of the previous one share a group.
pub const GROUP_WINDOW: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    InsertChar,
    DeleteChar,
    DeleteCharForward,
    InsertRow,
    DeleteRow,
    SplitRow,
    DeleteSelection,
    Paste,
}

impl EditKind {
    /// Structural kinds always open a fresh group.
    pub fn forces_group(self) -> bool {
        matches!(
            self,
            EditKind::InsertRow
                | EditKind::DeleteRow
                | EditKind::SplitRow
                | EditKind::DeleteSelection
                | EditKind::Paste
        )
    }
}

/// One journaled mutation, carrying enough to invert or replay it.
#[derive(Debug, Clone)]
pub struct UndoEntry {
    pub kind: EditKind,
    pub group: u64,
    /// Primary cursor before the edit; group undo restores the first one.
    pub cursor_before: Position,
    /// Target of the edit: the cell for char ops, the join point for a row
    /// merge, the split point for a row split, the range start otherwise.
    pub at: Position,
    /// Cell datum for char ops.
    pub ch: char,
    /// Row payload (row ops) or multi-line text (range ops).
    pub payload: String,
    /// Range end for selection-delete and paste.
    pub end: Position,
}

#[derive(Debug, Default)]
pub struct UndoJournal {
    entries: Vec<UndoEntry>,
    /// Entries `..applied` are in effect; the rest is the redo tail.
    applied: usize,
    current_group: u64,
    last_log: Option<Instant>,
    pending_break: bool,
    in_batch: bool,
}

impl UndoJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    pub fn can_redo(&self) -> bool {
        self.applied < self.entries.len()
    }

    /// Force the next entry into a fresh group.
    pub fn break_group(&mut self) {
        self.pending_break = true;
    }

    /// Open an atomic batch: one fresh group for everything logged until
    /// [`end_batch`](Self::end_batch), regardless of kind or timing.
    pub fn begin_batch(&mut self) {
        self.pending_break = true;
        self.in_batch = true;
    }

    pub fn end_batch(&mut self) {
        if self.in_batch {
            self.in_batch = false;
            self.pending_break = true;
        }
    }

    /// Append an entry, truncating any redo tail first.
    pub fn push(
        &mut self,
        kind: EditKind,
        cursor_before: Position,
        at: Position,
        ch: char,
        payload: String,
        end: Position,
    ) {
        if self.applied < self.entries.len() {
            trace!(
                target: "state.undo",
                dropped = self.entries.len() - self.applied,
                "redo_tail_truncated"
            );
            self.entries.truncate(self.applied);
        }
        if self.entries.len() >= UNDO_LOG_MAX {
            self.trim_oldest_quarter();
        }

        let now = Instant::now();
        let fresh = if self.in_batch {
            self.pending_break
        } else {
            self.pending_break
                || kind.forces_group()
                || self
                    .last_log
                    .is_none_or(|t| now.duration_since(t) > GROUP_WINDOW)
        };
        if fresh {
            self.current_group += 1;
            self.pending_break = false;
        }
        self.last_log = Some(now);

        self.entries.push(UndoEntry {
            kind,
            group: self.current_group,
            cursor_before,
            at,
            ch,
            payload,
            end,
        });
        self.applied = self.entries.len();
        trace!(
            target: "state.undo",
            ?kind,
            group = self.current_group,
            depth = self.entries.len(),
            "journal_push"
        );
    }

    /// Remove the top applied group and hand its entries back in reverse
    /// chronological order, ready for inverse application.
    pub fn peel_group(&mut self) -> Option<Vec<UndoEntry>> {
        if self.applied == 0 {
            return None;
        }
        let group = self.entries[self.applied - 1].group;
        let mut start = self.applied;
        while start > 0 && self.entries[start - 1].group == group {
            start -= 1;
        }
        let peeled: Vec<UndoEntry> = self.entries[start..self.applied]
            .iter()
            .rev()
            .cloned()
            .collect();
        self.applied = start;
        self.pending_break = true;
        trace!(target: "state.undo", group, entries = peeled.len(), "undo_peel");
        Some(peeled)
    }

    /// Advance over the next unapplied group, handing its entries back in
    /// forward order for replay.
    pub fn replay_group(&mut self) -> Option<Vec<UndoEntry>> {
        if self.applied >= self.entries.len() {
            return None;
        }
        let group = self.entries[self.applied].group;
        let mut end = self.applied;
        while end < self.entries.len() && self.entries[end].group == group {
            end += 1;
        }
        let replayed: Vec<UndoEntry> = self.entries[self.applied..end].to_vec();
        self.applied = end;
        self.pending_break = true;
        trace!(target: "state.undo", group, entries = replayed.len(), "redo_replay");
        Some(replayed)
    }

    fn trim_oldest_quarter(&mut self) {
        let mut cut = UNDO_LOG_MAX / 4;
        while cut > 0 && cut < self.entries.len()
            && self.entries[cut].group == self.entries[cut - 1].group
        {
            cut -= 1;
        }
        if cut == 0 {
            // One pathological group spans the whole quarter; drop it anyway.
            cut = UNDO_LOG_MAX / 4;
        }
        self.entries.drain(..cut);
        self.applied = self.applied.saturating_sub(cut);
        trace!(target: "state.undo", cut, depth = self.entries.len(), "journal_trimmed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_kind(j: &mut UndoJournal, kind: EditKind) {
        j.push(
            kind,
            Position::origin(),
            Position::origin(),
            'x',
            String::new(),
            Position::origin(),
        );
    }

    #[test]
    fn rapid_char_edits_share_a_group() {
        let mut j = UndoJournal::new();
        push_kind(&mut j, EditKind::InsertChar);
        push_kind(&mut j, EditKind::InsertChar);
        push_kind(&mut j, EditKind::InsertChar);
        let g = j.peel_group().expect("one group");
        assert_eq!(g.len(), 3);
        assert!(!j.can_undo());
    }

    #[test]
    fn structural_kinds_force_groups() {
        let mut j = UndoJournal::new();
        push_kind(&mut j, EditKind::InsertChar);
        push_kind(&mut j, EditKind::SplitRow);
        push_kind(&mut j, EditKind::InsertChar);
        // The insert after the split joins the split's group (same window).
        assert_eq!(j.peel_group().expect("top group").len(), 2);
        assert_eq!(j.peel_group().expect("first group").len(), 1);
    }

    #[test]
    fn batch_is_atomic_despite_structural_kinds() {
        let mut j = UndoJournal::new();
        j.begin_batch();
        push_kind(&mut j, EditKind::SplitRow);
        push_kind(&mut j, EditKind::InsertChar);
        push_kind(&mut j, EditKind::SplitRow);
        j.end_batch();
        assert_eq!(j.peel_group().expect("batch group").len(), 3);
    }

    #[test]
    fn edit_after_undo_truncates_redo_tail() {
        let mut j = UndoJournal::new();
        push_kind(&mut j, EditKind::InsertChar);
        j.break_group();
        push_kind(&mut j, EditKind::InsertChar);
        assert!(j.peel_group().is_some());
        assert!(j.can_redo());
        push_kind(&mut j, EditKind::InsertChar);
        assert!(!j.can_redo());
        assert_eq!(j.len(), 2);
    }

    #[test]
    fn peel_and_replay_round_trip() {
        let mut j = UndoJournal::new();
        push_kind(&mut j, EditKind::InsertChar);
        push_kind(&mut j, EditKind::InsertChar);
        let peeled = j.peel_group().expect("peel");
        assert_eq!(peeled.len(), 2);
        let replayed = j.replay_group().expect("replay");
        assert_eq!(replayed.len(), 2);
        assert!(j.can_undo());
        assert!(!j.can_redo());
    }

    #[test]
    fn group_ids_stay_monotonic() {
        let mut j = UndoJournal::new();
        push_kind(&mut j, EditKind::InsertChar);
        j.break_group();
        push_kind(&mut j, EditKind::InsertChar);
        j.peel_group();
        push_kind(&mut j, EditKind::InsertChar);
        let groups: Vec<u64> = j.entries.iter().map(|e| e.group).collect();
        for pair in groups.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn overflow_drops_oldest_quarter_on_group_boundary() {
        let mut j = UndoJournal::new();
        for _ in 0..UNDO_LOG_MAX {
            push_kind(&mut j, EditKind::InsertChar);
            j.break_group();
        }
        assert_eq!(j.len(), UNDO_LOG_MAX);
        push_kind(&mut j, EditKind::InsertChar);
        assert_eq!(j.len(), UNDO_LOG_MAX - UNDO_LOG_MAX / 4 + 1);
        assert!(j.can_undo());
    }
}
