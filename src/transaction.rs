//! Per-keystroke transaction record and the space-state machine values.

/// The automatic-space state machine.
///
/// The state is consulted and usually consumed by the next keystroke; any
/// event that does not explicitly carry a state forward drops it back to
/// `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SpaceState {
    /// No automatic space behavior pending.
    #[default]
    None,
    /// A space that a swappable punctuation may swap with.
    Weak,
    /// A space that will be inserted before the next letter.
    Phantom,
    /// A double-space-to-period just fired and may be reverted.
    Double,
    /// A punctuation just swapped with a space and may be reverted.
    SwapPunctuation,
}

/// How urgently the caps state must be recomputed after an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum ShiftUpdate {
    #[default]
    None,
    /// Recompute soon, but batching with later events is fine.
    Later,
    /// Recompute before handling anything else.
    Now,
}

/// What one event did to the editor, accumulated while the event is
/// processed and consumed by the embedder afterwards.
#[derive(Debug)]
pub struct InputTransaction {
    pub timestamp_ms: u64,
    pub space_state_at_start: SpaceState,
    pub shift_state_at_start: crate::word_composer::CapsMode,
    did_auto_correct: bool,
    did_affect_contents: bool,
    requires_update_suggestions: bool,
    shift_update: ShiftUpdate,
}

impl InputTransaction {
    pub fn new(
        timestamp_ms: u64,
        space_state_at_start: SpaceState,
        shift_state_at_start: crate::word_composer::CapsMode,
    ) -> Self {
        Self {
            timestamp_ms,
            space_state_at_start,
            shift_state_at_start,
            did_auto_correct: false,
            did_affect_contents: false,
            requires_update_suggestions: false,
            shift_update: ShiftUpdate::None,
        }
    }

    pub fn set_did_auto_correct(&mut self) {
        self.did_auto_correct = true;
        self.did_affect_contents = true;
    }

    pub fn set_did_affect_contents(&mut self) {
        self.did_affect_contents = true;
    }

    pub fn set_requires_update_suggestions(&mut self) {
        self.requires_update_suggestions = true;
    }

    /// Escalate the shift update; a stronger requirement never downgrades.
    pub fn require_shift_update(&mut self, update: ShiftUpdate) {
        self.shift_update = self.shift_update.max(update);
    }

    pub fn did_auto_correct(&self) -> bool {
        self.did_auto_correct
    }

    pub fn did_affect_contents(&self) -> bool {
        self.did_affect_contents
    }

    pub fn requires_update_suggestions(&self) -> bool {
        self.requires_update_suggestions
    }

    pub fn shift_update(&self) -> ShiftUpdate {
        self.shift_update
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::word_composer::CapsMode;

    #[test]
    fn test_fresh_transaction_is_inert() {
        let tx = InputTransaction::new(0, SpaceState::None, CapsMode::Off);
        assert!(!tx.did_auto_correct());
        assert!(!tx.did_affect_contents());
        assert!(!tx.requires_update_suggestions());
        assert_eq!(tx.shift_update(), ShiftUpdate::None);
    }

    #[test]
    fn test_shift_update_never_downgrades() {
        let mut tx = InputTransaction::new(0, SpaceState::None, CapsMode::Off);
        tx.require_shift_update(ShiftUpdate::Now);
        tx.require_shift_update(ShiftUpdate::Later);
        assert_eq!(tx.shift_update(), ShiftUpdate::Now);
    }

    #[test]
    fn test_auto_correct_implies_contents_changed() {
        let mut tx = InputTransaction::new(0, SpaceState::Weak, CapsMode::Off);
        tx.set_did_auto_correct();
        assert!(tx.did_affect_contents());
        assert_eq!(tx.space_state_at_start, SpaceState::Weak);
    }
}
