use std::future::Future;

use tracing::debug;

// ---------------------------------------------------------------------------
// Inline-edit state machine
// ---------------------------------------------------------------------------
//
// Per item:  Viewing -> Editing -> Saving -> Viewing   (save succeeded)
//                          ^          |
//                          +----------+                (save failed, draft kept)
//
// An item with no slot here is in its viewing state.  The controller knows
// nothing about HTTP: `save` takes the submit action as a callback, so the
// host view decides what a save means and tests can hand in a stub.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Editing,
    Saving,
}

#[derive(Debug, Clone)]
struct Slot {
    id: i64,
    draft: String,
    state: SlotState,
}

/// Outcome of a failed [`EditSessions::save`].
#[derive(Debug)]
pub enum SaveError<E> {
    /// No open edit for the item, or its save is already in flight.
    NotEditing,
    /// The submit callback failed; the slot is back in editing state with
    /// the draft intact so the user can retry by hand.
    Failed(E),
}

/// Open inline edits for one list of items, keyed by item id.
///
/// `max_open` bounds how many edit boxes may be open at once.  At capacity,
/// beginning a new edit silently closes the oldest open one — with
/// `max_open = 1` this is the classic single-edit-slot behavior where
/// starting an edit anywhere closes the previous box.
#[derive(Debug)]
pub struct EditSessions {
    /// Insertion order doubles as age for capacity eviction.
    slots: Vec<Slot>,
    max_open: usize,
}

impl EditSessions {
    pub fn new(max_open: usize) -> Self {
        Self {
            slots: Vec::new(),
            max_open: max_open.max(1),
        }
    }

    /// Open an edit box for `id`, seeding the draft with the item's current
    /// text.  The caller is responsible for the `can_modify` check.
    /// Re-opening an already-open item keeps its existing draft.
    pub fn begin(&mut self, id: i64, current_text: &str) {
        if self.slot(id).is_some() {
            return;
        }
        while self.slots.len() >= self.max_open {
            let evicted = self.slots.remove(0);
            debug!("Closing edit of item {} to open item {}", evicted.id, id);
        }
        self.slots.push(Slot {
            id,
            draft: current_text.to_string(),
            state: SlotState::Editing,
        });
    }

    /// Replace the draft text.  Ignored unless the item is in editing state.
    pub fn update_draft(&mut self, id: i64, text: String) {
        if let Some(slot) = self.slot_mut(id) {
            if slot.state == SlotState::Editing {
                slot.draft = text;
            }
        }
    }

    /// Close the edit box and discard the draft.  No network call is made;
    /// a save already in flight cannot be cancelled.
    pub fn cancel(&mut self, id: i64) {
        if let Some(pos) = self
            .slots
            .iter()
            .position(|s| s.id == id && s.state == SlotState::Editing)
        {
            self.slots.remove(pos);
        }
    }

    /// Submit the draft through `submit`.
    ///
    /// While the callback runs the slot is in saving state, which makes a
    /// second `save` for the same item fail with [`SaveError::NotEditing`] —
    /// that is what disables the save trigger until the first attempt has
    /// settled.  Success closes the slot; failure returns it to editing with
    /// the draft untouched.
    pub async fn save<E, F, Fut>(&mut self, id: i64, submit: F) -> Result<(), SaveError<E>>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        let draft = self.begin_saving(id).ok_or(SaveError::NotEditing)?;

        match submit(draft).await {
            Ok(()) => {
                self.close(id);
                Ok(())
            }
            Err(e) => {
                self.saving_failed(id);
                Err(SaveError::Failed(e))
            }
        }
    }

    /// Current draft text, for any open slot.
    pub fn draft(&self, id: i64) -> Option<&str> {
        self.slot(id).map(|s| s.draft.as_str())
    }

    /// Whether the item has an open edit box (editing or saving).
    pub fn is_open(&self, id: i64) -> bool {
        self.slot(id).is_some()
    }

    /// Whether the item's save is currently in flight.
    pub fn is_saving(&self, id: i64) -> bool {
        matches!(self.slot(id), Some(s) if s.state == SlotState::Saving)
    }

    // -- transitions ----------------------------------------------------------

    fn begin_saving(&mut self, id: i64) -> Option<String> {
        let slot = self.slot_mut(id)?;
        if slot.state != SlotState::Editing {
            return None;
        }
        slot.state = SlotState::Saving;
        Some(slot.draft.clone())
    }

    fn saving_failed(&mut self, id: i64) {
        if let Some(slot) = self.slot_mut(id) {
            slot.state = SlotState::Editing;
        }
    }

    fn close(&mut self, id: i64) {
        self.slots.retain(|s| s.id != id);
    }

    fn slot(&self, id: i64) -> Option<&Slot> {
        self.slots.iter().find(|s| s.id == id)
    }

    fn slot_mut(&mut self, id: i64) -> Option<&mut Slot> {
        self.slots.iter_mut().find(|s| s.id == id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn begin_seeds_draft_with_current_text() {
        let mut edits = EditSessions::new(1);
        edits.begin(9, "original");
        assert_eq!(edits.draft(9), Some("original"));
        assert!(edits.is_open(9));
        assert!(!edits.is_saving(9));
    }

    #[test]
    fn begin_then_cancel_discards_draft_without_side_effects() {
        let mut edits = EditSessions::new(1);
        edits.begin(9, "original");
        edits.update_draft(9, "changed".into());
        edits.cancel(9);
        assert!(!edits.is_open(9));
        assert_eq!(edits.draft(9), None);
        // No submit callback exists to be called here: cancel is local only.
    }

    #[test]
    fn update_draft_on_unopened_item_is_ignored() {
        let mut edits = EditSessions::new(1);
        edits.update_draft(9, "x".into());
        assert!(!edits.is_open(9));
    }

    #[test]
    fn single_slot_begin_closes_previous_edit() {
        let mut edits = EditSessions::new(1);
        edits.begin(1, "a");
        edits.begin(2, "b");
        assert!(!edits.is_open(1));
        assert_eq!(edits.draft(2), Some("b"));
    }

    #[test]
    fn larger_capacity_keeps_concurrent_edits_and_evicts_oldest() {
        let mut edits = EditSessions::new(2);
        edits.begin(1, "a");
        edits.begin(2, "b");
        assert!(edits.is_open(1) && edits.is_open(2));

        edits.begin(3, "c");
        assert!(!edits.is_open(1), "oldest slot must be evicted");
        assert!(edits.is_open(2) && edits.is_open(3));
    }

    #[test]
    fn reopening_an_open_item_keeps_the_draft() {
        let mut edits = EditSessions::new(1);
        edits.begin(9, "original");
        edits.update_draft(9, "half-typed".into());
        edits.begin(9, "original");
        assert_eq!(edits.draft(9), Some("half-typed"));
    }

    #[tokio::test]
    async fn successful_save_submits_draft_and_closes_slot() {
        let mut edits = EditSessions::new(1);
        edits.begin(9, "original");
        edits.update_draft(9, "X".into());

        let submitted = std::sync::Mutex::new(String::new());
        let result = edits
            .save(9, |draft| {
                *submitted.lock().unwrap() = draft;
                async { Ok::<(), String>(()) }
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(*submitted.lock().unwrap(), "X");
        assert!(!edits.is_open(9), "slot must close on success");
    }

    #[tokio::test]
    async fn failed_save_keeps_slot_editing_with_draft_intact() {
        let mut edits = EditSessions::new(1);
        edits.begin(9, "original");
        edits.update_draft(9, "X".into());

        let result = edits
            .save(9, |_draft| async { Err::<(), _>("connection reset") })
            .await;

        assert!(matches!(result, Err(SaveError::Failed("connection reset"))));
        assert!(edits.is_open(9));
        assert!(!edits.is_saving(9), "slot must fall back to editing");
        assert_eq!(edits.draft(9), Some("X"), "failed draft is retained");
    }

    #[tokio::test]
    async fn save_without_an_open_slot_is_rejected() {
        let mut edits = EditSessions::new(1);
        let calls = AtomicUsize::new(0);

        let result = edits
            .save(9, |_draft| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<(), String>(()) }
            })
            .await;

        assert!(matches!(result, Err(SaveError::NotEditing)));
        assert_eq!(calls.load(Ordering::SeqCst), 0, "submit must not run");
    }

    #[test]
    fn save_is_not_reentrant_while_in_flight() {
        let mut edits = EditSessions::new(1);
        edits.begin(9, "original");

        // First transition claims the slot...
        assert_eq!(edits.begin_saving(9), Some("original".to_string()));
        // ...so a save triggered again before it settles is refused.
        assert_eq!(edits.begin_saving(9), None);
        assert!(edits.is_saving(9));

        // Settling the failure re-arms the trigger.
        edits.saving_failed(9);
        assert_eq!(edits.begin_saving(9), Some("original".to_string()));
    }

    #[test]
    fn cancel_does_not_touch_a_save_in_flight() {
        let mut edits = EditSessions::new(1);
        edits.begin(9, "original");
        edits.begin_saving(9);

        edits.cancel(9);
        assert!(edits.is_open(9), "in-flight save cannot be cancelled");
        assert!(edits.is_saving(9));
    }
}
