// reorder.rs — Move our own modal handlers to the front of a window's list.
//
// The host dispatches an event front to back and stops at the first handler
// that consumes it. Splicing our handlers to the head gives the overlay first
// look at every event, including ones another modal operator would swallow.
//
// Read and mutation happen in the same call, so the host never sees a list
// that is only partly reordered.

use crate::inspector::{self, HandlerKind, HandlerRecord};
use crate::layout::{LayoutSet, FIELD_MODAL_HANDLERS, WINDOW};
use crate::listbase::IntrusiveList;
use crate::memory::{Address, TypedView};
use tracing::{debug, trace};

/// What a reorder pass did. Informational only; there is no failure mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReorderOutcome {
    /// Our handlers were already in front, or there were none.
    Unchanged,
    /// A UI handler is present; the list was left alone.
    AbortedUiHandler,
    Reordered { moved: usize },
}

/// The host crashes when a UI handler's position changes under it (seen when
/// switching an area's space type while the overlay runs). Any UI handler in
/// the list means hands off.
fn ui_handler_present(records: &[HandlerRecord]) -> bool {
    records.iter().any(|r| r.kind == HandlerKind::Ui)
}

/// Move every handler whose operator is `own_idname` to the head of the
/// window's modal handler list, keeping the relative order of both our
/// handlers and everyone else's.
///
/// # Safety
/// `window` must be a live host window, and the host must not touch its
/// handler list until this returns.
pub unsafe fn bring_to_front(set: &'static LayoutSet, window: Address, own_idname: &str) -> ReorderOutcome {
    let records: Vec<HandlerRecord> = inspector::inspect(set, window).collect();

    if ui_handler_present(&records) {
        debug!(window = %window, "UI handler present, leaving modal handlers as they are");
        return ReorderOutcome::AbortedUiHandler;
    }

    let ours: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.operator_idname.as_deref() == Some(own_idname))
        .map(|(i, _)| i)
        .collect();
    if ours.iter().enumerate().all(|(target, &index)| target == index) {
        return ReorderOutcome::Unchanged;
    }

    let Some(list) = TypedView::new(set, WINDOW, window)
        .and_then(|w| w.embedded(FIELD_MODAL_HANDLERS))
        .and_then(IntrusiveList::new)
    else {
        return ReorderOutcome::Unchanged;
    };

    // Moving the handler at `index` to `target < index` shifts only the
    // handlers in between, so later indices of ours still name the same
    // handler in the live list.
    let mut moved = 0;
    for (target, &index) in ours.iter().enumerate() {
        if index == target {
            continue;
        }
        let Some(node) = list.find(index) else { break };
        let prev = match target {
            0 => None,
            t => match list.find(t - 1) {
                Some(p) => Some(p),
                None => break,
            },
        };
        trace!(from = index, to = target, handler = %node, "moving modal handler");
        list.remove(node);
        list.insert_after(prev, node);
        moved += 1;
    }

    debug!(window = %window, moved, "modal handlers reordered");
    ReorderOutcome::Reordered { moved }
}
