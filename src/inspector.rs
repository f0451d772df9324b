// inspector.rs — Read-only snapshot of a window's modal handler list.
//
// Each call walks the live list from `first`; nothing is cached, since the
// host may free or reorder handlers between callbacks. Records are stale as
// soon as the callback that produced them returns.

use crate::layout::{HandlerKindSource, LayoutSet, FIELD_FIRST, FIELD_IDNAME, FIELD_MODAL_HANDLERS, FIELD_NEXT, OPERATOR, WINDOW};
use crate::memory::{Address, TypedView};
use std::fmt;

/// What kind of handler a list entry is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Operator,
    Ui,
    Gizmo,
    Dropbox,
    Keymap,
    Unknown,
}

impl HandlerKind {
    /// Map an `eWM_EventHandlerType` item name to a kind.
    fn from_enum_item(item: &str) -> Self {
        match item {
            "WM_HANDLER_TYPE_OP" => HandlerKind::Operator,
            "WM_HANDLER_TYPE_UI" => HandlerKind::Ui,
            "WM_HANDLER_TYPE_GIZMO" => HandlerKind::Gizmo,
            "WM_HANDLER_TYPE_DROPBOX" => HandlerKind::Dropbox,
            "WM_HANDLER_TYPE_KEYMAP" => HandlerKind::Keymap,
            _ => HandlerKind::Unknown,
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HandlerKind::Operator => "OPERATOR",
            HandlerKind::Ui => "UI",
            HandlerKind::Gizmo => "GIZMO",
            HandlerKind::Dropbox => "DROPBOX",
            HandlerKind::Keymap => "KEYMAP",
            HandlerKind::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// One entry of a window's modal handler list, as seen right now.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandlerRecord {
    pub address: Address,
    pub kind: HandlerKind,
    /// Dotted idname of the attached operator (`wm.sk_screencast_keys`).
    pub operator_idname: Option<String>,
    pub area: Address,
    pub region: Address,
}

/// Convert a C operator idname (`WM_OT_sk_screencast_keys`) to the dotted
/// form add-ons use (`wm.sk_screencast_keys`). Names without `_OT_` are
/// returned unchanged.
pub fn dotted_idname(raw: &str) -> String {
    match raw.split_once("_OT_") {
        Some((prefix, name)) => format!("{}.{}", prefix.to_lowercase(), name),
        None => raw.to_string(),
    }
}

/// Lazily walk the modal handlers of `window`.
///
/// # Safety
/// `window` must be a live host window for the duration of the walk.
pub unsafe fn inspect(set: &'static LayoutSet, window: Address) -> Handlers {
    let cur = TypedView::new(set, WINDOW, window)
        .and_then(|w| w.embedded(FIELD_MODAL_HANDLERS))
        .map_or(Address::NULL, |list| list.ptr(FIELD_FIRST));
    Handlers { set, cur }
}

pub struct Handlers {
    set: &'static LayoutSet,
    cur: Address,
}

impl Iterator for Handlers {
    type Item = HandlerRecord;

    fn next(&mut self) -> Option<HandlerRecord> {
        // SAFETY: every handler reachable from a live window's list is live.
        let head = unsafe { TypedView::new(self.set, self.set.handler.base, self.cur) }?;
        self.cur = head.ptr(FIELD_NEXT);
        Some(classify(&head))
    }
}

fn classify(head: &TypedView) -> HandlerRecord {
    let set = head.layout_set();
    let schema = &set.handler;

    let kind = match schema.kind {
        HandlerKindSource::TypeField { field, enum_name } => set
            .enum_layout(enum_name)
            .and_then(|e| e.item(head.int(field)))
            .map_or(HandlerKind::Unknown, HandlerKind::from_enum_item),
        HandlerKindSource::PointerPresence { ui, op, dropbox, keymap } => {
            if !head.ptr(op).is_null() {
                HandlerKind::Operator
            } else if !head.ptr(ui).is_null() {
                HandlerKind::Ui
            } else if !head.ptr(dropbox).is_null() {
                HandlerKind::Dropbox
            } else if !head.ptr(keymap).is_null() {
                HandlerKind::Keymap
            } else {
                HandlerKind::Unknown
            }
        }
    };

    let mut record = HandlerRecord {
        address: head.address(),
        kind,
        operator_idname: None,
        area: Address::NULL,
        region: Address::NULL,
    };
    if kind != HandlerKind::Operator {
        return record;
    }

    let Some(op_handler) = head.cast(schema.op_struct) else {
        record.kind = HandlerKind::Unknown;
        return record;
    };
    record.area = op_handler.ptr(schema.area_field);
    record.region = op_handler.ptr(schema.region_field);

    // SAFETY: an operator handler's `op` points at its live operator.
    let op = unsafe { TypedView::new(set, OPERATOR, op_handler.ptr(schema.op_field)) };
    match op.map(|o| o.chars(FIELD_IDNAME)).filter(|s| !s.is_empty()) {
        Some(raw) => record.operator_idname = Some(dotted_idname(&raw)),
        None => record.kind = HandlerKind::Unknown,
    }
    record
}
