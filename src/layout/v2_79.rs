// v2_79.rs — Struct layouts for host 2.79.x, LP64.
//
// Hand-maintained: 2.79 predates the typed handler hierarchy, so the header
// layout the generator expects does not exist there. One `wmEventHandler`
// struct carries the keymap, operator, UI and dropbox slots, and its kind is
// whichever slot is set. A handler with both `op` and `ui_handle` set is an
// operator handler: the attached operator names it. Trailing padding is left
// out.

use super::{
    chars, embedded, int, ptr, HandlerKindSource, HandlerSchema, LayoutSet, StructLayout, LINK,
    LIST_BASE, OPERATOR, WINDOW,
};
use crate::version::VersionRange;

pub const HANDLER: HandlerSchema = HandlerSchema {
    base: "wmEventHandler",
    kind: HandlerKindSource::PointerPresence {
        ui: "ui_handle",
        op: "op",
        dropbox: "dropboxes",
        keymap: "keymap",
    },
    op_struct: "wmEventHandler",
    op_field: "op",
    area_field: "op_area",
    region_field: "op_region",
};

pub static LAYOUT: LayoutSet = LayoutSet {
    name: "v2_79",
    versions: VersionRange::minor_series(2, 79),
    structs: STRUCTS,
    enums: &[],
    handler: HANDLER,
};

const STRUCTS: &[StructLayout] = &[
    StructLayout {
        name: LINK,
        size: 16,
        fields: &[ptr("next", 0), ptr("prev", 8)],
    },
    StructLayout {
        name: LIST_BASE,
        size: 16,
        fields: &[ptr("first", 0), ptr("last", 8)],
    },
    StructLayout {
        name: WINDOW,
        size: 288,
        fields: &[
            ptr("next", 0),
            ptr("prev", 8),
            ptr("ghostwin", 16),
            ptr("screen", 24),
            ptr("newscreen", 32),
            chars("screenname", 40, 64),
            int("posx", 104, 2),
            int("posy", 106, 2),
            int("sizex", 108, 2),
            int("sizey", 110, 2),
            int("windowstate", 112, 2),
            int("monitor", 114, 2),
            int("active", 116, 2),
            int("cursor", 118, 2),
            int("lastcursor", 120, 2),
            int("modalcursor", 122, 2),
            int("grabcursor", 124, 2),
            int("addmousemove", 126, 2),
            int("multisamples", 128, 2),
            int("winid", 136, 4),
            int("lock_pie_event", 140, 2),
            int("last_pie_event", 142, 2),
            ptr("eventstate", 144),
            ptr("curswin", 152),
            ptr("tweak", 160),
            ptr("ime_data", 168),
            int("drawmethod", 176, 4),
            int("drawfail", 180, 4),
            embedded("drawdata", 184, 16, LIST_BASE),
            embedded("queue", 200, 16, LIST_BASE),
            embedded("handlers", 216, 16, LIST_BASE),
            embedded("modalhandlers", 232, 16, LIST_BASE),
            embedded("subwindows", 248, 16, LIST_BASE),
            embedded("gesture", 264, 16, LIST_BASE),
            ptr("stereo3d_format", 280),
        ],
    },
    StructLayout {
        name: OPERATOR,
        size: 168,
        fields: &[
            ptr("next", 0),
            ptr("prev", 8),
            chars("idname", 16, 64),
            ptr("properties", 80),
            ptr("type", 88),
            ptr("customdata", 96),
            ptr("py_instance", 104),
            ptr("ptr", 112),
            ptr("reports", 120),
            embedded("macro", 128, 16, LIST_BASE),
            ptr("opm", 144),
            ptr("layout", 152),
            int("flag", 160, 2),
        ],
    },
    StructLayout {
        name: "wmEventHandler",
        size: 136,
        fields: &[
            ptr("next", 0),
            ptr("prev", 8),
            int("type", 16, 1),
            int("flag", 17, 1),
            ptr("keymap", 24),
            ptr("bblocal", 32),
            ptr("bbwin", 40),
            ptr("op", 48),
            ptr("op_area", 56),
            ptr("op_region", 64),
            int("op_region_type", 72, 2),
            ptr("ui_handle", 80),
            ptr("ui_remove", 88),
            ptr("ui_userdata", 96),
            ptr("ui_area", 104),
            ptr("ui_region", 112),
            ptr("ui_menu", 120),
            ptr("dropboxes", 128),
        ],
    },
];
