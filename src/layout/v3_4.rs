// v3_4.rs — Struct layouts for host 3.4.x, LP64.
//
// Generated by `gen-layout --tag v3.4.0`. Offsets come from the tagged headers:
//   source/blender/makesdna/DNA_listBase.h
//   source/blender/makesdna/DNA_screen_types.h
//   source/blender/makesdna/DNA_windowmanager_types.h
//   source/blender/windowmanager/wm_event_system.h

use super::{chars, embedded, int, ptr, EnumLayout, HandlerKindSource, HandlerSchema, LayoutSet, StructLayout, LINK, LIST_BASE, OPERATOR, WINDOW};
use crate::version::VersionRange;

pub const HANDLER: HandlerSchema = HandlerSchema {
    base: "wmEventHandler",
    kind: HandlerKindSource::TypeField {
        field: "type",
        enum_name: "eWM_EventHandlerType",
    },
    op_struct: "wmEventHandler_Op",
    op_field: "op",
    area_field: "context_area",
    region_field: "context_region",
};

pub static LAYOUT: LayoutSet = LayoutSet {
    name: "v3_4",
    versions: VersionRange::minor_series(3, 4),
    structs: STRUCTS,
    enums: ENUMS,
    handler: HANDLER,
};

const ENUMS: &[EnumLayout] = &[
    EnumLayout {
        name: "eWM_EventHandlerType",
        items: &[
            ("WM_HANDLER_TYPE_GIZMO", 1),
            ("WM_HANDLER_TYPE_UI", 2),
            ("WM_HANDLER_TYPE_OP", 3),
            ("WM_HANDLER_TYPE_DROPBOX", 4),
            ("WM_HANDLER_TYPE_KEYMAP", 5),
        ],
    },
];

const STRUCTS: &[StructLayout] = &[
    // DNA_listBase.h
    StructLayout {
        name: LINK,
        size: 16,
        fields: &[
            ptr("next", 0),
            ptr("prev", 8),
        ],
    },
    StructLayout {
        name: LIST_BASE,
        size: 16,
        fields: &[
            ptr("first", 0),
            ptr("last", 8),
        ],
    },
    // DNA_screen_types.h
    StructLayout {
        name: "ScrAreaMap",
        size: 48,
        fields: &[
            embedded("vertbase", 0, 16, LIST_BASE),
            embedded("edgebase", 16, 16, LIST_BASE),
            embedded("areabase", 32, 16, LIST_BASE),
        ],
    },
    // DNA_windowmanager_types.h
    StructLayout {
        name: WINDOW,
        size: 344,
        fields: &[
            ptr("next", 0),
            ptr("prev", 8),
            ptr("ghostwin", 16),
            ptr("gpuctx", 24),
            ptr("parent", 32),
            ptr("scene", 40),
            ptr("new_scene", 48),
            chars("view_layer_name", 56, 64),
            ptr("unpinned_scene", 120),
            ptr("workspace_hook", 128),
            embedded("global_areas", 136, 48, "ScrAreaMap"),
            ptr("screen", 184),
            int("winid", 192, 4),
            int("posx", 196, 2),
            int("posy", 198, 2),
            int("sizex", 200, 2),
            int("sizey", 202, 2),
            int("windowstate", 204, 1),
            int("active", 205, 1),
            int("cursor", 206, 2),
            int("lastcursor", 208, 2),
            int("modalcursor", 210, 2),
            int("grabcursor", 212, 2),
            int("addmousemove", 214, 1),
            int("tag_cursor_refresh", 215, 1),
            int("event_queue_check_click", 216, 1),
            int("event_queue_check_drag", 217, 1),
            int("event_queue_check_drag_handled", 218, 1),
            chars("_pad0", 219, 1),
            int("pie_event_type_lock", 220, 2),
            int("pie_event_type_last", 222, 2),
            ptr("eventstate", 224),
            ptr("event_last_handled", 232),
            ptr("ime_data", 240),
            embedded("event_queue", 248, 16, LIST_BASE),
            embedded("handlers", 264, 16, LIST_BASE),
            embedded("modalhandlers", 280, 16, LIST_BASE),
            embedded("gesture", 296, 16, LIST_BASE),
            ptr("stereo3d_format", 312),
            embedded("drawcalls", 320, 16, LIST_BASE),
            ptr("cursor_keymap_status", 336),
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
            chars("_pad", 162, 6),
        ],
    },
    // wm_event_system.h
    StructLayout {
        name: "wmEventHandler",
        size: 32,
        fields: &[
            ptr("next", 0),
            ptr("prev", 8),
            int("type", 16, 1),
            int("flag", 17, 1),
            ptr("poll", 24),
        ],
    },
    StructLayout {
        name: "wmEventHandler_Op",
        size: 80,
        fields: &[
            embedded("head", 0, 32, "wmEventHandler"),
            ptr("op", 32),
            int("is_fileselect", 40, 1),
            ptr("context_win", 48),
            ptr("context_area", 56),
            ptr("context_region", 64),
            int("context_region_type", 72, 2),
        ],
    },
];
