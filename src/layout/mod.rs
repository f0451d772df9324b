// layout/mod.rs — Declarative byte layouts of the host structures we touch.
//
// The host never exports these structures, so every field the core reads or
// writes is described here, per host version, as (name, offset, width, kind).
// Nothing outside these tables is ever addressed: `memory::TypedView` only
// resolves fields through a `StructLayout`, and only pointer fields may be
// written.
//
// Onboarding a new host version means adding one data-only submodule and one
// entry in `REGISTRY`. Ranges are checked in order; the first match wins.

pub mod v2_79;
pub mod v3_4;

use crate::error::LayoutError;
use crate::version::{HostVersion, VersionRange};

// ============================================================
// Well-known structure and field names
// ============================================================

pub const LINK: &str = "Link";
pub const LIST_BASE: &str = "ListBase";
pub const WINDOW: &str = "wmWindow";
pub const OPERATOR: &str = "wmOperator";

pub const FIELD_NEXT: &str = "next";
pub const FIELD_PREV: &str = "prev";
pub const FIELD_FIRST: &str = "first";
pub const FIELD_LAST: &str = "last";
pub const FIELD_MODAL_HANDLERS: &str = "modalhandlers";
pub const FIELD_IDNAME: &str = "idname";

/// Width of a host pointer. Every registered set is an LP64 layout.
pub const POINTER_WIDTH: usize = std::mem::size_of::<usize>();

// ============================================================
// Field / struct / enum descriptors
// ============================================================

/// What a field holds. Only `Pointer` fields are ever written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// Signed integer (char, short, int, int8 enum, ...) of the field's width.
    Integer,
    /// Host pointer, always `POINTER_WIDTH` bytes.
    Pointer,
    /// Another modeled struct laid out inline.
    Embedded(&'static str),
    /// `char name[N]`, NUL terminated when shorter than N.
    CharArray,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldDesc {
    pub name: &'static str,
    pub offset: usize,
    pub width: usize,
    pub kind: FieldKind,
}

impl FieldDesc {
    pub const fn end(&self) -> usize {
        self.offset + self.width
    }
}

pub const fn int(name: &'static str, offset: usize, width: usize) -> FieldDesc {
    FieldDesc { name, offset, width, kind: FieldKind::Integer }
}

pub const fn ptr(name: &'static str, offset: usize) -> FieldDesc {
    FieldDesc { name, offset, width: POINTER_WIDTH, kind: FieldKind::Pointer }
}

pub const fn embedded(name: &'static str, offset: usize, width: usize, ty: &'static str) -> FieldDesc {
    FieldDesc { name, offset, width, kind: FieldKind::Embedded(ty) }
}

pub const fn chars(name: &'static str, offset: usize, len: usize) -> FieldDesc {
    FieldDesc { name, offset, width: len, kind: FieldKind::CharArray }
}

/// Byte layout of one host struct. Trailing fields the core never needs may
/// be left out, but `size` is always the real size.
#[derive(Debug)]
pub struct StructLayout {
    pub name: &'static str,
    pub size: usize,
    pub fields: &'static [FieldDesc],
}

impl StructLayout {
    pub fn field(&self, name: &str) -> Option<&FieldDesc> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Values of one host C enum.
#[derive(Debug)]
pub struct EnumLayout {
    pub name: &'static str,
    pub items: &'static [(&'static str, i64)],
}

impl EnumLayout {
    pub fn value(&self, item: &str) -> Option<i64> {
        self.items.iter().find(|(n, _)| *n == item).map(|&(_, v)| v)
    }

    pub fn item(&self, value: i64) -> Option<&'static str> {
        self.items.iter().find(|&&(_, v)| v == value).map(|&(n, _)| n)
    }
}

// ============================================================
// Event handler schema
// ============================================================

/// How a handler's kind is stored in a given host version.
#[derive(Clone, Copy, Debug)]
pub enum HandlerKindSource {
    /// An `eWM_EventHandlerType` value in `field` of the base handler.
    TypeField {
        field: &'static str,
        enum_name: &'static str,
    },
    /// One struct carries every callback slot; the first non-null pointer
    /// in the order op, ui, dropbox, keymap names the kind.
    PointerPresence {
        ui: &'static str,
        op: &'static str,
        dropbox: &'static str,
        keymap: &'static str,
    },
}

/// Which structs/fields describe a modal handler in a given host version.
#[derive(Clone, Copy, Debug)]
pub struct HandlerSchema {
    /// Struct every handler starts with; carries `next`/`prev`.
    pub base: &'static str,
    pub kind: HandlerKindSource,
    /// Struct an operator handler is read as once its kind is known.
    pub op_struct: &'static str,
    pub op_field: &'static str,
    pub area_field: &'static str,
    pub region_field: &'static str,
}

// ============================================================
// Layout sets and the registry
// ============================================================

/// Every layout the core needs for one range of host builds.
#[derive(Debug)]
pub struct LayoutSet {
    pub name: &'static str,
    pub versions: VersionRange,
    pub structs: &'static [StructLayout],
    pub enums: &'static [EnumLayout],
    pub handler: HandlerSchema,
}

impl LayoutSet {
    pub fn get(&self, name: &str) -> Option<&'static StructLayout> {
        self.structs.iter().find(|s| s.name == name)
    }

    pub fn enum_layout(&self, name: &str) -> Option<&'static EnumLayout> {
        self.enums.iter().find(|e| e.name == name)
    }

    /// Check the table is self-consistent and declares everything the core
    /// addresses. Called by `resolve` before a set is handed out.
    pub fn validate(&self) -> Result<(), LayoutError> {
        for s in self.structs {
            for f in s.fields {
                if f.end() > s.size {
                    return Err(LayoutError::FieldOutOfBounds {
                        strukt: s.name,
                        field: f.name,
                        end: f.end(),
                        size: s.size,
                    });
                }
                match f.kind {
                    FieldKind::Pointer if f.width != POINTER_WIDTH => {
                        return Err(LayoutError::BadPointerWidth {
                            strukt: s.name,
                            field: f.name,
                            width: f.width,
                        });
                    }
                    FieldKind::Embedded(ty) => {
                        let inner = self.require_struct(ty)?;
                        if inner.size != f.width {
                            return Err(LayoutError::FieldOutOfBounds {
                                strukt: s.name,
                                field: f.name,
                                end: f.offset + inner.size,
                                size: f.offset + f.width,
                            });
                        }
                    }
                    _ => {}
                }
            }
        }

        let h = &self.handler;
        let mut required: Vec<(&'static str, &'static str, FieldKind)> = vec![
            (LINK, FIELD_NEXT, FieldKind::Pointer),
            (LINK, FIELD_PREV, FieldKind::Pointer),
            (LIST_BASE, FIELD_FIRST, FieldKind::Pointer),
            (LIST_BASE, FIELD_LAST, FieldKind::Pointer),
            (WINDOW, FIELD_MODAL_HANDLERS, FieldKind::Embedded(LIST_BASE)),
            (OPERATOR, FIELD_IDNAME, FieldKind::CharArray),
            (h.base, FIELD_NEXT, FieldKind::Pointer),
            (h.base, FIELD_PREV, FieldKind::Pointer),
            (h.op_struct, h.op_field, FieldKind::Pointer),
            (h.op_struct, h.area_field, FieldKind::Pointer),
            (h.op_struct, h.region_field, FieldKind::Pointer),
        ];
        match h.kind {
            HandlerKindSource::TypeField { field, enum_name } => {
                required.push((h.base, field, FieldKind::Integer));
                if self.enum_layout(enum_name).is_none() {
                    return Err(LayoutError::MissingStruct { set: self.name, name: enum_name });
                }
            }
            HandlerKindSource::PointerPresence { ui, op, dropbox, keymap } => {
                for f in [ui, op, dropbox, keymap] {
                    required.push((h.base, f, FieldKind::Pointer));
                }
            }
        }

        for (strukt, field, kind) in required {
            let s = self.require_struct(strukt)?;
            let desc = s.field(field).ok_or(LayoutError::MissingField {
                set: self.name,
                strukt,
                field,
            })?;
            if desc.kind != kind {
                return Err(LayoutError::MissingField { set: self.name, strukt, field });
            }
        }

        // Next/prev must lead every linkable struct so a node can be viewed as
        // a generic Link.
        for strukt in [WINDOW, OPERATOR, h.base] {
            let s = self.require_struct(strukt)?;
            for (field, offset) in [(FIELD_NEXT, 0), (FIELD_PREV, POINTER_WIDTH)] {
                match s.field(field) {
                    Some(f) if f.offset == offset => {}
                    _ => return Err(LayoutError::MissingField { set: self.name, strukt, field }),
                }
            }
        }
        Ok(())
    }

    fn require_struct(&self, name: &'static str) -> Result<&'static StructLayout, LayoutError> {
        self.get(name).ok_or(LayoutError::MissingStruct { set: self.name, name })
    }
}

/// Known layout sets, most recent host first.
///
/// 2.80 through 3.3 and 3.5 are not registered yet. Each needs a module
/// generated by `gen-layout` from that tag's headers.
static REGISTRY: &[&LayoutSet] = &[&v3_4::LAYOUT, &v2_79::LAYOUT];

/// All registered sets, in lookup order.
pub fn registered() -> &'static [&'static LayoutSet] {
    REGISTRY
}

/// Select the layout set for `version`. The first registered range that
/// contains the version wins; the set is validated before it is returned.
pub fn resolve(version: HostVersion) -> Result<&'static LayoutSet, LayoutError> {
    let set = REGISTRY
        .iter()
        .copied()
        .find(|s| s.versions.contains(version))
        .ok_or(LayoutError::UnsupportedVersion(version))?;
    set.validate()?;
    Ok(set)
}
