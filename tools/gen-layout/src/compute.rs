// compute.rs — LP64 offsets and sizes for scraped structs.
//
// Plain C layout rules: every member is aligned to its own alignment, a
// struct is aligned to its strictest member and padded to a multiple of
// that. Anonymous nested structs are flattened into `<name>_<member>`
// fields. Members the runtime cannot type (floats, non-char arrays,
// pointer arrays) still take up space but are not emitted.

use crate::header::{CStruct, Decl, Member};
use anyhow::{bail, Result};
use std::collections::HashMap;

const POINTER: usize = 8;

/// Host enums stored in a single byte.
pub const BYTE_ENUMS: &[&str] = &["eWM_EventHandlerType", "eWM_EventHandlerFlag"];

/// Typedef'd function pointers.
pub const FUNCTION_TYPEDEFS: &[&str] = &["EventHandlerPoll"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Kind {
    Integer,
    Pointer,
    Embedded(String),
    CharArray,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub offset: usize,
    pub width: usize,
    pub kind: Kind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Computed {
    pub name: String,
    pub size: usize,
    pub align: usize,
    pub fields: Vec<Field>,
}

impl Computed {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// (size, is an integer the runtime can read)
fn scalar(ty: &str) -> Option<(usize, bool)> {
    Some(match ty {
        "char" | "bool" | "int8_t" | "uint8_t" | "int8" | "uchar" => (1, true),
        "short" | "int16_t" | "uint16_t" | "ushort" => (2, true),
        "int" | "int32_t" | "uint32_t" | "uint" => (4, true),
        "int64_t" | "uint64_t" | "long" | "size_t" => (8, true),
        "float" => (4, false),
        "double" => (8, false),
        _ => return None,
    })
}

fn align_up(n: usize, align: usize) -> usize {
    n.div_ceil(align) * align
}

/// Lays out structs in dependency order; embedded structs must be added
/// before the structs that contain them.
#[derive(Default)]
pub struct Layouter {
    done: HashMap<String, Computed>,
}

impl Layouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, s: &CStruct) -> Result<Computed> {
        let (fields, size, align) = self.lay_out(&s.members, "")?;
        if size == 0 {
            bail!("struct {} has no members", s.name);
        }
        let computed = Computed { name: s.name.clone(), size, align, fields };
        self.done.insert(s.name.clone(), computed.clone());
        Ok(computed)
    }

    fn lay_out(&self, members: &[Member], prefix: &str) -> Result<(Vec<Field>, usize, usize)> {
        let mut fields = Vec::new();
        let mut offset = 0;
        let mut max_align = 1;

        for m in members {
            let name = format!("{prefix}{}", m.name);
            match &m.decl {
                Decl::Nested(inner) => {
                    let (inner_fields, size, align) = self.lay_out(inner, &format!("{name}_"))?;
                    offset = align_up(offset, align);
                    fields.extend(inner_fields.into_iter().map(|f| Field { offset: f.offset + offset, ..f }));
                    offset += size;
                    max_align = max_align.max(align);
                }
                Decl::Plain { ty, pointer, count, is_array } => {
                    let (elem, align, kind) = self.element(ty, *pointer, *is_array)?;
                    offset = align_up(offset, align);
                    let width = elem * count;
                    if let Some(kind) = kind {
                        fields.push(Field { name, offset, width, kind });
                    }
                    offset += width;
                    max_align = max_align.max(align);
                }
            }
        }
        Ok((fields, align_up(offset, max_align), max_align))
    }

    /// Element size, alignment, and the kind to emit (if any).
    fn element(&self, ty: &str, pointer: bool, is_array: bool) -> Result<(usize, usize, Option<Kind>)> {
        let keep = |k: Kind| (!is_array).then_some(k);

        if pointer || FUNCTION_TYPEDEFS.contains(&ty) {
            return Ok((POINTER, POINTER, keep(Kind::Pointer)));
        }
        if BYTE_ENUMS.contains(&ty) {
            return Ok((1, 1, keep(Kind::Integer)));
        }
        if ty == "char" && is_array {
            return Ok((1, 1, Some(Kind::CharArray)));
        }
        if let Some((size, integer)) = scalar(ty) {
            return Ok((size, size, if integer { keep(Kind::Integer) } else { None }));
        }
        if let Some(s) = self.done.get(ty) {
            return Ok((s.size, s.align, keep(Kind::Embedded(ty.to_string()))));
        }
        bail!("unknown type `{ty}` (embedded structs must be generated first)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::parse_struct;
    use pretty_assertions::assert_eq;

    fn field(name: &str, offset: usize, width: usize, kind: Kind) -> Field {
        Field { name: name.into(), offset, width, kind }
    }

    #[test]
    fn padding_and_trailing_alignment() {
        let src = "struct P {\n  char a;\n  int b;\n  short c;\n  void *d;\n  char e[3];\n};\n";
        let mut l = Layouter::new();
        let p = l.add(&parse_struct(src, "P").unwrap()).unwrap();
        assert_eq!(
            p.fields,
            vec![
                field("a", 0, 1, Kind::Integer),
                field("b", 4, 4, Kind::Integer),
                field("c", 8, 2, Kind::Integer),
                field("d", 16, 8, Kind::Pointer),
                field("e", 24, 3, Kind::CharArray),
            ]
        );
        assert_eq!(p.size, 32);
        assert_eq!(p.align, 8);
    }

    #[test]
    fn nested_struct_is_flattened_and_aligned() {
        let src = "struct H {\n  void *op;\n  bool flag;\n  struct {\n    void *area;\n    short kind;\n  } context;\n};\n";
        let mut l = Layouter::new();
        let h = l.add(&parse_struct(src, "H").unwrap()).unwrap();
        assert_eq!(h.field("context_area"), Some(&field("context_area", 16, 8, Kind::Pointer)));
        assert_eq!(h.field("context_kind"), Some(&field("context_kind", 24, 2, Kind::Integer)));
        assert_eq!(h.size, 32);
    }

    #[test]
    fn embedded_needs_earlier_struct() {
        let list = "struct ListBase {\n  void *first, *last;\n};\n";
        let owner = "struct W {\n  int id;\n  ListBase items;\n  float scale;\n};\n";

        let mut l = Layouter::new();
        assert!(l.add(&parse_struct(owner, "W").unwrap()).is_err());

        l.add(&parse_struct(list, "ListBase").unwrap()).unwrap();
        let w = l.add(&parse_struct(owner, "W").unwrap()).unwrap();
        assert_eq!(w.field("items"), Some(&field("items", 8, 16, Kind::Embedded("ListBase".into()))));
        assert_eq!(w.field("scale"), None, "floats take space but are not emitted");
        assert_eq!(w.size, 32);
    }
}
