// emit.rs — Render computed layouts as a data-only Rust layout module.

use crate::compute::{Computed, Kind};
use crate::header::CEnum;
use std::collections::BTreeSet;
use std::fmt::Write;

/// Structs the runtime refers to through named constants.
const NAMED: &[(&str, &str)] = &[
    ("Link", "LINK"),
    ("ListBase", "LIST_BASE"),
    ("wmWindow", "WINDOW"),
    ("wmOperator", "OPERATOR"),
];

fn struct_ref(name: &str) -> String {
    NAMED
        .iter()
        .find(|(c, _)| *c == name)
        .map_or_else(|| format!("{name:?}"), |(_, r)| r.to_string())
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Everything one generated module needs.
pub struct Module<'a> {
    pub tag: &'a str,
    pub major: u16,
    pub minor: u16,
    pub headers: Vec<String>,
    pub enums: Vec<CEnum>,
    /// (header path, struct), in emission order.
    pub structs: Vec<(String, Computed)>,
}

impl Module<'_> {
    pub fn set_name(&self) -> String {
        format!("v{}_{}", self.major, self.minor)
    }

    fn helpers(&self) -> BTreeSet<&'static str> {
        self.structs
            .iter()
            .flat_map(|(_, s)| s.fields.iter())
            .map(|f| match f.kind {
                Kind::Integer => "int",
                Kind::Pointer => "ptr",
                Kind::Embedded(_) => "embedded",
                Kind::CharArray => "chars",
            })
            .collect()
    }

    fn constants(&self) -> BTreeSet<&'static str> {
        let mut used = BTreeSet::new();
        for (_, s) in &self.structs {
            let names = std::iter::once(s.name.as_str()).chain(s.fields.iter().filter_map(|f| match &f.kind {
                Kind::Embedded(ty) => Some(ty.as_str()),
                _ => None,
            }));
            for name in names {
                if let Some(&(_, c)) = NAMED.iter().find(|(n, _)| *n == name) {
                    used.insert(c);
                }
            }
        }
        used
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut String) -> std::fmt::Result {
        let set = self.set_name();
        writeln!(out, "// {set}.rs — Struct layouts for host {}.{}.x, LP64.", self.major, self.minor)?;
        writeln!(out, "//")?;
        writeln!(out, "// Generated by `gen-layout --tag {}`. Offsets come from the tagged headers:", self.tag)?;
        for h in &self.headers {
            writeln!(out, "//   {h}")?;
        }
        writeln!(out)?;

        let mut imports: Vec<&str> = self.helpers().into_iter().collect();
        imports.extend(["EnumLayout", "HandlerKindSource", "HandlerSchema", "LayoutSet", "StructLayout"]);
        imports.extend(self.constants());
        writeln!(out, "use super::{{{}}};", imports.join(", "))?;
        writeln!(out, "use crate::version::VersionRange;")?;
        writeln!(out)?;

        writeln!(out, "pub const HANDLER: HandlerSchema = HandlerSchema {{")?;
        writeln!(out, "    base: \"wmEventHandler\",")?;
        writeln!(out, "    kind: HandlerKindSource::TypeField {{")?;
        writeln!(out, "        field: \"type\",")?;
        writeln!(out, "        enum_name: \"eWM_EventHandlerType\",")?;
        writeln!(out, "    }},")?;
        writeln!(out, "    op_struct: \"wmEventHandler_Op\",")?;
        writeln!(out, "    op_field: \"op\",")?;
        writeln!(out, "    area_field: \"context_area\",")?;
        writeln!(out, "    region_field: \"context_region\",")?;
        writeln!(out, "}};")?;
        writeln!(out)?;

        writeln!(out, "pub static LAYOUT: LayoutSet = LayoutSet {{")?;
        writeln!(out, "    name: {set:?},")?;
        writeln!(out, "    versions: VersionRange::minor_series({}, {}),", self.major, self.minor)?;
        writeln!(out, "    structs: STRUCTS,")?;
        writeln!(out, "    enums: ENUMS,")?;
        writeln!(out, "    handler: HANDLER,")?;
        writeln!(out, "}};")?;
        writeln!(out)?;

        writeln!(out, "const ENUMS: &[EnumLayout] = &[")?;
        for e in &self.enums {
            writeln!(out, "    EnumLayout {{")?;
            writeln!(out, "        name: {:?},", e.name)?;
            writeln!(out, "        items: &[")?;
            for (item, value) in &e.items {
                writeln!(out, "            ({item:?}, {value}),")?;
            }
            writeln!(out, "        ],")?;
            writeln!(out, "    }},")?;
        }
        writeln!(out, "];")?;
        writeln!(out)?;

        writeln!(out, "const STRUCTS: &[StructLayout] = &[")?;
        let mut last_header = "";
        for (header, s) in &self.structs {
            if header != last_header {
                writeln!(out, "    // {}", file_name(header))?;
                last_header = header.as_str();
            }
            writeln!(out, "    StructLayout {{")?;
            writeln!(out, "        name: {},", struct_ref(&s.name))?;
            writeln!(out, "        size: {},", s.size)?;
            writeln!(out, "        fields: &[")?;
            for f in &s.fields {
                let line = match &f.kind {
                    Kind::Integer => format!("int({:?}, {}, {})", f.name, f.offset, f.width),
                    Kind::Pointer => format!("ptr({:?}, {})", f.name, f.offset),
                    Kind::Embedded(ty) => format!("embedded({:?}, {}, {}, {})", f.name, f.offset, f.width, struct_ref(ty)),
                    Kind::CharArray => format!("chars({:?}, {}, {})", f.name, f.offset, f.width),
                };
                writeln!(out, "            {line},")?;
            }
            writeln!(out, "        ],")?;
            writeln!(out, "    }},")?;
        }
        writeln!(out, "];")
    }
}
