// header.rs — Scrape struct and enum declarations out of C/C++ headers.
//
// Only the subset of C the host's DNA and window-manager headers use for the
// structs we model: one member declaration per line, comma-separated names,
// pointer stars, fixed-size arrays, `DNA_DEPRECATED`, C++ default member
// initializers, and anonymous nested structs (`struct { ... } context;`).
// Preprocessor lines are skipped, so both sides of an `#ifdef` are kept.

use anyhow::{anyhow, bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Array lengths spelled as macros in the headers we read.
const KNOWN_CONSTANTS: &[(&str, usize)] = &[("MAX_NAME", 64), ("OP_MAX_TYPENAME", 64)];

static MEMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:const\s+)?(?:(?:struct|enum|unsigned|signed)\s+)*([A-Za-z_]\w*)\s+([\w\s,*\[\]]+?)(?:\s+DNA_DEPRECATED)?\s*(?:=[^;]*)?;$",
    )
    .expect("member regex")
});
static DECLARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\**)\s*([A-Za-z_]\w*)((?:\[\w+\])*)$").expect("declarator regex"));
static DIMENSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(\w+)\]").expect("dimension regex"));
static NESTED_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^struct\s*\{$").expect("nested regex"));
static CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\}\s*(\w*)\s*;?$").expect("close regex"));
static ENUM_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Z_][A-Z0-9_]*)\s*(?:=\s*(0x[0-9a-fA-F]+|-?\d+|\(1\s*<<\s*\d+\)))?\s*,?$").expect("enum item regex")
});

/// One declared member, before any layout is computed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub decl: Decl,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decl {
    Plain {
        ty: String,
        pointer: bool,
        /// Element count; 1 for non-arrays.
        count: usize,
        is_array: bool,
    },
    /// Anonymous `struct { ... } name;`.
    Nested(Vec<Member>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CStruct {
    pub name: String,
    pub members: Vec<Member>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CEnum {
    pub name: String,
    pub items: Vec<(String, i64)>,
}

/// Remove `/* */` and `//` comments, keeping line breaks so line-based
/// parsing still sees one declaration per line.
pub fn strip_comments(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut chars = src.chars().peekable();
    let mut in_block = false;
    let mut in_line = false;

    while let Some(c) = chars.next() {
        if in_block {
            if c == '*' && chars.peek() == Some(&'/') {
                chars.next();
                in_block = false;
            } else if c == '\n' {
                out.push('\n');
            }
        } else if in_line {
            if c == '\n' {
                in_line = false;
                out.push('\n');
            }
        } else if c == '/' && chars.peek() == Some(&'*') {
            chars.next();
            in_block = true;
        } else if c == '/' && chars.peek() == Some(&'/') {
            chars.next();
            in_line = true;
        } else {
            out.push(c);
        }
    }
    out
}

fn array_dimension(dim: &str) -> Result<usize> {
    if let Ok(n) = dim.parse() {
        return Ok(n);
    }
    KNOWN_CONSTANTS
        .iter()
        .find(|(name, _)| *name == dim)
        .map(|&(_, n)| n)
        .ok_or_else(|| anyhow!("unknown array length `{dim}`"))
}

fn parse_member_line(line: &str) -> Result<Option<Vec<Member>>> {
    let Some(m) = MEMBER.captures(line) else {
        return Ok(None);
    };
    let ty = m[1].to_string();
    let mut members = Vec::new();
    for raw in m[2].split(',') {
        let raw = raw.trim();
        let d = DECLARATOR
            .captures(raw)
            .ok_or_else(|| anyhow!("unexpected declarator `{raw}`"))?;
        let mut count = 1;
        for dim in DIMENSION.captures_iter(&d[3]) {
            count *= array_dimension(&dim[1])?;
        }
        members.push(Member {
            name: d[2].to_string(),
            decl: Decl::Plain {
                ty: ty.clone(),
                pointer: !d[1].is_empty(),
                count,
                is_array: !d[3].is_empty(),
            },
        });
    }
    Ok(Some(members))
}

/// Parse members up to the matching `}`; returns the members and the name
/// after the brace, if any.
fn parse_block<'a, I>(lines: &mut I) -> Result<(Vec<Member>, String)>
where
    I: Iterator<Item = &'a str>,
{
    let mut members = Vec::new();
    while let Some(line) = lines.next() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(c) = CLOSE.captures(line) {
            return Ok((members, c[1].to_string()));
        }
        if NESTED_OPEN.is_match(line) {
            let (inner, name) = parse_block(lines)?;
            if name.is_empty() {
                bail!("anonymous nested struct without a member name");
            }
            members.push(Member { name, decl: Decl::Nested(inner) });
            continue;
        }
        match parse_member_line(line).with_context(|| format!("in `{line}`"))? {
            Some(parsed) => members.extend(parsed),
            None if line.ends_with(';') => bail!("unsupported declaration `{line}`"),
            // Macros such as DNA_DEFINE_CXX_METHODS(...).
            None => {}
        }
    }
    bail!("unterminated struct body")
}

/// Find `struct <name> {` and parse its body.
pub fn parse_struct(src: &str, name: &str) -> Result<CStruct> {
    let open = Regex::new(&format!(r"^\s*(?:typedef\s+)?struct\s+{}\s*\{{\s*$", regex::escape(name)))?;
    let src = strip_comments(src);
    let mut lines = src.lines();
    if !lines.by_ref().any(|l| open.is_match(l)) {
        bail!("struct {name} not found");
    }
    let (members, _) = parse_block(&mut lines).with_context(|| format!("struct {name}"))?;
    Ok(CStruct { name: name.to_string(), members })
}

fn enum_value(raw: &str) -> Result<i64> {
    if let Some(hex) = raw.strip_prefix("0x") {
        return Ok(i64::from_str_radix(hex, 16)?);
    }
    if let Some(shift) = raw.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        let bits: u32 = shift
            .split("<<")
            .nth(1)
            .ok_or_else(|| anyhow!("bad shift `{raw}`"))?
            .trim()
            .parse()?;
        return Ok(1i64 << bits);
    }
    Ok(raw.parse()?)
}

/// Find `enum <name> {` (optionally with a C++ underlying type) and read its
/// items, numbering implicit values the way C does.
pub fn parse_enum(src: &str, name: &str) -> Result<CEnum> {
    let open = Regex::new(&format!(
        r"^\s*(?:typedef\s+)?enum\s+(?:class\s+)?{}\s*(?::\s*[\w:]+\s*)?\{{\s*$",
        regex::escape(name)
    ))?;
    let src = strip_comments(src);
    let mut lines = src.lines();
    if !lines.by_ref().any(|l| open.is_match(l)) {
        bail!("enum {name} not found");
    }

    let mut items = Vec::new();
    let mut next = 0i64;
    for line in lines {
        let line = line.trim();
        if line.starts_with('}') {
            return Ok(CEnum { name: name.to_string(), items });
        }
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let m = ENUM_ITEM
            .captures(line)
            .ok_or_else(|| anyhow!("enum {name}: unexpected line `{line}`"))?;
        let value = match m.get(2) {
            Some(v) => enum_value(v.as_str()).with_context(|| format!("enum {name}"))?,
            None => next,
        };
        items.push((m[1].to_string(), value));
        next = value + 1;
    }
    bail!("enum {name}: unterminated body")
}
