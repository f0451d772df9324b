// lib.rs — Generate a host struct layout module from the host's headers.
//
// The runtime library never parses headers; it only reads the tables this
// tool writes into `src/layout/`. Each run covers one release tag:
//   1. read the four headers below at that tag
//   2. scrape the enum and struct declarations we model
//   3. compute LP64 offsets, flattening nested anonymous structs
//   4. render a data-only Rust module

pub mod compute;
pub mod emit;
pub mod header;
pub mod source;

use anyhow::{bail, Context, Result};
use compute::Layouter;
use emit::Module;
use screencast_keys_core::version::HostVersion;

pub enum Item {
    Enum(&'static str),
    Struct(&'static str),
}

pub struct HeaderFile {
    pub path: &'static str,
    /// Renamed from `.h` to `.hh` in 4.1.0.
    pub cxx_from_4_1: bool,
    pub items: &'static [Item],
}

/// Headers in emission order; a struct may only embed structs listed before it.
pub const HEADERS: &[HeaderFile] = &[
    HeaderFile {
        path: "source/blender/makesdna/DNA_listBase.h",
        cxx_from_4_1: false,
        items: &[Item::Struct("Link"), Item::Struct("ListBase")],
    },
    HeaderFile {
        path: "source/blender/makesdna/DNA_screen_types.h",
        cxx_from_4_1: false,
        items: &[Item::Struct("ScrAreaMap")],
    },
    HeaderFile {
        path: "source/blender/makesdna/DNA_windowmanager_types.h",
        cxx_from_4_1: false,
        items: &[Item::Struct("wmWindow"), Item::Struct("wmOperator")],
    },
    HeaderFile {
        path: "source/blender/windowmanager/wm_event_system.h",
        cxx_from_4_1: true,
        items: &[
            Item::Enum("eWM_EventHandlerType"),
            Item::Struct("wmEventHandler"),
            Item::Struct("wmEventHandler_Op"),
        ],
    },
];

const CXX_HEADERS_SINCE: HostVersion = HostVersion::new(4, 1, 0);

/// Repository path of `header` for a tag. Branch names (`main`) count as newer
/// than every release.
pub fn header_path(header: &HeaderFile, version: Option<HostVersion>) -> String {
    let cxx = header.cxx_from_4_1 && version.map_or(true, |v| v >= CXX_HEADERS_SINCE);
    if cxx {
        format!("{}h", header.path)
    } else {
        header.path.to_string()
    }
}

/// What to generate for.
pub struct Target {
    pub tag: String,
    /// Parsed from the tag when it is a release tag.
    pub version: Option<HostVersion>,
    pub major: u16,
    pub minor: u16,
}

impl Target {
    /// `series` is required when `tag` is not a `vX.Y.Z` release tag.
    pub fn new(tag: &str, series: Option<&str>) -> Result<Self> {
        let version = tag.parse::<HostVersion>().ok();
        let (major, minor) = match (series, version) {
            (Some(s), _) => {
                let v: HostVersion = s.parse().with_context(|| format!("series `{s}`"))?;
                (v.major, v.minor)
            }
            (None, Some(v)) => (v.major, v.minor),
            (None, None) => bail!("tag `{tag}` is not a release tag; pass --series MAJOR.MINOR"),
        };
        Ok(Self { tag: tag.to_string(), version, major, minor })
    }
}

/// Read every header through `read`, then render the layout module.
pub fn generate(target: &Target, read: impl Fn(&str) -> Result<String>) -> Result<String> {
    let mut layouter = Layouter::new();
    let mut headers = Vec::new();
    let mut enums = Vec::new();
    let mut structs = Vec::new();

    for header in HEADERS {
        let path = header_path(header, target.version);
        let text = read(&path)?;
        for item in header.items {
            match *item {
                Item::Enum(name) => {
                    enums.push(header::parse_enum(&text, name).with_context(|| path.clone())?);
                }
                Item::Struct(name) => {
                    let parsed = header::parse_struct(&text, name).with_context(|| path.clone())?;
                    let computed = layouter.add(&parsed).with_context(|| format!("{path}: {name}"))?;
                    tracing::debug!(name, size = computed.size, fields = computed.fields.len(), "laid out");
                    structs.push((path.clone(), computed));
                }
            }
        }
        headers.push(path);
    }

    let module = Module { tag: &target.tag, major: target.major, minor: target.minor, headers, enums, structs };
    Ok(module.render())
}
