//! Declarative `Key: value` header blocks at the top of a plugin's main PHP
//! file or a theme's `style.css`.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use puc_backend::ArtifactKind;
use regex::Regex;

/// `Name: value` after optional comment decoration, one match per line.
static HEADER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(?:[ \t]*<\?php)?[ \t/*#@]*([^:\n]+):(.*)$")
        .expect("header line pattern should compile")
});

/// Only the start of the file is scanned.
const HEADER_SCAN_BYTES: usize = 8 * 1024;

/// Header line name and the descriptor field it fills. Later entries win when
/// two lines map to the same field.
pub const PLUGIN_HEADERS: [(&str, &str); 11] = [
    ("Plugin Name", "name"),
    ("Plugin URI", "homepage"),
    ("Version", "version"),
    ("Description", "description"),
    ("Author", "author"),
    ("Author URI", "author_homepage"),
    ("Requires WP", "requires"),
    ("Tested WP", "tested"),
    ("Requires at least", "requires"),
    ("Tested up to", "tested"),
    ("Requires PHP", "requires_php"),
];

pub const THEME_HEADERS: [(&str, &str); 5] = [
    ("Theme Name", "name"),
    ("Theme URI", "homepage"),
    ("Version", "version"),
    ("Author", "author"),
    ("Author URI", "author_homepage"),
];

#[must_use]
pub fn header_names(kind: ArtifactKind) -> &'static [(&'static str, &'static str)] {
    match kind {
        ArtifactKind::Plugin => &PLUGIN_HEADERS,
        ArtifactKind::Theme => &THEME_HEADERS,
    }
}

/// Extract the header fields of `content`, keyed by descriptor field name.
/// Empty values are left out.
#[must_use]
pub fn parse_file_header(content: &[u8], names: &[(&str, &str)]) -> BTreeMap<String, String> {
    let head = &content[..content.len().min(HEADER_SCAN_BYTES)];
    let text = String::from_utf8_lossy(head).replace("\r\n", "\n").replace('\r', "\n");

    // First line carrying each header name, in table order.
    let mut found: Vec<Option<&str>> = vec![None; names.len()];
    for captures in HEADER_LINE.captures_iter(&text) {
        let (Some(name), Some(value)) = (captures.get(1), captures.get(2)) else {
            continue;
        };
        for (slot, (header, _)) in found.iter_mut().zip(names) {
            if slot.is_none() && name.as_str().eq_ignore_ascii_case(header) {
                *slot = Some(value.as_str());
            }
        }
    }

    let mut fields = BTreeMap::new();
    for ((_, field), raw) in names.iter().zip(found) {
        let Some(value) = raw.map(cleanup_header_comment) else {
            continue;
        };
        if !value.is_empty() {
            fields.insert((*field).to_string(), value);
        }
    }
    fields
}

/// Drop a trailing comment terminator or PHP close tag and surrounding space.
fn cleanup_header_comment(value: &str) -> String {
    let end = [value.find("*/"), value.find("?>")]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(value.len());
    value[..end].trim().to_string()
}
