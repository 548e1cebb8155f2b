//! Parser for WordPress-style `readme.txt` files.
//!
//! ```text
//! === Plugin Name ===
//! Contributors: someone
//! Stable tag: 1.2.0
//!
//! Short description.
//!
//! == Changelog ==
//! = 1.2.0 =
//! * Fixed things.
//! ```

use std::collections::BTreeMap;

use puc_backend::render_markdown;

const UPGRADE_NOTICE_SECTION: &str = "upgrade_notice";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Readme {
    pub name: Option<String>,
    pub contributors: Vec<String>,
    pub tags: Vec<String>,
    pub requires_at_least: Option<String>,
    pub tested_up_to: Option<String>,
    pub requires_php: Option<String>,
    pub stable_tag: Option<String>,
    pub license: Option<String>,
    pub short_description: Option<String>,
    /// Section HTML keyed by lowercased, underscore-joined title.
    pub sections: BTreeMap<String, String>,
    /// Upgrade notice text keyed by version.
    pub upgrade_notice: BTreeMap<String, String>,
}

#[must_use]
pub fn parse_readme(text: &str) -> Readme {
    let text = text.trim_start_matches('\u{feff}').replace("\r\n", "\n").replace('\r', "\n");
    let mut lines = text.lines().peekable();
    let mut readme = Readme::default();

    while let Some(line) = lines.peek() {
        if line.trim().is_empty() {
            lines.next();
            continue;
        }
        if let Some(name) = title(line) {
            readme.name = Some(name.to_string());
            lines.next();
        }
        break;
    }

    // Header block: `Key: value` lines up to the first blank line or section.
    while let Some(line) = lines.peek() {
        let trimmed = line.trim();
        if trimmed.is_empty() || section_title(trimmed).is_some() {
            break;
        }
        let Some((key, value)) = trimmed.split_once(':') else {
            break;
        };
        apply_header_field(&mut readme, key, value.trim());
        lines.next();
    }

    let mut intro = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;
    let mut raw_sections: Vec<(String, Vec<&str>)> = Vec::new();
    for line in lines {
        if let Some(heading) = section_title(line.trim()) {
            if let Some(finished) = current.take() {
                raw_sections.push(finished);
            }
            current = Some((section_key(heading), Vec::new()));
            continue;
        }
        match current.as_mut() {
            Some((_, body)) => body.push(line),
            None => intro.push(line),
        }
    }
    raw_sections.extend(current);

    readme.short_description = first_paragraph(&intro);

    for (key, body) in raw_sections {
        if key == UPGRADE_NOTICE_SECTION {
            readme.upgrade_notice = parse_upgrade_notices(&body);
            continue;
        }
        let html = render_section(&body);
        if !html.trim().is_empty() {
            readme.sections.insert(key, html);
        }
    }

    readme
}

fn apply_header_field(readme: &mut Readme, key: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    let owned = Some(value.to_string());
    match key.trim().to_ascii_lowercase().as_str() {
        "contributors" => readme.contributors = split_list(value),
        "tags" => readme.tags = split_list(value),
        "requires at least" => readme.requires_at_least = owned,
        "tested up to" => readme.tested_up_to = owned,
        "requires php" => readme.requires_php = owned,
        "stable tag" => readme.stable_tag = owned,
        "license" => readme.license = owned,
        _ => {}
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn title(line: &str) -> Option<&str> {
    let name = line.trim().strip_prefix("===")?.strip_suffix("===")?.trim();
    (!name.is_empty()).then_some(name)
}

fn section_title(line: &str) -> Option<&str> {
    if line.starts_with("===") {
        return None;
    }
    let name = line.strip_prefix("==")?.strip_suffix("==")?.trim();
    (!name.is_empty()).then_some(name)
}

fn subsection_title(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if trimmed.starts_with("==") {
        return None;
    }
    let name = trimmed.strip_prefix('=')?.strip_suffix('=')?.trim();
    (!name.is_empty()).then_some(name)
}

fn section_key(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

fn first_paragraph(lines: &[&str]) -> Option<String> {
    let paragraph: Vec<&str> = lines
        .iter()
        .map(|line| line.trim())
        .skip_while(|line| line.is_empty())
        .take_while(|line| !line.is_empty())
        .collect();
    (!paragraph.is_empty()).then(|| paragraph.join(" "))
}

/// `= Sub =` headings become `<h4>`; everything else is Markdown.
fn render_section(body: &[&str]) -> String {
    let source: Vec<String> = body
        .iter()
        .map(|line| match subsection_title(line) {
            Some(heading) => format!("#### {heading}"),
            None => (*line).to_string(),
        })
        .collect();
    render_markdown(source.join("\n").trim())
}

fn parse_upgrade_notices(body: &[&str]) -> BTreeMap<String, String> {
    let mut notices = BTreeMap::new();
    let mut version: Option<String> = None;
    let mut text: Vec<&str> = Vec::new();

    for line in body {
        if let Some(heading) = subsection_title(line) {
            push_notice(&mut notices, version.take(), &text);
            text.clear();
            version = Some(heading.to_string());
        } else {
            text.push(line);
        }
    }
    push_notice(&mut notices, version, &text);

    notices
}

fn push_notice(notices: &mut BTreeMap<String, String>, version: Option<String>, text: &[&str]) {
    let Some(version) = version else {
        return;
    };
    let notice = text
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if !notice.is_empty() {
        notices.insert(version, notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const README: &str = "=== Demo Plugin ===\r\n\
Contributors: alice, bob\r\n\
Tags: updates, demo\r\n\
Requires at least: 5.8\r\n\
Tested up to: 6.4\r\n\
Requires PHP: 7.4\r\n\
Stable tag: 1.2.0\r\n\
License: GPLv2\r\n\
\r\n\
A short description of the plugin.\r\n\
\r\n\
== Description ==\r\n\
\r\n\
Longer text with **bold**.\r\n\
\r\n\
== Changelog ==\r\n\
\r\n\
= 1.2.0 =\r\n\
* Fixed things.\r\n\
\r\n\
== Frequently Asked Questions ==\r\n\
\r\n\
Ask away.\r\n\
\r\n\
== Upgrade Notice ==\r\n\
\r\n\
= 1.2.0 =\r\n\
Security fix,\r\n\
upgrade now.\r\n\
\r\n\
= 1.1 =\r\n\
Minor.\r\n";

    #[test]
    fn parses_title_and_header_fields() {
        let readme = parse_readme(README);

        assert_eq!(readme.name.as_deref(), Some("Demo Plugin"));
        assert_eq!(readme.contributors, vec!["alice", "bob"]);
        assert_eq!(readme.tags, vec!["updates", "demo"]);
        assert_eq!(readme.requires_at_least.as_deref(), Some("5.8"));
        assert_eq!(readme.tested_up_to.as_deref(), Some("6.4"));
        assert_eq!(readme.requires_php.as_deref(), Some("7.4"));
        assert_eq!(readme.stable_tag.as_deref(), Some("1.2.0"));
        assert_eq!(readme.license.as_deref(), Some("GPLv2"));
        assert_eq!(
            readme.short_description.as_deref(),
            Some("A short description of the plugin.")
        );
    }

    #[test]
    fn sections_are_keyed_and_rendered() {
        let readme = parse_readme(README);

        let keys: Vec<&str> = readme.sections.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["changelog", "description", "frequently_asked_questions"]);
        assert!(readme.sections["description"].contains("<strong>bold</strong>"));
        assert!(readme.sections["changelog"].contains("<h4>1.2.0</h4>"));
        assert!(readme.sections["changelog"].contains("<li>Fixed things.</li>"));
    }

    #[test]
    fn upgrade_notices_are_split_by_version() {
        let readme = parse_readme(README);

        assert_eq!(
            readme.upgrade_notice.get("1.2.0").map(String::as_str),
            Some("Security fix, upgrade now.")
        );
        assert_eq!(readme.upgrade_notice.get("1.1").map(String::as_str), Some("Minor."));
        assert!(!readme.sections.contains_key("upgrade_notice"));
    }

    #[test]
    fn readme_without_title_still_reads_headers() {
        let readme = parse_readme("Stable tag: trunk\n\n== Changelog ==\n* One\n");

        assert_eq!(readme.name, None);
        assert_eq!(readme.stable_tag.as_deref(), Some("trunk"));
        assert!(readme.sections.contains_key("changelog"));
    }

    #[test]
    fn empty_readme_is_default() {
        assert_eq!(parse_readme(""), Readme::default());
    }
}
