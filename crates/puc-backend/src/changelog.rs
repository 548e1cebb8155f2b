use std::path::Path;

/// File names checked, in order, when looking for a changelog.
pub const CHANGELOG_NAMES: [&str; 4] = ["CHANGES.md", "CHANGELOG.md", "changes.md", "changelog.md"];

/// Find which changelog file the installed copy ships with.
///
/// Only the local directory is inspected; the same name is then fetched from
/// the remote reference.
#[must_use]
pub fn find_changelog_name(directory: &Path) -> Option<&'static str> {
    let entries: Vec<String> = std::fs::read_dir(directory)
        .ok()?
        .filter_map(Result::ok)
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();

    CHANGELOG_NAMES
        .into_iter()
        .find(|candidate| entries.iter().any(|name| name == candidate))
}
