use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use puc_backend::{ArtifactKind, InstalledArtifact};

use crate::error::CheckError;
use crate::header::{PLUGIN_HEADERS, THEME_HEADERS, parse_file_header};

const README_NAMES: [&str; 2] = ["readme.txt", "README.txt"];
const THEME_STYLESHEET: &str = "style.css";

/// A plugin identified by its main PHP file.
#[derive(Debug, Clone)]
pub struct PluginArtifact {
    slug: String,
    main_file: PathBuf,
    directory: PathBuf,
    main_file_name: String,
    /// Main file relative to the plugins directory.
    plugin_file: String,
    /// Whether the plugin has a directory of its own, as opposed to a single
    /// file dropped into the plugins directory.
    has_own_directory: bool,
}

impl PluginArtifact {
    /// `main_file` must live inside `plugins_dir`. The slug defaults to the
    /// main file's name without extension.
    #[must_use]
    pub fn new(main_file: PathBuf, plugins_dir: &Path, slug: Option<String>) -> Self {
        let directory = main_file
            .parent()
            .map_or_else(|| plugins_dir.to_path_buf(), Path::to_path_buf);
        let main_file_name = main_file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let plugin_file = main_file
            .strip_prefix(plugins_dir)
            .map_or_else(|_| main_file_name.clone(), relative_slash_path);
        let has_own_directory = directory != plugins_dir;
        let slug = slug.filter(|slug| !slug.is_empty()).unwrap_or_else(|| {
            main_file
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

        Self {
            slug,
            main_file,
            directory,
            main_file_name,
            plugin_file,
            has_own_directory,
        }
    }
}

impl InstalledArtifact for PluginArtifact {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Plugin
    }

    fn slug(&self) -> &str {
        &self.slug
    }

    fn directory(&self) -> &Path {
        &self.directory
    }

    fn main_file_name(&self) -> &str {
        &self.main_file_name
    }

    fn filename(&self) -> Option<String> {
        Some(self.plugin_file.clone())
    }

    fn local_header(&self) -> Option<BTreeMap<String, String>> {
        read_header(&self.main_file, &PLUGIN_HEADERS)
    }

    fn readme_file_name(&self) -> Option<String> {
        if !self.has_own_directory {
            return None;
        }
        README_NAMES
            .into_iter()
            .find(|name| self.directory.join(name).is_file())
            .map(ToString::to_string)
    }
}

/// A theme identified by its directory under the theme root.
#[derive(Debug, Clone)]
pub struct ThemeArtifact {
    slug: String,
    stylesheet: String,
    directory: PathBuf,
}

impl ThemeArtifact {
    #[must_use]
    pub fn new(theme_root: &Path, stylesheet: impl Into<String>, slug: Option<String>) -> Self {
        let stylesheet = stylesheet.into();
        let slug = slug
            .filter(|slug| !slug.is_empty())
            .unwrap_or_else(|| stylesheet.clone());

        Self {
            slug,
            directory: theme_root.join(&stylesheet),
            stylesheet,
        }
    }
}

impl InstalledArtifact for ThemeArtifact {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Theme
    }

    fn slug(&self) -> &str {
        &self.slug
    }

    fn directory(&self) -> &Path {
        &self.directory
    }

    fn directory_name(&self) -> String {
        self.stylesheet.clone()
    }

    fn main_file_name(&self) -> &str {
        THEME_STYLESHEET
    }

    fn filename(&self) -> Option<String> {
        None
    }

    fn local_header(&self) -> Option<BTreeMap<String, String>> {
        read_header(&self.directory.join(THEME_STYLESHEET), &THEME_HEADERS)
    }
}

fn read_header(path: &Path, names: &[(&str, &str)]) -> Option<BTreeMap<String, String>> {
    match std::fs::read(path) {
        Ok(content) => Some(parse_file_header(&content, names)),
        Err(error) => {
            log::warn!("Can't read the header of {}: {error}", path.display());
            None
        }
    }
}

fn relative_slash_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Decide whether `path` points at a plugin or a theme.
///
/// A path inside one of `plugin_dirs` is a plugin main file. A path inside
/// `theme_root` names a theme by the first directory below the root.
///
/// # Errors
/// Returns [`CheckError::UnknownArtifact`] when the path is in neither place.
pub fn detect_artifact(
    path: &Path,
    plugin_dirs: &[PathBuf],
    theme_root: Option<&Path>,
    slug: Option<String>,
) -> Result<Box<dyn InstalledArtifact>, CheckError> {
    if let Some(plugins_dir) = plugin_dirs
        .iter()
        .find(|dir| path.starts_with(dir) && path != dir.as_path())
    {
        return Ok(Box::new(PluginArtifact::new(
            path.to_path_buf(),
            plugins_dir,
            slug,
        )));
    }

    if let Some(root) = theme_root
        && let Ok(relative) = path.strip_prefix(root)
        && let Some(stylesheet) = relative.components().next()
    {
        let stylesheet = stylesheet.as_os_str().to_string_lossy().into_owned();
        return Ok(Box::new(ThemeArtifact::new(root, stylesheet, slug)));
    }

    Err(CheckError::unknown_artifact(path))
}
