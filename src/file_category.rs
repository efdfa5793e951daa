/// File categorization by extension.
///
/// A created file is classified solely by the lowercased extension of its
/// name, looked up in a fixed, ordered rule table. Anything the table does not
/// name falls through to the default category.
///
/// # Examples
///
/// ```
/// use autosort::file_category::{Category, ExtensionMap};
/// use std::path::Path;
///
/// let map = ExtensionMap::default();
/// assert_eq!(map.categorize(Path::new("report.txt")), Category::Documents);
/// assert_eq!(map.categorize(Path::new("photo.JPG")), Category::Pictures);
/// assert_eq!(map.categorize(Path::new("archive.zip")), Category::Downloads);
/// ```
use std::path::Path;

/// A named destination subdirectory grouping files by type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Text documents (`.txt`)
    Documents,
    /// Images (`.jpg`)
    Pictures,
    /// Audio (`.mp3`)
    Music,
    /// Video (`.mp4`)
    Videos,
    /// Everything without an explicit rule
    Downloads,
}

impl Category {
    /// The category used when no extension rule matches.
    pub const DEFAULT: Category = Category::Downloads;

    /// Returns the directory name for this category.
    ///
    /// # Examples
    ///
    /// ```
    /// use autosort::file_category::Category;
    ///
    /// assert_eq!(Category::Documents.dir_name(), "Documents");
    /// assert_eq!(Category::DEFAULT.dir_name(), "Downloads");
    /// ```
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Documents => "Documents",
            Category::Pictures => "Pictures",
            Category::Music => "Music",
            Category::Videos => "Videos",
            Category::Downloads => "Downloads",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Extension rules, keyed by lowercase extension including the leading dot.
const EXTENSION_RULES: &[(&str, Category)] = &[
    (".txt", Category::Documents),
    (".jpg", Category::Pictures),
    (".mp3", Category::Music),
    (".mp4", Category::Videos),
];

/// Maps file extensions to categories.
///
/// The rule table is fixed at compile time and never mutated; the map only
/// carries the default it falls back to.
#[derive(Debug, Clone, Copy)]
pub struct ExtensionMap {
    default: Category,
}

impl ExtensionMap {
    /// Creates a map over the built-in rules with the `Downloads` fallback.
    pub fn new() -> Self {
        Self {
            default: Category::DEFAULT,
        }
    }

    /// Returns the lowercased extension of a path, including the leading dot.
    ///
    /// Leading dots belong to the stem, so `.bashrc` and `..txt` have no
    /// extension while `.a.txt` has `".txt"`. `name.` has the bare extension
    /// `"."`.
    ///
    /// # Examples
    ///
    /// ```
    /// use autosort::file_category::ExtensionMap;
    /// use std::path::Path;
    ///
    /// assert_eq!(ExtensionMap::extension_of(Path::new("a/b.TXT")), Some(".txt".to_string()));
    /// assert_eq!(ExtensionMap::extension_of(Path::new("README")), None);
    /// ```
    pub fn extension_of(path: &Path) -> Option<String> {
        let name = path.file_name()?.to_string_lossy();
        let stem = name.trim_start_matches('.');
        let dot = stem.rfind('.')?;
        Some(stem[dot..].to_lowercase())
    }

    /// Maps an extension (with leading dot) to a category, case-insensitively.
    pub fn extension_to_category(&self, ext: &str) -> Option<Category> {
        let ext = ext.to_lowercase();
        EXTENSION_RULES
            .iter()
            .find(|(rule, _)| *rule == ext)
            .map(|(_, category)| *category)
    }

    /// Determines the category for a file from its name alone.
    pub fn categorize(&self, path: &Path) -> Category {
        Self::extension_of(path)
            .and_then(|ext| self.extension_to_category(&ext))
            .unwrap_or(self.default)
    }
}

impl Default for ExtensionMap {
    fn default() -> Self {
        Self::new()
    }
}
