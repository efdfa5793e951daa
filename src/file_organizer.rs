/// Sorting of newly created files into category directories.
///
/// This module moves each created file into the subdirectory of the target
/// root named after its category, creating that subdirectory on demand and
/// reporting every successful move on the console.
use crate::config::{CompiledFilters, FailurePolicy};
use crate::file_category::{Category, ExtensionMap};
use crate::output::OutputFormatter;
use crate::watcher::{CreationHandler, FileCreationEvent, WatchError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Represents a single completed move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// The path of the file when it was created.
    pub original_path: PathBuf,
    /// The path of the file after sorting.
    pub new_path: PathBuf,
    /// The category the file was moved to.
    pub category: Category,
}

impl Operation {
    /// The directory the file was moved into.
    pub fn destination_dir(&self) -> &Path {
        self.new_path.parent().unwrap_or(&self.new_path)
    }
}

/// Errors that can occur while sorting a file.
#[derive(Error, Debug)]
pub enum OrganizeError {
    /// Failed to create a category directory.
    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreationFailed { path: PathBuf, source: io::Error },

    /// Failed to move a file to its category directory.
    #[error("Failed to move {} to {}: {source}", from.display(), to.display())]
    FileMoveFailure {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    /// The created path has no final name component.
    #[error("Created path {} has no file name", path.display())]
    MissingFileName { path: PathBuf },
}

/// Result type for sorting operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Sorts files created directly inside a target root.
///
/// The sorter is read-only after construction and may be shared between
/// threads; the watcher still invokes it for one event at a time.
#[derive(Debug)]
pub struct FileSorter {
    target_root: PathBuf,
    mapper: ExtensionMap,
    filters: Option<CompiledFilters>,
    on_error: FailurePolicy,
}

impl FileSorter {
    /// Creates a sorter for `target_root` with no filters, continuing past
    /// failed moves.
    pub fn new(target_root: impl Into<PathBuf>) -> Self {
        Self {
            target_root: target_root.into(),
            mapper: ExtensionMap::default(),
            filters: None,
            on_error: FailurePolicy::default(),
        }
    }

    /// Skip files rejected by `filters`.
    pub fn with_filters(mut self, filters: CompiledFilters) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Set what happens when a single move fails.
    pub fn with_failure_policy(mut self, on_error: FailurePolicy) -> Self {
        self.on_error = on_error;
        self
    }

    pub fn target_root(&self) -> &Path {
        &self.target_root
    }

    /// Returns the directory a file with this name would be moved into.
    ///
    /// # Examples
    ///
    /// ```
    /// use autosort::file_organizer::FileSorter;
    /// use std::path::Path;
    ///
    /// let sorter = FileSorter::new("/watch");
    /// assert_eq!(
    ///     sorter.destination_for(Path::new("/watch/report.txt")),
    ///     Path::new("/watch/Documents")
    /// );
    /// ```
    pub fn destination_for(&self, file_path: &Path) -> PathBuf {
        self.target_root
            .join(self.mapper.categorize(file_path).dir_name())
    }

    /// Handles one creation event.
    ///
    /// Directory events and filtered-out files are ignored and yield
    /// `Ok(None)`. Otherwise the file is classified, its category directory is
    /// created if needed, the file is moved there under its original name
    /// (replacing any same-named file), and the move is reported.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use autosort::file_organizer::FileSorter;
    /// use autosort::watcher::FileCreationEvent;
    ///
    /// let sorter = FileSorter::new("/watch");
    /// match sorter.handle(&FileCreationEvent::file("/watch/song.mp3")) {
    ///     Ok(Some(op)) => println!("now at {}", op.new_path.display()),
    ///     Ok(None) => {}
    ///     Err(e) => eprintln!("{e}"),
    /// }
    /// ```
    pub fn handle(&self, event: &FileCreationEvent) -> OrganizeResult<Option<Operation>> {
        if event.is_directory {
            return Ok(None);
        }

        if let Some(filters) = &self.filters
            && !filters.should_include(&event.path)
        {
            tracing::debug!("[sorter] excluded by filters: {}", event.path.display());
            return Ok(None);
        }

        let category = self.mapper.categorize(&event.path);
        let operation = Self::move_to_category(&self.target_root, &event.path, category)?;

        OutputFormatter::moved(
            &event.path.file_name().unwrap_or_default().to_string_lossy(),
            operation.destination_dir(),
        );
        tracing::info!(
            "[sorter] {} -> {}",
            operation.original_path.display(),
            operation.new_path.display()
        );

        Ok(Some(operation))
    }

    /// Moves a file into `category`'s directory beneath `base_path`.
    ///
    /// The category directory and any missing parents are created first; an
    /// existing directory is reused. The file keeps its base name.
    pub fn move_to_category(
        base_path: &Path,
        file_path: &Path,
        category: Category,
    ) -> OrganizeResult<Operation> {
        let category_path = base_path.join(category.dir_name());

        fs::create_dir_all(&category_path).map_err(|e| OrganizeError::DirectoryCreationFailed {
            path: category_path.clone(),
            source: e,
        })?;

        let file_name = file_path
            .file_name()
            .ok_or_else(|| OrganizeError::MissingFileName {
                path: file_path.to_path_buf(),
            })?;
        let destination_path = category_path.join(file_name);

        move_file(file_path, &destination_path).map_err(|e| OrganizeError::FileMoveFailure {
            from: file_path.to_path_buf(),
            to: destination_path.clone(),
            source: e,
        })?;

        Ok(Operation {
            original_path: file_path.to_path_buf(),
            new_path: destination_path,
            category,
        })
    }
}

/// Renames `from` onto `to`, replacing `to` if it exists. Falls back to copy
/// and delete when the two paths live on different filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        result => result,
    }
}

impl CreationHandler for FileSorter {
    fn name(&self) -> &str {
        "sorter"
    }

    fn on_created(&self, event: &FileCreationEvent) -> Result<(), WatchError> {
        match self.handle(event) {
            Ok(_) => Ok(()),
            Err(e) => match self.on_error {
                FailurePolicy::Continue => {
                    OutputFormatter::error(&e.to_string());
                    Ok(())
                }
                FailurePolicy::Abort => Err(WatchError::HandlerFailed {
                    handler: self.name().to_string(),
                    path: event.path.clone(),
                    reason: e.to_string(),
                }),
            },
        }
    }
}
