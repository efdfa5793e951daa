//! autosort - watch a directory and sort new files into category folders
//!
//! This library watches a single directory for newly created files and moves
//! each one into a subdirectory named after its category (Documents, Pictures,
//! Music, Videos, or Downloads as the fallback), classified by file extension.

pub mod cli;
pub mod config;
pub mod file_category;
pub mod file_organizer;
pub mod logging;
pub mod output;
pub mod watcher;

pub use config::{CompiledFilters, Config, ConfigError, FailurePolicy};
pub use file_category::{Category, ExtensionMap};
pub use file_organizer::{FileSorter, Operation, OrganizeError};
pub use watcher::{
    CreationHandler, DirectoryWatcher, FileCreationEvent, RunState, Subscription, WatchError,
};
