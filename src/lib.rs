//! datedir - sorts files into a `{year}/{category}` tree.
//!
//! Files are classified by extension, given a name derived from the date
//! embedded in their name or their modification time, and moved (optionally
//! also copied) to a collision-free destination. Runs are journaled so they
//! can be undone.

pub mod batch;
pub mod cli;
pub mod config;
pub mod date_extractor;
pub mod disposal;
pub mod error;
pub mod file_category;
pub mod file_organizer;
pub mod file_record;
pub mod name_composer;
pub mod output;
pub mod report;
pub mod resolver;
pub mod undo;
pub mod unique_path;

pub use batch::{BatchEvent, BatchRequest, Organizer};
pub use config::{CompiledFilters, ConfigError, Settings};
pub use error::{BatchError, CopyError, DisposalError, FileError};
pub use file_category::{Category, CategoryTable, ExtensionRegistry};
pub use file_organizer::{OperationLog, Relocator};
pub use file_record::{Destinations, FileRecord};
pub use name_composer::NameComposer;
pub use report::BatchReport;
pub use resolver::{ExtensionResolver, InteractivePrompt, RejectUnknown};
pub use undo::{UndoManager, UndoReport};
