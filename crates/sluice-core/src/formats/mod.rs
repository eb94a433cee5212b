//! Format handling: detection, zip expansion, shapefile bundling, BagIt.

pub mod bagit;
pub mod detect;
pub mod shapefile;
pub mod zip;

use std::path::PathBuf;

pub use bagit::BagHandler;
pub use bagit::ManifestBagHandler;
pub use detect::ContentClassifier;
pub use detect::ContentType;
pub use detect::SniffingClassifier;
pub use shapefile::GroupedItem;
pub use shapefile::ShapefileGroup;
pub use zip::ZipExpander;

/// A staged file, or why its item failed.
pub type ItemOutcome = std::result::Result<StagedFile, crate::ItemError>;

/// A file sitting in temporary storage, waiting to become a
/// [`LogicalDataFile`](crate::LogicalDataFile) or be discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    /// Where the bytes are.
    pub path: PathBuf,
    /// Last component of the entry name, or the declared upload name.
    pub file_name: String,
    /// Folder part of the entry name.
    pub directory_label: Option<String>,
    /// Bytes actually written.
    pub size: u64,
    /// Content type, once known.
    pub content_type: Option<ContentType>,
    /// Raw archive entry names behind this file.
    pub source_entries: Vec<String>,
}

impl StagedFile {
    /// Name used to key errors for this file: the entry name when there is
    /// exactly one, the file name otherwise.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self.source_entries.as_slice() {
            [single] => single,
            _ => &self.file_name,
        }
    }
}
