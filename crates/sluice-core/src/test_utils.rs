//! Test utilities for building upload fixtures.
//!
//! Zip archives are built in memory, and [`FixedClassifier`] stands in for
//! content sniffing where a test wants to pin the detected type.
//!
//! # Panics
//!
//! All functions in this module may panic on I/O errors since they are
//! designed for test use only where panics are acceptable.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::io::Cursor;
use std::io::Write;

use crate::formats::ContentClassifier;
use crate::formats::ContentType;
use crate::formats::SniffingClassifier;

/// Creates an in-memory ZIP archive from a list of entries.
///
/// Each entry is a tuple of (path, content). Files are stored uncompressed
/// with mode 0o644.
///
/// # Examples
///
/// ```
/// use sluice_core::test_utils::create_test_zip;
///
/// let zip_data = create_test_zip(&[("file.txt", b"hello"), ("dir/nested.txt", b"world")]);
/// ```
#[must_use]
pub fn create_test_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    entries
        .iter()
        .fold(ZipTestBuilder::new(), |builder, (path, data)| {
            builder.add_file(path, data)
        })
        .build()
}

/// Entry names of the mixed shapefile fixture: two complete sets plus six
/// files that must stay standalone.
pub const SHAPEFILE_FIXTURE: &[&str] = &[
    "shape1.shp",
    "shape1.shx",
    "shape1.dbf",
    "shape1.prj",
    "shape1.fbn",
    "shape1.fbx",
    "shape2.shp",
    "shape2.shx",
    "shape2.dbf",
    "shape2.prj",
    "shape2.txt",
    "shape2.pdf",
    "shape2",
    "README.MD",
    "notes",
    "shp_dictionary.xls",
];

/// Builds [`SHAPEFILE_FIXTURE`] as a zip, each entry holding its own name.
#[must_use]
pub fn create_shapefile_zip() -> Vec<u8> {
    SHAPEFILE_FIXTURE
        .iter()
        .fold(ZipTestBuilder::new(), |builder, name| {
            builder.add_file(name, format!("contents of {name}\n").as_bytes())
        })
        .build()
}

/// Builder for creating ZIP test archives.
///
/// # Examples
///
/// ```
/// use sluice_core::test_utils::ZipTestBuilder;
///
/// let zip_data = ZipTestBuilder::new()
///     .add_file("file.txt", b"content")
///     .add_directory("dir/")
///     .add_deflated("dir/big.csv", &[b'a'; 4096])
///     .build();
/// ```
pub struct ZipTestBuilder {
    zip: zip::ZipWriter<Cursor<Vec<u8>>>,
}

impl ZipTestBuilder {
    /// Creates a new ZIP test builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            zip: zip::ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    /// Adds a stored (uncompressed) file.
    #[must_use]
    pub fn add_file(mut self, path: &str, data: &[u8]) -> Self {
        use zip::write::SimpleFileOptions;

        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored)
            .unix_permissions(0o644);

        self.zip.start_file(path, options).unwrap();
        self.zip.write_all(data).unwrap();
        self
    }

    /// Adds a deflated file.
    #[must_use]
    pub fn add_deflated(mut self, path: &str, data: &[u8]) -> Self {
        use zip::write::SimpleFileOptions;

        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .unix_permissions(0o644);

        self.zip.start_file(path, options).unwrap();
        self.zip.write_all(data).unwrap();
        self
    }

    /// Adds a directory entry.
    #[must_use]
    pub fn add_directory(mut self, path: &str) -> Self {
        use zip::write::SimpleFileOptions;

        let options = SimpleFileOptions::default().unix_permissions(0o755);
        self.zip.add_directory(path, options).unwrap();
        self
    }

    /// Builds and returns the ZIP archive data.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        self.zip.finish().unwrap().into_inner()
    }
}

impl Default for ZipTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Classifier with canned answers keyed by file name; anything else goes to
/// [`SniffingClassifier`].
#[derive(Debug, Default, Clone)]
pub struct FixedClassifier {
    types: HashMap<String, ContentType>,
}

impl FixedClassifier {
    /// Creates a classifier with no canned answers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `content_type` for `file_name`.
    #[must_use]
    pub fn with(mut self, file_name: &str, content_type: &str) -> Self {
        self.types
            .insert(file_name.to_string(), ContentType::from(content_type));
        self
    }
}

impl ContentClassifier for FixedClassifier {
    fn classify(&self, file_name: &str, head: &[u8], declared: Option<&str>) -> ContentType {
        self.types
            .get(file_name)
            .cloned()
            .unwrap_or_else(|| SniffingClassifier.classify(file_name, head, declared))
    }
}
