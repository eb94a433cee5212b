//! BagIt bag detection and handling.
//!
//! A bag is recognised from the archive listing alone: a `bagit.txt`
//! declaration at the root or inside a single top-level folder, with at
//! least one `manifest-<algorithm>.txt` next to it. Bag contents bypass
//! shapefile grouping and are handed to a [`BagHandler`].

use std::collections::HashMap;
use std::path::Path;

use crate::IngestError;
use crate::ItemError;
use crate::checksum::ChecksumAlgorithm;
use crate::checksum::digest_file;
use crate::copy::CopyBuffer;

use super::ItemOutcome;
use super::StagedFile;

/// Bag declaration file name.
pub const BAG_DECLARATION: &str = "bagit.txt";

/// Expanded bag contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bag {
    /// Entry-name prefix of the bag root: empty, or `folder/`.
    pub prefix: String,
    /// Every staged file of the archive, in archive order.
    pub files: Vec<StagedFile>,
}

/// Turns an expanded bag into the files to keep.
pub trait BagHandler: Send + Sync {
    /// Returns one outcome per input file, in order.
    fn handle(&self, bag: Bag) -> Vec<ItemOutcome>;
}

/// Finds the bag root among archive entry names.
///
/// ```
/// use sluice_core::formats::bagit::detect_bag_root;
///
/// let names = ["mybag/bagit.txt", "mybag/manifest-md5.txt", "mybag/data/a.csv"];
/// assert_eq!(detect_bag_root(names).as_deref(), Some("mybag/"));
///
/// assert_eq!(detect_bag_root(["bagit.txt", "data/a.csv"]), None);
/// ```
pub fn detect_bag_root<'a, I>(names: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let names: Vec<&str> = names.into_iter().collect();

    names.iter().find_map(|name| {
        let prefix = name.strip_suffix(BAG_DECLARATION)?;
        let valid_root = prefix.is_empty()
            || (prefix.ends_with('/') && prefix.matches('/').count() == 1 && prefix.len() > 1);
        if !valid_root {
            return None;
        }
        names
            .iter()
            .any(|other| {
                other
                    .strip_prefix(prefix)
                    .and_then(manifest_algorithm_name)
                    .is_some()
            })
            .then(|| prefix.to_string())
    })
}

/// `manifest-sha256.txt` → `sha256`.
fn manifest_algorithm_name(file_name: &str) -> Option<&str> {
    let alg = file_name.strip_prefix("manifest-")?.strip_suffix(".txt")?;
    (!alg.is_empty() && !alg.contains('/')).then_some(alg)
}

/// Default handler: keeps every file of the bag and checks payload files
/// against the bag's payload manifests.
///
/// A payload file whose digest differs from its manifest line becomes a
/// `ChecksumMismatch` item error. Manifests for algorithms that are not
/// supported are skipped with a warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManifestBagHandler;

impl ManifestBagHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

type ManifestIndex = HashMap<String, Vec<(ChecksumAlgorithm, String)>>;

impl BagHandler for ManifestBagHandler {
    fn handle(&self, bag: Bag) -> Vec<ItemOutcome> {
        let manifests = load_manifests(&bag);
        let mut buffer = CopyBuffer::new();

        bag.files
            .into_iter()
            .map(|file| {
                let entry = file.display_name().to_string();
                let relative = entry.strip_prefix(&bag.prefix).unwrap_or(&entry);
                match manifests.get(relative) {
                    Some(expected) => verify(file, &entry, expected, &mut buffer),
                    None => Ok(file),
                }
            })
            .collect()
    }
}

fn verify(
    file: StagedFile,
    entry: &str,
    expected: &[(ChecksumAlgorithm, String)],
    buffer: &mut CopyBuffer,
) -> ItemOutcome {
    for (algorithm, digest) in expected {
        let actual = match digest_file(&file.path, *algorithm, buffer) {
            Ok(checksum) => checksum.value,
            Err(error) => {
                return Err(ItemError {
                    name: entry.to_string(),
                    error,
                });
            }
        };
        if !actual.eq_ignore_ascii_case(digest) {
            tracing::warn!(entry, %algorithm, "bag payload checksum mismatch");
            return Err(ItemError {
                name: entry.to_string(),
                error: IngestError::ChecksumMismatch {
                    name: entry.to_string(),
                    algorithm: *algorithm,
                    expected: digest.clone(),
                    actual,
                },
            });
        }
    }
    Ok(file)
}

fn load_manifests(bag: &Bag) -> ManifestIndex {
    let mut index = ManifestIndex::new();

    for file in &bag.files {
        let Some(name) = file.display_name().strip_prefix(&bag.prefix) else {
            continue;
        };
        let Some(alg_name) = manifest_algorithm_name(name) else {
            continue;
        };
        let algorithm = match alg_name.parse::<ChecksumAlgorithm>() {
            Ok(algorithm) => algorithm,
            Err(_) => {
                tracing::warn!(manifest = name, "unsupported manifest algorithm, not verified");
                continue;
            }
        };
        match parse_manifest(&file.path) {
            Ok(lines) => {
                for (digest, path) in lines {
                    index
                        .entry(path)
                        .or_default()
                        .push((algorithm, digest));
                }
            }
            Err(err) => {
                tracing::warn!(manifest = name, error = %err, "unreadable bag manifest");
            }
        }
    }

    index
}

/// Parses `<digest> <path>` lines.
fn parse_manifest(path: &Path) -> std::io::Result<Vec<(String, String)>> {
    let text = std::fs::read_to_string(path)?;
    Ok(text
        .lines()
        .filter_map(|line| {
            let (digest, rest) = line.trim_end().split_once(char::is_whitespace)?;
            let path = rest.trim_start();
            (!digest.is_empty() && !path.is_empty())
                .then(|| (digest.to_ascii_lowercase(), decode_manifest_path(path)))
        })
        .collect())
}

/// Undoes the `%0A`, `%0D` and `%25` escapes allowed in manifest paths.
fn decode_manifest_path(path: &str) -> String {
    path.replace("%0A", "\n")
        .replace("%0a", "\n")
        .replace("%0D", "\r")
        .replace("%0d", "\r")
        .replace("%25", "%")
}
