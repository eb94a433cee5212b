//! Shapefile companion-set grouping.
//!
//! A shapefile is several files sharing a base name (`roads.shp`,
//! `roads.shx`, `roads.dbf`, ...). Complete sets found in the same folder of
//! an archive are rebuilt into one `<base>.zip` so they travel as a single
//! logical file.

use std::collections::HashMap;
use std::fs::File;

use crate::Result;
use crate::config::ShapefileRules;
use crate::copy::CopyBuffer;
use crate::copy::copy_with_buffer;
use crate::types::StagingDir;

use super::ContentType;
use super::StagedFile;

/// Extensions that belong to a shapefile set, lowercase.
pub const COMPANION_EXTENSIONS: &[&str] = &[
    "shp", "shx", "dbf", "prj", "sbn", "sbx", "fbn", "fbx", "ain", "aih", "ixs", "mxs", "atx",
    "cpg", "qpj", "qmd", "shp.xml",
];

const ALWAYS_REQUIRED: &[&str] = &["shp", "shx", "dbf"];

/// A complete companion set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapefileGroup {
    /// Folder the set was found in.
    pub directory_label: Option<String>,
    /// Shared base name, as spelled in the archive.
    pub base_name: String,
    /// Members in encounter order.
    pub members: Vec<StagedFile>,
}

impl ShapefileGroup {
    /// Name of the rebuilt archive.
    #[must_use]
    pub fn zip_name(&self) -> String {
        format!("{}.zip", self.base_name)
    }
}

/// Output of [`group`], in encounter order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupedItem {
    /// A file that passes through unchanged.
    Standalone(StagedFile),
    /// A complete set, placed where its first member was.
    Group(ShapefileGroup),
}

/// Grouping decision over indices of the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedItem {
    /// Input at this index stays on its own.
    Standalone(usize),
    /// Inputs at these indices form one set.
    Group {
        /// Folder of the set.
        directory_label: Option<String>,
        /// Shared base name.
        base_name: String,
        /// Member indices, ascending.
        members: Vec<usize>,
    },
}

impl PlannedItem {
    /// Returns `true` for a group.
    #[must_use]
    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group { .. })
    }
}

/// Splits `name` into base name and lowercase companion extension, or
/// `None` if the extension is outside the companion set.
///
/// ```
/// use sluice_core::formats::shapefile::companion_parts;
///
/// assert_eq!(companion_parts("Roads.SHP"), Some(("Roads", "shp".to_string())));
/// assert_eq!(companion_parts("roads.shp.xml"), Some(("roads", "shp.xml".to_string())));
/// assert_eq!(companion_parts("roads.txt"), None);
/// assert_eq!(companion_parts("roads"), None);
/// ```
#[must_use]
pub fn companion_parts(name: &str) -> Option<(&str, String)> {
    let lower = name.to_ascii_lowercase();
    if lower.len() > ".shp.xml".len() && lower.ends_with(".shp.xml") {
        let base = &name[..name.len() - ".shp.xml".len()];
        return Some((base, "shp.xml".to_string()));
    }

    let (base, ext) = name.rsplit_once('.')?;
    if base.is_empty() {
        return None;
    }
    let ext = ext.to_ascii_lowercase();
    if COMPANION_EXTENSIONS.contains(&ext.as_str()) {
        Some((base, ext))
    } else {
        None
    }
}

fn is_complete(extensions: &HashMap<String, usize>, rules: ShapefileRules) -> bool {
    ALWAYS_REQUIRED.iter().all(|ext| extensions.contains_key(*ext))
        && (!rules.require_prj || extensions.contains_key("prj"))
}

/// Core grouping over `(directory label, file name)` pairs.
fn plan<'a, I>(items: I, rules: ShapefileRules) -> Vec<PlannedItem>
where
    I: IntoIterator<Item = (Option<&'a str>, &'a str)>,
{
    struct Bucket<'a> {
        directory_label: Option<&'a str>,
        base_name: &'a str,
        extensions: HashMap<String, usize>,
    }

    let mut buckets: Vec<Bucket<'a>> = Vec::new();
    let mut index: HashMap<(Option<&'a str>, &'a str), usize> = HashMap::new();
    // bucket each input joined, if any
    let mut membership: Vec<Option<usize>> = Vec::new();

    for (position, (dir, name)) in items.into_iter().enumerate() {
        let joined = companion_parts(name).and_then(|(base, ext)| {
            let slot = *index.entry((dir, base)).or_insert_with(|| {
                buckets.push(Bucket {
                    directory_label: dir,
                    base_name: base,
                    extensions: HashMap::new(),
                });
                buckets.len() - 1
            });
            let bucket = &mut buckets[slot];
            if bucket.extensions.contains_key(&ext) {
                // duplicate extension stays standalone
                None
            } else {
                bucket.extensions.insert(ext, position);
                Some(slot)
            }
        });
        membership.push(joined);
    }

    let complete: Vec<bool> = buckets
        .iter()
        .map(|b| is_complete(&b.extensions, rules))
        .collect();
    let mut emitted = vec![false; buckets.len()];
    let mut planned = Vec::new();

    for (position, joined) in membership.into_iter().enumerate() {
        match joined {
            Some(slot) if complete[slot] => {
                if emitted[slot] {
                    continue;
                }
                emitted[slot] = true;
                let bucket = &buckets[slot];
                let mut members: Vec<usize> = bucket.extensions.values().copied().collect();
                members.sort_unstable();
                planned.push(PlannedItem::Group {
                    directory_label: bucket.directory_label.map(str::to_string),
                    base_name: bucket.base_name.to_string(),
                    members,
                });
            }
            _ => planned.push(PlannedItem::Standalone(position)),
        }
    }

    planned
}

/// Plans grouping for raw archive entry names without touching any file.
///
/// ```
/// use sluice_core::config::ShapefileRules;
/// use sluice_core::formats::shapefile::plan_groups;
///
/// let names = ["a.shp", "a.shx", "a.dbf", "a.prj", "a.txt"];
/// let plan = plan_groups(&names, ShapefileRules::default());
/// assert_eq!(plan.len(), 2);
/// assert!(plan[0].is_group());
/// ```
pub fn plan_groups<S: AsRef<str>>(names: &[S], rules: ShapefileRules) -> Vec<PlannedItem> {
    let split: Vec<(Option<&str>, &str)> = names
        .iter()
        .map(|name| {
            let name = name.as_ref().trim_end_matches('/');
            match name.rsplit_once(['/', '\\']) {
                Some((dir, file)) if !dir.is_empty() => (Some(dir), file),
                Some((_, file)) => (None, file),
                None => (None, name),
            }
        })
        .collect();
    plan(split, rules)
}

/// Number of complete groups among `names`.
#[must_use]
pub fn count_groups<S: AsRef<str>>(names: &[S], rules: ShapefileRules) -> usize {
    plan_groups(names, rules)
        .iter()
        .filter(|item| item.is_group())
        .count()
}

/// Buckets staged files into complete shapefile groups and standalone
/// files, preserving encounter order.
#[must_use]
pub fn group(files: Vec<StagedFile>, rules: ShapefileRules) -> Vec<GroupedItem> {
    let planned = plan(
        files
            .iter()
            .map(|f| (f.directory_label.as_deref(), f.file_name.as_str())),
        rules,
    );

    let mut slots: Vec<Option<StagedFile>> = files.into_iter().map(Some).collect();
    let mut take = |i: usize| slots[i].take();

    planned
        .into_iter()
        .filter_map(|item| match item {
            PlannedItem::Standalone(i) => take(i).map(GroupedItem::Standalone),
            PlannedItem::Group {
                directory_label,
                base_name,
                members,
            } => {
                let members: Vec<_> = members.into_iter().filter_map(&mut take).collect();
                tracing::debug!(base = %base_name, members = members.len(), "shapefile group");
                Some(GroupedItem::Group(ShapefileGroup {
                    directory_label,
                    base_name,
                    members,
                }))
            }
        })
        .collect()
}

/// Packs a group into `<base>.zip` inside the staging directory.
///
/// Members are stored under their file names, deflated.
///
/// # Errors
///
/// Returns an error if a member cannot be read or the bundle cannot be
/// written.
pub fn rezip(
    group: &ShapefileGroup,
    staging: &mut StagingDir,
    buffer: &mut CopyBuffer,
) -> Result<StagedFile> {
    use zip::CompressionMethod;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    let target = staging.allocate("bundle");
    let mut writer = ZipWriter::new(File::create(&target)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for member in &group.members {
        writer.start_file(member.file_name.as_str(), options)?;
        let mut source = File::open(&member.path)?;
        copy_with_buffer(&mut source, &mut writer, buffer)?;
    }
    writer.finish()?;

    let size = std::fs::metadata(&target)?.len();
    Ok(StagedFile {
        path: target,
        file_name: group.zip_name(),
        directory_label: group.directory_label.clone(),
        size,
        content_type: Some(ContentType::ZIPPED_SHAPEFILE),
        source_entries: group
            .members
            .iter()
            .flat_map(|m| m.source_entries.iter().cloned())
            .collect(),
    })
}
