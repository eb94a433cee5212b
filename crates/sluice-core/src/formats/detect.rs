//! Content type detection.

use std::borrow::Cow;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// How many leading bytes are read for sniffing.
pub const SNIFF_LEN: usize = 8 * 1024;

/// A MIME content type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentType(Cow<'static, str>);

impl ContentType {
    /// `application/zip`
    pub const ZIP: Self = Self(Cow::Borrowed("application/zip"));
    /// `application/zipped-shapefile`, a rebuilt shapefile bundle.
    pub const ZIPPED_SHAPEFILE: Self = Self(Cow::Borrowed("application/zipped-shapefile"));
    /// `application/octet-stream`
    pub const OCTET_STREAM: Self = Self(Cow::Borrowed("application/octet-stream"));
    /// `text/plain`
    pub const TEXT_PLAIN: Self = Self(Cow::Borrowed("text/plain"));

    /// Returns the type as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Type without parameters, lowercased (`Text/Plain; charset=x` →
    /// `text/plain`).
    #[must_use]
    pub fn essence(&self) -> String {
        self.0
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    }

    /// Returns `true` for the zip family, which triggers expansion.
    #[must_use]
    pub fn is_zip(&self) -> bool {
        matches!(
            self.essence().as_str(),
            "application/zip" | "application/x-zip-compressed" | "application/x-zip"
        )
    }

    /// Returns `true` for types that say nothing about the content.
    #[must_use]
    pub fn is_generic(&self) -> bool {
        let essence = self.essence();
        essence.is_empty()
            || matches!(
                essence.as_str(),
                "application/octet-stream" | "application/x-unknown" | "application/unknown"
            )
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentType {
    fn from(value: &str) -> Self {
        Self(Cow::Owned(value.to_string()))
    }
}

impl From<String> for ContentType {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}

/// Determines the content type of a file.
pub trait ContentClassifier: Send + Sync {
    /// Classifies a file from its name, its leading bytes and the type the
    /// client declared.
    fn classify(&self, file_name: &str, head: &[u8], declared: Option<&str>) -> ContentType;
}

impl<T: ContentClassifier + ?Sized> ContentClassifier for Box<T> {
    fn classify(&self, file_name: &str, head: &[u8], declared: Option<&str>) -> ContentType {
        (**self).classify(file_name, head, declared)
    }
}

/// Production classifier.
///
/// Precedence, first conclusive answer wins:
/// 1. magic bytes (`infer`)
/// 2. file extension
/// 3. declared type, unless generic
/// 4. text heuristic on the leading bytes
/// 5. `application/octet-stream`
#[derive(Debug, Clone, Copy, Default)]
pub struct SniffingClassifier;

impl SniffingClassifier {
    /// Creates the classifier.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ContentClassifier for SniffingClassifier {
    fn classify(&self, file_name: &str, head: &[u8], declared: Option<&str>) -> ContentType {
        if let Some(kind) = infer::get(head) {
            let sniffed = ContentType::from(kind.mime_type());
            if !sniffed.is_generic() {
                return sniffed;
            }
        }

        if let Some(by_ext) = type_for_extension(file_name) {
            return ContentType(Cow::Borrowed(by_ext));
        }

        if let Some(declared) = declared.map(ContentType::from)
            && !declared.is_generic()
        {
            return declared;
        }

        if looks_like_text(head) {
            return ContentType::TEXT_PLAIN;
        }

        ContentType::OCTET_STREAM
    }
}

/// Reads the head of `path` and classifies it.
///
/// A file that cannot be read is reported as `application/octet-stream`.
pub fn classify_path<C: ContentClassifier + ?Sized>(
    classifier: &C,
    path: &Path,
    file_name: &str,
    declared: Option<&str>,
) -> ContentType {
    match read_head(path) {
        Ok(head) => classifier.classify(file_name, &head, declared),
        Err(err) => {
            tracing::warn!(file = %file_name, error = %err, "unreadable stream, using octet-stream");
            ContentType::OCTET_STREAM
        }
    }
}

fn read_head(path: &Path) -> std::io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut head = Vec::with_capacity(SNIFF_LEN);
    file.take(SNIFF_LEN as u64).read_to_end(&mut head)?;
    Ok(head)
}

fn looks_like_text(head: &[u8]) -> bool {
    if head.is_empty() || head.contains(&0) {
        return false;
    }
    match std::str::from_utf8(head) {
        Ok(_) => true,
        // a multi-byte character cut off by the sniff window
        Err(e) => e.error_len().is_none(),
    }
}

fn type_for_extension(file_name: &str) -> Option<&'static str> {
    let lower = file_name.to_ascii_lowercase();
    let (_, ext) = lower.rsplit_once('.')?;
    let mime = match ext {
        "zip" => "application/zip",
        "txt" | "prj" | "cpg" => "text/plain",
        "csv" => "text/csv",
        "tsv" | "tab" => "text/tab-separated-values",
        "md" => "text/markdown",
        "xml" => "text/xml",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "shp" | "shx" => "application/x-esri-shape",
        "dbf" => "application/x-dbf",
        "r" => "type/x-r-syntax",
        "dta" => "application/x-stata",
        "sav" => "application/x-spss-sav",
        "por" => "application/x-spss-por",
        "rdata" => "application/x-rlang-transport",
        "nc" => "application/netcdf",
        "h5" | "hdf5" => "application/x-hdf5",
        "fits" => "application/fits",
        _ => return None,
    };
    Some(mime)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ZIP_MAGIC: &[u8] = b"PK\x03\x04\x14\x00\x00\x00";
    const PDF_MAGIC: &[u8] = b"%PDF-1.7\n";

    #[test]
    fn test_sniffing_beats_declared() {
        let classifier = SniffingClassifier::new();
        let ct = classifier.classify("upload.bin", ZIP_MAGIC, Some("text/plain"));
        assert_eq!(ct, ContentType::ZIP);
        assert!(ct.is_zip());
    }

    #[test]
    fn test_sniffing_beats_extension() {
        let classifier = SniffingClassifier::new();
        let ct = classifier.classify("report.txt", PDF_MAGIC, None);
        assert_eq!(ct.as_str(), "application/pdf");
    }

    #[test]
    fn test_extension_beats_declared() {
        let classifier = SniffingClassifier::new();
        let ct = classifier.classify("data.CSV", b"a,b\n1,2\n", Some("application/vnd.custom"));
        assert_eq!(ct.as_str(), "text/csv");
    }

    #[test]
    fn test_declared_used_when_inconclusive() {
        let classifier = SniffingClassifier::new();
        let ct = classifier.classify("blob", &[0x01, 0x00, 0x02], Some("application/x-custom"));
        assert_eq!(ct.as_str(), "application/x-custom");
    }

    #[test]
    fn test_generic_declared_is_ignored() {
        let classifier = SniffingClassifier::new();
        let ct = classifier.classify("notes", b"just words", Some("application/octet-stream"));
        assert_eq!(ct, ContentType::TEXT_PLAIN);
    }

    #[test]
    fn test_binary_without_hints() {
        let classifier = SniffingClassifier::new();
        let ct = classifier.classify("shape2", &[0xde, 0xad, 0x00, 0xbe, 0xef], None);
        assert_eq!(ct, ContentType::OCTET_STREAM);
        assert_eq!(classifier.classify("empty", b"", None), ContentType::OCTET_STREAM);
    }

    #[test]
    fn test_truncated_utf8_is_text() {
        let mut head = b"caf".to_vec();
        head.push(0xc3);
        assert!(looks_like_text(&head));
        assert!(!looks_like_text(&[0xff, 0xfe, 0x41]));
    }

    #[test]
    fn test_zip_family() {
        assert!(ContentType::from("application/x-zip-compressed").is_zip());
        assert!(ContentType::from("Application/ZIP; foo=bar").is_zip());
        assert!(!ContentType::ZIPPED_SHAPEFILE.is_zip());
    }

    #[test]
    fn test_classify_path_reads_head() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("staged");
        std::fs::write(&path, ZIP_MAGIC).unwrap();
        let ct = classify_path(&SniffingClassifier, &path, "upload", None);
        assert_eq!(ct, ContentType::ZIP);
    }

    #[test]
    fn test_classify_path_unreadable() {
        let ct = classify_path(
            &SniffingClassifier,
            Path::new("/nonexistent/sluice/staged"),
            "x.pdf",
            Some("application/pdf"),
        );
        assert_eq!(ct, ContentType::OCTET_STREAM);
    }
}
