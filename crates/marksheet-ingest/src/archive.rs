use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;

use crate::{DocumentKind, IngestError, PDF_MAGIC};

/// A document unpacked from a bundle into a scratch directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundledDocument {
    /// Where the document was written.
    pub path: PathBuf,
    /// Path of the entry inside the bundle.
    pub name: String,
}

/// Returns true if the given path looks like a supported bundle.
pub fn is_archive_path(path: &Path) -> bool {
    DocumentKind::from_path(path) == Some(DocumentKind::Archive)
}

/// Unpack the PDF and text documents of a zip or tar.gz bundle into `dir`.
///
/// The format is detected by extension, then by magic bytes. Directories,
/// hidden files, `__MACOSX` resource forks, unsupported types and `.pdf`
/// entries without a PDF header are skipped. Documents are returned sorted
/// by their name inside the bundle.
pub fn expand_archive(archive_path: &Path, dir: &Path) -> Result<Vec<BundledDocument>, IngestError> {
    let data = std::fs::read(archive_path).map_err(|source| IngestError::Io {
        path: archive_path.to_path_buf(),
        source,
    })?;

    let name = archive_path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let mut sink = EntrySink::new(dir);
    if name.ends_with(".zip") || data.starts_with(b"PK") {
        read_zip(&data, &mut sink)?;
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") || data.starts_with(&[0x1f, 0x8b]) {
        read_tar_gz(&data, &mut sink)?;
    } else {
        return Err(IngestError::Archive(format!(
            "unsupported bundle format: {}",
            archive_path.display()
        )));
    }

    let mut docs = sink.docs;
    docs.sort_by(|a, b| a.name.cmp(&b.name));
    tracing::debug!(bundle = %archive_path.display(), documents = docs.len(), "expanded bundle");
    Ok(docs)
}

/// Filters bundle entries and writes the accepted ones to disk.
struct EntrySink<'a> {
    dir: &'a Path,
    docs: Vec<BundledDocument>,
}

impl<'a> EntrySink<'a> {
    fn new(dir: &'a Path) -> Self {
        Self {
            dir,
            docs: Vec::new(),
        }
    }

    fn wants(&self, name: &Path) -> bool {
        if name.to_string_lossy().contains("__MACOSX") {
            return false;
        }
        if name
            .file_name()
            .is_none_or(|f| f.to_string_lossy().starts_with('.'))
        {
            return false;
        }
        matches!(
            DocumentKind::from_path(name),
            Some(DocumentKind::Pdf | DocumentKind::Text)
        )
    }

    fn accept(&mut self, name: &Path, data: &[u8]) -> Result<(), IngestError> {
        let entry_name = name.to_string_lossy().to_string();
        if DocumentKind::from_path(name) == Some(DocumentKind::Pdf) && !data.starts_with(PDF_MAGIC) {
            tracing::debug!(entry = %entry_name, "skipping bundle entry without a PDF header");
            return Ok(());
        }

        // Flatten into the scratch dir; the index keeps same-named entries apart.
        let basename = name
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let out_path = self.dir.join(format!("{}_{}", self.docs.len(), basename));
        std::fs::write(&out_path, data).map_err(|source| IngestError::Io {
            path: out_path.clone(),
            source,
        })?;

        self.docs.push(BundledDocument {
            path: out_path,
            name: entry_name,
        });
        Ok(())
    }
}

fn read_zip(data: &[u8], sink: &mut EntrySink<'_>) -> Result<(), IngestError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))
        .map_err(|e| IngestError::Archive(format!("failed to open zip: {e}")))?;

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| IngestError::Archive(format!("failed to read zip entry: {e}")))?;
        if file.is_dir() {
            continue;
        }
        // Entries escaping the bundle root have no enclosed name.
        let Some(name) = file.enclosed_name().map(|p| p.to_path_buf()) else {
            continue;
        };
        if !sink.wants(&name) {
            continue;
        }

        let mut buf = Vec::new();
        file.read_to_end(&mut buf).map_err(|e| {
            IngestError::Archive(format!("failed to extract {}: {e}", name.display()))
        })?;
        sink.accept(&name, &buf)?;
    }
    Ok(())
}

fn read_tar_gz(data: &[u8], sink: &mut EntrySink<'_>) -> Result<(), IngestError> {
    let mut archive = Archive::new(GzDecoder::new(data));
    let entries = archive
        .entries()
        .map_err(|e| IngestError::Archive(format!("failed to read tar.gz: {e}")))?;

    for entry in entries {
        let mut entry =
            entry.map_err(|e| IngestError::Archive(format!("failed to read tar entry: {e}")))?;
        if entry.header().entry_type().is_dir() {
            continue;
        }
        let name = entry
            .path()
            .map_err(|e| IngestError::Archive(format!("bad tar entry path: {e}")))?
            .to_path_buf();
        if name.is_absolute() || name.components().any(|c| c == Component::ParentDir) {
            continue;
        }
        if !sink.wants(&name) {
            continue;
        }

        let mut buf = Vec::new();
        entry.read_to_end(&mut buf).map_err(|e| {
            IngestError::Archive(format!("failed to extract {}: {e}", name.display()))
        })?;
        sink.accept(&name, &buf)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SHEET: &[u8] = b"Roll No: 1\nCandidate Name: A B\n184 ENGLISH 080 A2\n";

    fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            let options = zip::write::SimpleFileOptions::default();
            writer.add_directory("sheets/", options).unwrap();
            for (name, data) in entries {
                writer.start_file(*name, options).unwrap();
                writer.write_all(data).unwrap();
            }
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    fn tar_gz_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn test_is_archive_path() {
        assert!(is_archive_path(Path::new("batch.ZIP")));
        assert!(is_archive_path(Path::new("batch.tar.gz")));
        assert!(is_archive_path(Path::new("batch.tgz")));
        assert!(!is_archive_path(Path::new("sheet.pdf")));
        assert!(!is_archive_path(Path::new("archive.gz")));
    }

    #[test]
    fn test_expand_zip_filters_entries() {
        let scratch = tempfile::tempdir().unwrap();
        let bundle = scratch.path().join("batch.zip");
        std::fs::write(
            &bundle,
            zip_bytes(&[
                ("sheets/b_section.txt", SHEET),
                ("sheets/a_section.pdf", b"%PDF-1.7 fake body"),
                ("sheets/not_really.pdf", b"<html>"),
                ("__MACOSX/sheets/._a_section.pdf", b"%PDF-"),
                ("sheets/.hidden.txt", SHEET),
                ("sheets/readme.md", b"notes"),
            ]),
        )
        .unwrap();

        let out = scratch.path().join("out");
        std::fs::create_dir(&out).unwrap();
        let docs = expand_archive(&bundle, &out).unwrap();
        let names: Vec<_> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["sheets/a_section.pdf", "sheets/b_section.txt"]);
        for doc in &docs {
            assert!(doc.path.starts_with(&out));
            assert!(doc.path.exists());
        }
        let text_doc = &docs[1];
        assert_eq!(std::fs::read(&text_doc.path).unwrap(), SHEET);
    }

    #[test]
    fn test_expand_tar_gz() {
        let scratch = tempfile::tempdir().unwrap();
        let bundle = scratch.path().join("batch.tgz");
        std::fs::write(
            &bundle,
            tar_gz_bytes(&[("x/sheet.txt", SHEET), ("x/skip.csv", b"a,b")]),
        )
        .unwrap();

        let docs = expand_archive(&bundle, scratch.path()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].name, "x/sheet.txt");
    }

    #[test]
    fn test_unsupported_bundle() {
        let scratch = tempfile::tempdir().unwrap();
        let bundle = scratch.path().join("batch.zip");
        std::fs::write(&bundle, b"definitely not a zip").unwrap();
        assert!(matches!(
            expand_archive(&bundle, scratch.path()),
            Err(IngestError::Archive(_))
        ));

        let missing = scratch.path().join("missing.zip");
        assert!(matches!(
            expand_archive(&missing, scratch.path()),
            Err(IngestError::Io { .. })
        ));
    }
}
