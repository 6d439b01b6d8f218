use memmap2::Mmap;
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use tracing::trace;
use zip::ZipArchive;

use crate::errors::{SearchError, SearchResult};

/// A regular file decoded from a zip archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFile {
    /// Entry name, i.e. the path relative to the search root
    pub path: String,
    pub data: Vec<u8>,
}

/// The decoded contents of a zip archive, in archive order.
///
/// Used where every file is needed anyway (the regex search); batch structural
/// searches instead read single entries on demand with [`read_entry`].
#[derive(Debug, Clone, Default)]
pub struct ZipFile {
    files: Vec<ArchiveFile>,
}

impl ZipFile {
    /// Memory-maps the archive at `path` and decodes every regular file
    pub fn open(path: &Path) -> SearchResult<Self> {
        let file = File::open(path)?;
        // The archive is only read while mapped and is not modified concurrently.
        let mmap = unsafe { Mmap::map(&file) }?;
        let zip_file = Self::from_reader(Cursor::new(&mmap[..]))?;
        trace!(
            "Decoded {} files from {}",
            zip_file.files.len(),
            path.display()
        );
        Ok(zip_file)
    }

    /// Decodes every regular file from an in-memory or on-disk zip stream
    pub fn from_reader<R: Read + Seek>(reader: R) -> SearchResult<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let mut files = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            if entry.is_dir() {
                continue;
            }
            let mut data = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut data)?;
            files.push(ArchiveFile {
                path: entry.name().to_string(),
                data,
            });
        }
        Ok(Self { files })
    }

    pub fn files(&self) -> &[ArchiveFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Reads the full content of the entry named `path`
pub fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> SearchResult<Vec<u8>> {
    let mut entry = archive
        .by_name(path)
        .map_err(|e| SearchError::archive_error(format!("{}: {}", path, e)))?;
    let mut data = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut data)?;
    Ok(data)
}

/// One file of a streamed search input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TarEntry {
    /// Path relative to the search root; becomes the tar header name
    pub path: String,
    pub content: Vec<u8>,
    /// Unix permission bits for the header
    pub mode: u32,
}

impl TarEntry {
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            mode: 0o644,
        }
    }
}

/// Appends `entry` (header and content) to a tar stream
pub fn append_tar_entry<W: Write>(builder: &mut tar::Builder<W>, entry: &TarEntry) -> std::io::Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(entry.content.len() as u64);
    header.set_mode(entry.mode);
    header.set_mtime(0);
    builder.append_data(&mut header, &entry.path, entry.content.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::FileOptions;

    fn build_zip(files: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .add_directory("src/", FileOptions::default())
            .unwrap();
        for (name, content) in files {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_zip_file_skips_directories_and_keeps_order() {
        let bytes = build_zip(&[("src/b.go", "package b\n"), ("src/a.go", "package a\n")]);
        let zip = ZipFile::from_reader(Cursor::new(bytes)).unwrap();

        let paths: Vec<&str> = zip.files().iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["src/b.go", "src/a.go"]);
        assert_eq!(zip.files()[1].data, b"package a\n");
        assert_eq!(zip.len(), 2);
    }

    #[test]
    fn test_zip_file_open_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("repo.zip");
        std::fs::write(&path, build_zip(&[("main.rs", "fn main() {}\n")])).unwrap();

        let zip = ZipFile::open(&path).unwrap();
        assert_eq!(zip.files()[0].path, "main.rs");
    }

    #[test]
    fn test_open_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("not-a.zip");
        std::fs::write(&path, b"definitely not a zip archive").unwrap();
        assert!(ZipFile::open(&path).is_err());
    }

    #[test]
    fn test_read_entry() {
        let bytes = build_zip(&[("a.txt", "hello\n")]);
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(read_entry(&mut archive, "a.txt").unwrap(), b"hello\n");

        let err = read_entry(&mut archive, "missing.txt").unwrap_err();
        assert!(err.to_string().contains("missing.txt"));
    }

    #[test]
    fn test_tar_entries_round_trip_through_reader() {
        let mut builder = tar::Builder::new(Vec::new());
        append_tar_entry(&mut builder, &TarEntry::new("dir/a.py", "print(1)\n")).unwrap();
        append_tar_entry(&mut builder, &TarEntry::new("b.py", Vec::new())).unwrap();
        let bytes = builder.into_inner().unwrap();

        let mut archive = tar::Archive::new(bytes.as_slice());
        let mut seen = Vec::new();
        for entry in archive.entries().unwrap() {
            let mut entry = entry.unwrap();
            let path = entry.path().unwrap().to_string_lossy().into_owned();
            let mut content = String::new();
            entry.read_to_string(&mut content).unwrap();
            seen.push((path, content));
        }
        assert_eq!(
            seen,
            vec![
                ("dir/a.py".to_string(), "print(1)\n".to_string()),
                ("b.py".to_string(), String::new()),
            ]
        );
    }
}
