use std::io::{Cursor, Read};

use crate::error::ExpandError;
use crate::model::chain::FileType;
use crate::model::{ExpandedEntry, FetchedFile};
use crate::utils::hashing::sha256_hex;

/// Turns one fetched file into its parseable entries (§4.3 "Expand"). A
/// non-ZIP file passes through as a single entry; a ZIP fans out into one
/// entry per surviving subentry. Directory markers and `__MACOSX/` junk
/// are dropped.
pub fn expand(fetched: &FetchedFile) -> Result<Vec<ExpandedEntry>, ExpandError> {
    if fetched.discovered.file_type != FileType::Zip {
        return Ok(vec![ExpandedEntry {
            filename: fetched.discovered.filename.clone(),
            file_type: fetched.discovered.file_type,
            content: fetched.content.clone(),
            hash: fetched.content_hash.clone(),
            parent_discovered: fetched.discovered.clone(),
        }]);
    }

    let cursor = Cursor::new(&fetched.content);
    let mut archive = zip::ZipArchive::new(cursor).map_err(|source| ExpandError::Archive {
        filename: fetched.discovered.filename.clone(),
        source,
    })?;

    let mut entries = Vec::new();
    for index in 0..archive.len() {
        let mut file = archive.by_index(index).map_err(|source| ExpandError::Archive {
            filename: fetched.discovered.filename.clone(),
            source,
        })?;
        let name = file.name().to_string();
        if name.ends_with('/') || name.starts_with("__MACOSX") {
            continue;
        }

        let mut content = Vec::new();
        file.read_to_end(&mut content).map_err(|source| ExpandError::Entry {
            filename: fetched.discovered.filename.clone(),
            entry: name.clone(),
            source,
        })?;
        let hash = sha256_hex(&content);
        let file_type = FileType::from_filename(&name).unwrap_or(fetched.discovered.file_type);

        entries.push(ExpandedEntry {
            filename: name,
            file_type,
            content,
            hash,
            parent_discovered: fetched.discovered.clone(),
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use chrono::Utc;

    use super::*;
    use crate::model::DiscoveredFile;

    fn zipped(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buffer = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(Cursor::new(&mut buffer));
            let options = zip::write::SimpleFileOptions::default();
            for (name, content) in entries {
                writer.start_file(*name, options).unwrap();
                writer.write_all(content).unwrap();
            }
            writer.finish().unwrap();
        }
        buffer
    }

    fn fetched(content: Vec<u8>, file_type: FileType) -> FetchedFile {
        FetchedFile {
            discovered: DiscoveredFile {
                url: "https://example.test/a.zip".to_string(),
                filename: "a.zip".to_string(),
                file_type,
                size: None,
                last_modified: Some(Utc::now()),
                metadata: Default::default(),
            },
            content,
            content_hash: "deadbeef".to_string(),
        }
    }

    #[test]
    fn non_zip_files_pass_through_as_a_single_entry() {
        let file = fetched(b"name,price\nKruh,1999\n".to_vec(), FileType::Csv);
        let entries = expand(&file).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].filename, "a.zip");
        assert_eq!(entries[0].file_type, FileType::Csv);
    }

    #[test]
    fn zip_fans_out_and_drops_macosx_and_directory_entries() {
        let bytes = zipped(&[
            ("a.csv", b"name,price\nKruh,1999\n"),
            ("b.csv", b"name,price\nMlijeko,899\n"),
            ("__MACOSX/a.csv", b"junk"),
            ("subdir/", b""),
        ]);
        let file = fetched(bytes, FileType::Zip);
        let entries = expand(&file).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.filename.as_str()).collect();
        assert_eq!(names, vec!["a.csv", "b.csv"]);
        assert!(entries.iter().all(|e| e.file_type == FileType::Csv));
    }
}
