//! Application state management.

use ntix_core::file_name::FileName;
use ntix_core::{Config, DumpRecord, IndexEntry, NtfsIndex};
use std::path::{Path, PathBuf};
use tracing::info;

/// Shared application state.
pub struct App {
    /// Configuration
    pub config: Config,

    /// The index read from the dumps
    pub index: NtfsIndex<DumpRecord>,
}

impl App {
    /// Open the dumped index attributes.
    pub fn open(config: Config, root: &Path, allocation: &[PathBuf]) -> anyhow::Result<Self> {
        let record = DumpRecord::open(
            config.index.name.clone(),
            root,
            allocation,
            config.volume.cluster_size,
        )?;
        let index = NtfsIndex::new(record, config.index.name.clone());

        info!(
            root = %root.display(),
            extents = allocation.len(),
            cluster_size = config.volume.cluster_size,
            index = %config.index.name,
            "Index opened"
        );

        Ok(App { config, index })
    }
}

/// One listed entry, with its key decoded when it is a file name.
pub struct Listing {
    pub entry: IndexEntry,
    pub file_name: Option<FileName>,
}

impl Listing {
    pub fn new(entry: IndexEntry) -> Self {
        let file_name = if entry.is_last_index_entry_in_subnode() || entry.content_size() == 0 {
            None
        } else {
            FileName::from_entry(&entry).ok()
        };
        Listing { entry, file_name }
    }

    /// Display name: the file name, or a marker for keys that are not names
    pub fn display_name(&self) -> String {
        match &self.file_name {
            Some(name) => name.name(),
            None if self.entry.is_last_index_entry_in_subnode() => "<end>".to_string(),
            None => format!("<{} byte key>", self.entry.content_size()),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let entry = &self.entry;
        let mut value = serde_json::json!({
            "record": entry.file_reference_number(),
            "sequence": entry.file_reference().sequence_number(),
            "flags": entry.index_flags().bits(),
            "subnode_vcn": entry.subnode_vcn().map(|v| v.value()),
            "sentinel": entry.is_last_index_entry_in_subnode(),
        });

        if let Some(name) = &self.file_name {
            value["name"] = serde_json::json!(name.name());
            value["parent"] = serde_json::json!(name.parent.record_number());
            value["is_dir"] = serde_json::json!(name.is_directory());
            value["size"] = serde_json::json!(name.real_size);
            value["modified"] = serde_json::json!(name.modified.map(|t| t.to_rfc3339()));
        }
        value
    }

    /// One line of text output
    pub fn to_text(&self) -> String {
        let entry = &self.entry;
        let child = entry
            .subnode_vcn()
            .map(|v| format!(" -> {}", v))
            .unwrap_or_default();

        match &self.file_name {
            Some(name) => {
                let kind = if name.is_directory() { "d" } else { "-" };
                let modified = name
                    .modified
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".to_string());
                format!(
                    "{} {:>12} {} {:>10} {}{}",
                    kind,
                    name.real_size,
                    modified,
                    entry.file_reference(),
                    name.name(),
                    child
                )
            }
            None => format!("{:>60}{}", self.display_name(), child),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// `$FILE_NAME` key for a file in the root directory.
    fn file_name_key(name: &str, namespace: u8, attributes: u32, size: u64) -> Vec<u8> {
        let units: Vec<u16> = name.encode_utf16().collect();
        let mut key = vec![0u8; 0x42 + units.len() * 2];
        key[0x00..0x08].copy_from_slice(&5u64.to_le_bytes());
        // 2024-01-01T00:00:00Z as a FILETIME
        key[0x10..0x18].copy_from_slice(&133_485_408_000_000_000i64.to_le_bytes());
        key[0x30..0x38].copy_from_slice(&size.to_le_bytes());
        key[0x38..0x3C].copy_from_slice(&attributes.to_le_bytes());
        key[0x40] = units.len() as u8;
        key[0x41] = namespace;
        for (i, unit) in units.iter().enumerate() {
            key[0x42 + i * 2..0x44 + i * 2].copy_from_slice(&unit.to_le_bytes());
        }
        key
    }

    fn entry_bytes(record: u64, key: &[u8], flags: u8) -> Vec<u8> {
        let size = (0x10 + key.len() + 7) & !7;
        let mut entry = vec![0u8; size];
        entry[0..8].copy_from_slice(&record.to_le_bytes());
        entry[8..10].copy_from_slice(&(size as u16).to_le_bytes());
        entry[10..12].copy_from_slice(&(key.len() as u16).to_le_bytes());
        entry[12] = flags;
        entry[0x10..0x10 + key.len()].copy_from_slice(key);
        entry
    }

    /// A root-only directory index holding `readme.txt`, its 8.3 alias and `docs`.
    fn root_dump() -> Vec<u8> {
        let mut entries = Vec::new();
        entries.extend(entry_bytes(40, &file_name_key("docs", 1, 0x1000_0000, 0), 0));
        entries.extend(entry_bytes(41, &file_name_key("README~1.TXT", 2, 0x20, 12), 0));
        entries.extend(entry_bytes(41, &file_name_key("readme.txt", 1, 0x20, 12), 0));
        entries.extend(entry_bytes(0, &[], 0x02));

        let used = (0x10 + entries.len()) as u32;
        let mut root = vec![0u8; 0x10];
        root[0..4].copy_from_slice(&0x30u32.to_le_bytes());
        root[4..8].copy_from_slice(&1u32.to_le_bytes());
        root[8..12].copy_from_slice(&4096u32.to_le_bytes());
        root[12] = 1;
        root.extend_from_slice(&0x10u32.to_le_bytes());
        root.extend_from_slice(&used.to_le_bytes());
        root.extend_from_slice(&used.to_le_bytes());
        root.extend_from_slice(&[0u8; 4]);
        root.extend(entries);
        root
    }

    fn open_app(dir: &TempDir) -> App {
        let root_path = dir.path().join("root.bin");
        fs::write(&root_path, root_dump()).unwrap();
        App::open(Config::default(), &root_path, &[]).unwrap()
    }

    #[test]
    fn test_open_and_list_root_only_dump() {
        let dir = TempDir::new().unwrap();
        let app = open_app(&dir);

        assert!(app.index.allocation().unwrap().is_none());
        let listings: Vec<Listing> = app
            .index
            .iter()
            .unwrap()
            .map(|entry| Listing::new(entry.unwrap()))
            .collect();

        let names: Vec<String> = listings.iter().map(Listing::display_name).collect();
        assert_eq!(names, vec!["docs", "README~1.TXT", "readme.txt", "<end>"]);
        assert!(listings[0].file_name.as_ref().unwrap().is_directory());
        assert!(listings[1].file_name.as_ref().unwrap().is_dos_only());
        assert!(listings[3].file_name.is_none());
    }

    #[test]
    fn test_listing_json() {
        let dir = TempDir::new().unwrap();
        let app = open_app(&dir);

        let entry = app.index.iter().unwrap().nth(2).unwrap().unwrap();
        let json = Listing::new(entry).to_json();

        assert_eq!(json["name"], "readme.txt");
        assert_eq!(json["record"], 41);
        assert_eq!(json["size"], 12);
        assert_eq!(json["is_dir"], false);
        assert_eq!(json["sentinel"], false);
        assert_eq!(json["modified"], "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_missing_root_dump_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.bin");
        assert!(App::open(Config::default(), &missing, &[]).is_err());
    }
}
