// ── JSON file store ──
//
// One JSON document mapping domain -> record. Every mutation rewrites the
// whole document through a sibling temp file and a rename, so readers
// never observe a half-written state.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::SiteStore;
use crate::error::StoreError;
use crate::model::{Domain, SiteRecord};

type Document = BTreeMap<Domain, SiteRecord>;

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(path: &Path, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn read(&self) -> Result<Document, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Document::new()),
            Err(e) => return Err(Self::io_error(&self.path, e)),
        };
        if text.trim().is_empty() {
            return Ok(Document::new());
        }
        serde_json::from_str(&text).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn write(&self, document: &Document) -> Result<(), StoreError> {
        let path = self.path.as_path();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Self::io_error(parent, e))?;
        }

        let tmp = tmp_write_path(path);
        let written = (|| -> Result<(), StoreError> {
            let file = File::create(&tmp).map_err(|e| Self::io_error(&tmp, e))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, document).map_err(|source| {
                StoreError::Corrupt {
                    path: tmp.clone(),
                    source,
                }
            })?;
            writer.write_all(b"\n").map_err(|e| Self::io_error(&tmp, e))?;
            let file = writer
                .into_inner()
                .map_err(|e| Self::io_error(&tmp, e.into_error()))?;
            file.sync_all().map_err(|e| Self::io_error(&tmp, e))
        })();

        if let Err(error) = written {
            let _ = fs::remove_file(&tmp);
            return Err(error);
        }
        fs::rename(&tmp, path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            Self::io_error(path, e)
        })?;
        debug!(path = %path.display(), records = document.len(), "site store written");
        Ok(())
    }
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_os_string();
    name.push(format!(".tmp-{}", std::process::id()));
    PathBuf::from(name)
}

impl SiteStore for JsonFileStore {
    fn load(&self, domain: &Domain) -> Result<Option<SiteRecord>, StoreError> {
        Ok(self.read()?.remove(domain))
    }

    fn list(&self) -> Result<Vec<SiteRecord>, StoreError> {
        Ok(self.read()?.into_values().collect())
    }

    fn save(&self, record: &SiteRecord) -> Result<(), StoreError> {
        let mut document = self.read()?;
        document.insert(record.domain.clone(), record.clone());
        self.write(&document)
    }

    fn delete(&self, domain: &Domain) -> Result<bool, StoreError> {
        let mut document = self.read()?;
        let removed = document.remove(domain).is_some();
        if removed {
            self.write(&document)?;
        }
        Ok(removed)
    }
}
