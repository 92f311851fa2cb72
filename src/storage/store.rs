//! Filesystem-backed upload store
//!
//! The category directories are the only record of what has been uploaded:
//! a stored file is named `<identifier><extension>` and looked up again by
//! scanning its directory for a name starting with the identifier.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use uuid::Uuid;

use super::Category;

/// A file accepted into one of the category directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub id: String,
    pub extension: String,
    pub category: Category,
    pub path: PathBuf,
}

impl StoredFile {
    pub fn file_name(&self) -> String {
        format!("{}{}", self.id, self.extension)
    }
}

/// Upload directory layout rooted at the configured upload dir
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn category_dir(&self, category: Category) -> PathBuf {
        self.root.join(category.as_str())
    }

    /// Create the category directories if they are missing
    pub async fn ensure_layout(&self) -> io::Result<()> {
        for category in Category::ALL {
            fs::create_dir_all(self.category_dir(category)).await?;
        }
        Ok(())
    }

    /// Assign a fresh identifier and storage path for an accepted upload
    pub fn allocate(&self, category: Category, extension: &str) -> StoredFile {
        let id = Uuid::new_v4().to_string();
        let path = self
            .category_dir(category)
            .join(format!("{id}{extension}"));
        StoredFile {
            id,
            extension: extension.to_string(),
            category,
            path,
        }
    }

    /// Open the destination file for writing; never replaces an existing file
    pub async fn create(&self, stored: &StoredFile) -> io::Result<File> {
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&stored.path)
            .await
    }

    /// Delete a stored file; an already missing file is not an error
    pub async fn remove(&self, stored: &StoredFile) -> io::Result<()> {
        match fs::remove_file(&stored.path).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    /// Find the first filename in `category` starting with `prefix`.
    ///
    /// A missing category directory is treated as empty. With several
    /// matches the directory listing order decides.
    pub async fn find(&self, category: Category, prefix: &str) -> io::Result<Option<String>> {
        let mut entries = match fs::read_dir(self.category_dir(category)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(name) = name.to_str() {
                if name.starts_with(prefix) {
                    return Ok(Some(name.to_string()));
                }
            }
        }
        Ok(None)
    }

    /// Resolve an identifier across all categories, `rfp` first
    pub async fn locate(&self, prefix: &str) -> io::Result<Option<(Category, String)>> {
        for category in Category::ALL {
            if let Some(name) = self.find(category, prefix).await? {
                return Ok(Some((category, name)));
            }
        }
        Ok(None)
    }
}
