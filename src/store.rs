use chrono::Utc;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::config::{CorruptStorePolicy, StorageSettings};
use crate::domain::waitlist_email::WaitlistEmail;
use crate::domain::waitlist_entry::WaitlistEntry;

/// Durable list of waitlist signups, persisted as a pretty-printed JSON array.
///
/// Every read-modify-write goes through the internal lock, so two concurrent
/// submissions served by the same process can't overwrite each other.
/// Separate processes sharing the same file are not coordinated.
pub struct WaitlistStore {
    path: PathBuf,
    corrupt_store_policy: CorruptStorePolicy,
    lock: Mutex<()>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Accepted(WaitlistEntry),
    Duplicate,
}

#[derive(thiserror::Error)]
pub enum StoreError {
    #[error("Failed to create the data directory {}.", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to read the waitlist store {}.", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to write the waitlist store {}.", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to serialize the waitlist entries.")]
    Serialize(#[source] serde_json::Error),
    #[error("The waitlist store {} is corrupt.", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl std::fmt::Debug for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;

        if let Some(source) = std::error::Error::source(self) {
            write!(f, "\nCaused by:\n\t{}", source)?;
        }

        Ok(())
    }
}

enum Snapshot {
    Entries(Vec<WaitlistEntry>),
    Corrupt {
        contents: Vec<u8>,
        source: serde_json::Error,
    },
}

impl WaitlistStore {
    pub fn new(settings: &StorageSettings) -> WaitlistStore {
        WaitlistStore {
            path: settings.get_file_path(),
            corrupt_store_policy: settings.corrupt_store_policy,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `email` unless an entry with exactly the same address exists.
    #[tracing::instrument(
        name = "Adding an email to the waitlist store",
        skip(self, email),
        fields(email = %email, store = %self.path.display())
    )]
    pub async fn submit(&self, email: WaitlistEmail) -> Result<SubmitOutcome, StoreError> {
        let _guard = self.lock.lock().await;

        self.ensure_parent_dir().await?;

        let mut entries = match self.read_snapshot().await? {
            Snapshot::Entries(entries) => entries,
            Snapshot::Corrupt { contents, source } => {
                self.recover_from_corruption(contents, source).await?
            }
        };

        if entries.iter().any(|entry| entry.email == email.as_ref()) {
            tracing::info!("Email is already on the waitlist");
            return Ok(SubmitOutcome::Duplicate);
        }

        let entry = WaitlistEntry::new(email);
        entries.push(entry.clone());
        self.persist(&entries).await?;

        tracing::info!(total = entries.len(), "Email added to the waitlist");

        Ok(SubmitOutcome::Accepted(entry))
    }

    /// Current entries in insertion order. Never writes to disk.
    pub async fn load(&self) -> Result<Vec<WaitlistEntry>, StoreError> {
        let _guard = self.lock.lock().await;

        match self.read_snapshot().await? {
            Snapshot::Entries(entries) => Ok(entries),
            Snapshot::Corrupt { source, .. } => match self.corrupt_store_policy {
                CorruptStorePolicy::Reset => {
                    tracing::warn!(error = %source, "Waitlist store is corrupt, reading it as empty");
                    Ok(Vec::new())
                }
                CorruptStorePolicy::Reject => Err(StoreError::Corrupt {
                    path: self.path.clone(),
                    source,
                }),
            },
        }
    }

    // `file_name` may itself contain directories, so this is not always `data_dir`
    async fn ensure_parent_dir(&self) -> Result<(), StoreError> {
        let Some(parent) = self.parent_dir() else {
            return Ok(());
        };

        fs::create_dir_all(parent)
            .await
            .map_err(|source| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })
    }

    async fn read_snapshot(&self) -> Result<Snapshot, StoreError> {
        let contents = match fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(Snapshot::Entries(Vec::new()))
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        match serde_json::from_slice(&contents) {
            Ok(entries) => Ok(Snapshot::Entries(entries)),
            Err(source) => Ok(Snapshot::Corrupt { contents, source }),
        }
    }

    #[tracing::instrument(name = "Recovering from a corrupt waitlist store", skip(self, contents))]
    async fn recover_from_corruption(
        &self,
        contents: Vec<u8>,
        source: serde_json::Error,
    ) -> Result<Vec<WaitlistEntry>, StoreError> {
        if self.corrupt_store_policy == CorruptStorePolicy::Reject {
            tracing::error!("Refusing to overwrite a corrupt waitlist store");
            return Err(StoreError::Corrupt {
                path: self.path.clone(),
                source,
            });
        }

        // An empty file has nothing worth keeping
        if contents.iter().all(u8::is_ascii_whitespace) {
            tracing::warn!("Waitlist store is empty, starting a new list");
            return Ok(Vec::new());
        }

        let backup_path = self.backup_path();
        fs::write(&backup_path, &contents)
            .await
            .map_err(|source| StoreError::Write {
                path: backup_path.clone(),
                source,
            })?;

        tracing::warn!(
            backup = %backup_path.display(),
            "Waitlist store is corrupt, starting a new list"
        );

        Ok(Vec::new())
    }

    // The new contents go to a sibling file first and replace the store with a
    // rename, so readers never see a half-written document. The directory is
    // synced afterwards so the rename itself survives a power loss.
    async fn persist(&self, entries: &[WaitlistEntry]) -> Result<(), StoreError> {
        let contents = serde_json::to_vec_pretty(entries).map_err(StoreError::Serialize)?;
        let tmp_path = self.sibling_path("tmp");

        let write_err = |source: io::Error| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        let mut file = fs::File::create(&tmp_path).await.map_err(write_err)?;
        file.write_all(&contents).await.map_err(write_err)?;
        file.sync_all().await.map_err(write_err)?;
        drop(file);

        fs::rename(&tmp_path, &self.path).await.map_err(write_err)?;

        self.sync_parent_dir().await.map_err(write_err)
    }

    #[cfg(unix)]
    async fn sync_parent_dir(&self) -> io::Result<()> {
        // A bare file name lives in the working directory
        let parent = self.parent_dir().unwrap_or_else(|| Path::new("."));

        fs::File::open(parent).await?.sync_all().await
    }

    // Directories can't be opened as files on other platforms
    #[cfg(not(unix))]
    async fn sync_parent_dir(&self) -> io::Result<()> {
        Ok(())
    }

    fn parent_dir(&self) -> Option<&Path> {
        self.path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
    }

    fn backup_path(&self) -> PathBuf {
        let suffix = format!("corrupt-{}", Utc::now().format("%Y%m%dT%H%M%S%.3fZ"));

        self.sibling_path(&suffix)
    }

    fn sibling_path(&self, suffix: &str) -> PathBuf {
        let mut file_name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        file_name.push(".");
        file_name.push(suffix);

        self.path.with_file_name(file_name)
    }
}
