//! JSON file backed entity store

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use parking_lot::Mutex;
use tracing::debug;

use entregas_types::{EntityKind, Result};

use crate::tables::Tables;
use crate::EntityStore;

const STORE_FILE: &str = "entregas.json";
const LOCK_FILE: &str = "entregas.lock";

/// Entity store persisted to a single JSON file.
///
/// Every transaction holds an exclusive lock on `entregas.lock` (reads hold a
/// shared one), reloads the tables from disk under it and runs against a
/// snapshot. The snapshot replaces the file only when the transaction
/// succeeds, so handles in other processes never overwrite each other.
pub struct JsonStore {
    store_path: Option<PathBuf>,
    lock_path: Option<PathBuf>,
    tables: Mutex<Tables>,
}

impl JsonStore {
    /// Create or load a store in `store_dir`
    pub fn open(store_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&store_dir)?;
        let store_path = store_dir.join(STORE_FILE);
        let lock_path = store_dir.join(LOCK_FILE);

        let tables = {
            let _lock = lock_file(&lock_path, false)?;
            load(&store_path)?
        };

        debug!(path = %store_path.display(), "opened entity store");
        Ok(Self {
            store_path: Some(store_path),
            lock_path: Some(lock_path),
            tables: Mutex::new(tables),
        })
    }

    /// Store that never touches the disk
    pub fn in_memory() -> Self {
        Self {
            store_path: None,
            lock_path: None,
            tables: Mutex::new(Tables::default()),
        }
    }

    /// Path of the backing file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.store_path.as_deref()
    }

    /// Number of records per entity type
    pub fn counts(&self) -> Result<BTreeMap<EntityKind, usize>> {
        self.read(|tables| Ok(tables.counts()))
    }

    /// Take the file lock and bring `tables` up to date with the disk
    fn sync(&self, tables: &mut Tables, exclusive: bool) -> Result<Option<File>> {
        let (Some(store_path), Some(lock_path)) = (&self.store_path, &self.lock_path) else {
            return Ok(None);
        };
        let lock = lock_file(lock_path, exclusive)?;
        *tables = load(store_path)?;
        Ok(Some(lock))
    }

    fn save(&self, tables: &Tables) -> Result<()> {
        let Some(path) = &self.store_path else {
            return Ok(());
        };

        // Compact: the importer commits once per row
        let tmp_path = path.with_extension("json.tmp");
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, tables)?;
            writer.flush()?;
        }
        fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

/// Open the lock file and block until the lock is held. Dropping the file
/// releases it.
fn lock_file(path: &Path, exclusive: bool) -> Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    if exclusive {
        FileExt::lock_exclusive(&file)?;
    } else {
        FileExt::lock_shared(&file)?;
    }
    Ok(file)
}

fn load(path: &Path) -> Result<Tables> {
    if !path.exists() {
        return Ok(Tables::default());
    }
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

impl EntityStore for JsonStore {
    type Tx = Tables;

    fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Tables) -> Result<T>,
    {
        let mut live = self.tables.lock();
        let _lock = self.sync(&mut live, true)?;
        let mut working = live.clone();

        let output = f(&mut working)?;

        self.save(&working)?;
        *live = working;
        debug!("committed transaction");
        Ok(output)
    }

    fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Tables) -> Result<T>,
    {
        let mut live = self.tables.lock();
        let _lock = self.sync(&mut live, false)?;
        f(&live)
    }
}
