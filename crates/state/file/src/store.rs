use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use paygate_state::error::StateError;
use paygate_state::key::StateKey;
use paygate_state::store::StateStore;

/// [`StateStore`] persisted as a single JSON object on disk.
///
/// The whole map is held in memory and the file is rewritten after every
/// mutation. Writes go to a sibling temporary file which is then renamed
/// over the target, so a crash never leaves a half-written document.
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    data: Mutex<BTreeMap<String, String>>,
}

impl FileStateStore {
    /// Open the store at `path`, loading existing contents if the file exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StateError> {
        let path = path.into();
        let data = match fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                StateError::Serialization(format!("{}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StateError::Io(e)),
        };

        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, data: &BTreeMap<String, String>) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(data)
            .map_err(|e| StateError::Serialization(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl StateStore for FileStateStore {
    fn get(&self, key: &StateKey) -> Result<Option<String>, StateError> {
        Ok(self.data.lock().get(&key.canonical()).cloned())
    }

    fn set(&self, key: &StateKey, value: &str) -> Result<(), StateError> {
        let mut data = self.data.lock();
        data.insert(key.canonical(), value.to_owned());
        self.persist(&data)
    }

    fn delete(&self, key: &StateKey) -> Result<bool, StateError> {
        let mut data = self.data.lock();
        let existed = data.remove(&key.canonical()).is_some();
        if existed {
            self.persist(&data)?;
        }
        Ok(existed)
    }

    fn clear(&self) -> Result<(), StateError> {
        let mut data = self.data.lock();
        data.clear();
        self.persist(&data)
    }
}
