use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::KvsEngine;
use crate::{Command, IntoOperation, KvsError, Operation, Result};

/// The `KvStore` stores string key/value pairs.
///
/// Every `set` and `delete` executed with `persist` is appended to a command
/// log before it is applied to the in-memory map. Opening a store replays the
/// log from an empty map, so the map is always derivable from the log.
///
/// Example:
///
/// ```rust
/// # use logkv::{KvStore, KvsEngine, Result};
/// # fn try_main() -> Result<()> {
/// # let dir = tempfile::TempDir::new()?;
/// let mut store = KvStore::open(dir.path().join("commands.log"))?;
/// assert_eq!(store.execute("set key value", true)?, "set key to value");
/// assert_eq!(store.execute("get key", true)?, "value");
/// # Ok(())
/// # }
/// # try_main().unwrap();
/// ```
pub struct KvStore {
    database: BTreeMap<String, String>,
    log: CommandLog,
}

impl KvStore {
    /// Opens a `KvStore` backed by the log file at `log_path`.
    ///
    /// The file and its parent directories are created if missing.
    ///
    /// # Error
    ///
    /// It propagates I/O errors and `KvsError::CorruptLog` from the replay.
    pub fn open(log_path: impl Into<PathBuf>) -> Result<KvStore> {
        let log = CommandLog::open(log_path)?;
        let mut store = KvStore {
            database: BTreeMap::new(),
            log,
        };
        store.recover()?;
        Ok(store)
    }

    fn recover(&mut self) -> Result<()> {
        info!("Loading database from {}", self.log.path().display());
        let entries = self.log.load()?;
        let replayed = entries.len();
        for op in entries {
            let shown = op.to_string();
            if let Err(e) = self.execute(op, false) {
                warn!("Skipping log entry {}: {}", shown, e);
            }
        }
        info!(
            "Database loaded: {} entries replayed, {} keys",
            replayed,
            self.database.len()
        );
        Ok(())
    }

    /// Gets the string value of a given string key.
    ///
    /// # Error
    ///
    /// It returns `KvsError::KeyNotFound` if the given key is not found.
    pub fn get(&self, key: &str) -> Result<String> {
        self.database
            .get(key)
            .cloned()
            .ok_or_else(|| KvsError::KeyNotFound(key.to_owned()))
    }

    /// Sets the value of a string key to a string, in memory only.
    ///
    /// If the key already exists, the previous value will be overwritten.
    /// Use `execute` with `persist` to have the change logged first.
    pub fn set(&mut self, key: String, value: String) {
        self.database.insert(key, value);
    }

    /// Removes a given key, in memory only.
    ///
    /// # Error
    ///
    /// It returns `KvsError::KeyNotFound` if the given key is not found.
    pub fn delete(&mut self, key: &str) -> Result<()> {
        self.database
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| KvsError::KeyNotFound(key.to_owned()))
    }

    /// Renders every pair as `key:value`, in key order.
    pub fn show(&self) -> String {
        let pairs: Vec<String> = self
            .database
            .iter()
            .map(|(key, value)| format!("{}:{}", key, value))
            .collect();
        format!("database is: {{{}}}", pairs.join(", "))
    }

    /// Number of keys in the store.
    pub fn len(&self) -> usize {
        self.database.len()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.database.is_empty()
    }

    /// Path of the command log backing this store.
    pub fn log_path(&self) -> &Path {
        self.log.path()
    }

    fn persist(&mut self, op: &Operation, persist: bool) -> Result<()> {
        if persist {
            self.log.append(op)?;
        }
        Ok(())
    }
}

impl KvsEngine for KvStore {
    fn execute<T: IntoOperation>(&mut self, request: T, persist: bool) -> Result<String> {
        let op = request.into_operation()?;
        debug!("Executing command {}", op);
        match &op.command {
            Command::Get => self.get(required_key(&op)?),
            Command::Set => {
                let key = required_key(&op)?;
                let value = op
                    .value
                    .as_deref()
                    .ok_or_else(|| KvsError::MissingValue(op.command.to_string()))?;
                self.persist(&op, persist)?;
                self.set(key.to_owned(), value.to_owned());
                Ok(format!("set {} to {}", key, value))
            }
            Command::Delete => {
                let key = required_key(&op)?;
                if !self.database.contains_key(key) {
                    return Err(KvsError::KeyNotFound(key.to_owned()));
                }
                self.persist(&op, persist)?;
                self.delete(key)?;
                Ok(format!("deleted {}", key))
            }
            Command::Show => Ok(self.show()),
            Command::Other(name) => {
                debug!("Unknown command {:?}", name);
                Ok("invalid command".to_owned())
            }
        }
    }
}

fn required_key(op: &Operation) -> Result<&str> {
    op.key
        .as_deref()
        .ok_or_else(|| KvsError::MissingKey(op.command.to_string()))
}

/// Append-only log of operations, one JSON object per line.
pub struct CommandLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl CommandLog {
    /// Opens the log at `path` for appending, creating it if missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<CommandLog> {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(CommandLog {
            path,
            writer: BufWriter::new(file),
        })
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `op` as one line and syncs it to disk before returning.
    pub fn append(&mut self, op: &Operation) -> Result<()> {
        serde_json::to_writer(&mut self.writer, op)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        Ok(())
    }

    /// Reads every entry in append order.
    ///
    /// A final line without a trailing newline is kept when it deserializes,
    /// and the missing newline is appended so later entries start on a line
    /// of their own. Otherwise it was torn by a crash during `append`; it is
    /// dropped and the file is truncated to the last complete line. Any
    /// complete line that does not deserialize is an error.
    fn load(&mut self) -> Result<Vec<Operation>> {
        let mut reader = BufReader::new(File::open(&self.path)?);
        let mut entries = Vec::new();
        let mut line = Vec::new();
        let mut pos = 0u64;
        let mut line_no = 0;
        loop {
            line.clear();
            let len = reader.read_until(b'\n', &mut line)?;
            if len == 0 {
                break;
            }
            line_no += 1;
            if line.last() != Some(&b'\n') {
                match serde_json::from_slice::<Operation>(&line) {
                    Ok(op) => {
                        debug!(
                            "Terminating unterminated entry at line {} of {}",
                            line_no,
                            self.path.display()
                        );
                        self.writer.write_all(b"\n")?;
                        self.writer.flush()?;
                        self.writer.get_ref().sync_data()?;
                        entries.push(op);
                    }
                    Err(e) => {
                        warn!(
                            "Discarding torn entry at line {} of {} ({} bytes): {}",
                            line_no,
                            self.path.display(),
                            len,
                            e
                        );
                        self.writer.get_ref().set_len(pos)?;
                    }
                }
                break;
            }
            pos += len as u64;
            let body = &line[..len - 1];
            if body.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            let op = serde_json::from_slice(body).map_err(|e| {
                error!("Unreadable log entry at line {}: {}", line_no, e);
                KvsError::CorruptLog { line: line_no }
            })?;
            entries.push(op);
        }
        Ok(entries)
    }
}
