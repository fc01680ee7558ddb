//! Persistent keyed state backends for the etch host.
//!
//! `JsonStateMap` is the file-backed store: a JSON object document held in
//! memory, where every value written by this layer is the lower-case hex
//! encoding of an opaque byte payload. `NullObserver` is the no-op backend.

use std::io;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value;

use etch_engine::{IoObserver, IoStatus};

/// File-backed keyed state store.
///
/// Lifecycle per session: construct (empty object), optionally
/// `load_from_file`, serve `read`/`write`/`exists` from the running script,
/// optionally `save_to_file`. Load and save strictly bracket the execution
/// region; the store is never shared across sessions.
#[derive(Clone, Debug)]
pub struct JsonStateMap {
    data: Value,
}

impl Default for JsonStateMap {
    fn default() -> Self {
        Self {
            data: Value::Object(serde_json::Map::new()),
        }
    }
}

impl JsonStateMap {
    /// Hydrates the document from `path`.
    ///
    /// An absent or empty file leaves the default empty object in place. A
    /// non-empty file whose root is not a JSON object is a fatal format
    /// error. Values are not validated as hex here; a malformed value
    /// surfaces later, as an `Error` status on `read`.
    pub fn load_from_file(&mut self, path: &Path) -> Result<()> {
        let contents = match std::fs::read(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("[ETCH_STATE_READ] read state file: {}", path.display())
                })
            }
        };
        if contents.is_empty() {
            return Ok(());
        }

        let document: Value = serde_json::from_slice(&contents).with_context(|| {
            format!("[ETCH_STATE_PARSE] parse state file JSON: {}", path.display())
        })?;
        if !document.is_object() {
            bail!(
                "[ETCH_STATE_PARSE] state file root is not a JSON object: {}",
                path.display()
            );
        }

        self.data = document;
        Ok(())
    }

    /// Serializes the document to `path`, overwriting any existing file.
    /// Plain overwrite; write errors are fatal to the caller.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string(&self.data)
            .context("[ETCH_STATE_WRITE] serialize state document")?;
        std::fs::write(path, contents).with_context(|| {
            format!("[ETCH_STATE_WRITE] write state file: {}", path.display())
        })?;
        Ok(())
    }

    pub fn data(&self) -> &Value {
        &self.data
    }
}

impl IoObserver for JsonStateMap {
    fn exists(&self, key: &str) -> bool {
        self.data.get(key).is_some()
    }

    fn read(&self, key: &str, buf: &mut [u8], size: &mut u64) -> IoStatus {
        // Absent key: *size stays at the caller's capacity, not 0. This
        // asymmetry with the too-small path is contractual.
        let Some(value) = self.data.get(key) else {
            return IoStatus::Error;
        };
        let Some(encoded) = value.as_str() else {
            return IoStatus::Error;
        };
        let Ok(raw) = hex::decode(encoded) else {
            return IoStatus::Error;
        };

        if (*size as usize) < raw.len() {
            *size = raw.len() as u64;
            return IoStatus::BufferTooSmall;
        }

        buf[..raw.len()].copy_from_slice(&raw);
        *size = raw.len() as u64;
        IoStatus::Ok
    }

    fn write(&mut self, key: &str, data: &[u8]) -> IoStatus {
        if let Value::Object(map) = &mut self.data {
            map.insert(key.to_string(), Value::String(hex::encode(data)));
        }
        IoStatus::Ok
    }
}

/// Backend that persists nothing: every key is absent and writes are
/// accepted and dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullObserver;

impl IoObserver for NullObserver {
    fn exists(&self, _key: &str) -> bool {
        false
    }

    fn read(&self, _key: &str, _buf: &mut [u8], _size: &mut u64) -> IoStatus {
        IoStatus::Error
    }

    fn write(&mut self, _key: &str, _data: &[u8]) -> IoStatus {
        IoStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_round_trip() {
        let mut state = JsonStateMap::default();
        assert_eq!(state.write("k", b"value"), IoStatus::Ok);

        let mut buf = [0u8; 5];
        let mut size = 5u64;
        assert_eq!(state.read("k", &mut buf, &mut size), IoStatus::Ok);
        assert_eq!(&buf, b"value");
        assert_eq!(size, 5);
    }

    #[test]
    fn write_overwrites_previous_value() {
        let mut state = JsonStateMap::default();
        assert_eq!(state.write("k", b"old"), IoStatus::Ok);
        assert_eq!(state.write("k", b"new!"), IoStatus::Ok);

        let mut buf = [0u8; 8];
        let mut size = 8u64;
        assert_eq!(state.read("k", &mut buf, &mut size), IoStatus::Ok);
        assert_eq!(size, 4);
        assert_eq!(&buf[..4], b"new!");
    }

    #[test]
    fn empty_payload_round_trips() {
        let mut state = JsonStateMap::default();
        assert_eq!(state.write("empty", b""), IoStatus::Ok);
        assert!(state.exists("empty"));
        assert_eq!(state.data()["empty"], Value::String(String::new()));

        let mut size = 0u64;
        assert_eq!(state.read("empty", &mut [], &mut size), IoStatus::Ok);
        assert_eq!(size, 0);
    }

    #[test]
    fn undersized_buffer_probe_then_retry() {
        let mut state = JsonStateMap::default();
        assert_eq!(state.write("x", b"12345"), IoStatus::Ok);

        // Probe with capacity 0 to discover the required size.
        let mut size = 0u64;
        assert_eq!(
            state.read("x", &mut [], &mut size),
            IoStatus::BufferTooSmall
        );
        assert_eq!(size, 5);

        let mut buf = vec![0u8; size as usize];
        assert_eq!(state.read("x", &mut buf, &mut size), IoStatus::Ok);
        assert_eq!(buf, b"12345");
        assert_eq!(size, 5);
    }

    #[test]
    fn undersized_buffer_leaves_buffer_untouched() {
        let mut state = JsonStateMap::default();
        assert_eq!(state.write("x", b"12345"), IoStatus::Ok);

        let mut buf = [0xAAu8; 3];
        let mut size = 3u64;
        assert_eq!(
            state.read("x", &mut buf, &mut size),
            IoStatus::BufferTooSmall
        );
        assert_eq!(buf, [0xAA, 0xAA, 0xAA]);
        assert_eq!(size, 5);
    }

    #[test]
    fn missing_key_leaves_size_unchanged() {
        // The error path keeps the caller's capacity, unlike the too-small
        // path which reports the stored length. Pinned, not corrected.
        let state = JsonStateMap::default();
        assert!(!state.exists("missing"));

        let mut buf = [0u8; 10];
        let mut size = 10u64;
        assert_eq!(state.read("missing", &mut buf, &mut size), IoStatus::Error);
        assert_eq!(size, 10);
    }

    #[test]
    fn stored_values_are_lowercase_even_length_hex() {
        let mut state = JsonStateMap::default();
        assert_eq!(state.write("k", &[0xDE, 0xAD, 0xBE, 0xEF]), IoStatus::Ok);
        assert_eq!(state.data()["k"], Value::String("deadbeef".to_string()));
    }

    #[test]
    fn malformed_hex_value_reads_as_error() {
        let mut state = JsonStateMap::default();
        if let Value::Object(map) = &mut state.data {
            map.insert("bad".to_string(), Value::String("zzzz".to_string()));
            map.insert("odd".to_string(), Value::String("abc".to_string()));
            map.insert("num".to_string(), Value::from(7));
        }

        let mut buf = [0u8; 16];
        for key in ["bad", "odd", "num"] {
            let mut size = 16u64;
            assert_eq!(state.read(key, &mut buf, &mut size), IoStatus::Error);
            assert!(state.exists(key));
        }
    }

    #[test]
    fn null_observer_drops_writes() {
        let mut null = NullObserver;
        assert_eq!(null.write("k", b"data"), IoStatus::Ok);
        assert!(!null.exists("k"));

        let mut buf = [0u8; 4];
        let mut size = 4u64;
        assert_eq!(null.read("k", &mut buf, &mut size), IoStatus::Error);
        assert_eq!(size, 4);
    }
}
