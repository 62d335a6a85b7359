//! Per-asset borrow/repay series, one JSON record per asset on disk.
//!
//! Records keep the key names of the legacy `coinsJson/<ASSET>.json` files so
//! an existing data directory keeps working. Replacement goes through a temp
//! file and a rename; readers are never blocked.

use serde::{Deserialize, Deserializer, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::logging::log_record_created;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid asset id {0:?}")]
    InvalidAsset(String),
    #[error("no record for {0}, load it before saving")]
    Missing(String),
    #[error("io error on {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("corrupt record {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("cannot encode record {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("refusing to write non-finite value to {}", path.display())]
    NonFinite { path: PathBuf },
    #[error("storage task failed: {0}")]
    Task(String),
    #[error("corrupt record {}: borrow/repay/time lengths {borrow}/{repay}/{time}", path.display())]
    Misaligned {
        path: PathBuf,
        borrow: usize,
        repay: usize,
        time: usize,
    },
}

impl StoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// History of one asset. Index `i` of every sequence is the same observation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetSeries {
    #[serde(rename = "totalBorrow", default, deserialize_with = "null_as_empty")]
    borrow: Vec<f64>,
    #[serde(rename = "totalRepay", default, deserialize_with = "null_as_empty")]
    repay: Vec<f64>,
    #[serde(rename = "totalTime", default, deserialize_with = "null_as_empty")]
    time: Vec<i64>,
}

// Older records were written with `null` for never-filled arrays.
fn null_as_empty<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(d)?.unwrap_or_default())
}

impl AssetSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a series from parallel sequences; `None` if their lengths differ.
    pub fn from_parts(borrow: Vec<f64>, repay: Vec<f64>, time: Vec<i64>) -> Option<Self> {
        let series = Self { borrow, repay, time };
        series.is_aligned().then_some(series)
    }

    pub fn push(&mut self, borrow: f64, repay: f64, ts: i64) {
        self.borrow.push(borrow);
        self.repay.push(repay);
        self.time.push(ts);
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn borrow(&self) -> &[f64] {
        &self.borrow
    }

    pub fn repay(&self) -> &[f64] {
        &self.repay
    }

    pub fn time(&self) -> &[i64] {
        &self.time
    }

    fn is_aligned(&self) -> bool {
        self.borrow.len() == self.time.len() && self.repay.len() == self.time.len()
    }

    fn is_finite(&self) -> bool {
        self.borrow.iter().chain(&self.repay).all(|v| v.is_finite())
    }

    // serde_json writes NaN and infinities as `null`, which would not load back.
    fn encode(&self, path: &Path) -> Result<Vec<u8>, StoreError> {
        if !self.is_finite() {
            return Err(StoreError::NonFinite {
                path: path.to_path_buf(),
            });
        }
        let mut out = Vec::new();
        let fmt = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut ser = serde_json::Serializer::with_formatter(&mut out, fmt);
        self.serialize(&mut ser).map_err(|source| StoreError::Encode {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(out)
    }
}

/// Flat directory of series records keyed by asset id.
#[derive(Debug, Clone)]
pub struct SeriesStore {
    dir: PathBuf,
}

impl SeriesStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the directory and a record for every asset that lacks one.
    pub fn init(&self, assets: &[String]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;
        for asset in assets {
            self.load(asset)?;
        }
        Ok(())
    }

    /// Reads the record for `asset`, creating an empty one if none exists.
    pub fn load(&self, asset: &str) -> Result<AssetSeries, StoreError> {
        let path = self.record_path(asset)?;
        match fs::read(&path) {
            Ok(bytes) => decode(&path, &bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => self.create_empty(asset, &path),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    /// Replaces the record for `asset`. The record must already exist.
    pub fn save(&self, asset: &str, series: &AssetSeries) -> Result<(), StoreError> {
        let path = self.record_path(asset)?;
        match fs::metadata(&path) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::Missing(asset.to_string()))
            }
            Err(e) => return Err(StoreError::io(&path, e)),
        }
        let bytes = series.encode(&path)?;
        let tmp = self.dir.join(format!(".{}.json.tmp", asset));
        fs::write(&tmp, bytes).map_err(|e| StoreError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            StoreError::io(&path, e)
        })
    }

    pub fn record_path(&self, asset: &str) -> Result<PathBuf, StoreError> {
        if !is_valid_asset(asset) {
            return Err(StoreError::InvalidAsset(asset.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", asset)))
    }

    fn create_empty(&self, asset: &str, path: &Path) -> Result<AssetSeries, StoreError> {
        let series = AssetSeries::new();
        let bytes = series.encode(path)?;
        // create_new: a concurrent loader may have won the race, then read theirs.
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                file.write_all(&bytes)
                    .and_then(|_| file.sync_all())
                    .map_err(|e| StoreError::io(path, e))?;
                log_record_created(asset);
                Ok(series)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let bytes = fs::read(path).map_err(|e| StoreError::io(path, e))?;
                decode(path, &bytes)
            }
            Err(e) => Err(StoreError::io(path, e)),
        }
    }
}

fn decode(path: &Path, bytes: &[u8]) -> Result<AssetSeries, StoreError> {
    let series: AssetSeries = serde_json::from_slice(bytes).map_err(|source| StoreError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    if !series.is_aligned() {
        return Err(StoreError::Misaligned {
            path: path.to_path_buf(),
            borrow: series.borrow.len(),
            repay: series.repay.len(),
            time: series.time.len(),
        });
    }
    Ok(series)
}

fn is_valid_asset(asset: &str) -> bool {
    !asset.is_empty()
        && !asset.starts_with('.')
        && !asset.contains(|c| matches!(c, '/' | '\\' | '\0'))
        && !asset.contains("..")
}
