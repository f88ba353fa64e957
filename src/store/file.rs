use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use crate::{
    declare::Quote,
    error::StoreError,
    logging,
    store::{backfill_status, evict, Series, SeriesStore},
};

/// 以 JSON 快照檔保存的報價序列
///
/// The snapshot is a single JSON array rewritten in full on every append: the new
/// content goes to `<name>.tmp` first and is then renamed over the snapshot.
pub struct FileStore {
    series: Series,
    path: PathBuf,
}

impl FileStore {
    /// Loads the snapshot at `path` (an absent file is an empty series), fills any
    /// missing status, applies `retention` and rewrites the snapshot when either
    /// changed anything.
    pub fn open(path: impl AsRef<Path>, retention: usize) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut records = load(&path)?;
        let backfilled = backfill_status(&mut records);
        let evicted = evict(&mut records, retention.max(1));

        if backfilled || evicted {
            write_snapshot(&path, &records)?;
            logging::info_file_async(format!(
                "Rewrote {} (backfilled: {}, evicted: {})",
                path.display(),
                backfilled,
                evicted
            ));
        }

        Ok(FileStore {
            series: Series::new(records, retention),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SeriesStore for FileStore {
    fn append(&self, quote: Quote) -> Result<Quote, StoreError> {
        self.series.append_with(quote, |records| {
            write_snapshot(&self.path, records).inspect_err(|why| {
                logging::error_file_async(format!(
                    "Failed to persist {} because {:?}",
                    self.path.display(),
                    why
                ));
            })
        })
    }

    fn latest(&self) -> Option<Quote> {
        self.series.latest()
    }

    fn history(&self) -> Vec<Quote> {
        self.series.history()
    }

    fn len(&self) -> usize {
        self.series.len()
    }
}

fn load(path: &Path) -> Result<Vec<Quote>, StoreError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(why) if why.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(why) => {
            return Err(StoreError::Load {
                path: path.to_path_buf(),
                reason: why.to_string(),
            })
        }
    };

    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_str::<Vec<Quote>>(&text).map_err(|why| StoreError::Load {
        path: path.to_path_buf(),
        reason: why.to_string(),
    })
}

/// 先寫暫存檔再改名，避免寫到一半的快照
fn write_snapshot(path: &Path, records: &[Quote]) -> Result<(), StoreError> {
    let body = serde_json::to_vec_pretty(records)?;
    let tmp = tmp_path(path);

    let mut file = File::create(&tmp)?;
    file.write_all(&body)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp, path).inspect_err(|_| {
        let _ = fs::remove_file(&tmp);
    })?;

    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
