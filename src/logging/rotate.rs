use std::{
    fs::{self, File, OpenOptions},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};
use rayon::prelude::*;

use crate::logging;

/// 預設單檔最大大小：10 MB
const DEFAULT_MAX_SIZE: u64 = 10 * 1024 * 1024;
/// 預設保留天數：7 天
const DEFAULT_MAX_AGE_DAYS: u64 = 7;

/// Date based log file with size based generations.
///
/// `log/%Y-%m-%d-default.log` becomes `log/2024-01-15-default.log`; once that file
/// passes `max_size` the writer moves on to `log/2024-01-15-default.1.log` and so on.
/// Files older than `max_age` in the same directory are removed whenever the date
/// changes.
pub struct Rotate {
    /// 檔名模式，例如 "log/%Y-%m-%d-name.log"
    fn_pattern: String,
    /// 當前基礎檔名（不含 generation）
    cur_base_fn: String,
    /// 當前完整檔名
    cur_fn: PathBuf,
    out_fh: Option<BufWriter<File>>,
    generation: u32,
    max_size: u64,
    current_size: u64,
    max_age: Duration,
}

impl Rotate {
    pub fn new(fn_pattern: String) -> Self {
        Self::with_options(fn_pattern, DEFAULT_MAX_SIZE, DEFAULT_MAX_AGE_DAYS)
    }

    pub fn with_options(fn_pattern: String, max_size: u64, max_age_days: u64) -> Self {
        Rotate {
            fn_pattern,
            cur_base_fn: String::new(),
            cur_fn: PathBuf::new(),
            out_fh: None,
            generation: 0,
            max_size,
            current_size: 0,
            max_age: Duration::from_secs(max_age_days * 24 * 60 * 60),
        }
    }

    /// 寫入日誌訊息，自動處理日期切換與大小輪轉
    pub fn write_msg(&mut self, now: DateTime<Local>, msg: &[u8]) -> Result<()> {
        let base_fn = now.format(&self.fn_pattern).to_string();

        // 日期變更：重設 generation
        if base_fn != self.cur_base_fn {
            self.cur_base_fn = base_fn;
            self.generation = 0;
            self.open_new_file()?;
            self.cleanup_old_files();
        }

        if self.current_size > 0 && self.current_size + msg.len() as u64 > self.max_size {
            self.generation += 1;
            self.open_new_file()?;
        }

        let writer = self
            .out_fh
            .as_mut()
            .ok_or_else(|| anyhow!("log file {} is not open", self.cur_fn.display()))?;
        writer.write_all(msg)?;
        writer.flush()?;
        self.current_size += msg.len() as u64;

        Ok(())
    }

    /// generation = 0: "log/2024-01-15-app.log"
    /// generation = 2: "log/2024-01-15-app.2.log"
    fn generate_full_fn(base_fn: &str, generation: u32) -> PathBuf {
        let path = Path::new(base_fn);
        if generation == 0 {
            return path.to_path_buf();
        }

        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("log");
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("log");
        path.with_file_name(format!("{}.{}.{}", stem, generation, ext))
    }

    fn open_new_file(&mut self) -> Result<()> {
        if let Some(mut old) = self.out_fh.take() {
            let _ = old.flush();
        }

        let filename = Self::generate_full_fn(&self.cur_base_fn, self.generation);
        if let Some(parent) = filename.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&filename)?;
        self.current_size = file.metadata().map(|m| m.len()).unwrap_or(0);
        self.out_fh = Some(BufWriter::with_capacity(4096, file));
        self.cur_fn = filename;

        Ok(())
    }

    /// 清理超過 max_age 的檔案
    fn cleanup_old_files(&self) {
        let Some(cut_off) = SystemTime::now().checked_sub(self.max_age) else {
            return;
        };

        let files = match files_in_directory(&self.cur_fn) {
            Ok(files) => files,
            Err(why) => {
                logging::error_console(format!("Failed to list log files because {:?}", why));
                return;
            }
        };

        let to_unlink: Vec<PathBuf> = files
            .into_iter()
            .filter(|file| {
                fs::metadata(file)
                    .and_then(|m| m.modified())
                    .map(|modified| modified <= cut_off)
                    .unwrap_or(false)
            })
            .collect();

        to_unlink
            .par_iter()
            .with_min_len(num_cpus::get())
            .for_each(|unlink| {
                if let Err(why) = fs::remove_file(unlink) {
                    logging::error_console(format!(
                        "couldn't remove the file({}). because {:?}",
                        unlink.display(),
                        why
                    ));
                }
            });
    }
}

impl Drop for Rotate {
    fn drop(&mut self) {
        if let Some(writer) = self.out_fh.as_mut() {
            let _ = writer.flush();
        }
    }
}

fn files_in_directory(file_path: &Path) -> Result<Vec<PathBuf>, io::Error> {
    let parent_dir = file_path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Parent directory not found"))?;

    let mut files = Vec::new();
    for entry in fs::read_dir(parent_dir)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_generation_filename() {
        let base = "log/2025-02-03-app.log";
        assert_eq!(
            Rotate::generate_full_fn(base, 0),
            PathBuf::from("log/2025-02-03-app.log")
        );
        assert_eq!(
            Rotate::generate_full_fn(base, 2),
            PathBuf::from("log/2025-02-03-app.2.log")
        );
    }

    #[test]
    fn test_date_and_size_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/%Y-%m-%d-test.log", dir.path().display());
        let mut r = Rotate::with_options(pattern, 64, 7);

        let day1 = Local.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        let line = format!("{}\r\n", "X".repeat(40));
        r.write_msg(day1, line.as_bytes()).unwrap();
        r.write_msg(day1, line.as_bytes()).unwrap();

        let day2 = Local.with_ymd_and_hms(2024, 1, 16, 9, 0, 0).unwrap();
        r.write_msg(day2, line.as_bytes()).unwrap();
        drop(r);

        assert!(dir.path().join("2024-01-15-test.log").exists());
        assert!(dir.path().join("2024-01-15-test.1.log").exists());
        assert!(dir.path().join("2024-01-16-test.log").exists());
    }
}
