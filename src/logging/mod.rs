use std::{env, fmt::Write as _, thread};

use chrono::{DateTime, Local};
use crossbeam_channel::{unbounded, Sender};
use once_cell::sync::Lazy;

use crate::logging::rotate::Rotate;

pub mod rotate;

const SYSTEM_LOG_DIR: &str = "SYSTEM_LOG_DIR";

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("default"));

/// File logger backed by a writer thread.
///
/// Callers only push messages into a channel; the thread batches them and writes
/// through [`Rotate`].
pub struct Logger {
    writer: Sender<LogMessage>,
}

impl Logger {
    pub fn new(log_name: &str) -> Self {
        let (tx, rx) = unbounded::<LogMessage>();
        let pattern = format!("{}/%Y-%m-%d-{}.log", log_dir(), log_name);

        // 寫入檔案的操作使用另一個線程處理
        thread::spawn(move || {
            let mut rotate = Rotate::new(pattern);
            let mut line = String::with_capacity(4096);

            while let Ok(received) = rx.recv() {
                if writeln!(
                    &mut line,
                    "{} {} {}",
                    received.created_at.format("%F %X%.6f"),
                    received.level,
                    received.msg
                )
                .is_err()
                {
                    continue;
                }

                if rx.is_empty() || line.len() >= 4096 {
                    if let Err(why) = rotate.write_msg(received.created_at, line.as_bytes()) {
                        error_console(format!("Failed to write log because {:?}", why));
                        info_console(line.clone());
                    }

                    line.clear();
                }
            }
        });

        Logger { writer: tx }
    }

    pub fn info(&self, log: String) {
        self.send(log::Level::Info, log);
    }

    pub fn warn(&self, log: String) {
        self.send(log::Level::Warn, log);
    }

    pub fn error(&self, log: String) {
        self.send(log::Level::Error, log);
    }

    pub fn debug(&self, log: String) {
        self.send(log::Level::Debug, log);
    }

    fn send(&self, level: log::Level, msg: String) {
        if let Err(why) = self.writer.send(LogMessage::new(level, msg)) {
            error_console(why.to_string());
        }
    }
}

pub struct LogMessage {
    pub level: log::Level,
    pub msg: String,
    pub created_at: DateTime<Local>,
}

impl LogMessage {
    pub fn new(level: log::Level, msg: String) -> Self {
        LogMessage {
            level,
            msg,
            created_at: Local::now(),
        }
    }
}

/// 日誌目錄，預設為 ./log
fn log_dir() -> String {
    env::var(SYSTEM_LOG_DIR)
        .ok()
        .filter(|dir| !dir.is_empty())
        .unwrap_or_else(|| "log".to_string())
}

pub fn info_file_async<S: Into<String>>(log: S) {
    LOGGER.info(log.into());
}

pub fn warn_file_async<S: Into<String>>(log: S) {
    LOGGER.warn(log.into());
}

pub fn error_file_async<S: Into<String>>(log: S) {
    LOGGER.error(log.into());
}

pub fn debug_file_async<S: Into<String>>(log: S) {
    LOGGER.debug(log.into());
}

pub fn info_console(log: String) {
    println!(
        "{} Info {}",
        Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
        log
    );
}

pub fn error_console(log: String) {
    eprintln!(
        "{} Error {}",
        Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
        log
    );
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_log_to_file() {
        dotenv::dotenv().ok();
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/%Y-%m-%d-logger.log", dir.path().display());
        let mut rotate = Rotate::new(pattern);
        let message = LogMessage::new(log::Level::Warn, "snapshot rewritten".to_string());
        let line = format!("{} {}\r\n", message.level, message.msg);
        rotate.write_msg(message.created_at, line.as_bytes()).unwrap();

        let file = dir
            .path()
            .join(format!("{}-logger.log", message.created_at.format("%Y-%m-%d")));
        let content = std::fs::read_to_string(file).unwrap();
        assert_eq!(content, "WARN snapshot rewritten\r\n");

        debug_file_async(format!("test_log_to_file {:?}", dir.path()));
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
