use std::{env, path::PathBuf, str::FromStr, time::Duration};

use anyhow::Result;
use config::{Config as config_config, File as config_file};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::logging;

const CONFIG_PATH: &str = "app.json";

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct App {
    #[serde(default)]
    pub system: System,
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub scheduler: Scheduler,
}

const PORT: &str = "PORT";
const SYSTEM_HTTP_PORT: &str = "SYSTEM_HTTP_PORT";
const SYSTEM_DATA_DIR: &str = "SYSTEM_DATA_DIR";
const SYSTEM_PERSIST: &str = "SYSTEM_PERSIST";
const SYSTEM_RETENTION: &str = "SYSTEM_RETENTION";

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct System {
    pub http_port: u16,
    /// 快照檔所在目錄
    pub data_dir: String,
    /// false 時只保存在記憶體，重啟後清空
    pub persist: bool,
    /// 最多保留幾筆歷史
    pub retention: usize,
}

impl Default for System {
    fn default() -> Self {
        System {
            http_port: 10000,
            data_dir: "data".to_string(),
            persist: true,
            retention: 30,
        }
    }
}

impl System {
    /// 快照檔路徑
    pub fn snapshot_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("carbon_price.json")
    }
}

const SOURCE_URL: &str = "SOURCE_URL";
const SOURCE_USER_AGENT: &str = "SOURCE_USER_AGENT";
const SOURCE_ACCEPT_LANGUAGE: &str = "SOURCE_ACCEPT_LANGUAGE";
const SOURCE_COOKIE: &str = "SOURCE_COOKIE";
const SOURCE_TIMEOUT_SECS: &str = "SOURCE_TIMEOUT_SECS";

/// 報價來源網站的連線設定
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Source {
    pub url: String,
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    /// 需要登入才看得到內容時使用的 session cookie
    pub cookie: String,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
}

impl Default for Source {
    fn default() -> Self {
        Source {
            url: "https://tradingeconomics.com/commodity/carbon".to_string(),
            user_agent:
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:139.0) Gecko/20100101 Firefox/139.0"
                    .to_string(),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"
                .to_string(),
            accept_language: "zh-CN,zh;q=0.9,en;q=0.8".to_string(),
            cookie: String::new(),
            connect_timeout_secs: 8,
            timeout_secs: 15,
        }
    }
}

impl Source {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

const SCHEDULER_CRON: &str = "SCHEDULER_CRON";
const SCHEDULER_SKIP_WEEKENDS: &str = "SCHEDULER_SKIP_WEEKENDS";

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Scheduler {
    //                 sec  min   hour   day of month   month   day of week
    /// 預設每天 00:00 與 12:00 (UTC) 各更新一次
    pub cron: String,
    /// 週末沒有交易，不抓取
    pub skip_weekends: bool,
    /// 單次更新的期限（秒）
    pub cycle_deadline_secs: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Scheduler {
            cron: "0 0 0,12 * * *".to_string(),
            skip_weekends: true,
            cycle_deadline_secs: 30,
        }
    }
}

impl Scheduler {
    pub fn cycle_deadline(&self) -> Duration {
        Duration::from_secs(self.cycle_deadline_secs)
    }
}

pub static SETTINGS: Lazy<App> = Lazy::new(|| {
    App::get().unwrap_or_else(|why| {
        logging::error_file_async(format!(
            "I can't read the config context because {:?}",
            why
        ));
        App::default().override_with_env()
    })
});

impl App {
    fn get() -> Result<Self> {
        let config_path = config_path();
        if config_path.exists() {
            let config: App = config_config::builder()
                .add_source(config_file::from(config_path))
                .build()?
                .try_deserialize()?;
            return Ok(config.override_with_env());
        }

        Ok(App::default().override_with_env())
    }

    /// 將來至於 env 的設定值覆蓋掉 json 上的設定值
    fn override_with_env(mut self) -> Self {
        if let Some(port) = env_parse::<u16>(PORT) {
            self.system.http_port = port;
        }

        if let Some(port) = env_parse::<u16>(SYSTEM_HTTP_PORT) {
            self.system.http_port = port;
        }

        if let Ok(dir) = env::var(SYSTEM_DATA_DIR) {
            self.system.data_dir = dir;
        }

        if let Some(persist) = env_parse::<bool>(SYSTEM_PERSIST) {
            self.system.persist = persist;
        }

        if let Some(retention) = env_parse::<usize>(SYSTEM_RETENTION) {
            self.system.retention = retention;
        }

        if let Ok(url) = env::var(SOURCE_URL) {
            self.source.url = url;
        }

        if let Ok(ua) = env::var(SOURCE_USER_AGENT) {
            self.source.user_agent = ua;
        }

        if let Ok(lang) = env::var(SOURCE_ACCEPT_LANGUAGE) {
            self.source.accept_language = lang;
        }

        if let Ok(cookie) = env::var(SOURCE_COOKIE) {
            self.source.cookie = cookie;
        }

        if let Some(secs) = env_parse::<u64>(SOURCE_TIMEOUT_SECS) {
            self.source.timeout_secs = secs;
        }

        if let Ok(cron) = env::var(SCHEDULER_CRON) {
            self.scheduler.cron = cron;
        }

        if let Some(skip) = env_parse::<bool>(SCHEDULER_SKIP_WEEKENDS) {
            self.scheduler.skip_weekends = skip;
        }

        self
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let value = env::var(key).ok()?;
    match T::from_str(value.trim()) {
        Ok(v) => Some(v),
        Err(_) => {
            logging::warn_file_async(format!("Ignore {}={} because it can't be parsed", key, value));
            None
        }
    }
}

/// 回傳設定檔的路徑
fn config_path() -> PathBuf {
    PathBuf::from(CONFIG_PATH)
}
