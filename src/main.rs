use std::{env, sync::Arc};

use anyhow::Result;
use tokio_cron_scheduler::JobScheduler;

use crate::{
    config::SETTINGS, crawler::trading_economics::TradingEconomics, event::carbon_price::Updater,
};

pub mod config;
pub mod crawler;
pub mod declare;
pub mod error;
pub mod event;
pub mod logging;
pub mod scheduler;
pub mod server;
pub mod store;
pub mod util;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    logging::info_file_async(format!(
        "CarbonCrawler 啟動中 OS/Arch: {}/{}",
        env::consts::OS,
        env::consts::ARCH
    ));

    let store = store::open(&SETTINGS.system)?;
    let fetcher = Arc::new(TradingEconomics::new(SETTINGS.source.clone())?);
    let updater = Arc::new(Updater::new(
        fetcher,
        store,
        SETTINGS.scheduler.cycle_deadline(),
    ));

    let sched = JobScheduler::new().await?;
    scheduler::start(&sched, Arc::clone(&updater)).await?;

    // 啟動時先更新一次，失敗已寫入 log
    let _ = updater.run_update_cycle().await;

    let state = server::AppState::new(updater);
    if let Err(why) = server::start(SETTINGS.system.http_port, state).await {
        logging::error_console(format!("HTTP server stopped because {:?}", why));
        return Err(why);
    }

    Ok(())
}
