use std::{future::Future, sync::Arc};

use anyhow::{Error, Result};
use chrono::{DateTime, TimeZone, Utc};
use concat_string::concat_string;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::{config, event::carbon_price::Updater, logging, util::datetime::Weekend};

/// 啟動排程
pub async fn start(sched: &JobScheduler, updater: Arc<Updater>) -> Result<()> {
    let settings = &config::SETTINGS.scheduler;
    let skip_weekends = settings.skip_weekends;
    //                 sec  min   hour   day of month   month   day of week
    // UTC 時間，預設 "0 0 0,12 * * *" 每天 00:00 與 12:00 更新碳權價格
    let job = create_job(&settings.cron, move || {
        let updater = Arc::clone(&updater);
        async move {
            if !should_run(Utc::now(), skip_weekends) {
                logging::info_file_async("Weekend, carbon price update skipped");
                return Ok(());
            }

            updater.run_update_cycle().await?;
            Ok::<(), Error>(())
        }
    })?;

    sched.add(job).await?;
    sched.start().await?;

    logging::info_file_async(concat_string!(
        "Scheduler started with cron ",
        &settings.cron
    ));

    Ok(())
}

/// 週末市場休市，頁面上的報價不會變動。排程以 UTC 觸發，判斷也用 UTC
fn should_run<Tz: TimeZone>(now: DateTime<Tz>, skip_weekends: bool) -> bool {
    !(skip_weekends && now.is_weekend())
}

fn create_job<F, Fut>(cron_expr: &str, task: F) -> Result<Job>
where
    F: Fn() -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send,
{
    let expr = cron_expr.to_string();
    Ok(Job::new_async(cron_expr, move |_uuid, _l| {
        let task = task.clone();
        let expr = expr.clone();
        Box::pin(async move {
            if let Err(why) = task().await {
                logging::error_file_async(format!(
                    "Failed to execute task({}) because {:?}",
                    expr, why
                ));
            }
        })
    })?)
}
