use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::error;

use crate::pipeline::{self, BatchSettings, Collaborators, UpdateSource};
use crate::scheduler::Scheduler;

/// One polling pass per call, against whatever provides the updates and the
/// downstream operations.
pub fn polling_task<T>(
    runner: Arc<T>,
    settings: BatchSettings,
) -> impl Fn() -> BoxFuture<'static, ()> + Send + Sync
where
    T: UpdateSource + Collaborators + 'static,
{
    let settings = Arc::new(settings);
    move || {
        let runner = runner.clone();
        let settings = settings.clone();
        Box::pin(async move {
            if let Err(e) = pipeline::run_once(runner.as_ref(), runner.as_ref(), &settings).await {
                error!("Polling pass failed: {:#}", e);
            }
        })
    }
}

/// Register the Telegram polling pass under `cron_expr`.
pub async fn register_polling_task<T>(
    scheduler: &Scheduler,
    cron_expr: &str,
    runner: Arc<T>,
    settings: BatchSettings,
) -> anyhow::Result<()>
where
    T: UpdateSource + Collaborators + 'static,
{
    scheduler
        .add_cron_job(cron_expr, "telegram-to-wordpress", polling_task(runner, settings))
        .await
}
