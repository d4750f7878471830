pub mod tasks;

use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, warn};

/// Wrap `task` so a tick that fires while the previous run of the same task
/// is still going returns immediately without polling the new run.
pub fn skip_if_running<F>(name: &str, task: F) -> impl Fn() -> BoxFuture<'static, ()> + Send + Sync
where
    F: Fn() -> BoxFuture<'static, ()> + Send + Sync + 'static,
{
    let name = name.to_string();
    let running = Arc::new(Mutex::new(()));
    move || {
        let running = running.clone();
        let name = name.clone();
        let fut = task();
        Box::pin(async move {
            let Ok(_guard) = running.try_lock() else {
                warn!("Task '{}' still running, skipping this tick", name);
                return;
            };
            fut.await;
        })
    }
}

/// Cron scheduler whose jobs never run concurrently with themselves
pub struct Scheduler {
    inner: JobScheduler,
}

impl Scheduler {
    /// Create a new scheduler
    pub async fn new() -> Result<Self> {
        let inner = JobScheduler::new()
            .await
            .context("Failed to create job scheduler")?;
        Ok(Self { inner })
    }

    /// Add a recurring cron job; overlapping ticks are dropped
    pub async fn add_cron_job<F>(&self, cron_expr: &str, name: &str, task: F) -> Result<()>
    where
        F: Fn() -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        let task = skip_if_running(name, task);
        let job_name = name.to_string();
        let job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let name = job_name.clone();
            let fut = task();
            Box::pin(async move {
                info!("Running scheduled task: {}", name);
                fut.await;
            })
        })
        .with_context(|| format!("Failed to create cron job: {}", name))?;

        self.inner
            .add(job)
            .await
            .with_context(|| format!("Failed to add job: {}", name))?;

        info!("Scheduled task '{}' with cron: {}", name, cron_expr);
        Ok(())
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<()> {
        self.inner
            .start()
            .await
            .context("Failed to start scheduler")?;
        info!("Scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner
            .shutdown()
            .await
            .context("Failed to shutdown scheduler")?;
        info!("Scheduler stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    #[tokio::test]
    async fn test_overlapping_tick_is_skipped() {
        let runs = Arc::new(AtomicUsize::new(0));
        let release = Arc::new(Notify::new());
        let tick = {
            let runs = runs.clone();
            let release = release.clone();
            skip_if_running("slow", move || {
                let runs = runs.clone();
                let release = release.clone();
                Box::pin(async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    release.notified().await;
                })
            })
        };

        let first = tokio::spawn(tick());
        while runs.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        tick().await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        release.notify_one();
        first.await.unwrap();

        release.notify_one();
        tick().await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_rejects_invalid_cron() {
        let scheduler = Scheduler::new().await.unwrap();
        let result = scheduler
            .add_cron_job("every five minutes", "bad", || Box::pin(async {}))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_accepts_six_field_cron() {
        let scheduler = Scheduler::new().await.unwrap();
        scheduler
            .add_cron_job("0 */5 * * * *", "poll", || Box::pin(async {}))
            .await
            .unwrap();
    }
}
