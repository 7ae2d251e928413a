use tokio_cron_scheduler::{Job, JobScheduler};

use crate::error::Result;
use crate::services::subscription_service::SubscriptionService;

/// Every ten minutes, on the minute.
pub const EXPIRY_SCHEDULE: &str = "0 */10 * * * *";

/// Starts background jobs. The returned scheduler must be kept alive.
pub async fn start(subscriptions: SubscriptionService) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_async(EXPIRY_SCHEDULE, move |_id, _lock| {
        let subscriptions = subscriptions.clone();
        Box::pin(async move {
            match subscriptions.expire_overdue().await {
                Ok(0) => tracing::debug!("No subscriptions to expire"),
                Ok(count) => tracing::info!(count, "Expired subscriptions"),
                Err(e) => tracing::error!(error = %e, "Subscription expiry failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;
    tracing::info!(schedule = EXPIRY_SCHEDULE, "Subscription expiry job scheduled");
    Ok(scheduler)
}
