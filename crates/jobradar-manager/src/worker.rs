//! Worker loop and per-job dispatch.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;
use tracing::{debug, error};

use crate::error::ManagerError;
use crate::jobs::{FetchDetailsJob, Job, SearchJob};
use crate::manager::ParserManager;

/// Pause before re-polling an empty queue.
const IDLE_PAUSE: Duration = Duration::from_millis(10);

impl ParserManager {
    pub(crate) async fn worker_loop(&self, worker_id: usize, mut stop_rx: watch::Receiver<bool>) {
        loop {
            if *stop_rx.borrow() {
                debug!(worker_id, "worker received stop signal");
                return;
            }

            match self.queue.dequeue() {
                Some(job) => {
                    debug!(worker_id, "worker picked up a job");
                    self.run_job(job).await;
                }
                None => {
                    tokio::select! {
                        _ = stop_rx.changed() => {}
                        _ = tokio::time::sleep(IDLE_PAUSE) => {}
                    }
                }
            }
        }
    }

    async fn run_job(&self, job: Job) {
        match job {
            Job::Search(job) => self.run_search_job(job).await,
            Job::FetchDetails(job) => self.run_details_job(job).await,
        }
    }

    /// Process one search job: global semaphore, global breaker, the
    /// fan-out and the result policy. A panic anywhere inside is
    /// recovered and reported as the job's error so the caller is never
    /// left hanging.
    async fn run_search_job(&self, mut job: SearchJob) {
        let job_id = job.id;
        let params = job.params.clone();
        debug!(
            job_id = %job_id,
            queued_ms = (chrono::Utc::now() - job.created_at).num_milliseconds(),
            "processing search job"
        );

        let outcome = AssertUnwindSafe(self.search_with_gate(&params))
            .catch_unwind()
            .await;

        let reply = match outcome {
            Ok(reply) => reply,
            Err(panic) => {
                let msg = panic_message(panic);
                error!(job_id = %job_id, panic = %msg, "search job panicked");
                Err(ManagerError::JobPanicked(msg))
            }
        };

        job.completion.complete(reply);
    }

    async fn run_details_job(&self, mut job: FetchDetailsJob) {
        let job_id = job.id;
        let source = job.source.clone();
        let vacancy_id = job.vacancy_id.clone();
        debug!(
            job_id = %job_id,
            queued_ms = (chrono::Utc::now() - job.created_at).num_milliseconds(),
            "processing details job"
        );

        let outcome = AssertUnwindSafe(self.details_with_gate(&source, &vacancy_id))
            .catch_unwind()
            .await;

        let reply = match outcome {
            Ok(reply) => reply,
            Err(panic) => {
                let msg = panic_message(panic);
                error!(job_id = %job_id, panic = %msg, "details job panicked");
                Err(ManagerError::JobPanicked(msg))
            }
        };

        job.completion.complete(reply);
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
