//! Queue job types and their completion contract.

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use uuid::Uuid;

use jobradar_models::{SearchParams, SourceResult, VacancyDetails};

use crate::error::ManagerError;

/// Successful manager answer: the per-source results plus an optional
/// degradation note the caller may surface.
#[derive(Debug)]
pub struct SearchOutcome {
    pub results: Vec<SourceResult>,
    pub warning: Option<SearchWarning>,
}

impl SearchOutcome {
    pub fn clean(results: Vec<SourceResult>) -> Self {
        Self {
            results,
            warning: None,
        }
    }
}

/// How a degraded-but-answerable search was salvaged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchWarning {
    /// A circuit breaker interfered but some results survived.
    PartialBreaker(String),
    /// Some sources failed alongside usable results.
    PartialFailure(String),
    /// Fresh fan-out failed entirely; these results come from the cache.
    StaleCache(String),
}

impl SearchWarning {
    pub fn message(&self) -> &str {
        match self {
            SearchWarning::PartialBreaker(msg)
            | SearchWarning::PartialFailure(msg)
            | SearchWarning::StaleCache(msg) => msg,
        }
    }
}

pub(crate) type SearchReply = Result<SearchOutcome, ManagerError>;
pub(crate) type DetailsReply = Result<VacancyDetails, ManagerError>;

/// One-shot completion slot. Delivery happens at most once: the sender
/// is taken out on first use, and a dropped receiver is ignored rather
/// than treated as an error.
#[derive(Debug)]
pub(crate) struct CompletionSlot<T> {
    tx: Option<oneshot::Sender<T>>,
}

impl<T> CompletionSlot<T> {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub(crate) fn complete(&mut self, value: T) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(value);
        }
    }
}

#[derive(Debug)]
pub(crate) struct SearchJob {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub params: SearchParams,
    pub completion: CompletionSlot<SearchReply>,
}

impl SearchJob {
    pub(crate) fn new(params: SearchParams) -> (Self, oneshot::Receiver<SearchReply>) {
        let (completion, rx) = CompletionSlot::channel();
        (
            Self {
                id: Uuid::new_v4(),
                created_at: Utc::now(),
                params,
                completion,
            },
            rx,
        )
    }
}

#[derive(Debug)]
pub(crate) struct FetchDetailsJob {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub source: String,
    pub vacancy_id: String,
    pub completion: CompletionSlot<DetailsReply>,
}

impl FetchDetailsJob {
    pub(crate) fn new(
        source: impl Into<String>,
        vacancy_id: impl Into<String>,
    ) -> (Self, oneshot::Receiver<DetailsReply>) {
        let (completion, rx) = CompletionSlot::channel();
        (
            Self {
                id: Uuid::new_v4(),
                created_at: Utc::now(),
                source: source.into(),
                vacancy_id: vacancy_id.into(),
                completion,
            },
            rx,
        )
    }
}

/// Work item carried by the manager's queue.
#[derive(Debug)]
pub(crate) enum Job {
    Search(SearchJob),
    FetchDetails(FetchDetailsJob),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completion_delivers_once_and_tolerates_repeats() {
        let (mut slot, rx) = CompletionSlot::<u32>::channel();
        slot.complete(1);
        slot.complete(2);
        assert_eq!(rx.await.unwrap(), 1);
    }

    #[tokio::test]
    async fn completion_tolerates_a_dropped_receiver() {
        let (mut slot, rx) = CompletionSlot::<u32>::channel();
        drop(rx);
        slot.complete(1);
    }

    #[test]
    fn jobs_carry_stable_ids() {
        let (a, _rx_a) = SearchJob::new(SearchParams::new("go"));
        let (b, _rx_b) = SearchJob::new(SearchParams::new("go"));
        assert_ne!(a.id, b.id);
        assert!(a.created_at <= Utc::now());
    }
}
