use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;

use super::domain::{
    ApplicationLogEntry, Job, JobId, NewReview, ReviewItem, ReviewStatus, REVIEW_PRIORITY_RANGE,
};

/// Persistence for jobs, the application log and the manual-review queue.
pub trait JobStore: Send + Sync {
    fn upsert_jobs(&self, jobs: &[Job]) -> Result<usize, StoreError>;
    fn job(&self, id: &JobId) -> Result<Option<Job>, StoreError>;
    fn append_application(&self, entry: ApplicationLogEntry) -> Result<(), StoreError>;
    fn applications(&self) -> Result<Vec<ApplicationLogEntry>, StoreError>;
    fn enqueue_review(&self, review: NewReview) -> Result<ReviewItem, StoreError>;
    /// Reviews ordered by priority, then age. `None` lists every status.
    fn reviews(&self, status: Option<ReviewStatus>) -> Result<Vec<ReviewItem>, StoreError>;
    fn resolve_review(
        &self,
        id: u64,
        resolution: &str,
        reviewer: &str,
    ) -> Result<ReviewItem, StoreError>;
    fn skip_review(&self, id: u64) -> Result<ReviewItem, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("review {0} not found")]
    ReviewNotFound(u64),
    #[error("review {id} is already {status}")]
    ReviewClosed { id: u64, status: ReviewStatus },
    #[error("review priority {0} is outside 1..=4")]
    InvalidPriority(u8),
    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store data is corrupt: {0}")]
    Json(#[from] serde_json::Error),
    #[error("application log is corrupt: {0}")]
    Csv(#[from] csv::Error),
}

/// Review queue transitions shared by the store implementations.
pub(crate) mod queue {
    use super::*;

    pub(crate) fn enqueue(
        items: &mut Vec<ReviewItem>,
        review: NewReview,
    ) -> Result<ReviewItem, StoreError> {
        if !REVIEW_PRIORITY_RANGE.contains(&review.priority) {
            return Err(StoreError::InvalidPriority(review.priority));
        }
        let id = items.iter().map(|item| item.id).max().unwrap_or(0) + 1;
        let item = ReviewItem::from_request(id, review, Utc::now());
        items.push(item.clone());
        Ok(item)
    }

    pub(crate) fn list(items: &[ReviewItem], status: Option<ReviewStatus>) -> Vec<ReviewItem> {
        let mut listed: Vec<ReviewItem> = items
            .iter()
            .filter(|item| status.map_or(true, |wanted| item.status == wanted))
            .cloned()
            .collect();
        listed.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        listed
    }

    pub(crate) fn close(
        items: &mut [ReviewItem],
        id: u64,
        status: ReviewStatus,
        resolution: Option<&str>,
        reviewer: Option<&str>,
    ) -> Result<ReviewItem, StoreError> {
        let item = items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or(StoreError::ReviewNotFound(id))?;
        if item.status != ReviewStatus::Pending {
            return Err(StoreError::ReviewClosed {
                id,
                status: item.status,
            });
        }

        let now = Utc::now();
        item.status = status;
        item.resolution = resolution.map(str::to_string);
        item.reviewer = reviewer.map(str::to_string);
        item.updated_at = now;
        item.resolved_at = Some(now);
        Ok(item.clone())
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    jobs: BTreeMap<JobId, Job>,
    applications: Vec<ApplicationLogEntry>,
    reviews: Vec<ReviewItem>,
}

/// Store kept entirely in memory. Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    state: Mutex<MemoryState>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl JobStore for MemoryJobStore {
    fn upsert_jobs(&self, jobs: &[Job]) -> Result<usize, StoreError> {
        let mut state = self.state();
        for job in jobs {
            state.jobs.insert(job.id(), job.clone());
        }
        Ok(jobs.len())
    }

    fn job(&self, id: &JobId) -> Result<Option<Job>, StoreError> {
        Ok(self.state().jobs.get(id).cloned())
    }

    fn append_application(&self, entry: ApplicationLogEntry) -> Result<(), StoreError> {
        self.state().applications.push(entry);
        Ok(())
    }

    fn applications(&self) -> Result<Vec<ApplicationLogEntry>, StoreError> {
        Ok(self.state().applications.clone())
    }

    fn enqueue_review(&self, review: NewReview) -> Result<ReviewItem, StoreError> {
        queue::enqueue(&mut self.state().reviews, review)
    }

    fn reviews(&self, status: Option<ReviewStatus>) -> Result<Vec<ReviewItem>, StoreError> {
        Ok(queue::list(&self.state().reviews, status))
    }

    fn resolve_review(
        &self,
        id: u64,
        resolution: &str,
        reviewer: &str,
    ) -> Result<ReviewItem, StoreError> {
        queue::close(
            &mut self.state().reviews,
            id,
            ReviewStatus::Resolved,
            Some(resolution),
            Some(reviewer),
        )
    }

    fn skip_review(&self, id: u64) -> Result<ReviewItem, StoreError> {
        queue::close(&mut self.state().reviews, id, ReviewStatus::Skipped, None, None)
    }
}

#[cfg(test)]
pub(crate) fn review_request(job: &Job, priority: u8) -> NewReview {
    NewReview {
        job_id: job.id(),
        review_type: "manual_application".into(),
        title: format!("Apply manually: {}", job.title),
        description: "captcha".into(),
        context: BTreeMap::from([("url".to_string(), job.url.clone().unwrap_or_default())]),
        priority,
        screenshot_path: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reviews_are_listed_by_priority_and_filtered_by_status() {
        let store = MemoryJobStore::new();
        let low = store
            .enqueue_review(review_request(&Job::new("https://a.com", "A", "Acme"), 3))
            .expect("enqueue");
        let urgent = store
            .enqueue_review(review_request(&Job::new("https://b.com", "B", "Acme"), 1))
            .expect("enqueue");

        let pending = store.reviews(Some(ReviewStatus::Pending)).expect("list");
        assert_eq!(
            pending.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![urgent.id, low.id]
        );

        store.skip_review(low.id).expect("skip");
        assert_eq!(store.reviews(Some(ReviewStatus::Pending)).expect("list").len(), 1);
        assert_eq!(store.reviews(Some(ReviewStatus::Skipped)).expect("list")[0].id, low.id);
        assert_eq!(store.reviews(None).expect("list").len(), 2);
    }

    #[test]
    fn resolve_records_reviewer_and_rejects_second_close() {
        let store = MemoryJobStore::new();
        let item = store
            .enqueue_review(review_request(&Job::new("https://a.com", "A", "Acme"), 2))
            .expect("enqueue");

        let resolved = store
            .resolve_review(item.id, "applied by hand", "sam")
            .expect("resolve");
        assert_eq!(resolved.status, ReviewStatus::Resolved);
        assert_eq!(resolved.reviewer.as_deref(), Some("sam"));
        assert!(resolved.resolved_at.is_some());

        match store.skip_review(item.id) {
            Err(StoreError::ReviewClosed { status, .. }) => {
                assert_eq!(status, ReviewStatus::Resolved)
            }
            other => panic!("expected closed review, got {other:?}"),
        }
        match store.resolve_review(99, "x", "y") {
            Err(StoreError::ReviewNotFound(99)) => {}
            other => panic!("expected missing review, got {other:?}"),
        }
    }

    #[test]
    fn rejects_out_of_range_priority() {
        let store = MemoryJobStore::new();
        match store.enqueue_review(review_request(&Job::new("https://a.com", "A", "Acme"), 5)) {
            Err(StoreError::InvalidPriority(5)) => {}
            other => panic!("expected invalid priority, got {other:?}"),
        }
    }
}
