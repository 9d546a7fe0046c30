use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::domain::{ApplicationLogEntry, Job, JobId, NewReview, ReviewItem, ReviewStatus};
use super::store::{queue, JobStore, StoreError};

const JOBS_FILE: &str = "jobs.json";
const APPLICATIONS_FILE: &str = "applications.csv";
const REVIEWS_FILE: &str = "reviews.json";

/// Store backed by a per-profile directory: `jobs.json`, an append-only
/// `applications.csv` log and `reviews.json`.
#[derive(Debug)]
pub struct FileJobStore {
    root: PathBuf,
    lock: Mutex<()>,
}

impl FileJobStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            lock: Mutex::new(()),
        })
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn path(&self, file: &str) -> PathBuf {
        self.root.join(file)
    }

    fn read_json<T: DeserializeOwned + Default>(&self, file: &str) -> Result<T, StoreError> {
        let path = self.path(file);
        if !path.exists() {
            return Ok(T::default());
        }
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Writes through a temporary file so readers never see a partial document.
    fn write_json<T: Serialize>(&self, file: &str, value: &T) -> Result<(), StoreError> {
        let path = self.path(file);
        let staging = path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&staging)?);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.flush()?;
        }
        fs::rename(staging, path)?;
        Ok(())
    }

    fn update_reviews<T>(
        &self,
        change: impl FnOnce(&mut Vec<ReviewItem>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = self.guard();
        let mut reviews: Vec<ReviewItem> = self.read_json(REVIEWS_FILE)?;
        let outcome = change(&mut reviews)?;
        self.write_json(REVIEWS_FILE, &reviews)?;
        Ok(outcome)
    }
}

impl JobStore for FileJobStore {
    fn upsert_jobs(&self, jobs: &[Job]) -> Result<usize, StoreError> {
        let _guard = self.guard();
        let mut stored: BTreeMap<JobId, Job> = self.read_json(JOBS_FILE)?;
        for job in jobs {
            stored.insert(job.id(), job.clone());
        }
        self.write_json(JOBS_FILE, &stored)?;
        Ok(jobs.len())
    }

    fn job(&self, id: &JobId) -> Result<Option<Job>, StoreError> {
        let _guard = self.guard();
        let mut stored: BTreeMap<JobId, Job> = self.read_json(JOBS_FILE)?;
        Ok(stored.remove(id))
    }

    fn append_application(&self, entry: ApplicationLogEntry) -> Result<(), StoreError> {
        let _guard = self.guard();
        let path = self.path(APPLICATIONS_FILE);
        let needs_header = fs::metadata(&path).map(|meta| meta.len() == 0).unwrap_or(true);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(entry)?;
        writer.flush()?;
        Ok(())
    }

    fn applications(&self) -> Result<Vec<ApplicationLogEntry>, StoreError> {
        let _guard = self.guard();
        let path = self.path(APPLICATIONS_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(path)?;
        let entries = reader
            .deserialize::<ApplicationLogEntry>()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn enqueue_review(&self, review: NewReview) -> Result<ReviewItem, StoreError> {
        self.update_reviews(|reviews| queue::enqueue(reviews, review))
    }

    fn reviews(&self, status: Option<ReviewStatus>) -> Result<Vec<ReviewItem>, StoreError> {
        let _guard = self.guard();
        let reviews: Vec<ReviewItem> = self.read_json(REVIEWS_FILE)?;
        Ok(queue::list(&reviews, status))
    }

    fn resolve_review(
        &self,
        id: u64,
        resolution: &str,
        reviewer: &str,
    ) -> Result<ReviewItem, StoreError> {
        self.update_reviews(|reviews| {
            queue::close(
                reviews,
                id,
                ReviewStatus::Resolved,
                Some(resolution),
                Some(reviewer),
            )
        })
    }

    fn skip_review(&self, id: u64) -> Result<ReviewItem, StoreError> {
        self.update_reviews(|reviews| {
            queue::close(reviews, id, ReviewStatus::Skipped, None, None)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::jobs::store::review_request;
    use chrono::Utc;

    fn entry(job: &Job, status: &str) -> ApplicationLogEntry {
        ApplicationLogEntry {
            timestamp: Utc::now(),
            job_id: job.id(),
            title: job.title.clone(),
            company: job.company.clone(),
            url: job.url.clone().unwrap_or_default(),
            profile: "default".into(),
            status: status.into(),
            resume_path: String::new(),
            cover_letter_path: String::new(),
            ats: "greenhouse".into(),
        }
    }

    #[test]
    fn application_log_appends_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let job = Job::new("https://boards.greenhouse.io/acme/1", "Engineer", "Acme");

        let store = FileJobStore::open(dir.path()).expect("open");
        store.append_application(entry(&job, "Applied")).expect("append");
        drop(store);

        let reopened = FileJobStore::open(dir.path()).expect("reopen");
        reopened
            .append_application(entry(&job, "Failed (attempts: 3)"))
            .expect("append");

        let log = reopened.applications().expect("read log");
        assert_eq!(log.len(), 2);
        assert_eq!(log[1].status, "Failed (attempts: 3)");
        assert_eq!(log[0].job_id, job.id());
    }

    #[test]
    fn review_queue_persists_transitions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileJobStore::open(dir.path()).expect("open");
        let job = Job::new("https://a.com/job", "Analyst", "Acme");

        let first = store.enqueue_review(review_request(&job, 2)).expect("enqueue");
        let second = store.enqueue_review(review_request(&job, 2)).expect("enqueue");
        assert_eq!(second.id, first.id + 1);

        store.resolve_review(first.id, "done", "kim").expect("resolve");

        let reopened = FileJobStore::open(dir.path()).expect("reopen");
        let pending = reopened.reviews(Some(ReviewStatus::Pending)).expect("list");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, second.id);
        let resolved = reopened.reviews(Some(ReviewStatus::Resolved)).expect("list");
        assert_eq!(resolved[0].resolution.as_deref(), Some("done"));
    }

    #[test]
    fn jobs_are_upserted_by_id() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileJobStore::open(dir.path()).expect("open");
        let mut job = Job::new("https://a.com/job", "Analyst", "Acme");
        store.upsert_jobs(&[job.clone()]).expect("upsert");

        job.summary = "updated".into();
        store.upsert_jobs(&[job.clone()]).expect("upsert");

        let stored = store.job(&job.id()).expect("read").expect("present");
        assert_eq!(stored.summary, "updated");
    }
}
