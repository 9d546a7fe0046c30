//! Job records, candidate profiles and their persistence.

mod csv_io;
pub mod documents;
pub mod domain;
mod file_store;
pub mod store;

pub use csv_io::{
    csv_template, export_jobs_csv, preview_rows, write_jobs_csv, CsvImportError, JobCsvImporter,
    JobPreviewRow, CSV_IMPORT_SITE, EXPORT_COLUMNS,
};
pub use documents::{DocumentGenerator, ProfileDocuments, StaticDocuments};
pub use domain::{
    ApplicationLogEntry, CandidateProfile, GeneratedDocuments, Job, JobId, NewReview,
    ProfileError, ReviewItem, ReviewStatus, UNKNOWN_COMPANY, UNKNOWN_LOCATION, UNKNOWN_POSITION,
};
pub use file_store::FileJobStore;
pub use store::{JobStore, MemoryJobStore, StoreError};
