pub mod ats;
pub mod batch;
pub mod deadline;
pub mod jobs;
