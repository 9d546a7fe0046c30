use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::domain::{CandidateProfile, GeneratedDocuments, Job};

/// Produces the resume and cover letter attached to an application.
/// Returning an empty path signals that generation failed.
pub trait DocumentGenerator: Send + Sync {
    fn customize(&self, job: &Job, profile: &CandidateProfile) -> GeneratedDocuments;
}

const RESUME_CANDIDATES: [&str; 3] = ["resume.pdf", "resume.docx", "resume.txt"];
const COVER_LETTER_CANDIDATES: [&str; 3] =
    ["cover_letter.pdf", "cover_letter.docx", "cover_letter.txt"];

/// Uses the documents already stored in the profile directory for every job.
#[derive(Debug, Clone)]
pub struct ProfileDocuments {
    profile_dir: PathBuf,
}

impl ProfileDocuments {
    pub fn new(profile_dir: impl Into<PathBuf>) -> Self {
        Self {
            profile_dir: profile_dir.into(),
        }
    }

    fn locate(&self, candidates: &[&str]) -> String {
        candidates
            .iter()
            .map(|name| self.profile_dir.join(name))
            .find(|path| path.is_file())
            .map(|path| path.display().to_string())
            .unwrap_or_default()
    }
}

impl DocumentGenerator for ProfileDocuments {
    fn customize(&self, job: &Job, _profile: &CandidateProfile) -> GeneratedDocuments {
        let documents = GeneratedDocuments {
            resume_path: self.locate(&RESUME_CANDIDATES),
            cover_letter_path: self.locate(&COVER_LETTER_CANDIDATES),
        };
        if documents.is_complete() {
            debug!(job = %job.display_title(), "using profile documents");
        } else {
            warn!(
                profile_dir = %self.profile_dir.display(),
                "profile directory is missing a resume or cover letter"
            );
        }
        documents
    }
}

/// Fixed paths, handy for dry runs.
#[derive(Debug, Clone, Default)]
pub struct StaticDocuments {
    documents: GeneratedDocuments,
}

impl StaticDocuments {
    pub fn new(resume: &Path, cover_letter: &Path) -> Self {
        Self {
            documents: GeneratedDocuments {
                resume_path: resume.display().to_string(),
                cover_letter_path: cover_letter.display().to_string(),
            },
        }
    }
}

impl DocumentGenerator for StaticDocuments {
    fn customize(&self, _job: &Job, _profile: &CandidateProfile) -> GeneratedDocuments {
        self.documents.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn profile_documents_prefer_pdf_and_report_missing_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("resume.txt"), "text").expect("write");
        fs::write(dir.path().join("resume.pdf"), "pdf").expect("write");

        let generator = ProfileDocuments::new(dir.path());
        let job = Job::new("https://a.com", "Engineer", "Acme");
        let documents = generator.customize(&job, &CandidateProfile::default());

        assert!(documents.resume_path.ends_with("resume.pdf"));
        assert_eq!(documents.cover_letter_path, "");
        assert!(!documents.is_complete());
    }
}
