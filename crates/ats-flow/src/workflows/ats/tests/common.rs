use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::browser::{Element, HtmlPage, Page, PageError};
use crate::workflows::jobs::{CandidateProfile, GeneratedDocuments, Job};

pub(super) const GREENHOUSE_URL: &str = "https://boards.greenhouse.io/acme/jobs/123";
pub(super) const WORKDAY_URL: &str = "https://acme.wd1.myworkdayjobs.com/en-US/careers/job/123";
pub(super) const NEUTRAL_URL: &str = "https://careers.acme.example/jobs/123";

pub(super) fn profile() -> CandidateProfile {
    CandidateProfile {
        profile_name: "jane".to_string(),
        name: "Jane Doe".to_string(),
        email: "jane.doe@example.com".to_string(),
        phone: "+1 555 0100".to_string(),
        ..CandidateProfile::default()
    }
}

pub(super) fn documents() -> GeneratedDocuments {
    GeneratedDocuments {
        resume_path: "/tmp/jane/resume.pdf".to_string(),
        cover_letter_path: "/tmp/jane/cover_letter.pdf".to_string(),
    }
}

pub(super) fn job(url: &str) -> Job {
    Job::new(url, "Backend Engineer", "Acme")
}

pub(super) fn greenhouse_form() -> &'static str {
    r#"<html><body>
        <form id="application_form" class="application-form">
          <input type="text" name="job_application[first_name]" id="first_name">
          <input type="text" name="job_application[last_name]" id="last_name">
          <input type="email" name="job_application[email]" id="email">
          <input type="tel" name="job_application[phone]" id="phone">
          <input type="file" name="job_application[resume]">
          <input type="file" name="job_application[cover_letter]">
        </form>
        <p>Powered by Greenhouse</p>
      </body></html>"#
}

pub(super) fn workday_form() -> &'static str {
    r#"<html><body>
        <div data-automation-id="applyFlowPage">
          <input data-automation-id="legalNameSection_firstName" type="text">
          <input data-automation-id="legalNameSection_lastName" type="text">
          <input data-automation-id="email" type="text">
          <input data-automation-id="phone-number" type="text">
          <button data-automation-id="bottom-navigation-next-button">Next</button>
        </div>
      </body></html>"#
}

/// Plain form with no vendor markers.
pub(super) fn generic_form() -> &'static str {
    r#"<html><body>
        <form>
          <input name="first" type="text">
          <input name="surname_last" type="text" value="Existing">
          <input id="email" type="email">
          <input name="phone" type="tel">
          <input name="resume" type="file">
        </form>
      </body></html>"#
}

/// Wraps a page and counts every call that touches the document.
pub(super) struct CountingPage {
    inner: HtmlPage,
    calls: AtomicUsize,
}

impl CountingPage {
    pub(super) fn new(inner: HtmlPage) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl Page for CountingPage {
    fn url(&self) -> String {
        self.inner.url()
    }

    fn goto(&self, url: &str) -> Result<(), PageError> {
        self.touch();
        self.inner.goto(url)
    }

    fn content(&self) -> Result<String, PageError> {
        self.touch();
        self.inner.content()
    }

    fn query_selector(&self, selector: &str) -> Result<Option<Box<dyn Element + '_>>, PageError> {
        self.touch();
        self.inner.query_selector(selector)
    }

    fn query_selector_all(
        &self,
        selector: &str,
    ) -> Result<Vec<Box<dyn Element + '_>>, PageError> {
        self.touch();
        self.inner.query_selector_all(selector)
    }

    fn wait(&self, duration: Duration) -> Result<(), PageError> {
        self.touch();
        self.inner.wait(duration)
    }
}

/// Page whose content can never be read but whose selectors still work.
pub(super) struct UnreadablePage {
    pub(super) inner: HtmlPage,
    pub(super) error: PageError,
}

impl Page for UnreadablePage {
    fn url(&self) -> String {
        self.inner.url()
    }

    fn goto(&self, url: &str) -> Result<(), PageError> {
        self.inner.goto(url)
    }

    fn content(&self) -> Result<String, PageError> {
        Err(self.error.clone())
    }

    fn query_selector(&self, selector: &str) -> Result<Option<Box<dyn Element + '_>>, PageError> {
        self.inner.query_selector(selector)
    }

    fn query_selector_all(
        &self,
        selector: &str,
    ) -> Result<Vec<Box<dyn Element + '_>>, PageError> {
        self.inner.query_selector_all(selector)
    }

    fn wait(&self, duration: Duration) -> Result<(), PageError> {
        self.inner.wait(duration)
    }
}

pub(super) fn value_of(page: &dyn Page, selector: &str) -> String {
    page.query_selector(selector)
        .expect("selector parses")
        .expect("element present")
        .input_value()
        .expect("value readable")
}
