use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use scraper::{ElementRef, Html, Selector};

use super::{BrowserContext, BrowserLauncher, BrowserOptions, Element, Page, PageError};

/// Supplies raw HTML for a URL.
pub trait PageSource: Send + Sync {
    fn fetch(&self, url: &str) -> Result<String, PageError>;
}

/// Fixed set of pages keyed by URL.
#[derive(Debug, Default, Clone)]
pub struct StaticPageSource {
    pages: HashMap<String, String>,
}

impl StaticPageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.insert(url, html);
        self
    }

    pub fn insert(&mut self, url: impl Into<String>, html: impl Into<String>) {
        self.pages.insert(url.into(), html.into());
    }
}

impl PageSource for StaticPageSource {
    fn fetch(&self, url: &str) -> Result<String, PageError> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| PageError::Navigation {
                url: url.to_string(),
                reason: "no page registered for url".to_string(),
            })
    }
}

#[derive(Debug, Default)]
struct PageState {
    url: String,
    html: String,
    values: HashMap<usize, String>,
    files: HashMap<usize, PathBuf>,
    clicks: Vec<usize>,
    closed: bool,
}

/// Page backed by a static HTML document.
///
/// Filled values, uploads and clicks live in an overlay on top of the parsed
/// markup; the markup itself never changes until the next `goto`.
pub struct HtmlPage {
    state: Mutex<PageState>,
    source: Option<Arc<dyn PageSource>>,
}

impl HtmlPage {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(PageState {
                url: url.into(),
                html: html.into(),
                ..PageState::default()
            }),
            source: None,
        }
    }

    pub fn blank(source: Arc<dyn PageSource>) -> Self {
        Self {
            state: Mutex::new(PageState::default()),
            source: Some(source),
        }
    }

    /// Marks the page as gone; every later call fails with [`PageError::Closed`].
    pub fn close(&self) {
        self.lock().closed = true;
    }

    pub fn click_count(&self) -> usize {
        self.lock().clicks.len()
    }

    fn lock(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open_state(&self) -> Result<MutexGuard<'_, PageState>, PageError> {
        let state = self.lock();
        if state.closed {
            return Err(PageError::Closed);
        }
        Ok(state)
    }

    fn resolve(&self, selector: &str) -> Result<Vec<Snapshot>, PageError> {
        let html = self.open_state()?.html.clone();
        let (css, text_filter) = split_has_text(selector);
        let parsed = Selector::parse(css).map_err(|err| PageError::InvalidSelector {
            selector: selector.to_string(),
            reason: err.to_string(),
        })?;

        let document = Html::parse_document(&html);
        let ordinals: HashMap<_, usize> = document
            .root_element()
            .descendants()
            .enumerate()
            .map(|(index, node)| (node.id(), index))
            .collect();

        let snapshots = document
            .select(&parsed)
            .filter(|element| match text_filter {
                Some(needle) => element.text().collect::<String>().contains(needle),
                None => true,
            })
            .map(|element| {
                let ordinal = ordinals.get(&element.id()).copied().unwrap_or(usize::MAX);
                Snapshot::capture(element, ordinal)
            })
            .collect();

        Ok(snapshots)
    }
}

impl Page for HtmlPage {
    fn url(&self) -> String {
        self.lock().url.clone()
    }

    fn goto(&self, url: &str) -> Result<(), PageError> {
        let current = self.open_state()?.url.clone();
        let html = match &self.source {
            Some(source) => source.fetch(url)?,
            None if current == url => return Ok(()),
            None => {
                return Err(PageError::Navigation {
                    url: url.to_string(),
                    reason: "page has no source to load from".to_string(),
                })
            }
        };

        let mut state = self.open_state()?;
        *state = PageState {
            url: url.to_string(),
            html,
            ..PageState::default()
        };
        Ok(())
    }

    fn content(&self) -> Result<String, PageError> {
        Ok(self.open_state()?.html.clone())
    }

    fn query_selector(&self, selector: &str) -> Result<Option<Box<dyn Element + '_>>, PageError> {
        Ok(self
            .resolve(selector)?
            .into_iter()
            .next()
            .map(|snapshot| Box::new(HtmlElement { page: self, snapshot }) as Box<dyn Element + '_>))
    }

    fn query_selector_all(
        &self,
        selector: &str,
    ) -> Result<Vec<Box<dyn Element + '_>>, PageError> {
        Ok(self
            .resolve(selector)?
            .into_iter()
            .map(|snapshot| Box::new(HtmlElement { page: self, snapshot }) as Box<dyn Element + '_>)
            .collect())
    }

    fn wait(&self, duration: Duration) -> Result<(), PageError> {
        drop(self.open_state()?);
        std::thread::sleep(duration);
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Snapshot {
    ordinal: usize,
    tag: String,
    input_type: String,
    value: String,
    visible: bool,
}

impl Snapshot {
    fn capture(element: ElementRef<'_>, ordinal: usize) -> Self {
        let tag = element.value().name().to_ascii_lowercase();
        let input_type = element
            .value()
            .attr("type")
            .unwrap_or("text")
            .to_ascii_lowercase();
        let value = if tag == "textarea" {
            element.text().collect()
        } else {
            element.value().attr("value").unwrap_or_default().to_string()
        };
        let hidden_input = tag == "input" && input_type == "hidden";
        let visible = !hidden_input
            && std::iter::once(element)
                .chain(element.ancestors().filter_map(ElementRef::wrap))
                .all(|node| !is_hidden(node));

        Self {
            ordinal,
            tag,
            input_type,
            value,
            visible,
        }
    }

    fn editable(&self) -> bool {
        matches!(self.tag.as_str(), "textarea" | "select")
            || (self.tag == "input" && self.input_type != "file")
    }

    fn file_input(&self) -> bool {
        self.tag == "input" && self.input_type == "file"
    }
}

fn is_hidden(element: ElementRef<'_>) -> bool {
    let node = element.value();
    if node.attr("hidden").is_some() || node.attr("aria-hidden") == Some("true") {
        return true;
    }
    node.attr("style")
        .map(|style| {
            let compact: String = style
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_ascii_lowercase();
            compact.contains("display:none") || compact.contains("visibility:hidden")
        })
        .unwrap_or(false)
}

/// Splits a `css:has-text("label")` selector into its CSS part and text filter.
fn split_has_text(selector: &str) -> (&str, Option<&str>) {
    let Some(start) = selector.find(":has-text(") else {
        return (selector, None);
    };
    let base = selector[..start].trim();
    let base = if base.is_empty() { "*" } else { base };
    let argument = selector[start + ":has-text(".len()..]
        .trim_end()
        .trim_end_matches(')')
        .trim_matches(|c| c == '"' || c == '\'');
    (base, Some(argument))
}

struct HtmlElement<'a> {
    page: &'a HtmlPage,
    snapshot: Snapshot,
}

impl Element for HtmlElement<'_> {
    fn fill(&self, value: &str) -> Result<(), PageError> {
        let mut state = self.page.open_state()?;
        if !self.snapshot.editable() {
            return Err(PageError::Unsupported("fill on a non-editable element"));
        }
        state.values.insert(self.snapshot.ordinal, value.to_string());
        Ok(())
    }

    fn set_input_files(&self, path: &Path) -> Result<(), PageError> {
        let mut state = self.page.open_state()?;
        if !self.snapshot.file_input() {
            return Err(PageError::Unsupported("file upload on a non-file input"));
        }
        state.files.insert(self.snapshot.ordinal, path.to_path_buf());
        Ok(())
    }

    fn click(&self) -> Result<(), PageError> {
        self.page.open_state()?.clicks.push(self.snapshot.ordinal);
        Ok(())
    }

    fn is_visible(&self) -> Result<bool, PageError> {
        drop(self.page.open_state()?);
        Ok(self.snapshot.visible)
    }

    fn input_value(&self) -> Result<String, PageError> {
        let state = self.page.open_state()?;
        if self.snapshot.file_input() {
            return Ok(state
                .files
                .get(&self.snapshot.ordinal)
                .and_then(|path| path.file_name())
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default());
        }
        if !self.snapshot.editable() {
            return Err(PageError::Unsupported("input value of a non-editable element"));
        }
        Ok(state
            .values
            .get(&self.snapshot.ordinal)
            .cloned()
            .unwrap_or_else(|| self.snapshot.value.clone()))
    }
}

/// Browser context whose pages are loaded from a [`PageSource`].
pub struct HtmlBrowser {
    source: Arc<dyn PageSource>,
    closed: AtomicBool,
}

impl HtmlBrowser {
    pub fn new(source: Arc<dyn PageSource>) -> Self {
        Self {
            source,
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl BrowserContext for HtmlBrowser {
    fn new_page(&self) -> Result<Box<dyn Page>, PageError> {
        if self.is_closed() {
            return Err(PageError::Closed);
        }
        Ok(Box::new(HtmlPage::blank(self.source.clone())))
    }

    fn close(&self) -> Result<(), PageError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

impl BrowserLauncher for Arc<dyn PageSource> {
    fn launch(&self, _options: &BrowserOptions) -> Result<Arc<dyn BrowserContext>, PageError> {
        Ok(Arc::new(HtmlBrowser::new(self.clone())))
    }
}
