use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, warn};

use super::catalog::FieldMapping;
use super::domain::FormField;
use crate::browser::{Element, Page, PageError};
use crate::workflows::jobs::{CandidateProfile, GeneratedDocuments};

/// Values available for filling, keyed by logical field. Empty values are
/// never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValues {
    values: BTreeMap<FormField, String>,
}

impl FieldValues {
    pub fn from_profile(profile: &CandidateProfile) -> Self {
        let mut values = Self::default();
        values.set(FormField::FirstName, profile.first_name());
        values.set(FormField::LastName, profile.last_name());
        values.set(FormField::Email, profile.email.clone());
        values.set(FormField::Phone, profile.phone.clone());
        values
    }

    pub fn with_documents(mut self, documents: Option<&GeneratedDocuments>) -> Self {
        if let Some(documents) = documents {
            self.set(FormField::Resume, documents.resume_path.clone());
            self.set(FormField::CoverLetter, documents.cover_letter_path.clone());
        }
        self
    }

    pub fn set(&mut self, field: FormField, value: String) {
        if value.trim().is_empty() {
            self.values.remove(&field);
        } else {
            self.values.insert(field, value);
        }
    }

    pub fn get(&self, field: FormField) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }
}

/// Fills profile fields through `mapping`. See [`fill_values`].
pub fn fill_fields(
    page: &dyn Page,
    profile: &CandidateProfile,
    mapping: &FieldMapping,
) -> Result<BTreeMap<FormField, String>, PageError> {
    fill_values(page, &FieldValues::from_profile(profile), mapping)
}

/// Fills every mapped field that has a value, returning the fields that
/// were written. For each field the selectors are tried in order and the
/// first one resolving to an empty element is used; elements that already
/// hold a value are never touched. A field with no usable selector is
/// simply missing from the result. Only a page that has gone away aborts
/// the fill.
pub fn fill_values(
    page: &dyn Page,
    values: &FieldValues,
    mapping: &FieldMapping,
) -> Result<BTreeMap<FormField, String>, PageError> {
    let mut filled = BTreeMap::new();

    for field in mapping.fields() {
        let Some(value) = values.get(field) else {
            continue;
        };

        if fill_field(page, field, mapping.selectors(field), value)? {
            filled.insert(field, value.to_string());
        } else {
            debug!(field = field.as_str(), "no empty element matched field");
        }
    }

    Ok(filled)
}

fn fill_field(
    page: &dyn Page,
    field: FormField,
    selectors: &[&str],
    value: &str,
) -> Result<bool, PageError> {
    for selector in selectors {
        let element = match page.query_selector(selector) {
            Ok(Some(element)) => element,
            Ok(None) => continue,
            Err(err) => {
                soft_failure(field, selector, err)?;
                continue;
            }
        };

        match write_if_empty(element.as_ref(), field, value) {
            Ok(true) => {
                debug!(field = field.as_str(), selector, "field filled");
                return Ok(true);
            }
            Ok(false) => continue,
            Err(err) => soft_failure(field, selector, err)?,
        }
    }

    Ok(false)
}

fn write_if_empty(element: &dyn Element, field: FormField, value: &str) -> Result<bool, PageError> {
    if !element.input_value()?.is_empty() {
        return Ok(false);
    }

    if field.is_upload() {
        element.set_input_files(Path::new(value))?;
    } else {
        element.fill(value)?;
    }
    Ok(true)
}

fn soft_failure(field: FormField, selector: &str, err: PageError) -> Result<(), PageError> {
    if err.is_page_gone() {
        warn!(field = field.as_str(), selector, "page closed while filling");
        return Err(err);
    }
    debug!(field = field.as_str(), selector, error = %err, "selector skipped");
    Ok(())
}
