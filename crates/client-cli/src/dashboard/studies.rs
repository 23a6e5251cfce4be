use chrono::NaiveDate;
use shared::{Contact, Lesson, Study, StudyStats};

use super::{describe_failure, lookup, resolve, Loadable, Ticket, UNKNOWN_CONTACT, UNKNOWN_LESSON};
use crate::api::{ApiError, Backend};
use crate::forms::{EditableForm, StudyForm, SubmitError};
use crate::format;

pub const LOAD_FAILED: &str = "Failed to load data. Please try again later.";
pub const STUDIES_FAILED: &str = "Failed to load studies. Please try again later.";
pub const EMPTY: &str = "No studies recorded yet. Add a new study to get started.";
pub const NO_CONTACTS: &str = "No contacts found. Add a contact before recording studies.";
pub const SAVE_FAILED: &str = "Failed to save study. This lesson might already be recorded for that date.";
pub const DELETE_FAILED: &str = "Failed to delete study.";

#[derive(Debug, Clone)]
pub struct StudiesReference {
    pub contacts: Vec<Contact>,
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Clone)]
pub struct ContactStudies {
    pub contact_id: i64,
    pub studies: Vec<Study>,
    pub stats: StudyStats,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyRow {
    pub id: i64,
    pub lesson: String,
    pub date: String,
    pub duration: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSummary {
    pub completed: String,
    pub progress: String,
    pub last_study: String,
    pub total_time: String,
}

pub struct StudiesDashboard {
    page_size: u32,
    reference: Loadable<StudiesReference>,
    selected: Option<i64>,
    studies: Loadable<ContactStudies>,
    form: Option<StudyForm>,
    notice: Option<String>,
}

impl StudiesDashboard {
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size,
            reference: Loadable::default(),
            selected: None,
            studies: Loadable::default(),
            form: None,
            notice: None,
        }
    }

    pub fn reference(&self) -> &Loadable<StudiesReference> {
        &self.reference
    }

    pub fn studies(&self) -> &Loadable<ContactStudies> {
        &self.studies
    }

    pub fn selected(&self) -> Option<i64> {
        self.selected
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    fn contacts(&self) -> &[Contact] {
        self.reference.value().map(|r| r.contacts.as_slice()).unwrap_or_default()
    }

    fn lessons(&self) -> &[Lesson] {
        self.reference.value().map(|r| r.lessons.as_slice()).unwrap_or_default()
    }

    pub fn begin_reference(&mut self) -> (Ticket, u32) {
        (self.reference.begin(), self.page_size)
    }

    pub async fn fetch_reference(backend: &Backend, page_size: u32) -> Result<StudiesReference, ApiError> {
        let (contacts, lessons) = tokio::try_join!(
            backend.core.list_contacts(page_size, 0),
            backend.studies.list_lessons()
        )?;
        Ok(StudiesReference {
            contacts: contacts.contacts,
            lessons: lessons.lessons,
        })
    }

    /// Commit contacts and lessons. Returns `true` when this picked a contact
    /// whose studies now need loading.
    pub fn finish_reference(&mut self, ticket: Ticket, result: Result<StudiesReference, ApiError>) -> bool {
        if !self.reference.finish(ticket, result, LOAD_FAILED) {
            return false;
        }
        if self.selected.is_none() {
            self.selected = self.contacts().first().map(|c| c.id);
            return self.selected.is_some();
        }
        false
    }

    /// Returns `true` when the selection changed and studies need loading.
    pub fn select_contact(&mut self, contact_id: i64) -> bool {
        if self.selected == Some(contact_id) {
            return false;
        }
        self.selected = Some(contact_id);
        self.form = None;
        true
    }

    /// Step the selection through the contact list.
    pub fn cycle_contact(&mut self, forward: bool) -> bool {
        let contacts = self.contacts();
        if contacts.is_empty() {
            return false;
        }
        let len = contacts.len();
        let index = self
            .selected
            .and_then(|id| contacts.iter().position(|c| c.id == id))
            .unwrap_or(0);
        let next = if forward { (index + 1) % len } else { (index + len - 1) % len };
        let id = contacts[next].id;
        self.select_contact(id)
    }

    pub fn begin_studies(&mut self) -> Option<(Ticket, i64)> {
        let contact_id = self.selected?;
        Some((self.studies.begin(), contact_id))
    }

    pub async fn fetch_studies(backend: &Backend, contact_id: i64) -> Result<ContactStudies, ApiError> {
        let (studies, stats) = tokio::try_join!(
            backend.studies.studies_for_contact(contact_id),
            backend.studies.study_stats(contact_id)
        )?;
        Ok(ContactStudies {
            contact_id,
            studies: studies.studies,
            stats,
        })
    }

    pub fn finish_studies(&mut self, ticket: Ticket, result: Result<ContactStudies, ApiError>) -> bool {
        self.studies.finish(ticket, result, STUDIES_FAILED)
    }

    pub async fn refresh_studies(&mut self, backend: &Backend) {
        if let Some((ticket, contact_id)) = self.begin_studies() {
            let result = Self::fetch_studies(backend, contact_id).await;
            self.finish_studies(ticket, result);
        }
    }

    /// Full mount: reference lists, then the selected contact's studies.
    pub async fn refresh(&mut self, backend: &Backend) {
        let (ticket, page_size) = self.begin_reference();
        let result = Self::fetch_reference(backend, page_size).await;
        self.finish_reference(ticket, result);
        self.refresh_studies(backend).await;
    }

    pub fn contact_name(&self, contact_id: i64) -> &str {
        resolve(self.contacts(), contact_id, UNKNOWN_CONTACT)
    }

    pub fn lesson_title<'a>(&'a self, study: &'a Study) -> &'a str {
        match study.lesson_title.as_deref() {
            Some(title) if !title.is_empty() => title,
            _ => resolve(self.lessons(), study.lesson_id, UNKNOWN_LESSON),
        }
    }

    /// Studies of the selected contact; empty while another contact's are shown.
    pub fn current(&self) -> Option<&ContactStudies> {
        self.studies
            .value()
            .filter(|s| Some(s.contact_id) == self.selected)
    }

    pub fn rows(&self) -> Vec<StudyRow> {
        let Some(current) = self.current() else {
            return Vec::new();
        };
        current
            .studies
            .iter()
            .map(|study| StudyRow {
                id: study.id,
                lesson: self.lesson_title(study).to_string(),
                date: format::date(&study.date_completed),
                duration: study
                    .duration_minutes
                    .map(|m| format!("{} min", m))
                    .unwrap_or_else(|| format::DASH.to_string()),
                location: format::or_dash(study.location.as_deref()),
            })
            .collect()
    }

    pub fn stats(&self) -> Option<StatsSummary> {
        let stats = &self.current()?.stats;
        Some(StatsSummary {
            completed: format!("{} / {}", stats.completed_lessons, stats.total_lessons),
            progress: format::percent(stats.progress_percentage),
            last_study: stats
                .last_study_date
                .as_ref()
                .map(format::date)
                .unwrap_or_else(|| "None".to_string()),
            total_time: format::duration(stats.total_study_time_minutes),
        })
    }

    pub fn empty_message(&self) -> Option<&'static str> {
        if self.reference.value().is_some() && self.contacts().is_empty() {
            return Some(NO_CONTACTS);
        }
        match self.current() {
            Some(current) if current.studies.is_empty() => Some(EMPTY),
            _ => None,
        }
    }

    pub fn form(&self) -> Option<&StudyForm> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut StudyForm> {
        self.form.as_mut()
    }

    pub fn open_new_form(&mut self, today: NaiveDate) -> bool {
        let Some(contact_id) = self.selected else {
            return false;
        };
        self.form = Some(StudyForm::new(contact_id, self.lessons().to_vec(), today));
        true
    }

    pub fn open_edit_form(&mut self, study_id: i64) -> bool {
        let Some(study) = self.current().and_then(|c| c.studies.iter().find(|s| s.id == study_id)) else {
            return false;
        };
        let form = StudyForm::edit(study, self.lessons().to_vec());
        self.form = Some(form);
        true
    }

    pub fn close_form(&mut self) {
        self.form = None;
    }

    /// Close the form after a save, or show why it failed. Returns `true`
    /// when the contact's studies need reloading.
    pub fn study_saved(&mut self, result: Result<Study, SubmitError>) -> bool {
        match result {
            Ok(_) => {
                self.form = None;
                self.notice = None;
                true
            }
            Err(e) => {
                if let Some(form) = self.form.as_mut() {
                    form.set_error(e.message(SAVE_FAILED));
                }
                false
            }
        }
    }

    /// Save the open form, then close it and reload the contact's studies.
    pub async fn submit_form(&mut self, backend: &Backend) -> bool {
        let Some(form) = self.form.as_ref() else {
            return false;
        };
        let result = form.save(backend).await;
        if !self.study_saved(result) {
            return false;
        }
        self.refresh_studies(backend).await;
        true
    }

    pub fn study_deleted(&mut self, study_id: i64, result: Result<(), ApiError>) -> bool {
        match result {
            Ok(()) => {
                tracing::info!(study_id, "Deleted study");
                self.notice = None;
                true
            }
            Err(e) => {
                self.notice = Some(describe_failure(&e, DELETE_FAILED));
                false
            }
        }
    }

    pub async fn delete_study(&mut self, backend: &Backend, study_id: i64) -> bool {
        self.notice = None;
        let result = backend.studies.delete_study(study_id).await;
        if !self.study_deleted(study_id, result) {
            return false;
        }
        self.refresh_studies(backend).await;
        true
    }

    /// Contact shown in the selector, if any.
    pub fn selected_contact(&self) -> Option<&Contact> {
        lookup(self.contacts(), self.selected?)
    }

    pub fn form_title(&self) -> Option<String> {
        self.form.as_ref().map(|f| f.title())
    }
}
