use shared::{Contact, ContactPayload, Status};

use super::{optional, required, EditableForm, Field, FieldKind, FormError, SubmitError};
use crate::api::{ApiError, Backend};
use crate::dashboard::{Loadable, Ticket};
use crate::nav::{Route, Section};

pub const LOAD_FAILED: &str = "Failed to load data. Please try again.";
pub const SAVE_FAILED: &str = "Failed to save contact. Please try again.";

/// New contacts start as "New Contact".
const DEFAULT_STATUS_ID: i64 = 1;

const FIELDS: &[Field] = &[
    Field::new("name", "Name", FieldKind::Text).required(),
    Field::new("location", "Location", FieldKind::Text),
    Field::new("phone", "Phone", FieldKind::Text),
    Field::new("email", "Email", FieldKind::Text),
    Field::new("current_status_id", "Status", FieldKind::Choice).required(),
    Field::new("notes", "Notes", FieldKind::Multiline),
];

#[derive(Debug, Clone)]
pub struct ContactFormData {
    pub statuses: Vec<Status>,
    pub contact: Option<Contact>,
}

#[derive(Debug, Clone)]
pub struct ContactForm {
    edit_id: Option<i64>,
    pub name: String,
    pub location: String,
    pub phone: String,
    pub email: String,
    pub notes: String,
    current_status_id: i64,
    data: Loadable<ContactFormData>,
    error: Option<String>,
    saving: bool,
}

impl ContactForm {
    pub fn new(edit_id: Option<i64>) -> Self {
        Self {
            edit_id,
            name: String::new(),
            location: String::new(),
            phone: String::new(),
            email: String::new(),
            notes: String::new(),
            current_status_id: DEFAULT_STATUS_ID,
            data: Loadable::default(),
            error: None,
            saving: false,
        }
    }

    pub fn edit_id(&self) -> Option<i64> {
        self.edit_id
    }

    pub fn current_status_id(&self) -> i64 {
        self.current_status_id
    }

    pub fn statuses(&self) -> &[Status] {
        self.data.value().map(|d| d.statuses.as_slice()).unwrap_or_default()
    }

    pub fn is_loading(&self) -> bool {
        self.data.is_loading()
    }

    pub fn load_error(&self) -> Option<&str> {
        self.data.error()
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn begin_load(&mut self) -> Ticket {
        self.data.begin()
    }

    /// Statuses, plus the contact being edited.
    pub async fn fetch(backend: &Backend, edit_id: Option<i64>) -> Result<ContactFormData, ApiError> {
        match edit_id {
            Some(id) => {
                let (statuses, contact) =
                    tokio::try_join!(backend.core.list_statuses(), backend.core.get_contact(id))?;
                Ok(ContactFormData {
                    statuses: statuses.statuses,
                    contact: Some(contact),
                })
            }
            None => Ok(ContactFormData {
                statuses: backend.core.list_statuses().await?.statuses,
                contact: None,
            }),
        }
    }

    pub fn finish_load(&mut self, ticket: Ticket, result: Result<ContactFormData, ApiError>) -> bool {
        if !self.data.finish(ticket, result, LOAD_FAILED) {
            return false;
        }
        let contact = self.data.value().and_then(|d| d.contact.clone());
        if let Some(contact) = contact {
            self.fill(&contact);
        }
        true
    }

    pub async fn load(&mut self, backend: &Backend) {
        let ticket = self.begin_load();
        let result = Self::fetch(backend, self.edit_id).await;
        self.finish_load(ticket, result);
    }

    fn fill(&mut self, contact: &Contact) {
        self.name = contact.name.clone();
        self.location = contact.location.clone().unwrap_or_default();
        self.phone = contact.phone.clone().unwrap_or_default();
        self.email = contact.email.clone().unwrap_or_default();
        self.notes = contact.notes.clone().unwrap_or_default();
        self.current_status_id = contact.current_status_id;
    }

    pub fn payload(&self) -> Result<ContactPayload, FormError> {
        Ok(ContactPayload {
            name: required(&self.name, "Name")?,
            email: optional(&self.email),
            phone: optional(&self.phone),
            location: optional(&self.location),
            notes: optional(&self.notes),
            current_status_id: self.current_status_id,
        })
    }

    pub async fn save(&self, backend: &Backend) -> Result<Contact, SubmitError> {
        let payload = self.payload()?;
        let contact = match self.edit_id {
            Some(id) => backend.core.update_contact(id, &payload).await?,
            None => backend.core.create_contact(&payload).await?,
        };
        Ok(contact)
    }

    /// Mark a save as in flight. Returns `false` while one already is.
    pub fn begin_submit(&mut self) -> bool {
        if self.saving {
            return false;
        }
        self.error = None;
        self.saving = true;
        true
    }

    /// Go to the contact list after a save, or show why it failed.
    pub fn finish_submit(&mut self, backend: &Backend, result: Result<Contact, SubmitError>) -> bool {
        self.saving = false;
        match result {
            Ok(contact) => {
                tracing::info!(contact_id = contact.id, "Saved contact");
                backend
                    .session()
                    .navigator()
                    .navigate(Route::Dashboard(Section::Contacts));
                true
            }
            Err(e) => {
                self.error = Some(e.message(SAVE_FAILED));
                false
            }
        }
    }

    /// Create or update, then go to the contact list. Returns whether it saved.
    pub async fn submit(&mut self, backend: &Backend) -> bool {
        if !self.begin_submit() {
            return false;
        }
        let result = self.save(backend).await;
        self.finish_submit(backend, result)
    }

    /// Carry the ticket sequence over from the form this one replaces.
    pub fn after(mut self, previous: &ContactForm) -> Self {
        self.data = Loadable::succeeding(&previous.data);
        self
    }

    pub fn cancel(&self, backend: &Backend) {
        let route = match self.edit_id {
            Some(id) => Route::ContactDetail(id),
            None => Route::Dashboard(Section::Contacts),
        };
        backend.session().navigator().navigate(route);
    }
}

impl EditableForm for ContactForm {
    fn title(&self) -> String {
        match self.edit_id {
            Some(_) => "Edit Contact".to_string(),
            None => "Add New Contact".to_string(),
        }
    }

    fn fields(&self) -> &'static [Field] {
        FIELDS
    }

    fn value(&self, key: &str) -> String {
        match key {
            "name" => self.name.clone(),
            "location" => self.location.clone(),
            "phone" => self.phone.clone(),
            "email" => self.email.clone(),
            "notes" => self.notes.clone(),
            "current_status_id" => self.current_status_id.to_string(),
            _ => String::new(),
        }
    }

    fn set_value(&mut self, key: &str, value: String) {
        match key {
            "name" => self.name = value,
            "location" => self.location = value,
            "phone" => self.phone = value,
            "email" => self.email = value,
            "notes" => self.notes = value,
            // The selector always holds a valid id, so it is parsed right away.
            "current_status_id" => match value.trim().parse() {
                Ok(id) => self.current_status_id = id,
                Err(_) => tracing::debug!(%value, "Ignoring non-numeric status id"),
            },
            _ => {}
        }
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref().or(self.data.error())
    }

    fn choices(&self, key: &str) -> Vec<(String, String)> {
        match key {
            "current_status_id" => self
                .statuses()
                .iter()
                .map(|s| (s.id.to_string(), s.name.clone()))
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{contact_json, default_statuses, TestEnv};
    use serde_json::json;

    #[test]
    fn test_new_form_defaults_to_first_status() {
        let form = ContactForm::new(None);
        assert_eq!(form.current_status_id(), 1);
        assert_eq!(form.title(), "Add New Contact");
        assert_eq!(form.payload(), Err(FormError::Missing("Name")));
    }

    #[test]
    fn test_status_parsed_on_change() {
        let mut form = ContactForm::new(None);
        form.set_value("current_status_id", "3".to_string());
        assert_eq!(form.current_status_id(), 3);
        form.set_value("current_status_id", "abc".to_string());
        assert_eq!(form.current_status_id(), 3);
        assert_eq!(form.value("current_status_id"), "3");
    }

    #[tokio::test]
    async fn test_create_navigates_to_contacts() {
        let env = TestEnv::signed_in().await;
        env.stub.respond("GET", "/statuses", 200, default_statuses());
        env.stub.respond("POST", "/contacts", 201, contact_json(12, "John Smith", 1));

        let mut form = ContactForm::new(None);
        form.load(&env.backend).await;
        assert_eq!(form.choices("current_status_id").len(), 4);

        form.set_value("name", "John Smith".to_string());
        form.set_value("phone", "555-0100".to_string());
        assert!(form.submit(&env.backend).await);
        assert_eq!(env.route(), Route::Dashboard(Section::Contacts));

        let body = env.stub.last("POST", "/contacts").unwrap().json();
        assert_eq!(
            body,
            json!({"name": "John Smith", "phone": "555-0100", "current_status_id": 1})
        );
    }

    #[tokio::test]
    async fn test_edit_loads_contact_and_puts() {
        let env = TestEnv::signed_in().await;
        env.stub.respond("GET", "/statuses", 200, default_statuses());
        env.stub.respond("GET", "/contacts/7", 200, contact_json(7, "Mary Jones", 2));
        env.stub.respond("PUT", "/contacts/7", 200, contact_json(7, "Mary Jones", 3));

        let mut form = ContactForm::new(Some(7));
        form.load(&env.backend).await;
        assert_eq!(form.name, "Mary Jones");
        assert_eq!(form.current_status_id(), 2);
        assert_eq!(form.title(), "Edit Contact");

        form.set_value("current_status_id", "3".to_string());
        assert!(form.submit(&env.backend).await);
        assert_eq!(env.stub.last("PUT", "/contacts/7").unwrap().json()["current_status_id"], 3);
    }

    #[tokio::test]
    async fn test_rejected_save_stays_on_form() {
        let env = TestEnv::signed_in().await;
        env.stub.respond("POST", "/contacts", 400, json!({"error": "Invalid email"}));

        let mut form = ContactForm::new(None);
        form.name = "John Smith".to_string();
        assert!(!form.submit(&env.backend).await);
        assert_eq!(form.error(), Some(SAVE_FAILED));
        assert_eq!(env.route(), Route::Dashboard(Section::Overview));
    }

    #[test]
    fn test_second_submit_waits_for_the_first() {
        let mut form = ContactForm::new(None);
        assert!(form.begin_submit());
        assert!(form.is_saving());
        assert!(!form.begin_submit());
    }
}
