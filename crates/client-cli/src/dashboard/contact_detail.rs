use shared::{Contact, Status, StatusHistory};

use super::contacts::{contact_row, ContactRow};
use super::{describe_failure, resolve, Loadable, Ticket, UNKNOWN_STATUS};
use crate::api::{ApiError, Backend};
use crate::format;
use crate::nav::{Route, Section};

pub const LOAD_FAILED: &str = "Failed to load contact. Please try again.";
pub const NOT_FOUND: &str = "Contact not found";
pub const BACK_TO_CONTACTS: &str = "Back to Contacts";
pub const HISTORY_EMPTY: &str = "No status changes recorded yet.";
pub const STATUS_FAILED: &str = "Failed to update status. Please choose a different status and try again.";
pub const DELETE_FAILED: &str = "Failed to delete contact. Please try again.";

#[derive(Debug, Clone)]
pub struct ContactDetailView {
    pub contact: Contact,
    pub statuses: Vec<Status>,
    pub history: Vec<StatusHistory>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    pub status: String,
    pub changed: String,
    pub notes: Option<String>,
}

pub struct ContactDetail {
    contact_id: i64,
    state: Loadable<ContactDetailView>,
    not_found: bool,
    /// Pending status change; `None` keeps the current status.
    pub status_choice: Option<i64>,
    pub status_notes: String,
    notice: Option<String>,
}

impl ContactDetail {
    pub fn new(contact_id: i64) -> Self {
        Self {
            contact_id,
            state: Loadable::default(),
            not_found: false,
            status_choice: None,
            status_notes: String::new(),
            notice: None,
        }
    }

    pub fn contact_id(&self) -> i64 {
        self.contact_id
    }

    pub fn state(&self) -> &Loadable<ContactDetailView> {
        &self.state
    }

    pub fn is_not_found(&self) -> bool {
        self.not_found
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn begin(&mut self) -> (Ticket, i64) {
        (self.state.begin(), self.contact_id)
    }

    pub async fn fetch(backend: &Backend, contact_id: i64) -> Result<ContactDetailView, ApiError> {
        let (contact, statuses, history) = tokio::try_join!(
            backend.core.get_contact(contact_id),
            backend.core.list_statuses(),
            backend.core.status_history(contact_id)
        )?;
        Ok(ContactDetailView {
            contact,
            statuses: statuses.statuses,
            history: history.history,
        })
    }

    pub fn finish(&mut self, ticket: Ticket, result: Result<ContactDetailView, ApiError>) -> bool {
        let missing = matches!(&result, Err(e) if e.is_not_found());
        if !self.state.finish(ticket, result, LOAD_FAILED) {
            return false;
        }
        self.not_found = missing;
        true
    }

    pub async fn refresh(&mut self, backend: &Backend) {
        let (ticket, id) = self.begin();
        let result = Self::fetch(backend, id).await;
        self.finish(ticket, result);
    }

    /// Error text for the failed-load panel, which always offers [`BACK_TO_CONTACTS`].
    pub fn failure(&self) -> Option<&str> {
        if self.not_found {
            return Some(NOT_FOUND);
        }
        match self.state.value() {
            None => self.state.error(),
            Some(_) => None,
        }
    }

    pub fn back_to_contacts(&self, backend: &Backend) {
        backend
            .session()
            .navigator()
            .navigate(Route::Dashboard(Section::Contacts));
    }

    pub fn summary(&self) -> Option<ContactRow> {
        let view = self.state.value()?;
        Some(contact_row(&view.contact, &view.statuses))
    }

    pub fn status_name(&self, status_id: i64) -> &str {
        let statuses = self.state.value().map(|v| v.statuses.as_slice()).unwrap_or_default();
        resolve(statuses, status_id, UNKNOWN_STATUS)
    }

    pub fn history(&self) -> Vec<HistoryRow> {
        let Some(view) = self.state.value() else {
            return Vec::new();
        };
        view.history
            .iter()
            .map(|change| HistoryRow {
                status: if change.status_name.is_empty() {
                    resolve(&view.statuses, change.status_id, UNKNOWN_STATUS).to_string()
                } else {
                    change.status_name.clone()
                },
                changed: format::date_time(&change.date_changed),
                notes: change.notes.clone().filter(|n| !n.trim().is_empty()),
            })
            .collect()
    }

    pub fn history_empty_message(&self) -> Option<&'static str> {
        match self.state.value() {
            Some(view) if view.history.is_empty() => Some(HISTORY_EMPTY),
            _ => None,
        }
    }

    /// Step the pending status through the status list.
    pub fn cycle_status(&mut self, forward: bool) {
        let Some(view) = self.state.value() else {
            return;
        };
        if view.statuses.is_empty() {
            return;
        }
        let current = self.status_choice.unwrap_or(view.contact.current_status_id);
        let len = view.statuses.len();
        let index = view.statuses.iter().position(|s| s.id == current).unwrap_or(0);
        let next = if forward { (index + 1) % len } else { (index + len - 1) % len };
        self.status_choice = Some(view.statuses[next].id);
    }

    /// The pending change as `(contact, status, notes)`, ready to send.
    pub fn status_request(&self) -> Option<(i64, i64, String)> {
        let status_id = self.status_choice?;
        Some((self.contact_id, status_id, self.status_notes.clone()))
    }

    /// Clear the pending change after it was applied, or show why it was
    /// refused. Returns `true` when the contact needs reloading.
    pub fn status_updated<T>(&mut self, status_id: i64, result: Result<T, ApiError>) -> bool {
        match result {
            Ok(_) => {
                tracing::info!(contact_id = self.contact_id, status_id, "Changed contact status");
                self.status_choice = None;
                self.status_notes.clear();
                self.notice = None;
                true
            }
            Err(e) => {
                self.notice = Some(describe_failure(&e, STATUS_FAILED));
                false
            }
        }
    }

    /// Send the pending status change, then reload. Returns whether it was applied.
    pub async fn update_status(&mut self, backend: &Backend) -> bool {
        let Some((contact_id, status_id, notes)) = self.status_request() else {
            return false;
        };
        self.notice = None;
        let result = backend.core.update_contact_status(contact_id, status_id, &notes).await;
        if !self.status_updated(status_id, result) {
            return false;
        }
        self.refresh(backend).await;
        true
    }

    /// Leave for the contact list after a delete, or show why it failed.
    pub fn deleted(&mut self, backend: &Backend, result: Result<(), ApiError>) -> bool {
        match result {
            Ok(()) => {
                tracing::info!(contact_id = self.contact_id, "Deleted contact");
                self.back_to_contacts(backend);
                true
            }
            Err(e) => {
                self.notice = Some(describe_failure(&e, DELETE_FAILED));
                false
            }
        }
    }

    pub async fn delete(&mut self, backend: &Backend) -> bool {
        let result = backend.core.delete_contact(self.contact_id).await;
        self.deleted(backend, result)
    }

    /// Carry the ticket sequence over from the screen this one replaces, so
    /// fetches started for `previous` can never commit here.
    pub fn after(mut self, previous: &ContactDetail) -> Self {
        self.state = Loadable::succeeding(&previous.state);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{contact_json, default_statuses, TestEnv};
    use serde_json::json;

    fn history_json(entries: serde_json::Value) -> serde_json::Value {
        json!({"contact_id": 3, "history": entries})
    }

    async fn loaded(env: &TestEnv) -> ContactDetail {
        env.stub.respond("GET", "/contacts/3", 200, contact_json(3, "John Smith", 1));
        env.stub.respond("GET", "/statuses", 200, default_statuses());
        env.stub.respond("GET", "/contacts/3/status-history", 200, history_json(json!(null)));
        let mut detail = ContactDetail::new(3);
        detail.refresh(&env.backend).await;
        detail
    }

    #[tokio::test]
    async fn test_loads_contact_with_empty_history() {
        let env = TestEnv::signed_in().await;
        let detail = loaded(&env).await;

        let summary = detail.summary().unwrap();
        assert_eq!(summary.status, "New Contact");
        assert!(detail.history().is_empty());
        assert_eq!(detail.history_empty_message(), Some(HISTORY_EMPTY));
        assert!(detail.failure().is_none());
    }

    #[tokio::test]
    async fn test_missing_contact() {
        let env = TestEnv::signed_in().await;
        env.stub.respond("GET", "/contacts/3", 404, json!({"error": "Contact not found"}));
        env.stub.respond("GET", "/statuses", 200, default_statuses());
        env.stub.respond("GET", "/contacts/3/status-history", 200, history_json(json!([])));

        let mut detail = ContactDetail::new(3);
        detail.refresh(&env.backend).await;
        assert!(detail.is_not_found());
        assert_eq!(detail.failure(), Some(NOT_FOUND));

        detail.back_to_contacts(&env.backend);
        assert_eq!(env.route(), Route::Dashboard(Section::Contacts));
    }

    #[tokio::test]
    async fn test_status_change_then_refetch() {
        let env = TestEnv::signed_in().await;
        let mut detail = loaded(&env).await;

        detail.cycle_status(true);
        assert_eq!(detail.status_choice, Some(2));
        detail.status_notes = "Started lesson 1".to_string();

        env.stub.respond("PUT", "/contacts/3/status", 200, contact_json(3, "John Smith", 2));
        env.stub.respond("GET", "/contacts/3", 200, contact_json(3, "John Smith", 2));
        env.stub.respond(
            "GET",
            "/contacts/3/status-history",
            200,
            history_json(json!([{
                "id": 1, "contact_id": 3, "status_id": 2, "status_name": "In Studies",
                "notes": "Started lesson 1", "date_changed": "2024-02-01T12:00:00Z"
            }])),
        );

        assert!(detail.update_status(&env.backend).await);
        assert_eq!(
            env.stub.last("PUT", "/contacts/3/status").unwrap().json(),
            json!({"status_id": 2, "notes": "Started lesson 1"})
        );
        assert_eq!(detail.summary().unwrap().status, "In Studies");
        assert_eq!(detail.history()[0].status, "In Studies");
        assert_eq!(detail.history()[0].notes.as_deref(), Some("Started lesson 1"));
        assert!(detail.status_choice.is_none());
        assert!(detail.status_notes.is_empty());
    }

    #[tokio::test]
    async fn test_rejected_status_change_keeps_view() {
        let env = TestEnv::signed_in().await;
        let mut detail = loaded(&env).await;
        detail.status_choice = Some(4);
        env.stub.respond("PUT", "/contacts/3/status", 400, json!({"error": "Invalid status"}));

        assert!(!detail.update_status(&env.backend).await);
        assert_eq!(detail.notice(), Some(STATUS_FAILED));
        assert_eq!(detail.summary().unwrap().status, "New Contact");
        assert_eq!(env.stub.count("GET", "/contacts/3"), 1);
    }

    #[tokio::test]
    async fn test_delete_returns_to_list() {
        let env = TestEnv::signed_in().await;
        let mut detail = loaded(&env).await;
        env.stub.respond("DELETE", "/contacts/3", 200, json!({"message": "Contact deleted successfully"}));

        assert!(detail.delete(&env.backend).await);
        assert_eq!(env.route(), Route::Dashboard(Section::Contacts));
    }
}
