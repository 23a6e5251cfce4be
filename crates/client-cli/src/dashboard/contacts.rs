use shared::{Contact, Status};

use super::{resolve, Loadable, Ticket, UNKNOWN_STATUS};
use crate::api::{ApiError, Backend};
use crate::format::{self, status_tone, Tone};

pub const LOAD_FAILED: &str = "Failed to load contacts. Please try again later.";
pub const EMPTY: &str = "No contacts found. Add a new contact to get started.";

#[derive(Debug, Clone)]
pub struct ContactsView {
    pub contacts: Vec<Contact>,
    pub statuses: Vec<Status>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub status: String,
    pub tone: Tone,
    pub added: String,
}

/// Totals for the overview tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overview {
    pub total: usize,
    pub by_status: Vec<(String, usize)>,
    pub recent: Vec<ContactRow>,
}

pub struct ContactsDashboard {
    page: Page,
    state: Loadable<ContactsView>,
    requested: Option<Page>,
    shown: Option<Page>,
}

impl ContactsDashboard {
    pub fn new(page_size: u32) -> Self {
        Self {
            page: Page {
                limit: page_size.max(1),
                offset: 0,
            },
            state: Loadable::default(),
            requested: None,
            shown: None,
        }
    }

    pub fn state(&self) -> &Loadable<ContactsView> {
        &self.state
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn begin(&mut self) -> (Ticket, Page) {
        self.requested = Some(self.page);
        (self.state.begin(), self.page)
    }

    /// Contacts and statuses together; either failing fails both.
    pub async fn fetch(backend: &Backend, page: Page) -> Result<ContactsView, ApiError> {
        let (contacts, statuses) = tokio::try_join!(
            backend.core.list_contacts(page.limit, page.offset),
            backend.core.list_statuses()
        )?;
        Ok(ContactsView {
            contacts: contacts.contacts,
            statuses: statuses.statuses,
        })
    }

    pub fn finish(&mut self, ticket: Ticket, result: Result<ContactsView, ApiError>) -> bool {
        let loaded = result.is_ok();
        if !self.state.finish(ticket, result, LOAD_FAILED) {
            return false;
        }
        if loaded {
            self.shown = self.requested;
        }
        true
    }

    /// The last good load, only while it belongs to the selected page.
    pub fn current(&self) -> Option<&ContactsView> {
        self.state.value().filter(|_| self.shown == Some(self.page))
    }

    pub async fn refresh(&mut self, backend: &Backend) {
        let (ticket, page) = self.begin();
        let result = Self::fetch(backend, page).await;
        self.finish(ticket, result);
    }

    /// Move to the next page if the current one was full.
    pub fn next_page(&mut self) -> bool {
        let full = self
            .current()
            .map(|v| v.contacts.len() as u32 >= self.page.limit)
            .unwrap_or(false);
        if full {
            self.page.offset += self.page.limit;
        }
        full
    }

    pub fn prev_page(&mut self) -> bool {
        if self.page.offset == 0 {
            return false;
        }
        self.page.offset = self.page.offset.saturating_sub(self.page.limit);
        true
    }

    pub fn status_name(&self, status_id: i64) -> &str {
        let statuses = self.state.value().map(|v| v.statuses.as_slice()).unwrap_or_default();
        resolve(statuses, status_id, UNKNOWN_STATUS)
    }

    pub fn rows(&self) -> Vec<ContactRow> {
        let Some(view) = self.current() else {
            return Vec::new();
        };
        view.contacts
            .iter()
            .map(|contact| contact_row(contact, &view.statuses))
            .collect()
    }

    /// `None` while there is data or no successful load yet.
    pub fn empty_message(&self) -> Option<&'static str> {
        match self.current() {
            Some(view) if view.contacts.is_empty() => Some(EMPTY),
            _ => None,
        }
    }

    pub fn overview(&self) -> Option<Overview> {
        let view = self.current()?;
        let mut by_status: Vec<(String, usize)> = view
            .statuses
            .iter()
            .map(|status| {
                let count = view
                    .contacts
                    .iter()
                    .filter(|c| c.current_status_id == status.id)
                    .count();
                (status.name.clone(), count)
            })
            .collect();
        by_status.retain(|(_, count)| *count > 0);

        let mut newest: Vec<&Contact> = view.contacts.iter().collect();
        newest.sort_by(|a, b| b.date_added.cmp(&a.date_added));
        let recent = newest
            .into_iter()
            .take(3)
            .map(|c| contact_row(c, &view.statuses))
            .collect();

        Some(Overview {
            total: view.contacts.len(),
            by_status,
            recent,
        })
    }
}

pub(crate) fn contact_row(contact: &Contact, statuses: &[Status]) -> ContactRow {
    let status = resolve(statuses, contact.current_status_id, UNKNOWN_STATUS).to_string();
    ContactRow {
        id: contact.id,
        name: contact.name.clone(),
        email: contact
            .email
            .clone()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| "No email".to_string()),
        phone: format::or_dash(contact.phone.as_deref()),
        location: format::or_dash(contact.location.as_deref()),
        tone: status_tone(&status),
        status,
        added: format::date(&contact.date_added),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{contact_json, default_statuses, status_json, TestEnv};
    use serde_json::json;

    #[tokio::test]
    async fn test_new_contact_badge() {
        let env = TestEnv::signed_in().await;
        env.stub.respond(
            "GET",
            "/contacts",
            200,
            json!({"contacts": [contact_json(1, "John Smith", 1)], "limit": 20, "offset": 0}),
        );
        env.stub.respond("GET", "/statuses", 200, default_statuses());

        let mut dashboard = ContactsDashboard::new(20);
        dashboard.refresh(&env.backend).await;

        let rows = dashboard.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "John Smith");
        assert_eq!(rows[0].status, "New Contact");
        assert_eq!(rows[0].tone, Tone::Blue);
        assert_eq!(rows[0].added, "2024-01-01");
        assert!(dashboard.empty_message().is_none());
        assert!(dashboard.state().error().is_none());
    }

    #[tokio::test]
    async fn test_unknown_status_falls_back() {
        let env = TestEnv::signed_in().await;
        let mut contact = contact_json(2, "Ann Lee", 99);
        contact["email"] = json!(null);
        contact["phone"] = json!("");
        env.stub.respond("GET", "/contacts", 200, json!({"contacts": [contact], "limit": 20, "offset": 0}));
        env.stub.respond("GET", "/statuses", 200, json!({"statuses": [status_json(1, "New Contact")]}));

        let mut dashboard = ContactsDashboard::new(20);
        dashboard.refresh(&env.backend).await;

        let row = &dashboard.rows()[0];
        assert_eq!(row.status, "Unknown");
        assert_eq!(row.tone, Tone::Gray);
        assert_eq!(row.email, "No email");
        assert_eq!(row.phone, format::DASH);
    }

    #[tokio::test]
    async fn test_empty_list_message() {
        let env = TestEnv::signed_in().await;
        env.stub.respond("GET", "/contacts", 200, json!({"contacts": null, "limit": 20, "offset": 0}));
        env.stub.respond("GET", "/statuses", 200, default_statuses());

        let mut dashboard = ContactsDashboard::new(20);
        assert!(dashboard.empty_message().is_none());
        dashboard.refresh(&env.backend).await;
        assert_eq!(dashboard.empty_message(), Some(EMPTY));
        assert!(dashboard.rows().is_empty());
    }

    #[tokio::test]
    async fn test_one_failure_fails_the_joined_load() {
        let env = TestEnv::signed_in().await;
        env.stub.respond(
            "GET",
            "/contacts",
            200,
            json!({"contacts": [contact_json(1, "John Smith", 1)], "limit": 20, "offset": 0}),
        );
        env.stub.respond("GET", "/statuses", 500, json!({"error": "db down"}));

        let mut dashboard = ContactsDashboard::new(20);
        dashboard.refresh(&env.backend).await;
        assert_eq!(dashboard.state().error(), Some(LOAD_FAILED));
        assert!(dashboard.rows().is_empty());
        assert!(!dashboard.state().is_loading());
    }

    #[tokio::test]
    async fn test_paging_offsets() {
        let env = TestEnv::signed_in().await;
        env.stub.respond(
            "GET",
            "/contacts",
            200,
            json!({"contacts": [contact_json(1, "A", 1), contact_json(2, "B", 1)], "limit": 2, "offset": 0}),
        );
        env.stub.respond("GET", "/statuses", 200, default_statuses());

        let mut dashboard = ContactsDashboard::new(2);
        assert!(!dashboard.prev_page());
        dashboard.refresh(&env.backend).await;
        assert!(dashboard.next_page());
        dashboard.refresh(&env.backend).await;

        let query = env.stub.last("GET", "/contacts").unwrap().query_pairs();
        assert!(query.contains(&("offset".to_string(), "2".to_string())));
        assert!(dashboard.prev_page());
        assert_eq!(dashboard.page().offset, 0);
    }

    #[tokio::test]
    async fn test_failed_page_turn_hides_previous_page() {
        let env = TestEnv::signed_in().await;
        env.stub.respond(
            "GET",
            "/contacts",
            200,
            json!({"contacts": [contact_json(1, "A", 1), contact_json(2, "B", 1)], "limit": 2, "offset": 0}),
        );
        env.stub.respond("GET", "/statuses", 200, default_statuses());

        let mut dashboard = ContactsDashboard::new(2);
        dashboard.refresh(&env.backend).await;
        assert_eq!(dashboard.rows().len(), 2);

        env.stub.respond("GET", "/contacts", 500, json!({"error": "db down"}));
        assert!(dashboard.next_page());
        dashboard.refresh(&env.backend).await;
        assert_eq!(dashboard.state().error(), Some(LOAD_FAILED));
        assert!(dashboard.rows().is_empty());
        assert!(dashboard.overview().is_none());
        assert!(!dashboard.next_page());

        assert!(dashboard.prev_page());
        assert_eq!(dashboard.rows().len(), 2);
    }

    #[tokio::test]
    async fn test_overview_counts() {
        let env = TestEnv::signed_in().await;
        let mut newer = contact_json(2, "Maria Garcia", 4);
        newer["date_added"] = json!("2024-02-01T00:00:00Z");
        env.stub.respond(
            "GET",
            "/contacts",
            200,
            json!({"contacts": [contact_json(1, "John Smith", 1), newer], "limit": 20, "offset": 0}),
        );
        env.stub.respond("GET", "/statuses", 200, default_statuses());

        let mut dashboard = ContactsDashboard::new(20);
        dashboard.refresh(&env.backend).await;
        let overview = dashboard.overview().unwrap();
        assert_eq!(overview.total, 2);
        assert_eq!(
            overview.by_status,
            vec![("New Contact".to_string(), 1), ("Gospel Worker".to_string(), 1)]
        );
        assert_eq!(overview.recent[0].name, "Maria Garcia");
    }
}
