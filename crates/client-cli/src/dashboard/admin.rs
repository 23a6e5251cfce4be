use shared::{Lesson, Room, User};

use super::{describe_failure, Loadable, Ticket};
use crate::api::{ApiError, Backend};
use crate::forms::{LessonForm, RoomForm, SubmitError};

pub const ROOM_SAVE_FAILED: &str = "Failed to save room. Please check all fields and try again.";
pub const ROOM_DELETE_FAILED: &str = "Failed to delete room. It may have existing reservations.";
pub const LESSON_SAVE_FAILED: &str = "Failed to save lesson. This sequence number or title might already exist.";
pub const LESSON_DELETE_FAILED: &str = "Failed to delete lesson. It may be referenced in study records.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminTab {
    Rooms,
    Users,
    Lessons,
}

impl AdminTab {
    pub const ALL: [AdminTab; 3] = [AdminTab::Rooms, AdminTab::Users, AdminTab::Lessons];

    /// Lowercase noun, as used in messages.
    pub fn noun(self) -> &'static str {
        match self {
            AdminTab::Rooms => "rooms",
            AdminTab::Users => "users",
            AdminTab::Lessons => "lessons",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AdminTab::Rooms => "Rooms",
            AdminTab::Users => "Users",
            AdminTab::Lessons => "Lessons",
        }
    }

    pub fn load_failed(self) -> String {
        format!("Failed to load {}. Please ensure you have admin permissions.", self.noun())
    }

    pub fn empty_message(self) -> &'static str {
        match self {
            AdminTab::Rooms => "No rooms found. Add a room to get started.",
            AdminTab::Users => "No users found or you don't have permission to view users.",
            AdminTab::Lessons => "No lessons found. Add a lesson to get started.",
        }
    }
}

#[derive(Debug, Clone)]
pub enum AdminData {
    Rooms(Vec<Room>),
    Users(Vec<User>),
    Lessons(Vec<Lesson>),
}

pub struct AdminDashboard {
    tab: AdminTab,
    rooms: Loadable<Vec<Room>>,
    users: Loadable<Vec<User>>,
    lessons: Loadable<Vec<Lesson>>,
    room_form: Option<RoomForm>,
    lesson_form: Option<LessonForm>,
    notice: Option<String>,
}

impl Default for AdminDashboard {
    fn default() -> Self {
        Self::new()
    }
}

impl AdminDashboard {
    pub fn new() -> Self {
        Self {
            tab: AdminTab::Rooms,
            rooms: Loadable::default(),
            users: Loadable::default(),
            lessons: Loadable::default(),
            room_form: None,
            lesson_form: None,
            notice: None,
        }
    }

    pub fn tab(&self) -> AdminTab {
        self.tab
    }

    /// Returns `true` when the tab changed and needs loading.
    pub fn set_tab(&mut self, tab: AdminTab) -> bool {
        if self.tab == tab {
            return false;
        }
        self.tab = tab;
        self.notice = None;
        true
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn rooms(&self) -> &Loadable<Vec<Room>> {
        &self.rooms
    }

    pub fn users(&self) -> &Loadable<Vec<User>> {
        &self.users
    }

    pub fn lessons(&self) -> &Loadable<Vec<Lesson>> {
        &self.lessons
    }

    pub fn begin(&mut self) -> (Ticket, AdminTab) {
        (self.begin_tab(self.tab), self.tab)
    }

    /// Start a load for `tab`, which need not be the one shown.
    pub fn begin_tab(&mut self, tab: AdminTab) -> Ticket {
        match tab {
            AdminTab::Rooms => self.rooms.begin(),
            AdminTab::Users => self.users.begin(),
            AdminTab::Lessons => self.lessons.begin(),
        }
    }

    pub async fn fetch(backend: &Backend, tab: AdminTab) -> Result<AdminData, ApiError> {
        Ok(match tab {
            AdminTab::Rooms => AdminData::Rooms(backend.rooms.list_rooms().await?.rooms),
            AdminTab::Users => AdminData::Users(backend.core.list_users().await?.users),
            AdminTab::Lessons => {
                let mut lessons = backend.studies.list_lessons().await?.lessons;
                lessons.sort_by_key(|l| l.sequence_number);
                AdminData::Lessons(lessons)
            }
        })
    }

    pub fn finish(&mut self, ticket: Ticket, tab: AdminTab, result: Result<AdminData, ApiError>) -> bool {
        let message = tab.load_failed();
        match (tab, result) {
            (AdminTab::Rooms, Ok(AdminData::Rooms(rooms))) => self.rooms.finish(ticket, Ok(rooms), &message),
            (AdminTab::Users, Ok(AdminData::Users(users))) => self.users.finish(ticket, Ok(users), &message),
            (AdminTab::Lessons, Ok(AdminData::Lessons(lessons))) => {
                self.lessons.finish(ticket, Ok(lessons), &message)
            }
            (AdminTab::Rooms, Err(e)) => self.rooms.finish(ticket, Err(e), &message),
            (AdminTab::Users, Err(e)) => self.users.finish(ticket, Err(e), &message),
            (AdminTab::Lessons, Err(e)) => self.lessons.finish(ticket, Err(e), &message),
            (tab, Ok(_)) => {
                tracing::warn!(tab = tab.noun(), "Dropping data loaded for another tab");
                false
            }
        }
    }

    pub async fn refresh(&mut self, backend: &Backend) {
        let (ticket, tab) = self.begin();
        let result = Self::fetch(backend, tab).await;
        self.finish(ticket, tab, result);
    }

    async fn refresh_tab(&mut self, backend: &Backend, tab: AdminTab) {
        let ticket = self.begin_tab(tab);
        let result = Self::fetch(backend, tab).await;
        self.finish(ticket, tab, result);
    }

    /// Error text for the active tab's failed load.
    pub fn load_error(&self) -> Option<&str> {
        match self.tab {
            AdminTab::Rooms => self.rooms.error(),
            AdminTab::Users => self.users.error(),
            AdminTab::Lessons => self.lessons.error(),
        }
    }

    /// Whether the active tab has a list to show, possibly from an earlier load.
    pub fn has_data(&self) -> bool {
        match self.tab {
            AdminTab::Rooms => self.rooms.value().is_some(),
            AdminTab::Users => self.users.value().is_some(),
            AdminTab::Lessons => self.lessons.value().is_some(),
        }
    }

    pub fn empty_message(&self) -> Option<&'static str> {
        let empty = match self.tab {
            AdminTab::Rooms => self.rooms.value().map(Vec::is_empty),
            AdminTab::Users => self.users.value().map(Vec::is_empty),
            AdminTab::Lessons => self.lessons.value().map(Vec::is_empty),
        };
        match empty {
            Some(true) => Some(self.tab.empty_message()),
            _ => None,
        }
    }

    pub fn room_form(&self) -> Option<&RoomForm> {
        self.room_form.as_ref()
    }

    pub fn room_form_mut(&mut self) -> Option<&mut RoomForm> {
        self.room_form.as_mut()
    }

    pub fn open_room_form(&mut self, room_id: Option<i64>) -> bool {
        let form = match room_id {
            None => RoomForm::default(),
            Some(id) => match self.rooms.value().and_then(|rooms| rooms.iter().find(|r| r.id == id)) {
                Some(room) => RoomForm::edit(room),
                None => return false,
            },
        };
        self.room_form = Some(form);
        true
    }

    pub fn close_room_form(&mut self) {
        self.room_form = None;
    }

    /// Close the form after a save, or show why it failed. Returns `true`
    /// when the rooms tab needs reloading.
    pub fn room_saved(&mut self, result: Result<Room, SubmitError>) -> bool {
        match result {
            Ok(_) => {
                self.room_form = None;
                self.notice = None;
                true
            }
            Err(e) => {
                if let Some(form) = self.room_form.as_mut() {
                    form.set_error(e.message(ROOM_SAVE_FAILED));
                }
                false
            }
        }
    }

    pub async fn submit_room_form(&mut self, backend: &Backend) -> bool {
        let Some(form) = self.room_form.as_ref() else {
            return false;
        };
        let result = form.save(backend).await;
        if !self.room_saved(result) {
            return false;
        }
        self.refresh_tab(backend, AdminTab::Rooms).await;
        true
    }

    pub fn room_deleted(&mut self, room_id: i64, result: Result<(), ApiError>) -> bool {
        match result {
            Ok(()) => {
                tracing::info!(room_id, "Deleted room");
                self.notice = None;
                true
            }
            Err(e) => {
                self.notice = Some(describe_failure(&e, ROOM_DELETE_FAILED));
                false
            }
        }
    }

    pub async fn delete_room(&mut self, backend: &Backend, room_id: i64) -> bool {
        self.notice = None;
        let result = backend.rooms.delete_room(room_id).await;
        if !self.room_deleted(room_id, result) {
            return false;
        }
        self.refresh_tab(backend, AdminTab::Rooms).await;
        true
    }

    pub fn lesson_form(&self) -> Option<&LessonForm> {
        self.lesson_form.as_ref()
    }

    pub fn lesson_form_mut(&mut self) -> Option<&mut LessonForm> {
        self.lesson_form.as_mut()
    }

    pub fn open_lesson_form(&mut self, lesson_id: Option<i64>) -> bool {
        let form = match lesson_id {
            None => LessonForm::default(),
            Some(id) => match self.lessons.value().and_then(|lessons| lessons.iter().find(|l| l.id == id)) {
                Some(lesson) => LessonForm::edit(lesson),
                None => return false,
            },
        };
        self.lesson_form = Some(form);
        true
    }

    pub fn close_lesson_form(&mut self) {
        self.lesson_form = None;
    }

    pub fn lesson_saved(&mut self, result: Result<Lesson, SubmitError>) -> bool {
        match result {
            Ok(_) => {
                self.lesson_form = None;
                self.notice = None;
                true
            }
            Err(e) => {
                if let Some(form) = self.lesson_form.as_mut() {
                    form.set_error(e.message(LESSON_SAVE_FAILED));
                }
                false
            }
        }
    }

    pub async fn submit_lesson_form(&mut self, backend: &Backend) -> bool {
        let Some(form) = self.lesson_form.as_ref() else {
            return false;
        };
        let result = form.save(backend).await;
        if !self.lesson_saved(result) {
            return false;
        }
        self.refresh_tab(backend, AdminTab::Lessons).await;
        true
    }

    pub fn lesson_deleted(&mut self, lesson_id: i64, result: Result<(), ApiError>) -> bool {
        match result {
            Ok(()) => {
                tracing::info!(lesson_id, "Deleted lesson");
                self.notice = None;
                true
            }
            Err(e) => {
                self.notice = Some(describe_failure(&e, LESSON_DELETE_FAILED));
                false
            }
        }
    }

    pub async fn delete_lesson(&mut self, backend: &Backend, lesson_id: i64) -> bool {
        self.notice = None;
        let result = backend.studies.delete_lesson(lesson_id).await;
        if !self.lesson_deleted(lesson_id, result) {
            return false;
        }
        self.refresh_tab(backend, AdminTab::Lessons).await;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::EditableForm;
    use crate::testing::{lesson_json, room_json, sample_user, TestEnv};
    use serde_json::json;

    #[tokio::test]
    async fn test_tabs_load_on_change() {
        let env = TestEnv::signed_in_as_admin().await;
        env.stub.respond("GET", "/rooms", 200, json!({"rooms": [room_json(1, "Chapel", 40)]}));
        env.stub.respond("GET", "/users", 200, json!({"users": [sample_user()]}));

        let mut admin = AdminDashboard::new();
        admin.refresh(&env.backend).await;
        assert_eq!(admin.rooms().value().unwrap().len(), 1);
        assert_eq!(env.stub.count("GET", "/users"), 0);

        assert!(!admin.set_tab(AdminTab::Rooms));
        assert!(admin.set_tab(AdminTab::Users));
        admin.refresh(&env.backend).await;
        assert_eq!(admin.users().value().unwrap()[0].username, "jsmith");
    }

    #[tokio::test]
    async fn test_lessons_sorted_by_sequence() {
        let env = TestEnv::signed_in_as_admin().await;
        env.stub.respond(
            "GET",
            "/lessons",
            200,
            json!({"lessons": [lesson_json(3, "Baptism", 3), lesson_json(1, "The Bible", 1), lesson_json(2, "Prayer", 2)]}),
        );

        let mut admin = AdminDashboard::new();
        admin.set_tab(AdminTab::Lessons);
        admin.refresh(&env.backend).await;
        let order: Vec<i64> = admin.lessons().value().unwrap().iter().map(|l| l.sequence_number).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_forbidden_tab_message() {
        let env = TestEnv::signed_in().await;
        env.stub.respond("GET", "/users", 403, json!({"error": "Forbidden"}));

        let mut admin = AdminDashboard::new();
        admin.set_tab(AdminTab::Users);
        admin.refresh(&env.backend).await;
        assert_eq!(
            admin.load_error(),
            Some("Failed to load users. Please ensure you have admin permissions.")
        );
    }

    #[tokio::test]
    async fn test_empty_tab_messages() {
        let env = TestEnv::signed_in_as_admin().await;
        env.stub.respond("GET", "/rooms", 200, json!({"rooms": null}));

        let mut admin = AdminDashboard::new();
        admin.refresh(&env.backend).await;
        assert_eq!(admin.empty_message(), Some("No rooms found. Add a room to get started."));
    }

    #[tokio::test]
    async fn test_room_create_resets_and_refetches() {
        let env = TestEnv::signed_in_as_admin().await;
        env.stub.respond("GET", "/rooms", 200, json!({"rooms": [room_json(1, "Chapel", 40)]}));
        let mut admin = AdminDashboard::new();
        admin.refresh(&env.backend).await;

        assert!(admin.open_room_form(None));
        let form = admin.room_form_mut().unwrap();
        form.set_value("name", "Fellowship Hall".to_string());
        form.set_value("capacity", "30".to_string());

        env.stub.respond("POST", "/rooms", 201, room_json(2, "Fellowship Hall", 30));
        env.stub.respond(
            "GET",
            "/rooms",
            200,
            json!({"rooms": [room_json(1, "Chapel", 40), room_json(2, "Fellowship Hall", 30)]}),
        );
        assert!(admin.submit_room_form(&env.backend).await);

        assert!(admin.room_form().is_none());
        assert_eq!(admin.rooms().value().unwrap().len(), 2);
        assert_eq!(env.stub.last("POST", "/rooms").unwrap().json()["capacity"], json!(30));
        assert!(admin.open_room_form(None));
        assert_eq!(admin.room_form().unwrap().value("name"), "");
    }

    #[tokio::test]
    async fn test_room_update_uses_put() {
        let env = TestEnv::signed_in_as_admin().await;
        env.stub.respond("GET", "/rooms", 200, json!({"rooms": [room_json(1, "Chapel", 40)]}));
        let mut admin = AdminDashboard::new();
        admin.refresh(&env.backend).await;

        assert!(admin.open_room_form(Some(1)));
        assert!(!admin.open_room_form(Some(77)));
        admin.room_form_mut().unwrap().capacity = "45".to_string();
        env.stub.respond("PUT", "/rooms/1", 200, room_json(1, "Chapel", 45));
        assert!(admin.submit_room_form(&env.backend).await);
        assert_eq!(env.stub.last("PUT", "/rooms/1").unwrap().json()["capacity"], json!(45));
    }

    #[tokio::test]
    async fn test_failed_lesson_save_keeps_list() {
        let env = TestEnv::signed_in_as_admin().await;
        env.stub.respond("GET", "/lessons", 200, json!({"lessons": [lesson_json(1, "The Bible", 1)]}));
        let mut admin = AdminDashboard::new();
        admin.set_tab(AdminTab::Lessons);
        admin.refresh(&env.backend).await;

        admin.open_lesson_form(None);
        let form = admin.lesson_form_mut().unwrap();
        form.title = "The Bible".to_string();
        form.sequence_number = "1".to_string();
        env.stub.respond("POST", "/lessons", 409, json!({"error": "duplicate"}));

        assert!(!admin.submit_lesson_form(&env.backend).await);
        assert_eq!(admin.lesson_form().unwrap().error(), Some(LESSON_SAVE_FAILED));
        assert_eq!(admin.lessons().value().unwrap().len(), 1);
        assert_eq!(env.stub.count("GET", "/lessons"), 1);
    }

    #[tokio::test]
    async fn test_delete_room_failure_message() {
        let env = TestEnv::signed_in_as_admin().await;
        env.stub.respond("GET", "/rooms", 200, json!({"rooms": [room_json(1, "Chapel", 40)]}));
        env.stub.respond("DELETE", "/rooms/1", 409, json!({"error": "has reservations"}));
        let mut admin = AdminDashboard::new();
        admin.refresh(&env.backend).await;

        assert!(!admin.delete_room(&env.backend, 1).await);
        assert_eq!(admin.notice(), Some(ROOM_DELETE_FAILED));
        assert_eq!(admin.rooms().value().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_lesson_refetches() {
        let env = TestEnv::signed_in_as_admin().await;
        env.stub.respond("GET", "/lessons", 200, json!({"lessons": [lesson_json(1, "The Bible", 1)]}));
        let mut admin = AdminDashboard::new();
        admin.set_tab(AdminTab::Lessons);
        admin.refresh(&env.backend).await;

        env.stub.respond("DELETE", "/lessons/1", 200, json!({"message": "Lesson deleted successfully"}));
        env.stub.respond("GET", "/lessons", 200, json!({"lessons": []}));
        assert!(admin.delete_lesson(&env.backend, 1).await);
        assert_eq!(admin.empty_message(), Some(AdminTab::Lessons.empty_message()));
    }

    #[tokio::test]
    async fn test_lesson_refetch_leaves_rooms_tab_shown() {
        let env = TestEnv::signed_in_as_admin().await;
        env.stub.respond("GET", "/lessons", 200, json!({"lessons": [lesson_json(1, "The Bible", 1)]}));

        let mut admin = AdminDashboard::new();
        let ticket = admin.begin_tab(AdminTab::Lessons);
        assert_eq!(admin.tab(), AdminTab::Rooms);
        let result = AdminDashboard::fetch(&env.backend, AdminTab::Lessons).await;
        assert!(admin.finish(ticket, AdminTab::Lessons, result));

        assert_eq!(admin.lessons().value().unwrap().len(), 1);
        assert!(!admin.has_data());
    }
}
