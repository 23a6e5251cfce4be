//! Dashboard application state and event loop

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{backend::Backend as TerminalBackend, Terminal};
use shared::{Contact, Lesson, Reservation, Room, Study, User};
use tokio::sync::{mpsc, watch};

use super::view;
use crate::api::{ApiError, Backend};
use crate::auth;
use crate::dashboard::admin::{AdminDashboard, AdminData, AdminTab};
use crate::dashboard::contact_detail::{ContactDetail, ContactDetailView};
use crate::dashboard::contacts::{ContactsDashboard, ContactsView};
use crate::dashboard::reservations::ReservationsDashboard;
use crate::dashboard::studies::{ContactStudies, StudiesDashboard, StudiesReference};
use crate::dashboard::Ticket;
use crate::forms::contact::ContactFormData;
use crate::forms::{flag, ContactForm, EditableForm, FieldKind, SubmitError};
use crate::nav::{Route, Section};

/// A finished task, sent back to the loop. Fetches carry their ticket;
/// mutations carry what they changed.
pub(super) enum Loaded {
    Contacts(Ticket, Result<ContactsView, ApiError>),
    ContactDetail(i64, Ticket, Result<ContactDetailView, ApiError>),
    ContactForm(Option<i64>, Ticket, Result<ContactFormData, ApiError>),
    StudiesReference(Ticket, Result<StudiesReference, ApiError>),
    Studies(Ticket, Result<ContactStudies, ApiError>),
    Rooms(Ticket, Result<Vec<Room>, ApiError>),
    Reservations(Ticket, Result<Vec<Reservation>, ApiError>),
    Admin(Ticket, AdminTab, Result<AdminData, ApiError>),
    SignedIn(anyhow::Result<User>),
    ContactSaved(Option<i64>, Result<Contact, SubmitError>),
    StudySaved(Result<Study, SubmitError>),
    Booked(Result<Reservation, SubmitError>),
    RoomSaved(Result<Room, SubmitError>),
    LessonSaved(Result<Lesson, SubmitError>),
    StatusChanged(i64, i64, Result<(), ApiError>),
    Performed(Pending, Result<(), ApiError>),
}

impl Loaded {
    fn is_mutation(&self) -> bool {
        matches!(
            self,
            Loaded::SignedIn(_)
                | Loaded::ContactSaved(..)
                | Loaded::StudySaved(_)
                | Loaded::Booked(_)
                | Loaded::RoomSaved(_)
                | Loaded::LessonSaved(_)
                | Loaded::StatusChanged(..)
                | Loaded::Performed(..)
        )
    }
}

/// Destructive action waiting for a yes/no answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Pending {
    DeleteContact(i64),
    DeleteStudy(i64),
    CancelReservation(i64),
    DeleteRoom(i64),
    DeleteLesson(i64),
}

impl Pending {
    pub(super) fn prompt(self) -> &'static str {
        match self {
            Pending::DeleteContact(_) => "Are you sure you want to delete this contact?",
            Pending::DeleteStudy(_) => "Are you sure you want to delete this study?",
            Pending::CancelReservation(_) => "Are you sure you want to cancel this reservation?",
            Pending::DeleteRoom(_) => "Are you sure you want to delete this room?",
            Pending::DeleteLesson(_) => "Are you sure you want to delete this lesson?",
        }
    }
}

#[derive(Debug, Default)]
pub(super) struct LoginForm {
    pub username: String,
    pub password: String,
    pub on_password: bool,
    pub error: Option<String>,
}

impl LoginForm {
    fn active_field(&mut self) -> &mut String {
        if self.on_password {
            &mut self.password
        } else {
            &mut self.username
        }
    }
}

enum FormAction {
    Submit,
    Close,
}

/// Main dashboard state
pub struct App {
    backend: Arc<Backend>,
    routes: watch::Receiver<Route>,
    pub(super) route: Route,
    pub(super) contacts: ContactsDashboard,
    pub(super) detail: Option<ContactDetail>,
    pub(super) contact_form: Option<ContactForm>,
    pub(super) studies: StudiesDashboard,
    pub(super) reservations: ReservationsDashboard,
    pub(super) admin: AdminDashboard,
    pub(super) login: LoginForm,
    /// Highlighted row of the current list
    pub(super) cursor: usize,
    /// Focused field of the open form
    pub(super) field: usize,
    pub(super) editing_notes: bool,
    pub(super) confirm: Option<Pending>,
    /// A sign-in, save or delete is in flight
    pub(super) saving: bool,
    tx: mpsc::UnboundedSender<Loaded>,
    rx: mpsc::UnboundedReceiver<Loaded>,
    should_quit: bool,
}

impl App {
    pub fn new(backend: Arc<Backend>, page_size: u32) -> Self {
        let routes = backend.session().navigator().subscribe();
        let route = *routes.borrow();
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            backend,
            routes,
            route,
            contacts: ContactsDashboard::new(page_size),
            detail: None,
            contact_form: None,
            studies: StudiesDashboard::new(page_size),
            reservations: ReservationsDashboard::new(today()),
            admin: AdminDashboard::new(),
            login: LoginForm::default(),
            cursor: 0,
            field: 0,
            editing_notes: false,
            confirm: None,
            saving: false,
            tx,
            rx,
            should_quit: false,
        }
    }

    pub(super) fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Run the main loop until the user quits
    pub async fn run<B: TerminalBackend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        let initial = *self.routes.borrow_and_update();
        self.enter(initial);

        while !self.should_quit {
            self.drain();
            self.follow_route();

            terminal.draw(|frame| view::draw(frame, self))?;

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key);
                }
            }
        }
        Ok(())
    }

    fn drain(&mut self) {
        while let Ok(loaded) = self.rx.try_recv() {
            self.apply(loaded);
        }
    }

    /// Pick up navigation done by view models or the session.
    fn follow_route(&mut self) {
        if self.routes.has_changed().unwrap_or(false) {
            let route = *self.routes.borrow_and_update();
            self.enter(route);
        }
    }

    fn navigate(&self, route: Route) {
        self.backend.session().navigator().navigate(route);
    }

    /// Mount the screen for `route` and start its fetches.
    fn enter(&mut self, route: Route) {
        tracing::debug!(route = %route.path(), "Entering screen");
        self.route = route;
        self.cursor = 0;
        self.field = 0;
        self.editing_notes = false;
        self.confirm = None;

        match route {
            Route::Login => self.login = LoginForm::default(),
            Route::Dashboard(Section::Admin) if !self.backend.session().is_admin() => {
                self.navigate(Route::Dashboard(Section::Overview));
            }
            Route::ContactDetail(id) => {
                let detail = ContactDetail::new(id);
                self.detail = Some(match &self.detail {
                    Some(previous) => detail.after(previous),
                    None => detail,
                });
                self.reload();
            }
            Route::ContactForm(id) => {
                let form = ContactForm::new(id);
                self.contact_form = Some(match &self.contact_form {
                    Some(previous) => form.after(previous),
                    None => form,
                });
                self.reload();
            }
            Route::Dashboard(_) => self.reload(),
        }
    }

    /// Refetch everything the current screen shows.
    fn reload(&mut self) {
        match self.route {
            Route::Login => {}
            Route::Dashboard(Section::Overview | Section::Contacts) => self.load_contacts(),
            Route::Dashboard(Section::Studies) => {
                self.load_studies_reference();
                self.load_studies();
            }
            Route::Dashboard(Section::Reservations) => {
                self.load_rooms();
                self.load_reservations();
            }
            Route::Dashboard(Section::Admin) => self.load_admin(),
            Route::ContactDetail(_) => self.load_detail(),
            Route::ContactForm(_) => self.load_contact_form(),
        }
    }

    fn spawn<F, Fut>(&self, fetch: F)
    where
        F: FnOnce(Arc<Backend>) -> Fut,
        Fut: Future<Output = Loaded> + Send + 'static,
    {
        let tx = self.tx.clone();
        let task = fetch(self.backend.clone());
        tokio::spawn(async move {
            if tx.send(task.await).is_err() {
                tracing::debug!("Dashboard closed before fetch finished");
            }
        });
    }

    /// Spawn a mutation unless one is already in flight.
    fn mutate<F, Fut>(&mut self, task: F) -> bool
    where
        F: FnOnce(Arc<Backend>) -> Fut,
        Fut: Future<Output = Loaded> + Send + 'static,
    {
        if self.saving {
            tracing::debug!("Ignoring request while a save is in flight");
            return false;
        }
        self.saving = true;
        self.spawn(task);
        true
    }

    fn load_contacts(&mut self) {
        let (ticket, page) = self.contacts.begin();
        self.spawn(move |backend| async move {
            Loaded::Contacts(ticket, ContactsDashboard::fetch(&backend, page).await)
        });
    }

    fn load_detail(&mut self) {
        let Some(detail) = self.detail.as_mut() else {
            return;
        };
        let (ticket, id) = detail.begin();
        self.spawn(move |backend| async move {
            Loaded::ContactDetail(id, ticket, ContactDetail::fetch(&backend, id).await)
        });
    }

    fn load_contact_form(&mut self) {
        let Some(form) = self.contact_form.as_mut() else {
            return;
        };
        let ticket = form.begin_load();
        let id = form.edit_id();
        self.spawn(move |backend| async move {
            Loaded::ContactForm(id, ticket, ContactForm::fetch(&backend, id).await)
        });
    }

    fn load_studies_reference(&mut self) {
        let (ticket, page_size) = self.studies.begin_reference();
        self.spawn(move |backend| async move {
            Loaded::StudiesReference(ticket, StudiesDashboard::fetch_reference(&backend, page_size).await)
        });
    }

    fn load_studies(&mut self) {
        let Some((ticket, contact_id)) = self.studies.begin_studies() else {
            return;
        };
        self.spawn(move |backend| async move {
            Loaded::Studies(ticket, StudiesDashboard::fetch_studies(&backend, contact_id).await)
        });
    }

    fn load_rooms(&mut self) {
        let ticket = self.reservations.begin_rooms();
        self.spawn(move |backend| async move {
            Loaded::Rooms(ticket, ReservationsDashboard::fetch_rooms(&backend).await)
        });
    }

    fn load_reservations(&mut self) {
        let (ticket, query) = self.reservations.begin_reservations();
        self.cursor = 0;
        self.spawn(move |backend| async move {
            Loaded::Reservations(ticket, ReservationsDashboard::fetch_reservations(&backend, query).await)
        });
    }

    fn load_admin(&mut self) {
        self.cursor = 0;
        self.load_admin_tab(self.admin.tab());
    }

    fn load_admin_tab(&mut self, tab: AdminTab) {
        let ticket = self.admin.begin_tab(tab);
        self.spawn(move |backend| async move {
            Loaded::Admin(ticket, tab, AdminDashboard::fetch(&backend, tab).await)
        });
    }

    fn apply(&mut self, loaded: Loaded) {
        if loaded.is_mutation() {
            self.saving = false;
        }
        match loaded {
            Loaded::Contacts(ticket, result) => {
                self.contacts.finish(ticket, result);
            }
            Loaded::ContactDetail(id, ticket, result) => {
                if let Some(detail) = self.detail.as_mut().filter(|d| d.contact_id() == id) {
                    detail.finish(ticket, result);
                }
            }
            Loaded::ContactForm(id, ticket, result) => {
                if let Some(form) = self.contact_form.as_mut().filter(|f| f.edit_id() == id) {
                    form.finish_load(ticket, result);
                }
            }
            Loaded::StudiesReference(ticket, result) => {
                if self.studies.finish_reference(ticket, result) {
                    self.load_studies();
                }
            }
            Loaded::Studies(ticket, result) => {
                self.studies.finish_studies(ticket, result);
            }
            Loaded::Rooms(ticket, result) => {
                self.reservations.finish_rooms(ticket, result);
            }
            Loaded::Reservations(ticket, result) => {
                self.reservations.finish_reservations(ticket, result);
            }
            Loaded::Admin(ticket, tab, result) => {
                self.admin.finish(ticket, tab, result);
            }
            Loaded::SignedIn(result) => match result {
                Ok(user) => tracing::info!(user = %user.username, "Signed in from dashboard"),
                Err(e) => {
                    self.login.error = Some(e.to_string());
                    self.login.password.clear();
                    self.login.on_password = true;
                }
            },
            Loaded::ContactSaved(id, result) => {
                let on_form = self.route == Route::ContactForm(id);
                match self
                    .contact_form
                    .as_mut()
                    .filter(|f| on_form && f.edit_id() == id && f.is_saving())
                {
                    Some(form) => {
                        form.finish_submit(&self.backend, result);
                    }
                    None => tracing::debug!("Contact form left before its save finished"),
                }
            }
            Loaded::StudySaved(result) => {
                if self.studies.study_saved(result) {
                    self.field = 0;
                    self.load_studies();
                }
            }
            Loaded::Booked(result) => {
                if self.reservations.booked(result) {
                    self.field = 0;
                    self.load_reservations();
                }
            }
            Loaded::RoomSaved(result) => {
                if self.admin.room_saved(result) {
                    self.field = 0;
                    self.load_admin_tab(AdminTab::Rooms);
                }
            }
            Loaded::LessonSaved(result) => {
                if self.admin.lesson_saved(result) {
                    self.field = 0;
                    self.load_admin_tab(AdminTab::Lessons);
                }
            }
            Loaded::StatusChanged(contact_id, status_id, result) => {
                match self.detail.as_mut().filter(|d| d.contact_id() == contact_id) {
                    Some(detail) => {
                        if detail.status_updated(status_id, result) {
                            self.load_detail();
                        }
                    }
                    None => tracing::debug!(contact_id, "Contact left before its status change finished"),
                }
            }
            Loaded::Performed(pending, result) => self.performed(pending, result),
        }
        self.clamp_cursor();
    }

    pub(super) fn row_count(&self) -> usize {
        match self.route {
            Route::Dashboard(Section::Contacts) => self.contacts.rows().len(),
            Route::Dashboard(Section::Studies) => self.studies.rows().len(),
            Route::Dashboard(Section::Reservations) => self.reservations.rows().len(),
            Route::Dashboard(Section::Admin) => match self.admin.tab() {
                AdminTab::Rooms => self.admin.rooms().value().map_or(0, Vec::len),
                AdminTab::Users => self.admin.users().value().map_or(0, Vec::len),
                AdminTab::Lessons => self.admin.lessons().value().map_or(0, Vec::len),
            },
            _ => 0,
        }
    }

    fn clamp_cursor(&mut self) {
        self.cursor = self.cursor.min(self.row_count().saturating_sub(1));
    }

    fn move_cursor(&mut self, down: bool) {
        let count = self.row_count();
        if count == 0 {
            return;
        }
        self.cursor = if down {
            (self.cursor + 1).min(count - 1)
        } else {
            self.cursor.saturating_sub(1)
        };
    }

    /// Form currently edited on this screen, if any.
    pub(super) fn active_form(&self) -> Option<&dyn EditableForm> {
        match self.route {
            Route::ContactForm(_) => self.contact_form.as_ref().map(|f| f as &dyn EditableForm),
            Route::Dashboard(Section::Studies) => self.studies.form().map(|f| f as &dyn EditableForm),
            Route::Dashboard(Section::Reservations) => self.reservations.form().map(|f| f as &dyn EditableForm),
            Route::Dashboard(Section::Admin) => match self.admin.room_form() {
                Some(form) => Some(form as &dyn EditableForm),
                None => self.admin.lesson_form().map(|f| f as &dyn EditableForm),
            },
            _ => None,
        }
    }

    fn active_form_mut(&mut self) -> Option<&mut dyn EditableForm> {
        match self.route {
            Route::ContactForm(_) => self.contact_form.as_mut().map(|f| f as &mut dyn EditableForm),
            Route::Dashboard(Section::Studies) => self.studies.form_mut().map(|f| f as &mut dyn EditableForm),
            Route::Dashboard(Section::Reservations) => {
                self.reservations.form_mut().map(|f| f as &mut dyn EditableForm)
            }
            Route::Dashboard(Section::Admin) => {
                if self.admin.room_form().is_some() {
                    self.admin.room_form_mut().map(|f| f as &mut dyn EditableForm)
                } else {
                    self.admin.lesson_form_mut().map(|f| f as &mut dyn EditableForm)
                }
            }
            _ => None,
        }
    }

    pub(super) fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        if let Some(pending) = self.confirm.take() {
            if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
                self.perform(pending);
            }
            return;
        }

        if self.route.is_login() {
            self.login_key(key);
        } else if self.active_form().is_some() {
            self.form_key(key);
        } else if self.editing_notes {
            self.notes_key(key);
        } else {
            self.screen_key(key);
        }
        self.follow_route();
    }

    fn login_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.login.on_password = !self.login.on_password;
            }
            KeyCode::Backspace => {
                self.login.active_field().pop();
            }
            KeyCode::Char(c) => self.login.active_field().push(c),
            KeyCode::Enter if !self.login.on_password && self.login.password.is_empty() => {
                self.login.on_password = true;
            }
            KeyCode::Enter => {
                let (username, password) = (self.login.username.clone(), self.login.password.clone());
                if self.mutate(move |backend| async move {
                    Loaded::SignedIn(auth::sign_in(&backend, &username, &password).await)
                }) {
                    self.login.error = None;
                }
            }
            _ => {}
        }
    }

    fn form_key(&mut self, key: KeyEvent) {
        let index = self.field;
        let mut next = index;
        let mut action = None;

        {
            let Some(form) = self.active_form_mut() else {
                return;
            };
            let fields = form.fields();
            if fields.is_empty() {
                return;
            }
            let index = index.min(fields.len() - 1);
            let field = fields[index];
            let mut value = form.value(field.key);

            match (key.code, field.kind) {
                (KeyCode::Esc, _) => action = Some(FormAction::Close),
                (KeyCode::Enter, _) => action = Some(FormAction::Submit),
                (KeyCode::Tab | KeyCode::Down, _) => next = (index + 1) % fields.len(),
                (KeyCode::BackTab | KeyCode::Up, _) => next = (index + fields.len() - 1) % fields.len(),
                (KeyCode::Left | KeyCode::Right | KeyCode::Char(' '), FieldKind::Toggle) => {
                    form.set_value(field.key, (!flag(&value)).to_string());
                }
                (KeyCode::Left | KeyCode::Right | KeyCode::Char(' '), FieldKind::Choice) => {
                    let choices = form.choices(field.key);
                    if !choices.is_empty() {
                        let len = choices.len();
                        let current = choices.iter().position(|(v, _)| *v == value);
                        let step = match (current, key.code) {
                            (None, _) => 0,
                            (Some(i), KeyCode::Left) => (i + len - 1) % len,
                            (Some(i), _) => (i + 1) % len,
                        };
                        form.set_value(field.key, choices[step].0.clone());
                    }
                }
                (KeyCode::Backspace, FieldKind::Toggle | FieldKind::Choice) => {}
                (KeyCode::Backspace, _) => {
                    value.pop();
                    form.set_value(field.key, value);
                }
                (KeyCode::Char(c), FieldKind::Toggle | FieldKind::Choice) => {
                    tracing::trace!(%c, "Ignoring text input on selector");
                }
                (KeyCode::Char(c), _) => {
                    value.push(c);
                    form.set_value(field.key, value);
                }
                _ => {}
            }
        }

        self.field = next;
        match action {
            Some(FormAction::Submit) => self.submit_form(),
            Some(FormAction::Close) => self.close_form(),
            None => {}
        }
    }

    /// Send the open form on a task; the result comes back as a [`Loaded`].
    fn submit_form(&mut self) {
        match self.route {
            Route::ContactForm(id) => {
                if self.saving {
                    return;
                }
                let Some(form) = self.contact_form.as_mut() else {
                    return;
                };
                if !form.begin_submit() {
                    return;
                }
                let form = form.clone();
                self.mutate(move |backend| async move { Loaded::ContactSaved(id, form.save(&backend).await) });
            }
            Route::Dashboard(Section::Studies) => {
                if let Some(form) = self.studies.form().cloned() {
                    self.mutate(move |backend| async move { Loaded::StudySaved(form.save(&backend).await) });
                }
            }
            Route::Dashboard(Section::Reservations) => {
                let date = self.reservations.date();
                if let Some(form) = self.reservations.form().cloned() {
                    self.mutate(move |backend| async move { Loaded::Booked(form.save(&backend, date).await) });
                }
            }
            Route::Dashboard(Section::Admin) => {
                if let Some(form) = self.admin.room_form().cloned() {
                    self.mutate(move |backend| async move { Loaded::RoomSaved(form.save(&backend).await) });
                } else if let Some(form) = self.admin.lesson_form().cloned() {
                    self.mutate(move |backend| async move { Loaded::LessonSaved(form.save(&backend).await) });
                }
            }
            _ => {}
        }
    }

    fn close_form(&mut self) {
        match self.route {
            Route::ContactForm(_) => {
                if let Some(form) = &self.contact_form {
                    form.cancel(&self.backend);
                }
            }
            Route::Dashboard(Section::Studies) => self.studies.close_form(),
            Route::Dashboard(Section::Reservations) => self.reservations.toggle_form(),
            Route::Dashboard(Section::Admin) => {
                self.admin.close_room_form();
                self.admin.close_lesson_form();
            }
            _ => {}
        }
        self.field = 0;
    }

    fn notes_key(&mut self, key: KeyEvent) {
        let Some(detail) = self.detail.as_mut() else {
            self.editing_notes = false;
            return;
        };
        match key.code {
            KeyCode::Esc | KeyCode::Enter => self.editing_notes = false,
            KeyCode::Backspace => {
                detail.status_notes.pop();
            }
            KeyCode::Char(c) => detail.status_notes.push(c),
            _ => {}
        }
    }

    fn screen_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                return;
            }
            KeyCode::Char('r') => {
                self.reload();
                return;
            }
            KeyCode::Char('L') => {
                self.backend.session().logout();
                return;
            }
            KeyCode::Tab => {
                self.step_section(true);
                return;
            }
            KeyCode::BackTab => {
                self.step_section(false);
                return;
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_cursor(true);
                return;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_cursor(false);
                return;
            }
            KeyCode::Char(c @ '1'..='9') => {
                let sections = self.sections();
                let index = c as usize - '1' as usize;
                if let Some(section) = sections.get(index) {
                    self.navigate(Route::Dashboard(*section));
                }
                return;
            }
            _ => {}
        }

        match self.route {
            Route::Dashboard(Section::Contacts) => self.contacts_key(key),
            Route::ContactDetail(id) => self.detail_key(key, id),
            Route::Dashboard(Section::Studies) => self.studies_key(key),
            Route::Dashboard(Section::Reservations) => self.reservations_key(key),
            Route::Dashboard(Section::Admin) => self.admin_key(key),
            _ => {}
        }
    }

    pub(super) fn sections(&self) -> Vec<Section> {
        Section::visible_for(self.backend.session().current_user().as_ref())
    }

    fn step_section(&mut self, forward: bool) {
        let sections = self.sections();
        if sections.is_empty() {
            return;
        }
        let len = sections.len();
        let current = match self.route {
            Route::Dashboard(section) => sections.iter().position(|s| *s == section).unwrap_or(0),
            _ => sections.iter().position(|s| *s == Section::Contacts).unwrap_or(0),
        };
        let next = if forward { (current + 1) % len } else { (current + len - 1) % len };
        self.navigate(Route::Dashboard(sections[next]));
    }

    fn contacts_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                if let Some(row) = self.contacts.rows().get(self.cursor) {
                    self.navigate(Route::ContactDetail(row.id));
                }
            }
            KeyCode::Char('n') => self.navigate(Route::ContactForm(None)),
            KeyCode::Right | KeyCode::PageDown => {
                if self.contacts.next_page() {
                    self.cursor = 0;
                    self.load_contacts();
                }
            }
            KeyCode::Left | KeyCode::PageUp => {
                if self.contacts.prev_page() {
                    self.cursor = 0;
                    self.load_contacts();
                }
            }
            _ => {}
        }
    }

    fn detail_key(&mut self, key: KeyEvent, id: i64) {
        if key.code == KeyCode::Char('s') {
            self.change_status();
            return;
        }
        let Some(detail) = self.detail.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc | KeyCode::Char('b') => detail.back_to_contacts(&self.backend),
            KeyCode::Char('e') => self.backend.session().navigator().navigate(Route::ContactForm(Some(id))),
            KeyCode::Left => detail.cycle_status(false),
            KeyCode::Right => detail.cycle_status(true),
            KeyCode::Char('i') if detail.status_choice.is_some() => self.editing_notes = true,
            KeyCode::Char('d') => self.confirm = Some(Pending::DeleteContact(id)),
            _ => {}
        }
    }

    fn change_status(&mut self) {
        let Some((contact_id, status_id, notes)) = self.detail.as_ref().and_then(ContactDetail::status_request) else {
            return;
        };
        self.mutate(move |backend| async move {
            let result = backend
                .core
                .update_contact_status(contact_id, status_id, &notes)
                .await
                .map(|_| ());
            Loaded::StatusChanged(contact_id, status_id, result)
        });
    }

    fn studies_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Left | KeyCode::Right => {
                if self.studies.cycle_contact(key.code == KeyCode::Right) {
                    self.cursor = 0;
                    self.load_studies();
                }
            }
            KeyCode::Char('n') => {
                self.field = 0;
                self.studies.open_new_form(today());
            }
            KeyCode::Char('e') => {
                if let Some(row) = self.studies.rows().get(self.cursor) {
                    self.field = 0;
                    self.studies.open_edit_form(row.id);
                }
            }
            KeyCode::Char('d') => {
                if let Some(row) = self.studies.rows().get(self.cursor) {
                    self.confirm = Some(Pending::DeleteStudy(row.id));
                }
            }
            _ => {}
        }
    }

    fn reservations_key(&mut self, key: KeyEvent) {
        let changed = match key.code {
            KeyCode::Left => self.reservations.shift_date(-1),
            KeyCode::Right => self.reservations.shift_date(1),
            KeyCode::Char('t') => self.reservations.set_date(today()),
            KeyCode::Char('f') => self.reservations.cycle_room_filter(),
            KeyCode::Char('n') => {
                self.field = 0;
                self.reservations.toggle_form();
                false
            }
            KeyCode::Char('d') => {
                if let Some(row) = self.reservations.rows().get(self.cursor) {
                    self.confirm = Some(Pending::CancelReservation(row.id));
                }
                false
            }
            _ => false,
        };
        if changed {
            self.load_reservations();
        }
    }

    fn admin_key(&mut self, key: KeyEvent) {
        let tab = self.admin.tab();
        let selected = match tab {
            AdminTab::Rooms => self.admin.rooms().value().and_then(|r| r.get(self.cursor)).map(|r| r.id),
            AdminTab::Lessons => self.admin.lessons().value().and_then(|l| l.get(self.cursor)).map(|l| l.id),
            AdminTab::Users => None,
        };

        match key.code {
            KeyCode::Left | KeyCode::Right => {
                let tabs = AdminTab::ALL;
                let index = tabs.iter().position(|t| *t == tab).unwrap_or(0);
                let next = if key.code == KeyCode::Right {
                    (index + 1) % tabs.len()
                } else {
                    (index + tabs.len() - 1) % tabs.len()
                };
                if self.admin.set_tab(tabs[next]) {
                    self.load_admin();
                }
            }
            KeyCode::Char('n') => {
                self.field = 0;
                match tab {
                    AdminTab::Rooms => {
                        self.admin.open_room_form(None);
                    }
                    AdminTab::Lessons => {
                        self.admin.open_lesson_form(None);
                    }
                    AdminTab::Users => {}
                }
            }
            KeyCode::Char('e') => {
                self.field = 0;
                match tab {
                    AdminTab::Rooms => {
                        self.admin.open_room_form(selected);
                    }
                    AdminTab::Lessons => {
                        self.admin.open_lesson_form(selected);
                    }
                    AdminTab::Users => {}
                }
            }
            KeyCode::Char('d') => {
                self.confirm = match (tab, selected) {
                    (AdminTab::Rooms, Some(id)) => Some(Pending::DeleteRoom(id)),
                    (AdminTab::Lessons, Some(id)) => Some(Pending::DeleteLesson(id)),
                    _ => None,
                };
            }
            _ => {}
        }
    }

    fn perform(&mut self, pending: Pending) {
        self.mutate(move |backend| async move {
            let result = match pending {
                Pending::DeleteContact(id) => backend.core.delete_contact(id).await,
                Pending::DeleteStudy(id) => backend.studies.delete_study(id).await,
                Pending::CancelReservation(id) => backend.rooms.delete_reservation(id).await,
                Pending::DeleteRoom(id) => backend.rooms.delete_room(id).await,
                Pending::DeleteLesson(id) => backend.studies.delete_lesson(id).await,
            };
            Loaded::Performed(pending, result)
        });
    }

    fn performed(&mut self, pending: Pending, result: Result<(), ApiError>) {
        match pending {
            Pending::DeleteContact(id) => {
                let on_detail = self.route == Route::ContactDetail(id);
                match self.detail.as_mut().filter(|d| on_detail && d.contact_id() == id) {
                    Some(detail) => {
                        detail.deleted(&self.backend, result);
                    }
                    None if result.is_ok() && matches!(self.route, Route::Dashboard(Section::Overview | Section::Contacts)) => {
                        self.load_contacts()
                    }
                    None => tracing::debug!(contact_id = id, "Contact left before its delete finished"),
                }
            }
            Pending::DeleteStudy(id) => {
                if self.studies.study_deleted(id, result) {
                    self.load_studies();
                }
            }
            Pending::CancelReservation(id) => {
                if self.reservations.cancelled(id, result) {
                    self.load_reservations();
                }
            }
            Pending::DeleteRoom(id) => {
                if self.admin.room_deleted(id, result) {
                    self.load_admin_tab(AdminTab::Rooms);
                }
            }
            Pending::DeleteLesson(id) => {
                if self.admin.lesson_deleted(id, result) {
                    self.load_admin_tab(AdminTab::Lessons);
                }
            }
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
