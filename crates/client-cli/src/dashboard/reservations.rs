use chrono::{Duration, NaiveDate};
use shared::{Reservation, Room};

use super::{describe_failure, resolve, Loadable, Ticket, UNKNOWN_ROOM};
use crate::api::{ApiError, Backend};
use crate::forms::{ReservationForm, SubmitError};
use crate::format;

pub const ROOMS_FAILED: &str = "Failed to load rooms. Please try again later.";
pub const LOAD_FAILED: &str = "Failed to load reservations. Please try again later.";
pub const EMPTY: &str = "No reservations found for this date.";
pub const CREATE_FAILED: &str =
    "Failed to create reservation. The room might not be available for the selected time.";
pub const CANCEL_FAILED: &str = "Failed to cancel reservation.";

/// A by-date lookup for a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub room_id: Option<i64>,
}

impl ReservationQuery {
    pub fn for_day(date: NaiveDate, room_id: Option<i64>) -> Self {
        Self {
            start: date,
            end: date,
            room_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationRow {
    pub id: i64,
    pub title: String,
    pub room: String,
    pub time: String,
    pub description: String,
}

pub struct ReservationsDashboard {
    rooms: Loadable<Vec<Room>>,
    date: NaiveDate,
    room_filter: Option<i64>,
    reservations: Loadable<Vec<Reservation>>,
    requested: Option<ReservationQuery>,
    shown: Option<ReservationQuery>,
    form: Option<ReservationForm>,
    notice: Option<String>,
}

impl ReservationsDashboard {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            rooms: Loadable::default(),
            date,
            room_filter: None,
            reservations: Loadable::default(),
            requested: None,
            shown: None,
            form: None,
            notice: None,
        }
    }

    pub fn rooms(&self) -> &Loadable<Vec<Room>> {
        &self.rooms
    }

    pub fn reservations(&self) -> &Loadable<Vec<Reservation>> {
        &self.reservations
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn room_filter(&self) -> Option<i64> {
        self.room_filter
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    fn room_list(&self) -> &[Room] {
        self.rooms.value().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn begin_rooms(&mut self) -> Ticket {
        self.rooms.begin()
    }

    pub async fn fetch_rooms(backend: &Backend) -> Result<Vec<Room>, ApiError> {
        Ok(backend.rooms.list_rooms().await?.rooms)
    }

    pub fn finish_rooms(&mut self, ticket: Ticket, result: Result<Vec<Room>, ApiError>) -> bool {
        self.rooms.finish(ticket, result, ROOMS_FAILED)
    }

    /// Returns `true` when the key changed and reservations need loading.
    pub fn set_date(&mut self, date: NaiveDate) -> bool {
        if self.date == date {
            return false;
        }
        self.date = date;
        true
    }

    pub fn shift_date(&mut self, days: i64) -> bool {
        match self.date.checked_add_signed(Duration::days(days)) {
            Some(date) => self.set_date(date),
            None => false,
        }
    }

    pub fn set_room_filter(&mut self, room_id: Option<i64>) -> bool {
        if self.room_filter == room_id {
            return false;
        }
        self.room_filter = room_id;
        true
    }

    /// All rooms, then each room in turn.
    pub fn cycle_room_filter(&mut self) -> bool {
        let ids: Vec<i64> = self.room_list().iter().map(|r| r.id).collect();
        let next = match self.room_filter {
            None => ids.first().copied(),
            Some(current) => ids
                .iter()
                .position(|id| *id == current)
                .and_then(|i| ids.get(i + 1).copied()),
        };
        self.set_room_filter(next)
    }

    fn query(&self) -> ReservationQuery {
        ReservationQuery::for_day(self.date, self.room_filter)
    }

    pub fn begin_reservations(&mut self) -> (Ticket, ReservationQuery) {
        let query = self.query();
        self.requested = Some(query);
        (self.reservations.begin(), query)
    }

    /// Reservations for the query's day, limited to its room when one is set.
    pub async fn fetch_reservations(
        backend: &Backend,
        query: ReservationQuery,
    ) -> Result<Vec<Reservation>, ApiError> {
        let mut reservations = backend
            .rooms
            .reservations_by_date(query.start, query.end, query.room_id)
            .await?
            .reservations;
        if let Some(room_id) = query.room_id {
            reservations.retain(|r| r.room_id == room_id);
        }
        reservations.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(reservations)
    }

    pub fn finish_reservations(&mut self, ticket: Ticket, result: Result<Vec<Reservation>, ApiError>) -> bool {
        let loaded = result.is_ok();
        if !self.reservations.finish(ticket, result, LOAD_FAILED) {
            return false;
        }
        if loaded {
            self.shown = self.requested;
        }
        true
    }

    /// The last good load, only while it matches the selected day and room.
    pub fn current(&self) -> Option<&[Reservation]> {
        self.reservations
            .value()
            .filter(|_| self.shown == Some(self.query()))
            .map(Vec::as_slice)
    }

    pub async fn refresh_reservations(&mut self, backend: &Backend) {
        let (ticket, query) = self.begin_reservations();
        let result = Self::fetch_reservations(backend, query).await;
        self.finish_reservations(ticket, result);
    }

    pub async fn refresh(&mut self, backend: &Backend) {
        let ticket = self.begin_rooms();
        let rooms = Self::fetch_rooms(backend).await;
        self.finish_rooms(ticket, rooms);
        self.refresh_reservations(backend).await;
    }

    pub fn room_name<'a>(&'a self, reservation: &'a Reservation) -> &'a str {
        match reservation.room_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => resolve(self.room_list(), reservation.room_id, UNKNOWN_ROOM),
        }
    }

    pub fn heading(&self) -> String {
        let day = self.date.format("%A, %B %-d, %Y");
        match self.room_filter {
            Some(room_id) => format!(
                "Reservations for {} - {}",
                day,
                resolve(self.room_list(), room_id, UNKNOWN_ROOM)
            ),
            None => format!("Reservations for {}", day),
        }
    }

    pub fn rows(&self) -> Vec<ReservationRow> {
        let Some(reservations) = self.current() else {
            return Vec::new();
        };
        reservations
            .iter()
            .map(|r| ReservationRow {
                id: r.id,
                title: r.title.clone(),
                room: self.room_name(r).to_string(),
                time: format::time_range(&r.start_time, &r.end_time),
                description: r.description.clone().unwrap_or_default(),
            })
            .collect()
    }

    pub fn empty_message(&self) -> Option<&'static str> {
        match self.current() {
            Some(list) if list.is_empty() => Some(EMPTY),
            _ => None,
        }
    }

    pub fn form(&self) -> Option<&ReservationForm> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut ReservationForm> {
        self.form.as_mut()
    }

    pub fn toggle_form(&mut self) {
        self.form = match self.form {
            Some(_) => None,
            None => Some(ReservationForm::new(self.room_list().to_vec())),
        };
    }

    /// Close the form after a booking, or show why it failed. Returns `true`
    /// when the day needs reloading.
    pub fn booked(&mut self, result: Result<Reservation, SubmitError>) -> bool {
        match result {
            Ok(_) => {
                self.form = None;
                self.notice = None;
                true
            }
            Err(e) => {
                if let Some(form) = self.form.as_mut() {
                    form.set_error(e.message(CREATE_FAILED));
                }
                false
            }
        }
    }

    /// Book the open form on the selected day, then close it and reload.
    pub async fn submit_form(&mut self, backend: &Backend) -> bool {
        let Some(form) = self.form.as_ref() else {
            return false;
        };
        let result = form.save(backend, self.date).await;
        if !self.booked(result) {
            return false;
        }
        self.refresh_reservations(backend).await;
        true
    }

    pub fn cancelled(&mut self, reservation_id: i64, result: Result<(), ApiError>) -> bool {
        match result {
            Ok(()) => {
                tracing::info!(reservation_id, "Cancelled reservation");
                self.notice = None;
                true
            }
            Err(e) => {
                self.notice = Some(describe_failure(&e, CANCEL_FAILED));
                false
            }
        }
    }

    pub async fn cancel_reservation(&mut self, backend: &Backend, reservation_id: i64) -> bool {
        self.notice = None;
        let result = backend.rooms.delete_reservation(reservation_id).await;
        if !self.cancelled(reservation_id, result) {
            return false;
        }
        self.refresh_reservations(backend).await;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::EditableForm;
    use crate::testing::{reservation_json, room_json, TestEnv};
    use serde_json::json;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn mount(env: &TestEnv) {
        env.stub.respond(
            "GET",
            "/rooms",
            200,
            json!({"rooms": [room_json(1, "Chapel", 40), room_json(2, "Library", 8)]}),
        );
        env.stub.respond(
            "GET",
            "/reservations/by-date",
            200,
            json!({"start_date": "2024-06-01", "end_date": "2024-06-01", "reservations": [
                reservation_json(7, 2, "Choir", "2024-06-01T14:00:00Z", "2024-06-01T15:00:00Z"),
                reservation_json(8, 1, "Youth Study", "2024-06-01T10:00:00Z", "2024-06-01T11:00:00Z"),
            ]}),
        );
    }

    #[tokio::test]
    async fn test_single_day_query_then_room_scope() {
        let env = TestEnv::signed_in().await;
        mount(&env);
        let mut dashboard = ReservationsDashboard::new(day());
        dashboard.refresh(&env.backend).await;

        let request = env.stub.last("GET", "/reservations/by-date").unwrap();
        assert_eq!(request.query.as_deref(), Some("start=2024-06-01&end=2024-06-01"));
        let rows = dashboard.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].title, "Youth Study");
        assert_eq!(rows[0].room, "Chapel");

        assert!(dashboard.set_room_filter(Some(1)));
        dashboard.refresh_reservations(&env.backend).await;

        let request = env.stub.last("GET", "/reservations/by-date").unwrap();
        assert_eq!(request.query.as_deref(), Some("start=2024-06-01&end=2024-06-01&room_id=1"));
        let rows = dashboard.rows();
        assert_eq!(rows.len(), 1);
        assert!(rows.iter().all(|r| r.room == "Chapel"));
        assert!(dashboard.heading().ends_with("- Chapel"));
    }

    #[tokio::test]
    async fn test_unknown_room_fallback_and_empty_day() {
        let env = TestEnv::signed_in().await;
        mount(&env);
        env.stub.respond(
            "GET",
            "/reservations/by-date",
            200,
            json!({"reservations": [reservation_json(9, 42, "Board", "2024-06-01T09:00:00Z", "2024-06-01T10:00:00Z")]}),
        );
        let mut dashboard = ReservationsDashboard::new(day());
        dashboard.refresh(&env.backend).await;
        assert_eq!(dashboard.rows()[0].room, "Unknown Room");

        env.stub.respond("GET", "/reservations/by-date", 200, json!({"reservations": null}));
        assert!(dashboard.shift_date(1));
        dashboard.refresh_reservations(&env.backend).await;
        assert_eq!(dashboard.date(), NaiveDate::from_ymd_opt(2024, 6, 2).unwrap());
        assert_eq!(dashboard.empty_message(), Some(EMPTY));
    }

    #[tokio::test]
    async fn test_stale_day_response_dropped() {
        let env = TestEnv::signed_in().await;
        mount(&env);
        let mut dashboard = ReservationsDashboard::new(day());

        let (first, first_query) = dashboard.begin_reservations();
        dashboard.shift_date(1);
        let (second, second_query) = dashboard.begin_reservations();
        assert_eq!(second_query.start, NaiveDate::from_ymd_opt(2024, 6, 2).unwrap());

        let second_result = ReservationsDashboard::fetch_reservations(&env.backend, second_query).await;
        assert!(dashboard.finish_reservations(second, second_result));
        let first_result = ReservationsDashboard::fetch_reservations(&env.backend, first_query).await;
        assert!(!dashboard.finish_reservations(first, first_result));
    }

    #[tokio::test]
    async fn test_failed_day_change_hides_previous_day() {
        let env = TestEnv::signed_in().await;
        mount(&env);
        let mut dashboard = ReservationsDashboard::new(day());
        dashboard.refresh(&env.backend).await;
        assert_eq!(dashboard.rows().len(), 2);

        env.stub.respond("GET", "/reservations/by-date", 500, json!({"error": "db"}));
        assert!(dashboard.shift_date(1));
        dashboard.refresh_reservations(&env.backend).await;
        assert_eq!(dashboard.reservations().error(), Some(LOAD_FAILED));
        assert!(dashboard.current().is_none());
        assert!(dashboard.rows().is_empty());
        assert!(dashboard.empty_message().is_none());

        assert!(dashboard.shift_date(-1));
        assert_eq!(dashboard.rows().len(), 2);
    }

    #[tokio::test]
    async fn test_create_closes_form_and_refetches() {
        let env = TestEnv::signed_in().await;
        mount(&env);
        let mut dashboard = ReservationsDashboard::new(day());
        dashboard.refresh(&env.backend).await;
        let before = env.stub.count("GET", "/reservations/by-date");

        dashboard.toggle_form();
        let form = dashboard.form_mut().unwrap();
        assert_eq!(form.choices("room_id").len(), 2);
        form.set_value("room_id", "1".to_string());
        form.set_value("title", "Prayer Meeting".to_string());
        form.set_value("start_time", "18:00".to_string());
        form.set_value("end_time", "19:00".to_string());

        env.stub.respond(
            "POST",
            "/reservations",
            201,
            reservation_json(10, 1, "Prayer Meeting", "2024-06-01T18:00:00Z", "2024-06-01T19:00:00Z"),
        );
        assert!(dashboard.submit_form(&env.backend).await);
        assert!(dashboard.form().is_none());
        assert_eq!(env.stub.count("GET", "/reservations/by-date"), before + 1);
        assert_eq!(env.stub.last("POST", "/reservations").unwrap().json()["room_id"], 1);
    }

    #[tokio::test]
    async fn test_conflict_keeps_form_and_list() {
        let env = TestEnv::signed_in().await;
        mount(&env);
        let mut dashboard = ReservationsDashboard::new(day());
        dashboard.refresh(&env.backend).await;

        dashboard.toggle_form();
        let form = dashboard.form_mut().unwrap();
        form.room_id = "1".to_string();
        form.title = "Overlap".to_string();
        form.start_time = "10:30".to_string();
        form.end_time = "11:30".to_string();
        env.stub.respond("POST", "/reservations", 409, json!({"error": "Room is not available"}));

        assert!(!dashboard.submit_form(&env.backend).await);
        assert_eq!(dashboard.form().unwrap().error(), Some(CREATE_FAILED));
        assert_eq!(dashboard.rows().len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_refetches() {
        let env = TestEnv::signed_in().await;
        mount(&env);
        let mut dashboard = ReservationsDashboard::new(day());
        dashboard.refresh(&env.backend).await;

        env.stub.respond("DELETE", "/reservations/7", 200, json!({"message": "Reservation deleted successfully"}));
        env.stub.respond(
            "GET",
            "/reservations/by-date",
            200,
            json!({"reservations": [reservation_json(8, 1, "Youth Study", "2024-06-01T10:00:00Z", "2024-06-01T11:00:00Z")]}),
        );
        assert!(dashboard.cancel_reservation(&env.backend, 7).await);
        assert_eq!(dashboard.rows().len(), 1);

        env.stub.respond("DELETE", "/reservations/8", 500, json!({"error": "db"}));
        assert!(!dashboard.cancel_reservation(&env.backend, 8).await);
        assert_eq!(dashboard.rows().len(), 1);
        assert!(dashboard.notice().is_some());
    }

    #[tokio::test]
    async fn test_room_filter_cycles_back_to_all() {
        let env = TestEnv::signed_in().await;
        mount(&env);
        let mut dashboard = ReservationsDashboard::new(day());
        dashboard.refresh(&env.backend).await;

        assert!(dashboard.cycle_room_filter());
        assert_eq!(dashboard.room_filter(), Some(1));
        assert!(dashboard.cycle_room_filter());
        assert_eq!(dashboard.room_filter(), Some(2));
        assert!(dashboard.cycle_room_filter());
        assert_eq!(dashboard.room_filter(), None);
    }
}
