use chrono::{Local, NaiveDate, NaiveTime, TimeZone, Utc};
use shared::{Reservation, ReservationPayload, Room, Timestamp};

use super::{optional, parse_number, parse_time, required, EditableForm, Field, FieldKind, FormError, SubmitError};
use crate::api::Backend;

const FIELDS: &[Field] = &[
    Field::new("room_id", "Room", FieldKind::Choice).required(),
    Field::new("title", "Title", FieldKind::Text).required(),
    Field::new("start_time", "Start Time", FieldKind::Time).required(),
    Field::new("end_time", "End Time", FieldKind::Time).required(),
    Field::new("description", "Description", FieldKind::Multiline),
];

/// New booking on the dashboard's selected day. Times are wall-clock times in
/// the local zone.
#[derive(Debug, Clone, Default)]
pub struct ReservationForm {
    rooms: Vec<Room>,
    pub room_id: String,
    pub title: String,
    pub description: String,
    pub start_time: String,
    pub end_time: String,
    error: Option<String>,
}

impl ReservationForm {
    pub fn new(rooms: Vec<Room>) -> Self {
        Self {
            rooms,
            ..Default::default()
        }
    }

    pub fn set_error(&mut self, message: String) {
        self.error = Some(message);
    }

    pub fn payload(&self, date: NaiveDate) -> Result<ReservationPayload, FormError> {
        let room_id = required(&self.room_id, "Room")?;
        let title = required(&self.title, "Title")?;
        let start = required(&self.start_time, "Start Time")?;
        let end = required(&self.end_time, "End Time")?;

        Ok(ReservationPayload {
            room_id: parse_number(&room_id, "Room")?,
            contact_id: None,
            title,
            description: optional(&self.description),
            start_time: local_instant(date, parse_time(&start, "Start Time")?, "Start Time")?,
            end_time: local_instant(date, parse_time(&end, "End Time")?, "End Time")?,
            recurring_type: None,
            recurring_end_date: None,
        })
    }

    pub async fn save(&self, backend: &Backend, date: NaiveDate) -> Result<Reservation, SubmitError> {
        let payload = self.payload(date)?;
        let reservation = backend.rooms.create_reservation(&payload).await?;
        tracing::info!(reservation_id = reservation.id, room_id = reservation.room_id, "Booked room");
        Ok(reservation)
    }
}

/// `date` at `time` on the local clock, as a UTC instant.
fn local_instant(date: NaiveDate, time: NaiveTime, field: &'static str) -> Result<Timestamp, FormError> {
    Local
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|local| Timestamp::from_utc(local.with_timezone(&Utc)))
        .ok_or(FormError::BadTime(field))
}

impl EditableForm for ReservationForm {
    fn title(&self) -> String {
        "New Reservation".to_string()
    }

    fn fields(&self) -> &'static [Field] {
        FIELDS
    }

    fn value(&self, key: &str) -> String {
        match key {
            "room_id" => self.room_id.clone(),
            "title" => self.title.clone(),
            "description" => self.description.clone(),
            "start_time" => self.start_time.clone(),
            "end_time" => self.end_time.clone(),
            _ => String::new(),
        }
    }

    fn set_value(&mut self, key: &str, value: String) {
        match key {
            "room_id" => self.room_id = value,
            "title" => self.title = value,
            "description" => self.description = value,
            "start_time" => self.start_time = value,
            "end_time" => self.end_time = value,
            _ => {}
        }
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn choices(&self, key: &str) -> Vec<(String, String)> {
        match key {
            "room_id" => self
                .rooms
                .iter()
                .map(|r| (r.id.to_string(), format!("{} (Capacity: {})", r.name, r.capacity)))
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::REQUIRED_FIELDS;

    fn filled() -> ReservationForm {
        let mut form = ReservationForm::default();
        form.set_value("room_id", "3".to_string());
        form.set_value("title", "Youth Bible Study".to_string());
        form.set_value("start_time", "10:00".to_string());
        form.set_value("end_time", "11:30".to_string());
        form
    }

    #[test]
    fn test_times_combined_with_selected_day() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let payload = filled().payload(day).unwrap();

        let expected_start = Local
            .from_local_datetime(&day.and_hms_opt(10, 0, 0).unwrap())
            .earliest()
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(payload.room_id, 3);
        assert_eq!(payload.start_time.as_utc(), expected_start);
        assert_eq!(
            payload.end_time.as_utc() - payload.start_time.as_utc(),
            chrono::Duration::minutes(90)
        );
        assert!(payload.start_time.to_rfc3339().ends_with('Z'));
    }

    #[test]
    fn test_all_required_fields_checked() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        for key in ["room_id", "title", "start_time", "end_time"] {
            let mut form = filled();
            form.set_value(key, String::new());
            let err = form.payload(day).unwrap_err();
            assert_eq!(err.to_string(), REQUIRED_FIELDS, "{}", key);
        }
    }

    #[test]
    fn test_room_choices_show_capacity() {
        let room = Room {
            id: 3,
            name: "Chapel".to_string(),
            capacity: 40,
            location: None,
            description: None,
            availability_start: None,
            availability_end: None,
            is_available: true,
            created_at: None,
            updated_at: None,
        };
        let form = ReservationForm::new(vec![room]);
        assert_eq!(
            form.choices("room_id"),
            vec![("3".to_string(), "Chapel (Capacity: 40)".to_string())]
        );
    }
}
