use shared::{Room, RoomPayload};

use super::{flag, optional, parse_number, parse_time, required, EditableForm, Field, FieldKind, FormError, SubmitError};
use crate::api::Backend;

const FIELDS: &[Field] = &[
    Field::new("name", "Room Name", FieldKind::Text).required(),
    Field::new("capacity", "Capacity", FieldKind::Number).required(),
    Field::new("location", "Location", FieldKind::Text),
    Field::new("description", "Description", FieldKind::Multiline),
    Field::new("availability_start", "Available From", FieldKind::Time),
    Field::new("availability_end", "Available Until", FieldKind::Time),
    Field::new("is_available", "Available for booking", FieldKind::Toggle),
];

#[derive(Debug, Clone)]
pub struct RoomForm {
    edit_id: Option<i64>,
    pub name: String,
    pub capacity: String,
    pub location: String,
    pub description: String,
    pub availability_start: String,
    pub availability_end: String,
    pub is_available: bool,
    error: Option<String>,
}

impl Default for RoomForm {
    fn default() -> Self {
        Self {
            edit_id: None,
            name: String::new(),
            capacity: String::new(),
            location: String::new(),
            description: String::new(),
            availability_start: String::new(),
            availability_end: String::new(),
            is_available: true,
            error: None,
        }
    }
}

impl RoomForm {
    pub fn edit(room: &Room) -> Self {
        Self {
            edit_id: Some(room.id),
            name: room.name.clone(),
            capacity: room.capacity.to_string(),
            location: room.location.clone().unwrap_or_default(),
            description: room.description.clone().unwrap_or_default(),
            availability_start: room.availability_start.clone().unwrap_or_default(),
            availability_end: room.availability_end.clone().unwrap_or_default(),
            is_available: room.is_available,
            error: None,
        }
    }

    pub fn edit_id(&self) -> Option<i64> {
        self.edit_id
    }

    pub fn set_error(&mut self, message: String) {
        self.error = Some(message);
    }

    pub fn payload(&self) -> Result<RoomPayload, FormError> {
        Ok(RoomPayload {
            name: required(&self.name, "Room Name")?,
            capacity: parse_number(&required(&self.capacity, "Capacity")?, "Capacity")?,
            location: optional(&self.location),
            description: optional(&self.description),
            availability_start: clock_time(&self.availability_start, "Available From")?,
            availability_end: clock_time(&self.availability_end, "Available Until")?,
            is_available: self.is_available,
        })
    }

    pub async fn save(&self, backend: &Backend) -> Result<Room, SubmitError> {
        let payload = self.payload()?;
        let room = match self.edit_id {
            Some(id) => backend.rooms.update_room(id, &payload).await?,
            None => backend.rooms.create_room(&payload).await?,
        };
        tracing::info!(room_id = room.id, "Saved room");
        Ok(room)
    }
}

/// The rooms service expects `HH:MM:SS`; `HH:MM` input is padded.
fn clock_time(value: &str, field: &'static str) -> Result<Option<String>, FormError> {
    match optional(value) {
        Some(v) => Ok(Some(parse_time(&v, field)?.format("%H:%M:%S").to_string())),
        None => Ok(None),
    }
}

impl EditableForm for RoomForm {
    fn title(&self) -> String {
        match self.edit_id {
            Some(_) => "Edit Room".to_string(),
            None => "Add New Room".to_string(),
        }
    }

    fn fields(&self) -> &'static [Field] {
        FIELDS
    }

    fn value(&self, key: &str) -> String {
        match key {
            "name" => self.name.clone(),
            "capacity" => self.capacity.clone(),
            "location" => self.location.clone(),
            "description" => self.description.clone(),
            "availability_start" => self.availability_start.clone(),
            "availability_end" => self.availability_end.clone(),
            "is_available" => self.is_available.to_string(),
            _ => String::new(),
        }
    }

    fn set_value(&mut self, key: &str, value: String) {
        match key {
            "name" => self.name = value,
            "capacity" => self.capacity = value,
            "location" => self.location = value,
            "description" => self.description = value,
            "availability_start" => self.availability_start = value,
            "availability_end" => self.availability_end = value,
            "is_available" => self.is_available = flag(&value),
            _ => {}
        }
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
