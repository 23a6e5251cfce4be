//! Request payloads and response envelopes, one per backend endpoint

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::*;
use crate::time::Timestamp;

/// The services encode empty slices as `null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

// ============================================================================
// Core service: auth, users, contacts, statuses
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsersResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub users: Vec<User>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactsPage {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactPayload {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub current_status_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status_id: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

/// `PUT /contacts/:id/status` answers with the updated contact, or with a
/// plain acknowledgement when nothing changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusUpdateResponse {
    Updated(Contact),
    Unchanged(MessageResponse),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusesResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub statuses: Vec<Status>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusHistoryResponse {
    pub contact_id: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub history: Vec<StatusHistory>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================================
// Study service
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonsResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonPayload {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub sequence_number: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactStudiesResponse {
    pub contact_id: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub studies: Vec<Study>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonProgressResponse {
    pub contact_id: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub lessons: Vec<LessonProgress>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyPayload {
    pub contact_id: i64,
    pub lesson_id: i64,
    /// Serialized as `YYYY-MM-DD`
    pub date_completed: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

// ============================================================================
// Reservation service: rooms and reservations
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomsResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub rooms: Vec<Room>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableRoomsResponse {
    pub start: Timestamp,
    pub end: Timestamp,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub rooms: Vec<Room>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomPayload {
    pub name: String,
    pub capacity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_end: Option<String>,
    pub is_available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationsByDateResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub reservations: Vec<Reservation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationPayload {
    pub room_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<i64>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_end_date: Option<NaiveDate>,
}
