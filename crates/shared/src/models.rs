use serde::{Deserialize, Serialize};

use crate::time::{self, Timestamp};

// ============================================================================
// Users
// ============================================================================

/// Role of a signed-in user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    #[default]
    #[serde(other)]
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "time::optional::deserialize", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(default, deserialize_with = "time::optional::deserialize", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Name to greet the user with; falls back to the username.
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            &self.username
        } else {
            &self.full_name
        }
    }
}

// ============================================================================
// Contacts and statuses
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub date_added: Timestamp,
    #[serde(default, deserialize_with = "time::optional::deserialize", skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<Timestamp>,
    pub current_status_id: i64,
}

/// A named stage in a contact's progression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub display_order: i64,
}

/// One entry of a contact's append-only status log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusHistory {
    pub id: i64,
    pub contact_id: i64,
    pub status_id: i64,
    #[serde(default)]
    pub status_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub date_changed: Timestamp,
}

// ============================================================================
// Lessons and studies
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub sequence_number: i64,
    #[serde(default, deserialize_with = "time::optional::deserialize", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(default, deserialize_with = "time::optional::deserialize", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

/// A lesson annotated with whether a given contact has completed it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonProgress {
    #[serde(flatten)]
    pub lesson: Lesson,
    #[serde(default)]
    pub completed: bool,
}

/// A completed lesson for a contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Study {
    pub id: i64,
    pub contact_id: i64,
    pub lesson_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson_title: Option<String>,
    pub date_completed: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taught_by_user_id: Option<i64>,
    #[serde(default, deserialize_with = "time::optional::deserialize", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(default, deserialize_with = "time::optional::deserialize", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

/// Study progress for a contact, as aggregated by the study service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudyStats {
    #[serde(default)]
    pub completed_lessons: i64,
    #[serde(default)]
    pub total_lessons: i64,
    #[serde(default)]
    pub progress_percentage: f64,
    #[serde(default, deserialize_with = "time::optional::deserialize", skip_serializing_if = "Option::is_none")]
    pub last_study_date: Option<Timestamp>,
    #[serde(default)]
    pub total_study_time_minutes: i64,
}

// ============================================================================
// Rooms and reservations
// ============================================================================

fn default_true() -> bool {
    true
}

fn default_recurring_type() -> String {
    "none".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    pub name: String,
    pub capacity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Daily opening time, `HH:MM:SS`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_end: Option<String>,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default, deserialize_with = "time::optional::deserialize", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(default, deserialize_with = "time::optional::deserialize", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

/// A booked time interval for a room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i64,
    pub room_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_name: Option<String>,
    #[serde(default)]
    pub user_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<i64>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    #[serde(default = "default_recurring_type")]
    pub recurring_type: String,
    #[serde(default, deserialize_with = "time::optional::deserialize", skip_serializing_if = "Option::is_none")]
    pub recurring_end_date: Option<Timestamp>,
    #[serde(default, deserialize_with = "time::optional::deserialize", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(default, deserialize_with = "time::optional::deserialize", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_with_plain_date() {
        let json = r#"{"id":1,"name":"John Smith","current_status_id":1,"date_added":"2024-01-01"}"#;
        let contact: Contact = serde_json::from_str(json).unwrap();
        assert_eq!(contact.name, "John Smith");
        assert_eq!(contact.current_status_id, 1);
        assert!(contact.email.is_none());
        assert!(contact.last_updated.is_none());
    }

    #[test]
    fn test_contact_missing_name_is_rejected() {
        let json = r#"{"id":1,"current_status_id":1,"date_added":"2024-01-01"}"#;
        assert!(serde_json::from_str::<Contact>(json).is_err());
    }

    #[test]
    fn test_role_deserialization() {
        let admin: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(admin, Role::Admin);

        let other: Role = serde_json::from_str("\"volunteer\"").unwrap();
        assert_eq!(other, Role::User);
    }

    #[test]
    fn test_user_display_name_fallback() {
        let user: User = serde_json::from_str(r#"{"id":3,"username":"mgarcia","role":"user"}"#).unwrap();
        assert_eq!(user.display_name(), "mgarcia");
        assert!(!user.is_admin());
    }

    #[test]
    fn test_study_stats_zero_last_date() {
        let json = r#"{"total_lessons":30,"completed_lessons":0,"progress_percentage":0,"last_study_date":"0001-01-01T00:00:00Z","total_study_time_minutes":0}"#;
        let stats: StudyStats = serde_json::from_str(json).unwrap();
        assert_eq!(stats.total_lessons, 30);
        assert!(stats.last_study_date.is_none());
    }

    #[test]
    fn test_room_defaults() {
        let room: Room = serde_json::from_str(r#"{"id":2,"name":"Fellowship Hall","capacity":80}"#).unwrap();
        assert!(room.is_available);
        assert!(room.availability_start.is_none());
    }

    #[test]
    fn test_reservation_defaults() {
        let json = r#"{"id":9,"room_id":2,"title":"Prayer Meeting","start_time":"2024-06-01T14:00:00Z","end_time":"2024-06-01T15:00:00Z","recurring_end_date":"0001-01-01T00:00:00Z"}"#;
        let reservation: Reservation = serde_json::from_str(json).unwrap();
        assert_eq!(reservation.recurring_type, "none");
        assert!(reservation.recurring_end_date.is_none());
        assert!(reservation.room_name.is_none());
    }

    #[test]
    fn test_lesson_progress_flattened() {
        let json = r#"{"id":4,"title":"The Sabbath","sequence_number":4,"completed":true}"#;
        let progress: LessonProgress = serde_json::from_str(json).unwrap();
        assert_eq!(progress.lesson.title, "The Sabbath");
        assert!(progress.completed);
    }
}
