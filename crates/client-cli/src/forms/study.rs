use chrono::NaiveDate;
use shared::{Lesson, Study, StudyPayload};

use super::{
    optional, optional_number, parse_date, parse_number, required, EditableForm, Field, FieldKind, FormError,
    SubmitError,
};
use crate::api::Backend;

const FIELDS: &[Field] = &[
    Field::new("lesson_id", "Lesson", FieldKind::Choice).required(),
    Field::new("date_completed", "Date Completed", FieldKind::Date).required(),
    Field::new("duration_minutes", "Duration (minutes)", FieldKind::Number),
    Field::new("location", "Location", FieldKind::Text),
    Field::new("notes", "Notes", FieldKind::Multiline),
];

/// Study record for one contact.
#[derive(Debug, Clone)]
pub struct StudyForm {
    edit_id: Option<i64>,
    contact_id: i64,
    lessons: Vec<Lesson>,
    pub lesson_id: String,
    pub date_completed: String,
    pub duration_minutes: String,
    pub location: String,
    pub notes: String,
    error: Option<String>,
}

impl StudyForm {
    pub fn new(contact_id: i64, lessons: Vec<Lesson>, today: NaiveDate) -> Self {
        Self {
            edit_id: None,
            contact_id,
            lessons,
            lesson_id: String::new(),
            date_completed: today.format("%Y-%m-%d").to_string(),
            duration_minutes: String::new(),
            location: String::new(),
            notes: String::new(),
            error: None,
        }
    }

    pub fn edit(study: &Study, lessons: Vec<Lesson>) -> Self {
        Self {
            edit_id: Some(study.id),
            contact_id: study.contact_id,
            lessons,
            lesson_id: study.lesson_id.to_string(),
            date_completed: study.date_completed.date().format("%Y-%m-%d").to_string(),
            duration_minutes: study.duration_minutes.map(|m| m.to_string()).unwrap_or_default(),
            location: study.location.clone().unwrap_or_default(),
            notes: study.notes.clone().unwrap_or_default(),
            error: None,
        }
    }

    pub fn edit_id(&self) -> Option<i64> {
        self.edit_id
    }

    pub fn contact_id(&self) -> i64 {
        self.contact_id
    }

    pub fn set_error(&mut self, message: String) {
        self.error = Some(message);
    }

    pub fn payload(&self) -> Result<StudyPayload, FormError> {
        Ok(StudyPayload {
            contact_id: self.contact_id,
            lesson_id: parse_number(&required(&self.lesson_id, "Lesson")?, "Lesson")?,
            date_completed: parse_date(&required(&self.date_completed, "Date Completed")?, "Date Completed")?,
            location: optional(&self.location),
            duration_minutes: optional_number(&self.duration_minutes, "Duration (minutes)")?,
            notes: optional(&self.notes),
        })
    }

    pub async fn save(&self, backend: &Backend) -> Result<Study, SubmitError> {
        let payload = self.payload()?;
        let study = match self.edit_id {
            Some(id) => backend.studies.update_study(id, &payload).await?,
            None => backend.studies.create_study(&payload).await?,
        };
        tracing::info!(study_id = study.id, contact_id = study.contact_id, "Saved study");
        Ok(study)
    }
}

impl EditableForm for StudyForm {
    fn title(&self) -> String {
        match self.edit_id {
            Some(_) => "Edit Study".to_string(),
            None => "Add New Study".to_string(),
        }
    }

    fn fields(&self) -> &'static [Field] {
        FIELDS
    }

    fn value(&self, key: &str) -> String {
        match key {
            "lesson_id" => self.lesson_id.clone(),
            "date_completed" => self.date_completed.clone(),
            "duration_minutes" => self.duration_minutes.clone(),
            "location" => self.location.clone(),
            "notes" => self.notes.clone(),
            _ => String::new(),
        }
    }

    fn set_value(&mut self, key: &str, value: String) {
        match key {
            "lesson_id" => self.lesson_id = value,
            "date_completed" => self.date_completed = value,
            "duration_minutes" => self.duration_minutes = value,
            "location" => self.location = value,
            "notes" => self.notes = value,
            _ => {}
        }
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn choices(&self, key: &str) -> Vec<(String, String)> {
        match key {
            "lesson_id" => self
                .lessons
                .iter()
                .map(|l| (l.id.to_string(), format!("{}. {}", l.sequence_number, l.title)))
                .collect(),
            _ => Vec::new(),
        }
    }
}
