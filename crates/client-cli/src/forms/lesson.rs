use shared::{Lesson, LessonPayload};

use super::{optional, parse_number, required, EditableForm, Field, FieldKind, FormError, SubmitError};
use crate::api::Backend;

const FIELDS: &[Field] = &[
    Field::new("title", "Title", FieldKind::Text).required(),
    Field::new("sequence_number", "Sequence Number", FieldKind::Number).required(),
    Field::new("description", "Description", FieldKind::Multiline),
];

#[derive(Debug, Clone, Default)]
pub struct LessonForm {
    edit_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub sequence_number: String,
    error: Option<String>,
}

impl LessonForm {
    pub fn edit(lesson: &Lesson) -> Self {
        Self {
            edit_id: Some(lesson.id),
            title: lesson.title.clone(),
            description: lesson.description.clone().unwrap_or_default(),
            sequence_number: lesson.sequence_number.to_string(),
            error: None,
        }
    }

    pub fn edit_id(&self) -> Option<i64> {
        self.edit_id
    }

    pub fn set_error(&mut self, message: String) {
        self.error = Some(message);
    }

    pub fn payload(&self) -> Result<LessonPayload, FormError> {
        Ok(LessonPayload {
            title: required(&self.title, "Title")?,
            description: optional(&self.description),
            sequence_number: parse_number(&required(&self.sequence_number, "Sequence Number")?, "Sequence Number")?,
        })
    }

    pub async fn save(&self, backend: &Backend) -> Result<Lesson, SubmitError> {
        let payload = self.payload()?;
        let lesson = match self.edit_id {
            Some(id) => backend.studies.update_lesson(id, &payload).await?,
            None => backend.studies.create_lesson(&payload).await?,
        };
        tracing::info!(lesson_id = lesson.id, "Saved lesson");
        Ok(lesson)
    }
}

impl EditableForm for LessonForm {
    fn title(&self) -> String {
        match self.edit_id {
            Some(_) => "Edit Lesson".to_string(),
            None => "Add New Lesson".to_string(),
        }
    }

    fn fields(&self) -> &'static [Field] {
        FIELDS
    }

    fn value(&self, key: &str) -> String {
        match key {
            "title" => self.title.clone(),
            "description" => self.description.clone(),
            "sequence_number" => self.sequence_number.clone(),
            _ => String::new(),
        }
    }

    fn set_value(&mut self, key: &str, value: String) {
        match key {
            "title" => self.title = value,
            "description" => self.description = value,
            "sequence_number" => self.sequence_number = value,
            _ => {}
        }
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_number_parsed_on_submit() {
        let mut form = LessonForm::default();
        form.set_value("title", "Prayer".to_string());
        form.set_value("sequence_number", " 4 ".to_string());
        assert_eq!(
            form.payload(),
            Ok(LessonPayload {
                title: "Prayer".to_string(),
                description: None,
                sequence_number: 4,
            })
        );

        form.set_value("sequence_number", "4th".to_string());
        assert_eq!(form.payload(), Err(FormError::NotANumber("Sequence Number")));
    }

    #[test]
    fn test_edit_prefills() {
        let lesson = Lesson {
            id: 2,
            title: "The Sabbath".to_string(),
            description: Some("Rest".to_string()),
            sequence_number: 9,
            created_at: None,
            updated_at: None,
        };
        let form = LessonForm::edit(&lesson);
        assert_eq!(form.edit_id(), Some(2));
        assert_eq!(form.value("sequence_number"), "9");
        assert_eq!(form.value("description"), "Rest");
    }
}
