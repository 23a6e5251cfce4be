use shared::{
    ContactStudiesResponse, Lesson, LessonPayload, LessonProgressResponse, LessonsResponse, Study, StudyPayload,
    StudyStats,
};

use super::{ApiError, ServiceClient};

/// Lessons and study records.
pub struct StudiesApi {
    client: ServiceClient,
}

impl StudiesApi {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }

    pub async fn list_lessons(&self) -> Result<LessonsResponse, ApiError> {
        self.client.get("/lessons").await
    }

    pub async fn get_lesson(&self, id: i64) -> Result<Lesson, ApiError> {
        self.client.get(&format!("/lessons/{}", id)).await
    }

    pub async fn create_lesson(&self, payload: &LessonPayload) -> Result<Lesson, ApiError> {
        self.client.post("/lessons", payload).await
    }

    pub async fn update_lesson(&self, id: i64, payload: &LessonPayload) -> Result<Lesson, ApiError> {
        self.client.put(&format!("/lessons/{}", id), payload).await
    }

    pub async fn delete_lesson(&self, id: i64) -> Result<(), ApiError> {
        self.client.delete(&format!("/lessons/{}", id)).await
    }

    pub async fn studies_for_contact(&self, contact_id: i64) -> Result<ContactStudiesResponse, ApiError> {
        self.client.get(&format!("/contacts/{}/studies", contact_id)).await
    }

    pub async fn study_stats(&self, contact_id: i64) -> Result<StudyStats, ApiError> {
        self.client.get(&format!("/contacts/{}/study-stats", contact_id)).await
    }

    /// Every lesson, flagged with whether the contact has completed it.
    pub async fn lesson_progress(&self, contact_id: i64) -> Result<LessonProgressResponse, ApiError> {
        self.client
            .get(&format!("/contacts/{}/completed-lessons", contact_id))
            .await
    }

    pub async fn get_study(&self, id: i64) -> Result<Study, ApiError> {
        self.client.get(&format!("/studies/{}", id)).await
    }

    pub async fn create_study(&self, payload: &StudyPayload) -> Result<Study, ApiError> {
        self.client.post("/studies", payload).await
    }

    pub async fn update_study(&self, id: i64, payload: &StudyPayload) -> Result<Study, ApiError> {
        self.client.put(&format!("/studies/{}", id), payload).await
    }

    pub async fn delete_study(&self, id: i64) -> Result<(), ApiError> {
        self.client.delete(&format!("/studies/{}", id)).await
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{lesson_json, study_json, TestEnv};
    use chrono::NaiveDate;
    use serde_json::json;
    use shared::StudyPayload;

    #[tokio::test]
    async fn test_lesson_progress_flattens_lessons() {
        let env = TestEnv::signed_in().await;
        let mut first = lesson_json(1, "The Bible", 1);
        first["completed"] = json!(true);
        let mut second = lesson_json(2, "Prayer", 2);
        second["completed"] = json!(false);
        env.stub.respond(
            "GET",
            "/contacts/5/completed-lessons",
            200,
            json!({"contact_id": 5, "lessons": [first, second]}),
        );

        let progress = env.backend.studies.lesson_progress(5).await.unwrap();
        assert_eq!(progress.lessons.len(), 2);
        assert_eq!(progress.lessons[0].lesson.title, "The Bible");
        assert!(progress.lessons[0].completed);
        assert!(!progress.lessons[1].completed);
    }

    #[tokio::test]
    async fn test_null_study_list_reads_as_empty() {
        let env = TestEnv::signed_in().await;
        env.stub.respond("GET", "/contacts/5/studies", 200, json!({"contact_id": 5, "studies": null}));

        let response = env.backend.studies.studies_for_contact(5).await.unwrap();
        assert!(response.studies.is_empty());
    }

    #[tokio::test]
    async fn test_create_study_sends_plain_date() {
        let env = TestEnv::signed_in().await;
        env.stub.respond("POST", "/studies", 201, study_json(3, 5, 1));

        let payload = StudyPayload {
            contact_id: 5,
            lesson_id: 1,
            date_completed: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            location: Some("Home".to_string()),
            duration_minutes: Some(45),
            notes: None,
        };
        let study = env.backend.studies.create_study(&payload).await.unwrap();
        assert_eq!(study.id, 3);

        let body = env.stub.last("POST", "/studies").unwrap().json();
        assert_eq!(body["date_completed"], "2024-03-10");
        assert_eq!(body["duration_minutes"], 45);
    }
}
