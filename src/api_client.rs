use crate::{
    config,
    course_models::{
        AuthenticatedUser, Category, Course, CourseLayout, CoursePage, CourseParams, CoursePreview,
        CourseStatus, CourseUpdate, CreateCourseRequest, Difficulty, Enrollment, EnrollmentStatus,
        GenerateFullRequest, LoginRequest, Pagination, Progress, ProfileUpdate, RegisterRequest,
        TopicKey, User,
    },
    error::ApiError,
    log_util,
    session_manager::Session,
};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};

/// Response envelope shared by every endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiEnvelope<T> {
    pub data: Option<T>,
    pub message: Option<String>,
    pub pagination: Option<Pagination>,
}

/// Query parameters for the paginated course listings. `None` fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CourseQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CourseStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
}

/// The progress endpoint answers with either the whole enrollment or the bare progress object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProgressReply {
    Enrollment(Box<Enrollment>),
    Progress(Progress),
}

impl ProgressReply {
    fn into_progress(self) -> Progress {
        match self {
            Self::Enrollment(enrollment) => enrollment.progress,
            Self::Progress(progress) => progress,
        }
    }
}

/// Thin typed client over the course generator REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    api_base: String,
}

impl ApiClient {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into(),
        }
    }

    /// Construct an [`ApiClient`] pointed at the configured base URL.
    pub fn from_config() -> Self {
        Self::new(config::api_base_url())
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn authed(&self, builder: RequestBuilder, session: &Session) -> RequestBuilder {
        builder.bearer_auth(session.token())
    }

    async fn send<T: DeserializeOwned>(
        &self,
        label: &str,
        builder: RequestBuilder,
        fallback: &str,
    ) -> Result<ApiEnvelope<T>, ApiError> {
        log_util::log_debug(&format!("ApiClient: {}", label));
        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => {
                let err = ApiError::from(err);
                log_util::log_debug(&format!("ApiClient: {} failed: {}", label, err.log_detail()));
                return Err(err);
            }
        };
        let status = response.status();
        let body = response.text().await?;
        log_util::log_debug(&format!("ApiClient: {} -> {}", label, status));
        decode_envelope(status, &body, fallback).inspect_err(|err| {
            log_util::log_debug(&format!("ApiClient: {} error: {}", label, err.log_detail()))
        })
    }

    async fn send_data<T: DeserializeOwned>(
        &self,
        label: &str,
        builder: RequestBuilder,
        fallback: &str,
    ) -> Result<T, ApiError> {
        self.send(label, builder, fallback).await.and_then(require_data)
    }

    pub async fn health(&self) -> Result<String, ApiError> {
        let builder = self.client.get(self.url("/health"));
        let envelope: ApiEnvelope<Value> = self
            .send("GET /health", builder, "Health check failed")
            .await?;
        Ok(envelope.message.unwrap_or_else(|| "ok".to_string()))
    }

    pub async fn login(&self, credentials: &LoginRequest) -> Result<AuthenticatedUser, ApiError> {
        let builder = self.client.post(self.url("/auth/login")).json(credentials);
        self.send_data("POST /auth/login", builder, "Login failed")
            .await
    }

    pub async fn register(
        &self,
        registration: &RegisterRequest,
    ) -> Result<AuthenticatedUser, ApiError> {
        let builder = self
            .client
            .post(self.url("/auth/register"))
            .json(registration);
        self.send_data("POST /auth/register", builder, "Signup failed")
            .await
    }

    pub async fn profile(&self, session: &Session) -> Result<User, ApiError> {
        let builder = self.authed(self.client.get(self.url("/auth/profile")), session);
        let auth: AuthenticatedUser = self
            .send_data("GET /auth/profile", builder, "Failed to get profile")
            .await?;
        Ok(auth.user)
    }

    pub async fn update_profile(
        &self,
        session: &Session,
        update: &ProfileUpdate,
    ) -> Result<User, ApiError> {
        let builder = self.authed(
            self.client.put(self.url("/auth/profile")).json(update),
            session,
        );
        let auth: AuthenticatedUser = self
            .send_data("PUT /auth/profile", builder, "Failed to update profile")
            .await?;
        Ok(auth.user)
    }

    pub async fn create_course(
        &self,
        session: &Session,
        request: &CreateCourseRequest,
    ) -> Result<Course, ApiError> {
        let builder = self.authed(self.client.post(self.url("/courses")).json(request), session);
        self.send_data("POST /courses", builder, "Failed to create course")
            .await
    }

    pub async fn list_courses(
        &self,
        session: &Session,
        query: &CourseQuery,
    ) -> Result<Vec<Course>, ApiError> {
        let builder = self.authed(self.client.get(self.url("/courses")).query(query), session);
        self.send_data("GET /courses", builder, "Failed to fetch courses")
            .await
    }

    pub async fn explore_courses(&self, query: &CourseQuery) -> Result<CoursePage, ApiError> {
        let builder = self.client.get(self.url("/courses/explore")).query(query);
        let envelope: ApiEnvelope<Vec<Course>> = self
            .send("GET /courses/explore", builder, "Failed to fetch courses")
            .await?;
        let pagination = envelope.pagination.unwrap_or_default();
        let courses = require_data(envelope)?;
        Ok(CoursePage {
            courses,
            pagination,
        })
    }

    pub async fn course(&self, session: &Session, course_id: &str) -> Result<Course, ApiError> {
        let builder = self.authed(
            self.client.get(self.url(&format!("/courses/{}", course_id))),
            session,
        );
        self.send_data("GET /courses/:id", builder, "Failed to fetch course")
            .await
    }

    pub async fn course_preview(&self, course_id: &str) -> Result<CoursePreview, ApiError> {
        let builder = self
            .client
            .get(self.url(&format!("/courses/preview/{}", course_id)));
        self.send_data("GET /courses/preview/:id", builder, "Course not found")
            .await
    }

    pub async fn update_course(
        &self,
        session: &Session,
        course_id: &str,
        update: &CourseUpdate,
    ) -> Result<Course, ApiError> {
        let builder = self.authed(
            self.client
                .put(self.url(&format!("/courses/{}", course_id)))
                .json(update),
            session,
        );
        self.send_data("PUT /courses/:id", builder, "Failed to update course")
            .await
    }

    pub async fn update_course_status(
        &self,
        session: &Session,
        course_id: &str,
        status: CourseStatus,
    ) -> Result<Course, ApiError> {
        let builder = self.authed(
            self.client
                .patch(self.url(&format!("/courses/{}/status", course_id)))
                .json(&json!({ "status": status })),
            session,
        );
        self.send_data(
            "PATCH /courses/:id/status",
            builder,
            "Failed to update course status",
        )
        .await
    }

    pub async fn delete_course(&self, session: &Session, course_id: &str) -> Result<(), ApiError> {
        let builder = self.authed(
            self.client
                .delete(self.url(&format!("/courses/{}", course_id))),
            session,
        );
        let _: ApiEnvelope<Value> = self
            .send("DELETE /courses/:id", builder, "Failed to delete course")
            .await?;
        Ok(())
    }

    pub async fn generate_layout(
        &self,
        session: &Session,
        params: &CourseParams,
    ) -> Result<CourseLayout, ApiError> {
        let builder = self.authed(
            self.client.post(self.url("/courses/generate")).json(params),
            session,
        );
        self.send_data(
            "POST /courses/generate",
            builder,
            "Failed to generate course layout",
        )
        .await
    }

    pub async fn generate_full(
        &self,
        session: &Session,
        request: &GenerateFullRequest,
    ) -> Result<Course, ApiError> {
        let builder = self.authed(
            self.client
                .post(self.url("/courses/generate-full"))
                .json(request),
            session,
        );
        self.send_data(
            "POST /courses/generate-full",
            builder,
            "Failed to generate course content",
        )
        .await
    }

    pub async fn enroll(&self, session: &Session, course_id: &str) -> Result<Enrollment, ApiError> {
        let builder = self.authed(
            self.client
                .post(self.url("/enrollments"))
                .json(&json!({ "courseId": course_id })),
            session,
        );
        self.send_data("POST /enrollments", builder, "Failed to enroll in course")
            .await
    }

    pub async fn enrollments(&self, session: &Session) -> Result<Vec<Enrollment>, ApiError> {
        let builder = self.authed(self.client.get(self.url("/enrollments")), session);
        self.send_data("GET /enrollments", builder, "Failed to fetch enrollments")
            .await
    }

    /// Enrollment for one course; `Ok(None)` when the learner is not enrolled.
    pub async fn enrollment(
        &self,
        session: &Session,
        course_id: &str,
    ) -> Result<Option<Enrollment>, ApiError> {
        let builder = self.authed(
            self.client
                .get(self.url(&format!("/enrollments/{}", course_id))),
            session,
        );
        match self
            .send_data::<Enrollment>(
                "GET /enrollments/:courseId",
                builder,
                "Failed to fetch enrollment",
            )
            .await
        {
            Ok(enrollment) => Ok(Some(enrollment)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn update_enrollment_status(
        &self,
        session: &Session,
        course_id: &str,
        status: EnrollmentStatus,
    ) -> Result<Enrollment, ApiError> {
        let builder = self.authed(
            self.client
                .patch(self.url(&format!("/enrollments/{}/status", course_id)))
                .json(&json!({ "status": status })),
            session,
        );
        self.send_data(
            "PATCH /enrollments/:courseId/status",
            builder,
            "Failed to update enrollment",
        )
        .await
    }

    pub async fn unenroll(&self, session: &Session, course_id: &str) -> Result<(), ApiError> {
        let builder = self.authed(
            self.client
                .delete(self.url(&format!("/enrollments/{}", course_id))),
            session,
        );
        let _: ApiEnvelope<Value> = self
            .send(
                "DELETE /enrollments/:courseId",
                builder,
                "Failed to leave course",
            )
            .await?;
        Ok(())
    }

    pub async fn mark_topic_completed(
        &self,
        session: &Session,
        course_id: &str,
        topic: TopicKey,
    ) -> Result<Progress, ApiError> {
        let builder = self.authed(
            self.client
                .post(self.url(&format!("/enrollments/{}/progress", course_id)))
                .json(&topic),
            session,
        );
        let reply: ProgressReply = self
            .send_data(
                "POST /enrollments/:courseId/progress",
                builder,
                "Failed to update progress",
            )
            .await?;
        Ok(reply.into_progress().normalized())
    }
}

fn require_data<T>(envelope: ApiEnvelope<T>) -> Result<T, ApiError> {
    envelope
        .data
        .ok_or_else(|| ApiError::Decode("response did not include data".to_string()))
}

/// Normalise a raw response into the envelope, or the single error message shown to the user.
pub(crate) fn decode_envelope<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
    fallback: &str,
) -> Result<ApiEnvelope<T>, ApiError> {
    let value: Option<Value> = serde_json::from_str(body).ok();

    if !status.is_success() {
        let message = value
            .as_ref()
            .and_then(error_message)
            .unwrap_or_else(|| fallback.to_string());
        return Err(ApiError::from_status(status, message));
    }

    let value = value.ok_or_else(|| ApiError::Decode("response body is not JSON".to_string()))?;
    let success = value.get("success").and_then(Value::as_bool).unwrap_or(true);
    if !success {
        let message = error_message(&value).unwrap_or_else(|| fallback.to_string());
        return Err(ApiError::Api {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_value(value).map_err(|err| ApiError::Decode(err.to_string()))
}

fn error_message(value: &Value) -> Option<String> {
    ["message", "error"]
        .iter()
        .filter_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_envelope_yields_data_and_pagination() {
        let body = r#"{
            "success": true,
            "data": [{"_id":"c1","name":"Rust","description":"d","category":"Programming","difficulty":"Beginner","status":"published"}],
            "pagination": {"currentPage":2,"totalPages":3,"totalItems":30,"itemsPerPage":12}
        }"#;
        let envelope: ApiEnvelope<Vec<Course>> =
            decode_envelope(StatusCode::OK, body, "fallback").unwrap();
        let courses = envelope.data.unwrap();
        assert_eq!(courses[0].id, "c1");
        assert_eq!(courses[0].status, CourseStatus::Published);
        assert_eq!(envelope.pagination.unwrap().total_pages, 3);
    }

    #[test]
    fn api_reported_errors_are_shown_verbatim() {
        let err = decode_envelope::<Value>(
            StatusCode::BAD_REQUEST,
            r#"{"success":false,"message":"Course name already exists"}"#,
            "Failed to create course",
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Course name already exists");

        let err = decode_envelope::<Value>(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error":"Generation quota exceeded"}"#,
            "Failed",
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Generation quota exceeded");
    }

    #[test]
    fn success_false_with_ok_status_is_still_an_error() {
        let err = decode_envelope::<Course>(
            StatusCode::OK,
            r#"{"success":false,"errors":{"name":"required"}}"#,
            "Failed to create course",
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Failed to create course");
    }

    #[test]
    fn unreadable_error_bodies_fall_back_to_call_specific_text() {
        let err = decode_envelope::<Value>(StatusCode::BAD_GATEWAY, "<html>", "Login failed")
            .unwrap_err();
        assert_eq!(
            err,
            ApiError::Api {
                status: 502,
                message: "Login failed".to_string()
            }
        );

        let expired = decode_envelope::<Value>(
            StatusCode::UNAUTHORIZED,
            r#"{"message":"Token expired"}"#,
            "Failed",
        )
        .unwrap_err();
        assert!(expired.is_auth_failure());
    }

    #[test]
    fn progress_reply_accepts_enrollment_or_bare_progress() {
        let from_enrollment: ProgressReply = serde_json::from_str(
            r#"{"courseId":"c1","progress":{"completedTopics":[{"chapterOrder":1,"topicIndex":0}],"completionPercentage":25}}"#,
        )
        .unwrap();
        assert_eq!(from_enrollment.into_progress().completion_percentage, Some(25));

        let bare: ProgressReply =
            serde_json::from_str(r#"{"completedTopics":[],"totalTopics":8}"#).unwrap();
        assert_eq!(bare.into_progress().total_topics, Some(8));
    }

    #[test]
    fn course_query_omits_unset_filters() {
        let query = CourseQuery {
            page: Some(1),
            limit: Some(12),
            search: None,
            status: None,
            category: Some(Category::Design),
            difficulty: Some(Difficulty::Advanced),
        };
        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(
            value,
            json!({"page":1,"limit":12,"category":"Design","difficulty":"Advanced"})
        );
    }
}
