use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_CHAPTERS: u32 = 1;
pub const MAX_CHAPTERS: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Technology,
    Programming,
    Business,
    Marketing,
    Design,
    Health,
    Education,
    Science,
    Arts,
    Language,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Self::Technology,
        Self::Programming,
        Self::Business,
        Self::Marketing,
        Self::Design,
        Self::Health,
        Self::Education,
        Self::Science,
        Self::Arts,
        Self::Language,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Technology => "Technology",
            Self::Programming => "Programming",
            Self::Business => "Business",
            Self::Marketing => "Marketing",
            Self::Design => "Design",
            Self::Health => "Health",
            Self::Education => "Education",
            Self::Science => "Science",
            Self::Arts => "Arts",
            Self::Language => "Language",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Self::Beginner, Self::Intermediate, Self::Advanced];

    pub fn label(self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl CourseStatus {
    pub const ALL: [CourseStatus; 3] = [Self::Draft, Self::Published, Self::Archived];

    pub fn label(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Draft => Self::Published,
            Self::Published => Self::Archived,
            Self::Archived => Self::Draft,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    #[default]
    Active,
    Completed,
    Paused,
}

impl EnrollmentStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Paused => "paused",
        }
    }

    /// Status a learner toggles to from the enrollments screen.
    pub fn toggled(self) -> Self {
        match self {
            Self::Active => Self::Paused,
            Self::Paused | Self::Completed => Self::Active,
        }
    }
}

/// Cycle through a closed list of options, treating `None` as "not chosen yet".
pub fn cycle_option<T: Copy + PartialEq>(options: &[T], current: Option<T>, delta: isize) -> Option<T> {
    if options.is_empty() {
        return None;
    }
    let len = options.len() as isize;
    let next = match current.and_then(|value| options.iter().position(|item| *item == value)) {
        Some(index) => (index as isize + delta).rem_euclid(len),
        None if delta >= 0 => 0,
        None => len - 1,
    };
    options.get(next as usize).copied()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: String,
}

/// Payload returned by login, registration and profile calls.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthenticatedUser {
    #[serde(flatten)]
    pub user: User,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseLayout {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub include_video: bool,
    #[serde(default)]
    pub no_of_chapters: u32,
    #[serde(default)]
    pub banner_image_prompt: String,
    #[serde(default)]
    pub chapters: Vec<LayoutChapter>,
}

impl CourseLayout {
    /// Sum of the chapter durations that carry a known hour count.
    pub fn total_hours(&self) -> u32 {
        self.chapters
            .iter()
            .filter_map(|chapter| chapter.duration.hours)
            .sum()
    }

    pub fn has_unknown_durations(&self) -> bool {
        self.chapters
            .iter()
            .any(|chapter| chapter.duration.hours.is_none())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChapterDuration {
    pub hours: Option<u32>,
    /// Free text as produced by the model. Display only.
    pub label: String,
}

impl ChapterDuration {
    fn from_wire(label: String, structured_hours: Option<u32>) -> Self {
        let hours = structured_hours.or_else(|| leading_hours(&label));
        Self { hours, label }
    }
}

fn leading_hours(label: &str) -> Option<u32> {
    let first = label.split_whitespace().next()?;
    let digits: String = first.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireLayoutChapter", into = "WireLayoutChapter")]
pub struct LayoutChapter {
    pub chapter_name: String,
    pub duration: ChapterDuration,
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireLayoutChapter {
    #[serde(default)]
    chapter_name: String,
    #[serde(default)]
    duration: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration_hours: Option<u32>,
    #[serde(default)]
    topics: Vec<String>,
}

impl From<WireLayoutChapter> for LayoutChapter {
    fn from(wire: WireLayoutChapter) -> Self {
        Self {
            chapter_name: wire.chapter_name,
            duration: ChapterDuration::from_wire(wire.duration, wire.duration_hours),
            topics: wire.topics,
        }
    }
}

impl From<LayoutChapter> for WireLayoutChapter {
    fn from(chapter: LayoutChapter) -> Self {
        Self {
            chapter_name: chapter.chapter_name,
            duration: chapter.duration.label,
            duration_hours: chapter.duration.hours,
            topics: chapter.topics,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedChapter {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub youtube_video: Option<String>,
    #[serde(default)]
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub chapters: u32,
    #[serde(default)]
    pub include_videos: bool,
    pub category: Category,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub status: CourseStatus,
    #[serde(default)]
    pub created_by: Option<ObjectRef>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub generated_chapters: Vec<GeneratedChapter>,
    #[serde(default)]
    pub ai_generated_layout: Option<CourseLayout>,
}

/// A reference the backend sends either as a bare id or as a populated document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectRef {
    Id(String),
    Populated {
        #[serde(rename = "_id")]
        id: String,
        #[serde(default)]
        name: Option<String>,
    },
}

impl ObjectRef {
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Populated { id, .. } => id,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Id(_) => None,
            Self::Populated { name, .. } => name.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicKey {
    pub chapter_order: u32,
    pub topic_index: u32,
}

impl TopicKey {
    pub fn new(chapter_order: u32, topic_index: u32) -> Self {
        Self {
            chapter_order,
            topic_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedTopic {
    pub chapter_order: u32,
    pub topic_index: u32,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl CompletedTopic {
    pub fn key(&self) -> TopicKey {
        TopicKey::new(self.chapter_order, self.topic_index)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    #[serde(default)]
    pub completed_topics: Vec<CompletedTopic>,
    #[serde(default)]
    pub current_chapter: u32,
    #[serde(default)]
    pub current_topic: u32,
    #[serde(default)]
    pub last_accessed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_topics: Option<u32>,
    #[serde(default)]
    pub completion_percentage: Option<u32>,
}

impl Progress {
    /// Drop repeated `(chapterOrder, topicIndex)` entries, keeping the first occurrence.
    pub fn normalized(mut self) -> Self {
        let mut seen = std::collections::HashSet::new();
        self.completed_topics.retain(|topic| seen.insert(topic.key()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    #[serde(rename = "courseId")]
    pub course: ObjectRef,
    #[serde(default)]
    pub status: EnrollmentStatus,
    #[serde(default)]
    pub enrolled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub progress: Progress,
}

impl Enrollment {
    pub fn course_id(&self) -> &str {
        self.course.id()
    }
}

/// Public view of a course, as served by `GET /courses/preview/:id`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoursePreview {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ai_generated_layout: Option<CourseLayout>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: u32,
    pub items_per_page: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoursePage {
    pub courses: Vec<Course>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileUpdate {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseParams {
    pub name: String,
    pub description: String,
    pub chapters: u32,
    pub include_videos: bool,
    pub category: Category,
    pub difficulty: Difficulty,
}

/// Chapter entry sent with `POST /courses` when saving an outline without generated content.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineChapter {
    pub title: String,
    pub description: String,
    pub objectives: Vec<String>,
    pub order: u32,
}

impl OutlineChapter {
    pub fn from_layout(layout: &CourseLayout) -> Vec<Self> {
        layout
            .chapters
            .iter()
            .enumerate()
            .map(|(index, chapter)| Self {
                title: chapter.chapter_name.clone(),
                description: chapter.topics.join(", "),
                objectives: chapter.topics.clone(),
                order: index as u32 + 1,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseRequest {
    #[serde(flatten)]
    pub course: CourseParams,
    pub generated_chapters: Vec<OutlineChapter>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateFullRequest {
    #[serde(flatten)]
    pub course: CourseParams,
    pub ai_generated_layout: CourseLayout,
}

/// Partial update sent with `PUT /courses/:id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_str, json, to_value};

    #[test]
    fn legacy_duration_string_is_read_once_at_the_boundary() {
        let chapter: LayoutChapter = from_str(
            r#"{"chapterName":"Basics","duration":"3 hours","topics":["a","b"]}"#,
        )
        .unwrap();
        assert_eq!(chapter.duration.hours, Some(3));
        assert_eq!(chapter.duration.label, "3 hours");

        let fuzzy: LayoutChapter =
            from_str(r#"{"chapterName":"x","duration":"about two hours"}"#).unwrap();
        assert_eq!(fuzzy.duration.hours, None);

        let fractional: LayoutChapter =
            from_str(r#"{"chapterName":"x","duration":"1.5 hours"}"#).unwrap();
        assert_eq!(fractional.duration.hours, Some(1));
    }

    #[test]
    fn structured_duration_hours_take_precedence() {
        let chapter: LayoutChapter = from_str(
            r#"{"chapterName":"x","duration":"2 hours","durationHours":4,"topics":[]}"#,
        )
        .unwrap();
        assert_eq!(chapter.duration.hours, Some(4));

        let wire = to_value(&chapter).unwrap();
        assert_eq!(wire["duration"], json!("2 hours"));
        assert_eq!(wire["durationHours"], json!(4));
    }

    #[test]
    fn layout_total_hours_skips_unknown_durations() {
        let layout: CourseLayout = from_str(
            r#"{"name":"ML","chapters":[
                {"chapterName":"a","duration":"2 hours"},
                {"chapterName":"b","duration":"3 hours"},
                {"chapterName":"c","duration":"a while"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(layout.total_hours(), 5);
        assert!(layout.has_unknown_durations());
    }

    #[test]
    fn progress_normalization_keeps_one_entry_per_topic() {
        let progress: Progress = from_str(
            r#"{"completedTopics":[
                {"chapterOrder":1,"topicIndex":0,"completedAt":"2024-05-01T10:00:00Z"},
                {"chapterOrder":1,"topicIndex":0,"completedAt":"2024-05-02T10:00:00Z"},
                {"chapterOrder":1,"topicIndex":1}
            ],"currentChapter":1,"currentTopic":1}"#,
        )
        .unwrap();
        let normalized = progress.normalized();
        assert_eq!(normalized.completed_topics.len(), 2);
        assert_eq!(
            normalized.completed_topics[0]
                .completed_at
                .map(|at| at.to_rfc3339()),
            Some("2024-05-01T10:00:00+00:00".to_string())
        );
    }

    #[test]
    fn enrollment_accepts_bare_or_populated_course_reference() {
        let bare: Enrollment =
            from_str(r#"{"courseId":"c1","status":"paused","progress":{}}"#).unwrap();
        assert_eq!(bare.course_id(), "c1");
        assert_eq!(bare.status, EnrollmentStatus::Paused);

        let populated: Enrollment = from_str(
            r#"{"courseId":{"_id":"c2","name":"Rust"},"status":"active"}"#,
        )
        .unwrap();
        assert_eq!(populated.course_id(), "c2");
        assert_eq!(populated.course.name(), Some("Rust"));
    }

    #[test]
    fn full_generation_request_flattens_course_fields() {
        let request = GenerateFullRequest {
            course: CourseParams {
                name: "Intro to ML".into(),
                description: "basics".into(),
                chapters: 3,
                include_videos: true,
                category: Category::Technology,
                difficulty: Difficulty::Beginner,
            },
            ai_generated_layout: CourseLayout {
                name: "Intro to ML".into(),
                description: "basics".into(),
                category: "Technology".into(),
                level: "Beginner".into(),
                include_video: true,
                no_of_chapters: 3,
                banner_image_prompt: String::new(),
                chapters: Vec::new(),
            },
        };
        let value = to_value(&request).unwrap();
        assert_eq!(value["chapters"], json!(3));
        assert_eq!(value["includeVideos"], json!(true));
        assert_eq!(value["category"], json!("Technology"));
        assert_eq!(value["aiGeneratedLayout"]["noOfChapters"], json!(3));
    }

    #[test]
    fn outline_chapters_are_numbered_from_one() {
        let layout: CourseLayout = from_str(
            r#"{"chapters":[
                {"chapterName":"Setup","duration":"1 hour","topics":["Install","Hello"]},
                {"chapterName":"Types","duration":"2 hours","topics":["Scalars"]}
            ]}"#,
        )
        .unwrap();
        let outline = OutlineChapter::from_layout(&layout);
        assert_eq!(outline.len(), 2);
        assert_eq!(outline[0].order, 1);
        assert_eq!(outline[0].description, "Install, Hello");
        assert_eq!(outline[1].title, "Types");
    }

    #[test]
    fn cycle_option_wraps_and_starts_from_either_end() {
        assert_eq!(
            cycle_option(&Difficulty::ALL, None, 1),
            Some(Difficulty::Beginner)
        );
        assert_eq!(
            cycle_option(&Difficulty::ALL, None, -1),
            Some(Difficulty::Advanced)
        );
        assert_eq!(
            cycle_option(&Difficulty::ALL, Some(Difficulty::Advanced), 1),
            Some(Difficulty::Beginner)
        );
    }
}
