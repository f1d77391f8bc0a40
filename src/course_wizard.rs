use crate::{
    course_models::{
        Category, Course, CourseLayout, CourseParams, CreateCourseRequest, Difficulty,
        GenerateFullRequest, MAX_CHAPTERS, MIN_CHAPTERS, OutlineChapter, cycle_option,
    },
    error::ApiError,
    log_util::log_debug,
    perceived_progress::PerceivedProgress,
    session_manager::Session,
};
use rand::Rng;

const DEFAULT_CHAPTERS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Input,
    Generating,
    Preview,
    Creating,
}

impl WizardStep {
    pub fn label(self) -> &'static str {
        match self {
            Self::Input => "Describe your course",
            Self::Generating => "Generating layout",
            Self::Preview => "Review layout",
            Self::Creating => "Creating course",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    Name,
    Description,
    ChapterCount,
    IncludeVideos,
    Category,
    Difficulty,
}

impl DraftField {
    pub const ALL: [DraftField; 6] = [
        Self::Name,
        Self::Description,
        Self::ChapterCount,
        Self::IncludeVideos,
        Self::Category,
        Self::Difficulty,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Name => "Course name",
            Self::Description => "Description",
            Self::ChapterCount => "Chapters",
            Self::IncludeVideos => "Include videos",
            Self::Category => "Category",
            Self::Difficulty => "Difficulty",
        }
    }

    pub fn is_text(self) -> bool {
        matches!(self, Self::Name | Self::Description)
    }
}

/// How the confirmed layout is turned into a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateMode {
    /// `POST /courses/generate-full`: the server writes every chapter.
    FullContent,
    /// `POST /courses`: save the outline only.
    OutlineOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseDraft {
    pub name: String,
    pub description: String,
    pub chapter_count: u32,
    pub include_videos: bool,
    pub category: Option<Category>,
    pub difficulty: Option<Difficulty>,
    pub ai_generated_layout: Option<CourseLayout>,
}

impl Default for CourseDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            chapter_count: DEFAULT_CHAPTERS,
            include_videos: true,
            category: None,
            difficulty: None,
            ai_generated_layout: None,
        }
    }
}

impl CourseDraft {
    /// Validate the form and build the request body shared by both generation calls.
    pub fn params(&self) -> Result<CourseParams, WizardError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(WizardError::MissingName);
        }
        let description = self.description.trim();
        if description.is_empty() {
            return Err(WizardError::MissingDescription);
        }
        if !(MIN_CHAPTERS..=MAX_CHAPTERS).contains(&self.chapter_count) {
            return Err(WizardError::ChapterCount(self.chapter_count));
        }
        let category = self.category.ok_or(WizardError::MissingCategory)?;
        let difficulty = self.difficulty.ok_or(WizardError::MissingDifficulty)?;
        Ok(CourseParams {
            name: name.to_string(),
            description: description.to_string(),
            chapters: self.chapter_count,
            include_videos: self.include_videos,
            category,
            difficulty,
        })
    }

    fn text_mut(&mut self, field: DraftField) -> Option<&mut String> {
        match field {
            DraftField::Name => Some(&mut self.name),
            DraftField::Description => Some(&mut self.description),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error("Course name is required")]
    MissingName,
    #[error("Course description is required")]
    MissingDescription,
    #[error("Please select a category")]
    MissingCategory,
    #[error("Please select a difficulty level")]
    MissingDifficulty,
    #[error("Chapters must be between 1 and 7 (got {0})")]
    ChapterCount(u32),
    #[error("Generate a course layout first")]
    MissingLayout,
    #[error("Please log in to create a course")]
    NotSignedIn,
    #[error("Not available while {}", .0.label().to_lowercase())]
    WrongStep(WizardStep),
}

/// What the caller should react to after feeding a result into the wizard.
#[derive(Debug, Clone, PartialEq)]
pub enum WizardEvent {
    LayoutReady,
    LayoutFailed(String),
    Created(Box<Course>),
    CreateFailed(String),
    /// The result belongs to a step the wizard has already left.
    Ignored,
}

/// Creation wizard: Input → Generating → Preview → Creating, then reset.
#[derive(Debug, Clone)]
pub struct CourseWizard {
    draft: CourseDraft,
    step: WizardStep,
    field: DraftField,
    create_mode: CreateMode,
    error: Option<String>,
    progress: PerceivedProgress,
}

impl Default for CourseWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl CourseWizard {
    pub fn new() -> Self {
        Self {
            draft: CourseDraft::default(),
            step: WizardStep::Input,
            field: DraftField::Name,
            create_mode: CreateMode::FullContent,
            error: None,
            progress: PerceivedProgress::default(),
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn draft(&self) -> &CourseDraft {
        &self.draft
    }

    pub fn layout(&self) -> Option<&CourseLayout> {
        self.draft.ai_generated_layout.as_ref()
    }

    pub fn selected_field(&self) -> DraftField {
        self.field
    }

    pub fn create_mode(&self) -> CreateMode {
        self.create_mode
    }

    pub fn last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress.percent()
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.step, WizardStep::Generating | WizardStep::Creating)
    }

    pub fn select_next(&mut self) {
        self.move_field(1);
    }

    pub fn select_previous(&mut self) {
        self.move_field(-1);
    }

    fn move_field(&mut self, delta: isize) {
        if let Some(field) = cycle_option(&DraftField::ALL, Some(self.field), delta) {
            self.field = field;
        }
    }

    pub fn set_text(&mut self, field: DraftField, value: &str) -> bool {
        if !self.editable() {
            return false;
        }
        match self.draft.text_mut(field) {
            Some(text) => {
                *text = value.to_string();
                true
            }
            None => false,
        }
    }

    pub fn push_char(&mut self, ch: char) -> bool {
        if !self.editable() {
            return false;
        }
        match self.draft.text_mut(self.field) {
            Some(text) => {
                text.push(ch);
                true
            }
            None => false,
        }
    }

    pub fn pop_char(&mut self) -> bool {
        if !self.editable() {
            return false;
        }
        self.draft
            .text_mut(self.field)
            .and_then(|text| text.pop())
            .is_some()
    }

    /// Store a chapter count as typed. Out-of-range values are kept and rejected on submit.
    pub fn set_chapter_count(&mut self, count: u32) -> bool {
        if !self.editable() {
            return false;
        }
        self.draft.chapter_count = count;
        true
    }

    pub fn adjust_chapter_count(&mut self, delta: i32) -> bool {
        if !self.editable() {
            return false;
        }
        let next = self.draft.chapter_count as i64 + delta as i64;
        self.draft.chapter_count = next.clamp(MIN_CHAPTERS as i64, MAX_CHAPTERS as i64) as u32;
        true
    }

    pub fn toggle_include_videos(&mut self) -> bool {
        if !self.editable() {
            return false;
        }
        self.draft.include_videos = !self.draft.include_videos;
        true
    }

    pub fn cycle_category(&mut self, delta: isize) -> bool {
        if !self.editable() {
            return false;
        }
        self.draft.category = cycle_option(&Category::ALL, self.draft.category, delta);
        true
    }

    pub fn cycle_difficulty(&mut self, delta: isize) -> bool {
        if !self.editable() {
            return false;
        }
        self.draft.difficulty = cycle_option(&Difficulty::ALL, self.draft.difficulty, delta);
        true
    }

    /// Left/right on the selected non-text field.
    pub fn adjust_selected(&mut self, delta: isize) -> bool {
        match self.field {
            DraftField::ChapterCount => self.adjust_chapter_count(delta.signum() as i32),
            DraftField::IncludeVideos => self.toggle_include_videos(),
            DraftField::Category => self.cycle_category(delta),
            DraftField::Difficulty => self.cycle_difficulty(delta),
            DraftField::Name | DraftField::Description => false,
        }
    }

    fn editable(&self) -> bool {
        self.step == WizardStep::Input
    }

    /// Validate the draft and move to Generating. The returned params are the layout request body.
    pub fn submit_for_layout(&mut self) -> Result<CourseParams, WizardError> {
        if self.step != WizardStep::Input {
            return Err(WizardError::WrongStep(self.step));
        }
        match self.draft.params() {
            Ok(params) => {
                self.error = None;
                self.draft.ai_generated_layout = None;
                self.step = WizardStep::Generating;
                log_debug(&format!(
                    "CourseWizard: requesting layout for '{}' ({} chapters)",
                    params.name, params.chapters
                ));
                Ok(params)
            }
            Err(err) => {
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub fn on_layout_result(&mut self, result: Result<CourseLayout, ApiError>) -> WizardEvent {
        if self.step != WizardStep::Generating {
            log_debug("CourseWizard: dropping layout result outside Generating");
            return WizardEvent::Ignored;
        }
        match result {
            Ok(layout) => {
                log_debug(&format!(
                    "CourseWizard: layout ready with {} chapters",
                    layout.chapters.len()
                ));
                self.draft.ai_generated_layout = Some(layout);
                self.error = None;
                self.step = WizardStep::Preview;
                WizardEvent::LayoutReady
            }
            Err(err) => {
                log_debug(&format!("CourseWizard: layout failed: {}", err.log_detail()));
                self.draft.ai_generated_layout = None;
                let message = err.to_string();
                self.error = Some(message.clone());
                self.step = WizardStep::Input;
                WizardEvent::LayoutFailed(message)
            }
        }
    }

    /// Preview → Input with the layout kept; nothing is re-submitted.
    pub fn back_to_input(&mut self) -> bool {
        if self.step != WizardStep::Preview {
            return false;
        }
        self.step = WizardStep::Input;
        true
    }

    /// Preview → Creating for full content generation.
    pub fn confirm_create(
        &mut self,
        session: Option<&Session>,
    ) -> Result<GenerateFullRequest, WizardError> {
        let (course, layout) = self.prepare_create(session, CreateMode::FullContent)?;
        Ok(GenerateFullRequest {
            course,
            ai_generated_layout: layout,
        })
    }

    /// Preview → Creating, saving the outline without generated chapter content.
    pub fn confirm_save_outline(
        &mut self,
        session: Option<&Session>,
    ) -> Result<CreateCourseRequest, WizardError> {
        let (course, layout) = self.prepare_create(session, CreateMode::OutlineOnly)?;
        Ok(CreateCourseRequest {
            course,
            generated_chapters: OutlineChapter::from_layout(&layout),
        })
    }

    fn prepare_create(
        &mut self,
        session: Option<&Session>,
        mode: CreateMode,
    ) -> Result<(CourseParams, CourseLayout), WizardError> {
        let checked = self.check_create(session);
        match checked {
            Ok((params, layout)) => {
                self.error = None;
                self.create_mode = mode;
                self.step = WizardStep::Creating;
                self.progress.start();
                log_debug(&format!("CourseWizard: creating '{}' ({:?})", params.name, mode));
                Ok((params, layout))
            }
            Err(err) => {
                if !matches!(err, WizardError::WrongStep(_)) {
                    self.error = Some(err.to_string());
                }
                Err(err)
            }
        }
    }

    fn check_create(
        &self,
        session: Option<&Session>,
    ) -> Result<(CourseParams, CourseLayout), WizardError> {
        if self.step != WizardStep::Preview {
            return Err(WizardError::WrongStep(self.step));
        }
        let layout = self
            .draft
            .ai_generated_layout
            .clone()
            .ok_or(WizardError::MissingLayout)?;
        if session.is_none() {
            return Err(WizardError::NotSignedIn);
        }
        Ok((self.draft.params()?, layout))
    }

    pub fn on_create_result(&mut self, result: Result<Course, ApiError>) -> WizardEvent {
        if self.step != WizardStep::Creating {
            log_debug("CourseWizard: dropping create result outside Creating");
            return WizardEvent::Ignored;
        }
        match result {
            Ok(course) => {
                log_debug(&format!("CourseWizard: created course {}", course.id));
                self.progress.complete();
                self.close();
                WizardEvent::Created(Box::new(course))
            }
            Err(err) => {
                log_debug(&format!("CourseWizard: create failed: {}", err.log_detail()));
                self.progress.reset();
                let message = err.to_string();
                self.error = Some(message.clone());
                self.step = WizardStep::Preview;
                WizardEvent::CreateFailed(message)
            }
        }
    }

    /// Advance the cosmetic progress bar. Only moves while Creating.
    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.step == WizardStep::Creating {
            self.progress.tick(rng);
        }
    }

    /// Discard the draft and return to an empty Input step.
    pub fn close(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course_models::{ChapterDuration, LayoutChapter};
    use rand::{SeedableRng, rngs::StdRng};
    use serde_json::from_str;

    fn filled_wizard(chapters: u32) -> CourseWizard {
        let mut wizard = CourseWizard::new();
        wizard.set_text(DraftField::Name, "Intro to ML");
        wizard.set_text(DraftField::Description, "basics");
        wizard.set_chapter_count(chapters);
        wizard.cycle_category(1);
        wizard.cycle_difficulty(1);
        wizard
    }

    fn layout(chapters: usize) -> CourseLayout {
        CourseLayout {
            name: "Intro to ML".into(),
            description: "basics".into(),
            category: "Technology".into(),
            level: "Beginner".into(),
            include_video: true,
            no_of_chapters: chapters as u32,
            banner_image_prompt: String::new(),
            chapters: (0..chapters)
                .map(|index| LayoutChapter {
                    chapter_name: format!("Chapter {}", index + 1),
                    duration: ChapterDuration {
                        hours: Some(2),
                        label: "2 hours".into(),
                    },
                    topics: vec!["one".into(), "two".into()],
                })
                .collect(),
        }
    }

    fn course() -> Course {
        from_str(
            r#"{"_id":"c1","name":"Intro to ML","category":"Technology","difficulty":"Beginner"}"#,
        )
        .unwrap()
    }

    #[test]
    fn chapter_count_outside_range_is_rejected_without_a_request() {
        let mut wizard = filled_wizard(9);
        let err = wizard.submit_for_layout().unwrap_err();
        assert_eq!(err, WizardError::ChapterCount(9));
        assert_eq!(wizard.step(), WizardStep::Input);
        assert!(wizard.last_error().unwrap().contains("between 1 and 7"));

        let mut wizard = filled_wizard(0);
        assert!(wizard.submit_for_layout().is_err());
        assert_eq!(wizard.step(), WizardStep::Input);
    }

    #[test]
    fn missing_fields_are_reported_in_form_order() {
        let mut wizard = CourseWizard::new();
        assert_eq!(wizard.submit_for_layout(), Err(WizardError::MissingName));
        wizard.set_text(DraftField::Name, "Rust");
        assert_eq!(wizard.submit_for_layout(), Err(WizardError::MissingDescription));
        wizard.set_text(DraftField::Description, "ownership");
        assert_eq!(wizard.submit_for_layout(), Err(WizardError::MissingCategory));
        wizard.cycle_category(1);
        assert_eq!(wizard.submit_for_layout(), Err(WizardError::MissingDifficulty));
    }

    #[test]
    fn three_chapter_layout_reaches_preview_and_creation() {
        let mut wizard = filled_wizard(3);
        let params = wizard.submit_for_layout().unwrap();
        assert_eq!(params.chapters, 3);
        assert_eq!(params.category, Category::Technology);
        assert_eq!(params.difficulty, Difficulty::Beginner);
        assert_eq!(wizard.step(), WizardStep::Generating);
        assert!(!wizard.push_char('x'));

        assert_eq!(wizard.on_layout_result(Ok(layout(3))), WizardEvent::LayoutReady);
        assert_eq!(wizard.step(), WizardStep::Preview);
        assert_eq!(wizard.layout().unwrap().chapters.len(), 3);
        assert_eq!(wizard.layout().unwrap().total_hours(), 6);

        let session = Session::new("jwt", None);
        let request = wizard.confirm_create(Some(&session)).unwrap();
        assert_eq!(request.ai_generated_layout.chapters.len(), 3);
        assert_eq!(wizard.step(), WizardStep::Creating);

        let mut rng = StdRng::seed_from_u64(3);
        wizard.tick(&mut rng);
        assert!(wizard.progress_percent() > 0);

        match wizard.on_create_result(Ok(course())) {
            WizardEvent::Created(created) => assert_eq!(created.id, "c1"),
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(wizard.step(), WizardStep::Input);
        assert_eq!(wizard.draft(), &CourseDraft::default());
        assert_eq!(wizard.progress_percent(), 0);
    }

    #[test]
    fn failed_layout_returns_to_input_without_a_layout() {
        let mut wizard = filled_wizard(3);
        wizard.submit_for_layout().unwrap();
        let event = wizard.on_layout_result(Err(ApiError::Api {
            status: 500,
            message: "Model unavailable".into(),
        }));
        assert_eq!(event, WizardEvent::LayoutFailed("Model unavailable".into()));
        assert_eq!(wizard.step(), WizardStep::Input);
        assert!(wizard.layout().is_none());
        assert_eq!(wizard.draft().name, "Intro to ML");
    }

    #[test]
    fn failed_creation_keeps_the_draft_for_retry() {
        let mut wizard = filled_wizard(3);
        wizard.submit_for_layout().unwrap();
        wizard.on_layout_result(Ok(layout(3)));
        let session = Session::new("jwt", None);
        wizard.confirm_create(Some(&session)).unwrap();

        let event = wizard.on_create_result(Err(ApiError::Network("reset".into())));
        assert_eq!(event, WizardEvent::CreateFailed("Network error".into()));
        assert_eq!(wizard.step(), WizardStep::Preview);
        assert!(wizard.layout().is_some());
        assert_eq!(wizard.draft().chapter_count, 3);
        assert!(wizard.confirm_create(Some(&session)).is_ok());
    }

    #[test]
    fn creation_requires_session_and_preview_step() {
        let mut wizard = filled_wizard(3);
        assert_eq!(
            wizard.confirm_create(None),
            Err(WizardError::WrongStep(WizardStep::Input))
        );

        wizard.submit_for_layout().unwrap();
        wizard.on_layout_result(Ok(layout(2)));
        assert_eq!(wizard.confirm_create(None), Err(WizardError::NotSignedIn));
        assert_eq!(wizard.step(), WizardStep::Preview);
        assert_eq!(wizard.last_error(), Some("Please log in to create a course"));
    }

    #[test]
    fn back_to_input_keeps_layout_and_allows_edits() {
        let mut wizard = filled_wizard(2);
        wizard.submit_for_layout().unwrap();
        wizard.on_layout_result(Ok(layout(2)));
        assert!(wizard.back_to_input());
        assert_eq!(wizard.step(), WizardStep::Input);
        assert!(wizard.layout().is_some());
        assert!(wizard.adjust_chapter_count(10));
        assert_eq!(wizard.draft().chapter_count, MAX_CHAPTERS);
    }

    #[test]
    fn outline_save_numbers_chapters_and_uses_outline_mode() {
        let mut wizard = filled_wizard(2);
        wizard.submit_for_layout().unwrap();
        wizard.on_layout_result(Ok(layout(2)));
        let session = Session::new("jwt", None);
        let request = wizard.confirm_save_outline(Some(&session)).unwrap();
        assert_eq!(wizard.create_mode(), CreateMode::OutlineOnly);
        assert_eq!(request.generated_chapters.len(), 2);
        assert_eq!(request.generated_chapters[1].order, 2);
    }

    #[test]
    fn late_results_are_ignored() {
        let mut wizard = filled_wizard(3);
        assert_eq!(wizard.on_layout_result(Ok(layout(3))), WizardEvent::Ignored);
        assert_eq!(wizard.on_create_result(Ok(course())), WizardEvent::Ignored);
        assert_eq!(wizard.step(), WizardStep::Input);

        wizard.submit_for_layout().unwrap();
        wizard.close();
        assert_eq!(wizard.on_layout_result(Ok(layout(3))), WizardEvent::Ignored);
        assert!(wizard.layout().is_none());
    }
}
