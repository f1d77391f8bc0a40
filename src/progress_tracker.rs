use crate::{
    course_models::{Course, Enrollment, GeneratedChapter, Progress, TopicKey},
    error::ApiError,
    log_util::log_debug,
    session_manager::Session,
};
use std::collections::{BTreeMap, HashSet};

/// Topics assumed per chapter when the server has not reported a completion percentage.
const ESTIMATED_TOPICS_PER_CHAPTER: u32 = 8;

/// Generated chapter records that share an `order`, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterGroup {
    pub order: u32,
    pub title: String,
    pub topics: Vec<GeneratedChapter>,
}

/// Group records by `order` ascending. The group title comes from its first record.
pub fn group_chapters(chapters: &[GeneratedChapter]) -> Vec<ChapterGroup> {
    let mut grouped: BTreeMap<u32, ChapterGroup> = BTreeMap::new();
    for chapter in chapters {
        grouped
            .entry(chapter.order)
            .or_insert_with(|| ChapterGroup {
                order: chapter.order,
                title: chapter.title.clone(),
                topics: Vec::new(),
            })
            .topics
            .push(chapter.clone());
    }
    grouped.into_values().collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TopicCursor {
    pub chapter: usize,
    pub topic: usize,
}

/// Body for `POST /enrollments/:courseId/progress`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub course_id: String,
    pub topic: TopicKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavOutcome {
    /// Cursor moved locally; nothing to send.
    Moved,
    /// Send this completion; the move waits for the server's answer.
    Complete(CompletionRequest),
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackerError {
    #[error("Please log in to enroll")]
    NotSignedIn,
    #[error("Enroll in this course to track progress")]
    NotEnrolled,
    #[error("Already enrolled in this course")]
    AlreadyEnrolled,
    #[error("Still saving your progress")]
    CompletionPending,
    #[error("Enrollment already in progress")]
    EnrollPending,
    #[error("This course has no topics yet")]
    NoTopics,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    ProgressSaved,
    CompletionFailed(String),
    /// Enrollment created; the caller should fetch it again for the full record.
    Enrolled,
    EnrollFailed(String),
    EnrollmentLoaded,
    EnrollmentLoadFailed(String),
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub percent: u32,
    pub estimated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingCompletion {
    topic: TopicKey,
    then: Option<TopicCursor>,
}

/// Reading state for one opened course: grouped chapters, the topic cursor and the learner's
/// server-confirmed progress.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    course: Course,
    groups: Vec<ChapterGroup>,
    cursor: TopicCursor,
    enrollment: Option<Enrollment>,
    completed: HashSet<TopicKey>,
    pending: Option<PendingCompletion>,
    enrolling: bool,
    error: Option<String>,
}

impl ProgressTracker {
    /// Fresh view of `course`. The cursor always starts at the first topic.
    pub fn open(course: Course) -> Self {
        let groups = group_chapters(&course.generated_chapters);
        log_debug(&format!(
            "ProgressTracker: opened {} with {} chapters",
            course.id,
            groups.len()
        ));
        Self {
            course,
            groups,
            cursor: TopicCursor::default(),
            enrollment: None,
            completed: HashSet::new(),
            pending: None,
            enrolling: false,
            error: None,
        }
    }

    pub fn course(&self) -> &Course {
        &self.course
    }

    pub fn groups(&self) -> &[ChapterGroup] {
        &self.groups
    }

    pub fn cursor(&self) -> TopicCursor {
        self.cursor
    }

    pub fn current_group(&self) -> Option<&ChapterGroup> {
        self.groups.get(self.cursor.chapter)
    }

    pub fn current_topic(&self) -> Option<&GeneratedChapter> {
        self.current_group()?.topics.get(self.cursor.topic)
    }

    pub fn current_key(&self) -> Option<TopicKey> {
        self.key_at(self.cursor)
    }

    fn key_at(&self, cursor: TopicCursor) -> Option<TopicKey> {
        let group = self.groups.get(cursor.chapter)?;
        (cursor.topic < group.topics.len()).then(|| TopicKey::new(group.order, cursor.topic as u32))
    }

    pub fn enrollment(&self) -> Option<&Enrollment> {
        self.enrollment.as_ref()
    }

    pub fn is_enrolled(&self) -> bool {
        self.enrollment.is_some()
    }

    pub fn is_completion_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_enrolling(&self) -> bool {
        self.enrolling
    }

    pub fn last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_completed(&self, key: TopicKey) -> bool {
        self.completed.contains(&key)
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Server percentage when reported, otherwise an estimate from the completed topic count.
    pub fn completion(&self) -> Completion {
        let progress = self.enrollment.as_ref().map(|enrollment| &enrollment.progress);
        if let Some(percent) = progress.and_then(|progress| progress.completion_percentage) {
            return Completion {
                percent: percent.min(100),
                estimated: false,
            };
        }
        let expected = self.groups.len() as u32 * ESTIMATED_TOPICS_PER_CHAPTER;
        let percent = if expected == 0 {
            0
        } else {
            let ratio = self.completed.len() as f64 / expected as f64;
            ((ratio * 100.0).round() as u32).min(100)
        };
        Completion {
            percent,
            estimated: true,
        }
    }

    pub fn select_chapter(&mut self, index: usize) -> NavOutcome {
        if self.pending.is_some() || index >= self.groups.len() {
            return NavOutcome::Ignored;
        }
        self.cursor = TopicCursor {
            chapter: index,
            topic: 0,
        };
        NavOutcome::Moved
    }

    /// Jump to a topic. When enrolled, the topic being left is completed first.
    pub fn select_topic(&mut self, order: u32, index: usize) -> NavOutcome {
        let Some(chapter) = self.groups.iter().position(|group| group.order == order) else {
            return NavOutcome::Ignored;
        };
        if index >= self.groups[chapter].topics.len() {
            return NavOutcome::Ignored;
        }
        let target = TopicCursor {
            chapter,
            topic: index,
        };
        if target == self.cursor {
            return NavOutcome::Ignored;
        }
        self.move_to(target)
    }

    /// Next topic, then the first topic of the next chapter. No-op at the end of the course.
    pub fn advance(&mut self) -> NavOutcome {
        match self.next_cursor() {
            Some(target) => self.move_to(target),
            None => NavOutcome::Ignored,
        }
    }

    /// Previous topic, then the last topic of the previous chapter. Never records completion.
    pub fn retreat(&mut self) -> NavOutcome {
        if self.pending.is_some() {
            return NavOutcome::Ignored;
        }
        match self.previous_cursor() {
            Some(target) => {
                self.cursor = target;
                NavOutcome::Moved
            }
            None => NavOutcome::Ignored,
        }
    }

    /// Mark the current topic without moving.
    pub fn complete_current(&mut self) -> Result<CompletionRequest, TrackerError> {
        if self.pending.is_some() {
            return Err(TrackerError::CompletionPending);
        }
        if !self.is_enrolled() {
            return Err(TrackerError::NotEnrolled);
        }
        let topic = self.current_key().ok_or(TrackerError::NoTopics)?;
        Ok(self.request_completion(topic, None))
    }

    fn move_to(&mut self, target: TopicCursor) -> NavOutcome {
        if self.pending.is_some() {
            return NavOutcome::Ignored;
        }
        match (self.is_enrolled(), self.current_key()) {
            (true, Some(leaving)) => NavOutcome::Complete(self.request_completion(leaving, Some(target))),
            _ => {
                self.cursor = target;
                NavOutcome::Moved
            }
        }
    }

    fn request_completion(&mut self, topic: TopicKey, then: Option<TopicCursor>) -> CompletionRequest {
        log_debug(&format!(
            "ProgressTracker: completing chapter {} topic {}",
            topic.chapter_order, topic.topic_index
        ));
        self.pending = Some(PendingCompletion { topic, then });
        CompletionRequest {
            course_id: self.course.id.clone(),
            topic,
        }
    }

    fn next_cursor(&self) -> Option<TopicCursor> {
        let group = self.groups.get(self.cursor.chapter)?;
        if self.cursor.topic + 1 < group.topics.len() {
            return Some(TopicCursor {
                chapter: self.cursor.chapter,
                topic: self.cursor.topic + 1,
            });
        }
        let next_chapter = self.cursor.chapter + 1;
        (next_chapter < self.groups.len()).then_some(TopicCursor {
            chapter: next_chapter,
            topic: 0,
        })
    }

    fn previous_cursor(&self) -> Option<TopicCursor> {
        if self.cursor.topic > 0 {
            return Some(TopicCursor {
                chapter: self.cursor.chapter,
                topic: self.cursor.topic - 1,
            });
        }
        let chapter = self.cursor.chapter.checked_sub(1)?;
        let last = self.groups.get(chapter)?.topics.len().checked_sub(1)?;
        Some(TopicCursor {
            chapter,
            topic: last,
        })
    }

    /// Apply the server's answer to the outstanding completion.
    pub fn on_completion_result(&mut self, result: Result<Progress, ApiError>) -> TrackerEvent {
        let Some(pending) = self.pending.take() else {
            return TrackerEvent::Ignored;
        };
        match result {
            Ok(progress) => {
                self.replace_progress(progress);
                if let Some(target) = pending.then {
                    self.cursor = target;
                }
                self.error = None;
                TrackerEvent::ProgressSaved
            }
            Err(err) => {
                log_debug(&format!(
                    "ProgressTracker: completion of {:?} failed: {}",
                    pending.topic,
                    err.log_detail()
                ));
                let message = err.to_string();
                self.error = Some(message.clone());
                TrackerEvent::CompletionFailed(message)
            }
        }
    }

    fn replace_progress(&mut self, progress: Progress) {
        let progress = progress.normalized();
        self.completed = progress.completed_topics.iter().map(|topic| topic.key()).collect();
        if let Some(enrollment) = self.enrollment.as_mut() {
            enrollment.progress = progress;
        }
    }

    fn install_enrollment(&mut self, mut enrollment: Enrollment) {
        enrollment.progress = std::mem::take(&mut enrollment.progress).normalized();
        self.completed = enrollment
            .progress
            .completed_topics
            .iter()
            .map(|topic| topic.key())
            .collect();
        self.enrollment = Some(enrollment);
    }

    /// Returns the course id to enroll in.
    pub fn begin_enroll(&mut self, session: Option<&Session>) -> Result<String, TrackerError> {
        if session.is_none() {
            return Err(TrackerError::NotSignedIn);
        }
        if self.is_enrolled() {
            return Err(TrackerError::AlreadyEnrolled);
        }
        if self.enrolling {
            return Err(TrackerError::EnrollPending);
        }
        self.enrolling = true;
        Ok(self.course.id.clone())
    }

    pub fn on_enrolled(&mut self, result: Result<Enrollment, ApiError>) -> TrackerEvent {
        if !self.enrolling {
            return TrackerEvent::Ignored;
        }
        self.enrolling = false;
        match result {
            Ok(enrollment) => {
                log_debug(&format!("ProgressTracker: enrolled in {}", self.course.id));
                self.install_enrollment(enrollment);
                self.error = None;
                TrackerEvent::Enrolled
            }
            Err(err) => {
                let message = err.to_string();
                self.error = Some(message.clone());
                TrackerEvent::EnrollFailed(message)
            }
        }
    }

    /// `Ok(None)` means the learner is not enrolled in this course.
    pub fn on_enrollment_loaded(
        &mut self,
        result: Result<Option<Enrollment>, ApiError>,
    ) -> TrackerEvent {
        match result {
            Ok(Some(enrollment)) if enrollment.course_id() == self.course.id => {
                self.install_enrollment(enrollment);
                TrackerEvent::EnrollmentLoaded
            }
            Ok(Some(enrollment)) => {
                log_debug(&format!(
                    "ProgressTracker: ignoring enrollment for {} while viewing {}",
                    enrollment.course_id(),
                    self.course.id
                ));
                TrackerEvent::Ignored
            }
            Ok(None) => {
                self.enrollment = None;
                self.completed.clear();
                TrackerEvent::EnrollmentLoaded
            }
            Err(err) => {
                let message = err.to_string();
                self.error = Some(message.clone());
                TrackerEvent::EnrollmentLoadFailed(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        course_models::{CompletedTopic, EnrollmentStatus, ObjectRef},
        test_support::load_course,
    };

    fn fixture_tracker() -> ProgressTracker {
        ProgressTracker::open(load_course("test_fixtures/course_with_generated_chapters.json"))
    }

    fn progress_with(keys: &[(u32, u32)], percent: Option<u32>) -> Progress {
        Progress {
            completed_topics: keys
                .iter()
                .map(|(chapter_order, topic_index)| CompletedTopic {
                    chapter_order: *chapter_order,
                    topic_index: *topic_index,
                    completed_at: None,
                })
                .collect(),
            completion_percentage: percent,
            ..Progress::default()
        }
    }

    fn enrollment_for(course_id: &str, progress: Progress) -> Enrollment {
        Enrollment {
            course: ObjectRef::Id(course_id.to_string()),
            status: EnrollmentStatus::Active,
            enrolled_at: None,
            progress,
        }
    }

    fn enrolled_tracker() -> ProgressTracker {
        let mut tracker = fixture_tracker();
        let id = tracker.course().id.clone();
        tracker.on_enrollment_loaded(Ok(Some(enrollment_for(&id, Progress::default()))));
        tracker
    }

    #[test]
    fn chapters_group_by_order_preserving_source_order() {
        let tracker = fixture_tracker();
        let groups = tracker.groups();
        assert_eq!(
            groups.iter().map(|group| group.order).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(groups[0].title, "Getting Started");
        assert_eq!(groups[0].topics[1].description, "Your first crate");
        let ownership: Vec<_> = groups[1]
            .topics
            .iter()
            .map(|topic| topic.description.as_str())
            .collect();
        assert_eq!(ownership, vec!["Moves and copies", "Borrowing rules", "Lifetimes"]);
    }

    #[test]
    fn cursor_stays_in_bounds_across_navigation() {
        let mut tracker = fixture_tracker();
        assert_eq!(tracker.cursor(), TopicCursor::default());
        assert_eq!(tracker.retreat(), NavOutcome::Ignored);

        let mut visited = vec![tracker.current_key().unwrap()];
        while tracker.advance() == NavOutcome::Moved {
            visited.push(tracker.current_key().unwrap());
        }
        assert_eq!(visited.len(), 6);
        assert_eq!(tracker.cursor(), TopicCursor { chapter: 2, topic: 0 });
        assert_eq!(tracker.advance(), NavOutcome::Ignored);
        assert_eq!(tracker.cursor(), TopicCursor { chapter: 2, topic: 0 });

        assert_eq!(tracker.retreat(), NavOutcome::Moved);
        assert_eq!(tracker.cursor(), TopicCursor { chapter: 1, topic: 2 });
        for _ in 0..10 {
            tracker.retreat();
            assert!(tracker.current_topic().is_some());
        }
        assert_eq!(tracker.cursor(), TopicCursor::default());
    }

    #[test]
    fn selecting_chapter_resets_topic_and_ignores_bad_indices() {
        let mut tracker = fixture_tracker();
        tracker.select_topic(2, 2);
        assert_eq!(tracker.cursor(), TopicCursor { chapter: 1, topic: 2 });
        assert_eq!(tracker.select_chapter(2), NavOutcome::Moved);
        assert_eq!(tracker.cursor(), TopicCursor { chapter: 2, topic: 0 });
        assert_eq!(tracker.select_chapter(3), NavOutcome::Ignored);
        assert_eq!(tracker.select_topic(9, 0), NavOutcome::Ignored);
        assert_eq!(tracker.select_topic(1, 5), NavOutcome::Ignored);
        assert_eq!(tracker.cursor(), TopicCursor { chapter: 2, topic: 0 });
    }

    #[test]
    fn enrolled_advance_completes_the_topic_being_left_before_moving() {
        let mut tracker = enrolled_tracker();
        let request = match tracker.advance() {
            NavOutcome::Complete(request) => request,
            other => panic!("expected completion request, got {:?}", other),
        };
        assert_eq!(request.topic, TopicKey::new(1, 0));
        assert_eq!(request.course_id, "665f1c2ab4d1e9a7c3f01234");
        assert_eq!(tracker.cursor(), TopicCursor::default());
        assert_eq!(tracker.advance(), NavOutcome::Ignored);
        assert_eq!(tracker.retreat(), NavOutcome::Ignored);

        let event = tracker.on_completion_result(Ok(progress_with(&[(1, 0)], None)));
        assert_eq!(event, TrackerEvent::ProgressSaved);
        assert_eq!(tracker.cursor(), TopicCursor { chapter: 0, topic: 1 });
        assert!(tracker.is_completed(TopicKey::new(1, 0)));
    }

    #[test]
    fn failed_completion_leaves_cursor_and_progress_untouched() {
        let mut tracker = enrolled_tracker();
        tracker.advance();
        tracker.on_completion_result(Ok(progress_with(&[(1, 0)], Some(10))));

        let NavOutcome::Complete(_) = tracker.select_topic(3, 0) else {
            panic!("expected completion request");
        };
        let event = tracker.on_completion_result(Err(ApiError::Network("timeout".into())));
        assert_eq!(event, TrackerEvent::CompletionFailed("Network error".into()));
        assert_eq!(tracker.cursor(), TopicCursor { chapter: 0, topic: 1 });
        assert_eq!(tracker.completed_count(), 1);
        assert_eq!(tracker.completion().percent, 10);
        assert!(!tracker.is_completion_pending());
        assert_eq!(tracker.on_completion_result(Ok(Progress::default())), TrackerEvent::Ignored);
    }

    #[test]
    fn final_topic_is_completed_in_place_and_reaches_full_completion() {
        let mut tracker = enrolled_tracker();
        let NavOutcome::Complete(_) = tracker.select_chapter(2) else {
            panic!("expected completion request");
        };
        tracker.on_completion_result(Ok(progress_with(&[(1, 0)], Some(80))));
        assert_eq!(tracker.cursor(), TopicCursor { chapter: 2, topic: 0 });

        assert_eq!(tracker.advance(), NavOutcome::Ignored);
        assert!(!tracker.is_completion_pending());
        let request = tracker.complete_current().unwrap();
        assert_eq!(request.topic, TopicKey::new(3, 0));

        let event = tracker.on_completion_result(Ok(progress_with(&[(1, 0), (3, 0)], Some(100))));
        assert_eq!(event, TrackerEvent::ProgressSaved);
        assert_eq!(tracker.cursor(), TopicCursor { chapter: 2, topic: 0 });
        assert!(tracker.is_completed(TopicKey::new(3, 0)));
        assert_eq!(
            tracker.completion(),
            Completion {
                percent: 100,
                estimated: false
            }
        );
    }

    #[test]
    fn completing_the_same_topic_twice_keeps_one_entry() {
        let mut tracker = enrolled_tracker();
        let first = tracker.complete_current().unwrap();
        assert_eq!(tracker.complete_current(), Err(TrackerError::CompletionPending));
        tracker.on_completion_result(Ok(progress_with(&[(1, 0)], None)));

        let second = tracker.complete_current().unwrap();
        assert_eq!(second.topic, first.topic);
        tracker.on_completion_result(Ok(progress_with(&[(1, 0)], None)));
        assert_eq!(tracker.completed_count(), 1);
        assert_eq!(
            tracker.enrollment().unwrap().progress.completed_topics.len(),
            1
        );
    }

    #[test]
    fn completed_set_ignores_duplicate_entries_from_the_server() {
        let mut tracker = enrolled_tracker();
        tracker.complete_current().unwrap();
        tracker.on_completion_result(Ok(progress_with(&[(1, 0), (1, 0), (2, 1)], None)));
        assert_eq!(tracker.completed_count(), 2);
        assert_eq!(
            tracker.enrollment().unwrap().progress.completed_topics.len(),
            2
        );
        assert_eq!(tracker.cursor(), TopicCursor::default());
    }

    #[test]
    fn completion_estimate_assumes_eight_topics_per_chapter() {
        let mut tracker = enrolled_tracker();
        tracker.complete_current().unwrap();
        tracker.on_completion_result(Ok(progress_with(&[(1, 0), (1, 1), (2, 0)], None)));
        // 3 completed out of 3 chapters * 8
        assert_eq!(
            tracker.completion(),
            Completion {
                percent: 13,
                estimated: true
            }
        );

        tracker.complete_current().unwrap();
        tracker.on_completion_result(Ok(progress_with(&[(1, 0)], Some(55))));
        assert_eq!(
            tracker.completion(),
            Completion {
                percent: 55,
                estimated: false
            }
        );
    }

    #[test]
    fn unenrolled_navigation_moves_without_requests() {
        let mut tracker = fixture_tracker();
        assert_eq!(tracker.advance(), NavOutcome::Moved);
        assert_eq!(tracker.complete_current(), Err(TrackerError::NotEnrolled));
        assert_eq!(tracker.completion().percent, 0);
    }

    #[test]
    fn enroll_requires_session_and_stores_server_enrollment() {
        let mut tracker = fixture_tracker();
        assert_eq!(tracker.begin_enroll(None), Err(TrackerError::NotSignedIn));

        let session = Session::new("jwt", None);
        let course_id = tracker.begin_enroll(Some(&session)).unwrap();
        assert_eq!(tracker.begin_enroll(Some(&session)), Err(TrackerError::EnrollPending));

        let event = tracker.on_enrolled(Ok(enrollment_for(&course_id, Progress::default())));
        assert_eq!(event, TrackerEvent::Enrolled);
        assert!(tracker.is_enrolled());
        assert_eq!(tracker.begin_enroll(Some(&session)), Err(TrackerError::AlreadyEnrolled));

        let refetched = enrollment_for(&course_id, progress_with(&[(1, 0)], None));
        assert_eq!(
            tracker.on_enrollment_loaded(Ok(Some(refetched))),
            TrackerEvent::EnrollmentLoaded
        );
        assert!(tracker.is_completed(TopicKey::new(1, 0)));
    }

    #[test]
    fn missing_enrollment_means_not_enrolled() {
        let mut tracker = enrolled_tracker();
        assert_eq!(tracker.on_enrollment_loaded(Ok(None)), TrackerEvent::EnrollmentLoaded);
        assert!(!tracker.is_enrolled());
        assert_eq!(tracker.advance(), NavOutcome::Moved);
    }
}
