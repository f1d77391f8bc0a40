use super::EnrollmentsManager;
use crate::{
    App, AppView,
    course_models::{Course, Enrollment, Progress},
    error::ApiError,
    log_util::log_debug,
    progress_tracker::{CompletionRequest, NavOutcome, ProgressTracker, TrackerEvent},
    request_tracker::RequestKind,
    task_runner::TaskOutcome,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// State of the course reading screen.
#[derive(Debug, Clone)]
pub(crate) enum CourseScreen {
    Loading { course_id: String },
    Ready(Box<ProgressTracker>),
    Missing(String),
}

impl CourseScreen {
    fn tracker_mut(&mut self) -> Option<&mut ProgressTracker> {
        match self {
            Self::Ready(tracker) => Some(tracker),
            _ => None,
        }
    }
}

pub(crate) struct CourseManager<'a> {
    app: &'a mut App,
}

impl<'a> CourseManager<'a> {
    pub(crate) fn new(app: &'a mut App) -> Self {
        Self { app }
    }

    pub(crate) fn open_course(app: &mut App, course_id: String, return_view: AppView) {
        let Some(session) = app.require_session() else {
            return;
        };
        app.requests.cancel_many(&RequestKind::COURSE_VIEW);
        app.course_screen = Some(CourseScreen::Loading {
            course_id: course_id.clone(),
        });
        app.return_view = return_view;
        app.view = AppView::Course;
        log_debug(&format!("CourseManager: opening {}", course_id));
        app.dispatch(RequestKind::LoadCourse, move |client| async move {
            TaskOutcome::CourseLoaded(client.course(&session, &course_id).await)
        });
    }

    fn load_enrollment(app: &mut App, course_id: String) {
        let Some(session) = app.session() else {
            return;
        };
        app.dispatch(RequestKind::LoadEnrollment, move |client| async move {
            TaskOutcome::EnrollmentLoaded(client.enrollment(&session, &course_id).await)
        });
    }

    fn tracker(&mut self) -> Option<&mut ProgressTracker> {
        self.app.course_screen.as_mut().and_then(CourseScreen::tracker_mut)
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent) {
        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Esc | KeyCode::Char('q')) => self.close(),
            (KeyModifiers::NONE, KeyCode::Down | KeyCode::Char('j') | KeyCode::Char('n')) => {
                self.navigate(ProgressTracker::advance)
            }
            (KeyModifiers::NONE, KeyCode::Up | KeyCode::Char('k') | KeyCode::Char('p')) => {
                self.navigate(ProgressTracker::retreat)
            }
            (KeyModifiers::NONE, KeyCode::Char(']')) => self.navigate(|tracker| {
                let next = tracker.cursor().chapter + 1;
                tracker.select_chapter(next)
            }),
            (KeyModifiers::NONE, KeyCode::Char('[')) => self.navigate(|tracker| {
                match tracker.cursor().chapter.checked_sub(1) {
                    Some(previous) => tracker.select_chapter(previous),
                    None => NavOutcome::Ignored,
                }
            }),
            (KeyModifiers::NONE, KeyCode::Tab) => self.navigate(|tracker| {
                let Some(group) = tracker.current_group() else {
                    return NavOutcome::Ignored;
                };
                let (order, len) = (group.order, group.topics.len());
                let next = (tracker.cursor().topic + 1) % len.max(1);
                tracker.select_topic(order, next)
            }),
            (KeyModifiers::NONE, KeyCode::Char('c')) => self.complete_current(),
            (KeyModifiers::NONE, KeyCode::Char('e')) => self.enroll(),
            (KeyModifiers::NONE, KeyCode::Char('r')) => self.reload(),
            _ => {}
        }
    }

    fn close(&mut self) {
        self.app.requests.cancel_many(&RequestKind::COURSE_VIEW);
        self.app.course_screen = None;
        self.app.view = self.app.return_view;
    }

    fn reload(&mut self) {
        let course_id = match self.app.course_screen.as_ref() {
            Some(CourseScreen::Ready(tracker)) => tracker.course().id.clone(),
            Some(CourseScreen::Loading { course_id }) => course_id.clone(),
            _ => return,
        };
        let return_view = self.app.return_view;
        Self::open_course(self.app, course_id, return_view);
    }

    fn navigate<F>(&mut self, step: F)
    where
        F: FnOnce(&mut ProgressTracker) -> NavOutcome,
    {
        let Some(tracker) = self.tracker() else {
            return;
        };
        if let NavOutcome::Complete(request) = step(tracker) {
            Self::send_completion(self.app, request);
        }
    }

    fn complete_current(&mut self) {
        let Some(tracker) = self.tracker() else {
            return;
        };
        match tracker.complete_current() {
            Ok(request) => Self::send_completion(self.app, request),
            Err(err) => self.app.report_error(err.to_string()),
        }
    }

    fn send_completion(app: &mut App, request: CompletionRequest) {
        let Some(session) = app.require_session() else {
            if let Some(tracker) = app.course_screen.as_mut().and_then(CourseScreen::tracker_mut) {
                tracker.on_completion_result(Err(ApiError::not_signed_in()));
            }
            return;
        };
        app.dispatch(RequestKind::CompleteTopic, move |client| async move {
            TaskOutcome::TopicCompleted(
                client
                    .mark_topic_completed(&session, &request.course_id, request.topic)
                    .await,
            )
        });
    }

    fn enroll(&mut self) {
        let session = self.app.session();
        let Some(tracker) = self.tracker() else {
            return;
        };
        let course_id = match tracker.begin_enroll(session.as_ref()) {
            Ok(course_id) => course_id,
            Err(err) => {
                self.app.report_error(err.to_string());
                return;
            }
        };
        let Some(session) = session else {
            return;
        };
        self.app
            .dispatch(RequestKind::Enroll, move |client| async move {
                TaskOutcome::Enrolled(client.enroll(&session, &course_id).await)
            });
    }

    pub(crate) fn on_course_loaded(app: &mut App, result: Result<Course, ApiError>) {
        match result {
            Ok(course) => {
                let course_id = course.id.clone();
                app.course_screen = Some(CourseScreen::Ready(Box::new(ProgressTracker::open(
                    course,
                ))));
                Self::load_enrollment(app, course_id);
            }
            Err(err) if err.is_not_found() => {
                app.course_screen = Some(CourseScreen::Missing("Course not found".to_string()));
            }
            Err(err) => {
                app.course_screen = Some(CourseScreen::Missing(err.to_string()));
                app.report_error(err.to_string());
            }
        }
    }

    pub(crate) fn on_enrollment_loaded(app: &mut App, result: Result<Option<Enrollment>, ApiError>) {
        let Some(tracker) = app.course_screen.as_mut().and_then(CourseScreen::tracker_mut) else {
            return;
        };
        if let TrackerEvent::EnrollmentLoadFailed(message) = tracker.on_enrollment_loaded(result) {
            app.report_error(message);
        }
    }

    pub(crate) fn on_enrolled(app: &mut App, result: Result<Enrollment, ApiError>) {
        let Some(tracker) = app.course_screen.as_mut().and_then(CourseScreen::tracker_mut) else {
            return;
        };
        match tracker.on_enrolled(result) {
            TrackerEvent::Enrolled => {
                let course_id = tracker.course().id.clone();
                app.notify("Successfully enrolled in the course!");
                app.explore.mark_enrolled(&course_id);
                Self::load_enrollment(app, course_id);
                EnrollmentsManager::load_enrollments(app);
            }
            TrackerEvent::EnrollFailed(message) => app.report_error(message),
            _ => {}
        }
    }

    pub(crate) fn on_topic_completed(app: &mut App, result: Result<Progress, ApiError>) {
        let Some(tracker) = app.course_screen.as_mut().and_then(CourseScreen::tracker_mut) else {
            return;
        };
        match tracker.on_completion_result(result) {
            TrackerEvent::ProgressSaved => {
                let course_id = tracker.course().id.clone();
                let progress = tracker.enrollment().map(|enrollment| enrollment.progress.clone());
                if let (Some(progress), Some(listed)) = (
                    progress,
                    app.enrollments
                        .iter_mut()
                        .find(|enrollment| enrollment.course_id() == course_id),
                ) {
                    listed.progress = progress;
                }
            }
            TrackerEvent::CompletionFailed(message) => app.report_error(message),
            _ => {}
        }
    }
}
