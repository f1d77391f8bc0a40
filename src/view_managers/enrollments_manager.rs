use super::CourseManager;
use crate::{
    App, AppView, course_models::Enrollment, error::ApiError, log_util::log_debug,
    request_tracker::RequestKind, task_runner::TaskOutcome,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

pub(crate) struct EnrollmentsManager<'a> {
    app: &'a mut App,
}

impl<'a> EnrollmentsManager<'a> {
    pub(crate) fn new(app: &'a mut App) -> Self {
        Self { app }
    }

    pub(crate) fn show_enrollments(app: &mut App) {
        if app.require_session().is_none() {
            return;
        }
        app.view = AppView::Enrollments;
        Self::load_enrollments(app);
    }

    /// Refresh the enrollment list in the background. Does nothing when signed out.
    pub(crate) fn load_enrollments(app: &mut App) {
        let Some(session) = app.session() else {
            return;
        };
        app.dispatch(RequestKind::LoadEnrollments, move |client| async move {
            TaskOutcome::Enrollments(client.enrollments(&session).await)
        });
    }

    pub(crate) fn selected(app: &App) -> Option<&Enrollment> {
        app.enrollments.get(app.enrollment_index)
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent) {
        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Esc | KeyCode::Char('m')) => self.app.return_to_menu(),
            (KeyModifiers::NONE, KeyCode::Down | KeyCode::Char('j')) => self.move_selection(1),
            (KeyModifiers::NONE, KeyCode::Up | KeyCode::Char('k')) => self.move_selection(-1),
            (KeyModifiers::NONE, KeyCode::Enter) => self.open_selected(),
            (KeyModifiers::NONE, KeyCode::Char('p')) => self.toggle_status(),
            (KeyModifiers::NONE, KeyCode::Char('u')) => self.unenroll(),
            (KeyModifiers::NONE, KeyCode::Char('r')) => Self::load_enrollments(self.app),
            _ => {}
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.app.enrollments.len() as isize;
        if len == 0 {
            return;
        }
        self.app.enrollment_index =
            (self.app.enrollment_index as isize + delta).rem_euclid(len) as usize;
    }

    fn open_selected(&mut self) {
        if let Some(course_id) = Self::selected(self.app).map(|e| e.course_id().to_string()) {
            CourseManager::open_course(self.app, course_id, AppView::Enrollments);
        }
    }

    fn toggle_status(&mut self) {
        let Some(enrollment) = Self::selected(self.app) else {
            return;
        };
        let course_id = enrollment.course_id().to_string();
        let status = enrollment.status.toggled();
        let Some(session) = self.app.require_session() else {
            return;
        };
        log_debug(&format!(
            "EnrollmentsManager: setting {} to {}",
            course_id,
            status.label()
        ));
        self.app
            .dispatch(RequestKind::UpdateEnrollment, move |client| async move {
                TaskOutcome::EnrollmentUpdated(
                    client
                        .update_enrollment_status(&session, &course_id, status)
                        .await,
                )
            });
    }

    fn unenroll(&mut self) {
        let Some(course_id) = Self::selected(self.app).map(|e| e.course_id().to_string()) else {
            return;
        };
        let Some(session) = self.app.require_session() else {
            return;
        };
        self.app
            .dispatch(RequestKind::Unenroll, move |client| async move {
                let result = client.unenroll(&session, &course_id).await;
                TaskOutcome::Unenrolled { course_id, result }
            });
    }

    fn sync_explore(app: &mut App) {
        let ids: Vec<String> = app
            .enrollments
            .iter()
            .map(|enrollment| enrollment.course_id().to_string())
            .collect();
        app.explore.set_enrolled_ids(ids);
        if app.enrollment_index >= app.enrollments.len() {
            app.enrollment_index = app.enrollments.len().saturating_sub(1);
        }
    }

    pub(crate) fn on_enrollments_loaded(app: &mut App, result: Result<Vec<Enrollment>, ApiError>) {
        match result {
            Ok(enrollments) => {
                log_debug(&format!(
                    "EnrollmentsManager: {} enrollments",
                    enrollments.len()
                ));
                app.enrollments = enrollments
                    .into_iter()
                    .map(|enrollment| Enrollment {
                        progress: enrollment.progress.normalized(),
                        ..enrollment
                    })
                    .collect();
                Self::sync_explore(app);
            }
            Err(err) => app.report_error(err.to_string()),
        }
    }

    pub(crate) fn on_enrollment_updated(app: &mut App, result: Result<Enrollment, ApiError>) {
        match result {
            Ok(mut updated) => {
                if let Some(existing) = app
                    .enrollments
                    .iter_mut()
                    .find(|existing| existing.course_id() == updated.course_id())
                {
                    // Status replies carry a bare course id; keep the populated reference.
                    if updated.course.name().is_none() {
                        updated.course = existing.course.clone();
                    }
                    *existing = updated.clone();
                }
                app.notify(format!("Enrollment is now {}.", updated.status.label()));
            }
            Err(err) => app.report_error(err.to_string()),
        }
    }

    pub(crate) fn on_unenrolled(app: &mut App, course_id: String, result: Result<(), ApiError>) {
        match result {
            Ok(()) => {
                app.enrollments
                    .retain(|enrollment| enrollment.course_id() != course_id);
                Self::sync_explore(app);
                app.notify("Unenrolled from course.");
            }
            Err(err) => app.report_error(err.to_string()),
        }
    }
}
