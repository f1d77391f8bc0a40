use super::{CourseManager, WizardManager};
use crate::{
    App, AppView,
    api_client::CourseQuery,
    course_models::{Course, CourseUpdate},
    error::ApiError,
    log_util::log_debug,
    request_tracker::RequestKind,
    task_runner::TaskOutcome,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EditField {
    Name,
    Description,
}

/// Inline rename of one of the learner's own courses.
#[derive(Debug, Clone)]
pub(crate) struct CourseEditForm {
    pub(crate) course_id: String,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) field: EditField,
}

impl CourseEditForm {
    pub(crate) fn for_course(course: &Course) -> Self {
        Self {
            course_id: course.id.clone(),
            name: course.name.clone(),
            description: course.description.clone(),
            field: EditField::Name,
        }
    }

    fn toggle_field(&mut self) {
        self.field = match self.field {
            EditField::Name => EditField::Description,
            EditField::Description => EditField::Name,
        };
    }

    fn current_mut(&mut self) -> &mut String {
        match self.field {
            EditField::Name => &mut self.name,
            EditField::Description => &mut self.description,
        }
    }

    fn update(&self) -> Result<CourseUpdate, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Course name is required".to_string());
        }
        Ok(CourseUpdate {
            name: Some(name.to_string()),
            description: Some(self.description.trim().to_string()),
            ..CourseUpdate::default()
        })
    }
}

pub(crate) struct LibraryManager<'a> {
    app: &'a mut App,
}

impl<'a> LibraryManager<'a> {
    pub(crate) fn new(app: &'a mut App) -> Self {
        Self { app }
    }

    pub(crate) fn show_library(app: &mut App) {
        if app.require_session().is_none() {
            return;
        }
        app.view = AppView::Library;
        if !app.library.is_loaded() {
            Self::load_library(app);
        }
    }

    pub(crate) fn load_library(app: &mut App) {
        let Some(session) = app.require_session() else {
            return;
        };
        app.dispatch(RequestKind::LoadLibrary, move |client| async move {
            TaskOutcome::Library(client.list_courses(&session, &CourseQuery::default()).await)
        });
    }

    pub(crate) fn reset_edit(app: &mut App) {
        app.course_edit = None;
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent) {
        if self.app.course_edit.is_some() {
            self.handle_edit_key(key);
            return;
        }
        if self.app.library.bar().is_editing() {
            self.handle_filter_key(key);
            return;
        }
        if self.app.pending_delete.is_some() {
            self.resolve_delete(key);
            return;
        }
        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Esc | KeyCode::Char('m')) => self.app.return_to_menu(),
            (KeyModifiers::NONE, KeyCode::Down | KeyCode::Char('j')) => {
                self.app.library.move_selection(1)
            }
            (KeyModifiers::NONE, KeyCode::Up | KeyCode::Char('k')) => {
                self.app.library.move_selection(-1)
            }
            (KeyModifiers::NONE, KeyCode::Enter) => self.open_selected(),
            (KeyModifiers::NONE, KeyCode::Char('n')) => WizardManager::show_wizard(self.app),
            (KeyModifiers::NONE, KeyCode::Char('r')) => Self::load_library(self.app),
            (KeyModifiers::NONE, KeyCode::Char('/')) => {
                self.app.library.set_filter_editing(true)
            }
            (KeyModifiers::NONE, KeyCode::Char('x')) => self.app.library.clear_filters(),
            (KeyModifiers::NONE, KeyCode::Char('d')) => self.request_delete(),
            (KeyModifiers::NONE, KeyCode::Char('s')) => self.cycle_status(),
            (KeyModifiers::NONE, KeyCode::Char('e')) => self.start_edit(),
            _ => {}
        }
    }

    fn handle_filter_key(&mut self, key: KeyEvent) {
        let library = &mut self.app.library;
        match (key.modifiers, key.code) {
            (_, KeyCode::Esc | KeyCode::Enter) => library.set_filter_editing(false),
            (_, KeyCode::Tab) => library.next_field(),
            (_, KeyCode::Left) => library.cycle_filter(-1),
            (_, KeyCode::Right) => library.cycle_filter(1),
            (_, KeyCode::Backspace) => library.pop_char(),
            (_, KeyCode::Delete) => library.clear_filters(),
            (KeyModifiers::NONE | KeyModifiers::SHIFT, KeyCode::Char(ch)) => library.push_char(ch),
            _ => {}
        }
    }

    fn handle_edit_key(&mut self, key: KeyEvent) {
        let Some(form) = self.app.course_edit.as_mut() else {
            return;
        };
        match (key.modifiers, key.code) {
            (_, KeyCode::Esc) => self.app.course_edit = None,
            (_, KeyCode::Tab | KeyCode::BackTab) => form.toggle_field(),
            (_, KeyCode::Backspace) => {
                form.current_mut().pop();
            }
            (_, KeyCode::Enter) => self.save_edit(),
            (KeyModifiers::NONE | KeyModifiers::SHIFT, KeyCode::Char(ch)) => {
                form.current_mut().push(ch)
            }
            _ => {}
        }
    }

    fn open_selected(&mut self) {
        if let Some(course_id) = self.app.library.selected_course().map(|course| course.id.clone()) {
            CourseManager::open_course(self.app, course_id, AppView::Library);
        }
    }

    fn request_delete(&mut self) {
        let Some(course) = self.app.library.selected_course() else {
            return;
        };
        let message = format!("Delete \"{}\"? Press y to confirm.", course.name);
        self.app.pending_delete = Some(course.id.clone());
        self.app.notify(message);
    }

    fn resolve_delete(&mut self, key: KeyEvent) {
        let Some(course_id) = self.app.pending_delete.take() else {
            return;
        };
        if key.code != KeyCode::Char('y') {
            self.app.notify("Delete cancelled.");
            return;
        }
        let Some(session) = self.app.require_session() else {
            return;
        };
        log_debug(&format!("LibraryManager: deleting course {}", course_id));
        self.app
            .dispatch(RequestKind::DeleteCourse, move |client| async move {
                let result = client.delete_course(&session, &course_id).await;
                TaskOutcome::CourseDeleted { course_id, result }
            });
    }

    fn cycle_status(&mut self) {
        let Some(course) = self.app.library.selected_course() else {
            return;
        };
        let course_id = course.id.clone();
        let status = course.status.next();
        let Some(session) = self.app.require_session() else {
            return;
        };
        log_debug(&format!(
            "LibraryManager: setting course {} to {}",
            course_id,
            status.label()
        ));
        self.app
            .dispatch(RequestKind::UpdateCourseStatus, move |client| async move {
                TaskOutcome::CourseUpdated(
                    client
                        .update_course_status(&session, &course_id, status)
                        .await,
                )
            });
    }

    fn start_edit(&mut self) {
        if let Some(course) = self.app.library.selected_course() {
            self.app.course_edit = Some(CourseEditForm::for_course(course));
        }
    }

    fn save_edit(&mut self) {
        let Some(form) = self.app.course_edit.as_ref() else {
            return;
        };
        let update = match form.update() {
            Ok(update) => update,
            Err(message) => {
                self.app.report_error(message);
                return;
            }
        };
        let course_id = form.course_id.clone();
        let Some(session) = self.app.require_session() else {
            return;
        };
        self.app
            .dispatch(RequestKind::UpdateCourse, move |client| async move {
                TaskOutcome::CourseUpdated(client.update_course(&session, &course_id, &update).await)
            });
    }

    pub(crate) fn on_library_loaded(app: &mut App, result: Result<Vec<Course>, ApiError>) {
        match result {
            Ok(courses) => app.library.set_courses(courses),
            Err(err) => app.report_error(err.to_string()),
        }
    }

    pub(crate) fn on_course_updated(app: &mut App, result: Result<Course, ApiError>) {
        match result {
            Ok(course) => {
                if app
                    .course_edit
                    .as_ref()
                    .is_some_and(|form| form.course_id == course.id)
                {
                    app.course_edit = None;
                }
                app.notify(format!("Updated \"{}\" ({})", course.name, course.status.label()));
                app.library.apply_updated(course);
            }
            Err(err) => app.report_error(err.to_string()),
        }
    }

    pub(crate) fn on_course_deleted(app: &mut App, course_id: String, result: Result<(), ApiError>) {
        match result {
            Ok(()) => {
                app.library.apply_deleted(&course_id);
                app.notify("Course deleted.");
            }
            Err(err) => app.report_error(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        course_models::CourseStatus,
        test_support::{complete, load_course, signed_in_app},
    };

    const FIXTURE: &str = "test_fixtures/course_with_generated_chapters.json";

    fn press(app: &mut App, code: KeyCode) {
        LibraryManager::new(app).handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn loaded_app() -> App {
        let mut app = signed_in_app();
        app.view = AppView::Library;
        complete(
            &mut app,
            RequestKind::LoadLibrary,
            TaskOutcome::Library(Ok(vec![load_course(FIXTURE)])),
        );
        app
    }

    #[test]
    fn delete_needs_confirmation_and_any_other_key_cancels() {
        let mut app = loaded_app();
        press(&mut app, KeyCode::Char('d'));
        assert!(app.pending_delete.is_some());
        press(&mut app, KeyCode::Char('n'));
        assert!(app.pending_delete.is_none());
        assert!(!app.is_loading(RequestKind::DeleteCourse));
        assert_eq!(app.view, AppView::Library);

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('y'));
        assert!(app.is_loading(RequestKind::DeleteCourse));
    }

    #[test]
    fn deleted_course_leaves_the_list() {
        let mut app = loaded_app();
        complete(
            &mut app,
            RequestKind::DeleteCourse,
            TaskOutcome::CourseDeleted {
                course_id: "665f1c2ab4d1e9a7c3f01234".into(),
                result: Ok(()),
            },
        );
        assert_eq!(app.library.total_count(), 0);
        assert_eq!(app.status.as_deref(), Some("Course deleted."));
    }

    #[test]
    fn status_update_replaces_the_listed_course() {
        let mut app = loaded_app();
        let mut updated = load_course(FIXTURE);
        updated.status = CourseStatus::Archived;
        complete(
            &mut app,
            RequestKind::UpdateCourseStatus,
            TaskOutcome::CourseUpdated(Ok(updated)),
        );
        assert_eq!(
            app.library.selected_course().map(|course| course.status),
            Some(CourseStatus::Archived)
        );
    }

    #[test]
    fn filter_mode_routes_typing_to_the_search_box() {
        let mut app = loaded_app();
        press(&mut app, KeyCode::Char('/'));
        for ch in "zzz".chars() {
            press(&mut app, KeyCode::Char(ch));
        }
        assert!(app.library.visible().is_empty());
        press(&mut app, KeyCode::Esc);
        assert!(!app.library.bar().is_editing());
        assert_eq!(app.view, AppView::Library);
        press(&mut app, KeyCode::Char('x'));
        assert_eq!(app.library.visible().len(), 1);
    }

    #[test]
    fn edit_form_rejects_a_blank_name() {
        let mut app = loaded_app();
        press(&mut app, KeyCode::Char('e'));
        let length = app.course_edit.as_ref().map(|form| form.name.len()).unwrap();
        for _ in 0..length {
            press(&mut app, KeyCode::Backspace);
        }
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.error.as_deref(), Some("Course name is required"));
        assert!(!app.is_loading(RequestKind::UpdateCourse));
    }
}
