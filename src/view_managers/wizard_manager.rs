use super::LibraryManager;
use crate::{
    App, AppView,
    course_models::{Course, CourseLayout},
    course_wizard::{DraftField, WizardEvent, WizardStep},
    error::ApiError,
    request_tracker::RequestKind,
    task_runner::TaskOutcome,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

pub(crate) struct WizardManager<'a> {
    app: &'a mut App,
}

impl<'a> WizardManager<'a> {
    pub(crate) fn new(app: &'a mut App) -> Self {
        Self { app }
    }

    pub(crate) fn show_wizard(app: &mut App) {
        if app.require_session().is_none() {
            return;
        }
        app.view = AppView::Wizard;
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent) {
        match self.app.wizard.step() {
            WizardStep::Input => self.handle_input_key(key),
            WizardStep::Preview => self.handle_preview_key(key),
            WizardStep::Generating => {
                if key.code == KeyCode::Esc {
                    self.abandon();
                }
            }
            WizardStep::Creating => {
                if key.code == KeyCode::Esc {
                    self.app.return_to_menu();
                }
            }
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        let wizard = &mut self.app.wizard;
        let field = wizard.selected_field();
        match (key.modifiers, key.code) {
            (_, KeyCode::Esc) => self.abandon(),
            (_, KeyCode::Enter) => self.request_layout(),
            (_, KeyCode::Tab | KeyCode::Down) => wizard.select_next(),
            (_, KeyCode::BackTab | KeyCode::Up) => wizard.select_previous(),
            (_, KeyCode::Left) => {
                wizard.adjust_selected(-1);
            }
            (_, KeyCode::Right) => {
                wizard.adjust_selected(1);
            }
            (_, KeyCode::Backspace) => {
                wizard.pop_char();
            }
            (KeyModifiers::NONE, KeyCode::Char(' ')) if field == DraftField::IncludeVideos => {
                wizard.toggle_include_videos();
            }
            (KeyModifiers::NONE, KeyCode::Char(digit @ '0'..='9'))
                if field == DraftField::ChapterCount =>
            {
                wizard.set_chapter_count(digit as u32 - '0' as u32);
            }
            (KeyModifiers::NONE | KeyModifiers::SHIFT, KeyCode::Char(ch)) if field.is_text() => {
                wizard.push_char(ch);
            }
            _ => {}
        }
    }

    fn handle_preview_key(&mut self, key: KeyEvent) {
        match (key.modifiers, key.code) {
            (_, KeyCode::Esc) => self.abandon(),
            (_, KeyCode::Enter) => self.create_full(),
            (KeyModifiers::NONE, KeyCode::Char('o')) => self.save_outline(),
            (KeyModifiers::NONE, KeyCode::Char('b')) | (_, KeyCode::Backspace) => {
                self.app.wizard.back_to_input();
            }
            _ => {}
        }
    }

    fn request_layout(&mut self) {
        let Some(session) = self.app.require_session() else {
            return;
        };
        let params = match self.app.wizard.submit_for_layout() {
            Ok(params) => params,
            Err(err) => {
                self.app.report_error(err.to_string());
                return;
            }
        };
        self.app
            .dispatch(RequestKind::GenerateLayout, move |client| async move {
                TaskOutcome::Layout(client.generate_layout(&session, &params).await)
            });
    }

    fn create_full(&mut self) {
        let session = self.app.session();
        let request = match self.app.wizard.confirm_create(session.as_ref()) {
            Ok(request) => request,
            Err(err) => {
                self.app.report_error(err.to_string());
                return;
            }
        };
        let Some(session) = session else {
            return;
        };
        self.app
            .dispatch(RequestKind::CreateCourse, move |client| async move {
                TaskOutcome::CourseCreated(client.generate_full(&session, &request).await)
            });
    }

    fn save_outline(&mut self) {
        let session = self.app.session();
        let request = match self.app.wizard.confirm_save_outline(session.as_ref()) {
            Ok(request) => request,
            Err(err) => {
                self.app.report_error(err.to_string());
                return;
            }
        };
        let Some(session) = session else {
            return;
        };
        self.app
            .dispatch(RequestKind::CreateCourse, move |client| async move {
                TaskOutcome::CourseCreated(client.create_course(&session, &request).await)
            });
    }

    /// Drop the draft and any request it started.
    fn abandon(&mut self) {
        self.app
            .requests
            .cancel_many(&[RequestKind::GenerateLayout, RequestKind::CreateCourse]);
        self.app.wizard.close();
        self.app.return_to_menu();
    }

    pub(crate) fn on_layout(app: &mut App, result: Result<CourseLayout, ApiError>) {
        match app.wizard.on_layout_result(result) {
            WizardEvent::LayoutReady => app.notify("Course layout generated. Review it below."),
            WizardEvent::LayoutFailed(message) => app.report_error(message),
            _ => {}
        }
    }

    pub(crate) fn on_created(app: &mut App, result: Result<Course, ApiError>) {
        match app.wizard.on_create_result(result) {
            WizardEvent::Created(course) => {
                app.notify(format!("Course \"{}\" created successfully!", course.name));
                app.library.prepend(*course);
                if app.view == AppView::Wizard {
                    LibraryManager::show_library(app);
                }
            }
            WizardEvent::CreateFailed(message) => app.report_error(message),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        course_models::{Category, Difficulty},
        test_support::{complete, load_course, offline_app, signed_in_app},
    };
    use serde_json::from_str;

    fn press(app: &mut App, code: KeyCode) {
        WizardManager::new(app).handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App, text: &str) {
        text.chars().for_each(|ch| press(app, KeyCode::Char(ch)));
    }

    fn layout() -> CourseLayout {
        from_str(
            r#"{"name":"Rust","chapters":[
                {"chapterName":"Basics","duration":"2 hours","topics":["Cargo"]}
            ]}"#,
        )
        .unwrap()
    }

    fn filled_wizard() -> App {
        let mut app = signed_in_app();
        WizardManager::show_wizard(&mut app);
        type_text(&mut app, "Rust");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "Systems programming");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "3");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Right);
        app
    }

    #[test]
    fn wizard_requires_a_session() {
        let mut app = offline_app();
        WizardManager::show_wizard(&mut app);
        assert_eq!(app.view, AppView::Menu);
    }

    #[test]
    fn keys_fill_the_draft_and_enter_requests_a_layout() {
        let mut app = filled_wizard();
        let draft = app.wizard.draft();
        assert_eq!(draft.name, "Rust");
        assert_eq!(draft.chapter_count, 3);
        assert!(!draft.include_videos);
        assert_eq!(draft.category, Some(Category::Technology));
        assert_eq!(draft.difficulty, Some(Difficulty::Beginner));

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.wizard.step(), WizardStep::Generating);
        assert!(app.is_loading(RequestKind::GenerateLayout));
    }

    #[test]
    fn invalid_draft_stays_on_input_with_an_error() {
        let mut app = signed_in_app();
        WizardManager::show_wizard(&mut app);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.wizard.step(), WizardStep::Input);
        assert_eq!(app.error.as_deref(), Some("Course name is required"));
        assert!(!app.is_loading(RequestKind::GenerateLayout));
    }

    #[test]
    fn created_course_lands_in_the_library() {
        let mut app = filled_wizard();
        press(&mut app, KeyCode::Enter);
        app.requests.cancel(RequestKind::GenerateLayout);
        complete(
            &mut app,
            RequestKind::GenerateLayout,
            TaskOutcome::Layout(Ok(layout())),
        );
        assert_eq!(app.wizard.step(), WizardStep::Preview);

        press(&mut app, KeyCode::Char('o'));
        assert_eq!(app.wizard.step(), WizardStep::Creating);
        app.requests.cancel(RequestKind::CreateCourse);
        complete(
            &mut app,
            RequestKind::CreateCourse,
            TaskOutcome::CourseCreated(Ok(load_course(
                "test_fixtures/course_with_generated_chapters.json",
            ))),
        );
        assert_eq!(app.wizard.step(), WizardStep::Input);
        assert_eq!(app.view, AppView::Library);
        assert_eq!(
            app.library.selected_course().map(|course| course.name.as_str()),
            Some("Rust for Backend Developers")
        );
    }

    #[test]
    fn escape_while_generating_discards_the_late_layout() {
        let mut app = filled_wizard();
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Esc);
        assert!(!app.is_loading(RequestKind::GenerateLayout));
        assert_eq!(app.wizard.step(), WizardStep::Input);
        assert_eq!(app.view, AppView::Menu);
    }
}
