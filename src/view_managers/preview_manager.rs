use super::CourseManager;
use crate::{
    App, AppView, course_models::CoursePreview, error::ApiError, request_tracker::RequestKind,
    task_runner::TaskOutcome,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone)]
pub(crate) enum PreviewScreen {
    Loading {
        course_id: String,
    },
    Ready {
        preview: Box<CoursePreview>,
        chapter: usize,
    },
    /// No such course, or the course has no layout to show.
    Missing,
}

pub(crate) struct PreviewManager<'a> {
    app: &'a mut App,
}

impl<'a> PreviewManager<'a> {
    pub(crate) fn new(app: &'a mut App) -> Self {
        Self { app }
    }

    pub(crate) fn open_preview(app: &mut App, course_id: String, return_view: AppView) {
        app.requests.cancel(RequestKind::LoadPreview);
        app.preview_screen = Some(PreviewScreen::Loading {
            course_id: course_id.clone(),
        });
        app.return_view = return_view;
        app.view = AppView::Preview;
        app.dispatch(RequestKind::LoadPreview, move |client| async move {
            TaskOutcome::Preview(client.course_preview(&course_id).await)
        });
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent) {
        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Esc | KeyCode::Char('q')) => self.close(),
            (KeyModifiers::NONE, KeyCode::Down | KeyCode::Char('j')) => self.move_chapter(1),
            (KeyModifiers::NONE, KeyCode::Up | KeyCode::Char('k')) => self.move_chapter(-1),
            (KeyModifiers::NONE, KeyCode::Char('o') | KeyCode::Enter) => self.open_full_course(),
            _ => {}
        }
    }

    fn close(&mut self) {
        self.app.requests.cancel(RequestKind::LoadPreview);
        self.app.preview_screen = None;
        self.app.view = self.app.return_view;
    }

    fn move_chapter(&mut self, delta: isize) {
        if let Some(PreviewScreen::Ready { preview, chapter }) = self.app.preview_screen.as_mut() {
            let len = preview
                .ai_generated_layout
                .as_ref()
                .map_or(0, |layout| layout.chapters.len()) as isize;
            if len > 0 {
                *chapter = (*chapter as isize + delta).rem_euclid(len) as usize;
            }
        }
    }

    fn open_full_course(&mut self) {
        let Some(PreviewScreen::Ready { preview, .. }) = self.app.preview_screen.as_ref() else {
            return;
        };
        let course_id = preview.id.clone();
        let return_view = self.app.return_view;
        self.app.preview_screen = None;
        CourseManager::open_course(self.app, course_id, return_view);
    }

    pub(crate) fn on_preview_loaded(app: &mut App, result: Result<CoursePreview, ApiError>) {
        let screen = match result {
            Ok(preview) if preview.ai_generated_layout.is_some() => PreviewScreen::Ready {
                preview: Box::new(preview),
                chapter: 0,
            },
            Ok(_) => PreviewScreen::Missing,
            Err(err) if err.is_not_found() => PreviewScreen::Missing,
            Err(err) => {
                app.report_error(err.to_string());
                PreviewScreen::Missing
            }
        };
        app.preview_screen = Some(screen);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::offline_app;
    use serde_json::from_str;

    fn loaded(json: &str) -> App {
        let mut app = offline_app();
        PreviewManager::open_preview(&mut app, "c1".into(), AppView::Explore);
        app.requests.cancel(RequestKind::LoadPreview);
        crate::test_support::complete(
            &mut app,
            RequestKind::LoadPreview,
            TaskOutcome::Preview(Ok(from_str(json).unwrap())),
        );
        app
    }

    #[test]
    fn preview_without_layout_falls_back_to_not_found() {
        let app = loaded(r#"{"_id":"c1","name":"Empty"}"#);
        assert!(matches!(app.preview_screen, Some(PreviewScreen::Missing)));
    }

    #[test]
    fn chapter_selection_wraps() {
        let mut app = loaded(
            r#"{"_id":"c1","name":"ML","aiGeneratedLayout":{"chapters":[
                {"chapterName":"a","duration":"1 hour"},
                {"chapterName":"b","duration":"2 hours"}
            ]}}"#,
        );
        PreviewManager::new(&mut app).handle_key(KeyEvent::new(KeyCode::Up, KeyModifiers::NONE));
        assert!(matches!(
            app.preview_screen,
            Some(PreviewScreen::Ready { chapter: 1, .. })
        ));
        PreviewManager::new(&mut app).handle_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
        assert_eq!(app.view, AppView::Explore);
    }
}
