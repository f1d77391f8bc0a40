use super::{CourseManager, PreviewManager};
use crate::{
    App, AppView, course_models::CoursePage, error::ApiError, log_util::log_debug,
    request_tracker::RequestKind, task_runner::TaskOutcome,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

pub(crate) struct ExploreManager<'a> {
    app: &'a mut App,
}

impl<'a> ExploreManager<'a> {
    pub(crate) fn new(app: &'a mut App) -> Self {
        Self { app }
    }

    pub(crate) fn show_explore(app: &mut App) {
        let enrolled: Vec<String> = app
            .enrollments
            .iter()
            .map(|enrollment| enrollment.course_id().to_string())
            .collect();
        app.explore.set_enrolled_ids(enrolled);
        app.view = AppView::Explore;
        Self::poll(app);
    }

    /// Fetch the current page if the filters or page changed. Called from the idle tick, so a burst
    /// of keystrokes produces one request.
    pub(crate) fn poll(app: &mut App) {
        let Some(query) = app.explore.take_pending_query() else {
            return;
        };
        app.requests.cancel(RequestKind::LoadExplore);
        log_debug(&format!("ExploreManager: fetching {:?}", query));
        app.dispatch(RequestKind::LoadExplore, move |client| async move {
            TaskOutcome::ExplorePage(client.explore_courses(&query).await)
        });
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent) {
        if self.app.explore.bar().is_editing() {
            self.handle_filter_key(key);
            return;
        }
        let explore = &mut self.app.explore;
        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Esc | KeyCode::Char('m')) => self.app.return_to_menu(),
            (KeyModifiers::NONE, KeyCode::Down | KeyCode::Char('j')) => explore.move_selection(1),
            (KeyModifiers::NONE, KeyCode::Up | KeyCode::Char('k')) => explore.move_selection(-1),
            (KeyModifiers::NONE, KeyCode::Right | KeyCode::Char(']')) => {
                explore.next_page();
            }
            (KeyModifiers::NONE, KeyCode::Left | KeyCode::Char('[')) => {
                explore.previous_page();
            }
            (KeyModifiers::NONE, KeyCode::Char('/')) => explore.set_filter_editing(true),
            (KeyModifiers::NONE, KeyCode::Char('x')) => explore.clear_filters(),
            (KeyModifiers::NONE, KeyCode::Char('r')) => explore.refresh(),
            (KeyModifiers::NONE, KeyCode::Enter) => self.open_selected(false),
            (KeyModifiers::NONE, KeyCode::Char('o')) => self.open_selected(true),
            _ => {}
        }
    }

    fn handle_filter_key(&mut self, key: KeyEvent) {
        let explore = &mut self.app.explore;
        match (key.modifiers, key.code) {
            (_, KeyCode::Esc | KeyCode::Enter) => explore.set_filter_editing(false),
            (_, KeyCode::Tab) => explore.next_field(),
            (_, KeyCode::Left) => explore.cycle_filter(-1),
            (_, KeyCode::Right) => explore.cycle_filter(1),
            (_, KeyCode::Backspace) => explore.pop_char(),
            (_, KeyCode::Delete) => explore.clear_filters(),
            (KeyModifiers::NONE | KeyModifiers::SHIFT, KeyCode::Char(ch)) => explore.push_char(ch),
            _ => {}
        }
    }

    fn open_selected(&mut self, full_course: bool) {
        let Some(course_id) = self
            .app
            .explore
            .selected_course()
            .map(|course| course.id.clone())
        else {
            return;
        };
        if full_course {
            CourseManager::open_course(self.app, course_id, AppView::Explore);
        } else {
            PreviewManager::open_preview(self.app, course_id, AppView::Explore);
        }
    }

    pub(crate) fn on_page_loaded(app: &mut App, result: Result<CoursePage, ApiError>) {
        if let Err(err) = app.explore.on_page_loaded(result) {
            app.report_error(err.to_string());
        }
    }
}
