mod api_client;
mod config;
mod content_text;
mod course_filters;
mod course_models;
mod course_wizard;
mod error;
mod log_util;
mod perceived_progress;
mod progress_tracker;
mod request_tracker;
mod session_manager;
mod task_runner;
mod token_store;
mod ui_renderer;
mod view_managers;

use api_client::ApiClient;
use color_eyre::Result;
use config::ConfigForm;
use course_filters::{ExploreController, LibraryController};
use course_models::Enrollment;
use course_wizard::CourseWizard;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use dotenvy::dotenv;
use log_util::log_debug;
use ratatui::{DefaultTerminal, Frame};
use request_tracker::{RequestKind, RequestTracker};
use session_manager::{Session, SessionManager};
use std::{future::Future, time::Duration};
use task_runner::{TaskMessage, TaskOutcome, TaskRunner};
use token_store::TokenStore;
use ui_renderer::UiRenderer;
use view_managers::{
    AuthForm, AuthManager, ConfigManager, CourseEditForm, CourseManager, CourseScreen,
    EnrollmentsManager, ExploreManager, LibraryManager, MenuManager, PreviewManager, PreviewScreen, ProfileForm,
    ProfileManager, WizardManager,
};

pub(crate) const LOADING_FRAMES: [&str; 4] = ["-", "\\", "|", "/"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AppView {
    Menu,
    Auth,
    Library,
    Explore,
    Enrollments,
    Wizard,
    Course,
    Preview,
    Profile,
    Config,
}

fn main() -> color_eyre::Result<()> {
    dotenv().ok();
    color_eyre::install()?;
    let app = App::new()?;
    let terminal = ratatui::init();
    let result = app.run(terminal);
    ratatui::restore();
    result
}

/// The main application which holds the state and logic of the application.
#[derive(Debug)]
pub struct App {
    /// Is the application running?
    pub(crate) running: bool,
    /// Current view being displayed.
    pub(crate) view: AppView,
    /// Currently selected index in the main menu.
    pub(crate) menu_index: usize,
    /// Latest failure, shown on the status line until the next notification.
    pub(crate) error: Option<String>,
    /// Latest success or informational message.
    pub(crate) status: Option<String>,
    /// Spinner frame index for in-flight requests.
    pub(crate) loading_frame: usize,
    pub(crate) client: ApiClient,
    runner: TaskRunner,
    pub(crate) requests: RequestTracker,
    pub(crate) sessions: SessionManager,
    pub(crate) auth_form: AuthForm,
    pub(crate) profile_form: ProfileForm,
    pub(crate) wizard: CourseWizard,
    pub(crate) library: LibraryController,
    /// Course id awaiting a second key press before it is deleted.
    pub(crate) pending_delete: Option<String>,
    pub(crate) course_edit: Option<CourseEditForm>,
    pub(crate) explore: ExploreController,
    pub(crate) enrollments: Vec<Enrollment>,
    pub(crate) enrollment_index: usize,
    pub(crate) course_screen: Option<CourseScreen>,
    pub(crate) preview_screen: Option<PreviewScreen>,
    /// View to return to when the course or preview screen closes.
    pub(crate) return_view: AppView,
    pub(crate) config_form: ConfigForm,
    /// Result of the last health check.
    pub(crate) server_status: Option<String>,
}

impl App {
    /// Construct a new instance of [`App`].
    pub fn new() -> Result<Self> {
        let mut aggregated_error: Option<String> = None;

        if let Err(err) = config::initialize() {
            Self::push_error(
                &mut aggregated_error,
                format!("Configuration load failed: {}", err),
            );
        }

        let store = match TokenStore::open_default() {
            Ok(store) => Some(store),
            Err(err) => {
                Self::push_error(
                    &mut aggregated_error,
                    format!("Token storage unavailable: {}", err),
                );
                None
            }
        };

        let mut app = Self::with_services(
            ApiClient::from_config(),
            TaskRunner::new()?,
            SessionManager::new(store),
        );
        app.error = aggregated_error;
        log_debug(&format!("App: using API at {}", app.client.api_base()));
        Ok(app)
    }

    pub(crate) fn with_services(
        client: ApiClient,
        runner: TaskRunner,
        sessions: SessionManager,
    ) -> Self {
        Self {
            running: false,
            view: AppView::Menu,
            menu_index: 0,
            error: None,
            status: None,
            loading_frame: 0,
            client,
            runner,
            requests: RequestTracker::new(),
            sessions,
            auth_form: AuthForm::default(),
            profile_form: ProfileForm::default(),
            wizard: CourseWizard::new(),
            library: LibraryController::default(),
            pending_delete: None,
            course_edit: None,
            explore: ExploreController::default(),
            enrollments: Vec::new(),
            enrollment_index: 0,
            course_screen: None,
            preview_screen: None,
            return_view: AppView::Menu,
            config_form: ConfigForm::from_config(config::current()),
            server_status: None,
        }
    }

    /// Run the application's main loop.
    pub fn run(mut self, mut terminal: DefaultTerminal) -> Result<()> {
        self.running = true;
        AuthManager::restore_session(&mut self);
        let tick_rate = Duration::from_millis(120);
        while self.running {
            self.poll_tasks();
            terminal.draw(|frame| self.render(frame))?;
            self.handle_crossterm_events(tick_rate)?;
        }
        Ok(())
    }

    /// Dispatch rendering based on the active view.
    fn render(&mut self, frame: &mut Frame) {
        UiRenderer::new(self).render(frame);
    }

    /// Reads the crossterm events and updates the state of [`App`].
    fn handle_crossterm_events(&mut self, tick_rate: Duration) -> Result<()> {
        if event::poll(tick_rate)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => self.on_key_event(key),
                Event::Mouse(_) => {}
                Event::Resize(_, _) => {}
                _ => {}
            }
            self.poll_tasks();
        } else {
            self.on_tick();
        }
        Ok(())
    }

    fn on_tick(&mut self) {
        if self.requests.pending_count() > 0 {
            self.loading_frame = (self.loading_frame + 1) % LOADING_FRAMES.len();
        }
        self.wizard.tick(&mut rand::rng());
        if self.view == AppView::Explore {
            ExploreManager::poll(self);
        }
        self.poll_tasks();
    }

    /// Handles the key events and updates the state of [`App`].
    fn on_key_event(&mut self, key: KeyEvent) {
        if let (KeyModifiers::CONTROL, KeyCode::Char('c') | KeyCode::Char('C')) =
            (key.modifiers, key.code)
        {
            self.quit();
            return;
        }
        match self.view {
            AppView::Menu => MenuManager::new(self).handle_key(key),
            AppView::Auth => AuthManager::new(self).handle_key(key),
            AppView::Library => LibraryManager::new(self).handle_key(key),
            AppView::Explore => ExploreManager::new(self).handle_key(key),
            AppView::Enrollments => EnrollmentsManager::new(self).handle_key(key),
            AppView::Wizard => WizardManager::new(self).handle_key(key),
            AppView::Course => CourseManager::new(self).handle_key(key),
            AppView::Preview => PreviewManager::new(self).handle_key(key),
            AppView::Profile => ProfileManager::new(self).handle_key(key),
            AppView::Config => ConfigManager::new(self).handle_key(key),
        }
    }

    /// Start `kind` on the task runner unless a request of that kind is already in flight.
    pub(crate) fn dispatch<F, Fut>(&mut self, kind: RequestKind, task: F) -> bool
    where
        F: FnOnce(ApiClient) -> Fut,
        Fut: Future<Output = TaskOutcome> + Send + 'static,
    {
        let Some(ticket) = self.requests.begin(kind) else {
            log_debug(&format!("App: {:?} already in flight; ignoring", kind));
            return false;
        };
        log_debug(&format!("App: dispatching {:?}", kind));
        self.runner.spawn(ticket, task(self.client.clone()));
        true
    }

    pub(crate) fn is_loading(&self, kind: RequestKind) -> bool {
        self.requests.is_in_flight(kind)
    }

    /// Active session, cloned for a background call.
    pub(crate) fn session(&self) -> Option<Session> {
        self.sessions.current().cloned()
    }

    /// Like [`Self::session`], but reports the missing login on the status line.
    pub(crate) fn require_session(&mut self) -> Option<Session> {
        let session = self.session();
        if session.is_none() {
            self.report_error(error::ApiError::not_signed_in().to_string());
        }
        session
    }

    fn poll_tasks(&mut self) {
        for message in self.runner.drain() {
            self.handle_task_message(message);
        }
    }

    pub(crate) fn handle_task_message(&mut self, message: TaskMessage) {
        let TaskMessage { ticket, outcome } = message;
        if !self.requests.finish(ticket) {
            log_debug(&format!("App: dropping stale {:?} result", ticket.kind));
            return;
        }
        if let Some(err) = outcome.error() {
            log_debug(&format!("App: {:?} failed: {}", ticket.kind, err.log_detail()));
        }
        let session_rejected = outcome.error().is_some_and(|err| err.is_auth_failure())
            && !matches!(
                ticket.kind,
                RequestKind::Login | RequestKind::Register | RequestKind::RestoreSession
            )
            && self.sessions.is_signed_in();

        match outcome {
            TaskOutcome::Health(result) => MenuManager::on_health(self, result),
            TaskOutcome::Authenticated(result) => AuthManager::on_authenticated(self, result),
            TaskOutcome::SessionRestored(result) => AuthManager::on_session_restored(self, result),
            TaskOutcome::ProfileUpdated(result) => ProfileManager::on_profile_updated(self, result),
            TaskOutcome::Layout(result) => WizardManager::on_layout(self, result),
            TaskOutcome::CourseCreated(result) => WizardManager::on_created(self, result),
            TaskOutcome::Library(result) => LibraryManager::on_library_loaded(self, result),
            TaskOutcome::CourseUpdated(result) => LibraryManager::on_course_updated(self, result),
            TaskOutcome::CourseDeleted { course_id, result } => {
                LibraryManager::on_course_deleted(self, course_id, result)
            }
            TaskOutcome::ExplorePage(result) => ExploreManager::on_page_loaded(self, result),
            TaskOutcome::Enrollments(result) => {
                EnrollmentsManager::on_enrollments_loaded(self, result)
            }
            TaskOutcome::EnrollmentUpdated(result) => {
                EnrollmentsManager::on_enrollment_updated(self, result)
            }
            TaskOutcome::Unenrolled { course_id, result } => {
                EnrollmentsManager::on_unenrolled(self, course_id, result)
            }
            TaskOutcome::CourseLoaded(result) => CourseManager::on_course_loaded(self, result),
            TaskOutcome::EnrollmentLoaded(result) => {
                CourseManager::on_enrollment_loaded(self, result)
            }
            TaskOutcome::Enrolled(result) => CourseManager::on_enrolled(self, result),
            TaskOutcome::TopicCompleted(result) => CourseManager::on_topic_completed(self, result),
            TaskOutcome::Preview(result) => PreviewManager::on_preview_loaded(self, result),
        }

        if session_rejected {
            AuthManager::logout(self, Some("Your session has expired. Please log in again."));
        }
    }

    /// Replace the status line with a success or informational message.
    pub(crate) fn notify<S: Into<String>>(&mut self, message: S) {
        self.error = None;
        self.status = Some(message.into());
    }

    /// Replace the status line with a failure.
    pub(crate) fn report_error<S: Into<String>>(&mut self, message: S) {
        self.status = None;
        self.error = Some(message.into());
    }

    pub(crate) fn return_to_menu(&mut self) {
        if matches!(self.view, AppView::Config) {
            self.config_form = ConfigForm::from_config(config::current());
        }
        self.view = AppView::Menu;
    }

    /// Set running to false to quit the application.
    pub(crate) fn quit(&mut self) {
        self.running = false;
    }

    /// Append a message to an optional error slot.
    pub(crate) fn push_error(slot: &mut Option<String>, message: String) {
        if let Some(existing) = slot {
            existing.push_str(" | ");
            existing.push_str(&message);
        } else {
            *slot = Some(message);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::error::ApiError;

    #[test]
    fn unauthorized_response_logs_the_user_out() {
        let mut app = signed_in_app();
        app.view = AppView::Library;
        complete(
            &mut app,
            RequestKind::LoadLibrary,
            TaskOutcome::Library(Err(ApiError::Unauthorized("Token expired".into()))),
        );
        assert!(!app.sessions.is_signed_in());
        assert_eq!(app.view, AppView::Auth);
        assert_eq!(
            app.error.as_deref(),
            Some("Your session has expired. Please log in again.")
        );
    }

    #[test]
    fn cancelled_requests_do_not_reach_the_screen() {
        let mut app = signed_in_app();
        let ticket = app.requests.begin(RequestKind::LoadLibrary).unwrap();
        app.requests.cancel(RequestKind::LoadLibrary);
        app.handle_task_message(TaskMessage {
            ticket,
            outcome: TaskOutcome::Library(Ok(vec![load_course(
                "test_fixtures/course_with_generated_chapters.json",
            )])),
        });
        assert!(!app.library.is_loaded());
    }

    #[test]
    fn dispatch_refuses_a_second_request_of_the_same_kind() {
        let mut app = offline_app();
        assert!(app.dispatch(RequestKind::HealthCheck, |client| async move {
            TaskOutcome::Health(client.health().await)
        }));
        assert!(!app.dispatch(RequestKind::HealthCheck, |client| async move {
            TaskOutcome::Health(client.health().await)
        }));
        assert!(app.is_loading(RequestKind::HealthCheck));
    }
}
