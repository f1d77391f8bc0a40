use crate::{
    App, AppView,
    course_models::{AuthenticatedUser, LoginRequest, RegisterRequest, User},
    course_filters::ExploreController,
    course_wizard::CourseWizard,
    error::ApiError,
    log_util::log_debug,
    request_tracker::RequestKind,
    task_runner::TaskOutcome,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::{EnrollmentsManager, LibraryManager};

pub(crate) const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AuthMode {
    Login,
    Register,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AuthField {
    Name,
    Email,
    Password,
}

impl AuthField {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Email => "Email",
            Self::Password => "Password",
        }
    }
}

const LOGIN_FIELDS: [AuthField; 2] = [AuthField::Email, AuthField::Password];
const REGISTER_FIELDS: [AuthField; 3] = [AuthField::Name, AuthField::Email, AuthField::Password];

#[derive(Debug, Clone)]
pub(crate) struct AuthForm {
    pub(crate) mode: AuthMode,
    pub(crate) name: String,
    pub(crate) email: String,
    password: String,
    field_index: usize,
    pub(crate) error: Option<String>,
}

impl Default for AuthForm {
    fn default() -> Self {
        Self {
            mode: AuthMode::Login,
            name: String::new(),
            email: String::new(),
            password: String::new(),
            field_index: 0,
            error: None,
        }
    }
}

impl AuthForm {
    pub(crate) fn fields(&self) -> &'static [AuthField] {
        match self.mode {
            AuthMode::Login => &LOGIN_FIELDS,
            AuthMode::Register => &REGISTER_FIELDS,
        }
    }

    pub(crate) fn selected_field(&self) -> AuthField {
        let fields = self.fields();
        fields[self.field_index % fields.len()]
    }

    pub(crate) fn select_next(&mut self) {
        self.field_index = (self.field_index + 1) % self.fields().len();
    }

    pub(crate) fn select_previous(&mut self) {
        let len = self.fields().len();
        self.field_index = (self.field_index + len - 1) % len;
    }

    pub(crate) fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::Login => AuthMode::Register,
            AuthMode::Register => AuthMode::Login,
        };
        self.field_index = 0;
        self.error = None;
    }

    fn value_mut(&mut self, field: AuthField) -> &mut String {
        match field {
            AuthField::Name => &mut self.name,
            AuthField::Email => &mut self.email,
            AuthField::Password => &mut self.password,
        }
    }

    pub(crate) fn value(&self, field: AuthField) -> String {
        match field {
            AuthField::Name => self.name.clone(),
            AuthField::Email => self.email.clone(),
            AuthField::Password => "*".repeat(self.password.chars().count()),
        }
    }

    pub(crate) fn push_char(&mut self, ch: char) {
        let field = self.selected_field();
        self.value_mut(field).push(ch);
    }

    pub(crate) fn pop_char(&mut self) {
        let field = self.selected_field();
        self.value_mut(field).pop();
    }

    pub(crate) fn login_request(&self) -> Result<LoginRequest, String> {
        let email = self.email.trim();
        if email.is_empty() || self.password.is_empty() {
            return Err("Email and password are required.".to_string());
        }
        Ok(LoginRequest {
            email: email.to_string(),
            password: self.password.clone(),
        })
    }

    pub(crate) fn register_request(&self) -> Result<RegisterRequest, String> {
        let name = self.name.trim();
        let email = self.email.trim();
        if name.is_empty() || email.is_empty() || self.password.is_empty() {
            return Err("Name, email and password are required.".to_string());
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(format!(
                "Password must be at least {} characters long.",
                MIN_PASSWORD_LEN
            ));
        }
        Ok(RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: self.password.clone(),
        })
    }

    fn clear_secrets(&mut self) {
        self.password.clear();
    }
}

pub(crate) struct AuthManager<'a> {
    app: &'a mut App,
}

impl<'a> AuthManager<'a> {
    pub(crate) fn new(app: &'a mut App) -> Self {
        Self { app }
    }

    pub(crate) fn show_auth(app: &mut App) {
        app.auth_form.error = None;
        app.view = AppView::Auth;
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent) {
        match (key.modifiers, key.code) {
            (_, KeyCode::Esc) => self.app.return_to_menu(),
            (KeyModifiers::CONTROL, KeyCode::Char('r')) => self.app.auth_form.toggle_mode(),
            (_, KeyCode::Tab | KeyCode::Down) => self.app.auth_form.select_next(),
            (_, KeyCode::BackTab | KeyCode::Up) => self.app.auth_form.select_previous(),
            (_, KeyCode::Backspace) => self.app.auth_form.pop_char(),
            (_, KeyCode::Enter) => self.submit(),
            (KeyModifiers::NONE | KeyModifiers::SHIFT, KeyCode::Char(ch)) => {
                self.app.auth_form.push_char(ch)
            }
            _ => {}
        }
    }

    fn submit(&mut self) {
        let form = &mut self.app.auth_form;
        match form.mode {
            AuthMode::Login => match form.login_request() {
                Ok(request) => {
                    form.error = None;
                    log_debug(&format!("AuthManager: logging in as {}", request.email));
                    self.app.dispatch(RequestKind::Login, move |client| async move {
                        TaskOutcome::Authenticated(client.login(&request).await)
                    });
                }
                Err(message) => form.error = Some(message),
            },
            AuthMode::Register => match form.register_request() {
                Ok(request) => {
                    form.error = None;
                    log_debug(&format!("AuthManager: registering {}", request.email));
                    self.app.dispatch(RequestKind::Register, move |client| async move {
                        TaskOutcome::Authenticated(client.register(&request).await)
                    });
                }
                Err(message) => form.error = Some(message),
            },
        }
    }

    pub(crate) fn on_authenticated(app: &mut App, result: Result<AuthenticatedUser, ApiError>) {
        let established = result.and_then(|auth| {
            app.sessions
                .establish(auth)
                .map(|session| session.display_name().to_string())
        });
        match established {
            Ok(name) => {
                app.auth_form = AuthForm::default();
                app.notify(format!("Welcome, {}!", name));
                app.view = AppView::Menu;
                EnrollmentsManager::load_enrollments(app);
            }
            Err(err) => {
                app.auth_form.clear_secrets();
                app.auth_form.error = Some(err.to_string());
                app.report_error(err.to_string());
            }
        }
    }

    /// Validate a token saved by a previous run. Failure clears it without retrying.
    pub(crate) fn restore_session(app: &mut App) {
        let Some(token) = app.sessions.stored_token() else {
            return;
        };
        let session = app.sessions.restore(token).clone();
        log_debug("AuthManager: validating stored session");
        app.dispatch(RequestKind::RestoreSession, move |client| async move {
            TaskOutcome::SessionRestored(client.profile(&session).await)
        });
    }

    pub(crate) fn on_session_restored(app: &mut App, result: Result<User, ApiError>) {
        match result {
            Ok(user) => {
                app.notify(format!("Signed in as {}", user.name));
                app.sessions.confirm_user(user);
                EnrollmentsManager::load_enrollments(app);
            }
            Err(err) => {
                log_debug(&format!(
                    "AuthManager: stored session rejected: {}",
                    err.log_detail()
                ));
                app.sessions.logout();
                app.report_error("Saved session is no longer valid. Please log in.");
            }
        }
    }

    /// Drop the session and everything fetched with it.
    pub(crate) fn logout(app: &mut App, reason: Option<&str>) {
        app.requests.cancel_all();
        app.sessions.logout();
        app.wizard = CourseWizard::new();
        app.library = Default::default();
        app.pending_delete = None;
        app.enrollments.clear();
        app.enrollment_index = 0;
        app.course_screen = None;
        app.explore = ExploreController::default();
        LibraryManager::reset_edit(app);
        match reason {
            Some(reason) => {
                app.report_error(reason);
                Self::show_auth(app);
            }
            None => {
                app.notify("Signed out.");
                app.view = AppView::Menu;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{complete, offline_app};

    fn typed(form: &mut AuthForm, text: &str) {
        text.chars().for_each(|ch| form.push_char(ch));
    }

    #[test]
    fn login_requires_email_and_password() {
        let mut form = AuthForm::default();
        assert!(form.login_request().is_err());
        typed(&mut form, "ada@example.com");
        form.select_next();
        typed(&mut form, "secret");
        let request = form.login_request().unwrap();
        assert_eq!(request.email, "ada@example.com");
        assert_eq!(request.password, "secret");
        assert_eq!(form.value(AuthField::Password), "******");
    }

    #[test]
    fn registration_enforces_minimum_password_length() {
        let mut form = AuthForm::default();
        form.toggle_mode();
        assert_eq!(form.selected_field(), AuthField::Name);
        typed(&mut form, "Ada");
        form.select_next();
        typed(&mut form, "ada@example.com");
        form.select_next();
        typed(&mut form, "abc");
        assert_eq!(
            form.register_request().unwrap_err(),
            "Password must be at least 6 characters long."
        );
        typed(&mut form, "def");
        assert!(form.register_request().is_ok());
    }

    #[test]
    fn successful_login_establishes_session_and_returns_to_menu() {
        let mut app = offline_app();
        app.view = AppView::Auth;
        complete(
            &mut app,
            RequestKind::Login,
            TaskOutcome::Authenticated(Ok(AuthenticatedUser {
                user: User {
                    id: "u1".into(),
                    name: "Ada".into(),
                    email: "ada@example.com".into(),
                    role: "user".into(),
                },
                token: Some("jwt".into()),
            })),
        );
        assert!(app.sessions.is_signed_in());
        assert_eq!(app.view, AppView::Menu);
        assert_eq!(app.status.as_deref(), Some("Welcome, Ada!"));
        assert!(app.is_loading(RequestKind::LoadEnrollments));
    }

    #[test]
    fn rejected_stored_token_leaves_app_signed_out() {
        let mut app = offline_app();
        app.sessions.restore("stale".into());
        complete(
            &mut app,
            RequestKind::RestoreSession,
            TaskOutcome::SessionRestored(Err(ApiError::Unauthorized("jwt expired".into()))),
        );
        assert!(!app.sessions.is_signed_in());
        assert!(!app.is_loading(RequestKind::RestoreSession));
    }
}
