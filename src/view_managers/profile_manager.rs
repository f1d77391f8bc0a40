use super::auth_manager::MIN_PASSWORD_LEN;
use crate::{
    App, AppView,
    course_models::{ProfileUpdate, User},
    error::ApiError,
    log_util::log_debug,
    request_tracker::RequestKind,
    task_runner::TaskOutcome,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProfileField {
    Name,
    Email,
    NewPassword,
    ConfirmPassword,
}

impl ProfileField {
    pub(crate) const ALL: [ProfileField; 4] = [
        Self::Name,
        Self::Email,
        Self::NewPassword,
        Self::ConfirmPassword,
    ];

    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Email => "Email",
            Self::NewPassword => "New password",
            Self::ConfirmPassword => "Confirm password",
        }
    }

    fn is_secret(self) -> bool {
        matches!(self, Self::NewPassword | Self::ConfirmPassword)
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ProfileForm {
    name: String,
    email: String,
    new_password: String,
    confirm_password: String,
    field_index: usize,
    pub(crate) error: Option<String>,
}

impl ProfileForm {
    pub(crate) fn from_user(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
            ..Self::default()
        }
    }

    pub(crate) fn selected_field(&self) -> ProfileField {
        ProfileField::ALL[self.field_index % ProfileField::ALL.len()]
    }

    pub(crate) fn select_next(&mut self) {
        self.field_index = (self.field_index + 1) % ProfileField::ALL.len();
    }

    pub(crate) fn select_previous(&mut self) {
        let len = ProfileField::ALL.len();
        self.field_index = (self.field_index + len - 1) % len;
    }

    fn value_mut(&mut self, field: ProfileField) -> &mut String {
        match field {
            ProfileField::Name => &mut self.name,
            ProfileField::Email => &mut self.email,
            ProfileField::NewPassword => &mut self.new_password,
            ProfileField::ConfirmPassword => &mut self.confirm_password,
        }
    }

    /// Display text; passwords are masked.
    pub(crate) fn value(&self, field: ProfileField) -> String {
        let raw = match field {
            ProfileField::Name => &self.name,
            ProfileField::Email => &self.email,
            ProfileField::NewPassword => &self.new_password,
            ProfileField::ConfirmPassword => &self.confirm_password,
        };
        if field.is_secret() {
            "*".repeat(raw.chars().count())
        } else {
            raw.clone()
        }
    }

    pub(crate) fn push_char(&mut self, ch: char) {
        let field = self.selected_field();
        self.value_mut(field).push(ch);
        self.error = None;
    }

    pub(crate) fn pop_char(&mut self) {
        let field = self.selected_field();
        self.value_mut(field).pop();
    }

    /// The password is only sent when a new one was typed.
    pub(crate) fn update_request(&self) -> Result<ProfileUpdate, String> {
        let name = self.name.trim();
        let email = self.email.trim();
        if name.is_empty() || email.is_empty() {
            return Err("Name and email are required.".to_string());
        }
        let password = if self.new_password.is_empty() && self.confirm_password.is_empty() {
            None
        } else {
            if self.new_password != self.confirm_password {
                return Err("New passwords do not match.".to_string());
            }
            if self.new_password.chars().count() < MIN_PASSWORD_LEN {
                return Err(format!(
                    "Password must be at least {} characters long.",
                    MIN_PASSWORD_LEN
                ));
            }
            Some(self.new_password.clone())
        };
        Ok(ProfileUpdate {
            name: name.to_string(),
            email: email.to_string(),
            password,
        })
    }
}

pub(crate) struct ProfileManager<'a> {
    app: &'a mut App,
}

impl<'a> ProfileManager<'a> {
    pub(crate) fn new(app: &'a mut App) -> Self {
        Self { app }
    }

    pub(crate) fn show_profile(app: &mut App) {
        let Some(session) = app.require_session() else {
            return;
        };
        app.profile_form = session
            .user()
            .map(ProfileForm::from_user)
            .unwrap_or_default();
        app.view = AppView::Profile;
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent) {
        let form = &mut self.app.profile_form;
        match (key.modifiers, key.code) {
            (_, KeyCode::Esc) => self.app.return_to_menu(),
            (_, KeyCode::Tab | KeyCode::Down) => form.select_next(),
            (_, KeyCode::BackTab | KeyCode::Up) => form.select_previous(),
            (_, KeyCode::Backspace) => form.pop_char(),
            (_, KeyCode::Enter) => self.submit(),
            (KeyModifiers::NONE | KeyModifiers::SHIFT, KeyCode::Char(ch)) => form.push_char(ch),
            _ => {}
        }
    }

    fn submit(&mut self) {
        let update = match self.app.profile_form.update_request() {
            Ok(update) => update,
            Err(message) => {
                self.app.profile_form.error = Some(message.clone());
                self.app.report_error(message);
                return;
            }
        };
        let Some(session) = self.app.require_session() else {
            return;
        };
        log_debug("ProfileManager: saving profile");
        self.app
            .dispatch(RequestKind::UpdateProfile, move |client| async move {
                TaskOutcome::ProfileUpdated(client.update_profile(&session, &update).await)
            });
    }

    pub(crate) fn on_profile_updated(app: &mut App, result: Result<User, ApiError>) {
        match result {
            Ok(user) => {
                app.profile_form = ProfileForm::from_user(&user);
                app.sessions.confirm_user(user);
                app.notify("Profile updated successfully.");
            }
            Err(err) => {
                app.profile_form.error = Some(err.to_string());
                app.report_error(err.to_string());
            }
        }
    }
}
