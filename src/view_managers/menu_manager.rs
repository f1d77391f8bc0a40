use super::{
    AuthManager, ConfigManager, EnrollmentsManager, ExploreManager, LibraryManager,
    ProfileManager, WizardManager,
};
use crate::{App, error::ApiError, request_tracker::RequestKind, task_runner::TaskOutcome};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

pub(crate) const MENU_OPTIONS: [&str; 8] = [
    "1. Sign in / Sign out",
    "2. My courses",
    "3. Create a course",
    "4. Explore courses",
    "5. My enrollments",
    "6. Profile",
    "7. Settings",
    "8. Check server health",
];

pub(crate) struct MenuManager<'a> {
    app: &'a mut App,
}

impl<'a> MenuManager<'a> {
    pub(crate) fn new(app: &'a mut App) -> Self {
        Self { app }
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent) {
        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Down | KeyCode::Char('j')) => self.menu_next(),
            (KeyModifiers::NONE, KeyCode::Up | KeyCode::Char('k')) => self.menu_previous(),
            (KeyModifiers::NONE, KeyCode::Enter) => self.activate_menu_option(),
            (KeyModifiers::NONE, KeyCode::Char(digit @ '1'..='8')) => {
                self.app.menu_index = digit as usize - '1' as usize;
                self.activate_menu_option();
            }
            (KeyModifiers::NONE, KeyCode::Char('q')) => self.app.quit(),
            _ => {}
        }
    }

    fn menu_next(&mut self) {
        self.app.menu_index = (self.app.menu_index + 1) % MENU_OPTIONS.len();
    }

    fn menu_previous(&mut self) {
        if self.app.menu_index == 0 {
            self.app.menu_index = MENU_OPTIONS.len() - 1;
        } else {
            self.app.menu_index -= 1;
        }
    }

    fn activate_menu_option(&mut self) {
        match self.app.menu_index {
            0 if self.app.sessions.is_signed_in() => AuthManager::logout(self.app, None),
            0 => AuthManager::show_auth(self.app),
            1 => LibraryManager::show_library(self.app),
            2 => WizardManager::show_wizard(self.app),
            3 => ExploreManager::show_explore(self.app),
            4 => EnrollmentsManager::show_enrollments(self.app),
            5 => ProfileManager::show_profile(self.app),
            6 => ConfigManager::new(self.app).show_config(),
            7 => self.check_health(),
            _ => {}
        }
    }

    fn check_health(&mut self) {
        self.app.server_status = Some("Checking...".to_string());
        self.app.dispatch(RequestKind::HealthCheck, |client| async move {
            TaskOutcome::Health(client.health().await)
        });
    }

    pub(crate) fn on_health(app: &mut App, result: Result<String, ApiError>) {
        match result {
            Ok(message) => {
                app.server_status = Some(format!("Online: {}", message));
                app.notify("Server is reachable.");
            }
            Err(err) => {
                app.server_status = Some(format!("Offline: {}", err));
                app.report_error(err.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        AppView,
        test_support::{complete, offline_app, signed_in_app},
    };

    fn press(app: &mut App, code: KeyCode) {
        MenuManager::new(app).handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn menu_wraps_in_both_directions() {
        let mut app = offline_app();
        press(&mut app, KeyCode::Up);
        assert_eq!(app.menu_index, MENU_OPTIONS.len() - 1);
        press(&mut app, KeyCode::Down);
        assert_eq!(app.menu_index, 0);
    }

    #[test]
    fn first_option_toggles_between_sign_in_and_sign_out() {
        let mut app = offline_app();
        press(&mut app, KeyCode::Char('1'));
        assert_eq!(app.view, AppView::Auth);

        let mut app = signed_in_app();
        press(&mut app, KeyCode::Char('1'));
        assert!(!app.sessions.is_signed_in());
        assert_eq!(app.view, AppView::Menu);
    }

    #[test]
    fn health_result_updates_server_status() {
        let mut app = offline_app();
        complete(
            &mut app,
            RequestKind::HealthCheck,
            TaskOutcome::Health(Err(ApiError::Network("connection refused".into()))),
        );
        assert_eq!(app.server_status.as_deref(), Some("Offline: Network error"));
    }
}
