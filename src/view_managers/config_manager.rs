use crate::{
    App, AppView,
    api_client::ApiClient,
    config::{self, ConfigForm},
    log_util::log_debug,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

pub(crate) struct ConfigManager<'a> {
    app: &'a mut App,
}

impl<'a> ConfigManager<'a> {
    pub(crate) fn new(app: &'a mut App) -> Self {
        Self { app }
    }

    pub(crate) fn show_config(&mut self) {
        self.app.config_form = ConfigForm::from_config(config::current());
        self.app
            .config_form
            .set_status("Enter edits the API URL, ←/→ toggles logging, s saves.");
        self.app.view = AppView::Config;
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent) {
        if self.app.config_form.is_editing_url() {
            self.handle_url_key(key);
            return;
        }
        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Down | KeyCode::Char('j')) => {
                self.app.config_form.select_next();
            }
            (KeyModifiers::NONE, KeyCode::Up | KeyCode::Char('k')) => {
                self.app.config_form.select_previous();
            }
            (KeyModifiers::NONE, KeyCode::Left | KeyCode::Right | KeyCode::Char(' ')) => {
                self.app.config_form.adjust_current();
            }
            (KeyModifiers::NONE, KeyCode::Enter) if self.app.config_form.is_url_selected() => {
                self.app.config_form.start_editing_url();
            }
            (KeyModifiers::NONE, KeyCode::Char('s')) | (KeyModifiers::NONE, KeyCode::Enter) => {
                self.save_config_changes();
            }
            (KeyModifiers::NONE, KeyCode::Char('r')) => self.reset_config_form(),
            (KeyModifiers::NONE, KeyCode::Char('m') | KeyCode::Esc) => self.app.return_to_menu(),
            _ => {}
        }
    }

    fn handle_url_key(&mut self, key: KeyEvent) {
        let form = &mut self.app.config_form;
        match (key.modifiers, key.code) {
            (_, KeyCode::Esc) => form.cancel_url_edit(),
            (_, KeyCode::Enter) => form.apply_url_edit(),
            (_, KeyCode::Backspace) => form.backspace_url(),
            (KeyModifiers::NONE | KeyModifiers::SHIFT, KeyCode::Char(ch)) => {
                form.push_url_char(ch)
            }
            _ => {}
        }
    }

    fn save_config_changes(&mut self) {
        if !self.app.config_form.dirty {
            self.app
                .config_form
                .set_status("No pending changes to save.");
            return;
        }

        let target_url = self.app.config_form.api_base_url.clone();
        let target_debug = self.app.config_form.debug_log;

        match config::update(|config| {
            config.api_base_url = target_url;
            config.debug_log = target_debug;
        }) {
            Ok(updated) => {
                if updated.api_base_url != self.app.client.api_base() {
                    self.app.client = ApiClient::new(updated.api_base_url.clone());
                    log_debug(&format!(
                        "App: API base switched to {}",
                        self.app.client.api_base()
                    ));
                }
                self.app.config_form.apply_saved(updated);
                self.app.config_form.set_status(format!(
                    "Saved configuration to {}",
                    config::config_file_path().display()
                ));
                log_debug("App: configuration saved");
            }
            Err(err) => {
                App::push_error(
                    &mut self.app.error,
                    format!("Failed to save configuration: {}", err),
                );
                self.app
                    .config_form
                    .set_status("Failed to save configuration. Check error panel.");
                log_debug(&format!("App: failed to save configuration: {}", err));
            }
        }
    }

    fn reset_config_form(&mut self) {
        let current = config::current();
        self.app.config_form = ConfigForm::from_config(current);
        self.app
            .config_form
            .set_status("Reverted to saved configuration values.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::offline_app;

    fn press(app: &mut App, code: KeyCode) {
        ConfigManager::new(app).handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn url_edit_mode_captures_typing_until_enter() {
        let mut app = offline_app();
        ConfigManager::new(&mut app).show_config();
        press(&mut app, KeyCode::Enter);
        assert!(app.config_form.is_editing_url());

        press(&mut app, KeyCode::Char('s'));
        assert!(app.config_form.url_buffer().ends_with('s'));
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Esc);
        assert!(!app.config_form.is_editing_url());
        assert!(!app.config_form.dirty);
    }

    #[test]
    fn saving_without_changes_reports_nothing_to_do() {
        let mut app = offline_app();
        ConfigManager::new(&mut app).show_config();
        press(&mut app, KeyCode::Char('s'));
        assert_eq!(
            app.config_form.status.as_deref(),
            Some("No pending changes to save.")
        );
    }
}
