pub mod auth_manager;
pub mod config_manager;
pub mod course_manager;
pub mod enrollments_manager;
pub mod explore_manager;
pub mod library_manager;
pub mod menu_manager;
pub mod preview_manager;
pub mod profile_manager;
pub mod wizard_manager;

pub(crate) use auth_manager::{AuthForm, AuthManager};
pub(crate) use config_manager::ConfigManager;
pub(crate) use course_manager::{CourseManager, CourseScreen};
pub(crate) use enrollments_manager::EnrollmentsManager;
pub(crate) use explore_manager::ExploreManager;
pub(crate) use library_manager::{CourseEditForm, LibraryManager};
pub(crate) use menu_manager::MenuManager;
pub(crate) use preview_manager::{PreviewManager, PreviewScreen};
pub(crate) use profile_manager::{ProfileForm, ProfileManager};
pub(crate) use wizard_manager::WizardManager;
