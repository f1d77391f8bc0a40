use crate::view_managers::{
    auth_manager::AuthMode, library_manager::EditField, menu_manager::MENU_OPTIONS,
    profile_manager::ProfileField,
};
use crate::{
    App, AppView, LOADING_FRAMES, config,
    content_text::{estimated_minutes, html_to_text, youtube_video_id},
    course_filters::{FilterBar, FilterField},
    course_models::{Course, CourseLayout, TopicKey},
    course_wizard::{CreateMode, DraftField, WizardStep},
    progress_tracker::ProgressTracker,
    request_tracker::RequestKind,
    view_managers::{CourseScreen, EnrollmentsManager, PreviewScreen},
};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style, Stylize},
    text::Line,
    widgets::{Block, Gauge, List, ListItem, ListState, Paragraph, Wrap},
};
use std::rc::Rc;

pub(crate) struct UiRenderer<'a> {
    app: &'a mut App,
}

impl<'a> UiRenderer<'a> {
    pub(crate) fn new(app: &'a mut App) -> Self {
        Self { app }
    }

    pub(crate) fn render(&mut self, frame: &mut Frame) {
        match self.app.view {
            AppView::Menu => self.render_menu(frame),
            AppView::Auth => self.render_auth(frame),
            AppView::Library => self.render_library(frame),
            AppView::Explore => self.render_explore(frame),
            AppView::Enrollments => self.render_enrollments(frame),
            AppView::Wizard => self.render_wizard(frame),
            AppView::Course => self.render_course(frame),
            AppView::Preview => self.render_preview(frame),
            AppView::Profile => self.render_profile(frame),
            AppView::Config => self.render_config(frame),
        }
    }

    fn render_menu(&mut self, frame: &mut Frame) {
        let app = &*self.app;
        let layout = Self::screen_layout(frame);
        Self::render_header(frame, layout[0], app, "Main menu");

        let items: Vec<ListItem> = MENU_OPTIONS
            .iter()
            .enumerate()
            .map(|(index, label)| match index {
                0 if app.sessions.is_signed_in() => ListItem::new("1. Sign out"),
                0 => ListItem::new("1. Sign in"),
                _ => ListItem::new(*label),
            })
            .collect();
        let mut state = ListState::default();
        state.select(Some(app.menu_index));

        let body = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(6), Constraint::Length(3)])
            .split(layout[1]);

        frame.render_stateful_widget(
            List::new(items)
                .block(Block::bordered().title(Line::from("Actions")))
                .highlight_symbol("▶ ")
                .highlight_style(Style::default().add_modifier(Modifier::REVERSED)),
            body[0],
            &mut state,
        );
        frame.render_widget(
            Paragraph::new(
                app.server_status
                    .as_deref()
                    .unwrap_or("Not checked yet. Press 8 to check."),
            )
            .block(Block::bordered().title(Line::from("Server"))),
            body[1],
        );

        Self::render_status(
            frame,
            layout[2],
            app,
            &[
                "Use ↑/↓ or j/k to choose. Press Enter or 1-8 to select.",
                "Press q or Ctrl-C to quit.",
            ],
        );
    }

    fn render_auth(&mut self, frame: &mut Frame) {
        let app = &*self.app;
        let form = &app.auth_form;
        let layout = Self::screen_layout(frame);
        let title = match form.mode {
            AuthMode::Login => "Sign in",
            AuthMode::Register => "Create an account",
        };
        Self::render_header(frame, layout[0], app, title);

        let items: Vec<ListItem> = form
            .fields()
            .iter()
            .map(|field| ListItem::new(format!("{:<10} {}", field.label(), form.value(*field))))
            .collect();
        let mut state = ListState::default();
        state.select(form.fields().iter().position(|field| *field == form.selected_field()));

        frame.render_stateful_widget(
            List::new(items)
                .block(Block::bordered().title(Line::from(title)))
                .highlight_symbol("▶ ")
                .highlight_style(Style::default().add_modifier(Modifier::REVERSED)),
            layout[1],
            &mut state,
        );

        let mut hints = Vec::new();
        if let Some(error) = form.error.as_deref() {
            hints.push(error);
        }
        hints.push("Tab/↑/↓ move between fields. Enter submits. Esc returns to the menu.");
        hints.push(match form.mode {
            AuthMode::Login => "No account yet? Press Ctrl-R to register.",
            AuthMode::Register => "Already registered? Press Ctrl-R to sign in.",
        });
        Self::render_status(frame, layout[2], app, &hints);
    }

    fn render_library(&mut self, frame: &mut Frame) {
        let app = &*self.app;
        let layout = Self::screen_layout(frame);
        Self::render_header(frame, layout[0], app, "My courses");

        let body = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(4)])
            .split(layout[1]);
        Self::render_filter_bar(frame, body[0], app.library.bar());

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(body[1]);

        let visible = app.library.visible();
        let items: Vec<ListItem> = if !app.library.is_loaded() {
            vec![ListItem::new(format!("{} Loading your courses…", Self::spinner(app)))]
        } else if visible.is_empty() && app.library.total_count() == 0 {
            vec![ListItem::new("No courses yet. Press n to create one.")]
        } else if visible.is_empty() {
            vec![ListItem::new("No courses match the current filters.")]
        } else {
            visible.iter().map(|course| Self::course_row(course)).collect()
        };
        let mut state = ListState::default();
        if !visible.is_empty() {
            state.select(Some(app.library.selected_index()));
        }
        frame.render_stateful_widget(
            List::new(items)
                .block(Block::bordered().title(Line::from(format!(
                    "Courses ({}/{})",
                    visible.len(),
                    app.library.total_count()
                ))))
                .highlight_symbol("▶ ")
                .highlight_style(Style::default().add_modifier(Modifier::REVERSED)),
            columns[0],
            &mut state,
        );

        let detail = match (&app.course_edit, app.library.selected_course()) {
            (Some(form), _) => {
                let marker = |field: EditField| if form.field == field { "▶" } else { " " };
                format!(
                    "Editing course\n\n{} Name: {}\n{} Description: {}\n\nTab switches field, Enter saves, Esc cancels.",
                    marker(EditField::Name),
                    form.name,
                    marker(EditField::Description),
                    form.description
                )
            }
            (None, Some(course)) => Self::course_details(course),
            (None, None) => "Select a course to see its details.".to_string(),
        };
        frame.render_widget(
            Paragraph::new(detail)
                .wrap(Wrap { trim: false })
                .block(Block::bordered().title(Line::from("Details"))),
            columns[1],
        );

        Self::render_status(
            frame,
            layout[2],
            app,
            &[
                "Enter open • n new • e edit • s cycle status • d delete • r reload • m menu",
                "/ edit filters (Tab field, ←/→ cycle, Esc done) • x clear filters",
            ],
        );
    }

    fn render_explore(&mut self, frame: &mut Frame) {
        let app = &*self.app;
        let explore = &app.explore;
        let layout = Self::screen_layout(frame);
        Self::render_header(frame, layout[0], app, "Explore courses");

        let body = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(4),
                Constraint::Length(3),
            ])
            .split(layout[1]);
        Self::render_filter_bar(frame, body[0], explore.bar());

        let visible = explore.visible();
        let items: Vec<ListItem> = if visible.is_empty() {
            if app.is_loading(RequestKind::LoadExplore) {
                vec![ListItem::new(format!("{} Loading courses…", Self::spinner(app)))]
            } else {
                vec![ListItem::new("No courses found. Try different filters.")]
            }
        } else {
            visible.iter().map(|course| Self::course_row(course)).collect()
        };
        let mut state = ListState::default();
        if !visible.is_empty() {
            state.select(Some(explore.selected_index()));
        }
        frame.render_stateful_widget(
            List::new(items)
                .block(Block::bordered().title(Line::from(format!(
                    "Courses ({} total)",
                    explore.total_items()
                ))))
                .highlight_symbol("▶ ")
                .highlight_style(Style::default().add_modifier(Modifier::REVERSED)),
            body[1],
            &mut state,
        );

        let pages = explore
            .page_window()
            .into_iter()
            .map(|page| {
                if page == explore.page() {
                    format!("[{}]", page)
                } else {
                    page.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        frame.render_widget(
            Paragraph::new(format!(
                "‹ {} ›   page {} of {}",
                pages,
                explore.page(),
                explore.total_pages()
            ))
            .centered()
            .block(Block::bordered().title(Line::from("Pages"))),
            body[2],
        );

        Self::render_status(
            frame,
            layout[2],
            app,
            &[
                "Enter preview • o open course • ←/→ page • r refresh • m menu",
                "/ edit filters (Tab field, ←/→ cycle, Esc done) • x clear filters",
            ],
        );
    }

    fn render_enrollments(&mut self, frame: &mut Frame) {
        let app = &*self.app;
        let layout = Self::screen_layout(frame);
        Self::render_header(frame, layout[0], app, "My enrollments");

        let items: Vec<ListItem> = if app.enrollments.is_empty() {
            vec![ListItem::new(
                "You are not enrolled in any course. Explore the catalogue to start.",
            )]
        } else {
            app.enrollments
                .iter()
                .map(|enrollment| {
                    let enrolled = enrollment
                        .enrolled_at
                        .map(|at| at.format("%Y-%m-%d").to_string())
                        .unwrap_or_else(|| "-".to_string());
                    ListItem::new(format!(
                        "{:<36} | {:<9} | {:>3} topics done | since {}",
                        enrollment.course.name().unwrap_or(enrollment.course_id()),
                        enrollment.status.label(),
                        enrollment.progress.completed_topics.len(),
                        enrolled
                    ))
                })
                .collect()
        };
        let mut state = ListState::default();
        if EnrollmentsManager::selected(app).is_some() {
            state.select(Some(app.enrollment_index));
        }
        frame.render_stateful_widget(
            List::new(items)
                .block(Block::bordered().title(Line::from("Enrollments")))
                .highlight_symbol("▶ ")
                .highlight_style(Style::default().add_modifier(Modifier::REVERSED)),
            layout[1],
            &mut state,
        );

        Self::render_status(
            frame,
            layout[2],
            app,
            &["Enter open • p pause/resume • u unenroll • r reload • m menu"],
        );
    }

    fn render_wizard(&mut self, frame: &mut Frame) {
        let app = &*self.app;
        let wizard = &app.wizard;
        let layout = Self::screen_layout(frame);
        Self::render_header(
            frame,
            layout[0],
            app,
            &format!("Create a course • {}", wizard.step().label()),
        );

        match wizard.step() {
            WizardStep::Input => {
                let draft = wizard.draft();
                let items: Vec<ListItem> = DraftField::ALL
                    .iter()
                    .map(|field| {
                        let value = match field {
                            DraftField::Name => draft.name.clone(),
                            DraftField::Description => draft.description.clone(),
                            DraftField::ChapterCount => draft.chapter_count.to_string(),
                            DraftField::IncludeVideos => {
                                if draft.include_videos { "Yes" } else { "No" }.to_string()
                            }
                            DraftField::Category => draft
                                .category
                                .map_or("<choose with ←/→>", |category| category.label())
                                .to_string(),
                            DraftField::Difficulty => draft
                                .difficulty
                                .map_or("<choose with ←/→>", |difficulty| difficulty.label())
                                .to_string(),
                        };
                        ListItem::new(format!("{:<15} {}", field.label(), value))
                    })
                    .collect();
                let mut state = ListState::default();
                state.select(
                    DraftField::ALL
                        .iter()
                        .position(|field| *field == wizard.selected_field()),
                );
                frame.render_stateful_widget(
                    List::new(items)
                        .block(Block::bordered().title(Line::from("Course details")))
                        .highlight_symbol("▶ ")
                        .highlight_style(Style::default().add_modifier(Modifier::REVERSED)),
                    layout[1],
                    &mut state,
                );
            }
            WizardStep::Generating => {
                frame.render_widget(
                    Paragraph::new(format!(
                        "{} Generating a layout for \"{}\"…\n\nThis usually takes a few seconds. Esc cancels.",
                        Self::spinner(app),
                        wizard.draft().name
                    ))
                    .block(Block::bordered().title(Line::from("Working"))),
                    layout[1],
                );
            }
            WizardStep::Preview => {
                let text = match wizard.layout() {
                    Some(course_layout) => Self::layout_summary(course_layout, None),
                    None => "No layout available.".to_string(),
                };
                frame.render_widget(
                    Paragraph::new(text)
                        .wrap(Wrap { trim: false })
                        .block(Block::bordered().title(Line::from("Generated layout"))),
                    layout[1],
                );
            }
            WizardStep::Creating => {
                let label = match wizard.create_mode() {
                    CreateMode::FullContent => "Writing chapter content",
                    CreateMode::OutlineOnly => "Saving outline",
                };
                frame.render_widget(
                    Gauge::default()
                        .block(Block::bordered().title(Line::from(label)))
                        .gauge_style(Style::default().blue())
                        .percent(u16::from(wizard.progress_percent())),
                    layout[1],
                );
            }
        }

        let step_hints: &[&str] = match wizard.step() {
            WizardStep::Input => &[
                "Tab/↑/↓ choose field • type to edit • ←/→ adjust • Space toggles videos",
                "Enter generates the layout • Esc discards the draft",
            ],
            WizardStep::Generating => &["Esc cancels and discards the draft."],
            WizardStep::Preview => &[
                "Enter generates the full course • o saves the outline only",
                "b goes back to edit • Esc discards the draft",
            ],
            WizardStep::Creating => &["Esc returns to the menu; creation continues in the background."],
        };
        let mut hints: Vec<&str> = wizard.last_error().into_iter().collect();
        hints.extend_from_slice(step_hints);
        Self::render_status(frame, layout[2], app, &hints);
    }

    fn render_course(&mut self, frame: &mut Frame) {
        let app = &*self.app;
        let layout = Self::screen_layout(frame);

        let tracker = match app.course_screen.as_ref() {
            Some(CourseScreen::Ready(tracker)) => tracker,
            Some(CourseScreen::Loading { course_id }) => {
                Self::render_header(frame, layout[0], app, "Course");
                frame.render_widget(
                    Paragraph::new(format!("{} Loading course {}…", Self::spinner(app), course_id))
                        .block(Block::bordered()),
                    layout[1],
                );
                Self::render_status(frame, layout[2], app, &["Esc goes back."]);
                return;
            }
            missing => {
                let message = match missing {
                    Some(CourseScreen::Missing(message)) => message.as_str(),
                    _ => "Course not found",
                };
                Self::render_header(frame, layout[0], app, "Course");
                frame.render_widget(
                    Paragraph::new(format!(
                        "{}\n\nThe course may have been deleted or you may not have access to it.",
                        message
                    ))
                    .centered()
                    .block(Block::bordered().title(Line::from("Not found"))),
                    layout[1],
                );
                Self::render_status(frame, layout[2], app, &["Esc goes back."]);
                return;
            }
        };

        let completion = tracker.completion();
        Self::render_header(
            frame,
            layout[0],
            app,
            &format!(
                "{} • {}{}% complete",
                tracker.course().name,
                if completion.estimated { "~" } else { "" },
                completion.percent
            ),
        );

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
            .split(layout[1]);

        let (items, selected) = Self::outline_items(tracker);
        let mut state = ListState::default();
        state.select(selected);
        frame.render_stateful_widget(
            List::new(items)
                .block(Block::bordered().title(Line::from(format!(
                    "Chapters ({} topics done)",
                    tracker.completed_count()
                ))))
                .highlight_symbol("▶ ")
                .highlight_style(Style::default().add_modifier(Modifier::REVERSED)),
            columns[0],
            &mut state,
        );

        let content = match tracker.current_topic() {
            Some(topic) => {
                let body = topic.content.as_deref().unwrap_or_default();
                let mut sections = vec![format!(
                    "{}\n{}\nReading time: {} min",
                    topic.title,
                    topic.description,
                    estimated_minutes(body)
                )];
                if let Some(video) = topic.youtube_video.as_deref() {
                    sections.push(match youtube_video_id(video) {
                        Some(id) => format!("Video: https://www.youtube.com/watch?v={}", id),
                        None => format!("Video: {}", video),
                    });
                }
                sections.push(if body.trim().is_empty() {
                    "No content has been generated for this topic yet.".to_string()
                } else {
                    html_to_text(body)
                });
                sections.join("\n\n")
            }
            None => "This course has no generated chapters yet.".to_string(),
        };
        let content_title = if tracker.is_completion_pending() {
            format!("Content {} saving progress…", Self::spinner(app))
        } else if tracker.is_enrolled() {
            "Content".to_string()
        } else {
            "Content (not enrolled, press e to enroll)".to_string()
        };
        frame.render_widget(
            Paragraph::new(content)
                .wrap(Wrap { trim: false })
                .block(Block::bordered().title(Line::from(content_title))),
            columns[1],
        );

        let mut hints: Vec<&str> = tracker.last_error().into_iter().collect();
        hints.push("↓/n next topic • ↑/p previous • Tab next in chapter • ]/[ chapter");
        hints.push("c mark complete • e enroll • r reload • Esc back");
        Self::render_status(frame, layout[2], app, &hints);
    }

    fn render_preview(&mut self, frame: &mut Frame) {
        let app = &*self.app;
        let layout = Self::screen_layout(frame);

        let (title, text) = match app.preview_screen.as_ref() {
            Some(PreviewScreen::Ready { preview, chapter }) => (
                preview.name.clone(),
                preview
                    .ai_generated_layout
                    .as_ref()
                    .map(|course_layout| Self::layout_summary(course_layout, Some(*chapter)))
                    .unwrap_or_default(),
            ),
            Some(PreviewScreen::Loading { course_id }) => (
                "Course preview".to_string(),
                format!("{} Loading preview for {}…", Self::spinner(app), course_id),
            ),
            Some(PreviewScreen::Missing) | None => (
                "Course preview".to_string(),
                "Course not found\n\nThis course has no published layout to preview.".to_string(),
            ),
        };
        Self::render_header(frame, layout[0], app, &title);
        frame.render_widget(
            Paragraph::new(text)
                .wrap(Wrap { trim: false })
                .block(Block::bordered().title(Line::from("Preview"))),
            layout[1],
        );
        Self::render_status(
            frame,
            layout[2],
            app,
            &["↑/↓ select chapter • Enter/o open the full course • Esc back"],
        );
    }

    fn render_profile(&mut self, frame: &mut Frame) {
        let app = &*self.app;
        let form = &app.profile_form;
        let layout = Self::screen_layout(frame);
        Self::render_header(frame, layout[0], app, "Profile");

        let items: Vec<ListItem> = ProfileField::ALL
            .iter()
            .map(|field| ListItem::new(format!("{:<17} {}", field.label(), form.value(*field))))
            .collect();
        let mut state = ListState::default();
        state.select(
            ProfileField::ALL
                .iter()
                .position(|field| *field == form.selected_field()),
        );
        frame.render_stateful_widget(
            List::new(items)
                .block(Block::bordered().title(Line::from("Your details")))
                .highlight_symbol("▶ ")
                .highlight_style(Style::default().add_modifier(Modifier::REVERSED)),
            layout[1],
            &mut state,
        );

        let mut hints = Vec::new();
        if let Some(error) = form.error.as_deref() {
            hints.push(error);
        }
        hints.push("Tab/↑/↓ move • type to edit • Enter saves • Esc returns to the menu");
        hints.push("Leave both password fields empty to keep the current password.");
        Self::render_status(frame, layout[2], app, &hints);
    }

    fn render_config(&mut self, frame: &mut Frame) {
        let app = &*self.app;
        let layout = Self::screen_layout(frame);
        Self::render_header(
            frame,
            layout[0],
            app,
            &format!("Config file: {}", config::config_file_path().display()),
        );

        let form = &app.config_form;
        let items = vec![
            ListItem::new(if form.is_editing_url() {
                format!("API base URL (editing): {}▏", form.url_buffer())
            } else {
                format!("API base URL: {}", form.api_base_url)
            }),
            ListItem::new(format!(
                "Debug log: {}",
                if form.debug_log { "Enabled" } else { "Disabled" }
            )),
        ];
        let mut state = ListState::default();
        state.select(Some(form.selected_index()));
        frame.render_stateful_widget(
            List::new(items)
                .block(Block::bordered().title(Line::from("Settings")))
                .highlight_symbol("▶ ")
                .highlight_style(Style::default().add_modifier(Modifier::REVERSED)),
            layout[1],
            &mut state,
        );

        let mut hints = vec![
            "↑/↓ choose • Enter edits the URL • ←/→ toggles logging • s save • r reset • m menu",
        ];
        if form.dirty {
            hints.push("Unsaved changes");
        }
        if let Some(status) = form.status.as_deref() {
            hints.push(status);
        }
        Self::render_status(frame, layout[2], app, &hints);
    }

    fn screen_layout(frame: &Frame) -> Rc<[Rect]> {
        Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Length(6),
            ])
            .split(frame.area())
    }

    fn render_header(frame: &mut Frame, area: Rect, app: &App, subtitle: &str) {
        let user = app
            .sessions
            .current()
            .map_or("Guest".to_string(), |session| session.display_name().to_string());
        let header_title = Line::from(format!("Course Generator • {}", user))
            .bold()
            .blue()
            .centered();
        frame.render_widget(
            Paragraph::new(subtitle.to_string())
                .block(Block::bordered().title(header_title))
                .centered(),
            area,
        );
    }

    fn render_status(frame: &mut Frame, area: Rect, app: &App, hints: &[&str]) {
        let mut status_lines = Vec::new();
        if let Some(error) = &app.error {
            status_lines.push(format!("Error: {}", error));
        }
        if let Some(status) = &app.status {
            status_lines.push(status.clone());
        }
        if app.requests.pending_count() > 0 {
            status_lines.push(format!("{} Working…", Self::spinner(app)));
        }
        status_lines.extend(hints.iter().map(|hint| hint.to_string()));

        frame.render_widget(
            Paragraph::new(status_lines.join("\n"))
                .block(Block::bordered().title(Line::from("Status"))),
            area,
        );
    }

    fn render_filter_bar(frame: &mut Frame, area: Rect, bar: &FilterBar) {
        let text = FilterField::ALL
            .iter()
            .map(|field| {
                let value = bar.filter().display_value(*field);
                if bar.is_editing() && *field == bar.field() {
                    format!("[{}: {}▏]", field.label(), value)
                } else {
                    format!("{}: {}", field.label(), value)
                }
            })
            .collect::<Vec<_>>()
            .join("   ");
        let title = if bar.is_editing() {
            "Filters (editing)"
        } else {
            "Filters"
        };
        frame.render_widget(
            Paragraph::new(text).block(Block::bordered().title(Line::from(title))),
            area,
        );
    }

    fn spinner(app: &App) -> &'static str {
        LOADING_FRAMES[app.loading_frame % LOADING_FRAMES.len()]
    }

    fn course_row(course: &Course) -> ListItem<'static> {
        ListItem::new(format!(
            "{:<36} | {:<12} | {:<12} | {}",
            course.name,
            course.category.label(),
            course.difficulty.label(),
            course.status.label()
        ))
    }

    fn course_details(course: &Course) -> String {
        let author = course
            .created_by
            .as_ref()
            .and_then(|author| author.name())
            .unwrap_or("-");
        let created = course
            .created_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "{}\n\n{}\n\nChapters: {}\nVideos: {}\nCategory: {}\nDifficulty: {}\nStatus: {}\nAuthor: {}\nCreated: {}",
            course.name,
            course.description,
            course.chapters,
            if course.include_videos { "yes" } else { "no" },
            course.category.label(),
            course.difficulty.label(),
            course.status.label(),
            author,
            created
        )
    }

    /// Chapter list with durations. `selected` expands that chapter's topics.
    fn layout_summary(layout: &CourseLayout, selected: Option<usize>) -> String {
        let mut lines = vec![
            layout.name.clone(),
            layout.description.clone(),
            format!(
                "{} • {} • {} chapters • {}",
                layout.category,
                layout.level,
                layout.chapters.len(),
                if layout.include_video {
                    "with videos"
                } else {
                    "no videos"
                }
            ),
            format!(
                "Total duration: {} hours{}",
                layout.total_hours(),
                if layout.has_unknown_durations() {
                    " (some chapters have no estimate)"
                } else {
                    ""
                }
            ),
            String::new(),
        ];
        for (index, chapter) in layout.chapters.iter().enumerate() {
            let marker = if selected == Some(index) { "▶" } else { " " };
            lines.push(format!(
                "{} {}. {} ({})",
                marker,
                index + 1,
                chapter.chapter_name,
                chapter.duration.label
            ));
            if selected.is_none() || selected == Some(index) {
                lines.extend(chapter.topics.iter().map(|topic| format!("     - {}", topic)));
            }
        }
        lines.join("\n")
    }

    /// Sidebar rows and the index of the row under the cursor.
    fn outline_items(tracker: &ProgressTracker) -> (Vec<ListItem<'static>>, Option<usize>) {
        let cursor = tracker.cursor();
        let mut items = Vec::new();
        let mut selected = None;
        for (chapter_index, group) in tracker.groups().iter().enumerate() {
            items.push(
                ListItem::new(format!("{}. {}", group.order, group.title))
                    .style(Style::default().add_modifier(Modifier::BOLD)),
            );
            for (topic_index, topic) in group.topics.iter().enumerate() {
                let key = TopicKey::new(group.order, topic_index as u32);
                let mark = if tracker.is_completed(key) { "✓" } else { " " };
                if chapter_index == cursor.chapter && topic_index == cursor.topic {
                    selected = Some(items.len());
                }
                items.push(ListItem::new(format!("   [{}] {}", mark, topic.description)));
            }
        }
        (items, selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{load_course, signed_in_app};
    use ratatui::{Terminal, backend::TestBackend};

    fn draw(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal
            .draw(|frame| UiRenderer::new(app).render(frame))
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn every_view_renders() {
        let mut app = signed_in_app();
        for view in [
            AppView::Menu,
            AppView::Auth,
            AppView::Library,
            AppView::Explore,
            AppView::Enrollments,
            AppView::Wizard,
            AppView::Course,
            AppView::Preview,
            AppView::Profile,
            AppView::Config,
        ] {
            app.view = view;
            assert!(draw(&mut app).contains("Ada"));
        }
    }

    #[test]
    fn course_screen_lists_chapters_and_the_current_topic() {
        let mut app = signed_in_app();
        app.view = AppView::Course;
        app.course_screen = Some(CourseScreen::Ready(Box::new(ProgressTracker::open(
            load_course("test_fixtures/course_with_generated_chapters.json"),
        ))));
        let screen = draw(&mut app);
        assert!(screen.contains("2. Ownership"));
        assert!(screen.contains("Installing the toolchain"));
    }
}
