use crate::{
    api_client::CourseQuery,
    course_models::{
        Category, Course, CoursePage, CourseStatus, Difficulty, Pagination, cycle_option,
    },
    error::ApiError,
    log_util::log_debug,
};
use std::collections::HashSet;

/// Fixed page size for the explore catalogue.
pub const EXPLORE_PAGE_SIZE: u32 = 12;
const PAGE_WINDOW: u32 = 5;

/// One filter dimension. `All` matches every course.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterChoice<T> {
    All,
    Only(T),
}

impl<T> Default for FilterChoice<T> {
    fn default() -> Self {
        Self::All
    }
}

impl<T: Copy + PartialEq> FilterChoice<T> {
    pub fn matches(&self, value: T) -> bool {
        match self {
            Self::All => true,
            Self::Only(expected) => *expected == value,
        }
    }

    pub fn as_option(&self) -> Option<T> {
        match self {
            Self::All => None,
            Self::Only(value) => Some(*value),
        }
    }

    /// Step through `All` followed by every option, wrapping at both ends.
    pub fn cycle(self, options: &[T], delta: isize) -> Self {
        let next = match self.as_option() {
            None if delta >= 0 => options.first().copied(),
            None => options.last().copied(),
            Some(current) => {
                let at_edge = options
                    .iter()
                    .position(|option| *option == current)
                    .map(|index| {
                        (delta > 0 && index + 1 == options.len()) || (delta < 0 && index == 0)
                    })
                    .unwrap_or(true);
                if at_edge {
                    None
                } else {
                    cycle_option(options, Some(current), delta)
                }
            }
        };
        next.map_or(Self::All, Self::Only)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Search,
    Status,
    Category,
    Difficulty,
}

impl FilterField {
    pub const ALL: [FilterField; 4] = [Self::Search, Self::Status, Self::Category, Self::Difficulty];

    pub fn label(self) -> &'static str {
        match self {
            Self::Search => "Search",
            Self::Status => "Status",
            Self::Category => "Category",
            Self::Difficulty => "Difficulty",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseFilter {
    pub search: String,
    pub status: FilterChoice<CourseStatus>,
    pub category: FilterChoice<Category>,
    pub difficulty: FilterChoice<Difficulty>,
}

impl CourseFilter {
    /// Conjunction of every dimension.
    pub fn matches(&self, course: &Course) -> bool {
        self.matches_search(course)
            && self.status.matches(course.status)
            && self.category.matches(course.category)
            && self.difficulty.matches(course.difficulty)
    }

    fn matches_search(&self, course: &Course) -> bool {
        let needle = self.search.to_lowercase();
        needle.is_empty()
            || course.name.to_lowercase().contains(&needle)
            || course.description.to_lowercase().contains(&needle)
    }

    /// Cycle a choice field. Returns `false` for the search field.
    pub fn cycle(&mut self, field: FilterField, delta: isize) -> bool {
        match field {
            FilterField::Search => return false,
            FilterField::Status => self.status = self.status.cycle(&CourseStatus::ALL, delta),
            FilterField::Category => self.category = self.category.cycle(&Category::ALL, delta),
            FilterField::Difficulty => {
                self.difficulty = self.difficulty.cycle(&Difficulty::ALL, delta)
            }
        }
        true
    }

    pub fn display_value(&self, field: FilterField) -> String {
        match field {
            FilterField::Search => self.search.clone(),
            FilterField::Status => choice_label(self.status, CourseStatus::label),
            FilterField::Category => choice_label(self.category, Category::label),
            FilterField::Difficulty => choice_label(self.difficulty, Difficulty::label),
        }
    }

    fn query(&self, page: u32) -> CourseQuery {
        let search = self.search.trim();
        CourseQuery {
            page: Some(page),
            limit: Some(EXPLORE_PAGE_SIZE),
            search: (!search.is_empty()).then(|| search.to_string()),
            status: self.status.as_option(),
            category: self.category.as_option(),
            difficulty: self.difficulty.as_option(),
        }
    }
}

fn choice_label<T: Copy + PartialEq>(choice: FilterChoice<T>, label: fn(T) -> &'static str) -> String {
    match choice {
        FilterChoice::All => "All".to_string(),
        FilterChoice::Only(value) => label(value).to_string(),
    }
}

/// Filter editing shared by both course lists.
#[derive(Debug, Clone, Default)]
pub struct FilterBar {
    filter: CourseFilter,
    field_index: usize,
    editing: bool,
}

impl FilterBar {
    pub fn filter(&self) -> &CourseFilter {
        &self.filter
    }

    /// Whether key presses currently go to the filter fields instead of the list.
    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn set_editing(&mut self, editing: bool) {
        self.editing = editing;
    }

    pub fn field(&self) -> FilterField {
        FilterField::ALL[self.field_index % FilterField::ALL.len()]
    }

    pub fn next_field(&mut self) {
        self.field_index = (self.field_index + 1) % FilterField::ALL.len();
    }

    pub fn push_char(&mut self, ch: char) -> bool {
        if self.field() != FilterField::Search {
            return false;
        }
        self.filter.search.push(ch);
        true
    }

    pub fn pop_char(&mut self) -> bool {
        self.field() == FilterField::Search && self.filter.search.pop().is_some()
    }

    pub fn cycle(&mut self, delta: isize) -> bool {
        self.filter.cycle(self.field(), delta)
    }

    pub fn clear(&mut self) -> bool {
        let changed = self.filter != CourseFilter::default();
        self.filter = CourseFilter::default();
        changed
    }
}

/// "My courses": the full list is fetched once and filtered locally.
#[derive(Debug, Clone, Default)]
pub struct LibraryController {
    courses: Vec<Course>,
    bar: FilterBar,
    visible: Vec<usize>,
    selected: usize,
    loaded: bool,
}

impl LibraryController {
    pub fn set_courses(&mut self, courses: Vec<Course>) {
        log_debug(&format!("LibraryController: loaded {} courses", courses.len()));
        self.courses = courses;
        self.loaded = true;
        self.recompute();
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn total_count(&self) -> usize {
        self.courses.len()
    }

    pub fn bar(&self) -> &FilterBar {
        &self.bar
    }

    pub fn visible(&self) -> Vec<&Course> {
        self.visible.iter().map(|index| &self.courses[*index]).collect()
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected_course(&self) -> Option<&Course> {
        self.visible
            .get(self.selected)
            .and_then(|index| self.courses.get(*index))
    }

    pub fn move_selection(&mut self, delta: isize) {
        if self.visible.is_empty() {
            return;
        }
        let len = self.visible.len() as isize;
        self.selected = (self.selected as isize + delta).rem_euclid(len) as usize;
    }

    pub fn set_filter_editing(&mut self, editing: bool) {
        self.bar.set_editing(editing);
    }

    pub fn next_field(&mut self) {
        self.bar.next_field();
    }

    pub fn push_char(&mut self, ch: char) {
        if self.bar.push_char(ch) {
            self.recompute();
        }
    }

    pub fn pop_char(&mut self) {
        if self.bar.pop_char() {
            self.recompute();
        }
    }

    pub fn cycle_filter(&mut self, delta: isize) {
        if self.bar.cycle(delta) {
            self.recompute();
        }
    }

    pub fn clear_filters(&mut self) {
        if self.bar.clear() {
            self.recompute();
        }
    }

    pub fn apply_deleted(&mut self, course_id: &str) {
        self.courses.retain(|course| course.id != course_id);
        self.recompute();
    }

    pub fn apply_updated(&mut self, updated: Course) {
        if let Some(course) = self.courses.iter_mut().find(|course| course.id == updated.id) {
            *course = updated;
        }
        self.recompute();
    }

    pub fn prepend(&mut self, course: Course) {
        self.courses.retain(|existing| existing.id != course.id);
        self.courses.insert(0, course);
        self.recompute();
    }

    fn recompute(&mut self) {
        let filter = self.bar.filter();
        self.visible = self
            .courses
            .iter()
            .enumerate()
            .filter(|(_, course)| filter.matches(course))
            .map(|(index, _)| index)
            .collect();
        if self.selected >= self.visible.len() {
            self.selected = self.visible.len().saturating_sub(1);
        }
    }
}

/// Public catalogue with server-side pagination and filtering.
#[derive(Debug, Clone)]
pub struct ExploreController {
    bar: FilterBar,
    /// Page whose courses are on screen.
    page: u32,
    /// Page the next fetch asks for. Falls back to `page` when a fetch fails.
    requested_page: u32,
    pagination: Option<Pagination>,
    courses: Vec<Course>,
    enrolled_ids: HashSet<String>,
    selected: usize,
    needs_fetch: bool,
}

impl Default for ExploreController {
    fn default() -> Self {
        Self {
            bar: FilterBar::default(),
            page: 1,
            requested_page: 1,
            pagination: None,
            courses: Vec::new(),
            enrolled_ids: HashSet::new(),
            selected: 0,
            needs_fetch: true,
        }
    }
}

impl ExploreController {
    pub fn bar(&self) -> &FilterBar {
        &self.bar
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn total_pages(&self) -> u32 {
        self.pagination
            .map(|pagination| pagination.total_pages.max(1))
            .unwrap_or(1)
    }

    pub fn total_items(&self) -> u32 {
        self.pagination
            .map(|pagination| pagination.total_items)
            .unwrap_or(0)
    }

    pub fn query(&self) -> CourseQuery {
        self.bar.filter().query(self.requested_page)
    }

    /// Query for the next fetch, if the filter or page changed since the last one.
    pub fn take_pending_query(&mut self) -> Option<CourseQuery> {
        if !self.needs_fetch {
            return None;
        }
        self.needs_fetch = false;
        Some(self.query())
    }

    pub fn refresh(&mut self) {
        self.needs_fetch = true;
    }

    pub fn on_page_loaded(&mut self, result: Result<CoursePage, ApiError>) -> Result<usize, ApiError> {
        let page = match result {
            Ok(page) => page,
            Err(err) => {
                self.requested_page = self.page;
                return Err(err);
            }
        };
        let loaded = page.pagination.current_page.max(1);
        if loaded != self.page {
            self.selected = 0;
        }
        self.page = loaded;
        self.requested_page = loaded;
        self.pagination = Some(page.pagination);
        self.courses = page.courses;
        self.clamp_selection();
        log_debug(&format!(
            "ExploreController: page {} of {} ({} courses)",
            self.page,
            self.total_pages(),
            self.courses.len()
        ));
        Ok(self.courses.len())
    }

    pub fn set_enrolled_ids<I: IntoIterator<Item = String>>(&mut self, ids: I) {
        self.enrolled_ids = ids.into_iter().collect();
        self.clamp_selection();
    }

    pub fn mark_enrolled(&mut self, course_id: &str) {
        self.enrolled_ids.insert(course_id.to_string());
        self.clamp_selection();
    }

    /// Courses on the current page the learner is not already enrolled in.
    pub fn visible(&self) -> Vec<&Course> {
        self.courses
            .iter()
            .filter(|course| !self.enrolled_ids.contains(&course.id))
            .collect()
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected_course(&self) -> Option<&Course> {
        self.visible().get(self.selected).copied()
    }

    pub fn move_selection(&mut self, delta: isize) {
        let len = self.visible().len() as isize;
        if len == 0 {
            return;
        }
        self.selected = (self.selected as isize + delta).rem_euclid(len) as usize;
    }

    fn clamp_selection(&mut self) {
        let len = self.visible().len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }

    pub fn set_filter_editing(&mut self, editing: bool) {
        self.bar.set_editing(editing);
    }

    pub fn next_field(&mut self) {
        self.bar.next_field();
    }

    pub fn push_char(&mut self, ch: char) {
        if self.bar.push_char(ch) {
            self.filter_changed();
        }
    }

    pub fn pop_char(&mut self) {
        if self.bar.pop_char() {
            self.filter_changed();
        }
    }

    pub fn cycle_filter(&mut self, delta: isize) {
        if self.bar.cycle(delta) {
            self.filter_changed();
        }
    }

    pub fn clear_filters(&mut self) {
        if self.bar.clear() {
            self.filter_changed();
        }
    }

    fn filter_changed(&mut self) {
        self.requested_page = 1;
        self.selected = 0;
        self.needs_fetch = true;
    }

    pub fn next_page(&mut self) -> bool {
        if self.requested_page >= self.total_pages() {
            return false;
        }
        self.go_to(self.requested_page + 1);
        true
    }

    pub fn previous_page(&mut self) -> bool {
        if self.requested_page <= 1 {
            return false;
        }
        self.go_to(self.requested_page - 1);
        true
    }

    fn go_to(&mut self, page: u32) {
        self.requested_page = page;
        self.needs_fetch = true;
    }

    /// Up to five page numbers centred on the current page.
    pub fn page_window(&self) -> Vec<u32> {
        let total = self.total_pages();
        if total <= PAGE_WINDOW {
            return (1..=total).collect();
        }
        let start = if self.page <= 3 {
            1
        } else if self.page >= total - 2 {
            total - PAGE_WINDOW + 1
        } else {
            self.page - 2
        };
        (start..start + PAGE_WINDOW).collect()
    }
}
