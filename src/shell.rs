use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use serde::Serialize;

use crate::auth::CodeExchanger;
use crate::catalog::{Catalog, Chapter, Subchapter};
use crate::collab::{AnalyticsEvent, AnalyticsSink, ChatWidget};
use crate::config::ShellConfig;
use crate::content::{DEFAULT_TRACK_ALIAS, FIRST_LESSON_ALIAS};
use crate::markdown::{build_tree, extract_headings, slug};
use crate::route::Route;
use crate::state_store::{ReadingState, StateStore, UserRecord};
use crate::throttle::Throttle;

/// Distance from the bottom under which the jump buttons expand.
const BOTTOM_SLACK_PX: f64 = 100.0;

const SITE_TITLE: &str = "Learn Apollo | Hands-on GraphQL Tutorial";
const SITE_META: &[(&str, &str)] = &[
    (
        "description",
        "Learn all you need about GraphQL & Apollo and how to use it with React, React Native, Expo, iOS, Vue & Angular",
    ),
    ("og:type", "website"),
    ("og:title", "Learn Apollo"),
    ("og:description", "A hands-on tutorial for Apollo GraphQL Client"),
    ("og:site_name", "LEARNAPOLLO"),
    ("twitter:card", "summary_large_image"),
    ("twitter:title", "Learn Apollo"),
    ("twitter:description", "A hands-on tutorial for Apollo GraphQL Client"),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UiState {
    pub sidebar_open: bool,
    pub jump_buttons_expanded: bool,
    pub overlay_open: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub viewport_height: f64,
}

impl ScrollMetrics {
    pub fn near_bottom(&self) -> bool {
        self.scroll_height - BOTTOM_SLACK_PX < self.scroll_top + self.viewport_height
            || self.scroll_height <= self.viewport_height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessState {
    Locked,
    Skipped,
    Authenticated,
}

impl AccessState {
    pub fn of(state: &ReadingState) -> Self {
        if state.user.is_some() {
            Self::Authenticated
        } else if state.skipped_auth {
            Self::Skipped
        } else {
            Self::Locked
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellSettings {
    pub default_track: String,
    pub first_lesson: String,
    pub last_updated: String,
    pub scroll_throttle: Duration,
}

impl ShellSettings {
    pub fn from_config(config: &ShellConfig) -> Self {
        Self {
            default_track: config.default_track.clone(),
            first_lesson: config.first_lesson.clone(),
            last_updated: config.last_updated.clone(),
            scroll_throttle: config.scroll_throttle,
        }
    }
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            default_track: DEFAULT_TRACK_ALIAS.to_owned(),
            first_lesson: FIRST_LESSON_ALIAS.to_owned(),
            last_updated: String::new(),
            scroll_throttle: ShellConfig::default_scroll_throttle(),
        }
    }
}

#[derive(Clone)]
pub struct ShellDeps {
    pub catalog: Arc<Catalog>,
    pub analytics: Arc<dyn AnalyticsSink>,
    pub chat: Arc<dyn ChatWidget>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Constructed,
    Mounted,
    Unmounted,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShellView {
    pub title: &'static str,
    pub meta: Vec<MetaTag>,
    pub location: String,
    pub ui: UiState,
    pub access: AccessState,
    pub chapters: Vec<ChapterEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_button: Option<ServerButton>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jump: Option<JumpControls>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay: Option<OverlayView>,
    pub chat_button_inactive: bool,
    pub last_updated: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetaTag {
    pub key: &'static str,
    pub content: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChapterEntry {
    pub ordinal: usize,
    pub alias: String,
    pub title: String,
    pub href: String,
    pub is_track: bool,
    /// Empty when the chapter is a track other than the selected one.
    pub subchapters: Vec<SubchapterEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    Check,
    Dot,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubchapterEntry {
    pub alias: String,
    pub label: String,
    pub href: String,
    pub marker: Marker,
    pub progress_bar: bool,
    pub current: bool,
    pub headings: Vec<HeadingLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadingLink {
    pub title: String,
    pub href: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JumpControls {
    pub expanded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<JumpTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<JumpTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JumpTarget {
    pub alias: String,
    pub title: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerButton {
    pub project_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverlayView {
    pub project_id: String,
}

/// Sidebar, progress and prev/next state of the tutorial page.
///
/// Every write to the reading state goes through the shell so track sync and
/// the chat button follow each update.
pub struct NavigationShell {
    catalog: Arc<Catalog>,
    analytics: Arc<dyn AnalyticsSink>,
    chat: Arc<dyn ChatWidget>,
    store: StateStore,
    settings: ShellSettings,
    route: Route,
    ui: UiState,
    throttle: Throttle,
    pending_scroll: Option<ScrollMetrics>,
    scroll_evaluations: u64,
    pending_code: Option<String>,
    lifecycle: Lifecycle,
}

impl NavigationShell {
    pub fn new(
        deps: ShellDeps,
        store: StateStore,
        settings: ShellSettings,
        route: Route,
    ) -> anyhow::Result<Self> {
        let pending_code = route
            .query_param("code")
            .filter(|code| !code.is_empty())
            .map(str::to_owned);
        let mut shell = Self {
            catalog: deps.catalog,
            analytics: deps.analytics,
            chat: deps.chat,
            store,
            throttle: Throttle::new(settings.scroll_throttle),
            settings,
            route,
            ui: UiState::default(),
            pending_scroll: None,
            scroll_evaluations: 0,
            pending_code,
            lifecycle: Lifecycle::Constructed,
        };

        if shell.store.get().initial_load_timestamp.is_none() {
            let now = chrono::Utc::now().timestamp_millis();
            shell
                .store
                .update(&["initialLoadTimestamp"], now)
                .context("record initial load timestamp")?;
        }

        Ok(shell)
    }

    pub fn state(&self) -> &ReadingState {
        self.store.get()
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn ui(&self) -> UiState {
        self.ui
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn pending_code(&self) -> Option<&str> {
        self.pending_code.as_deref()
    }

    pub fn scroll_evaluations(&self) -> u64 {
        self.scroll_evaluations
    }

    pub fn access(&self) -> AccessState {
        AccessState::of(self.store.get())
    }

    /// Takes the first scroll sample and brings up the chat widget.
    pub async fn mount(&mut self, metrics: ScrollMetrics, now: Instant) -> anyhow::Result<()> {
        self.lifecycle = Lifecycle::Mounted;
        self.on_scroll(metrics, now);

        if let Err(err) = self.chat.initialize().await {
            tracing::warn!(?err, "chat widget failed to initialize");
        }
        self.refresh_chat_button();
        self.sync_track().context("sync track on mount")
    }

    pub fn unmount(&mut self) {
        self.lifecycle = Lifecycle::Unmounted;
        self.pending_scroll = None;
        self.refresh_chat_button();
    }

    /// Exchanges the route's `code` once. Exchange failures propagate.
    pub async fn run_auth_callback(
        &mut self,
        exchanger: &dyn CodeExchanger,
    ) -> anyhow::Result<Option<UserRecord>> {
        let Some(code) = self.pending_code.take() else {
            return Ok(None);
        };
        let user = exchanger.exchange(&code).await?;
        let applied = self.complete_auth(user.clone()).await?;
        Ok(applied.then_some(user))
    }

    /// Folds an exchanged identity into the reading state. Returns `false`
    /// when the shell was already torn down and the result was dropped.
    pub async fn complete_auth(&mut self, user: UserRecord) -> anyhow::Result<bool> {
        if self.lifecycle == Lifecycle::Unmounted {
            tracing::debug!("auth result arrived after teardown; dropping it");
            return Ok(false);
        }

        self.analytics.event(AnalyticsEvent::EndpointReceived);
        self.store.update(&["user"], &user).context("store user")?;
        self.store
            .update(&["skippedAuth"], false)
            .context("clear skipped auth")?;
        self.route = self.route.without_query("code");
        tracing::info!(location = %self.route.location(), "authenticated; replaced route");

        if let Err(err) = self.chat.initialize().await {
            tracing::warn!(?err, "chat widget failed to re-initialize");
        }
        self.after_update()?;
        Ok(true)
    }

    pub fn toggle_sidebar(&mut self) {
        self.ui.sidebar_open = !self.ui.sidebar_open;
    }

    /// A sidebar subchapter or heading link: closes the sidebar and navigates.
    pub fn follow_sidebar_link(&mut self, route: Route) -> anyhow::Result<()> {
        self.toggle_sidebar();
        self.navigate(route)
    }

    pub fn navigate(&mut self, route: Route) -> anyhow::Result<()> {
        self.route = route;
        self.after_update()
    }

    /// A chapter heading link in the sidebar.
    pub fn click_chapter(&mut self, alias: &str) -> anyhow::Result<()> {
        let Some(chapter) = self.catalog.find_chapter(alias) else {
            tracing::debug!(alias, "click on unknown chapter");
            return Ok(());
        };
        let href = chapter_href(chapter);
        self.select_track(alias)?;
        self.navigate(Route::parse(&href)?)
    }

    /// Returns whether the scroll changed the view.
    pub fn on_scroll(&mut self, metrics: ScrollMetrics, now: Instant) -> bool {
        if self.lifecycle != Lifecycle::Mounted {
            return false;
        }
        self.pending_scroll = Some(metrics);
        if !self.throttle.try_run(now) {
            tracing::trace!("scroll throttled");
            return false;
        }
        self.apply_scroll()
    }

    /// Runs a scroll dropped by the throttle once its window has passed.
    pub fn flush_scroll(&mut self, now: Instant) -> bool {
        if self.lifecycle != Lifecycle::Mounted || !self.throttle.flush(now) {
            return false;
        }
        self.apply_scroll()
    }

    pub fn open_overlay(&mut self) -> bool {
        if self.store.get().project_id().is_none() {
            return false;
        }
        self.analytics.event(AnalyticsEvent::OverlayOpen);
        self.ui.overlay_open = true;
        true
    }

    pub fn close_overlay(&mut self) {
        self.analytics.event(AnalyticsEvent::OverlayClose);
        self.ui.overlay_open = false;
    }

    /// Marks a subchapter read. Unknown aliases are ignored.
    pub fn mark_read(&mut self, alias: &str) -> anyhow::Result<bool> {
        if self.catalog.find_subchapter(alias).is_none() {
            tracing::debug!(alias, "mark read: unknown subchapter");
            return Ok(false);
        }
        self.update_state(&["hasRead", alias], true)?;
        Ok(true)
    }

    pub fn skip_auth(&mut self) -> anyhow::Result<()> {
        self.update_state(&["skippedAuth"], true)
    }

    /// Path-scoped write for page content, followed by re-derivation.
    pub fn update_state<V: Serialize>(&mut self, path: &[&str], value: V) -> anyhow::Result<()> {
        self.store.update(path, value)?;
        self.after_update()
    }

    pub fn render(&self) -> ShellView {
        let state = self.store.get();
        let access = AccessState::of(state);
        let last_read = self.catalog.last_read(&state.has_read).map(|s| s.alias.as_str());
        let selected_track = state.selected_track_alias.as_deref();

        let chapters = self
            .catalog
            .chapters()
            .iter()
            .enumerate()
            .map(|(idx, chapter)| {
                let subchapters = if shows_subchapters(chapter, selected_track) {
                    chapter
                        .subchapters
                        .iter()
                        .enumerate()
                        .map(|(sub_idx, sub)| self.subchapter_entry(chapter, sub, sub_idx, last_read))
                        .collect()
                } else {
                    Vec::new()
                };
                ChapterEntry {
                    ordinal: idx + 1,
                    alias: chapter.alias.clone(),
                    title: chapter.title.clone(),
                    href: chapter_href(chapter),
                    is_track: chapter.is_track,
                    subchapters,
                }
            })
            .collect();

        let project_id = state.project_id().map(str::to_owned);

        ShellView {
            title: SITE_TITLE,
            meta: SITE_META
                .iter()
                .map(|&(key, content)| MetaTag { key, content })
                .collect(),
            location: self.route.location(),
            ui: self.ui,
            access,
            chapters,
            server_button: project_id.clone().map(|project_id| ServerButton { project_id }),
            jump: self.jump_controls(access),
            overlay: project_id
                .filter(|_| self.ui.overlay_open)
                .map(|project_id| OverlayView { project_id }),
            chat_button_inactive: self.chat_button_inactive(),
            last_updated: self.settings.last_updated.clone(),
        }
    }

    fn subchapter_entry(
        &self,
        chapter: &Chapter,
        sub: &Subchapter,
        sub_idx: usize,
        last_read: Option<&str>,
    ) -> SubchapterEntry {
        let current = self.route.chapter.as_deref() == Some(chapter.alias.as_str())
            && self.route.subchapter.as_deref() == Some(sub.alias.as_str());
        SubchapterEntry {
            alias: sub.alias.clone(),
            label: format!("{:02} - {}", sub_idx + 1, sub.title),
            href: subchapter_href(chapter, sub),
            marker: if self.store.get().has_read(&sub.alias) {
                Marker::Check
            } else {
                Marker::Dot
            },
            progress_bar: last_read == Some(sub.alias.as_str()),
            current,
            headings: if current {
                heading_links(sub)
            } else {
                Vec::new()
            },
        }
    }

    fn current_subchapter(&self) -> Option<&Subchapter> {
        self.route
            .subchapter
            .as_deref()
            .and_then(|alias| self.catalog.find_subchapter(alias))
    }

    fn jump_controls(&self, access: AccessState) -> Option<JumpControls> {
        let current = self.current_subchapter()?;
        if !self.catalog.chapter_of(current).is_track {
            return None;
        }

        let target = |sub: &Subchapter| JumpTarget {
            alias: sub.alias.clone(),
            title: sub.title.clone(),
            href: subchapter_href(self.catalog.chapter_of(sub), sub),
        };
        let locked = current.alias == self.settings.first_lesson && access == AccessState::Locked;

        Some(JumpControls {
            expanded: self.ui.jump_buttons_expanded,
            previous: self.catalog.neighbor(&current.alias, false).map(&target),
            next: self
                .catalog
                .neighbor(&current.alias, true)
                .filter(|_| !locked)
                .map(&target),
        })
    }

    fn chat_button_inactive(&self) -> bool {
        let has_next = self
            .route
            .subchapter
            .as_deref()
            .and_then(|alias| self.catalog.neighbor(alias, true))
            .is_some();
        !(has_next || self.ui.jump_buttons_expanded)
    }

    fn refresh_chat_button(&self) {
        self.chat.set_button_inactive(self.chat_button_inactive());
    }

    fn apply_scroll(&mut self) -> bool {
        let Some(metrics) = self.pending_scroll.take() else {
            return false;
        };
        self.scroll_evaluations += 1;

        let expanded = metrics.near_bottom();
        if expanded == self.ui.jump_buttons_expanded {
            return false;
        }
        self.ui.jump_buttons_expanded = expanded;
        self.refresh_chat_button();
        true
    }

    fn after_update(&mut self) -> anyhow::Result<()> {
        self.sync_track().context("sync track")?;
        self.refresh_chat_button();
        Ok(())
    }

    fn sync_track(&mut self) -> anyhow::Result<()> {
        if self.store.get().selected_track_alias.is_none() {
            let default = self.settings.default_track.clone();
            if !self.select_track(&default)? {
                tracing::debug!(alias = %default, "default track is not a track in the catalog");
            }
        }

        let route_track = self
            .route
            .chapter
            .as_deref()
            .and_then(|alias| self.catalog.find_chapter(alias))
            .filter(|chapter| chapter.is_track)
            .map(|chapter| chapter.alias.clone());
        if let Some(alias) = route_track {
            self.select_track(&alias)?;
        }
        Ok(())
    }

    /// Records `alias` as the selected track. Non-track aliases are a no-op.
    fn select_track(&mut self, alias: &str) -> anyhow::Result<bool> {
        if !self.catalog.find_chapter(alias).is_some_and(|c| c.is_track) {
            return Ok(false);
        }
        if self.store.get().selected_track_alias.as_deref() != Some(alias) {
            tracing::info!(track = alias, "selecting track");
            self.store
                .update(&["selectedTrackAlias"], alias)
                .context("store selected track")?;
        }
        Ok(true)
    }
}

fn shows_subchapters(chapter: &Chapter, selected_track: Option<&str>) -> bool {
    !chapter.is_track || selected_track == Some(chapter.alias.as_str())
}

fn chapter_href(chapter: &Chapter) -> String {
    match chapter.first_subchapter() {
        Some(first) => subchapter_href(chapter, first),
        None => format!("/{}", chapter.alias),
    }
}

fn subchapter_href(chapter: &Chapter, sub: &Subchapter) -> String {
    format!("/{}/{}", chapter.alias, sub.alias)
}

fn heading_links(sub: &Subchapter) -> Vec<HeadingLink> {
    match sub.body.markdown() {
        Ok(markdown) => build_tree(&extract_headings(markdown))
            .into_iter()
            .map(|heading| HeadingLink {
                href: format!("#{}", slug(&heading.title)),
                title: heading.title,
            })
            .collect(),
        Err(err) => {
            tracing::warn!(alias = %sub.alias, ?err, "subchapter body unavailable");
            Vec::new()
        }
    }
}
