//! Plain-text rendering of a [`ShellView`] for terminals.

use std::fmt::Write as _;

use crate::shell::{AccessState, Marker, ShellView};

pub fn render_text(view: &ShellView) -> anyhow::Result<String> {
    let mut out = String::new();

    writeln!(out, "{}", view.title)?;
    writeln!(out, "at {}", view.location)?;
    let access = match view.access {
        AccessState::Locked => "locked",
        AccessState::Skipped => "skipped sign-in",
        AccessState::Authenticated => "signed in",
    };
    writeln!(out, "access: {access}")?;
    if let Some(server) = &view.server_button {
        writeln!(out, "[server: {}]", server.project_id)?;
    }

    writeln!(out)?;
    let bar = if view.ui.sidebar_open { "open" } else { "closed" };
    writeln!(out, "sidebar ({bar})")?;
    for chapter in &view.chapters {
        let track = if chapter.is_track { " (track)" } else { "" };
        writeln!(
            out,
            "{} {}{track}  {}",
            chapter.ordinal, chapter.title, chapter.href
        )?;
        for sub in &chapter.subchapters {
            let marker = match sub.marker {
                Marker::Check => "[x]",
                Marker::Dot => "[ ]",
            };
            let current = if sub.current { " <" } else { "" };
            let progress = if sub.progress_bar { " |last read|" } else { "" };
            writeln!(out, "  {marker} {}{progress}{current}", sub.label)?;
            for heading in &sub.headings {
                writeln!(out, "      {}  {}", heading.title, heading.href)?;
            }
        }
    }
    if !view.last_updated.is_empty() {
        writeln!(out, "last updated {}", view.last_updated)?;
    }

    if let Some(jump) = &view.jump {
        writeln!(out)?;
        let state = if jump.expanded { "expanded" } else { "collapsed" };
        match &jump.previous {
            Some(prev) => writeln!(out, "< {} ({state})  {}", prev.title, prev.href)?,
            None => writeln!(out, "< none ({state})")?,
        }
        match &jump.next {
            Some(next) => writeln!(out, "> {} ({state})  {}", next.title, next.href)?,
            None => writeln!(out, "> none ({state})")?,
        }
    }

    if let Some(overlay) = &view.overlay {
        writeln!(out)?;
        writeln!(out, "overlay: GraphQL server {}", overlay.project_id)?;
    }

    let chat = if view.chat_button_inactive {
        "inactive"
    } else {
        "active"
    };
    writeln!(out, "chat button: {chat}")?;

    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::collab::{HeadlessChatWidget, RecordingAnalytics};
    use crate::route::Route;
    use crate::shell::{NavigationShell, ShellDeps, ShellSettings};
    use crate::state_store::StateStore;

    #[test]
    fn lists_chapters_and_marks_current() -> anyhow::Result<()> {
        let deps = ShellDeps {
            catalog: Arc::new(crate::content::builtin()?),
            analytics: Arc::new(RecordingAnalytics::new()),
            chat: Arc::new(HeadlessChatWidget::new()),
        };
        let mut shell = NavigationShell::new(
            deps,
            StateStore::in_memory(),
            ShellSettings::default(),
            Route::parse("/introduction/welcome")?,
        )?;
        shell.mark_read("welcome")?;

        let text = render_text(&shell.render())?;
        assert!(text.starts_with("Learn Apollo | Hands-on GraphQL Tutorial\n"));
        assert!(text.contains("1 Introduction  /introduction/welcome"));
        assert!(text.contains("  [x] 01 - Welcome |last read| <"));
        assert!(text.contains("  [ ] 02 - GraphQL Basics"));
        assert!(text.contains("access: locked"));
        assert!(!text.contains("overlay:"));
        Ok(())
    }
}
