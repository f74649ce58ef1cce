use std::sync::Arc;
use std::time::Instant;

use anyhow::Context as _;
use serde::Serialize;

use crate::auth::HttpCodeExchanger;
use crate::catalog::Catalog;
use crate::cli::{CatalogArgs, Cli, ReadArgs, RenderArgs, SelectTrackArgs, StateSetArgs};
use crate::collab::{HeadlessChatWidget, TracingAnalytics};
use crate::config::{ShellConfig, parse_endpoint};
use crate::render::render_text;
use crate::route::Route;
use crate::shell::{NavigationShell, ScrollMetrics, ShellDeps, ShellSettings};
use crate::state_store::{LocalFsStorage, StateStore};

/// Resolved configuration and catalog shared by every subcommand.
pub struct Workspace {
    pub config: ShellConfig,
    pub catalog: Arc<Catalog>,
}

impl Workspace {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = ShellConfig::from_env().context("load config")?;
        if let Some(dir) = &cli.state_dir {
            config.state_dir = dir.clone();
        }
        if let Some(raw) = &cli.auth_endpoint {
            config.auth_endpoint =
                parse_endpoint(raw).with_context(|| format!("invalid --auth-endpoint {raw:?}"))?;
        }

        let catalog = match &cli.catalog {
            Some(path) => Catalog::from_yaml_path(path)?,
            None => crate::content::builtin().context("build built-in catalog")?,
        };

        Ok(Self {
            config,
            catalog: Arc::new(catalog),
        })
    }

    pub fn store(&self) -> StateStore {
        let store = StateStore::open(Arc::new(LocalFsStorage::new(&self.config.state_dir)));
        tracing::debug!(dir = %self.config.state_dir.display(), durable = store.is_durable(), "opened reading state");
        store
    }

    pub fn shell(&self, route: Route) -> anyhow::Result<NavigationShell> {
        let deps = ShellDeps {
            catalog: self.catalog.clone(),
            analytics: Arc::new(TracingAnalytics),
            chat: Arc::new(HeadlessChatWidget::new()),
        };
        NavigationShell::new(
            deps,
            self.store(),
            ShellSettings::from_config(&self.config),
            route,
        )
    }
}

#[derive(Debug, Serialize)]
struct ChapterListing<'a> {
    alias: &'a str,
    title: &'a str,
    is_track: bool,
    subchapters: Vec<SubchapterListing<'a>>,
}

#[derive(Debug, Serialize)]
struct SubchapterListing<'a> {
    alias: &'a str,
    title: &'a str,
    href: String,
}

pub fn catalog(ws: &Workspace, args: CatalogArgs) -> anyhow::Result<()> {
    let listing = ws
        .catalog
        .chapters()
        .iter()
        .map(|chapter| ChapterListing {
            alias: &chapter.alias,
            title: &chapter.title,
            is_track: chapter.is_track,
            subchapters: chapter
                .subchapters
                .iter()
                .map(|sub| SubchapterListing {
                    alias: &sub.alias,
                    title: &sub.title,
                    href: format!("/{}/{}", chapter.alias, sub.alias),
                })
                .collect(),
        })
        .collect::<Vec<_>>();

    if args.json {
        let json = serde_json::to_string_pretty(&listing).context("serialize catalog")?;
        println!("{json}");
        return Ok(());
    }

    for (idx, chapter) in listing.iter().enumerate() {
        let track = if chapter.is_track { " (track)" } else { "" };
        println!("{} {} [{}]{track}", idx + 1, chapter.title, chapter.alias);
        for sub in &chapter.subchapters {
            println!("  {}  {}", sub.title, sub.href);
        }
    }
    Ok(())
}

pub async fn render(ws: &Workspace, args: RenderArgs) -> anyhow::Result<()> {
    let route = Route::parse(&args.route)?;
    let mut shell = ws.shell(route)?;

    let metrics = ScrollMetrics {
        scroll_top: args.scroll_top,
        scroll_height: args.scroll_height,
        viewport_height: args.viewport_height,
    };
    shell.mount(metrics, Instant::now()).await.context("mount")?;

    if shell.pending_code().is_some() {
        let exchanger = HttpCodeExchanger::new(ws.config.auth_endpoint.clone());
        shell
            .run_auth_callback(&exchanger)
            .await
            .context("auth callback")?;
    }

    if args.toggle_sidebar {
        shell.toggle_sidebar();
    }
    if args.open_overlay && !shell.open_overlay() {
        tracing::warn!("overlay needs a signed-in user with a project id");
    }

    let view = shell.render();
    shell.unmount();

    if args.json {
        let json = serde_json::to_string_pretty(&view).context("serialize view")?;
        println!("{json}");
    } else {
        print!("{}", render_text(&view)?);
    }
    Ok(())
}

pub fn read(ws: &Workspace, args: ReadArgs) -> anyhow::Result<()> {
    let mut shell = ws.shell(Route::parse("/")?)?;
    if !shell.mark_read(&args.alias)? {
        anyhow::bail!("unknown subchapter: {}", args.alias);
    }
    ensure_durable(ws, shell.store())?;
    println!("marked {} as read", args.alias);
    Ok(())
}

pub fn skip_auth(ws: &Workspace) -> anyhow::Result<()> {
    let mut shell = ws.shell(Route::parse("/")?)?;
    shell.skip_auth()?;
    ensure_durable(ws, shell.store())?;
    println!("continuing without sign-in");
    Ok(())
}

pub fn select_track(ws: &Workspace, args: SelectTrackArgs) -> anyhow::Result<()> {
    if !ws
        .catalog
        .find_chapter(&args.alias)
        .is_some_and(|chapter| chapter.is_track)
    {
        anyhow::bail!("not a track: {}", args.alias);
    }

    let mut shell = ws.shell(Route::parse("/")?)?;
    shell.click_chapter(&args.alias)?;
    ensure_durable(ws, shell.store())?;
    println!("selected track {}", args.alias);
    Ok(())
}

pub fn state_show(ws: &Workspace) -> anyhow::Result<()> {
    let store = ws.store();
    let json = serde_json::to_string_pretty(store.document()).context("serialize state")?;
    println!("{json}");
    Ok(())
}

pub fn state_set(ws: &Workspace, args: StateSetArgs) -> anyhow::Result<()> {
    let path = args
        .path
        .split('.')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>();
    let value: serde_json::Value = serde_json::from_str(&args.value)
        .with_context(|| format!("parse value as json: {:?}", args.value))?;

    let mut store = ws.store();
    store.update(&path, value)?;
    ensure_durable(ws, &store)?;
    println!("set {}", args.path);
    Ok(())
}

fn ensure_durable(ws: &Workspace, store: &StateStore) -> anyhow::Result<()> {
    if !store.is_durable() {
        anyhow::bail!(
            "state kept in memory only; could not write {}",
            ws.config.state_dir.display()
        );
    }
    Ok(())
}
