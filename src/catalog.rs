use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context as _;

use crate::formats::CatalogFile;

/// Markdown source of a subchapter, resolved on first access.
#[derive(Debug)]
pub struct DocumentBody {
    source: BodySource,
    cache: OnceLock<String>,
}

#[derive(Debug)]
enum BodySource {
    Inline(String),
    File(PathBuf),
}

impl DocumentBody {
    pub fn inline(markdown: impl Into<String>) -> Self {
        Self {
            source: BodySource::Inline(markdown.into()),
            cache: OnceLock::new(),
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: BodySource::File(path.into()),
            cache: OnceLock::new(),
        }
    }

    pub fn markdown(&self) -> anyhow::Result<&str> {
        match &self.source {
            BodySource::Inline(text) => Ok(text.as_str()),
            BodySource::File(path) => {
                if let Some(text) = self.cache.get() {
                    return Ok(text.as_str());
                }
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("read subchapter body: {}", path.display()))?;
                Ok(self.cache.get_or_init(|| text).as_str())
            }
        }
    }
}

#[derive(Debug)]
pub struct Chapter {
    pub alias: String,
    pub title: String,
    pub is_track: bool,
    pub subchapters: Vec<Subchapter>,
}

impl Chapter {
    pub fn new(alias: impl Into<String>, title: impl Into<String>, is_track: bool) -> Self {
        Self {
            alias: alias.into(),
            title: title.into(),
            is_track,
            subchapters: Vec::new(),
        }
    }

    #[must_use]
    pub fn subchapter(
        mut self,
        alias: impl Into<String>,
        title: impl Into<String>,
        body: DocumentBody,
    ) -> Self {
        self.subchapters.push(Subchapter {
            alias: alias.into(),
            title: title.into(),
            chapter: 0,
            body,
        });
        self
    }

    pub fn first_subchapter(&self) -> Option<&Subchapter> {
        self.subchapters.first()
    }
}

#[derive(Debug)]
pub struct Subchapter {
    pub alias: String,
    pub title: String,
    /// Index of the owning chapter in the catalog.
    chapter: usize,
    pub body: DocumentBody,
}

/// Immutable chapter table with a flattened reading order.
#[derive(Debug)]
pub struct Catalog {
    chapters: Vec<Chapter>,
    order: Vec<(usize, usize)>,
    positions: HashMap<String, usize>,
    chapter_positions: HashMap<String, usize>,
}

impl Catalog {
    pub fn new(mut chapters: Vec<Chapter>) -> anyhow::Result<Self> {
        if chapters.is_empty() {
            anyhow::bail!("catalog has no chapters");
        }

        let mut order = Vec::new();
        let mut positions = HashMap::new();
        let mut chapter_positions = HashMap::new();

        for (ch_idx, chapter) in chapters.iter_mut().enumerate() {
            ensure_slug(&chapter.alias).context("invalid chapter alias")?;
            if chapter.title.trim().is_empty() {
                anyhow::bail!("chapter title is empty: {}", chapter.alias);
            }
            if chapter.subchapters.is_empty() {
                anyhow::bail!("chapter has no subchapters: {}", chapter.alias);
            }
            if chapter_positions
                .insert(chapter.alias.clone(), ch_idx)
                .is_some()
            {
                anyhow::bail!("duplicate chapter alias: {}", chapter.alias);
            }

            for (sub_idx, sub) in chapter.subchapters.iter_mut().enumerate() {
                ensure_slug(&sub.alias).context("invalid subchapter alias")?;
                if sub.title.trim().is_empty() {
                    anyhow::bail!("subchapter title is empty: {}", sub.alias);
                }
                if positions.insert(sub.alias.clone(), order.len()).is_some() {
                    anyhow::bail!("duplicate subchapter alias: {}", sub.alias);
                }
                sub.chapter = ch_idx;
                order.push((ch_idx, sub_idx));
            }
        }

        tracing::debug!(
            chapters = chapters.len(),
            subchapters = order.len(),
            "catalog built"
        );

        Ok(Self {
            chapters,
            order,
            positions,
            chapter_positions,
        })
    }

    /// Loads `catalog.yaml`. Body paths resolve against the file's directory.
    pub fn from_yaml_path(path: &Path) -> anyhow::Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("read catalog: {}", path.display()))?;
        let file: CatalogFile = serde_yaml::from_str(&yaml).context("parse catalog yaml")?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

        let chapters = file
            .chapters
            .into_iter()
            .map(|ch| {
                ch.subchapters.into_iter().fold(
                    Chapter::new(ch.alias, ch.title, ch.track),
                    |chapter, sub| {
                        let body = DocumentBody::file(base_dir.join(&sub.body));
                        chapter.subchapter(sub.alias, sub.title, body)
                    },
                )
            })
            .collect();

        Self::new(chapters).with_context(|| format!("validate catalog: {}", path.display()))
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Chapter> {
        self.chapters.iter().filter(|c| c.is_track)
    }

    pub fn find_chapter(&self, alias: &str) -> Option<&Chapter> {
        self.chapter_positions
            .get(alias)
            .map(|&idx| &self.chapters[idx])
    }

    pub fn find_subchapter(&self, alias: &str) -> Option<&Subchapter> {
        self.position(alias).and_then(|pos| self.at(pos))
    }

    pub fn chapter_of(&self, subchapter: &Subchapter) -> &Chapter {
        &self.chapters[subchapter.chapter]
    }

    /// Position in the flattened reading order.
    pub fn position(&self, alias: &str) -> Option<usize> {
        self.positions.get(alias).copied()
    }

    pub fn neighbor(&self, alias: &str, forward: bool) -> Option<&Subchapter> {
        let pos = self.position(alias)?;
        let target = if forward {
            pos.checked_add(1)?
        } else {
            pos.checked_sub(1)?
        };
        self.at(target)
    }

    /// The read subchapter that comes last in reading order.
    pub fn last_read(&self, has_read: &BTreeMap<String, bool>) -> Option<&Subchapter> {
        has_read
            .iter()
            .filter(|(_, read)| **read)
            .filter_map(|(alias, _)| self.position(alias))
            .max()
            .and_then(|pos| self.at(pos))
    }

    pub fn subchapters(&self) -> impl Iterator<Item = &Subchapter> {
        self.order
            .iter()
            .map(|&(ch, sub)| &self.chapters[ch].subchapters[sub])
    }

    fn at(&self, pos: usize) -> Option<&Subchapter> {
        let &(ch, sub) = self.order.get(pos)?;
        Some(&self.chapters[ch].subchapters[sub])
    }
}

fn ensure_slug(alias: &str) -> anyhow::Result<()> {
    if alias.is_empty() {
        anyhow::bail!("alias is empty");
    }
    if !alias
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        anyhow::bail!("alias must be lowercase slug form: {alias:?}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body() -> DocumentBody {
        DocumentBody::inline("# Title\n")
    }

    fn intro_core() -> anyhow::Result<Catalog> {
        Catalog::new(vec![
            Chapter::new("intro", "Intro", false)
                .subchapter("a", "A", body())
                .subchapter("b", "B", body()),
            Chapter::new("core", "Core", true).subchapter("c", "C", body()),
        ])
    }

    #[test]
    fn find_subchapter_returns_matching_alias() -> anyhow::Result<()> {
        let catalog = intro_core()?;
        for alias in ["a", "b", "c"] {
            let found = catalog
                .find_subchapter(alias)
                .ok_or_else(|| anyhow::anyhow!("missing {alias}"))?;
            assert_eq!(found.alias, alias);
        }
        assert!(catalog.find_subchapter("zzz").is_none());
        Ok(())
    }

    #[test]
    fn neighbor_crosses_chapters_and_stops_at_ends() -> anyhow::Result<()> {
        let catalog = intro_core()?;

        assert!(catalog.neighbor("a", false).is_none());
        assert!(catalog.neighbor("c", true).is_none());
        assert_eq!(catalog.neighbor("a", true).map(|s| s.alias.as_str()), Some("b"));
        assert_eq!(catalog.neighbor("b", true).map(|s| s.alias.as_str()), Some("c"));
        assert_eq!(catalog.neighbor("c", false).map(|s| s.alias.as_str()), Some("b"));
        assert!(catalog.neighbor("missing", true).is_none());
        Ok(())
    }

    #[test]
    fn neighbor_forward_then_back_is_identity_for_interior() -> anyhow::Result<()> {
        let catalog = intro_core()?;
        let back = catalog
            .neighbor("b", true)
            .and_then(|next| catalog.neighbor(&next.alias, false))
            .map(|s| s.alias.as_str());
        assert_eq!(back, Some("b"));
        Ok(())
    }

    #[test]
    fn chapter_of_points_back_to_owner() -> anyhow::Result<()> {
        let catalog = intro_core()?;
        let c = catalog
            .find_subchapter("c")
            .ok_or_else(|| anyhow::anyhow!("missing c"))?;
        assert_eq!(catalog.chapter_of(c).alias, "core");
        Ok(())
    }

    #[test]
    fn tracks_only_yields_track_chapters() -> anyhow::Result<()> {
        let catalog = intro_core()?;
        let tracks = catalog.tracks().map(|c| c.alias.as_str()).collect::<Vec<_>>();
        assert_eq!(tracks, vec!["core"]);
        Ok(())
    }

    #[test]
    fn last_read_picks_greatest_position_and_ignores_false() -> anyhow::Result<()> {
        let catalog = intro_core()?;
        let mut has_read = BTreeMap::new();
        assert!(catalog.last_read(&has_read).is_none());

        has_read.insert("a".to_owned(), true);
        assert_eq!(catalog.last_read(&has_read).map(|s| s.alias.as_str()), Some("a"));

        has_read.insert("c".to_owned(), false);
        has_read.insert("ghost".to_owned(), true);
        assert_eq!(catalog.last_read(&has_read).map(|s| s.alias.as_str()), Some("a"));

        has_read.insert("b".to_owned(), true);
        assert_eq!(catalog.last_read(&has_read).map(|s| s.alias.as_str()), Some("b"));
        Ok(())
    }

    #[test]
    fn rejects_duplicate_subchapter_alias_across_chapters() {
        let err = Catalog::new(vec![
            Chapter::new("intro", "Intro", false).subchapter("a", "A", body()),
            Chapter::new("core", "Core", false).subchapter("a", "Again", body()),
        ])
        .unwrap_err();
        assert!(format!("{err:#}").contains("duplicate subchapter alias: a"));
    }

    #[test]
    fn rejects_duplicate_chapter_alias_and_empty_chapter() {
        let err = Catalog::new(vec![
            Chapter::new("intro", "Intro", false).subchapter("a", "A", body()),
            Chapter::new("intro", "Intro", false).subchapter("b", "B", body()),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("duplicate chapter alias"));

        let err = Catalog::new(vec![Chapter::new("intro", "Intro", false)]).unwrap_err();
        assert!(err.to_string().contains("no subchapters"));
    }

    #[test]
    fn rejects_non_slug_alias() {
        let err = Catalog::new(vec![
            Chapter::new("Intro Chapter", "Intro", false).subchapter("a", "A", body()),
        ])
        .unwrap_err();
        assert!(format!("{err:#}").contains("slug form"));
    }

    #[test]
    fn yaml_catalog_resolves_bodies_lazily() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        std::fs::write(
            temp.path().join("catalog.yaml"),
            "chapters:\n  - alias: intro\n    title: Intro\n    subchapters:\n      - alias: a\n        title: A\n        body: a.md\n",
        )?;
        let catalog = Catalog::from_yaml_path(&temp.path().join("catalog.yaml"))?;

        // Body file is only read on first access.
        std::fs::write(temp.path().join("a.md"), "# Hello\n")?;
        let a = catalog
            .find_subchapter("a")
            .ok_or_else(|| anyhow::anyhow!("missing a"))?;
        assert_eq!(a.body.markdown()?, "# Hello\n");

        std::fs::remove_file(temp.path().join("a.md"))?;
        assert_eq!(a.body.markdown()?, "# Hello\n");
        Ok(())
    }
}
