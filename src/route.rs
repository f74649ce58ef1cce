use anyhow::Context as _;
use url::Url;

/// The parts of a browser location the shell reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub path: String,
    pub chapter: Option<String>,
    pub subchapter: Option<String>,
    pub query: Vec<(String, String)>,
    pub hash: Option<String>,
}

impl Route {
    /// Parses `/chapter/subchapter?query#hash`. Absolute URLs are accepted too.
    pub fn parse(location: &str) -> anyhow::Result<Self> {
        let base = Url::parse("http://localhost/").context("parse base url")?;
        let url = base
            .join(location.trim())
            .with_context(|| format!("parse route: {location:?}"))?;

        let mut segments = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).map(str::to_owned).collect::<Vec<_>>())
            .unwrap_or_default()
            .into_iter();
        let chapter = segments.next();
        let subchapter = segments.next();

        let query = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        Ok(Self {
            path: url.path().to_owned(),
            chapter,
            subchapter,
            query,
            hash: url.fragment().map(str::to_owned),
        })
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Same route with every `key` parameter dropped.
    #[must_use]
    pub fn without_query(&self, key: &str) -> Self {
        let mut route = self.clone();
        route.query.retain(|(k, _)| k != key);
        route
    }

    /// Location string suitable for a history replace.
    pub fn location(&self) -> String {
        let mut out = self.path.clone();
        if !self.query.is_empty() {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(self.query.iter())
                .finish();
            out.push('?');
            out.push_str(&query);
        }
        if let Some(hash) = &self.hash {
            out.push('#');
            out.push_str(hash);
        }
        out
    }
}
