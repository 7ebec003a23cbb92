//! Template source loading.
//!
//! [`TemplateSource`] reads the template directory:
//!
//! ```text
//! template.conf            site config: layouts and routes (JSON)
//! <region>.region          region fragments
//! collections/<type>.item  collection item fragments
//! collections/<type>.list  collection list fragments
//! collections/<type>.conf  optional {"layout": "<layout>"}
//! blocks/<name>.block      block fragments
//! assets/                  static files
//! ```
//!
//! Files are re-read on every call so edits show up on the next request.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

use pagewright_core::{PagewrightError, PagewrightResult};
use pagewright_http::RoutePattern;

use crate::blocks::BlockSource;
use crate::html::diagnostic_comment;

/// File name of the site config.
pub const CONFIG_FILE: &str = "template.conf";
/// Fragment key of the concatenated header regions.
pub const HEADER_KEY: &str = "__HEADER";
/// Fragment key of the concatenated footer regions.
pub const FOOTER_KEY: &str = "__FOOTER";

const COLLECTIONS_DIR: &str = "collections";
const BLOCKS_DIR: &str = "blocks";
const ASSETS_DIR: &str = "assets";

/// The parsed `template.conf`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteConfig {
    /// Display name of the template.
    #[serde(default)]
    pub name: String,
    /// Layouts keyed by layout name.
    #[serde(default)]
    pub layouts: BTreeMap<String, LayoutConfig>,
    /// Route table, tried in order.
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

/// One named layout.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayoutConfig {
    /// Display name of the layout.
    #[serde(default)]
    pub name: String,
    /// Region fragment names, in document order.
    #[serde(default)]
    pub regions: Vec<String>,
}

/// One route table entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteConfig {
    /// The route pattern, e.g. `/blog/:slug!slug`.
    pub pattern: String,
    /// The fragment key answering the route, e.g. `blog.item`.
    pub template: String,
}

impl SiteConfig {
    /// Parses every route pattern, in table order.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for the first invalid pattern.
    pub fn route_patterns(&self) -> PagewrightResult<Vec<RoutePattern>> {
        self.routes
            .iter()
            .map(|r| RoutePattern::parse(&r.pattern))
            .collect()
    }
}

#[derive(Debug, Default, Deserialize)]
struct CollectionConfig {
    layout: Option<String>,
}

/// Template fragments for one render, keyed by logical key.
///
/// Keys are `<type>.item`, `<type>.list`, `<layout>.region`, and the reserved
/// [`HEADER_KEY`] and [`FOOTER_KEY`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentMap {
    layout: String,
    fragments: BTreeMap<String, String>,
}

impl FragmentMap {
    /// Creates an empty map for the given layout.
    pub fn new(layout: impl Into<String>) -> Self {
        Self {
            layout: layout.into(),
            fragments: BTreeMap::new(),
        }
    }

    /// Returns the layout this map was built for.
    pub fn layout(&self) -> &str {
        &self.layout
    }

    /// Returns the key of the layout's body region.
    pub fn region_key(&self) -> String {
        format!("{}.region", self.layout)
    }

    /// Returns a fragment.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fragments.get(key).map(String::as_str)
    }

    /// Inserts or replaces a fragment.
    pub fn insert(&mut self, key: impl Into<String>, text: impl Into<String>) {
        self.fragments.insert(key.into(), text.into());
    }

    /// Appends to a fragment, creating it if absent.
    pub fn append(&mut self, key: &str, text: &str) {
        self.fragments.entry(key.to_string()).or_default().push_str(text);
    }

    /// Returns every key, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fragments.keys().map(String::as_str)
    }
}

/// Reads fragments and config from a template directory.
#[derive(Debug, Clone)]
pub struct TemplateSource {
    dir: PathBuf,
}

impl TemplateSource {
    /// Creates a source rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the template directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the static assets directory.
    pub fn assets_dir(&self) -> PathBuf {
        self.dir.join(ASSETS_DIR)
    }

    /// Reads and parses `template.conf`.
    ///
    /// # Errors
    ///
    /// Returns `TemplateDoesNotExist` if the file is missing and a
    /// configuration error if it is not valid JSON.
    pub fn config(&self) -> PagewrightResult<SiteConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let text = read_optional(&path)?.ok_or_else(|| {
            PagewrightError::TemplateDoesNotExist(path.display().to_string())
        })?;
        serde_json::from_str(&text)
            .map_err(|e| PagewrightError::Configuration(format!("{}: {e}", path.display())))
    }

    /// Reads a region fragment.
    pub fn region(&self, name: &str) -> PagewrightResult<Option<String>> {
        read_optional(&self.dir.join(format!("{name}.region")))
    }

    /// Returns the layout named by `collections/<type>.conf`, if any.
    pub fn collection_layout(&self, collection_type: &str) -> PagewrightResult<Option<String>> {
        if !is_flat_name(collection_type) {
            return Ok(None);
        }
        let path = self
            .dir
            .join(COLLECTIONS_DIR)
            .join(format!("{collection_type}.conf"));
        let Some(text) = read_optional(&path)? else {
            return Ok(None);
        };
        let conf: CollectionConfig = serde_json::from_str(&text)
            .map_err(|e| PagewrightError::Configuration(format!("{}: {e}", path.display())))?;
        Ok(conf.layout.filter(|l| !l.is_empty()))
    }

    /// Reads every `collections/*.item` and `*.list` fragment.
    pub fn collection_fragments(&self) -> PagewrightResult<BTreeMap<String, String>> {
        let dir = self.dir.join(COLLECTIONS_DIR);
        let mut fragments = BTreeMap::new();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(fragments),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let path = entry?.path();
            let is_fragment = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == "item" || e == "list");
            if !is_fragment {
                continue;
            }
            if let Some(key) = path.file_name().and_then(|n| n.to_str()) {
                fragments.insert(key.to_string(), std::fs::read_to_string(&path)?);
            }
        }
        Ok(fragments)
    }

    /// Builds the fragment map for one layout.
    ///
    /// Regions whose name contains `header` are concatenated into
    /// [`HEADER_KEY`], those containing `footer` into [`FOOTER_KEY`], and the
    /// rest into `<layout>.region`. A missing region degrades to a diagnostic
    /// comment.
    pub fn fragment_map(&self, config: &SiteConfig, layout: &str) -> PagewrightResult<FragmentMap> {
        let mut map = FragmentMap::new(layout);

        match config.layouts.get(layout) {
            Some(layout_config) => {
                let region_key = map.region_key();
                for region in &layout_config.regions {
                    let text = self.region(region)?.unwrap_or_else(|| {
                        tracing::warn!(region = %region, layout, "region fragment not found");
                        diagnostic_comment(&format!("missing region '{region}'"))
                    });
                    let lower = region.to_ascii_lowercase();
                    let key = if lower.contains("header") {
                        HEADER_KEY
                    } else if lower.contains("footer") {
                        FOOTER_KEY
                    } else {
                        region_key.as_str()
                    };
                    map.append(key, &text);
                }
            }
            None => tracing::warn!(layout, "layout not defined in {CONFIG_FILE}"),
        }

        for (key, text) in self.collection_fragments()? {
            map.insert(key, text);
        }
        Ok(map)
    }

    /// Checks the template directory for problems.
    ///
    /// Returns one message per problem; an empty list means the directory is
    /// usable.
    pub fn validate(&self) -> PagewrightResult<Vec<String>> {
        let config = self.config()?;
        let mut problems = Vec::new();

        if config.layouts.is_empty() {
            problems.push(format!("{CONFIG_FILE} defines no layouts"));
        }
        for (name, layout) in &config.layouts {
            for region in &layout.regions {
                if self.region(region)?.is_none() {
                    problems.push(format!("layout '{name}': missing {region}.region"));
                }
            }
        }

        let collections = self.collection_fragments()?;
        for route in &config.routes {
            if let Err(e) = RoutePattern::parse(&route.pattern) {
                problems.push(format!("route '{}': {e}", route.pattern));
            }
            let resolvable = match route.template.strip_suffix(".region") {
                Some(layout) => config.layouts.contains_key(layout),
                None => collections.contains_key(&route.template),
            };
            if !resolvable {
                problems.push(format!(
                    "route '{}': unknown template '{}'",
                    route.pattern, route.template
                ));
            }
        }
        Ok(problems)
    }
}

impl BlockSource for TemplateSource {
    /// Names must be a single file name under `blocks/`; anything with a
    /// path separator or a `..` component is treated as missing.
    fn block(&self, name: &str) -> PagewrightResult<Option<String>> {
        let name = name.strip_suffix(".block").unwrap_or(name);
        if !is_flat_name(name) {
            tracing::warn!(name, "rejected block name outside {BLOCKS_DIR}/");
            return Ok(None);
        }
        read_optional(&self.dir.join(BLOCKS_DIR).join(format!("{name}.block")))
    }
}

/// A single plain file name: no separators, no `.` or `..`.
fn is_flat_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

fn read_optional(path: &Path) -> PagewrightResult<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
