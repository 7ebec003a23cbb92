//! The render pipeline.
//!
//! [`Renderer`] answers one request path:
//!
//! 1. fetch the page (JSON + HTML), through the disk cache
//! 2. pick the fragment key from the route table or the page JSON
//! 3. seal the live page's chrome and `mainContent`, compose, expand block
//!    includes, shield scripts
//! 4. resolve queries one at a time, sealing each output
//! 5. inject navigation, rewrite share links, in sealed text as well
//! 6. expand through the engine, restore everything shielded
//! 7. render block fields
//!
//! Stages run in sequence on the request's own task. Dropping the render
//! future (for instance when the client goes away) abandons every remaining
//! stage.

use std::sync::Arc;

use serde_json::Value;
use tracing::Instrument;

use pagewright_core::cache::squash_html;
use pagewright_core::logging::request_span;
use pagewright_core::{DiskCache, PagewrightError, PagewrightResult, Settings};
use pagewright_http::urls::matcher::normalize_path;
use pagewright_http::{match_path, ContentApi, ForwardedParams, HttpContentApi, PageData};

use crate::block_field::BlockFieldRenderer;
use crate::blocks;
use crate::composer::{Composer, PageChrome, PageKind};
use crate::context::RenderContext;
use crate::directive::{contains_tag, NAVIGATION_TAG};
use crate::engine::Engine;
use crate::fetch::{persist, read_through};
use crate::links;
use crate::loaders::{SiteConfig, TemplateSource};
use crate::navigation::NavigationInjector;
use crate::query::{push_key_param, QueryResolver};
use crate::script_guard::Guard;

/// The result of rendering one request.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    /// A composed HTML page.
    Html(String),
    /// The raw page JSON, for `format=json`.
    Json(Value),
}

impl Rendered {
    /// The response content type.
    pub const fn content_type(&self) -> &'static str {
        match self {
            Self::Html(_) => "text/html; charset=utf-8",
            Self::Json(_) => "application/json",
        }
    }

    /// Returns the HTML, if this is a page.
    pub fn html(&self) -> Option<&str> {
        match self {
            Self::Html(html) => Some(html),
            Self::Json(_) => None,
        }
    }
}

/// Renders pages from the template directory and the remote site.
///
/// Holds no per-request state; one renderer serves every request.
#[derive(Clone)]
pub struct Renderer {
    settings: Settings,
    api: Arc<dyn ContentApi>,
    cache: DiskCache,
    engine: Engine,
    source: TemplateSource,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("template_dir", &self.source.dir())
            .field("cache_dir", &self.cache.dir())
            .field("site_url", &self.settings.site_url)
            .finish_non_exhaustive()
    }
}

impl Renderer {
    /// Creates a renderer over an explicit content API.
    pub fn new(settings: Settings, api: Arc<dyn ContentApi>) -> Self {
        Self {
            cache: DiskCache::new(&settings.cache_dir),
            source: TemplateSource::new(&settings.template_dir),
            engine: Engine::new(),
            api,
            settings,
        }
    }

    /// Creates a renderer talking to `settings.site_url` over HTTP.
    ///
    /// # Errors
    ///
    /// Fails if no site URL is configured.
    pub fn from_settings(settings: Settings) -> PagewrightResult<Self> {
        let api = HttpContentApi::from_settings(&settings)?;
        Ok(Self::new(settings, Arc::new(api)))
    }

    /// Returns the settings.
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns the disk cache.
    pub const fn cache(&self) -> &DiskCache {
        &self.cache
    }

    /// Returns the template source.
    pub const fn source(&self) -> &TemplateSource {
        &self.source
    }

    /// Renders `path`.
    ///
    /// # Errors
    ///
    /// Any stage failure: a remote error, a malformed directive, a cyclic
    /// include, a template error, or a missing `template.conf`.
    pub async fn render(
        &self,
        path: &str,
        params: &ForwardedParams,
    ) -> PagewrightResult<Rendered> {
        self.render_page(path, params)
            .instrument(request_span(path))
            .await
    }

    async fn render_page(
        &self,
        path: &str,
        params: &ForwardedParams,
    ) -> PagewrightResult<Rendered> {
        let page = self.fetch_page(path, params).await?;
        if params.wants_json() {
            tracing::debug!("returning page json");
            return Ok(Rendered::Json(page.json));
        }

        let mut ctx = RenderContext::new(path, params.clone(), page);
        let html = self.compose_page(&mut ctx).await?;
        tracing::debug!(
            template = %ctx.template_key,
            queries = ctx.queries_resolved,
            guarded = ctx.guard.len(),
            bytes = html.len(),
            "page rendered"
        );
        Ok(Rendered::Html(html))
    }

    async fn compose_page(&self, ctx: &mut RenderContext) -> PagewrightResult<String> {
        let config = self.source.config()?;
        let layout = self.select_template(&config, ctx)?;
        ctx.fragments = self.source.fragment_map(&config, &layout)?;
        tracing::debug!(template = %ctx.template_key, layout = %layout, "template selected");

        let chrome = PageChrome {
            headers: seal_nonempty(&mut ctx.guard, &ctx.chrome.headers),
            footers: seal_nonempty(&mut ctx.guard, &ctx.chrome.footers),
        };
        let main_content = match ctx.info.kind {
            PageKind::Page => {
                let html = ctx.page.json.get("mainContent").and_then(Value::as_str).unwrap_or_default();
                seal_nonempty(&mut ctx.guard, html)
            }
            PageKind::Item | PageKind::List => String::new(),
        };

        let text = Composer::new(&ctx.info, &chrome, &main_content).compose(&ctx.template_key, &ctx.fragments);
        let text = blocks::expand(&text, &self.source, self.settings.max_include_depth)?;
        let text = ctx.guard.extract_scripts(&text);

        let data = ctx.engine_data();
        let nocache = ctx.params.nocache();
        let (text, resolved) = QueryResolver::new(&*self.api, &self.cache, &self.engine, &ctx.params)
            .with_password(self.settings.password.as_deref())
            .with_limit(self.settings.max_directives)
            .resolve_all(text, &data, &mut ctx.guard)
            .await?;
        ctx.queries_resolved = resolved;

        let navigation = |t: &str| contains_tag(t, NAVIGATION_TAG);
        let text = if navigation(text.as_str()) || ctx.guard.any_remote(navigation) {
            let site_layout = read_through(&self.cache, "site-layout", nocache, self.api.site_layout()).await?;
            let collections = read_through(&self.cache, "collections", nocache, self.api.collections()).await?;
            let injector = NavigationInjector::new(&self.engine, &self.source, self.settings.max_include_depth);
            let inject = |t: &str| -> PagewrightResult<String> {
                if navigation(t) {
                    injector.inject(t, &ctx.page.json, &site_layout, &collections)
                } else {
                    Ok(t.to_string())
                }
            };
            ctx.guard.rewrite_remote(&inject)?;
            inject(text.as_str())?
        } else {
            text
        };
        let site_root = self.settings.site_root();
        ctx.guard
            .rewrite_remote(|t| Ok::<_, PagewrightError>(links::rewrite(t, site_root)))?;
        let text = links::rewrite(&text, site_root);

        let text = self.engine.render(&text, &data)?;
        let text = ctx.guard.restore(&text);
        tracing::debug!("engine expansion done");

        BlockFieldRenderer::new(&*self.api, &self.cache, nocache)
            .render(text)
            .await
    }

    /// Sets the context's template key and bindings, returning the layout.
    ///
    /// A route table match wins over the key derived from the page JSON.
    fn select_template(&self, config: &SiteConfig, ctx: &mut RenderContext) -> PagewrightResult<String> {
        let patterns = config.route_patterns()?;
        let matched = match_path(&ctx.path, &patterns);
        let routed = matched
            .index
            .and_then(|i| config.routes.get(i))
            .map(|route| route.template.clone());

        if let Some(template) = routed {
            tracing::debug!(pattern = ?matched.pattern.as_ref().map(|p| p.source()), "route matched");
            ctx.bindings = matched.bindings;
            let layout = match template.strip_suffix(".region") {
                Some(stem) => stem.to_string(),
                None => {
                    let collection_type = template.rsplit_once('.').map_or(template.as_str(), |(t, _)| t);
                    self.layout_for(collection_type, ctx.info.region_name.as_deref())?
                }
            };
            ctx.template_key = template;
            return Ok(layout);
        }

        let layout = self.layout_for(&ctx.info.collection_type, ctx.info.region_name.as_deref())?;
        ctx.template_key = ctx.info.template_key(&layout);
        Ok(layout)
    }

    fn layout_for(&self, collection_type: &str, region_name: Option<&str>) -> PagewrightResult<String> {
        Ok(self
            .source
            .collection_layout(collection_type)?
            .or_else(|| region_name.map(str::to_string))
            .unwrap_or_else(|| self.settings.default_layout.clone()))
    }

    async fn fetch_page(&self, path: &str, params: &ForwardedParams) -> PagewrightResult<PageData> {
        let slug = page_slug(path, params);
        if !params.nocache() {
            if let (Ok(Some(json)), Ok(Some(html))) = (
                self.cache.read_json(&slug).await,
                self.cache.read_text(&slug, "html").await,
            ) {
                tracing::debug!(slug = %slug, "page cache hit");
                return Ok(PageData { json, html });
            }
        }

        let page = self.api.page(path, params).await?;
        persist(&self.cache, &slug, &page.json).await;
        if let Err(e) = self.cache.write_text(&slug, "html", &squash_html(&page.html)).await {
            tracing::warn!(slug = %slug, error = %e, "cache write failed");
        }
        Ok(page)
    }
}

fn seal_nonempty(guard: &mut Guard, text: &str) -> String {
    if text.is_empty() {
        String::new()
    } else {
        guard.seal(text)
    }
}

/// Builds the cache key of a page fetch.
///
/// # Examples
///
/// ```
/// use pagewright_http::ForwardedParams;
/// use pagewright_template::pipeline::page_slug;
///
/// let params = ForwardedParams::from_query(Some("month=03-2024&format=json"));
/// assert_eq!(page_slug("/blog/", &params), "page-blog&month=03-2024");
/// assert_eq!(page_slug("/", &ForwardedParams::new()), "page");
/// ```
pub fn page_slug(path: &str, params: &ForwardedParams) -> String {
    let path = normalize_path(path);
    let mut key = if path == "/" {
        "page".to_string()
    } else {
        format!("page-{path}")
    };
    for (name, value) in params.cache_params() {
        push_key_param(&mut key, name, value);
    }
    key
}
