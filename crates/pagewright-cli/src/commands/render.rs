//! The `render` management command.
//!
//! Renders one path through the full pipeline and prints the result, which
//! is handy for checking template edits without a browser.

use async_trait::async_trait;
use pagewright_core::{PagewrightResult, Settings};
use pagewright_http::ForwardedParams;
use pagewright_template::{Rendered, Renderer};

use crate::command::ManagementCommand;

/// Prints the composed page for a path.
pub struct RenderCommand;

/// Renders `path` and returns the text to print.
///
/// With `json` set the page JSON is printed instead, pretty-printed.
pub async fn render_to_string(
    renderer: &Renderer,
    path: &str,
    json: bool,
    nocache: bool,
) -> PagewrightResult<String> {
    let mut params = ForwardedParams::new();
    if json {
        params.insert("format", "json");
    }
    if nocache {
        params.insert("nocache", "1");
    }

    match renderer.render(path, &params).await? {
        Rendered::Html(html) => Ok(html),
        Rendered::Json(value) => Ok(serde_json::to_string_pretty(&value)?),
    }
}

#[async_trait]
impl ManagementCommand for RenderCommand {
    fn name(&self) -> &'static str {
        "render"
    }

    fn help(&self) -> &'static str {
        "Renders a path and prints the composed page"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("path")
                .required(true)
                .help("Request path, e.g. /blog/my-post"),
        )
        .arg(
            clap::Arg::new("json")
                .long("json")
                .action(clap::ArgAction::SetTrue)
                .help("Print the page JSON instead of HTML"),
        )
        .arg(
            clap::Arg::new("nocache")
                .long("nocache")
                .action(clap::ArgAction::SetTrue)
                .help("Bypass the disk cache"),
        )
    }

    async fn handle(&self, matches: &clap::ArgMatches, settings: &Settings) -> PagewrightResult<()> {
        let path = matches.get_one::<String>("path").map_or("/", String::as_str);
        let renderer = Renderer::from_settings(settings.clone())?;
        let output =
            render_to_string(&renderer, path, matches.get_flag("json"), matches.get_flag("nocache"))
                .await?;
        println!("{output}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use pagewright_http::{ApiCall, InMemoryContentApi};
    use serde_json::json;

    fn renderer(tmp: &std::path::Path, api: Arc<InMemoryContentApi>) -> Renderer {
        let template_dir = tmp.join("template");
        std::fs::create_dir_all(&template_dir).unwrap();
        std::fs::write(
            template_dir.join("template.conf"),
            r#"{"layouts": {"default": {"regions": ["main"]}}}"#,
        )
        .unwrap();
        std::fs::write(template_dir.join("main.region"), "<main>{site.main-content}</main>").unwrap();

        let settings = Settings {
            template_dir,
            cache_dir: tmp.join("cache"),
            ..Settings::default()
        };
        Renderer::new(settings, api)
    }

    #[tokio::test]
    async fn test_render_html() {
        let tmp = tempfile::tempdir().unwrap();
        let api = Arc::new(InMemoryContentApi::new().with_page("/a", json!({"mainContent": "A"}), ""));
        let out = render_to_string(&renderer(tmp.path(), api), "/a", false, false)
            .await
            .unwrap();
        assert_eq!(out, "<main>A</main>");
    }

    #[tokio::test]
    async fn test_render_json_pretty() {
        let tmp = tempfile::tempdir().unwrap();
        let api = Arc::new(InMemoryContentApi::new().with_page("/a", json!({"title": "A"}), ""));
        let out = render_to_string(&renderer(tmp.path(), api), "/a", true, false)
            .await
            .unwrap();
        assert_eq!(out, "{\n  \"title\": \"A\"\n}");
    }

    #[tokio::test]
    async fn test_nocache_refetches() {
        let tmp = tempfile::tempdir().unwrap();
        let api = Arc::new(InMemoryContentApi::new().with_page("/a", json!({}), ""));
        let renderer = renderer(tmp.path(), api.clone());

        render_to_string(&renderer, "/a", true, false).await.unwrap();
        render_to_string(&renderer, "/a", true, false).await.unwrap();
        render_to_string(&renderer, "/a", true, true).await.unwrap();
        assert_eq!(
            api.calls(),
            vec![ApiCall::Page("a".into()), ApiCall::Page("a".into())]
        );
    }

    #[tokio::test]
    async fn test_handle_requires_site_url() {
        let matches = RenderCommand
            .add_arguments(clap::Command::new("render"))
            .try_get_matches_from(["render", "/"])
            .unwrap();
        assert!(RenderCommand.handle(&matches, &Settings::default()).await.is_err());
    }
}
