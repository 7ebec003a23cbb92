//! End-to-end render pipeline tests.
//!
//! These tests exercise the complete path:
//!   path -> page fetch -> route match -> seal remote text -> compose
//!        -> blocks -> scripts -> queries -> navigation -> links -> engine
//!        -> restore -> block fields
//!
//! Template directories live in a temp dir and the remote site is an
//! `InMemoryContentApi`, so every remote call can be asserted on.

use std::path::Path;
use std::sync::Arc;

use pagewright_core::{PagewrightError, Settings};
use pagewright_http::{ApiCall, ForwardedParams, InMemoryContentApi};
use pagewright_template::Renderer;
use serde_json::{json, Value};
use tempfile::TempDir;

// ============================================================================
// Helpers
// ============================================================================

const CONFIG: &str = r#"{
    "name": "Fixture",
    "layouts": {
        "default": {"name": "Default", "regions": ["site-header", "main", "site-footer"]}
    },
    "routes": [
        {"pattern": "/blog/:slug!slug", "template": "blog.item"},
        {"pattern": "/blog/:id!num", "template": "blog.item"}
    ]
}"#;

fn write(dir: &Path, rel: &str, text: &str) {
    let path = dir.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, text).unwrap();
}

/// A template directory with a header/main/footer layout plus `extra` files.
fn site(extra: &[(&str, &str)]) -> (TempDir, Settings) {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("template");
    write(&root, "template.conf", CONFIG);
    write(
        &root,
        "site-header.region",
        "<header class=\"{site.page-classes}\">{site-headers}</header>",
    );
    write(&root, "main.region", "<main>{site.main-content}</main>");
    write(&root, "site-footer.region", "<footer>{site-footers}</footer>");
    for (rel, text) in extra {
        write(&root, rel, text);
    }

    let settings = Settings {
        template_dir: root,
        cache_dir: tmp.path().join("cache"),
        site_url: "https://example.site".into(),
        ..Settings::default()
    };
    (tmp, settings)
}

fn blog_item(title: &str) -> Value {
    json!({
        "collection": {"id": "c1", "typeName": "blog"},
        "item": {"id": "i1", "title": title}
    })
}

async fn render(settings: &Settings, api: &Arc<InMemoryContentApi>, path: &str) -> String {
    Renderer::new(settings.clone(), api.clone())
        .render(path, &ForwardedParams::new())
        .await
        .unwrap()
        .html()
        .unwrap()
        .to_string()
}

// ============================================================================
// Composition
// ============================================================================

/// 1. An item fragment lands exactly once inside its region, between header
///    and footer.
#[tokio::test]
async fn test_item_composed_into_region() {
    let (_tmp, settings) = site(&[(
        "collections/blog.item",
        "<article>{{ item.title }} {{ params | json_encode() }}</article>",
    )]);
    let api = Arc::new(InMemoryContentApi::new().with_page(
        "/blog/my-post",
        blog_item("Hello"),
        "<html><head><script src=\"/a.js\"></script></head><body><script>go()</script></body></html>",
    ));

    let html = render(&settings, &api, "/blog/my-post").await;
    assert_eq!(
        html,
        "<header class=\"collection-type-blog collection-c1 view-item\"><script src=\"/a.js\"></script></header>\
         <main><article>Hello {\"slug\":\"my-post\"}</article></main>\
         <footer><script>go()</script></footer>"
    );
    assert_eq!(html.matches("<article>").count(), 1);
}

/// 2. The second route answers when the first rejects the segment.
#[tokio::test]
async fn test_numeric_route_binding() {
    let (_tmp, settings) = site(&[(
        "collections/blog.item",
        "{{ params | json_encode() }}",
    )]);
    let api = Arc::new(InMemoryContentApi::new().with_page("/blog/42", blog_item("x"), ""));

    let html = render(&settings, &api, "/blog/42").await;
    assert!(html.contains("<main>{\"id\":\"42\"}</main>"));
}

/// 3. A missing fragment degrades to a diagnostic comment.
#[tokio::test]
async fn test_missing_fragment_degrades() {
    let (_tmp, settings) = site(&[]);
    let api = Arc::new(InMemoryContentApi::new().with_page(
        "/shop/widget",
        json!({"collection": {"id": "c9", "typeName": "shop"}, "item": {"id": "w"}}),
        "",
    ));

    let html = render(&settings, &api, "/shop/widget").await;
    assert!(html.contains("<main><!-- pagewright: missing fragment 'shop.item' --></main>"));
}

/// 4. Block includes expand, and a cycle is an error naming the chain.
#[tokio::test]
async fn test_block_includes_and_cycles() {
    let (_tmp, settings) = site(&[
        ("collections/blog.item", "{@|apply card.block}"),
        ("blocks/card.block", "<div>{@|apply title.block}</div>"),
        ("blocks/title.block", "<h1>{{ item.title }}</h1>"),
    ]);
    let api = Arc::new(InMemoryContentApi::new().with_page("/blog/post", blog_item("T"), ""));
    assert!(render(&settings, &api, "/blog/post")
        .await
        .contains("<main><div><h1>T</h1></div></main>"));

    let (_tmp, settings) = site(&[
        ("collections/blog.item", "{@|apply a.block}"),
        ("blocks/a.block", "{@|apply b.block}"),
        ("blocks/b.block", "{@|apply a.block}"),
    ]);
    let err = Renderer::new(settings, api.clone())
        .render("/blog/post", &ForwardedParams::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PagewrightError::CyclicInclude { .. }));
    assert_eq!(err.to_string(), "Cyclic block include: a -> b -> a");
}

// ============================================================================
// Queries
// ============================================================================

/// 5. A query's output may contain a query that depends on it; the first is
///    fetched and spliced before the second is evaluated.
#[tokio::test]
async fn test_dependent_queries_resolve_in_order() {
    let (_tmp, settings) = site(&[(
        "collections/index.list",
        concat!(
            "<site:query collection=\"blog\">",
            "{% for item in items %}<site:query collection=\"{{ item.related }}\">",
            "{% raw %}{% for e in items %}[{{ e.name }}]{% endfor %}{% endraw %}",
            "</site:query>{% endfor %}",
            "</site:query>"
        ),
    )]);
    let api = Arc::new(
        InMemoryContentApi::new()
            .with_page(
                "/",
                json!({"collection": {"id": "c2", "typeName": "index"}, "items": []}),
                "",
            )
            .with_query("blog", json!({"items": [{"related": "events"}]}))
            .with_query("events", json!({"items": [{"name": "x"}, {"name": "y"}]})),
    );

    let html = render(&settings, &api, "/").await;
    assert!(html.contains(
        "<site:query collection=\"blog\"><site:query collection=\"events\">[x][y]</site:query></site:query>"
    ));
    assert_eq!(api.queried_collections(), vec!["blog", "events"]);
}

/// 6. Query results are cached; a second render makes no query calls.
#[tokio::test]
async fn test_query_results_are_cached() {
    let (_tmp, settings) = site(&[(
        "collections/blog.item",
        "<site:query collection=\"blog\" limit=\"1\">{% for i in items %}{{ i }}{% endfor %}</site:query>",
    )]);
    let api = Arc::new(
        InMemoryContentApi::new()
            .with_page("/blog/post", blog_item("T"), "")
            .with_query("blog", json!({"items": ["a", "b", "c"]})),
    );

    let first = render(&settings, &api, "/blog/post").await;
    let second = render(&settings, &api, "/blog/post").await;
    assert_eq!(first, second);
    assert!(first.contains(">c</site:query>"));
    assert_eq!(api.queried_collections(), vec!["blog"]);
}

/// 7. A failing remote query surfaces as an upstream error.
#[tokio::test]
async fn test_upstream_failure_is_502() {
    let (_tmp, settings) = site(&[(
        "collections/blog.item",
        "<site:query collection=\"blog\">x</site:query>",
    )]);
    let api = Arc::new(
        InMemoryContentApi::new()
            .with_page("/blog/post", blog_item("T"), "")
            .failing("blog"),
    );

    let err = Renderer::new(settings, api)
        .render("/blog/post", &ForwardedParams::new())
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 502);
}

/// 8. An unterminated query is a malformed directive.
#[tokio::test]
async fn test_unterminated_query_is_malformed() {
    let (_tmp, settings) = site(&[("collections/blog.item", "<site:query collection=\"blog\">x")]);
    let api = Arc::new(InMemoryContentApi::new().with_page("/blog/post", blog_item("T"), ""));

    let err = Renderer::new(settings, api)
        .render("/blog/post", &ForwardedParams::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PagewrightError::MalformedDirective { .. }));
}

// ============================================================================
// Navigation, links, scripts, block fields
// ============================================================================

/// 9. Every late stage on one page.
#[tokio::test]
async fn test_late_stages() {
    let (_tmp, settings) = site(&[(
        "blocks/nav.block",
        "<ul>{% for i in items %}<li>{{ i.collection.title }}</li>{% endfor %}</ul>",
    )]);
    let main = concat!(
        "<site:navigation navigationId=\"mainNav\" template=\"nav\" />",
        "<a href=\"/s/menu.pdf\">menu</a>",
        "<script>var t = \"{{ not_a_variable }}\";</script>",
        "<site:block-field id=\"bf1\" />"
    );
    let api = Arc::new(
        InMemoryContentApi::new()
            .with_page("/about", json!({"collection": {"id": "p"}, "mainContent": main}), "")
            .with_site_layout(json!({"layout": [
                {"identifier": "mainNav", "links": [{"collectionId": "c-blog"}]}
            ]}))
            .with_collections(json!({"collections": {"c-blog": {"title": "Blog"}}}))
            .with_block_field(
                "bf1",
                json!({"rows": [{"columns": [{"blocks": [{"type": "text", "value": {"text": "hi"}}]}]}]}),
            ),
    );

    let html = render(&settings, &api, "/about").await;
    assert!(html.contains("<ul><li>Blog</li></ul>"));
    assert!(html.contains("<a href=\"https://example.site/s/menu.pdf\">menu</a>"));
    assert!(html.contains("<script>var t = \"{{ not_a_variable }}\";</script>"));
    assert!(html.contains("<div class=\"block block-text\""));
    assert!(html.contains("<p>hi</p>"));
    assert!(!html.contains("site:block-field"));
    assert!(!html.contains("pw-guard-"));

    let calls = api.calls();
    assert!(calls.contains(&ApiCall::SiteLayout));
    assert!(calls.contains(&ApiCall::BlockField("bf1".into())));
}

/// 10. Live page CSS and `mainContent` reach the page verbatim, even when they
///     contain engine delimiters.
#[tokio::test]
async fn test_remote_text_is_not_expanded() {
    let (_tmp, settings) = site(&[]);
    let api = Arc::new(InMemoryContentApi::new().with_page(
        "/about",
        json!({"collection": {"id": "p"}, "mainContent": "<pre>{{ name }} {% if %} {#</pre>"}),
        "<html><head><style>@media screen{#nav{display:none}}</style></head><body></body></html>",
    ));

    let html = render(&settings, &api, "/about").await;
    assert_eq!(
        html,
        "<header class=\"collection-type-page collection-p view-page\">\
         <style>@media screen{#nav{display:none}}</style></header>\
         <main><pre>{{ name }} {% if %} {#</pre></main>\
         <footer></footer>"
    );
}

/// 11. Query item data is printed once and never expanded again.
#[tokio::test]
async fn test_query_data_is_not_expanded() {
    let (_tmp, settings) = site(&[(
        "collections/blog.item",
        "<site:query collection=\"posts\">{% for i in items %}<p>{{ i.body }}</p>{% endfor %}</site:query>",
    )]);
    let api = Arc::new(
        InMemoryContentApi::new()
            .with_page("/blog/post", blog_item("T"), "")
            .with_query(
                "posts",
                json!({"items": [{"body": "Write {{ name }} in a template"}, {"body": "{% for x in y %}"}]}),
            ),
    );

    let html = render(&settings, &api, "/blog/post").await;
    assert!(html.contains("<p>Write {{ name }} in a template</p><p>{% for x in y %}</p>"));
}

/// 12. Pages without navigation never fetch the site layout.
#[tokio::test]
async fn test_no_navigation_no_layout_fetch() {
    let (_tmp, settings) = site(&[]);
    let api = Arc::new(InMemoryContentApi::new().with_page(
        "/about",
        json!({"collection": {"id": "p"}, "mainContent": "<p>x</p>"}),
        "",
    ));

    render(&settings, &api, "/about").await;
    assert_eq!(api.calls(), vec![ApiCall::Page("about".into())]);
}
