mod common;

use std::sync::Arc;

use chrono::Duration;
use reqwest::StatusCode;

use common::{deny_guard, spawn, Site, TraceMiddleware};
use tagon_router::security::TokenSubject;
use tagon_router::HttpServer;

#[tokio::test]
async fn test_index_page_renders() {
    let site = Site::new().page("index.tg", "Html:\n<h1>Home</h1>\n");
    let server = spawn(HttpServer::builder(site.config())).await;

    let res = reqwest::get(server.url("/")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    assert!(res.text().await.unwrap().contains("<h1>Home</h1>"));
}

#[tokio::test]
async fn test_guard_denial_returns_403() {
    let site = Site::new().page(
        "user/[id].tg",
        "# @guards: authOnly\n\nHtml:\n<p>user {{ params.id }}</p>\n",
    );
    let builder = HttpServer::builder(site.config()).guard(deny_guard("authOnly"));
    let server = spawn(builder).await;

    let res = reqwest::get(server.url("/user/42")).await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body = res.text().await.unwrap();
    assert!(body.contains("forbidden"));
    assert!(!body.contains("user 42"));
}

#[tokio::test]
async fn test_later_middleware_wins_key_collision() {
    let site = Site::new().page(
        "trace.tg",
        "# @middlewares: assets, logging\n\nHtml:\n<p id=\"trace\">{{ middleware_data.traceId }}</p>\n",
    );
    let mut config = site.config();
    config.middleware.logging.enabled = false;
    config.middleware.assets.enabled = false;

    let builder = HttpServer::builder(config)
        .middleware(
            Arc::new(TraceMiddleware {
                name: "logging",
                value: "from-logging",
            }),
            1,
        )
        .middleware(
            Arc::new(TraceMiddleware {
                name: "assets",
                value: "from-assets",
            }),
            20,
        );
    let server = spawn(builder).await;

    let body = reqwest::get(server.url("/trace"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains(r#"<p id="trace">from-assets</p>"#));
}

#[tokio::test]
async fn test_typed_and_catch_all_params() {
    let site = Site::new()
        .page(
            "item/[id].tg",
            "# @params: id:int\n\nHtml:\n<p>next {{ params.id + 1 }}</p>\n",
        )
        .page(
            "docs/[...path].tg",
            "Html:\n<p>{{ params.path | join(\"|\") }}</p>\n",
        );
    let server = spawn(HttpServer::builder(site.config())).await;

    let body = reqwest::get(server.url("/item/41")).await.unwrap().text().await.unwrap();
    assert!(body.contains("next 42"));

    let body = reqwest::get(server.url("/docs/guide/intro"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("<p>guide|intro</p>"));
}

#[tokio::test]
async fn test_static_route_beats_dynamic_sibling() {
    let site = Site::new()
        .page("user/settings.tg", "Html:\n<p>settings</p>\n")
        .page("user/[id].tg", "Html:\n<p>profile {{ params.id }}</p>\n");
    let server = spawn(HttpServer::builder(site.config())).await;

    let body = reqwest::get(server.url("/user/settings")).await.unwrap().text().await.unwrap();
    assert!(body.contains("<p>settings</p>"));

    let body = reqwest::get(server.url("/user/7")).await.unwrap().text().await.unwrap();
    assert!(body.contains("profile 7"));
}

#[tokio::test]
async fn test_layout_wraps_page() {
    let site = Site::new()
        .page("about.tg", "# @layout: main\n# @static: title=About\n\nHtml:\n<p>about us</p>\n")
        .layout("main", "Html:\n<main><h1>{{ title }}</h1>{{ content }}</main>\n");
    let server = spawn(HttpServer::builder(site.config())).await;

    let body = reqwest::get(server.url("/about")).await.unwrap().text().await.unwrap();
    assert!(body.contains("<main><h1>About</h1><p>about us</p></main>"));
}

#[tokio::test]
async fn test_unknown_path_returns_404_page() {
    let site = Site::new().page("index.tg", "Html:\n<h1>Home</h1>\n");
    let server = spawn(HttpServer::builder(site.config())).await;

    let res = reqwest::get(server.url("/nowhere")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(res.text().await.unwrap().contains("/nowhere"));
}

#[tokio::test]
async fn test_template_error_returns_500() {
    let site = Site::new().page("broken.tg", "Html:\n<p>{{ name | no_such_filter }}</p>\n");
    let server = spawn(HttpServer::builder(site.config())).await;

    let res = reqwest::get(server.url("/broken")).await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(res.text().await.unwrap().contains("Route Error"));
}

#[tokio::test]
async fn test_middleware_headers_applied() {
    let site = Site::new().page(
        "secure.tg",
        "# @middlewares: cors, auth\n\nHtml:\n<p>ok</p>\n",
    );
    let server = spawn(HttpServer::builder(site.config())).await;

    let res = reqwest::get(server.url("/secure")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    assert_eq!(res.headers()["x-frame-options"], "DENY");
    assert_eq!(res.headers()["x-content-type-options"], "nosniff");
}

#[tokio::test]
async fn test_authenticated_guard_with_bearer_token() {
    let site = Site::new().page(
        "dashboard.tg",
        "# @middlewares: auth\n# @guards: authenticated\n\nHtml:\n<p>hi {{ middleware_data.auth.user.id }}</p>\n",
    );
    let builder = HttpServer::builder(site.config());
    let token = builder
        .authority()
        .issue(
            &TokenSubject {
                id: "u-1".into(),
                ..TokenSubject::default()
            },
            Duration::hours(1),
        )
        .unwrap();
    let server = spawn(builder).await;
    let client = reqwest::Client::new();

    let res = client.get(server.url("/dashboard")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(server.url("/dashboard"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.text().await.unwrap().contains("hi u-1"));
}

#[tokio::test]
async fn test_page_answers_post() {
    let site = Site::new().page("form.tg", "Html:\n<p>{{ request.method }}</p>\n");
    let server = spawn(HttpServer::builder(site.config())).await;

    let res = reqwest::Client::new()
        .post(server.url("/form"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.text().await.unwrap().contains("POST"));
}

#[tokio::test]
async fn test_conflicting_pages_fail_startup() {
    let site = Site::new()
        .page("blog/[slug].tg", "Html:\n<p>a</p>\n")
        .page("blog/[id].tg", "Html:\n<p>b</p>\n");

    assert!(HttpServer::new(site.config()).is_err());
}

#[tokio::test]
async fn test_page_cannot_claim_operator_path() {
    let site = Site::new().page("api/routes.tg", "Html:\n<p>mine</p>\n");
    assert!(HttpServer::new(site.config()).is_err());
}

#[tokio::test]
async fn test_dynamic_and_catch_all_pages_coexist() {
    let site = Site::new()
        .page("index.tg", "Html:\n<h1>Home</h1>\n")
        .page("[id].tg", "Html:\n<p>item {{ params.id }}</p>\n")
        .page("[...slug].tg", "Html:\n<p>slug {{ params.slug | join(\"|\") }}</p>\n")
        .page("blog/[slug].tg", "Html:\n<p>post {{ params.slug }}</p>\n")
        .page("blog/[...rest].tg", "Html:\n<p>rest {{ params.rest | join(\",\") }}</p>\n");
    let server = spawn(HttpServer::builder(site.config())).await;

    let text = |path: &'static str| {
        let url = server.url(path);
        async move { reqwest::get(url).await.unwrap().text().await.unwrap() }
    };

    assert!(text("/5").await.contains("item 5"));
    assert!(text("/a/b").await.contains("slug a|b"));
    assert!(text("/blog/hello").await.contains("post hello"));
    assert!(text("/blog/2024/hello").await.contains("rest 2024,hello"));
    assert!(text("/").await.contains("<h1>Home</h1>"));

    // Operator endpoints still win over the root catch-all.
    let res = reqwest::get(server.url("/api/routes")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let routes: serde_json::Value = res.json().await.unwrap();
    assert_eq!(routes["total_routes"], 5);
}

#[tokio::test]
async fn test_page_cannot_shadow_operator_param_path() {
    let site = Site::new().page("api/middlewares/[name].tg", "Html:\n<p>mine</p>\n");
    assert!(HttpServer::new(site.config()).is_err());
}
