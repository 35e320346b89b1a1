mod common;

use reqwest::StatusCode;
use serde_json::Value;

use common::{deny_guard, spawn, Site};
use tagon_router::HttpServer;

fn site() -> Site {
    Site::new()
        .page("index.tg", "# @middlewares: logging, cors\n\nHtml:\n<h1>Home</h1>\n")
        .page("user/[id].tg", "# @params: id:int\n# @guards: authOnly\n\nHtml:\n<p>{{ params.id }}</p>\n")
}

async fn get_json(url: String) -> Value {
    let res = reqwest::get(url).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    res.json().await.unwrap()
}

#[tokio::test]
async fn test_routes_and_registries() {
    let site = site();
    let server = spawn(HttpServer::builder(site.config()).guard(deny_guard("authOnly"))).await;

    let routes = get_json(server.url("/api/routes")).await;
    assert_eq!(routes["total_routes"], 2);
    let mut paths: Vec<&str> = routes["routes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["path"].as_str().unwrap())
        .collect();
    paths.sort();
    assert_eq!(paths, vec!["/", "/user/[id]"]);
    assert_eq!(
        routes["middlewares"],
        serde_json::json!(["logging", "cors", "auth", "assets"])
    );

    let guards = get_json(server.url("/api/guards")).await;
    assert!(guards["guards"]
        .as_array()
        .unwrap()
        .iter()
        .any(|g| g == "authOnly"));

    let params = get_json(server.url("/api/params")).await;
    assert_eq!(params["configurations"]["/user/[id]"]["id"], "int");
}

#[tokio::test]
async fn test_disable_and_enable_middleware() {
    let site = site();
    let server = spawn(HttpServer::builder(site.config())).await;
    let client = reqwest::Client::new();

    let res = client
        .post(server.url("/api/middlewares/cors/disable"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = reqwest::get(server.url("/")).await.unwrap();
    assert!(!res.headers().contains_key("access-control-allow-origin"));

    let info = get_json(server.url("/api/middlewares")).await;
    let cors = info["middlewares"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["name"] == "cors")
        .cloned()
        .unwrap();
    assert_eq!(cors["enabled"], false);

    client
        .post(server.url("/api/middlewares/cors/enable"))
        .send()
        .await
        .unwrap();
    let res = reqwest::get(server.url("/")).await.unwrap();
    assert_eq!(res.headers()["access-control-allow-origin"], "*");

    let res = client
        .post(server.url("/api/middlewares/nope/enable"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_performance_report_counts_requests() {
    let site = site();
    let server = spawn(HttpServer::builder(site.config())).await;

    for _ in 0..3 {
        reqwest::get(server.url("/")).await.unwrap();
    }

    let report = get_json(server.url("/api/performance")).await;
    assert_eq!(report["metrics"]["/"]["requests"], 3);
}

#[tokio::test]
async fn test_api_key_required_when_configured() {
    let site = site();
    let mut config = site.config();
    config.admin.api_key = Some("s3cret".into());
    let server = spawn(HttpServer::builder(config)).await;
    let client = reqwest::Client::new();

    let res = client.get(server.url("/api/status")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(server.url("/api/status"))
        .bearer_auth("s3cret")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let status: Value = res.json().await.unwrap();
    assert_eq!(status["routes"], 2);

    // Pages are not behind the operator key.
    let res = client.get(server.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_admin_disabled_frees_api_paths() {
    let site = Site::new().page("api/status.tg", "Html:\n<p>page status</p>\n");
    let mut config = site.config();
    config.admin.enabled = false;
    let server = spawn(HttpServer::builder(config)).await;

    let body = reqwest::get(server.url("/api/status"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("page status"));
}
