use reqwest::Client;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use searxng_tools::composer::{ComposeError, Composer, OpenOptions};
use searxng_tools::fetcher::PageFetcher;
use searxng_tools::search::SearchClient;

mod test_helpers {
    use super::*;

    pub fn composer(endpoint: &str) -> Composer {
        let client = Client::new();
        Composer::new(
            SearchClient::new(client.clone(), endpoint),
            PageFetcher::new(client),
        )
    }

    /// One server playing both the search backend and the result pages.
    pub async fn backend_with_pages(pages: &[(&str, &str)]) -> MockServer {
        let server = MockServer::start().await;
        let results: Vec<_> = pages
            .iter()
            .map(|(route, _)| {
                json!({
                    "title": format!("Title {route}"),
                    "url": format!("{}{route}", server.uri()),
                    "engine": "bing",
                    "content": format!("about {route}"),
                })
            })
            .collect();

        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": results })))
            .mount(&server)
            .await;

        for (route, html) in pages {
            Mock::given(method("GET"))
                .and(path(*route))
                .respond_with(ResponseTemplate::new(200).set_body_raw(*html, "text/html"))
                .mount(&server)
                .await;
        }
        server
    }
}

use test_helpers::*;

#[tokio::test]
async fn test_open_first_result() {
    let server = backend_with_pages(&[
        ("/a", "<title>A</title><p>page a</p>"),
        ("/b", "<title>B</title><p>page b</p>"),
    ])
    .await;

    let composed = composer(&server.uri())
        .open_search_result("q", OpenOptions::default())
        .await
        .unwrap();

    assert_eq!(composed.query, "q");
    assert_eq!(composed.picked.url, Some(format!("{}/a", server.uri())));
    assert_eq!(composed.picked.snippet.as_deref(), Some("about /a"));
    assert_eq!(composed.page["title"], "A");
    assert_eq!(composed.page["text"], "page a");
    assert_eq!(composed.page["requested_url"], format!("{}/a", server.uri()));
}

#[tokio::test]
async fn test_open_selected_index() {
    let server = backend_with_pages(&[
        ("/a", "<p>page a</p>"),
        ("/b", "<p>page b</p>"),
        ("/c", "<p>page c</p>"),
    ])
    .await;
    let opts = OpenOptions {
        index: 2,
        max_chars: 4,
        ..OpenOptions::default()
    };

    let out = composer(&server.uri())
        .open_search_result_json("q", opts)
        .await;

    assert_eq!(out["query"], "q");
    assert_eq!(out["picked"]["title"], "Title /c");
    assert_eq!(out["page"]["text"], "page");
    assert_eq!(out["page"]["truncated"], true);
}

#[tokio::test]
async fn test_open_index_out_of_range() {
    let server = backend_with_pages(&[("/a", "<p>a</p>"), ("/b", "<p>b</p>")]).await;
    let opts = OpenOptions {
        index: 3,
        ..OpenOptions::default()
    };

    let out = composer(&server.uri())
        .open_search_result_json("q", opts)
        .await;

    assert_eq!(out, json!({"error": "index out of range (0..1)"}));
}

#[tokio::test]
async fn test_open_index_bounded_by_max_results() {
    let server = backend_with_pages(&[("/a", "<p>a</p>"), ("/b", "<p>b</p>"), ("/c", "<p>c</p>")]).await;
    let opts = OpenOptions {
        index: 2,
        max_results: 2,
        ..OpenOptions::default()
    };

    let err = composer(&server.uri())
        .open_search_result("q", opts)
        .await
        .unwrap_err();

    assert!(matches!(err, ComposeError::IndexOutOfRange { len: 2 }));
}

#[tokio::test]
async fn test_open_empty_results_is_search_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .mount(&server)
        .await;

    let out = composer(&server.uri())
        .open_search_result_json("q", OpenOptions::default())
        .await;

    assert_eq!(out, json!({"error": "search failed", "details": []}));
}

#[tokio::test]
async fn test_open_backend_error_is_search_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let out = composer(&server.uri())
        .open_search_result_json("q", OpenOptions::default())
        .await;

    assert_eq!(out["error"], "search failed");
    let details = out["details"].as_array().unwrap();
    assert_eq!(details.len(), 1);
    assert_eq!(details[0]["status"], 502);
}

#[tokio::test]
async fn test_open_non_http_hit_embeds_guard_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"title": "ftp mirror", "url": "ftp://mirror.example/pub"}, {"title": "no url"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let composer = composer(&server.uri());

    let out = composer
        .open_search_result_json("q", OpenOptions::default())
        .await;
    assert_eq!(out["picked"]["url"], "ftp://mirror.example/pub");
    assert_eq!(out["page"]["url"], "ftp://mirror.example/pub");
    assert!(out["page"]["error"].is_string());
}

#[tokio::test]
async fn test_open_hit_without_url_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"title": "no url"}]
        })))
        .mount(&server)
        .await;

    let out = composer(&server.uri())
        .open_search_result_json("q", OpenOptions::default())
        .await;

    assert!(out["picked"]["url"].is_null());
    assert_eq!(out["page"]["url"], "");
    assert!(out["page"]["error"].is_string());
}
