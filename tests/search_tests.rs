use reqwest::Client;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use searxng_tools::search::{SearchClient, SearchError, SearchHit};

mod test_helpers {
    use super::*;

    pub fn results_body(n: usize) -> serde_json::Value {
        let results: Vec<_> = (0..n)
            .map(|i| {
                json!({
                    "title": format!("Result {i}"),
                    "url": format!("https://example.com/{i}"),
                    "engine": "duckduckgo",
                    "content": format!("snippet {i}"),
                })
            })
            .collect();
        json!({ "query": "q", "results": results })
    }

    pub async fn backend_with(body: serde_json::Value) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
        server
    }
}

use test_helpers::*;

#[tokio::test]
async fn test_search_projects_single_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "q"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"title": "A", "url": "http://e.com", "engine": "x", "content": "hello"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = SearchClient::new(Client::new(), &server.uri());
    let out = client.search_json("q", 5).await;

    assert_eq!(
        out,
        json!([{"title": "A", "url": "http://e.com", "engine": "x", "snippet": "hello"}])
    );
}

#[tokio::test]
async fn test_search_returns_min_of_results_and_limit_in_order() {
    for (n, m) in [(0, 5), (3, 5), (5, 5), (8, 5), (8, 1), (4, 0)] {
        let server = backend_with(results_body(n)).await;
        let client = SearchClient::new(Client::new(), &server.uri());

        let hits = client.search("q", m).await.unwrap();

        assert_eq!(hits.len(), n.min(m), "n={n} m={m}");
        for (i, hit) in hits.iter().enumerate() {
            assert_eq!(hit.url.as_deref(), Some(format!("https://example.com/{i}").as_str()));
        }
    }
}

#[tokio::test]
async fn test_search_keeps_duplicate_urls() {
    let server = backend_with(json!({
        "results": [
            {"url": "https://dup.example"},
            {"url": "https://dup.example"}
        ]
    }))
    .await;
    let client = SearchClient::new(Client::new(), &server.uri());

    let hits = client.search("q", 5).await.unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0], hits[1]);
    assert_eq!(
        hits[0],
        SearchHit {
            title: None,
            url: Some("https://dup.example".to_string()),
            engine: None,
            snippet: None,
        }
    );
}

#[tokio::test]
async fn test_search_url_is_not_rewritten() {
    let raw = "HTTP://Example.COM/a/../b?x=1 2";
    let server = backend_with(json!({"results": [{"url": raw}]})).await;
    let client = SearchClient::new(Client::new(), &server.uri());

    let hits = client.search("q", 5).await.unwrap();
    assert_eq!(hits[0].url.as_deref(), Some(raw));
}

#[tokio::test]
async fn test_search_encodes_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "rust & tokio?"))
        .respond_with(ResponseTemplate::new(200).set_body_json(results_body(1)))
        .expect(1)
        .mount(&server)
        .await;

    let client = SearchClient::new(Client::new(), &format!("{}/", server.uri()));
    let hits = client.search("rust & tokio?", 5).await.unwrap();
    assert_eq!(hits.len(), 1);
}

#[tokio::test]
async fn test_search_non_2xx_returns_marker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = SearchClient::new(Client::new(), &server.uri());

    let err = client.search("q", 5).await.unwrap_err();
    assert!(matches!(err, SearchError::Status(503)));

    let out = client.search_json("q", 5).await;
    let markers = out.as_array().unwrap();
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0]["status"], 503);
    assert!(markers[0]["error"].is_string());
}

#[tokio::test]
async fn test_search_transport_failure_returns_marker() {
    // nothing listens on port 1
    let client = SearchClient::new(Client::new(), "http://127.0.0.1:1");

    let out = client.search_json("q", 5).await;
    let markers = out.as_array().unwrap();
    assert_eq!(markers.len(), 1);
    assert!(
        markers[0]["error"]
            .as_str()
            .unwrap()
            .starts_with("search request failed")
    );
}

#[tokio::test]
async fn test_search_invalid_json_returns_marker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let client = SearchClient::new(Client::new(), &server.uri());
    assert!(matches!(
        client.search("q", 5).await,
        Err(SearchError::Decode(_))
    ));
}

#[tokio::test]
async fn test_search_missing_results_is_decode_error() {
    let server = backend_with(json!({"answers": []})).await;
    let client = SearchClient::new(Client::new(), &server.uri());
    assert!(matches!(
        client.search("q", 5).await,
        Err(SearchError::Decode(_))
    ));
}

#[tokio::test]
async fn test_search_text_joins_snippets() {
    let server = backend_with(json!({
        "results": [
            {"content": "first"},
            {"title": "no snippet"},
            {"content": "second"},
            {"content": "third"},
            {"content": "fourth"},
            {"content": "fifth"},
            {"content": "sixth"}
        ]
    }))
    .await;
    let client = SearchClient::new(Client::new(), &server.uri());

    // the legacy form is not limited to the default five hits
    assert_eq!(
        client.search_text("q").await,
        "first\nsecond\nthird\nfourth\nfifth\nsixth"
    );
}

#[tokio::test]
async fn test_search_text_empty_on_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = SearchClient::new(Client::new(), &server.uri());
    assert_eq!(client.search_text("q").await, "");
}
