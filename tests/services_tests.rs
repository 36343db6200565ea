//! Translation and search clients against a local mock server.

use pretty_assertions::assert_eq;
use serde_json::json;
use threadline::error::ThreadlineError;
use threadline::services::{DuckDuckGoSearch, GoogleTranslator, SearchEngine, Translator};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn translator_sends_target_and_joins_segments() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/translate_a/single"))
        .and(query_param("client", "gtx"))
        .and(query_param("sl", "auto"))
        .and(query_param("tl", "en"))
        .and(query_param("q", "안녕. 반가워"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            [["Hello. ", "안녕. ", null], ["Nice to meet you", "반가워", null]],
            null,
            "ko"
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let translator = GoogleTranslator::new(Some(server.uri()));
    let text = translator.translate("안녕. 반가워", "en").await.unwrap();
    assert_eq!(text, "Hello. Nice to meet you");
}

#[tokio::test]
async fn translator_skips_blank_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let translator = GoogleTranslator::new(Some(server.uri()));
    assert_eq!(translator.translate("   ", "en").await.unwrap(), "");
}

#[tokio::test]
async fn translator_maps_http_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let translator = GoogleTranslator::new(Some(server.uri()));
    let err = translator.translate("hola", "en").await.unwrap_err();
    assert!(matches!(err, ThreadlineError::Api { status: 503, .. }));
}

#[tokio::test]
async fn search_digests_abstract_and_topics() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("q", "rust language"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "AbstractText": "Rust is a programming language.",
            "RelatedTopics": [
                {"Text": "Cargo - the Rust package manager"},
                {"Name": "Group", "Topics": []},
                {"Text": "  "}
            ]
        })))
        .mount(&server)
        .await;

    let search = DuckDuckGoSearch::new(Some(server.uri()));
    let digest = search.search("rust language").await.unwrap();
    assert_eq!(
        digest,
        "Rust is a programming language.\nCargo - the Rust package manager"
    );
}

#[tokio::test]
async fn search_without_results_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"AbstractText": "", "RelatedTopics": []})),
        )
        .mount(&server)
        .await;

    let search = DuckDuckGoSearch::new(Some(server.uri()));
    let err = search.search("qwertyuiop").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Tool execution error: search_summary: no search results"
    );
}
