use reqwest::Method;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

fn config_for(server: &MockServer, max_rows: usize) -> AppConfig {
    AppConfig {
        supabase_url: server.uri(),
        supabase_anon_key: "test-anon-key".to_string(),
        supabase_service_key: "test-service-key".to_string(),
        supabase_jwt_secret: "test-secret".to_string(),
        stats_query_timeout_ms: 5_000,
        supabase_max_rows: max_rows,
        bind_addr: "127.0.0.1:0".to_string(),
    }
}

fn rating_rows(range: std::ops::Range<usize>) -> Value {
    Value::Array(range.map(|i| json!({ "id": i, "rating": 5 })).collect())
}

#[tokio::test]
async fn test_request_sends_keys() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/reviews"))
        .and(header("apikey", "test-anon-key"))
        .and(header("authorization", "Bearer test-service-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"rating": 5}])))
        .expect(1)
        .mount(&server)
        .await;

    let client = SupabaseClient::new(&config_for(&server, 1_000));
    let rows: Vec<Value> = client.request(Method::GET, "/rest/v1/reviews?select=rating").await.unwrap();

    assert_eq!(rows, vec![json!({"rating": 5})]);
}

#[tokio::test]
async fn test_count_reads_content_range() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("status", "eq.booked"))
        .and(header("Prefer", "count=exact"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Range", "0-0/42")
                .set_body_json(json!([{"id": "b1"}])),
        )
        .mount(&server)
        .await;

    let client = SupabaseClient::new(&config_for(&server, 1_000));
    let total = client.count("/rest/v1/bookings?status=eq.booked&select=id&limit=1").await.unwrap();

    assert_eq!(total, 42);
}

#[tokio::test]
async fn test_get_all_follows_pages_past_max_rows() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/reviews"))
        .and(query_param("limit", "1000"))
        .and(query_param("offset", "0"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Range", "0-999/*")
                .set_body_json(rating_rows(0..1000)),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/reviews"))
        .and(query_param("limit", "1000"))
        .and(query_param("offset", "1000"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Range", "1000-1499/*")
                .set_body_json(rating_rows(1000..1500)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = SupabaseClient::new(&config_for(&server, 1_000));
    let rows: Vec<Value> = client.get_all("/rest/v1/reviews?select=id,rating").await.unwrap();

    assert_eq!(rows.len(), 1500);
    assert_eq!(rows[1499]["id"], json!(1499));
}

#[tokio::test]
async fn test_get_all_stops_at_reported_total() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/reviews"))
        .and(query_param("offset", "0"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Range", "0-1/2")
                .set_body_json(rating_rows(0..2)),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/reviews"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let client = SupabaseClient::new(&config_for(&server, 2));
    let rows: Vec<Value> = client.get_all("/rest/v1/reviews").await.unwrap();

    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = SupabaseClient::new(&config_for(&server, 1_000));
    let err = client.get_all::<Value>("/rest/v1/bookings").await.unwrap_err();

    assert!(err.to_string().contains("500"));
    assert!(client.ping().await.is_err());
}
