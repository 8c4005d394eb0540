//! Integration tests against a mocked Splunk management API

use serde_json::{Value, json};
use splunk_mcp::{
    ConnectionManager, RunQueryArgs, Scheme, SplunkConfig, SplunkError,
    server::{JsonRpcRequest, ServerConfig, SplunkHandler},
    tools::{indexes, query},
};
use wiremock::matchers::{any, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SESSION_KEY: &str = "sess-1";

fn basic_config(server: &MockServer) -> SplunkConfig {
    let addr = server.address();
    SplunkConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        scheme: Scheme::Http,
        username: Some("admin".to_string()),
        password: Some("changeme".to_string()),
        ..Default::default()
    }
}

fn token_config(server: &MockServer, token: &str) -> SplunkConfig {
    SplunkConfig {
        token: Some(token.to_string()),
        username: None,
        password: None,
        ..basic_config(server)
    }
}

async fn mount_login(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/services/auth/login"))
        .and(body_string_contains("username=admin"))
        .and(body_string_contains("password=changeme"))
        .and(body_string_contains("output_mode=json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sessionKey": SESSION_KEY })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn search_mock() -> wiremock::MockBuilder {
    Mock::given(method("POST"))
        .and(path("/services/search/jobs"))
        .and(body_string_contains("exec_mode=oneshot"))
        .and(body_string_contains("output_mode=json"))
}

mod query_tests {
    use super::*;

    #[tokio::test]
    async fn test_records_follow_stream_order() {
        let server = MockServer::start().await;
        mount_login(&server, 1).await;

        let body = concat!(
            r#"{"preview":false,"offset":0,"result":{"host":"a"}}"#,
            "\n",
            r#"{"preview":false,"messages":[{"type":"WARN","text":"field conflict"}]}"#,
            "\n"
        );
        search_mock()
            .and(header("Authorization", "Splunk sess-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;

        let manager = ConnectionManager::new(basic_config(&server));
        let records = query::run_query(&manager, &RunQueryArgs::new("search index=main"))
            .await
            .unwrap();

        assert_eq!(
            serde_json::to_value(&records).unwrap(),
            json!([{"host": "a"}, {"message": "field conflict"}])
        );
    }

    #[tokio::test]
    async fn test_one_record_per_result() {
        let server = MockServer::start().await;
        mount_login(&server, 1).await;

        let results: Vec<Value> = (0..25).map(|i| json!({"_raw": format!("event {}", i)})).collect();
        search_mock()
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "preview": false,
                "init_offset": 0,
                "messages": [],
                "fields": [{"name": "_raw"}],
                "results": results
            })))
            .mount(&server)
            .await;

        let manager = ConnectionManager::new(basic_config(&server));
        let records = query::run_query(&manager, &RunQueryArgs::new("search index=main"))
            .await
            .unwrap();

        assert_eq!(records.len(), 25);
        assert_eq!(serde_json::to_value(&records[0]).unwrap(), json!({"_raw": "event 0"}));
        assert_eq!(serde_json::to_value(&records[24]).unwrap(), json!({"_raw": "event 24"}));
    }

    #[tokio::test]
    async fn test_query_and_window_are_forwarded() {
        let server = MockServer::start().await;
        mount_login(&server, 1).await;

        search_mock()
            .and(body_string_contains("search=search+index%3Dmain+error"))
            .and(body_string_contains("earliest_time=-7d"))
            .and(body_string_contains("latest_time=-1d"))
            .respond_with(ResponseTemplate::new(200).set_body_string(""))
            .expect(1)
            .mount(&server)
            .await;

        let manager = ConnectionManager::new(basic_config(&server));
        let args = RunQueryArgs::new("search index=main error").with_window("-7d", "-1d");
        let records = query::run_query(&manager, &args).await.unwrap();

        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_login_happens_once() {
        let server = MockServer::start().await;
        mount_login(&server, 1).await;

        search_mock()
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
            .expect(2)
            .mount(&server)
            .await;

        let manager = ConnectionManager::new(basic_config(&server));
        let args = RunQueryArgs::new("search index=main");
        query::run_query(&manager, &args).await.unwrap();
        query::run_query(&manager, &args).await.unwrap();

        assert!(manager.is_connected());
    }

    #[tokio::test]
    async fn test_token_auth_skips_login() {
        let server = MockServer::start().await;
        mount_login(&server, 0).await;

        search_mock()
            .and(header("Authorization", "Splunk my-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": [{"n": "1"}]})))
            .expect(1)
            .mount(&server)
            .await;

        let manager = ConnectionManager::new(token_config(&server, "my-token"));
        let records = query::run_query(&manager, &RunQueryArgs::new("| makeresults"))
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_bearer_token_is_sent_as_is() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/services/data/indexes"))
            .and(header("Authorization", "Bearer eyJ0eXAi"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"entry": []})))
            .expect(1)
            .mount(&server)
            .await;

        let manager = ConnectionManager::new(token_config(&server, "Bearer eyJ0eXAi"));
        assert!(indexes::get_indexes(&manager).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_query_makes_no_requests() {
        let server = MockServer::start().await;

        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let manager = ConnectionManager::new(basic_config(&server));
        for blank in ["", "   "] {
            let err = query::run_query(&manager, &RunQueryArgs::new(blank))
                .await
                .unwrap_err();
            assert!(matches!(err, SplunkError::InvalidArguments(_)));
        }

        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_error_is_passed_through() {
        let server = MockServer::start().await;
        mount_login(&server, 1).await;

        search_mock()
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "messages": [{"type": "FATAL", "text": "Unknown search command 'foo'."}]
            })))
            .mount(&server)
            .await;

        let manager = ConnectionManager::new(basic_config(&server));
        let err = query::run_query(&manager, &RunQueryArgs::new("| foo"))
            .await
            .unwrap_err();

        match err {
            SplunkError::Upstream { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Unknown search command 'foo'.");
            },
            other => panic!("expected upstream error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_login_is_retried_on_next_call() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/services/auth/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "messages": [{"type": "WARN", "text": "Login failed"}]
            })))
            .expect(2)
            .mount(&server)
            .await;

        let manager = ConnectionManager::new(basic_config(&server));
        let args = RunQueryArgs::new("search index=main");

        for _ in 0..2 {
            let err = query::run_query(&manager, &args).await.unwrap_err();
            assert!(matches!(err, SplunkError::Upstream { status: 401, .. }));
        }
        assert!(!manager.is_connected());
    }

    #[tokio::test]
    async fn test_login_without_session_key() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/services/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let manager = ConnectionManager::new(basic_config(&server));
        let err = manager.get_service().await.unwrap_err();
        assert!(matches!(err, SplunkError::UnexpectedResponse(_)));
    }
}

mod index_tests {
    use super::*;

    #[tokio::test]
    async fn test_indexes_keep_reported_order() {
        let server = MockServer::start().await;
        mount_login(&server, 1).await;

        Mock::given(method("GET"))
            .and(path("/services/data/indexes"))
            .and(query_param("output_mode", "json"))
            .and(query_param("count", "0"))
            .and(header("Authorization", "Splunk sess-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "entry": [
                    {"name": "main", "content": {"totalEventCount": 10}},
                    {"name": "_internal", "content": {"totalEventCount": 99}}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let manager = ConnectionManager::new(basic_config(&server));
        let names = indexes::get_indexes(&manager).await.unwrap();

        assert_eq!(names, vec!["main".to_string(), "_internal".to_string()]);
    }

    #[tokio::test]
    async fn test_index_listing_error_is_passed_through() {
        let server = MockServer::start().await;
        mount_login(&server, 1).await;

        Mock::given(method("GET"))
            .and(path("/services/data/indexes"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let manager = ConnectionManager::new(basic_config(&server));
        let err = indexes::get_indexes(&manager).await.unwrap_err();

        assert!(matches!(
            err,
            SplunkError::Upstream { status: 403, ref message } if message == "forbidden"
        ));
    }

    #[tokio::test]
    async fn test_missing_credentials_makes_no_requests() {
        let server = MockServer::start().await;

        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let config = SplunkConfig {
            password: None,
            ..basic_config(&server)
        };
        let manager = ConnectionManager::new(config);
        let err = indexes::get_indexes(&manager).await.unwrap_err();

        assert!(matches!(err, SplunkError::ConfigError(_)));
    }
}

mod handler_tests {
    use super::*;

    fn call(id: i64, name: &str, arguments: Value) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(json!(id)),
            method: "tools/call".to_string(),
            params: Some(json!({ "name": name, "arguments": arguments })),
        }
    }

    fn text_of(result: &Value) -> Value {
        serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_run_splunk_query_tool() {
        let server = MockServer::start().await;
        mount_login(&server, 1).await;

        search_mock()
            .and(body_string_contains("earliest_time=-24h"))
            .and(body_string_contains("latest_time=now"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messages": [{"type": "INFO", "text": "Search was truncated"}],
                "results": [{"host": "web-01", "status": "500"}]
            })))
            .mount(&server)
            .await;

        let handler = SplunkHandler::new(ServerConfig {
            splunk: basic_config(&server),
        });

        let response = handler
            .handle_request(call(3, "run_splunk_query", json!({"query": "search status=500"})))
            .await;

        let result = response.result.unwrap();
        assert_eq!(result["isError"], false);
        assert_eq!(
            text_of(&result),
            json!([{"message": "Search was truncated"}, {"host": "web-01", "status": "500"}])
        );
    }

    #[tokio::test]
    async fn test_get_indexes_tool() {
        let server = MockServer::start().await;
        mount_login(&server, 1).await;

        Mock::given(method("GET"))
            .and(path("/services/data/indexes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "entry": [{"name": "main"}, {"name": "_internal"}]
            })))
            .mount(&server)
            .await;

        let handler = SplunkHandler::new(ServerConfig {
            splunk: basic_config(&server),
        });

        let response = handler.handle_request(call(4, "get_indexes", json!({}))).await;
        let result = response.result.unwrap();

        assert_eq!(result["isError"], false);
        assert_eq!(text_of(&result), json!(["main", "_internal"]));
    }

    #[tokio::test]
    async fn test_upstream_failure_is_tool_error() {
        let server = MockServer::start().await;
        mount_login(&server, 1).await;

        search_mock()
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "messages": [{"type": "FATAL", "text": "Error in 'search' command"}]
            })))
            .mount(&server)
            .await;

        let handler = SplunkHandler::new(ServerConfig {
            splunk: basic_config(&server),
        });

        let response = handler
            .handle_request(call(5, "run_splunk_query", json!({"query": "search |"})))
            .await;
        let result = response.result.unwrap();

        assert_eq!(result["isError"], true);
        assert!(
            result["content"][0]["text"]
                .as_str()
                .unwrap()
                .contains("Error in 'search' command")
        );
    }
}
