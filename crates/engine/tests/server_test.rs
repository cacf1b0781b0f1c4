use axum::http::StatusCode;
use serde_json::json;
use std::sync::Arc;
use stepgraph_engine::{agents::code_review, server::Server};

fn test_server() -> axum_test::TestServer {
    let app = Server::new(Arc::new(code_review::build_engine())).build_router();
    axum_test::TestServer::new(app).unwrap()
}

#[tokio::test]
async fn test_server_endpoints() {
    let client = test_server();

    // Test health endpoint
    let response = client.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "healthy");

    // Create the code review graph
    let create_payload = json!({
        "nodes": [
            {"id": "extract", "fn_name": "extract_functions"},
            {"id": "check", "fn_name": "check_complexity"},
            {"id": "detect", "fn_name": "detect_issues"},
            {"id": "suggest", "fn_name": "suggest_improvements"},
            {"id": "end", "fn_name": "finalize"}
        ],
        "edges": {
            "extract": "check",
            "check": "detect",
            "detect": "suggest",
            "suggest": "end"
        },
        "start_node_id": "extract"
    });
    let response = client.post("/graph/create").json(&create_payload).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: serde_json::Value = response.json();
    let graph_id = body["graph_id"].as_str().unwrap().to_string();
    assert!(!graph_id.is_empty());

    // Run it
    let run_payload = json!({
        "graph_id": graph_id,
        "initial_state": {
            "code_text": "def a():\n    # TODO: tidy\n    return 1\n\ndef b():\n    return 2\n"
        }
    });
    let response = client.post("/graph/run").json(&run_payload).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: serde_json::Value = response.json();
    let run_id = body["run_id"].as_str().unwrap().to_string();
    assert_eq!(body["final_state"]["metadata"]["finalized"], true);
    assert_eq!(body["final_state"]["functions"].as_array().unwrap().len(), 2);
    let log = body["execution_log"].as_array().unwrap();
    assert_eq!(log[0], "Executing node: extract");
    assert_eq!(log.last().unwrap(), "Transitioning from 'end' to 'None'");

    // Inspect the finished run
    let response = client.get(&format!("/graph/state/{}", run_id)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let state: serde_json::Value = response.json();
    assert_eq!(state["run_id"], run_id.as_str());
    assert_eq!(state["status"], "completed");
    assert_eq!(state["state"], body["final_state"]);
    assert_eq!(state["execution_log"], body["execution_log"]);
}

#[tokio::test]
async fn test_run_unknown_graph() {
    let client = test_server();

    let response = client
        .post("/graph/run")
        .json(&json!({"graph_id": "nonexistent-id", "initial_state": {}}))
        .expect_failure()
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "graph_not_found");
}

#[tokio::test]
async fn test_unknown_run_state() {
    let client = test_server();

    let response = client
        .get("/graph/state/does-not-exist")
        .expect_failure()
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "run_not_found");
}

#[tokio::test]
async fn test_invalid_initial_state() {
    let client = test_server();

    let response = client
        .post("/graph/create")
        .json(&json!({
            "nodes": [{"id": "extract", "fn_name": "extract_functions"}],
            "start_node_id": "extract"
        }))
        .await;
    let graph_id = response.json::<serde_json::Value>()["graph_id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = client
        .post("/graph/run")
        .json(&json!({"graph_id": graph_id, "initial_state": {"code_text": 42}}))
        .expect_failure()
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "bad_request");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Invalid initial state"));
}

#[tokio::test]
async fn test_failed_step_reports_server_error_and_failed_run() {
    let client = test_server();

    let response = client
        .post("/graph/create")
        .json(&json!({
            "nodes": [
                {"id": "extract", "fn_name": "extract_functions"},
                {"id": "ghost", "fn_name": "missing_fn"}
            ],
            "edges": {"extract": "ghost"},
            "start_node_id": "extract"
        }))
        .await;
    let graph_id = response.json::<serde_json::Value>()["graph_id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = client
        .post("/graph/run")
        .json(&json!({"graph_id": graph_id, "initial_state": {"code_text": "x = 1"}}))
        .expect_failure()
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "unregistered_step");
    assert_eq!(
        body["message"],
        "Function 'missing_fn' not registered in node registry"
    );
}
