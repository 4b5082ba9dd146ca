//! LineClient against a local stand-in for the Messaging API.

use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use line_client::{LineClient, LineError, Messenger, OutboundMessage};
use serde_json::{json, Value};

#[derive(Default)]
struct Recorded {
    requests: Mutex<Vec<(String, Option<String>, Value)>>,
}

fn auth(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn serve(recorded: Arc<Recorded>) -> String {
    let app = Router::new()
        .route(
            "/v2/bot/message/reply",
            post(
                |State(r): State<Arc<Recorded>>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    if body["replyToken"] == "expired" {
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(json!({ "message": "Invalid reply token" })),
                        );
                    }
                    r.requests
                        .lock()
                        .unwrap()
                        .push(("reply".into(), auth(&headers), body));
                    (StatusCode::OK, Json(json!({})))
                },
            ),
        )
        .route(
            "/v2/bot/message/push",
            post(
                |State(r): State<Arc<Recorded>>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    r.requests
                        .lock()
                        .unwrap()
                        .push(("push".into(), auth(&headers), body));
                    Json(json!({}))
                },
            ),
        )
        .route(
            "/v2/bot/group/{group_id}/summary",
            get(|Path(group_id): Path<String>| async move {
                Json(json!({ "groupId": group_id, "groupName": "Hikers", "pictureUrl": "https://img/x" }))
            }),
        )
        .route(
            "/v2/bot/group/{group_id}/members/count",
            get(|| async { Json(json!({ "count": 7 })) }),
        )
        .with_state(recorded);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn reply_sends_token_messages_and_bearer() {
    let recorded = Arc::new(Recorded::default());
    let base = serve(recorded.clone()).await;
    let client = LineClient::new("secret-token".into()).with_base_url(&base);

    client
        .reply("rt-1", &[OutboundMessage::text("hello")])
        .await
        .unwrap();

    let requests = recorded.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let (kind, bearer, body) = &requests[0];
    assert_eq!(kind, "reply");
    assert_eq!(bearer.as_deref(), Some("Bearer secret-token"));
    assert_eq!(
        body,
        &json!({ "replyToken": "rt-1", "messages": [{ "type": "text", "text": "hello" }] })
    );
}

#[tokio::test]
async fn push_splits_into_platform_sized_batches() {
    let recorded = Arc::new(Recorded::default());
    let base = serve(recorded.clone()).await;
    let client = LineClient::new("t".into()).with_base_url(&base);

    let messages: Vec<_> = (0..7).map(|i| OutboundMessage::text(format!("m{i}"))).collect();
    client.push("Cgroup", &messages).await.unwrap();

    let requests = recorded.requests.lock().unwrap();
    let sizes: Vec<usize> = requests
        .iter()
        .map(|(_, _, body)| body["messages"].as_array().unwrap().len())
        .collect();
    assert_eq!(sizes, vec![5, 2]);
    assert!(requests.iter().all(|(_, _, body)| body["to"] == "Cgroup"));
}

#[tokio::test]
async fn rejected_reply_surfaces_status_and_body() {
    let base = serve(Arc::new(Recorded::default())).await;
    let client = LineClient::new("t".into()).with_base_url(&base);

    let err = client
        .reply("expired", &[OutboundMessage::text("late")])
        .await
        .unwrap_err();

    match &err {
        LineError::Api { status, body } => {
            assert_eq!(*status, 400);
            assert!(body.contains("Invalid reply token"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
    assert!(err.is_rejected_reply_token());
}

#[tokio::test]
async fn group_lookups() {
    let base = serve(Arc::new(Recorded::default())).await;
    let client = LineClient::new("t".into()).with_base_url(&format!("{base}/"));

    let summary = client.group_summary("C42").await.unwrap();
    assert_eq!(summary.group_id, "C42");
    assert_eq!(summary.group_name, "Hikers");
    assert_eq!(summary.picture_url.as_deref(), Some("https://img/x"));

    assert_eq!(client.group_member_count("C42").await.unwrap(), 7);
}
