//! HTTP adapter tests against an in-process stub of the record service.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use roster_client::HttpRemote;
use roster_engine::{
    Collection, FileKv, Record, RemoteError, RemoteService, SyncEngine, SyncOutcome, WriteOutcome,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

const API_KEY: &str = "test-key";

#[derive(Clone, Default)]
struct Stub {
    tables: Arc<Mutex<HashMap<String, Value>>>,
    writes: Arc<Mutex<Vec<Value>>>,
    reject_writes: Arc<AtomicBool>,
    write_data: Arc<Mutex<Option<Value>>>,
}

impl Stub {
    fn table(&self, name: &str, data: Value) {
        self.tables.lock().unwrap().insert(name.to_string(), data);
    }

    fn writes(&self) -> Vec<Value> {
        self.writes.lock().unwrap().clone()
    }
}

async fn fetch(State(stub): State<Stub>, Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    if query.get("apiKey").map(String::as_str) != Some(API_KEY) {
        return Json(json!({"status": "error", "message": "Invalid API Key"}));
    }
    let table = query.get("table").cloned().unwrap_or_default();
    let data = stub
        .tables
        .lock()
        .unwrap()
        .get(&table)
        .cloned()
        .unwrap_or(Value::Null);
    Json(json!({"status": "success", "data": data}))
}

async fn write(State(stub): State<Stub>, body: String) -> Json<Value> {
    let request: Value = serde_json::from_str(&body).unwrap();
    if request["apiKey"] != API_KEY {
        return Json(json!({"status": "error", "message": "Invalid API Key"}));
    }
    stub.writes.lock().unwrap().push(request);
    if stub.reject_writes.load(Ordering::SeqCst) {
        return Json(json!({"status": "error", "message": "Sheet is locked"}));
    }
    match stub.write_data.lock().unwrap().clone() {
        Some(data) => Json(json!({"status": "success", "data": data})),
        None => Json(json!({"status": "success"})),
    }
}

async fn broken() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn serve(stub: Stub) -> String {
    let app = Router::new()
        .route("/exec", get(fetch).post(write))
        .route("/broken", get(broken).post(broken))
        .with_state(stub);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn remote(url: String, key: &str) -> HttpRemote {
    HttpRemote::new(url, Some(key.to_string()), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn fetch_returns_table_records() {
    let stub = Stub::default();
    stub.table(
        "Teachers",
        json!([{"id": "t-1", "name": "Lan"}, {"id": 2, "name": "Minh"}]),
    );
    let base = serve(stub).await;

    let records = remote(format!("{base}/exec"), API_KEY)
        .fetch(Collection::Teachers)
        .await
        .unwrap();

    let ids: Vec<String> = records.iter().filter_map(Record::id).collect();
    assert_eq!(ids, ["t-1", "2"]);
    assert_eq!(records[0].get_str("name"), Some("Lan"));
}

#[tokio::test]
async fn null_data_is_an_empty_collection() {
    let base = serve(Stub::default()).await;

    let records = remote(format!("{base}/exec"), API_KEY)
        .fetch(Collection::Behavior)
        .await
        .unwrap();

    assert!(records.is_empty());
}

#[tokio::test]
async fn error_envelope_is_a_rejection() {
    let base = serve(Stub::default()).await;

    let err = remote(format!("{base}/exec"), "wrong-key")
        .fetch(Collection::Users)
        .await
        .unwrap_err();

    assert_eq!(err, RemoteError::rejected(Collection::Users, "Invalid API Key"));
}

#[tokio::test]
async fn server_error_is_a_rejection() {
    let base = serve(Stub::default()).await;

    let err = remote(format!("{base}/broken"), API_KEY)
        .fetch(Collection::Students)
        .await
        .unwrap_err();

    assert!(
        matches!(&err, RemoteError::Rejected { collection: Collection::Students, message } if message.starts_with("HTTP 500")),
        "{err:?}"
    );
}

#[tokio::test]
async fn unreachable_service() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = remote(format!("http://{addr}/exec"), API_KEY)
        .fetch(Collection::Users)
        .await
        .unwrap_err();

    assert!(matches!(err, RemoteError::Unreachable(_)), "{err:?}");
}

#[tokio::test]
async fn writes_send_action_table_and_key() {
    let stub = Stub::default();
    let base = serve(stub.clone()).await;
    let remote = remote(format!("{base}/exec"), API_KEY);

    let class = Record::new("c-1")
        .with("className", "CNT K18B")
        .with("subjectTeacherIds", json!(["t-1", "t-2"]));
    remote.create(Collection::VocationalClasses, &class).await.unwrap();
    remote.update(Collection::VocationalClasses, &class).await.unwrap();
    remote.delete(Collection::VocationalClasses, "c-1").await.unwrap();

    let writes = stub.writes();
    assert_eq!(writes.len(), 3);
    assert_eq!(
        writes[0],
        json!({
            "action": "CREATE",
            "table": "VocationalClasses",
            "data": {"id": "c-1", "className": "CNT K18B", "subjectTeacherIds": "[\"t-1\",\"t-2\"]"},
            "apiKey": API_KEY
        })
    );
    assert_eq!(writes[1]["action"], "UPDATE");
    assert_eq!(
        writes[2],
        json!({
            "action": "DELETE",
            "table": "VocationalClasses",
            "data": {"id": "c-1"},
            "apiKey": API_KEY
        })
    );
}

#[tokio::test]
async fn write_reply_echoing_the_row_is_accepted() {
    let stub = Stub::default();
    *stub.write_data.lock().unwrap() = Some(json!({"id": "s-1", "name": "An"}));
    let base = serve(stub.clone()).await;
    let remote = remote(format!("{base}/exec"), API_KEY);

    let student = Record::new("s-1").with("name", "An");
    remote.create(Collection::Students, &student).await.unwrap();
    remote.update(Collection::Students, &student).await.unwrap();

    *stub.write_data.lock().unwrap() = Some(json!("Deleted"));
    remote.delete(Collection::Students, "s-1").await.unwrap();
    assert_eq!(stub.writes().len(), 3);
}

#[tokio::test]
async fn blank_rows_are_skipped() {
    let stub = Stub::default();
    stub.table(
        "Attendance",
        json!([{"id": "a-1"}, null, {"id": "a-2"}]),
    );
    let base = serve(stub).await;

    let records = remote(format!("{base}/exec"), API_KEY)
        .fetch(Collection::Attendance)
        .await
        .unwrap();

    let ids: Vec<String> = records.iter().filter_map(Record::id).collect();
    assert_eq!(ids, ["a-1", "a-2"]);
}

#[tokio::test]
async fn refused_write_is_a_rejection() {
    let stub = Stub::default();
    stub.reject_writes.store(true, Ordering::SeqCst);
    let base = serve(stub).await;

    let err = remote(format!("{base}/exec"), API_KEY)
        .delete(Collection::Attendance, "a-1")
        .await
        .unwrap_err();

    assert_eq!(err, RemoteError::rejected(Collection::Attendance, "Sheet is locked"));
}

#[tokio::test]
async fn engine_syncs_and_persists_through_http() {
    let stub = Stub::default();
    stub.table(
        "VocationalClasses",
        json!([
            {"id": "c-1", "className": "CNT K17A"},
            {"id": "c-2", "className": "CNT K18B", "subjectTeacherIds": "[\"t-1\"]"}
        ]),
    );
    stub.table("Students", json!([{"id": "s-1", "class": "CNT K18B"}]));
    let base = serve(stub.clone()).await;
    let dir = tempfile::tempdir().unwrap();

    let engine = SyncEngine::new(
        Arc::new(remote(format!("{base}/exec"), API_KEY)),
        Arc::new(FileKv::new(dir.path())),
    );
    assert!(matches!(
        engine.sync_now().await,
        SyncOutcome::Completed { records: 2, .. }
    ));

    let classes = engine.records(Collection::VocationalClasses);
    assert_eq!(classes.len(), 1);
    assert_eq!(classes[0].get("subjectTeacherIds"), Some(&json!(["t-1"])));

    let updated = classes[0].clone().with("subjectTeacherIds", json!(["t-1", "t-3"]));
    let outcome = engine
        .save_record(Collection::VocationalClasses, updated, true)
        .await
        .unwrap();
    assert_eq!(outcome, WriteOutcome::Confirmed);
    assert_eq!(
        stub.writes()[0]["data"]["subjectTeacherIds"],
        json!("[\"t-1\",\"t-3\"]")
    );

    // A fresh engine on the same directory starts from the persisted cache.
    let offline = SyncEngine::new(
        Arc::new(remote(format!("{base}/exec"), API_KEY)),
        Arc::new(FileKv::new(dir.path())),
    );
    assert_eq!(offline.data(), engine.data());
    assert_eq!(offline.last_synced(), engine.last_synced());
}
