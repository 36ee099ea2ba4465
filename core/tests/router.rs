//! Router behaviour against an in-memory scripted transport.
//!
//! # Design
//! `ScriptedTransport` answers every request from a closure on a fresh
//! thread, like a real transport would. `ParkedTransport` holds completions
//! until the test fires them, which makes the lifetime and cancellation cases
//! deterministic.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use courier_core::transport::Completion;
use courier_core::{
    params, BasicEndpoint, Endpoint, Error, Headers, HttpMethod, HttpTask, KeyCasing, ResponseMeta, Router,
    SerialQueue, TaskHandle, Transport, TransportError, TransportOutcome, WireRequest,
};
use serde::{Deserialize, Serialize};

const BASE_URL: &str = "https://api.stub.com/v1";
const DELIVERY_THREAD: &str = "router-test-delivery";

// ---------------------------------------------------------------------------
// Transports
// ---------------------------------------------------------------------------

type Responder = dyn Fn(&WireRequest) -> TransportOutcome + Send + Sync;

#[derive(Clone, Default)]
struct Flag(Arc<AtomicBool>);

impl TaskHandle for Flag {
    fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct ScriptedTransport {
    respond: Arc<Responder>,
    sent: Arc<Mutex<Vec<WireRequest>>>,
}

impl Transport for ScriptedTransport {
    fn send(&self, request: WireRequest, completion: Completion) -> Box<dyn TaskHandle> {
        let outcome = (self.respond)(&request);
        self.sent.lock().unwrap().push(request);
        thread::Builder::new()
            .name("scripted-transport".to_string())
            .spawn(move || completion(outcome))
            .unwrap();
        Box::new(Flag::default())
    }
}

struct Pending {
    completion: Completion,
    cancelled: Flag,
}

#[derive(Clone, Default)]
struct ParkedTransport {
    pending: Arc<Mutex<Vec<Pending>>>,
}

impl ParkedTransport {
    fn fire(&self, outcome: TransportOutcome) {
        let pending = self.pending.lock().unwrap().remove(0);
        (pending.completion)(outcome);
    }

    fn cancelled(&self) -> bool {
        self.pending.lock().unwrap()[0].cancelled.is_cancelled()
    }
}

impl Transport for ParkedTransport {
    fn send(&self, _request: WireRequest, completion: Completion) -> Box<dyn TaskHandle> {
        let cancelled = Flag::default();
        self.pending.lock().unwrap().push(Pending {
            completion,
            cancelled: cancelled.clone(),
        });
        Box::new(cancelled)
    }
}

fn meta(request_url: &str, status: u16) -> ResponseMeta {
    ResponseMeta {
        url: url::Url::parse(request_url).unwrap(),
        status,
        headers: Headers::new(),
    }
}

fn respond(status: u16, body: &'static str) -> Arc<Responder> {
    Arc::new(move |request: &WireRequest| {
        TransportOutcome::success(body.as_bytes().to_vec(), meta(request.url.as_str(), status))
    })
}

fn scripted(respond: Arc<Responder>) -> (Router, Arc<Mutex<Vec<WireRequest>>>) {
    common::init_test_logging();
    let sent = Arc::new(Mutex::new(Vec::new()));
    let router = Router::builder(BASE_URL)
        .unwrap()
        .transport(ScriptedTransport {
            respond,
            sent: Arc::clone(&sent),
        })
        .delivery(SerialQueue::new(DELIVERY_THREAD).unwrap())
        .build()
        .unwrap();
    (router, sent)
}

fn parked() -> (Router, ParkedTransport) {
    common::init_test_logging();
    let transport = ParkedTransport::default();
    let router = Router::builder(BASE_URL)
        .unwrap()
        .transport(transport.clone())
        .delivery(SerialQueue::new(DELIVERY_THREAD).unwrap())
        .build()
        .unwrap();
    (router, transport)
}

// ---------------------------------------------------------------------------
// A typical API description
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
struct NewItem {
    display_name: String,
    in_stock: bool,
}

#[derive(Debug, Deserialize, PartialEq)]
struct Item {
    id: u32,
    display_name: String,
    in_stock: bool,
}

enum ItemsApi {
    List { in_stock: Option<bool> },
    Create(NewItem),
    Remove(u32),
}

impl Endpoint for ItemsApi {
    fn path(&self) -> String {
        match self {
            ItemsApi::List { .. } | ItemsApi::Create(_) => "/items".to_string(),
            ItemsApi::Remove(id) => format!("/items/{id}"),
        }
    }

    fn method(&self) -> HttpMethod {
        match self {
            ItemsApi::List { .. } => HttpMethod::Get,
            ItemsApi::Create(_) => HttpMethod::Post,
            ItemsApi::Remove(_) => HttpMethod::Delete,
        }
    }

    fn task(&self) -> HttpTask {
        match self {
            ItemsApi::List { in_stock } => HttpTask::Parameters {
                body: None,
                url: in_stock.map(|in_stock| params([("inStock", in_stock)])),
            },
            ItemsApi::Create(item) => HttpTask::encodable(item.clone(), KeyCasing::CamelCase),
            ItemsApi::Remove(_) => HttpTask::plain(),
        }
    }

    fn headers(&self) -> Option<Vec<(String, String)>> {
        Some(vec![("Authorization".to_string(), "Bearer token".to_string())])
    }
}

// ---------------------------------------------------------------------------
// Callback shapes
// ---------------------------------------------------------------------------

#[test]
fn data_task_delivers_body_on_delivery_thread() {
    let (router, _) = scripted(respond(200, "Success"));
    let (tx, rx) = mpsc::channel();

    let handle = router.perform_data_task(&BasicEndpoint::get("/ping"), move |result| {
        tx.send((result.unwrap(), thread::current().name().map(str::to_string)))
            .unwrap();
    });

    assert!(handle.is_some());
    let (body, thread_name) = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(body, b"Success");
    assert_eq!(thread_name.as_deref(), Some(DELIVERY_THREAD));
}

#[test]
fn task_reports_rejected_status_with_response() {
    let (router, _) = scripted(respond(300, "Failure"));
    let (tx, rx) = mpsc::channel();

    router.perform_task(&BasicEndpoint::get("/ping"), move |result, response| {
        tx.send((result, response)).unwrap();
    });

    let (result, response) = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    match result {
        Err(Error::InvalidResponse(Some(meta))) => assert_eq!(meta.status, 300),
        other => panic!("expected InvalidResponse, got {other:?}"),
    }
    assert_eq!(response.unwrap().status, 300);
}

#[test]
fn transport_error_is_passed_through() {
    let (router, _) = scripted(Arc::new(|_: &WireRequest| TransportOutcome::failure(TransportError::TimedOut)));
    let (tx, rx) = mpsc::channel();

    router.perform_task(&BasicEndpoint::get("/ping"), move |result, response| {
        tx.send((result, response)).unwrap();
    });

    let (result, response) = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert!(matches!(result, Err(Error::Transport(TransportError::TimedOut))));
    assert!(response.is_none());
}

#[test]
fn compile_failure_never_reaches_transport() {
    let (router, sent) = scripted(respond(200, "Success"));
    let endpoint = BasicEndpoint::post("/items").with_task(HttpTask::Parameters {
        body: Some(params([("ratio", f64::NAN)])),
        url: None,
    });
    let caller = thread::current().id();
    let (tx, rx) = mpsc::channel();

    let handle = router.perform_task(&endpoint, move |result, response| {
        tx.send((result, response, thread::current().id())).unwrap();
    });

    assert!(handle.is_none());
    // Already delivered, synchronously, on this thread.
    let (result, response, delivered_on) = rx.try_recv().unwrap();
    assert!(matches!(result, Err(Error::Encoding(_))));
    assert!(response.is_none());
    assert_eq!(delivered_on, caller);
    assert!(sent.lock().unwrap().is_empty());
}

#[test]
fn decoding_task_maps_camel_case_wire_format() {
    let (router, _) = scripted(respond(200, r#"{"id":7,"displayName":"Widget","inStock":true}"#));
    let (tx, rx) = mpsc::channel();

    router.perform_decoding_task::<Item, _>(&ItemsApi::Remove(7), KeyCasing::SnakeCase, move |result| {
        tx.send(result).unwrap();
    });

    let item = rx.recv_timeout(Duration::from_secs(2)).unwrap().unwrap();
    assert_eq!(
        item,
        Item {
            id: 7,
            display_name: "Widget".to_string(),
            in_stock: true,
        }
    );
}

#[test]
fn decoding_task_rejects_wrong_shape() {
    let (router, _) = scripted(respond(200, r#"[1, 2, 3]"#));
    let (tx, rx) = mpsc::channel();

    router.perform_decoding_task::<Item, _>(&ItemsApi::Remove(7), KeyCasing::SnakeCase, move |result| {
        tx.send(result).unwrap();
    });

    assert!(matches!(
        rx.recv_timeout(Duration::from_secs(2)).unwrap(),
        Err(Error::Decoding(_))
    ));
}

#[test]
fn void_task_accepts_empty_body() {
    let (router, _) = scripted(respond(204, ""));
    let (tx, rx) = mpsc::channel();

    router.perform_void_task(&ItemsApi::Remove(3), move |result| tx.send(result).unwrap());

    assert!(rx.recv_timeout(Duration::from_secs(2)).unwrap().is_ok());
}

#[test]
fn enum_endpoint_compiles_to_expected_requests() {
    let (router, sent) = scripted(respond(200, "[]"));
    let (tx, rx) = mpsc::channel();

    let create = ItemsApi::Create(NewItem {
        display_name: "Widget".to_string(),
        in_stock: false,
    });
    for endpoint in [ItemsApi::List { in_stock: Some(true) }, create] {
        let tx = tx.clone();
        router.perform_void_task(&endpoint, move |result| tx.send(result).unwrap());
        rx.recv_timeout(Duration::from_secs(2)).unwrap().unwrap();
    }

    let sent = sent.lock().unwrap();
    let list = &sent[0];
    assert_eq!(list.method, HttpMethod::Get);
    assert_eq!(list.url.as_str(), "https://api.stub.com/v1/items?inStock=true");
    assert_eq!(list.headers.get("authorization"), Some("Bearer token"));
    assert!(list.body.is_none());

    let create = &sent[1];
    assert_eq!(create.method, HttpMethod::Post);
    assert_eq!(create.url.as_str(), "https://api.stub.com/v1/items");
    let body: serde_json::Value = serde_json::from_slice(create.body.as_deref().unwrap()).unwrap();
    assert_eq!(body, serde_json::json!({ "displayName": "Widget", "inStock": false }));
}

#[test]
fn json_parameters_end_to_end() {
    let echo: Arc<Responder> = Arc::new(|request: &WireRequest| {
        TransportOutcome::success(request.body.clone().unwrap_or_default(), meta(request.url.as_str(), 200))
    });
    let (router, sent) = scripted(echo);
    let endpoint = BasicEndpoint::post("/items").with_task(HttpTask::Parameters {
        body: Some(params([("name", "a")])),
        url: None,
    });
    let (tx, rx) = mpsc::channel();

    router.perform_data_task(&endpoint, move |result| tx.send(result).unwrap());

    let body = rx.recv_timeout(Duration::from_secs(2)).unwrap().unwrap();
    assert_eq!(body, br#"{"name":"a"}"#);
    let request = &sent.lock().unwrap()[0];
    assert_eq!(request.url.as_str(), "https://api.stub.com/v1/items");
    assert_eq!(request.headers.get("Content-Type"), Some("application/json"));
}

#[test]
fn custom_accept_range() {
    common::init_test_logging();
    let router = Router::builder(BASE_URL)
        .unwrap()
        .transport(ScriptedTransport {
            respond: respond(304, ""),
            sent: Arc::default(),
        })
        .delivery(courier_core::Inline)
        .accept_statuses(200..=399)
        .build()
        .unwrap();
    let (tx, rx) = mpsc::channel();

    router.perform_void_task(&BasicEndpoint::get("/cached"), move |result| tx.send(result).unwrap());

    assert!(rx.recv_timeout(Duration::from_secs(2)).unwrap().is_ok());
}

#[test]
fn completions_are_delivered_in_arrival_order() {
    let (router, transport) = parked();
    let (tx, rx) = mpsc::channel();

    for i in 0..3 {
        let tx = tx.clone();
        router.perform_data_task(&BasicEndpoint::get(format!("/n/{i}")), move |result| {
            tx.send((i, result.is_ok())).unwrap();
        });
    }
    for _ in 0..3 {
        transport.fire(TransportOutcome::success(Vec::new(), meta(BASE_URL, 200)));
    }

    let order: Vec<_> = (0..3)
        .map(|_| rx.recv_timeout(Duration::from_secs(2)).unwrap())
        .collect();
    assert_eq!(order, vec![(0, true), (1, true), (2, true)]);
}

#[test]
fn dropped_router_discards_late_completion() {
    let (router, transport) = parked();
    let (tx, rx) = mpsc::channel::<()>();

    router.perform_data_task(&BasicEndpoint::get("/late"), move |_| tx.send(()).unwrap());
    drop(router);
    transport.fire(TransportOutcome::success(b"late".to_vec(), meta(BASE_URL, 200)));

    // The callback was dropped unrun, taking the sender with it.
    assert!(matches!(
        rx.recv_timeout(Duration::from_secs(1)),
        Err(mpsc::RecvTimeoutError::Disconnected)
    ));
}

#[test]
fn clones_keep_router_alive() {
    let (router, transport) = parked();
    let clone = router.clone();
    let (tx, rx) = mpsc::channel();

    router.perform_data_task(&BasicEndpoint::get("/kept"), move |result| tx.send(result).unwrap());
    drop(router);
    transport.fire(TransportOutcome::success(b"kept".to_vec(), meta(BASE_URL, 200)));

    assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap().unwrap(), b"kept");
    drop(clone);
}

// ---------------------------------------------------------------------------
// Async shapes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_entry_returns_body_and_response() {
    let (router, _) = scripted(respond(201, "created"));

    let entry = router.fetch_entry(&BasicEndpoint::post("/items")).await.unwrap();

    assert_eq!(entry.data, b"created");
    assert_eq!(entry.response.status, 201);
    assert_eq!(entry.response.url.as_str(), "https://api.stub.com/v1/items");
}

#[tokio::test]
async fn fetch_data_and_void_report_rejections() {
    let (router, _) = scripted(respond(500, "boom"));

    let err = router.fetch_data(&BasicEndpoint::get("/items")).await.unwrap_err();
    assert_eq!(err.response().map(|m| m.status), Some(500));

    let err = router.fetch_void(&BasicEndpoint::delete("/items/1")).await.unwrap_err();
    assert!(matches!(err, Error::InvalidResponse(Some(_))));
}

#[tokio::test]
async fn fetch_decoded_list() {
    let (router, _) = scripted(respond(
        200,
        r#"[{"id":1,"displayName":"A","inStock":true},{"id":2,"displayName":"B","inStock":false}]"#,
    ));

    let items: Vec<Item> = router
        .fetch_decoded(&ItemsApi::List { in_stock: None }, KeyCasing::SnakeCase)
        .await
        .unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[1].display_name, "B");
}

#[tokio::test]
async fn fetch_compile_failure_resolves_immediately() {
    let (router, sent) = scripted(respond(200, "unused"));
    let endpoint = BasicEndpoint::post("/items").with_task(HttpTask::FormData(params([("x", f64::INFINITY)])));

    let err = router.fetch_void(&endpoint).await.unwrap_err();

    assert!(matches!(err, Error::Encoding(_)));
    assert!(sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn fetch_resolves_abandoned_when_router_dropped() {
    let (router, transport) = parked();

    let pending = router.fetch_data(&BasicEndpoint::get("/late"));
    drop(router);
    transport.fire(TransportOutcome::success(b"late".to_vec(), meta(BASE_URL, 200)));

    assert!(matches!(pending.await, Err(Error::Abandoned)));
}

#[tokio::test]
async fn dropping_fetch_future_cancels_task() {
    let (router, transport) = parked();

    let pending = router.fetch_data(&BasicEndpoint::get("/slow"));
    assert!(!transport.cancelled());
    drop(pending);

    assert!(transport.cancelled());
}

#[tokio::test]
async fn fetch_futures_are_spawnable() {
    let (router, _) = scripted(respond(200, "ok"));

    let tasks: Vec<_> = (0..8)
        .map(|i| tokio::spawn(router.fetch_data(&BasicEndpoint::get(format!("/n/{i}")))))
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), b"ok");
    }
}
