mod common;

use common::{APP_KEY, BASE_URL, Listing, listing, mock_service};
use mobilestack_client::{
    ClientError, ClientResult, ExecutionContext, HttpRequest, HttpResponse, MobileService,
    Operation, OperationError, ServiceConfig, Transport, TransportError, event_loop,
};
use mobilestack_model::MappingError;
use pretty_assertions::assert_eq;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

fn current_thread_name() -> String {
    thread::current().name().unwrap_or_default().to_string()
}

struct PanickingTransport;

impl Transport for PanickingTransport {
    fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
        panic!("transport exploded");
    }
}

/// Answers every request with 204 after a pause.
struct SlowTransport(Duration);

impl Transport for SlowTransport {
    fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
        thread::sleep(self.0);
        Ok(HttpResponse::new(204, ""))
    }
}

// ── Callback delivery ────────────────────────────────────────────

#[test]
fn async_delete_without_key_reports_once_and_sends_nothing() {
    let (service, transport) = mock_service();
    let (tx, rx) = mpsc::channel();

    service
        .table::<Listing>()
        .unwrap()
        .delete_async(listing("Loft", 2), None, move |result| {
            tx.send(result).unwrap();
        });

    let result = rx.recv_timeout(WAIT).expect("callback fired");
    assert!(matches!(
        result,
        Err(ClientError::Mapping(MappingError::KeyNotSet { .. }))
    ));
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    assert_eq!(transport.request_count(), 0);
}

#[test]
fn callback_without_context_runs_on_worker() {
    let (service, transport) = mock_service();
    transport.respond(201, r#"{"id":21}"#);
    let (tx, rx) = mpsc::channel();

    service
        .table::<Listing>()
        .unwrap()
        .insert_async(listing("Loft", 2), None, move |result| {
            tx.send((current_thread_name(), result.map(|l| l.id))).unwrap();
        });

    let (thread_name, id) = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(thread_name, "mobilestack-worker");
    assert_eq!(id.unwrap(), 21);
}

#[test]
fn event_loop_delivers_on_owning_thread() {
    let (service, transport) = mock_service();
    transport.respond(201, r#"{"id":1}"#);

    let (handle, mut event_loop) = event_loop();
    let context: Arc<dyn ExecutionContext> = Arc::new(handle);
    let owner = thread::current().id();
    let seen: Arc<Mutex<Vec<(thread::ThreadId, ClientResult<i32>)>>> = Arc::default();

    let sink = seen.clone();
    service
        .table::<Listing>()
        .unwrap()
        .insert_async(listing("Loft", 2), Some(context), move |result| {
            sink.lock()
                .unwrap()
                .push((thread::current().id(), result.map(|l| l.id)));
        });

    assert!(event_loop.run_next_timeout(WAIT));
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, owner);
    assert_eq!(seen[0].1.as_ref().unwrap(), &1);
}

#[test]
fn runtime_handle_context_runs_callback_on_that_runtime() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("host-runtime")
        .build()
        .unwrap();
    let context: Arc<dyn ExecutionContext> = Arc::new(runtime.handle().clone());

    let (service, transport) = mock_service();
    transport.respond(200, "[]");
    let (tx, rx) = mpsc::channel();

    service
        .table::<Listing>()
        .unwrap()
        .select_all_async(Some(context), move |result| {
            tx.send((current_thread_name(), result.map(|rows| rows.len())))
                .unwrap();
        });

    let (thread_name, rows) = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(thread_name, "host-runtime");
    assert_eq!(rows.unwrap(), 0);
}

#[test]
fn update_async_hands_back_entity() {
    let (service, transport) = mock_service();
    transport.respond(200, "{}");
    let (tx, rx) = mpsc::channel();

    let mut row = listing("Loft", 4);
    row.id = 8;
    service
        .table::<Listing>()
        .unwrap()
        .update_async(row.clone(), None, move |result| {
            tx.send(result).unwrap();
        });

    assert_eq!(rx.recv_timeout(WAIT).unwrap().unwrap(), row);
}

#[test]
fn query_select_async_reports_status_failure() {
    let (service, transport) = mock_service();
    transport.respond(503, "unavailable");
    let (tx, rx) = mpsc::channel();

    service
        .table::<Listing>()
        .unwrap()
        .query()
        .equal("bedrooms", 2)
        .select_async(None, move |result| {
            tx.send(result).unwrap();
        });

    let err = rx.recv_timeout(WAIT).unwrap().unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert!(transport.requests()[0].url.contains("$filter="));
}

#[test]
fn panicking_job_is_reported_as_abandoned() {
    let service = MobileService::with_transport(
        ServiceConfig::new(BASE_URL, APP_KEY),
        Arc::new(PanickingTransport),
    )
    .unwrap();
    let (tx, rx) = mpsc::channel();

    service
        .table::<Listing>()
        .unwrap()
        .select_all_async(None, move |result| {
            tx.send(result).unwrap();
        });

    match rx.recv_timeout(WAIT).unwrap() {
        Err(ClientError::Operation(OperationError::Abandoned { operation, reason })) => {
            assert_eq!(operation, Operation::Select);
            assert_eq!(reason, "worker panicked");
        }
        other => panic!("expected abandoned operation, got {other:?}"),
    }
}

#[test]
fn worker_handle_callback_survives_dropping_the_service() {
    let service = MobileService::with_transport(
        ServiceConfig::new(BASE_URL, APP_KEY),
        Arc::new(SlowTransport(Duration::from_millis(200))),
    )
    .unwrap();
    let context: Arc<dyn ExecutionContext> = Arc::new(service.worker_handle().unwrap());
    let table = service.table::<Listing>().unwrap();
    let (tx, rx) = mpsc::channel();

    let mut row = listing("Loft", 2);
    row.id = 4;
    table.delete_async(row, Some(context), move |result| {
        let _ = tx.send(result);
    });
    drop(table);
    drop(service);

    let result = rx.recv_timeout(WAIT).expect("callback fired");
    assert!(result.is_ok(), "delete failed: {result:?}");
}

#[test]
fn posting_to_stopped_runtime_still_runs_task() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .build()
        .unwrap();
    let handle = runtime.handle().clone();
    drop(runtime);

    let (tx, rx) = mpsc::channel();
    handle.post(Box::new(move || {
        let _ = tx.send(current_thread_name());
    }));
    assert!(rx.recv_timeout(WAIT).is_ok());
}

// ── Pending ──────────────────────────────────────────────────────

#[test]
fn pending_can_be_waited_on() {
    let (service, transport) = mock_service();
    transport.respond(201, r#"{"id":33}"#);

    let pending = service
        .table::<Listing>()
        .unwrap()
        .submit_insert(listing("Loft", 2));
    assert_eq!(pending.operation(), Operation::Insert);
    assert_eq!(pending.wait().unwrap().id, 33);
}

#[test]
fn pending_delete_reports_missing_key() {
    let (service, _) = mock_service();
    let err = service
        .table::<Listing>()
        .unwrap()
        .submit_delete(listing("Loft", 2))
        .wait()
        .unwrap_err();
    assert!(matches!(err, ClientError::Mapping(_)));
}

#[tokio::test]
async fn pending_can_be_awaited() {
    let (service, transport) = mock_service();
    transport.respond(200, r#"[{"id":2,"title":"B"}]"#);

    let rows = service
        .table::<Listing>()
        .unwrap()
        .query()
        .equal("bedrooms", 2)
        .top(1)
        .unwrap()
        .submit()
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].title, "B");
    assert_eq!(
        transport.requests()[0].url,
        format!("{BASE_URL}/tables/listing?$filter=((bedrooms%20eq%202))&$top=1")
    );
}

#[tokio::test]
async fn pending_can_be_waited_from_blocking_thread() {
    let (service, transport) = mock_service();
    transport.respond(200, "[]");

    let pending = service.table::<Listing>().unwrap().submit_select_all();
    let rows = tokio::task::spawn_blocking(move || pending.wait())
        .await
        .unwrap()
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn pending_update_round_trips_through_await() {
    let (service, transport) = mock_service();
    transport.respond(200, "{}");

    let mut row = listing("Loft", 2);
    row.id = 3;
    let updated = service
        .table::<Listing>()
        .unwrap()
        .submit_update(row.clone())
        .await
        .unwrap();
    assert_eq!(updated, row);
}

// ── Event loop ───────────────────────────────────────────────────

#[test]
fn run_pending_drains_queue() {
    let (handle, mut event_loop) = event_loop();
    let count = Arc::new(Mutex::new(0));
    for _ in 0..3 {
        let count = count.clone();
        handle.post(Box::new(move || *count.lock().unwrap() += 1));
    }

    assert_eq!(event_loop.run_pending(), 3);
    assert_eq!(event_loop.run_pending(), 0);
    assert_eq!(*count.lock().unwrap(), 3);
}

#[test]
fn run_next_ends_when_handles_are_gone() {
    let (handle, mut event_loop) = event_loop();
    handle.post(Box::new(|| {}));
    drop(handle);

    assert!(event_loop.run_next());
    assert!(!event_loop.run_next());
}

#[test]
fn posting_to_dropped_loop_runs_inline() {
    let (handle, event_loop) = event_loop();
    drop(event_loop);

    let ran = Arc::new(Mutex::new(false));
    let flag = ran.clone();
    handle.post(Box::new(move || *flag.lock().unwrap() = true));
    assert!(*ran.lock().unwrap());
}
