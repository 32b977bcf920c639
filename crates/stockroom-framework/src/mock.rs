//! # Mock Framework & Testing Guide
//!
//! `MockClient<T>` hands out a real `ResourceClient<T>` whose requests are answered from
//! a queue of expectations instead of a running actor. Code under test cannot tell the
//! difference, which makes it the tool of choice for exercising orchestration logic
//! (such as order placement) against scripted remote behaviour.
//!
//! ## When to use Mocks vs Real Actors
//!
//! | Feature | MockClient | Real Actor |
//! |---------|------------|------------|
//! | **Speed** | Instant (in-memory) | Fast (but involves tokio spawn) |
//! | **Determinism** | Fully scripted | Subject to scheduler |
//! | **State** | No real state (expectations) | Real state management |
//! | **Use Case** | Logic *around* the client | The service itself or the full system |
//! | **Error Injection** | Easy (`return_err`) | Hard (requires specific state) |
//!
//! ## Example
//!
//! ```ignore
//! let mut items = MockClient::<InventoryItem>::new();
//! items.expect_get(id).return_ok(item);
//! items
//!     .expect_action(id)
//!     .return_err(Status::new(Code::InsufficientQuantity, "only 3 left").into());
//!
//! let coordinator = OrderCoordinator::new(orders, Arc::new(ItemClient::new(items.client())), bus);
//! // ... drive the coordinator ...
//!
//! assert_eq!(items.calls(), 2);
//! items.verify();
//! ```
//!
//! Requests are matched in order. A request that does not match the head of the queue
//! (wrong operation or wrong id) is answered with an `Internal` status and recorded;
//! [`verify`](MockClient::verify) panics on any recorded mismatch or unmet expectation.
//!
//! For step-by-step control over each reply, use [`create_mock_client`] and the
//! `expect_*` receiver helpers instead.

use crate::client::ResourceClient;
use crate::entity::Resource;
use crate::error::{Code, FrameworkError, Status};
use crate::message::ResourceRequest;
use crate::pagination::Page;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, oneshot};

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

enum Expectation<T: Resource> {
    Get {
        id: T::Id,
        response: Result<T, FrameworkError>,
    },
    Create {
        response: Result<T, FrameworkError>,
    },
    Update {
        id: T::Id,
        response: Result<T, FrameworkError>,
    },
    Delete {
        id: T::Id,
        response: Result<T, FrameworkError>,
    },
    List {
        response: Result<Page<T>, FrameworkError>,
    },
    Action {
        id: T::Id,
        response: Result<T::ActionResult, FrameworkError>,
    },
}

impl<T: Resource> Expectation<T> {
    fn describe(&self) -> String {
        match self {
            Expectation::Get { id, .. } => format!("Get({id})"),
            Expectation::Create { .. } => "Create".to_string(),
            Expectation::Update { id, .. } => format!("Update({id})"),
            Expectation::Delete { id, .. } => format!("Delete({id})"),
            Expectation::List { .. } => "List".to_string(),
            Expectation::Action { id, .. } => format!("Action({id})"),
        }
    }
}

struct MockState<T: Resource> {
    expectations: VecDeque<Expectation<T>>,
    mismatches: Vec<String>,
}

type Shared<T> = Arc<Mutex<MockState<T>>>;

fn lock<T: Resource>(state: &Shared<T>) -> MutexGuard<'_, MockState<T>> {
    // A panicking test thread must not hide the expectations from `verify`.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A mock client with expectation tracking for fluent testing.
pub struct MockClient<T: Resource> {
    client: ResourceClient<T>,
    state: Shared<T>,
    calls: Arc<AtomicUsize>,
    _handle: tokio::task::JoinHandle<()>,
}

impl<T: Resource> Default for MockClient<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Resource> MockClient<T> {
    /// Creates a new mock client with no expectations.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::channel::<ResourceRequest<T>>(100);
        let state: Shared<T> = Arc::new(Mutex::new(MockState {
            expectations: VecDeque::new(),
            mismatches: Vec::new(),
        }));
        let calls = Arc::new(AtomicUsize::new(0));

        let task_state = Arc::clone(&state);
        let task_calls = Arc::clone(&calls);
        let handle = tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                task_calls.fetch_add(1, Ordering::SeqCst);
                let expectation = lock(&task_state).expectations.pop_front();
                if let Some(mismatch) = answer(request, expectation) {
                    lock(&task_state).mismatches.push(mismatch);
                }
            }
        });

        Self {
            client: ResourceClient::new(sender),
            state,
            calls,
            _handle: handle,
        }
    }

    /// Returns the client for use in tests.
    pub fn client(&self) -> ResourceClient<T> {
        self.client.clone()
    }

    /// Number of requests received so far, matched or not.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn expect_get(&mut self, id: T::Id) -> ExpectationBuilder<T, T> {
        self.builder(move |response| Expectation::Get { id, response })
    }

    pub fn expect_create(&mut self) -> ExpectationBuilder<T, T> {
        self.builder(|response| Expectation::Create { response })
    }

    pub fn expect_update(&mut self, id: T::Id) -> ExpectationBuilder<T, T> {
        self.builder(move |response| Expectation::Update { id, response })
    }

    pub fn expect_delete(&mut self, id: T::Id) -> ExpectationBuilder<T, T> {
        self.builder(move |response| Expectation::Delete { id, response })
    }

    pub fn expect_list(&mut self) -> ExpectationBuilder<T, Page<T>> {
        self.builder(|response| Expectation::List { response })
    }

    pub fn expect_action(&mut self, id: T::Id) -> ExpectationBuilder<T, T::ActionResult> {
        self.builder(move |response| Expectation::Action { id, response })
    }

    /// Verifies that all expectations were met and no request was unexpected.
    pub fn verify(&self) {
        let state = lock(&self.state);
        if !state.mismatches.is_empty() {
            panic!("Unexpected requests: {}", state.mismatches.join("; "));
        }
        if !state.expectations.is_empty() {
            let remaining: Vec<_> = state.expectations.iter().map(|e| e.describe()).collect();
            panic!(
                "Not all expectations were met. {} remaining: {}",
                remaining.len(),
                remaining.join(", ")
            );
        }
    }

    fn builder<R>(
        &mut self,
        build: impl FnOnce(Result<R, FrameworkError>) -> Expectation<T> + Send + 'static,
    ) -> ExpectationBuilder<T, R> {
        ExpectationBuilder {
            state: Arc::clone(&self.state),
            build: Box::new(build),
        }
    }
}

/// Completes an expectation with the response the mock should send.
pub struct ExpectationBuilder<T: Resource, R> {
    state: Shared<T>,
    build: Box<dyn FnOnce(Result<R, FrameworkError>) -> Expectation<T> + Send>,
}

impl<T: Resource, R> ExpectationBuilder<T, R> {
    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, value: R) {
        self.push(Ok(value));
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: FrameworkError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<R, FrameworkError>) {
        let expectation = (self.build)(response);
        lock(&self.state).expectations.push_back(expectation);
    }
}

/// Replies to `request` from `expectation`; returns a description on mismatch.
fn answer<T: Resource>(
    request: ResourceRequest<T>,
    expectation: Option<Expectation<T>>,
) -> Option<String> {
    match (request, expectation) {
        (ResourceRequest::Get { id, respond_to }, Some(Expectation::Get { id: want, response }))
            if id == want =>
        {
            let _ = respond_to.send(response);
            None
        }
        (ResourceRequest::Create { respond_to, .. }, Some(Expectation::Create { response })) => {
            let _ = respond_to.send(response);
            None
        }
        (
            ResourceRequest::Update { id, respond_to, .. },
            Some(Expectation::Update { id: want, response }),
        ) if id == want => {
            let _ = respond_to.send(response);
            None
        }
        (
            ResourceRequest::Delete { id, respond_to },
            Some(Expectation::Delete { id: want, response }),
        ) if id == want => {
            let _ = respond_to.send(response);
            None
        }
        (ResourceRequest::List { respond_to, .. }, Some(Expectation::List { response })) => {
            let _ = respond_to.send(response);
            None
        }
        (
            ResourceRequest::Action { id, respond_to, .. },
            Some(Expectation::Action { id: want, response }),
        ) if id == want => {
            let _ = respond_to.send(response);
            None
        }
        (request, expectation) => {
            let expected = expectation
                .map(|e| e.describe())
                .unwrap_or_else(|| "nothing".to_string());
            let mismatch = format!("got {}, expected {expected}", request.operation());
            reject(request, &mismatch);
            Some(mismatch)
        }
    }
}

fn reject<T: Resource>(request: ResourceRequest<T>, message: &str) {
    let status = || FrameworkError::Status(Status::new(Code::Internal, message));
    match request {
        ResourceRequest::Create { respond_to, .. }
        | ResourceRequest::Get { respond_to, .. }
        | ResourceRequest::Update { respond_to, .. }
        | ResourceRequest::Delete { respond_to, .. } => {
            let _ = respond_to.send(Err(status()));
        }
        ResourceRequest::List { respond_to, .. } => {
            let _ = respond_to.send(Err(status()));
        }
        ResourceRequest::Action { respond_to, .. } => {
            let _ = respond_to.send(Err(status()));
        }
    }
}

// =============================================================================
// RECEIVER HELPERS
// =============================================================================

/// Creates a client and the receiving end of its channel.
///
/// The test plays the actor: it pulls each request with one of the `expect_*` helpers
/// and answers through the returned responder, which allows holding a reply back to
/// simulate a slow or vanished server.
pub fn create_mock_client<T: Resource>(
    buffer_size: usize,
) -> (ResourceClient<T>, mpsc::Receiver<ResourceRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ResourceClient::new(sender), receiver)
}

/// Helper to verify that the next message is a Create request
pub async fn expect_create<T: Resource>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Create, oneshot::Sender<Result<T, FrameworkError>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Create { params, respond_to }) => Some((params, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Get request
pub async fn expect_get<T: Resource>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, oneshot::Sender<Result<T, FrameworkError>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Get { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is an Action request
pub async fn expect_action<T: Resource>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(
    T::Id,
    T::Action,
    oneshot::Sender<Result<T::ActionResult, FrameworkError>>,
)> {
    match receiver.recv().await {
        Some(ResourceRequest::Action {
            id,
            action,
            respond_to,
        }) => Some((id, action, respond_to)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Record;
    use crate::pagination::{Pagination, SortOption};
    use std::cmp::Ordering as CmpOrdering;
    use std::time::Duration;

    #[derive(Clone, Debug, PartialEq)]
    struct Shelf {
        id: u32,
        stock: i64,
    }

    #[derive(Debug)]
    struct ShelfCreate {
        stock: i64,
    }

    #[derive(Debug)]
    enum ShelfAction {
        Take(i64),
    }

    impl Record for Shelf {
        type Id = u32;
        const KIND: &'static str = "shelf";

        fn id(&self) -> &u32 {
            &self.id
        }

        fn compare_by(&self, other: &Self, _sort: Option<SortOption>) -> CmpOrdering {
            self.id.cmp(&other.id)
        }
    }

    impl Resource for Shelf {
        type Create = ShelfCreate;
        type Update = ();
        type Action = ShelfAction;
        type ActionResult = i64;
    }

    #[tokio::test]
    async fn test_mock_client() {
        let (client, mut receiver) = create_mock_client::<Shelf>(10);

        let create_task = tokio::spawn(async move { client.create(ShelfCreate { stock: 4 }).await });

        let (payload, responder) = expect_create(&mut receiver)
            .await
            .expect("Expected Create request");
        assert_eq!(payload.stock, 4);
        responder.send(Ok(Shelf { id: 1, stock: 4 })).unwrap();

        let created = create_task.await.unwrap().unwrap();
        assert_eq!(created.id, 1);
    }

    #[tokio::test]
    async fn test_mock_client_with_expectations() {
        let mut mock = MockClient::<Shelf>::new();
        mock.expect_get(1).return_ok(Shelf { id: 1, stock: 5 });
        mock.expect_action(1).return_ok(2);
        mock.expect_action(1).return_err(FrameworkError::Status(Status::new(
            Code::InsufficientQuantity,
            "only 2 left",
        )));

        let client = mock.client();
        assert_eq!(client.get(1).await.unwrap().stock, 5);
        assert_eq!(client.perform_action(1, ShelfAction::Take(3)).await.unwrap(), 2);
        let err = client
            .perform_action(1, ShelfAction::Take(3))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::InsufficientQuantity);

        assert_eq!(mock.calls(), 3);
        mock.verify();
    }

    #[tokio::test]
    async fn mismatched_request_is_answered_and_recorded() {
        let mut mock = MockClient::<Shelf>::new();
        mock.expect_get(1).return_ok(Shelf { id: 1, stock: 5 });

        let err = mock.client().get(2).await.unwrap_err();
        assert_eq!(err.code(), Code::Internal);

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| mock.verify()));
        assert!(outcome.is_err());
    }

    #[tokio::test]
    async fn update_and_delete_expectations_match_on_id() {
        let mut mock = MockClient::<Shelf>::new();
        mock.expect_update(4).return_ok(Shelf { id: 4, stock: 1 });
        mock.expect_delete(4).return_ok(Shelf { id: 4, stock: 1 });
        mock.expect_delete(4).return_err(FrameworkError::Status(Status::new(
            Code::NotFound,
            "shelf 4 not found",
        )));

        let client = mock.client();
        assert_eq!(client.update(4, ()).await.unwrap().stock, 1);
        assert_eq!(client.delete(4).await.unwrap().id, 4);
        assert!(client.delete(4).await.unwrap_err().is_not_found());

        assert_eq!(mock.calls(), 3);
        mock.verify();
    }

    #[tokio::test]
    async fn list_expectation_returns_page() {
        let mut mock = MockClient::<Shelf>::new();
        let pagination = Pagination::new(1, 10, None);
        mock.expect_list()
            .return_ok(Page::new(&pagination, 1, vec![Shelf { id: 9, stock: 0 }]));

        let page = mock.client().list(pagination).await.unwrap();
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.data[0].id, 9);
        mock.verify();
    }

    #[tokio::test]
    async fn timeout_bounds_a_silent_server() {
        let (client, mut receiver) = create_mock_client::<Shelf>(1);
        let client = client.with_timeout(Duration::from_millis(20));

        let call = tokio::spawn(async move { client.get(1).await });
        let (_id, _held_responder) = expect_get(&mut receiver).await.unwrap();

        let err = call.await.unwrap().unwrap_err();
        assert!(matches!(err, FrameworkError::DeadlineExceeded(_)));
    }

    #[tokio::test]
    async fn action_helper_exposes_payload() {
        let (client, mut receiver) = create_mock_client::<Shelf>(1);
        let call = tokio::spawn(async move { client.perform_action(3, ShelfAction::Take(2)).await });

        let (id, action, responder) = expect_action(&mut receiver).await.unwrap();
        assert_eq!(id, 3);
        assert!(matches!(action, ShelfAction::Take(2)));
        responder.send(Ok(8)).unwrap();
        assert_eq!(call.await.unwrap().unwrap(), 8);
    }
}
