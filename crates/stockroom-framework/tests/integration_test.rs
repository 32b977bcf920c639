use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::Arc;
use stockroom_framework::{
    ActorClient, Code, MemoryStore, Mutation, Outcome, Page, Pagination, Record, Repository,
    Resource, ResourceActor, ResourceClient, ResourceHandler, SortOption, Status, StoreError,
    Table, ToStatus,
};

// --- Test Resource ---

#[derive(Clone, Debug, PartialEq)]
struct Counter {
    id: u32,
    label: String,
    value: i64,
}

#[derive(Debug)]
struct CounterCreate {
    id: u32,
    label: String,
}

#[derive(Debug)]
struct CounterUpdate {
    label: Option<String>,
}

#[derive(Debug)]
enum CounterAction {
    Add(i64),
    Explode,
}

impl Record for Counter {
    type Id = u32;
    const KIND: &'static str = "counter";

    fn id(&self) -> &u32 {
        &self.id
    }

    fn compare_by(&self, other: &Self, sort: Option<SortOption>) -> Ordering {
        match sort {
            Some(SortOption::Name) => self.label.cmp(&other.label),
            _ => self.id.cmp(&other.id),
        }
    }
}

impl Resource for Counter {
    type Create = CounterCreate;
    type Update = CounterUpdate;
    type Action = CounterAction;
    type ActionResult = i64;
}

#[derive(Debug, thiserror::Error)]
enum CounterError {
    #[error("would go negative")]
    Negative,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ToStatus for CounterError {
    fn to_status(&self) -> Status {
        match self {
            CounterError::Negative => Status::invalid_argument(self.to_string()),
            CounterError::Store(err) => err.to_status(),
        }
    }
}

type Counters = Table<MemoryStore<Counter>>;

struct CounterService {
    counters: Counters,
}

#[async_trait]
impl ResourceHandler<Counter> for CounterService {
    type Error = CounterError;

    async fn create(&self, params: CounterCreate) -> Result<Counter, CounterError> {
        let counter = Counter {
            id: params.id,
            label: params.label,
            value: 0,
        };
        self.counters.save(&counter).await?;
        Ok(counter)
    }

    async fn get(&self, id: &u32) -> Result<Counter, CounterError> {
        Ok(self.counters.get(id).await?)
    }

    async fn update(&self, id: &u32, update: CounterUpdate) -> Result<Counter, CounterError> {
        let outcome = self
            .counters
            .update_by_id(id, |current| {
                let mut next = current.clone();
                if let Some(label) = update.label {
                    next.label = label;
                }
                let changed = next != *current;
                Mutation::<Counter, CounterError>::changed_if(changed, next)
            })
            .await?;
        Ok(outcome.require_change()?)
    }

    async fn delete(&self, id: &u32) -> Result<Counter, CounterError> {
        let last = self.counters.get(id).await?;
        self.counters.delete_by_id(id).await?;
        Ok(last)
    }

    async fn list(&self, pagination: Pagination) -> Result<Page<Counter>, CounterError> {
        let total = self.counters.count().await?;
        let data = self.counters.list(&pagination).await?;
        Ok(Page::new(&pagination, total, data))
    }

    async fn handle_action(&self, id: &u32, action: CounterAction) -> Result<i64, CounterError> {
        match action {
            CounterAction::Add(delta) => {
                let outcome = self.counters.update_by_id(id, |c| add(c, delta)).await?;
                Ok(outcome.into_inner().value)
            }
            CounterAction::Explode => Err(StoreError::internal("disk on fire").into()),
        }
    }
}

fn add(current: &Counter, delta: i64) -> Mutation<Counter, CounterError> {
    if current.value + delta < 0 {
        return Mutation::Rejected(CounterError::Negative);
    }
    let mut next = current.clone();
    next.value += delta;
    Mutation::Changed(next)
}

fn counter(id: u32, label: &str, value: i64) -> Counter {
    Counter {
        id,
        label: label.to_string(),
        value,
    }
}

struct CounterClient {
    inner: ResourceClient<Counter>,
}

impl ActorClient<Counter> for CounterClient {
    fn inner(&self) -> &ResourceClient<Counter> {
        &self.inner
    }
}

fn start(store: &MemoryStore<Counter>) -> ResourceClient<Counter> {
    let (actor, client) = ResourceActor::new(16);
    let service = Arc::new(CounterService {
        counters: Table::new(store.clone()),
    });
    tokio::spawn(actor.run(service));
    client
}

// --- Update engine ---

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_mutations_lose_no_update() {
    let store = MemoryStore::with_records([counter(1, "hits", 0)]);
    let table = Arc::new(Table::new(store.clone()));

    let mut tasks = Vec::new();
    for _ in 0..25 {
        let table = Arc::clone(&table);
        tasks.push(tokio::spawn(async move {
            table
                .update_by_id::<_, CounterError>(&1, |c| add(c, 2))
                .await
                .unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(store.peek(&1).await.unwrap().value, 50);
    assert_eq!(store.stats().writes(), 25);
}

#[tokio::test]
async fn unchanged_mutation_issues_no_write() {
    let store = MemoryStore::with_records([counter(1, "hits", 3)]);
    let table = Table::new(store.clone());

    let outcome = table
        .update_by_id::<_, StoreError>(&1, |_| Mutation::Unchanged)
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Unchanged(counter(1, "hits", 3)));
    assert!(matches!(outcome.require_change(), Err(StoreError::NotUpdated)));
    assert_eq!(store.stats().writes(), 0);
}

#[tokio::test]
async fn rejected_mutation_rolls_back_and_releases_the_lock() {
    let store = MemoryStore::with_records([counter(1, "hits", 3)]);
    let table = Table::new(store.clone());

    let err = table.update_by_id(&1, |c| add(c, -5)).await.unwrap_err();
    assert!(matches!(err, CounterError::Negative));
    assert_eq!(store.peek(&1).await.unwrap().value, 3);

    // The row lock was released: a follow-up mutation goes through.
    let outcome = table.update_by_id(&1, |c| add(c, -3)).await.unwrap();
    assert_eq!(outcome.into_inner().value, 0);
}

#[tokio::test]
async fn missing_row_is_not_found_before_the_mutation_runs() {
    let table = Table::new(MemoryStore::<Counter>::new());
    let err = table
        .update_by_id::<_, CounterError>(&9, |_| panic!("mutation must not run"))
        .await
        .unwrap_err();
    assert!(matches!(err, CounterError::Store(StoreError::NotFound { .. })));
}

// --- Actor round trip ---

#[tokio::test]
async fn test_framework_full_lifecycle() {
    let store = MemoryStore::new();
    let client = start(&store);

    // 1. Create
    let created = client
        .create(CounterCreate {
            id: 1,
            label: "hits".into(),
        })
        .await
        .unwrap();
    assert_eq!(created.value, 0);

    // 2. Action
    assert_eq!(client.perform_action(1, CounterAction::Add(4)).await.unwrap(), 4);
    let err = client
        .perform_action(1, CounterAction::Add(-10))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);

    // 3. Update, then the same update again
    let updated = client
        .update(
            1,
            CounterUpdate {
                label: Some("visits".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.label, "visits");
    let err = client
        .update(
            1,
            CounterUpdate {
                label: Some("visits".into()),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotUpdated);

    // 4. Delete via the wrapper trait
    let wrapper = CounterClient {
        inner: client.clone(),
    };
    let last = wrapper.delete(1).await.unwrap();
    assert_eq!(last.value, 4);
    assert!(wrapper.get(1).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn internal_errors_are_redacted_on_the_wire() {
    let store = MemoryStore::with_records([counter(1, "hits", 0)]);
    let client = start(&store);

    let err = client
        .perform_action(1, CounterAction::Explode)
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::Internal);
    assert!(!err.to_string().contains("disk on fire"));
}

#[tokio::test]
async fn list_pages_through_the_actor() {
    let store = MemoryStore::with_records([
        counter(1, "c", 0),
        counter(2, "a", 0),
        counter(3, "b", 0),
    ]);
    let wrapper = CounterClient {
        inner: start(&store),
    };

    let page = wrapper
        .list(Pagination::new(1, 2, Some(SortOption::Name)))
        .await
        .unwrap();
    assert_eq!(page.total_pages, 2);
    assert!(page.has_next_page);
    let labels: Vec<_> = page.data.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, ["a", "b"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_actions_through_the_actor_are_serialised_per_row() {
    let store = MemoryStore::with_records([counter(1, "hits", 0)]);
    let client = start(&store);

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            client.perform_action(1, CounterAction::Add(1)).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }
    assert_eq!(store.peek(&1).await.unwrap().value, 20);
}

#[tokio::test]
async fn dropped_actor_reports_closed() {
    let (actor, client) = ResourceActor::<Counter>::new(1);
    drop(actor);
    let err = client.get(1).await.unwrap_err();
    assert_eq!(err.code(), Code::Unavailable);
}
