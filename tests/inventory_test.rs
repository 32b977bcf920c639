use chrono::{TimeZone, Utc};
use std::sync::Arc;
use stockroom::clock::fixed_clock;
use stockroom::inventory::{InventoryError, InventoryService};
use stockroom::model::{
    Category, CategoryCreate, CategoryId, CategoryUpdate, InventoryItem, ItemCreate, ItemId,
    ItemUpdate,
};
use stockroom_framework::{
    Code, MemoryStore, Pagination, SortOption, StoreAdapter, StoreError, Table,
};

type Service = InventoryService<Table<MemoryStore<InventoryItem>>, Table<MemoryStore<Category>>>;

struct Fixture {
    service: Service,
    items: MemoryStore<InventoryItem>,
    category: CategoryId,
}

async fn fixture() -> Fixture {
    let items = MemoryStore::new();
    let categories = MemoryStore::new();
    let clock = fixed_clock(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
    let service = InventoryService::new(
        Table::new(items.clone()),
        Table::new(categories.clone()),
        clock,
    );
    let category = service
        .create_category(CategoryCreate {
            name: "Hardware".into(),
            description: "Fasteners".into(),
        })
        .await
        .unwrap();
    Fixture {
        service,
        items,
        category: category.id,
    }
}

fn bolts(category_id: CategoryId, quantity: f64) -> ItemCreate {
    ItemCreate {
        name: "Hex bolt".into(),
        description: "M8 x 40".into(),
        category_id,
        price: 0.35,
        quantity,
        unit: "pcs".into(),
    }
}

// --- Reservation ---

#[tokio::test]
async fn reserve_decrements_then_rejects_what_is_not_there() {
    let fx = fixture().await;
    let item = fx.service.create_item(bolts(fx.category, 10.0)).await.unwrap();

    let after = fx.service.reserve(item.id, 7).await.unwrap();
    assert_eq!(after.quantity, 3.0);

    let err = fx.service.reserve(item.id, 5).await.unwrap_err();
    assert!(matches!(
        err,
        InventoryError::InsufficientQuantity {
            requested: 5,
            available
        } if available == 3.0
    ));
    assert_eq!(err.code(), Code::InsufficientQuantity);
    assert_eq!(fx.items.peek(&item.id).await.unwrap().quantity, 3.0);
}

#[tokio::test]
async fn reserve_can_take_the_last_unit() {
    let fx = fixture().await;
    let item = fx.service.create_item(bolts(fx.category, 3.0)).await.unwrap();

    let after = fx.service.reserve(item.id, 3).await.unwrap();
    assert_eq!(after.quantity, 0.0);
}

#[tokio::test]
async fn reserve_rejects_negative_quantity_without_writing() {
    let fx = fixture().await;
    let item = fx.service.create_item(bolts(fx.category, 3.0)).await.unwrap();
    let writes = fx.items.stats().writes();

    let err = fx.service.reserve(item.id, -1).await.unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
    assert_eq!(fx.items.stats().writes(), writes);
}

#[tokio::test]
async fn reserve_on_missing_item_is_not_found() {
    let fx = fixture().await;
    let id = ItemId::new();
    let err = fx.service.reserve(id, 1).await.unwrap_err();
    assert!(matches!(err, InventoryError::ItemNotFound(missing) if missing == id));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reservations_never_oversell() {
    let fx = fixture().await;
    let item = fx.service.create_item(bolts(fx.category, 10.0)).await.unwrap();
    let service = Arc::new(fx.service);

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let service = Arc::clone(&service);
        tasks.push(tokio::spawn(async move { service.reserve(item.id, 3).await }));
    }

    let mut granted = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => granted += 1,
            Err(err) => assert_eq!(err.code(), Code::InsufficientQuantity),
        }
    }

    // 10 units cover three reservations of 3 and no more.
    assert_eq!(granted, 3);
    assert_eq!(fx.items.peek(&item.id).await.unwrap().quantity, 1.0);
}

// --- Item CRUD ---

#[tokio::test]
async fn create_item_validates_input() {
    let fx = fixture().await;

    let err = fx
        .service
        .create_item(bolts(fx.category, -1.0))
        .await
        .unwrap_err();
    assert!(matches!(err, InventoryError::InvalidQuantity(_)));

    let mut params = bolts(fx.category, 1.0);
    params.price = -0.5;
    let err = fx.service.create_item(params).await.unwrap_err();
    assert!(matches!(err, InventoryError::InvalidPrice(_)));

    let mut params = bolts(fx.category, 1.0);
    params.name = "  ".into();
    let err = fx.service.create_item(params).await.unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);

    assert_eq!(fx.items.stats().writes(), 0);
}

#[tokio::test]
async fn create_item_rejects_non_finite_amounts() {
    let fx = fixture().await;

    for quantity in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let err = fx
            .service
            .create_item(bolts(fx.category, quantity))
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::InvalidQuantity(_)));
    }
    for price in [f64::NAN, f64::INFINITY] {
        let mut params = bolts(fx.category, 1.0);
        params.price = price;
        let err = fx.service.create_item(params).await.unwrap_err();
        assert!(matches!(err, InventoryError::InvalidPrice(_)));
    }

    assert_eq!(fx.items.stats().writes(), 0);
}

#[tokio::test]
async fn update_item_rejects_non_finite_amounts() {
    let fx = fixture().await;
    let item = fx.service.create_item(bolts(fx.category, 4.0)).await.unwrap();

    let err = fx
        .service
        .update_item(
            item.id,
            ItemUpdate {
                quantity: Some(f64::NAN),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, InventoryError::InvalidQuantity(_)));

    let err = fx
        .service
        .update_item(
            item.id,
            ItemUpdate {
                price: Some(f64::INFINITY),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, InventoryError::InvalidPrice(_)));

    assert_eq!(fx.items.peek(&item.id).await.unwrap(), item);
}

#[tokio::test]
async fn reserve_refuses_a_row_with_unreadable_stock() {
    let fx = fixture().await;
    let mut item = fx.service.create_item(bolts(fx.category, 4.0)).await.unwrap();
    // Written past the service, as a bad import would.
    fx.items.delete(&item.id).await.unwrap();
    item.quantity = f64::NAN;
    fx.items.insert(&item).await.unwrap();

    let err = fx.service.reserve(item.id, 1_000_000).await.unwrap_err();
    assert_eq!(err.code(), Code::InsufficientQuantity);
    assert!(fx.items.peek(&item.id).await.unwrap().quantity.is_nan());
}

#[tokio::test]
async fn create_item_requires_an_existing_category() {
    let fx = fixture().await;
    let unknown = CategoryId::new();
    let err = fx.service.create_item(bolts(unknown, 1.0)).await.unwrap_err();
    assert!(matches!(err, InventoryError::UnknownCategory(id) if id == unknown));
    assert_eq!(err.code(), Code::ConstraintViolation);
}

#[tokio::test]
async fn update_item_applies_changes_and_reports_no_op() {
    let fx = fixture().await;
    let item = fx.service.create_item(bolts(fx.category, 4.0)).await.unwrap();

    let updated = fx
        .service
        .update_item(
            item.id,
            ItemUpdate {
                price: Some(0.40),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.price, 0.40);
    assert_eq!(updated.quantity, 4.0);

    let writes = fx.items.stats().writes();
    let err = fx
        .service
        .update_item(
            item.id,
            ItemUpdate {
                price: Some(0.40),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, InventoryError::NotUpdated));
    assert_eq!(err.code(), Code::NotUpdated);
    assert_eq!(fx.items.stats().writes(), writes);
}

#[tokio::test]
async fn update_item_rejects_bad_input() {
    let fx = fixture().await;
    let item = fx.service.create_item(bolts(fx.category, 4.0)).await.unwrap();

    let err = fx
        .service
        .update_item(item.id, ItemUpdate::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);

    let err = fx
        .service
        .update_item(
            item.id,
            ItemUpdate {
                quantity: Some(-2.0),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, InventoryError::InvalidQuantity(_)));

    let missing = CategoryId::new();
    let err = fx
        .service
        .update_item(
            item.id,
            ItemUpdate {
                category_id: Some(missing),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, InventoryError::CategoryNotFound(id) if id == missing));

    assert_eq!(fx.items.peek(&item.id).await.unwrap(), item);
}

#[tokio::test]
async fn delete_item_returns_the_last_state() {
    let fx = fixture().await;
    let item = fx.service.create_item(bolts(fx.category, 4.0)).await.unwrap();

    let deleted = fx.service.delete_item(item.id).await.unwrap();
    assert_eq!(deleted, item);
    assert!(matches!(
        fx.service.get_item(item.id).await,
        Err(InventoryError::ItemNotFound(_))
    ));
    assert!(matches!(
        fx.service.delete_item(item.id).await,
        Err(InventoryError::ItemNotFound(_))
    ));
}

#[tokio::test]
async fn list_items_sorts_and_pages() {
    let fx = fixture().await;
    for (name, price) in [("washer", 0.05), ("bolt", 0.35), ("nut", 0.10)] {
        let mut params = bolts(fx.category, 1.0);
        params.name = name.into();
        params.price = price;
        fx.service.create_item(params).await.unwrap();
    }

    let page = fx
        .service
        .list_items(Pagination::new(1, 2, Some(SortOption::Price)))
        .await
        .unwrap();
    let names: Vec<_> = page.data.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, ["washer", "nut"]);
    assert!(page.has_next_page);
    assert_eq!(page.total_pages, 2);

    let page = fx
        .service
        .list_items(Pagination::new(2, 2, Some(SortOption::Price)))
        .await
        .unwrap();
    assert_eq!(page.data.len(), 1);
    assert!(!page.has_next_page);
}

// --- Categories ---

#[tokio::test]
async fn category_lifecycle() {
    let fx = fixture().await;

    let err = fx
        .service
        .create_category(CategoryCreate {
            name: "".into(),
            description: "x".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);

    let updated = fx
        .service
        .update_category(
            fx.category,
            CategoryUpdate {
                name: Some("Tools".into()),
                description: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Tools");

    let err = fx
        .service
        .update_category(
            fx.category,
            CategoryUpdate {
                name: Some("Tools".into()),
                description: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, InventoryError::NotUpdated));

    let page = fx.service.list_categories(Pagination::default()).await.unwrap();
    assert_eq!(page.data.len(), 1);

    fx.service.delete_category(fx.category).await.unwrap();
    let err = fx.service.get_category(fx.category).await.unwrap_err();
    assert!(matches!(err, InventoryError::CategoryNotFound(_)));
}

#[test]
fn store_failures_keep_their_code() {
    let err = InventoryError::from(StoreError::ConstraintViolation("dup".into()));
    assert_eq!(err.code(), Code::ConstraintViolation);
    let err = InventoryError::from(StoreError::NotUpdated);
    assert!(matches!(err, InventoryError::NotUpdated));
}
