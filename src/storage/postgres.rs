//! Postgres adapters for items, categories and orders.
//!
//! Row locks are `SELECT ... FOR UPDATE` inside a `sqlx` transaction; an order and its
//! lines are always written in the same transaction.

use crate::model::{
    Category, CategoryId, InventoryItem, ItemId, Order, OrderId, OrderItem, OrderStatus, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres};
use std::collections::HashMap;
use std::marker::PhantomData;
use stockroom_framework::{
    Pagination, Record, SortOption, StoreAdapter, StoreError, Transaction,
};
use tracing::{info, instrument};
use uuid::Uuid;

/// Creates the tables if they do not exist yet.
#[instrument(skip(pool))]
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS categories (
            id          UUID PRIMARY KEY,
            name        TEXT NOT NULL,
            description TEXT NOT NULL,
            created_at  TIMESTAMPTZ NOT NULL,
            updated_at  TIMESTAMPTZ NOT NULL
        )
        ",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS inventory_items (
            id             UUID PRIMARY KEY,
            name           TEXT NOT NULL,
            description    TEXT NOT NULL,
            category_id    UUID NOT NULL REFERENCES categories(id),
            price          DOUBLE PRECISION NOT NULL,
            stock_quantity DOUBLE PRECISION NOT NULL,
            unit           TEXT NOT NULL,
            created_at     TIMESTAMPTZ NOT NULL,
            updated_at     TIMESTAMPTZ NOT NULL
        )
        ",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS orders (
            id           UUID PRIMARY KEY,
            user_id      UUID NOT NULL,
            user_name    TEXT NOT NULL,
            total_amount DOUBLE PRECISION NOT NULL,
            status       TEXT NOT NULL,
            created_at   TIMESTAMPTZ NOT NULL,
            updated_at   TIMESTAMPTZ NOT NULL
        )
        ",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS order_items (
            order_id      UUID NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
            line_no       INTEGER NOT NULL,
            product_id    UUID NOT NULL,
            product_name  TEXT NOT NULL,
            product_price DOUBLE PRECISION NOT NULL,
            quantity      BIGINT NOT NULL,
            created_at    TIMESTAMPTZ NOT NULL,
            updated_at    TIMESTAMPTZ NOT NULL,
            PRIMARY KEY (order_id, line_no)
        )
        ",
    )
    .execute(pool)
    .await?;

    info!("Schema ready");
    Ok(())
}

/// Foreign key and unique violations are the caller's fault; everything else is ours.
fn store_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if matches!(db.code().as_deref(), Some("23503") | Some("23505")) {
            return StoreError::ConstraintViolation(db.message().to_string());
        }
    }
    StoreError::internal(err)
}

fn page_bounds(pagination: &Pagination) -> (i64, i64) {
    let limit = i64::try_from(pagination.limit()).unwrap_or(i64::MAX);
    let offset = i64::try_from(pagination.offset()).unwrap_or(i64::MAX);
    (limit, offset)
}

/// A `sqlx` transaction typed by the record it locks.
pub struct PgTx<T> {
    tx: sqlx::Transaction<'static, Postgres>,
    _record: PhantomData<fn() -> T>,
}

impl<T> PgTx<T> {
    async fn begin(pool: &PgPool) -> Result<Self, StoreError> {
        Ok(Self {
            tx: pool.begin().await.map_err(store_error)?,
            _record: PhantomData,
        })
    }

    async fn finish(self) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(store_error)
    }

    async fn abandon(self) -> Result<(), StoreError> {
        self.tx.rollback().await.map_err(store_error)
    }
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

const ITEM_COLUMNS: &str = "id, name, description, category_id, price, stock_quantity, unit, \
                            created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: Uuid,
    name: String,
    description: String,
    category_id: Uuid,
    price: f64,
    stock_quantity: f64,
    unit: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ItemRow> for InventoryItem {
    fn from(row: ItemRow) -> Self {
        Self {
            id: ItemId(row.id),
            name: row.name,
            description: row.description,
            category_id: CategoryId(row.category_id),
            price: row.price,
            quantity: row.stock_quantity,
            unit: row.unit,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn item_order(sort: Option<SortOption>) -> &'static str {
    match sort {
        Some(SortOption::Price) => "price ASC",
        Some(SortOption::Quantity) => "stock_quantity ASC",
        Some(SortOption::Name) => "name ASC",
        Some(SortOption::CreatedAt) => "created_at ASC",
        Some(SortOption::UpdatedAt) => "updated_at ASC",
        Some(SortOption::Id) | None => "id ASC",
    }
}

#[derive(Debug, Clone)]
pub struct PgItems {
    pool: PgPool,
}

impl PgItems {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Transaction<InventoryItem> for PgTx<InventoryItem> {
    async fn fetch_for_update(&mut self, id: &ItemId) -> Result<InventoryItem, StoreError> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, ItemRow>(&sql)
            .bind(id.0)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_error)?
            .map(InventoryItem::from)
            .ok_or_else(|| InventoryItem::not_found(id))
    }

    async fn persist(&mut self, item: &InventoryItem) -> Result<(), StoreError> {
        sqlx::query(
            r"
            UPDATE inventory_items
            SET name = $2, description = $3, category_id = $4, price = $5,
                stock_quantity = $6, unit = $7, updated_at = $8
            WHERE id = $1
            ",
        )
        .bind(item.id.0)
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.category_id.0)
        .bind(item.price)
        .bind(item.quantity)
        .bind(&item.unit)
        .bind(item.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.finish().await
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.abandon().await
    }
}

#[async_trait]
impl StoreAdapter<InventoryItem> for PgItems {
    type Tx = PgTx<InventoryItem>;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        PgTx::begin(&self.pool).await
    }

    async fn fetch(&self, id: &ItemId) -> Result<InventoryItem, StoreError> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = $1");
        sqlx::query_as::<_, ItemRow>(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?
            .map(InventoryItem::from)
            .ok_or_else(|| InventoryItem::not_found(id))
    }

    async fn insert(&self, item: &InventoryItem) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO inventory_items
                (id, name, description, category_id, price, stock_quantity, unit, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(item.id.0)
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.category_id.0)
        .bind(item.price)
        .bind(item.quantity)
        .bind(&item.unit)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn delete(&self, id: &ItemId) -> Result<(), StoreError> {
        let done = sqlx::query("DELETE FROM inventory_items WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        if done.rows_affected() == 0 {
            return Err(InventoryItem::not_found(id));
        }
        Ok(())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        count(&self.pool, "inventory_items").await
    }

    async fn list(&self, pagination: &Pagination) -> Result<Vec<InventoryItem>, StoreError> {
        let (limit, offset) = page_bounds(pagination);
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items ORDER BY {} LIMIT $1 OFFSET $2",
            item_order(pagination.sort_by)
        );
        let rows = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(InventoryItem::from).collect())
    }
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId(row.id),
            name: row.name,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn category_order(sort: Option<SortOption>) -> &'static str {
    match sort {
        Some(SortOption::Name) => "name ASC",
        Some(SortOption::CreatedAt) => "created_at ASC",
        Some(SortOption::UpdatedAt) => "updated_at ASC",
        _ => "id ASC",
    }
}

#[derive(Debug, Clone)]
pub struct PgCategories {
    pool: PgPool,
}

impl PgCategories {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Transaction<Category> for PgTx<Category> {
    async fn fetch_for_update(&mut self, id: &CategoryId) -> Result<Category, StoreError> {
        sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, description, created_at, updated_at FROM categories \
             WHERE id = $1 FOR UPDATE",
        )
        .bind(id.0)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(store_error)?
        .map(Category::from)
        .ok_or_else(|| Category::not_found(id))
    }

    async fn persist(&mut self, category: &Category) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE categories SET name = $2, description = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(category.id.0)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.finish().await
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.abandon().await
    }
}

#[async_trait]
impl StoreAdapter<Category> for PgCategories {
    type Tx = PgTx<Category>;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        PgTx::begin(&self.pool).await
    }

    async fn fetch(&self, id: &CategoryId) -> Result<Category, StoreError> {
        sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, description, created_at, updated_at FROM categories WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?
        .map(Category::from)
        .ok_or_else(|| Category::not_found(id))
    }

    async fn insert(&self, category: &Category) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO categories (id, name, description, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(category.id.0)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn delete(&self, id: &CategoryId) -> Result<(), StoreError> {
        let done = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        if done.rows_affected() == 0 {
            return Err(Category::not_found(id));
        }
        Ok(())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        count(&self.pool, "categories").await
    }

    async fn list(&self, pagination: &Pagination) -> Result<Vec<Category>, StoreError> {
        let (limit, offset) = page_bounds(pagination);
        let sql = format!(
            "SELECT id, name, description, created_at, updated_at FROM categories \
             ORDER BY {} LIMIT $1 OFFSET $2",
            category_order(pagination.sort_by)
        );
        let rows = sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(Category::from).collect())
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

const ORDER_COLUMNS: &str = "id, user_id, user_name, total_amount, status, created_at, updated_at";
const LINE_COLUMNS: &str =
    "order_id, product_id, product_name, product_price, quantity, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    user_name: String,
    total_amount: f64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct LineRow {
    order_id: Uuid,
    product_id: Uuid,
    product_name: String,
    product_price: f64,
    quantity: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<LineRow> for OrderItem {
    fn from(row: LineRow) -> Self {
        Self {
            product_id: ItemId(row.product_id),
            product_name: row.product_name,
            product_price: row.product_price,
            quantity: row.quantity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, StoreError> {
        let status: OrderStatus = self.status.parse().map_err(StoreError::internal)?;
        Ok(Order {
            id: OrderId(self.id),
            user_id: UserId(self.user_id),
            user_name: self.user_name,
            total_amount: self.total_amount,
            status,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn order_order(sort: Option<SortOption>) -> &'static str {
    match sort {
        Some(SortOption::Id) => "id ASC",
        Some(SortOption::Price) => "total_amount ASC",
        Some(SortOption::Name) => "user_name ASC",
        Some(SortOption::UpdatedAt) => "updated_at ASC",
        Some(SortOption::CreatedAt) => "created_at ASC",
        Some(SortOption::Quantity) | None => "created_at DESC",
    }
}

async fn load_lines(conn: &mut PgConnection, id: &OrderId) -> Result<Vec<OrderItem>, StoreError> {
    let sql = format!("SELECT {LINE_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY line_no");
    let rows = sqlx::query_as::<_, LineRow>(&sql)
        .bind(id.0)
        .fetch_all(conn)
        .await
        .map_err(store_error)?;
    Ok(rows.into_iter().map(OrderItem::from).collect())
}

async fn write_lines(conn: &mut PgConnection, order: &Order) -> Result<(), StoreError> {
    for (line_no, item) in order.items.iter().enumerate() {
        sqlx::query(
            r"
            INSERT INTO order_items
                (order_id, line_no, product_id, product_name, product_price, quantity, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(order.id.0)
        .bind(i32::try_from(line_no).map_err(StoreError::internal)?)
        .bind(item.product_id.0)
        .bind(&item.product_name)
        .bind(item.product_price)
        .bind(item.quantity)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&mut *conn)
        .await
        .map_err(store_error)?;
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct PgOrders {
    pool: PgPool,
}

impl PgOrders {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Transaction<Order> for PgTx<Order> {
    async fn fetch_for_update(&mut self, id: &OrderId) -> Result<Order, StoreError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id.0)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_error)?
            .ok_or_else(|| Order::not_found(id))?;
        let items = load_lines(&mut self.tx, id).await?;
        row.into_order(items)
    }

    /// Rewrites the header and replaces every line.
    async fn persist(&mut self, order: &Order) -> Result<(), StoreError> {
        sqlx::query(
            r"
            UPDATE orders
            SET user_name = $2, total_amount = $3, status = $4, updated_at = $5
            WHERE id = $1
            ",
        )
        .bind(order.id.0)
        .bind(&order.user_name)
        .bind(order.total_amount)
        .bind(order.status.as_str())
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(store_error)?;

        sqlx::query("DELETE FROM order_items WHERE order_id = $1")
            .bind(order.id.0)
            .execute(&mut *self.tx)
            .await
            .map_err(store_error)?;
        write_lines(&mut self.tx, order).await
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.finish().await
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.abandon().await
    }
}

#[async_trait]
impl StoreAdapter<Order> for PgOrders {
    type Tx = PgTx<Order>;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        PgTx::begin(&self.pool).await
    }

    async fn fetch(&self, id: &OrderId) -> Result<Order, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(store_error)?;
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id.0)
            .fetch_optional(&mut *conn)
            .await
            .map_err(store_error)?
            .ok_or_else(|| Order::not_found(id))?;
        let items = load_lines(&mut conn, id).await?;
        row.into_order(items)
    }

    async fn insert(&self, order: &Order) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;
        sqlx::query(
            r"
            INSERT INTO orders (id, user_id, user_name, total_amount, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(order.id.0)
        .bind(order.user_id.0)
        .bind(&order.user_name)
        .bind(order.total_amount)
        .bind(order.status.as_str())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(store_error)?;
        write_lines(&mut tx, order).await?;
        tx.commit().await.map_err(store_error)
    }

    async fn delete(&self, id: &OrderId) -> Result<(), StoreError> {
        let done = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        if done.rows_affected() == 0 {
            return Err(Order::not_found(id));
        }
        Ok(())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        count(&self.pool, "orders").await
    }

    async fn list(&self, pagination: &Pagination) -> Result<Vec<Order>, StoreError> {
        let (limit, offset) = page_bounds(pagination);
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY {} LIMIT $1 OFFSET $2",
            order_order(pagination.sort_by)
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;

        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let sql = format!(
            "SELECT {LINE_COLUMNS} FROM order_items WHERE order_id = ANY($1) \
             ORDER BY order_id, line_no"
        );
        let lines = sqlx::query_as::<_, LineRow>(&sql)
            .bind(ids.as_slice())
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;

        let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for line in lines {
            by_order.entry(line.order_id).or_default().push(line.into());
        }
        rows.into_iter()
            .map(|row| {
                let items = by_order.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect()
    }
}

async fn count(pool: &PgPool, table: &'static str) -> Result<u64, StoreError> {
    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .map_err(store_error)?;
    Ok(u64::try_from(total).unwrap_or_default())
}
