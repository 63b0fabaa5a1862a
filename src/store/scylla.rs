use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use scylla::client::session::Session;
use scylla::value::{CqlValue, Row};
use uuid::Uuid;

use crate::domain::order::analytics::{self, OrderMetrics, TOP_PRODUCTS_LIMIT};
use crate::domain::order::{Order, OrderFilters, OrderRepository, RepositoryError};
use crate::metrics::Metrics;
use crate::utils::{retry_on_transient, RetryConfig};

use super::select_page;

// ============================================================================
// ScyllaDB Order Repository
// ============================================================================
//
// Tables:
// - orders:          one row per order, keyed by id, full document as JSON
// - orders_by_code:  tracking code -> order id
//
// Create claims the code with a lightweight transaction on `orders_by_code`
// before writing the `orders` row. A claim already held by the same order id
// is a retried create and counts as success. The tracking code never changes
// after creation, so updates only rewrite the `orders` row.
//
// Every call runs under a deadline and is retried on transient failures.
//
// ============================================================================

const CREATE_ORDERS_TABLE: &str = "CREATE TABLE IF NOT EXISTS orders (
        id uuid PRIMARY KEY,
        code text,
        status text,
        sale_type text,
        total bigint,
        payload text,
        created_at timestamp,
        updated_at timestamp
    )";

const CREATE_ORDERS_BY_CODE_TABLE: &str = "CREATE TABLE IF NOT EXISTS orders_by_code (
        code text PRIMARY KEY,
        order_id uuid
    )";

const INSERT_ORDER: &str = "INSERT INTO orders (
        id, code, status, sale_type, total, payload, created_at, updated_at
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)";

const CLAIM_ORDER_CODE: &str =
    "INSERT INTO orders_by_code (code, order_id) VALUES (?, ?) IF NOT EXISTS";

const SCAN_ORDERS: &str = "SELECT payload FROM orders";

/// Outcome of the conditional insert on `orders_by_code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodeClaim {
    Applied,
    HeldBy(Uuid),
}

impl CodeClaim {
    /// Reads `[applied]` and, when the insert lost, the `order_id` of the
    /// existing row.
    fn from_row(names: &[String], row: Row) -> Result<Self, RepositoryError> {
        let mut applied = None;
        let mut owner = None;

        for (name, value) in names.iter().zip(row.columns) {
            match (name.as_str(), value) {
                ("[applied]", Some(CqlValue::Boolean(flag))) => applied = Some(flag),
                ("order_id", Some(CqlValue::Uuid(id))) => owner = Some(id),
                _ => {}
            }
        }

        match (applied, owner) {
            (Some(true), _) => Ok(CodeClaim::Applied),
            (Some(false), Some(id)) => Ok(CodeClaim::HeldBy(id)),
            (Some(false), None) => Err(RepositoryError::decode("lost code claim without an owner")),
            (None, _) => Err(RepositoryError::decode("missing [applied] column")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScyllaSettings {
    /// Deadline applied to each individual database call
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for ScyllaSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            retry: RetryConfig::default(),
        }
    }
}

pub struct ScyllaOrderRepository {
    session: Arc<Session>,
    settings: ScyllaSettings,
    metrics: Arc<Metrics>,
}

impl ScyllaOrderRepository {
    pub fn new(session: Arc<Session>, settings: ScyllaSettings, metrics: Arc<Metrics>) -> Self {
        Self {
            session,
            settings,
            metrics,
        }
    }

    /// Creates the tables if they do not exist. Expects the session to have
    /// a keyspace selected.
    pub async fn init_schema(&self) -> Result<(), RepositoryError> {
        for statement in [CREATE_ORDERS_TABLE, CREATE_ORDERS_BY_CODE_TABLE] {
            self.session
                .query_unpaged(statement, ())
                .await
                .map_err(RepositoryError::unavailable)?;
        }
        tracing::info!("Order tables ready");
        Ok(())
    }

    /// Runs `call` under the configured deadline, retrying transient errors.
    async fn run<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T, RepositoryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RepositoryError>>,
    {
        let timeout = self.settings.timeout;
        let mut attempts = 0;

        let result = retry_on_transient(&self.settings.retry, |attempt| {
            attempts = attempt;
            if attempt > 1 {
                self.metrics.record_retry_attempt(operation, attempt);
            }
            let fut = call();
            async move {
                match tokio::time::timeout(timeout, fut).await {
                    Ok(result) => result,
                    Err(_) => Err(RepositoryError::Timeout(operation)),
                }
            }
        })
        .await
        .into_result();

        if attempts > 1 {
            self.metrics.record_retry_outcome(operation, result.is_ok());
        }
        result
    }

    async fn select_order(&self, id: Uuid) -> Result<Option<Order>, RepositoryError> {
        let result = self
            .session
            .query_unpaged("SELECT payload FROM orders WHERE id = ?", (id,))
            .await
            .map_err(RepositoryError::unavailable)?;

        let rows_result = match result.into_rows_result() {
            Ok(rows) => rows,
            Err(_) => return Ok(None),
        };

        match rows_result
            .maybe_first_row::<(String,)>()
            .map_err(RepositoryError::decode)?
        {
            Some((payload,)) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    async fn select_code_owner(&self, code: &str) -> Result<Option<Uuid>, RepositoryError> {
        let result = self
            .session
            .query_unpaged("SELECT order_id FROM orders_by_code WHERE code = ?", (code,))
            .await
            .map_err(RepositoryError::unavailable)?;

        let rows_result = match result.into_rows_result() {
            Ok(rows) => rows,
            Err(_) => return Ok(None),
        };

        let owner = rows_result
            .maybe_first_row::<(Uuid,)>()
            .map_err(RepositoryError::decode)?
            .map(|(id,)| id);
        Ok(owner)
    }

    async fn claim_code(&self, order: &Order) -> Result<CodeClaim, RepositoryError> {
        let rows_result = self
            .session
            .query_unpaged(CLAIM_ORDER_CODE, (order.code.as_str(), order.id))
            .await
            .map_err(RepositoryError::unavailable)?
            .into_rows_result()
            .map_err(RepositoryError::decode)?;

        let names: Vec<String> = rows_result
            .column_specs()
            .iter()
            .map(|column| column.name().to_string())
            .collect();
        let row = rows_result
            .maybe_first_row::<Row>()
            .map_err(RepositoryError::decode)?
            .ok_or_else(|| RepositoryError::decode("empty conditional insert result"))?;

        CodeClaim::from_row(&names, row)
    }

    async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        match self.claim_code(order).await? {
            CodeClaim::Applied => {}
            CodeClaim::HeldBy(owner) if owner == order.id => {
                tracing::debug!(order_id = %order.id, code = %order.code, "Code already claimed by this order");
            }
            CodeClaim::HeldBy(_) => return Err(RepositoryError::DuplicateCode(order.code.clone())),
        }

        self.write_order(order).await
    }

    async fn overwrite(&self, order: &Order) -> Result<(), RepositoryError> {
        if self.select_order(order.id).await?.is_none() {
            return Err(RepositoryError::NotFound);
        }
        self.write_order(order).await
    }

    async fn write_order(&self, order: &Order) -> Result<(), RepositoryError> {
        let payload = serde_json::to_string(order)?;
        self.session
            .query_unpaged(
                INSERT_ORDER,
                (
                    order.id,
                    order.code.as_str(),
                    order.status.as_str(),
                    order.sale_type.as_str(),
                    order.total,
                    payload.as_str(),
                    order.created_at,
                    order.updated_at,
                ),
            )
            .await
            .map_err(RepositoryError::unavailable)?;

        Ok(())
    }

    /// Streams the orders table once, handing each matching order to `visit`.
    /// Non-matching rows are dropped as they are decoded.
    async fn scan<V>(&self, filters: &OrderFilters, mut visit: V) -> Result<u64, RepositoryError>
    where
        V: FnMut(Order),
    {
        let mut rows = self
            .session
            .query_iter(SCAN_ORDERS, ())
            .await
            .map_err(RepositoryError::unavailable)?
            .rows_stream::<(String,)>()
            .map_err(RepositoryError::decode)?;

        let mut scanned = 0u64;
        while let Some((payload,)) = rows.try_next().await.map_err(RepositoryError::unavailable)? {
            scanned += 1;
            if let Some(order) = decode_matching(&payload, filters)? {
                visit(order);
            }
        }

        tracing::debug!(scanned, "Scanned orders table");
        Ok(scanned)
    }

    async fn collect_matching(&self, filters: &OrderFilters) -> Result<Vec<Order>, RepositoryError> {
        let mut matching = Vec::new();
        self.scan(filters, |order| matching.push(order)).await?;
        Ok(matching)
    }

    async fn count_matching(&self, filters: &OrderFilters) -> Result<i64, RepositoryError> {
        let mut count = 0i64;
        self.scan(filters, |_| count += 1).await?;
        Ok(count)
    }
}

#[async_trait]
impl OrderRepository for ScyllaOrderRepository {
    async fn create(&self, order: &Order) -> Result<(), RepositoryError> {
        self.run("create", || self.insert(order)).await?;
        tracing::debug!(order_id = %order.id, code = %order.code, "Stored order");
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Order, RepositoryError> {
        self.run("find_by_id", || self.select_order(id))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_by_code(&self, code: &str) -> Result<Order, RepositoryError> {
        let id = self
            .run("find_by_code", || self.select_code_owner(code))
            .await?
            .ok_or(RepositoryError::NotFound)?;
        self.find_by_id(id).await
    }

    async fn update(&self, order: &Order) -> Result<(), RepositoryError> {
        self.run("update", || self.overwrite(order)).await
    }

    async fn find_all(&self, filters: &OrderFilters) -> Result<Vec<Order>, RepositoryError> {
        let matching = self.run("find_all", || self.collect_matching(filters)).await?;
        Ok(select_page(matching, filters))
    }

    async fn count(&self, filters: &OrderFilters) -> Result<i64, RepositoryError> {
        self.run("count", || self.count_matching(filters)).await
    }

    async fn find_page(&self, filters: &OrderFilters) -> Result<(Vec<Order>, i64), RepositoryError> {
        let matching = self.run("find_page", || self.collect_matching(filters)).await?;
        let total = matching.len() as i64;
        Ok((select_page(matching, filters), total))
    }

    async fn exists_by_code(&self, code: &str) -> Result<bool, RepositoryError> {
        let owner = self
            .run("exists_by_code", || self.select_code_owner(code))
            .await?;
        Ok(owner.is_some())
    }

    async fn get_metrics(&self, filters: &OrderFilters) -> Result<OrderMetrics, RepositoryError> {
        let matching = self
            .run("get_metrics", || self.collect_matching(filters))
            .await?;
        Ok(analytics::aggregate(&matching, TOP_PRODUCTS_LIMIT))
    }
}

fn decode_matching(payload: &str, filters: &OrderFilters) -> Result<Option<Order>, RepositoryError> {
    let order: Order = serde_json::from_str(payload)?;
    Ok(filters.matches(&order).then_some(order))
}

// ============================================================================
// Unit Tests
// ============================================================================
//
// Statements against a live cluster are exercised by running the service with
// STORAGE_BACKEND=scylla; the tests here cover what does not need a session.
//
// ============================================================================
