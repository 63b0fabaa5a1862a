use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::metrics::Metrics;

use super::aggregate::Order;
use super::analytics::OrderMetrics;
use super::commands::{CreateOrder, ModifyOrder, PartialUpdate};
use super::errors::{ErrorKind, OrderError};
use super::repository::{OrderFilters, OrderRepository};
use super::value_objects::OrderStatus;

// ============================================================================
// Order Service
// ============================================================================
//
// Orchestrates: Command → Order → Validation → Repository
//
// Every rule is checked in memory before the single write that ends each
// mutating operation, so dropping the future early leaves storage untouched.
//
// ============================================================================

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// How many times a colliding tracking code is regenerated on create
    pub code_regenerations: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self { code_regenerations: 1 }
    }
}

/// One page of a filtered listing plus the unpaginated match count.
#[derive(Debug, Clone)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

pub struct OrderService {
    repository: Arc<dyn OrderRepository>,
    metrics: Arc<Metrics>,
    config: ServiceConfig,
}

impl OrderService {
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        metrics: Arc<Metrics>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            repository,
            metrics,
            config,
        }
    }

    pub async fn create(&self, command: CreateOrder) -> Result<Order, OrderError> {
        let started = Instant::now();
        let result = self.create_order(command).await;
        self.finish("create", started, result)
    }

    pub async fn partial_update(
        &self,
        code: &str,
        update: PartialUpdate,
    ) -> Result<Order, OrderError> {
        let started = Instant::now();
        let result = self.apply_partial_update(code, update).await;
        self.finish("partial_update", started, result)
    }

    pub async fn modify(&self, code: &str, modify: ModifyOrder) -> Result<Order, OrderError> {
        let started = Instant::now();
        let result = self.apply_modification(code, modify).await;
        self.finish("modify", started, result)
    }

    pub async fn get_by_code(&self, code: &str) -> Result<Order, OrderError> {
        let started = Instant::now();
        let result = self.load_by_code(code).await;
        self.finish("get_by_code", started, result)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Order, OrderError> {
        let started = Instant::now();
        let result = self
            .repository
            .find_by_id(id)
            .await
            .map_err(|e| OrderError::persistence("find order", e));
        self.finish("get_by_id", started, result)
    }

    pub async fn get_all(&self, filters: OrderFilters) -> Result<OrderPage, OrderError> {
        let started = Instant::now();
        let result = self.list(filters).await;
        self.finish("get_all", started, result)
    }

    pub async fn get_metrics(&self, filters: OrderFilters) -> Result<OrderMetrics, OrderError> {
        let started = Instant::now();
        let result = self
            .repository
            .get_metrics(&filters)
            .await
            .map_err(|e| OrderError::persistence("get metrics", e));
        self.finish("get_metrics", started, result)
    }

    // ------------------------------------------------------------------------
    // Operation bodies
    // ------------------------------------------------------------------------

    async fn create_order(&self, command: CreateOrder) -> Result<Order, OrderError> {
        let mut order = Order::new(command.sale_type, command.products)?;
        order.note = command.note;
        order.customer = command.customer;
        order.shipping_address = command.shipping_address;
        order.table_number = command.table_number;
        order.payment_receipt_url = command.payment_receipt_url;
        order.payment_account_id = command.payment_account_id;

        order.validate()?;

        for _ in 0..self.config.code_regenerations {
            let taken = self
                .repository
                .exists_by_code(&order.code)
                .await
                .map_err(|e| OrderError::persistence("check code existence", e))?;
            if !taken {
                break;
            }
            tracing::debug!(code = %order.code, "Order code collision, regenerating");
            order.regenerate_code();
        }

        self.repository
            .create(&order)
            .await
            .map_err(|e| OrderError::persistence("create order", e))?;

        self.metrics.record_order_created(order.sale_type.as_str());
        tracing::info!(
            order_id = %order.id,
            code = %order.code,
            sale_type = %order.sale_type,
            total = order.total,
            "Order created"
        );

        Ok(order)
    }

    async fn apply_partial_update(
        &self,
        code: &str,
        update: PartialUpdate,
    ) -> Result<Order, OrderError> {
        let mut order = self.load_by_code(code).await?;
        let previous = order.status;

        if let Some(next) = update.status {
            order.update_status(next)?;
        }
        update.note.apply_to(&mut order.note);
        update.payment_receipt_url.apply_to(&mut order.payment_receipt_url);
        update.payment_account_id.apply_to(&mut order.payment_account_id);
        order.touch();

        self.save(&order).await?;
        self.record_transition(previous, order.status);

        tracing::info!(
            order_id = %order.id,
            code = %order.code,
            status = %order.status,
            "Order partially updated"
        );

        Ok(order)
    }

    async fn apply_modification(&self, code: &str, modify: ModifyOrder) -> Result<Order, OrderError> {
        let mut order = self.load_by_code(code).await?;
        let previous = order.status;

        if !order.can_be_modified() {
            return Err(OrderError::OrderCannotBeModified(order.status));
        }

        if let Some(products) = modify.products.filter(|p| !p.is_empty()) {
            order.replace_products(products)?;
        }
        if let Some(address) = modify.shipping_address {
            order.shipping_address = Some(address);
        }
        if let Some(customer) = modify.customer {
            order.customer = Some(customer);
        }
        if let Some(note) = modify.note {
            order.note = Some(note);
        }

        order.validate()?;
        order.touch();

        self.save(&order).await?;
        self.record_transition(previous, order.status);

        tracing::info!(
            order_id = %order.id,
            code = %order.code,
            status = %order.status,
            total = order.total,
            "Order modified"
        );

        Ok(order)
    }

    async fn list(&self, mut filters: OrderFilters) -> Result<OrderPage, OrderError> {
        normalize_pagination(&mut filters);

        let (orders, total) = self
            .repository
            .find_page(&filters)
            .await
            .map_err(|e| OrderError::persistence("get orders", e))?;

        Ok(OrderPage {
            orders,
            total,
            limit: filters.limit,
            offset: filters.offset,
        })
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    async fn load_by_code(&self, code: &str) -> Result<Order, OrderError> {
        if code.is_empty() {
            return Err(OrderError::InvalidOrderCode);
        }
        self.repository
            .find_by_code(code)
            .await
            .map_err(|e| OrderError::persistence("find order", e))
    }

    async fn save(&self, order: &Order) -> Result<(), OrderError> {
        self.repository
            .update(order)
            .await
            .map_err(|e| OrderError::persistence("update order", e))
    }

    fn record_transition(&self, from: OrderStatus, to: OrderStatus) {
        if from != to {
            self.metrics.record_status_transition(from.as_str(), to.as_str());
        }
    }

    fn finish<T>(
        &self,
        operation: &'static str,
        started: Instant,
        result: Result<T, OrderError>,
    ) -> Result<T, OrderError> {
        let elapsed = started.elapsed().as_secs_f64();
        match &result {
            Ok(_) => self.metrics.record_operation(operation, elapsed, None),
            Err(err) => {
                let kind = err.kind();
                if kind == ErrorKind::Internal {
                    tracing::error!(operation, error = %err, "Order operation failed");
                } else {
                    tracing::warn!(operation, error_code = err.code(), error = %err, "Order operation rejected");
                }
                self.metrics.record_operation(operation, elapsed, Some(kind.as_str()));
            }
        }
        result
    }
}

fn normalize_pagination(filters: &mut OrderFilters) {
    if filters.limit <= 0 {
        filters.limit = DEFAULT_PAGE_SIZE;
    }
    if filters.limit > MAX_PAGE_SIZE {
        filters.limit = MAX_PAGE_SIZE;
    }
    if filters.offset < 0 {
        filters.offset = 0;
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::aggregate::tests::{customer, product};
    use crate::domain::order::repository::RepositoryError;
    use crate::domain::order::value_objects::{OrderProduct, Patch, SaleType};
    use crate::store::InMemoryOrderRepository;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn service_with(repository: Arc<dyn OrderRepository>) -> (OrderService, Arc<Metrics>) {
        let metrics = Arc::new(Metrics::new().unwrap());
        let service = OrderService::new(repository, metrics.clone(), ServiceConfig::default());
        (service, metrics)
    }

    fn service() -> (OrderService, Arc<InMemoryOrderRepository>, Arc<Metrics>) {
        let repository = Arc::new(InMemoryOrderRepository::new());
        let (service, metrics) = service_with(repository.clone());
        (service, repository, metrics)
    }

    fn create_delivery() -> CreateOrder {
        CreateOrder {
            sale_type: SaleType::Delivery,
            products: vec![product("burger", 10_000, 2), product("soda", 19_900, 1)],
            note: Some("extra napkins".to_string()),
            customer: Some(customer()),
            shipping_address: Some("Calle 10 # 20-30".to_string()),
            table_number: None,
            payment_receipt_url: None,
            payment_account_id: None,
        }
    }

    fn create_on_site() -> CreateOrder {
        CreateOrder {
            sale_type: SaleType::OnSite,
            products: vec![product("coffee", 4_500, 2)],
            note: None,
            customer: None,
            shipping_address: None,
            table_number: Some(4),
            payment_receipt_url: None,
            payment_account_id: None,
        }
    }

    fn status_update(status: OrderStatus) -> PartialUpdate {
        PartialUpdate {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Reports the first `collisions` codes it is asked about as taken.
    struct CollidingRepository {
        inner: InMemoryOrderRepository,
        collisions: u32,
        checked: AtomicU32,
    }

    #[async_trait]
    impl OrderRepository for CollidingRepository {
        async fn create(&self, order: &Order) -> Result<(), RepositoryError> {
            self.inner.create(order).await
        }
        async fn find_by_id(&self, id: Uuid) -> Result<Order, RepositoryError> {
            self.inner.find_by_id(id).await
        }
        async fn find_by_code(&self, code: &str) -> Result<Order, RepositoryError> {
            self.inner.find_by_code(code).await
        }
        async fn update(&self, order: &Order) -> Result<(), RepositoryError> {
            self.inner.update(order).await
        }
        async fn find_all(&self, filters: &OrderFilters) -> Result<Vec<Order>, RepositoryError> {
            self.inner.find_all(filters).await
        }
        async fn count(&self, filters: &OrderFilters) -> Result<i64, RepositoryError> {
            self.inner.count(filters).await
        }
        async fn exists_by_code(&self, _code: &str) -> Result<bool, RepositoryError> {
            let seen = self.checked.fetch_add(1, Ordering::SeqCst);
            Ok(seen < self.collisions)
        }
        async fn get_metrics(&self, filters: &OrderFilters) -> Result<OrderMetrics, RepositoryError> {
            self.inner.get_metrics(filters).await
        }
    }

    /// Every call fails; inserts fail with `on_create`.
    struct FailingRepository {
        on_create: fn() -> RepositoryError,
    }

    #[async_trait]
    impl OrderRepository for FailingRepository {
        async fn create(&self, _order: &Order) -> Result<(), RepositoryError> {
            Err((self.on_create)())
        }
        async fn find_by_id(&self, _id: Uuid) -> Result<Order, RepositoryError> {
            Err(RepositoryError::NotFound)
        }
        async fn find_by_code(&self, _code: &str) -> Result<Order, RepositoryError> {
            Err(RepositoryError::unavailable("no hosts available"))
        }
        async fn update(&self, _order: &Order) -> Result<(), RepositoryError> {
            Err(RepositoryError::Timeout("update"))
        }
        async fn find_all(&self, _filters: &OrderFilters) -> Result<Vec<Order>, RepositoryError> {
            Err(RepositoryError::Timeout("find_all"))
        }
        async fn count(&self, _filters: &OrderFilters) -> Result<i64, RepositoryError> {
            Err(RepositoryError::Timeout("count"))
        }
        async fn exists_by_code(&self, _code: &str) -> Result<bool, RepositoryError> {
            Ok(false)
        }
        async fn get_metrics(&self, _filters: &OrderFilters) -> Result<OrderMetrics, RepositoryError> {
            Err(RepositoryError::Timeout("get_metrics"))
        }
    }

    /// Serves listings only through `find_page`; the split reads fail.
    struct PagedRepository {
        inner: InMemoryOrderRepository,
    }

    #[async_trait]
    impl OrderRepository for PagedRepository {
        async fn create(&self, order: &Order) -> Result<(), RepositoryError> {
            self.inner.create(order).await
        }
        async fn find_by_id(&self, id: Uuid) -> Result<Order, RepositoryError> {
            self.inner.find_by_id(id).await
        }
        async fn find_by_code(&self, code: &str) -> Result<Order, RepositoryError> {
            self.inner.find_by_code(code).await
        }
        async fn update(&self, order: &Order) -> Result<(), RepositoryError> {
            self.inner.update(order).await
        }
        async fn find_all(&self, _filters: &OrderFilters) -> Result<Vec<Order>, RepositoryError> {
            Err(RepositoryError::unavailable("find_all called"))
        }
        async fn count(&self, _filters: &OrderFilters) -> Result<i64, RepositoryError> {
            Err(RepositoryError::unavailable("count called"))
        }
        async fn find_page(&self, filters: &OrderFilters) -> Result<(Vec<Order>, i64), RepositoryError> {
            self.inner.find_page(filters).await
        }
        async fn exists_by_code(&self, code: &str) -> Result<bool, RepositoryError> {
            self.inner.exists_by_code(code).await
        }
        async fn get_metrics(&self, filters: &OrderFilters) -> Result<OrderMetrics, RepositoryError> {
            self.inner.get_metrics(filters).await
        }
    }

    // ------------------------------------------------------------------------
    // create
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_create_with_overflowing_total_is_rejected() {
        let (service, repository, metrics) = service();
        let mut command = create_on_site();
        command.products = vec![product("a", 4_000_000_000_000_000_000, 3)];

        let err = service.create(command).await.unwrap_err();

        assert!(matches!(err, OrderError::TotalOverflow));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(repository.count(&OrderFilters::default()).await.unwrap(), 0);
        assert_eq!(
            metrics
                .operation_failures
                .with_label_values(&["create", "validation"])
                .get(),
            1
        );
    }

    #[tokio::test]
    async fn test_create_delivery_order() {
        let (service, repository, metrics) = service();

        let order = service.create(create_delivery()).await.unwrap();

        assert_eq!(order.total, 39_900);
        assert_eq!(order.status, OrderStatus::Created);
        assert_eq!(order.note.as_deref(), Some("extra napkins"));

        let stored = repository.find_by_code(&order.code).await.unwrap();
        assert_eq!(stored, order);
        assert_eq!(metrics.orders_created.with_label_values(&["DELIVERY"]).get(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_order_without_writing() {
        let (service, repository, metrics) = service();
        let mut command = create_delivery();
        command.customer = None;

        let err = service.create(command).await.unwrap_err();

        assert!(matches!(err, OrderError::CustomerRequiredForDelivery));
        assert_eq!(repository.count(&OrderFilters::default()).await.unwrap(), 0);
        assert_eq!(
            metrics
                .operation_failures
                .with_label_values(&["create", "validation"])
                .get(),
            1
        );
    }

    #[tokio::test]
    async fn test_create_on_site_with_table_and_address_fails() {
        let (service, _, _) = service();
        let mut command = create_on_site();
        command.shipping_address = Some("Calle 1".to_string());

        let err = service.create(command).await.unwrap_err();
        assert!(matches!(err, OrderError::ShippingAddressNotAllowedForOnSite));
    }

    #[tokio::test]
    async fn test_create_regenerates_colliding_code_once() {
        let repository = Arc::new(CollidingRepository {
            inner: InMemoryOrderRepository::new(),
            collisions: 1,
            checked: AtomicU32::new(0),
        });
        let (service, _) = service_with(repository.clone());

        let order = service.create(create_on_site()).await.unwrap();

        assert_eq!(repository.checked.load(Ordering::SeqCst), 1);
        assert!(repository.inner.find_by_code(&order.code).await.is_ok());
    }

    #[tokio::test]
    async fn test_create_honours_regeneration_budget() {
        let repository = Arc::new(CollidingRepository {
            inner: InMemoryOrderRepository::new(),
            collisions: 10,
            checked: AtomicU32::new(0),
        });
        let metrics = Arc::new(Metrics::new().unwrap());
        let service = OrderService::new(
            repository.clone(),
            metrics,
            ServiceConfig { code_regenerations: 3 },
        );

        service.create(create_on_site()).await.unwrap();
        assert_eq!(repository.checked.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_create_duplicate_code_at_insert_is_a_conflict() {
        let (service, _) = service_with(Arc::new(FailingRepository {
            on_create: || RepositoryError::DuplicateCode("ORD-1".to_string()),
        }));

        let err = service.create(create_on_site()).await.unwrap_err();
        assert!(matches!(err, OrderError::OrderCodeAlreadyExists));
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    // ------------------------------------------------------------------------
    // partial_update
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_partial_update_status() {
        let (service, _, metrics) = service();
        let order = service.create(create_delivery()).await.unwrap();

        let updated = service
            .partial_update(&order.code, status_update(OrderStatus::Verified))
            .await
            .unwrap();

        assert_eq!(updated.status, OrderStatus::Verified);
        assert!(updated.updated_at >= order.updated_at);
        assert_eq!(
            metrics
                .status_transitions
                .with_label_values(&["CREATED", "VERIFIED"])
                .get(),
            1
        );
    }

    #[tokio::test]
    async fn test_partial_update_rejects_transition_out_of_delivered() {
        let (service, repository, _) = service();
        let order = service.create(create_on_site()).await.unwrap();
        for status in [OrderStatus::InProgress, OrderStatus::Delivered] {
            service
                .partial_update(&order.code, status_update(status))
                .await
                .unwrap();
        }

        let err = service
            .partial_update(&order.code, status_update(OrderStatus::InProgress))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrderError::InvalidStatusTransition {
                from: OrderStatus::Delivered,
                to: OrderStatus::InProgress,
            }
        ));
        let stored = repository.find_by_code(&order.code).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn test_partial_update_patch_fields() {
        let (service, _, _) = service();
        let order = service.create(create_delivery()).await.unwrap();

        let updated = service
            .partial_update(
                &order.code,
                PartialUpdate {
                    status: None,
                    note: Patch::Clear,
                    payment_receipt_url: Patch::Set("https://receipts.example/r/1".to_string()),
                    payment_account_id: Patch::Absent,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status, OrderStatus::Created);
        assert_eq!(updated.note, None);
        assert_eq!(
            updated.payment_receipt_url.as_deref(),
            Some("https://receipts.example/r/1")
        );
        assert_eq!(updated.payment_account_id, None);
        assert_eq!(updated.products, order.products);
    }

    #[tokio::test]
    async fn test_partial_update_unknown_or_empty_code() {
        let (service, _, _) = service();

        let err = service
            .partial_update("", status_update(OrderStatus::Verified))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidOrderCode));

        let err = service
            .partial_update("ORD-missing", status_update(OrderStatus::Verified))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::OrderNotFound));
    }

    // ------------------------------------------------------------------------
    // modify
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_modify_products_recalculates_and_forces_verified() {
        let (service, repository, _) = service();
        let order = service.create(create_delivery()).await.unwrap();
        service
            .partial_update(&order.code, status_update(OrderStatus::Verified))
            .await
            .unwrap();

        let modified = service
            .modify(
                &order.code,
                ModifyOrder {
                    products: Some(vec![product("pizza", 25_000, 2), product("water", 3_000, 1)]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(modified.total, 53_000);
        assert_eq!(modified.status, OrderStatus::Verified);
        assert_eq!(repository.find_by_code(&order.code).await.unwrap(), modified);
    }

    #[tokio::test]
    async fn test_modify_in_progress_order_goes_back_to_verified() {
        let (service, _, metrics) = service();
        let order = service.create(create_on_site()).await.unwrap();
        service
            .partial_update(&order.code, status_update(OrderStatus::InProgress))
            .await
            .unwrap();

        let modified = service
            .modify(
                &order.code,
                ModifyOrder {
                    products: Some(vec![product("latte", 6_000, 1)]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(modified.status, OrderStatus::Verified);
        assert_eq!(
            metrics
                .status_transitions
                .with_label_values(&["IN_PROGRESS", "VERIFIED"])
                .get(),
            1
        );
    }

    #[tokio::test]
    async fn test_modify_without_products_keeps_status() {
        let (service, _, _) = service();
        let order = service.create(create_delivery()).await.unwrap();

        let modified = service
            .modify(
                &order.code,
                ModifyOrder {
                    products: Some(Vec::<OrderProduct>::new()),
                    shipping_address: Some("Carrera 7 # 45-10".to_string()),
                    note: Some("gate code 1234".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(modified.status, OrderStatus::Created);
        assert_eq!(modified.total, 39_900);
        assert_eq!(modified.shipping_address.as_deref(), Some("Carrera 7 # 45-10"));
        assert_eq!(modified.note.as_deref(), Some("gate code 1234"));
    }

    #[tokio::test]
    async fn test_modify_frozen_order_fails() {
        let frozen = [
            OrderStatus::OutForDelivery,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ];
        let inputs = [
            ModifyOrder {
                products: Some(vec![product("latte", 6_000, 1)]),
                ..Default::default()
            },
            ModifyOrder {
                note: Some("too late".to_string()),
                ..Default::default()
            },
        ];

        for status in frozen {
            for input in inputs.clone() {
                let (service, repository, _) = service();
                let order = service.create(create_delivery()).await.unwrap();
                let mut stored = order.clone();
                stored.status = status;
                repository.update(&stored).await.unwrap();

                let err = service.modify(&order.code, input).await.unwrap_err();

                assert!(
                    matches!(err, OrderError::OrderCannotBeModified(s) if s == status),
                    "{status}: {err}"
                );
                assert_eq!(repository.find_by_code(&order.code).await.unwrap(), stored);
            }
        }
    }

    #[tokio::test]
    async fn test_modify_with_overflowing_products_keeps_stored_order() {
        let (service, repository, _) = service();
        let order = service.create(create_delivery()).await.unwrap();

        let err = service
            .modify(
                &order.code,
                ModifyOrder {
                    products: Some(vec![product("a", i64::MAX, 1), product("b", 1, 1)]),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::TotalOverflow));
        assert_eq!(repository.find_by_code(&order.code).await.unwrap(), order);
    }

    #[tokio::test]
    async fn test_modify_revalidates_and_does_not_write_invalid_order() {
        let (service, repository, _) = service();
        let order = service.create(create_on_site()).await.unwrap();

        let err = service
            .modify(
                &order.code,
                ModifyOrder {
                    shipping_address: Some("Calle 1".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::ShippingAddressNotAllowedForOnSite));
        let stored = repository.find_by_code(&order.code).await.unwrap();
        assert_eq!(stored.shipping_address, None);
    }

    // ------------------------------------------------------------------------
    // queries
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_get_by_id_and_code() {
        let (service, _, _) = service();
        let order = service.create(create_on_site()).await.unwrap();

        assert_eq!(service.get_by_id(order.id).await.unwrap(), order);
        assert_eq!(service.get_by_code(&order.code).await.unwrap(), order);
        assert!(matches!(
            service.get_by_id(Uuid::new_v4()).await,
            Err(OrderError::OrderNotFound)
        ));
        assert!(matches!(service.get_by_code("").await, Err(OrderError::InvalidOrderCode)));
    }

    #[tokio::test]
    async fn test_get_all_normalizes_pagination() {
        let (service, _, _) = service();
        for _ in 0..3 {
            service.create(create_on_site()).await.unwrap();
        }

        let page = service
            .get_all(OrderFilters {
                limit: 0,
                offset: -5,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(page.offset, 0);
        assert_eq!(page.total, 3);
        assert_eq!(page.orders.len(), 3);

        let page = service
            .get_all(OrderFilters {
                limit: 500,
                offset: 2,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.limit, MAX_PAGE_SIZE);
        assert_eq!(page.total, 3);
        assert_eq!(page.orders.len(), 1);
    }

    #[tokio::test]
    async fn test_get_all_reads_page_and_total_together() {
        let (service, _) = service_with(Arc::new(PagedRepository {
            inner: InMemoryOrderRepository::new(),
        }));
        for _ in 0..3 {
            service.create(create_on_site()).await.unwrap();
        }

        let page = service
            .get_all(OrderFilters {
                limit: 2,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.orders.len(), 2);
    }

    #[tokio::test]
    async fn test_get_all_applies_filters() {
        let (service, _, _) = service();
        service.create(create_on_site()).await.unwrap();
        service.create(create_delivery()).await.unwrap();

        let page = service
            .get_all(OrderFilters {
                sale_type: Some(SaleType::Delivery),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.orders[0].sale_type, SaleType::Delivery);
    }

    #[tokio::test]
    async fn test_metrics_over_empty_set() {
        let (service, _, _) = service();
        service.create(create_on_site()).await.unwrap();

        let metrics = service
            .get_metrics(OrderFilters {
                status: Some(OrderStatus::Delivered),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(metrics.total_sales, 0);
        assert_eq!(metrics.avg_ticket, 0);
        assert_eq!(metrics.orders_by_status.len(), 6);
        assert!(metrics.orders_by_status.values().all(|&c| c == 0));
        assert!(metrics.top_products.is_empty());
    }

    #[tokio::test]
    async fn test_metrics_over_created_orders() {
        let (service, _, _) = service();
        service.create(create_on_site()).await.unwrap();
        service.create(create_delivery()).await.unwrap();

        let metrics = service.get_metrics(OrderFilters::default()).await.unwrap();
        assert_eq!(metrics.total_sales, 9_000 + 39_900);
        assert_eq!(metrics.avg_ticket, 24_450);
        assert_eq!(metrics.orders_by_status[&OrderStatus::Created], 2);
        assert_eq!(metrics.top_products[0].product_id, "burger");
    }

    // ------------------------------------------------------------------------
    // storage failures
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_storage_failures_are_wrapped() {
        let (service, metrics) = service_with(Arc::new(FailingRepository {
            on_create: || RepositoryError::Timeout("create"),
        }));

        let err = service.create(create_on_site()).await.unwrap_err();
        assert!(matches!(
            err,
            OrderError::Persistence {
                operation: "create order",
                source: RepositoryError::Timeout(_),
            }
        ));
        assert_eq!(err.kind(), ErrorKind::Internal);

        let err = service.get_by_code("ORD-1").await.unwrap_err();
        assert!(matches!(err, OrderError::Persistence { .. }));

        let err = service.get_all(OrderFilters::default()).await.unwrap_err();
        assert!(err.to_string().starts_with("failed to get orders"));

        assert_eq!(
            metrics
                .operation_failures
                .with_label_values(&["create", "internal"])
                .get(),
            1
        );
    }
}
