use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::order::analytics::{self, OrderMetrics, TOP_PRODUCTS_LIMIT};
use crate::domain::order::{Order, OrderFilters, OrderRepository, RepositoryError};

use super::select_page;

// ============================================================================
// In-Memory Order Repository
// ============================================================================

#[derive(Default)]
struct State {
    orders: HashMap<Uuid, Order>,
    // tracking code -> order id
    codes: HashMap<String, Uuid>,
}

#[derive(Default)]
pub struct InMemoryOrderRepository {
    state: RwLock<State>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        if state.codes.contains_key(&order.code) {
            return Err(RepositoryError::DuplicateCode(order.code.clone()));
        }

        state.codes.insert(order.code.clone(), order.id);
        state.orders.insert(order.id, order.clone());

        tracing::debug!(order_id = %order.id, code = %order.code, "Stored order");
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Order, RepositoryError> {
        let state = self.state.read().await;
        state.orders.get(&id).cloned().ok_or(RepositoryError::NotFound)
    }

    async fn find_by_code(&self, code: &str) -> Result<Order, RepositoryError> {
        let state = self.state.read().await;
        state
            .codes
            .get(code)
            .and_then(|id| state.orders.get(id))
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn update(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        let previous_code = match state.orders.get(&order.id) {
            Some(existing) => existing.code.clone(),
            None => return Err(RepositoryError::NotFound),
        };

        if previous_code != order.code {
            if state.codes.contains_key(&order.code) {
                return Err(RepositoryError::DuplicateCode(order.code.clone()));
            }
            state.codes.remove(&previous_code);
            state.codes.insert(order.code.clone(), order.id);
        }
        state.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn find_all(&self, filters: &OrderFilters) -> Result<Vec<Order>, RepositoryError> {
        let state = self.state.read().await;
        Ok(select_page(state.orders.values().cloned(), filters))
    }

    async fn count(&self, filters: &OrderFilters) -> Result<i64, RepositoryError> {
        let state = self.state.read().await;
        let count = state.orders.values().filter(|o| filters.matches(o)).count();
        Ok(count as i64)
    }

    async fn find_page(&self, filters: &OrderFilters) -> Result<(Vec<Order>, i64), RepositoryError> {
        let state = self.state.read().await;
        let matching: Vec<Order> = state
            .orders
            .values()
            .filter(|o| filters.matches(o))
            .cloned()
            .collect();
        let total = matching.len() as i64;
        Ok((select_page(matching, filters), total))
    }

    async fn exists_by_code(&self, code: &str) -> Result<bool, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.codes.contains_key(code))
    }

    async fn get_metrics(&self, filters: &OrderFilters) -> Result<OrderMetrics, RepositoryError> {
        let state = self.state.read().await;
        let matching = state.orders.values().filter(|o| filters.matches(o));
        Ok(analytics::aggregate(matching, TOP_PRODUCTS_LIMIT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::aggregate::tests::{delivery_order, on_site_order, with_status};
    use crate::domain::order::OrderStatus;

    #[tokio::test]
    async fn test_create_and_find() {
        let repository = InMemoryOrderRepository::new();
        let order = delivery_order();

        repository.create(&order).await.unwrap();

        assert_eq!(repository.find_by_id(order.id).await.unwrap(), order);
        assert_eq!(repository.find_by_code(&order.code).await.unwrap(), order);
        assert!(repository.exists_by_code(&order.code).await.unwrap());
        assert!(!repository.exists_by_code("ORD-0-deadbeef").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_rejects_taken_code() {
        let repository = InMemoryOrderRepository::new();
        let first = on_site_order();
        let mut second = on_site_order();
        second.code = first.code.clone();

        repository.create(&first).await.unwrap();
        let err = repository.create(&second).await.unwrap_err();

        assert!(matches!(err, RepositoryError::DuplicateCode(code) if code == first.code));
        assert!(matches!(
            repository.find_by_id(second.id).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_missing_orders_are_not_found() {
        let repository = InMemoryOrderRepository::new();
        assert!(matches!(
            repository.find_by_id(Uuid::new_v4()).await,
            Err(RepositoryError::NotFound)
        ));
        assert!(matches!(
            repository.find_by_code("ORD-1").await,
            Err(RepositoryError::NotFound)
        ));
        assert!(matches!(
            repository.update(&on_site_order()).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_update_overwrites_document() {
        let repository = InMemoryOrderRepository::new();
        let order = on_site_order();
        repository.create(&order).await.unwrap();

        let changed = with_status(order.clone(), OrderStatus::InProgress);
        repository.update(&changed).await.unwrap();

        let stored = repository.find_by_code(&order.code).await.unwrap();
        assert_eq!(stored.status, OrderStatus::InProgress);
    }

    #[tokio::test]
    async fn test_count_and_metrics_share_filters() {
        let repository = InMemoryOrderRepository::new();
        repository.create(&on_site_order()).await.unwrap();
        repository.create(&delivery_order()).await.unwrap();
        repository
            .create(&with_status(delivery_order(), OrderStatus::Delivered))
            .await
            .unwrap();

        let filters = OrderFilters {
            status: Some(OrderStatus::Delivered),
            ..Default::default()
        };

        assert_eq!(repository.count(&filters).await.unwrap(), 1);
        assert_eq!(repository.find_all(&filters).await.unwrap().len(), 1);

        let (page, total) = repository
            .find_page(&OrderFilters {
                limit: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(total, 3);

        let metrics = repository.get_metrics(&filters).await.unwrap();
        assert_eq!(metrics.total_sales, 39_900);
        assert_eq!(metrics.orders_by_status[&OrderStatus::Delivered], 1);
        assert_eq!(metrics.orders_by_status[&OrderStatus::Created], 0);

        let all = repository.get_metrics(&OrderFilters::default()).await.unwrap();
        assert_eq!(all.total_sales, 9_000 + 39_900 * 2);
    }
}
