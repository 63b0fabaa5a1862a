use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::aggregate::Order;
use super::analytics::OrderMetrics;
use super::value_objects::{OrderStatus, SaleType};
use crate::utils::IsTransient;

// ============================================================================
// Order Repository - storage contract consumed by the lifecycle service
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("order not found")]
    NotFound,

    #[error("duplicate order code: {0}")]
    DuplicateCode(String),

    #[error("storage deadline exceeded during {0}")]
    Timeout(&'static str),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("unexpected row shape: {0}")]
    Decode(String),

    #[error("failed to (de)serialize order: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RepositoryError {
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        RepositoryError::Unavailable(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        RepositoryError::Decode(err.to_string())
    }
}

impl IsTransient for RepositoryError {
    fn is_transient(&self) -> bool {
        matches!(self, RepositoryError::Timeout(_) | RepositoryError::Unavailable(_))
    }
}

/// Listing and analytics filter. Every populated field narrows the result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderFilters {
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub status: Option<OrderStatus>,
    pub sale_type: Option<SaleType>,
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub min_total: Option<i64>,
    pub max_total: Option<i64>,
    pub limit: i64,
    pub offset: i64,
}

impl OrderFilters {
    /// Pagination fields are not part of the predicate.
    pub fn matches(&self, order: &Order) -> bool {
        if self.date_from.is_some_and(|from| order.created_at < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| order.created_at > to) {
            return false;
        }
        if self.status.is_some_and(|status| order.status != status) {
            return false;
        }
        if self.sale_type.is_some_and(|sale_type| order.sale_type != sale_type) {
            return false;
        }
        if let Some(ref id) = self.product_id {
            if !order.products.iter().any(|p| &p.id == id) {
                return false;
            }
        }
        if let Some(ref name) = self.product_name {
            let needle = name.to_lowercase();
            if !order
                .products
                .iter()
                .any(|p| p.name.to_lowercase().contains(&needle))
            {
                return false;
            }
        }
        if self.min_total.is_some_and(|min| order.total < min) {
            return false;
        }
        if self.max_total.is_some_and(|max| order.total > max) {
            return false;
        }
        true
    }
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Inserts a new order; `DuplicateCode` when the tracking code is taken.
    async fn create(&self, order: &Order) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Order, RepositoryError>;

    async fn find_by_code(&self, code: &str) -> Result<Order, RepositoryError>;

    /// Overwrites an existing order keyed by its internal identifier.
    async fn update(&self, order: &Order) -> Result<(), RepositoryError>;

    /// Matching orders, newest first, honouring `limit` and `offset`.
    async fn find_all(&self, filters: &OrderFilters) -> Result<Vec<Order>, RepositoryError>;

    async fn count(&self, filters: &OrderFilters) -> Result<i64, RepositoryError>;

    /// `find_all` and `count` from one read. Adapters that scan should
    /// override this to walk their storage once.
    async fn find_page(&self, filters: &OrderFilters) -> Result<(Vec<Order>, i64), RepositoryError> {
        let total = self.count(filters).await?;
        let orders = self.find_all(filters).await?;
        Ok((orders, total))
    }

    async fn exists_by_code(&self, code: &str) -> Result<bool, RepositoryError>;

    async fn get_metrics(&self, filters: &OrderFilters) -> Result<OrderMetrics, RepositoryError>;
}
