// ============================================================================
// Storage Adapters - implementations of `OrderRepository`
// ============================================================================
//
// - memory: process-local maps, default backend and test double
// - scylla: ScyllaDB tables holding one JSON document per order
//
// Both adapters filter with `OrderFilters::matches` and aggregate with
// `analytics::aggregate`, so listing and metrics agree across backends.
//
// ============================================================================

pub mod memory;
pub mod scylla;

pub use memory::InMemoryOrderRepository;
pub use scylla::{ScyllaOrderRepository, ScyllaSettings};

use crate::domain::order::{Order, OrderFilters};

/// Keeps matching orders, newest first, then applies `offset` and `limit`.
///
/// A non-positive limit returns every remaining match.
pub(crate) fn select_page<I>(orders: I, filters: &OrderFilters) -> Vec<Order>
where
    I: IntoIterator<Item = Order>,
{
    let mut matching: Vec<Order> = orders.into_iter().filter(|o| filters.matches(o)).collect();
    matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

    let offset = usize::try_from(filters.offset).unwrap_or(0);
    let limit = match usize::try_from(filters.limit) {
        Ok(limit) if limit > 0 => limit,
        _ => usize::MAX,
    };

    matching.into_iter().skip(offset).take(limit).collect()
}
