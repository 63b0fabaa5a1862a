use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::aggregate::Order;
use super::value_objects::OrderStatus;

// ============================================================================
// Sales Analytics - aggregation over a filtered order set
// ============================================================================

pub const TOP_PRODUCTS_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderMetrics {
    pub total_sales: i64,
    pub avg_ticket: i64,
    pub orders_by_status: BTreeMap<OrderStatus, i64>,
    pub top_products: Vec<ProductSalesSummary>,
}

impl Default for OrderMetrics {
    fn default() -> Self {
        Self {
            total_sales: 0,
            avg_ticket: 0,
            orders_by_status: OrderStatus::ALL.into_iter().map(|s| (s, 0)).collect(),
            top_products: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSalesSummary {
    pub product_id: String,
    pub name: String,
    pub total_quantity: i64,
    pub total_revenue: i64,
}

/// Totals, per-status counts and the `top_n` best sellers by quantity.
///
/// Ties on quantity are broken by product id, then name.
pub fn aggregate<'a, I>(orders: I, top_n: usize) -> OrderMetrics
where
    I: IntoIterator<Item = &'a Order>,
{
    let mut metrics = OrderMetrics::default();
    let mut count = 0i64;
    let mut products: HashMap<(&'a str, &'a str), (i64, i64)> = HashMap::new();

    for order in orders {
        count += 1;
        metrics.total_sales = metrics.total_sales.saturating_add(order.total);
        *metrics.orders_by_status.entry(order.status).or_insert(0) += 1;

        for product in &order.products {
            let entry = products
                .entry((product.id.as_str(), product.name.as_str()))
                .or_insert((0, 0));
            entry.0 = entry.0.saturating_add(i64::from(product.quantity));
            entry.1 = entry
                .1
                .saturating_add(product.line_total().unwrap_or(i64::MAX));
        }
    }

    if count > 0 {
        metrics.avg_ticket = metrics.total_sales / count;
    }

    let mut ranking: Vec<ProductSalesSummary> = products
        .into_iter()
        .map(|((id, name), (quantity, revenue))| ProductSalesSummary {
            product_id: id.to_string(),
            name: name.to_string(),
            total_quantity: quantity,
            total_revenue: revenue,
        })
        .collect();
    ranking.sort_by(|a, b| {
        b.total_quantity
            .cmp(&a.total_quantity)
            .then_with(|| a.product_id.cmp(&b.product_id))
            .then_with(|| a.name.cmp(&b.name))
    });
    ranking.truncate(top_n);
    metrics.top_products = ranking;

    metrics
}
