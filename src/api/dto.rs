use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidateUrl, ValidationError};

use crate::domain::order::{
    CreateOrder, Customer, IdType, ModifyOrder, Order, OrderError, OrderFilters, OrderMetrics,
    OrderProduct, OrderStatus, PartialUpdate, Patch, ProductSalesSummary, SaleType,
};

use super::error::ApiError;

// ============================================================================
// Request DTOs
// ============================================================================
//
// Field-level constraints live here and are reported as 400 with a details
// list. Enum values arrive as strings and are parsed into domain types on
// conversion, so unknown values surface as the domain's own errors.
//
// ============================================================================

const MAX_TEXT: u64 = 500;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderProductRequest {
    #[validate(length(min = 1))]
    pub id: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(length(max = 500))]
    pub observation: Option<String>,
    #[validate(range(min = 0))]
    pub price: i64,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

impl From<OrderProductRequest> for OrderProduct {
    fn from(p: OrderProductRequest) -> Self {
        OrderProduct {
            id: p.id,
            name: p.name,
            description: p.description,
            observation: p.observation,
            price: p.price,
            quantity: p.quantity,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CustomerRequest {
    #[validate(length(min = 1))]
    pub identification: String,
    pub id_type: String,
    #[validate(length(min = 2, max = 200))]
    pub name: String,
    #[validate(length(min = 7, max = 20))]
    pub phone: String,
}

impl TryFrom<CustomerRequest> for Customer {
    type Error = OrderError;

    fn try_from(c: CustomerRequest) -> Result<Self, Self::Error> {
        Ok(Customer {
            identification: c.identification,
            id_type: c.id_type.parse::<IdType>()?,
            name: c.name,
            phone: c.phone,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub sale_type: String,
    #[validate(length(min = 1), nested)]
    pub products: Vec<OrderProductRequest>,
    #[validate(length(max = 500))]
    pub note: Option<String>,
    #[validate(nested)]
    pub customer: Option<CustomerRequest>,
    #[validate(length(max = 500))]
    pub shipping_address: Option<String>,
    #[validate(range(min = 1))]
    pub table_number: Option<i32>,
    #[validate(url)]
    pub payment_receipt_url: Option<String>,
    pub payment_account_id: Option<String>,
}

impl CreateOrderRequest {
    pub fn into_command(self) -> Result<CreateOrder, OrderError> {
        Ok(CreateOrder {
            sale_type: self.sale_type.parse::<SaleType>()?,
            products: self.products.into_iter().map(OrderProduct::from).collect(),
            note: self.note,
            customer: self.customer.map(Customer::try_from).transpose()?,
            shipping_address: self.shipping_address,
            table_number: self.table_number,
            payment_receipt_url: self.payment_receipt_url,
            payment_account_id: self.payment_account_id,
        })
    }
}

/// PATCH body. A `products` key is rejected before this type is parsed.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PartialUpdateRequest {
    pub code: String,
    pub status: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "patch_text_length"))]
    pub note: Patch<String>,
    #[serde(default)]
    #[validate(custom(function = "patch_url"))]
    pub payment_receipt_url: Patch<String>,
    #[serde(default)]
    pub payment_account_id: Patch<String>,
}

impl PartialUpdateRequest {
    pub fn into_command(self) -> Result<(String, PartialUpdate), OrderError> {
        let status = self
            .status
            .as_deref()
            .map(str::parse::<OrderStatus>)
            .transpose()?;

        Ok((
            self.code,
            PartialUpdate {
                status,
                note: self.note,
                payment_receipt_url: self.payment_receipt_url,
                payment_account_id: self.payment_account_id,
            },
        ))
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ModifyOrderRequest {
    pub code: String,
    #[validate(nested)]
    pub products: Option<Vec<OrderProductRequest>>,
    #[validate(length(max = 500))]
    pub shipping_address: Option<String>,
    #[validate(nested)]
    pub customer: Option<CustomerRequest>,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

impl ModifyOrderRequest {
    pub fn into_command(self) -> Result<(String, ModifyOrder), OrderError> {
        Ok((
            self.code,
            ModifyOrder {
                products: self
                    .products
                    .map(|products| products.into_iter().map(OrderProduct::from).collect()),
                shipping_address: self.shipping_address,
                customer: self.customer.map(Customer::try_from).transpose()?,
                note: self.note,
            },
        ))
    }
}

fn patch_text_length(value: &Patch<String>) -> Result<(), ValidationError> {
    match value {
        Patch::Set(text) if text.chars().count() as u64 > MAX_TEXT => Err(ValidationError::new(
            "length",
        )
        .with_message(Cow::Borrowed("length must be at most 500"))),
        _ => Ok(()),
    }
}

fn patch_url(value: &Patch<String>) -> Result<(), ValidationError> {
    match value {
        Patch::Set(url) if !url.validate_url() => Err(ValidationError::new("url")),
        _ => Ok(()),
    }
}

// ============================================================================
// Query parameters
// ============================================================================

/// Listing and metrics query string. Values stay raw until `into_filters`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub status: Option<String>,
    pub sale_type: Option<String>,
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub min_total: Option<String>,
    pub max_total: Option<String>,
}

impl OrderQuery {
    /// Empty parameters are ignored. Dates are RFC 3339.
    pub fn into_filters(self) -> Result<OrderFilters, ApiError> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        Ok(OrderFilters {
            date_from: present(self.date_from)
                .map(|v| parse_date("date_from", &v))
                .transpose()?,
            date_to: present(self.date_to)
                .map(|v| parse_date("date_to", &v))
                .transpose()?,
            status: present(self.status)
                .map(|v| v.parse::<OrderStatus>())
                .transpose()?,
            sale_type: present(self.sale_type)
                .map(|v| v.parse::<SaleType>())
                .transpose()?,
            product_id: present(self.product_id),
            product_name: present(self.product_name),
            min_total: present(self.min_total)
                .map(|v| parse_int("min_total", &v))
                .transpose()?,
            max_total: present(self.max_total)
                .map(|v| parse_int("max_total", &v))
                .transpose()?,
            limit: present(self.limit)
                .map(|v| parse_int("limit", &v))
                .transpose()?
                .unwrap_or(0),
            offset: present(self.offset)
                .map(|v| parse_int("offset", &v))
                .transpose()?
                .unwrap_or(0),
        })
    }
}

fn parse_date(param: &'static str, value: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| ApiError::InvalidQuery {
            param,
            reason: format!("expected an RFC 3339 timestamp ({e})"),
        })
}

fn parse_int(param: &'static str, value: &str) -> Result<i64, ApiError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|e| ApiError::InvalidQuery {
            param,
            reason: e.to_string(),
        })
}

// ============================================================================
// Response DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct OrderCreatedResponse {
    pub id: Uuid,
    pub code: String,
    pub status: OrderStatus,
    pub sale_type: SaleType,
    pub total: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Order> for OrderCreatedResponse {
    fn from(o: &Order) -> Self {
        Self {
            id: o.id,
            code: o.code.clone(),
            status: o.status,
            sale_type: o.sale_type,
            total: o.total,
            created_at: o.created_at,
            updated_at: o.updated_at,
        }
    }
}

/// Public tracking view; exposes no customer data beyond the name.
#[derive(Debug, Serialize)]
pub struct OrderTrackResponse {
    pub code: String,
    pub status: OrderStatus,
    pub customer_name: String,
    pub updated_at: DateTime<Utc>,
}

impl From<&Order> for OrderTrackResponse {
    fn from(o: &Order) -> Self {
        Self {
            code: o.code.clone(),
            status: o.status,
            customer_name: o
                .customer
                .as_ref()
                .map_or_else(|| "Guest".to_string(), |c| c.name.clone()),
            updated_at: o.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub code: String,
    pub status: OrderStatus,
    pub sale_type: SaleType,
    pub products: Vec<OrderProduct>,
    pub total: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<Customer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_number: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_receipt_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_account_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        Self {
            id: o.id,
            code: o.code,
            status: o.status,
            sale_type: o.sale_type,
            products: o.products,
            total: o.total,
            note: o.note,
            customer: o.customer,
            shipping_address: o.shipping_address,
            table_number: o.table_number,
            payment_receipt_url: o.payment_receipt_url,
            payment_account_id: o.payment_account_id,
            created_at: o.created_at,
            updated_at: o.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsData {
    pub total_sales: i64,
    pub avg_ticket: i64,
    pub orders_by_status: BTreeMap<OrderStatus, i64>,
}

#[derive(Debug, Serialize)]
pub struct OrderMetricsResponse {
    pub metrics: MetricsData,
    pub top_products: Vec<ProductSalesSummary>,
}

impl From<OrderMetrics> for OrderMetricsResponse {
    fn from(m: OrderMetrics) -> Self {
        Self {
            metrics: MetricsData {
                total_sales: m.total_sales,
                avg_ticket: m.avg_ticket,
                orders_by_status: m.orders_by_status,
            },
            top_products: m.top_products,
        }
    }
}
