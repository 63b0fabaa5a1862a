use super::value_objects::OrderStatus;
use super::repository::RepositoryError;

// ============================================================================
// Order Business Rule Errors
// ============================================================================

/// Coarse classification used by the HTTP boundary to pick a response class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Conflict,
    BadRequest,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Validation => "validation",
            ErrorKind::Conflict => "conflict",
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::Internal => "internal",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    // Lookup
    #[error("order not found")]
    OrderNotFound,

    #[error("invalid order ID")]
    InvalidOrderId,

    #[error("invalid order code")]
    InvalidOrderCode,

    #[error("order code already exists")]
    OrderCodeAlreadyExists,

    // Products
    #[error("order must contain at least one product")]
    NoProducts,

    #[error("product ID is required")]
    InvalidProductId,

    #[error("product name is required")]
    InvalidProductName,

    #[error("product quantity must be greater than 0, got {0}")]
    InvalidProductQuantity(i32),

    #[error("product price must be greater than or equal to 0, got {0}")]
    InvalidProductPrice(i64),

    #[error("duplicate product in order: {0}")]
    DuplicateProduct(String),

    #[error("order total exceeds the supported amount")]
    TotalOverflow,

    #[error("products cannot be updated via PATCH, use PUT instead")]
    ProductsNotAllowedInPatch,

    // Customer
    #[error("customer information is required for delivery orders")]
    CustomerRequiredForDelivery,

    #[error("customer name is required")]
    CustomerNameRequired,

    #[error("customer phone is required")]
    CustomerPhoneRequired,

    #[error("invalid customer ID type: {0}")]
    InvalidIdType(String),

    // Shipping and table
    #[error("shipping address is required for delivery orders")]
    ShippingAddressRequired,

    #[error("shipping address is not allowed for on-site orders")]
    ShippingAddressNotAllowedForOnSite,

    #[error("table number is required for on-site orders")]
    TableNumberRequiredForOnSite,

    #[error("table number is not allowed for delivery orders")]
    TableNumberNotAllowedForDelivery,

    #[error("invalid table number: {0}")]
    InvalidTableNumber(i32),

    // Sale type and status
    #[error("invalid sale type: {0}")]
    InvalidSaleType(String),

    #[error("invalid order status: {0}")]
    InvalidStatus(String),

    #[error("invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    #[error("order cannot be modified in status {0}")]
    OrderCannotBeModified(OrderStatus),

    // Storage
    #[error("failed to {operation}: {source}")]
    Persistence {
        operation: &'static str,
        #[source]
        source: RepositoryError,
    },
}

impl OrderError {
    pub fn kind(&self) -> ErrorKind {
        use OrderError::*;
        match self {
            OrderNotFound => ErrorKind::NotFound,
            InvalidStatusTransition { .. } | OrderCannotBeModified(_) | OrderCodeAlreadyExists => {
                ErrorKind::Conflict
            }
            ProductsNotAllowedInPatch | InvalidOrderCode | InvalidOrderId => ErrorKind::BadRequest,
            Persistence { .. } => ErrorKind::Internal,
            NoProducts
            | InvalidProductId
            | InvalidProductName
            | InvalidProductQuantity(_)
            | InvalidProductPrice(_)
            | DuplicateProduct(_)
            | TotalOverflow
            | CustomerRequiredForDelivery
            | CustomerNameRequired
            | CustomerPhoneRequired
            | InvalidIdType(_)
            | ShippingAddressRequired
            | ShippingAddressNotAllowedForOnSite
            | TableNumberRequiredForOnSite
            | TableNumberNotAllowedForDelivery
            | InvalidTableNumber(_)
            | InvalidSaleType(_)
            | InvalidStatus(_) => ErrorKind::Validation,
        }
    }

    /// Stable machine-readable name of the violated rule.
    pub fn code(&self) -> &'static str {
        use OrderError::*;
        match self {
            OrderNotFound => "ORDER_NOT_FOUND",
            InvalidOrderId => "INVALID_ORDER_ID",
            InvalidOrderCode => "INVALID_ORDER_CODE",
            OrderCodeAlreadyExists => "ORDER_CODE_ALREADY_EXISTS",
            NoProducts => "NO_PRODUCTS",
            InvalidProductId => "INVALID_PRODUCT_ID",
            InvalidProductName => "INVALID_PRODUCT_NAME",
            InvalidProductQuantity(_) => "INVALID_PRODUCT_QUANTITY",
            InvalidProductPrice(_) => "INVALID_PRODUCT_PRICE",
            DuplicateProduct(_) => "DUPLICATE_PRODUCT",
            TotalOverflow => "TOTAL_OVERFLOW",
            ProductsNotAllowedInPatch => "PRODUCTS_NOT_ALLOWED_IN_PATCH",
            CustomerRequiredForDelivery => "CUSTOMER_REQUIRED_FOR_DELIVERY",
            CustomerNameRequired => "CUSTOMER_NAME_REQUIRED",
            CustomerPhoneRequired => "CUSTOMER_PHONE_REQUIRED",
            InvalidIdType(_) => "INVALID_ID_TYPE",
            ShippingAddressRequired => "SHIPPING_ADDRESS_REQUIRED",
            ShippingAddressNotAllowedForOnSite => "SHIPPING_ADDRESS_NOT_ALLOWED_FOR_ON_SITE",
            TableNumberRequiredForOnSite => "TABLE_NUMBER_REQUIRED_FOR_ON_SITE",
            TableNumberNotAllowedForDelivery => "TABLE_NUMBER_NOT_ALLOWED_FOR_DELIVERY",
            InvalidTableNumber(_) => "INVALID_TABLE_NUMBER",
            InvalidSaleType(_) => "INVALID_SALE_TYPE",
            InvalidStatus(_) => "INVALID_STATUS",
            InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
            OrderCannotBeModified(_) => "ORDER_CANNOT_BE_MODIFIED",
            Persistence { .. } => "PERSISTENCE_FAILURE",
        }
    }

    /// Field the rule is attached to, for field-level error lists.
    pub fn field(&self) -> Option<&'static str> {
        use OrderError::*;
        match self {
            NoProducts | DuplicateProduct(_) | TotalOverflow | ProductsNotAllowedInPatch => {
                Some("products")
            }
            InvalidProductId => Some("products.id"),
            InvalidProductName => Some("products.name"),
            InvalidProductQuantity(_) => Some("products.quantity"),
            InvalidProductPrice(_) => Some("products.price"),
            CustomerRequiredForDelivery => Some("customer"),
            CustomerNameRequired => Some("customer.name"),
            CustomerPhoneRequired => Some("customer.phone"),
            InvalidIdType(_) => Some("customer.id_type"),
            ShippingAddressRequired | ShippingAddressNotAllowedForOnSite => {
                Some("shipping_address")
            }
            TableNumberRequiredForOnSite
            | TableNumberNotAllowedForDelivery
            | InvalidTableNumber(_) => Some("table_number"),
            InvalidSaleType(_) => Some("sale_type"),
            InvalidStatus(_) | InvalidStatusTransition { .. } => Some("status"),
            InvalidOrderCode => Some("code"),
            InvalidOrderId => Some("id"),
            _ => None,
        }
    }

    pub(crate) fn persistence(operation: &'static str, source: RepositoryError) -> Self {
        match source {
            RepositoryError::NotFound => OrderError::OrderNotFound,
            RepositoryError::DuplicateCode(_) => OrderError::OrderCodeAlreadyExists,
            source => OrderError::Persistence { operation, source },
        }
    }
}
