// ============================================================================
// Order Domain - Business Logic for the Order lifecycle
// ============================================================================
//
// This module contains ALL Order-specific code:
// - Value objects (OrderProduct, Customer, OrderStatus, SaleType, Patch)
// - Commands (CreateOrder, PartialUpdate, ModifyOrder)
// - Errors (OrderError enum)
// - Aggregate (Order with the status state machine)
// - Validation (business rules run on create and modify)
// - Repository contract and filters
// - Analytics (sales metrics over a filtered order set)
// - Service (OrderService)
//
// Storage adapters live in `crate::store`.
//
// ============================================================================

pub mod value_objects;
pub mod commands;
pub mod errors;
pub mod aggregate;
pub mod validation;
pub mod repository;
pub mod analytics;
pub mod command_handler;

// Re-export for convenience
pub use value_objects::*;
pub use commands::*;
pub use errors::*;
pub use aggregate::*;
pub use repository::*;
pub use analytics::*;
pub use command_handler::*;
