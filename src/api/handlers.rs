use actix_web::{web, HttpResponse};
use uuid::Uuid;
use validator::Validate;

use crate::domain::order::{OrderError, OrderService};

use super::dto::{
    CreateOrderRequest, ModifyOrderRequest, OrderCreatedResponse, OrderMetricsResponse,
    OrderQuery, OrderResponse, OrderTrackResponse, PartialUpdateRequest,
};
use super::error::ApiError;
use super::response::{ApiResponse, Paginated};

// POST /api/v1/orders
pub async fn create_order(
    service: web::Data<OrderService>,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();
    request.validate()?;

    let order = service.create(request.into_command()?).await?;

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        OrderCreatedResponse::from(&order),
        "Order created successfully",
    )))
}

// GET /api/v1/orders/track/{code}
pub async fn track_order(
    service: web::Data<OrderService>,
    code: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let order = service.get_by_code(&code).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(OrderTrackResponse::from(&order))))
}

// GET /api/v1/orders/{code}
pub async fn get_order_by_code(
    service: web::Data<OrderService>,
    code: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let order = service.get_by_code(&code).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(OrderResponse::from(order))))
}

// GET /api/v1/orders/id/{id}
pub async fn get_order_by_id(
    service: web::Data<OrderService>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = Uuid::parse_str(&id).map_err(|_| OrderError::InvalidOrderId)?;
    let order = service.get_by_id(id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(OrderResponse::from(order))))
}

// GET /api/v1/orders
pub async fn list_orders(
    service: web::Data<OrderService>,
    query: web::Query<OrderQuery>,
) -> Result<HttpResponse, ApiError> {
    let filters = query.into_inner().into_filters()?;
    let page = service.get_all(filters).await?;

    let orders: Vec<OrderResponse> = page.orders.into_iter().map(OrderResponse::from).collect();
    Ok(HttpResponse::Ok().json(Paginated::new(orders, page.total, page.limit, page.offset)))
}

// GET /api/v1/orders/metrics
pub async fn order_metrics(
    service: web::Data<OrderService>,
    query: web::Query<OrderQuery>,
) -> Result<HttpResponse, ApiError> {
    let filters = query.into_inner().into_filters()?;
    let metrics = service.get_metrics(filters).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(OrderMetricsResponse::from(metrics))))
}

// PATCH /api/v1/orders
pub async fn partial_update_order(
    service: web::Data<OrderService>,
    body: web::Json<serde_json::Value>,
) -> Result<HttpResponse, ApiError> {
    let raw = body.into_inner();
    if raw.get("products").is_some() {
        tracing::warn!(code = ?raw.get("code"), "Products sent in PATCH request");
        return Err(OrderError::ProductsNotAllowedInPatch.into());
    }

    let request: PartialUpdateRequest =
        serde_json::from_value(raw).map_err(|e| ApiError::InvalidBody(e.to_string()))?;
    request.validate()?;

    let (code, update) = request.into_command()?;
    let order = service.partial_update(&code, update).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        OrderResponse::from(order),
        "Order updated successfully",
    )))
}

// PUT /api/v1/orders
pub async fn modify_order(
    service: web::Data<OrderService>,
    body: web::Json<ModifyOrderRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();
    request.validate()?;

    let (code, modify) = request.into_command()?;
    let order = service.modify(&code, modify).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        OrderResponse::from(order),
        "Order modified successfully",
    )))
}
