use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use orderlink_auth::Principal;
use orderlink_storage::{Order, User};
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiError;
use crate::server::AppState;
use crate::services::{NewUser, OrderInput, UserChanges};

pub async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "caches": {
            "users": state.user_cache.stats(),
            "orders": state.order_cache.stats(),
        }
    }))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub async fn register_user(
    State(state): State<AppState>,
    Json(body): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state.users.register(body).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list_users(
    State(state): State<AppState>,
    _principal: Principal,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.users.list().await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.users.get(id).await?))
}

pub async fn user_report(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<i64>,
) -> Result<String, ApiError> {
    state.users.report(id).await
}

pub async fn update_user(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
    Json(body): Json<UserChanges>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.users.update(&principal, id, body).await?))
}

pub async fn delete_user(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.users.delete(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

pub async fn create_order(
    State(state): State<AppState>,
    principal: Principal,
    Json(body): Json<OrderInput>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let order = state.orders.create(&principal, body).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn get_order(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.orders.get(&principal, id).await?))
}

pub async fn my_orders(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.orders.list_mine(&principal).await?))
}

pub async fn update_order(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(body): Json<OrderInput>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.orders.update(&principal, id, body).await?))
}

pub async fn delete_order(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.orders.delete(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
