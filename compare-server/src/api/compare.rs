//! Comparison list endpoints
//!
//! All routes sit behind [`super::session_middleware`]; handlers resolve the
//! owner, validate the item id, then delegate to the core.

use axum::{body::Bytes, extract::State, Extension, Json};
use compare_common::config::{CompareSettings, TableStyle};
use compare_common::{ComparisonMatrix, ItemId, Projection};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::auth::{authorize, Caller};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Body of an item action; `token` is consumed by the middleware
#[derive(Debug, Default, Deserialize)]
struct ItemRequest {
    #[serde(default)]
    item_id: Option<Value>,
}

/// Result of a mutating action
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub message: String,
    /// Items in the list afterwards
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub items: Vec<ItemId>,
    pub max_items: usize,
}

/// Matrix view, tagged by `status`
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatrixResponse {
    Ok {
        table_style: TableStyle,
        matrix: ComparisonMatrix,
    },
    Empty {
        message: String,
    },
}

fn parse_item(body: &Bytes) -> ApiResult<ItemId> {
    let request: ItemRequest = serde_json::from_slice(body).unwrap_or_default();
    match request.item_id {
        Some(raw) => Ok(ItemId::from_json(&raw)?),
        None => Err(ApiError::InvalidItem("Missing product id".to_string())),
    }
}

/// POST /api/compare/add
pub async fn add_item(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    body: Bytes,
) -> ApiResult<Json<ActionResponse>> {
    let owner = authorize(&state, &caller)?;
    let item = parse_item(&body)?;

    let count = state.store.add(&owner, item).await?;
    info!("Added product {} to comparison of {}", item, owner);

    Ok(Json(ActionResponse {
        message: "Product added to compare".to_string(),
        count,
    }))
}

/// POST /api/compare/remove
pub async fn remove_item(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    body: Bytes,
) -> ApiResult<Json<ActionResponse>> {
    let owner = authorize(&state, &caller)?;
    let item = parse_item(&body)?;

    let count = state.store.remove(&owner, item).await?;
    info!("Removed product {} from comparison of {}", item, owner);

    Ok(Json(ActionResponse {
        message: "Product removed from compare".to_string(),
        count,
    }))
}

/// POST /api/compare/clear
pub async fn clear_items(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<Json<ActionResponse>> {
    let owner = authorize(&state, &caller)?;

    state.store.clear(&owner).await?;
    info!("Cleared comparison of {}", owner);

    Ok(Json(ActionResponse {
        message: "Comparison list cleared".to_string(),
        count: 0,
    }))
}

/// POST /api/compare/list
pub async fn get_list(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<Json<ListResponse>> {
    let owner = authorize(&state, &caller)?;
    let items = state.store.get(&owner).await?;

    Ok(Json(ListResponse {
        items,
        max_items: state.store.max_items(),
    }))
}

/// POST /api/compare/matrix
///
/// Settings are read per request so admin changes apply immediately.
pub async fn get_matrix(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<Json<MatrixResponse>> {
    let owner = authorize(&state, &caller)?;
    let settings = CompareSettings::load(&state.db).await?;

    let response = match state.projector.project(&owner, &settings.attributes).await? {
        Projection::Empty => MatrixResponse::Empty {
            message: "No products to compare".to_string(),
        },
        Projection::Matrix(matrix) => MatrixResponse::Ok {
            table_style: settings.table_style,
            matrix,
        },
    };

    Ok(Json(response))
}
