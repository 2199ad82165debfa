//! Connector action endpoints, scoped by organization and marketplace.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
};
use chrono::{DateTime, Utc};
use fluxori_connectors::{Connector, ConnectorSummary};
use fluxori_core::{
    ConnectionStatus, ConnectorCredentials, Marketplace, NetworkStatus, OrderId, OrganizationId,
    PaginationOptions, PriceUpdate, StockUpdate,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result, operation_response};
use crate::state::AppState;

/// List query accepted by product and order listings.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub since: Option<DateTime<Utc>>,
}

impl From<ListQuery> for PaginationOptions {
    fn from(query: ListQuery) -> Self {
        let defaults = Self::default();
        Self {
            page: query.page.unwrap_or(defaults.page),
            page_size: query.page_size.unwrap_or(defaults.page_size),
            since: query.since,
        }
    }
}

/// Marketplaces connected for one organization.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorList {
    pub organization_id: OrganizationId,
    pub marketplaces: Vec<Marketplace>,
}

fn parse_marketplace(raw: &str) -> Result<Marketplace> {
    raw.parse()
        .map_err(|e: fluxori_core::MarketplaceParseError| AppError::BadRequest(e.to_string()))
}

/// Resolve the registered connector for a path.
async fn connector(state: &AppState, org: &str, marketplace: &str) -> Result<Arc<dyn Connector>> {
    let marketplace = parse_marketplace(marketplace)?;
    state
        .registry()
        .get(&OrganizationId::new(org), marketplace)
        .await
        .ok_or_else(|| AppError::NotConnected {
            organization: org.to_string(),
            marketplace,
        })
}

// =============================================================================
// Registration
// =============================================================================

/// Connect a marketplace for an organization.
///
/// The body is the credentials JSON; its `organizationId` must match the
/// path.
#[instrument(skip(state, credentials), fields(marketplace = %credentials.marketplace))]
pub async fn connect(
    State(state): State<AppState>,
    Path(org): Path<String>,
    Json(credentials): Json<ConnectorCredentials>,
) -> Result<(StatusCode, Json<ConnectorSummary>)> {
    if credentials.organization_id.as_str() != org {
        return Err(AppError::BadRequest(format!(
            "organizationId {} does not match path organization {org}",
            credentials.organization_id
        )));
    }

    let organization_id = credentials.organization_id.clone();
    let marketplace = credentials.marketplace;
    let connector = state.registry().connect(credentials).await?;

    Ok((
        StatusCode::CREATED,
        Json(ConnectorSummary {
            organization_id,
            marketplace,
            state: connector.state().await,
        }),
    ))
}

/// Marketplaces connected for an organization.
pub async fn list(State(state): State<AppState>, Path(org): Path<String>) -> Json<ConnectorList> {
    let organization_id = OrganizationId::new(org);
    let marketplaces = state.registry().list(&organization_id).await;
    Json(ConnectorList {
        organization_id,
        marketplaces,
    })
}

/// Close and remove a connector.
#[instrument(skip(state))]
pub async fn disconnect(
    State(state): State<AppState>,
    Path((org, marketplace)): Path<(String, String)>,
) -> Result<StatusCode> {
    let marketplace = parse_marketplace(&marketplace)?;
    if state
        .registry()
        .disconnect(&OrganizationId::new(&org), marketplace)
        .await
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotConnected {
            organization: org,
            marketplace,
        })
    }
}

// =============================================================================
// Connection health
// =============================================================================

pub async fn status(
    State(state): State<AppState>,
    Path((org, marketplace)): Path<(String, String)>,
) -> Result<Json<ConnectionStatus>> {
    let connector = connector(&state, &org, &marketplace).await?;
    Ok(Json(connector.test_connection().await))
}

pub async fn network(
    State(state): State<AppState>,
    Path((org, marketplace)): Path<(String, String)>,
) -> Result<Json<NetworkStatus>> {
    let connector = connector(&state, &org, &marketplace).await?;
    Ok(Json(connector.check_network_status().await))
}

pub async fn refresh(
    State(state): State<AppState>,
    Path((org, marketplace)): Path<(String, String)>,
) -> Result<Json<ConnectionStatus>> {
    let connector = connector(&state, &org, &marketplace).await?;
    Ok(Json(connector.refresh_connection().await))
}

// =============================================================================
// Products and orders
// =============================================================================

pub async fn products(
    State(state): State<AppState>,
    Path((org, marketplace)): Path<(String, String)>,
    Query(query): Query<ListQuery>,
) -> Result<Response> {
    let connector = connector(&state, &org, &marketplace).await?;
    let result = connector.get_products(query.into()).await;
    Ok(operation_response(&result))
}

pub async fn product(
    State(state): State<AppState>,
    Path((org, marketplace, sku)): Path<(String, String, String)>,
) -> Result<Response> {
    let connector = connector(&state, &org, &marketplace).await?;
    let result = connector.get_product_by_sku(&sku).await;
    Ok(operation_response(&result))
}

pub async fn orders(
    State(state): State<AppState>,
    Path((org, marketplace)): Path<(String, String)>,
    Query(query): Query<ListQuery>,
) -> Result<Response> {
    let connector = connector(&state, &org, &marketplace).await?;
    let result = connector.get_orders(query.into()).await;
    Ok(operation_response(&result))
}

pub async fn order(
    State(state): State<AppState>,
    Path((org, marketplace, id)): Path<(String, String, String)>,
) -> Result<Response> {
    let connector = connector(&state, &org, &marketplace).await?;
    let result = connector.get_order_by_id(&OrderId::new(id)).await;
    Ok(operation_response(&result))
}

pub async fn acknowledge(
    State(state): State<AppState>,
    Path((org, marketplace, id)): Path<(String, String, String)>,
) -> Result<Response> {
    let connector = connector(&state, &org, &marketplace).await?;
    let result = connector.acknowledge_order(&OrderId::new(id)).await;
    Ok(operation_response(&result))
}

// =============================================================================
// Batch writes
// =============================================================================

#[instrument(skip(state, updates), fields(count = updates.len()))]
pub async fn update_stock(
    State(state): State<AppState>,
    Path((org, marketplace)): Path<(String, String)>,
    Json(updates): Json<Vec<StockUpdate>>,
) -> Result<Response> {
    let connector = connector(&state, &org, &marketplace).await?;
    let result = connector.update_stock(updates).await;
    Ok(operation_response(&result))
}

#[instrument(skip(state, updates), fields(count = updates.len()))]
pub async fn update_prices(
    State(state): State<AppState>,
    Path((org, marketplace)): Path<(String, String)>,
    Json(updates): Json<Vec<PriceUpdate>>,
) -> Result<Response> {
    let connector = connector(&state, &org, &marketplace).await?;
    let result = connector.update_prices(updates).await;
    Ok(operation_response(&result))
}
