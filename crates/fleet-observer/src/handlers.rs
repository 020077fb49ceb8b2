//! Dashboard REST API handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/robots` | All robots |
//! | `GET` | `/api/packages` | Packages, optionally by status |
//! | `GET` | `/api/bins` | All bins with fill level |
//! | `GET` | `/api/overview` | Fleet-wide counts and warnings |
//! | `POST` | `/api/bins/{id}/maintenance` | Take a bin out of or back into service |
//! | `POST` | `/api/bins/{id}/toggle-maintenance` | Flip a bin's maintenance state |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse};
use fleet_core::{FleetOverview, set_bin_maintenance, toggle_bin_maintenance};
use fleet_db::EntityStore;
use fleet_types::{Bin, BinId, PackageFilter, PackageStatus};
use uuid::Uuid;

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/packages`.
#[derive(Debug, Default, serde::Deserialize)]
pub struct PackagesQuery {
    /// `pending` | `processing` | `completed`. Absent means all.
    pub status: Option<String>,
    /// Maximum number of packages to return.
    pub limit: Option<usize>,
}

/// Request body for `POST /api/bins/{id}/maintenance`.
#[derive(Debug, serde::Deserialize)]
pub struct MaintenanceRequest {
    /// `true` returns the bin to service, `false` takes it out.
    pub enabled: bool,
}

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

/// Minimal HTML page showing the run state and linking the API.
pub async fn index<S: EntityStore>(State(state): State<Arc<AppState<S>>>) -> impl IntoResponse {
    let status = state.controller.status();
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Fleet Observer</title></head>
<body>
  <h1>Warehouse Fleet</h1>
  <p>State: <strong>{state}</strong> &middot; ticks run: {ticks} &middot; packages generated: {packages}</p>
  <ul>
    <li><a href="/api/operator/status">/api/operator/status</a></li>
    <li><a href="/api/overview">/api/overview</a></li>
    <li><a href="/api/robots">/api/robots</a></li>
    <li><a href="/api/packages">/api/packages</a> (?status=pending|processing|completed)</li>
    <li><a href="/api/bins">/api/bins</a></li>
  </ul>
</body>
</html>"#,
        state = status.state,
        ticks = status.ticks_run,
        packages = status.packages_generated,
    ))
}

// ---------------------------------------------------------------------------
// GET /api/robots
// ---------------------------------------------------------------------------

/// List every robot.
pub async fn list_robots<S: EntityStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<impl IntoResponse, ObserverError> {
    let robots = state.store().list_robots().await?;
    Ok(Json(serde_json::json!({
        "count": robots.len(),
        "robots": robots,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/packages
// ---------------------------------------------------------------------------

/// List packages, oldest first.
///
/// # Query Parameters
///
/// - `status`: `pending` | `processing` | `completed` (default: all)
/// - `limit`: maximum number of packages
pub async fn list_packages<S: EntityStore>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<PackagesQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    let mut filter = match params.status.as_deref() {
        None | Some("all") => PackageFilter::all(),
        Some(raw) => {
            let status = raw
                .parse::<PackageStatus>()
                .map_err(|e| ObserverError::InvalidQuery(e.to_string()))?;
            PackageFilter::with_status(status)
        }
    };
    if let Some(limit) = params.limit {
        filter = filter.limit(limit);
    }

    let packages = state.store().list_packages(filter).await?;
    Ok(Json(serde_json::json!({
        "count": packages.len(),
        "packages": packages,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/bins
// ---------------------------------------------------------------------------

fn bin_json(bin: &Bin) -> serde_json::Value {
    serde_json::json!({
        "id": bin.id,
        "location": bin.location,
        "capacity": bin.capacity,
        "current_count": bin.current_count,
        "status": bin.status,
        "fill_percentage": bin.fill_percentage(),
        "fill_level": bin.fill_level(),
    })
}

/// List every bin with its fill percentage and display fill level.
pub async fn list_bins<S: EntityStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<impl IntoResponse, ObserverError> {
    let bins = state.store().list_bins().await?;
    let rows: Vec<serde_json::Value> = bins.iter().map(bin_json).collect();
    Ok(Json(serde_json::json!({
        "count": rows.len(),
        "bins": rows,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/overview
// ---------------------------------------------------------------------------

/// Fleet-wide counts for the overview card.
pub async fn get_overview<S: EntityStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<impl IntoResponse, ObserverError> {
    let overview = FleetOverview::collect(state.store()).await?;
    Ok(Json(overview))
}

// ---------------------------------------------------------------------------
// POST /api/bins/{id}/maintenance
// ---------------------------------------------------------------------------

/// Take a bin out of service (`enabled: false`) or return it
/// (`enabled: true`).
pub async fn set_maintenance<S: EntityStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id_str): Path<String>,
    Json(body): Json<MaintenanceRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let id = BinId::from(parse_uuid(&id_str)?);
    let bin = set_bin_maintenance(state.store(), id, body.enabled).await?;
    Ok(Json(bin_json(&bin)))
}

/// Flip a bin between maintenance and service.
pub async fn toggle_maintenance<S: EntityStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let id = BinId::from(parse_uuid(&id_str)?);
    let bin = toggle_bin_maintenance(state.store(), id).await?;
    Ok(Json(bin_json(&bin)))
}

fn parse_uuid(s: &str) -> Result<Uuid, ObserverError> {
    s.parse::<Uuid>()
        .map_err(|e| ObserverError::InvalidUuid(format!("{s}: {e}")))
}
