//! Operator REST API handlers for run-state control.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/operator/status` | Run state, schedule periods, counters |
//! | `POST` | `/api/operator/start` | Start or restart the simulation |
//! | `POST` | `/api/operator/pause` | Pause a running simulation |
//! | `POST` | `/api/operator/emergency-stop` | Halt all robots and release packages |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use fleet_db::EntityStore;
use fleet_types::RunState;

use crate::state::AppState;

/// Response to a run-state command.
#[derive(Debug, serde::Serialize)]
struct OperatorResponse {
    /// Whether the command took effect.
    ok: bool,
    /// Human-readable message.
    message: String,
    /// Run state after the command.
    state: RunState,
}

/// Current controller status.
pub async fn status<S: EntityStore>(State(state): State<Arc<AppState<S>>>) -> impl IntoResponse {
    Json(state.controller.status())
}

/// Start the simulation. Idle robots are reactivated and the first tick
/// runs at once.
pub async fn start<S: EntityStore>(State(state): State<Arc<AppState<S>>>) -> impl IntoResponse {
    let run_state = state.controller.start().await;
    Json(OperatorResponse {
        ok: run_state == RunState::Running,
        message: String::from("Simulation started"),
        state: run_state,
    })
}

/// Pause the simulation. Only a running simulation can be paused.
pub async fn pause<S: EntityStore>(State(state): State<Arc<AppState<S>>>) -> impl IntoResponse {
    let run_state = state.controller.pause();
    let paused = run_state == RunState::Paused;
    Json(OperatorResponse {
        ok: paused,
        message: if paused {
            String::from("Simulation paused")
        } else {
            format!("Simulation is {run_state}; nothing to pause")
        },
        state: run_state,
    })
}

/// Halt every robot that is not charging and release all carried
/// packages.
pub async fn emergency_stop<S: EntityStore>(
    State(state): State<Arc<AppState<S>>>,
) -> impl IntoResponse {
    let run_state = state.controller.emergency_stop().await;
    Json(OperatorResponse {
        ok: true,
        message: String::from("Emergency stop: robots halted, packages released"),
        state: run_state,
    })
}
