use axum::{extract::State, Json};
use dontpad_common::types::CollabHealth;

use super::AppState;

/// Reachability of the collab server, probed with a short TCP connect.
pub async fn collab_health(State(state): State<AppState>) -> Json<CollabHealth> {
    let connection = state.collab.connection();
    Json(CollabHealth {
        ok: state.collab.probe().await,
        host: connection.host().to_string(),
        port: connection.port(),
        connection_string: connection.as_str().to_string(),
    })
}
