use axum::{
    body::Bytes,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, put},
    Json, Router,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    error::{GatewayError, UpdateError},
    frontend::AuthorityClient,
    protocol::ErrorBody,
    update::ScoreUpdate,
};

/// Public API. `DELETE /reset` only exists when `allow_reset` is set.
pub fn router(authority: AuthorityClient, allow_reset: bool) -> Router {
    let mut app = Router::new()
        .route("/score", put(put_score))
        .route("/top/:size", get(get_top))
        .route("/top/:rank/:scope", get(get_relative_top));
    if allow_reset {
        app = app.route("/reset", delete(delete_reset));
    }
    app.layer(Extension(authority))
}

async fn put_score(Extension(authority): Extension<AuthorityClient>, body: Bytes) -> Response {
    // Malformed reports are answered here without a round trip.
    let update = match serde_json::from_slice::<Value>(&body)
        .map_err(|e| UpdateError::Validation(format!("body is not JSON: {e}")))
        .and_then(|message| ScoreUpdate::from_message(&message))
    {
        Ok(update) => update,
        Err(err) => {
            debug!(error = %err, "score report rejected locally");
            return error_response(StatusCode::BAD_REQUEST, ErrorBody::from(&err));
        }
    };

    match authority.update(update).await {
        Ok(record) => Json(record).into_response(),
        Err(GatewayError::Rejected(err)) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, ErrorBody::from(&err))
        }
        Err(err) => unavailable(err),
    }
}

async fn get_top(
    Extension(authority): Extension<AuthorityClient>,
    Path(size): Path<i64>,
) -> Response {
    match authority.top(size).await {
        Ok(records) => Json(records).into_response(),
        Err(err) => unavailable(err),
    }
}

async fn get_relative_top(
    Extension(authority): Extension<AuthorityClient>,
    Path((rank, scope)): Path<(i64, i64)>,
) -> Response {
    match authority.relative_top(rank, scope).await {
        Ok(records) => Json(records).into_response(),
        Err(err) => unavailable(err),
    }
}

async fn delete_reset(Extension(authority): Extension<AuthorityClient>) -> Response {
    match authority.reset().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(GatewayError::ResetDisabled) => error_response(
            StatusCode::FORBIDDEN,
            ErrorBody::new("reset is disabled on the authority", "reset_disabled"),
        ),
        Err(err) => unavailable(err),
    }
}

fn error_response(status: StatusCode, body: ErrorBody) -> Response {
    (status, Json(body)).into_response()
}

fn unavailable(err: GatewayError) -> Response {
    warn!(error = %err, "authority request failed");
    error_response(
        StatusCode::SERVICE_UNAVAILABLE,
        ErrorBody::new(err.to_string(), "authority_unavailable"),
    )
}
