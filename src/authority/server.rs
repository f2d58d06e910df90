//! HTTP side of the authority: the RPC endpoints front-ends call.

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use std::future::Future;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::{
    authority::AuthorityHandle,
    error::{GatewayError, UpdateError},
    protocol::{
        RelativeTopRequest, TopRequest, UpdateReply, ENDPOINT_RELATIVE_TOP, ENDPOINT_RESET,
        ENDPOINT_TOP, ENDPOINT_UPDATE,
    },
    update::ScoreUpdate,
};

pub fn router(handle: AuthorityHandle) -> Router {
    Router::new()
        .route(ENDPOINT_UPDATE, post(handle_update))
        .route(ENDPOINT_TOP, post(handle_top))
        .route(ENDPOINT_RELATIVE_TOP, post(handle_relative_top))
        .route(ENDPOINT_RESET, post(handle_reset))
        .layer(Extension(handle))
}

/// Serves the RPC endpoints on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, handle: AuthorityHandle, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("authority RPC listening on {}", listener.local_addr()?);
    axum::serve(listener, router(handle))
        .with_graceful_shutdown(shutdown)
        .await
}

/// A body that does not decode into a valid [`ScoreUpdate`] is answered as a
/// rejected update.
async fn handle_update(
    Extension(handle): Extension<AuthorityHandle>,
    payload: Result<Json<ScoreUpdate>, JsonRejection>,
) -> Response {
    let update = match payload {
        Ok(Json(update)) => update,
        Err(rejection) => {
            let error = UpdateError::Validation(rejection.body_text());
            debug!(%error, "malformed update RPC");
            return Json(UpdateReply::Rejected { error }).into_response();
        }
    };
    match handle.update(update).await {
        Ok(record) => Json(UpdateReply::Applied { record }).into_response(),
        Err(GatewayError::Rejected(error)) => Json(UpdateReply::Rejected { error }).into_response(),
        Err(err) => unavailable(err),
    }
}

async fn handle_top(
    Extension(handle): Extension<AuthorityHandle>,
    Json(req): Json<TopRequest>,
) -> Response {
    match handle.top(req.size).await {
        Ok(records) => Json(records).into_response(),
        Err(err) => unavailable(err),
    }
}

async fn handle_relative_top(
    Extension(handle): Extension<AuthorityHandle>,
    Json(req): Json<RelativeTopRequest>,
) -> Response {
    match handle.relative_top(req.rank, req.scope).await {
        Ok(records) => Json(records).into_response(),
        Err(err) => unavailable(err),
    }
}

async fn handle_reset(Extension(handle): Extension<AuthorityHandle>) -> Response {
    match handle.reset().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(GatewayError::ResetDisabled) => StatusCode::FORBIDDEN.into_response(),
        Err(err) => unavailable(err),
    }
}

fn unavailable(err: GatewayError) -> Response {
    warn!(error = %err, "authority could not serve request");
    StatusCode::SERVICE_UNAVAILABLE.into_response()
}
