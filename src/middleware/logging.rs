use std::sync::Arc;

use axum::{
    body::{to_bytes, Body, HttpBody},
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{error, warn, Level};

use crate::{
    message::{CapturedRequest, CapturedResponse},
    setup::DebugLogger,
};

/// Logs the request on the `request` channel, runs the rest of the stack,
/// then logs the response on the `response` channel.
///
/// Install with `axum::middleware::from_fn_with_state(logger, debug_requests_responses)`.
/// A body is buffered, logged and handed on unchanged only when its exact
/// size is known and within [`DebugLogger::max_buffered_body`]. Any other
/// body is passed on unread and logged as a placeholder.
pub async fn debug_requests_responses(
    State(logger): State<Arc<DebugLogger>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let max = logger.max_buffered_body;

    let request = if logger.request.is_enabled_for(Level::DEBUG) {
        let (parts, body) = request.into_parts();
        match bufferable_size(&body, max) {
            Ok(()) => {
                let bytes = match to_bytes(body, max).await {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!(method = %parts.method, path = parts.uri.path(), error = %e, "Failed to read request body");
                        return StatusCode::BAD_REQUEST.into_response();
                    }
                };
                logger
                    .request
                    .debug(CapturedRequest::from_parts(&parts, bytes.clone()));
                Request::from_parts(parts, Body::from(bytes))
            }
            Err(size) => {
                logger.request.debug(CapturedRequest::unbuffered(&parts, size));
                Request::from_parts(parts, body)
            }
        }
    } else {
        request
    };

    let response = next.run(request).await;

    if !logger.response.is_enabled_for(Level::DEBUG) {
        return response;
    }

    let (parts, body) = response.into_parts();
    if let Err(size) = bufferable_size(&body, max) {
        logger
            .response
            .debug(CapturedResponse::unbuffered(&parts, size, Some(method)));
        return Response::from_parts(parts, body);
    }

    match to_bytes(body, max).await {
        Ok(bytes) => {
            logger
                .response
                .debug(CapturedResponse::from_parts(&parts, bytes.clone(), Some(method)));
            Response::from_parts(parts, Body::from(bytes))
        }
        Err(e) => {
            error!(status = parts.status.as_u16(), error = %e, "Failed to read response body");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `Ok` when the body has an exact size no larger than `max`, otherwise the
/// exact size if one is known.
fn bufferable_size(body: &Body, max: usize) -> Result<(), Option<u64>> {
    match body.size_hint().exact() {
        Some(size) if size <= max as u64 => Ok(()),
        size => Err(size),
    }
}
