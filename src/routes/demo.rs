//! Sample endpoints that exercise the different body shapes the logger
//! handles: plain text, JSON, messy XML, error statuses and streams.

use std::convert::Infallible;

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateNoteRequest {
    pub title: String,
    pub body: String,
}

pub async fn index() -> &'static str {
    "Welcome!"
}

pub async fn unauthorized() -> (StatusCode, &'static str) {
    (StatusCode::UNAUTHORIZED, "Unauthorized")
}

pub async fn ugly_xml() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/xml")],
        r#"
        <message>
        <from>   John Doe</from>
            <to>Jane   </to><body>
        God I wish we had a pretty printer...
    </body></message>
    "#,
    )
}

pub async fn create_note(Json(payload): Json<CreateNoteRequest>) -> Result<(StatusCode, Json<Value>), StatusCode> {
    info!(title = %payload.title, "Create note requested");

    if payload.title.is_empty() {
        warn!("Invalid note: missing title");
        return Err(StatusCode::BAD_REQUEST);
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "note": {
                "title": payload.title,
                "body": payload.body,
                "created_at": chrono::Utc::now().to_rfc3339(),
            },
            "message": "Note created successfully"
        })),
    ))
}

pub async fn stream() -> Response {
    let chunks = ["first chunk\n", "second chunk\n", "last chunk\n"]
        .into_iter()
        .map(Ok::<_, Infallible>);
    Body::from_stream(futures::stream::iter(chunks)).into_response()
}
