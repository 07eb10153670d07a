use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::application::error::{ErrorReport, HttpError};
use crate::application::messages::{
    CompileRequest, FlushRequest, RenderRequest, ReplyStatus, Request,
};
use crate::domain::FailureKind;

use super::HttpState;

const SOURCE: &str = "infra::http::handlers";

pub(super) async fn compile(
    State(state): State<HttpState>,
    payload: Result<Json<CompileRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return reject(rejection),
    };
    let reply = state.router.compile(request).await;
    let message = reply.message.clone();
    reply_response(reply.status, reply.failure, message, reply)
}

pub(super) async fn render(
    State(state): State<HttpState>,
    payload: Result<Json<RenderRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return reject(rejection),
    };
    let reply = state.router.render(request).await;
    let message = reply.message.clone();
    reply_response(reply.status, reply.failure, message, reply)
}

/// The flush request has no fields, so any body is ignored.
pub(super) async fn flush(State(state): State<HttpState>) -> Response {
    let reply = state.router.flush(FlushRequest::default()).await;
    reply_response(reply.status, None, None, reply)
}

pub(super) async fn bus(
    State(state): State<HttpState>,
    payload: Result<Json<Request>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return reject(rejection),
    };
    let reply = state.router.dispatch(request).await;
    let (status, failure) = (reply.status(), reply.failure());
    reply_response(status, failure, None, reply)
}

pub(super) async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// HTTP status for a reply: 200 on success, otherwise derived from the failure tag.
pub fn status_for(status: ReplyStatus, failure: Option<FailureKind>) -> StatusCode {
    match (status, failure) {
        (ReplyStatus::Ok, _) => StatusCode::OK,
        (ReplyStatus::Error, Some(FailureKind::NotFound)) => StatusCode::NOT_FOUND,
        (ReplyStatus::Error, Some(FailureKind::CompileFailed | FailureKind::ApplyFailed)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        (ReplyStatus::Error, Some(FailureKind::Timeout)) => StatusCode::GATEWAY_TIMEOUT,
        (ReplyStatus::Error, Some(FailureKind::Unexpected) | None) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn reply_response<T: serde::Serialize>(
    status: ReplyStatus,
    failure: Option<FailureKind>,
    message: Option<String>,
    reply: T,
) -> Response {
    let code = status_for(status, failure);
    let detail = message.or_else(|| {
        failure.map(|kind| format!("request failed with {}", kind.as_str()))
    });

    let mut response = (code, Json(reply)).into_response();
    if let Some(detail) = detail
        && status == ReplyStatus::Error
    {
        ErrorReport::from_message(SOURCE, code, detail).attach(&mut response);
    }
    response
}

fn reject(rejection: JsonRejection) -> Response {
    HttpError::from_error(SOURCE, rejection.status(), "Invalid request body", &rejection)
        .into_response()
}
