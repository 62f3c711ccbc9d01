//! The guarded verification endpoint

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use axum_extra::{headers::UserAgent, TypedHeader};
use codegate_common::{constants, CheckRequest, CheckResponse};
use std::net::SocketAddr;
use std::time::Instant;

use crate::guard::Verdict;
use crate::routes::AppState;

/// Build the check router
pub fn router() -> Router<AppState> {
    Router::new().route(constants::CHECK_CODE_PATH, post(check_code))
}

/// Handle one code submission.
///
/// The body is taken leniently: a missing, unparseable, or field-less body
/// reaches the engine as `code = None` and comes back `Malformed`, instead
/// of being rejected before the guard ever sees the request.
async fn check_code(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    user_agent: Option<TypedHeader<UserAgent>>,
    payload: Result<Json<CheckRequest>, JsonRejection>,
) -> Response {
    let identity = user_agent
        .as_ref()
        .map(|TypedHeader(ua)| ua.as_str())
        .unwrap_or(constants::ANONYMOUS_IDENTITY);
    let body = payload.ok();
    let code = body.as_ref().and_then(|Json(req)| req.code.as_deref());

    let verdict = state
        .engine
        .evaluate(addr.ip(), identity, code, Instant::now());

    verdict_response(verdict)
}

/// Map a verdict to its wire response.
fn verdict_response(verdict: Verdict) -> Response {
    match verdict {
        Verdict::Valid { balance } => {
            (StatusCode::OK, Json(CheckResponse::valid(balance))).into_response()
        }
        Verdict::Invalid => {
            // Same status code as Valid: no status-line oracle.
            (StatusCode::OK, Json(CheckResponse::invalid())).into_response()
        }
        Verdict::Blocked { retry_after } => (
            StatusCode::TOO_MANY_REQUESTS,
            [("Retry-After", retry_after.as_secs().to_string())],
            Json(CheckResponse::blocked()),
        )
            .into_response(),
        Verdict::Throttled => {
            (StatusCode::TOO_MANY_REQUESTS, Json(CheckResponse::throttled())).into_response()
        }
        Verdict::Blacklisted => {
            (StatusCode::FORBIDDEN, Json(CheckResponse::blacklisted())).into_response()
        }
        Verdict::Malformed => {
            (StatusCode::BAD_REQUEST, Json(CheckResponse::invalid_format())).into_response()
        }
        Verdict::ServiceUnavailable => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(CheckResponse::service_unavailable()),
        )
            .into_response(),
    }
}
