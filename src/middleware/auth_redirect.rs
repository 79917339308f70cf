use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

use crate::auth::tokens;

/// Send unauthenticated page requests to the login form. Whatever session
/// cookies the browser still holds are expired or belong to a deactivated
/// account, so they are dropped on the way.
pub async fn redirect_unauthorized(req: Request, next: Next) -> Response {
    let had_session = req
        .headers()
        .get(axum::http::header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|c| c.contains(tokens::ACCESS_COOKIE));

    let response = next.run(req).await;
    if response.status() != StatusCode::UNAUTHORIZED {
        return response;
    }

    if had_session {
        (tokens::clear_cookies(), Redirect::to("/auth/login")).into_response()
    } else {
        Redirect::to("/auth/login").into_response()
    }
}
