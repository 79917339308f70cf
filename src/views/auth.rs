use askama::Template;
use axum::extract::State;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use crate::auth::jwt;
use crate::auth::tokens::{self, ACCESS_COOKIE, REFRESH_COOKIE};
use crate::db;
use crate::error::AppError;
use crate::routes::auth::authenticate;
use crate::state::SharedState;

#[derive(Template)]
#[template(path = "auth/login.html")]
struct LoginTemplate {
    email: String,
    error: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

pub async fn login_page(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Response {
    // If already logged in, redirect to dashboard
    if let Some(cookie) = jar.get(ACCESS_COOKIE) {
        if jwt::decode_token(cookie.value(), &state.config.jwt_secret).is_ok() {
            return Redirect::to("/dashboard").into_response();
        }
    }

    let template = LoginTemplate {
        email: String::new(),
        error: None,
    };
    Html(template.render().unwrap_or_default()).into_response()
}

pub async fn login_submit(
    State(state): State<SharedState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let user = match authenticate(&state, form.email.trim(), &form.password).await {
        Ok(user) => user,
        Err(AppError::Unauthorized(_)) => {
            return Ok(login_error(form.email, "Correo o contraseña incorrectos"));
        }
        Err(AppError::RateLimited(_)) => {
            return Ok(login_error(
                form.email,
                "Demasiados intentos. Intente de nuevo más tarde.",
            ));
        }
        Err(e) => return Err(e),
    };

    let issued = tokens::issue(&state.pool, &user, &state.config.jwt_secret).await?;
    let landing = if user.is_superuser && user.tenant_id.is_none() {
        "/admin"
    } else {
        "/dashboard"
    };
    Ok((issued.cookies(), Redirect::to(landing)).into_response())
}

fn login_error(email: String, message: &str) -> Response {
    let template = LoginTemplate {
        email,
        error: Some(message.to_string()),
    };
    Html(template.render().unwrap_or_default()).into_response()
}

pub async fn logout(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    if let Some(cookie) = jar.get(REFRESH_COOKIE) {
        db::refresh_tokens::revoke(&state.pool, &tokens::hash_token(cookie.value()))
            .await?;
    }
    Ok((tokens::clear_cookies(), Redirect::to("/auth/login")).into_response())
}
