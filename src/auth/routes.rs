//! Login, callback, and logout routes
//!
//! Implements the three-legged OAuth flow against GitHub:
//! `/login` issues a CSRF state token and points the browser at the
//! provider; the configured callback route consumes the state,
//! exchanges the code, resolves org/team membership, and establishes
//! the session; `/logout` tears it all down.

use axum::{
    Router,
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect},
    routing::get,
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::Deserialize;

use super::middleware::identity_from_headers;
use super::session::{SESSION_COOKIE, create_session_token};
use crate::AppState;
use crate::error::AppError;
use crate::metrics::LOGINS_TOTAL;

/// Create the authentication router
///
/// Routes:
/// - GET /login - Login page (or redirect if already authenticated)
/// - GET {callback path} - OAuth callback, path from the configured callback URL
/// - GET /logout - Clear session and stored token
pub fn auth_router(callback_path: &str) -> Router<AppState> {
    Router::new()
        .route("/login", get(login))
        .route(callback_path, get(callback))
        .route("/logout", get(logout))
}

// =============================================================================
// Login
// =============================================================================

/// GET /login
///
/// An already-authenticated browser is sent straight to the
/// post-login redirect. Otherwise a fresh state token is issued and
/// the login page rendered with the authorization URL.
async fn login(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> Result<axum::response::Response, AppError> {
    if identity_from_headers(&headers, &state.config.auth.session_secret).is_some() {
        return Ok(Redirect::to(&state.config.auth.post_login_redirect).into_response());
    }

    let csrf_state = state.csrf.issue().await?;
    let url = state.github.authorize_url(&csrf_state);

    Ok(Html(render_login_page(&state, &url)?).into_response())
}

fn render_login_page(state: &AppState, url: &str) -> Result<String, AppError> {
    if let Some(template_path) = &state.config.auth.login_page {
        let template = std::fs::read_to_string(template_path).map_err(|e| {
            AppError::Config(format!(
                "auth.login_page {:?} could not be read: {}",
                template_path, e
            ))
        })?;
        return Ok(template.replace("{{url}}", url));
    }

    Ok(format!(
        r#"
        <!DOCTYPE html>
        <html>
        <head><title>Login - Pasture</title></head>
        <body>
            <h1>Pasture</h1>
            <p>Please sign in with GitHub</p>
            <a href="{url}">Sign in with GitHub</a>
        </body>
        </html>
    "#
    ))
}

// =============================================================================
// Callback
// =============================================================================

/// Query parameters from the GitHub callback
///
/// Everything is optional: the provider sends `error` instead of
/// `code` when the user denies the authorization request.
#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// GET {callback path}
///
/// # Steps
/// 1. A provider `error` parameter denies immediately, zero API calls
/// 2. Consume the CSRF state (single-use; replay fails)
/// 3. Exchange the code for an access token
/// 4. Resolve username, org membership, and the team snapshot
/// 5. Persist the token, set the session cookie, redirect
async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    if let Some(error) = query.error {
        LOGINS_TOTAL
            .with_label_values(&["denied_provider_error"])
            .inc();
        tracing::warn!(provider_error = %error, "Callback carried a provider error");
        return Err(AppError::UpstreamAuth(format!(
            "Provider denied authorization: {}",
            error
        )));
    }

    let Some(csrf_state) = query.state else {
        LOGINS_TOTAL.with_label_values(&["denied_csrf"]).inc();
        return Err(AppError::CsrfRejected);
    };
    if !state.csrf.consume(&csrf_state).await? {
        LOGINS_TOTAL.with_label_values(&["denied_csrf"]).inc();
        return Err(AppError::CsrfRejected);
    }

    let code = query.code.ok_or_else(|| {
        LOGINS_TOTAL.with_label_values(&["denied_no_code"]).inc();
        AppError::UpstreamAuth("Callback carried no authorization code".to_string())
    })?;

    let access_token = state.github.exchange_code(&code).await?;
    let identity = state.directory.resolve(&access_token).await?;
    state
        .directory
        .remember_token(&identity.user, &access_token)
        .await?;

    let session_token = create_session_token(&identity, &state.config.auth.session_secret)?;
    let cookie = session_cookie(&state, session_token, state.config.auth.session_max_age);

    LOGINS_TOTAL.with_label_values(&["success"]).inc();
    tracing::info!(user = %identity.user, "Login completed");

    Ok((
        jar.add(cookie),
        Redirect::to(&state.config.auth.post_login_redirect),
    ))
}

// =============================================================================
// Logout
// =============================================================================

/// GET /logout
///
/// Clears the session cookie and the stored access token, then sends
/// the browser back to `/login`. Idempotent for anonymous requests.
async fn logout(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    if let Some(identity) = identity_from_headers(&headers, &state.config.auth.session_secret) {
        state.directory.forget_token(&identity.user).await?;
        tracing::info!(user = %identity.user, "Logged out");
    }

    let removal = session_cookie(&state, String::new(), 0);
    Ok((jar.add(removal), Redirect::to("/login")))
}

fn session_cookie(state: &AppState, value: String, max_age_seconds: i64) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, value);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_secure(state.config.should_use_secure_cookies());
    cookie.set_max_age(time::Duration::seconds(max_age_seconds));
    cookie
}
