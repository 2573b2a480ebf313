//! Authorization middleware
//!
//! Gates protected routes on the membership snapshot in the session.
//! The requirement travels as a request extension attached at
//! router-composition time; evaluation never touches the network.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, State},
    http::{HeaderMap, Request, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;

use super::requirement::{Decision, MembershipRequirement};
use super::session::{Identity, SESSION_COOKIE, verify_session_token};
use crate::AppState;
use crate::error::AppError;
use crate::metrics::AUTHZ_DECISIONS_TOTAL;

/// Pull the identity out of the session cookie, if any.
///
/// Tampered, malformed, and expired tokens all read as anonymous.
pub fn identity_from_headers(headers: &HeaderMap, secret: &str) -> Option<Identity> {
    let jar = CookieJar::from_headers(headers);
    let cookie = jar.get(SESSION_COOKIE)?;
    verify_session_token(cookie.value(), secret)
}

/// Middleware enforcing a route's membership requirement
///
/// The route's `MembershipRequirement` is read from request extensions;
/// a route without one requires any authenticated org member. On
/// `Allow` the resolved `Identity` is inserted into request extensions
/// for handlers and extractors downstream.
///
/// # Usage
/// ```ignore
/// let protected = Router::new()
///     .route("/owners", get(handler))
///     .route_layer(Extension(MembershipRequirement::all(["Owners"])))
///     .route_layer(middleware::from_fn_with_state(state, require_membership));
/// ```
pub async fn require_membership(
    State(state): State<AppState>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let requirement = request
        .extensions()
        .get::<MembershipRequirement>()
        .cloned()
        .unwrap_or_else(MembershipRequirement::authenticated);

    let identity =
        identity_from_headers(request.headers(), &state.config.auth.session_secret);

    let decision = requirement.evaluate(identity.as_ref());
    AUTHZ_DECISIONS_TOTAL
        .with_label_values(&[decision.as_str()])
        .inc();

    match decision {
        Decision::Allow => {
            if let Some(identity) = identity {
                request.extensions_mut().insert(identity);
            }
            Ok(next.run(request).await)
        }
        Decision::RedirectToLogin => Ok(Redirect::to("/login").into_response()),
        Decision::Forbidden => {
            let identity = identity.as_ref();
            tracing::warn!(
                user = identity.map(|i| i.user.as_str()).unwrap_or("<anonymous>"),
                requirement = ?requirement,
                "Membership requirement not satisfied"
            );
            Err(AppError::Forbidden)
        }
    }
}

/// Extractor for the current authenticated user
///
/// Rejects with a redirect to `/login` when the request is anonymous.
///
/// # Usage
/// ```ignore
/// async fn handler(CurrentUser(identity): CurrentUser) -> impl IntoResponse {
///     format!("Hello, {}", identity.user)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<Identity>().cloned() {
            return Ok(CurrentUser(identity));
        }

        let app_state = AppState::from_ref(state);
        let identity =
            identity_from_headers(&parts.headers, &app_state.config.auth.session_secret)
                .ok_or_else(|| Redirect::to("/login").into_response())?;
        parts.extensions.insert(identity.clone());

        Ok(CurrentUser(identity))
    }
}

/// Optional current user extractor
///
/// Returns None if not authenticated, instead of redirecting.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Identity>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<Identity>().cloned() {
            return Ok(MaybeUser(Some(identity)));
        }

        let app_state = AppState::from_ref(state);
        let identity =
            identity_from_headers(&parts.headers, &app_state.config.auth.session_secret);

        if let Some(identity) = &identity {
            parts.extensions.insert(identity.clone());
        }

        Ok(MaybeUser(identity))
    }
}
