//! GitHub OAuth authentication and membership authorization
//!
//! Handles:
//! - CSRF state lifecycle (single-use tokens over the shared store)
//! - GitHub OAuth flow and membership lookups
//! - Session management
//! - Route gating on team membership requirements

pub mod github;
pub mod membership;
mod middleware;
pub mod requirement;
mod routes;
pub mod session;
pub mod state;

pub use github::GitHubClient;
pub use membership::{TeamDirectory, TeamRoster};
pub use middleware::{CurrentUser, MaybeUser, require_membership};
pub use requirement::{Combinator, Decision, MembershipRequirement};
pub use routes::auth_router;
pub use session::{Identity, create_session_token, verify_session_token};
pub use state::CsrfStore;
