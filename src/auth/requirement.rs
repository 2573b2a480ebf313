//! Membership requirements
//!
//! A route's declared predicate over team names, evaluated per request
//! against the team snapshot carried in the session. Evaluation is
//! pure: no I/O, no network, just a set check.

use serde::{Deserialize, Serialize};

use super::session::Identity;

/// How the named teams combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    /// Every named team is required
    All,
    /// At least one named team suffices
    Any,
}

/// A set of team names plus a combinator, attached to a route at
/// router-composition time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRequirement {
    pub combinator: Combinator,
    pub teams: Vec<String>,
}

/// Outcome of evaluating a requirement for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    RedirectToLogin,
    Forbidden,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::RedirectToLogin => "redirect_to_login",
            Decision::Forbidden => "forbidden",
        }
    }
}

impl MembershipRequirement {
    pub fn all<I, S>(teams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            combinator: Combinator::All,
            teams: teams.into_iter().map(Into::into).collect(),
        }
    }

    pub fn any<I, S>(teams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            combinator: Combinator::Any,
            teams: teams.into_iter().map(Into::into).collect(),
        }
    }

    /// Any authenticated org member passes.
    pub fn authenticated() -> Self {
        Self::all(Vec::<String>::new())
    }

    /// Evaluate this requirement against an optional identity.
    ///
    /// Anonymous requests redirect to login regardless of the
    /// requirement; an empty requirement allows any authenticated
    /// identity.
    pub fn evaluate(&self, identity: Option<&Identity>) -> Decision {
        let Some(identity) = identity else {
            return Decision::RedirectToLogin;
        };

        if self.teams.is_empty() {
            return Decision::Allow;
        }

        let satisfied = match self.combinator {
            Combinator::All => self.teams.iter().all(|team| identity.has_team(team)),
            Combinator::Any => self.teams.iter().any(|team| identity.has_team(team)),
        };

        if satisfied {
            Decision::Allow
        } else {
            Decision::Forbidden
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_with_teams(teams: &[&str]) -> Identity {
        Identity::new(
            "alice".to_string(),
            teams.iter().map(ToString::to_string).collect(),
            3600,
        )
    }

    #[test]
    fn all_requires_every_team() {
        let identity = identity_with_teams(&["A", "B"]);

        let satisfied = MembershipRequirement::all(["A", "B"]);
        assert_eq!(satisfied.evaluate(Some(&identity)), Decision::Allow);

        let unsatisfied = MembershipRequirement::all(["A", "C"]);
        assert_eq!(unsatisfied.evaluate(Some(&identity)), Decision::Forbidden);
    }

    #[test]
    fn any_requires_at_least_one_team() {
        let identity = identity_with_teams(&["A", "B"]);

        let satisfied = MembershipRequirement::any(["C", "B"]);
        assert_eq!(satisfied.evaluate(Some(&identity)), Decision::Allow);

        let unsatisfied = MembershipRequirement::any(["C", "D"]);
        assert_eq!(unsatisfied.evaluate(Some(&identity)), Decision::Forbidden);
    }

    #[test]
    fn empty_requirement_allows_any_authenticated_identity() {
        let identity = identity_with_teams(&[]);
        let requirement = MembershipRequirement::authenticated();
        assert_eq!(requirement.evaluate(Some(&identity)), Decision::Allow);
    }

    #[test]
    fn absent_identity_redirects_regardless_of_requirement() {
        for requirement in [
            MembershipRequirement::authenticated(),
            MembershipRequirement::all(["A"]),
            MembershipRequirement::any(["A", "B"]),
        ] {
            assert_eq!(requirement.evaluate(None), Decision::RedirectToLogin);
        }
    }
}
