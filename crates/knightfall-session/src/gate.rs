//! Route gating on live membership.
//!
//! Only the live record decides access. A cached snapshot may be painting a
//! member's details while the fetch runs, but the gate answers `Loading`
//! until the ledger has spoken.

use crate::session::{Phase, SessionView};
use serde::Serialize;

/// Path every refused route redirects to.
pub const ROOT: &str = "/";

/// Pages of the keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Bastion,
    Commandry,
    InnerKeep,
    Vault,
    Library,
    Codex,
    GreatHall,
    MapRoom,
    Forgery,
    AlchemistsWing,
}

impl Route {
    pub const ALL: [Route; 10] = [
        Route::Bastion,
        Route::Commandry,
        Route::InnerKeep,
        Route::Vault,
        Route::Library,
        Route::Codex,
        Route::GreatHall,
        Route::MapRoom,
        Route::Forgery,
        Route::AlchemistsWing,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Route::Bastion => "/",
            Route::Commandry => "/commandry",
            Route::InnerKeep => "/theinnerkeep",
            Route::Vault => "/vault",
            Route::Library => "/library",
            Route::Codex => "/codex",
            Route::GreatHall => "/great-hall",
            Route::MapRoom => "/map-room",
            Route::Forgery => "/forgery",
            Route::AlchemistsWing => "/alchemists-wing",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|r| r.path() == path)
    }

    /// Whether the route needs live membership.
    pub fn is_protected(self) -> bool {
        !matches!(self, Route::Bastion | Route::Commandry)
    }
}

/// What the presentation layer should render for a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "target", rename_all = "snake_case")]
pub enum RouteDecision {
    /// Membership is still being checked.
    Loading,
    /// Render the requested view.
    Allow,
    /// Send the visitor elsewhere.
    Redirect(&'static str),
}

/// Decide what `path` resolves to for the current session.
pub fn resolve(path: &str, view: &SessionView) -> RouteDecision {
    let Some(route) = Route::from_path(path) else {
        return RouteDecision::Redirect(ROOT);
    };
    if !route.is_protected() {
        return RouteDecision::Allow;
    }
    match view.phase {
        Phase::Connecting => RouteDecision::Loading,
        Phase::Ready { member: true } if view.live_membership() == Some(true) => {
            RouteDecision::Allow
        }
        _ => RouteDecision::Redirect(ROOT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CachedSnapshot;
    use crate::record::MembershipRecord;
    use crate::types::Address;

    fn addr() -> Address {
        "0x0000000000000000000000000000000000000abc".parse().unwrap()
    }

    fn view(phase: Phase, record: Option<MembershipRecord>) -> SessionView {
        SessionView {
            phase,
            address: Some(addr()),
            record,
            ..SessionView::default()
        }
    }

    #[test]
    fn public_routes_always_allowed() {
        let v = SessionView::default();
        assert_eq!(resolve("/", &v), RouteDecision::Allow);
        assert_eq!(resolve("/commandry", &v), RouteDecision::Allow);
    }

    #[test]
    fn unknown_paths_redirect() {
        let v = view(Phase::Ready { member: true }, Some(MembershipRecord::member(addr(), None, None, None)));
        assert_eq!(resolve("/nowhere", &v), RouteDecision::Redirect(ROOT));
    }

    #[test]
    fn connecting_is_loading_even_with_cached_member() {
        let mut v = view(Phase::Connecting, None);
        v.provisional = Some(CachedSnapshot {
            address: addr(),
            is_member: true,
            token_id: None,
            category: None,
        });
        assert_eq!(resolve("/vault", &v), RouteDecision::Loading);
    }

    #[test]
    fn live_member_allowed_non_member_redirected() {
        let member = view(
            Phase::Ready { member: true },
            Some(MembershipRecord::member(addr(), None, None, None)),
        );
        assert_eq!(resolve("/map-room", &member), RouteDecision::Allow);

        let outsider = view(
            Phase::Ready { member: false },
            Some(MembershipRecord::non_member(addr())),
        );
        assert_eq!(resolve("/map-room", &outsider), RouteDecision::Redirect(ROOT));
    }

    #[test]
    fn error_and_disconnected_redirect() {
        assert_eq!(resolve("/codex", &view(Phase::Error, None)), RouteDecision::Redirect(ROOT));
        assert_eq!(
            resolve("/codex", &SessionView::default()),
            RouteDecision::Redirect(ROOT)
        );
    }

    #[test]
    fn every_route_path_roundtrips() {
        for route in Route::ALL {
            assert_eq!(Route::from_path(route.path()), Some(route));
        }
        assert_eq!(Route::ALL.iter().filter(|r| r.is_protected()).count(), 8);
    }
}
