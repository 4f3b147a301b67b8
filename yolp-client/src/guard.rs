//! Navigation guard driven by the identity cache entry.

use futures_util::future;
use futures_util::{Stream, StreamExt};
use serde_json::Value;
use tokio_stream::wrappers::WatchStream;
use yolp_core::Identity;
use yolp_sync::{CacheEntry, CacheStatus};

use crate::keys;
use crate::nav::Route;
use crate::queries::Queries;

/// Authentication state as far as navigation is concerned.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardState {
    /// The identity check has not resolved; render a placeholder and wait.
    Loading,
    Authenticated(Identity),
    Unauthenticated,
}

impl GuardState {
    pub fn classify(entry: &CacheEntry<Value>) -> Self {
        match entry.status() {
            CacheStatus::Idle | CacheStatus::Fetching | CacheStatus::Stale => Self::Loading,
            CacheStatus::Errored => Self::Unauthenticated,
            CacheStatus::Fresh => {
                let identity = entry
                    .value()
                    .map(|value| Identity::from_value(value))
                    .unwrap_or_default();
                if identity.is_present() {
                    Self::Authenticated(identity)
                } else {
                    Self::Unauthenticated
                }
            }
        }
    }

    pub fn decide(&self, route: Route) -> RouteDecision {
        match self {
            Self::Loading => RouteDecision::Wait,
            Self::Unauthenticated if route.is_protected() => RouteDecision::Redirect(Route::SignIn),
            Self::Authenticated(_) if route.is_public_only() => RouteDecision::Redirect(Route::Home),
            Self::Unauthenticated | Self::Authenticated(_) => RouteDecision::Render,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            Self::Loading | Self::Unauthenticated => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Wait,
    Render,
    Redirect(Route),
}

/// Gates routes on the identity check.
#[derive(Clone)]
pub struct AuthGuard {
    queries: Queries,
}

impl AuthGuard {
    pub fn new(queries: Queries) -> Self {
        Self { queries }
    }

    /// Current state, starting the identity fetch if it is due.
    pub fn state(&self) -> GuardState {
        GuardState::classify(&self.queries.identity())
    }

    pub fn evaluate(&self, route: Route) -> RouteDecision {
        let decision = self.state().decide(route);
        log_redirect(route, decision);
        decision
    }

    /// Wait for the identity check to resolve, then decide.
    pub async fn resolve(&self, route: Route) -> RouteDecision {
        let mut decisions = Box::pin(self.decisions(route));
        while let Some(decision) = decisions.next().await {
            if decision != RouteDecision::Wait {
                return decision;
            }
        }
        RouteDecision::Wait
    }

    /// Decisions for `route`, re-evaluated on every identity transition.
    ///
    /// Consecutive duplicates are skipped. When the identity is invalidated
    /// (sign-in, sign-out) the stream refetches it, yielding `Wait` and then
    /// the new decision.
    pub fn decisions(&self, route: Route) -> impl Stream<Item = RouteDecision> + Send + 'static {
        let queries = self.queries.clone();
        let entries = WatchStream::new(queries.store().subscribe(&keys::identity()));
        let mut last = None;
        entries.filter_map(move |entry| {
            if entry.status().needs_fetch() {
                queries.identity();
            }
            let decision = GuardState::classify(&entry).decide(route);
            let changed = last.replace(decision) != Some(decision);
            if changed {
                log_redirect(route, decision);
            }
            future::ready(changed.then_some(decision))
        })
    }
}

fn log_redirect(route: Route, decision: RouteDecision) {
    if let RouteDecision::Redirect(target) = decision {
        tracing::info!(from = %route.path(), to = %target.path(), "Redirecting");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use yolp_sync::KeyedCache;

    fn settled_entry(body: Value) -> CacheEntry<Value> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async move {
            let cache: KeyedCache<Value> = KeyedCache::default();
            cache.fetch(&keys::identity(), move || async move { Ok(body) }).await
        })
    }

    #[test]
    fn test_loading_never_redirects() {
        for route in [Route::SignIn, Route::SignUp, Route::Home, Route::Restaurant(3)] {
            assert_eq!(GuardState::Loading.decide(route), RouteDecision::Wait);
        }
    }

    #[test]
    fn test_decisions_by_state() {
        let identity = Identity::from_value(&json!({ "id": 1 }));
        let signed_in = GuardState::Authenticated(identity);
        assert_eq!(signed_in.decide(Route::Home), RouteDecision::Render);
        assert_eq!(signed_in.decide(Route::SignIn), RouteDecision::Redirect(Route::Home));

        let signed_out = GuardState::Unauthenticated;
        assert_eq!(signed_out.decide(Route::Restaurant(2)), RouteDecision::Redirect(Route::SignIn));
        assert_eq!(signed_out.decide(Route::SignUp), RouteDecision::Render);
    }

    proptest! {
        /// Only a settled, non-empty identity object authenticates.
        #[test]
        fn prop_classification_follows_identity_presence(
            body in yolp_test_utils::generators::arb_identity_body()
        ) {
            let present = Identity::from_value(&body).is_present();
            let state = GuardState::classify(&settled_entry(body));
            prop_assert_eq!(matches!(state, GuardState::Authenticated(_)), present);
            prop_assert_eq!(state == GuardState::Unauthenticated, !present);
        }
    }
}
