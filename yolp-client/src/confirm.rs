//! Confirmation gate: lets imperative code await a user decision.
//!
//! A caller registers a [`Prompt`] with [`ConfirmationGate::request`] and
//! awaits the returned [`Decision`]. Whatever renders prompts (a dialog, the
//! CLI's stdin reader) watches [`ConfirmationGate::subscribe`] and answers
//! through [`ConfirmationGate::surface`].
//!
//! At most one confirmation is outstanding per gate. Pending decisions
//! resolve to `false` on [`ConfirmationGate::teardown`] and when the last
//! gate handle is dropped; there is no timeout.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use tokio::sync::{oneshot, watch};
use yolp_core::{ClientError, ClientResult};

/// What the decision surface shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub title: String,
    pub description: String,
    pub destructive: bool,
}

impl Prompt {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            destructive: false,
        }
    }

    pub fn destructive(mut self) -> Self {
        self.destructive = true;
        self
    }
}

struct PendingConfirmation {
    id: u64,
    prompt: Prompt,
    resolver: oneshot::Sender<bool>,
}

struct Inner {
    slot: Mutex<Option<PendingConfirmation>>,
    prompts: watch::Sender<Option<Prompt>>,
    next_id: AtomicU64,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Option<PendingConfirmation>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve the pending confirmation if there is one and, when `only` is
    /// set, it is that confirmation.
    fn resolve(&self, only: Option<u64>, confirmed: bool) -> bool {
        let pending = {
            let mut slot = self.lock();
            match slot.as_ref() {
                Some(pending) if only.map_or(true, |id| id == pending.id) => slot.take(),
                _ => None,
            }
        };
        let Some(pending) = pending else {
            return false;
        };

        self.prompts.send_replace(None);
        // The requester may have stopped waiting; the slot is cleared either way.
        let _ = pending.resolver.send(confirmed);
        tracing::debug!(
            title = %pending.prompt.title,
            confirmed,
            "Confirmation resolved"
        );
        true
    }
}

/// Cloneable handle to a confirmation slot.
#[derive(Clone)]
pub struct ConfirmationGate {
    inner: Arc<Inner>,
}

impl Default for ConfirmationGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfirmationGate {
    pub fn new() -> Self {
        let (prompts, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                slot: Mutex::new(None),
                prompts,
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register a confirmation and return the decision to await.
    ///
    /// The prompt is visible to surfaces as soon as this returns. Fails with
    /// `ConfirmationConflict` if another confirmation is still outstanding;
    /// that one is left untouched.
    pub fn request(&self, prompt: Prompt) -> ClientResult<Decision> {
        let mut slot = self.inner.lock();
        if let Some(pending) = slot.as_ref() {
            tracing::warn!(
                pending = %pending.prompt.title,
                requested = %prompt.title,
                "Confirmation already pending"
            );
            return Err(ClientError::ConfirmationConflict);
        }

        let (resolver, receiver) = oneshot::channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(title = %prompt.title, id, "Confirmation requested");
        self.inner.prompts.send_replace(Some(prompt.clone()));
        *slot = Some(PendingConfirmation {
            id,
            prompt,
            resolver,
        });
        Ok(Decision { receiver })
    }

    /// Resolve the pending confirmation with `true`.
    ///
    /// Returns false if nothing was pending.
    pub fn confirm(&self) -> bool {
        self.inner.resolve(None, true)
    }

    /// Resolve the pending confirmation with `false`.
    ///
    /// Returns false if nothing was pending.
    pub fn cancel(&self) -> bool {
        self.inner.resolve(None, false)
    }

    pub fn pending(&self) -> Option<Prompt> {
        self.inner.lock().as_ref().map(|pending| pending.prompt.clone())
    }

    pub fn is_pending(&self) -> bool {
        self.inner.lock().is_some()
    }

    /// Watch the prompt to display; `None` when nothing is pending.
    pub fn subscribe(&self) -> watch::Receiver<Option<Prompt>> {
        self.inner.prompts.subscribe()
    }

    /// Take the answering side of the confirmation pending right now.
    ///
    /// The surface only ever resolves that confirmation, never a later one.
    pub fn surface(&self) -> Option<ConfirmationSurface> {
        let slot = self.inner.lock();
        slot.as_ref().map(|pending| ConfirmationSurface {
            gate: self.clone(),
            id: pending.id,
            prompt: pending.prompt.clone(),
            answered: false,
        })
    }

    /// Resolve any outstanding confirmation to `false`.
    pub fn teardown(&self) {
        if self.inner.resolve(None, false) {
            tracing::debug!("Pending confirmation cancelled on teardown");
        }
    }
}

/// A user decision that has not been made yet.
///
/// Resolves to `true` on confirm, and to `false` on cancel, teardown or when
/// the gate goes away.
#[must_use = "a decision does nothing unless awaited"]
#[derive(Debug)]
pub struct Decision {
    receiver: oneshot::Receiver<bool>,
}

impl Future for Decision {
    type Output = bool;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.unwrap_or(false))
    }
}

/// Answering side of one pending confirmation.
///
/// Dropping it without answering cancels the confirmation.
pub struct ConfirmationSurface {
    gate: ConfirmationGate,
    id: u64,
    prompt: Prompt,
    answered: bool,
}

impl ConfirmationSurface {
    pub fn prompt(&self) -> &Prompt {
        &self.prompt
    }

    pub fn confirm(mut self) -> bool {
        self.answered = true;
        self.gate.inner.resolve(Some(self.id), true)
    }

    pub fn cancel(mut self) -> bool {
        self.answered = true;
        self.gate.inner.resolve(Some(self.id), false)
    }
}

impl Drop for ConfirmationSurface {
    fn drop(&mut self) {
        if !self.answered {
            self.gate.inner.resolve(Some(self.id), false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt() -> Prompt {
        Prompt::new("Log Out", "Are you sure you want to log out?").destructive()
    }

    #[tokio::test]
    async fn test_confirm_resolves_true_and_clears_slot() {
        let gate = ConfirmationGate::new();
        let decision = gate.request(prompt()).unwrap();
        assert_eq!(gate.pending(), Some(prompt()));

        assert!(gate.confirm());
        assert!(decision.await);
        assert!(gate.pending().is_none());
        assert!(!gate.confirm());
    }

    #[tokio::test]
    async fn test_cancel_resolves_false() {
        let gate = ConfirmationGate::new();
        let decision = gate.request(prompt()).unwrap();
        assert!(gate.cancel());
        assert!(!decision.await);
        assert!(!gate.is_pending());
    }

    #[tokio::test]
    async fn test_second_request_conflicts_without_disturbing_first() {
        let gate = ConfirmationGate::new();
        let first = gate.request(prompt()).unwrap();

        let second = gate.request(Prompt::new("Other", "Second prompt"));
        assert!(matches!(second, Err(ClientError::ConfirmationConflict)));
        assert_eq!(gate.pending(), Some(prompt()));

        gate.confirm();
        assert!(first.await);
    }

    #[tokio::test]
    async fn test_dropping_surface_cancels() {
        let gate = ConfirmationGate::new();
        let decision = gate.request(prompt()).unwrap();
        let surface = gate.surface().unwrap();
        assert_eq!(surface.prompt().title, "Log Out");

        drop(surface);
        assert!(!decision.await);
    }

    #[tokio::test]
    async fn test_stale_surface_does_not_answer_next_prompt() {
        let gate = ConfirmationGate::new();
        let first = gate.request(prompt()).unwrap();
        let stale = gate.surface().unwrap();
        gate.cancel();
        assert!(!first.await);

        let second = gate.request(prompt()).unwrap();
        assert!(!stale.confirm());
        assert!(gate.is_pending());
        gate.surface().unwrap().confirm();
        assert!(second.await);
    }

    #[tokio::test]
    async fn test_teardown_and_drop_resolve_false() {
        let gate = ConfirmationGate::new();
        let decision = gate.request(prompt()).unwrap();
        gate.teardown();
        assert!(!decision.await);

        let gate = ConfirmationGate::new();
        let decision = gate.request(prompt()).unwrap();
        drop(gate);
        assert!(!decision.await);
    }

    #[tokio::test]
    async fn test_subscribers_see_prompt_lifecycle() {
        let gate = ConfirmationGate::new();
        let mut prompts = gate.subscribe();
        assert!(prompts.borrow_and_update().is_none());

        let decision = gate.request(prompt()).unwrap();
        prompts.changed().await.unwrap();
        assert_eq!(*prompts.borrow_and_update(), Some(prompt()));

        gate.confirm();
        prompts.changed().await.unwrap();
        assert!(prompts.borrow().is_none());
        assert!(decision.await);
    }
}
