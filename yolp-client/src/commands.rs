//! Write-side commands: restaurant creation and the session lifecycle.

use serde_json::Value;
use yolp_core::{
    ClientError, ClientResult, Identity, NewRestaurant, Restaurant, SignInRequest, SignUpRequest,
};
use yolp_sync::{KeyedCache, Mutation, MutationExecutor};

use crate::confirm::{ConfirmationGate, Prompt};
use crate::keys;
use crate::notifications::Notifications;
use crate::SharedGateway;

/// Prompt shown before signing out.
pub fn sign_out_prompt() -> Prompt {
    Prompt::new("Log Out", "Are you sure you want to log out?").destructive()
}

#[derive(Clone)]
pub struct Commands {
    executor: MutationExecutor<SharedGateway, Value>,
    gate: ConfirmationGate,
    notifications: Notifications,
}

impl Commands {
    pub fn new(
        gateway: SharedGateway,
        store: KeyedCache<Value>,
        gate: ConfirmationGate,
        notifications: Notifications,
    ) -> Self {
        Self {
            executor: MutationExecutor::new(gateway, store),
            gate,
            notifications,
        }
    }

    /// Validate and create a restaurant, then refresh the listing.
    ///
    /// Success is decided by the server's acknowledgement alone. The created
    /// restaurant is returned when the response body describes one.
    pub async fn add_restaurant(
        &self,
        restaurant: NewRestaurant,
    ) -> ClientResult<Option<Restaurant>> {
        let result = self.try_add_restaurant(restaurant).await;
        match &result {
            Ok(_) => self.notifications.success("Restaurant added"),
            Err(err) => self
                .notifications
                .error(err.user_message("Error adding restaurant")),
        }
        result
    }

    async fn try_add_restaurant(
        &self,
        restaurant: NewRestaurant,
    ) -> ClientResult<Option<Restaurant>> {
        let payload = restaurant.validate()?;
        let mutation = Mutation::post("/restaurants")
            .json(&payload)?
            .invalidates(keys::restaurants());
        let body = self.executor.execute(mutation).await?;
        match serde_json::from_value(body) {
            Ok(created) => Ok(Some(created)),
            Err(e) => {
                tracing::debug!(error = %e, "Created restaurant not described by response");
                Ok(None)
            }
        }
    }

    pub async fn sign_in(&self, request: SignInRequest) -> ClientResult<Identity> {
        let payload = request.validate().map_err(ClientError::from);
        let result = self.session_mutation("/auth/sign-in", payload).await;
        self.report_session(&result, "Signed in", "Error signing in");
        result
    }

    pub async fn sign_up(&self, request: SignUpRequest) -> ClientResult<Identity> {
        let payload = request.validate().map_err(ClientError::from);
        let result = self.session_mutation("/auth/sign-up", payload).await;
        self.report_session(&result, "Account created", "Error signing up");
        result
    }

    /// Ask for confirmation, then end the session.
    ///
    /// Returns `Ok(false)` when the user cancels; nothing is sent and the
    /// cache is left alone in that case.
    pub async fn sign_out(&self) -> ClientResult<bool> {
        let decision = self.gate.request(sign_out_prompt())?;
        if !decision.await {
            tracing::debug!("Sign-out cancelled");
            return Ok(false);
        }

        let mutation = Mutation::post("/auth/sign-out").invalidates(keys::identity());
        match self.executor.execute(mutation).await {
            Ok(_) => {
                self.notifications.success("Signed out");
                Ok(true)
            }
            Err(err) => {
                self.notifications.error(err.user_message("Error signing out"));
                Err(err)
            }
        }
    }

    async fn session_mutation<T: serde::Serialize>(
        &self,
        path: &str,
        payload: ClientResult<T>,
    ) -> ClientResult<Identity> {
        let mutation = Mutation::post(path)
            .json(&payload?)?
            .invalidates(keys::identity());
        let body = self.executor.execute(mutation).await?;
        Ok(Identity::from_value(&body))
    }

    fn report_session(&self, result: &ClientResult<Identity>, success: &str, fallback: &str) {
        match result {
            Ok(_) => self.notifications.success(success),
            Err(err) => self.notifications.error(err.user_message(fallback)),
        }
    }
}
