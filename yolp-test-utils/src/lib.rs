//! Yolp Test Utilities
//!
//! Centralized test infrastructure for the Yolp workspace:
//! - Scripted and stateful request gateways
//! - Proptest generators for domain types and cache keys
//! - Test fixtures for common scenarios
//! - Custom assertions for client errors

pub use yolp_core::{
    CacheKey, ClientError, ClientResult, Identity, Method, NewRestaurant, RequestGateway,
    Restaurant, RestaurantId, SignInRequest, SignUpRequest, ValidationError,
};

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// A request observed by one of the test gateways.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

fn count_calls(calls: &[RecordedCall], method: Method, path: &str) -> usize {
    calls
        .iter()
        .filter(|call| call.method == method && call.path == path)
        .count()
}

// ============================================================================
// SCRIPTED GATEWAY
// ============================================================================

#[derive(Default)]
struct Script {
    once: VecDeque<ClientResult<Value>>,
    always: Option<ClientResult<Value>>,
}

/// Gateway answering from scripted responses.
///
/// One-shot responses are consumed first, in order; after that the sticky
/// response (if any) answers every call. Unscripted routes fail with 404.
#[derive(Default)]
pub struct MockGateway {
    scripts: Mutex<HashMap<(Method, String), Script>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every call to `method path` with `response`.
    pub fn on(&self, method: Method, path: &str, response: ClientResult<Value>) -> &Self {
        lock(&self.scripts)
            .entry((method, path.to_string()))
            .or_default()
            .always = Some(response);
        self
    }

    /// Answer the next call to `method path` with `response`.
    pub fn once(&self, method: Method, path: &str, response: ClientResult<Value>) -> &Self {
        lock(&self.scripts)
            .entry((method, path.to_string()))
            .or_default()
            .once
            .push_back(response);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self, method: Method, path: &str) -> usize {
        count_calls(&lock(&self.calls), method, path)
    }
}

#[async_trait]
impl RequestGateway for MockGateway {
    async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> ClientResult<Value> {
        lock(&self.calls).push(RecordedCall {
            method,
            path: path.to_string(),
            body: body.cloned(),
        });

        let mut scripts = lock(&self.scripts);
        let Some(script) = scripts.get_mut(&(method, path.to_string())) else {
            return Err(ClientError::http(404, format!("no mock response for {method} {path}")));
        };
        match script.once.pop_front() {
            Some(response) => response,
            None => script
                .always
                .clone()
                .unwrap_or_else(|| Err(ClientError::http(404, format!("no mock response for {method} {path}")))),
        }
    }
}

// ============================================================================
// IN-MEMORY DIRECTORY BACKEND
// ============================================================================

#[derive(Debug, Clone)]
struct Account {
    id: u64,
    name: String,
    email: String,
    password: String,
}

impl Account {
    fn to_json(&self) -> Value {
        json!({ "id": self.id, "name": self.name, "email": self.email })
    }
}

#[derive(Default)]
struct DirectoryState {
    accounts: Vec<Account>,
    session: Option<u64>,
    restaurants: Vec<Restaurant>,
    next_restaurant_id: RestaurantId,
    calls: Vec<RecordedCall>,
    fail_next: VecDeque<ClientError>,
}

/// In-memory stand-in for the directory backend.
///
/// Implements the same endpoints as the real API with cookie-like session
/// state, so end-to-end flows can run without a server.
#[derive(Default)]
pub struct FakeDirectory {
    state: Mutex<DirectoryState>,
}

fn unauthorized() -> ClientError {
    ClientError::http(401, "Unauthorized")
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account without signing in.
    pub fn with_account(self, name: &str, email: &str, password: &str) -> Self {
        {
            let mut state = lock(&self.state);
            let id = state.accounts.len() as u64 + 1;
            state.accounts.push(Account {
                id,
                name: name.to_string(),
                email: email.to_string(),
                password: password.to_string(),
            });
        }
        self
    }

    /// Register an account and start a session for it.
    pub fn signed_in_as(self, name: &str, email: &str) -> Self {
        let directory = self.with_account(name, email, "password");
        {
            let mut state = lock(&directory.state);
            state.session = state.accounts.last().map(|account| account.id);
        }
        directory
    }

    pub fn with_restaurant(self, name: &str) -> Self {
        {
            let mut state = lock(&self.state);
            state.next_restaurant_id += 1;
            let id = state.next_restaurant_id;
            state.restaurants.push(fixtures::restaurant(id, name));
        }
        self
    }

    /// Make the next request fail with `err`, whatever it is.
    pub fn fail_next(&self, err: ClientError) {
        lock(&self.state).fail_next.push_back(err);
    }

    pub fn is_signed_in(&self) -> bool {
        lock(&self.state).session.is_some()
    }

    pub fn restaurants(&self) -> Vec<Restaurant> {
        lock(&self.state).restaurants.clone()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.state).calls.clone()
    }

    pub fn call_count(&self, method: Method, path: &str) -> usize {
        count_calls(&lock(&self.state).calls, method, path)
    }

    fn handle(state: &mut DirectoryState, method: Method, path: &str, body: Option<&Value>) -> ClientResult<Value> {
        let current = state
            .session
            .and_then(|id| state.accounts.iter().find(|account| account.id == id))
            .cloned();

        match (method, path) {
            (Method::Get, "/auth") => current.map(|account| account.to_json()).ok_or_else(unauthorized),
            (Method::Post, "/auth/sign-in") => {
                let request: SignInRequest = serde_json::from_value(body.cloned().unwrap_or(Value::Null))?;
                let account = state
                    .accounts
                    .iter()
                    .find(|a| a.email == request.email && a.password == request.password)
                    .cloned()
                    .ok_or_else(|| ClientError::http(401, "Invalid email or password"))?;
                state.session = Some(account.id);
                Ok(account.to_json())
            }
            (Method::Post, "/auth/sign-up") => {
                let request: SignUpRequest = serde_json::from_value(body.cloned().unwrap_or(Value::Null))?;
                if state.accounts.iter().any(|a| a.email == request.email) {
                    return Err(ClientError::http(409, "Email already registered"));
                }
                let account = Account {
                    id: state.accounts.len() as u64 + 1,
                    name: request.name,
                    email: request.email,
                    password: request.password,
                };
                state.session = Some(account.id);
                state.accounts.push(account.clone());
                Ok(account.to_json())
            }
            (Method::Post, "/auth/sign-out") => {
                state.session = None;
                Ok(json!({ "message": "Signed out" }))
            }
            (Method::Get, "/restaurants") => {
                current.ok_or_else(unauthorized)?;
                Ok(serde_json::to_value(&state.restaurants)?)
            }
            (Method::Post, "/restaurants") => {
                current.ok_or_else(unauthorized)?;
                let request: NewRestaurant = serde_json::from_value(body.cloned().unwrap_or(Value::Null))?;
                if request.name.trim().is_empty() {
                    return Err(ClientError::http(400, "Name is required"));
                }
                state.next_restaurant_id += 1;
                let restaurant = Restaurant {
                    id: state.next_restaurant_id,
                    name: request.name,
                    description: request.description,
                    image_url: request.image_url,
                    address: request.address,
                    phone: request.phone,
                };
                state.restaurants.push(restaurant.clone());
                Ok(serde_json::to_value(restaurant)?)
            }
            (Method::Get, _) if path.starts_with("/restaurants/") => {
                current.ok_or_else(unauthorized)?;
                let id: RestaurantId = path["/restaurants/".len()..]
                    .parse()
                    .map_err(|_| ClientError::http(400, "Invalid restaurant id"))?;
                state
                    .restaurants
                    .iter()
                    .find(|r| r.id == id)
                    .map(serde_json::to_value)
                    .transpose()?
                    .ok_or_else(|| ClientError::http(404, "Restaurant not found"))
            }
            _ => Err(ClientError::http(404, format!("Cannot {method} {path}"))),
        }
    }
}

#[async_trait]
impl RequestGateway for FakeDirectory {
    async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> ClientResult<Value> {
        let mut state = lock(&self.state);
        state.calls.push(RecordedCall {
            method,
            path: path.to_string(),
            body: body.cloned(),
        });
        if let Some(err) = state.fail_next.pop_front() {
            return Err(err);
        }
        Self::handle(&mut state, method, path, body)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating Yolp types.

    use super::*;
    use proptest::prelude::*;

    /// Generate a cache key of one to four short tokens.
    pub fn arb_cache_key() -> impl Strategy<Value = CacheKey> {
        prop::collection::vec("[a-z0-9]{1,8}", 1..4).prop_map(CacheKey::from_tokens)
    }

    fn arb_optional_text() -> impl Strategy<Value = Option<String>> {
        prop::option::of("[A-Za-z0-9 ]{1,24}")
    }

    /// Generate a restaurant with a non-blank name.
    pub fn arb_restaurant() -> impl Strategy<Value = Restaurant> {
        (
            1u64..100_000,
            "[A-Z][a-z]{2,12}( [A-Z][a-z]{2,12})?",
            arb_optional_text(),
            arb_optional_text(),
            arb_optional_text(),
            arb_optional_text(),
        )
            .prop_map(|(id, name, description, image_url, address, phone)| Restaurant {
                id,
                name,
                description,
                image_url,
                address,
                phone,
            })
    }

    /// Generate a valid creation payload.
    pub fn arb_new_restaurant() -> impl Strategy<Value = NewRestaurant> {
        ("[A-Z][a-z]{2,12}", arb_optional_text(), arb_optional_text()).prop_map(
            |(name, description, address)| NewRestaurant {
                name,
                description,
                address,
                ..Default::default()
            },
        )
    }

    /// Generate an identity response body: present or one of the absent shapes.
    pub fn arb_identity_body() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            Just(json!({})),
            (1u64..1000, "[a-z]{3,8}").prop_map(|(id, user)| json!({
                "id": id,
                "email": format!("{user}@example.com"),
            })),
        ]
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Canned values for common scenarios.

    use super::*;

    pub fn restaurant(id: RestaurantId, name: &str) -> Restaurant {
        Restaurant {
            id,
            name: name.to_string(),
            description: None,
            image_url: None,
            address: None,
            phone: None,
        }
    }

    pub fn identity_body() -> Value {
        json!({ "id": 1, "name": "Ana", "email": "ana@example.com" })
    }

    pub fn restaurants_body(names: &[&str]) -> Value {
        let restaurants: Vec<Restaurant> = names
            .iter()
            .enumerate()
            .map(|(i, name)| restaurant(i as u64 + 1, name))
            .collect();
        json!(restaurants)
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for client results.

    use super::*;

    pub fn assert_http_error<T: std::fmt::Debug>(result: &ClientResult<T>, expected_status: u16) {
        match result {
            Err(ClientError::Http { status, .. }) => assert_eq!(
                *status, expected_status,
                "Expected HTTP {}, got HTTP {}",
                expected_status, status
            ),
            other => panic!("Expected HTTP {} error, got {:?}", expected_status, other),
        }
    }

    pub fn assert_validation_error<T: std::fmt::Debug>(result: &ClientResult<T>) {
        assert!(
            matches!(result, Err(ClientError::Validation(_))),
            "Expected validation error, got {:?}",
            result
        );
    }

    pub fn assert_confirmation_conflict<T: std::fmt::Debug>(result: &ClientResult<T>) {
        assert!(
            matches!(result, Err(ClientError::ConfirmationConflict)),
            "Expected confirmation conflict, got {:?}",
            result
        );
    }
}
