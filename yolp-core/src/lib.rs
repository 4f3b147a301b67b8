//! Yolp Core - Shared Types
//!
//! Data types shared by every other crate in the workspace: the domain
//! entities exchanged with the directory backend, the structured cache key,
//! the client error taxonomy and the request gateway contract.

pub mod entities;
pub mod error;
pub mod gateway;
pub mod key;

pub use entities::{Identity, NewRestaurant, Restaurant, RestaurantId, SignInRequest, SignUpRequest};
pub use error::{ClientError, ClientResult, ValidationError};
pub use gateway::{Method, RequestGateway};
pub use key::CacheKey;
