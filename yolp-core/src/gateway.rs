//! Request gateway contract.
//!
//! The gateway is the only way the client talks to the backend. It is an
//! opaque async function from `(method, path, body)` to a JSON body; the
//! HTTP implementation lives in `yolp-client` and tests substitute a mock.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::error::ClientResult;

/// HTTP methods the directory API uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Async transport to the directory backend.
///
/// Implementations map transport failures to `ClientError::Network` and
/// non-success responses to `ClientError::Http` carrying the server's
/// `message` field when one is present.
#[async_trait]
pub trait RequestGateway: Send + Sync {
    async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> ClientResult<Value>;
}

#[async_trait]
impl<G> RequestGateway for Arc<G>
where
    G: RequestGateway + ?Sized,
{
    async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> ClientResult<Value> {
        (**self).request(method, path, body).await
    }
}
