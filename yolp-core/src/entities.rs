//! Domain entities exchanged with the directory backend.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

pub type RestaurantId = u64;

// ============================================================================
// RESTAURANTS
// ============================================================================

/// A restaurant listed in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    pub id: RestaurantId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Payload for creating a restaurant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRestaurant {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl NewRestaurant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Check the form and return the normalized payload.
    ///
    /// The name must be non-blank. Blank optional fields are dropped so they
    /// are not sent as empty strings.
    pub fn validate(self) -> Result<Self, ValidationError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::required("name"));
        }
        Ok(Self {
            name,
            description: non_blank(self.description),
            image_url: non_blank(self.image_url),
            address: non_blank(self.address),
            phone: non_blank(self.phone),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ============================================================================
// AUTHENTICATION
// ============================================================================

/// The signed-in user as reported by `GET /auth`.
///
/// Absence is a normal terminal state (signed out, expired session, failed
/// lookup) and is distinct from "not loaded yet", which is tracked by the
/// cache entry status rather than here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Identity {
    attributes: Option<Map<String, Value>>,
}

impl Identity {
    pub fn absent() -> Self {
        Self::default()
    }

    /// Interpret a response body. Only a non-empty JSON object is a present
    /// identity; `null`, `{}` and any other shape count as absent.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) if !map.is_empty() => Self {
                attributes: Some(map.clone()),
            },
            _ => Self::absent(),
        }
    }

    pub fn is_present(&self) -> bool {
        self.attributes.is_some()
    }

    pub fn attributes(&self) -> Option<&Map<String, Value>> {
        self.attributes.as_ref()
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.as_ref().and_then(|attrs| attrs.get(name))
    }

    pub fn email(&self) -> Option<&str> {
        self.attribute("email").and_then(Value::as_str)
    }

    /// Name to show in the navbar: the user's name, else their email.
    pub fn display_name(&self) -> Option<&str> {
        self.attribute("name")
            .and_then(Value::as_str)
            .filter(|name| !name.trim().is_empty())
            .or_else(|| self.email())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

impl SignInRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(self) -> Result<Self, ValidationError> {
        let email = validate_email(&self.email)?;
        if self.password.is_empty() {
            return Err(ValidationError::required("password"));
        }
        Ok(Self {
            email,
            password: self.password,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl SignUpRequest {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(self) -> Result<Self, ValidationError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::required("name"));
        }
        let email = validate_email(&self.email)?;
        if self.password.is_empty() {
            return Err(ValidationError::required("password"));
        }
        Ok(Self {
            name,
            email,
            password: self.password,
        })
    }
}

fn validate_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::required("email"));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email.to_string()),
        _ => Err(ValidationError::invalid("email", "must be an email address")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_restaurant_wire_format() {
        let restaurant: Restaurant = serde_json::from_value(json!({
            "id": 4,
            "name": "Cafe X",
            "imageUrl": "https://img.example/cafe.png"
        }))
        .unwrap();
        assert_eq!(restaurant.id, 4);
        assert_eq!(restaurant.image_url.as_deref(), Some("https://img.example/cafe.png"));
        assert!(restaurant.phone.is_none());
    }

    #[test]
    fn test_new_restaurant_requires_name() {
        let err = NewRestaurant::new("   ").validate().unwrap_err();
        assert_eq!(err, ValidationError::required("name"));
    }

    #[test]
    fn test_new_restaurant_drops_blank_optionals() {
        let payload = NewRestaurant::new(" Cafe X ")
            .with_description("")
            .with_phone(" 555-0100 ")
            .validate()
            .unwrap();
        assert_eq!(payload.name, "Cafe X");
        assert!(payload.description.is_none());
        assert_eq!(payload.phone.as_deref(), Some("555-0100"));

        let body = serde_json::to_value(&payload).unwrap();
        assert_eq!(body, json!({ "name": "Cafe X", "phone": "555-0100" }));
    }

    #[test]
    fn test_identity_presence() {
        assert!(!Identity::from_value(&Value::Null).is_present());
        assert!(!Identity::from_value(&json!({})).is_present());
        assert!(!Identity::from_value(&json!("user")).is_present());

        let identity = Identity::from_value(&json!({ "id": 1, "email": "ana@example.com" }));
        assert!(identity.is_present());
        assert_eq!(identity.display_name(), Some("ana@example.com"));
    }

    #[test]
    fn test_sign_in_validation() {
        assert!(SignInRequest::new("ana@example.com", "pw").validate().is_ok());
        assert_eq!(
            SignInRequest::new("", "pw").validate().unwrap_err(),
            ValidationError::required("email")
        );
        assert!(matches!(
            SignInRequest::new("ana", "pw").validate().unwrap_err(),
            ValidationError::InvalidValue { .. }
        ));
        assert_eq!(
            SignInRequest::new("ana@example.com", "").validate().unwrap_err(),
            ValidationError::required("password")
        );
    }

    #[test]
    fn test_sign_up_validation() {
        assert!(SignUpRequest::new("Ana", "ana@example.com", "pw").validate().is_ok());
        assert_eq!(
            SignUpRequest::new(" ", "ana@example.com", "pw").validate().unwrap_err(),
            ValidationError::required("name")
        );
    }
}
