//! Cache keys for the directory's server data.

use yolp_core::{CacheKey, RestaurantId};

/// The signed-in user, as reported by `GET /auth`.
pub fn identity() -> CacheKey {
    CacheKey::new("identity")
}

/// The restaurant listing. Also the prefix of any paginated listing key.
pub fn restaurants() -> CacheKey {
    CacheKey::new("restaurants")
}

pub fn restaurant(id: RestaurantId) -> CacheKey {
    CacheKey::new("restaurant").with(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_prefix_does_not_cover_details() {
        assert!(!restaurant(7).starts_with(&restaurants()));
        assert_eq!(restaurant(7).to_string(), "restaurant:7");
        assert_ne!(restaurant(7), restaurant(8));
    }
}
