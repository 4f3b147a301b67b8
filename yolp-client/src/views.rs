//! View state derived from cache entries.

use serde_json::Value;
use yolp_core::Restaurant;
use yolp_sync::{CacheEntry, CacheStatus};

pub const NO_RESTAURANTS: &str = "No restaurants found";
pub const NO_RESTAURANT: &str = "No restaurant found";

/// What the restaurant listing page shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestaurantListView {
    Loading,
    Empty,
    Ready(Vec<Restaurant>),
}

impl RestaurantListView {
    /// Derive the view from the listing entry. A previous value keeps being
    /// shown while a refetch is in flight.
    pub fn from_entry(entry: &CacheEntry<Value>) -> Self {
        match entry.value() {
            Some(value) => match serde_json::from_value::<Vec<Restaurant>>(Value::clone(value)) {
                Ok(restaurants) if restaurants.is_empty() => Self::Empty,
                Ok(restaurants) => Self::Ready(restaurants),
                Err(err) => {
                    tracing::warn!(key = %entry.key(), error = %err, "Malformed restaurant listing");
                    Self::Empty
                }
            },
            None if entry.status() == CacheStatus::Errored => Self::Empty,
            None => Self::Loading,
        }
    }

    pub fn lines(&self) -> Vec<String> {
        match self {
            Self::Loading => vec!["Loading...".to_string()],
            Self::Empty => vec![NO_RESTAURANTS.to_string()],
            Self::Ready(restaurants) => restaurants.iter().map(summary_line).collect(),
        }
    }
}

/// What the restaurant detail page shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestaurantDetailView {
    Loading,
    Missing,
    Ready(Restaurant),
}

impl RestaurantDetailView {
    pub fn from_entry(entry: &CacheEntry<Value>) -> Self {
        match entry.value() {
            Some(value) if value.is_null() => Self::Missing,
            Some(value) => serde_json::from_value(Value::clone(value))
                .map(Self::Ready)
                .unwrap_or(Self::Missing),
            None if entry.status() == CacheStatus::Errored => Self::Missing,
            None => Self::Loading,
        }
    }

    pub fn lines(&self) -> Vec<String> {
        match self {
            Self::Loading => vec!["Loading...".to_string()],
            Self::Missing => vec![NO_RESTAURANT.to_string()],
            Self::Ready(restaurant) => {
                let mut lines = vec![format!("{} (#{})", restaurant.name, restaurant.id)];
                let fields = [
                    ("Description", &restaurant.description),
                    ("Address", &restaurant.address),
                    ("Phone", &restaurant.phone),
                    ("Image", &restaurant.image_url),
                ];
                for (label, value) in fields {
                    if let Some(value) = value {
                        lines.push(format!("  {label}: {value}"));
                    }
                }
                lines
            }
        }
    }
}

fn summary_line(restaurant: &Restaurant) -> String {
    match &restaurant.address {
        Some(address) => format!("#{:<4} {} - {}", restaurant.id, restaurant.name, address),
        None => format!("#{:<4} {}", restaurant.id, restaurant.name),
    }
}
