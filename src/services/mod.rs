// Service exports
pub mod cache;
pub mod geocoding;
pub mod memory;
pub mod postgres;
pub mod registration;
pub mod store;

pub use cache::{CacheError, CacheKey, CacheManager};
pub use geocoding::{GeocodingClient, GeocodingError, ReverseGeocoder};
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use registration::{LocationInput, ProfileError, ProfileService};
pub use store::{ProfileStore, StoreError};
