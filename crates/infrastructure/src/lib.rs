//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod failover_counter_store;
mod http_identity_provider;
mod in_memory_access_directory;
mod in_memory_counter_store;
mod postgres_access_repository;
mod postgres_counter_store;
mod redis_counter_store;

pub use failover_counter_store::FailoverCounterStore;
pub use http_identity_provider::HttpIdentityProvider;
pub use in_memory_access_directory::InMemoryAccessDirectory;
pub use in_memory_counter_store::InMemoryCounterStore;
pub use postgres_access_repository::PostgresAccessRepository;
pub use postgres_counter_store::PostgresCounterStore;
pub use redis_counter_store::RedisCounterStore;
