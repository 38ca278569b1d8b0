pub mod memory;
pub mod postgres;
pub mod redis;

pub use self::memory::{InMemoryProfileStore, InMemorySnapshotStore};
pub use self::postgres::{create_pool, run_migrations, PgProfileStore};
pub use self::redis::{create_redis_client, Cache, CacheKey, RedisSnapshotStore};
