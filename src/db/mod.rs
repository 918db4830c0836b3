//! User record store: capability trait, PostgreSQL and in-process implementations.

mod memory;
mod pool;
mod repositories;
mod store;

pub use memory::InMemoryUserStore;
pub use pool::{create_pool, run_migrations, DbPool};
pub use repositories::PgUserStore;
pub use store::UserStore;
