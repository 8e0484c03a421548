//! Persistence layer.
//!
//! Application code talks to the [`ports::users::UserStore`] port only.
//! Adapters live under [`infrastructure`].

pub mod infrastructure;
pub mod ports;

pub use infrastructure::memory::InMemoryUserStore;
#[cfg(feature = "database")]
pub use infrastructure::postgres::PostgresUserStore;
pub use ports::users::{UserStore, UserUnitOfWork};
