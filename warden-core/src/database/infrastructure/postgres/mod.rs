mod users;

pub use users::{PostgresUserStore, PostgresUserUnitOfWork};
