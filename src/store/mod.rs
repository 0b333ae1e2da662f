pub mod postgres;
pub mod tasks;
pub mod users;

pub use postgres::PgStore;
