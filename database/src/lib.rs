pub mod cache;
pub mod db;
pub mod errors;
pub mod stores;

pub use cache::BoundedCache;
pub use db::Database;
pub use errors::{DbError, DbResult};
