pub mod api;
pub mod model;

pub use api::RpcApi;
pub use model::*;
