pub mod common;

pub use common::{common_routes, common_routes_with_ready};
