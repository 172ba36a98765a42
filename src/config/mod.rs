pub mod types;
pub mod defaults;
pub mod resolver;
pub mod loader;

pub use types::*;
pub use defaults::*;
pub use resolver::*;
