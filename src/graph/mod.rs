mod store;
mod types;

pub use store::GraphStore;
pub use types::*;
