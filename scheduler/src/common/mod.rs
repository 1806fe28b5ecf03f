pub mod context;
pub mod id;

pub use context::RequestContext;
pub use id::Id;
