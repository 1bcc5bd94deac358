pub mod cancel;
pub mod lifecycle;
pub mod page;
pub mod populate;
pub mod predicate;
pub mod query;
pub mod store;

mod engine;
mod service;


pub use engine::{Engine, EngineBuilder};
pub use service::DocumentService;
