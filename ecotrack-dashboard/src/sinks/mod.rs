pub mod store;

pub use store::StoreSink;
