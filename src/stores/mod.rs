pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod store;
pub mod unreachable;
