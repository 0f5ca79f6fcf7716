pub mod blob_store;
pub mod error;
pub mod exchange;
pub mod processor;
pub mod reaper;
pub mod staging;
pub mod token_store;
