pub mod live;
pub mod store;
pub mod summary;
