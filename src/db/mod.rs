pub mod entities;
pub mod enums;
pub mod memory;
pub mod models;
pub mod services;
pub mod store;

pub use memory::MemoryStore;
pub use services::SeaOrmStore;
pub use store::{MonitorStore, StoreError};
