pub mod db;
pub mod events;
pub mod memory;

pub use db::DbAdapter;
pub use events::SessionEvents;
pub use memory::MemoryAdapter;
