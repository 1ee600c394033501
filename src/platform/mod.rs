pub mod avatar;
pub mod connectivity;
pub mod storage;
pub mod theme;

pub use connectivity::NetworkStatus;
pub use storage::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore, StorageError};
pub use theme::{Theme, ThemeState};
