pub mod listener;
pub mod patch;

pub use listener::{ListenerHandle, ListenerSpec, Reconcile, ReloadFn, listen};
pub use patch::merge_record;
