pub use crate::config::{ListenerPanic, StoreConfig};
pub use crate::error::StoreError;
pub use crate::shape::{Identical, Kind, Mergeable};
pub use crate::store::{Store, Update, WeakStore};
pub use crate::unsubscribe::Unsubscribe;
pub use crate::value::{Map, Value};
