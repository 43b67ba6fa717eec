pub use crate::hook::{UseStore, create, create_with_config, try_create};
pub use crate::runtime::{ConsumerContext, current_consumer, remember, remember_with_key};
pub use crate::scheduler::{Consumer, ConsumerId, Scheduler};
pub use crate::scope::{Scope, current_scope, scoped_effect};
pub use restate_core::prelude::*;
