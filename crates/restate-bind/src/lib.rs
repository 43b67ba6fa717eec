//! # Binding stores to consumers
//!
//! `restate-bind` connects a [`Store`](restate_core::Store) to a
//! component-style rendering layer. A *consumer* is a render function mounted
//! on a [`Scheduler`]; it reads state through a [`UseStore`] hook and is
//! queued for re-render only when the slice it selected changes.
//!
//! ```rust
//! use restate_bind::*;
//! use restate_core::Value;
//! use serde_json::json;
//!
//! let use_app = create(|_| Value::from(json!({ "count": 0, "name": "x" })));
//! let scheduler = Scheduler::new();
//!
//! let name_view = scheduler.mount({
//!     let use_app = use_app.clone();
//!     move || use_app.select(|s| s.get("name").cloned())
//! });
//!
//! // Unrelated slice: nothing to re-render.
//! use_app.set_state(Value::from(json!({ "count": 1 })));
//! assert_eq!(scheduler.pending(), 0);
//!
//! use_app.set_state(Value::from(json!({ "name": "y" })));
//! assert_eq!(scheduler.flush(), 1);
//! assert_eq!(name_view.output(), Some(Value::from("y")));
//! ```
//!
//! ## Consistency
//!
//! `set_state` is synchronous. Each consumer's check re-reads the store when
//! it runs, so by the time `set_state` returns every subscribed consumer has
//! compared its selection against the newest state and none can be left
//! holding an older one. When to re-render is up to the host: the
//! `Scheduler` coalesces requests until `flush`.
//!
//! ## Lifecycle
//!
//! Subscriptions made by `select` are registered on the consumer's
//! [`Scope`] and released by [`Consumer::unmount`].
//!
//! ## Slots
//!
//! `remember` and `remember_with_key` give a consumer state that survives
//! re-renders. `remember` is order-based: the Nth call in a render always
//! refers to the Nth stored value; prefer `remember_with_key` across
//! conditional branches.

pub mod hook;
pub mod prelude;
pub mod runtime;
pub mod scheduler;
pub mod scope;
pub mod tests;

pub use hook::*;
pub use runtime::*;
pub use scheduler::*;
pub use scope::*;
