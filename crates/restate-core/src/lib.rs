//! # Stores, shapes and listeners
//!
//! Restate keeps application state in a small observable container. There
//! are three pieces:
//!
//! - `Store<S>`: holds the current and initial state plus its listeners.
//! - `Mergeable` / `Kind`: decide whether an update merges or replaces.
//! - `Identical`: reference identity, used to skip no-op updates.
//!
//! ## Creating a store
//!
//! The initializer runs once and returns the initial state. State and the
//! actions that change it live together; actions are plain functions that
//! take the store explicitly:
//!
//! ```rust
//! use restate_core::*;
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Counter {
//!     count: i64,
//! }
//!
//! impl Mergeable for Counter {
//!     fn kind(&self) -> Kind {
//!         Kind::Map
//!     }
//!     // Every field is always present, so the patch wins outright.
//!     fn merge(&self, patch: &Self) -> Self {
//!         patch.clone()
//!     }
//! }
//!
//! impl Counter {
//!     fn increment(store: &Store<Counter>) {
//!         store.set_state_with(|s| Counter { count: s.count + 1 });
//!     }
//! }
//!
//! let store = Store::create(|_| Counter { count: 0 });
//! Counter::increment(&store);
//! assert_eq!(store.get_state().count, 1);
//! assert_eq!(store.get_initial_state().count, 0);
//! ```
//!
//! ## Updates
//!
//! `set_state` takes either a value or a function of the current state.
//! Handing back the very same `Rc`, or a scalar equal to the current one, is
//! a no-op: no listener runs. Map-shaped values are merged shallowly over
//! the current state; sequences, scalars and null replace it.
//!
//! ```rust
//! use restate_core::*;
//! use serde_json::json;
//!
//! let store = Store::create(|_| Value::from(json!({ "a": 1, "b": 2 })));
//! store.set_state(Value::from(json!({ "b": 3 })));
//! assert_eq!(*store.get_state(), Value::from(json!({ "a": 1, "b": 3 })));
//!
//! store.set_state(Value::from(42));
//! assert_eq!(store.get_state().as_i64(), Some(42));
//! ```
//!
//! ## Listeners
//!
//! Listeners run synchronously, in subscription order, after each accepted
//! update. `subscribe` returns an [`Unsubscribe`] handle that is safe to call
//! more than once and from inside any listener.
//!
//! ```rust
//! use restate_core::*;
//! use std::{cell::Cell, rc::Rc};
//!
//! let store = Store::create(|_| 0i32);
//! let seen = Rc::new(Cell::new(0));
//! let unsubscribe = store.subscribe({
//!     let seen = seen.clone();
//!     move |next, _prev| seen.set(**next)
//! });
//!
//! store.set_state(5);
//! unsubscribe.call();
//! store.set_state(6);
//! assert_eq!(seen.get(), 5);
//! ```

pub mod config;
pub mod error;
pub mod listeners;
pub mod prelude;
pub mod shape;
pub mod store;
pub mod unsubscribe;
pub mod value;

pub use config::*;
pub use error::*;
pub use listeners::{Listener, ListenerKey};
pub use shape::*;
pub use store::*;
pub use unsubscribe::*;
pub use value::*;
