use std::cell::RefCell;
use std::ops::Deref;
use std::rc::Rc;

use restate_core::{
    BoxError, Identical, Mergeable, Store, StoreConfig, StoreError, Unsubscribe, WeakStore,
};

use crate::runtime::{current_consumer, remember};
use crate::scope::scoped_effect;

/// Creates a store and returns its bound hook.
pub fn create<S: Mergeable>(initializer: impl FnOnce(&Store<S>) -> S) -> UseStore<S> {
    UseStore::new(Store::create(initializer))
}

pub fn create_with_config<S: Mergeable>(
    config: StoreConfig,
    initializer: impl FnOnce(&Store<S>) -> S,
) -> UseStore<S> {
    UseStore::new(Store::with_config(config, initializer))
}

pub fn try_create<S, E>(
    initializer: impl FnOnce(&Store<S>) -> Result<S, E>,
) -> Result<UseStore<S>, StoreError>
where
    S: Mergeable,
    E: Into<BoxError>,
{
    Store::try_create(initializer).map(UseStore::new)
}

fn identity<S>(state: &Rc<S>) -> Rc<S> {
    state.clone()
}

/// A store bound for use from consumers.
///
/// Derefs to [`Store`], so `get_state`, `get_initial_state`, `set_state` and
/// `subscribe` are available on the same handle.
pub struct UseStore<S: Mergeable> {
    store: Store<S>,
    identity: fn(&Rc<S>) -> Rc<S>,
}

impl<S: Mergeable> UseStore<S> {
    pub fn new(store: Store<S>) -> Self {
        Self {
            store,
            identity: identity::<S>,
        }
    }

    pub fn store(&self) -> &Store<S> {
        &self.store
    }

    /// The whole state.
    pub fn use_store(&self) -> Rc<S> {
        self.select(self.identity)
    }

    /// Selects a slice of the state for the consumer currently rendering.
    ///
    /// The first call at a callsite subscribes the consumer to the store
    /// until it unmounts. Every call computes `selector` against the live
    /// state; when the result is identical to what this callsite returned
    /// last time, that earlier value is returned instead. On each store
    /// update the latest selector is re-run against a fresh state read, and
    /// the consumer is queued for re-render only if the selection changed.
    ///
    /// Outside a consumer this is just `selector(&get_state())`.
    pub fn select<T, F>(&self, selector: F) -> T
    where
        T: Identical + Clone + 'static,
        F: Fn(&Rc<S>) -> T + 'static,
    {
        if current_consumer().is_none() {
            log::debug!("use_store: read outside a consumer; not subscribing");
            return selector(&self.store.get_state());
        }

        let slot = remember(|| RefCell::new(Selection::<S, T>::new()));
        let selector: Rc<dyn Fn(&Rc<S>) -> T> = Rc::new(selector);
        slot.borrow_mut().selector = Some(selector.clone());
        Selection::bind(&slot, &self.store);

        // Read after subscribing, so no update can slip in between.
        let state = self.store.get_state();
        let fresh = selector(&state);

        let mut selection = slot.borrow_mut();
        selection.seen = Some(state);
        if let Some(delivered) = &selection.delivered
            && delivered.identical(&fresh)
        {
            return delivered.clone();
        }
        selection.delivered = Some(fresh.clone());
        fresh
    }

    /// `selector` applied to the initial state. Never subscribes.
    pub fn initial_snapshot<T>(&self, selector: impl FnOnce(&Rc<S>) -> T) -> T {
        selector(&self.store.get_initial_state())
    }
}

impl<S: Mergeable> Deref for UseStore<S> {
    type Target = Store<S>;

    fn deref(&self) -> &Store<S> {
        &self.store
    }
}

impl<S: Mergeable> Clone for UseStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            identity: self.identity,
        }
    }
}

/// What one `select` callsite remembers between renders.
struct Selection<S: Mergeable, T> {
    selector: Option<Rc<dyn Fn(&Rc<S>) -> T>>,
    delivered: Option<T>,
    // State the last check or render looked at.
    seen: Option<Rc<S>>,
    binding: Option<Binding<S>>,
}

struct Binding<S: Mergeable> {
    store: WeakStore<S>,
    unsubscribe: Unsubscribe,
}

impl<S: Mergeable, T: Identical + Clone + 'static> Selection<S, T> {
    fn new() -> Self {
        Self {
            selector: None,
            delivered: None,
            seen: None,
            binding: None,
        }
    }

    /// Subscribes `slot` to `store` unless it already is.
    fn bind(slot: &Rc<RefCell<Self>>, store: &Store<S>) {
        let previous = {
            let mut selection = slot.borrow_mut();
            if selection
                .binding
                .as_ref()
                .is_some_and(|binding| binding.store.is(store))
            {
                return;
            }
            selection.delivered = None;
            selection.seen = None;
            selection.binding.take()
        };
        // The callsite switched stores.
        if let Some(previous) = previous {
            previous.unsubscribe.call();
        }

        let Some(ctx) = current_consumer() else {
            return;
        };
        let invalidate = ctx.invalidator();
        let weak_slot = Rc::downgrade(slot);
        let weak_store = store.downgrade();

        let unsubscribe = store.subscribe(move |_next, _previous| {
            let (Some(slot), Some(store)) = (weak_slot.upgrade(), weak_store.upgrade()) else {
                return;
            };
            // Fresh read: an earlier listener in this pass may have updated again.
            let state = store.get_state();
            let (selector, unchanged) = {
                let selection = slot.borrow();
                let unchanged = selection
                    .seen
                    .as_ref()
                    .is_some_and(|seen| Rc::ptr_eq(seen, &state));
                (selection.selector.clone(), unchanged)
            };
            let Some(selector) = selector else { return };
            if unchanged {
                return;
            }

            let fresh = selector(&state);
            let changed = {
                let mut selection = slot.borrow_mut();
                selection.seen = Some(state);
                selection
                    .delivered
                    .as_ref()
                    .is_none_or(|delivered| !delivered.identical(&fresh))
            };
            if changed {
                invalidate();
            }
        });

        scoped_effect({
            let unsubscribe = unsubscribe.clone();
            move || Box::new(move || unsubscribe.call())
        });

        slot.borrow_mut().binding = Some(Binding {
            store: store.downgrade(),
            unsubscribe,
        });
    }
}

impl<S: Mergeable> std::fmt::Debug for UseStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("UseStore").field(&self.store).finish()
    }
}
