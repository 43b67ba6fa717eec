use std::cell::{OnceCell, RefCell};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::rc::{Rc, Weak};

use crate::config::{ListenerPanic, StoreConfig};
use crate::error::{BoxError, StoreError};
use crate::listeners::{Listener, ListenerSet};
use crate::shape::Mergeable;
use crate::unsubscribe::Unsubscribe;

/// The argument of [`Store::set_state`]: a next value, or a function of the
/// current one.
pub enum Update<S: 'static> {
    Value(Rc<S>),
    With(Box<dyn FnOnce(&Rc<S>) -> Rc<S>>),
}

impl<S: 'static> From<S> for Update<S> {
    fn from(value: S) -> Self {
        Update::Value(Rc::new(value))
    }
}

impl<S: 'static> From<Rc<S>> for Update<S> {
    fn from(value: Rc<S>) -> Self {
        Update::Value(value)
    }
}

impl<S: 'static> Update<S> {
    pub fn with(f: impl FnOnce(&Rc<S>) -> Rc<S> + 'static) -> Self {
        Update::With(Box::new(f))
    }
}

/// An observable state container.
///
/// `Store` is a cheap, cloneable handle; clones share one container.
/// Independently created stores share nothing.
pub struct Store<S: Mergeable> {
    inner: Rc<StoreInner<S>>,
}

/// Non-owning handle, for listeners that must not keep their store alive.
pub struct WeakStore<S: Mergeable> {
    inner: Weak<StoreInner<S>>,
}

struct StoreInner<S: 'static> {
    config: StoreConfig,
    // `None` only while the initializer runs.
    state: RefCell<Option<Rc<S>>>,
    initial: OnceCell<Rc<S>>,
    listeners: RefCell<ListenerSet<S>>,
}

impl<S: Mergeable> Store<S> {
    /// Creates a store from `initializer`, which runs exactly once.
    ///
    /// The initializer receives the store being built so that action
    /// functions can be wired to it, and returns the initial state. Writes
    /// made before it returns are discarded: its return value wins.
    ///
    /// A panicking initializer unwinds to the caller and no store exists.
    pub fn create(initializer: impl FnOnce(&Store<S>) -> S) -> Self {
        Self::with_config(StoreConfig::default(), initializer)
    }

    pub fn with_config(config: StoreConfig, initializer: impl FnOnce(&Store<S>) -> S) -> Self {
        let store = Self::uninit(config);
        let state = initializer(&store);
        store.install(state);
        store
    }

    /// Like [`Store::create`], for initializers that can fail.
    pub fn try_create<E>(
        initializer: impl FnOnce(&Store<S>) -> Result<S, E>,
    ) -> Result<Self, StoreError>
    where
        E: Into<BoxError>,
    {
        Self::try_with_config(StoreConfig::default(), initializer)
    }

    pub fn try_with_config<E>(
        config: StoreConfig,
        initializer: impl FnOnce(&Store<S>) -> Result<S, E>,
    ) -> Result<Self, StoreError>
    where
        E: Into<BoxError>,
    {
        let store = Self::uninit(config);
        let state = initializer(&store).map_err(|e| StoreError::Initializer(e.into()))?;
        store.install(state);
        Ok(store)
    }

    fn uninit(config: StoreConfig) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                config,
                state: RefCell::new(None),
                initial: OnceCell::new(),
                listeners: RefCell::new(ListenerSet::new()),
            }),
        }
    }

    fn install(&self, state: S) {
        let state = Rc::new(state);
        // Only reached once per store, right after the initializer.
        let _ = self.inner.initial.set(state.clone());
        *self.inner.state.borrow_mut() = Some(state);
        log::debug!("{}: created", self.label());
    }

    /// Current state, by reference.
    ///
    /// # Panics
    ///
    /// When called from inside the store's own initializer. Use
    /// [`Store::try_get_state`] there.
    pub fn get_state(&self) -> Rc<S> {
        match self.try_get_state() {
            Ok(state) => state,
            Err(e) => panic!("{}: {e}", self.label()),
        }
    }

    pub fn try_get_state(&self) -> Result<Rc<S>, StoreError> {
        self.inner
            .state
            .borrow()
            .clone()
            .ok_or(StoreError::NotInitialized)
    }

    /// The initializer's return value, unchanged for the store's lifetime.
    ///
    /// # Panics
    ///
    /// When called from inside the store's own initializer.
    pub fn get_initial_state(&self) -> Rc<S> {
        match self.inner.initial.get() {
            Some(state) => state.clone(),
            None => panic!("{}: {}", self.label(), StoreError::NotInitialized),
        }
    }

    /// Applies `update` and notifies listeners.
    ///
    /// - a function update is called once with the current state;
    /// - if the result is the current `Rc`, or a scalar equal to the current
    ///   one (see [`Mergeable::same_as`]), nothing happens;
    /// - a map-shaped result is merged shallowly over the current state,
    ///   anything else replaces it;
    /// - then every listener subscribed before this call runs, in
    ///   subscription order, with `(next, previous)`.
    ///
    /// A listener that calls `set_state` itself starts a nested pass that
    /// completes before the outer one resumes. Listeners later in the outer
    /// pass still receive the outer `(next, previous)` pair; read
    /// [`Store::get_state`] for the newest state.
    pub fn set_state(&self, update: impl Into<Update<S>>) {
        self.apply(update.into(), false);
    }

    /// Replaces the state wholesale regardless of its shape.
    pub fn replace_state(&self, update: impl Into<Update<S>>) {
        self.apply(update.into(), true);
    }

    /// `set_state` with a function from the current value to the next.
    pub fn set_state_with(&self, f: impl FnOnce(&S) -> S + 'static) {
        self.set_state(Update::with(move |current: &Rc<S>| Rc::new(f(current))));
    }

    fn apply(&self, update: Update<S>, replace: bool) {
        let Ok(current) = self.try_get_state() else {
            log::warn!(
                "{}: set_state during initialization discarded; the initializer's return value becomes the state",
                self.label()
            );
            return;
        };

        let next = match update {
            Update::Value(next) => next,
            Update::With(f) => f(&current),
        };

        if Rc::ptr_eq(&next, &current) || next.same_as(&current) {
            log::trace!("{}: same state, skipping notify", self.label());
            return;
        }

        let next = if !replace && next.kind().merges() {
            Rc::new(current.merge(&next))
        } else {
            next
        };

        *self.inner.state.borrow_mut() = Some(next.clone());
        self.notify(&next, &current);
    }

    fn notify(&self, next: &Rc<S>, previous: &Rc<S>) {
        let pass = self.inner.listeners.borrow().pass();
        log::trace!("{}: notifying {} listener(s)", self.label(), pass.len());

        match self.inner.config.listener_panic {
            ListenerPanic::Propagate => {
                for key in pass {
                    // Looked up per call: removals made earlier in this pass apply.
                    let listener = self.inner.listeners.borrow().get(key);
                    if let Some(listener) = listener {
                        listener(next, previous);
                    }
                }
            }
            ListenerPanic::Isolate => {
                let mut first_panic = None;
                for key in pass {
                    let listener = self.inner.listeners.borrow().get(key);
                    let Some(listener) = listener else { continue };
                    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| listener(next, previous)))
                    {
                        log::error!("{}: listener panicked; continuing pass", self.label());
                        first_panic.get_or_insert(payload);
                    }
                }
                if let Some(payload) = first_panic {
                    resume_unwind(payload);
                }
            }
        }
    }

    /// Registers `listener` for every later accepted update.
    pub fn subscribe(&self, listener: impl Fn(&Rc<S>, &Rc<S>) + 'static) -> Unsubscribe {
        self.subscribe_rc(Rc::new(listener))
    }

    /// Subscribing the same `Rc` twice registers it once; either handle
    /// removes it.
    pub fn subscribe_rc(&self, listener: Rc<Listener<S>>) -> Unsubscribe {
        let (key, fresh) = self.inner.listeners.borrow_mut().insert(listener);
        if fresh {
            log::debug!("{}: listener added", self.label());
        }

        let weak = Rc::downgrade(&self.inner);
        Unsubscribe::new(move || {
            if let Some(inner) = weak.upgrade()
                && inner.listeners.borrow_mut().remove(key)
            {
                log::debug!("{}: listener removed", inner.config.label());
            }
        })
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Whether both handles refer to the same container.
    pub fn ptr_eq(&self, other: &Store<S>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn downgrade(&self) -> WeakStore<S> {
        WeakStore {
            inner: Rc::downgrade(&self.inner),
        }
    }

    fn label(&self) -> &str {
        self.inner.config.label()
    }
}

impl<S: Mergeable> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: Mergeable> fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.inner.config.name)
            .field("initialized", &self.inner.initial.get().is_some())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl<S: Mergeable> WeakStore<S> {
    pub fn upgrade(&self) -> Option<Store<S>> {
        self.inner.upgrade().map(|inner| Store { inner })
    }

    /// Whether this handle points at `store`.
    pub fn is(&self, store: &Store<S>) -> bool {
        std::ptr::eq(self.inner.as_ptr(), Rc::as_ptr(&store.inner))
    }
}

impl<S: Mergeable> Clone for WeakStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}
