use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::scheduler::ConsumerId;

thread_local! {
    static CONSUMERS: RefCell<Vec<ConsumerContext>> = const { RefCell::new(Vec::new()) };
}

/// Per-consumer slot table backing `remember`.
#[derive(Default)]
pub struct Composer {
    pub(crate) slots: Vec<Box<dyn Any>>,
    pub(crate) cursor: usize,
    pub(crate) keyed_slots: HashMap<String, Box<dyn Any>>,
}

// Reserves a slot while its initializer runs.
struct Pending;

/// The consumer currently rendering: its id, slots and a way to ask the
/// scheduler for another render.
#[derive(Clone)]
pub struct ConsumerContext {
    id: ConsumerId,
    slots: Rc<RefCell<Composer>>,
    invalidate: Rc<dyn Fn()>,
}

impl ConsumerContext {
    pub(crate) fn new(id: ConsumerId, slots: Rc<RefCell<Composer>>, invalidate: Rc<dyn Fn()>) -> Self {
        Self {
            id,
            slots,
            invalidate,
        }
    }

    pub fn id(&self) -> ConsumerId {
        self.id
    }

    /// Queues this consumer for re-render on the next flush.
    pub fn request_render(&self) {
        (self.invalidate)()
    }

    pub fn invalidator(&self) -> Rc<dyn Fn()> {
        self.invalidate.clone()
    }
}

/// Marks a consumer as rendering until dropped.
pub struct ComposeGuard {
    _private: (),
}

impl ComposeGuard {
    pub(crate) fn begin(ctx: ConsumerContext) -> Self {
        ctx.slots.borrow_mut().cursor = 0;
        CONSUMERS.with(|c| c.borrow_mut().push(ctx));
        ComposeGuard { _private: () }
    }
}

impl Drop for ComposeGuard {
    fn drop(&mut self) {
        CONSUMERS.with(|c| {
            c.borrow_mut().pop();
        });
    }
}

pub fn current_consumer() -> Option<ConsumerContext> {
    CONSUMERS.with(|c| c.borrow().last().cloned())
}

/// Slot-based remember (sequential composition only)
pub fn remember<T: 'static>(init: impl FnOnce() -> T) -> Rc<T> {
    let Some(ctx) = current_consumer() else {
        log::warn!("remember: called outside a consumer render; value will not persist");
        return Rc::new(init());
    };

    let (cursor, replacing) = {
        let mut c = ctx.slots.borrow_mut();
        let cursor = c.cursor;
        c.cursor += 1;

        if let Some(slot) = c.slots.get(cursor) {
            if let Some(rc) = slot.downcast_ref::<Rc<T>>() {
                return rc.clone();
            }
            (cursor, true)
        } else {
            c.slots.push(Box::new(Pending));
            (cursor, false)
        }
    };

    if replacing {
        log::warn!(
            "remember: slot {} type changed; replacing. \
             If this is due to conditional composition, prefer remember_with_key.",
            cursor
        );
    }

    let rc: Rc<T> = Rc::new(init());
    ctx.slots.borrow_mut().slots[cursor] = Box::new(rc.clone());
    rc
}

/// Key-based remember
pub fn remember_with_key<T: 'static>(key: impl Into<String>, init: impl FnOnce() -> T) -> Rc<T> {
    let key = key.into();
    let Some(ctx) = current_consumer() else {
        log::warn!("remember_with_key: '{key}' used outside a consumer render; value will not persist");
        return Rc::new(init());
    };

    if let Some(existing) = ctx.slots.borrow().keyed_slots.get(&key) {
        if let Some(rc) = existing.downcast_ref::<Rc<T>>() {
            return rc.clone();
        }
        log::warn!(
            "remember_with_key: key '{}' reused with a different type; replacing.",
            key
        );
    }

    let rc: Rc<T> = Rc::new(init());
    ctx.slots
        .borrow_mut()
        .keyed_slots
        .insert(key, Box::new(rc.clone()));
    rc
}
