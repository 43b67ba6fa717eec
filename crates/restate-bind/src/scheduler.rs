use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use slotmap::{SlotMap, new_key_type};

use crate::runtime::{ComposeGuard, Composer, ConsumerContext};
use crate::scope::Scope;

new_key_type! {
    pub struct ConsumerId;
}

/// Upper bound on renders in one `flush`, to stop update loops.
pub const MAX_RENDERS_PER_FLUSH: usize = 10_000;

trait Render {
    fn render(&self);
}

/// Host for mounted consumers.
///
/// Consumers ask for re-renders through their context; the requests are
/// coalesced until [`Scheduler::flush`] runs them.
#[derive(Clone, Default)]
pub struct Scheduler {
    inner: Rc<SchedulerInner>,
}

#[derive(Default)]
struct SchedulerInner {
    consumers: RefCell<SlotMap<ConsumerId, Rc<dyn Render>>>,
    queue: RefCell<VecDeque<ConsumerId>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mounts `render` as a new consumer and renders it once.
    pub fn mount<R: 'static>(&self, render: impl FnMut() -> R + 'static) -> Consumer<R> {
        let inner = Rc::new(ConsumerInner {
            id: Cell::new(ConsumerId::default()),
            render: RefCell::new(Box::new(render)),
            output: RefCell::new(None),
            renders: Cell::new(0),
            slots: Rc::new(RefCell::new(Composer::default())),
            scope: Scope::new(),
            mounted: Cell::new(true),
            invalidate: RefCell::new(None),
            scheduler: Rc::downgrade(&self.inner),
        });

        let id = self
            .inner
            .consumers
            .borrow_mut()
            .insert(inner.clone() as Rc<dyn Render>);
        inner.id.set(id);

        let scheduler = Rc::downgrade(&self.inner);
        *inner.invalidate.borrow_mut() = Some(Rc::new(move || {
            if let Some(inner) = scheduler.upgrade() {
                Scheduler { inner }.request(id);
            }
        }));

        log::debug!("scheduler: mounted consumer {id:?}");
        let consumer = Consumer { inner };
        {
            let _unmount = UnmountOnUnwind(&consumer);
            consumer.inner.render();
        }
        consumer
    }

    /// Queues `id` for re-render. Repeated requests before a flush coalesce.
    pub fn request(&self, id: ConsumerId) {
        if !self.inner.consumers.borrow().contains_key(id) {
            return;
        }
        let mut queue = self.inner.queue.borrow_mut();
        if !queue.contains(&id) {
            log::trace!("scheduler: render requested for {id:?}");
            queue.push_back(id);
        }
    }

    pub fn pending(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    pub fn mounted(&self) -> usize {
        self.inner.consumers.borrow().len()
    }

    /// Re-renders every queued consumer once per request, until the queue is
    /// empty. Returns the number of renders.
    pub fn flush(&self) -> usize {
        let mut renders = 0;
        loop {
            if renders >= MAX_RENDERS_PER_FLUSH {
                log::error!(
                    "scheduler: stopped after {renders} renders; {} consumer(s) still pending. \
                     A consumer is probably updating the store on every render.",
                    self.pending()
                );
                break;
            }
            let next = self.inner.queue.borrow_mut().pop_front();
            let Some(id) = next else { break };
            let consumer = self.inner.consumers.borrow().get(id).cloned();
            if let Some(consumer) = consumer {
                consumer.render();
                renders += 1;
            }
        }
        renders
    }

    fn remove(&self, id: ConsumerId) {
        self.inner.consumers.borrow_mut().remove(id);
        self.inner.queue.borrow_mut().retain(|queued| *queued != id);
    }
}

/// A mounted render function with its own slots and scope.
pub struct Consumer<R> {
    inner: Rc<ConsumerInner<R>>,
}

struct ConsumerInner<R> {
    id: Cell<ConsumerId>,
    render: RefCell<Box<dyn FnMut() -> R>>,
    output: RefCell<Option<R>>,
    renders: Cell<u64>,
    slots: Rc<RefCell<Composer>>,
    scope: Scope,
    mounted: Cell<bool>,
    invalidate: RefCell<Option<Rc<dyn Fn()>>>,
    scheduler: Weak<SchedulerInner>,
}

impl<R> Render for ConsumerInner<R> {
    fn render(&self) {
        if !self.mounted.get() {
            return;
        }
        let invalidate = self
            .invalidate
            .borrow()
            .clone()
            .unwrap_or_else(|| Rc::new(|| {}));
        let ctx = ConsumerContext::new(self.id.get(), self.slots.clone(), invalidate);

        let output = {
            let _guard = ComposeGuard::begin(ctx);
            let mut render = self.render.borrow_mut();
            self.scope.run(|| (render)())
        };

        *self.output.borrow_mut() = Some(output);
        self.renders.set(self.renders.get() + 1);
    }
}

impl<R: 'static> Consumer<R> {
    pub fn id(&self) -> ConsumerId {
        self.inner.id.get()
    }

    /// Output of the latest render.
    pub fn output(&self) -> R
    where
        R: Clone,
    {
        match self.inner.output.borrow().as_ref() {
            Some(output) => output.clone(),
            None => unreachable!("consumers render once when mounted"),
        }
    }

    pub fn with_output<T>(&self, f: impl FnOnce(&R) -> T) -> Option<T> {
        self.inner.output.borrow().as_ref().map(f)
    }

    pub fn render_count(&self) -> u64 {
        self.inner.renders.get()
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.get()
    }

    /// Detaches the consumer and runs its scope's disposers, releasing every
    /// store subscription it holds. Idempotent.
    pub fn unmount(&self) {
        if !self.inner.mounted.replace(false) {
            return;
        }
        if let Some(inner) = self.inner.scheduler.upgrade() {
            Scheduler { inner }.remove(self.id());
        }
        self.inner.scope.clone().dispose();
        log::debug!("scheduler: unmounted consumer {:?}", self.id());
    }
}

// The caller never receives a handle when the first render panics, so the
// consumer is unmounted here instead.
struct UnmountOnUnwind<'a, R: 'static>(&'a Consumer<R>);

impl<R: 'static> Drop for UnmountOnUnwind<'_, R> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            log::debug!("scheduler: first render of {:?} panicked", self.0.id());
            self.0.unmount();
        }
    }
}

impl<R: 'static> Clone for Consumer<R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}
