use std::cell::RefCell;
use std::rc::Rc;

/// Handle returned by [`Store::subscribe`](crate::Store::subscribe).
///
/// Clones share the same registration; whichever runs first removes the
/// listener and the rest become no-ops.
#[derive(Clone)]
pub struct Unsubscribe(Rc<RefCell<Option<Box<dyn FnOnce()>>>>);

impl Unsubscribe {
    pub(crate) fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Rc::new(RefCell::new(Some(Box::new(f)))))
    }

    /// Removes the listener. Runs at most once (safe to call multiple times).
    pub fn call(&self) {
        let f = self.0.borrow_mut().take();
        if let Some(f) = f {
            f()
        }
    }

    /// `false` once `call` has run.
    pub fn is_active(&self) -> bool {
        self.0.borrow().is_some()
    }
}

impl std::fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("active", &self.is_active())
            .finish()
    }
}
