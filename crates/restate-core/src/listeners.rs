use std::rc::Rc;

use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;

new_key_type! {
    pub struct ListenerKey;
}

/// Called with `(next, previous)` after every accepted update.
pub type Listener<S> = dyn Fn(&Rc<S>, &Rc<S>);

/// Keys of one notification pass, in subscription order.
pub(crate) type Pass = SmallVec<[ListenerKey; 8]>;

/// Insertion-ordered listener set, deduplicated by `Rc` identity.
pub(crate) struct ListenerSet<S: 'static> {
    entries: SlotMap<ListenerKey, Rc<Listener<S>>>,
    order: Vec<ListenerKey>,
}

impl<S: 'static> ListenerSet<S> {
    pub fn new() -> Self {
        Self {
            entries: SlotMap::with_key(),
            order: Vec::new(),
        }
    }

    /// Returns the key and whether the listener was newly added.
    pub fn insert(&mut self, listener: Rc<Listener<S>>) -> (ListenerKey, bool) {
        if let Some(key) = self
            .order
            .iter()
            .copied()
            .find(|k| self.entries.get(*k).is_some_and(|l| Rc::ptr_eq(l, &listener)))
        {
            return (key, false);
        }
        let key = self.entries.insert(listener);
        self.order.push(key);
        (key, true)
    }

    /// Stale keys are ignored.
    pub fn remove(&mut self, key: ListenerKey) -> bool {
        if self.entries.remove(key).is_none() {
            return false;
        }
        self.order.retain(|k| *k != key);
        true
    }

    pub fn get(&self, key: ListenerKey) -> Option<Rc<Listener<S>>> {
        self.entries.get(key).cloned()
    }

    pub fn pass(&self) -> Pass {
        self.order.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Rc<Listener<i32>> {
        Rc::new(|_: &Rc<i32>, _: &Rc<i32>| {})
    }

    #[test]
    fn keeps_insertion_order_across_removals() {
        let mut set = ListenerSet::<i32>::new();
        let (a, _) = set.insert(noop());
        let (b, _) = set.insert(noop());
        assert!(set.remove(a));
        let (c, _) = set.insert(noop());
        assert_eq!(set.pass().as_slice(), &[b, c]);
        assert!(!set.remove(a));
    }

    #[test]
    fn same_rc_is_added_once() {
        let mut set = ListenerSet::<i32>::new();
        let l = noop();
        let (k1, fresh1) = set.insert(l.clone());
        let (k2, fresh2) = set.insert(l);
        assert_eq!(k1, k2);
        assert!(fresh1);
        assert!(!fresh2);
        assert_eq!(set.len(), 1);
    }
}
