//! Listener registry for push notifications.
//!
//! Callbacks are collected before they run, so a callback may register,
//! remove, or trigger further notifications without a re-borrow panic.

use slotmap::SlotMap;
use std::cell::RefCell;
use std::rc::Rc;

slotmap::new_key_type! {
    /// Handle returned by `subscribe`, used to unsubscribe.
    pub struct ListenerKey;
}

pub(crate) type Listener<T> = Rc<dyn Fn(&T)>;

pub(crate) struct Listeners<T: ?Sized> {
    slots: RefCell<SlotMap<ListenerKey, Listener<T>>>,
}

impl<T: ?Sized> Default for Listeners<T> {
    fn default() -> Self {
        Self {
            slots: RefCell::new(SlotMap::with_key()),
        }
    }
}

impl<T: ?Sized> Listeners<T> {
    pub(crate) fn insert(&self, listener: Listener<T>) -> ListenerKey {
        self.slots.borrow_mut().insert(listener)
    }

    pub(crate) fn remove(&self, key: ListenerKey) -> bool {
        self.slots.borrow_mut().remove(key).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    pub(crate) fn notify(&self, value: &T) {
        let current: Vec<Listener<T>> = self.slots.borrow().values().cloned().collect();
        for listener in current {
            listener(value);
        }
    }
}
