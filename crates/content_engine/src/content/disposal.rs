//! Flat registry of disposable content
//!
//! Disposal lifetime matches cache lifetime, but stream loads and objects
//! registered with `add` never get a cache node, so disposables are tracked
//! here independently of the keyed cache.

use std::collections::HashSet;
use std::rc::Rc;

use super::key::DisposableRef;

/// Every disposable object handed out by one manager
#[derive(Default)]
pub struct DisposableRegistry {
    objects: Vec<DisposableRef>,
    seen: HashSet<*const ()>,
}

impl DisposableRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `object`; returns false if it is already tracked
    pub fn track(&mut self, object: DisposableRef) -> bool {
        let address = Rc::as_ptr(&object) as *const ();
        if !self.seen.insert(address) {
            return false;
        }
        self.objects.push(object);
        true
    }

    /// Dispose every tracked object once and forget them all
    ///
    /// Returns the number of objects disposed. An object that is borrowed at
    /// this point is skipped and logged.
    pub fn dispose_all(&mut self) -> usize {
        let mut disposed = 0;
        for object in self.objects.drain(..) {
            match object.try_borrow_mut() {
                Ok(mut target) => {
                    target.dispose();
                    disposed += 1;
                }
                Err(_) => log::warn!("Skipping disposal of borrowed content object"),
            }
        }
        self.seen.clear();
        disposed
    }

    /// Number of tracked objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::key::{Capabilities, Content};
    use std::cell::RefCell;

    #[derive(Default)]
    struct Handle {
        released: u32,
    }

    impl Content for Handle {
        fn capabilities() -> Capabilities {
            Capabilities::DISPOSE
        }

        fn dispose(&mut self) {
            self.released += 1;
        }
    }

    #[test]
    fn test_same_object_tracked_once() {
        let mut registry = DisposableRegistry::new();
        let handle = Rc::new(RefCell::new(Handle::default()));

        assert!(registry.track(handle.clone()));
        assert!(!registry.track(handle.clone()));
        assert_eq!(registry.len(), 1);

        assert_eq!(registry.dispose_all(), 1);
        assert_eq!(handle.borrow().released, 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_dispose_all_twice_releases_once() {
        let mut registry = DisposableRegistry::new();
        let a = Rc::new(RefCell::new(Handle::default()));
        let b = Rc::new(RefCell::new(Handle::default()));
        registry.track(a.clone());
        registry.track(b.clone());

        assert_eq!(registry.dispose_all(), 2);
        assert_eq!(registry.dispose_all(), 0);
        assert_eq!(a.borrow().released, 1);
        assert_eq!(b.borrow().released, 1);
    }

    #[test]
    fn test_borrowed_object_skipped() {
        let mut registry = DisposableRegistry::new();
        let handle = Rc::new(RefCell::new(Handle::default()));
        registry.track(handle.clone());

        let guard = handle.borrow();
        assert_eq!(registry.dispose_all(), 0);
        drop(guard);
        assert_eq!(handle.borrow().released, 0);
    }
}
