//! Ordered callback lists with masks and chain interruption.

use std::fmt;

/// Mask matching every notification.
pub const MASK_ALL: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

/// Per-notification state handed to every observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventState {
    /// Set by an observer to stop the remaining observers from running.
    pub skip_next_observers: bool,
    /// Mask the notification was raised with.
    pub mask: u32,
}

type Callback<T> = Box<dyn FnMut(&T, &mut EventState)>;

struct Observer<T> {
    id: ObserverId,
    mask: u32,
    once: bool,
    callback: Callback<T>,
}

pub struct Observable<T> {
    observers: Vec<Observer<T>>,
    next_id: u64,
}

impl<T> Observable<T> {
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
            next_id: 1,
        }
    }

    pub fn add(&mut self, callback: impl FnMut(&T, &mut EventState) + 'static) -> ObserverId {
        self.push(MASK_ALL, false, Box::new(callback))
    }

    /// Observer that only runs for notifications whose mask intersects `mask`.
    pub fn add_with_mask(
        &mut self,
        mask: u32,
        callback: impl FnMut(&T, &mut EventState) + 'static,
    ) -> ObserverId {
        self.push(mask, false, Box::new(callback))
    }

    /// Observer removed after its first call.
    pub fn add_once(&mut self, callback: impl FnMut(&T, &mut EventState) + 'static) -> ObserverId {
        self.push(MASK_ALL, true, Box::new(callback))
    }

    fn push(&mut self, mask: u32, once: bool, callback: Callback<T>) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push(Observer { id, mask, once, callback });
        id
    }

    pub fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|observer| observer.id != id);
        self.observers.len() != before
    }

    /// Call matching observers in registration order.
    ///
    /// Returns `false` when an observer interrupted the chain.
    pub fn notify_observers(&mut self, data: &T, mask: u32) -> bool {
        let mut state = EventState {
            skip_next_observers: false,
            mask,
        };
        let mut fired = Vec::new();

        for observer in &mut self.observers {
            if observer.mask & mask == 0 {
                continue;
            }
            (observer.callback)(data, &mut state);
            if observer.once {
                fired.push(observer.id);
            }
            if state.skip_next_observers {
                break;
            }
        }

        if !fired.is_empty() {
            self.observers.retain(|observer| !fired.contains(&observer.id));
        }
        !state.skip_next_observers
    }

    pub fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn clear(&mut self) {
        self.observers.clear();
    }
}

impl<T> Default for Observable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&'static str) -> Box<dyn FnMut(&u32, &mut EventState)>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let make = move |name: &'static str| -> Box<dyn FnMut(&u32, &mut EventState)> {
            let sink = Rc::clone(&sink);
            Box::new(move |value: &u32, _: &mut EventState| sink.borrow_mut().push(format!("{name}:{value}")))
        };
        (log, make)
    }

    #[test]
    fn test_notify_in_order() {
        let (log, make) = recorder();
        let mut observable = Observable::new();
        observable.add(make("a"));
        observable.add(make("b"));

        assert!(observable.notify_observers(&7, MASK_ALL));
        assert_eq!(*log.borrow(), ["a:7", "b:7"]);
    }

    #[test]
    fn test_skip_next_observers() {
        let (log, make) = recorder();
        let mut observable = Observable::new();
        let mut first = make("a");
        observable.add(move |v: &u32, state: &mut EventState| {
            first(v, state);
            state.skip_next_observers = true;
        });
        observable.add(make("b"));

        assert!(!observable.notify_observers(&1, MASK_ALL));
        assert_eq!(*log.borrow(), ["a:1"]);
    }

    #[test]
    fn test_mask_filters() {
        let (log, make) = recorder();
        let mut observable = Observable::new();
        observable.add_with_mask(0b01, make("down"));
        observable.add_with_mask(0b10, make("up"));

        observable.notify_observers(&3, 0b10);
        assert_eq!(*log.borrow(), ["up:3"]);
    }

    #[test]
    fn test_remove_and_once() {
        let (log, make) = recorder();
        let mut observable = Observable::new();
        let id = observable.add(make("kept"));
        observable.add_once(make("once"));

        observable.notify_observers(&1, MASK_ALL);
        observable.notify_observers(&2, MASK_ALL);
        assert_eq!(*log.borrow(), ["kept:1", "once:1", "kept:2"]);

        assert!(observable.remove(id));
        assert!(!observable.remove(id));
        assert!(!observable.has_observers());
    }
}
