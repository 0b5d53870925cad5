//! Observable value holder.
//!
//! Wraps a `tokio::sync::watch` channel: readers sample the current value or
//! subscribe and await changes, writers replace or modify it in place. Every
//! write notifies all live subscribers.

use tokio::sync::watch;

#[derive(Debug)]
pub struct StateHolder<T> {
    sender: watch::Sender<T>,
}

impl<T> StateHolder<T> {
    pub fn new(initial: T) -> Self {
        let (sender, _receiver) = watch::channel(initial);
        Self { sender }
    }

    /// Clone of the current value
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.sender.borrow().clone()
    }

    /// Borrow the current value without cloning it
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.sender.borrow())
    }

    /// Replace the value and notify subscribers
    pub fn set(&self, value: T) {
        self.sender.send_replace(value);
    }

    /// Modify the value in place and notify subscribers
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.sender.send_modify(f);
    }

    /// Receiver that sees the current value and every later change
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.sender.subscribe()
    }
}

impl<T: Default> Default for StateHolder<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
