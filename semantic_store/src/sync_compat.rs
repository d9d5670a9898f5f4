// SPDX-License-Identifier: MIT OR Apache-2.0
//! Lock primitives used by the concurrent structures.
//!
//! Normal builds use `parking_lot` (no poisoning, guards returned directly).
//! With the `loom` feature the same names resolve to wrappers over
//! `loom::sync`, unwrapped so call sites compile unchanged and the
//! double-checked locking paths can be model-checked.

#[cfg(not(feature = "loom"))]
pub(crate) use parking_lot::{Mutex, RwLock};

#[cfg(feature = "loom")]
pub(crate) use self::model::{Mutex, RwLock};

#[cfg(feature = "loom")]
mod model {
    use std::fmt;

    pub(crate) struct RwLock<T>(loom::sync::RwLock<T>);

    impl<T> RwLock<T> {
        pub(crate) fn new(value: T) -> Self {
            Self(loom::sync::RwLock::new(value))
        }

        pub(crate) fn read(&self) -> loom::sync::RwLockReadGuard<'_, T> {
            // Poisoning only follows a panic inside the model, which already
            // fails the test.
            self.0.read().unwrap_or_else(|e| e.into_inner())
        }

        pub(crate) fn write(&self) -> loom::sync::RwLockWriteGuard<'_, T> {
            self.0.write().unwrap_or_else(|e| e.into_inner())
        }

        pub(crate) fn into_inner(self) -> T {
            self.0.into_inner().unwrap_or_else(|e| e.into_inner())
        }
    }

    impl<T: fmt::Debug> fmt::Debug for RwLock<T> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self.0.try_read() {
                Ok(guard) => f.debug_tuple("RwLock").field(&*guard).finish(),
                Err(_) => f.write_str("RwLock(<locked>)"),
            }
        }
    }

    pub(crate) struct Mutex<T>(loom::sync::Mutex<T>);

    impl<T> Mutex<T> {
        pub(crate) fn new(value: T) -> Self {
            Self(loom::sync::Mutex::new(value))
        }

        pub(crate) fn lock(&self) -> loom::sync::MutexGuard<'_, T> {
            self.0.lock().unwrap_or_else(|e| e.into_inner())
        }
    }

    impl<T> fmt::Debug for Mutex<T> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("Mutex(..)")
        }
    }
}
