//! # Pictor Core Kernel
//!
//! The `kernel` module holds what every other part of `pictor-core` leans on:
//!
//! - **Application**: the per-request pipeline runner,
//!   [`Application`](application::Application).
//! - **Core Constants**: system-wide constants in the `constants` submodule.
//! - **Error Handling**: the top-level [`Error`](error::Error) and `Result` alias.
//! - **Shared state**: the [`Shared`] handle used for mutable collaborators
//!   that travel through events, plus a poison-aware [`lock`] helper.
pub mod application;
pub mod constants;
pub mod error;

use std::sync::{Arc, Mutex, MutexGuard};

pub use application::Application;
pub use error::{Error, Result};

/// Mutable value shared between the application and its listeners
pub type Shared<T> = Arc<Mutex<T>>;

pub fn shared<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

/// Lock a mutex, turning poisoning into [`Error::LockPoisoned`].
pub fn lock<'a, T: ?Sized>(mutex: &'a Mutex<T>, component: &str) -> Result<MutexGuard<'a, T>> {
    mutex.lock().map_err(|_| Error::LockPoisoned {
        component: component.to_string(),
    })
}
