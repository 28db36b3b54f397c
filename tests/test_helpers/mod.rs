//! Shared fixtures for integration tests.

pub mod auth_server;
pub mod mcp_servers;
pub mod switchboard;

use std::env;
use std::ffi::OsString;
use std::sync::{Mutex, MutexGuard, OnceLock};

static ENV_MUTEX: OnceLock<Mutex<()>> = OnceLock::new();

/// Guard that applies a scoped environment variable update.
pub struct EnvVarGuard {
    previous: Vec<(OsString, Option<OsString>)>,
    _lock: MutexGuard<'static, ()>,
}

impl EnvVarGuard {
    /// Sets or removes one environment variable for the guard lifetime.
    pub fn set(key: &str, value: Option<&str>) -> Self {
        let lock = env_lock();
        let key_os = OsString::from(key);
        let previous = vec![(key_os.clone(), env::var_os(&key_os))];
        unsafe {
            // SAFETY: the global mutex serializes environment mutations in tests.
            match value {
                Some(new_value) => env::set_var(&key_os, new_value),
                None => env::remove_var(&key_os),
            }
        }

        Self {
            previous,
            _lock: lock,
        }
    }

    /// Applies several updates at once; `None` removes the variable.
    pub fn set_many(changes: &[(OsString, Option<OsString>)]) -> Self {
        let lock = env_lock();
        let previous = changes
            .iter()
            .map(|(key, _)| (key.clone(), env::var_os(key)))
            .collect();
        for (key, value) in changes {
            unsafe {
                // SAFETY: the global mutex serializes environment mutations in tests.
                match value {
                    Some(new_value) => env::set_var(key, new_value),
                    None => env::remove_var(key),
                }
            }
        }

        Self {
            previous,
            _lock: lock,
        }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        for (key, value) in self.previous.drain(..) {
            unsafe {
                // SAFETY: the global mutex serializes environment mutations in tests.
                match value {
                    Some(previous) => env::set_var(&key, &previous),
                    None => env::remove_var(&key),
                }
            }
        }
    }
}

fn env_lock() -> MutexGuard<'static, ()> {
    ENV_MUTEX
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}
