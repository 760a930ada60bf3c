//! Runtime abstraction layer for async operations
//!
//! Fetch tasks are one-shot futures spawned here. The event loop never awaits
//! them; it only drains their completion events from a channel, so the
//! spawner is the only place that knows which executor runs them.

use crate::prelude::{Future, Pin};
use crate::Result;

/// Boxed fetch task as handed to a spawner
pub type BoxedTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A trait for spawning async tasks (object-safe version)
pub trait AsyncSpawner: Send + Sync + 'static {
    /// Spawn a future and return a handle to it. Fails when there is no
    /// executor to run it on.
    fn spawn_boxed(&self, future: BoxedTask) -> Result<Box<dyn AsyncHandle>>;
}

/// Handle to a spawned async task. Dropping it detaches the task.
pub trait AsyncHandle: Send + Sync {
    fn is_finished(&self) -> bool;

    /// Aborts the task; its completion event is never sent
    fn cancel(&self);
}

/// Spawns `future` on the installed spawner
pub fn spawn<F>(future: F) -> Result<Box<dyn AsyncHandle>>
where
    F: Future<Output = ()> + Send + 'static,
{
    runtime().spawn_boxed(Box::pin(future))
}

/// Default spawner implementations
pub mod spawners {
    use super::*;

    #[cfg(feature = "tokio-runtime")]
    pub mod tokio_impl {
        use super::*;
        use crate::MapError;
        use ::tokio::runtime::Handle;
        use ::tokio::task::JoinHandle;

        /// Tokio-based spawner. Without a bound handle it spawns onto
        /// whatever runtime is current at the call site, and spawning from
        /// a thread outside any runtime is an error.
        #[derive(Default)]
        pub struct TokioSpawner {
            handle: Option<Handle>,
        }

        impl TokioSpawner {
            /// Spawns onto the runtime current at each call
            pub fn ambient() -> Self {
                Self::default()
            }

            /// Spawns onto `handle` from any thread, including ones that
            /// never entered a runtime
            pub fn on(handle: Handle) -> Self {
                Self {
                    handle: Some(handle),
                }
            }
        }

        impl AsyncSpawner for TokioSpawner {
            fn spawn_boxed(&self, future: BoxedTask) -> Result<Box<dyn AsyncHandle>> {
                let handle = match &self.handle {
                    Some(handle) => handle.clone(),
                    None => Handle::try_current().map_err(|e| {
                        MapError::Runtime(format!("no tokio runtime to run fetches on: {}", e))
                    })?,
                };
                Ok(Box::new(TokioHandle(handle.spawn(future))))
            }
        }

        struct TokioHandle(JoinHandle<()>);

        impl AsyncHandle for TokioHandle {
            fn is_finished(&self) -> bool {
                self.0.is_finished()
            }

            fn cancel(&self) {
                self.0.abort();
            }
        }
    }
}

static RUNTIME: std::sync::OnceLock<Box<dyn AsyncSpawner>> = std::sync::OnceLock::new();

/// Installs the spawner used for all fetches. Only the first call wins;
/// it must happen before the first request is issued.
pub fn init_runtime(spawner: Box<dyn AsyncSpawner>) {
    if RUNTIME.set(spawner).is_err() {
        log::debug!("runtime already initialised, keeping existing spawner");
    }
}

/// The installed spawner, falling back to the ambient tokio runtime
pub fn runtime() -> &'static dyn AsyncSpawner {
    RUNTIME
        .get_or_init(|| {
            #[cfg(feature = "tokio-runtime")]
            {
                Box::new(spawners::tokio_impl::TokioSpawner::ambient())
            }

            #[cfg(not(feature = "tokio-runtime"))]
            {
                panic!("No async runtime available. Enable the 'tokio-runtime' feature.");
            }
        })
        .as_ref()
}
