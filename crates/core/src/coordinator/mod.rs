//! Download coordinator.
//!
//! Ties a [`Transport`](crate::transport::Transport), the
//! [`TaskRegistry`](crate::registry::TaskRegistry) and a
//! [`Placer`](crate::placer::Placer) together:
//!
//! 1. `begin_download` creates a suspended transport task, registers its
//!    destination and policy, then resumes it.
//! 2. The event loop started with `start` resolves each terminal event
//!    against the registry exactly once and places the payload.
//! 3. The outcome reaches the caller through its [`TaskHandle`].

mod error;
mod handle;
mod runner;

pub use error::DownloadError;
pub use handle::TaskHandle;
pub use runner::DownloadCoordinator;
