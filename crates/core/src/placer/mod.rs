//! Placer module for moving finished downloads to their destinations.
//!
//! A placement takes the temporary payload a transport produced and applies
//! an [`OverwritePolicy`] against whatever already sits at the destination:
//!
//! - `Keep`: an existing destination wins and the payload is left alone.
//! - `Overwrite`: an existing file is deleted, then the payload moved in.
//! - `Rename`: the payload goes to a sibling such as `foo-QHZKWPA.zip`.
//!
//! Directories are never replaced. Parent directories are never created.
//! Moves are atomic renames, with a copy-to-staging fallback across volumes.
//!
//! # Example
//!
//! ```ignore
//! use stowaway_core::placer::{FsPlacer, OverwritePolicy, PlacementRequest, Placer};
//!
//! let placer = FsPlacer::with_defaults();
//! let outcome = placer
//!     .place(PlacementRequest::new(
//!         "/tmp/stowaway/stowaway-1-QWERTYUIO.part",
//!         "/home/me/Downloads/report.pdf",
//!         OverwritePolicy::Rename,
//!     ))
//!     .await?;
//! println!("saved to {}", outcome.path().display());
//! ```

mod config;
mod error;
mod fs_placer;
mod locks;
mod naming;
mod traits;
mod types;

pub use config::PlacerConfig;
pub use error::{FsOperation, PlacerError};
pub use fs_placer::FsPlacer;
pub use locks::DestinationLocks;
pub use naming::{random_letters, NameGenerator, RandomSuffixGenerator, SUFFIX_SEPARATOR};
pub use traits::Placer;
pub use types::{OverwritePolicy, PlacementOutcome, PlacementRequest};
