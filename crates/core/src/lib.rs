pub mod config;
pub mod coordinator;
pub mod metrics;
pub mod placer;
pub mod registry;
pub mod testing;
pub mod transport;

pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, CacheConfig,
    Config, ConfigError,
};
pub use coordinator::{DownloadCoordinator, DownloadError, TaskHandle};
pub use placer::{
    FsPlacer, NameGenerator, OverwritePolicy, PlacementOutcome, PlacementRequest, Placer,
    PlacerConfig, PlacerError,
};
pub use registry::{PendingDownload, RegistryError, TaskRegistry};
pub use transport::{
    DownloadRequest, HttpTransport, HttpTransportConfig, TaskId, TransferProgress, Transport,
    TransportError, TransportEvent, TransportEventKind,
};
