pub mod config;
pub mod configurator;
mod error;
pub mod parts;
pub mod restrictions;
pub mod sync;

#[cfg(feature = "wasm")]
pub mod bindings;

pub use config::{load_config, EngineOptions, ProductConfig};
pub use configurator::{ChangeAction, Configurator, ObserverId, PartsChanged, PartsObserver};
pub use error::CustomizeError;
pub use parts::{Part, PartChange, PartValue, PartsMap};

/// Installs a formatted tracing subscriber, filtered by `RUST_LOG` with an
/// `info` fallback.
pub fn init_tracing() {
    init_tracing_with("info");
}

/// Same as [`init_tracing`] with a custom fallback filter. Does nothing if a
/// subscriber is already installed.
pub fn init_tracing_with(default_filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
