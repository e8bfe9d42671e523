use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Installs a global subscriber printing to stderr and streaming spans to Tracy.
pub struct Tracing {}

impl Tracing {
    /// Fails if another global subscriber is already set.
    pub fn setup(level: LevelFilter) -> Result<Self, tracing_subscriber::util::TryInitError> {
        let tracy_layer = tracing_tracy::TracyLayer::default();
        let fmt = tracing_subscriber::fmt::layer().with_filter(level);
        tracing_subscriber::registry()
            .with(fmt)
            .with(tracy_layer)
            .try_init()?;
        Ok(Self {})
    }
}
