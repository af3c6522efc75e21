use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// Used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_DIRECTIVES: &str = "info,pawpost_server=debug,sqlx=warn,actix_web=info";

/// Output shape of the fmt layer, picked with `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Full,
    Compact,
    Pretty,
}

impl LogFormat {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "compact" => Self::Compact,
            "pretty" => Self::Pretty,
            _ => Self::Full,
        }
    }

    fn layer(self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let base = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        match self {
            Self::Full => base.boxed(),
            Self::Compact => base.compact().boxed(),
            Self::Pretty => base.pretty().boxed(),
        }
    }
}

pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init_logging() -> anyhow::Result<()> {
    let format = std::env::var("LOG_FORMAT")
        .map(|raw| LogFormat::parse(&raw))
        .unwrap_or(LogFormat::Full);

    tracing_subscriber::registry()
        .with(format.layer())
        .with(env_filter())
        .try_init()?;

    tracing::info!("Logging initialized ({:?} format)", format);
    Ok(())
}
