use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Log levels selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Debug,
}

impl Verbosity {
    fn into_env_filter(self) -> EnvFilter {
        match self {
            Self::Quiet => EnvFilter::new("warn"),
            Self::Normal => EnvFilter::new("info"),
            Self::Debug => EnvFilter::new("harvest=debug,harvest_fetch=debug,info"),
        }
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the flags.
pub fn init(verbosity: Verbosity) {
    let no_color = std::env::var("NO_COLOR").is_ok_and(|v| !v.is_empty());

    let filter = if std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default().is_empty() {
        verbosity.into_env_filter()
    } else {
        EnvFilter::from_default_env()
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(!no_color)
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}
