use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt, registry};

const DEFAULT_DIRECTIVES: &str = "postboard=info,tower_http=info";
const VERBOSE_DIRECTIVES: &str = "postboard=debug,tower_http=debug";

/// Filter directives used when `RUST_LOG` is not set.
pub fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        VERBOSE_DIRECTIVES
    } else {
        DEFAULT_DIRECTIVES
    }
}

/// Install the global subscriber. Human-readable output in development,
/// one JSON object per line in production. Logs go to stderr so command
/// output on stdout stays clean.
///
/// Calling this twice is harmless; the second call is ignored.
pub fn init(verbose: bool, production: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    let result = if production {
        registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .try_init()
    } else {
        registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
