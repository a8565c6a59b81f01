use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

const APP_TARGET: &str = "lahan";

/// Logs go to stderr so tables on stdout stay clean. Verbose mode adds our
/// debug events and the HTTP client's info events; `RUST_LOG` narrows further.
pub fn init_logging(verbose: bool) {
    let (targets, level) = if verbose {
        (
            Targets::new()
                .with_target(APP_TARGET, LevelFilter::DEBUG)
                .with_target("reqwest", LevelFilter::INFO),
            "debug",
        )
    } else {
        (Targets::new().with_target(APP_TARGET, LevelFilter::WARN), "warn")
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .pretty()
                .without_time()
                .with_target(verbose)
                .with_writer(std::io::stderr),
        )
        .with(targets)
        .with(env_filter)
        .try_init();
}
