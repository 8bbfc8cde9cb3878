use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize structured JSON logging for the engine's playback, draft and autosave events.
///
/// Events go to stderr so stdout stays clean for exported transcripts and `locate` output.
/// Defaults to `error` level unless overridden by `ECHOLINE_LOG` (e.g.
/// `ECHOLINE_LOG=echoline::notes=debug` to follow note save races).
pub fn init() {
    let filter = EnvFilter::builder()
        .with_env_var("ECHOLINE_LOG")
        .with_default_directive(tracing::level_filters::LevelFilter::ERROR.into())
        .from_env_lossy();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(true)
                .with_span_list(true),
        )
        .try_init();
}
