#[cfg(feature = "trace")]
pub(crate) mod tracer {
    use tracing::level_filters::LevelFilter;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::Layer;

    /// Install the global subscriber.
    ///
    /// `RUST_LOG` directives are honored on top of `level`. Output goes to
    /// stderr so replay results on stdout stay machine readable. Set
    /// `SIAD_DISABLE_LOGS` to skip installation and `SIAD_LOG_FORMAT=compact`
    /// for single-line events.
    pub fn init_tracer(level: Option<LevelFilter>) -> anyhow::Result<()> {
        if std::env::var("SIAD_DISABLE_LOGS").is_ok() {
            return Ok(());
        }

        let default_filter = if cfg!(any(test, debug_assertions)) {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        };
        let default_filter = level.unwrap_or(default_filter);
        let filter_layer = tracing_subscriber::EnvFilter::builder()
            .with_default_directive(default_filter.into())
            .from_env_lossy();

        let compact = std::env::var("SIAD_LOG_FORMAT")
            .map(|v| v.to_lowercase() == "compact")
            .unwrap_or(false);
        let with_location = cfg!(any(test, debug_assertions));

        let fmt_layer = if compact {
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .compact()
                .with_writer(std::io::stderr)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .pretty()
                .with_file(with_location)
                .with_line_number(with_location)
                .with_writer(std::io::stderr)
                .boxed()
        };

        tracing_subscriber::registry()
            .with(fmt_layer.with_filter(filter_layer))
            .try_init()?;
        Ok(())
    }
}
