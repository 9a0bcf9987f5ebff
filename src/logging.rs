use anyhow::Context as _;

/// `RUST_LOG` wins; otherwise the filter follows the CLI verbosity.
pub fn init(verbosity: u8) -> anyhow::Result<()> {
    let default_filter = match verbosity {
        0 => "error",
        1 => "warn,novel_translate=info",
        _ => "warn,novel_translate=debug",
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(default_filter))
        .context("build log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}
