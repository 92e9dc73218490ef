//! Logging initialization.
//!
//! Logs go to stderr; stdout is left for command output. `RUST_LOG`
//! overrides the configured level.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Effective filter directive for a configured level and the `--verbose` flag.
fn directive(level: &str, verbose: bool) -> String {
    let level = if verbose && !matches!(level, "debug" | "trace") {
        "debug"
    } else {
        level
    };
    format!("keepsake={level},keepsake_core={level},warn")
}

/// Initialize the logging subsystem.
pub fn init(level: &str, verbose: bool, json_format: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directive(level, verbose)));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize logging from the `[logging]` config section, with CLI overrides.
pub fn init_from_config(
    config: &keepsake_core::Config,
    verbose_override: bool,
    json_logs_override: bool,
) {
    let json_format = json_logs_override || config.logging.format == "json";
    init(&config.logging.level, verbose_override, json_format);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive() {
        assert_eq!(directive("info", false), "keepsake=info,keepsake_core=info,warn");
        assert_eq!(directive("info", true), "keepsake=debug,keepsake_core=debug,warn");
        assert_eq!(directive("trace", true), "keepsake=trace,keepsake_core=trace,warn");
    }
}
