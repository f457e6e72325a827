use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter directive.
pub const LOG_ENV: &str = "PROMPT_PIPELINES_LOG";

const CRATE_TARGET: &str = "prompt_pipelines";

/// Install a stderr `fmt` subscriber.
///
/// `PROMPT_PIPELINES_LOG` wins when set; otherwise `debug` with `verbose`, else `warn`.
/// Calling this twice is harmless.
pub fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let directives = std::env::var(LOG_ENV).unwrap_or_else(|_| fallback.to_string());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_from(&directives))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Errors from this crate stay visible unless `directives` names the crate itself.
fn filter_from(directives: &str) -> EnvFilter {
    EnvFilter::builder().parse_lossy(format!("{CRATE_TARGET}=error,{directives}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn global_off_keeps_crate_errors() {
        assert_eq!(filter_from("off").max_level_hint(), Some(LevelFilter::ERROR));
    }

    #[test]
    fn user_directives_can_raise_the_level() {
        assert_eq!(filter_from("debug").max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(
            filter_from("off,prompt_pipelines=info").max_level_hint(),
            Some(LevelFilter::INFO)
        );
    }
}
