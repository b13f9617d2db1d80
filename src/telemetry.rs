//! Tracing setup for the lesson-plan backend.
//!
//! `LOG_LEVEL` takes EnvFilter directives; without it, our own targets
//! (`giaoan`, the crate) log at debug and HTTP spans at info. `LOG_FORMAT=json`
//! switches to one JSON object per line for log shippers.

use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "info,giaoan=debug,giaoan_pro_backend=debug,tower_http=info,axum=info";

fn filter() -> EnvFilter {
    EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

pub fn init_tracing() {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
