//! # Example: Service
//!
//! A small service with a startup hook, a ticking loop, an hourly scheduled job
//! and a shutdown hook. Stop it with Ctrl-C (or SIGQUIT to stop serving without
//! exiting until SIGTERM).
//!
//! Run with: `RUST_LOG=info cargo run --example service`

use std::sync::Arc;
use std::time::Duration;

use appvisor::{
    looping, process_fn, scheduled, App, AppConfig, Context, Cursor, HookOptions, HookPriority,
    Interval, LogSink, MemoryCursor, Options, ProcessError, ScheduledRun, Ungated,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig {
        shutdown_timeout: Duration::from_secs(5),
        ..AppConfig::default()
    };
    let mut app = App::new(cfg).with_events(Arc::new(LogSink::new()));

    app.on_startup(
        process_fn(|_ctx: Context| async {
            tracing::info!("connecting to database");
            Ok::<_, ProcessError>(())
        }),
        HookOptions::new()
            .with_name("db")
            .with_priority(HookPriority::FIRST),
    );

    app.add_process(looping(
        process_fn(|_ctx: Context| async {
            tracing::info!("tick");
            Ok::<_, ProcessError>(())
        }),
        Options::new()
            .with_name("ticker")
            .with_sleep(Duration::from_secs(2)),
    ));

    let cursor: Arc<dyn Cursor> = Arc::new(MemoryCursor::new());
    app.add_process(scheduled(
        &Ungated,
        cursor,
        "hourly_report",
        Interval::new(Duration::from_secs(3600))?,
        |_ctx: Context, run: ScheduledRun| async move {
            tracing::info!(run_id = %run.id, due = %run.due, "building report");
            Ok::<_, ProcessError>(())
        },
        Options::new(),
    ));

    app.on_shutdown(
        process_fn(|_ctx: Context| async {
            tracing::info!("closing database");
            Ok::<_, ProcessError>(())
        }),
        HookOptions::new().with_name("db"),
    );

    let code = app.run().await;
    std::process::exit(code);
}
