use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use taskgate::prelude::*;

const REPORT_KEY: &str = "demo-report";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logger()?;
    info!("logger initialized");

    let controller = Arc::new(ExclusivityController::new());

    // Three report sections share one key: whoever is admitted first writes
    // first, regardless of how long each section takes to render.
    let header = JustTask::value("header")
        .delayed(Duration::from_millis(150))
        .exclusive_on(Arc::clone(&controller), Some(REPORT_KEY.into()));
    let body = JustTask::value("body")
        .delayed(Duration::from_millis(50))
        .exclusive_on(Arc::clone(&controller), Some(REPORT_KEY.into()));

    // The footer only renders once the storage precondition holds.
    let storage_ready: Arc<dyn Condition> = Arc::new(BlockCondition::new(|| async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        info!("storage precondition satisfied");
        Ok(())
    }));
    let footer = JustTask::value("footer")
        .gated(vec![storage_ready])
        .exclusive_on(Arc::clone(&controller), Some(REPORT_KEY.into()));

    let mut sections = Vec::new();
    for task in [header, body, footer] {
        sections.push(tokio::spawn(async move { task.run().await }));
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    for section in sections {
        let rendered = section.await??;
        info!(section = rendered, "section completed");
    }

    info!(idle = controller.is_idle(REPORT_KEY), "report done");
    Ok(())
}

fn init_logger() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;
    Ok(())
}
