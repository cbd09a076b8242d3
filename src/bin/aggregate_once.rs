//! One aggregation run, printed as a grouped text report on stdout.

use news_aggregator::config::AppConfig;
use news_aggregator::report::render_text;
use news_aggregator::Aggregator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    news_aggregator::init_tracing();

    let cfg = AppConfig::load_default()?;
    let aggregator = Aggregator::from_config(&cfg)?;
    let report = aggregator.run().await?;

    print!("{}", render_text(&report, chrono::Local::now()));
    Ok(())
}
