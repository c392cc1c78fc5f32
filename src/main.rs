#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fittrack::tracing::init();
    fittrack::app::run().await
}
