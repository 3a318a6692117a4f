use market_tools::Application;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app = Application::init().await?;
    app.run().await
}
