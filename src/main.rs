#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stillpoint_lib::run().await
}
