#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tollgate_cli::run().await?;
    Ok(())
}
