#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = olympiad_rust::run().await {
        eprintln!("olympiad-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
