#[tokio::main]
async fn main() -> std::io::Result<()> {
    arena_client::run_with_config().await
}
