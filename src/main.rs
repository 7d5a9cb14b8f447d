#[tokio::main]
async fn main() -> std::io::Result<()> {
    tank_server::run_with_config().await
}
