#[tokio::main]
async fn main() {
    if let Err(e) = posture_portal::run().await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
