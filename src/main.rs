#[tokio::main]
async fn main() {
    if let Err(e) = tapsight::run().await {
        eprintln!("tapsight failed to start: {e}");
        std::process::exit(1);
    }
}
