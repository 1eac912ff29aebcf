#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = school_survey::run().await {
        eprintln!("school-survey fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
