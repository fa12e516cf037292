use lycan::prelude::*;

const DEFAULT_BIND: &str = "0.0.0.0:8080";

/// `LYCAN_BIND`, or the default listen address when unset or blank.
fn bind_addr(var: Option<String>) -> String {
    var.map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_BIND.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,lycan=debug".into()),
        )
        .init();

    let addr = bind_addr(std::env::var("LYCAN_BIND").ok());
    tracing::info!(%addr, "starting werewolf server");

    let server = LycanServer::builder().bind(&addr).build().await?;
    server.run().await?;
    Ok(())
}
