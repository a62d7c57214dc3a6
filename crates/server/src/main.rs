use pit_server::RoomRegistry;
use pit_server::http;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pit_server=info,pit_engine=info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .unwrap_or(3000);

    let registry = RoomRegistry::new();
    let app = http::router(registry);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on {addr}");
    tracing::info!("  WS   /ws/{{room_id}}?username=...&prevSessionData=...");
    tracing::info!("  GET  /zhealth");
    tracing::info!("  GET  /catalog/powers");
    tracing::info!("  GET  /catalog/bots");

    axum::serve(listener, app).await?;
    Ok(())
}
