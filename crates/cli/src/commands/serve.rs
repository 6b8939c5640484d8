//! `quarry serve`: start the HTTP service.

use quarry_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("Quarry service");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   RPC:       POST /rpc {{\"method\":\"handle_search\",\"params\":{{\"query\":...}}}}");

    quarry_gateway::start(config).await?;

    Ok(())
}
