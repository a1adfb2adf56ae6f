//! The Plaza server binary.
//!
//! Wires the pieces together: config from `config.ron` plus CLI overrides,
//! structured logging, the health endpoint, the single-writer engine task,
//! and the TCP gateway. Runs until Ctrl-C.
//!
//! Run with: `cargo run -p plaza-server`

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use plaza_citygen::CityParams;
use plaza_config::{CliArgs, Config, default_config_dir};
use plaza_health::HealthServer;
use plaza_net::{Engine, FrameConfig, Gateway, GatewayConfig, intent_channel};
use plaza_world::WorldCounters;

/// Capacity of the shared intent channel.
const INTENT_BUFFER: usize = 1024;

fn city_params(config: &Config) -> CityParams {
    CityParams {
        half_extent: config.city.half_extent,
        road_spacing: config.city.road_spacing,
        two_by_two_chance: config.city.two_by_two_chance,
        min_height: config.city.min_height,
        max_height: config.city.max_height,
        window_chance: config.city.window_chance,
    }
}

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    let config_dir = args.config.clone().unwrap_or_else(default_config_dir);
    let mut config = match Config::load_or_create(&config_dir) {
        Ok(config) => config,
        Err(e) => {
            // Logging is not up yet.
            eprintln!("failed to load configuration: {e}");
            std::process::exit(1);
        }
    };
    config.apply_cli_overrides(&args);

    plaza_log::init_logging(Some(&config));
    info!("Plaza server starting");

    let bind_addr: SocketAddr = match format!(
        "{}:{}",
        config.network.bind_address, config.network.port
    )
    .parse()
    {
        Ok(addr) => addr,
        Err(e) => {
            error!(
                bind = %config.network.bind_address,
                port = config.network.port,
                "invalid bind address: {e}"
            );
            std::process::exit(1);
        }
    };

    let counters = Arc::new(WorldCounters::new());

    // Health endpoint on its own thread; a bind failure here is fatal.
    let mut health = HealthServer::new(config.network.health_port);
    if let Err(e) = health.start(Arc::clone(&counters)) {
        error!("{e}");
        std::process::exit(1);
    }
    info!(port = health.actual_port(), "health endpoint up");

    // Seed the generator; a random seed still logs so a session can be
    // reproduced afterwards.
    let seed = config.city.seed.unwrap_or_else(rand::random);
    info!(seed, "city generator seeded");

    let (intents, intent_rx) = intent_channel(INTENT_BUFFER);
    let engine = Engine::new(city_params(&config), seed, Arc::clone(&counters));
    tokio::spawn(engine.run(intent_rx));

    let gateway = Arc::new(Gateway::new(
        GatewayConfig {
            bind_addr,
            max_connections: config.network.max_connections,
            outbound_buffer: config.network.outbound_buffer,
            frame: FrameConfig {
                max_payload_size: config.network.max_frame_bytes,
            },
        },
        intents,
    ));

    let accept = {
        let gateway = Arc::clone(&gateway);
        tokio::spawn(async move { gateway.run().await })
    };

    tokio::select! {
        result = accept => match result {
            Ok(Ok(())) => info!("gateway stopped"),
            Ok(Err(e)) => {
                error!("gateway failed: {e}");
                std::process::exit(1);
            }
            Err(e) => {
                error!("gateway task panicked: {e}");
                std::process::exit(1);
            }
        },
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
            gateway.shutdown();
        }
    }

    info!("Plaza server stopped");
}
