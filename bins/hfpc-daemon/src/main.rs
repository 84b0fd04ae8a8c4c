use clap::Parser;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use hfpc_config::{SharedConfig, TransportBackend, toml_config};
use hfpc_core::debug;
use hfpc_core::hfp_entities::HfpEntity;
use hfpc_entities::MessageRouter;
use hfpc_entities::hf::HfClient;
use hfpc_entities::observer::NotificationObserver;
use hfpc_entities::transport::TransportEntity;

/// Load configuration file
fn load_config_from_toml(cfg_path: &str) -> SharedConfig {
    match toml_config::from_file(cfg_path) {
        Ok(c) => c,
        Err(e) => {
            println!("Failed to load configuration from {}: {}", cfg_path, e);
            std::process::exit(1);
        }
    }
}

/// Build the HF client stack
fn build_hf_stack(cfg: &mut SharedConfig) -> MessageRouter {
    let mut router = MessageRouter::new(cfg.clone());

    // Add the transport entity matching the configured backend
    match cfg.config().transport.backend {
        TransportBackend::None => {
            // No native stack attached; events come in over the transport
            // entity's injection channel
            let transport = TransportEntity::new(cfg.clone());
            router.register_entity(Box::new(transport));
        }
        backend => {
            unimplemented!("Unsupported transport backend: {:?}", backend);
        }
    }

    let hf = HfClient::new(cfg.clone());
    router.register_entity(Box::new(hf));

    // Terminal observers so notification streams land in the log
    for observer in [HfpEntity::Telephony, HfpEntity::Broadcast, HfpEntity::Audio] {
        router.register_entity(Box::new(NotificationObserver::new(observer)));
    }

    router
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "HFP client stack",
    long_about = "Runs the hands-free profile client stack using the provided TOML configuration file"
)]

struct Args {
    /// Config file (required)
    #[arg(help = "TOML config with transport/audio/call parameters")]
    config: String,
}

fn main() {
    eprintln!("░█░█░█▀▀░█▀█░█▀▀");
    eprintln!("░█▀█░█▀▀░█▀▀░█░░");
    eprintln!("░▀░▀░▀░░░▀░░░▀▀▀\n");

    let args = Args::parse();
    let mut cfg = load_config_from_toml(&args.config);
    let _log_guard = debug::setup_logging_default(cfg.config().debug_log.clone());

    let mut router = build_hf_stack(&mut cfg);

    // Set up Ctrl+C handler for graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .expect("failed to set Ctrl+C handler");

    router.run_stack(None, Some(running));
}
