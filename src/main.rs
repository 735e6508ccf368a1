//! Nelum Skill — intent-dispatch entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Parse CLI args
//!   3. Init logger once (CLI `-v` flags > env > "info")
//!   4. Read config.ini (fail-soft — a missing file means defaults)
//!   5. Resolve settings (defaults ← config ← env)
//!   6. Connect to the MQTT dialogue bus, subscribe to intents
//!   7. Spawn Ctrl-C → shutdown signal watcher
//!   8. Run the dispatch loop until shutdown or a fatal bus error

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use nelum_skill::dialogue::mqtt::{self, MqttDialogue};
use nelum_skill::dialogue::DialogueApi;
use nelum_skill::dispatch::{Dispatcher, IntentHandler};
use nelum_skill::error::AppError;
use nelum_skill::{config, handlers, logger};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present — ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();

    let env_level = std::env::var("NELUM_LOG_LEVEL").ok();
    let level = args.log_level.or(env_level.as_deref()).unwrap_or("info");
    logger::init(level, args.log_level.is_some())?;

    let config_path = config::expand_home(args.config_path.as_deref().unwrap_or(config::CONFIG_INI));
    let document = config::read(&config_path);
    let settings = config::Settings::resolve(&document);

    info!(
        config = %config_path.display(),
        mqtt_addr = %settings.mqtt_addr,
        log_level = %level,
        "skill starting"
    );

    let (bus, eventloop) = MqttDialogue::connect(&settings.mqtt_addr, "nelum-skill")?;
    let api: Arc<dyn DialogueApi> = Arc::new(bus);

    // One entry per intent this skill answers. Replace the placeholder
    // names with the intent names your assistant is trained on.
    let table: Vec<(&str, IntentHandler)> = vec![
        ("intent_1", Box::new(handlers::action_one)),
        ("intent_2", Box::new(handlers::action_two)),
    ];
    let dispatcher = Dispatcher::new(api, table);

    // Shared shutdown token — Ctrl-C cancels it, the dispatch loop watches it.
    let shutdown = CancellationToken::new();
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received — initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    mqtt::run(eventloop, dispatcher, shutdown).await
}

struct CliArgs {
    log_level: Option<&'static str>,
    config_path: Option<String>,
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut config_path = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: nelum-skill [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -f, --config <PATH>        Path to configuration file (default: config.ini)");
                println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
                std::process::exit(0);
            }
            "-f" | "--config" => {
                if let Some(path) = iter.next() {
                    config_path = Some(path);
                } else {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            _ => {}
        }
    }

    // Each -v raises verbosity one tier:
    //   -v      → warn   (warnings and errors only)
    //   -vv     → info   (normal operational output)
    //   -vvv    → debug  (routing, handler registration)
    //   -vvvv+  → trace  (full payload dumps)
    let log_level = match verbosity {
        0 => None,
        1 => Some("warn"),
        2 => Some("info"),
        3 => Some("debug"),
        _ => Some("trace"),
    };

    CliArgs { log_level, config_path }
}
