use authsession::config::{load_config, print_schema};
use authsession::startup;
use authsession::utils::logger::init_logging;
use tracing::{error, info};

/// Load configuration, start logging, restore the persisted session, log the
/// resolved state and exit.
///
/// The binary is a startup check for the library: it does not stay resident
/// or serve requests. Applications embed [`startup::run`] and keep the
/// returned manager. `--schema` prints the configuration JSON schema instead.
/// Any startup error is reported on stderr and exits with status 1.
#[tokio::main]
async fn main() {
    if std::env::args().any(|arg| arg == "--schema") {
        if let Err(e) = print_schema() {
            eprintln!("{}", e);
            std::process::exit(1);
        }
        return;
    }

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    match startup::run(&config).await {
        Ok(manager) => info!("Session ready: {}", manager.current_state()),
        Err(e) => {
            error!("Failed to start session manager: {}", e);
            std::process::exit(1);
        }
    }
}
