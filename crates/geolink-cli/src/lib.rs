//! # geolink CLI
//!
//! Command-line driver for [`geolink_client`]: list and describe feature
//! classes, query and count features, log in, and apply edits against an
//! ArcGIS-style feature service. Every command prints JSON on stdout; logs go
//! to stderr.
//!
//! ## Usage
//!
//! ```bash
//! export GEOLINK_SERVICE_URL=https://host/arcgis/rest/services/Utilities
//! export GEOLINK_TOKEN_URL=https://host/arcgis/tokens/generateToken
//!
//! geolink layers
//! geolink query 3 --where "STATUS = 'ACTIVE'" --order-by NAME
//! geolink login --username editor          # password from GEOLINK_PASSWORD
//! geolink insert 3 --data @hydrant.json
//! ```
//!
//! ## Architecture
//!
//! 1. **Command Layer** (`cli`): clap-based argument parsing
//! 2. **Settings** (`settings`): config file, environment and flags merged
//!    into a [`ClientConfig`](geolink_client::ClientConfig)
//! 3. **Execution Layer** (`executor`): one client call per command
//! 4. **Output Layer** (`output`): pretty JSON

pub mod cli;
pub mod error;
pub mod executor;
pub mod output;
pub mod settings;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub use cli::{Cli, Commands, FilterArgs, GlobalArgs};
pub use error::{CliError, CliResult};
pub use executor::CommandExecutor;
pub use settings::Settings;

/// Install a stderr logger; `RUST_LOG` wins over `verbosity`
pub fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A subscriber may already be installed when embedded
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Run the CLI application
pub async fn run() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    let settings = Settings::load(&cli.global)?;
    let executor = CommandExecutor::new(settings.build_client().await?);
    let output = executor.execute(cli.command).await?;
    output::display(&output)
}
