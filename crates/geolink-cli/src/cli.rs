//! CLI argument parsing

use clap::{ArgAction, Args, Parser, Subcommand};
use geolink_client::FeatureClassId;
use std::path::PathBuf;

/// Main CLI application structure
#[derive(Parser, Debug)]
#[command(
    name = "geolink",
    version,
    about = "Query and edit an ArcGIS-style feature service",
    long_about = "geolink drives a feature service from the command line.\n\
                  Reads go to the read-only service root; after `geolink login` requests\n\
                  carry a token and go to the editable root when one is configured.\n\n\
                  The session (including the password used to renew tokens) is stored\n\
                  under the user config directory. Run `geolink logout` to remove it."
)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Options shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Read-only service root, e.g. https://host/arcgis/rest/services/Utilities
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Editable service root used while logged in
    #[arg(long, global = true)]
    pub editable_url: Option<String>,

    /// Token endpoint
    #[arg(long, global = true)]
    pub token_url: Option<String>,

    /// Directory holding the persisted session
    #[arg(long, global = true, env = "GEOLINK_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List feature classes and tables of the service
    Layers,

    /// Show a feature class descriptor
    Describe {
        /// Feature class id
        feature_class: FeatureClassId,
    },

    /// Query features
    Query {
        /// Feature class id
        feature_class: FeatureClassId,

        #[command(flatten)]
        filter: FilterArgs,

        /// Order by, e.g. "NAME DESC"
        #[arg(long)]
        order_by: Option<String>,
    },

    /// Count matching features
    Count {
        /// Feature class id
        feature_class: FeatureClassId,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Fetch one feature by object id
    Get {
        /// Feature class id
        feature_class: FeatureClassId,

        /// Object id
        id: i64,
    },

    /// Records related to a feature
    Related {
        /// Feature class id
        feature_class: FeatureClassId,

        /// Object id
        id: i64,

        /// Relationship id
        #[arg(long, short = 'r')]
        relationship: i64,
    },

    /// Distinct values of a field starting with a prefix
    Suggest {
        /// Feature class id
        feature_class: FeatureClassId,

        /// Field name
        field: String,

        /// Prefix to complete
        stub: String,
    },

    /// Legend of every layer
    Legend,

    /// Log in and store the session
    Login {
        /// User name
        #[arg(long, short = 'u')]
        username: String,

        /// Password
        #[arg(long, env = "GEOLINK_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored session
    Logout,

    /// Show the stored session
    Status,

    /// Add a feature
    Insert {
        /// Feature class id
        feature_class: FeatureClassId,

        /// Feature data as a JSON object, or @path to a file holding one
        #[arg(long, short = 'd')]
        data: String,
    },

    /// Update a feature (the data must carry the object id field)
    Update {
        /// Feature class id
        feature_class: FeatureClassId,

        /// Feature data as a JSON object, or @path to a file holding one
        #[arg(long, short = 'd')]
        data: String,
    },

    /// Delete a feature by object id
    Delete {
        /// Feature class id
        feature_class: FeatureClassId,

        /// Object id
        id: i64,
    },

    /// Print the full URL of a route against the active service root
    Url {
        /// Route segments, e.g. MapServer 3 query
        #[arg(required = true)]
        segments: Vec<String>,

        /// Extra parameter as name=value (repeatable)
        #[arg(long = "param", short = 'p')]
        params: Vec<String>,
    },
}

/// Where clause and spatial filter of a query
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// SQL where clause
    #[arg(long = "where", short = 'w')]
    pub where_clause: Option<String>,

    /// GeoJSON file with the Feature or Geometry to filter by
    #[arg(long)]
    pub within: Option<PathBuf>,
}
