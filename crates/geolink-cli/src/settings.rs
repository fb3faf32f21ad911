//! Layered configuration: file, then `GEOLINK_*` environment, then flags.

use config::{Config, Environment, File};
use geolink_client::{ClientConfig, JsonFileStore, ServiceClient};
use geolink_http::{HttpTransportConfig, TimeoutConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::cli::GlobalArgs;
use crate::error::{CliError, CliResult};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "GEOLINK";

/// Everything needed to build a client
#[derive(Debug, Clone)]
pub struct Settings {
    pub client: ClientConfig,
    pub state_dir: PathBuf,
    pub timeout: Option<Duration>,
}

impl Settings {
    /// Load from the process environment and `args`
    pub fn load(args: &GlobalArgs) -> CliResult<Self> {
        Self::from_sources(args, Environment::with_prefix(ENV_PREFIX))
    }

    /// Load with an explicit environment source
    pub fn from_sources(args: &GlobalArgs, environment: Environment) -> CliResult<Self> {
        let mut builder = Config::builder();
        if let Some(path) = &args.config {
            builder = builder.add_source(File::from(path.as_path()));
        }
        let mut client: ClientConfig = builder
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        if let Some(url) = &args.url {
            client.set_service_url(url);
        }
        if let Some(url) = &args.editable_url {
            client.set_editable_service_url(url);
        }
        if let Some(url) = &args.token_url {
            client.token_url = Some(url.clone());
        }

        let state_dir = match &args.state_dir {
            Some(dir) => dir.clone(),
            None => dirs::config_dir()
                .map(|dir| dir.join("geolink"))
                .ok_or_else(|| {
                    CliError::InvalidArguments(
                        "no user config directory, pass --state-dir".to_string(),
                    )
                })?,
        };

        Ok(Self {
            client: client.normalized(),
            state_dir,
            timeout: args.timeout.map(Duration::from_secs),
        })
    }

    /// Client with a session persisted under `state_dir`
    pub async fn build_client(&self) -> CliResult<ServiceClient> {
        let store = JsonFileStore::new(&self.state_dir, &self.client.store_name);
        debug!(path = %store.path().display(), "Session store");

        let mut http = HttpTransportConfig::default();
        if let Some(timeout) = self.timeout {
            http.timeout = TimeoutConfig::default().with_request_timeout(timeout);
        }

        Ok(ServiceClient::builder()
            .with_config(self.client.clone())
            .with_http_config(http)
            .with_store(Arc::new(store))
            .build()
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Environment::with_prefix(ENV_PREFIX).source(Some(source))
    }

    fn args() -> GlobalArgs {
        GlobalArgs {
            state_dir: Some(PathBuf::from("/tmp/geolink-test")),
            ..GlobalArgs::default()
        }
    }

    #[test]
    fn test_environment_only() {
        let settings = Settings::from_sources(
            &args(),
            env(&[
                ("GEOLINK_SERVICE_URL", "https://host/arcgis/rest/services/Utilities"),
                ("GEOLINK_STRICT_UPDATE_RESULTS", "true"),
            ]),
        )
        .unwrap();

        assert_eq!(
            settings.client.service_url,
            "https://host/arcgis/rest/services/Utilities/"
        );
        assert!(settings.client.strict_update_results);
        assert_eq!(settings.client.shape_attribute, "SHAPE");
        assert!(settings.timeout.is_none());
    }

    #[test]
    fn test_flags_override_file_and_environment() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "service_url = \"https://file/arcgis/rest/services/A\"\n\
             token_url = \"https://file/arcgis/tokens/generateToken\"\n\
             shape_attribute = \"GEOM\""
        )
        .unwrap();

        let args = GlobalArgs {
            config: Some(file.path().to_path_buf()),
            url: Some("https://flag/arcgis/rest/services/B".to_string()),
            timeout: Some(5),
            ..args()
        };
        let settings = Settings::from_sources(
            &args,
            env(&[("GEOLINK_EDITABLE_SERVICE_URL", "https://env/arcgis/rest/services/BEdit")]),
        )
        .unwrap();

        assert_eq!(settings.client.service_url, "https://flag/arcgis/rest/services/B/");
        assert_eq!(
            settings.client.editable_service_url.as_deref(),
            Some("https://env/arcgis/rest/services/BEdit/")
        );
        assert_eq!(
            settings.client.token_url.as_deref(),
            Some("https://file/arcgis/tokens/generateToken")
        );
        assert_eq!(settings.client.shape_attribute, "GEOM");
        assert_eq!(settings.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let args = GlobalArgs {
            config: Some(PathBuf::from("/nonexistent/geolink.toml")),
            ..args()
        };
        let err = Settings::from_sources(&args, env(&[])).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[tokio::test]
    async fn test_build_client_requires_service_url() {
        let dir = tempfile::TempDir::new().unwrap();
        let args = GlobalArgs {
            state_dir: Some(dir.path().to_path_buf()),
            ..GlobalArgs::default()
        };
        let settings = Settings::from_sources(&args, env(&[])).unwrap();
        let err = settings.build_client().await.unwrap_err();
        assert!(matches!(
            err,
            CliError::Client(geolink_client::ClientError::InvalidConfig(_))
        ));
    }
}
