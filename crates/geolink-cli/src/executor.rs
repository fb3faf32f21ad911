//! Command execution using geolink-client

use geolink_client::{QueryOptions, QueryParams, ServiceClient};
use secrecy::SecretString;
use serde_json::{Map, Value, json};
use std::path::Path;
use tracing::info;

use crate::cli::{Commands, FilterArgs};
use crate::error::{CliError, CliResult};

/// Runs commands against one client and returns their JSON output
#[derive(Debug)]
pub struct CommandExecutor {
    client: ServiceClient,
}

impl CommandExecutor {
    #[must_use]
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }

    /// The underlying client
    pub fn client(&self) -> &ServiceClient {
        &self.client
    }

    /// Execute a command
    pub async fn execute(&self, command: Commands) -> CliResult<Value> {
        match command {
            Commands::Layers => Ok(serde_json::to_value(self.client.service_metadata().await?)?),

            Commands::Describe { feature_class } => Ok(serde_json::to_value(
                self.client.feature_class_details(&feature_class).await?,
            )?),

            Commands::Query {
                feature_class,
                filter,
                order_by,
            } => {
                let mut options = query_options(&filter).await?;
                if let Some(order_by) = order_by {
                    options = options.with_order_by(order_by);
                }
                let records = self.client.query(&feature_class, &options).await?;
                Ok(Value::Array(records.into_iter().map(Value::Object).collect()))
            }

            Commands::Count {
                feature_class,
                filter,
            } => {
                let options = query_options(&filter).await?;
                Ok(json!({ "count": self.client.count(&feature_class, &options).await? }))
            }

            Commands::Get { feature_class, id } => Ok(self
                .client
                .feature_details(&feature_class, id)
                .await?
                .map_or(Value::Null, Value::Object)),

            Commands::Related {
                feature_class,
                id,
                relationship,
            } => Ok(self
                .client
                .related_records(relationship, &feature_class, id)
                .await?),

            Commands::Suggest {
                feature_class,
                field,
                stub,
            } => Ok(Value::Array(
                self.client.autocomplete(&feature_class, &field, &stub).await?,
            )),

            Commands::Legend => Ok(self.client.legend().await?),

            Commands::Login { username, password } => {
                if !self
                    .client
                    .authenticate(username.as_str(), SecretString::new(password))
                    .await?
                {
                    return Err(CliError::LoginRejected(username));
                }
                info!(username = %username, "Logged in");
                self.status().await
            }

            Commands::Logout => {
                self.client.logout().await?;
                self.status().await
            }

            Commands::Status => self.status().await,

            Commands::Insert {
                feature_class,
                data,
            } => {
                let data = feature_data(&data).await?;
                let object_id = self.client.insert_feature(&feature_class, &data).await?;
                Ok(json!({ "success": object_id.is_some(), "objectId": object_id }))
            }

            Commands::Update {
                feature_class,
                data,
            } => {
                let data = feature_data(&data).await?;
                let success = self.client.update_feature(&feature_class, &data).await?;
                Ok(json!({ "success": success }))
            }

            Commands::Delete { feature_class, id } => {
                let success = self.client.delete_feature(&feature_class, id).await?;
                Ok(json!({ "success": success, "objectId": id }))
            }

            Commands::Url { segments, params } => {
                let extra = parse_params(&params)?;
                Ok(Value::from(self.client.full_url(segments.as_slice(), extra).await?))
            }
        }
    }

    /// Session summary without the password or token
    async fn status(&self) -> CliResult<Value> {
        let session = self.client.session().await;
        Ok(json!({
            "authenticated": session.is_authenticated,
            "username": session.username,
            "tokenExpires": session.auth_token_expires,
            "baseUrl": self.client.current_base_url().await,
        }))
    }
}

/// `name=value` pairs to parameters; values stay text
pub fn parse_params(pairs: &[String]) -> CliResult<QueryParams> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .filter(|(name, _)| !name.is_empty())
                .map(|(name, value)| (name.to_string(), Value::from(value)))
                .ok_or_else(|| {
                    CliError::InvalidArguments(format!("expected name=value, got {pair:?}"))
                })
        })
        .collect()
}

/// A JSON object given inline or as `@path`
pub async fn feature_data(arg: &str) -> CliResult<Map<String, Value>> {
    let text = match arg.strip_prefix('@') {
        Some(path) => tokio::fs::read_to_string(path).await?,
        None => arg.to_string(),
    };
    match serde_json::from_str::<Value>(&text)? {
        Value::Object(map) => Ok(map),
        other => Err(CliError::InvalidArguments(format!(
            "feature data must be a JSON object, got {other}"
        ))),
    }
}

async fn query_options(filter: &FilterArgs) -> CliResult<QueryOptions> {
    let mut options = QueryOptions::new();
    if let Some(clause) = &filter.where_clause {
        options = options.with_where(clause.as_str());
    }
    if let Some(path) = &filter.within {
        options = options.with_filter_geometry(read_geojson(path).await?);
    }
    Ok(options)
}

async fn read_geojson(path: &Path) -> CliResult<Value> {
    let text = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_params() {
        let params = parse_params(&["where=NAME = 'A'".to_string(), "outFields=*".to_string()])
            .unwrap();
        assert_eq!(params["where"], json!("NAME = 'A'"));
        assert_eq!(params["outFields"], json!("*"));

        assert!(parse_params(&["novalue".to_string()]).is_err());
        assert!(parse_params(&["=x".to_string()]).is_err());
    }

    #[tokio::test]
    async fn test_feature_data_inline_and_file() {
        let inline = feature_data(r#"{"NAME": "Hydrant"}"#).await.unwrap();
        assert_eq!(inline["NAME"], json!("Hydrant"));

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("feature.json");
        std::fs::write(&path, r#"{"OBJECTID": 4}"#).unwrap();
        let from_file = feature_data(&format!("@{}", path.display())).await.unwrap();
        assert_eq!(from_file["OBJECTID"], json!(4));
    }

    #[tokio::test]
    async fn test_feature_data_rejects_non_objects() {
        let err = feature_data("[1, 2]").await.unwrap_err();
        assert!(matches!(err, CliError::InvalidArguments(_)));
        assert!(matches!(feature_data("{").await.unwrap_err(), CliError::Json(_)));
    }
}
