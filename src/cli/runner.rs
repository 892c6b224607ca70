//! CLI runner - executes commands

use crate::auth::{AuthConfig, AuthFactory, InMemoryTokenStorage, OAuth2Handler, OAuth2TokenStorage};
use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::RuntimeConfig;
use crate::error::{Error, Result, ResultExt};
use crate::http::{EnhancedApiClient, RequestOptions};
use crate::pagination::PaginateOptions;
use crate::queue::EnqueueOptions;
use crate::types::{JsonValue, Method, StringMap};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Request {
                method,
                endpoint,
                body,
                headers,
                timeout_ms,
            } => {
                self.request(*method, endpoint, body.as_deref(), headers, *timeout_ms)
                    .await
            }
            Commands::Health { endpoint } => self.health(endpoint).await,
            Commands::Paginate {
                endpoint,
                limit,
                max_pages,
            } => self.paginate(endpoint, *limit, *max_pages).await,
            Commands::Methods => self.methods(),
            Commands::AuthorizeUrl { state } => self.authorize_url(state.as_deref()),
            Commands::Validate => self.validate(),
        }
    }

    /// Load the runtime config named by `-C`
    fn load_config(&self) -> Result<RuntimeConfig> {
        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::config("Config file not specified (use -C flag)"))?;
        RuntimeConfig::load(path)
    }

    /// Auth payload from `--auth-json`, falling back to the config
    fn auth_payload(&self, config: &RuntimeConfig) -> Result<Option<JsonValue>> {
        match &self.cli.auth_json {
            Some(raw) => serde_json::from_str(raw).context("Invalid --auth-json").map(Some),
            None => Ok(config.auth_payload.clone()),
        }
    }

    fn build_client(&self, config: &RuntimeConfig) -> Result<EnhancedApiClient> {
        let storage: Arc<dyn OAuth2TokenStorage> = Arc::new(InMemoryTokenStorage::new());
        config.build_client(&AuthFactory::with_builtins(), Some(storage))
    }

    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&str>,
        headers: &[String],
        timeout_ms: Option<u64>,
    ) -> Result<()> {
        let config = self.load_config()?;
        let auth = self.auth_payload(&config)?;
        let client = Arc::new(self.build_client(&config)?);

        let body: Option<JsonValue> = body
            .map(serde_json::from_str)
            .transpose()
            .context("Invalid --body")?;
        let headers = parse_headers(headers)?;
        let timeout = timeout_ms.map(Duration::from_millis);
        let endpoint = endpoint.to_string();

        let make_options = move || RequestOptions {
            body: body.clone().map(Into::into),
            headers: headers.clone(),
            auth: auth.clone(),
            timeout,
            ..RequestOptions::default()
        };

        let response = match config.build_queue()? {
            Some(queue) => {
                let ticket = queue.enqueue(
                    move || {
                        let client = Arc::clone(&client);
                        let endpoint = endpoint.clone();
                        let options = make_options();
                        async move { client.request(method, &endpoint, options).await }
                    },
                    EnqueueOptions::new(),
                )?;
                debug!("Queued request {}", ticket.id());
                ticket.await?
            }
            None => client.request(method, &endpoint, make_options()).await?,
        };

        self.output(&response);
        Ok(())
    }

    async fn health(&self, endpoint: &str) -> Result<()> {
        let config = self.load_config()?;
        let auth = self.auth_payload(&config)?;
        let client = self.build_client(&config)?;

        let status = client.health_check(endpoint, auth).await;
        self.output(&serde_json::to_value(&status)?);

        if status.healthy {
            Ok(())
        } else {
            Err(Error::api(format!("Health check against {endpoint} failed")))
        }
    }

    async fn paginate(&self, endpoint: &str, limit: u32, max_pages: u32) -> Result<()> {
        let config = self.load_config()?;
        let auth = self.auth_payload(&config)?;
        let client = self.build_client(&config)?;

        let mut options = PaginateOptions::new().limit(limit).max_pages(max_pages);
        if let Some(auth) = auth {
            options = options.auth(auth);
        }
        let result = client.paginate::<JsonValue>(endpoint, options).await?;
        self.output(&serde_json::to_value(&result)?);
        Ok(())
    }

    fn methods(&self) -> Result<()> {
        let factory = AuthFactory::with_builtins();
        let methods: Vec<JsonValue> = factory
            .available_custom_methods()
            .iter()
            .map(|m| {
                json!({
                    "name": m.name(),
                    "description": m.description(),
                    "version": m.version(),
                    "config_schema": m.config_schema(),
                })
            })
            .collect();
        self.output(&JsonValue::Array(methods));
        Ok(())
    }

    fn authorize_url(&self, state: Option<&str>) -> Result<()> {
        let config = self.load_config()?;
        let oauth2_config = match &config.auth {
            Some(AuthConfig::Oauth2 {
                oauth2_config: Some(cfg),
            }) => cfg.clone(),
            _ => return Err(Error::config("authorize-url needs an oauth2 auth config")),
        };

        let handler = OAuth2Handler::new(oauth2_config, Arc::new(InMemoryTokenStorage::new()));
        let url = handler.authorization_url(state)?;
        self.output(&json!({ "authorization_url": url }));
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let config = self.load_config()?;
        // resolving the handler catches missing auth pieces too
        self.build_client(&config)?;
        self.output(&json!({
            "status": "valid",
            "base_url": config.base_url,
            "auth": config.auth.as_ref().map(auth_label),
            "queue": config.queue.is_some(),
        }));
        Ok(())
    }

    /// Output a JSON document
    fn output(&self, value: &JsonValue) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(value).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
            }
        }
    }
}

fn auth_label(auth: &AuthConfig) -> &'static str {
    match auth {
        AuthConfig::BasicAuth => "basic_auth",
        AuthConfig::ApiKey { .. } => "api_key",
        AuthConfig::EnhancedApiKey(_) => "enhanced_api_key",
        AuthConfig::BearerToken => "bearer_token",
        AuthConfig::Oauth2 { .. } => "oauth2",
        AuthConfig::Custom { .. } => "custom",
    }
}

/// Parse `NAME:VALUE` header arguments
pub(crate) fn parse_headers(raw: &[String]) -> Result<StringMap> {
    raw.iter()
        .map(|header| {
            let (name, value) = header.split_once(':').ok_or_else(|| {
                Error::invalid_value("header", format!("expected NAME:VALUE, got '{header}'"))
            })?;
            let name = name.trim();
            if name.is_empty() {
                return Err(Error::invalid_value("header", "header name is empty"));
            }
            Ok((name.to_string(), value.trim().to_string()))
        })
        .collect()
}
