//! Service startup sequence.
//!
//! Build the settings store, load and validate every subsystem, install
//! logging, announce the deployment, then provision the database.

use std::path::PathBuf;
use std::sync::Arc;

use ballast_config::{Config, ConfigError, ConfigLoader, ConfigStore};
use ballast_db::{DbProvisioner, ProvisionError, Provisioned};
use ballast_telemetry::LogConfig;
use thiserror::Error;

/// Errors that stop a service from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    /// Settings could not be read or failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The database could not be provisioned.
    #[error(transparent)]
    Provision(#[from] ProvisionError),
}

impl StartupError {
    /// Whether the process should exit rather than run degraded.
    ///
    /// Bad configuration and failed migrations are fatal. An unreachable
    /// database is not.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Config(_) => true,
            Self::Provision(err) => err.is_fatal(),
        }
    }
}

/// A started service.
#[derive(Debug)]
pub struct Service {
    /// Validated configuration.
    pub config: Arc<Config>,
    /// Provisioned database.
    pub db: Provisioned,
}

/// Configures and runs the startup sequence.
///
/// # Example
///
/// ```rust,ignore
/// use ballast::Startup;
///
/// let service = Startup::new("ledger")
///     .with_http_client("billing")
///     .run_or_exit()
///     .await?;
/// ```
#[derive(Debug)]
pub struct Startup {
    app_name: String,
    config_file: Option<PathBuf>,
    env_prefix: Option<String>,
    dotenv: bool,
    env_vars: Option<Vec<(String, String)>>,
    http_clients: Vec<String>,
    custom_sections: Vec<String>,
    logging: bool,
    provisioner: DbProvisioner,
}

impl Startup {
    /// Start configuring `app_name`.
    ///
    /// Defaults: search `/etc/<app>/`, `$HOME/.<app>/` and `.` for
    /// `config.ini`, read the process environment and a `.env` file if
    /// present, install logging, and use every compiled-in database backend.
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            config_file: None,
            env_prefix: None,
            dotenv: true,
            env_vars: None,
            http_clients: Vec::new(),
            custom_sections: Vec::new(),
            logging: true,
            provisioner: DbProvisioner::new(),
        }
    }

    /// Read this file instead of searching. It must exist.
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Prefix environment lookups.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Use these variables instead of the process environment and `.env`.
    pub fn with_env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Skip the `.env` file.
    pub fn without_dotenv(mut self) -> Self {
        self.dotenv = false;
        self
    }

    /// Leave the global subscriber alone.
    pub fn without_logging(mut self) -> Self {
        self.logging = false;
        self
    }

    /// Also load the `<name>.client.*` section.
    pub fn with_http_client(mut self, name: impl Into<String>) -> Self {
        self.http_clients.push(name.into());
        self
    }

    /// Also load the `<name>.*` section as a custom section.
    pub fn with_custom(mut self, name: impl Into<String>) -> Self {
        self.custom_sections.push(name.into());
        self
    }

    /// Use a custom provisioner.
    pub fn with_provisioner(mut self, provisioner: DbProvisioner) -> Self {
        self.provisioner = provisioner;
        self
    }

    /// Build the settings store from the configured sources.
    pub fn store(&self) -> Result<ConfigStore, ConfigError> {
        let mut builder = ConfigStore::builder();

        builder = match &self.config_file {
            Some(path) => builder.with_file(path)?,
            None => builder.with_search_paths(&self.app_name)?,
        };

        if let Some(prefix) = &self.env_prefix {
            builder = builder.with_env_prefix(prefix);
        }

        builder = match &self.env_vars {
            Some(vars) => builder.with_env_vars(vars.iter().cloned()),
            None if self.dotenv => builder.with_environment().with_dotenv()?,
            None => builder.with_environment(),
        };

        builder.build()
    }

    /// Load and validate every subsystem.
    pub fn load(&self) -> Result<Config, ConfigError> {
        let store = self.store()?;

        let mut loader = ConfigLoader::new(&store)
            .with_server()
            .with_deployment(&self.app_name)
            .with_logging()
            .with_db()
            .with_cache()
            .with_swagger()
            .with_instrumentation();
        for name in &self.http_clients {
            loader = loader.with_http_client(name);
        }
        for name in &self.custom_sections {
            loader = loader.with_custom(name);
        }

        loader.load_validated()
    }

    /// Run the full sequence.
    ///
    /// A logging failure, such as a subscriber already being installed, is
    /// reported on stderr and the sequence continues.
    pub async fn run(self) -> Result<Service, StartupError> {
        let config = Arc::new(self.load()?);

        if self.logging {
            let deployment = config.deployment.clone().unwrap_or_default();
            let log_config = LogConfig::for_deployment(&deployment, config.logging.as_ref());
            if let Err(err) = ballast_telemetry::init_logging(&log_config) {
                eprintln!("logging not installed: {err}");
                tracing::warn!(error = %err, "logging not installed");
            }
        }
        if let Some(deployment) = &config.deployment {
            ballast_telemetry::log_deployment(deployment);
        }

        let db_config = config.db.clone().unwrap_or_default();
        let db = self.provisioner.provision(&db_config).await?;
        tracing::info!(kind = %db_config.kind, state = %db.state, "startup complete");

        Ok(Service { config, db })
    }

    /// Like [`run`](Self::run), but exits the process with status 1 on a
    /// fatal error. Non-fatal errors are returned.
    pub async fn run_or_exit(self) -> Result<Service, StartupError> {
        match self.run().await {
            Err(err) if err.is_fatal() => {
                tracing::error!(error = %err, "startup failed");
                eprintln!("{err}");
                std::process::exit(1);
            }
            other => other,
        }
    }
}
