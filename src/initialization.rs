use std::{env, fs};
use std::path::PathBuf;
use std::sync::Arc;
use derivative::Derivative;
use rustls::crypto::aws_lc_rs;
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use serde::Deserialize;
use crate::errors::ConfigError;
use crate::logging::setup_logger;
use crate::tree_walker::FolderErrorPolicy;

/// Service principal credentials for the client credential flow
///
#[derive(Derivative, Clone, Default)]
#[derivative(Debug)]
pub struct Credentials {
    pub tenant_id: String,
    pub client_id: String,
    #[derivative(Debug = "ignore")]
    pub client_secret: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Azure {
    #[serde(default = "default_authority_host")]
    pub authority_host: String,
    #[serde(default = "default_scope")]
    pub scope: String,
}

impl Default for Azure {
    fn default() -> Self {
        Azure {
            authority_host: default_authority_host(),
            scope: default_scope(),
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct Graph {
    #[serde(default = "default_graph_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for Graph {
    fn default() -> Self {
        Graph {
            endpoint: default_graph_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// The one document storage site this deployment serves
///
#[derive(Deserialize, Clone, Debug)]
pub struct Site {
    pub hostname: String,
    pub path: String,
    pub id: String,
    #[serde(default = "default_drive_name")]
    pub drive_name: String,
    #[serde(default = "default_search")]
    pub search: String,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct Traversal {
    #[serde(default)]
    pub on_folder_error: FolderErrorPolicy,
}

#[derive(Deserialize, Debug)]
pub struct WebServerParameters {
    pub bind_address: String,
    pub bind_port: u16,
    pub workers: Option<usize>,
    pub tls_cert_path: Option<String>,
    pub tls_key_path: Option<String>,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct General {
    pub log_path: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct Config {
    #[serde(skip)]
    pub credentials: Credentials,
    #[serde(default)]
    pub azure: Azure,
    #[serde(default)]
    pub graph: Graph,
    pub site: Site,
    #[serde(default)]
    pub traversal: Traversal,
    pub web_server: WebServerParameters,
    #[serde(default)]
    pub general: General,
}

fn default_authority_host() -> String { "https://login.microsoftonline.com".to_string() }
fn default_scope() -> String { "https://graph.microsoft.com/.default".to_string() }
fn default_graph_endpoint() -> String { "https://graph.microsoft.com/v1.0".to_string() }
fn default_timeout_secs() -> u64 { 30 }
fn default_drive_name() -> String { "Documents".to_string() }
fn default_search() -> String { "*".to_string() }

/// Returns a configuration struct for the application and starts logging
///
pub fn config() -> Result<Config, ConfigError> {
    dotenv::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    let config_path = args.iter()
        .find(|p| p.starts_with("--config="))
        .and_then(|p| p.split_once('='))
        .map(|(_, path)| path)
        .ok_or_else(|| ConfigError("missing --config=<path> argument".to_string()))?;

    let mut config = load_config(config_path)?;
    config.credentials = Credentials {
        tenant_id: read_credential("tenant_id", "TENANT_ID")?,
        client_id: read_credential("client_id", "CLIENT_ID")?,
        client_secret: read_credential("client_secret", "CLIENT_SECRET")?,
    };

    setup_logger(config.general.log_path.as_deref())?;

    Ok(config)
}

/// Loads the configuration file and returns a struct with all configuration items
///
/// # Arguments
///
/// * 'config_path' - path to the configuration file
pub fn load_config(config_path: &str) -> Result<Config, ConfigError> {
    let toml = fs::read_to_string(config_path)?;
    let config: Config = toml::from_str(&toml)?;

    Ok(config)
}

/// Reads a credential, first from the environment and then from the file system
/// supported by the credstore and given from systemd
///
/// # Arguments
///
/// * 'name' - name of the credential file
/// * 'env_name' - name of the environment variable
fn read_credential(name: &str, env_name: &str) -> Result<String, ConfigError> {
    if let Ok(value) = env::var(env_name) {
        if !value.trim().is_empty() {
            return Ok(value.trim().to_string());
        }
    }

    let dir = env::var("CREDENTIALS_DIRECTORY")
        .map_err(|_| ConfigError(format!("credential {} not set in {} or credstore", name, env_name)))?;
    let mut p = PathBuf::from(dir);
    p.push(name);
    let bytes = fs::read(p)?;
    Ok(String::from_utf8(bytes)?.trim_end().to_string())
}

/// Returns a rustls server configuration if the web server is set up for TLS
///
/// # Arguments
///
/// * 'web_server' - web server parameters holding the PEM file paths
pub fn tls_config(web_server: &WebServerParameters) -> Result<Option<rustls::ServerConfig>, ConfigError> {
    match (&web_server.tls_cert_path, &web_server.tls_key_path) {
        (Some(cert_path), Some(key_path)) => {
            let certs = CertificateDer::pem_file_iter(cert_path)?
                .collect::<Result<Vec<_>, _>>()?;
            let key = PrivateKeyDer::from_pem_file(key_path)?;

            let config = rustls::ServerConfig::builder_with_provider(Arc::new(aws_lc_rs::default_provider()))
                .with_safe_default_protocol_versions()?
                .with_no_client_auth()
                .with_single_cert(certs, key)?;

            Ok(Some(config))
        }
        (None, None) => Ok(None),
        _ => Err(ConfigError("tls_cert_path and tls_key_path must be given together".to_string())),
    }
}
