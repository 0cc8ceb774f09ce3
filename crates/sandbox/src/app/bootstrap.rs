use std::path::PathBuf;

use devtools::{
    load_config, load_def_database, resolve_app_paths, AppPaths, ConfigError, ContentLoadError,
    ContentLoadRequest, DevToolsConfig, StartupError,
};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::commands::{CommandRegistry, RegistryError};
use super::sandbox::Sandbox;
use super::world::{SandboxWorld, DEFAULT_MAP_SIZE};

const ENABLED_PACKS_ENV_VAR: &str = "DEVTOOLS_ENABLED_PACKS";
const CONFIG_ENV_VAR: &str = "DEVTOOLS_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "devtools.json";

#[derive(Debug, Error)]
pub(crate) enum SandboxError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    ContentLoad(#[from] ContentLoadError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

pub(crate) fn build_sandbox() -> Result<Sandbox, SandboxError> {
    info!("=== DevTools Sandbox Startup ===");

    let app_paths = resolve_app_paths()?;
    let config = resolve_config(&app_paths)?;
    let request = ContentLoadRequest {
        enabled_packs: parse_enabled_packs_from_env(),
    };
    let database = load_def_database(&app_paths, &request)?;
    info!(
        root = %app_paths.root.display(),
        def_count = database.len(),
        enabled_packs = request.enabled_packs.len(),
        "sandbox_ready"
    );

    Ok(Sandbox::new(
        CommandRegistry::with_sandbox_builtins()?,
        database,
        &config,
        SandboxWorld::with_demo_population(DEFAULT_MAP_SIZE, DEFAULT_MAP_SIZE),
    ))
}

/// `DEVTOOLS_CONFIG` wins; otherwise `devtools.json` at the root if present.
fn resolve_config(app_paths: &AppPaths) -> Result<DevToolsConfig, ConfigError> {
    let path = match std::env::var_os(CONFIG_ENV_VAR) {
        Some(raw) => PathBuf::from(raw),
        None => {
            let candidate = app_paths.root.join(DEFAULT_CONFIG_FILE);
            if !candidate.is_file() {
                info!("config_defaults_used");
                return Ok(DevToolsConfig::default());
            }
            candidate
        }
    };
    let config = load_config(&path)?;
    info!(
        path = %path.display(),
        display_cap = config.cache.display_cap,
        expiry_interval_ticks = config.cache.expiry_interval_ticks,
        "config_loaded"
    );
    Ok(config)
}

fn parse_enabled_packs_from_env() -> Vec<String> {
    std::env::var(ENABLED_PACKS_ENV_VAR)
        .ok()
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(ToString::to_string)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default()
}
