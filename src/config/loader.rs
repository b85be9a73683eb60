use super::Config;
use anyhow::{Context, Result};
use directories::UserDirs;
use std::fs;
use std::path::Path;

const CONFIG_DIR: &str = ".interview-relay";
const CONFIG_FILE: &str = "config.toml";

impl Config {
    /// Loads `~/.interview-relay/config.toml`, writing defaults on first run.
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        let config_dir = home.join(CONFIG_DIR);
        let config_path = config_dir.join(CONFIG_FILE);

        if !config_path.exists() {
            fs::create_dir_all(&config_dir)
                .context("Failed to create .interview-relay directory")?;
            let config = Self {
                config_path,
                ..Self::default()
            };
            config.save()?;
            return config.finish();
        }

        Self::load_from(&config_path)
    }

    /// Loads an explicit config file. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            toml::from_str::<Config>(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        } else {
            tracing::info!(path = %path.display(), "config file not found, using defaults");
            Config::default()
        };
        config.config_path = path.to_path_buf();
        config.finish()
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }

    fn finish(mut self) -> Result<Self> {
        self.apply_env_overrides();
        self.validate()?;
        Ok(self)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Applies overrides from `lookup`; empty values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| lookup(name).filter(|value| !value.trim().is_empty()))
        };

        if let Some(key) = var(&["GEMINI_API_KEY", "GOOGLE_API_KEY"]) {
            self.provider.api_key = Some(key);
        }

        if let Some(model) = var(&["INTERVIEW_RELAY_MODEL"]) {
            self.provider.model = model;
        }

        if let Some(port) = var(&["INTERVIEW_RELAY_PORT", "PORT"])
            .and_then(|raw| raw.trim().parse::<u16>().ok())
        {
            self.gateway.port = port;
        }

        if let Some(host) = var(&["INTERVIEW_RELAY_HOST", "HOST"]) {
            self.gateway.host = host;
        }

        if let Some(url) = var(&["INTERVIEW_RELAY_URL"]) {
            self.client.relay_url = url;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            anyhow::bail!(
                "provider.temperature must be within 0.0..=2.0 (got {})",
                self.provider.temperature
            );
        }
        if self.client.relay_url.trim().is_empty() {
            anyhow::bail!("client.relay_url must not be empty");
        }
        if self.provider.model.trim().is_empty() {
            anyhow::bail!("provider.model must not be empty");
        }
        Ok(())
    }
}
