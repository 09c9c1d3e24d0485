use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub application_id: u64,
    pub guild_id: Option<u64>, // Para comandos de desarrollo

    // Audio
    pub default_volume: f32,

    // Ciclo de vida
    pub idle_timeout_secs: u64, // Espera antes de desconectar por inactividad
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            // Discord
            discord_token: std::env::var("DISCORD_TOKEN")?,
            application_id: std::env::var("APPLICATION_ID")?.parse()?,
            guild_id: std::env::var("GUILD_ID").ok().and_then(|s| s.parse().ok()),

            // Audio
            default_volume: std::env::var("DEFAULT_VOLUME")
                .unwrap_or_else(|_| "0.5".to_string())
                .parse()?,

            // Ciclo de vida
            idle_timeout_secs: std::env::var("IDLE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "300".to_string()) // 5 minutos
                .parse()?,
        };

        config.validate()?;

        Ok(config)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Chequeos de sanidad sobre los valores cargados.
    pub fn validate(&self) -> Result<()> {
        if self.default_volume < 0.0 || self.default_volume > 2.0 {
            anyhow::bail!(
                "El volumen por defecto debe estar entre 0.0 y 2.0, se recibió: {}",
                self.default_volume
            );
        }

        if self.idle_timeout_secs == 0 {
            anyhow::bail!("El timeout de inactividad debe ser mayor que 0");
        }

        Ok(())
    }

    /// Resumen seguro de la configuración para los logs (sin el token).
    pub fn summary(&self) -> String {
        format!(
            "Config: app {} (guild: {}) • {}% vol • idle {}s",
            self.application_id,
            self.guild_id
                .map_or("global".to_string(), |id| id.to_string()),
            (self.default_volume * 100.0) as u32,
            self.idle_timeout_secs,
        )
    }
}

/// Valores por defecto, usados cuando las variables de entorno faltan.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (sin defaults, deben proveerse)
            discord_token: String::new(),
            application_id: 0,
            guild_id: None,

            // Audio
            default_volume: 0.5,

            // Ciclo de vida
            idle_timeout_secs: 300, // 5 minutos
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_passes_validation() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn out_of_range_volume_is_rejected() {
        let config = Config {
            default_volume: 2.5,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_idle_timeout_is_rejected() {
        let config = Config {
            idle_timeout_secs: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
