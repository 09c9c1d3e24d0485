//! # Bot Module
//!
//! Discord-facing shell of Brisk Music.
//!
//! This module contains the event handler glue: slash-command registration,
//! interaction dispatch into the playback core, and voice-state cleanup when
//! the bot is kicked out of a channel. The actual playback logic lives in
//! [`crate::audio`]; handlers here only translate interactions into calls on
//! the [`SessionManager`] and render the typed outcomes back as messages.

use serenity::{
    all::{Context, EventHandler, GuildId, Interaction, Ready, VoiceState},
    async_trait,
};
use std::sync::Arc;
use tracing::{error, info, warn};

pub mod announce;
pub mod commands;
pub mod handlers;

use crate::audio::manager::SessionManager;
use crate::config::Config;

/// Handler principal de eventos de Discord.
pub struct BriskBot {
    /// Configuración cargada desde variables de entorno
    config: Arc<Config>,
}

impl BriskBot {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Registra los comandos slash, global o por guild según configuración.
    async fn register_commands(&self, ctx: &Context) {
        let result = match self.config.guild_id {
            Some(guild_id) => {
                info!("🏠 Registrando comandos para guild de desarrollo: {}", guild_id);
                commands::register_guild_commands(ctx, GuildId::new(guild_id)).await
            }
            None => {
                info!("🌐 Registrando comandos globalmente");
                commands::register_global_commands(ctx).await
            }
        };

        match result {
            Ok(()) => info!("✅ Comandos registrados"),
            Err(e) => error!("❌ Error registrando comandos: {:?}", e),
        }
    }
}

#[async_trait]
impl EventHandler for BriskBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        self.register_commands(&ctx).await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            if let Err(e) = handlers::handle_command(&ctx, command).await {
                error!("Error manejando comando: {:?}", e);
            }
        }
    }

    /// Limpieza cuando el bot es desconectado del canal de voz desde fuera
    /// (kick, cierre del canal): la sesión se destruye en vez de quedar
    /// colgada esperando tracks.
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let bot_id = ctx.cache.current_user().id;
        if new.user_id != bot_id || new.channel_id.is_some() || old.is_none() {
            return;
        }
        let Some(guild_id) = new.guild_id else { return };

        let manager = {
            let data = ctx.data.read().await;
            data.get::<SessionManager>().cloned()
        };
        let Some(manager) = manager else { return };

        if manager.leave(guild_id).await.is_ok() {
            warn!("🔌 Bot desconectado externamente en guild {}, sesión destruida", guild_id);
        }
    }
}
