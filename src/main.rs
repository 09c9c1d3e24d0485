use anyhow::Result;
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info};

mod audio;
mod bot;
mod config;
mod error;
mod sources;
mod ui;
mod voice;

use crate::audio::manager::SessionManager;
use crate::bot::announce::HttpAnnouncer;
use crate::bot::BriskBot;
use crate::config::Config;
use crate::sources::YtDlpResolver;
use crate::voice::songbird_backend::SongbirdGateway;

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("brisk_music=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando Brisk Music v{}", env!("CARGO_PKG_VERSION"));

    // Manejar health check si es necesario
    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check().await;
    }

    // Cargar configuración
    let config = Arc::new(Config::load()?);
    info!("{}", config.summary());

    // Configurar intents mínimos necesarios
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    // Construir cliente con songbird registrado
    let songbird = Songbird::serenity();
    let handler = BriskBot::new(config.clone());
    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .register_songbird_with(songbird.clone())
        .await?;

    // El núcleo de reproducción se arma con las piezas reales: gateway de
    // songbird, resolver yt-dlp y anuncios por HTTP.
    let manager = SessionManager::new(
        Arc::new(SongbirdGateway::new(songbird, client.cache.clone())),
        Arc::new(YtDlpResolver::new()),
        Arc::new(HttpAnnouncer::new(client.http.clone())),
        config.default_volume,
        config.idle_timeout(),
    );

    {
        let mut data = client.data.write().await;
        data.insert::<SessionManager>(manager.clone());
    }

    // Apagado explícito: Ctrl+C cierra todas las sesiones de voz antes de
    // terminar el proceso.
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Error al registrar Ctrl+C");
        info!("⚠️ Señal de shutdown recibida, cerrando sesiones...");
        manager.shutdown_all().await;
        std::process::exit(0);
    });

    // Iniciar bot
    info!("🚀 Bot iniciado");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}

async fn health_check() -> Result<()> {
    YtDlpResolver::verify_dependencies().await?;
    println!("OK");
    Ok(())
}
