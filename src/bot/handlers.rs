use anyhow::Result;
use serenity::{
    builder::{
        CreateInteractionResponse, CreateInteractionResponseMessage, EditInteractionResponse,
    },
    model::{
        application::CommandInteraction,
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use std::sync::Arc;
use tracing::info;

use crate::{
    audio::manager::SessionManager,
    audio::session::{SkipOutcome, SkipReason, VolumeRequest},
    error::MusicError,
    ui::embeds,
};

/// Maneja comandos slash
pub async fn handle_command(ctx: &Context, command: CommandInteraction) -> Result<()> {
    let guild_id = command
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Comando usado fuera de un servidor"))?;

    info!(
        "📝 Comando /{} usado por {} en guild {}",
        command.data.name, command.user.name, guild_id
    );

    let manager = session_manager(ctx).await?;

    match command.data.name.as_str() {
        "play" => handle_play(ctx, &command, guild_id, &manager).await?,
        "join" => handle_join(ctx, &command, guild_id, &manager).await?,
        "leave" => handle_leave(ctx, &command, guild_id, &manager).await?,
        "skip" => handle_skip(ctx, &command, guild_id, &manager).await?,
        "pause" => handle_pause(ctx, &command, guild_id, &manager).await?,
        "resume" => handle_resume(ctx, &command, guild_id, &manager).await?,
        "stop" => handle_stop(ctx, &command, guild_id, &manager).await?,
        "queue" => handle_queue(ctx, &command, guild_id, &manager).await?,
        "nowplaying" => handle_nowplaying(ctx, &command, guild_id, &manager).await?,
        "shuffle" => handle_shuffle(ctx, &command, guild_id, &manager).await?,
        "remove" => handle_remove(ctx, &command, guild_id, &manager).await?,
        "loop" => handle_loop(ctx, &command, guild_id, &manager).await?,
        "volume" => handle_volume(ctx, &command, guild_id, &manager).await?,
        _ => {
            respond_text(ctx, &command, "❌ Comando no reconocido").await?;
        }
    }

    Ok(())
}

async fn session_manager(ctx: &Context) -> Result<Arc<SessionManager>> {
    let data = ctx.data.read().await;
    data.get::<SessionManager>()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("SessionManager no inicializado"))
}

// Handlers específicos para cada comando

async fn handle_play(
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    manager: &Arc<SessionManager>,
) -> Result<()> {
    let query = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "query")
        .and_then(|opt| opt.value.as_str())
        .ok_or_else(|| anyhow::anyhow!("Query no proporcionado"))?
        .to_string();

    // Defer: la resolución puede tardar varios segundos
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
        )
        .await?;

    let edit = match user_voice_channel(ctx, guild_id, command.user.id) {
        Ok(voice_channel) => {
            match manager
                .play(
                    guild_id,
                    voice_channel,
                    &query,
                    command.user.id,
                    command.channel_id,
                )
                .await
            {
                Ok(track) => {
                    EditInteractionResponse::new().embed(embeds::create_track_added_embed(&track))
                }
                Err(e) => EditInteractionResponse::new().embed(embeds::create_error_embed(&e.to_string())),
            }
        }
        Err(e) => EditInteractionResponse::new().embed(embeds::create_error_embed(&e.to_string())),
    };

    command.edit_response(&ctx.http, edit).await?;
    Ok(())
}

async fn handle_join(
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    manager: &Arc<SessionManager>,
) -> Result<()> {
    let result = match user_voice_channel(ctx, guild_id, command.user.id) {
        Ok(voice_channel) => manager
            .join(guild_id, voice_channel)
            .await
            .map(|_| voice_channel),
        Err(e) => Err(e),
    };

    match result {
        Ok(voice_channel) => {
            respond_text(ctx, command, &format!("✅ **Conectado a <#{voice_channel}>**")).await
        }
        Err(e) => respond_error(ctx, command, &e).await,
    }
}

async fn handle_leave(
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    manager: &Arc<SessionManager>,
) -> Result<()> {
    match manager.leave(guild_id).await {
        Ok(()) => respond_text(ctx, command, "👋 **Desconectado del canal de voz**").await,
        Err(e) => respond_error(ctx, command, &e).await,
    }
}

async fn handle_skip(
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    manager: &Arc<SessionManager>,
) -> Result<()> {
    let session = match manager.session(guild_id) {
        Ok(session) => session,
        Err(e) => return respond_error(ctx, command, &e).await,
    };

    // El votante tiene que estar escuchando en el mismo canal que el bot.
    match user_voice_channel(ctx, guild_id, command.user.id) {
        Ok(channel) if channel == session.channel_id() => {}
        Ok(_) => {
            return respond_error(
                ctx,
                command,
                &MusicError::VoiceState("tienes que estar en mi canal de voz para votar"),
            )
            .await;
        }
        Err(e) => return respond_error(ctx, command, &e).await,
    }

    let outcome = session.skip(command.user.id, has_move_members(command)).await;
    let message = match outcome {
        SkipOutcome::Skipped(SkipReason::SoleListener) => "⏭️ **Música saltada.**".to_string(),
        SkipOutcome::Skipped(SkipReason::Requester) => {
            "⏭️ **Música saltada por quien la pidió.**".to_string()
        }
        SkipOutcome::Skipped(SkipReason::Privileged) => {
            "⏭️ **Música saltada por un DJ.**".to_string()
        }
        SkipOutcome::Skipped(SkipReason::VotePassed) => {
            "⏭️ **Música saltada por votación.**".to_string()
        }
        SkipOutcome::VoteRecorded { votes, needed } => {
            format!("✅ Voto registrado, va **{votes}/{needed}**")
        }
        SkipOutcome::AlreadyVoted => "👉 **Ya votaste para saltar esta canción.**".to_string(),
        SkipOutcome::NothingPlaying => "😴 No se está reproduciendo nada ahora...".to_string(),
    };

    respond_text(ctx, command, &message).await
}

async fn handle_pause(
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    manager: &Arc<SessionManager>,
) -> Result<()> {
    match manager.session(guild_id).and_then(|s| s.pause()) {
        Ok(()) => respond_text(ctx, command, "⏸️ **Reproducción pausada**").await,
        Err(e) => respond_error(ctx, command, &e).await,
    }
}

async fn handle_resume(
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    manager: &Arc<SessionManager>,
) -> Result<()> {
    match manager.session(guild_id).and_then(|s| s.resume()) {
        Ok(()) => respond_text(ctx, command, "▶️ **Reproducción reanudada**").await,
        Err(e) => respond_error(ctx, command, &e).await,
    }
}

async fn handle_stop(
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    manager: &Arc<SessionManager>,
) -> Result<()> {
    match manager.session(guild_id) {
        Ok(session) => {
            let cleared = session.stop_and_clear();
            respond_text(
                ctx,
                command,
                &format!("⏹️ **Reproducción detenida**, {cleared} canciones descartadas"),
            )
            .await
        }
        Err(e) => respond_error(ctx, command, &e).await,
    }
}

async fn handle_queue(
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    manager: &Arc<SessionManager>,
) -> Result<()> {
    let page = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "page")
        .and_then(|opt| opt.value.as_i64())
        .unwrap_or(1)
        .max(1) as usize;

    const ITEMS_PER_PAGE: usize = 10;

    match manager.session(guild_id).and_then(|session| {
        session
            .queue_page(page, ITEMS_PER_PAGE)
            .map(|queue_page| (session.now_playing(), queue_page, session.is_looping()))
    }) {
        Ok((now_playing, queue_page, looping)) => {
            let embed = embeds::create_queue_embed(
                now_playing.as_ref(),
                &queue_page,
                ITEMS_PER_PAGE,
                looping,
            );
            respond_embed(ctx, command, embed).await
        }
        Err(e) => respond_error(ctx, command, &e).await,
    }
}

async fn handle_nowplaying(
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    manager: &Arc<SessionManager>,
) -> Result<()> {
    match manager.session(guild_id).map(|s| s.now_playing()) {
        Ok(Some(track)) => {
            respond_embed(ctx, command, embeds::create_now_playing_embed(&track)).await
        }
        Ok(None) => respond_text(ctx, command, "😴 No se está reproduciendo nada ahora...").await,
        Err(e) => respond_error(ctx, command, &e).await,
    }
}

async fn handle_shuffle(
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    manager: &Arc<SessionManager>,
) -> Result<()> {
    match manager.session(guild_id).and_then(|s| s.shuffle()) {
        Ok(()) => respond_text(ctx, command, "🔀 **Cola mezclada**").await,
        Err(e) => respond_error(ctx, command, &e).await,
    }
}

async fn handle_remove(
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    manager: &Arc<SessionManager>,
) -> Result<()> {
    let index = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "index")
        .and_then(|opt| opt.value.as_i64())
        .ok_or_else(|| anyhow::anyhow!("Índice no proporcionado"))?;

    if index < 1 {
        return respond_error(
            ctx,
            command,
            &MusicError::OutOfRange { index: 0, len: 0 },
        )
        .await;
    }

    // El usuario ve posiciones 1-based; la cola usa 0-based.
    match manager
        .session(guild_id)
        .and_then(|s| s.remove(index as usize - 1))
    {
        Ok(removed) => {
            respond_text(ctx, command, &format!("🗑️ **{}** eliminada de la cola", removed.title()))
                .await
        }
        Err(e) => respond_error(ctx, command, &e).await,
    }
}

async fn handle_loop(
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    manager: &Arc<SessionManager>,
) -> Result<()> {
    match manager.session(guild_id).and_then(|s| s.toggle_loop()) {
        Ok(true) => respond_text(ctx, command, "🔂 **Repetición activada**").await,
        Ok(false) => respond_text(ctx, command, "➡️ **Repetición desactivada**").await,
        Err(e) => respond_error(ctx, command, &e).await,
    }
}

async fn handle_volume(
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    manager: &Arc<SessionManager>,
) -> Result<()> {
    let session = match manager.session(guild_id) {
        Ok(session) => session,
        Err(e) => return respond_error(ctx, command, &e).await,
    };

    let level = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "level")
        .and_then(|opt| opt.value.as_str());

    // Sin argumento el comando solo informa el volumen actual.
    let Some(level) = level else {
        return respond_text(
            ctx,
            command,
            &format!("👉 El volumen está en **{}%**", session.volume_percent()),
        )
        .await;
    };

    let Some(request) = VolumeRequest::parse(level) else {
        return respond_text(
            ctx,
            command,
            "👉 **El volumen debe ser un entero entre 0 y 200, o mute/max/up/down**",
        )
        .await;
    };

    let applied = session.set_volume(request);
    respond_text(ctx, command, &format!("🔊 Volumen ajustado a **{applied}%**")).await
}

// Utilidades compartidas

/// Canal de voz en el que está el usuario, según la caché
fn user_voice_channel(
    ctx: &Context,
    guild_id: GuildId,
    user_id: UserId,
) -> Result<ChannelId, MusicError> {
    ctx.cache
        .guild(guild_id)
        .and_then(|guild| {
            guild
                .voice_states
                .get(&user_id)
                .and_then(|state| state.channel_id)
        })
        .ok_or(MusicError::VoiceState(
            "no estás conectado a ningún canal de voz",
        ))
}

/// El permiso de mover miembros habilita el skip directo estilo DJ
fn has_move_members(command: &CommandInteraction) -> bool {
    command
        .member
        .as_ref()
        .and_then(|member| member.permissions)
        .map_or(false, |permissions| permissions.move_members())
}

async fn respond_text(ctx: &Context, command: &CommandInteraction, content: &str) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new().content(content),
            ),
        )
        .await?;
    Ok(())
}

async fn respond_embed(
    ctx: &Context,
    command: &CommandInteraction,
    embed: serenity::builder::CreateEmbed,
) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new().embed(embed),
            ),
        )
        .await?;
    Ok(())
}

async fn respond_error(
    ctx: &Context,
    command: &CommandInteraction,
    error: &MusicError,
) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .embed(embeds::create_error_embed(&error.to_string()))
                    .ephemeral(true),
            ),
        )
        .await?;
    Ok(())
}
