use poise::serenity_prelude as serenity;
use tracing::{debug, error, info, warn};

use vsa_core::Data;
use vsa_core::members::resolve_member_profile;
use vsa_core::platform::is_missing_permissions;
use vsa_moderation::chat_filter::{FILTER_REASON_CODE, FilterHit, channel_warning, dm_notice};
use vsa_moderation::{ActionRequest, Actor};

/// The parts of a created or edited guild message the filter looks at.
struct ScannedMessage<'a> {
    guild_id: serenity::GuildId,
    channel_id: serenity::ChannelId,
    message_id: serenity::MessageId,
    author: &'a serenity::User,
    content: &'a str,
}

impl ScannedMessage<'_> {
    fn link(&self) -> String {
        format!(
            "https://discord.com/channels/{}/{}/{}",
            self.guild_id.get(),
            self.channel_id.get(),
            self.message_id.get()
        )
    }
}

/// Check an incoming message against the blacklist.
pub async fn handle_message_word_filter(
    ctx: &serenity::Context,
    data: &Data,
    message: &serenity::Message,
) {
    // Ignore bots and webhooks.
    if message.author.bot || message.webhook_id.is_some() {
        return;
    }

    let Some(guild_id) = message.guild_id else {
        return;
    };

    scan(
        ctx,
        data,
        ScannedMessage {
            guild_id,
            channel_id: message.channel_id,
            message_id: message.id,
            author: &message.author,
            content: &message.content,
        },
    )
    .await;
}

/// Edits are scanned like new messages. Partial updates without content are skipped.
pub async fn handle_message_update_word_filter(
    ctx: &serenity::Context,
    data: &Data,
    new: Option<&serenity::Message>,
    event: &serenity::MessageUpdateEvent,
) {
    if let Some(message) = new {
        handle_message_word_filter(ctx, data, message).await;
        return;
    }

    let (Some(guild_id), Some(author), Some(content)) =
        (event.guild_id, event.author.as_ref(), event.content.as_deref())
    else {
        return;
    };

    if author.bot {
        return;
    }

    scan(
        ctx,
        data,
        ScannedMessage {
            guild_id,
            channel_id: event.channel_id,
            message_id: event.id,
            author,
            content,
        },
    )
    .await;
}

async fn scan(ctx: &serenity::Context, data: &Data, message: ScannedMessage<'_>) {
    let filter = data.chat_filter();
    let Some(hit) = filter.check(message.channel_id.get(), message.content) else {
        return;
    };

    info!(
        user_id = %message.author.id,
        channel_id = %message.channel_id,
        phrase = %hit.phrase,
        "blacklisted phrase detected"
    );

    if let Err(source) = message
        .channel_id
        .delete_message(&ctx.http, message.message_id)
        .await
    {
        if is_missing_permissions(&source) {
            warn!("missing permissions to delete filtered message");
        } else {
            error!(?source, "failed to delete filtered message");
        }
    }

    if filter.channel_warnings.try_claim(message.author.id.get()) {
        send_channel_warning(ctx, &message, &hit).await;
    }

    if filter.dm_notices.try_claim(message.author.id.get()) {
        let notice = dm_notice(
            message.author.display_name(),
            message.channel_id.get(),
            &hit.snippet,
        );
        if let Err(source) = message
            .author
            .id
            .direct_message(ctx, serenity::CreateMessage::new().content(notice))
            .await
        {
            debug!(?source, user_id = %message.author.id, "could not DM filtered user");
        }
    }

    if filter.punishments_mode() && data.punishments.is_enabled() {
        punish(ctx, data, &message).await;
    }
}

async fn send_channel_warning(
    ctx: &serenity::Context,
    message: &ScannedMessage<'_>,
    hit: &FilterHit,
) {
    let warning = serenity::CreateMessage::new()
        .content(channel_warning(
            &format!("<@{}>", message.author.id.get()),
            &hit.snippet,
        ))
        .allowed_mentions(serenity::CreateAllowedMentions::new().users([message.author.id]));

    if let Err(source) = message.channel_id.send_message(ctx, warning).await {
        if is_missing_permissions(&source) {
            warn!(channel_id = %message.channel_id, "missing permissions to post filter warning");
        } else {
            error!(?source, "failed to post filter warning");
        }
    }
}

async fn punish(ctx: &serenity::Context, data: &Data, message: &ScannedMessage<'_>) {
    let target = match resolve_member_profile(&ctx.http, message.guild_id, message.author.id).await
    {
        Ok(target) => target,
        Err(source) => {
            warn!(?source, user_id = %message.author.id, "could not resolve filtered member");
            return;
        }
    };

    let bot_user_id = ctx.cache.current_user().id.get();
    let request = ActionRequest {
        reason_code: Some(FILTER_REASON_CODE.to_owned()),
        evidence_link: Some(message.link()),
        ..ActionRequest::new(
            message.guild_id.get(),
            Actor::System {
                user_id: bot_user_id,
            },
            target,
        )
    };

    match data.punishments.apply_action(request).await {
        Ok(case_id) => {
            info!(%case_id, user_id = %message.author.id, "chat filter punishment applied");
        }
        Err(rejection) if rejection.is_rejection() => {
            debug!(%rejection, user_id = %message.author.id, "chat filter punishment skipped");
        }
        Err(source) => {
            error!(?source, user_id = %message.author.id, "chat filter punishment failed");
        }
    }
}
