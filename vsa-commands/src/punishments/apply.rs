use poise::serenity_prelude as serenity;
use tracing::{debug, error};

use vsa_core::members::resolve_member_profile;
use vsa_core::{Context, Error};
use vsa_database::model::cases::CaseAction;
use vsa_moderation::{ActionRequest, Actor};
use vsa_utils::permissions::{has_user_permission, missing_permission_message};

use crate::punishments::embeds::{
    bot_target_message, guild_only_message, reply_private, self_action_message, split_reason,
    usage_message,
};

/// How a punishment command drives the service.
pub(crate) struct Punishment {
    pub verb: &'static str,
    pub usage: &'static str,
    pub required: serenity::Permissions,
    pub force_action: Option<CaseAction>,
    pub force_duration: Option<u64>,
}

/// Validate the invocation, apply the punishment and return the new case id.
///
/// Every rejection is answered here; `None` means the caller has nothing left to say.
pub(crate) async fn run_punishment(
    ctx: Context<'_>,
    punishment: Punishment,
    user: Option<serenity::User>,
    reason: Option<String>,
) -> Result<Option<(serenity::User, String)>, Error> {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.say(guild_only_message()).await?;
        return Ok(None);
    };

    if !has_user_permission(ctx.http(), guild_id, ctx.author().id, punishment.required).await? {
        reply_private(ctx, missing_permission_message(punishment.required)).await?;
        return Ok(None);
    }

    let Some(user) = user else {
        ctx.say(usage_message(punishment.usage)).await?;
        return Ok(None);
    };

    if user.bot {
        reply_private(ctx, bot_target_message()).await?;
        return Ok(None);
    }

    if user.id == ctx.author().id {
        reply_private(ctx, self_action_message(punishment.verb)).await?;
        return Ok(None);
    }

    let target = match resolve_member_profile(ctx.http(), guild_id, user.id).await {
        Ok(target) => target,
        Err(source) => {
            debug!(?source, user_id = %user.id, "punishment target is not a guild member");
            reply_private(ctx, "That user is not a member of this server.").await?;
            return Ok(None);
        }
    };

    let moderator = match resolve_member_profile(ctx.http(), guild_id, ctx.author().id).await {
        Ok(moderator) => moderator,
        Err(source) => {
            error!(?source, "failed to resolve moderator roles");
            reply_private(ctx, "I couldn't check your roles. Try again in a moment.").await?;
            return Ok(None);
        }
    };

    let service = &ctx.data().punishments;
    let (reason_code, custom_reason) = split_reason(reason.as_deref(), &service.config().presets);

    let request = ActionRequest {
        reason_code,
        custom_reason,
        force_action: punishment.force_action,
        force_duration: punishment.force_duration,
        ..ActionRequest::new(guild_id.get(), Actor::Member(moderator), target)
    };

    match service.apply_action(request).await {
        Ok(case_id) => Ok(Some((user, case_id))),
        Err(rejection) if rejection.is_rejection() => {
            reply_private(ctx, rejection.to_string()).await?;
            Ok(None)
        }
        Err(source) => {
            error!(?source, user_id = %user.id, "punishment failed");
            reply_private(ctx, format!("Failed: {source}")).await?;
            Ok(None)
        }
    }
}
