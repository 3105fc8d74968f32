//! Discord implementation of [`ModerationPlatform`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;

use vsa_moderation::platform::{ModerationPlatform, PlatformError, StaffLogEntry};
use vsa_utils::embed::field_value;
use vsa_utils::formatting::{sanitize_mentions, yes_no};
use vsa_utils::time::discord_timestamp;

/// Missing permissions or role hierarchy (HTTP 403 / Discord code 50013).
pub fn is_missing_permissions(source: &serenity::Error) -> bool {
    matches!(
        source,
        serenity::Error::Http(serenity::HttpError::UnsuccessfulRequest(response))
            if response.status_code.as_u16() == 403 || response.error.code == 50013
    )
}

fn is_not_found(source: &serenity::Error) -> bool {
    matches!(
        source,
        serenity::Error::Http(serenity::HttpError::UnsuccessfulRequest(response))
            if response.status_code.as_u16() == 404
    )
}

pub fn platform_error(source: serenity::Error) -> PlatformError {
    if is_missing_permissions(&source) {
        PlatformError::MissingPermissions
    } else if is_not_found(&source) {
        PlatformError::NotFound
    } else {
        PlatformError::Http(source.to_string())
    }
}

/// Staff-log embed: moderator as author, target avatar as thumbnail.
pub fn staff_log_embed(entry: &StaffLogEntry) -> serenity::CreateEmbed {
    let mut author = serenity::CreateEmbedAuthor::new(entry.moderator_name.clone());
    if let Some(url) = entry.moderator_avatar_url.as_deref() {
        author = author.icon_url(url);
    }

    let mut embed = serenity::CreateEmbed::new()
        .title(format!("{} has been punished", entry.target_name))
        .description(field_value(&sanitize_mentions(&entry.summary)))
        .color(entry.color)
        .author(author)
        .timestamp(serenity::Timestamp::now())
        .field(
            "User",
            format!("<@{}> (`{}`)", entry.target_user_id, entry.target_user_id),
            false,
        )
        .field("Action", entry.action.as_str().to_ascii_uppercase(), true)
        .field("Duration", entry.duration.clone(), true)
        .field("Reason", field_value(&sanitize_mentions(&entry.reason)), false);

    if let Some(url) = entry.target_avatar_url.as_deref() {
        embed = embed.thumbnail(url);
    }

    if let Some(link) = entry.evidence_link.as_deref() {
        embed = embed.field("Evidence", field_value(link), false);
    }

    embed = embed
        .field("DM Sent", yes_no(entry.dm_sent), true)
        .field("Public Notice", yes_no(entry.announced_publicly), true)
        .field("Case ID", entry.case_id.clone(), true)
        .field("Moderator", entry.moderator_mention.clone(), true);

    if let Some(ends_at) = entry.ends_at {
        embed = embed.field("Ends", discord_timestamp(ends_at, 'F'), false);
    }

    if !entry.notes.is_empty() {
        let notes = entry
            .notes
            .iter()
            .map(|note| format!("⚠️ {note}"))
            .collect::<Vec<_>>()
            .join("\n");
        embed = embed.field("Notes", field_value(&notes), false);
    }

    embed
}

#[derive(Clone)]
pub struct SerenityPlatform {
    http: Arc<serenity::Http>,
}

impl SerenityPlatform {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ModerationPlatform for SerenityPlatform {
    async fn timeout_member(
        &self,
        guild_id: u64,
        user_id: u64,
        until: DateTime<Utc>,
        reason: &str,
    ) -> Result<(), PlatformError> {
        let until = serenity::Timestamp::from_unix_timestamp(until.timestamp())
            .map_err(|source| PlatformError::Http(source.to_string()))?;
        let edit = serenity::EditMember::new()
            .disable_communication_until_datetime(until)
            .audit_log_reason(reason);

        serenity::GuildId::new(guild_id)
            .edit_member(&*self.http, serenity::UserId::new(user_id), edit)
            .await
            .map_err(platform_error)?;
        Ok(())
    }

    async fn ban_member(
        &self,
        guild_id: u64,
        user_id: u64,
        reason: &str,
    ) -> Result<(), PlatformError> {
        serenity::GuildId::new(guild_id)
            .ban_with_reason(&*self.http, serenity::UserId::new(user_id), 0, reason)
            .await
            .map_err(platform_error)
    }

    async fn unban_member(
        &self,
        guild_id: u64,
        user_id: u64,
        reason: &str,
    ) -> Result<(), PlatformError> {
        self.http
            .remove_ban(
                serenity::GuildId::new(guild_id),
                serenity::UserId::new(user_id),
                Some(reason),
            )
            .await
            .map_err(platform_error)
    }

    async fn is_banned(&self, guild_id: u64, user_id: u64) -> Result<bool, PlatformError> {
        // Bans are listed by ascending user id, so paging after `user_id - 1` yields the
        // target first when it is banned.
        let after = user_id
            .checked_sub(1)
            .filter(|id| *id > 0)
            .map(|id| serenity::UserPagination::After(serenity::UserId::new(id)));

        let bans = serenity::GuildId::new(guild_id)
            .bans(&*self.http, after, Some(1))
            .await
            .map_err(platform_error)?;

        Ok(bans.first().is_some_and(|ban| ban.user.id.get() == user_id))
    }

    async fn send_direct_message(&self, user_id: u64, content: &str) -> Result<(), PlatformError> {
        serenity::UserId::new(user_id)
            .direct_message(&*self.http, serenity::CreateMessage::new().content(content))
            .await
            .map_err(platform_error)?;
        Ok(())
    }

    async fn send_channel_message(
        &self,
        channel_id: u64,
        content: &str,
    ) -> Result<(), PlatformError> {
        let message = serenity::CreateMessage::new()
            .content(content)
            .allowed_mentions(serenity::CreateAllowedMentions::new());

        serenity::ChannelId::new(channel_id)
            .send_message(&*self.http, message)
            .await
            .map_err(platform_error)?;
        Ok(())
    }

    async fn send_staff_log(
        &self,
        channel_id: u64,
        entry: &StaffLogEntry,
    ) -> Result<(), PlatformError> {
        let message = serenity::CreateMessage::new()
            .embed(staff_log_embed(entry))
            .allowed_mentions(serenity::CreateAllowedMentions::new());

        serenity::ChannelId::new(channel_id)
            .send_message(&*self.http, message)
            .await
            .map_err(platform_error)?;
        Ok(())
    }
}
