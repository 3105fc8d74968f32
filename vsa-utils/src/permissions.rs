use poise::serenity_prelude as serenity;

/// Resolve a member's effective guild permissions from their roles.
///
/// The guild owner holds every permission.
pub async fn resolve_user_permissions(
    http: &serenity::Http,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
) -> anyhow::Result<serenity::Permissions> {
    let guild = guild_id.to_partial_guild(http).await?;
    if guild.owner_id == user_id {
        return Ok(serenity::Permissions::all());
    }

    let member = guild_id.member(http, user_id).await?;
    let everyone_role_id = serenity::RoleId::new(guild_id.get());

    Ok(guild
        .roles
        .values()
        .filter(|role| role.id == everyone_role_id || member.roles.contains(&role.id))
        .fold(serenity::Permissions::empty(), |resolved, role| {
            resolved | role.permissions
        }))
}

/// `ADMINISTRATOR` implies every other permission.
pub fn permits(granted: serenity::Permissions, required: serenity::Permissions) -> bool {
    granted.contains(serenity::Permissions::ADMINISTRATOR) || granted.contains(required)
}

pub async fn has_user_permission(
    http: &serenity::Http,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
    required: serenity::Permissions,
) -> anyhow::Result<bool> {
    let granted = resolve_user_permissions(http, guild_id, user_id).await?;
    Ok(permits(granted, required))
}

/// Denial text naming the missing permission set.
pub fn missing_permission_message(required: serenity::Permissions) -> String {
    let names: Vec<&str> = required.iter_names().map(|(name, _)| name).collect();
    if names.is_empty() {
        "You don't have permission to use this command.".to_owned()
    } else {
        format!("You need the `{}` permission to use this command.", names.join(", "))
    }
}
