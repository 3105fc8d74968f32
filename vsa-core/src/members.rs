use std::collections::HashMap;

use poise::serenity_prelude as serenity;

use vsa_moderation::platform::{MemberProfile, RoleRank};

/// Highest of `role_ids` by position, falling back to `@everyone` (position 0).
pub fn top_role_rank(
    guild_id: u64,
    role_ids: &[u64],
    positions: &HashMap<u64, u16>,
) -> RoleRank {
    role_ids
        .iter()
        .filter_map(|role_id| {
            positions.get(role_id).map(|position| RoleRank {
                position: *position,
                role_id: *role_id,
            })
        })
        .max()
        .unwrap_or(RoleRank {
            position: 0,
            role_id: guild_id,
        })
}

/// Snapshot a guild member for exemption and hierarchy checks.
///
/// The guild owner always ranks above every role.
pub async fn resolve_member_profile(
    http: &serenity::Http,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
) -> anyhow::Result<MemberProfile> {
    let guild = guild_id.to_partial_guild(http).await?;
    let member = guild_id.member(http, user_id).await?;

    let role_ids: Vec<u64> = member.roles.iter().map(|role_id| role_id.get()).collect();
    let top_role = if guild.owner_id == user_id {
        RoleRank {
            position: u16::MAX,
            role_id: 0,
        }
    } else {
        let positions: HashMap<u64, u16> = guild
            .roles
            .values()
            .map(|role| (role.id.get(), role.position))
            .collect();
        top_role_rank(guild_id.get(), &role_ids, &positions)
    };

    Ok(MemberProfile {
        user_id: user_id.get(),
        display_name: member.display_name().to_owned(),
        avatar_url: Some(member.face()),
        role_ids,
        top_role,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::top_role_rank;
    use vsa_moderation::platform::RoleRank;

    #[test]
    fn picks_highest_positioned_role() {
        let positions = HashMap::from([(10, 3), (11, 7), (12, 7)]);

        assert_eq!(
            top_role_rank(1, &[10, 11], &positions),
            RoleRank {
                position: 7,
                role_id: 11
            }
        );
        // On equal positions the older (lower id) role ranks higher.
        assert_eq!(top_role_rank(1, &[11, 12], &positions).role_id, 11);
    }

    #[test]
    fn roleless_member_ranks_as_everyone() {
        let rank = top_role_rank(99, &[], &HashMap::new());
        assert_eq!(
            rank,
            RoleRank {
                position: 0,
                role_id: 99
            }
        );
        assert_eq!(top_role_rank(99, &[555], &HashMap::new()), rank);
    }
}
