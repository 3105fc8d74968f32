pub mod punishments;

use vsa_core::{Data, Error};

pub struct CommandMeta {
    pub name: &'static str,
    pub usage: &'static str,
}

pub const COMMANDS: &[CommandMeta] = &[
    punishments::warn::META,
    punishments::timeout::META,
    punishments::tempban::META,
    punishments::ban::META,
    punishments::unban::META,
    punishments::points::META,
    punishments::cases::META,
    punishments::case::META,
    punishments::recent::META,
    punishments::report::META,
    punishments::reload::META,
];

pub fn commands() -> Vec<poise::Command<Data, Error>> {
    vec![
        punishments::warn::punish_warn(),
        punishments::timeout::punish_timeout(),
        punishments::tempban::punish_tempban(),
        punishments::ban::punish_ban(),
        punishments::unban::punish_unban(),
        punishments::points::punish_points(),
        punishments::cases::punish_cases(),
        punishments::case::punish_case(),
        punishments::recent::punish_recent(),
        punishments::report::punish_report(),
        punishments::reload::punish_reload(),
    ]
}
