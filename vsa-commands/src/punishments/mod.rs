pub mod ban;
pub mod case;
pub mod cases;
pub mod points;
pub mod recent;
pub mod reload;
pub mod report;
pub mod tempban;
pub mod timeout;
pub mod unban;
pub mod warn;

mod apply;
pub(crate) mod embeds;
