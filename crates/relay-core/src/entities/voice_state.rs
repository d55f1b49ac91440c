//! Voice state - a user's connection to a voice channel

use crate::value_objects::Snowflake;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceState {
    pub user_id: Snowflake,
    /// `None` once the user has left voice
    pub channel_id: Option<Snowflake>,
    pub session_id: String,
    pub deaf: bool,
    pub mute: bool,
    pub self_deaf: bool,
    pub self_mute: bool,
    pub self_stream: bool,
    pub self_video: bool,
    pub suppress: bool,
}
