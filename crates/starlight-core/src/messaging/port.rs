use async_trait::async_trait;

use crate::{
    domain::{ChannelId, GuildId, UserId},
    messaging::types::Message,
    Result,
};

/// Narrow view of the chat platform used by the engines.
///
/// Discord is the implementation; engine tests use in-memory fakes.
#[async_trait]
pub trait PlatformPort: Send + Sync {
    /// Create a text channel under `category`.
    async fn create_text_channel(
        &self,
        guild: &GuildId,
        category: &ChannelId,
        name: &str,
    ) -> Result<ChannelId>;

    async fn rename_channel(&self, channel: &ChannelId, name: &str) -> Result<()>;
    async fn delete_channel(&self, channel: &ChannelId) -> Result<()>;

    async fn send_message(&self, channel: &ChannelId, message: Message) -> Result<()>;

    /// Name used when deriving channel names for a user.
    async fn user_display_name(&self, user: &UserId) -> Result<String>;
}
