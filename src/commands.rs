// Feed commands: enable/disable a game feed in a channel.
//
// The chat gateway hands `handle` the words after the bot mention and whether
// the author may manage channels; we reply with the text to post. The CLI goes
// through the same parser via `operator_command`.
// Channel references arrive either as `<#ID>` mentions or bare ids, and the
// reply echoes whatever form the user typed.

use tracing::{error, info};

use crate::db::SubscriptionStore;

pub const ENABLE_USAGE: &str = "Usage: enable `[channel]` `[gamenamestring]`";
pub const DISABLE_USAGE: &str = "Usage: disable `[channel]`";
pub const COMMAND_ERROR_REPLY: &str = "An error occurred while processing your command.";
pub const HELP_REPLY: &str = "## NimbusFeed Help\n**Usage:**\n\
enable `[channel]` `[gamenamestring]` - enables the feed for the specified game in the specified channel. \
Use the game name string you see in the Nexusmods mod page link (acecombat7skiesunknown, helldivers2, \
skyrimspecialedition, etc.) Note: You can only create one feed per channel.\n\
disable `[channel]` - disables the feed in the specified channel.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Enable { channel: ChannelRef, game: String },
    Disable { channel: ChannelRef },
    Help,
}

/// A channel as the user wrote it, plus the id it refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRef {
    pub display: String,
    pub id: String,
}

/// Accept `<#01ABC>` or `01ABC`. Returns None for anything empty.
pub fn parse_channel_ref(text: &str) -> Option<ChannelRef> {
    let text = text.trim();
    let id = text
        .strip_prefix("<#")
        .and_then(|rest| rest.strip_suffix('>'))
        .unwrap_or(text);

    if id.is_empty() || id.contains(char::is_whitespace) {
        return None;
    }

    Some(ChannelRef {
        display: text.to_string(),
        id: id.to_string(),
    })
}

/// Parse the words following the bot mention.
///
/// None means the text isn't a feed command at all. Err carries the usage
/// reply for a recognised command with missing arguments.
pub fn parse_command(text: &str) -> Option<Result<Command, String>> {
    let args: Vec<&str> = text.split_whitespace().collect();
    let verb = args.first()?.to_ascii_lowercase();

    match verb.as_str() {
        "enable" => {
            let parsed = match (args.get(1).and_then(|c| parse_channel_ref(c)), args.get(2)) {
                (Some(channel), Some(game)) => Ok(Command::Enable {
                    channel,
                    game: (*game).to_string(),
                }),
                _ => Err(ENABLE_USAGE.to_string()),
            };
            Some(parsed)
        }
        "disable" => {
            let parsed = match args.get(1).and_then(|c| parse_channel_ref(c)) {
                Some(channel) => Ok(Command::Disable { channel }),
                None => Err(DISABLE_USAGE.to_string()),
            };
            Some(parsed)
        }
        "help" => Some(Ok(Command::Help)),
        _ => None,
    }
}

fn permission_reply(action: &str) -> String {
    format!(
        "You do not have the required permissions to {action} feeds. \
         Permissions required: `ManageChannel` or `ManageServer`."
    )
}

/// Apply a command and return the reply text. Never fails: storage errors
/// are logged and turned into a generic reply.
pub async fn execute<S>(store: &S, command: &Command, is_moderator: bool) -> String
where
    S: SubscriptionStore + ?Sized,
{
    match command {
        Command::Help => HELP_REPLY.to_string(),
        Command::Enable { channel, game } => {
            if !is_moderator {
                return permission_reply("add");
            }
            match store.add_subscription(game, &channel.id).await {
                Ok(true) => {
                    info!(game = %game, channel_id = %channel.id, "Enabled feed");
                    format!("Enabled {game} feed in {}!", channel.display)
                }
                Ok(false) => {
                    info!(
                        game = %game,
                        channel_id = %channel.id,
                        "Enable refused, channel already has a feed"
                    );
                    format!(
                        "Failed to enable {game} feed in {} - there already is an active feed in the channel.",
                        channel.display
                    )
                }
                Err(e) => {
                    error!(game = %game, channel_id = %channel.id, error = %e, "Failed to enable feed");
                    COMMAND_ERROR_REPLY.to_string()
                }
            }
        }
        Command::Disable { channel } => {
            if !is_moderator {
                return permission_reply("remove");
            }
            match store.remove_subscription(&channel.id).await {
                Ok(true) => {
                    info!(channel_id = %channel.id, "Disabled feed");
                    format!("Disabled the current feed in {}!", channel.display)
                }
                Ok(false) => {
                    info!(channel_id = %channel.id, "Disable refused, channel has no feed");
                    format!(
                        "Failed to disable feed in {} - there is no active feed in the channel.",
                        channel.display
                    )
                }
                Err(e) => {
                    error!(channel_id = %channel.id, error = %e, "Failed to disable feed");
                    COMMAND_ERROR_REPLY.to_string()
                }
            }
        }
    }
}

/// Parse and run a command in one step. None when the text isn't a command.
pub async fn handle<S>(store: &S, text: &str, is_moderator: bool) -> Option<String>
where
    S: SubscriptionStore + ?Sized,
{
    match parse_command(text)? {
        Ok(command) => Some(execute(store, &command, is_moderator).await),
        Err(usage) => Some(usage),
    }
}

/// Run a command typed by the local operator, who may always manage feeds.
/// Anything that isn't a feed command gets the help text.
pub async fn operator_command<S>(store: &S, words: &[String]) -> String
where
    S: SubscriptionStore + ?Sized,
{
    let text = words.join(" ");
    match handle(store, &text, true).await {
        Some(reply) => reply,
        None => HELP_REPLY.to_string(),
    }
}
