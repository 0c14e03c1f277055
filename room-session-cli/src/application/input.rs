use room_session_core::{ChannelCommand, ForceEndReason, GameOptions, InboundLine};

use crate::infrastructure::{CliError, Result};

pub const HELP: &str = "\
create <format> [option=value ...]   open signups for a game
challenge <challenger> <defender> <format>
join <player> | leave <player>
start                                close signups and start
act <player> <action> [args ...]     game action (claim, roll, accept, ...)
text <content> | html <content>      feed an inbound line
uhtml <name> <content>               feed an inbound named update
wait <ms>                            move the clock forward
end | forceend                       end the current game
help | quit";

/// One line typed on stdin, translated for the engine
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleInput {
    Command(ChannelCommand),
    Line(InboundLine),
    Wait(u64),
    Help,
    Quit,
}

/// Translate a console line for `channel`. Blank lines and `#` comments
/// yield `None`.
pub fn parse_input(channel: &str, text: &str) -> Result<Option<ConsoleInput>> {
    let text = text.trim();
    if text.is_empty() || text.starts_with('#') {
        return Ok(None);
    }

    let (verb, rest) = text.split_once(' ').unwrap_or((text, ""));
    let rest = rest.trim();
    let args: Vec<&str> = rest.split_whitespace().collect();
    let channel = channel.to_string();

    let input = match verb.to_lowercase().as_str() {
        "create" => {
            let [format, options @ ..] = args.as_slice() else {
                return Err(usage("create <format> [option=value ...]"));
            };
            ConsoleInput::Command(ChannelCommand::CreateGame {
                channel,
                format: format.to_string(),
                options: parse_options(options)?,
            })
        }
        "challenge" => {
            let [challenger, defender, format] = args.as_slice() else {
                return Err(usage("challenge <challenger> <defender> <format>"));
            };
            ConsoleInput::Command(ChannelCommand::Challenge {
                channel,
                challenger: challenger.to_string(),
                defender: defender.to_string(),
                format: format.to_string(),
            })
        }
        "join" => ConsoleInput::Command(ChannelCommand::Join {
            channel,
            player: required(rest, "join <player>")?,
        }),
        "leave" => ConsoleInput::Command(ChannelCommand::Leave {
            channel,
            player: required(rest, "leave <player>")?,
        }),
        "start" => ConsoleInput::Command(ChannelCommand::CloseSignups { channel }),
        "act" => {
            let [player, action, extra @ ..] = args.as_slice() else {
                return Err(usage("act <player> <action> [args ...]"));
            };
            ConsoleInput::Command(ChannelCommand::Action {
                channel,
                player: player.to_string(),
                action: action.to_lowercase(),
                args: extra.iter().map(|a| a.to_string()).collect(),
            })
        }
        "text" => ConsoleInput::Line(InboundLine::text(required(rest, "text <content>")?)),
        "html" => ConsoleInput::Line(InboundLine::html(required(rest, "html <content>")?)),
        "uhtml" => {
            let Some((name, content)) = rest.split_once(' ') else {
                return Err(usage("uhtml <name> <content>"));
            };
            ConsoleInput::Line(InboundLine::named_update(name.trim_end_matches(','), content.trim()))
        }
        "wait" => {
            let ms = rest
                .parse::<u64>()
                .map_err(|_| usage("wait <ms>"))?;
            ConsoleInput::Wait(ms)
        }
        "end" => ConsoleInput::Command(ChannelCommand::EndGame { channel }),
        "forceend" => ConsoleInput::Command(ChannelCommand::ForceEnd {
            channel,
            reason: ForceEndReason::Moderator,
        }),
        "help" => ConsoleInput::Help,
        "quit" | "exit" => ConsoleInput::Quit,
        other => {
            return Err(CliError::invalid_input(format!(
                "unknown command '{}' (try 'help')",
                other
            )))
        }
    };

    Ok(Some(input))
}

fn parse_options(pairs: &[&str]) -> Result<GameOptions> {
    let mut options = GameOptions::new();
    for pair in pairs {
        let Some((name, value)) = pair.split_once('=') else {
            return Err(CliError::invalid_input(format!(
                "expected option=value, got '{}'",
                pair
            )));
        };
        let value = value.parse::<i64>().map_err(|_| {
            CliError::invalid_input(format!("option {} needs a number, got '{}'", name, value))
        })?;
        options.set(name, value);
    }
    Ok(options)
}

fn required(rest: &str, form: &str) -> Result<String> {
    if rest.is_empty() {
        Err(usage(form))
    } else {
        Ok(rest.to_string())
    }
}

fn usage(form: &str) -> CliError {
    CliError::invalid_input(format!("usage: {}", form))
}
