//! Line-oriented chat console over stdin.

use std::sync::Arc;

use auth_adapters::SessionIdentityProvider;
use domains::{Actor, MessageKind, Verdict};
use services::{ChatEngine, SendRequest};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::embeds::UrlEmbedExtractor;

const HELP: &str = "\
commands:
  <text>                 send a text message
  /sticker <id>          send a sticker
  /delete <message-id>   delete a message
  /list                  show visible messages
  /quota                 show remaining sends and cooldown
  /incidents             show moderation incidents
  /clear-incidents       reset the incident log
  /login <uid> <name>    sign in as a member
  /anon <name>           sign in anonymously
  /logout                sign out
  /quit                  exit";

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Text(&'a str),
    Sticker(&'a str),
    Delete(&'a str),
    List,
    Quota,
    Incidents,
    ClearIncidents,
    Login { uid: &'a str, name: &'a str },
    Anonymous(&'a str),
    Logout,
    Help,
    Quit,
}

fn parse(line: &str) -> Option<Command<'_>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Some(Command::Text(line));
    };

    let (name, arg) = rest.split_once(' ').map_or((rest, ""), |(n, a)| (n, a.trim()));
    let command = match name {
        "sticker" if !arg.is_empty() => Command::Sticker(arg),
        "delete" if !arg.is_empty() => Command::Delete(arg),
        "list" => Command::List,
        "quota" => Command::Quota,
        "incidents" => Command::Incidents,
        "clear-incidents" => Command::ClearIncidents,
        "login" => match arg.split_once(' ') {
            Some((uid, name)) => Command::Login { uid, name: name.trim() },
            None => Command::Help,
        },
        "anon" => Command::Anonymous(if arg.is_empty() { "Visitor" } else { arg }),
        "logout" => Command::Logout,
        "quit" | "exit" => Command::Quit,
        _ => Command::Help,
    };
    Some(command)
}

pub struct Console {
    engine: Arc<ChatEngine>,
    session: Arc<SessionIdentityProvider>,
    device_seed: String,
}

impl Console {
    pub fn new(engine: Arc<ChatEngine>, session: Arc<SessionIdentityProvider>, device_seed: String) -> Self {
        Self {
            engine,
            session,
            device_seed,
        }
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        println!("{HELP}");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let Some(command) = parse(&line) else {
                continue;
            };
            if command == Command::Quit {
                break;
            }
            self.execute(command).await?;
        }
        Ok(())
    }

    async fn execute(&self, command: Command<'_>) -> anyhow::Result<()> {
        match command {
            Command::Text(body) => {
                let request = SendRequest::compose(MessageKind::Text, body, &UrlEmbedExtractor);
                report(&self.engine.send(request).await);
            }
            Command::Sticker(id) => report(&self.engine.send(SendRequest::sticker(id)).await),
            Command::Delete(id) => report(&self.engine.delete(id).await),
            Command::List => {
                for message in self.engine.messages().await {
                    println!("[{}] {}: {}", message.id, message.author_name, message.body);
                }
            }
            Command::Quota => match self.engine.quota().await {
                Ok(quota) => println!("{}", serde_json::to_string_pretty(&quota)?),
                Err(err) => println!("! {err}"),
            },
            Command::Incidents => {
                let incidents = self.engine.recent_incidents().await;
                println!("{}", serde_json::to_string_pretty(&incidents)?);
            }
            Command::ClearIncidents => self.engine.incidents().clear().await,
            Command::Login { uid, name } => self.session.sign_in(Actor {
                uid: uid.to_string(),
                name: name.to_string(),
                avatar: None,
                anonymous: false,
            }),
            Command::Anonymous(name) => {
                let actor = self.session.sign_in_anonymously(&self.device_seed, name);
                println!("signed in as {} ({})", actor.name, actor.uid);
            }
            Command::Logout => self.session.sign_out(),
            Command::Help | Command::Quit => println!("{HELP}"),
        }
        Ok(())
    }
}

fn report<T>(result: &domains::Result<T>) {
    match Verdict::from(result).message {
        Some(message) => println!("! {message}"),
        None => println!("ok"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_and_plain_text() {
        assert_eq!(parse("  hello there "), Some(Command::Text("hello there")));
        assert_eq!(parse("/sticker wave"), Some(Command::Sticker("wave")));
        assert_eq!(parse("/delete 0190-abc"), Some(Command::Delete("0190-abc")));
        assert_eq!(
            parse("/login u-1 Mika Tan"),
            Some(Command::Login {
                uid: "u-1",
                name: "Mika Tan"
            })
        );
        assert_eq!(parse("/anon"), Some(Command::Anonymous("Visitor")));
        assert_eq!(parse("/quit"), Some(Command::Quit));
        assert_eq!(parse(""), None);
    }

    #[test]
    fn malformed_commands_fall_back_to_help() {
        assert_eq!(parse("/sticker"), Some(Command::Help));
        assert_eq!(parse("/dance"), Some(Command::Help));
        assert_eq!(parse("/login onlyuid"), Some(Command::Help));
    }
}
