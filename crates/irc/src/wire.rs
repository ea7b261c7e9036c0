//! Minimal IRC line codec — just the commands and replies the relay uses.
//!
//! Wire format per RFC 2812: `[:prefix] COMMAND params [:trailing]`, CRLF
//! terminated.

// ── Numerics and commands we react to ───────────────────────────────────────

pub const RPL_WELCOME: &str = "001";
pub const ERR_NICKNAMEINUSE: &str = "433";

/// A parsed inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

impl Line {
    /// Last parameter, where servers put the interesting text.
    pub fn trailing(&self) -> Option<&str> {
        self.params.last().map(|s| s.as_str())
    }
}

/// Parse one inbound line. Returns `None` for empty lines.
pub fn parse(raw: &str) -> Option<Line> {
    let mut rest = raw.trim_end_matches(['\r', '\n']);
    if rest.is_empty() {
        return None;
    }

    let prefix = if let Some(tail) = rest.strip_prefix(':') {
        let (prefix, tail) = tail.split_once(' ')?;
        rest = tail.trim_start();
        Some(prefix.to_string())
    } else {
        None
    };

    let mut params = Vec::new();
    let command = match rest.split_once(' ') {
        Some((command, tail)) => {
            let mut tail = tail.trim_start();
            while !tail.is_empty() {
                if let Some(trailing) = tail.strip_prefix(':') {
                    params.push(trailing.to_string());
                    break;
                }
                match tail.split_once(' ') {
                    Some((param, next)) => {
                        params.push(param.to_string());
                        tail = next.trim_start();
                    },
                    None => {
                        params.push(tail.to_string());
                        break;
                    },
                }
            }
            command
        },
        None => rest,
    };

    Some(Line {
        prefix,
        command: command.to_uppercase(),
        params,
    })
}

// ── Outbound command builders (no CRLF; the writer appends it) ──────────────

pub fn pass(password: &str) -> String {
    format!("PASS {password}")
}

pub fn nick(nick: &str) -> String {
    format!("NICK {nick}")
}

pub fn user(nick: &str) -> String {
    format!("USER {nick} 0 * :{nick}")
}

pub fn join(channel: &str) -> String {
    format!("JOIN {channel}")
}

pub fn privmsg(target: &str, text: &str) -> String {
    format!("PRIVMSG {target} :{text}")
}

pub fn pong(token: &str) -> String {
    format!("PONG :{token}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_server_numeric_with_prefix() {
        let line = parse(":irc.example.net 001 relaybot :Welcome to IRC\r\n").unwrap();
        assert_eq!(line.prefix.as_deref(), Some("irc.example.net"));
        assert_eq!(line.command, "001");
        assert_eq!(line.params, vec!["relaybot", "Welcome to IRC"]);
        assert_eq!(line.trailing(), Some("Welcome to IRC"));
    }

    #[test]
    fn parses_ping_without_prefix() {
        let line = parse("PING :token-123").unwrap();
        assert!(line.prefix.is_none());
        assert_eq!(line.command, "PING");
        assert_eq!(line.params, vec!["token-123"]);
    }

    #[test]
    fn parses_bare_command() {
        let line = parse("AWAY").unwrap();
        assert_eq!(line.command, "AWAY");
        assert!(line.params.is_empty());
    }

    #[test]
    fn command_is_case_normalized() {
        assert_eq!(parse("ping :x").unwrap().command, "PING");
    }

    #[test]
    fn empty_and_truncated_lines_are_none() {
        assert!(parse("").is_none());
        assert!(parse("\r\n").is_none());
        assert!(parse(":prefix-without-command").is_none());
    }

    #[test]
    fn builders_render_expected_wire_format() {
        assert_eq!(pass("pw"), "PASS pw");
        assert_eq!(nick("relaybot"), "NICK relaybot");
        assert_eq!(user("relaybot"), "USER relaybot 0 * :relaybot");
        assert_eq!(join("#release"), "JOIN #release");
        assert_eq!(
            privmsg("#release", "Merged myproj: fix  http://x/1"),
            "PRIVMSG #release :Merged myproj: fix  http://x/1",
        );
        assert_eq!(pong("abc"), "PONG :abc");
    }
}
