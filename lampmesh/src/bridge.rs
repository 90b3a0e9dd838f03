//! HQ host bridge: the line-oriented command channel to the operator host.
//!
//! Host to HQ: `TX|<dst>|<type>|<message>`. HQ to host: one line per locally
//! delivered packet, `<src> <type> <message>`, with the literal `SOS` as the
//! body of an SOS alert.

use alloc::string::String;
use core::fmt;

use crate::types::{
    LampId, Payload, TYPE_BROADCAST, TYPE_INIT, TYPE_MESSAGE, TYPE_TARGETED,
};

/// Reply confirming a command was emitted into the mesh.
pub const REPLY_OK: &str = "OK|Message sent";

/// Body rendered for SOS event lines.
pub const SOS_BODY: &[u8] = b"SOS";

/// A validated operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    /// Start a gradient survey; the message field carries the 2-char epoch.
    Init { epoch: [u8; 2] },
    Broadcast { dst: LampId, message: Payload },
    Targeted { dst: LampId, message: Payload },
    Message { dst: LampId, message: Payload },
}

/// Command rejection, mapped 1:1 onto the wire replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// Missing pipes or wrong verb.
    Format,
    /// Field width or type byte invalid.
    Field,
}

impl CommandError {
    /// The reply line sent back to the host.
    pub fn reply(self) -> &'static str {
        match self {
            CommandError::Format => "ERR|Invalid command format",
            CommandError::Field => "ERR|Invalid destination or type",
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reply())
    }
}

/// Parse one host command line (without the trailing newline).
pub fn parse_command(line: &[u8]) -> Result<HostCommand, CommandError> {
    let mut pipes = line.iter().enumerate().filter(|(_, &b)| b == b'|');
    let first = pipes.next().map(|(i, _)| i).ok_or(CommandError::Format)?;
    let second = pipes.next().map(|(i, _)| i).ok_or(CommandError::Format)?;
    let third = pipes.next().map(|(i, _)| i).ok_or(CommandError::Format)?;

    if &line[..first] != b"TX" {
        return Err(CommandError::Format);
    }

    let dst = &line[first + 1..second];
    let type_field = &line[second + 1..third];
    let message = &line[third + 1..];

    if dst.len() != 4 || type_field.len() != 1 {
        return Err(CommandError::Field);
    }
    let mut dst_id: LampId = [0; 4];
    dst_id.copy_from_slice(dst);

    match type_field[0] {
        TYPE_INIT => {
            // The epoch id rides in the message field.
            if message.len() != 2 {
                return Err(CommandError::Field);
            }
            Ok(HostCommand::Init {
                epoch: [message[0], message[1]],
            })
        }
        TYPE_BROADCAST => Ok(HostCommand::Broadcast {
            dst: dst_id,
            message: message.to_vec(),
        }),
        TYPE_TARGETED => Ok(HostCommand::Targeted {
            dst: dst_id,
            message: message.to_vec(),
        }),
        TYPE_MESSAGE => Ok(HostCommand::Message {
            dst: dst_id,
            message: message.to_vec(),
        }),
        // HQ does not originate SOS; anything else is no type at all.
        _ => Err(CommandError::Field),
    }
}

/// Render an event line for a locally delivered packet.
pub fn event_line(src: &LampId, type_byte: u8, body: &[u8]) -> String {
    let mut line = String::with_capacity(4 + 1 + 1 + 1 + body.len());
    line.push_str(&String::from_utf8_lossy(src));
    line.push(' ');
    line.push(type_byte as char);
    line.push(' ');
    line.push_str(&String::from_utf8_lossy(body));
    line
}
