use scene_engine::{InteractionId, ItemIndex, Vec2};
use thiserror::Error;

/// One line of a session script. Scripts stand in for pointer input and
/// dialog acknowledgment when running headless.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SessionCommand {
    Tick(u32),
    Click(Vec2),
    Hover(Vec2),
    Use(InteractionId),
    Apply(InteractionId, ItemIndex),
    Ack,
    State,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum SessionParseError {
    #[error("line {line}: unknown command '{command}'")]
    UnknownCommand { line: usize, command: String },
    #[error("line {line}: '{command}' expects {expected}")]
    WrongArity {
        line: usize,
        command: &'static str,
        expected: &'static str,
    },
    #[error("line {line}: invalid {what} '{value}'")]
    InvalidValue {
        line: usize,
        what: &'static str,
        value: String,
    },
}

/// Parses a whole script. Blank lines and `#` comments are skipped; line
/// numbers in errors are 1-based.
pub(crate) fn parse_session(script: &str) -> Result<Vec<SessionCommand>, SessionParseError> {
    let mut commands = Vec::new();
    for (offset, raw) in script.lines().enumerate() {
        if let Some(command) = parse_line(raw, offset + 1)? {
            commands.push(command);
        }
    }
    Ok(commands)
}

fn parse_line(raw: &str, line: usize) -> Result<Option<SessionCommand>, SessionParseError> {
    let content = raw.split('#').next().unwrap_or_default().trim();
    if content.is_empty() {
        return Ok(None);
    }
    let tokens = content.split_whitespace().collect::<Vec<_>>();
    let command = match tokens.as_slice() {
        ["tick", count] => SessionCommand::Tick(parse_value(count, "tick count", line)?),
        ["tick", ..] => return Err(arity(line, "tick", "one tick count")),
        ["click", x, y] => SessionCommand::Click(Vec2::new(
            parse_coordinate(x, line)?,
            parse_coordinate(y, line)?,
        )),
        ["click", ..] => return Err(arity(line, "click", "x and y coordinates")),
        ["hover", x, y] => SessionCommand::Hover(Vec2::new(
            parse_coordinate(x, line)?,
            parse_coordinate(y, line)?,
        )),
        ["hover", ..] => return Err(arity(line, "hover", "x and y coordinates")),
        ["use", id] => SessionCommand::Use(InteractionId::new(*id)),
        ["use", ..] => return Err(arity(line, "use", "one interaction id")),
        ["apply", id, item] => SessionCommand::Apply(
            InteractionId::new(*id),
            ItemIndex(parse_value(item, "item index", line)?),
        ),
        ["apply", ..] => return Err(arity(line, "apply", "an interaction id and an item index")),
        ["ack"] => SessionCommand::Ack,
        ["ack", ..] => return Err(arity(line, "ack", "no arguments")),
        ["state"] => SessionCommand::State,
        ["state", ..] => return Err(arity(line, "state", "no arguments")),
        [other, ..] => {
            return Err(SessionParseError::UnknownCommand {
                line,
                command: (*other).to_string(),
            })
        }
        [] => return Ok(None),
    };
    Ok(Some(command))
}

fn parse_value<T: std::str::FromStr>(
    raw: &str,
    what: &'static str,
    line: usize,
) -> Result<T, SessionParseError> {
    raw.parse::<T>()
        .map_err(|_| SessionParseError::InvalidValue {
            line,
            what,
            value: raw.to_string(),
        })
}

fn parse_coordinate(raw: &str, line: usize) -> Result<f32, SessionParseError> {
    let value = parse_value::<f32>(raw, "coordinate", line)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SessionParseError::InvalidValue {
            line,
            what: "coordinate",
            value: raw.to_string(),
        })
    }
}

fn arity(line: usize, command: &'static str, expected: &'static str) -> SessionParseError {
    SessionParseError::WrongArity {
        line,
        command,
        expected,
    }
}
