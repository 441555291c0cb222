//! Line-oriented console commands.
//!
//! Grammar (keywords case-insensitive, one command per line):
//!
//! ```text
//! PWM <int>     set duty percentage
//! START <int>   staircase capture with the given step increment
//! STOP          zero duty, stop reporting, cancel a running capture
//! f | r         select direction
//! <int>         bare duty percentage (interactive setup)
//! ```
//!
//! Parsing is purely syntactic; range checks happen where the value is
//! applied so a rejected value never touches hardware.

use crate::actuator::Direction;
use crate::error::{RigError, RigResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Pwm(i32),
    Start(i32),
    Stop,
    Direction(Direction),
    Empty,
}

fn parse_int(keyword: &str, arg: Option<&str>) -> RigResult<i32> {
    let arg = arg.ok_or_else(|| RigError::invalid(format!("{keyword} needs a numeric argument")))?;
    arg.parse::<i32>()
        .map_err(|_| RigError::invalid(format!("{keyword} argument '{arg}' is not an integer")))
}

/// Parse one input line.
pub fn parse_command(line: &str) -> RigResult<Command> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Ok(Command::Empty);
    };
    let arg = parts.next();
    if let Some(extra) = parts.next() {
        return Err(RigError::invalid(format!("unexpected trailing input '{extra}'")));
    }
    let keyword = head.to_ascii_uppercase();
    let cmd = match keyword.as_str() {
        "PWM" => Command::Pwm(parse_int("PWM", arg)?),
        "START" => Command::Start(parse_int("START", arg)?),
        "STOP" if arg.is_none() => Command::Stop,
        "STOP" => return Err(RigError::invalid("STOP takes no argument")),
        "F" | "R" if arg.is_none() => Command::Direction(head.parse()?),
        _ if arg.is_none() && head.parse::<i32>().is_ok() => Command::Pwm(parse_int("PWM", Some(head))?),
        _ => return Err(RigError::UnknownCommand(line.trim().to_string())),
    };
    Ok(cmd)
}

impl std::str::FromStr for Command {
    type Err = RigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_command(s)
    }
}
