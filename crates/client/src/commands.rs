//! Line-oriented commands understood by the interactive loop.

use std::path::PathBuf;

use game_core::{EffectId, HitInput, ResourceKind};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    /// Click at a screen angle in radians.
    Click(HitInput),
    /// Click the centre of a region; `None` aims at the current target.
    Hit(Option<usize>),
    Apply(EffectId),
    Remove(EffectId),
    Claim(ResourceKind),
    Skill { name: String, level: u32 },
    Status,
    Save(Option<PathBuf>),
    Load(Option<PathBuf>),
    Reset,
    Help,
    Quit,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}` (try `help`)")]
    Unknown(String),
    #[error("`{command}` expects {expected}")]
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },
    #[error("invalid {what}: `{value}`")]
    Invalid { what: &'static str, value: String },
}

pub const HELP: &str = "\
commands:
  hit [region]          click a region centre (default: target)
  click <angle>         click at an angle in radians
  point <x> <y> <w> <h> click a grid surface point
  apply <effect>        apply an effect by name
  remove <effect>       remove an active effect
  claim <resource>      claim a mystery box option
  skill <name> <level>  set an upgrade level
  status                show the session
  save [path]           write a snapshot
  load [path]           restore a snapshot
  reset                 start over
  quit";

impl std::str::FromStr for Request {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = words.next().ok_or(ParseError::Empty)?;
        let args: Vec<&str> = words.collect();

        match command.to_ascii_lowercase().as_str() {
            "hit" | "h" => Ok(Request::Hit(
                args.first().map(|v| parse(v, "region")).transpose()?,
            )),
            "click" | "c" => {
                let angle = required(&args, 0, "click", "an angle")?;
                Ok(Request::Click(HitInput::Angle(parse(angle, "angle")?)))
            }
            "point" => {
                let mut coords = [0.0; 4];
                for (i, slot) in coords.iter_mut().enumerate() {
                    *slot = parse(required(&args, i, "point", "x y width height")?, "coordinate")?;
                }
                let [x, y, width, height] = coords;
                Ok(Request::Click(HitInput::Point {
                    x,
                    y,
                    width,
                    height,
                }))
            }
            "apply" => Ok(Request::Apply(parse(
                required(&args, 0, "apply", "an effect name")?,
                "effect",
            )?)),
            "remove" => Ok(Request::Remove(parse(
                required(&args, 0, "remove", "an effect name")?,
                "effect",
            )?)),
            "claim" => Ok(Request::Claim(parse(
                required(&args, 0, "claim", "a resource name")?,
                "resource",
            )?)),
            "skill" => Ok(Request::Skill {
                name: required(&args, 0, "skill", "a name and a level")?.to_owned(),
                level: parse(required(&args, 1, "skill", "a name and a level")?, "level")?,
            }),
            "status" | "s" => Ok(Request::Status),
            "save" => Ok(Request::Save(args.first().map(PathBuf::from))),
            "load" => Ok(Request::Load(args.first().map(PathBuf::from))),
            "reset" => Ok(Request::Reset),
            "help" | "?" => Ok(Request::Help),
            "quit" | "exit" | "q" => Ok(Request::Quit),
            other => Err(ParseError::Unknown(other.to_owned())),
        }
    }
}

fn required<'a>(
    args: &[&'a str],
    index: usize,
    command: &'static str,
    expected: &'static str,
) -> Result<&'a str, ParseError> {
    args.get(index)
        .copied()
        .ok_or(ParseError::MissingArgument { command, expected })
}

fn parse<T: std::str::FromStr>(value: &str, what: &'static str) -> Result<T, ParseError> {
    value.parse().map_err(|_| ParseError::Invalid {
        what,
        value: value.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_effect_and_resource_names_case_insensitively() {
        assert_eq!(
            "apply Frenzy".parse::<Request>(),
            Ok(Request::Apply(EffectId::Frenzy))
        );
        assert_eq!(
            "claim GOLD".parse::<Request>(),
            Ok(Request::Claim(ResourceKind::Gold))
        );
        assert_eq!(
            "remove absolute_zero".parse::<Request>(),
            Ok(Request::Remove(EffectId::AbsoluteZero))
        );
    }

    #[test]
    fn hit_defaults_to_target() {
        assert_eq!("hit".parse::<Request>(), Ok(Request::Hit(None)));
        assert_eq!("h 3".parse::<Request>(), Ok(Request::Hit(Some(3))));
    }

    #[test]
    fn point_needs_four_coordinates() {
        assert_eq!(
            "point 1 2 3".parse::<Request>(),
            Err(ParseError::MissingArgument {
                command: "point",
                expected: "x y width height"
            })
        );
        assert!(matches!(
            "point 0.5 0.5 1 1".parse::<Request>(),
            Ok(Request::Click(HitInput::Point { .. }))
        ));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!("".parse::<Request>(), Err(ParseError::Empty));
        assert_eq!(
            "dance".parse::<Request>(),
            Err(ParseError::Unknown("dance".into()))
        );
        assert_eq!(
            "apply nap".parse::<Request>(),
            Err(ParseError::Invalid {
                what: "effect",
                value: "nap".into()
            })
        );
    }
}
