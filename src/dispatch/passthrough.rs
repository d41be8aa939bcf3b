use std::ffi::OsString;

use clap::{Arg, Command};

/// Split a command line into the arguments `command` knows about and the rest.
///
/// Known options keep their values and go to clap. Positionals fill the
/// command's positional slots in order; once those are full, positionals and
/// unrecognised options are collected, in order, for the provider. Everything
/// after a bare `--` is collected as well.
pub fn split_known_args<I, T>(command: &Command, argv: I) -> (Vec<OsString>, Vec<String>)
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut command = command.clone();
    command.build();

    let mut positional_slots = command.get_positionals().count();
    let mut known = Vec::new();
    let mut extra = Vec::new();

    let mut tokens = argv.into_iter().map(Into::into).peekable();
    if let Some(bin) = tokens.next() {
        known.push(bin);
    }

    while let Some(token) = tokens.next() {
        let Some(text) = token.to_str().map(str::to_string) else {
            if positional_slots > 0 {
                positional_slots -= 1;
                known.push(token);
            } else {
                extra.push(token.to_string_lossy().into_owned());
            }
            continue;
        };

        if text == "--" {
            extra.extend(tokens.map(|t| t.to_string_lossy().into_owned()));
            break;
        }

        if !looks_like_option(&text) {
            if positional_slots > 0 {
                positional_slots -= 1;
                known.push(token);
            } else {
                extra.push(text);
            }
            continue;
        }

        let Some((arg, pending_values)) = match_option(&command, &text) else {
            extra.push(text);
            continue;
        };

        known.push(token);
        let max_values = arg
            .get_num_args()
            .map(|range| range.max_values())
            .unwrap_or(0);
        let wanted = if pending_values { max_values } else { 0 };
        let mut taken = 0;
        while taken < wanted {
            let next_is_value = tokens
                .peek()
                .is_some_and(|next| !next.to_str().is_some_and(looks_like_option));
            if !next_is_value {
                break;
            }
            if let Some(next) = tokens.next() {
                known.push(next);
            }
            taken += 1;
        }
    }

    (known, extra)
}

fn looks_like_option(token: &str) -> bool {
    token.len() > 1 && token.starts_with('-') && token.parse::<f64>().is_err()
}

/// The argument an option token refers to, and whether its values follow as
/// separate tokens.
fn match_option<'a>(command: &'a Command, token: &str) -> Option<(&'a Arg, bool)> {
    if let Some(long) = token.strip_prefix("--") {
        let (name, inline) = match long.split_once('=') {
            Some((name, _)) => (name, true),
            None => (long, false),
        };
        let arg = command
            .get_arguments()
            .find(|arg| arg.get_long() == Some(name))?;
        return Some((arg, !inline));
    }

    // Short cluster such as `-rv`: every flag in it must be known
    let shorts: Vec<char> = token.chars().skip(1).collect();
    let mut last = None;
    for (i, short) in shorts.iter().enumerate() {
        let arg = command
            .get_arguments()
            .find(|arg| arg.get_short() == Some(*short))?;
        let takes_values = arg
            .get_num_args()
            .is_some_and(|range| range.takes_values());
        if takes_values {
            // Anything left in the cluster is the value
            return Some((arg, i + 1 == shorts.len()));
        }
        last = Some(arg);
    }
    last.map(|arg| (arg, false))
}
