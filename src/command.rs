//! Tokenizer for the `verb:arg,arg,...` command language.

use std::fmt;

/// Maximum number of arguments a single command can carry. Further arguments are dropped.
pub const MAX_ARGS: usize = 16;

/// A single tokenized command: a verb and its positional arguments.
///
/// Empty argument slots (e.g. from consecutive commas) are stored as `None`, so that handlers can
/// apply their per-argument defaults. There is no escaping; an argument can never contain a `,`
/// and the first `:` always ends the verb.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Command {
    verb: String,
    args: Vec<Option<String>>,
    dropped: usize,
}

impl Command {
    /// Splits a command string into verb and arguments.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fx2prog::Command;
    ///
    /// let command = Command::parse("dbulk:6,,2");
    /// assert_eq!(command.verb(), "dbulk");
    /// assert_eq!(command.arg(0), Some("6"));
    /// assert_eq!(command.arg(1), None);
    /// assert_eq!(command.arg(2), Some("2"));
    /// ```
    pub fn parse(input: &str) -> Self {
        let (verb, rest) = match input.find(':') {
            Some(colon) => (&input[..colon], Some(&input[colon + 1..])),
            None => (input, None),
        };

        let mut args = Vec::new();
        let mut dropped = 0;
        if let Some(rest) = rest {
            for arg in rest.split(',') {
                if args.len() == MAX_ARGS {
                    dropped += 1;
                    continue;
                }
                args.push(if arg.is_empty() {
                    None
                } else {
                    Some(arg.to_string())
                });
            }
        }

        Command {
            verb: verb.to_string(),
            args,
            dropped,
        }
    }

    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// Returns the argument at `index`, or `None` if it is absent or empty.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).and_then(|arg| arg.as_deref())
    }

    /// Number of argument slots, including empty ones.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Number of arguments that were discarded because of the [`MAX_ARGS`] limit.
    ///
    /// [`MAX_ARGS`]: constant.MAX_ARGS.html
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Parses the argument at `index` as an integer.
    ///
    /// Returns `Ok(None)` for absent arguments and an error message for malformed ones.
    pub fn int_arg(&self, index: usize) -> Result<Option<i64>, String> {
        match self.arg(index) {
            None => Ok(None),
            Some(text) => parse_int(text)
                .map(Some)
                .ok_or_else(|| format!("\"{}\" is not a number", text)),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.verb)?;
        for (i, arg) in self.args.iter().enumerate() {
            f.write_str(if i == 0 { ":" } else { "," })?;
            if let Some(arg) = arg {
                f.write_str(arg)?;
            }
        }
        Ok(())
    }
}

/// Parses an integer with C-style radix prefixes: `0x`/`0X` for hexadecimal, a leading `0` for
/// octal and decimal otherwise. An optional sign may precede the prefix.
///
/// # Examples
///
/// ```rust
/// use fx2prog::parse_int;
///
/// assert_eq!(parse_int("0xe600"), Some(0xe600));
/// assert_eq!(parse_int("-512"), Some(-512));
/// assert_eq!(parse_int("010"), Some(8));
/// assert_eq!(parse_int("12abc"), None);
/// ```
pub fn parse_int(input: &str) -> Option<i64> {
    let input = input.trim();
    let (negative, digits) = match input.as_bytes().first() {
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        _ => (false, input),
    };

    let (radix, digits) = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        (16, hex)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }

    let value = i64::from_str_radix(digits, radix).ok()?;
    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn verb_only() {
        let command = Command::parse("reset");
        assert_eq!(command.verb(), "reset");
        assert!(command.is_empty());
        assert_eq!(command.arg(0), None);
    }

    #[test]
    fn trailing_colon_gives_one_empty_slot() {
        let command = Command::parse("altif:");
        assert_eq!(command.verb(), "altif");
        assert_eq!(command.len(), 1);
        assert_eq!(command.arg(0), None);
    }

    #[test]
    fn later_colons_belong_to_arguments() {
        let command = Command::parse("sbulk:2,a:b");
        assert_eq!(command.arg(1), Some("a:b"));
    }

    #[test]
    fn excess_arguments_are_dropped() {
        let input = format!("ctrl:{}", vec!["1"; MAX_ARGS + 3].join(","));
        let command = Command::parse(&input);
        assert_eq!(command.len(), MAX_ARGS);
        assert_eq!(command.dropped(), 3);
    }

    #[test]
    fn integers() {
        assert_eq!(parse_int("0"), Some(0));
        assert_eq!(parse_int("300"), Some(300));
        assert_eq!(parse_int("0x81"), Some(0x81));
        assert_eq!(parse_int("0XFF"), Some(0xff));
        assert_eq!(parse_int("-0x10"), Some(-16));
        assert_eq!(parse_int("017"), Some(15));
        assert_eq!(parse_int("+5"), Some(5));
        assert_eq!(parse_int(""), None);
        assert_eq!(parse_int("0x"), None);
        assert_eq!(parse_int("09"), None);
        assert_eq!(parse_int("abc"), None);
    }

    #[test]
    fn malformed_integer_argument() {
        let command = Command::parse("dram:zero,1");
        assert!(command.int_arg(0).is_err());
        assert_eq!(command.int_arg(1), Ok(Some(1)));
        assert_eq!(command.int_arg(2), Ok(None));
    }

    proptest! {
        #[test]
        fn display_round_trips(
            verb in "[a-z_]{1,10}",
            args in proptest::collection::vec("[^,:]{1,8}", 0..MAX_ARGS),
        ) {
            let input = if args.is_empty() {
                verb.clone()
            } else {
                format!("{}:{}", verb, args.join(","))
            };
            let command = Command::parse(&input);
            prop_assert_eq!(command.to_string(), input.clone());
            prop_assert_eq!(Command::parse(&command.to_string()), command);
        }
    }
}
