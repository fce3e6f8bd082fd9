//! The `:` command language.
//!
//! ```text
//! :q  :q!  :w  :wq  :qall  :qall!  :sort  :sort!  :comment [prefix]
//! :reload  :tabsize N  :tabstop N  :expandtabs  :noexpandtabs  :retheme
//! :N
//! ```

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineCommand {
    /// Close the active buffer
    Quit { force: bool },
    Write,
    WriteQuit,
    /// Close every buffer
    QuitAll { force: bool },
    Sort { reverse: bool },
    /// Toggle line comments, with an explicit prefix if given
    Comment(Option<String>),
    Reload,
    TabSize(usize),
    ExpandTabs(bool),
    Retheme,
    GotoLine(i64),
}

/// Errors from parsing a command line. The messages go to the status line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("invalid command: {0}")]
    Invalid(String),

    #[error("`{cmd}`: expected {expected} args but got {got}")]
    ArgCount {
        cmd: String,
        expected: usize,
        got: usize,
    },

    #[error("invalid size: {0}")]
    InvalidSize(String),

    #[error("not an integer: '{0}'")]
    NotAnInteger(String),
}

/// Parses a command line; an optional leading `:` is ignored.
///
/// Blank input is `Ok(None)`.
pub fn parse(input: &str) -> Result<Option<LineCommand>, CommandError> {
    let line = input.trim();
    let line = line.strip_prefix(':').unwrap_or(line).trim();
    if line.is_empty() {
        return Ok(None);
    }
    if let Ok(number) = line.parse::<i64>() {
        return Ok(Some(LineCommand::GotoLine(number)));
    }

    let mut words = line.split_whitespace();
    let cmd = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();
    let expect = |expected: usize| {
        if args.len() == expected {
            Ok(())
        } else {
            Err(CommandError::ArgCount {
                cmd: cmd.to_string(),
                expected,
                got: args.len(),
            })
        }
    };

    let command = match cmd {
        "q" => expect(0).map(|_| LineCommand::Quit { force: false }),
        "q!" => expect(0).map(|_| LineCommand::Quit { force: true }),
        "w" => expect(0).map(|_| LineCommand::Write),
        "wq" => expect(0).map(|_| LineCommand::WriteQuit),
        "qall" => expect(0).map(|_| LineCommand::QuitAll { force: false }),
        "qall!" => expect(0).map(|_| LineCommand::QuitAll { force: true }),
        "sort" => expect(0).map(|_| LineCommand::Sort { reverse: false }),
        "sort!" => expect(0).map(|_| LineCommand::Sort { reverse: true }),
        "comment" => match args.as_slice() {
            [] => Ok(LineCommand::Comment(None)),
            [prefix] => Ok(LineCommand::Comment(Some(prefix.to_string()))),
            _ => expect(1).map(|_| LineCommand::Comment(None)),
        },
        "reload" => expect(0).map(|_| LineCommand::Reload),
        "tabsize" | "tabstop" => expect(1).and_then(|_| {
            let arg = args[0];
            match arg.parse::<usize>() {
                Ok(size) if size > 0 => Ok(LineCommand::TabSize(size)),
                _ => Err(CommandError::InvalidSize(arg.to_string())),
            }
        }),
        "expandtabs" => expect(0).map(|_| LineCommand::ExpandTabs(true)),
        "noexpandtabs" => expect(0).map(|_| LineCommand::ExpandTabs(false)),
        "retheme" => expect(0).map(|_| LineCommand::Retheme),
        _ => Err(CommandError::Invalid(input.trim().to_string())),
    }?;
    Ok(Some(command))
}

/// Parses the answer to the go-to-line prompt.
pub fn parse_line_number(input: &str) -> Result<i64, CommandError> {
    input
        .trim()
        .parse()
        .map_err(|_| CommandError::NotAnInteger(input.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands() {
        assert_eq!(parse(":q"), Ok(Some(LineCommand::Quit { force: false })));
        assert_eq!(parse("q!"), Ok(Some(LineCommand::Quit { force: true })));
        assert_eq!(parse(":wq"), Ok(Some(LineCommand::WriteQuit)));
        assert_eq!(parse(":qall!"), Ok(Some(LineCommand::QuitAll { force: true })));
        assert_eq!(parse(":sort!"), Ok(Some(LineCommand::Sort { reverse: true })));
        assert_eq!(parse(":comment"), Ok(Some(LineCommand::Comment(None))));
        assert_eq!(
            parse(":comment //"),
            Ok(Some(LineCommand::Comment(Some("//".into()))))
        );
        assert_eq!(parse(":tabstop 8"), Ok(Some(LineCommand::TabSize(8))));
        assert_eq!(parse(":noexpandtabs"), Ok(Some(LineCommand::ExpandTabs(false))));
        assert_eq!(parse(":retheme"), Ok(Some(LineCommand::Retheme)));
        assert_eq!(parse(":reload"), Ok(Some(LineCommand::Reload)));
    }

    #[test]
    fn test_line_numbers() {
        assert_eq!(parse(":42"), Ok(Some(LineCommand::GotoLine(42))));
        assert_eq!(parse(":-1"), Ok(Some(LineCommand::GotoLine(-1))));
        assert_eq!(parse_line_number(" 7 "), Ok(7));
        assert_eq!(
            parse_line_number("seven").unwrap_err().to_string(),
            "not an integer: 'seven'"
        );
    }

    #[test]
    fn test_blank() {
        assert_eq!(parse(""), Ok(None));
        assert_eq!(parse(" : "), Ok(None));
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            parse(":fly").unwrap_err().to_string(),
            "invalid command: :fly"
        );
        assert_eq!(
            parse(":q now").unwrap_err().to_string(),
            "`q`: expected 0 args but got 1"
        );
        assert_eq!(
            parse(":tabsize").unwrap_err().to_string(),
            "`tabsize`: expected 1 args but got 0"
        );
        assert_eq!(
            parse(":comment a b").unwrap_err().to_string(),
            "`comment`: expected 1 args but got 2"
        );
        assert_eq!(
            parse(":tabsize x").unwrap_err().to_string(),
            "invalid size: x"
        );
        assert_eq!(
            parse(":tabsize 0").unwrap_err().to_string(),
            "invalid size: 0"
        );
    }
}
