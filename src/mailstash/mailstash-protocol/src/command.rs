/*
 * vSMTP mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/

/// Buffer received from the client.
pub struct UnparsedArgs(pub Vec<u8>);

/// A verb and its arguments.
pub type Command<Verb, Args> = (Verb, Args);

/// Information received from the client at the connection TCP/IP.
pub struct AcceptArgs {
    /// Peer address of the connection.
    pub client_addr: std::net::SocketAddr,
    /// Address of the server which accepted the connection.
    pub server_addr: std::net::SocketAddr,
    /// Instant when the connection was accepted.
    pub timestamp: time::OffsetDateTime,
    /// Unique identifier of the session.
    pub uuid: uuid::Uuid,
}

/// Information received from the client at the HELO command.
pub struct HeloArgs {
    /// Name of the client.
    pub client_name: String,
}

/// Information received from the client at the EHLO command.
pub struct EhloArgs {
    /// Name of the client.
    pub client_name: String,
}

/// Information received from the client at the MAIL FROM command.
#[derive(Debug, PartialEq, Eq)]
pub struct MailFromArgs {
    /// Sender address, `None` for the null reverse path `<>`.
    pub reverse_path: Option<String>,
    /// ESMTP parameters, as received.
    pub options: Vec<String>,
    /// Value of the `SIZE` parameter.
    pub size: Option<usize>,
    /// The `SMTPUTF8` parameter is present.
    pub smtp_utf8: bool,
}

/// Information received from the client at the RCPT TO command.
#[derive(Debug, PartialEq, Eq)]
pub struct RcptToArgs {
    /// Recipient address.
    pub forward_path: String,
    /// ESMTP parameters, as received.
    pub options: Vec<String>,
}

/// Error while parsing the arguments of a command.
#[derive(Debug, thiserror::Error)]
pub enum ParseArgsError {
    /// Non-UTF8 buffer.
    #[error("arguments are not valid utf8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    /// The command line is longer than allowed.
    #[error("command line is not supposed to be longer than {expected} bytes but got {got}")]
    BufferTooLong {
        /// Maximum size expected.
        expected: usize,
        /// Actual size.
        got: usize,
    },
    /// Ill-formed path or parameter.
    #[error("invalid arguments")]
    InvalidArgs,
}

// NOTE: from [`[u8]::trim_ascii_start`]
const fn trim_ascii_start(slice: &[u8]) -> &[u8] {
    let mut bytes = slice;
    while let [first, rest @ ..] = bytes {
        if first.is_ascii_whitespace() {
            bytes = rest;
        } else {
            break;
        }
    }
    bytes
}

fn strip_crlf(value: &[u8]) -> Result<&[u8], ParseArgsError> {
    value.strip_suffix(b"\r\n").ok_or(ParseArgsError::InvalidArgs)
}

/// Split `<path> params...` into the path (without brackets) and the parameters.
fn split_path(value: &[u8]) -> Result<(&[u8], &[u8]), ParseArgsError> {
    let value = trim_ascii_start(value);
    let inner = value.strip_prefix(b"<").ok_or(ParseArgsError::InvalidArgs)?;

    let mut quoted = false;
    let mut escaped = false;
    for (idx, c) in inner.iter().enumerate() {
        match c {
            _ if escaped => escaped = false,
            b'\\' if quoted => escaped = true,
            b'"' => quoted = !quoted,
            b'>' if !quoted => {
                let params = &inner[idx + 1..];
                if !params.is_empty() && !params[0].is_ascii_whitespace() {
                    return Err(ParseArgsError::InvalidArgs);
                }
                return Ok((&inner[..idx], params));
            }
            _ => {}
        }
    }

    Err(ParseArgsError::InvalidArgs)
}

fn parse_params(params: &[u8]) -> Result<Vec<String>, ParseArgsError> {
    String::from_utf8(params.to_vec())?
        .split_ascii_whitespace()
        .map(|param| {
            let keyword = param.split_once('=').map_or(param, |(keyword, _)| keyword);
            if keyword.is_empty()
                || !keyword
                    .bytes()
                    .all(|c| c.is_ascii_alphanumeric() || c == b'-')
            {
                return Err(ParseArgsError::InvalidArgs);
            }
            Ok(param.to_string())
        })
        .collect()
}

fn parse_client_name(value: UnparsedArgs) -> Result<String, ParseArgsError> {
    let client_name = String::from_utf8(strip_crlf(&value.0)?.to_vec())?
        .trim()
        .to_string();
    if client_name.is_empty() || client_name.contains(char::is_whitespace) {
        return Err(ParseArgsError::InvalidArgs);
    }
    Ok(client_name)
}

impl TryFrom<UnparsedArgs> for HeloArgs {
    type Error = ParseArgsError;

    fn try_from(value: UnparsedArgs) -> Result<Self, Self::Error> {
        Ok(Self {
            client_name: parse_client_name(value)?,
        })
    }
}

impl TryFrom<UnparsedArgs> for EhloArgs {
    type Error = ParseArgsError;

    fn try_from(value: UnparsedArgs) -> Result<Self, Self::Error> {
        Ok(Self {
            client_name: parse_client_name(value)?,
        })
    }
}

impl TryFrom<UnparsedArgs> for MailFromArgs {
    type Error = ParseArgsError;

    fn try_from(value: UnparsedArgs) -> Result<Self, Self::Error> {
        let (path, params) = split_path(strip_crlf(&value.0)?)?;
        let options = parse_params(params)?;

        let mut size = None;
        let mut smtp_utf8 = false;
        for option in &options {
            match option.split_once('=') {
                Some((keyword, value)) if keyword.eq_ignore_ascii_case("SIZE") => {
                    size = Some(
                        value
                            .parse::<usize>()
                            .map_err(|_| ParseArgsError::InvalidArgs)?,
                    );
                }
                None if option.eq_ignore_ascii_case("SMTPUTF8") => smtp_utf8 = true,
                _ => {}
            }
        }

        Ok(Self {
            reverse_path: if path.is_empty() {
                None
            } else {
                Some(String::from_utf8(path.to_vec())?)
            },
            options,
            size,
            smtp_utf8,
        })
    }
}

impl TryFrom<UnparsedArgs> for RcptToArgs {
    type Error = ParseArgsError;

    fn try_from(value: UnparsedArgs) -> Result<Self, Self::Error> {
        let (path, params) = split_path(strip_crlf(&value.0)?)?;
        if path.is_empty() {
            return Err(ParseArgsError::InvalidArgs);
        }

        Ok(Self {
            forward_path: String::from_utf8(path.to_vec())?,
            options: parse_params(params)?,
        })
    }
}

/// SMTP Command.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::EnumString, strum::EnumIter,
)]
pub enum Verb {
    /// Used to identify the SMTP client to the SMTP server. (historical)
    #[strum(serialize = "HELO ")]
    Helo,
    /// Used to identify the SMTP client to the SMTP server and request smtp extensions.
    #[strum(serialize = "EHLO ")]
    Ehlo,
    /// Initiate a mail transaction.
    #[strum(serialize = "MAIL FROM:")]
    MailFrom,
    /// Identify an individual recipient of the mail data; multiple recipients
    /// are specified by multiple uses of this command.
    #[strum(serialize = "RCPT TO:")]
    RcptTo,
    /// Causes the mail data to be appended to the mail data buffer.
    #[strum(serialize = "DATA\r\n")]
    Data,
    /// The receiver MUST send a "221 OK" reply, and then close the transmission channel.
    #[strum(serialize = "QUIT\r\n")]
    Quit,
    /// Abort the current mail transaction. Any stored sender, recipients, and
    /// mail data MUST be discarded.
    #[strum(serialize = "RSET\r\n")]
    Rset,
    /// Ask the server for helpful information.
    #[strum(serialize = "HELP")]
    Help,
    /// Does not affect any parameters or previously entered commands.
    #[strum(serialize = "NOOP\r\n")]
    Noop,
    /// Any other buffer received while expecting a command is considered an
    /// unknown.
    Unknown,
}

impl Verb {
    /// Split a command line into its verb and its arguments, the verb being
    /// matched case-insensitively.
    #[must_use]
    pub fn parse_line(line: Vec<u8>) -> Command<Self, UnparsedArgs> {
        <Self as strum::IntoEnumIterator>::iter()
            .filter(|verb| *verb != Self::Unknown)
            .find(|verb| {
                let prefix = verb.as_ref().as_bytes();
                line.len() >= prefix.len() && line[..prefix.len()].eq_ignore_ascii_case(prefix)
            })
            .map_or_else(
                || (Self::Unknown, UnparsedArgs(line.clone())),
                |verb| (verb, UnparsedArgs(line[verb.as_ref().len()..].to_vec())),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::{MailFromArgs, ParseArgsError, RcptToArgs, UnparsedArgs, Verb};

    fn args(s: &str) -> UnparsedArgs {
        UnparsedArgs(s.as_bytes().to_vec())
    }

    #[rstest::rstest]
    #[case("HELO foo\r\n", Verb::Helo, "foo\r\n")]
    #[case("ehlo foo\r\n", Verb::Ehlo, "foo\r\n")]
    #[case("Mail From:<a@b>\r\n", Verb::MailFrom, "<a@b>\r\n")]
    #[case("RCPT TO: <a@b>\r\n", Verb::RcptTo, " <a@b>\r\n")]
    #[case("data\r\n", Verb::Data, "")]
    #[case("HELP DATA\r\n", Verb::Help, " DATA\r\n")]
    #[case("VRFY a@b\r\n", Verb::Unknown, "VRFY a@b\r\n")]
    #[case("DATA now\r\n", Verb::Unknown, "DATA now\r\n")]
    fn parse_verb(#[case] line: &str, #[case] verb: Verb, #[case] rest: &str) {
        let (parsed, args) = Verb::parse_line(line.as_bytes().to_vec());
        assert_eq!(parsed, verb);
        pretty_assertions::assert_eq!(std::str::from_utf8(&args.0).unwrap(), rest);
    }

    #[rstest::rstest]
    #[case("<john@doe>\r\n", Some("john@doe"), &[], None, false)]
    #[case(" <john@doe>\r\n", Some("john@doe"), &[], None, false)]
    #[case("<>\r\n", None, &[], None, false)]
    #[case(
        "<john@doe> SIZE=1024 SMTPUTF8\r\n",
        Some("john@doe"),
        &["SIZE=1024", "SMTPUTF8"],
        Some(1024),
        true
    )]
    #[case("<\"j>d\"@doe> BODY=8BITMIME\r\n", Some("\"j>d\"@doe"), &["BODY=8BITMIME"], None, false)]
    fn mail_from(
        #[case] input: &str,
        #[case] reverse_path: Option<&str>,
        #[case] options: &[&str],
        #[case] size: Option<usize>,
        #[case] smtp_utf8: bool,
    ) {
        pretty_assertions::assert_eq!(
            MailFromArgs::try_from(args(input)).unwrap(),
            MailFromArgs {
                reverse_path: reverse_path.map(str::to_string),
                options: options.iter().map(ToString::to_string).collect(),
                size,
                smtp_utf8,
            }
        );
    }

    #[rstest::rstest]
    #[case("john@doe\r\n")]
    #[case("<john@doe\r\n")]
    #[case("<john@doe>\r")]
    #[case("<john@doe>SIZE=1\r\n")]
    #[case("<john@doe> SIZE=big\r\n")]
    #[case("<john@doe> =value\r\n")]
    fn mail_from_invalid(#[case] input: &str) {
        assert!(matches!(
            MailFromArgs::try_from(args(input)),
            Err(ParseArgsError::InvalidArgs)
        ));
    }

    #[test]
    fn rcpt_to() {
        pretty_assertions::assert_eq!(
            RcptToArgs::try_from(args("<jane@doe> NOTIFY=NEVER\r\n")).unwrap(),
            RcptToArgs {
                forward_path: "jane@doe".to_string(),
                options: vec!["NOTIFY=NEVER".to_string()],
            }
        );
        assert!(RcptToArgs::try_from(args("<>\r\n")).is_err());
    }

    #[test]
    fn non_utf8_path() {
        assert!(matches!(
            RcptToArgs::try_from(UnparsedArgs(b"<\xff@doe>\r\n".to_vec())),
            Err(ParseArgsError::InvalidUtf8(_))
        ));
    }
}
