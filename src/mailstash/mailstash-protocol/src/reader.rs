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

use crate::{command::Command, Error, ParseArgsError, UnparsedArgs, Verb};
use tokio::io::AsyncReadExt;

/// Longest command line accepted, see RFC5321#4.5.3.1.4.
const COMMAND_LINE_MAX: usize = 512;

fn find(bytes: &[u8], search: &[u8]) -> Option<usize> {
    bytes
        .windows(search.len())
        .position(|window| window == search)
}

/// Line read by [`Reader::as_line_stream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// A line, "\r\n" included.
    Complete(Vec<u8>),
    /// A line too long to be kept in memory, with its length.
    Overlong(usize),
}

/// Stream for reading commands and messages from the client.
///
/// The bytes read past the end of a line are kept between two streams, so a
/// client sending its message right after `DATA` does not lose any byte.
pub struct Reader<R: tokio::io::AsyncRead + Unpin + Send> {
    inner: R,
    buffer: bytes::BytesMut,
    additional_reserve: usize,
}

impl<R: tokio::io::AsyncRead + Unpin + Send> Reader<R> {
    /// Create a new stream.
    #[must_use]
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buffer: bytes::BytesMut::with_capacity(80),
            additional_reserve: 100,
        }
    }

    /// Produce a stream of "\r\n" terminated lines.
    ///
    /// At most `max_line` bytes are kept while waiting for the end of a line.
    /// Past that, the line is discarded up to its "\r\n" and reported as
    /// [`Line::Overlong`].
    ///
    /// A partial line pending when the peer closes the connection is discarded.
    pub fn as_line_stream(
        &mut self,
        max_line: usize,
    ) -> impl tokio_stream::Stream<Item = std::io::Result<Line>> + '_ {
        async_stream::try_stream! {
            // bytes of `buffer` known to hold no "\r\n"
            let mut scanned = 0;
            // bytes of the current line already thrown away
            let mut discarded = 0;

            loop {
                if let Some(pos) = find(&self.buffer[scanned..], b"\r\n") {
                    let out = self.buffer.split_to(scanned + pos + 2);
                    scanned = 0;

                    if discarded == 0 {
                        yield Line::Complete(out.to_vec());
                    } else {
                        yield Line::Overlong(std::mem::take(&mut discarded) + out.len());
                    }
                    continue;
                }

                // the last byte may be the '\r' of a split "\r\n"
                scanned = self.buffer.len().saturating_sub(1);
                if discarded != 0 || self.buffer.len() > max_line {
                    bytes::Buf::advance(&mut self.buffer, scanned);
                    discarded += scanned;
                    scanned = 0;
                }

                self.buffer.reserve(self.additional_reserve);
                let read_size = self.inner.read_buf(&mut self.buffer).await?;
                if read_size == 0 {
                    if !self.buffer.is_empty() || discarded != 0 {
                        tracing::debug!(
                            remaining = self.buffer.len() + discarded,
                            "Connection closed in the middle of a line"
                        );
                        self.buffer.clear();
                    }
                    return;
                }
            }
        }
    }

    /// Produce a stream of lines to generate IMF compliant messages.
    ///
    /// The lines are yielded with dot-stuffing removed, until `.<CRLF>`.
    /// If the message exceeds `size_limit`, the remaining lines are drained
    /// and a single [`Error::MessageTooLong`] is produced at the end of the message.
    /// If the connection is closed before `.<CRLF>`, an [`Error::Disconnected`]
    /// is produced.
    pub fn as_message_stream(
        &mut self,
        size_limit: usize,
    ) -> impl tokio_stream::Stream<Item = Result<Vec<u8>, Error>> + '_ {
        async_stream::stream! {
            let mut size = 0;

            for await line in self.as_line_stream(size_limit.saturating_add(2)) {
                let mut line = match line {
                    Ok(Line::Complete(line)) => line,
                    Ok(Line::Overlong(len)) => {
                        size += len;
                        continue;
                    }
                    Err(e) => {
                        yield Err(Error::Io(e));
                        return;
                    }
                };

                if line == b".\r\n" {
                    if size > size_limit {
                        yield Err(Error::MessageTooLong { limit: size_limit, size });
                    }
                    return;
                }

                if line.first() == Some(&b'.') {
                    line.remove(0);
                }

                size += line.len();
                if size <= size_limit {
                    yield Ok(line);
                }
            }

            yield Err(Error::Disconnected);
        }
    }

    /// Produce a stream of ESMTP commands.
    pub fn as_command_stream(
        &mut self,
    ) -> impl tokio_stream::Stream<Item = Result<Command<Verb, UnparsedArgs>, ParseArgsError>> + '_
    {
        async_stream::stream! {
            for await line in self.as_line_stream(COMMAND_LINE_MAX) {
                let line = match line {
                    Ok(Line::Complete(line)) => line,
                    Ok(Line::Overlong(got)) => {
                        yield Err(ParseArgsError::BufferTooLong { expected: COMMAND_LINE_MAX, got });
                        continue;
                    }
                    Err(e) => {
                        tracing::debug!("Failed to read a command: {e}");
                        return;
                    }
                };

                if line.len() > COMMAND_LINE_MAX {
                    yield Err(ParseArgsError::BufferTooLong { expected: COMMAND_LINE_MAX, got: line.len() });
                    continue;
                }

                yield Ok(Verb::parse_line(line));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Line, Reader};
    use crate::{Error, ParseArgsError, Verb};
    use tokio::io::AsyncReadExt;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn lines_keep_remaining_bytes() {
        let mut reader = Reader::new(b"NOOP\r\nDATA\r\nhello\r\n.\r\nQUIT\r\npartial".as_slice());

        {
            let commands = reader.as_command_stream();
            tokio::pin!(commands);
            let (verb, _) = commands.next().await.unwrap().unwrap();
            assert_eq!(verb, Verb::Noop);
            let (verb, _) = commands.next().await.unwrap().unwrap();
            assert_eq!(verb, Verb::Data);
        }

        let message = reader
            .as_message_stream(1000)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        pretty_assertions::assert_eq!(message, vec![b"hello\r\n".to_vec()]);

        let commands = reader
            .as_command_stream()
            .map(|c| c.map(|(verb, _)| verb).unwrap())
            .collect::<Vec<_>>()
            .await;
        pretty_assertions::assert_eq!(commands, vec![Verb::Quit]);
    }

    #[tokio::test]
    async fn message_dot_stuffing() {
        let mut reader = Reader::new(b"..hidden\r\n.\r\n".as_slice());
        let message = reader
            .as_message_stream(1000)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        pretty_assertions::assert_eq!(message, vec![b".hidden\r\n".to_vec()]);
    }

    #[tokio::test]
    async fn message_too_long_is_drained() {
        let mut reader = Reader::new(b"0123456789\r\n0123456789\r\n.\r\nQUIT\r\n".as_slice());

        let message = reader.as_message_stream(15).collect::<Vec<_>>().await;
        assert_eq!(message.len(), 2);
        assert_eq!(message[0].as_ref().unwrap(), b"0123456789\r\n");
        assert!(matches!(
            message[1],
            Err(Error::MessageTooLong {
                limit: 15,
                size: 24
            })
        ));

        let commands = reader.as_command_stream().collect::<Vec<_>>().await;
        assert!(matches!(commands.as_slice(), [Ok((Verb::Quit, _))]));
    }

    #[tokio::test]
    async fn message_exactly_at_limit() {
        let mut reader = Reader::new(b"0123456789\r\n.\r\n".as_slice());
        let message = reader.as_message_stream(12).collect::<Vec<_>>().await;
        assert!(matches!(message.as_slice(), [Ok(_)]));
    }

    #[tokio::test]
    async fn message_interrupted() {
        let mut reader = Reader::new(b"hello\r\n".as_slice());
        let message = reader.as_message_stream(1000).collect::<Vec<_>>().await;
        assert!(matches!(message.as_slice(), [Ok(_), Err(Error::Disconnected)]));
    }

    #[tokio::test]
    async fn command_too_long() {
        let line = format!("NOOP {}\r\nNOOP\r\n", "a".repeat(600));
        let mut reader = Reader::new(line.as_bytes());
        let commands = reader.as_command_stream().collect::<Vec<_>>().await;
        assert!(matches!(
            commands.as_slice(),
            [
                Err(ParseArgsError::BufferTooLong { expected: 512, .. }),
                Ok((Verb::Noop, _))
            ]
        ));
    }

    #[tokio::test]
    async fn line_without_crlf_is_discarded() {
        let input = tokio::io::repeat(b'a')
            .take(1 << 20)
            .chain(b"\r\n.\r\nQUIT\r\n".as_slice());
        let mut reader = Reader::new(input);

        let message = reader.as_message_stream(1024).collect::<Vec<_>>().await;
        assert!(matches!(
            message.as_slice(),
            [Err(Error::MessageTooLong {
                limit: 1024,
                size
            })] if *size == (1 << 20) + 2
        ));

        let commands = reader.as_command_stream().collect::<Vec<_>>().await;
        assert!(matches!(commands.as_slice(), [Ok((Verb::Quit, _))]));
    }

    #[tokio::test]
    async fn endless_line_keeps_memory_bounded() {
        let (client, server) = tokio::io::duplex(4096);
        tokio::spawn(async move {
            let mut client = client;
            while tokio::io::AsyncWriteExt::write_all(&mut client, &[b'a'; 1024])
                .await
                .is_ok()
            {}
        });
        let mut reader = Reader::new(server);

        {
            let message = reader.as_message_stream(1024);
            tokio::pin!(message);
            let next = tokio::time::timeout(
                std::time::Duration::from_millis(300),
                message.next(),
            )
            .await;
            assert!(next.is_err());
        }

        assert!(reader.buffer.len() < 64 * 1024, "{}", reader.buffer.len());
    }

    #[tokio::test]
    async fn overlong_command_split_across_reads() {
        let input = tokio::io::repeat(b'a')
            .take(2000)
            .chain(b"\r\nNOOP\r\n".as_slice());
        let mut reader = Reader::new(input);

        let lines = reader.as_line_stream(512).collect::<Vec<_>>().await;
        pretty_assertions::assert_eq!(
            lines.into_iter().collect::<Result<Vec<_>, _>>().unwrap(),
            vec![Line::Overlong(2002), Line::Complete(b"NOOP\r\n".to_vec())]
        );
    }
}
