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

use super::{ehlo, GREETINGS};
use crate::config::{local_test, local_test_uncompressed};
use crate::test_receiver;

const MESSAGE: &str = concat!(
    "Message-ID: <abc@example.com>\r\n",
    "Subject: hi\r\n",
    "\r\n",
    "..hello\r\n",
    "world\r\n",
    ".\r\n",
);

#[tokio::test]
async fn archived() {
    let store = test_receiver!(
        with_config => local_test_uncompressed(33_554_432),
        [
            "EHLO client.example.org\r\n",
            "MAIL FROM:<anne@example.org> SMTPUTF8\r\n",
            "RCPT TO:<bob@example.com>\r\n",
            "RCPT TO:<carol@example.com> NOTIFY=NEVER\r\n",
            "DATA\r\n",
            MESSAGE,
            "QUIT\r\n",
        ]
        .concat(),
        [
            GREETINGS,
            ehlo(33_554_432).as_str(),
            "250 OK\r\n",
            "250 OK\r\n",
            "250 OK\r\n",
            "354 End data with <CR><LF>.<CR><LF>\r\n",
            "250 OK\r\n",
            "221 Service closing transmission channel\r\n",
        ]
        .concat()
    )
    .unwrap();

    let keys = store.keys();
    pretty_assertions::assert_eq!(keys.len(), 2);

    let content_key = keys.iter().find(|k| k.ends_with(".eml")).unwrap();
    let metadata_key = keys.iter().find(|k| k.ends_with(".json")).unwrap();
    pretty_assertions::assert_eq!(
        content_key.strip_suffix(".eml"),
        metadata_key.strip_suffix(".json")
    );

    let now = time::OffsetDateTime::now_utc();
    let prefix = format!(
        "s3://mailstash-test/emails/{:04}/{:02}/",
        now.year(),
        u8::from(now.month())
    );
    let id = content_key
        .strip_prefix(&prefix)
        .and_then(|id| id.strip_suffix(".eml"))
        .unwrap();
    let (random, digest) = id.split_once('-').unwrap();
    pretty_assertions::assert_eq!((random.len(), digest.len()), (32, 10));

    pretty_assertions::assert_eq!(
        std::str::from_utf8(&store.get(content_key).unwrap()).unwrap(),
        "Message-ID: <abc@example.com>\r\nSubject: hi\r\n\r\n.hello\r\nworld\r\n"
    );

    let metadata =
        serde_json::from_slice::<serde_json::Value>(&store.get(metadata_key).unwrap()).unwrap();
    pretty_assertions::assert_eq!(
        metadata,
        serde_json::json!({
            "mail_from": "anne@example.org",
            "mail_options": ["SMTPUTF8"],
            "message_id": "<abc@example.com>",
            "path": content_key,
            "rcpt_options": ["NOTIFY=NEVER"],
            "rcpt_tos": ["bob@example.com", "carol@example.com"],
            "session_ip": "127.0.0.1",
            "smtp_utf8": true,
        })
    );
}

#[tokio::test]
async fn gzip() {
    let store = test_receiver!(
        [
            "HELO client.example.org\r\n",
            "MAIL FROM:<>\r\n",
            "RCPT TO:<bob@example.com>\r\n",
            "DATA\r\n",
            "Subject: no id\r\n\r\nbody\r\n.\r\n",
            "QUIT\r\n",
        ]
        .concat(),
        [
            GREETINGS,
            "250 testserver.com\r\n",
            "250 OK\r\n",
            "250 OK\r\n",
            "354 End data with <CR><LF>.<CR><LF>\r\n",
            "250 OK\r\n",
            "221 Service closing transmission channel\r\n",
        ]
        .concat()
    )
    .unwrap();

    let keys = store.keys();
    let content_key = keys.iter().find(|k| k.ends_with(".eml.gz")).unwrap();

    let mut content = String::new();
    std::io::Read::read_to_string(
        &mut flate2::read::GzDecoder::new(store.get(content_key).unwrap().as_slice()),
        &mut content,
    )
    .unwrap();
    pretty_assertions::assert_eq!(content, "Subject: no id\r\n\r\nbody\r\n");

    let metadata_key = keys.iter().find(|k| k.ends_with(".json")).unwrap();
    let metadata =
        serde_json::from_slice::<serde_json::Value>(&store.get(metadata_key).unwrap()).unwrap();
    pretty_assertions::assert_eq!(metadata["mail_from"], serde_json::Value::Null);
    pretty_assertions::assert_eq!(metadata["message_id"], serde_json::Value::Null);
}

#[tokio::test]
async fn two_transactions() {
    let store = test_receiver!(
        with_config => local_test_uncompressed(33_554_432),
        [
            "EHLO client.example.org\r\n",
            "MAIL FROM:<anne@example.org>\r\n",
            "RCPT TO:<bob@example.com>\r\n",
            "DATA\r\n",
            "Message-ID: <first@example.com>\r\n\r\nfirst\r\n.\r\n",
            "MAIL FROM:<anne@example.org>\r\n",
            "RCPT TO:<carol@example.com>\r\n",
            "DATA\r\n",
            "Message-ID: <second@example.com>\r\n\r\nsecond\r\n.\r\n",
            "QUIT\r\n",
        ]
        .concat(),
        [
            GREETINGS,
            ehlo(33_554_432).as_str(),
            "250 OK\r\n",
            "250 OK\r\n",
            "354 End data with <CR><LF>.<CR><LF>\r\n",
            "250 OK\r\n",
            "250 OK\r\n",
            "250 OK\r\n",
            "354 End data with <CR><LF>.<CR><LF>\r\n",
            "250 OK\r\n",
            "221 Service closing transmission channel\r\n",
        ]
        .concat()
    )
    .unwrap();

    let recipients = store
        .keys()
        .iter()
        .filter(|k| k.ends_with(".json"))
        .map(|k| {
            serde_json::from_slice::<serde_json::Value>(&store.get(k).unwrap()).unwrap()
                ["rcpt_tos"]
                .clone()
        })
        .collect::<Vec<_>>();

    pretty_assertions::assert_eq!(recipients.len(), 2);
    assert!(recipients.contains(&serde_json::json!(["bob@example.com"])));
    assert!(recipients.contains(&serde_json::json!(["carol@example.com"])));
}

#[tokio::test]
async fn rset() {
    let store = test_receiver!(
        [
            "EHLO client.example.org\r\n",
            "MAIL FROM:<anne@example.org>\r\n",
            "RCPT TO:<bob@example.com>\r\n",
            "RSET\r\n",
            "DATA\r\n",
            "NOOP\r\n",
            "QUIT\r\n",
        ]
        .concat(),
        [
            GREETINGS,
            ehlo(33_554_432).as_str(),
            "250 OK\r\n",
            "250 OK\r\n",
            "250 OK\r\n",
            "503 Bad sequence of commands\r\n",
            "250 OK\r\n",
            "221 Service closing transmission channel\r\n",
        ]
        .concat()
    )
    .unwrap();

    assert!(store.is_empty());
}

#[tokio::test]
async fn out_of_sequence() {
    test_receiver!(
        [
            "MAIL FROM:<anne@example.org>\r\n",
            "HELO client.example.org\r\n",
            "RCPT TO:<bob@example.com>\r\n",
            "DATA\r\n",
            "HELP\r\n",
            "VRFY bob\r\n",
            "QUIT\r\n",
        ]
        .concat(),
        [
            GREETINGS,
            "503 Bad sequence of commands\r\n",
            "250 testserver.com\r\n",
            "503 Bad sequence of commands\r\n",
            "503 Bad sequence of commands\r\n",
            "214 Supported commands: EHLO HELO MAIL RCPT DATA RSET NOOP QUIT HELP\r\n",
            "502 Command not implemented\r\n",
            "221 Service closing transmission channel\r\n",
        ]
        .concat()
    )
    .unwrap();
}

#[tokio::test]
async fn eof_in_message() {
    let store = test_receiver!(
        [
            "EHLO client.example.org\r\n",
            "MAIL FROM:<anne@example.org>\r\n",
            "RCPT TO:<bob@example.com>\r\n",
            "DATA\r\n",
            "Subject: cut\r\n",
        ]
        .concat(),
        [
            GREETINGS,
            ehlo(33_554_432).as_str(),
            "250 OK\r\n",
            "250 OK\r\n",
            "354 End data with <CR><LF>.<CR><LF>\r\n",
            "451 4.3.0 Temporary failure storing message.\r\n",
        ]
        .concat()
    )
    .unwrap();

    assert!(store.is_empty());
}

#[tokio::test]
async fn session_without_quit() {
    let config = local_test();
    test_receiver!(
        with_config => config,
        "EHLO client.example.org\r\n",
        [GREETINGS, ehlo(33_554_432).as_str()].concat()
    )
    .unwrap();
}
