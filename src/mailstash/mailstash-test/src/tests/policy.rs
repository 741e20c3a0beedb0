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
use crate::config::local_test;
use crate::receiver::StaticZones;
use crate::test_receiver;
use mailstash_server::ReputationGate;

fn zones(zones: &[&str]) -> Vec<String> {
    zones.iter().map(ToString::to_string).collect()
}

#[tokio::test]
async fn blocked_peer() {
    let store = test_receiver!(
        with_gate => ReputationGate::new(
            StaticZones::new(&["1.0.0.127.bl.example.org"]),
            &zones(&["zen.example.org", "bl.example.org"]),
        ),
        with_config => local_test(),
        [
            "EHLO client.example.org\r\n",
            "MAIL FROM:<anne@example.org>\r\n",
            "RCPT TO:<bob@example.com>\r\n",
            "DATA\r\n",
            "QUIT\r\n",
        ]
        .concat(),
        [
            GREETINGS,
            ehlo(33_554_432).as_str(),
            "554 5.7.1 Service unavailable; Client host blocked by policy\r\n",
            "503 Bad sequence of commands\r\n",
            "503 Bad sequence of commands\r\n",
            "221 Service closing transmission channel\r\n",
        ]
        .concat()
    )
    .unwrap();

    assert!(store.is_empty());
}

#[tokio::test]
async fn peer_not_listed() {
    test_receiver!(
        with_gate => ReputationGate::new(
            StaticZones::new(&["2.0.0.127.bl.example.org"]),
            &zones(&["bl.example.org"]),
        ),
        with_config => local_test(),
        [
            "EHLO client.example.org\r\n",
            "MAIL FROM:<anne@example.org>\r\n",
            "QUIT\r\n",
        ]
        .concat(),
        [
            GREETINGS,
            ehlo(33_554_432).as_str(),
            "250 OK\r\n",
            "221 Service closing transmission channel\r\n",
        ]
        .concat()
    )
    .unwrap();
}

#[tokio::test]
async fn unknown_recipient() {
    let mut config = local_test();
    config.policy.rcpt_regex = r".*@example\.com".parse().unwrap();

    let store = test_receiver!(
        with_config => config,
        [
            "EHLO client.example.org\r\n",
            "MAIL FROM:<anne@example.org>\r\n",
            "RCPT TO:<bob@example.org>\r\n",
            "DATA\r\n",
            "RCPT TO:<bob@example.com>\r\n",
            "DATA\r\n",
            "Subject: hi\r\n\r\n.\r\n",
            "QUIT\r\n",
        ]
        .concat(),
        [
            GREETINGS,
            ehlo(33_554_432).as_str(),
            "250 OK\r\n",
            "550 5.1.1 No such user\r\n",
            "503 Bad sequence of commands\r\n",
            "250 OK\r\n",
            "354 End data with <CR><LF>.<CR><LF>\r\n",
            "250 OK\r\n",
            "221 Service closing transmission channel\r\n",
        ]
        .concat()
    )
    .unwrap();

    let metadata_key = store
        .keys()
        .into_iter()
        .find(|k| k.ends_with(".json"))
        .unwrap();
    let metadata =
        serde_json::from_slice::<serde_json::Value>(&store.get(&metadata_key).unwrap()).unwrap();
    pretty_assertions::assert_eq!(metadata["rcpt_tos"], serde_json::json!(["bob@example.com"]));
}

#[tokio::test]
async fn storage_failure() {
    let store = test_receiver!(
        with_store => mailstash_server::MemoryStore::default().failing_on(".eml.gz"),
        with_gate => ReputationGate::disabled(),
        with_config => local_test(),
        [
            "EHLO client.example.org\r\n",
            "MAIL FROM:<anne@example.org>\r\n",
            "RCPT TO:<bob@example.com>\r\n",
            "DATA\r\n",
            "Subject: hi\r\n\r\nbody\r\n.\r\n",
            "MAIL FROM:<anne@example.org>\r\n",
            "QUIT\r\n",
        ]
        .concat(),
        [
            GREETINGS,
            ehlo(33_554_432).as_str(),
            "250 OK\r\n",
            "250 OK\r\n",
            "354 End data with <CR><LF>.<CR><LF>\r\n",
            "451 4.3.0 Temporary failure storing message.\r\n",
            "250 OK\r\n",
            "221 Service closing transmission channel\r\n",
        ]
        .concat()
    )
    .unwrap();

    assert!(store.is_empty());
}

#[tokio::test]
async fn rejected_recipients_are_not_client_errors() {
    let mut config = local_test();
    config.policy.rcpt_regex = r".*@example\.com".parse().unwrap();
    let rejected = usize::try_from(config.server.smtp.error.hard_count).unwrap() + 2;

    test_receiver!(
        with_config => config,
        [
            "EHLO client.example.org\r\n".to_string(),
            "MAIL FROM:<anne@example.org>\r\n".to_string(),
            "RCPT TO:<bob@example.org>\r\n".repeat(rejected),
            "RCPT TO:<bob@example.com>\r\n".to_string(),
            "QUIT\r\n".to_string(),
        ]
        .concat(),
        [
            GREETINGS.to_string(),
            ehlo(33_554_432),
            "250 OK\r\n".to_string(),
            "550 5.1.1 No such user\r\n".repeat(rejected),
            "250 OK\r\n".to_string(),
            "221 Service closing transmission channel\r\n".to_string(),
        ]
        .concat()
    )
    .unwrap();
}
