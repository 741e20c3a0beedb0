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

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

/// Listening addresses, written either as one `"ip:port"` string or as a list.
/// The list must not be empty nor contain the same address twice.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<std::net::SocketAddr>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = match <OneOrMany as serde::Deserialize>::deserialize(deserializer)? {
        OneOrMany::One(addr) => vec![addr],
        OneOrMany::Many(addrs) => addrs,
    };

    if raw.is_empty() {
        return Err(serde::de::Error::custom("no listening address"));
    }

    let mut out = Vec::<std::net::SocketAddr>::with_capacity(raw.len());
    for s in raw {
        let addr = s
            .parse::<std::net::SocketAddr>()
            .map_err(|e| serde::de::Error::custom(format!("invalid address `{s}`: {e}")))?;
        if out.contains(&addr) {
            return Err(serde::de::Error::custom(format!(
                "address `{addr}` is listed twice"
            )));
        }
        out.push(addr);
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

    #[derive(Debug, serde::Deserialize)]
    struct S {
        #[serde(deserialize_with = "crate::parser::socket_addr::deserialize")]
        v: Vec<SocketAddr>,
    }

    #[rstest::rstest]
    #[case(r#""127.0.0.1:8025""#, vec![SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8025)])]
    #[case(r#"["[::]:25"]"#, vec![SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 25)])]
    #[case(
        r#"["0.0.0.0:25", "[::1]:25"]"#,
        vec![
            SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 25),
            SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 25),
        ]
    )]
    fn accepted(#[case] input: &str, #[case] expected: Vec<SocketAddr>) {
        let parsed = serde_json::from_str::<S>(&format!(r#"{{"v": {input}}}"#)).unwrap();
        pretty_assertions::assert_eq!(parsed.v, expected);
    }

    #[rstest::rstest]
    #[case(r#""foobar""#)]
    #[case(r#"["127.0.0.1"]"#)]
    #[case("[]")]
    #[case(r#"["127.0.0.1:25", "127.0.0.1:25"]"#)]
    #[case("25")]
    fn rejected(#[case] input: &str) {
        assert!(serde_json::from_str::<S>(&format!(r#"{{"v": {input}}}"#)).is_err());
    }
}
