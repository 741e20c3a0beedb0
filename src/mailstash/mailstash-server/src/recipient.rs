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

use mailstash_config::{field::RcptPattern, Config};

/// Accept or reject the forward path of a `RCPT TO` command.
#[derive(Debug, Clone)]
pub struct RecipientValidator {
    pattern: RcptPattern,
}

impl RecipientValidator {
    ///
    #[must_use]
    pub const fn new(pattern: RcptPattern) -> Self {
        Self { pattern }
    }

    ///
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.policy.rcpt_regex.clone())
    }

    /// The whole `address` matches the pattern.
    ///
    /// The address is not normalized: no case folding, no unicode normalization.
    #[must_use]
    pub fn accepts(&self, address: &str) -> bool {
        self.pattern.regex().is_match(address)
    }
}

#[cfg(test)]
mod tests {
    use super::RecipientValidator;
    use mailstash_config::field::RcptPattern;

    #[rstest::rstest]
    #[case("john.doe@example.com", true)]
    #[case("John.Doe@Example.COM", true)]
    #[case("x@[192.168.0.1]", true)]
    #[case("\"john..doe\"@example.com", true)]
    #[case("user+tag@sub.example.org", true)]
    #[case("not-an-address", false)]
    #[case("", false)]
    #[case("john@", false)]
    #[case("@example.com", false)]
    #[case("john doe@example.com", false)]
    fn default_pattern(#[case] address: &str, #[case] accepted: bool) {
        let validator = RecipientValidator::new(RcptPattern::default());
        pretty_assertions::assert_eq!(validator.accepts(address), accepted, "{address}");
    }

    #[test]
    fn full_match_only() {
        let validator =
            RecipientValidator::new(r".*@example\.com".parse::<RcptPattern>().unwrap());

        assert!(validator.accepts("anne@example.com"));
        assert!(!validator.accepts("anne@example.com.evil.org"));
        assert!(!validator.accepts("anne@example.org"));
    }

    #[test]
    fn case_sensitive_custom_pattern() {
        let validator =
            RecipientValidator::new("[a-z]+@example\\.com".parse::<RcptPattern>().unwrap());

        assert!(validator.accepts("anne@example.com"));
        assert!(!validator.accepts("Anne@example.com"));
    }
}
