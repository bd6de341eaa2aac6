// Copyright (c) 2025 ADBC Drivers Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Validation of a parsed [`ConnectionConfig`].
//!
//! The rules depend on the identity mode. With a user store key the key
//! replaces host, username and password, so only the key itself is required.

use super::{ConfigField, ConnectionConfig, IdentityMode};
use crate::error::{Error, Result};
use std::fmt;

/// A check applied to a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    /// The field must not be empty.
    Required,
    /// The field, if set, must be a TCP port number.
    Port,
}

impl Rule {
    /// The rule name used in validation errors.
    pub fn name(self) -> &'static str {
        match self {
            Rule::Required => "required",
            Rule::Port => "port",
        }
    }

    fn check(self, value: &str) -> bool {
        match self {
            Rule::Required => !value.is_empty(),
            Rule::Port => value.is_empty() || value.parse::<u16>().is_ok_and(|p| p != 0),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rules for username/password identities, in field declaration order.
const CREDENTIAL_RULES: &[(ConfigField, Rule)] = &[
    (ConfigField::Host, Rule::Required),
    (ConfigField::Port, Rule::Port),
    (ConfigField::Username, Rule::Required),
];

/// Rules for user store key identities, in field declaration order.
const STORED_KEY_RULES: &[(ConfigField, Rule)] = &[
    (ConfigField::Port, Rule::Port),
    (ConfigField::UserStoreKey, Rule::Required),
];

/// A field that failed a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldError {
    /// The offending field.
    pub field: ConfigField,
    /// The rule it violates.
    pub rule: Rule,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.rule)
    }
}

/// Every rule violation found in one validation pass, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    /// Iterates over the violations in field order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Number of violations.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether there are no violations.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The violations as a slice.
    pub fn as_slice(&self) -> &[FieldError] {
        &self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Returns the rule set for an identity mode.
pub fn rules(mode: IdentityMode) -> &'static [(ConfigField, Rule)] {
    match mode {
        IdentityMode::Credentials => CREDENTIAL_RULES,
        IdentityMode::StoredKey => STORED_KEY_RULES,
    }
}

/// Checks `config` against the rules of its identity mode.
///
/// All violations are collected; the error lists them in field declaration
/// order.
pub fn validate(config: &ConnectionConfig) -> Result<()> {
    let errors: Vec<FieldError> = rules(config.identity())
        .iter()
        .filter(|(field, rule)| !rule.check(config.field(*field)))
        .map(|&(field, rule)| FieldError { field, rule })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::ValidationFailed(ValidationErrors(errors)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::dsn;
    use pretty_assertions::assert_eq;

    fn failures(dsn: &str) -> Vec<(ConfigField, Rule)> {
        let config = dsn::parse(dsn).unwrap();
        match validate(&config) {
            Ok(()) => Vec::new(),
            Err(Error::ValidationFailed(errors)) => {
                errors.iter().map(|e| (e.field, e.rule)).collect()
            }
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_valid_dsns() {
        assert!(failures("ase://user:pw@host:1234").is_empty());
        assert!(failures("username=user host=host").is_empty());
        assert!(failures("ase://MYKEY@hostname").is_empty());
        assert!(failures("userstorekey=MYKEY").is_empty());
    }

    #[test]
    fn test_missing_host() {
        assert_eq!(
            failures("username=user password=pass port=4901"),
            vec![(ConfigField::Host, Rule::Required)]
        );
    }

    #[test]
    fn test_missing_host_in_uri() {
        assert_eq!(
            failures("ase://user:pass@:4901?"),
            vec![(ConfigField::Host, Rule::Required)]
        );
    }

    #[test]
    fn test_missing_host_and_user_in_uri() {
        assert_eq!(
            failures("ase://:pass@:4901?"),
            vec![
                (ConfigField::Host, Rule::Required),
                (ConfigField::Username, Rule::Required),
            ]
        );
    }

    #[test]
    fn test_empty_dsn_fails_validation() {
        assert_eq!(
            failures(""),
            vec![
                (ConfigField::Host, Rule::Required),
                (ConfigField::Username, Rule::Required),
            ]
        );
    }

    #[test]
    fn test_missing_host_and_user() {
        assert_eq!(
            failures("password=pass port=4901"),
            vec![
                (ConfigField::Host, Rule::Required),
                (ConfigField::Username, Rule::Required),
            ]
        );

        let config = ConnectionConfig {
            password: "pass".into(),
            port: "4901".into(),
            ..Default::default()
        };
        let err = validate(&config).unwrap_err();
        let Error::ValidationFailed(errors) = &err else {
            panic!("expected ValidationFailed, got {err:?}");
        };
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.to_string(), "Host: required, Username: required");
    }

    #[test]
    fn test_invalid_port() {
        assert_eq!(
            failures("username=u host=h port=forty"),
            vec![(ConfigField::Port, Rule::Port)]
        );
        assert_eq!(
            failures("userstorekey=K port=0"),
            vec![(ConfigField::Port, Rule::Port)]
        );
    }

    #[test]
    fn test_stored_key_skips_credentials() {
        let config = ConnectionConfig {
            user_store_key: "KEY".into(),
            ..Default::default()
        };
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_error_display_lists_every_field() {
        let err = validate(&ConnectionConfig::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid connection configuration: Host: required, Username: required"
        );
    }
}
