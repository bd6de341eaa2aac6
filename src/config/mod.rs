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

//! Connection configuration for the ASE ADBC driver.
//!
//! A [`ConnectionConfig`] is usually produced from a DSN by
//! [`dsn::parse`] and checked by [`validate::validate`] before a connection
//! is opened. Both steps are combined in [`ConnectionConfig::from_dsn`].

pub mod dsn;
pub mod validate;

pub use validate::{FieldError, Rule, ValidationErrors};

use crate::error::Result;
use indexmap::IndexMap;
use std::fmt;

/// The fields of a [`ConnectionConfig`], in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfigField {
    /// Server host name or address.
    Host,
    /// Server port.
    Port,
    /// Login name in credentials mode.
    Username,
    /// Login password in credentials mode.
    Password,
    /// Database to use after login.
    Database,
    /// Key into the local user store, selects stored-key mode.
    UserStoreKey,
}

impl ConfigField {
    /// Simple-form DSN keys and the fields they populate.
    const DSN_KEYS: [(&'static str, ConfigField); 6] = [
        ("username", ConfigField::Username),
        ("password", ConfigField::Password),
        ("host", ConfigField::Host),
        ("port", ConfigField::Port),
        ("database", ConfigField::Database),
        ("userstorekey", ConfigField::UserStoreKey),
    ];

    /// Looks up the field for a recognized simple-form DSN key.
    pub fn from_dsn_key(key: &str) -> Option<Self> {
        Self::DSN_KEYS
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, field)| *field)
    }

    /// The simple-form DSN key of the field.
    pub fn dsn_key(self) -> &'static str {
        Self::DSN_KEYS
            .iter()
            .find(|(_, field)| *field == self)
            .map_or("", |(name, _)| *name)
    }

    /// The field name used in validation errors.
    pub fn name(self) -> &'static str {
        match self {
            Self::Host => "Host",
            Self::Port => "Port",
            Self::Username => "Username",
            Self::Password => "Password",
            Self::Database => "Database",
            Self::UserStoreKey => "UserStoreKey",
        }
    }
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a connection identifies itself to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityMode {
    /// Username and password.
    Credentials,
    /// A key into the local user store.
    StoredKey,
}

/// Connect properties not recognized as configuration fields.
///
/// Keys keep their first-insertion order and every value is kept, including
/// repeated and empty ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectProperties(IndexMap<String, Vec<String>>);

impl ConnectProperties {
    /// Creates an empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value for `key`.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    /// Returns the first value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.first()).map(String::as_str)
    }

    /// Returns every value for `key`, in insertion order.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Iterates over keys and their values, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether no property is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for ConnectProperties
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut properties = Self::new();
        for (key, value) in iter {
            properties.add(key, value);
        }
        properties
    }
}

/// Everything needed to open a connection to an ASE server.
#[derive(Clone, Default, PartialEq, Eq)]
///
/// Empty strings mean "not set". Which fields are required depends on the
/// [`IdentityMode`].
pub struct ConnectionConfig {
    /// Server host name or address.
    pub host: String,
    /// Server port, kept as given so validation can report bad values.
    pub port: String,
    /// Login name.
    pub username: String,
    /// Login password. Never logged.
    pub password: String,
    /// Database to use after login.
    pub database: String,
    /// Key into the local user store. A non-empty key selects
    /// [`IdentityMode::StoredKey`].
    pub user_store_key: String,
    /// Additional connect properties.
    pub properties: ConnectProperties,
}

impl ConnectionConfig {
    /// Parses and validates a DSN in either URI or simple form.
    pub fn from_dsn(dsn: &str) -> Result<Self> {
        let config = dsn::parse(dsn)?;
        validate::validate(&config)?;
        Ok(config)
    }

    /// Returns the identity mode selected by the configured fields.
    pub fn identity(&self) -> IdentityMode {
        if self.user_store_key.is_empty() {
            IdentityMode::Credentials
        } else {
            IdentityMode::StoredKey
        }
    }

    /// Returns the value of `field`.
    pub fn field(&self, field: ConfigField) -> &str {
        match field {
            ConfigField::Host => &self.host,
            ConfigField::Port => &self.port,
            ConfigField::Username => &self.username,
            ConfigField::Password => &self.password,
            ConfigField::Database => &self.database,
            ConfigField::UserStoreKey => &self.user_store_key,
        }
    }

    /// Returns a mutable reference to the value of `field`.
    pub fn field_mut(&mut self, field: ConfigField) -> &mut String {
        match field {
            ConfigField::Host => &mut self.host,
            ConfigField::Port => &mut self.port,
            ConfigField::Username => &mut self.username,
            ConfigField::Password => &mut self.password,
            ConfigField::Database => &mut self.database,
            ConfigField::UserStoreKey => &mut self.user_store_key,
        }
    }

    /// The `CS_SERVERADDR` value: host and port separated by a space.
    pub fn server_address(&self) -> String {
        if self.port.is_empty() {
            self.host.clone()
        } else {
            format!("{} {}", self.host, self.port)
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let password = if self.password.is_empty() { "" } else { "<redacted>" };
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &password)
            .field("database", &self.database)
            .field("user_store_key", &self.user_store_key)
            .field("properties", &self.properties)
            .finish()
    }
}
