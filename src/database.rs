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

//! Database implementation for the ASE ADBC driver.

use crate::config::{dsn, ConfigField, ConnectionConfig};
use crate::connection::Connection;
use crate::context::DriverContext;
use crate::error::AseErrorHelper;
use adbc_core::error::Result;
use adbc_core::options::{OptionConnection, OptionDatabase, OptionValue};
use adbc_core::Optionable;
use driverbase::error::ErrorHelper;
use std::sync::Arc;

/// Option key for the server host name.
pub const OPTION_HOST: &str = "ase.host";
/// Option key for the server port.
pub const OPTION_PORT: &str = "ase.port";
/// Option key for the default database.
pub const OPTION_DATABASE: &str = "ase.database";
/// Option key for the user store key.
pub const OPTION_USER_STORE_KEY: &str = "ase.userstorekey";
/// Prefix of option keys that add a connect property, e.g. `ase.property.appname`.
pub const OPTION_PROPERTY_PREFIX: &str = "ase.property.";

const OTHER_FIELDS: [(&str, ConfigField); 4] = [
    (OPTION_HOST, ConfigField::Host),
    (OPTION_PORT, ConfigField::Port),
    (OPTION_DATABASE, ConfigField::Database),
    (OPTION_USER_STORE_KEY, ConfigField::UserStoreKey),
];

fn other_field(name: &str) -> Option<ConfigField> {
    OTHER_FIELDS
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, field)| *field)
}

fn string_value(key: &OptionDatabase, value: OptionValue) -> Result<String> {
    match value {
        OptionValue::String(s) => Ok(s),
        other => Err(AseErrorHelper::set_invalid_option(key, &other).to_adbc()),
    }
}

fn not_set(name: &str) -> adbc_core::error::Error {
    let message = format!("option '{name}' is not set");
    AseErrorHelper::invalid_state()
        .message(message.as_str())
        .to_adbc()
}

/// Holds the configuration connections are opened with.
///
/// Configuration comes from a DSN set through the `uri` option, from
/// individual options, or both: options set after the DSN override the
/// values it contained.
#[derive(Debug)]
pub struct Database {
    context: Arc<DriverContext>,
    uri: Option<String>,
    config: ConnectionConfig,
}

impl Database {
    /// Creates a new Database sharing the driver's context.
    pub fn new(context: Arc<DriverContext>) -> Self {
        Self {
            context,
            uri: None,
            config: ConnectionConfig::default(),
        }
    }

    /// Returns the configured URI.
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// Returns the configuration new connections are opened with.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }
}

impl Optionable for Database {
    type Option = OptionDatabase;

    fn set_option(&mut self, key: Self::Option, value: OptionValue) -> Result<()> {
        match key {
            OptionDatabase::Uri => {
                let uri = string_value(&key, value)?;
                self.config = dsn::parse(&uri)?;
                self.uri = Some(uri);
                Ok(())
            }
            OptionDatabase::Username => {
                self.config.username = string_value(&key, value)?;
                Ok(())
            }
            OptionDatabase::Password => {
                self.config.password = string_value(&key, value)?;
                Ok(())
            }
            OptionDatabase::Other(ref name) => {
                if let Some(field) = other_field(name) {
                    *self.config.field_mut(field) = string_value(&key, value)?;
                    Ok(())
                } else if let Some(property) = name.strip_prefix(OPTION_PROPERTY_PREFIX) {
                    let value = string_value(&key, value)?;
                    self.config.properties.add(property, value);
                    Ok(())
                } else {
                    Err(AseErrorHelper::set_unknown_option(&key).to_adbc())
                }
            }
            _ => Err(AseErrorHelper::set_unknown_option(&key).to_adbc()),
        }
    }

    fn get_option_string(&self, key: Self::Option) -> Result<String> {
        match key {
            OptionDatabase::Uri => self.uri.clone().ok_or_else(|| not_set("uri")),
            OptionDatabase::Username => match self.config.username.as_str() {
                "" => Err(not_set("username")),
                username => Ok(username.to_string()),
            },
            OptionDatabase::Other(ref name) => match other_field(name) {
                Some(field) => match self.config.field(field) {
                    "" => Err(not_set(name)),
                    value => Ok(value.to_string()),
                },
                None => Err(AseErrorHelper::get_unknown_option(&key).to_adbc()),
            },
            // The password is write-only.
            _ => Err(AseErrorHelper::get_unknown_option(&key).to_adbc()),
        }
    }

    fn get_option_bytes(&self, key: Self::Option) -> Result<Vec<u8>> {
        Err(AseErrorHelper::get_unknown_option(&key).to_adbc())
    }

    fn get_option_int(&self, key: Self::Option) -> Result<i64> {
        Err(AseErrorHelper::get_unknown_option(&key).to_adbc())
    }

    fn get_option_double(&self, key: Self::Option) -> Result<f64> {
        Err(AseErrorHelper::get_unknown_option(&key).to_adbc())
    }
}

impl adbc_core::Database for Database {
    type ConnectionType = Connection;

    fn new_connection(&self) -> Result<Self::ConnectionType> {
        Ok(Connection::open(&self.context, &self.config)?)
    }

    fn new_connection_with_opts(
        &self,
        opts: impl IntoIterator<Item = (OptionConnection, OptionValue)>,
    ) -> Result<Self::ConnectionType> {
        let mut connection = self.new_connection()?;
        for (key, value) in opts {
            connection.set_option(key, value)?;
        }
        Ok(connection)
    }
}
