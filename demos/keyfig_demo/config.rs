//! Configuration structs for the keyfig demo application.
//!
//! The root [`DemoConfig`] has two nested sub-configs, [`ServerConfig`] and
//! [`DisplayConfig`], and a list of [`Upstream`]s to show arrays of config
//! objects.
//!
//! # Keys
//!
//! | Field                    | File key                 | Env var                         | Flag                       |
//! |--------------------------|--------------------------|---------------------------------|----------------------------|
//! | `name`                   | `name`                   | `NAME`                          | `--name`                   |
//! | `verbose`                | `verbose`                | `VERBOSE`                       | `--verbose`                |
//! | `server.host`            | `demo.server.host`       | `DEMO_SERVER_HOST`              | `--demo.server.host`       |
//! | `server.port`            | `demo.server.port`       | `PORT`                          | `--demo.server.port`       |
//! | `server.max_connections` | `demo.server.maxConnections` | `DEMO_SERVER_MAX_CONNECTIONS` | `--demo.server.maxConnections` |
//! | `display.color`          | `display.color`          | `DISPLAY_COLOR`                 | `--display.color`          |
//! | `display.format`         | `display.format`         | `DISPLAY_FORMAT`                | `--display.format`         |
//! | `upstreams`              | `upstreams`              | `UPSTREAMS`                     | `--upstreams`              |

use keyfig::{ClassDescriptor, Configurable, Field, FieldViolation};
use serde::{Deserialize, Serialize};

/// Root configuration for the demo application.
#[derive(Serialize, Deserialize, Debug)]
pub struct DemoConfig {
    /// Application name shown in the echo banner.
    pub name: String,
    pub verbose: bool,
    pub server: ServerConfig,
    pub display: DisplayConfig,
    /// Backends, e.g. `UPSTREAMS="url=http://a;weight=2,url=http://b"`.
    pub upstreams: Vec<Upstream>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            name: "keyfig-demo".into(),
            verbose: false,
            server: ServerConfig::default(),
            display: DisplayConfig::default(),
            upstreams: Vec::new(),
        }
    }
}

impl Configurable for DemoConfig {
    fn describe() -> ClassDescriptor {
        ClassDescriptor::new()
            .field(Field::string("name"))
            .field(Field::boolean("verbose"))
            .field(Field::nested::<ServerConfig>("server").nested_key("demo.server"))
            .field(Field::nested::<DisplayConfig>("display"))
            .field(Field::array_of::<Upstream>("upstreams"))
    }

    fn validate(&self) -> Vec<FieldViolation> {
        let mut violations = Vec::new();
        if self.server.port < 1024 {
            violations.push(FieldViolation::new(
                "server.port",
                Some(self.server.port.into()),
                "min",
                "port must not be less than 1024",
            ));
        }
        if !matches!(self.display.format.as_str(), "pretty" | "plain") {
            violations.push(FieldViolation::new(
                "display.format",
                Some(self.display.format.clone().into()),
                "isIn",
                "format must be one of: pretty, plain",
            ));
        }
        violations
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
            max_connections: 100,
        }
    }
}

impl Configurable for ServerConfig {
    fn describe() -> ClassDescriptor {
        ClassDescriptor::new()
            .field(Field::string("host"))
            .field(Field::number("port").env_key("PORT"))
            .field(Field::integer("max_connections").generic_key("maxConnections"))
    }
}

/// Display and output formatting configuration.
#[derive(Serialize, Deserialize, Debug)]
pub struct DisplayConfig {
    /// Terminal color for the echo command output.
    ///
    /// Supported values: red, green, yellow, blue, magenta, cyan, white.
    pub color: String,
    /// Output format (pretty or plain).
    pub format: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            color: "yellow".into(),
            format: "pretty".into(),
        }
    }
}

impl Configurable for DisplayConfig {
    fn describe() -> ClassDescriptor {
        ClassDescriptor::new()
            .field(Field::string("color"))
            .field(Field::string("format"))
    }
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct Upstream {
    pub url: String,
    pub weight: u32,
}

impl Configurable for Upstream {
    fn describe() -> ClassDescriptor {
        ClassDescriptor::new()
            .field(Field::string("url"))
            .field(Field::integer("weight").optional())
    }
}
