#[cfg(test)]
pub mod test {
    use serde::{Deserialize, Serialize};

    use crate::error::FieldViolation;
    use crate::field::{ClassDescriptor, Configurable, Field, Primitive};

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
    pub struct TestConfig {
        pub app_port: u16,
        pub app_host: Option<String>,
        pub debug: bool,
        pub tasks: Vec<String>,
        pub db: DbConfig,
        pub repositories: Vec<Repository>,
    }

    impl Default for TestConfig {
        fn default() -> Self {
            Self {
                app_port: 8080,
                app_host: None,
                debug: false,
                tasks: vec!["default".into()],
                db: DbConfig::default(),
                repositories: Vec::new(),
            }
        }
    }

    impl Configurable for TestConfig {
        fn describe() -> ClassDescriptor {
            ClassDescriptor::new()
                .field(Field::number("app_port").generic_key("app.port"))
                .field(Field::string("app_host").generic_key("app.host").optional())
                .field(Field::boolean("debug"))
                .field(Field::array("tasks", Primitive::String).separator(":"))
                .field(Field::nested::<DbConfig>("db").nested_key("db.mysql"))
                .field(Field::array_of::<Repository>("repositories"))
        }
    }

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
    pub struct DbConfig {
        pub host: Option<String>,
        pub auto_reconnect: bool,
        pub pool_size: u32,
    }

    impl Default for DbConfig {
        fn default() -> Self {
            Self {
                host: None,
                auto_reconnect: false,
                pool_size: 5,
            }
        }
    }

    impl Configurable for DbConfig {
        fn describe() -> ClassDescriptor {
            ClassDescriptor::new()
                .field(Field::string("host").optional())
                .field(Field::boolean("auto_reconnect").generic_key("autoReconnect"))
                .field(Field::integer("pool_size").generic_key("poolSize").optional())
        }
    }

    #[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
    #[serde(rename_all = "camelCase")]
    pub struct Repository {
        pub url: String,
        pub token: String,
        pub some_flag: bool,
    }

    impl Configurable for Repository {
        fn describe() -> ClassDescriptor {
            ClassDescriptor::new()
                .field(Field::string("url"))
                .field(Field::string("token"))
                .field(Field::boolean("someFlag"))
        }
    }

    // -- Namespaced fixtures ----------------------------------------------------

    #[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
    pub struct NsApp {
        pub db_mysql: NsDb,
        pub nested: NsAnother,
    }

    impl Configurable for NsApp {
        fn describe() -> ClassDescriptor {
            ClassDescriptor::new()
                .namespace("app")
                .field(Field::nested::<NsDb>("db_mysql").nested_key(""))
                .field(Field::nested::<NsAnother>("nested"))
        }
    }

    #[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
    pub struct NsDb {
        pub host: String,
    }

    impl Configurable for NsDb {
        fn describe() -> ClassDescriptor {
            ClassDescriptor::new()
                .namespace("db.mysql")
                .field(Field::string("host"))
        }
    }

    #[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
    pub struct NsAnother {
        pub port: Option<u16>,
    }

    impl Configurable for NsAnother {
        fn describe() -> ClassDescriptor {
            ClassDescriptor::new()
                .namespace("another")
                .field(Field::number("port").optional())
        }
    }

    /// Extends a namespaced type without declaring a namespace of its own.
    #[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
    pub struct NsDbReplica {
        #[serde(flatten)]
        pub base: NsDb,
        pub lag: u32,
    }

    impl Configurable for NsDbReplica {
        fn describe() -> ClassDescriptor {
            ClassDescriptor::new()
                .extends::<NsDb>()
                .field(Field::integer("lag"))
        }
    }

    // -- Optional nested section ------------------------------------------------

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
    pub struct Server {
        pub port: u16,
        pub tls: Option<Tls>,
    }

    impl Default for Server {
        fn default() -> Self {
            Self {
                port: 8080,
                tls: None,
            }
        }
    }

    impl Configurable for Server {
        fn describe() -> ClassDescriptor {
            ClassDescriptor::new()
                .field(Field::number("port"))
                .field(Field::nested::<Tls>("tls").optional())
        }
    }

    #[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
    pub struct Tls {
        pub cert: String,
        pub verify: bool,
        /// Required once the section is set.
        pub ca: Option<String>,
    }

    impl Configurable for Tls {
        fn describe() -> ClassDescriptor {
            ClassDescriptor::new()
                .field(Field::string("cert"))
                .field(Field::boolean("verify"))
                .field(Field::string("ca"))
        }
    }

    // -- Inheritance --------------------------------------------------------------

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
    pub struct BaseConfig {
        pub name: String,
        pub verbose: bool,
    }

    impl Default for BaseConfig {
        fn default() -> Self {
            Self {
                name: "base".into(),
                verbose: false,
            }
        }
    }

    impl Configurable for BaseConfig {
        fn describe() -> ClassDescriptor {
            ClassDescriptor::new()
                .field(Field::string("name"))
                .field(Field::boolean("verbose"))
        }
    }

    #[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
    pub struct ChildConfig {
        #[serde(flatten)]
        pub base: BaseConfig,
        pub port: u16,
    }

    impl Configurable for ChildConfig {
        fn describe() -> ClassDescriptor {
            ClassDescriptor::new()
                .extends::<BaseConfig>()
                .field(Field::number("port"))
                .field(Field::boolean("verbose").generic_key("child.verbose"))
        }
    }

    /// A required field with no default.
    #[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
    pub struct Secret {
        pub token: Option<String>,
        pub label: String,
    }

    impl Configurable for Secret {
        fn describe() -> ClassDescriptor {
            ClassDescriptor::new()
                .field(Field::string("token"))
                .field(Field::string("label"))
        }
    }

    // -- Edge cases -----------------------------------------------------------------

    #[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
    pub struct Empty {}

    impl Configurable for Empty {
        fn describe() -> ClassDescriptor {
            ClassDescriptor::new()
        }
    }

    #[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
    pub struct Untyped {
        pub mystery: String,
    }

    impl Configurable for Untyped {
        fn describe() -> ClassDescriptor {
            ClassDescriptor::new().field(Field::untyped("mystery"))
        }
    }

    #[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
    pub struct Cyclic {
        pub inner: Option<Box<Cyclic>>,
    }

    impl Configurable for Cyclic {
        fn describe() -> ClassDescriptor {
            ClassDescriptor::new().field(Field::nested::<Cyclic>("inner"))
        }
    }

    /// Port with a custom range rule and a raw (uncoerced) field.
    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
    pub struct RuleConfig {
        pub port: i64,
        pub tasks: serde_json::Value,
        pub mask: i64,
        pub ratios: Vec<f64>,
    }

    impl Default for RuleConfig {
        fn default() -> Self {
            Self {
                port: 1,
                tasks: serde_json::Value::Null,
                mask: 0,
                ratios: Vec::new(),
            }
        }
    }

    impl Configurable for RuleConfig {
        fn describe() -> ClassDescriptor {
            ClassDescriptor::new()
                .field(Field::integer("port").env_key("APP_PORT"))
                .field(Field::raw("tasks").optional())
                .field(Field::integer("mask").radix(16).optional())
                .field(Field::array("ratios", Primitive::Number).separator("|"))
        }

        fn validate(&self) -> Vec<FieldViolation> {
            if self.port < 1 {
                vec![FieldViolation::new(
                    "port",
                    Some(serde_json::json!(self.port)),
                    "min",
                    "port must not be less than 1",
                )]
            } else {
                Vec::new()
            }
        }
    }
}
