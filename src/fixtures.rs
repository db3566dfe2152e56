#[cfg(test)]
pub mod test {
    use crate::schema::Schema;

    /// The shared test model: a server config with a nested database
    /// section. Defaults mirror what a caller's `Default` impl would carry.
    #[derive(Debug, Clone, PartialEq)]
    pub struct ServerConfig {
        pub host: String,
        pub port: u16,
        pub debug: bool,
        pub tags: Vec<String>,
        pub database: DbConfig,
        /// Not registered in any schema; bumped by the post-load hook.
        pub loads_observed: u32,
    }

    #[derive(Debug, Clone, PartialEq, Default)]
    pub struct DbConfig {
        pub url: Option<String>,
        pub pool_size: u32,
    }

    impl Default for ServerConfig {
        fn default() -> Self {
            ServerConfig {
                host: "localhost".into(),
                port: 8080,
                debug: false,
                tags: Vec::new(),
                database: DbConfig {
                    url: None,
                    pool_size: 5,
                },
                loads_observed: 0,
            }
        }
    }

    pub fn db_schema() -> Schema<DbConfig> {
        Schema::builder()
            .field("url", |d: &DbConfig| d.url.clone(), |d, v| d.url = v)
            .comment("Connection string URL")
            .field("pool_size", |d: &DbConfig| d.pool_size, |d, v| d.pool_size = v)
            .comment("Connection pool size")
            .build()
            .unwrap()
    }

    pub fn server_schema() -> Schema<ServerConfig> {
        Schema::builder()
            .header("Server configuration")
            .field(
                "host",
                |c: &ServerConfig| c.host.clone(),
                |c, v| c.host = v,
            )
            .comment("The application host")
            .field("port", |c: &ServerConfig| c.port, |c, v| c.port = v)
            .comment("The port number")
            .field("debug", |c: &ServerConfig| c.debug, |c, v| c.debug = v)
            .comment("Enable debug mode")
            .field(
                "tags",
                |c: &ServerConfig| c.tags.clone(),
                |c, v| c.tags = v,
            )
            .section(
                "database",
                db_schema(),
                |c| &c.database,
                |c| &mut c.database,
            )
            .comment("Database settings")
            .build()
            .unwrap()
    }

    /// Same shape plus a post-load hook, for lifecycle tests.
    pub fn hooked_schema() -> Schema<ServerConfig> {
        Schema::builder()
            .header("Server configuration")
            .field(
                "host",
                |c: &ServerConfig| c.host.clone(),
                |c, v| c.host = v,
            )
            .field("port", |c: &ServerConfig| c.port, |c, v| c.port = v)
            .on_load(|c| c.loads_observed += 1)
            .build()
            .unwrap()
    }

    #[test]
    fn defaults_are_stable() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 8080);
        assert!(!config.debug);
        assert_eq!(config.database.pool_size, 5);
    }
}
