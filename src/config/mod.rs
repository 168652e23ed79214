use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub service_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let host = env::var("SETTLEMENT_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("SETTLEMENT_SERVICE_PORT")
            .unwrap_or_else(|_| "3007".to_string())
            .parse()?;

        let db_url =
            env::var("SETTLEMENT_DATABASE_URL").expect("SETTLEMENT_DATABASE_URL must be set");
        let max_connections = env::var("SETTLEMENT_DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()?;
        let min_connections = env::var("SETTLEMENT_DB_MIN_CONNECTIONS")
            .unwrap_or_else(|_| "1".to_string())
            .parse()?;

        Ok(Self {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                url: db_url,
                max_connections,
                min_connections,
            },
            service_name: "settlement-service".to_string(),
        })
    }
}
