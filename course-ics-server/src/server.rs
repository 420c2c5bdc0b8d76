use std::{env, fs, net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use course_ics_core::{
    CompileOptions, DEFAULT_TIMEZONE, IcsOptions, reference::ReferenceTable,
};
use tokio::net::TcpListener;

use crate::handlers::{AppState, create_app};

/// Settings read from the environment at startup.
pub struct ServerConfig {
    pub port: u16,
    pub reference_table_path: Option<String>,
    pub timezone: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        // 3000 unless PORT holds a valid port
        let port = env::var("PORT")
            .ok()
            .and_then(|value| value.trim().parse::<u16>().ok())
            .unwrap_or(3000);

        let reference_table_path = env::var("REFERENCE_TABLE_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let timezone = env::var("CALENDAR_TIMEZONE")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());

        Self {
            port,
            reference_table_path,
            timezone,
        }
    }

    pub fn build_state(&self) -> Result<AppState> {
        let table = match &self.reference_table_path {
            Some(path) => {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read reference table {path}"))?;
                let table = ReferenceTable::from_json(&content)?;
                tracing::info!("Loaded {} reference entries from {}", table.len(), path);
                table
            }
            None => {
                tracing::warn!("REFERENCE_TABLE_PATH not set, serving with an empty reference table");
                ReferenceTable::new()
            }
        };

        let compile = CompileOptions::with_timezone_name(&self.timezone)?;
        let ics = IcsOptions {
            timezone: Some(self.timezone.clone()),
            ..IcsOptions::default()
        };

        Ok(AppState {
            table: Arc::new(table),
            compile: Arc::new(compile),
            ics: Arc::new(ics),
        })
    }
}

pub async fn start_server(config: ServerConfig) -> Result<()> {
    let app = create_app(config.build_state()?);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    tracing::info!("Course ICS Server starting on {} ({})", addr, config.timezone);

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
