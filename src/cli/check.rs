//! Check command handler.

use color_eyre::Result;

use crate::config::Config;
use crate::graph::backends::postgres::PostgresClient;

use super::App;

impl App {
    /// Connect with the configured settings and make sure the graph exists.
    pub async fn run_check(&self) -> Result<()> {
        let config = Config::load()?;
        let db = &config.database;

        tracing::info!("Connecting to PostgreSQL (graph: {})", db.graph);
        let client = PostgresClient::connect(&db.uri, &db.graph, db.pool_size)
            .await
            .map_err(|e| color_eyre::eyre::eyre!("Failed to connect: {}", e))?;

        client
            .ensure_graph_exists()
            .await
            .map_err(|e| color_eyre::eyre::eyre!("Failed to create graph: {}", e))?;

        tracing::info!("Graph '{}' is ready", client.graph_name());
        Ok(())
    }
}
