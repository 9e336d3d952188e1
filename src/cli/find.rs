//! Find subcommand - query nodes of one label.

use std::collections::BTreeSet;
use std::sync::Arc;

use clap::Parser;
use serde_json::Value as JsonValue;

use crate::config::Config;
use crate::criteria::{Criteria, Order, OrderBy, Pagination};
use crate::graph::backends::postgres::PostgresClient;
use crate::metadata::NodeEntityMetadata;
use crate::persister::{CypherPersister, EntityPersister};

/// Find nodes and print one JSON object per line.
#[derive(Parser)]
pub struct FindCommand {
    /// Node label to query.
    #[arg(long)]
    pub label: String,

    /// Property filter `key=value`; the value is parsed as JSON, else taken as a string.
    #[arg(long = "where", value_parser = parse_filter)]
    pub filters: Vec<(String, JsonValue)>,

    /// Sort key `key[:asc|desc]`.
    #[arg(long = "order", value_parser = parse_order)]
    pub order: Vec<(String, Order)>,

    /// Maximum number of nodes to print.
    #[arg(long)]
    pub limit: Option<u64>,

    /// Number of matching nodes to skip.
    #[arg(long)]
    pub skip: Option<u64>,

    /// Look up a single node by identifier instead.
    #[arg(long, conflicts_with_all = ["filters", "order", "limit", "skip"])]
    pub id: Option<i64>,
}

impl FindCommand {
    /// Run the find command.
    pub async fn run(&self) -> color_eyre::Result<()> {
        let config = Config::load()?;
        let db = &config.database;
        let client = PostgresClient::connect(&db.uri, &db.graph, db.pool_size).await?;

        let persister = CypherPersister::new(Arc::new(client), Arc::new(self.metadata()?));

        let nodes = match self.id {
            Some(id) => persister.load_one_by_id(id).await?.into_iter().collect(),
            None => {
                persister
                    .load_all(
                        &self.criteria(),
                        &self.order_by(),
                        Pagination::from_limit_offset(self.limit, self.skip),
                    )
                    .await?
            }
        };

        tracing::info!(label = %self.label, count = nodes.len(), "Query complete");
        for node in nodes {
            println!("{}", serde_json::to_string(&node)?);
        }
        Ok(())
    }

    /// Ad-hoc metadata mapping every key used on the command line.
    fn metadata(&self) -> Result<NodeEntityMetadata, crate::OgmError> {
        let keys: BTreeSet<&str> = self
            .filters
            .iter()
            .map(|(key, _)| key.as_str())
            .chain(self.order.iter().map(|(key, _)| key.as_str()))
            .collect();

        keys.into_iter()
            .fold(
                NodeEntityMetadata::builder(self.label.clone(), self.label.clone()),
                |builder, key| builder.property(key),
            )
            .build()
    }

    fn criteria(&self) -> Criteria {
        self.filters.iter().cloned().collect()
    }

    fn order_by(&self) -> OrderBy {
        self.order
            .iter()
            .fold(OrderBy::new(), |order_by, (key, order)| {
                order_by.then(key.clone(), *order)
            })
    }
}

fn parse_filter(arg: &str) -> Result<(String, JsonValue), String> {
    let (key, raw) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", arg))?;
    if key.is_empty() {
        return Err(format!("missing key in '{}'", arg));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| JsonValue::String(raw.to_string()));
    Ok((key.to_string(), value))
}

fn parse_order(arg: &str) -> Result<(String, Order), String> {
    let (key, order) = match arg.split_once(':') {
        Some((key, order)) => (key, order.parse::<Order>()?),
        None => (arg, Order::Ascending),
    };
    if key.is_empty() {
        return Err(format!("missing key in '{}'", arg));
    }
    Ok((key.to_string(), order))
}
