/*
 * Copyright © 2025, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

use std::{net::SocketAddr, sync::Arc};
use anyhow::Result;
use clap::Parser;
use lazy_static::lazy_static;
use tokio_util::sync::CancellationToken;
use tracing::{info,warn,error};
use tracing_subscriber::EnvFilter;

use odin_flightstats::{
    load_config, FlightStore, config::FlightStatsConfig, region::REGION_FORMAT,
    ingest::IngestionLoop, server::{QueryServer,spawn_query_server}, telemetry::open_source
};

#[derive(Parser,Debug)]
#[command(version, about = "real-time flight telemetry aggregator with a RESP query interface")]
struct CliOpts {
    /// region filter - preset name (e.g. la, usa, eu) or "swlat, swlon, nelat, nelon"
    #[arg(short = 'b', long, value_name = REGION_FORMAT)]
    region: Option<String>,

    /// RON config file (defaults are used if not set)
    #[arg(short, long)]
    config: Option<String>,

    /// query server address (overrides config)
    #[arg(short, long)]
    addr: Option<SocketAddr>,

    /// telemetry source: tcp://host:port, file://path or '-' for stdin (overrides config)
    #[arg(short, long)]
    source: Option<String>,
}

lazy_static! { static ref ARGS: CliOpts = CliOpts::parse(); }

#[tokio::main]
async fn main()->Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter( EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))) // use RUST_LOG to set level
        .init();

    let mut config = match &ARGS.config {
        Some(path) => load_config( path)?,
        None => FlightStatsConfig::default()
    };
    if let Some(addr) = ARGS.addr { config.sock_addr = addr; }
    if let Some(source) = &ARGS.source { config.source = source.clone(); }

    // config errors end the process before we start to ingest
    let region = config.resolve_region( ARGS.region.as_deref())?;
    match &region {
        Some(region) => {
            if region.is_inverted() { warn!("inverted region will not match any track: {}", region) }
            info!("filtering tracks within {}", region);
        }
        None => info!("no region filter set")
    }

    let store = Arc::new( FlightStore::new());
    let server = QueryServer::bind( config.sock_addr, store.clone()).await?;

    info!("reading telemetry from {}", config.source);
    let source = open_source( &config.source).await?;
    let mut ingestion = IngestionLoop::new( source, store.clone(), region, config.snapshot_interval);

    // the server stops accepting once ingestion has terminated
    let server_task = spawn_query_server( server, ingestion.done_token());

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn( async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted");
            interrupt.cancel();
        }
    });

    let outcome = ingestion.run( cancel).await?;

    match server_task.await {
        Ok(Err(e)) => error!("query server failed: {}", e),
        Err(e) => error!("query server task failed: {}", e),
        Ok(Ok(())) => {}
    }

    let stats = store.stats();
    info!("{}: {} samples, {} flights", outcome, stats.sample_count, stats.flight_count);
    Ok(())
}
