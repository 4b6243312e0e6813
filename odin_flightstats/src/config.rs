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

use std::net::{SocketAddr,IpAddr,Ipv4Addr};
use serde::{Serialize,Deserialize};

use crate::{errors::Result, region::{Region,RegionPresets,parse_region}};

pub const DEFAULT_PORT: u16 = 6060;
pub const DEFAULT_SNAPSHOT_INTERVAL: u64 = 10;

/// process configuration, usually read from a RON file such as
/// ```ron
/// FlightStatsConfig(
///     sock_addr: "127.0.0.1:6060",
///     source: "tcp://localhost:30400",
///     region: Some("la"),
///     snapshot_interval: 100,
/// )
/// ```
#[derive(Deserialize,Serialize,Debug,Clone,PartialEq)]
#[serde(default)]
pub struct FlightStatsConfig {
    pub sock_addr: SocketAddr,      // where the query server listens
    pub source: String,             // telemetry source url (tcp://host:port, file://path or '-' for stdin)
    pub region: Option<String>,     // preset name or "swlat, swlon, nelat, nelon" - None means no filtering
    pub snapshot_interval: u64,     // number of samples between logged average snapshots (0: never)
    pub presets: RegionPresets,     // named regions
}

impl Default for FlightStatsConfig {
    fn default()->Self {
        FlightStatsConfig {
            sock_addr: SocketAddr::new( IpAddr::V4( Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            source: "-".to_string(),
            region: None,
            snapshot_interval: DEFAULT_SNAPSHOT_INTERVAL,
            presets: RegionPresets::default(),
        }
    }
}

impl FlightStatsConfig {
    /// resolve the configured region spec. An explicit `spec` takes precedence over `self.region`
    pub fn resolve_region (&self, spec: Option<&str>)->Result<Option<Region>> {
        match spec.or( self.region.as_deref()) {
            Some(spec) => parse_region( spec, &self.presets),
            None => Ok(None)
        }
    }
}
