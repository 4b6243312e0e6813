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

//! real-time aircraft telemetry aggregator
//!
//! A single [`ingest::IngestionLoop`] consumes batches from a [`telemetry::TelemetrySource`], gates them
//! through an optional [`region::Region`], keeps the latest record per flight in a [`registry::FlightRegistry`]
//! and maintains running averages. The shared [`FlightStore`] is read concurrently by the
//! [`server::QueryServer`], which answers RESP (Redis serialization protocol) requests.
//! Nothing is persisted.

use std::{fmt, path::Path, sync::{RwLock,RwLockReadGuard,RwLockWriteGuard,PoisonError}};
use serde::{Serialize,Deserialize};

pub mod errors;
pub mod region;
pub mod stats;
pub mod registry;
pub mod telemetry;
pub mod ingest;
pub mod resp;
pub mod server;
pub mod config;

use crate::{errors::Result, config::FlightStatsConfig, registry::FlightRegistry};

/// latest known state of a single flight. Always replaced as a whole
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
#[serde(rename_all="camelCase")]
pub struct FlightRecord {
    pub track_id: String,
    pub velocity_x: f64, // m/s
    pub velocity_y: f64, // m/s
    pub altitude: f64,   // m
    pub latitude: f64,   // deg
    pub longitude: f64,  // deg
}

impl fmt::Display for FlightRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "FlightRecord( id: {}, pos: [{:.5}, {:.5}], alt: {:.0}, vx: {:.1}, vy: {:.1} )",
                self.track_id, self.latitude, self.longitude, self.altitude, self.velocity_x, self.velocity_y)
    }
}

/// point-in-time snapshot of the aggregate statistics.
/// Averages are cumulative means of absolute values and only meaningful if `sample_count > 0`
#[derive(Debug,Clone,Copy,Default,PartialEq,Serialize,Deserialize)]
#[serde(rename_all="camelCase")]
pub struct FlightStats {
    pub sample_count: u64,
    pub flight_count: u64,
    pub avg_vel_x_abs: f64,
    pub avg_vel_y_abs: f64,
    pub avg_altitude_abs: f64,
}

/// the state shared between the ingestion loop (single writer) and query handlers (readers)
#[derive(Debug,Default)]
pub struct FlightStore {
    registry: FlightRegistry,
    stats: RwLock<FlightStats>,
}

impl FlightStore {
    pub fn new ()->Self { FlightStore::default() }

    pub fn registry (&self)->&FlightRegistry { &self.registry }

    /// consistent copy of all stats fields as of a single lock acquisition
    pub fn stats (&self)->FlightStats {
        *read_locked( &self.stats)
    }

    /// atomically replace the current stats snapshot
    pub fn publish_stats (&self, stats: FlightStats) {
        *write_locked( &self.stats) = stats;
    }
}

// lock holders only copy or insert, so a poisoned lock still protects consistent data

pub(crate) fn read_locked<T> (lock: &RwLock<T>)->RwLockReadGuard<'_,T> {
    lock.read().unwrap_or_else( PoisonError::into_inner)
}

pub(crate) fn write_locked<T> (lock: &RwLock<T>)->RwLockWriteGuard<'_,T> {
    lock.write().unwrap_or_else( PoisonError::into_inner)
}

/// load a RON config file. Fields that are not set in the file use their defaults
pub fn load_config<P: AsRef<Path>> (path: P)->Result<FlightStatsConfig> {
    let contents = std::fs::read_to_string( path)?;
    Ok( ron::from_str( &contents)? )
}
