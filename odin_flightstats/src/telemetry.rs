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

//! the consumed side: where track batches come from
//!
//! The upstream provider is abstracted as a [`TelemetrySource`] that yields batches in generation order and
//! distinguishes a clean end of stream from errors. Errors are either transient (the source can continue, see
//! [`OdinFlightStatsError::is_transient`]) or faults that end ingestion.

use std::fmt;
use serde::{Serialize,Deserialize};
use async_trait::async_trait;
use tokio::{fs::File, net::TcpStream, io::{self as tio, AsyncBufRead, AsyncBufReadExt, BufReader}, sync::mpsc};
use uom::si::{f64::{Length,Velocity}, length::meter, velocity::meter_per_second};

use crate::errors::{OdinFlightStatsError,Result,config_error};

#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
pub struct AbsolutePosition {
    pub latitude: f64,  // deg
    pub longitude: f64, // deg
    pub altitude: f64,  // m
}

#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
pub struct CartesianVelocity {
    pub x: f64, // m/s
    pub y: f64, // m/s
}

/// one observation of a single flight
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct TrackUpdate {
    #[serde(default)]
    pub identities: Vec<String>, // candidate ids in provider order, might be empty
    pub position: AbsolutePosition,
    pub velocity: CartesianVelocity,
}

impl TrackUpdate {
    pub fn new (identities: &[&str], latitude: f64, longitude: f64, altitude: Length, velocity_x: Velocity, velocity_y: Velocity)->Self {
        TrackUpdate {
            identities: identities.iter().map(|id| id.to_string()).collect(),
            position: AbsolutePosition{ latitude, longitude, altitude: altitude.get::<meter>() },
            velocity: CartesianVelocity{ x: velocity_x.get::<meter_per_second>(), y: velocity_y.get::<meter_per_second>() },
        }
    }

    pub fn identities (&self)->&[String] { self.identities.as_slice() }

    /// the canonical identity is the first non-empty candidate
    pub fn track_id (&self)->Option<&str> {
        self.identities.iter().map(|id| id.as_str()).find(|id| !id.is_empty())
    }

    pub fn latitude (&self)->f64 { self.position.latitude }
    pub fn longitude (&self)->f64 { self.position.longitude }
    pub fn altitude (&self)->Length { Length::new::<meter>( self.position.altitude) }

    pub fn velocity_x (&self)->Velocity { Velocity::new::<meter_per_second>( self.velocity.x) }
    pub fn velocity_y (&self)->Velocity { Velocity::new::<meter_per_second>( self.velocity.y) }
}

impl fmt::Display for TrackUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "TrackUpdate( ids: {:?}, pos: [{:.5}, {:.5}], alt: {:.0}, vel: [{:.1}, {:.1}] )",
                self.identities, self.position.latitude, self.position.longitude, self.position.altitude,
                self.velocity.x, self.velocity.y)
    }
}

/// a provider-delivered group of track updates
#[derive(Debug,Clone,Default,PartialEq,Serialize,Deserialize)]
pub struct TrackBatch {
    #[serde(default)]
    pub tracks: Vec<TrackUpdate>,
}

impl TrackBatch {
    pub fn new (tracks: Vec<TrackUpdate>)->Self { TrackBatch{ tracks } }
}

/// what a source can deliver besides errors
#[derive(Debug)]
pub enum Received {
    Batch(TrackBatch),
    EndOfStream
}

#[async_trait]
pub trait TelemetrySource: Send {
    /// wait for the next batch. Returns `Received::EndOfStream` once on clean closure
    async fn next_batch (&mut self)->Result<Received>;
}

#[async_trait]
impl<S> TelemetrySource for Box<S> where S: TelemetrySource + ?Sized {
    async fn next_batch (&mut self)->Result<Received> {
        (**self).next_batch().await
    }
}

/* #region JsonLinesSource ***********************************************************************************/

/// newline delimited JSON batches, e.g.
/// ```json
/// {"tracks":[{"identities":["A12"],"position":{"latitude":34.0,"longitude":-118.2,"altitude":1200.0},"velocity":{"x":80.5,"y":-12.0}}]}
/// ```
/// Blank lines are skipped, lines that can't be parsed are reported as transient errors
pub struct JsonLinesSource<R> {
    reader: R,
    buf: Vec<u8>,
    n_lines: u64,
}

impl<R> JsonLinesSource<R> where R: AsyncBufRead + Unpin + Send {
    pub fn new (reader: R)->Self {
        JsonLinesSource{ reader, buf: Vec::with_capacity(4096), n_lines: 0 }
    }

    pub fn lines_read (&self)->u64 { self.n_lines }
}

#[async_trait]
impl<R> TelemetrySource for JsonLinesSource<R> where R: AsyncBufRead + Unpin + Send {
    async fn next_batch (&mut self)->Result<Received> {
        loop {
            self.buf.clear();
            let len = self.reader.read_until( b'\n', &mut self.buf).await?;
            if len == 0 {
                return Ok( Received::EndOfStream )
            }
            self.n_lines += 1;

            let line = self.buf.trim_ascii();
            if line.is_empty() {
                continue
            }

            return match serde_json::from_slice::<TrackBatch>( line) {
                Ok(batch) => Ok( Received::Batch(batch)),
                Err(e) => Err( OdinFlightStatsError::TransientError( format!("malformed batch in line {}: {}", self.n_lines, e)))
            }
        }
    }
}

/* #endregion JsonLinesSource */

/// in-process producers (and tests) push batches through a channel. Dropping the sender ends the stream
pub struct ChannelSource {
    rx: mpsc::Receiver<Result<TrackBatch>>
}

impl ChannelSource {
    pub fn new (rx: mpsc::Receiver<Result<TrackBatch>>)->Self { ChannelSource{ rx } }

    /// create a connected (sender,source) pair
    pub fn channel (capacity: usize)->(mpsc::Sender<Result<TrackBatch>>, ChannelSource) {
        let (tx,rx) = mpsc::channel( capacity);
        (tx, ChannelSource::new(rx))
    }
}

#[async_trait]
impl TelemetrySource for ChannelSource {
    async fn next_batch (&mut self)->Result<Received> {
        match self.rx.recv().await {
            Some(Ok(batch)) => Ok( Received::Batch(batch)),
            Some(Err(e)) => Err(e),
            None => Ok( Received::EndOfStream )
        }
    }
}

/// open a source from a url:
///   - `tcp://host:port` connects to a socket that streams JSON lines
///   - `file://path` or a plain path reads a JSON lines file
///   - `-` reads JSON lines from stdin
pub async fn open_source (url: &str)->Result<Box<dyn TelemetrySource>> {
    let url = url.trim();

    if url == "-" {
        Ok( Box::new( JsonLinesSource::new( BufReader::new( tio::stdin()))))

    } else if let Some(addr) = url.strip_prefix("tcp://") {
        let stream = TcpStream::connect( addr).await?;
        Ok( Box::new( JsonLinesSource::new( BufReader::with_capacity( 8192, stream))))

    } else if let Some(path) = url.strip_prefix("file://") {
        let file = File::open( path).await?;
        Ok( Box::new( JsonLinesSource::new( BufReader::new( file))))

    } else if let Some(idx) = url.find("://") {
        Err( config_error!("unsupported source scheme {:?}", &url[..idx]))

    } else {
        let file = File::open( url).await?;
        Ok( Box::new( JsonLinesSource::new( BufReader::new( file))))
    }
}
