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

use std::{collections::HashSet, fmt, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{info,warn,error,debug};
use uom::si::{length::meter, velocity::meter_per_second};

use crate::{FlightRecord, FlightStore};
use crate::errors::{OdinFlightStatsError,Result};
use crate::region::Region;
use crate::stats::StatsAccumulator;
use crate::telemetry::{TelemetrySource,TrackBatch,TrackUpdate,Received};

#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum IngestState {
    Running,
    Terminated
}

/// how a (non-faulted) ingestion run ended
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum IngestOutcome {
    EndOfStream,
    Cancelled
}

impl fmt::Display for IngestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestOutcome::EndOfStream => write!( f, "end of stream"),
            IngestOutcome::Cancelled => write!( f, "cancelled"),
        }
    }
}

/// what processing a single track did
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum TrackDisposition {
    Filtered,   // outside of region, no effect at all
    Anonymous,  // no identity, only counted in statistics
    Updated,    // replaced the record of a known flight
    NewFlight   // first record of this identity
}

/// the sequential consumer of a telemetry source and sole writer of the [`FlightStore`]
///
/// Tracks are processed strictly in arrival order. Write locks are only held for a single registry upsert or
/// a single stats snapshot replacement, never across awaits.
pub struct IngestionLoop<S> {
    source: S,
    store: Arc<FlightStore>,
    region: Option<Region>,
    snapshot_interval: u64,
    n_snapshots: u64,

    seen: HashSet<String>,   // ids already counted towards flight_count, never shrinks
    stats: StatsAccumulator, // the running averages we publish snapshots of

    state: IngestState,
    done: CancellationToken, // cancelled once we reach Terminated
    n_transient: u64,
}

impl<S> IngestionLoop<S> where S: TelemetrySource {
    /// `snapshot_interval` is the number of samples between logged average snapshots (0 turns this off)
    pub fn new (source: S, store: Arc<FlightStore>, region: Option<Region>, snapshot_interval: u64)->Self {
        IngestionLoop {
            source,
            store,
            region,
            snapshot_interval,
            n_snapshots: 0,
            seen: HashSet::new(),
            stats: StatsAccumulator::new(),
            state: IngestState::Running,
            done: CancellationToken::new(),
            n_transient: 0,
        }
    }

    pub fn state (&self)->IngestState { self.state }
    pub fn store (&self)->&Arc<FlightStore> { &self.store }
    pub fn region (&self)->Option<&Region> { self.region.as_ref() }
    pub fn transient_errors (&self)->u64 { self.n_transient }
    pub fn snapshot_interval (&self)->u64 { self.snapshot_interval }
    pub fn snapshots_logged (&self)->u64 { self.n_snapshots }

    /// token that gets cancelled when ingestion terminates, for whoever waits on us
    pub fn done_token (&self)->CancellationToken { self.done.clone() }

    /// consume the source until it ends, faults or `cancel` fires.
    /// Transient source errors are logged and skipped. Any other error terminates the loop and is returned
    pub async fn run (&mut self, cancel: CancellationToken)->Result<IngestOutcome> {
        if self.state == IngestState::Terminated {
            return Err( OdinFlightStatsError::OpFailedError("ingestion already terminated".into()))
        }

        let res = self.consume( &cancel).await;

        self.state = IngestState::Terminated;
        self.done.cancel();

        match &res {
            Ok(outcome) => info!("ingestion terminated ({}) after {} samples", outcome, self.stats.sample_count()),
            Err(e) => error!("ingestion fault after {} samples: {}", self.stats.sample_count(), e)
        }
        res
    }

    async fn consume (&mut self, cancel: &CancellationToken)->Result<IngestOutcome> {
        loop {
            let received = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok( IngestOutcome::Cancelled ),
                received = self.source.next_batch() => received
            };

            match received {
                Ok(Received::Batch(batch)) => { self.process_batch( &batch); }
                Ok(Received::EndOfStream) => return Ok( IngestOutcome::EndOfStream ),
                Err(e) if e.is_transient() => {
                    // TODO - add a backoff policy once there are sources that report transient connection errors
                    self.n_transient += 1;
                    warn!("skipping transient source error: {}", e)
                }
                Err(e) => return Err(e)
            }
        }
    }

    /// returns the number of tracks that passed the region filter
    pub fn process_batch (&mut self, batch: &TrackBatch)->usize {
        debug!("processing batch with {} tracks", batch.tracks.len());

        let mut n_accepted = 0;
        for track in &batch.tracks {
            if self.process_track( track) != TrackDisposition::Filtered {
                n_accepted += 1;
            }
        }
        n_accepted
    }

    pub fn process_track (&mut self, track: &TrackUpdate)->TrackDisposition {
        let latitude = track.latitude();
        let longitude = track.longitude();

        if let Some(region) = &self.region {
            if !region.contains( latitude, longitude) {
                return TrackDisposition::Filtered
            }
        }

        let altitude = track.altitude().get::<meter>();
        let velocity_x = track.velocity_x().get::<meter_per_second>();
        let velocity_y = track.velocity_y().get::<meter_per_second>();

        let mut disposition = TrackDisposition::Anonymous;

        if let Some(track_id) = track.track_id() {
            disposition = TrackDisposition::Updated;

            if !self.seen.contains( track_id) {
                self.seen.insert( track_id.to_string());
                let n = self.stats.add_flight();
                if n == 1 {
                    info!("detected first flight, {}", track_id);
                } else {
                    info!("detected {} flights, {}", n, track_id);
                }
                disposition = TrackDisposition::NewFlight;
            }

            let record = FlightRecord {
                track_id: track_id.to_string(),
                velocity_x,
                velocity_y,
                altitude,
                latitude,
                longitude
            };
            self.store.registry().upsert( record);
        }

        let n = self.stats.add_sample( velocity_x, velocity_y, altitude);
        let snapshot = self.stats.snapshot();
        self.store.publish_stats( snapshot);

        if self.snapshot_interval > 0 && n % self.snapshot_interval == 0 {
            self.n_snapshots += 1;
            info!("average over {} data points - x:{:8.2}, y:{:8.2}, alt:{:8.2}",
                  n, snapshot.avg_vel_x_abs, snapshot.avg_vel_y_abs, snapshot.avg_altitude_abs);
        }

        disposition
    }
}
