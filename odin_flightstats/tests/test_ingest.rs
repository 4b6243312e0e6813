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

#![allow(unused)]

use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use uom::si::{f64::{Length,Velocity}, length::{meter,foot}, velocity::{meter_per_second,knot}};

use odin_flightstats::{FlightStore, FlightRecord, FlightStats};
use odin_flightstats::errors::OdinFlightStatsError;
use odin_flightstats::region::{Region, RegionPresets, parse_region};
use odin_flightstats::config::DEFAULT_SNAPSHOT_INTERVAL;
use odin_flightstats::ingest::{IngestionLoop, IngestOutcome, IngestState, TrackDisposition};
use odin_flightstats::telemetry::{ChannelSource, JsonLinesSource, TrackBatch, TrackUpdate, open_source};

// run with "cargo test --test test_ingest -- --nocapture"

fn track (ids: &[&str], lat: f64, lon: f64, alt_m: f64, vx: f64, vy: f64)->TrackUpdate {
    TrackUpdate::new( ids, lat, lon, Length::new::<meter>(alt_m),
                      Velocity::new::<meter_per_second>(vx), Velocity::new::<meter_per_second>(vy))
}

fn la_region ()->Option<Region> {
    parse_region( "33.67,-118.62,34.42,-117.99", &RegionPresets::default()).unwrap()
}

#[tokio::test]
async fn test_la_scenario () {
    let store = Arc::new( FlightStore::new());
    let (tx, source) = ChannelSource::channel(4);
    let mut ingestion = IngestionLoop::new( source, store.clone(), la_region(), DEFAULT_SNAPSHOT_INTERVAL);

    let batch = TrackBatch::new( vec![
        track( &["A"], 34.0, -118.3, 1000.0, 50.0, -5.0),   // inside
        track( &["B"], 40.7, -74.0, 2000.0, 100.0, 10.0),   // outside
        track( &[], 33.9, -118.1, 500.0, -30.0, 15.0),      // inside, anonymous
    ]);
    tx.send( Ok(batch)).await.unwrap();
    drop(tx);

    let outcome = ingestion.run( CancellationToken::new()).await.unwrap();
    assert_eq!( outcome, IngestOutcome::EndOfStream);
    assert_eq!( ingestion.state(), IngestState::Terminated);
    assert!( ingestion.done_token().is_cancelled());

    let stats = store.stats();
    println!("stats: {stats:?}");
    assert_eq!( stats.flight_count, 1);
    assert_eq!( stats.sample_count, 2);
    assert_eq!( stats.avg_altitude_abs, 750.0);
    assert_eq!( stats.avg_vel_x_abs, 40.0);
    assert_eq!( stats.avg_vel_y_abs, 10.0);

    assert_eq!( store.registry().list_ids(), vec!["A".to_string()]);
    assert!( store.registry().get("B").is_none());
}

#[tokio::test]
async fn test_single_flight_altitudes () {
    let store = Arc::new( FlightStore::new());
    let (tx, source) = ChannelSource::channel(4);
    let mut ingestion = IngestionLoop::new( source, store.clone(), None, DEFAULT_SNAPSHOT_INTERVAL);

    for alt in [10.0, 20.0, 30.0] {
        tx.send( Ok( TrackBatch::new( vec![ track( &["X"], 0.0, 0.0, alt, 1.0, 1.0) ]))).await.unwrap();
    }
    drop(tx);

    ingestion.run( CancellationToken::new()).await.unwrap();

    let stats = store.stats();
    assert_eq!( stats.avg_altitude_abs, 20.0);
    assert_eq!( stats.flight_count, 1);
    assert_eq!( stats.sample_count, 3);

    let record = store.registry().get("X").unwrap();
    assert_eq!( record.altitude, 30.0);
}

#[test]
fn test_dispositions_and_first_seen_counting () {
    let store = Arc::new( FlightStore::new());
    let (_tx, source) = ChannelSource::channel(1);
    let mut ingestion = IngestionLoop::new( source, store.clone(), la_region(), DEFAULT_SNAPSHOT_INTERVAL);

    assert_eq!( ingestion.process_track( &track( &["A"], 34.0, -118.3, 100.0, 1.0, 1.0)), TrackDisposition::NewFlight);
    assert_eq!( ingestion.process_track( &track( &["A"], 34.1, -118.3, 200.0, 1.0, 1.0)), TrackDisposition::Updated);
    assert_eq!( ingestion.process_track( &track( &["", "B"], 34.1, -118.3, 200.0, 1.0, 1.0)), TrackDisposition::NewFlight);
    assert_eq!( ingestion.process_track( &track( &["", ""], 34.1, -118.3, 200.0, 1.0, 1.0)), TrackDisposition::Anonymous);
    assert_eq!( ingestion.process_track( &track( &["C"], 10.0, 10.0, 200.0, 1.0, 1.0)), TrackDisposition::Filtered);
    assert_eq!( ingestion.process_track( &track( &["B", "A"], 34.2, -118.3, 300.0, 1.0, 1.0)), TrackDisposition::Updated);

    let stats = store.stats();
    assert_eq!( stats.flight_count, 2);
    assert_eq!( stats.sample_count, 5);

    let mut ids = store.registry().list_ids();
    ids.sort();
    assert_eq!( ids, vec!["A".to_string(), "B".to_string()]);

    // the record is replaced as a whole with the last accepted update
    let b = store.registry().get("B").unwrap();
    assert_eq!( b, FlightRecord{ track_id: "B".into(), velocity_x: 1.0, velocity_y: 1.0, altitude: 300.0, latitude: 34.2, longitude: -118.3 });
}

#[test]
fn test_filtered_track_has_no_effect () {
    let store = Arc::new( FlightStore::new());
    let (_tx, source) = ChannelSource::channel(1);
    let mut ingestion = IngestionLoop::new( source, store.clone(), la_region(), DEFAULT_SNAPSHOT_INTERVAL);

    ingestion.process_track( &track( &["A"], 34.0, -118.3, 100.0, 10.0, 10.0));
    let before = store.stats();

    let batch = TrackBatch::new( vec![
        track( &["Z"], 51.5, -0.12, 9000.0, 200.0, 200.0),
        track( &["A"], 51.5, -0.12, 9000.0, 200.0, 200.0), // known id, but outside
    ]);
    assert_eq!( ingestion.process_batch( &batch), 0);

    assert_eq!( store.stats(), before);
    assert!( store.registry().get("Z").is_none());
    assert_eq!( store.registry().get("A").unwrap().altitude, 100.0);
    assert_eq!( store.registry().len(), 1);
}

#[test]
fn test_flight_count_with_repeats () {
    let store = Arc::new( FlightStore::new());
    let (_tx, source) = ChannelSource::channel(1);
    let mut ingestion = IngestionLoop::new( source, store.clone(), None, DEFAULT_SNAPSHOT_INTERVAL);

    let ids = ["A", "B", "A", "C", "B", "A", "A", "D", "C"];
    for (i,id) in ids.iter().enumerate() {
        ingestion.process_track( &track( &[*id], 0.0, 0.0, i as f64, 0.0, 0.0));
    }

    let stats = store.stats();
    assert_eq!( stats.flight_count, 4);
    assert_eq!( stats.sample_count, ids.len() as u64);
    assert_eq!( store.registry().len(), 4);
}

#[test]
fn test_snapshot_interval () {
    let run = |interval: u64| {
        let store = Arc::new( FlightStore::new());
        let (_tx, source) = ChannelSource::channel(1);
        let mut ingestion = IngestionLoop::new( source, store.clone(), None, interval);
        for i in 1..=25 {
            ingestion.process_track( &track( &["A"], 0.0, 0.0, i as f64, -(i as f64), 2.0));
        }
        (ingestion.snapshots_logged(), store.stats())
    };

    let (n10, stats10) = run( 10);
    let (n7, stats7) = run( 7);
    let (n0, stats0) = run( 0);
    println!("snapshots: interval 10 -> {n10}, 7 -> {n7}, 0 -> {n0}");

    assert_eq!( n10, 2);
    assert_eq!( n7, 3);
    assert_eq!( n0, 0);

    // snapshots are only logged, they don't change the statistics
    assert_eq!( stats10, stats0);
    assert_eq!( stats7, stats0);
    assert_eq!( stats0.sample_count, 25);
    assert_eq!( stats0.avg_altitude_abs, 13.0);
}

#[test]
fn test_typed_accessors () {
    let t = TrackUpdate::new( &["A"], 34.0, -118.0, Length::new::<foot>(1000.0), Velocity::new::<knot>(100.0), Velocity::new::<knot>(0.0));
    assert!( (t.position.altitude - 304.8).abs() < 1e-9);
    assert!( (t.velocity.x - 51.444444).abs() < 1e-5);
    assert!( (t.altitude().get::<foot>() - 1000.0).abs() < 1e-9);
    assert_eq!( t.track_id(), Some("A"));

    let anon = track( &["", ""], 0.0, 0.0, 0.0, 0.0, 0.0);
    assert_eq!( anon.track_id(), None);
}

#[tokio::test]
async fn test_transient_errors_are_skipped () {
    let store = Arc::new( FlightStore::new());
    let (tx, source) = ChannelSource::channel(4);
    let mut ingestion = IngestionLoop::new( source, store.clone(), None, DEFAULT_SNAPSHOT_INTERVAL);

    tx.send( Ok( TrackBatch::new( vec![ track( &["A"], 0.0, 0.0, 10.0, 0.0, 0.0) ]))).await.unwrap();
    tx.send( Err( OdinFlightStatsError::TransientError("garbled batch".into()))).await.unwrap();
    tx.send( Ok( TrackBatch::new( vec![ track( &["B"], 0.0, 0.0, 30.0, 0.0, 0.0) ]))).await.unwrap();
    drop(tx);

    let outcome = ingestion.run( CancellationToken::new()).await.unwrap();
    assert_eq!( outcome, IngestOutcome::EndOfStream);
    assert_eq!( ingestion.transient_errors(), 1);
    assert_eq!( store.stats().flight_count, 2);
    assert_eq!( store.stats().avg_altitude_abs, 20.0);
}

#[tokio::test]
async fn test_fault_terminates () {
    let store = Arc::new( FlightStore::new());
    let (tx, source) = ChannelSource::channel(4);
    let mut ingestion = IngestionLoop::new( source, store.clone(), None, DEFAULT_SNAPSHOT_INTERVAL);
    let done = ingestion.done_token();

    tx.send( Ok( TrackBatch::new( vec![ track( &["A"], 0.0, 0.0, 10.0, 0.0, 0.0) ]))).await.unwrap();
    tx.send( Err( OdinFlightStatsError::SourceFault("connection reset".into()))).await.unwrap();
    tx.send( Ok( TrackBatch::new( vec![ track( &["B"], 0.0, 0.0, 30.0, 0.0, 0.0) ]))).await.unwrap();

    match ingestion.run( CancellationToken::new()).await {
        Err(OdinFlightStatsError::SourceFault(msg)) => println!("got expected fault: {msg}"),
        other => panic!("expected source fault, got {other:?}")
    }
    assert_eq!( ingestion.state(), IngestState::Terminated);
    assert!( done.is_cancelled());

    // nothing after the fault was processed
    assert_eq!( store.stats().sample_count, 1);
    assert!( store.registry().get("B").is_none());

    // a terminated loop can't be restarted
    assert!( ingestion.run( CancellationToken::new()).await.is_err());
}

#[tokio::test]
async fn test_cancellation () {
    let store = Arc::new( FlightStore::new());
    let (tx, source) = ChannelSource::channel(4); // keep tx alive so that the source blocks
    let mut ingestion = IngestionLoop::new( source, store.clone(), None, DEFAULT_SNAPSHOT_INTERVAL);
    let done = ingestion.done_token();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn( async move {
        tokio::time::sleep( Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let outcome = tokio::time::timeout( Duration::from_secs(5), ingestion.run( cancel)).await
        .expect("ingestion did not stop on cancellation")
        .unwrap();

    assert_eq!( outcome, IngestOutcome::Cancelled);
    assert!( done.is_cancelled());
    drop(tx);
}

#[tokio::test]
async fn test_json_lines_source () {
    let input = concat!(
        r#"{"tracks":[{"identities":["A"],"position":{"latitude":34.0,"longitude":-118.3,"altitude":100.0},"velocity":{"x":1.0,"y":2.0}}]}"#, "\n",
        "\n",
        "this is not json\n",
        r#"{"tracks":[{"position":{"latitude":34.0,"longitude":-118.3,"altitude":300.0},"velocity":{"x":3.0,"y":4.0}}]}"#, "\r\n",
    );

    let store = Arc::new( FlightStore::new());
    let source = JsonLinesSource::new( input.as_bytes());
    let mut ingestion = IngestionLoop::new( source, store.clone(), None, DEFAULT_SNAPSHOT_INTERVAL);

    let outcome = ingestion.run( CancellationToken::new()).await.unwrap();
    assert_eq!( outcome, IngestOutcome::EndOfStream);
    assert_eq!( ingestion.transient_errors(), 1);

    let stats = store.stats();
    assert_eq!( stats.sample_count, 2);
    assert_eq!( stats.flight_count, 1);
    assert_eq!( stats.avg_altitude_abs, 200.0);
}

#[tokio::test]
async fn test_file_source () {
    let source = open_source( "resources/sample_tracks.jsonl").await.unwrap();
    let store = Arc::new( FlightStore::new());
    let mut ingestion = IngestionLoop::new( source, store.clone(), la_region(), DEFAULT_SNAPSHOT_INTERVAL);

    ingestion.run( CancellationToken::new()).await.unwrap();

    // UAL814 is outside of the LA region
    let stats = store.stats();
    println!("stats: {stats:?}");
    assert_eq!( stats.sample_count, 3);
    assert_eq!( stats.flight_count, 1);
    assert_eq!( store.registry().list_ids(), vec!["N123AB".to_string()]);
    assert_eq!( store.registry().get("N123AB").unwrap().altitude, 1400.0);
}

#[tokio::test]
async fn test_unsupported_source () {
    match open_source( "grpc://api.example.com:443").await {
        Err(OdinFlightStatsError::ConfigError(msg)) => println!("{msg}"),
        Err(e) => panic!("unexpected error {e}"),
        Ok(_) => panic!("unsupported scheme accepted")
    }
}
