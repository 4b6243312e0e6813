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

use std::{collections::HashMap, sync::RwLock};

use crate::{FlightRecord, read_locked, write_locked};

/// latest known record per flight identity
///
/// The map is never exposed. Writers hold the lock for a single insert, readers only for copying out
/// one record or the key set, which keeps lock hold times independent of what callers do with the data.
/// There is no removal - a flight that stops reporting stays at its last known state.
#[derive(Debug,Default)]
pub struct FlightRegistry {
    flights: RwLock<HashMap<String,FlightRecord>>
}

impl FlightRegistry {
    pub fn new ()->Self { FlightRegistry::default() }

    /// insert or replace the record for `record.track_id`
    pub fn upsert (&self, record: FlightRecord) {
        let mut flights = write_locked( &self.flights);
        flights.insert( record.track_id.clone(), record);
    }

    pub fn get (&self, id: &str)->Option<FlightRecord> {
        let flights = read_locked( &self.flights);
        flights.get(id).cloned()
    }

    /// the identities of all flights we have a record for (unique, in no particular order)
    pub fn list_ids (&self)->Vec<String> {
        let flights = read_locked( &self.flights);
        flights.keys().cloned().collect()
    }

    pub fn contains (&self, id: &str)->bool {
        read_locked( &self.flights).contains_key(id)
    }

    pub fn len (&self)->usize {
        read_locked( &self.flights).len()
    }

    pub fn is_empty (&self)->bool {
        self.len() == 0
    }
}
