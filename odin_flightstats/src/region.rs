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

//! rectangular lat/lon regions used to gate incoming telemetry
//!
//! Regions are simple inclusive range checks on both axes. There is no support for rectangles that
//! cross the antimeridian or cover a pole - a region with `sw.lon > ne.lon` is not normalized and
//! will not contain any point.

use std::{collections::HashMap, fmt};
use serde::{Serialize,Deserialize,Deserializer};

use crate::errors::{OdinFlightStatsError,Result,config_error};

/// the accepted format for explicit region specs
pub const REGION_FORMAT: &str = "swlat, swlon, nelat, nelon";

#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
pub struct LatLon {
    pub lat: f64, // degrees
    pub lon: f64, // degrees
}

/// an immutable rectangle defined by its south-west and north-east corners
#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
pub struct Region {
    pub southwest: LatLon,
    pub northeast: LatLon,
}

impl Region {
    pub fn new (swlat: f64, swlon: f64, nelat: f64, nelon: f64)->Self {
        Region {
            southwest: LatLon{ lat: swlat, lon: swlon },
            northeast: LatLon{ lat: nelat, lon: nelon },
        }
    }

    /// inclusive on all four bounds
    #[inline]
    pub fn contains (&self, lat: f64, lon: f64)->bool {
        lat >= self.southwest.lat && lat <= self.northeast.lat && lon >= self.southwest.lon && lon <= self.northeast.lon
    }

    /// true if the corners are swapped on at least one axis, which means `contains` never succeeds
    pub fn is_inverted (&self)->bool {
        self.southwest.lat > self.northeast.lat || self.southwest.lon > self.northeast.lon
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "Region( sw: [{}, {}], ne: [{}, {}] )",
                self.southwest.lat, self.southwest.lon, self.northeast.lat, self.northeast.lon)
    }
}

/// named regions that can be used instead of explicit coordinates.
/// Deserialized presets are added to (or replace) the built-in `la`, `usa` and `eu` entries
#[derive(Debug,Clone,PartialEq,Serialize)]
#[serde(transparent)]
pub struct RegionPresets(HashMap<String,Region>);

impl RegionPresets {
    pub fn new ()->Self { RegionPresets( HashMap::new()) }

    /// names are stored lower case since lookup is case-insensitive
    pub fn add (&mut self, name: &str, region: Region) {
        self.0.insert( name.trim().to_lowercase(), region);
    }

    pub fn get (&self, name: &str)->Option<&Region> {
        self.0.get( name.trim().to_lowercase().as_str())
    }

    pub fn names (&self)->Vec<&str> {
        let mut names: Vec<&str> = self.0.keys().map(|k| k.as_str()).collect();
        names.sort();
        names
    }

    pub fn len (&self)->usize { self.0.len() }
    pub fn is_empty (&self)->bool { self.0.is_empty() }
}

impl Default for RegionPresets {
    fn default()->Self {
        let mut presets = RegionPresets::new();
        presets.add( "la", Region::new( 33.674069, -118.619385, 34.420505, -117.993164));
        presets.add( "usa", Region::new( 24.396308, -124.848974, 49.384358, -66.885444));
        presets.add( "eu", Region::new( 36.385913, -12.304688, 71.413177, 42.626953));
        presets
    }
}

impl<'de> Deserialize<'de> for RegionPresets {
    fn deserialize<D> (deserializer: D)->std::result::Result<Self,D::Error> where D: Deserializer<'de> {
        let entries = HashMap::<String,Region>::deserialize( deserializer)?;

        let mut presets = RegionPresets::default();
        for (name,region) in entries {
            presets.add( &name, region);
        }
        Ok(presets)
    }
}

/// parse a region spec that is either a preset name or a comma separated list of [`REGION_FORMAT`] coordinates.
/// A blank spec is not an error but means no region filtering (`Ok(None)`)
pub fn parse_region (spec: &str, presets: &RegionPresets)->Result<Option<Region>> {
    let parts: Vec<&str> = spec.split(',').collect();

    if parts.len() == 1 {
        let name = spec.trim();
        if name.is_empty() {
            return Ok(None)
        }
        match presets.get( name) {
            Some(region) => Ok( Some(*region)),
            None => Err( config_error!("location {:?} not found. Valid locations include ({})", name, presets.names().join(", ")))
        }

    } else if parts.len() != 4 {
        Err( config_error!("region must be specified with 4 coordinates: {:?}", REGION_FORMAT))

    } else {
        let swlat = parse_coordinate( parts[0], "swlat", -90.0, 90.0)?;
        let swlon = parse_coordinate( parts[1], "swlon", -180.0, 180.0)?;
        let nelat = parse_coordinate( parts[2], "nelat", -90.0, 90.0)?;
        let nelon = parse_coordinate( parts[3], "nelon", -180.0, 180.0)?;

        Ok( Some( Region::new( swlat, swlon, nelat, nelon)))
    }
}

fn parse_coordinate (s: &str, title: &str, min: f64, max: f64)->Result<f64> {
    let v: f64 = s.trim().parse().map_err(|e| config_error!("region coordinate {}: {}", title, e))?;

    // NaN fails both comparisons so check explicitly
    if v.is_nan() || v < min || v > max {
        Err( config_error!("region coordinate {}: {:.2} not within range {:.2} to {:.2}", title, v, min, max))
    } else {
        Ok(v)
    }
}
