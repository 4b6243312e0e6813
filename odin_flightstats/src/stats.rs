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

use crate::FlightStats;

/// incremental cumulative moving average over absolute sample values
///
/// The recurrence is `avg_n = (avg_{n-1} * (n-1) + |x|) / n` with `n` being the sample count
/// including `x`. Do not replace this with a running sum or the `avg + (x-avg)/n` form, results
/// would differ in the last bits.
#[derive(Debug,Clone,Copy,Default,PartialEq)]
pub struct CumulativeAverage {
    pub avg: f64
}

impl CumulativeAverage {
    pub fn new ()->Self { CumulativeAverage{ avg: 0.0 } }

    /// `n` is the number of samples after adding `x` (n >= 1)
    #[inline]
    pub fn add (&mut self, x: f64, n: u64) {
        let n = n as f64;
        self.avg = (self.avg * (n - 1.0) + x.abs()) / n;
    }
}

/// the writer side of the aggregate flight statistics
///
/// This is owned by the (single) ingestion loop. Readers never see it, they get [`FlightStats`]
/// snapshots that are published after each sample.
#[derive(Debug,Default)]
pub struct StatsAccumulator {
    sample_count: u64,
    flight_count: u64,
    vel_x: CumulativeAverage,
    vel_y: CumulativeAverage,
    altitude: CumulativeAverage,
}

impl StatsAccumulator {
    pub fn new ()->Self { StatsAccumulator::default() }

    pub fn sample_count (&self)->u64 { self.sample_count }
    pub fn flight_count (&self)->u64 { self.flight_count }

    /// returns the new flight count
    pub fn add_flight (&mut self)->u64 {
        self.flight_count += 1;
        self.flight_count
    }

    /// returns the new sample count
    pub fn add_sample (&mut self, vel_x: f64, vel_y: f64, altitude: f64)->u64 {
        self.sample_count += 1;
        let n = self.sample_count;

        self.vel_x.add( vel_x, n);
        self.vel_y.add( vel_y, n);
        self.altitude.add( altitude, n);

        n
    }

    pub fn snapshot (&self)->FlightStats {
        FlightStats {
            sample_count: self.sample_count,
            flight_count: self.flight_count,
            avg_vel_x_abs: self.vel_x.avg,
            avg_vel_y_abs: self.vel_y.avg,
            avg_altitude_abs: self.altitude.avg,
        }
    }
}
