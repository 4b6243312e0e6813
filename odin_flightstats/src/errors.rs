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

use thiserror::Error;

pub type Result<T> = std::result::Result<T,OdinFlightStatsError>;

#[derive(Error,Debug)]
pub enum OdinFlightStatsError {

    #[error("config error {0}")]
    ConfigError(String),

    #[error("IO error {0}")]
    IOError( #[from] std::io::Error),

    #[error("JSON error {0}")]
    JsonError( #[from] serde_json::Error),

    #[error("RON deserialization error {0}")]
    RonDeError( #[from] ron::de::SpannedError),

    /// source errors that do not invalidate the stream (e.g. a single malformed batch)
    #[error("transient source error {0}")]
    TransientError(String),

    #[error("source fault {0}")]
    SourceFault(String),

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("operation failed {0}")]
    OpFailedError(String)
}

impl OdinFlightStatsError {
    /// can the ingestion loop keep consuming from the source after this error
    pub fn is_transient (&self)->bool {
        matches!( self, OdinFlightStatsError::TransientError(_))
    }
}

macro_rules! config_error {
    ($fmt:literal $(, $arg:expr )* ) => {
        OdinFlightStatsError::ConfigError( format!( $fmt $(, $arg)* ))
    };
}
pub (crate) use config_error;

macro_rules! protocol_error {
    ($fmt:literal $(, $arg:expr )* ) => {
        OdinFlightStatsError::ProtocolError( format!( $fmt $(, $arg)* ))
    };
}
pub (crate) use protocol_error;
