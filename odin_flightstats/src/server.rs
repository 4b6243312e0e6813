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

//! the query server - a RESP speaking TCP server that exposes read-only views of the [`FlightStore`]
//!
//! supported commands (verbs are case-insensitive):
//!
//! | command      | reply                                        |
//! |--------------|----------------------------------------------|
//! | `PING`       | `+PONG`                                      |
//! | `QUIT`       | `+OK`, then the connection is closed         |
//! | `STATS`      | bulk string with JSON encoded `FlightStats`  |
//! | `GET <id>`   | bulk string with JSON `FlightRecord` or null |
//! | `FLIGHTS`    | array with all known flight ids              |
//!
//! Unknown commands and wrong argument counts are answered with an error reply, the connection stays open.
//! Framing errors close the offending connection.

use std::{fmt, net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::{TcpListener, TcpStream, ToSocketAddrs}, io::{AsyncWriteExt, BufReader}, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{info,warn,debug};

use crate::FlightStore;
use crate::errors::{OdinFlightStatsError,Result};
use crate::resp::{self,Reply};

/// a parsed client request
#[derive(Debug,Clone,PartialEq)]
pub enum Command {
    Ping,
    Quit,
    Stats,
    Get(String),
    Flights
}

/// requests we answer with an error reply
#[derive(Debug,Clone,PartialEq)]
pub enum CommandError {
    Unknown(String),
    WrongArity(String)
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Unknown(verb) => write!( f, "ERR unknown command '{}'", verb),
            CommandError::WrongArity(verb) => write!( f, "ERR wrong number of arguments for '{}' command", verb),
        }
    }
}

impl Command {
    /// `args` are the raw command arguments, starting with the verb
    pub fn parse (args: &[Vec<u8>])->std::result::Result<Command,CommandError> {
        let Some((verb,params)) = args.split_first() else {
            return Err( CommandError::Unknown( String::new()))
        };
        let verb = String::from_utf8_lossy( verb);

        let check_arity = |n: usize| {
            if params.len() == n { Ok(()) } else { Err( CommandError::WrongArity( verb.to_string())) }
        };

        match verb.to_lowercase().as_str() {
            "ping" => { check_arity(0)?; Ok( Command::Ping) }
            "quit" => { check_arity(0)?; Ok( Command::Quit) }
            "stats" => { check_arity(0)?; Ok( Command::Stats) }
            "get" => { check_arity(1)?; Ok( Command::Get( String::from_utf8_lossy( &params[0]).into_owned())) }
            "flights" => { check_arity(0)?; Ok( Command::Flights) }
            _ => Err( CommandError::Unknown( verb.to_string()))
        }
    }

    /// compute the reply for this command. This only copies data out of the store (holding read locks
    /// only for the copy), serialization happens afterwards
    pub fn execute (&self, store: &FlightStore)->Reply {
        match self {
            Command::Ping => Reply::Simple("PONG".into()),
            Command::Quit => Reply::ok(),
            Command::Stats => {
                let stats = store.stats();
                json_reply( &stats)
            }
            Command::Get(id) => match store.registry().get( id) {
                Some(record) => json_reply( &record),
                None => Reply::Null
            }
            Command::Flights => Reply::Array( store.registry().list_ids())
        }
    }
}

fn json_reply<T: serde::Serialize> (value: &T)->Reply {
    Reply::json( value).unwrap_or_else(|e| Reply::error( format!("ERR {}", e)))
}

/// process a single request. The returned flag is true if the connection should be closed after the reply
pub fn handle_request (store: &FlightStore, args: &[Vec<u8>])->(Reply,bool) {
    match Command::parse( args) {
        Ok(cmd) => (cmd.execute( store), cmd == Command::Quit),
        Err(e) => (Reply::error( e), false)
    }
}

pub struct QueryServer {
    listener: TcpListener,
    store: Arc<FlightStore>,
}

impl QueryServer {
    pub async fn bind<A: ToSocketAddrs> (addr: A, store: Arc<FlightStore>)->Result<Self> {
        let listener = TcpListener::bind( addr).await?;
        Ok( QueryServer{ listener, store } )
    }

    pub fn local_addr (&self)->Result<SocketAddr> {
        Ok( self.listener.local_addr()? )
    }

    /// accept connections until `shutdown` is cancelled. Each connection is served by its own task.
    /// Connections that are already open when we stop accepting run to completion
    pub async fn serve (self, shutdown: CancellationToken)->Result<()> {
        info!("serving flight queries on {}", self.local_addr()?);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("query server stopped accepting connections");
                    return Ok(())
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, remote_addr)) => {
                        let store = self.store.clone();
                        tokio::spawn( async move {
                            debug!("connection from {} opened", remote_addr);
                            match serve_connection( stream, store).await {
                                Ok(()) => debug!("connection from {} closed", remote_addr),
                                Err(e) => warn!("connection from {} terminated: {}", remote_addr, e)
                            }
                        });
                    }
                    Err(e) => {
                        // usually running out of file descriptors - don't spin
                        warn!("failed to accept connection: {}", e);
                        tokio::time::sleep( Duration::from_millis(100)).await;
                    }
                }
            }
        }
    }
}

pub fn spawn_query_server (server: QueryServer, shutdown: CancellationToken)->JoinHandle<Result<()>> {
    tokio::spawn( server.serve( shutdown))
}

async fn serve_connection (stream: TcpStream, store: Arc<FlightStore>)->Result<()> {
    let (rd, mut wr) = stream.into_split();
    let mut reader = BufReader::new( rd);
    let mut buf: Vec<u8> = Vec::with_capacity(1024);

    loop {
        let args = match resp::read_command( &mut reader).await {
            Ok(Some(args)) => args,
            Ok(None) => return Ok(()),
            Err(e @ OdinFlightStatsError::ProtocolError(_)) => {
                buf.clear();
                Reply::error( format!("ERR {}", e)).write_to( &mut buf);
                wr.write_all( &buf).await?;
                return Err(e)
            }
            Err(e) => return Err(e)
        };

        let (reply, close) = handle_request( &store, &args);

        buf.clear();
        reply.write_to( &mut buf);
        wr.write_all( &buf).await?;

        if close {
            wr.shutdown().await?;
            return Ok(())
        }
    }
}
