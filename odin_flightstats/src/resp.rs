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

//! minimal RESP2 (Redis serialization protocol) wire format support
//!
//! The server side reads commands - either arrays of bulk strings or inline commands - and writes [`Reply`]
//! values. The client side functions (`encode_command`, `write_command`, `read_reply`) are used by the query
//! tool and tests.
//!
//! see <https://redis.io/docs/latest/develop/reference/protocol-spec/>

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::errors::{OdinFlightStatsError,Result,protocol_error};

pub const MAX_LINE_LEN: usize = 64 * 1024;
pub const MAX_BULK_LEN: usize = 1024 * 1024;
pub const MAX_ARGS: usize = 1024;

/// the reply types we use
#[derive(Debug,Clone,PartialEq)]
pub enum Reply {
    Simple(String),
    Bulk(Vec<u8>),
    Array(Vec<String>), // of bulk strings
    Null,
    Error(String)
}

impl Reply {
    pub fn ok ()->Self { Reply::Simple("OK".into()) }

    pub fn error (msg: impl ToString)->Self { Reply::Error( msg.to_string()) }

    pub fn json<T: Serialize> (value: &T)->Result<Self> {
        Ok( Reply::Bulk( serde_json::to_vec( value)?))
    }

    pub fn is_error (&self)->bool { matches!( self, Reply::Error(_)) }

    /// the payload of a bulk reply as str (if it is valid UTF-8)
    pub fn as_bulk_str (&self)->Option<&str> {
        if let Reply::Bulk(data) = self { std::str::from_utf8( data).ok() } else { None }
    }

    pub fn write_to (&self, buf: &mut Vec<u8>) {
        match self {
            Reply::Simple(s) => write_line( buf, b'+', s),
            Reply::Error(s) => write_line( buf, b'-', s),
            Reply::Bulk(data) => write_bulk( buf, data),
            Reply::Array(items) => {
                buf.extend_from_slice( format!("*{}\r\n", items.len()).as_bytes());
                for item in items {
                    write_bulk( buf, item.as_bytes());
                }
            }
            Reply::Null => buf.extend_from_slice( b"$-1\r\n")
        }
    }

    pub fn to_bytes (&self)->Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        self.write_to( &mut buf);
        buf
    }
}

// simple strings and errors can't contain line breaks
fn write_line (buf: &mut Vec<u8>, prefix: u8, s: &str) {
    buf.push( prefix);
    buf.extend( s.bytes().map(|b| if b == b'\r' || b == b'\n' { b' ' } else { b }));
    buf.extend_from_slice( b"\r\n");
}

fn write_bulk (buf: &mut Vec<u8>, data: &[u8]) {
    buf.extend_from_slice( format!("${}\r\n", data.len()).as_bytes());
    buf.extend_from_slice( data);
    buf.extend_from_slice( b"\r\n");
}

/* #region reading **********************************************************************************************/

/// read the next line without its "\r\n" (or "\n") terminator. Returns false on EOF
async fn read_line<R> (reader: &mut R, line: &mut Vec<u8>)->Result<bool> where R: AsyncBufRead + Unpin {
    line.clear();
    let len = (&mut *reader).take( MAX_LINE_LEN as u64).read_until( b'\n', line).await?;

    if len == 0 {
        return Ok(false)
    }
    if line.last() != Some(&b'\n') {
        if len >= MAX_LINE_LEN {
            return Err( protocol_error!("line too long"))
        } else {
            return Ok(false) // connection closed within line
        }
    }

    line.pop();
    if line.last() == Some(&b'\r') { line.pop(); }
    Ok(true)
}

fn parse_len (bytes: &[u8])->Option<i64> {
    std::str::from_utf8( bytes).ok().and_then(|s| s.parse::<i64>().ok())
}

// the buffer only grows with received data, a length header alone does not allocate
async fn read_bulk_data<R> (reader: &mut R, len: usize)->Result<Vec<u8>> where R: AsyncBufRead + Unpin {
    let n_expected = len + 2;
    let mut data = Vec::with_capacity( n_expected.min( 8192));
    (&mut *reader).take( n_expected as u64).read_to_end( &mut data).await?;

    if data.len() < n_expected {
        return Err( unexpected_eof())
    }
    if !data.ends_with( b"\r\n") {
        return Err( protocol_error!("expected CRLF after bulk data"))
    }
    data.truncate( len);
    Ok(data)
}

async fn read_bulk<R> (reader: &mut R, line: &mut Vec<u8>)->Result<Option<Vec<u8>>> where R: AsyncBufRead + Unpin {
    if !read_line( reader, line).await? {
        return Err( unexpected_eof())
    }
    if line.first() != Some(&b'$') {
        return Err( protocol_error!("expected '$', got '{}'", String::from_utf8_lossy( line)))
    }

    match parse_len( &line[1..]) {
        Some(-1) => Ok(None),
        Some(len) if len >= 0 && (len as usize) <= MAX_BULK_LEN => Ok( Some( read_bulk_data( reader, len as usize).await?)),
        _ => Err( protocol_error!("invalid bulk length"))
    }
}

fn unexpected_eof ()->OdinFlightStatsError {
    OdinFlightStatsError::IOError( std::io::Error::new( std::io::ErrorKind::UnexpectedEof, "connection closed within message"))
}

/// read the next client command as list of arguments (the first one being the command verb).
/// Returns `Ok(None)` if the connection was closed between commands. Empty commands are skipped
pub async fn read_command<R> (reader: &mut R)->Result<Option<Vec<Vec<u8>>>> where R: AsyncBufRead + Unpin {
    let mut line = Vec::with_capacity(128);

    loop {
        if !read_line( reader, &mut line).await? {
            return Ok(None)
        }

        if line.first() == Some(&b'*') {
            let n = match parse_len( &line[1..]) {
                Some(n) if n <= 0 => continue,
                Some(n) if (n as usize) <= MAX_ARGS => n as usize,
                _ => return Err( protocol_error!("invalid multibulk length"))
            };

            let mut args = Vec::with_capacity(n);
            for _ in 0..n {
                match read_bulk( reader, &mut line).await? {
                    Some(arg) => args.push(arg),
                    None => return Err( protocol_error!("null bulk string in command"))
                }
            }
            return checked_verb( args)

        } else {
            // inline command
            let args: Vec<Vec<u8>> = line.split(|b| b.is_ascii_whitespace())
                .filter(|arg| !arg.is_empty())
                .map(|arg| arg.to_vec())
                .collect();
            if !args.is_empty() {
                return checked_verb( args)
            }
        }
    }
}

// arguments can be binary but the command verb has to be text
fn checked_verb (args: Vec<Vec<u8>>)->Result<Option<Vec<Vec<u8>>>> {
    match args.first() {
        Some(verb) if std::str::from_utf8( verb).is_err() => Err( protocol_error!("command verb is not UTF-8")),
        _ => Ok( Some(args))
    }
}

/// read a server reply (client side)
pub async fn read_reply<R> (reader: &mut R)->Result<Reply> where R: AsyncBufRead + Unpin {
    let mut line = Vec::with_capacity(128);
    if !read_line( reader, &mut line).await? {
        return Err( unexpected_eof())
    }

    let (prefix, rest) = match line.split_first() {
        Some((prefix,rest)) => (*prefix, rest),
        None => return Err( protocol_error!("empty reply line"))
    };

    match prefix {
        b'+' => Ok( Reply::Simple( String::from_utf8_lossy( rest).into_owned())),
        b'-' => Ok( Reply::Error( String::from_utf8_lossy( rest).into_owned())),
        b'$' => match parse_len( rest) {
            Some(-1) => Ok( Reply::Null),
            Some(len) if len >= 0 && (len as usize) <= MAX_BULK_LEN => Ok( Reply::Bulk( read_bulk_data( reader, len as usize).await?)),
            _ => Err( protocol_error!("invalid bulk length"))
        }
        b'*' => match parse_len( rest) {
            Some(-1) => Ok( Reply::Null),
            Some(n) if n >= 0 && (n as usize) <= MAX_ARGS => {
                let mut items = Vec::with_capacity( n as usize);
                for _ in 0..n {
                    match read_bulk( reader, &mut line).await? {
                        Some(data) => items.push( String::from_utf8(data).map_err(|_| protocol_error!("array element is not UTF-8"))?),
                        None => return Err( protocol_error!("null array element"))
                    }
                }
                Ok( Reply::Array(items))
            }
            _ => Err( protocol_error!("invalid multibulk length"))
        }
        other => Err( protocol_error!("unsupported reply type '{}'", other as char))
    }
}

/* #endregion reading */

/// encode a command as RESP array of bulk strings
pub fn encode_command<S: AsRef<str>> (args: &[S])->Vec<u8> {
    let mut buf = Vec::with_capacity(64);
    buf.extend_from_slice( format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        write_bulk( &mut buf, arg.as_ref().as_bytes());
    }
    buf
}

pub async fn write_command<W,S> (writer: &mut W, args: &[S])->Result<()> where W: AsyncWrite + Unpin, S: AsRef<str> {
    writer.write_all( &encode_command( args)).await?;
    writer.flush().await?;
    Ok(())
}
