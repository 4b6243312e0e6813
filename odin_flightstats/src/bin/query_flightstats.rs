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

use anyhow::{Result,anyhow};
use clap::Parser;
use tokio::{net::TcpStream, io::BufReader};
use odin_flightstats::resp::{self,Reply};

#[derive(Parser,Debug)]
#[command(version, about = "send a query to a running flightstats server")]
pub struct Args {
    /// server address
    #[arg(short, long, default_value = "127.0.0.1:6060")]
    pub addr: String,

    /// command and arguments (e.g. PING, STATS, FLIGHTS, GET <id>)
    #[arg(num_args = 1.., required = true)]
    pub command: Vec<String>,
}

#[tokio::main]
async fn main()->Result<()> {
    let args = Args::parse();

    let stream = TcpStream::connect( &args.addr).await?;
    let (rd, mut wr) = stream.into_split();
    let mut reader = BufReader::new( rd);

    resp::write_command( &mut wr, &args.command).await?;

    match resp::read_reply( &mut reader).await? {
        Reply::Simple(s) => println!("{s}"),
        Reply::Bulk(data) => {
            match serde_json::from_slice::<serde_json::Value>( &data) {
                Ok(v) => println!("{}", serde_json::to_string_pretty( &v)?),
                Err(_) => println!("{}", String::from_utf8_lossy( &data))
            }
        }
        Reply::Array(items) => {
            if items.is_empty() { println!("(empty array)") }
            for (i,item) in items.iter().enumerate() {
                println!("{}) {}", i+1, item);
            }
        }
        Reply::Null => println!("(nil)"),
        Reply::Error(msg) => return Err( anyhow!("{msg}"))
    }

    Ok(())
}
