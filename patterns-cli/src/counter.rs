// Copyright (c) 2020-present, UMD Database Group.
//
// This program is free software: you can use, redistribute, and/or modify
// it under the terms of the GNU Affero General Public License, version 3
// or later ("AGPL"), as published by the Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <http://www.gnu.org/licenses/>.

//! Initializes, increments and reads atomic counters.

use anyhow::{bail, Result};
use clap::{App, Arg, ArgMatches};
use log::info;
use patterns::prelude::*;
use rusoto_core::Region;
use rusoto_dynamodb::DynamoDbClient;
use std::str::FromStr;

pub async fn command(matches: &ArgMatches) -> Result<()> {
    let key = matches
        .value_of("key")
        .map(str::to_owned)
        .unwrap_or_else(|| PATTERNS_COUNTER_DEFAULT_KEY.to_string());
    let times = matches
        .value_of("increment")
        .map(|n| n.parse::<usize>())
        .transpose()?
        .unwrap_or(0);

    match matches.value_of("store").unwrap_or("dynamodb") {
        "memory" => {
            let service = CounterService::new(MemoryCounterStore::new());
            run(&service, matches, &key, times).await
        }
        "dynamodb" => {
            let mut table = CounterTable::from_config();
            if let Some(name) = matches.value_of("table") {
                table.table_name = name.to_owned();
            }
            let region = match matches.value_of("region") {
                Some(region) => Region::from_str(region)?,
                None => Region::default(),
            };
            info!("Using table {} in {}", table.table_name, region.name());
            let store = DynamoDbCounterStore::with_client(DynamoDbClient::new(region), table);
            run(&CounterService::new(store), matches, &key, times).await
        }
        other => bail!("unknown counter store: {}", other),
    }
}

async fn run<S: CounterStore>(
    service: &CounterService<S>,
    matches: &ArgMatches,
    key: &str,
    times: usize,
) -> Result<()> {
    if matches.is_present("init") {
        service.initialize(key).await?;
        println!("[OK] counter {} initialized", key);
    }
    for _ in 0..times {
        println!("{}", service.increment(key).await?);
    }
    if matches.is_present("get") {
        match service.get(key).await? {
            Some(record) => println!("{}", serde_json::to_string(&record)?),
            None => println!("[--] counter {} does not exist", key),
        }
    }
    Ok(())
}

pub fn command_args() -> App<'static> {
    App::new("counter")
        .about("Operates atomic counters")
        .arg(
            Arg::new("key")
                .short('k')
                .long("key")
                .value_name("KEY")
                .help("The counter key [default: system-aa]")
                .takes_value(true),
        )
        .arg(
            Arg::new("init")
                .short('i')
                .long("init")
                .help("Creates the counter with value 1 unless it exists"),
        )
        .arg(
            Arg::new("increment")
                .short('n')
                .long("increment")
                .value_name("TIMES")
                .help("Increments the counter and prints each prior value")
                .takes_value(true),
        )
        .arg(
            Arg::new("get")
                .short('g')
                .long("get")
                .help("Prints the counter"),
        )
        .arg(
            Arg::new("store")
                .short('s')
                .long("store")
                .value_name("STORE")
                .possible_values(["dynamodb", "memory"])
                .help("Where counters live; memory counters vanish on exit [default: dynamodb]")
                .takes_value(true),
        )
        .arg(
            Arg::new("table")
                .long("table")
                .value_name("TABLE")
                .help("Overrides the DynamoDB table name")
                .takes_value(true),
        )
        .arg(
            Arg::new("region")
                .short('r')
                .long("region")
                .value_name("REGION")
                .help("The AWS region of the table")
                .takes_value(true),
        )
}
