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

//! The command line tool for the serverless patterns.

mod args;
mod counter;
mod workflow;

use anyhow::Result;
use clap::{crate_version, App};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = App::new("patterns-cli")
        .version(crate_version!())
        .about("Evaluates pizza orders and operates atomic counters")
        .args(args::get_args())
        .subcommand(workflow::command_args())
        .subcommand(counter::command_args())
        .arg_required_else_help(true)
        .get_matches();

    let sub_matches = matches.subcommand().map(|(_, sub)| sub).unwrap_or(&matches);
    args::get_logging(&matches, sub_matches)?.init();

    match matches.subcommand() {
        Some(("workflow", sub)) => workflow::command(sub),
        Some(("counter", sub)) => counter::command(sub).await,
        _ => Ok(()),
    }
}
