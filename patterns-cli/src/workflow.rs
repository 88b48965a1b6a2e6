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

//! Evaluates pizza orders locally and prints the state machine definition.

use anyhow::{Context, Result};
use clap::{App, Arg, ArgMatches};
use log::info;
use patterns::pizza::{definition_with_type, PizzaWorkflow};
use patterns::prelude::*;
use serde_json::Value;

pub fn command(matches: &ArgMatches) -> Result<()> {
    if matches.is_present("definition") {
        let kind = match matches.value_of("type") {
            Some(kind) => kind.parse::<StateMachineType>()?,
            None => PATTERNS_WORKFLOW_TYPE.parse::<StateMachineType>()?,
        };
        let machine = definition_with_type(kind)?;
        info!("{} state machine with {} states", machine.kind, machine.states.len());
        println!("{}", serde_json::to_string_pretty(&machine.to_asl())?);
        return Ok(());
    }

    let workflow = PizzaWorkflow::new()?;
    if let Some(input) = matches.value_of("json") {
        let input: Value = serde_json::from_str(input).context("workflow input is not JSON")?;
        println!(
            "{}",
            serde_json::to_string_pretty(&workflow.evaluate_json(&input)?)?
        );
    } else {
        let flavour = matches
            .value_of("flavour")
            .map(str::to_owned)
            .unwrap_or_else(|| PATTERNS_DEFAULT_FLAVOUR.to_string());
        let result = workflow.evaluate(&WorkflowInput::new(flavour))?;
        println!("{}", serde_json::to_string_pretty(&result)?);
    }
    Ok(())
}

pub fn command_args() -> App<'static> {
    App::new("workflow")
        .about("Evaluates pizza orders with the pizzeria state machine")
        .arg(
            Arg::new("flavour")
                .short('f')
                .long("flavour")
                .value_name("FLAVOUR")
                .help("The ordered flavour [default: pepperoni]")
                .takes_value(true),
        )
        .arg(
            Arg::new("json")
                .short('j')
                .long("json")
                .value_name("INPUT")
                .help("Evaluates a raw workflow input, e.g. '{\"flavour\":{\"containsPineapple\":true}}'")
                .takes_value(true)
                .conflicts_with("flavour"),
        )
        .arg(
            Arg::new("definition")
                .short('d')
                .long("definition")
                .help("Prints the state machine as Amazon States Language"),
        )
        .arg(
            Arg::new("type")
                .short('t')
                .long("type")
                .value_name("TYPE")
                .possible_values(["STANDARD", "EXPRESS"])
                .help("The workflow type of the printed definition")
                .takes_value(true)
                .requires("definition"),
        )
}
