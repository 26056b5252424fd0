#![doc = include_str!("../README.md")]
#![allow(clippy::doc_markdown)]

mod api;
mod cli;
mod core;
mod error;
mod mcp;
mod prelude;
mod quantity;
mod tables;

use std::{io::stderr, process::exit, sync::Arc};

use clap::{Parser, crate_version};
use tokio::io::{BufReader, stdin, stdout};

use crate::{
    cli::{Args, BurrowCommand, Command},
    core::advisor::ChargingAdvisor,
    mcp::Server,
    prelude::*,
    quantity::power::Kilowatts,
    tables::{build_prices_table, build_recommendation_table},
};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    tracing_subscriber::fmt()
        .without_time()
        .compact()
        .with_max_level(args.max_level())
        .with_writer(stderr)
        .init();
    info!(version = crate_version!(), "starting…");

    let code = match run(args).await {
        Ok(()) => {
            info!("done!");
            0
        }
        Err(error) => {
            error!("fatal: {error:#}");
            1
        }
    };
    // The blocking stdin reader would otherwise hold the runtime until the next line.
    exit(code);
}

async fn run(args: Args) -> Result {
    ensure!(args.charger.power > Kilowatts::ZERO, "charger power must be positive");
    let source = Arc::new(args.ree.try_new_client()?);
    let advisor = ChargingAdvisor::new(source, args.charger.power);

    match args.command {
        None | Some(Command::Serve) => serve(advisor).await,
        Some(Command::Burrow(burrow)) => match burrow.command {
            BurrowCommand::Prices(prices_args) => {
                let summary = advisor.daily_summary(&prices_args.into()).await?;
                println!("{}", build_prices_table(&summary));
                println!("{}", serde_json::to_string_pretty(&summary)?);
                Ok(())
            }
            BurrowCommand::Advise(advise_args) => {
                let recommendation = advisor.best_window(&advise_args.into()).await?;
                println!("{}", build_recommendation_table(&recommendation));
                println!("{}", recommendation.explanation);
                println!("{}", serde_json::to_string_pretty(&recommendation)?);
                Ok(())
            }
        },
    }
}

async fn serve(advisor: ChargingAdvisor) -> Result {
    let server = Server::new(advisor);
    tokio::select! {
        result = server.serve(BufReader::new(stdin()), stdout()) => result,
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for Ctrl+C")?;
            info!("interrupted, shutting down…");
            Ok(())
        }
    }
}
