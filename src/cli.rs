use std::time::Duration;

use clap::{Parser, Subcommand};
use reqwest::Url;

use crate::{
    api::ree,
    core::{
        advisor::{SummaryRequest, WindowRequest},
        hour_range::Hour,
    },
    prelude::*,
    quantity::{energy::KilowattHours, power::Kilowatts},
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    /// Enable the debug logging.
    #[clap(long, global = true)]
    pub debug: bool,

    #[clap(flatten)]
    pub ree: ReeArgs,

    #[clap(flatten)]
    pub charger: ChargerArgs,

    /// Serves the tools over standard I/O when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Args {
    pub const fn max_level(&self) -> Level {
        if self.debug { Level::DEBUG } else { Level::INFO }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Serve the charging advisor tools over standard input and output.
    #[clap(name = "serve")]
    Serve,

    /// Development tools.
    #[clap(name = "burrow")]
    Burrow(Box<BurrowArgs>),
}

#[derive(Parser)]
pub struct ReeArgs {
    /// Red Eléctrica «REData» API base URL.
    #[clap(
        long = "ree-base-url",
        env = "REE_BASE_URL",
        default_value = "https://apidatos.ree.es/es/datos"
    )]
    pub base_url: Url,

    #[clap(long = "ree-timeout-secs", env = "REE_TIMEOUT_SECS", default_value = "30")]
    pub timeout_secs: u64,
}

impl ReeArgs {
    pub fn try_new_client(&self) -> Result<ree::Api> {
        ree::Api::new(&self.base_url, Duration::from_secs(self.timeout_secs))
    }
}

#[derive(Copy, Clone, Parser)]
pub struct ChargerArgs {
    /// Charger power in kilowatts, a single-phase AC wallbox by default.
    #[clap(
        long = "charger-power-kilowatts",
        env = "CHARGER_POWER_KILOWATTS",
        default_value = "7.4"
    )]
    pub power: Kilowatts,
}

#[derive(Parser)]
pub struct BurrowArgs {
    #[command(subcommand)]
    pub command: BurrowCommand,
}

#[derive(Subcommand)]
pub enum BurrowCommand {
    /// Fetch and print the hourly prices of the day.
    Prices(PricesArgs),

    /// Find the cheapest charging window of the day.
    Advise(AdviseArgs),
}

#[derive(Parser)]
pub struct PricesArgs {
    /// `YYYY-MM-DD`, today by default.
    #[clap(long)]
    pub date: Option<String>,
}

impl From<PricesArgs> for SummaryRequest {
    fn from(args: PricesArgs) -> Self {
        Self { date: args.date }
    }
}

#[derive(Parser)]
pub struct AdviseArgs {
    /// `YYYY-MM-DD`, today by default.
    #[clap(long)]
    pub date: Option<String>,

    /// First allowed hour.
    #[clap(long, default_value = "22")]
    pub start_hour: Hour,

    /// Last allowed hour, inclusive.
    #[clap(long, default_value = "7")]
    pub end_hour: Hour,

    /// Energy to charge.
    #[clap(long = "kwh", default_value = "10")]
    pub energy: KilowattHours,
}

impl From<AdviseArgs> for WindowRequest {
    fn from(args: AdviseArgs) -> Self {
        Self {
            date: args.date,
            start_hour: args.start_hour,
            end_hour: args.end_hour,
            energy: args.energy,
        }
    }
}
