//! slot-scout CLI
//!
//! Resolves one slot query against the booking widget and prints the open
//! slots as a JSON array on stdout. An empty result is still a successful
//! exit; set RUST_LOG to see what the flow is doing.

use clap::Parser;
use slot_scout::{
    AppointmentType, ChromeDriver, DateSpec, DriverOptions, OrchestratorConfig, PatientType, Slot,
    SlotQueryOrchestrator, SlotRequest,
};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "slot-scout", version, about = "Discover open booking slots on the scheduling widget")]
struct Cli {
    /// Patient type ("new patient" or "returning patient")
    #[arg(long, default_value = "New Patient")]
    patient_type: PatientType,

    /// Appointment type ("new appointment", "emergency appointment" or
    /// "invisalign consultation")
    #[arg(long, default_value = "New appointment")]
    appointment_type: AppointmentType,

    /// Only return slots for this date (YYYY-MM-DD)
    #[arg(long)]
    date: Option<DateSpec>,

    /// Booking page URL
    #[arg(long)]
    url: Option<String>,

    /// Directory for diagnostic snapshots
    #[arg(long, default_value = "screenshots")]
    screenshots: PathBuf,

    /// Launch the browser with a visible window
    #[arg(long)]
    headed: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut request = SlotRequest::new(cli.patient_type, cli.appointment_type);
    if let Some(date) = cli.date {
        request = request.with_date(date);
    }

    let mut config = OrchestratorConfig::default();
    if let Some(url) = cli.url {
        config.flow.booking_url = url;
    }
    config.snapshot_dir = cli.screenshots;

    let driver = ChromeDriver::new(DriverOptions::new().headless(!cli.headed));
    let orchestrator = SlotQueryOrchestrator::new(driver, config);

    let slots = orchestrator.resolve(&request).await;

    // Placeholder entries pad out the widget's grid; only bookable slots
    // are worth printing.
    let bookable: Vec<&Slot> = slots
        .iter()
        .filter(|slot| slot.machine_datetime.is_some())
        .collect();

    println!("Available slots:");
    println!("{}", serde_json::to_string_pretty(&bookable)?);

    Ok(())
}
