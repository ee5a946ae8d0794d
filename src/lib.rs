//! # slot-scout
//!
//! Booking-slot discovery for a third-party appointment-scheduling widget.
//! The crate drives a browser through the widget's multi-step UI flow
//! (patient type, appointment type, optional date) and extracts the open
//! time slots it offers.
//!
//! ## Architecture
//!
//! Two components, leaves first:
//!
//! - **Widget Driver** ([`driver`]): a capability interface over a live
//!   browser page (navigate, wait, click, query, screenshot). The bundled
//!   implementation runs Chrome via CDP, but the orchestrator only sees the
//!   traits, so tests substitute stubs.
//! - **Slot Query Orchestrator** ([`orchestrator`]): sequences the driver
//!   through the [`flow`] state machine, retries with exponential backoff on
//!   failure, caches unfiltered results per request key, and returns a
//!   normalized slot list. Exhausted retries yield an empty list, never an
//!   error.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use slot_scout::{
//!     AppointmentType, ChromeDriver, OrchestratorConfig, PatientType,
//!     SlotQueryOrchestrator, SlotRequest,
//! };
//!
//! # async fn run() {
//! let driver = ChromeDriver::default();
//! let orchestrator = SlotQueryOrchestrator::new(driver, OrchestratorConfig::default());
//!
//! let request = SlotRequest::new(PatientType::NewPatient, AppointmentType::NewAppointment);
//! let slots = orchestrator.resolve(&request).await;
//! println!("found {} open slots", slots.len());
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`booking`]: request and slot data model
//! - [`cache`]: process-lifetime result cache
//! - [`driver`]: Widget Driver capability traits and the Chrome implementation
//! - [`flow`]: the booking flow state machine and the vendor selector table
//! - [`orchestrator`]: retry loop, caching, session lifecycle
//! - [`diagnostics`]: snapshot sink for failure forensics
//! - [`error`]: error types and result aliases

pub mod booking;
pub mod cache;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod flow;
pub mod orchestrator;

pub use booking::{
    AppointmentType, CacheKey, DateSpec, EMPTY_TIME_PLACEHOLDER, PatientType, Slot, SlotRequest,
};
pub use cache::SlotCache;
pub use diagnostics::SnapshotSink;
pub use driver::{
    ChromeDriver, ChromeSession, DriverOptions, ElementHandle, ElementLocator, WidgetDriver,
    WidgetSession,
};
pub use error::{DriverError, DriverResult, FlowError, FlowErrorKind, Result};
pub use flow::{BookingFlow, FlowConfig, FlowStep, WidgetSelectors};
pub use orchestrator::{OrchestratorConfig, SlotQueryOrchestrator};
