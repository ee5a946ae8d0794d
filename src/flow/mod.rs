//! Flow state machine for the booking widget.
//!
//! The steps run in strict linear order, each a precondition for the next:
//! navigate, select patient type, select appointment type, optionally set a
//! date preference, extract slots. There is no skipping and no going back;
//! any step can fail into a [`FlowError`] tagged with the step it came from.
//!
//! Cross-cutting rule: every failing step leaves forensic evidence. The
//! session is torn down right after an attempt, so a diagnostic snapshot is
//! captured through it before the failure propagates. Invalid input is the
//! exception: that is a caller error, not a UI fault, and is rejected before
//! a session even exists.

pub mod selectors;

pub use selectors::{BOOKING_URL, WidgetSelectors};

use crate::booking::{AppointmentType, DateSpec, PatientType, Slot, SlotRequest};
use crate::diagnostics::SnapshotSink;
use crate::driver::WidgetSession;
use crate::error::{DriverError, FlowError, FlowErrorKind, Result};
use std::fmt;
use std::time::Duration;

/// The steps of the booking flow, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowStep {
    Navigate,
    SelectPatientType,
    SelectAppointmentType,
    SetDatePreference,
    ExtractSlots,
}

impl FlowStep {
    /// Snake-case name used for logging and snapshot file tags
    pub fn name(&self) -> &'static str {
        match self {
            FlowStep::Navigate => "navigate",
            FlowStep::SelectPatientType => "select_patient_type",
            FlowStep::SelectAppointmentType => "select_appointment_type",
            FlowStep::SetDatePreference => "set_date_preference",
            FlowStep::ExtractSlots => "extract_slots",
        }
    }
}

impl fmt::Display for FlowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Timeouts and bounds for one pass through the flow
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Booking page to open
    pub booking_url: String,

    /// Navigation deadline, load included
    pub navigation_timeout: Duration,

    /// Wait for a patient-type option to become interactable
    pub option_timeout: Duration,

    /// Wait for the remaining controls (Continue, reason list, calendar)
    pub selector_timeout: Duration,

    /// Wait for the page to settle after a selection
    pub quiescence_timeout: Duration,

    /// Wait for the slot region to render before extraction
    pub slot_timeout: Duration,

    /// How many times the calendar may be paged forward looking for the
    /// requested day
    pub calendar_page_attempts: u32,

    /// Settle wait between calendar pages
    pub calendar_settle: Duration,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            booking_url: BOOKING_URL.to_string(),
            navigation_timeout: Duration::from_secs(60),
            option_timeout: Duration::from_secs(20),
            selector_timeout: Duration::from_secs(10),
            quiescence_timeout: Duration::from_secs(20),
            slot_timeout: Duration::from_secs(10),
            calendar_page_attempts: 3,
            calendar_settle: Duration::from_millis(500),
        }
    }
}

/// One pass through the booking UI on a dedicated session.
///
/// The flow borrows the session exclusively; the orchestrator tears the
/// session down after `run` returns, success or not.
pub struct BookingFlow<'a, S: WidgetSession> {
    session: &'a mut S,
    selectors: &'a WidgetSelectors,
    config: &'a FlowConfig,
    sink: &'a SnapshotSink,
}

impl<'a, S: WidgetSession> BookingFlow<'a, S> {
    pub fn new(
        session: &'a mut S,
        selectors: &'a WidgetSelectors,
        config: &'a FlowConfig,
        sink: &'a SnapshotSink,
    ) -> Self {
        Self {
            session,
            selectors,
            config,
            sink,
        }
    }

    /// Run the flow to completion for one request.
    ///
    /// An empty slot list is a valid success; `Err` means the UI could not
    /// be driven through all steps, with a snapshot already captured.
    pub async fn run(&mut self, request: &SlotRequest) -> Result<Vec<Slot>> {
        match self.run_steps(request).await {
            Ok(slots) => Ok(slots),
            Err(err) => {
                log::error!("flow failed at {}: {}", err.step, err.kind);
                if err.is_retryable() {
                    self.sink.capture(&mut *self.session, err.step).await;
                }
                Err(err)
            }
        }
    }

    async fn run_steps(&mut self, request: &SlotRequest) -> Result<Vec<Slot>> {
        self.navigate().await?;
        self.select_patient_type(request.patient_type).await?;
        self.select_appointment_type(request.appointment_type).await?;

        match request.date_preference {
            Some(date) => {
                self.set_date_preference(date).await?;
                self.extract_slots_for_date(date).await
            }
            None => self.extract_all_slots().await,
        }
    }

    async fn navigate(&mut self) -> Result<()> {
        log::debug!("navigating to {}", self.config.booking_url);
        let status = self
            .session
            .goto(&self.config.booking_url, self.config.navigation_timeout)
            .await
            .map_err(|e| step_error(FlowStep::Navigate, e))?;

        if !(200..300).contains(&status) {
            return Err(FlowError::new(
                FlowStep::Navigate,
                FlowErrorKind::NavigationFailed(status),
            ));
        }

        log::info!("navigated to scheduling page (status {status})");
        Ok(())
    }

    async fn select_patient_type(&mut self, patient_type: PatientType) -> Result<()> {
        log::debug!("selecting patient type: {patient_type}");
        let step = FlowStep::SelectPatientType;

        let option = self
            .selectors
            .patient_option(patient_type)
            .ok_or_else(|| {
                FlowError::new(
                    step,
                    FlowErrorKind::InvalidInput(format!("unknown patient type: {patient_type:?}")),
                )
            })?
            .to_string();

        self.wait_and_click(&option, self.config.option_timeout, step).await?;

        let continue_button = self.selectors.continue_button.clone();
        self.wait_and_click(&continue_button, self.config.selector_timeout, step)
            .await?;

        self.session
            .wait_for_quiescence(self.config.quiescence_timeout)
            .await
            .map_err(|e| step_error(step, e))?;

        log::info!("selected patient type: {patient_type}");
        Ok(())
    }

    async fn select_appointment_type(
        &mut self,
        appointment_type: AppointmentType,
    ) -> Result<()> {
        log::debug!("selecting appointment type: {appointment_type}");
        let step = FlowStep::SelectAppointmentType;

        let option = self
            .selectors
            .appointment_option(appointment_type)
            .ok_or_else(|| {
                FlowError::new(
                    step,
                    FlowErrorKind::InvalidInput(format!(
                        "unknown appointment type: {appointment_type:?}"
                    )),
                )
            })?
            .to_string();

        let opener = self.selectors.reason_opener.clone();
        self.wait_and_click(&opener, self.config.selector_timeout, step).await?;
        self.wait_and_click(&option, self.config.selector_timeout, step).await?;

        self.session
            .wait_for_quiescence(self.config.quiescence_timeout)
            .await
            .map_err(|e| step_error(step, e))?;

        log::info!("selected appointment type: {appointment_type}");
        Ok(())
    }

    /// Locate and click the requested day in the calendar, paging forward
    /// month-by-month when it is not in the displayed month
    async fn set_date_preference(&mut self, date: DateSpec) -> Result<()> {
        log::debug!("setting date preference: {date}");
        let step = FlowStep::SetDatePreference;
        let day = date.day().to_string();

        self.session
            .wait_for_visible(&self.selectors.date_cells, self.config.selector_timeout)
            .await
            .map_err(|e| step_error(step, e))?;

        for page in 0..=self.config.calendar_page_attempts {
            let cells = self
                .session
                .query_all(&self.selectors.date_cells)
                .await
                .map_err(|e| step_error(step, e))?;

            if let Some(cell) = cells.iter().find(|c| c.text().trim() == day) {
                self.session
                    .click_element(cell.locator())
                    .await
                    .map_err(|e| step_error(step, e))?;
                self.session
                    .wait_for_quiescence(self.config.quiescence_timeout)
                    .await
                    .map_err(|e| step_error(step, e))?;
                log::info!("selected date {date}");
                return Ok(());
            }

            if page == self.config.calendar_page_attempts {
                break;
            }

            log::debug!("day {day} not in displayed month, paging calendar forward");
            self.session
                .click(&self.selectors.next_month)
                .await
                .map_err(|e| step_error(step, e))?;
            tokio::time::sleep(self.config.calendar_settle).await;
        }

        Err(FlowError::new(
            step,
            FlowErrorKind::DatePreference(format!(
                "day {day} not found within {} calendar pages",
                self.config.calendar_page_attempts
            )),
        ))
    }

    /// Enumerate every date column and its rendered time elements.
    ///
    /// A missing slot region is a valid outcome (no availability), not a
    /// flow failure; a snapshot is still left for inspection.
    async fn extract_all_slots(&mut self) -> Result<Vec<Slot>> {
        log::debug!("extracting available slots");
        let step = FlowStep::ExtractSlots;

        match self
            .session
            .wait_for_visible(&self.selectors.slot_region, self.config.slot_timeout)
            .await
        {
            Ok(()) => {}
            Err(DriverError::Timeout(msg)) => {
                log::error!("slot region never rendered: {msg}");
                self.sink.capture(&mut *self.session, step).await;
                return Ok(Vec::new());
            }
            Err(fault) => return Err(step_error(step, fault)),
        }

        let columns = self
            .session
            .query_all(&self.selectors.slot_region)
            .await
            .map_err(|e| step_error(step, e))?;

        let mut slots = Vec::new();
        for column in &columns {
            let day = self
                .session
                .query_within(column.locator(), &self.selectors.column_day)
                .await
                .map_err(|e| step_error(step, e))?
                .first()
                .map(|el| el.text().trim().to_string());
            let date_num = self
                .session
                .query_within(column.locator(), &self.selectors.column_date_num)
                .await
                .map_err(|e| step_error(step, e))?
                .first()
                .map(|el| el.text().trim().to_string());

            let date_label = match (day, date_num) {
                (Some(day), Some(num)) => format!("{day} {num}"),
                (Some(day), None) => day,
                (None, Some(num)) => num,
                (None, None) => String::new(),
            };

            let times = self
                .session
                .query_within(column.locator(), &self.selectors.column_times)
                .await
                .map_err(|e| step_error(step, e))?;

            for el in &times {
                let machine = el
                    .attribute(&self.selectors.time_attribute)
                    .map(str::to_string);
                let slot = Slot::from_rendered(&date_label, el.text(), machine);
                log::debug!("slot found: {} {} ({:?})", slot.date, slot.time, slot.machine_datetime);
                slots.push(slot);
            }
        }

        log::info!(
            "extracted {} slots across {} date columns",
            slots.len(),
            columns.len()
        );
        Ok(slots)
    }

    /// Enumerate only the time elements under the active date column
    async fn extract_slots_for_date(&mut self, date: DateSpec) -> Result<Vec<Slot>> {
        log::debug!("extracting available slots for {date}");
        let step = FlowStep::ExtractSlots;

        match self
            .session
            .wait_for_visible(&self.selectors.active_day_times, self.config.slot_timeout)
            .await
        {
            Ok(()) => {}
            Err(DriverError::Timeout(msg)) => {
                log::error!("no slots rendered for {date}: {msg}");
                self.sink.capture(&mut *self.session, step).await;
                return Ok(Vec::new());
            }
            Err(fault) => return Err(step_error(step, fault)),
        }

        let times = self
            .session
            .query_all(&self.selectors.active_day_times)
            .await
            .map_err(|e| step_error(step, e))?;

        let date_label = date.to_string();
        let slots: Vec<Slot> = times
            .iter()
            .map(|el| {
                let machine = el
                    .attribute(&self.selectors.time_attribute)
                    .map(str::to_string);
                Slot::from_rendered(&date_label, el.text(), machine)
            })
            .collect();

        log::info!("extracted {} slots for {date}", slots.len());
        Ok(slots)
    }

    async fn wait_and_click(
        &mut self,
        selector: &str,
        timeout: Duration,
        step: FlowStep,
    ) -> Result<()> {
        self.session
            .wait_for_visible(selector, timeout)
            .await
            .map_err(|e| step_error(step, e))?;
        self.session
            .click(selector)
            .await
            .map_err(|e| step_error(step, e))?;
        Ok(())
    }
}

/// Map a driver failure to the flow error taxonomy for the step it hit
fn step_error(step: FlowStep, err: DriverError) -> FlowError {
    let kind = match err {
        DriverError::Timeout(message) => match step {
            FlowStep::Navigate => FlowErrorKind::NavigationTimeout,
            FlowStep::SelectPatientType | FlowStep::SelectAppointmentType => {
                FlowErrorKind::SelectionTimeout(step.name().to_string())
            }
            FlowStep::SetDatePreference => FlowErrorKind::DatePreference(message),
            FlowStep::ExtractSlots => FlowErrorKind::DriverFault(message),
        },
        DriverError::Fault(message) => FlowErrorKind::DriverFault(message),
    };
    FlowError::new(step, kind)
}
