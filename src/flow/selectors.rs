//! Selector table for the vendor's booking widget.
//!
//! Everything in here is tied to one vendor's markup. The flow only ever
//! addresses the page through this table, so pointing the crate at a
//! different widget revision means editing selectors, not flow logic.

use crate::booking::{AppointmentType, PatientType};
use std::collections::HashMap;

/// Booking page of the practice this crate was written against
pub const BOOKING_URL: &str = "https://onlinebooking.mydentistlink.com/f0398585-a097-4b03-9313-83f79da43804/dafb6490-5320-4145-bf16-8176a195e379";

/// CSS/text selectors and option labels for the booking widget
#[derive(Debug, Clone)]
pub struct WidgetSelectors {
    /// Clickable label per patient type
    pub patient_options: HashMap<PatientType, String>,

    /// Clickable label per appointment type; the widget's reason list shows
    /// exam names, not the caller-facing appointment names
    pub appointment_options: HashMap<AppointmentType, String>,

    /// Confirmation control after picking a patient type
    pub continue_button: String,

    /// Control that opens the reason selector
    pub reason_opener: String,

    /// Day-of-month cells in the calendar grid
    pub date_cells: String,

    /// Control that pages the calendar forward one month
    pub next_month: String,

    /// One column per offered date in the slot grid
    pub slot_region: String,

    /// Weekday label within a date column
    pub column_day: String,

    /// Day-of-month label within a date column
    pub column_date_num: String,

    /// Time elements within a date column
    pub column_times: String,

    /// Time elements of the currently active date, after a date was picked
    pub active_day_times: String,

    /// Attribute carrying the machine-readable timestamp of a time element
    pub time_attribute: String,
}

impl Default for WidgetSelectors {
    fn default() -> Self {
        let patient_options = HashMap::from([
            (PatientType::NewPatient, "text='New Patient'".to_string()),
            (
                PatientType::ReturningPatient,
                "text='Returning Patient'".to_string(),
            ),
        ]);

        let appointment_options = HashMap::from([
            (
                AppointmentType::NewAppointment,
                "text='New Patient Exam - 60 min'".to_string(),
            ),
            (
                AppointmentType::Emergency,
                "text='Emergency Exam - 30 min'".to_string(),
            ),
            (
                AppointmentType::InvisalignConsultation,
                "text='In-office Invisalign Consultation - 60 min'".to_string(),
            ),
        ]);

        Self {
            patient_options,
            appointment_options,
            continue_button: "text='Continue'".to_string(),
            reason_opener: "text='Select a Reason'".to_string(),
            date_cells: "span.ib-booking-dateNum".to_string(),
            next_month: ".ib-booking-calendar-next".to_string(),
            slot_region: ".ib-booking-column".to_string(),
            column_day: ".ib-booking-day".to_string(),
            column_date_num: ".ib-booking-dateNum".to_string(),
            column_times: ".ib-booking-time span[time]".to_string(),
            active_day_times: "div.ib-booking-active + div.ib-booking-times span.ib-booking-active"
                .to_string(),
            time_attribute: "time".to_string(),
        }
    }
}

impl WidgetSelectors {
    pub fn patient_option(&self, patient_type: PatientType) -> Option<&str> {
        self.patient_options.get(&patient_type).map(String::as_str)
    }

    pub fn appointment_option(&self, appointment_type: AppointmentType) -> Option<&str> {
        self.appointment_options
            .get(&appointment_type)
            .map(String::as_str)
    }
}
