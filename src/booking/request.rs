use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::str::FromStr;

/// Whether the visitor has been seen by the practice before
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatientType {
    NewPatient,
    ReturningPatient,
}

impl PatientType {
    /// The label the widget renders for this option
    pub fn display_label(&self) -> &'static str {
        match self {
            PatientType::NewPatient => "New Patient",
            PatientType::ReturningPatient => "Returning Patient",
        }
    }
}

impl fmt::Display for PatientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_label())
    }
}

impl FromStr for PatientType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', " ").as_str() {
            "new patient" | "new" => Ok(PatientType::NewPatient),
            "returning patient" | "returning" => Ok(PatientType::ReturningPatient),
            other => Err(format!("unknown patient type: {other:?}")),
        }
    }
}

/// The reason for the visit, as offered by the widget's reason selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppointmentType {
    NewAppointment,
    Emergency,
    InvisalignConsultation,
}

impl AppointmentType {
    /// The label the caller-facing side uses for this option
    pub fn display_label(&self) -> &'static str {
        match self {
            AppointmentType::NewAppointment => "New appointment",
            AppointmentType::Emergency => "Emergency appointment",
            AppointmentType::InvisalignConsultation => "Invisalign consultation",
        }
    }
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_label())
    }
}

impl FromStr for AppointmentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', " ").as_str() {
            "new appointment" | "new" => Ok(AppointmentType::NewAppointment),
            "emergency appointment" | "emergency" => Ok(AppointmentType::Emergency),
            "invisalign consultation" | "invisalign" => Ok(AppointmentType::InvisalignConsultation),
            other => Err(format!("unknown appointment type: {other:?}")),
        }
    }
}

/// A full calendar date the caller wants slots for.
///
/// The widget's calendar only renders day-of-month numbers, so the day
/// component is what drives calendar interaction; the full date is kept for
/// labeling the extracted slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateSpec(NaiveDate);

impl DateSpec {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Day-of-month as shown in the calendar grid
    pub fn day(&self) -> u32 {
        self.0.day()
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for DateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // NaiveDate renders as YYYY-MM-DD
        write!(f, "{}", self.0)
    }
}

impl FromStr for DateSpec {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(NaiveDate::from_str(s)?))
    }
}

/// One slot query. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotRequest {
    pub patient_type: PatientType,
    pub appointment_type: AppointmentType,
    pub date_preference: Option<DateSpec>,
}

impl SlotRequest {
    pub fn new(patient_type: PatientType, appointment_type: AppointmentType) -> Self {
        Self {
            patient_type,
            appointment_type,
            date_preference: None,
        }
    }

    pub fn with_date(mut self, date: DateSpec) -> Self {
        self.date_preference = Some(date);
        self
    }

    /// Whether the query is narrowed to a single date
    pub fn is_filtered(&self) -> bool {
        self.date_preference.is_some()
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey(self.patient_type, self.appointment_type, self.date_preference)
    }
}

impl fmt::Display for SlotRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.date_preference {
            Some(date) => write!(
                f,
                "{} / {} on {}",
                self.patient_type, self.appointment_type, date
            ),
            None => write!(f, "{} / {}", self.patient_type, self.appointment_type),
        }
    }
}

/// Positional identity of a request: two requests with identical fields
/// collide to the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey(PatientType, AppointmentType, Option<DateSpec>);

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> DateSpec {
        s.parse().unwrap()
    }

    #[test]
    fn test_identical_requests_share_a_key() {
        let a = SlotRequest::new(PatientType::NewPatient, AppointmentType::NewAppointment);
        let b = SlotRequest::new(PatientType::NewPatient, AppointmentType::NewAppointment);
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_date_preference_changes_the_key() {
        let base = SlotRequest::new(PatientType::NewPatient, AppointmentType::NewAppointment);
        let filtered = base.clone().with_date(date("2024-09-25"));
        assert_ne!(base.cache_key(), filtered.cache_key());

        let other_day = base.clone().with_date(date("2024-09-26"));
        assert_ne!(filtered.cache_key(), other_day.cache_key());
    }

    #[test]
    fn test_fields_are_positional() {
        let a = SlotRequest::new(PatientType::NewPatient, AppointmentType::Emergency);
        let b = SlotRequest::new(PatientType::ReturningPatient, AppointmentType::Emergency);
        assert_ne!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_patient_type_from_str() {
        assert_eq!(
            "New Patient".parse::<PatientType>().unwrap(),
            PatientType::NewPatient
        );
        assert_eq!(
            "returning-patient".parse::<PatientType>().unwrap(),
            PatientType::ReturningPatient
        );
        assert!("walk-in".parse::<PatientType>().is_err());
    }

    #[test]
    fn test_appointment_type_from_str() {
        assert_eq!(
            "Emergency appointment".parse::<AppointmentType>().unwrap(),
            AppointmentType::Emergency
        );
        assert_eq!(
            "invisalign".parse::<AppointmentType>().unwrap(),
            AppointmentType::InvisalignConsultation
        );
        assert!("cleaning".parse::<AppointmentType>().is_err());
    }

    #[test]
    fn test_date_spec_day_and_display() {
        let d = date("2024-09-25");
        assert_eq!(d.day(), 25);
        assert_eq!(d.to_string(), "2024-09-25");
    }
}
