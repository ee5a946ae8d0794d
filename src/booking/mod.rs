//! Booking data model
//!
//! This module defines the request and result types of a slot query:
//! - SlotRequest: what the caller wants (patient type, appointment type,
//!   optional date preference), immutable once constructed
//! - CacheKey: the positional identity of a request used by the result cache
//! - Slot: one bookable appointment time as rendered by the widget

pub mod request;
pub mod slot;

pub use request::{AppointmentType, CacheKey, DateSpec, PatientType, SlotRequest};
pub use slot::{EMPTY_TIME_PLACEHOLDER, Slot};
