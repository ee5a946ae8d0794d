use serde::{Deserialize, Serialize};

/// Time shown for a slot element that carries no readable text.
///
/// The widget renders empty grid cells as non-breaking spaces; keeping them
/// preserves positional parity with what the page displays.
pub const EMPTY_TIME_PLACEHOLDER: &str = "\u{00A0}";

/// One bookable appointment time offered by the widget for a given date.
///
/// `date` and `time` are human-readable as rendered by the widget;
/// `machine_datetime` is the ISO-like timestamp attribute when the widget
/// exposes one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub date: String,
    pub time: String,
    #[serde(rename = "datetime")]
    pub machine_datetime: Option<String>,
}

impl Slot {
    pub fn new(
        date: impl Into<String>,
        time: impl Into<String>,
        machine_datetime: Option<String>,
    ) -> Self {
        Self {
            date: date.into(),
            time: time.into(),
            machine_datetime,
        }
    }

    /// Build a slot from a rendered widget element.
    ///
    /// An element with readable text keeps that text as its time even when
    /// the machine attribute is missing; an element with neither becomes a
    /// placeholder rather than being dropped.
    pub fn from_rendered(
        date: impl Into<String>,
        text: &str,
        machine_datetime: Option<String>,
    ) -> Self {
        let time = if text.trim().is_empty() {
            EMPTY_TIME_PLACEHOLDER.to_string()
        } else {
            text.to_string()
        };
        Self {
            date: date.into(),
            time,
            machine_datetime,
        }
    }

    /// Whether this slot is a visual placeholder with no bookable content
    pub fn is_placeholder(&self) -> bool {
        self.time == EMPTY_TIME_PLACEHOLDER && self.machine_datetime.is_none()
    }
}
