use super::duration::{parse_duration, sort_thresholds, ParseError};
use super::timestamp::shift_forward;
use chrono::NaiveDateTime;

/// Age thresholds driving the lifecycle, all measured from `renewed_at`.
///
/// Notify ages are sorted once, here, and kept as literals so they can be
/// logged and reported the way they were configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    notify_ages: Vec<String>,
    decommission_age: String,
    destroy_age: String,
}

impl Schedule {
    pub fn new(
        mut notify_ages: Vec<String>,
        decommission_age: impl Into<String>,
        destroy_age: impl Into<String>,
    ) -> Self {
        sort_thresholds(&mut notify_ages);
        Self {
            notify_ages,
            decommission_age: decommission_age.into(),
            destroy_age: destroy_age.into(),
        }
    }

    pub fn notify_ages(&self) -> &[String] {
        &self.notify_ages
    }

    pub fn smallest_notify_age(&self) -> Option<&str> {
        self.notify_ages.first().map(String::as_str)
    }

    pub fn decommission_age(&self) -> &str {
        &self.decommission_age
    }

    pub fn destroy_age(&self) -> &str {
        &self.destroy_age
    }

    /// The instant a resource renewed at `renewed_at` gets decommissioned.
    pub fn decommission_at(&self, renewed_at: NaiveDateTime) -> Result<NaiveDateTime, ParseError> {
        shift_forward(renewed_at, parse_duration(&self.decommission_age)?)
    }

    pub fn destroy_at(&self, renewed_at: NaiveDateTime) -> Result<NaiveDateTime, ParseError> {
        shift_forward(renewed_at, parse_duration(&self.destroy_age)?)
    }

    /// Whether every notify age precedes the decommission age, which in turn
    /// precedes the destroy age.
    pub fn is_ordered(&self) -> bool {
        let (Ok(decommission), Ok(destroy)) = (
            parse_duration(&self.decommission_age),
            parse_duration(&self.destroy_age),
        ) else {
            return false;
        };
        decommission < destroy
            && self
                .notify_ages
                .iter()
                .all(|age| matches!(parse_duration(age), Ok(notify) if notify < decommission))
    }
}
