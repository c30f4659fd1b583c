use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::image::ImageRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Urgency {
	Low,
	#[default]
	Normal,
	Critical,
}

impl Urgency {
	pub fn from_hint(byte: u8) -> Urgency {
		match byte {
			0 => Urgency::Low,
			1 => Urgency::Normal,
			_ => Urgency::Critical,
		}
	}

	pub fn as_hint(self) -> u8 {
		match self {
			Urgency::Low => 0,
			Urgency::Normal => 1,
			Urgency::Critical => 2,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
	/// Sender left it to us (-1 on the wire).
	Default,
	/// Never auto-expire (0 on the wire).
	Never,
	After(Duration),
}

impl Timeout {
	pub fn from_millis(ms: i32) -> Timeout {
		match ms {
			ms if ms < 0 => Timeout::Default,
			0 => Timeout::Never,
			ms => Timeout::After(Duration::from_millis(ms as u64)),
		}
	}

	pub fn as_millis(self) -> i32 {
		match self {
			Timeout::Default => -1,
			Timeout::Never => 0,
			Timeout::After(d) => d.as_millis().min(i32::MAX as u128) as i32,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
	Expired = 1,
	Dismissed = 2,
	Closed = 3,
	Other = 4,
}

impl CloseReason {
	pub fn code(self) -> u32 {
		self as u32
	}

	pub fn from_code(code: u32) -> CloseReason {
		match code {
			1 => CloseReason::Expired,
			2 => CloseReason::Dismissed,
			3 => CloseReason::Closed,
			_ => CloseReason::Other,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRecord {
	pub app_name: Option<String>,
	pub app_icon: Option<String>,
	pub summary: String,
	pub body: Option<String>,
	pub actions: Vec<(String, String)>,
	pub urgency: Urgency,
	pub timeout: Timeout,
	pub image: Option<ImageRef>,
	pub extra: HashMap<String, String>,
	pub created_at: DateTime<Utc>,
}

/// Feedback from the display side back towards the broker.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
	Action(String),
	Close(CloseReason),
}

#[derive(Debug, Clone, Copy)]
pub struct Properties {
	pub name: &'static str,
	pub vendor: &'static str,
	pub version: &'static str,
	pub capabilities: &'static [&'static str],
}

/// Seam to the presentation layer. The scheduler decides what occupies the
/// display slot; whatever renders it implements this.
pub trait Presenter {
	fn show(&mut self, id: u32, record: &NotificationRecord);
	fn refresh(&mut self, id: u32, record: &NotificationRecord);
	fn clear(&mut self);
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn timeout_wire_values() {
		assert_eq!(Timeout::from_millis(-1), Timeout::Default);
		assert_eq!(Timeout::from_millis(0), Timeout::Never);
		assert_eq!(Timeout::from_millis(2500), Timeout::After(Duration::from_millis(2500)));
		assert_eq!(Timeout::from_millis(2500).as_millis(), 2500);
		assert_eq!(Timeout::Default.as_millis(), -1);
		assert_eq!(Timeout::Never.as_millis(), 0);
	}

	#[test]
	fn close_reason_codes() {
		for reason in [CloseReason::Expired, CloseReason::Dismissed, CloseReason::Closed, CloseReason::Other] {
			assert_eq!(CloseReason::from_code(reason.code()), reason);
		}
		assert_eq!(CloseReason::from_code(0), CloseReason::Other);
		assert_eq!(CloseReason::from_code(99), CloseReason::Other);
	}

	#[test]
	fn urgency_clamps_high_bytes() {
		assert_eq!(Urgency::from_hint(0), Urgency::Low);
		assert_eq!(Urgency::from_hint(1), Urgency::Normal);
		assert_eq!(Urgency::from_hint(2), Urgency::Critical);
		assert_eq!(Urgency::from_hint(200), Urgency::Critical);
	}
}
