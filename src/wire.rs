use std::collections::HashMap;

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::image::{self, ImageData, ImageRef};
use crate::types::{NotificationRecord, Timeout, Urgency};

/// One notification as it travels in a datagram or a history snapshot:
/// a flat JSON object, pixel data inline as base64.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRecord {
	pub id: u32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub app_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub app_icon: Option<String>,
	pub summary: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub body: Option<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub actions: Vec<(String, String)>,
	#[serde(default = "default_urgency")]
	pub urgency: u8,
	#[serde(default = "default_timeout")]
	pub timeout_ms: i32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub image_data: Option<ImageData>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub image_path: Option<String>,
	#[serde(default)]
	pub created_at_ms: i64,
	#[serde(default, skip_serializing_if = "HashMap::is_empty")]
	pub extra: HashMap<String, String>,
}

fn default_urgency() -> u8 {
	1
}

fn default_timeout() -> i32 {
	-1
}

impl WireRecord {
	pub fn from_record(id: u32, record: &NotificationRecord) -> WireRecord {
		// themed refs come from app_icon and are rebuilt from it on the far side
		let (image_data, image_path) = match &record.image {
			Some(ImageRef::Bitmap(bitmap)) => (Some(bitmap.data().clone()), None),
			Some(ImageRef::File(path)) => (None, Some(path.clone())),
			Some(ImageRef::Themed(_)) | None => (None, None),
		};
		WireRecord {
			id,
			app_name: record.app_name.clone(),
			app_icon: record.app_icon.clone(),
			summary: record.summary.clone(),
			body: record.body.clone(),
			actions: record.actions.clone(),
			urgency: record.urgency.as_hint(),
			timeout_ms: record.timeout.as_millis(),
			image_data,
			image_path,
			created_at_ms: record.created_at.timestamp_millis(),
			extra: record.extra.clone(),
		}
	}

	pub fn into_record(self) -> (u32, NotificationRecord) {
		let image = self
			.image_data
			.and_then(|data| match image::decode(data) {
				Ok(bitmap) => Some(ImageRef::Bitmap(bitmap)),
				Err(err) => {
					log::warn!("dropping image from wire record {}: {}", self.id, err);
					None
				}
			})
			.or_else(|| self.image_path.map(ImageRef::File))
			.or_else(|| self.app_icon.as_deref().and_then(image::resolve_icon));
		let created_at = Utc
			.timestamp_millis_opt(self.created_at_ms)
			.single()
			.unwrap_or_else(Utc::now);
		let record = NotificationRecord {
			app_name: self.app_name,
			app_icon: self.app_icon,
			summary: self.summary,
			body: self.body,
			actions: self.actions,
			urgency: Urgency::from_hint(self.urgency),
			timeout: Timeout::from_millis(self.timeout_ms),
			image,
			extra: self.extra,
			created_at,
		};
		(self.id, record)
	}
}
