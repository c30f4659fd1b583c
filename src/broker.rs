use std::collections::HashMap;

use async_std::channel::Sender;
use chrono::Utc;
use zbus::zvariant::OwnedValue;

use crate::image::{self, ImageData, ImageRef};
use crate::registry::{Registry, Stored};
use crate::types::{CloseReason, NotificationRecord, Properties, Timeout, Urgency};

pub const PROPERTIES: Properties = Properties {
	name: "tsuuchi",
	vendor: "tsuuchi",
	version: env!("CARGO_PKG_VERSION"),
	capabilities: &["actions", "body", "body-markup", "icon-static", "persistence"],
};

/// A Notify call, still in wire shape.
#[derive(Debug)]
pub struct Submission {
	pub app_name: String,
	pub replaces_id: u32,
	pub app_icon: String,
	pub summary: String,
	pub body: String,
	pub actions: Vec<String>,
	pub hints: HashMap<String, OwnedValue>,
	pub expire_timeout: i32,
}

#[derive(Debug, Clone)]
pub enum BrokerEvent {
	Arrived(u32, NotificationRecord),
	/// A live id was resubmitted: content refresh, not a new arrival.
	Updated(u32, NotificationRecord),
	Closed(u32, CloseReason),
	ActionInvoked(u32, String),
}

pub struct Broker {
	registry: Registry,
	props: Properties,
	events: Sender<BrokerEvent>,
}

impl Broker {
	pub fn new(events: Sender<BrokerEvent>) -> Broker {
		Broker { registry: Registry::new(), props: PROPERTIES, events }
	}

	pub fn submit(&mut self, msg: Submission) -> u32 {
		let replaces_id = msg.replaces_id;
		let record = parse_submission(msg);
		match self.registry.insert(replaces_id, record.clone()) {
			Stored::New(id) => {
				log::debug!("notification {} arrived: {:?}", id, record.summary);
				self.emit(BrokerEvent::Arrived(id, record));
				id
			}
			Stored::Replaced(id) => {
				log::debug!("notification {} replaced", id);
				self.emit(BrokerEvent::Updated(id, record));
				id
			}
		}
	}

	/// No-op for unknown ids; emits `Closed` at most once per live id.
	pub fn close(&mut self, id: u32, reason: CloseReason) -> bool {
		if self.registry.remove(id).is_some() {
			self.emit(BrokerEvent::Closed(id, reason));
			true
		} else {
			false
		}
	}

	/// Senders may still be listening after the notification closed, so
	/// this emits whether or not the id is live.
	pub fn invoke_action(&mut self, id: u32, action: &str) {
		if let Some(record) = self.registry.get(id) {
			if !record.actions.iter().any(|(key, _)| key == action) {
				log::debug!("action {} was not declared by notification {}", action, id);
			}
		}
		self.emit(BrokerEvent::ActionInvoked(id, action.to_owned()));
	}

	pub fn capabilities(&self) -> &'static [&'static str] {
		self.props.capabilities
	}

	pub fn server_information(&self) -> (&'static str, &'static str, &'static str, &'static str) {
		(self.props.name, self.props.vendor, self.props.version, "1.2")
	}

	pub fn record(&self, id: u32) -> Option<&NotificationRecord> {
		self.registry.get(id)
	}

	fn emit(&self, event: BrokerEvent) {
		if self.events.try_send(event).is_err() {
			log::warn!("broker event channel closed, dropping event");
		}
	}
}

fn parse_submission(msg: Submission) -> NotificationRecord {
	let mut hints = msg.hints;

	let app_name = Some(msg.app_name).filter(|a| !a.is_empty());
	let app_icon = Some(msg.app_icon).filter(|a| !a.is_empty());
	let body = Some(msg.body).filter(|a| !a.is_empty());

	let actions = msg.actions
		.chunks_exact(2)
		.map(|a| (a[0].clone(), a[1].clone()))
		.collect::<Vec<_>>();

	let urgency = hints.remove("urgency")
		.and_then(|a| u8::try_from(a).ok())
		.map(Urgency::from_hint)
		.unwrap_or_default();

	// Remove every image hint from the map even when an earlier one wins,
	// so none of them leak into `extra`.
	let image = None
		.or(hints.remove("image-data").and_then(pixmap_hint))
		.or(hints.remove("image_data").and_then(pixmap_hint))
		.or(hints.remove("image-path").and_then(path_hint))
		.or(hints.remove("image_path").and_then(path_hint))
		.or(app_icon.as_deref().and_then(image::resolve_icon))
		.or(hints.remove("icon_data").and_then(pixmap_hint));

	let extra = hints.into_iter().map(|(k, v)| (k, format!("{:?}", v))).collect();

	NotificationRecord {
		app_name,
		app_icon,
		summary: msg.summary,
		body,
		actions,
		urgency,
		timeout: Timeout::from_millis(msg.expire_timeout),
		image,
		extra,
		created_at: Utc::now(),
	}
}

fn pixmap_hint(value: OwnedValue) -> Option<ImageRef> {
	let data = ImageData::try_from(value).ok()?;
	match image::decode(data) {
		Ok(bitmap) => Some(ImageRef::Bitmap(bitmap)),
		Err(err) => {
			// a bad image must never sink an otherwise valid notification
			log::warn!("dropping malformed image hint: {}", err);
			None
		}
	}
}

fn path_hint(value: OwnedValue) -> Option<ImageRef> {
	String::try_from(value)
		.ok()
		.filter(|p| !p.is_empty())
		.map(ImageRef::File)
}
