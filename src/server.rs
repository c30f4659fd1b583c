use std::collections::HashMap;

use crate::broker::{Broker, Submission};
use crate::types::CloseReason;

pub const BUS_NAME: &str = "org.freedesktop.Notifications";
pub const OBJECT_PATH: &str = "/org/freedesktop/Notifications";

/// The d-bus face of the broker. zbus rejects calls with the wrong
/// signature before they get here, so everything below sees well-typed
/// arguments.
pub struct NotificationServer {
	broker: Broker,
}

impl NotificationServer {
	pub fn new(broker: Broker) -> NotificationServer {
		NotificationServer { broker }
	}

	pub fn broker_mut(&mut self) -> &mut Broker {
		&mut self.broker
	}
}

#[zbus::dbus_interface(name = "org.freedesktop.Notifications")]
impl NotificationServer {
	async fn get_server_information(&self) -> (&str, &str, &str, &str) {
		self.broker.server_information()
	}

	async fn get_capabilities(&self) -> &[&str] {
		self.broker.capabilities()
	}

	async fn notify(
		&mut self,
		app_name: String,
		replaces_id: u32,
		app_icon: String,
		summary: String,
		body: String,
		actions: Vec<String>,
		hints: HashMap<String, zbus::zvariant::OwnedValue>,
		expire_timeout: i32,
	) -> u32 {
		self.broker.submit(Submission {
			app_name,
			replaces_id,
			app_icon,
			summary,
			body,
			actions,
			hints,
			expire_timeout,
		})
	}

	async fn close_notification(&mut self, id: u32) {
		self.broker.close(id, CloseReason::Closed);
	}

	#[dbus_interface(signal)]
	pub async fn notification_closed(&self, ctx: &zbus::SignalContext<'_>, id: u32, reason: u32) -> zbus::Result<()>;

	#[dbus_interface(signal)]
	pub async fn action_invoked(&self, ctx: &zbus::SignalContext<'_>, id: u32, action: &str) -> zbus::Result<()>;
}

pub async fn serve(broker: Broker) -> zbus::Result<zbus::Connection> {
	zbus::ConnectionBuilder::session()?
		.name(BUS_NAME)?
		.serve_at(OBJECT_PATH, NotificationServer::new(broker))?
		.build()
		.await
}
