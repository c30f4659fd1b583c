use std::net::{SocketAddr, UdpSocket};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use async_std::channel::Sender;
use async_std::task;

use crate::scheduler::DisplayEvent;
use crate::types::NotificationRecord;
use crate::wire::WireRecord;

pub const DEFAULT_PORT: u16 = 9717;

// practical udp payload ceiling
const MAX_DATAGRAM: usize = 65_507;

/// Sends one notification per datagram, best effort: no acks, no ordering
/// beyond what udp gives us.
pub struct Broadcaster {
	socket: UdpSocket,
	target: SocketAddr,
}

impl Broadcaster {
	pub fn new(target: SocketAddr) -> anyhow::Result<Broadcaster> {
		let socket = UdpSocket::bind(("0.0.0.0", 0)).context("binding broadcast socket")?;
		socket.set_broadcast(true).context("enabling SO_BROADCAST")?;
		Ok(Broadcaster { socket, target })
	}

	pub fn send(&self, id: u32, record: &NotificationRecord) {
		let mut wire = WireRecord::from_record(id, record);
		let mut payload = match serde_json::to_vec(&wire) {
			Ok(payload) => payload,
			Err(err) => {
				log::warn!("failed to serialize notification {}: {}", id, err);
				return;
			}
		};
		if payload.len() > MAX_DATAGRAM && wire.image_data.is_some() {
			log::warn!("notification {} image does not fit in a datagram, sending without it", id);
			wire.image_data = None;
			payload = match serde_json::to_vec(&wire) {
				Ok(payload) => payload,
				Err(err) => {
					log::warn!("failed to serialize notification {}: {}", id, err);
					return;
				}
			};
		}
		if payload.len() > MAX_DATAGRAM {
			log::warn!("notification {} still too large ({} bytes), dropping", id, payload.len());
			return;
		}
		if let Err(err) = self.socket.send_to(&payload, self.target) {
			log::warn!("failed to broadcast notification {}: {}", id, err);
		}
	}
}

/// Listener half of the bridge. Runs on its own thread so socket reads
/// never touch the scheduler loop; records are handed off through the
/// event channel only.
pub fn spawn_listener(port: u16, events: Sender<DisplayEvent>) -> thread::JoinHandle<()> {
	thread::Builder::new()
		.name("udp-listener".into())
		.spawn(move || listen(port, events))
		.expect("failed to spawn listener thread")
}

fn listen(port: u16, events: Sender<DisplayEvent>) {
	let mut backoff = Duration::from_secs(1);
	let socket = loop {
		match UdpSocket::bind(("0.0.0.0", port)) {
			Ok(socket) => break socket,
			Err(err) => {
				log::warn!("failed to bind udp port {}: {}, retrying in {:?}", port, err, backoff);
				thread::sleep(backoff);
				backoff = (backoff * 2).min(Duration::from_secs(30));
			}
		}
	};
	log::info!("listening for notifications on udp port {}", port);

	let mut buf = vec![0u8; MAX_DATAGRAM];
	backoff = Duration::from_secs(1);
	loop {
		let (len, peer) = match socket.recv_from(&mut buf) {
			Ok(received) => {
				backoff = Duration::from_secs(1);
				received
			}
			// a persistent error must not spin the thread hot
			Err(err) => {
				log::warn!("udp read error: {}, retrying in {:?}", err, backoff);
				thread::sleep(backoff);
				backoff = (backoff * 2).min(Duration::from_secs(30));
				continue;
			}
		};
		let wire: WireRecord = match serde_json::from_slice(&buf[..len]) {
			Ok(wire) => wire,
			Err(err) => {
				log::warn!("dropping malformed datagram from {}: {}", peer, err);
				continue;
			}
		};
		let (id, record) = wire.into_record();
		log::debug!("datagram from {}: notification {}", peer, id);
		// marshal onto the scheduler loop; never touch its state from here
		if task::block_on(events.send(DisplayEvent::Arrived(id, record))).is_err() {
			break;
		}
	}
}

#[cfg(test)]
mod tests {
	use async_std::channel::unbounded;
	use async_std::future::timeout;

	use super::*;
	use crate::image::{self, ImageData, ImageRef};
	use crate::types::{Timeout, Urgency};

	fn record(summary: &str) -> NotificationRecord {
		let pixmap = ImageData {
			width: 2,
			height: 1,
			rowstride: 8,
			has_alpha: true,
			bits_per_sample: 8,
			channels: 4,
			data: vec![9; 8],
		};
		NotificationRecord {
			app_name: Some("test".into()),
			app_icon: None,
			summary: summary.into(),
			body: None,
			actions: Vec::new(),
			urgency: Urgency::Normal,
			timeout: Timeout::Default,
			image: Some(ImageRef::Bitmap(image::decode(pixmap).unwrap())),
			extra: Default::default(),
			created_at: chrono::Utc::now(),
		}
	}

	#[async_std::test]
	async fn datagram_round_trip_skips_garbage() {
		// let the OS pick a free port, then hand it to the listener
		let port = UdpSocket::bind(("127.0.0.1", 0)).unwrap().local_addr().unwrap().port();
		let (tx, rx) = unbounded();
		spawn_listener(port, tx);
		task::sleep(Duration::from_millis(100)).await; // let it bind

		let target: SocketAddr = ([127, 0, 0, 1], port).into();
		let plain = UdpSocket::bind(("127.0.0.1", 0)).unwrap();
		plain.send_to(b"definitely not json", target).unwrap();

		let sent = record("over the wire");
		Broadcaster::new(target).unwrap().send(7, &sent);

		let event = timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
		match event {
			DisplayEvent::Arrived(id, got) => {
				assert_eq!(id, 7);
				assert_eq!(got.summary, sent.summary);
				assert_eq!(got.image, sent.image);
			}
			other => panic!("unexpected event: {:?}", other),
		}
	}
}
