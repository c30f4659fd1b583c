use std::collections::VecDeque;
use std::time::Duration;

use async_std::channel::Sender;
use async_std::task;

use crate::history::History;
use crate::types::{CloseReason, Event, NotificationRecord, Presenter, Timeout, Urgency};

#[derive(Debug, Clone)]
pub enum DisplayEvent {
	Arrived(u32, NotificationRecord),
	Updated(u32, NotificationRecord),
	Closed(u32, CloseReason),
	Dismiss,
	Invoke(String),
	HoverEnter,
	HoverLeave,
	NavigateBack,
	NavigateForward,
	Expired(u64),
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
	pub default_timeout: Duration,
	/// Fixed re-arm window after a hover ends. Deliberately not the
	/// pre-hover remainder; see DESIGN.md.
	pub grace_period: Duration,
	pub history_cap: Option<usize>,
}

impl Default for SchedulerConfig {
	fn default() -> SchedulerConfig {
		SchedulerConfig {
			default_timeout: Duration::from_secs(5),
			grace_period: Duration::from_secs(3),
			history_cap: Some(10),
		}
	}
}

struct Slot {
	id: u32,
	record: NotificationRecord,
	hovered: bool,
	timer: Option<task::JoinHandle<()>>,
}

/// Single-slot display state machine. Everything runs on whichever task
/// drains the event channel; the only things that escape are spawned
/// sleep-then-tick timers, and those come back through the same channel.
pub struct DisplayScheduler<P> {
	cfg: SchedulerConfig,
	presenter: P,
	slot: Option<Slot>,
	queue: VecDeque<(u32, NotificationRecord)>,
	history: History,
	browsing: bool,
	epoch: u64,
	ticks: Sender<DisplayEvent>,
	feedback: Sender<(u32, Event)>,
}

impl<P: Presenter> DisplayScheduler<P> {
	pub fn new(
		cfg: SchedulerConfig,
		presenter: P,
		ticks: Sender<DisplayEvent>,
		feedback: Sender<(u32, Event)>,
	) -> DisplayScheduler<P> {
		let history = History::new(cfg.history_cap);
		DisplayScheduler {
			cfg,
			presenter,
			slot: None,
			queue: VecDeque::new(),
			history,
			browsing: false,
			epoch: 0,
			ticks,
			feedback,
		}
	}

	pub fn shown(&self) -> Option<u32> {
		self.slot.as_ref().map(|slot| slot.id)
	}

	pub fn queued(&self) -> usize {
		self.queue.len()
	}

	pub fn history(&self) -> &History {
		&self.history
	}

	pub fn handle(&mut self, event: DisplayEvent) {
		match event {
			DisplayEvent::Arrived(id, record) => self.arrived(id, record),
			DisplayEvent::Updated(id, record) => self.updated(id, record),
			DisplayEvent::Closed(id, reason) => self.closed(id, reason),
			DisplayEvent::Dismiss => self.dismiss(),
			DisplayEvent::Invoke(action) => self.invoke(action),
			DisplayEvent::HoverEnter => self.hover_enter(),
			DisplayEvent::HoverLeave => self.hover_leave(),
			DisplayEvent::NavigateBack => self.navigate(true),
			DisplayEvent::NavigateForward => self.navigate(false),
			DisplayEvent::Expired(epoch) => self.expired(epoch),
		}
	}

	fn arrived(&mut self, id: u32, record: NotificationRecord) {
		self.browsing = false;
		if self.slot.is_none() {
			self.show(id, record);
		} else if self.shown() == Some(id) {
			// same id re-sent while visible: refresh, no new-arrival signal
			self.refresh(id, record);
		} else if let Some(entry) = self.queue.iter_mut().find(|(qid, _)| *qid == id) {
			entry.1 = record;
		} else {
			self.queue.push_back((id, record));
		}
	}

	fn updated(&mut self, id: u32, record: NotificationRecord) {
		if self.shown() == Some(id) {
			self.refresh(id, record);
		} else if let Some(entry) = self.queue.iter_mut().find(|(qid, _)| *qid == id) {
			entry.1 = record;
		} else {
			// never displayed here before, treat as an arrival
			self.arrived(id, record);
		}
	}

	fn closed(&mut self, id: u32, reason: CloseReason) {
		if self.shown() == Some(id) {
			log::debug!("display slot {} closed ({:?})", id, reason);
			// works while hovered too: a close unfreezes and advances
			self.clear_slot();
			self.advance();
		} else {
			self.queue.retain(|(qid, _)| *qid != id);
		}
	}

	fn dismiss(&mut self) {
		if let Some(id) = self.shown() {
			self.request_close(id, CloseReason::Dismissed);
		}
	}

	fn invoke(&mut self, action: String) {
		if let Some(id) = self.shown() {
			if self.feedback.try_send((id, Event::Action(action))).is_err() {
				log::warn!("feedback channel closed, dropping action");
			}
		}
	}

	fn expired(&mut self, epoch: u64) {
		let Some(slot) = &self.slot else { return };
		// a stale tick from a cancelled or superseded timer
		if epoch != self.epoch || slot.hovered {
			return;
		}
		self.request_close(slot.id, CloseReason::Expired);
	}

	fn hover_enter(&mut self) {
		let hovered = match &mut self.slot {
			Some(slot) if !slot.hovered => {
				slot.hovered = true;
				true
			}
			_ => false,
		};
		if hovered {
			self.cancel_timer();
		}
	}

	fn hover_leave(&mut self) {
		let expires = match &mut self.slot {
			Some(slot) if slot.hovered => {
				slot.hovered = false;
				expiry_delay(&self.cfg, &slot.record).is_some()
			}
			_ => return,
		};
		if expires {
			self.arm(self.cfg.grace_period);
		}
	}

	fn navigate(&mut self, back: bool) {
		self.browsing = true;
		let entry = if back { self.history.back() } else { self.history.forward() };
		if let Some((id, record)) = entry {
			// browsing re-renders into the slot; live countdown, queue and
			// history contents are untouched
			self.presenter.show(id, record);
		}
	}

	fn show(&mut self, id: u32, record: NotificationRecord) {
		self.presenter.show(id, &record);
		self.history.push(id, record.clone(), !self.browsing);
		let delay = expiry_delay(&self.cfg, &record);
		self.slot = Some(Slot { id, record, hovered: false, timer: None });
		if let Some(delay) = delay {
			self.arm(delay);
		}
	}

	fn refresh(&mut self, id: u32, record: NotificationRecord) {
		self.history.push(id, record.clone(), !self.browsing);
		if let Some(slot) = &mut self.slot {
			slot.record = record;
			self.presenter.refresh(id, &slot.record);
		}
	}

	fn advance(&mut self) {
		match self.queue.pop_front() {
			Some((id, record)) => self.show(id, record),
			None => self.presenter.clear(),
		}
	}

	fn arm(&mut self, delay: Duration) {
		self.epoch += 1;
		let epoch = self.epoch;
		let ticks = self.ticks.clone();
		let handle = task::spawn(async move {
			task::sleep(delay).await;
			let _ = ticks.send(DisplayEvent::Expired(epoch)).await;
		});
		if let Some(slot) = &mut self.slot {
			if let Some(old) = slot.timer.replace(handle) {
				task::spawn(async move { old.cancel().await; });
			}
		}
	}

	fn cancel_timer(&mut self) {
		// bump the epoch so a tick that already left the timer is ignored
		self.epoch += 1;
		if let Some(slot) = &mut self.slot {
			if let Some(timer) = slot.timer.take() {
				task::spawn(async move { timer.cancel().await; });
			}
		}
	}

	fn clear_slot(&mut self) {
		self.epoch += 1;
		if let Some(slot) = self.slot.take() {
			if let Some(timer) = slot.timer {
				task::spawn(async move { timer.cancel().await; });
			}
		}
	}

	fn request_close(&mut self, id: u32, reason: CloseReason) {
		if self.feedback.try_send((id, Event::Close(reason))).is_err() {
			log::warn!("feedback channel closed, dropping close request");
		}
	}
}

/// The one place that decides whether a record auto-expires. Both the
/// initial countdown and the post-hover grace re-arm go through this, so
/// a record that sticks when shown also sticks across hover cycles.
fn expiry_delay(cfg: &SchedulerConfig, record: &NotificationRecord) -> Option<Duration> {
	match record.timeout {
		Timeout::After(d) => Some(d),
		Timeout::Never => None,
		Timeout::Default => match record.urgency {
			// critical stays up until the user deals with it
			Urgency::Critical => None,
			_ => Some(cfg.default_timeout),
		},
	}
}
