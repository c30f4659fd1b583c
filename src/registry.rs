use std::collections::BTreeMap;

use crate::types::NotificationRecord;

/// Live notifications, keyed by id. At most one record per id; a submit
/// with `replaces_id` set overwrites in place.
#[derive(Debug, Default)]
pub struct Registry {
	records: BTreeMap<u32, NotificationRecord>,
	next_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stored {
	New(u32),
	Replaced(u32),
}

impl Stored {
	pub fn id(self) -> u32 {
		match self {
			Stored::New(id) | Stored::Replaced(id) => id,
		}
	}
}

impl Registry {
	pub fn new() -> Registry {
		Registry::default()
	}

	// 0 is reserved as "no id", so the counter wraps to 1. Ids revived by
	// the caller through `insert` never went through the counter, so a
	// candidate can already be live and has to be skipped.
	fn alloc_id(&mut self) -> u32 {
		loop {
			self.next_id = match self.next_id {
				u32::MAX => 1,
				n => n + 1,
			};
			if !self.records.contains_key(&self.next_id) {
				return self.next_id;
			}
		}
	}

	pub fn insert(&mut self, replaces_id: u32, record: NotificationRecord) -> Stored {
		if replaces_id != 0 {
			if self.records.insert(replaces_id, record).is_some() {
				Stored::Replaced(replaces_id)
			} else {
				Stored::New(replaces_id)
			}
		} else {
			let id = self.alloc_id();
			self.records.insert(id, record);
			Stored::New(id)
		}
	}

	pub fn remove(&mut self, id: u32) -> Option<NotificationRecord> {
		self.records.remove(&id)
	}

	pub fn get(&self, id: u32) -> Option<&NotificationRecord> {
		self.records.get(&id)
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashSet;

	use super::*;
	use crate::types::{Timeout, Urgency};

	fn record(summary: &str) -> NotificationRecord {
		NotificationRecord {
			app_name: None,
			app_icon: None,
			summary: summary.into(),
			body: None,
			actions: Vec::new(),
			urgency: Urgency::Normal,
			timeout: Timeout::Default,
			image: None,
			extra: Default::default(),
			created_at: chrono::Utc::now(),
		}
	}

	#[test]
	fn fresh_ids_are_distinct_and_nonzero() {
		let mut registry = Registry::new();
		let mut seen = HashSet::new();
		for _ in 0..1000 {
			let id = registry.insert(0, record("x")).id();
			assert_ne!(id, 0);
			assert!(seen.insert(id));
		}
	}

	#[test]
	fn counter_wraps_to_one_not_zero() {
		let mut registry = Registry::new();
		registry.next_id = u32::MAX - 1;
		assert_eq!(registry.insert(0, record("a")).id(), u32::MAX);
		assert_eq!(registry.insert(0, record("b")).id(), 1);
		assert_eq!(registry.insert(0, record("c")).id(), 2);
	}

	#[test]
	fn fresh_ids_skip_revived_live_ids() {
		let mut registry = Registry::new();
		assert_eq!(registry.insert(2, record("revived")), Stored::New(2));
		assert_eq!(registry.insert(0, record("a")).id(), 1);
		assert_eq!(registry.insert(0, record("b")).id(), 3);
		assert_eq!(registry.len(), 3);
		assert_eq!(registry.get(2).unwrap().summary, "revived");
	}

	#[test]
	fn replace_overwrites_in_place() {
		let mut registry = Registry::new();
		let id = registry.insert(0, record("old")).id();
		assert_eq!(registry.insert(id, record("new")), Stored::Replaced(id));
		assert_eq!(registry.len(), 1);
		assert_eq!(registry.get(id).unwrap().summary, "new");
	}

	#[test]
	fn replace_of_dead_id_revives_it() {
		let mut registry = Registry::new();
		assert_eq!(registry.insert(42, record("a")), Stored::New(42));
		assert_eq!(registry.get(42).unwrap().summary, "a");
	}

	#[test]
	fn remove_is_idempotent() {
		let mut registry = Registry::new();
		let id = registry.insert(0, record("x")).id();
		assert!(registry.remove(id).is_some());
		assert!(registry.remove(id).is_none());
		assert!(registry.is_empty());
	}
}
