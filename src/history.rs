use crate::types::NotificationRecord;
use crate::wire::WireRecord;

/// What the user has been shown, in order, with a cursor for browsing.
/// Records stay here after they close; only the cap evicts them.
#[derive(Debug)]
pub struct History {
	entries: Vec<(u32, NotificationRecord)>,
	cursor: Option<usize>,
	cap: Option<usize>,
}

impl History {
	pub fn new(cap: Option<usize>) -> History {
		History { entries: Vec::new(), cursor: None, cap }
	}

	/// Append, or mutate in place if an entry with this id already exists
	/// (same-id resubmission). With `follow_cursor` the cursor jumps to the
	/// pushed entry; without it (user is browsing) it stays put.
	pub fn push(&mut self, id: u32, record: NotificationRecord, follow_cursor: bool) {
		if let Some(pos) = self.entries.iter().rposition(|(eid, _)| *eid == id) {
			self.entries[pos].1 = record;
			if follow_cursor {
				self.cursor = Some(pos);
			}
			return;
		}
		self.entries.push((id, record));
		if let Some(cap) = self.cap {
			while self.entries.len() > cap {
				self.entries.remove(0);
				if let Some(c) = self.cursor {
					self.cursor = Some(c.saturating_sub(1));
				}
			}
		}
		if follow_cursor || self.cursor.is_none() {
			self.cursor = Some(self.entries.len() - 1);
		}
	}

	pub fn back(&mut self) -> Option<(u32, &NotificationRecord)> {
		let cursor = self.cursor?;
		let pos = cursor.saturating_sub(1);
		self.cursor = Some(pos);
		self.entries.get(pos).map(|(id, record)| (*id, record))
	}

	pub fn forward(&mut self) -> Option<(u32, &NotificationRecord)> {
		let cursor = self.cursor?;
		let pos = (cursor + 1).min(self.entries.len() - 1);
		self.cursor = Some(pos);
		self.entries.get(pos).map(|(id, record)| (*id, record))
	}

	pub fn current(&self) -> Option<(u32, &NotificationRecord)> {
		let cursor = self.cursor?;
		self.entries.get(cursor).map(|(id, record)| (*id, record))
	}

	pub fn remove(&mut self, id: u32) {
		let Some(pos) = self.entries.iter().position(|(eid, _)| *eid == id) else {
			return;
		};
		self.entries.remove(pos);
		self.cursor = match self.cursor {
			_ if self.entries.is_empty() => None,
			Some(c) if c > pos => Some(c - 1),
			Some(c) => Some(c.min(self.entries.len() - 1)),
			None => None,
		};
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn snapshot(&self) -> Vec<WireRecord> {
		self.entries
			.iter()
			.map(|(id, record)| WireRecord::from_record(*id, record))
			.collect()
	}

	pub fn restore(records: Vec<WireRecord>, cap: Option<usize>) -> History {
		let mut history = History::new(cap);
		for wire in records {
			let (id, record) = wire.into_record();
			history.push(id, record, true);
		}
		history
	}
}
