use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::AnyNode;

pub(crate) type SlotId = u64;

/// Observer list of a single node. Every registration gets its own
/// slot id, so removing one occurrence of a callback leaves other
/// registrations of it in place.
pub(crate) struct Observers {
	next: Cell<SlotId>,
	list: RefCell<Vec<(SlotId, Rc<dyn Fn()>)>>,
}

impl Observers {
	pub fn new() -> Self {
		Observers {
			next: Cell::new(0),
			list: RefCell::new(Vec::new()),
		}
	}

	pub fn add(&self, callback: Rc<dyn Fn()>) -> SlotId {
		let slot = self.next.get();
		self.next.set(slot + 1);
		self.list.borrow_mut().push((slot, callback));
		slot
	}

	pub fn remove(&self, slot: SlotId) {
		self.list.borrow_mut().retain(|(s, _)| *s != slot);
	}

	/// Invoke every observer in registration order. The list is
	/// snapshotted first, so callbacks may subscribe or unsubscribe on
	/// this same node.
	pub fn notify(&self) {
		let snapshot: Vec<Rc<dyn Fn()>> = self
			.list
			.borrow()
			.iter()
			.map(|(_, cb)| cb.clone())
			.collect();

		for callback in snapshot {
			callback();
		}
	}
}

/// Handle returned by `subscribe`. Unsubscribing removes exactly the
/// registration it was returned for; dropping it without
/// unsubscribing leaves the observer registered.
#[must_use]
pub struct Subscription {
	node: Weak<dyn AnyNode>,
	slot: SlotId,
}

impl Subscription {
	pub(crate) fn new(node: Weak<dyn AnyNode>, slot: SlotId) -> Self {
		Subscription { node, slot }
	}

	pub fn unsubscribe(self) {
		if let Some(node) = self.node.upgrade() {
			node.remove_observer(self.slot);
		}
	}
}
