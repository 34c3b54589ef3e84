use std::cell::{Cell, RefCell};
use std::fmt::Debug;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::graph::Graph;
use crate::options::{EqualityFn, Options};
use crate::subscription::{Observers, SlotId, Subscription};
use crate::{AnyNode, NodeId};

/// A derived node: a memoized value computed from other nodes.
/// Recomputes on the first read after an upstream change; the
/// dependency set is rebuilt from scratch on every run.
pub struct Computed<T: 'static> {
	body: Rc<ComputedBody<T>>,
}

impl<T> Clone for Computed<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

pub(crate) fn create<T>(graph: Rc<Graph>, func: Box<dyn Fn() -> T>, options: Options<T>) -> Computed<T>
where
	T: PartialEq + 'static,
{
	let (equality, label) = options.resolve();
	let id = graph.alloc();
	let body = Rc::new(ComputedBody {
		id,
		graph,
		func,
		value: RefCell::new(None),
		dirty: Cell::new(true),
		equality,
		label,
		observers: Observers::new(),
	});
	body.graph.register(id, Rc::downgrade(&body) as Weak<dyn AnyNode>);
	body.refresh();
	Computed { body }
}

impl<T> Computed<T>
where
	T: 'static,
{
	pub fn id(&self) -> NodeId {
		self.body.id
	}

	/// Read the value, refreshing a dirty cache first. Records a
	/// dependency edge when called from inside another computation.
	pub fn get(&self) -> T
	where
		T: Clone,
	{
		self.body.graph.track(self.body.id);
		self.body.refresh();
		self.body.value.borrow().as_ref().unwrap().clone()
	}

	/// Read without recording a dependency edge.
	pub fn get_untracked(&self) -> T
	where
		T: Clone,
	{
		self.body.refresh();
		self.body.value.borrow().as_ref().unwrap().clone()
	}

	/// Register `callback` to run whenever a change upstream reaches
	/// this node. Firing means "something upstream changed", not "the
	/// value was recomputed"; recomputation waits for the next read.
	pub fn subscribe(&self, callback: impl Fn() + 'static) -> Subscription {
		let slot = self.body.observers.add(Rc::new(callback));
		Subscription::new(Rc::downgrade(&self.body) as Weak<dyn AnyNode>, slot)
	}

	/// Remove this node from the graph, scrubbing every edge that
	/// references it.
	pub fn dispose(self) {
		self.body.graph.remove(self.body.id);
	}
}

pub(crate) struct ComputedBody<T> {
	id: NodeId,
	pub(crate) graph: Rc<Graph>,
	func: Box<dyn Fn() -> T>,
	value: RefCell<Option<T>>,
	dirty: Cell<bool>,
	equality: EqualityFn<T>,
	label: Option<&'static str>,
	observers: Observers,
}

impl<T> ComputedBody<T> {
	/// The evaluation protocol. The dirty flag clears only after
	/// compare-and-store completed, so a panicking computation or
	/// predicate leaves the node dirty and retryable; the stack guard
	/// pops on unwind.
	pub(crate) fn refresh(&self) {
		if !self.dirty.get() && self.value.borrow().is_some() {
			return;
		}

		trace!(node = %self.id, label = self.label, "evaluate");

		let next = {
			let _scope = self.graph.enter(self.id);
			(self.func)()
		};

		{
			let mut value = self.value.borrow_mut();
			let changed = match &*value {
				Some(prev) => !(self.equality)(prev, &next),
				None => true,
			};
			if changed {
				*value = Some(next);
			}
		}

		self.dirty.set(false);
	}
}

impl<T> Drop for ComputedBody<T> {
	fn drop(&mut self) {
		self.graph.remove(self.id);
	}
}

impl<T: 'static> AnyNode for ComputedBody<T> {
	fn mark_dirty(&self) {
		self.dirty.set(true);
	}

	fn notify(&self) {
		self.observers.notify();
	}

	fn remove_observer(&self, slot: SlotId) {
		self.observers.remove(slot);
	}
}

impl<T> crate::value::Readable<T> for ComputedBody<T>
where
	T: Clone + 'static,
{
	fn id(&self) -> NodeId {
		self.id
	}

	fn read(&self) -> T {
		self.graph.track(self.id);
		self.refresh();
		self.value.borrow().as_ref().unwrap().clone()
	}

	fn read_untracked(&self) -> T {
		self.refresh();
		self.value.borrow().as_ref().unwrap().clone()
	}
}

impl<T> From<Computed<T>> for crate::Value<T>
where
	T: Clone + 'static,
{
	fn from(computed: Computed<T>) -> Self {
		crate::Value::new(computed.body)
	}
}

impl<T> Debug for Computed<T>
where
	T: Debug + 'static,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Computed")
			.field("id", &self.body.id)
			.field("label", &self.body.label)
			.field("dirty", &self.body.dirty.get())
			.field("value", &*self.body.value.borrow())
			.finish()
	}
}
