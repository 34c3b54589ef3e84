use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::graph::Graph;
use crate::options::{EqualityFn, Options};
use crate::subscription::{Observers, SlotId, Subscription};
use crate::{AnyNode, Computed, NodeId};

/// A source node: a directly writable value holder. Cheap to clone,
/// all clones address the same node.
pub struct Var<T: 'static> {
	body: Rc<VarBody<T>>,
}

impl<T> Clone for Var<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

pub(crate) fn create<T>(graph: Rc<Graph>, value: T, options: Options<T>) -> Var<T>
where
	T: PartialEq + 'static,
{
	let (equality, label) = options.resolve();
	let id = graph.alloc();
	let body = Rc::new(VarBody {
		id,
		graph,
		value: RefCell::new(value),
		equality,
		label,
		observers: Observers::new(),
	});
	body.graph.register(id, Rc::downgrade(&body) as Weak<dyn AnyNode>);
	Var { body }
}

impl<T> Var<T>
where
	T: 'static,
{
	pub fn id(&self) -> NodeId {
		self.body.id
	}

	/// Read the current value, recording a dependency edge when called
	/// from inside a computation.
	pub fn get(&self) -> T
	where
		T: Clone,
	{
		self.body.graph.track(self.body.id);
		self.body.value.borrow().clone()
	}

	/// Read without recording a dependency edge.
	pub fn get_untracked(&self) -> T
	where
		T: Clone,
	{
		self.body.value.borrow().clone()
	}

	/// Store `value`. Values the equality predicate calls equal are
	/// stored silently; otherwise every transitive dependent is marked
	/// dirty and notified exactly once.
	pub fn set(&self, value: T) {
		let _ = self.replace(value);
	}

	/// Like [`Var::set`], returning the previous value.
	pub fn replace(&self, value: T) -> T {
		self.body.replace(value)
	}

	/// Read-modify-write through [`Var::set`], inheriting its equality
	/// gate.
	pub fn update(&self, func: impl FnOnce(&T) -> T) {
		let next = func(&*self.body.value.borrow());
		self.set(next);
	}

	/// Derive a computed node from this one.
	pub fn map<F, R>(&self, func: F) -> Computed<R>
	where
		F: Fn(&T) -> R + 'static,
		R: PartialEq + 'static,
	{
		let body = self.body.clone();
		crate::computed::create(
			self.body.graph.clone(),
			Box::new(move || {
				body.graph.track(body.id);
				let value = body.value.borrow();
				func(&value)
			}),
			Options::new(),
		)
	}

	/// Register `callback` to run whenever a write to this node takes
	/// effect.
	pub fn subscribe(&self, callback: impl Fn() + 'static) -> Subscription {
		let slot = self.body.observers.add(Rc::new(callback));
		Subscription::new(Rc::downgrade(&self.body) as Weak<dyn AnyNode>, slot)
	}

	/// Remove this node from the graph, scrubbing every edge that
	/// references it. Other live handles keep the value but are
	/// detached from tracking and propagation.
	pub fn dispose(self) {
		self.body.graph.remove(self.body.id);
	}
}

pub(crate) struct VarBody<T> {
	id: NodeId,
	pub(crate) graph: Rc<Graph>,
	value: RefCell<T>,
	equality: EqualityFn<T>,
	label: Option<&'static str>,
	observers: Observers,
}

impl<T> VarBody<T> {
	fn replace(&self, value: T) -> T {
		let (old, changed) = {
			let mut current = self.value.borrow_mut();
			let changed = !(self.equality)(&*current, &value);
			(std::mem::replace(&mut *current, value), changed)
		};

		if changed {
			self.graph.propagate(self.id);
		} else {
			trace!(node = %self.id, label = self.label, "write gated by equality");
		}

		old
	}
}

impl<T> Drop for VarBody<T> {
	fn drop(&mut self) {
		self.graph.remove(self.id);
	}
}

impl<T: 'static> AnyNode for VarBody<T> {
	fn mark_dirty(&self) {
		// Source values are always fresh.
	}

	fn notify(&self) {
		self.observers.notify();
	}

	fn remove_observer(&self, slot: SlotId) {
		self.observers.remove(slot);
	}
}

impl<T> crate::value::Readable<T> for VarBody<T>
where
	T: Clone + 'static,
{
	fn id(&self) -> NodeId {
		self.id
	}

	fn read(&self) -> T {
		self.graph.track(self.id);
		self.value.borrow().clone()
	}

	fn read_untracked(&self) -> T {
		self.value.borrow().clone()
	}
}

impl<T> From<Var<T>> for crate::Value<T>
where
	T: Clone + 'static,
{
	fn from(var: Var<T>) -> Self {
		crate::Value::new(var.body)
	}
}

impl<T> Debug for Var<T>
where
	T: Debug + 'static,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Var")
			.field("id", &self.body.id)
			.field("label", &self.body.label)
			.field("value", &*self.body.value.borrow())
			.finish()
	}
}
