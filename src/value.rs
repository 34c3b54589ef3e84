use std::rc::Rc;

use crate::NodeId;

/// A read-only, type-erased handle over either node variant.
pub struct Value<T> {
	node: Rc<dyn Readable<T>>,
}

impl<T> Clone for Value<T> {
	fn clone(&self) -> Self {
		Value {
			node: self.node.clone(),
		}
	}
}

impl<T> Value<T>
where
	T: 'static,
{
	pub(crate) fn new(node: Rc<dyn Readable<T>>) -> Self {
		Value { node }
	}

	pub fn id(&self) -> NodeId {
		self.node.id()
	}

	pub fn get(&self) -> T {
		self.node.read()
	}

	pub fn get_untracked(&self) -> T {
		self.node.read_untracked()
	}
}

pub(crate) trait Readable<T> {
	fn id(&self) -> NodeId;

	/// Tracked read.
	fn read(&self) -> T;

	fn read_untracked(&self) -> T;
}
