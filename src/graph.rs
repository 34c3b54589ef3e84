use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use fxhash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::computed::Computed;
use crate::options::Options;
use crate::var::Var;
use crate::{AnyNode, NodeId};

/// One engine instance, fully synchronous and single-threaded. Owns
/// node identities, the dependency edges and the execution stack;
/// nothing is shared between runtimes. A computation that reads its
/// own node while it is still being evaluated is a caller error.
pub struct Runtime {
	graph: Rc<Graph>,
}

impl Clone for Runtime {
	fn clone(&self) -> Self {
		Runtime {
			graph: self.graph.clone(),
		}
	}
}

impl Default for Runtime {
	fn default() -> Self {
		Runtime::new()
	}
}

impl Runtime {
	pub fn new() -> Self {
		Runtime {
			graph: Rc::new(Graph {
				next_id: Cell::new(0),
				state: RefCell::new(GraphState {
					nodes: FxHashMap::default(),
					reads: FxHashMap::default(),
					dependents: FxHashMap::default(),
					stack: SmallVec::new(),
				}),
			}),
		}
	}

	/// Create a source node holding `value`.
	pub fn var<T>(&self, value: T) -> Var<T>
	where
		T: PartialEq + 'static,
	{
		self.var_with(value, Options::new())
	}

	pub fn var_with<T>(&self, value: T, options: Options<T>) -> Var<T>
	where
		T: PartialEq + 'static,
	{
		crate::var::create(self.graph.clone(), value, options)
	}

	/// Create a derived node. The computation runs once, eagerly,
	/// before the handle is returned.
	pub fn computed<T>(&self, func: impl Fn() -> T + 'static) -> Computed<T>
	where
		T: PartialEq + 'static,
	{
		self.computed_with(func, Options::new())
	}

	pub fn computed_with<T>(&self, func: impl Fn() -> T + 'static, options: Options<T>) -> Computed<T>
	where
		T: PartialEq + 'static,
	{
		crate::computed::create(self.graph.clone(), Box::new(func), options)
	}
}

pub(crate) struct Graph {
	next_id: Cell<u64>,
	state: RefCell<GraphState>,
}

struct GraphState {
	nodes: FxHashMap<NodeId, Weak<dyn AnyNode>>,
	/// Forward edges: derived node -> every node it read during its
	/// most recent evaluation.
	reads: FxHashMap<NodeId, SmallVec<[NodeId; 4]>>,
	/// Reverse adjacency: node -> derived nodes that read it.
	dependents: FxHashMap<NodeId, FxHashSet<NodeId>>,
	/// Derived nodes currently mid-evaluation, innermost last.
	stack: SmallVec<[NodeId; 8]>,
}

impl Graph {
	pub(crate) fn alloc(&self) -> NodeId {
		let id = self.next_id.get();
		self.next_id.set(id + 1);
		NodeId(id)
	}

	pub(crate) fn register(&self, id: NodeId, node: Weak<dyn AnyNode>) {
		self.state.borrow_mut().nodes.insert(id, node);
	}

	/// Attribute a read of `target` to whichever derived node is
	/// currently on top of the execution stack, if any.
	pub(crate) fn track(&self, target: NodeId) {
		let state = &mut *self.state.borrow_mut();
		if let Some(&reader) = state.stack.last() {
			state.reads.entry(reader).or_default().push(target);
			state.dependents.entry(target).or_default().insert(reader);
		}
	}

	/// Discard every edge whose source is `id`, then push `id` on the
	/// execution stack. The guard pops on drop, even when the
	/// computation panics.
	pub(crate) fn enter(&self, id: NodeId) -> EvalScope<'_> {
		let state = &mut *self.state.borrow_mut();
		state.clear_reads(id);
		state.stack.push(id);
		EvalScope { graph: self }
	}

	/// Mark every transitive dependent of `origin` dirty and notify
	/// each visited node exactly once, origin first. Observers run
	/// after the traversal, outside any graph borrow, so they may
	/// re-enter the runtime.
	pub(crate) fn propagate(&self, origin: NodeId) {
		let mut order: Vec<Rc<dyn AnyNode>> = Vec::new();

		{
			let state = self.state.borrow();
			let mut visited = FxHashSet::default();
			let mut queue = VecDeque::new();

			visited.insert(origin);
			queue.push_back(origin);

			while let Some(id) = queue.pop_front() {
				if let Some(node) = state.nodes.get(&id).and_then(|node| node.upgrade()) {
					if id != origin {
						node.mark_dirty();
					}
					order.push(node);
				}

				if let Some(deps) = state.dependents.get(&id) {
					for &dep in deps {
						if visited.insert(dep) {
							queue.push_back(dep);
						}
					}
				}
			}

			debug!(origin = %origin, visited = order.len(), "propagate");
		}

		for node in order {
			node.notify();
		}
	}

	/// Remove `id` from the registry and scrub every edge it appears
	/// in, on either side. Idempotent.
	pub(crate) fn remove(&self, id: NodeId) {
		let state = &mut *self.state.borrow_mut();
		state.nodes.remove(&id);
		state.clear_reads(id);

		if let Some(deps) = state.dependents.remove(&id) {
			for dep in deps {
				if let Some(reads) = state.reads.get_mut(&dep) {
					reads.retain(|t| *t != id);
				}
			}
		}

		trace!(node = %id, "removed");
	}
}

impl GraphState {
	fn clear_reads(&mut self, id: NodeId) {
		if let Some(targets) = self.reads.remove(&id) {
			for target in targets {
				if let Some(set) = self.dependents.get_mut(&target) {
					set.remove(&id);
					if set.is_empty() {
						self.dependents.remove(&target);
					}
				}
			}
		}
	}
}

pub(crate) struct EvalScope<'a> {
	graph: &'a Graph,
}

impl Drop for EvalScope<'_> {
	fn drop(&mut self) {
		self.graph.state.borrow_mut().stack.pop();
	}
}
