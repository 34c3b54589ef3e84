pub mod macros;

mod computed;
mod graph;
mod options;
mod subscription;
mod value;
mod var;

pub use computed::Computed;
pub use graph::Runtime;
pub use options::Options;
pub use subscription::Subscription;
pub use value::Value;
pub use var::Var;

/// Identity of a node inside one [`Runtime`], never reused.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug)]
pub struct NodeId(pub(crate) u64);

impl std::fmt::Display for NodeId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Graph-facing view of a node body, stored as a `Weak` reference
/// keyed by [`NodeId`].
pub(crate) trait AnyNode: 'static {
	/// Mark the cached value stale. No-op for source nodes.
	fn mark_dirty(&self);

	/// Run every registered observer, in registration order.
	fn notify(&self);

	/// Drop a single observer registration.
	fn remove_observer(&self, slot: subscription::SlotId);
}
