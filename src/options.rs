use std::rc::Rc;

pub(crate) type EqualityFn<T> = Rc<dyn Fn(&T, &T) -> bool>;

/// Per-node construction options. `equality` decides whether a new
/// value is a real change (defaults to `PartialEq`); `label` is
/// diagnostic only, surfacing in `Debug` output and tracing events.
pub struct Options<T> {
	pub(crate) equality: Option<EqualityFn<T>>,
	pub(crate) label: Option<&'static str>,
}

impl<T> Default for Options<T> {
	fn default() -> Self {
		Options {
			equality: None,
			label: None,
		}
	}
}

impl<T> Options<T> {
	pub fn new() -> Self {
		Default::default()
	}

	pub fn equality(mut self, eq: impl Fn(&T, &T) -> bool + 'static) -> Self {
		self.equality = Some(Rc::new(eq));
		self
	}

	pub fn label(mut self, label: &'static str) -> Self {
		self.label = Some(label);
		self
	}

	pub(crate) fn resolve(self) -> (EqualityFn<T>, Option<&'static str>)
	where
		T: PartialEq + 'static,
	{
		let equality = self
			.equality
			.unwrap_or_else(|| Rc::new(|a: &T, b: &T| a == b));
		(equality, self.label)
	}
}
