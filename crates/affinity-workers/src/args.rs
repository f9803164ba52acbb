/// Immutable bundle of up to four typed arguments captured by a single
/// invocation.
///
/// Workers only ever fill the first two slots; the trailing pair exists so the
/// bundle shape stays fixed no matter which arity entry point was called.
/// Built once per invocation and moved into the computation untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgBundle<A = (), B = (), C = (), D = ()> {
	first: Option<A>,
	second: Option<B>,
	third: Option<C>,
	fourth: Option<D>,
}

impl<A, B, C, D> ArgBundle<A, B, C, D> {
	/// Bundle with every slot absent, for zero-argument invocations.
	#[must_use]
	pub const fn empty() -> Self {
		Self {
			first: None,
			second: None,
			third: None,
			fourth: None,
		}
	}

	/// Bundle carrying a single argument in the first slot.
	#[must_use]
	pub const fn one(first: A) -> Self {
		Self {
			first: Some(first),
			second: None,
			third: None,
			fourth: None,
		}
	}

	/// Bundle carrying two arguments in the first and second slots.
	#[must_use]
	pub const fn two(first: A, second: B) -> Self {
		Self {
			first: Some(first),
			second: Some(second),
			third: None,
			fourth: None,
		}
	}

	#[must_use]
	pub const fn first(&self) -> Option<&A> {
		self.first.as_ref()
	}

	#[must_use]
	pub const fn second(&self) -> Option<&B> {
		self.second.as_ref()
	}

	#[must_use]
	pub const fn third(&self) -> Option<&C> {
		self.third.as_ref()
	}

	#[must_use]
	pub const fn fourth(&self) -> Option<&D> {
		self.fourth.as_ref()
	}

	/// Consumes the bundle, yielding the first slot.
	#[must_use]
	pub fn into_first(self) -> Option<A> {
		self.first
	}

	/// Consumes the bundle, yielding the two slots workers actually use.
	#[must_use]
	pub fn into_pair(self) -> (Option<A>, Option<B>) {
		(self.first, self.second)
	}
}

impl<A, B, C, D> Default for ArgBundle<A, B, C, D> {
	fn default() -> Self {
		Self::empty()
	}
}

#[cfg(test)]
mod tests {
	use super::ArgBundle;

	#[test]
	fn empty_bundle_has_no_slots() {
		let bundle = ArgBundle::<i32, String>::empty();

		assert!(bundle.first().is_none());
		assert!(bundle.second().is_none());
		assert!(bundle.third().is_none());
		assert!(bundle.fourth().is_none());
	}

	#[test]
	fn one_fills_only_the_first_slot() {
		let bundle = ArgBundle::<_, String>::one(7);

		assert_eq!(bundle.first(), Some(&7));
		assert!(bundle.second().is_none());
		assert_eq!(bundle.into_first(), Some(7));
	}

	#[test]
	fn two_fills_the_leading_pair() {
		let bundle = ArgBundle::<_, _>::two("path", 512u64);

		assert_eq!(bundle.first(), Some(&"path"));
		assert_eq!(bundle.second(), Some(&512));
		assert_eq!(bundle.into_pair(), (Some("path"), Some(512)));
	}

	#[test]
	fn trailing_slots_stay_absent() {
		let bundle = ArgBundle::<_, _>::two(1u8, 2u8);

		assert!(bundle.third().is_none());
		assert!(bundle.fourth().is_none());
	}
}
