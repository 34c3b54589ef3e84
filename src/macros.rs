pub use enclose::*;

/// Build a [`Computed`](crate::Computed) on a runtime, optionally
/// cloning captured handles first:
///
/// ```ignore
/// let b = computed!(rt, (a) => a.get() + 1);
/// ```
#[macro_export]
macro_rules! computed {
    ($rt:expr, ( $($d_tt:tt)* ) => $($b:tt)*) => {
        $rt.computed($crate::macros::enclose!(($( $d_tt )*) move || { $($b)* }))
    };
    ($rt:expr, $($b:tt)*) => {
        $rt.computed(move || { $($b)* })
    };
}
