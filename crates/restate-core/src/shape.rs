//! Shape classification and reference identity.
//!
//! `set_state` decides between merging and replacing by looking at the
//! *incoming* value's [`Kind`]. Only `Kind::Map` merges; sequences, scalars
//! and null always replace the current state wholesale.

use std::rc::Rc;

/// Category of a state value, used to pick merge or replace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    /// Keyed record. Merged shallowly over the current state.
    Map,
    /// Ordered sequence. Replaces.
    Sequence,
    /// Number, string, boolean and friends. Replaces.
    Scalar,
    /// Absence of a value. Replaces.
    Null,
}

impl Kind {
    pub fn merges(self) -> bool {
        matches!(self, Kind::Map)
    }
}

/// A value a [`Store`](crate::Store) can hold.
pub trait Mergeable: 'static {
    fn kind(&self) -> Kind;

    /// Shallow-merge `patch` over a copy of `self`.
    ///
    /// Only called when `patch.kind()` is [`Kind::Map`]. Keys present only in
    /// `self` are kept, keys in `patch` win. Must not mutate `self`.
    fn merge(&self, patch: &Self) -> Self
    where
        Self: Sized;

    /// Whether `self` and `other` count as the same value even when held in
    /// different `Rc`s. An update that is the same as the current state is a
    /// no-op.
    ///
    /// Records and sequences compare by reference only, so the default is
    /// `false`. Scalars compare by value.
    fn same_as(&self, _other: &Self) -> bool
    where
        Self: Sized,
    {
        false
    }
}

/// Reference identity, the check used for no-op updates and selector output.
///
/// Shared values (`Rc`) are identical when they point at the same allocation;
/// plain scalars are identical when equal.
pub trait Identical {
    fn identical(&self, other: &Self) -> bool;
}

impl<T: ?Sized> Identical for Rc<T> {
    fn identical(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: Identical + ?Sized> Identical for &T {
    fn identical(&self, other: &Self) -> bool {
        (**self).identical(*other)
    }
}

impl<T: Identical> Identical for Option<T> {
    fn identical(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.identical(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl Identical for f32 {
    fn identical(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits() || (self.is_nan() && other.is_nan())
    }
}

impl Identical for f64 {
    fn identical(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits() || (self.is_nan() && other.is_nan())
    }
}

macro_rules! identical_by_eq {
    ($($t:ty),* $(,)?) => {
        $(
            impl Identical for $t {
                fn identical(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

identical_by_eq!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    String,
    str,
);

macro_rules! identical_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: Identical),+> Identical for ($($name,)+) {
            fn identical(&self, other: &Self) -> bool {
                $(self.$idx.identical(&other.$idx))&&+
            }
        }
    };
}

identical_tuple!(A: 0, B: 1);
identical_tuple!(A: 0, B: 1, C: 2);
identical_tuple!(A: 0, B: 1, C: 2, D: 3);

macro_rules! scalar_state {
    ($($t:ty),* $(,)?) => {
        $(
            impl Mergeable for $t {
                fn kind(&self) -> Kind {
                    Kind::Scalar
                }
                fn merge(&self, patch: &Self) -> Self {
                    patch.clone()
                }
                fn same_as(&self, other: &Self) -> bool {
                    self.identical(other)
                }
            }
        )*
    };
}

scalar_state!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, String,
);

impl Mergeable for () {
    fn kind(&self) -> Kind {
        Kind::Null
    }
    fn merge(&self, _patch: &Self) -> Self {}
    fn same_as(&self, _other: &Self) -> bool {
        true
    }
}

impl<T: Clone + 'static> Mergeable for Vec<T> {
    fn kind(&self) -> Kind {
        Kind::Sequence
    }
    fn merge(&self, patch: &Self) -> Self {
        patch.clone()
    }
}

impl<T: Mergeable + Clone> Mergeable for Option<T> {
    fn kind(&self) -> Kind {
        match self {
            Some(v) => v.kind(),
            None => Kind::Null,
        }
    }
    fn merge(&self, patch: &Self) -> Self {
        match (self, patch) {
            (Some(current), Some(patch)) => Some(current.merge(patch)),
            _ => patch.clone(),
        }
    }
    fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same_as(b),
            (None, None) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_maps_merge() {
        assert!(Kind::Map.merges());
        assert!(!Kind::Sequence.merges());
        assert!(!Kind::Scalar.merges());
        assert!(!Kind::Null.merges());
    }

    #[test]
    fn option_reports_inner_kind() {
        assert_eq!(None::<i32>.kind(), Kind::Null);
        assert_eq!(Some(3).kind(), Kind::Scalar);
        assert_eq!(Some(vec![1]).kind(), Kind::Sequence);
    }

    #[test]
    fn float_identity_follows_object_is() {
        assert!(f64::NAN.identical(&f64::NAN));
        assert!(!0.0f64.identical(&-0.0));
        assert!(1.5f64.identical(&1.5));
    }

    #[test]
    fn rc_identity_is_pointer_identity() {
        let a = Rc::new(5);
        let b = Rc::new(5);
        assert!(a.identical(&a.clone()));
        assert!(!a.identical(&b));
        assert!((a.clone(), 1u8).identical(&(a, 1u8)));
    }

    #[test]
    fn scalars_are_the_same_by_value_collections_never() {
        assert!(42i32.same_as(&42));
        assert!(String::from("a").same_as(&"a".to_string()));
        assert!(f64::NAN.same_as(&f64::NAN));
        assert!(Some(1u8).same_as(&Some(1)));
        assert!(None::<u8>.same_as(&None));
        assert!(!vec![1].same_as(&vec![1]));
        assert!(!Some(vec![1]).same_as(&Some(vec![1])));
    }
}
