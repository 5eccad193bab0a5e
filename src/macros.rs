// ============================================================================
// ripple-store - Ergonomic Macros
// ============================================================================

/// Helper macro to clone variables into a move closure.
///
/// This reduces the boilerplate of manually cloning the crate's handle
/// types (collections, cells, streams) before moving them into a closure.
///
/// # Usage
///
/// ```rust
/// use ripple_store::{EntityCollection, Value, cloned, record};
///
/// let users: EntityCollection<i64, Value> =
///     EntityCollection::new(|v: &Value| v.get("id").and_then(Value::as_i64));
///
/// let sub = users.changes().subscribe_next(cloned!(users => move |_| {
///     let _ = users.len();
/// }));
/// # drop(sub);
/// ```
#[macro_export]
macro_rules! cloned {
    ($($n:ident),+ => $e:expr) => {
        {
            $( let $n = $n.clone(); )+
            $e
        }
    };
}

/// Build a [`Value`] from a JSON-like literal.
///
/// Object literals use `key => value` pairs; values may be any expression
/// with an `Into<Value>` impl, nested `record!` blocks included.
///
/// # Usage
///
/// ```rust
/// use ripple_store::{Value, record};
///
/// let track = record! {
///     "id" => 7,
///     "title" => "storms",
///     "tags" => vec!["a", "b"],
///     "album" => record! { "id" => 1 },
/// };
/// assert_eq!(track.get("id").and_then(Value::as_i64), Some(7));
/// ```
///
/// [`Value`]: crate::Value
#[macro_export]
macro_rules! record {
    () => {
        $crate::Value::Object($crate::Fields::new())
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        {
            let mut fields = $crate::Fields::new();
            $( fields.insert(::std::string::String::from($key), $crate::Value::from($value)); )+
            $crate::Value::Object(fields)
        }
    };
}

/// Convert any `Into<Value>` expression, with `null` spelled out.
///
/// # Usage
///
/// ```rust
/// use ripple_store::{Value, value};
///
/// assert_eq!(value!(null), Value::Null);
/// assert_eq!(value!(3), Value::Number(3.0));
/// ```
#[macro_export]
macro_rules! value {
    (null) => {
        $crate::Value::Null
    };
    ($e:expr) => {
        $crate::Value::from($e)
    };
}

/// Implement [`Diffable`] for a plain struct by shallow field comparison.
///
/// The diff carries a full clone of the current value whenever any listed
/// field differs, and `merge` replaces wholesale. Good enough for small
/// records where per-field diffs are not worth modelling; use [`Value`]
/// when they are.
///
/// # Usage
///
/// ```rust
/// use ripple_store::{Diffable, shallow_diffable};
///
/// #[derive(Clone, PartialEq)]
/// struct Track {
///     id: i64,
///     title: String,
/// }
///
/// shallow_diffable!(Track);
/// ```
///
/// [`Diffable`]: crate::Diffable
/// [`Value`]: crate::Value
#[macro_export]
macro_rules! shallow_diffable {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Diffable for $ty {
                fn deep_eq(&self, other: &Self) -> bool {
                    self == other
                }

                fn diff_from(&self, _previous: &Self) -> Self {
                    self.clone()
                }

                fn merge(&mut self, changes: &Self) {
                    *self = changes.clone();
                }
            }
        )+
    };
}

#[cfg(test)]
mod tests {
    use crate::change::Diffable;
    use crate::value::Value;

    #[test]
    fn record_builds_nested_objects() {
        let v = record! {
            "id" => 1,
            "nested" => record! { "flag" => true },
        };
        assert_eq!(v.get("id").and_then(Value::as_i64), Some(1));
        assert_eq!(
            v.get("nested")
                .and_then(|n| n.get("flag"))
                .and_then(Value::as_bool),
            Some(true)
        );
        assert_eq!(record! {}, Value::Object(crate::Fields::new()));
    }

    #[test]
    fn value_macro_covers_null_and_conversions() {
        assert_eq!(value!(null), Value::Null);
        assert_eq!(value!("s"), Value::String("s".into()));
        assert_eq!(value!(vec![1, 2]), Value::from(vec![1, 2]));
    }

    #[test]
    fn shallow_diffable_replaces_wholesale() {
        #[derive(Debug, Clone, PartialEq)]
        struct Point {
            x: i32,
            y: i32,
        }
        shallow_diffable!(Point);

        let a = Point { x: 1, y: 2 };
        let b = Point { x: 1, y: 3 };
        assert!(!a.deep_eq(&b));
        assert_eq!(b.diff_from(&a), b);

        let mut merged = a;
        merged.merge(&b);
        assert_eq!(merged, b);
    }
}
