//! Source priority: pick one value out of the per-source lookups.

use serde_json::Value;

use crate::types::SourceKind;

/// The outcome of looking a key up in one source.
///
/// `Null` is a defined value: a source that explicitly sets `null` beats a
/// lower-priority source with a real value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    Absent,
    Null,
    Present(&'a Value),
}

impl<'a> Lookup<'a> {
    pub fn from_option(value: Option<&'a Value>) -> Self {
        match value {
            None => Lookup::Absent,
            Some(Value::Null) => Lookup::Null,
            Some(v) => Lookup::Present(v),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Lookup::Absent)
    }

    /// The value to record in the raw tree; `None` for absent keys.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Lookup::Absent => None,
            Lookup::Null => Some(Value::Null),
            Lookup::Present(v) => Some(v.clone()),
        }
    }
}

/// Pick the winning lookup. `priority` is ordered lowest to highest: the
/// last listed source that defines the key wins. Sources not listed in
/// `priority` never contribute.
pub fn pick<'a>(values: &[(SourceKind, Lookup<'a>)], priority: &[SourceKind]) -> Lookup<'a> {
    priority
        .iter()
        .rev()
        .find_map(|source| {
            values
                .iter()
                .find(|(kind, lookup)| kind == source && !lookup.is_absent())
                .map(|(kind, lookup)| {
                    tracing::trace!(source = %kind, "picked value");
                    *lookup
                })
        })
        .unwrap_or(Lookup::Absent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::default_priority;
    use serde_json::json;

    #[test]
    fn last_listed_source_wins() {
        let file = json!(5000);
        let env = json!("8989");
        let values = [
            (SourceKind::File, Lookup::Present(&file)),
            (SourceKind::Env, Lookup::Present(&env)),
            (SourceKind::Cli, Lookup::Absent),
        ];
        assert_eq!(pick(&values, &default_priority()), Lookup::Present(&env));

        let reversed = [SourceKind::Cli, SourceKind::Env, SourceKind::File];
        assert_eq!(pick(&values, &reversed), Lookup::Present(&file));
    }

    #[test]
    fn single_defined_source_wins_under_any_priority() {
        let v = json!("only");
        let values = [
            (SourceKind::File, Lookup::Absent),
            (SourceKind::Env, Lookup::Present(&v)),
            (SourceKind::Cli, Lookup::Absent),
        ];
        let orders = [
            vec![SourceKind::File, SourceKind::Env, SourceKind::Cli],
            vec![SourceKind::Env, SourceKind::Cli, SourceKind::File],
            vec![SourceKind::Cli, SourceKind::File, SourceKind::Env],
            vec![SourceKind::Env],
        ];
        for order in orders {
            assert_eq!(pick(&values, &order), Lookup::Present(&v), "order {order:?}");
        }
    }

    #[test]
    fn null_counts_as_defined() {
        let file = json!("from file");
        let values = [
            (SourceKind::File, Lookup::Present(&file)),
            (SourceKind::Env, Lookup::Absent),
            (SourceKind::Cli, Lookup::Null),
        ];
        assert_eq!(pick(&values, &default_priority()), Lookup::Null);
    }

    #[test]
    fn unlisted_sources_never_contribute() {
        let cli = json!("cli");
        let values = [(SourceKind::Cli, Lookup::Present(&cli))];
        assert_eq!(pick(&values, &[SourceKind::File, SourceKind::Env]), Lookup::Absent);
    }

    #[test]
    fn nothing_defined_is_absent() {
        let values = [
            (SourceKind::File, Lookup::Absent),
            (SourceKind::Env, Lookup::Absent),
        ];
        assert_eq!(pick(&values, &default_priority()), Lookup::Absent);
        assert_eq!(pick(&[], &default_priority()), Lookup::Absent);
    }

    #[test]
    fn from_option_maps_null() {
        let v = json!(1);
        assert_eq!(Lookup::from_option(None), Lookup::Absent);
        assert_eq!(Lookup::from_option(Some(&Value::Null)), Lookup::Null);
        assert_eq!(Lookup::from_option(Some(&v)), Lookup::Present(&v));
        assert_eq!(Lookup::Null.into_value(), Some(Value::Null));
        assert_eq!(Lookup::Absent.into_value(), None);
    }
}
