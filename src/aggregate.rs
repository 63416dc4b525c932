use std::cmp::Ordering;
use std::collections::BTreeMap;

/// How a group's values collapse to one number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduce {
    Mean,
    Sum,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub key: String,
    pub value: f64,
}

/// Sum skipping NaN. Empty input gives 0.
pub fn sum<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    values.into_iter().filter(|v| !v.is_nan()).sum()
}

/// Arithmetic mean skipping NaN. Empty (or all-NaN) input gives NaN.
pub fn mean<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let (total, count) = values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(t, c), v| (t + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        total / count as f64
    }
}

fn reduce(values: Vec<f64>, how: Reduce) -> f64 {
    match how {
        Reduce::Mean => mean(values),
        Reduce::Sum => sum(values),
    }
}

/// Group items by a key and reduce one numeric column per group.
/// Groups come back in ascending key order.
pub fn group_by<T, K, V>(items: &[T], key: K, value: V, how: Reduce) -> Vec<Group>
where
    K: Fn(&T) -> &str,
    V: Fn(&T) -> f64,
{
    let mut buckets: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for item in items {
        buckets.entry(key(item)).or_default().push(value(item));
    }
    buckets
        .into_iter()
        .map(|(k, vals)| Group {
            key: k.to_string(),
            value: reduce(vals, how),
        })
        .collect()
}

/// Order two floats with NaN sorted after every number in either direction.
pub fn cmp_nan_last(a: f64, b: f64, descending: bool) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        }
    }
}

/// Stable sort of groups by value.
pub fn sort_by_value(groups: &mut [Group], descending: bool) {
    groups.sort_by(|a, b| cmp_nan_last(a.value, b.value, descending));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_skips_nan() {
        assert_eq!(mean([1.0, f64::NAN, 3.0]), 2.0);
        assert!(mean(Vec::<f64>::new()).is_nan());
        assert!(mean([f64::NAN]).is_nan());
    }

    #[test]
    fn test_sum_skips_nan() {
        assert_eq!(sum([1.0, f64::NAN, 2.0]), 3.0);
        assert_eq!(sum(Vec::<f64>::new()), 0.0);
    }

    #[test]
    fn test_mean_keeps_infinity() {
        assert!(mean([1.0, f64::INFINITY]).is_infinite());
    }

    #[test]
    fn test_group_by_mean_and_sum() {
        let items = vec![("b", 4.0), ("a", 1.0), ("b", 2.0), ("a", 3.0)];
        let means = group_by(&items, |i| i.0, |i| i.1, Reduce::Mean);
        assert_eq!(
            means,
            vec![
                Group { key: "a".into(), value: 2.0 },
                Group { key: "b".into(), value: 3.0 },
            ]
        );
        let sums = group_by(&items, |i| i.0, |i| i.1, Reduce::Sum);
        assert_eq!(sums[0].value, 4.0);
        assert_eq!(sums[1].value, 6.0);
    }

    #[test]
    fn test_sort_puts_nan_last() {
        let mut groups = vec![
            Group { key: "x".into(), value: f64::NAN },
            Group { key: "y".into(), value: 1.0 },
            Group { key: "z".into(), value: 5.0 },
        ];
        sort_by_value(&mut groups, true);
        let keys: Vec<&str> = groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["z", "y", "x"]);
        sort_by_value(&mut groups, false);
        let keys: Vec<&str> = groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["y", "z", "x"]);
    }
}
