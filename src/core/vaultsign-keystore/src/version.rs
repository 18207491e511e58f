//! Dotted version comparison.
//!
//! Components are compared numerically, left to right. A missing component
//! counts as zero and only the leading digits of a component are used, so
//! `1.15` equals `1.15.0`. Build metadata after `+` is ignored. A pre-release
//! after `-` ranks below the release it precedes: `1.15.0-rc1 < 1.15.0`.

use std::cmp::Ordering;

/// Oldest KMS release with the transit features this crate relies on.
pub const MIN_VERSION: &str = "1.15";

struct Version<'a> {
    release: Vec<u64>,
    pre: Option<&'a str>,
}

fn parse(version: &str) -> Version<'_> {
    let version = version.trim().trim_start_matches('v');
    let version = version.split_once('+').map_or(version, |(core, _)| core);
    let (core, pre) = match version.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (version, None),
    };

    let release = core
        .split('.')
        .map(|part| {
            let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().unwrap_or(0)
        })
        .collect();

    Version { release, pre }
}

fn compare_release(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());

    (0..len)
        .map(|i| {
            let x = a.get(i).copied().unwrap_or(0);
            let y = b.get(i).copied().unwrap_or(0);
            x.cmp(&y)
        })
        .find(|ord| ord.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Numeric identifiers compare numerically and sort before alphanumeric ones.
fn compare_pre(a: &str, b: &str) -> Ordering {
    let mut a = a.split('.');
    let mut b = b.split('.');

    loop {
        let ord = match (a.next(), b.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => match (x.parse::<u64>(), y.parse::<u64>()) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                (Ok(_), Err(_)) => Ordering::Less,
                (Err(_), Ok(_)) => Ordering::Greater,
                (Err(_), Err(_)) => x.cmp(y),
            },
        };
        if ord.is_ne() {
            return ord;
        }
    }
}

/// Compares two dotted versions.
pub fn compare(a: &str, b: &str) -> Ordering {
    let (a, b) = (parse(a), parse(b));

    compare_release(&a.release, &b.release).then_with(|| match (a.pre, b.pre) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => compare_pre(x, y),
    })
}

/// Returns whether `version` is at least `minimum`.
pub fn is_at_least(version: &str, minimum: &str) -> bool {
    compare(version, minimum) != Ordering::Less
}
