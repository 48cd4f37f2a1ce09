//! Page collation.
//!
//! Pages are ordered by their basename stems using a natural, numeric-aware,
//! case-insensitive comparison: `page_2` sorts before `page_10`, and `Page_3`
//! sorts with `page_3`.

use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.next_if(char::is_ascii_digit) {
        digits.push(c);
    }
    digits
}

fn compare_numbers(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Natural comparison of two names.
///
/// Runs of ASCII digits compare by numeric value (of any length), everything
/// else compares case-insensitively. Names that differ only in case or in
/// leading zeros compare equal.
///
/// ```
/// use std::cmp::Ordering;
/// use arca_ingest::natural_cmp;
/// assert_eq!(natural_cmp("page_2", "page_10"), Ordering::Less);
/// assert_eq!(natural_cmp("Page_02", "page_2"), Ordering::Equal);
/// ```
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();
    loop {
        let (x, y) = match (a.peek(), b.peek()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => (*x, *y),
        };
        if x.is_ascii_digit() && y.is_ascii_digit() {
            let ordering = compare_numbers(&take_digits(&mut a), &take_digits(&mut b));
            if ordering != Ordering::Equal {
                return ordering;
            }
            continue;
        }
        let ordering = x.to_lowercase().cmp(y.to_lowercase());
        if ordering != Ordering::Equal {
            return ordering;
        }
        a.next();
        b.next();
    }
}

/// Page order: natural comparison of names, then the store's ordinal, then
/// byte-wise comparison of names.
pub(crate) fn page_order((a, a_ordinal): (&str, usize), (b, b_ordinal): (&str, usize)) -> Ordering {
    natural_cmp(a, b).then(a_ordinal.cmp(&b_ordinal)).then_with(|| a.cmp(b))
}
