use chrono::{Days, NaiveDate};
use dxy_yield::align::{align, filter};
use dxy_yield::domain::{AlignedRecord, DateRange, Series, TimePoint};
use proptest::prelude::*;

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
}

fn day(offset: u64) -> NaiveDate {
    base().checked_add_days(Days::new(offset)).unwrap()
}

fn arb_point() -> impl Strategy<Value = TimePoint> {
    (0u64..400, proptest::option::weighted(0.9, 1.0f64..200.0))
        .prop_map(|(offset, value)| TimePoint::new(day(offset), value))
}

fn arb_series() -> impl Strategy<Value = Series> {
    proptest::collection::vec(arb_point(), 0..120).prop_map(Series::from_unsorted)
}

fn arb_range() -> impl Strategy<Value = DateRange> {
    (0u64..400, 0u64..400).prop_map(|(a, b)| DateRange {
        start: day(a.min(b)),
        end: day(a.max(b)),
    })
}

/// Quadratic reference: scan every right point for each left point.
fn brute_force(left: &Series, right: &Series) -> Vec<AlignedRecord> {
    let mut out = Vec::new();
    for l in left {
        let matched = right.iter().filter(|r| r.date <= l.date).last();
        if let (Some(lv), Some(r)) = (l.value, matched) {
            if let Some(rv) = r.value {
                out.push(AlignedRecord {
                    date: l.date,
                    left: lv,
                    right: rv,
                    right_date: r.date,
                });
            }
        }
    }
    out
}

proptest! {
    #[test]
    fn empty_side_aligns_to_nothing(s in arb_series()) {
        prop_assert!(align(&s, &Series::default()).unwrap().is_empty());
        prop_assert!(align(&Series::default(), &s).unwrap().is_empty());
    }

    #[test]
    fn matches_reference_join(left in arb_series(), right in arb_series()) {
        prop_assert_eq!(align(&left, &right).unwrap(), brute_force(&left, &right));
    }

    #[test]
    fn no_look_ahead_and_dates_come_from_left(left in arb_series(), right in arb_series()) {
        let out = align(&left, &right).unwrap();
        prop_assert!(out.len() <= left.len());
        for r in &out {
            prop_assert!(r.right_date <= r.date);
            prop_assert!(left.iter().any(|p| p.date == r.date));
            prop_assert!(right.iter().any(|p| p.date == r.right_date));
        }
        prop_assert!(out.windows(2).all(|w| w[0].date <= w[1].date));
    }

    #[test]
    fn alignment_is_deterministic(left in arb_series(), right in arb_series()) {
        prop_assert_eq!(align(&left, &right).unwrap(), align(&left, &right).unwrap());
    }

    #[test]
    fn covering_range_is_a_no_op(s in arb_series()) {
        let covering = DateRange { start: day(0), end: day(400) };
        prop_assert_eq!(filter(&s, &covering).unwrap(), s);
    }

    #[test]
    fn filter_is_monotone_under_inclusion(s in arb_series(), outer in arb_range(), a in 0u64..400, b in 0u64..400) {
        let span = outer.end - outer.start;
        let len = span.num_days() as u64;
        let (lo, hi) = (a.min(b) % (len + 1), a.max(b) % (len + 1));
        let inner = DateRange {
            start: outer.start.checked_add_days(Days::new(lo.min(hi))).unwrap(),
            end: outer.start.checked_add_days(Days::new(lo.max(hi))).unwrap(),
        };
        prop_assume!(inner.is_within(&outer));

        let small = filter(&s, &inner).unwrap();
        let large = filter(&s, &outer).unwrap();
        prop_assert!(small.len() <= large.len());
        for p in &small {
            prop_assert!(large.iter().any(|q| q == p));
        }
    }

    #[test]
    fn range_bounds_are_inclusive(s in arb_series(), range in arb_range()) {
        let kept = filter(&s, &range).unwrap();
        let expected = s.iter().filter(|p| p.date >= range.start && p.date <= range.end).count();
        prop_assert_eq!(kept.len(), expected);
        for p in s.iter().filter(|p| p.date == range.start || p.date == range.end) {
            prop_assert!(kept.iter().any(|q| q == p));
        }
    }

    #[test]
    fn inverted_range_is_rejected(s in arb_series(), range in arb_range()) {
        prop_assume!(range.start != range.end);
        let inverted = DateRange { start: range.end, end: range.start };
        prop_assert!(filter(&s, &inverted).is_err());
    }
}
