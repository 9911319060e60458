use crate::models::{Candidate, SortDirection, SortKey, SortSpec};
use std::cmp::Ordering;

/// Secondary levels, in order, after the requested primary key
pub const CASCADE: [SortKey; 4] = [SortKey::Distance, SortKey::Age, SortKey::Tags, SortKey::Fame];

/// Direction a key uses when it is not the primary key
pub fn secondary_direction(key: SortKey) -> SortDirection {
    match key {
        SortKey::Distance => SortDirection::Asc,
        // younger first, i.e. birth date descending
        SortKey::Age => SortDirection::Asc,
        SortKey::Tags => SortDirection::Desc,
        SortKey::Fame => SortDirection::Desc,
    }
}

/// Total order over candidates: primary key, the fixed cascade, then id
pub fn compare_candidates(a: &Candidate, b: &Candidate, sort: SortSpec) -> Ordering {
    let mut ordering = compare_by(a, b, sort.key, sort.direction);

    for key in CASCADE {
        if ordering != Ordering::Equal {
            break;
        }
        if key != sort.key {
            ordering = compare_by(a, b, key, secondary_direction(key));
        }
    }

    ordering.then_with(|| a.id.cmp(&b.id))
}

fn compare_by(a: &Candidate, b: &Candidate, key: SortKey, direction: SortDirection) -> Ordering {
    match key {
        SortKey::Distance => nulls_last(a.distance_km, b.distance_km, direction, |x, y| x.total_cmp(y)),
        // ascending age is descending birth date
        SortKey::Age => nulls_last(a.birth_date, b.birth_date, direction, |x, y| y.cmp(x)),
        SortKey::Tags => directed(a.common_tag_count.cmp(&b.common_tag_count), direction),
        SortKey::Fame => directed(a.fame_rating.cmp(&b.fame_rating), direction),
    }
}

/// Unknown values go last whatever the direction
fn nulls_last<T>(
    a: Option<T>,
    b: Option<T>,
    direction: SortDirection,
    cmp: impl Fn(&T, &T) -> Ordering,
) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => directed(cmp(&x, &y), direction),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ranking::tests::candidate;

    fn ordered(mut candidates: Vec<Candidate>, sort: SortSpec) -> Vec<u128> {
        candidates.sort_by(|a, b| compare_candidates(a, b, sort));
        candidates.iter().map(|c| c.id.as_u128()).collect()
    }

    #[test]
    fn test_unknown_distance_last_in_both_directions() {
        let candidates = vec![
            candidate(1).with_distance(5.0),
            candidate(2),
            candidate(3).with_distance(2.0),
        ];

        let asc = SortSpec::new(SortKey::Distance, SortDirection::Asc);
        let desc = SortSpec::new(SortKey::Distance, SortDirection::Desc);
        assert_eq!(ordered(candidates.clone(), asc), vec![3, 1, 2]);
        assert_eq!(ordered(candidates, desc), vec![1, 3, 2]);
    }

    #[test]
    fn test_age_ascending_is_youngest_first() {
        let candidates = vec![
            candidate(1).born(1990, 1, 1),
            candidate(2).born(2000, 1, 1),
            candidate(3).without_birth_date(),
            candidate(4).born(1995, 1, 1),
        ];

        let asc = SortSpec::new(SortKey::Age, SortDirection::Asc);
        let desc = SortSpec::new(SortKey::Age, SortDirection::Desc);
        assert_eq!(ordered(candidates.clone(), asc), vec![2, 4, 1, 3]);
        assert_eq!(ordered(candidates, desc), vec![1, 4, 2, 3]);
    }

    #[test]
    fn test_primary_direction_applies_to_tags_and_fame() {
        let candidates = vec![
            candidate(1).with_common_tags(3).with_fame(10),
            candidate(2).with_common_tags(1).with_fame(90),
            candidate(3).with_common_tags(2).with_fame(50),
        ];

        assert_eq!(
            ordered(candidates.clone(), SortSpec::new(SortKey::Tags, SortDirection::Asc)),
            vec![2, 3, 1]
        );
        assert_eq!(
            ordered(candidates.clone(), SortSpec::new(SortKey::Tags, SortDirection::Desc)),
            vec![1, 3, 2]
        );
        assert_eq!(
            ordered(candidates, SortSpec::new(SortKey::Fame, SortDirection::Asc)),
            vec![1, 3, 2]
        );
    }

    #[test]
    fn test_cascade_order_skips_primary() {
        // equal fame: distance decides before age, tags
        let sort = SortSpec::new(SortKey::Fame, SortDirection::Desc);
        let candidates = vec![
            candidate(1).with_fame(70).with_distance(10.0).born(2001, 1, 1).with_common_tags(9),
            candidate(2).with_fame(70).with_distance(3.0).born(1980, 1, 1).with_common_tags(0),
        ];
        assert_eq!(ordered(candidates, sort), vec![2, 1]);

        // equal fame and distance: younger wins before tags
        let candidates = vec![
            candidate(1).with_fame(70).with_distance(3.0).born(1990, 1, 1).with_common_tags(9),
            candidate(2).with_fame(70).with_distance(3.0).born(1999, 1, 1).with_common_tags(0),
        ];
        assert_eq!(ordered(candidates, sort), vec![2, 1]);

        // equal fame, distance and age: more common tags first
        let candidates = vec![
            candidate(1).with_fame(70).with_distance(3.0).born(1990, 1, 1).with_common_tags(1),
            candidate(2).with_fame(70).with_distance(3.0).born(1990, 1, 1).with_common_tags(4),
        ];
        assert_eq!(ordered(candidates, sort), vec![2, 1]);
    }

    #[test]
    fn test_secondary_levels_keep_fixed_direction() {
        // primary age desc must not flip the secondary distance direction
        let sort = SortSpec::new(SortKey::Age, SortDirection::Desc);
        let candidates = vec![
            candidate(1).born(1990, 1, 1).with_distance(8.0),
            candidate(2).born(1990, 1, 1).with_distance(2.0),
            candidate(3).born(1990, 1, 1),
        ];
        assert_eq!(ordered(candidates, sort), vec![2, 1, 3]);

        // distance primary: ties fall to age (younger first) then tags then fame
        let sort = SortSpec::new(SortKey::Distance, SortDirection::Desc);
        let candidates = vec![
            candidate(1).with_distance(4.0).born(1990, 1, 1).with_common_tags(2).with_fame(10),
            candidate(2).with_distance(4.0).born(1990, 1, 1).with_common_tags(2).with_fame(80),
            candidate(3).with_distance(4.0).born(1993, 6, 1).with_common_tags(0).with_fame(0),
        ];
        assert_eq!(ordered(candidates, sort), vec![3, 2, 1]);
    }

    #[test]
    fn test_full_ties_break_on_id() {
        let candidates = vec![candidate(9), candidate(4), candidate(7)];
        assert_eq!(ordered(candidates, SortSpec::default()), vec![4, 7, 9]);
    }

    #[test]
    fn test_unknown_birth_date_last_as_secondary() {
        let sort = SortSpec::new(SortKey::Fame, SortDirection::Desc);
        let candidates = vec![
            candidate(1).with_fame(60).without_birth_date(),
            candidate(2).with_fame(60).born(1970, 1, 1),
        ];
        assert_eq!(ordered(candidates, sort), vec![2, 1]);
    }
}
