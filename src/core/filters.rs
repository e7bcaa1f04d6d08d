use crate::models::{Candidate, Preferences, User};

/// Narrow a same-city candidate pool to the ones the requester would accept.
///
/// Gender and age are read from the candidate's live profile, not the queue
/// snapshot. Queue order is preserved.
pub fn filter_candidates(preferences: &Preferences, candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates
        .into_iter()
        .filter(|candidate| preferences.accepts(candidate.gender, candidate.age))
        .collect()
}

/// Whether the candidate's own preferences accept the requester
#[inline]
pub fn accepts_requester(candidate: &Candidate, requester: &User) -> bool {
    match requester.age {
        Some(age) => candidate.preferences.accepts(requester.gender, age),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, GenderPreference};

    fn candidate(user_id: i64, gender: Gender, age: u8) -> Candidate {
        Candidate {
            user_id,
            location: "Bandung".to_string(),
            coordinates: None,
            gender,
            age,
            preferences: Preferences::default(),
        }
    }

    fn female_20_to_30() -> Preferences {
        Preferences {
            gender: GenderPreference::Female,
            min_age: 20,
            max_age: 30,
            radius_km: 0,
        }
    }

    #[test]
    fn test_age_bounds_are_inclusive() {
        let pool = vec![
            candidate(1, Gender::Female, 19),
            candidate(2, Gender::Female, 20),
            candidate(3, Gender::Female, 30),
            candidate(4, Gender::Female, 31),
        ];

        let ids: Vec<i64> = filter_candidates(&female_20_to_30(), pool)
            .iter()
            .map(|c| c.user_id)
            .collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_gender_filter() {
        let pool = vec![
            candidate(1, Gender::Male, 25),
            candidate(2, Gender::Unknown, 25),
            candidate(3, Gender::Female, 25),
        ];

        let survivors = filter_candidates(&female_20_to_30(), pool.clone());
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].user_id, 3);

        let any = Preferences {
            gender: GenderPreference::Any,
            ..female_20_to_30()
        };
        assert_eq!(filter_candidates(&any, pool).len(), 3);
    }

    #[test]
    fn test_accepts_requester() {
        let mut requester = User::new(10, Preferences::default());
        requester.gender = Gender::Male;
        requester.age = Some(25);

        let mut picky = candidate(1, Gender::Female, 25);
        picky.preferences = female_20_to_30();
        assert!(!accepts_requester(&picky, &requester));

        let open = candidate(2, Gender::Female, 25);
        assert!(accepts_requester(&open, &requester));

        requester.age = None;
        assert!(!accepts_requester(&open, &requester));
    }
}
