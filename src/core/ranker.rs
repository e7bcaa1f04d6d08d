use crate::core::distance::{calculate_bounding_box, is_within_bounding_box};
use crate::models::{Candidate, Coordinates, UserId};

/// The candidate picked for a pairing attempt
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub user_id: UserId,
    /// `None` when the pick fell back to queue order
    pub distance_km: Option<f64>,
}

/// Pick the nearest candidate.
///
/// With requester coordinates, only candidates that also have coordinates are
/// ranked, and the first minimum wins. A positive `radius_km` removes located
/// candidates farther than the radius from the pool entirely. When nothing
/// can be ranked, the first remaining candidate in filtered order is chosen.
pub fn select_nearest(
    origin: Option<Coordinates>,
    radius_km: u16,
    candidates: &[Candidate],
) -> Option<Selection> {
    let Some(origin) = origin else {
        return candidates.first().map(queue_order_pick);
    };

    let limit = (radius_km > 0).then(|| {
        let radius = f64::from(radius_km);
        (radius, calculate_bounding_box(origin, radius))
    });

    let mut nearest: Option<Selection> = None;
    let mut fallback: Option<&Candidate> = None;

    for candidate in candidates {
        let Some(point) = candidate.coordinates else {
            fallback = fallback.or(Some(candidate));
            continue;
        };

        if let Some((_, bbox)) = &limit {
            if !is_within_bounding_box(point, bbox) {
                continue;
            }
        }

        let distance = origin.distance_km(&point);
        if limit.is_some_and(|(radius, _)| distance > radius) {
            continue;
        }

        // Strict comparison keeps the first of equal distances
        if nearest.map_or(true, |best| distance < best.distance_km.unwrap_or(f64::MAX)) {
            nearest = Some(Selection {
                user_id: candidate.user_id,
                distance_km: Some(distance),
            });
        }
    }

    if let Some(selection) = nearest {
        tracing::debug!(
            "Nearest candidate {} at {:.2} km",
            selection.user_id,
            selection.distance_km.unwrap_or_default()
        );
        return Some(selection);
    }

    fallback.map(queue_order_pick)
}

fn queue_order_pick(candidate: &Candidate) -> Selection {
    Selection {
        user_id: candidate.user_id,
        distance_km: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, Preferences};

    fn candidate(user_id: UserId, coordinates: Option<Coordinates>) -> Candidate {
        Candidate {
            user_id,
            location: "Bandung".to_string(),
            coordinates,
            gender: Gender::Female,
            age: 25,
            preferences: Preferences::default(),
        }
    }

    #[test]
    fn test_picks_nearest() {
        let pool = vec![
            candidate(1, Some(Coordinates::new(0.0, 5.0))),
            candidate(2, Some(Coordinates::new(0.0, 1.0))),
        ];

        let selection = select_nearest(Some(Coordinates::new(0.0, 0.0)), 0, &pool).unwrap();
        assert_eq!(selection.user_id, 2);
        assert!(selection.distance_km.is_some());
    }

    #[test]
    fn test_ties_go_to_first() {
        let pool = vec![
            candidate(1, Some(Coordinates::new(0.0, 1.0))),
            candidate(2, Some(Coordinates::new(0.0, -1.0))),
        ];

        let selection = select_nearest(Some(Coordinates::new(0.0, 0.0)), 0, &pool).unwrap();
        assert_eq!(selection.user_id, 1);
    }

    #[test]
    fn test_located_candidates_outrank_unlocated() {
        let pool = vec![
            candidate(1, None),
            candidate(2, Some(Coordinates::new(0.0, 3.0))),
        ];

        let selection = select_nearest(Some(Coordinates::new(0.0, 0.0)), 0, &pool).unwrap();
        assert_eq!(selection.user_id, 2);
    }

    #[test]
    fn test_fallback_without_coordinates() {
        let pool = vec![candidate(7, None), candidate(8, None)];

        let selection = select_nearest(None, 0, &pool).unwrap();
        assert_eq!(selection, Selection { user_id: 7, distance_km: None });

        let selection = select_nearest(Some(Coordinates::new(0.0, 0.0)), 0, &pool).unwrap();
        assert_eq!(selection.user_id, 7);
    }

    #[test]
    fn test_radius_excludes_far_candidates() {
        let pool = vec![
            candidate(1, Some(Coordinates::new(0.0, 5.0))),
            candidate(2, Some(Coordinates::new(0.0, 1.0))),
        ];
        let origin = Some(Coordinates::new(0.0, 0.0));

        // ~111 km to candidate 2, ~556 km to candidate 1
        let selection = select_nearest(origin, 200, &pool).unwrap();
        assert_eq!(selection.user_id, 2);

        assert!(select_nearest(origin, 50, &pool).is_none());
    }

    #[test]
    fn test_radius_keeps_unlocated_fallback() {
        let pool = vec![
            candidate(1, Some(Coordinates::new(0.0, 5.0))),
            candidate(2, None),
        ];

        let selection = select_nearest(Some(Coordinates::new(0.0, 0.0)), 50, &pool).unwrap();
        assert_eq!(selection, Selection { user_id: 2, distance_km: None });
    }

    #[test]
    fn test_empty_pool() {
        assert!(select_nearest(None, 0, &[]).is_none());
        assert!(select_nearest(Some(Coordinates::new(0.0, 0.0)), 10, &[]).is_none());
    }

    #[test]
    fn test_radius_keeps_candidate_at_high_latitude() {
        // ~994 km apart, mostly east-west
        let pool = vec![candidate(1, Some(Coordinates::new(61.26, 18.1)))];

        let selection = select_nearest(Some(Coordinates::new(60.0, 0.0)), 1000, &pool).unwrap();
        assert_eq!(selection.user_id, 1);
        assert!(selection.distance_km.unwrap() < 1000.0);
    }

    #[test]
    fn test_radius_keeps_candidate_across_antimeridian() {
        let pool = vec![candidate(1, Some(Coordinates::new(-16.5, -179.95)))];

        let selection = select_nearest(Some(Coordinates::new(-16.5, 179.95)), 50, &pool).unwrap();
        assert_eq!(selection.user_id, 1);
        assert!(selection.distance_km.unwrap() < 11.0);
    }
}
