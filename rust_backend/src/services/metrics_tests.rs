#[cfg(test)]
mod tests {
    use crate::core::domain::{Candidate, DetectionPoint, MovementBehavior, TrackwayId};
    use crate::core::geometry::{Point2, Polyline};
    use crate::services::metrics::{compute_metrics, edge_distance, morans_i};
    use chrono::{TimeZone, Utc};

    fn candidate(points: &[(i64, f64, f64, f64)]) -> Candidate {
        Candidate::new(
            7,
            points
                .iter()
                .map(|&(t, x, y, c)| {
                    DetectionPoint::new(Utc.timestamp_opt(t, 0).unwrap(), x, y, c, "deer")
                })
                .collect(),
        )
    }

    fn line_positions(n: usize) -> Vec<Point2> {
        (0..n).map(|i| Point2::new(i as f64, 0.0)).collect()
    }

    #[test]
    fn test_basic_metrics() {
        let c = candidate(&[
            (0, 0.0, 0.0, 0.8),
            (1, 10.0, 0.0, 0.9),
            (2, 20.0, 0.0, 1.0),
            (3, 30.0, 0.0, 0.9),
        ]);
        let t = compute_metrics(TrackwayId(3), &c, Some(MovementBehavior::Commuting), &[]);

        assert_eq!(t.id, TrackwayId(3));
        assert!((t.length - 30.0).abs() < 1e-12);
        // Leading point contributes a speed of 0: (0 + 10 + 10 + 10) / 4.
        assert!((t.average_speed - 7.5).abs() < 1e-12);
        assert!((t.confidence_mean - 0.9).abs() < 1e-12);
        assert!((t.confidence_std - 0.005_f64.sqrt()).abs() < 1e-12);
        assert_eq!(t.behavior, Some(MovementBehavior::Commuting));
        assert!(t.habitat_type.is_none());
        assert!(t.edge_distance.is_none());
        assert!(t.spatial_autocorrelation.value.is_some());
    }

    #[test]
    fn test_tortuosity_at_least_one() {
        let c = candidate(&[
            (0, 0.0, 0.0, 0.9),
            (5, 8.0, 3.0, 0.9),
            (10, 12.0, -2.0, 0.9),
            (15, 20.0, 1.0, 0.9),
        ]);
        let t = compute_metrics(TrackwayId(1), &c, None, &[]);
        assert!(t.tortuosity().unwrap() >= 1.0);
    }

    #[test]
    fn test_morans_i_positive_gradient() {
        let values: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let result = morans_i(&line_positions(10), &values);
        assert!((result.value.unwrap() - 0.657_171_717).abs() < 1e-6);
        assert!(result.p_value.unwrap() < 1e-5);
    }

    #[test]
    fn test_morans_i_alternating() {
        let values: Vec<f64> = (0..10).map(|i| (i % 2) as f64).collect();
        let result = morans_i(&line_positions(10), &values);
        assert!((result.value.unwrap() + 0.14).abs() < 1e-9);
        assert!((result.p_value.unwrap() - 0.861).abs() < 1e-3);
    }

    #[test]
    fn test_morans_i_degrades_to_none() {
        let few = morans_i(&line_positions(3), &[1.0, 2.0, 3.0]);
        assert!(few.value.is_none() && few.p_value.is_none());

        let constant = morans_i(&line_positions(6), &[2.0; 6]);
        assert!(constant.value.is_none());

        let infinite = morans_i(&line_positions(5), &[0.0, 1.0, f64::INFINITY, 1.0, 2.0]);
        assert!(infinite.value.is_none());
    }

    /// Moran's I from a full distance sort and a dense weight matrix.
    fn dense_morans_i(positions: &[Point2], values: &[f64]) -> f64 {
        let n = positions.len();
        let k = 4.min(n - 1);
        let mut linked = vec![vec![false; n]; n];
        for i in 0..n {
            let mut others: Vec<(f64, usize)> = (0..n)
                .filter(|&j| j != i)
                .map(|j| (positions[i].distance(&positions[j]), j))
                .collect();
            others.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            for &(_, j) in others.iter().take(k) {
                linked[i][j] = true;
                linked[j][i] = true;
            }
        }
        let m = values.iter().sum::<f64>() / n as f64;
        let z: Vec<f64> = values.iter().map(|v| v - m).collect();
        let m2: f64 = z.iter().map(|d| d * d).sum();
        let mut s0 = 0.0;
        let mut cross = 0.0;
        for i in 0..n {
            let degree = linked[i].iter().filter(|&&l| l).count() as f64;
            for j in 0..n {
                if linked[i][j] {
                    s0 += 1.0 / degree;
                    cross += z[i] * z[j] / degree;
                }
            }
        }
        n as f64 / s0 * cross / m2
    }

    #[test]
    fn test_morans_i_long_trackway() {
        // Jittered walk so distances are not all tied.
        let n = 1500;
        let positions: Vec<Point2> = (0..n)
            .map(|i| Point2::new(i as f64 * 2.0, ((i * 7) % 5) as f64 * 0.3))
            .collect();
        let values: Vec<f64> = (0..n).map(|i| i as f64 * 0.01).collect();

        let result = morans_i(&positions, &values);
        let value = result.value.unwrap();
        assert!((value - dense_morans_i(&positions, &values)).abs() < 1e-9);
        assert!(value > 0.99);
        assert!(result.p_value.unwrap() < 1e-12);
    }

    #[test]
    fn test_edge_distance() {
        let features = vec![Polyline::new(vec![Point2::new(0.0, 5.0), Point2::new(100.0, 5.0)])];
        let points = [Point2::new(0.0, 0.0), Point2::new(10.0, 2.0)];
        assert_eq!(edge_distance(&points, &features), Some(4.0));
        assert_eq!(edge_distance(&points, &[]), None);
    }
}
