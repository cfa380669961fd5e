//! Joint angle from three landmarks.
//!
//! The angle is measured at the middle landmark between the rays towards
//! the other two, and is always the interior angle in [0, 180].

use crate::exercise::ExerciseProfile;
use crate::landmark::{Landmark, Pose};

/// Angle at `b` formed by `b→a` and `b→c`, in degrees.
///
/// Returns 0 when any landmark is missing. Use [`measure`] when the
/// caller needs to tell "unmeasurable" apart from a real reading.
pub fn joint_angle(a: Option<&Landmark>, b: Option<&Landmark>, c: Option<&Landmark>) -> f64 {
    match (a, b, c) {
        (Some(a), Some(b), Some(c)) => interior_angle(a, b, c),
        _ => 0.0,
    }
}

fn interior_angle(a: &Landmark, b: &Landmark, c: &Landmark) -> f64 {
    let radians = (c.y - b.y).atan2(c.x - b.x) - (a.y - b.y).atan2(a.x - b.x);
    let angle = radians.abs().to_degrees();
    if angle > 180.0 {
        360.0 - angle
    } else {
        angle
    }
}

/// Angle of the profile's joint in this pose, or `None` if any of the
/// three landmarks is absent or the result is not a finite number.
pub fn measure(pose: &Pose, profile: &ExerciseProfile) -> Option<f64> {
    let [proximal, joint, distal] = profile.landmarks;
    let angle = interior_angle(
        pose.landmark(proximal)?,
        pose.landmark(joint)?,
        pose.landmark(distal)?,
    );
    angle.is_finite().then_some(angle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercise::Exercise;
    use crate::landmark::{LEFT_ELBOW, LEFT_SHOULDER, LEFT_WRIST};

    fn lm(x: f64, y: f64) -> Landmark {
        Landmark::new(x, y)
    }

    #[test]
    fn straight_line_is_180() {
        let angle = joint_angle(Some(&lm(0.0, 0.0)), Some(&lm(0.5, 0.0)), Some(&lm(1.0, 0.0)));
        assert!((angle - 180.0).abs() < 1e-9);
    }

    #[test]
    fn right_angle_is_90() {
        let angle = joint_angle(Some(&lm(0.0, 0.0)), Some(&lm(0.5, 0.0)), Some(&lm(0.5, 0.5)));
        assert!((angle - 90.0).abs() < 1e-9);
    }

    #[test]
    fn reflex_difference_folds_to_interior() {
        // atan2 difference here is 270 degrees, interior angle is 90
        let angle = joint_angle(Some(&lm(0.0, 1.0)), Some(&lm(0.5, 0.5)), Some(&lm(0.0, 0.0)));
        assert!((angle - 90.0).abs() < 1e-9);
    }

    #[test]
    fn symmetric_and_bounded() {
        let points = [
            (lm(0.1, 0.9), lm(0.4, 0.4), lm(0.8, 0.7)),
            (lm(0.9, 0.1), lm(0.2, 0.3), lm(0.3, 0.95)),
            (lm(0.5, 0.1), lm(0.5, 0.5), lm(0.49, 0.1)),
            (lm(0.0, 0.0), lm(1.0, 1.0), lm(0.0, 1.0)),
        ];
        for (a, b, c) in points.iter() {
            let forward = joint_angle(Some(a), Some(b), Some(c));
            let backward = joint_angle(Some(c), Some(b), Some(a));
            assert!((forward - backward).abs() < 1e-9);
            assert!((0.0..=180.0).contains(&forward));
        }
    }

    #[test]
    fn missing_landmark_yields_zero() {
        let p = lm(0.3, 0.3);
        assert_eq!(joint_angle(None, Some(&p), Some(&p)), 0.0);
        assert_eq!(joint_angle(Some(&p), None, Some(&p)), 0.0);
        assert_eq!(joint_angle(Some(&p), Some(&p), None), 0.0);
    }

    #[test]
    fn measure_uses_profile_landmarks() {
        let mut landmarks = vec![lm(0.0, 0.0); 33];
        landmarks[LEFT_SHOULDER] = lm(0.5, 0.2);
        landmarks[LEFT_ELBOW] = lm(0.5, 0.4);
        landmarks[LEFT_WRIST] = lm(0.7, 0.4);
        let pose = Pose::new(landmarks);

        let angle = measure(&pose, Exercise::Curls.profile()).unwrap();
        assert!((angle - 90.0).abs() < 1e-9);
    }

    #[test]
    fn measure_rejects_non_finite_coordinates() {
        let mut landmarks = vec![lm(0.5, 0.5); 33];
        landmarks[LEFT_WRIST] = lm(f64::NAN, 0.4);
        assert_eq!(measure(&Pose::new(landmarks.clone()), Exercise::Pushups.profile()), None);

        landmarks[LEFT_WRIST] = lm(0.7, 0.4);
        landmarks[LEFT_SHOULDER] = lm(f64::INFINITY, 0.2);
        assert_eq!(measure(&Pose::new(landmarks), Exercise::Pushups.profile()), None);
    }

    #[test]
    fn measure_reports_missing_landmarks() {
        let pose = Pose::new(vec![lm(0.5, 0.5); 14]);
        assert_eq!(measure(&pose, Exercise::Pushups.profile()), None);
    }
}
