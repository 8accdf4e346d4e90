//! Constant-velocity Kalman filter over box state, built on nalgebra static matrices.
//!
//! State: `[cx, cy, a, h, vx, vy, va, vh]` where `a` is the aspect ratio w/h.
//! Measurement: `[cx, cy, a, h]`.

use nalgebra::{SMatrix, SVector};

pub type StateVector = SVector<f64, 8>;
pub type StateCovariance = SMatrix<f64, 8, 8>;
pub type Measurement = SVector<f64, 4>;

type MeasurementCovariance = SMatrix<f64, 4, 4>;
type ObservationMatrix = SMatrix<f64, 4, 8>;

#[derive(Debug, Clone)]
pub struct KalmanFilter {
    motion_mat: StateCovariance,
    update_mat: ObservationMatrix,
    std_weight_position: f64,
    std_weight_velocity: f64,
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl KalmanFilter {
    pub fn new() -> Self {
        let ndim = 4;
        let mut motion_mat = StateCovariance::identity();
        for i in 0..ndim {
            motion_mat[(i, ndim + i)] = 1.0;
        }

        let mut update_mat = ObservationMatrix::zeros();
        for i in 0..ndim {
            update_mat[(i, i)] = 1.0;
        }

        Self {
            motion_mat,
            update_mat,
            std_weight_position: 1.0 / 20.0,
            std_weight_velocity: 1.0 / 160.0,
        }
    }

    /// Start a track from an unassociated measurement; velocities begin at zero.
    pub fn initiate(&self, measurement: &Measurement) -> (StateVector, StateCovariance) {
        let mut mean = StateVector::zeros();
        mean.fixed_rows_mut::<4>(0).copy_from(measurement);

        let h = measurement[3];
        let pos = 2.0 * self.std_weight_position * h;
        let vel = 10.0 * self.std_weight_velocity * h;
        let std = StateVector::from([pos, pos, 1e-2, pos, vel, vel, 1e-5, vel]);

        (mean, StateCovariance::from_diagonal(&std.component_mul(&std)))
    }

    pub fn predict(
        &self,
        mean: &StateVector,
        covariance: &StateCovariance,
    ) -> (StateVector, StateCovariance) {
        let h = mean[3];
        let pos = self.std_weight_position * h;
        let vel = self.std_weight_velocity * h;
        let std = StateVector::from([pos, pos, 1e-2, pos, vel, vel, 1e-5, vel]);
        let motion_cov = StateCovariance::from_diagonal(&std.component_mul(&std));

        let new_mean = self.motion_mat * mean;
        let new_covariance =
            self.motion_mat * covariance * self.motion_mat.transpose() + motion_cov;

        (new_mean, new_covariance)
    }

    fn project(
        &self,
        mean: &StateVector,
        covariance: &StateCovariance,
    ) -> (Measurement, MeasurementCovariance) {
        let h = mean[3];
        let pos = self.std_weight_position * h;
        let std = Measurement::from([pos, pos, 1e-1, pos]);
        let innovation_cov = MeasurementCovariance::from_diagonal(&std.component_mul(&std));

        let mean_proj = self.update_mat * mean;
        let covariance_proj =
            self.update_mat * covariance * self.update_mat.transpose() + innovation_cov;

        (mean_proj, covariance_proj)
    }

    /// Correct the state with a measurement.
    ///
    /// Returns `None` when the projected covariance is singular; callers keep
    /// the predicted state in that case.
    pub fn update(
        &self,
        mean: &StateVector,
        covariance: &StateCovariance,
        measurement: &Measurement,
    ) -> Option<(StateVector, StateCovariance)> {
        let (projected_mean, projected_cov) = self.project(mean, covariance);
        let s_inv = projected_cov.try_inverse()?;

        // K = P * H^T * S^-1
        let kalman_gain = covariance * self.update_mat.transpose() * s_inv;
        let innovation = measurement - projected_mean;

        let new_mean = mean + kalman_gain * innovation;
        let new_covariance = covariance - kalman_gain * projected_cov * kalman_gain.transpose();

        Some((new_mean, new_covariance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initiate() {
        let kf = KalmanFilter::new();
        let (mean, cov) = kf.initiate(&Measurement::from([100.0, 200.0, 0.5, 50.0]));
        assert_eq!(mean[0], 100.0);
        assert_eq!(mean[3], 50.0);
        assert_eq!(mean[4], 0.0);
        assert!(cov[(0, 0)] > 0.0);
        assert_eq!(cov[(0, 1)], 0.0);
    }

    #[test]
    fn test_predict_static_box_stays_put() {
        let kf = KalmanFilter::new();
        let (mean, cov) = kf.initiate(&Measurement::from([10.0, 20.0, 1.0, 40.0]));
        let (predicted, predicted_cov) = kf.predict(&mean, &cov);
        assert!((predicted[0] - 10.0).abs() < 1e-9);
        assert!(predicted_cov[(0, 0)] > cov[(0, 0)]);
    }

    #[test]
    fn test_update_pulls_toward_measurement() {
        let kf = KalmanFilter::new();
        let (mean, cov) = kf.initiate(&Measurement::from([10.0, 20.0, 1.0, 40.0]));
        let (mean, cov) = kf.predict(&mean, &cov);
        let (updated, _) = kf
            .update(&mean, &cov, &Measurement::from([14.0, 20.0, 1.0, 40.0]))
            .unwrap();
        assert!(updated[0] > 10.0 && updated[0] < 14.0);
        assert!(updated[4] > 0.0);
    }
}
