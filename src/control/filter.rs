//! Interquartile outlier rejection for noisy sensor readings.

/// Median of an already sorted slice.
fn sorted_median(sorted: &[f32]) -> Option<f32> {
    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2]),
        _ => Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0),
    }
}

fn sorted_copy(values: &[f32]) -> Vec<f32> {
    let mut sorted: Vec<f32> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(f32::total_cmp);
    sorted
}

pub fn median(values: &[f32]) -> Option<f32> {
    sorted_median(&sorted_copy(values))
}

/// First and third quartile, each the median of the lower and upper half.
/// The middle element of an odd-length input belongs to neither half.
pub fn quartiles(values: &[f32]) -> Option<(f32, f32)> {
    let sorted = sorted_copy(values);
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    if n == 1 {
        return Some((sorted[0], sorted[0]));
    }
    let q1 = sorted_median(&sorted[..n / 2])?;
    let q3 = sorted_median(&sorted[(n + 1) / 2..])?;
    Some((q1, q3))
}

/// Mean of the readings inside `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]`.
///
/// `None` for an empty input. NaN readings are ignored.
pub fn iqr_mean(values: &[f32]) -> Option<f32> {
    let (q1, q3) = quartiles(values)?;
    let iqr = q3 - q1;
    let (low, high) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

    let (sum, count) = values
        .iter()
        .filter(|v| (low..=high).contains(*v))
        .fold((0.0f64, 0usize), |(sum, count), &v| (sum + v as f64, count + 1));

    // Quartiles lie inside their own bounds, so count > 0.
    (count > 0).then(|| (sum / count as f64) as f32)
}

/// A three-axis inertial sensor (gyroscope or accelerometer).
pub trait InertialSensor {
    fn read_axes(&mut self) -> [f32; 3];
}

/// Take `n` readings and filter each axis independently.
pub fn sample_inertial<S: InertialSensor + ?Sized>(sensor: &mut S, n: usize) -> Option<[f32; 3]> {
    let mut axes: [Vec<f32>; 3] = Default::default();
    for _ in 0..n {
        let reading = sensor.read_axes();
        for (axis, value) in axes.iter_mut().zip(reading) {
            axis.push(value);
        }
    }
    Some([
        iqr_mean(&axes[0])?,
        iqr_mean(&axes[1])?,
        iqr_mean(&axes[2])?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }

    #[test]
    fn test_quartiles() {
        assert_eq!(quartiles(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]), Some((2.0, 6.0)));
        assert_eq!(quartiles(&[1.0, 2.0, 3.0, 4.0]), Some((1.5, 3.5)));
        assert_eq!(quartiles(&[5.0]), Some((5.0, 5.0)));
    }

    #[test]
    fn test_rejects_spike() {
        let readings = [10.0, 11.0, 9.0, 10.0, 10.0, 500.0, 11.0, 9.0];
        let mean = iqr_mean(&readings).unwrap();
        assert!((mean - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(iqr_mean(&[]), None);
        assert_eq!(iqr_mean(&[7.0]), Some(7.0));
        assert_eq!(iqr_mean(&[2.0, 2.0, 2.0]), Some(2.0));
        assert_eq!(iqr_mean(&[f32::NAN, 4.0]), Some(4.0));
    }

    struct Scripted {
        readings: Vec<[f32; 3]>,
        next: usize,
    }

    impl InertialSensor for Scripted {
        fn read_axes(&mut self) -> [f32; 3] {
            let reading = self.readings[self.next % self.readings.len()];
            self.next += 1;
            reading
        }
    }

    #[test]
    fn test_sample_inertial() {
        let mut sensor = Scripted {
            readings: vec![
                [1.0, 0.0, -1.0],
                [1.0, 0.0, -1.0],
                [1.0, 0.0, -1.0],
                [1.0, 0.0, -1.0],
                [1.0, 90.0, -1.0],
                [1.0, 0.0, -1.0],
                [1.0, 0.0, -1.0],
            ],
            next: 0,
        };
        assert_eq!(sample_inertial(&mut sensor, 7), Some([1.0, 0.0, -1.0]));
        assert_eq!(sample_inertial(&mut sensor, 0), None);
    }
}
