//! Statistics over one-dimensional series.
//!
//! Every function returns `None` when the input is too short or degenerate
//! for the statistic to be defined.

use ndarray::{s, Array1, ArrayView1};

/// Arithmetic mean.
pub fn mean(x: ArrayView1<'_, f64>) -> Option<f64> {
    x.mean()
}

/// Standard deviation with `ddof` delta degrees of freedom.
pub fn std_dev(x: ArrayView1<'_, f64>, ddof: f64) -> Option<f64> {
    if (x.len() as f64) <= ddof {
        return None;
    }
    Some(x.std(ddof))
}

/// Sample skewness (Fisher, biased estimator).
pub fn skewness(x: ArrayView1<'_, f64>) -> Option<f64> {
    let m = x.mean()?;
    let n = x.len() as f64;
    let m2 = x.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
    let m3 = x.iter().map(|v| (v - m).powi(3)).sum::<f64>() / n;
    if m2 <= 0.0 {
        return None;
    }
    Some(m3 / m2.powf(1.5))
}

/// Least-squares fit `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
    /// Standard error of the slope.
    pub stderr: f64,
    pub n: usize,
}

/// Ordinary least-squares regression of `y` on `x`.
pub fn linregress(x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> Option<Regression> {
    let n = x.len();
    if n < 3 || y.len() != n {
        return None;
    }
    let xm = x.mean()?;
    let ym = y.mean()?;
    let sxx: f64 = x.iter().map(|v| (v - xm).powi(2)).sum();
    if sxx <= 0.0 {
        return None;
    }
    let sxy: f64 = x.iter().zip(y.iter()).map(|(a, b)| (a - xm) * (b - ym)).sum();
    let slope = sxy / sxx;
    let intercept = ym - slope * xm;
    let ssr: f64 = x
        .iter()
        .zip(y.iter())
        .map(|(a, b)| (b - (slope * a + intercept)).powi(2))
        .sum();
    let stderr = (ssr / (n as f64 - 2.0)).sqrt() / sxx.sqrt();
    Some(Regression {
        slope,
        intercept,
        stderr,
        n,
    })
}

/// Autocorrelation at a non-negative lag, normalized by the lag-0 variance.
pub fn autocorrelation(x: ArrayView1<'_, f64>, lag: usize) -> Option<f64> {
    let n = x.len();
    if lag >= n {
        return None;
    }
    let m = x.mean()?;
    let var: f64 = x.iter().map(|v| (v - m).powi(2)).sum();
    if var <= 0.0 {
        return None;
    }
    let head = x.slice(s![..n - lag]);
    let tail = x.slice(s![lag..]);
    let cov: f64 = head.iter().zip(tail.iter()).map(|(a, b)| (a - m) * (b - m)).sum();
    Some(cov / var)
}

/// Autocorrelation at lags `-max_lag..=max_lag`, symmetric around 0.
pub fn lag_autocorrelation(x: ArrayView1<'_, f64>, max_lag: usize) -> Option<Array1<f64>> {
    let positive = (0..=max_lag)
        .map(|lag| autocorrelation(x, lag))
        .collect::<Option<Vec<f64>>>()?;
    let curve: Vec<f64> = positive
        .iter()
        .skip(1)
        .rev()
        .chain(positive.iter())
        .copied()
        .collect();
    Some(Array1::from(curve))
}

/// Linear trend of `x` against its index.
pub fn trend(x: ArrayView1<'_, f64>) -> Option<Regression> {
    let index = Array1::from_iter((0..x.len()).map(|i| i as f64));
    linregress(index.view(), x)
}
