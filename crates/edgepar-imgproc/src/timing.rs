use std::time::{Duration, Instant};

/// A value together with the wall time it took to produce.
#[derive(Debug, Clone, PartialEq)]
pub struct Timed<T> {
    /// The produced value.
    pub value: T,
    /// Elapsed wall time.
    pub elapsed: Duration,
}

/// Run `f` and measure its wall time.
///
/// # Examples
///
/// ```
/// use edgepar_imgproc::timing::timed;
///
/// let result = timed(|| (1..=10).sum::<u32>());
/// assert_eq!(result.value, 55);
/// ```
pub fn timed<T>(f: impl FnOnce() -> T) -> Timed<T> {
    let start = Instant::now();
    let value = f();
    Timed {
        value,
        elapsed: start.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timed_measures_sleep() {
        let result = timed(|| std::thread::sleep(Duration::from_millis(5)));
        assert!(result.elapsed >= Duration::from_millis(5));
    }
}
