//! 可注入的随机源
//!
//! 选择引擎与转化估值都通过 [`RandomSource`] 取随机数，测试中可替换为固定序列。

/// 随机数来源
pub trait RandomSource: Send + Sync {
    /// `[0, upper)` 内的均匀整数，`upper` 为 0 时返回 0
    fn next_index(&self, upper: usize) -> usize;

    /// `[low, high]` 内的均匀浮点数
    fn next_f64_in(&self, low: f64, high: f64) -> f64;
}

/// 基于线程本地 RNG 的默认实现
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_index(&self, upper: usize) -> usize {
        if upper == 0 {
            return 0;
        }
        rand::random_range(0..upper)
    }

    fn next_f64_in(&self, low: f64, high: f64) -> f64 {
        if low >= high {
            return low;
        }
        rand::random_range(low..=high)
    }
}

/// 固定返回值的随机源（测试用）
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom {
    pub index: usize,
    /// `[0, 1]` 内的位置，映射到请求区间
    pub fraction: f64,
}

impl RandomSource for FixedRandom {
    fn next_index(&self, upper: usize) -> usize {
        if upper == 0 { 0 } else { self.index.min(upper - 1) }
    }

    fn next_f64_in(&self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.fraction.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_random_bounds() {
        let rng = ThreadRandom;
        for _ in 0..200 {
            assert!(rng.next_index(3) < 3);
            let v = rng.next_f64_in(0.8, 1.2);
            assert!((0.8..=1.2).contains(&v));
        }
        assert_eq!(rng.next_index(0), 0);
        assert_eq!(rng.next_f64_in(1.0, 1.0), 1.0);
    }

    #[test]
    fn test_fixed_random() {
        let rng = FixedRandom {
            index: 5,
            fraction: 0.5,
        };
        assert_eq!(rng.next_index(3), 2);
        assert!((rng.next_f64_in(0.8, 1.2) - 1.0).abs() < 1e-12);
    }
}
