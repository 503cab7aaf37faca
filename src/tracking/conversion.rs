//! 转化估值规则
//!
//! `value = bid × 内容类型倍率 × [0.8, 1.2] 随机系数`，是一个近似占位算法。

use super::{ContentType, RandomSource};

pub const RANDOM_FACTOR_MIN: f64 = 0.8;
pub const RANDOM_FACTOR_MAX: f64 = 1.2;

/// 内容类型倍率，未知类型为 10
pub fn type_multiplier(content_type: Option<ContentType>) -> f64 {
    match content_type {
        Some(ContentType::Product) => 15.0,
        Some(ContentType::Video) => 12.0,
        Some(ContentType::Recipe) => 8.0,
        Some(ContentType::Article) => 5.0,
        None => 10.0,
    }
}

/// 计算一次转化的估值
pub fn conversion_value(
    bid_amount: f64,
    content_type: Option<ContentType>,
    random: &dyn RandomSource,
) -> f64 {
    let factor = random.next_f64_in(RANDOM_FACTOR_MIN, RANDOM_FACTOR_MAX);
    bid_amount * type_multiplier(content_type) * factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::random::{FixedRandom, ThreadRandom};

    #[test]
    fn test_multipliers() {
        assert_eq!(type_multiplier(Some(ContentType::Product)), 15.0);
        assert_eq!(type_multiplier(Some(ContentType::Video)), 12.0);
        assert_eq!(type_multiplier(Some(ContentType::Recipe)), 8.0);
        assert_eq!(type_multiplier(Some(ContentType::Article)), 5.0);
        assert_eq!(type_multiplier(None), 10.0);
    }

    #[test]
    fn test_value_bounds_for_untyped_entity() {
        // bid 0.25, 无内容类型 -> [2.0, 3.0]
        let low = conversion_value(0.25, None, &FixedRandom { index: 0, fraction: 0.0 });
        let high = conversion_value(0.25, None, &FixedRandom { index: 0, fraction: 1.0 });
        assert!((low - 2.0).abs() < 1e-9);
        assert!((high - 3.0).abs() < 1e-9);

        for _ in 0..100 {
            let v = conversion_value(0.25, None, &ThreadRandom);
            assert!((2.0 - 1e-9..=3.0 + 1e-9).contains(&v));
        }
    }

    #[test]
    fn test_zero_bid_yields_zero() {
        assert_eq!(
            conversion_value(0.0, Some(ContentType::Product), &ThreadRandom),
            0.0
        );
    }
}
