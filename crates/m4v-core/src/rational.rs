//! 有理数类型.
//!
//! 用于 VOP 时间基 (1 / vop_time_increment_resolution) 和像素宽高比.

use std::fmt;

/// 有理数, 由分子和分母组成
///
/// 例如 `vop_time_increment_resolution = 30000` 时时间基为 1/30000.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    pub num: i32,
    pub den: i32,
}

impl Rational {
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /// 未定义 (分母为 0)
    pub const UNDEFINED: Self = Self { num: 0, den: 0 };

    /// 正方形像素
    pub const SQUARE: Self = Self { num: 1, den: 1 };

    /// 由时间分辨率构造时间基, 分辨率为 0 时返回未定义
    pub fn from_time_resolution(resolution: u32) -> Self {
        match i32::try_from(resolution) {
            Ok(den) if den > 0 => Self { num: 1, den },
            _ => Self::UNDEFINED,
        }
    }

    pub const fn is_valid(&self) -> bool {
        self.den != 0
    }

    /// 约分, 并保证分母为正
    ///
    /// VOL 中的扩展像素宽高比 (8 位宽 / 8 位高) 不保证互质.
    pub fn reduce(self) -> Self {
        if self.den == 0 {
            return self;
        }
        let g = gcd(self.num.unsigned_abs(), self.den.unsigned_abs()) as i32;
        let sign = self.den.signum();
        Self {
            num: sign * self.num / g,
            den: sign * self.den / g,
        }
    }

    /// 把以 `self` 为单位的时间戳换算到以 `to` 为单位 (向下取整)
    pub fn rescale(self, value: i64, to: Self) -> Option<i64> {
        if !self.is_valid() || !to.is_valid() || to.num == 0 {
            return None;
        }
        let num = i128::from(value) * i128::from(self.num) * i128::from(to.den);
        let den = i128::from(self.den) * i128::from(to.num);
        i64::try_from(num.div_euclid(den)).ok()
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}
