//! Complex values: a pair of doubles (spec §3).

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub fn new(re: f64, im: f64) -> Self {
        Complex { re, im }
    }

    pub fn add(self, other: Complex) -> Complex {
        Complex::new(self.re + other.re, self.im + other.im)
    }
    pub fn sub(self, other: Complex) -> Complex {
        Complex::new(self.re - other.re, self.im - other.im)
    }
    pub fn mul(self, other: Complex) -> Complex {
        Complex::new(
            self.re * other.re - self.im * other.im,
            self.re * other.im + self.im * other.re,
        )
    }
    pub fn div(self, other: Complex) -> Complex {
        let denom = other.re * other.re + other.im * other.im;
        Complex::new(
            (self.re * other.re + self.im * other.im) / denom,
            (self.im * other.re - self.re * other.im) / denom,
        )
    }
    pub fn neg(self) -> Complex {
        Complex::new(-self.re, -self.im)
    }

    /// Integer-exponent power via repeated multiplication; used when the
    /// dynamic `**` dispatch falls through to complex operands (spec §4.B).
    pub fn powi(self, mut exp: i64) -> Complex {
        if exp < 0 {
            return Complex::new(1.0, 0.0).div(self.powi(-exp));
        }
        let mut result = Complex::new(1.0, 0.0);
        let mut base = self;
        while exp > 0 {
            if exp & 1 == 1 {
                result = result.mul(base);
            }
            base = base.mul(base);
            exp >>= 1;
        }
        result
    }

    /// Principal natural logarithm: `ln|z| + i*atan2(im, re)`.
    pub fn ln(self) -> Complex {
        let magnitude = (self.re * self.re + self.im * self.im).sqrt();
        Complex::new(magnitude.ln(), self.im.atan2(self.re))
    }

    /// Complex exponential: `e^re * (cos(im) + i*sin(im))`.
    pub fn exp(self) -> Complex {
        let magnitude = self.re.exp();
        Complex::new(magnitude * self.im.cos(), magnitude * self.im.sin())
    }

    /// General complex power via `exp(ln(self) * exp_)` (spec §4.B:
    /// "fractional or complex power dispatches to ... complex
    /// implementation"). `powi` above stays the cheap path for an integer
    /// exponent; this covers a complex or fractional one, which `powi`
    /// cannot represent at all.
    pub fn powc(self, exp_: Complex) -> Complex {
        if self.re == 0.0 && self.im == 0.0 {
            return if exp_.re == 0.0 && exp_.im == 0.0 {
                Complex::new(1.0, 0.0)
            } else {
                Complex::new(0.0, 0.0)
            };
        }
        self.ln().mul(exp_).exp()
    }
}

impl std::fmt::Display for Complex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.im >= 0.0 {
            write!(f, "{}+{}i", self.re, self.im)
        } else {
            write!(f, "{}{}i", self.re, self.im)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_matches_complex_identity() {
        let i = Complex::new(0.0, 1.0);
        let r = i.mul(i);
        assert_eq!(r, Complex::new(-1.0, 0.0));
    }

    #[test]
    fn powc_of_i_to_the_i_is_real() {
        let i = Complex::new(0.0, 1.0);
        let r = i.powc(i);
        assert!((r.re - (-std::f64::consts::FRAC_PI_2).exp()).abs() < 1e-9);
        assert!(r.im.abs() < 1e-9);
    }
}
