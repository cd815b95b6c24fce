//! Runtime CPU feature detection for the SIMD kernels.

use core::fmt;

/// CPU features the x86_64 kernels can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuFeatures {
    /// AVX2 support (256-bit integer SIMD).
    pub avx2: bool,
}

impl CpuFeatures {
    /// Detect CPU features at runtime using CPUID.
    ///
    /// # Example
    ///
    /// ```
    /// use snaperz::lanes::CpuFeatures;
    ///
    /// let features = CpuFeatures::detect();
    /// println!("AVX2: {}", features.avx2);
    /// ```
    #[must_use]
    pub fn detect() -> Self {
        Self {
            avx2: std::is_x86_feature_detected!("avx2"),
        }
    }

    /// Names of missing features, if any.
    #[must_use]
    pub fn missing_features(&self) -> Option<String> {
        let mut missing = Vec::new();
        if !self.avx2 {
            missing.push("AVX2");
        }
        if missing.is_empty() {
            None
        } else {
            Some(missing.join(", "))
        }
    }
}

impl Default for CpuFeatures {
    fn default() -> Self {
        Self::detect()
    }
}

impl fmt::Display for CpuFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CpuFeatures {{ avx2: {} }}", self.avx2)
    }
}
