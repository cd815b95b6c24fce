//! The driver-facing extender interface and engine selection.
//!
//! A driver needs four operations: create, `simulate_pulse`, `finished` and
//! `equals`. Creation is each engine's constructor and destruction is `Drop`.

use crate::config::{Backend, ConfigError, ExtenderConfig, SegmentWidth};
use crate::lanes::{LaneKernel, PortableLanes};
use crate::window::WindowedPipeline;

#[cfg(target_arch = "x86_64")]
use crate::lanes::x86_64::{Avx2U16, Avx2U8, CpuFeatures};

/// An extender state advanced one pulse at a time.
pub trait Extender: Clone {
    /// Configuration fixed at creation.
    fn config(&self) -> &ExtenderConfig;

    /// Pulses simulated so far.
    fn pulses(&self) -> u64;

    /// Advance by exactly one pulse.
    ///
    /// # Panics
    ///
    /// Panics once [`finished`](Self::finished) returns `true`.
    fn simulate_pulse(&mut self);

    /// Whether all `L + 1` blocks are in slot 0.
    fn finished(&self) -> bool;

    /// Structural state equality.
    ///
    /// Reflexive, symmetric and transitive. Extenders with different
    /// configurations are never equal.
    fn equals(&self, other: &Self) -> bool;

    /// Dense segment lengths, slot 0 first.
    fn segments(&self) -> Vec<u32>;
}

/// Portable 8-bit kernel, as wide as the AVX2 one.
pub type PortableU8 = PortableLanes<u8, 32>;
/// Portable 16-bit kernel.
pub type PortableU16 = PortableLanes<u16, 16>;
/// Portable 32-bit kernel.
pub type PortableU32 = PortableLanes<u32, 8>;

/// Windowed engine over any supported (backend, width) pair.
#[derive(Debug, Clone)]
pub enum WindowedExtender {
    /// Portable kernel, 8-bit segments.
    PortableU8(WindowedPipeline<PortableU8>),
    /// Portable kernel, 16-bit segments.
    PortableU16(WindowedPipeline<PortableU16>),
    /// Portable kernel, 32-bit segments.
    PortableU32(WindowedPipeline<PortableU32>),
    /// AVX2 kernel, 8-bit segments.
    #[cfg(target_arch = "x86_64")]
    Avx2U8(WindowedPipeline<Avx2U8>),
    /// AVX2 kernel, 16-bit segments.
    #[cfg(target_arch = "x86_64")]
    Avx2U16(WindowedPipeline<Avx2U16>),
}

macro_rules! dispatch {
    ($self:expr, $p:ident => $body:expr) => {
        match $self {
            WindowedExtender::PortableU8($p) => $body,
            WindowedExtender::PortableU16($p) => $body,
            WindowedExtender::PortableU32($p) => $body,
            #[cfg(target_arch = "x86_64")]
            WindowedExtender::Avx2U8($p) => $body,
            #[cfg(target_arch = "x86_64")]
            WindowedExtender::Avx2U16($p) => $body,
        }
    };
}

impl WindowedExtender {
    /// Create a fully-extended windowed extender.
    ///
    /// `width` defaults to the narrowest width holding `L + 1`. With
    /// [`Backend::Auto`], AVX2 is used when the CPU has it and the width is
    /// 8 or 16 bits; the portable kernel otherwise.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::WidthTooNarrow`] for a forced width that cannot hold `L + 1`
    /// - [`ConfigError::BackendUnavailable`] for [`Backend::Avx2`] without AVX2
    /// - [`ConfigError::UnsupportedLaneWidth`] for [`Backend::Avx2`] with 32-bit segments
    pub fn new(
        config: ExtenderConfig,
        backend: Backend,
        width: Option<SegmentWidth>,
    ) -> Result<Self, ConfigError> {
        Self::from_lengths(config, backend, width, &vec![1; config.segment_count()])
    }

    /// Create a windowed extender from dense segment lengths.
    ///
    /// # Errors
    ///
    /// As [`WindowedExtender::new`], plus the state checks of
    /// [`WindowedPipeline::from_lengths`].
    pub fn from_lengths(
        config: ExtenderConfig,
        backend: Backend,
        width: Option<SegmentWidth>,
        lengths: &[u32],
    ) -> Result<Self, ConfigError> {
        let width = width.unwrap_or_else(|| config.width());
        width.check(&config)?;

        let extender = match resolve_backend(backend, width)? {
            Backend::Avx2 => Self::avx2(config, width, lengths)?,
            _ => match width {
                SegmentWidth::U8 => Self::PortableU8(WindowedPipeline::from_lengths(
                    PortableU8::new(),
                    config,
                    lengths,
                )?),
                SegmentWidth::U16 => Self::PortableU16(WindowedPipeline::from_lengths(
                    PortableU16::new(),
                    config,
                    lengths,
                )?),
                SegmentWidth::U32 => Self::PortableU32(WindowedPipeline::from_lengths(
                    PortableU32::new(),
                    config,
                    lengths,
                )?),
            },
        };
        tracing::debug!(
            backend = extender.backend_name(),
            lanes = extender.lanes(),
            %width,
            "windowed extender created"
        );
        Ok(extender)
    }

    #[cfg(target_arch = "x86_64")]
    fn avx2(config: ExtenderConfig, width: SegmentWidth, lengths: &[u32]) -> Result<Self, ConfigError> {
        let unavailable = ConfigError::BackendUnavailable {
            backend: Backend::Avx2,
        };
        match width {
            SegmentWidth::U8 => {
                let kernel = Avx2U8::detect().ok_or(unavailable)?;
                Ok(Self::Avx2U8(WindowedPipeline::from_lengths(kernel, config, lengths)?))
            }
            SegmentWidth::U16 => {
                let kernel = Avx2U16::detect().ok_or(unavailable)?;
                Ok(Self::Avx2U16(WindowedPipeline::from_lengths(kernel, config, lengths)?))
            }
            SegmentWidth::U32 => Err(ConfigError::UnsupportedLaneWidth {
                backend: Backend::Avx2,
                width,
            }),
        }
    }

    #[cfg(not(target_arch = "x86_64"))]
    fn avx2(_: ExtenderConfig, _: SegmentWidth, _: &[u32]) -> Result<Self, ConfigError> {
        Err(ConfigError::BackendUnavailable {
            backend: Backend::Avx2,
        })
    }

    /// Number of pulses in flight.
    #[must_use]
    pub fn lanes(&self) -> usize {
        fn lanes_of<K: LaneKernel>(_: &WindowedPipeline<K>) -> usize {
            K::LANES
        }
        dispatch!(self, p => lanes_of(p))
    }

    /// Kernel name, for logs.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::PortableU8(_) => "portable-u8",
            Self::PortableU16(_) => "portable-u16",
            Self::PortableU32(_) => "portable-u32",
            #[cfg(target_arch = "x86_64")]
            Self::Avx2U8(_) => "avx2-u8",
            #[cfg(target_arch = "x86_64")]
            Self::Avx2U16(_) => "avx2-u16",
        }
    }

    /// Blocks across window and storage.
    #[must_use]
    pub fn block_count(&self) -> u64 {
        dispatch!(self, p => p.block_count())
    }
}

/// Pick a concrete backend for a width.
fn resolve_backend(backend: Backend, width: SegmentWidth) -> Result<Backend, ConfigError> {
    match backend {
        Backend::Portable => Ok(Backend::Portable),
        Backend::Avx2 => {
            if width == SegmentWidth::U32 {
                return Err(ConfigError::UnsupportedLaneWidth { backend, width });
            }
            if avx2_available() {
                Ok(Backend::Avx2)
            } else {
                Err(ConfigError::BackendUnavailable { backend })
            }
        }
        Backend::Auto => {
            if width != SegmentWidth::U32 && avx2_available() {
                Ok(Backend::Avx2)
            } else {
                Ok(Backend::Portable)
            }
        }
    }
}

#[cfg(target_arch = "x86_64")]
fn avx2_available() -> bool {
    let features = CpuFeatures::detect();
    if let Some(missing) = features.missing_features() {
        tracing::debug!(%features, missing, "SIMD kernels unavailable");
        return false;
    }
    true
}

#[cfg(not(target_arch = "x86_64"))]
fn avx2_available() -> bool {
    false
}

impl Extender for WindowedExtender {
    fn config(&self) -> &ExtenderConfig {
        dispatch!(self, p => p.config())
    }

    fn pulses(&self) -> u64 {
        dispatch!(self, p => p.pulses())
    }

    fn simulate_pulse(&mut self) {
        match self {
            Self::PortableU8(p) => p.simulate_pulse(),
            Self::PortableU16(p) => p.simulate_pulse(),
            Self::PortableU32(p) => p.simulate_pulse(),
            // SAFETY: AVX2 kernels are only constructed after detection.
            #[cfg(target_arch = "x86_64")]
            Self::Avx2U8(p) => unsafe { crate::lanes::x86_64::simulate_pulse_avx2(p) },
            #[cfg(target_arch = "x86_64")]
            Self::Avx2U16(p) => unsafe { crate::lanes::x86_64::simulate_pulse_avx2(p) },
        }
    }

    fn finished(&self) -> bool {
        dispatch!(self, p => p.finished())
    }

    fn equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::PortableU8(a), Self::PortableU8(b)) => a.same_segments(b),
            (Self::PortableU16(a), Self::PortableU16(b)) => a.same_segments(b),
            (Self::PortableU32(a), Self::PortableU32(b)) => a.same_segments(b),
            #[cfg(target_arch = "x86_64")]
            (Self::Avx2U8(a), Self::Avx2U8(b)) => a.same_segments(b),
            #[cfg(target_arch = "x86_64")]
            (Self::Avx2U16(a), Self::Avx2U16(b)) => a.same_segments(b),
            _ => self.config() == other.config() && self.segments() == other.segments(),
        }
    }

    fn segments(&self) -> Vec<u32> {
        dispatch!(self, p => p.read_out())
    }
}
