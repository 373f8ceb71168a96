/// How samples are represented on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleRepr {
    Int,
    Float,
}

/// A concrete capture format, as negotiated with the device.
///
/// Negotiated once per session at capture start; immutable thereafter.
/// Downstream components are always initialized from the negotiated
/// values, never from the originally requested ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub repr: SampleRepr,
    /// Channel layout bitmask (one bit per occupied speaker position).
    pub channel_mask: u32,
}

impl DeviceFormat {
    /// 32-bit IEEE float profile at the given rate and channel count.
    pub fn float(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample: 32,
            repr: SampleRepr::Float,
            channel_mask: Self::default_channel_mask(channels),
        }
    }

    /// 16-bit signed integer PCM profile at the given rate and channel count.
    pub fn int16(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample: 16,
            repr: SampleRepr::Int,
            channel_mask: Self::default_channel_mask(channels),
        }
    }

    /// Default positional mask: the lowest `channels` speaker bits.
    pub fn default_channel_mask(channels: u16) -> u32 {
        if channels >= 32 {
            u32::MAX
        } else {
            (1u32 << channels) - 1
        }
    }

    /// Size in bytes of one frame (one sample per channel).
    pub fn block_align(&self) -> u16 {
        self.channels * self.bits_per_sample / 8
    }

    pub fn bytes_per_second(&self) -> u32 {
        self.sample_rate * u32::from(self.block_align())
    }
}
