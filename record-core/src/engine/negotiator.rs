//! Capture format negotiation.
//!
//! Channel-count mismatches between the requested and negotiated format
//! corrupt interleaving (every frame's channel order shifts), so the
//! channel count is never silently substituted: a closest match with a
//! different channel count is skipped, and only the final native-format
//! fallback may change it, replacing the whole format at once.

use crate::models::error::RecordError;
use crate::models::format::DeviceFormat;
use crate::traits::capture_device::{CaptureDevice, FormatSupport};

/// Negotiate the best capture format the device actually supports.
///
/// Priority order:
/// 1. 32-bit float at the requested rate/channels.
/// 2. The device's closest float rate, keeping the requested channels.
/// 3/4. The same two steps with 16-bit integer PCM.
/// 5. The device's native mix format wholesale, so initialization
///    succeeds even on unusual hardware.
///
/// The winner becomes the session's authoritative `DeviceFormat`; all
/// downstream components must be initialized from it.
pub fn negotiate(
    device: &dyn CaptureDevice,
    sample_rate: u32,
    channels: u16,
) -> Result<DeviceFormat, RecordError> {
    let profiles = [
        DeviceFormat::float(sample_rate, channels),
        DeviceFormat::int16(sample_rate, channels),
    ];

    for profile in profiles {
        match device.probe_format(&profile)? {
            FormatSupport::Exact => {
                log::debug!(
                    "negotiated exact format: {} Hz, {} ch, {:?} {}-bit",
                    profile.sample_rate,
                    profile.channels,
                    profile.repr,
                    profile.bits_per_sample
                );
                return Ok(profile);
            }
            FormatSupport::Closest(closest) if closest.channels == profile.channels => {
                let adopted = DeviceFormat {
                    sample_rate: closest.sample_rate,
                    ..profile
                };
                log::debug!(
                    "negotiated closest rate {} Hz for requested {} Hz ({:?} {}-bit)",
                    adopted.sample_rate,
                    sample_rate,
                    adopted.repr,
                    adopted.bits_per_sample
                );
                return Ok(adopted);
            }
            _ => {}
        }
    }

    let native = device.native_format()?;
    log::debug!(
        "falling back to native mix format: {} Hz, {} ch, {:?} {}-bit",
        native.sample_rate,
        native.channels,
        native.repr,
        native.bits_per_sample
    );
    Ok(native)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::format::SampleRepr;
    use crate::testing::MockDevice;

    #[test]
    fn exact_float_profile_wins() {
        let device = MockDevice::new()
            .float_support(FormatSupport::Exact)
            .int_support(FormatSupport::Exact);
        let format = negotiate(&device, 48000, 2).unwrap();
        assert_eq!(format, DeviceFormat::float(48000, 2));
    }

    #[test]
    fn closest_float_rate_keeps_requested_channels() {
        let device = MockDevice::new()
            .float_support(FormatSupport::Closest(DeviceFormat::float(44100, 2)))
            .int_support(FormatSupport::Exact);
        let format = negotiate(&device, 48000, 2).unwrap();
        assert_eq!(format.sample_rate, 44100);
        assert_eq!(format.channels, 2);
        assert_eq!(format.repr, SampleRepr::Float);
    }

    #[test]
    fn mismatched_channel_closest_is_skipped() {
        // The closest float offer has the wrong channel count; the int16
        // exact profile must win instead.
        let device = MockDevice::new()
            .float_support(FormatSupport::Closest(DeviceFormat::float(48000, 1)))
            .int_support(FormatSupport::Exact);
        let format = negotiate(&device, 48000, 2).unwrap();
        assert_eq!(format, DeviceFormat::int16(48000, 2));
    }

    #[test]
    fn falls_through_to_int16_closest() {
        let device = MockDevice::new()
            .float_support(FormatSupport::Unsupported)
            .int_support(FormatSupport::Closest(DeviceFormat::int16(44100, 2)));
        let format = negotiate(&device, 48000, 2).unwrap();
        assert_eq!(format, DeviceFormat::int16(44100, 2));
    }

    #[test]
    fn native_fallback_replaces_whole_format() {
        let native = DeviceFormat {
            sample_rate: 96000,
            channels: 6,
            bits_per_sample: 24,
            repr: SampleRepr::Int,
            channel_mask: 0x3F,
        };
        let device = MockDevice::new()
            .float_support(FormatSupport::Unsupported)
            .int_support(FormatSupport::Unsupported)
            .native(native);
        let format = negotiate(&device, 48000, 2).unwrap();
        assert_eq!(format, native);
    }

    #[test]
    fn channel_count_preserved_outside_native_fallback() {
        for channels in [1u16, 2, 4, 8] {
            let device = MockDevice::new()
                .float_support(FormatSupport::Closest(DeviceFormat::float(22050, channels)))
                .int_support(FormatSupport::Unsupported);
            let format = negotiate(&device, 48000, channels).unwrap();
            assert_eq!(format.channels, channels);
        }
    }
}
