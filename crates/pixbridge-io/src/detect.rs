//! JPEG2000 container detection.
//!
//! Classifies an in-memory byte range by fixed magic prefix only. There
//! is no extension dispatch and no content sniffing beyond these two
//! signatures: anything else is rejected outright.

/// JP2 signature box: length 12, type `jP  `, content `0D 0A 87 0A`.
const JP2_SIGNATURE: [u8; 12] = [
    0x00, 0x00, 0x00, 0x0C, 0x6A, 0x50, 0x20, 0x20, 0x0D, 0x0A, 0x87, 0x0A,
];

/// Start-of-codestream marker for a raw J2K codestream.
const J2K_SOC_MARKER: [u8; 2] = [0xFF, 0x4F];

/// JPEG2000 container variants this crate decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodestreamFormat {
    /// Boxed JP2 container.
    Jp2,
    /// Raw J2K codestream.
    J2k,
}

impl CodestreamFormat {
    /// Classifies a byte prefix, or `None` if neither signature matches.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(&JP2_SIGNATURE) {
            Some(CodestreamFormat::Jp2)
        } else if data.starts_with(&J2K_SOC_MARKER) {
            Some(CodestreamFormat::J2k)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jp2_signature_box() {
        let mut data = JP2_SIGNATURE.to_vec();
        data.extend_from_slice(&[0x00; 16]);
        assert_eq!(CodestreamFormat::sniff(&data), Some(CodestreamFormat::Jp2));
    }

    #[test]
    fn raw_codestream_marker() {
        assert_eq!(
            CodestreamFormat::sniff(&[0xFF, 0x4F, 0xFF, 0x51]),
            Some(CodestreamFormat::J2k)
        );
    }

    #[test]
    fn rejects_everything_else() {
        assert_eq!(CodestreamFormat::sniff(&[]), None);
        assert_eq!(CodestreamFormat::sniff(&[0xFF]), None);
        // PNG magic
        assert_eq!(
            CodestreamFormat::sniff(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
            None
        );
        // Truncated JP2 signature box
        assert_eq!(CodestreamFormat::sniff(&JP2_SIGNATURE[..11]), None);
    }
}
