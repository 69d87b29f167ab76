//! ICC profile embedding and the `CalGray`/`CalRGB` fallback color spaces.
//!
//! Grounded in the teacher's deleted `icc_profile.rs` (`IccProfile`,
//! `IccProfileRef`, `From<IccProfile> for lopdf::Stream`), extended with the
//! Cal* array builders and rendering-intent mapping the filters need.

use lopdf::Object;

use crate::utils::compress_stream;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IccColorSpace {
    Greyscale,
    Rgb,
    Cmyk,
}

impl IccColorSpace {
    /// `/N`, the number of color components.
    pub fn components(self) -> i64 {
        match self {
            IccColorSpace::Greyscale => 1,
            IccColorSpace::Rgb => 3,
            IccColorSpace::Cmyk => 4,
        }
    }

    /// `/Alternate` color space name.
    pub fn alternate_name(self) -> &'static str {
        match self {
            IccColorSpace::Greyscale => "DeviceGray",
            IccColorSpace::Rgb => "DeviceRGB",
            IccColorSpace::Cmyk => "DeviceCMYK",
        }
    }

    /// Guesses the color space from an ICC profile's header color-space
    /// signature (bytes 16..20 of the profile, big-endian four-character
    /// code). Returns `None` for any signature other than gray/RGB/CMYK,
    /// which disables ICC embedding for that document.
    pub fn from_profile_bytes(icc: &[u8]) -> Option<Self> {
        let sig = icc.get(16..20)?;
        match sig {
            b"GRAY" => Some(IccColorSpace::Greyscale),
            b"RGB " => Some(IccColorSpace::Rgb),
            b"CMYK" => Some(IccColorSpace::Cmyk),
            _ => None,
        }
    }
}

/// An embedded ICC profile, ready to be attached to a document as an
/// indirect `ICCBased` stream object.
#[derive(Debug, Clone, PartialEq)]
pub struct IccProfile {
    pub icc: Vec<u8>,
    pub color_space: IccColorSpace,
}

impl IccProfile {
    pub fn new(icc: Vec<u8>) -> Option<Self> {
        let color_space = IccColorSpace::from_profile_bytes(&icc)?;
        Some(IccProfile { icc, color_space })
    }
}

impl From<IccProfile> for lopdf::Stream {
    fn from(profile: IccProfile) -> Self {
        let mut dict = lopdf::Dictionary::new();
        dict.set("N", Object::Integer(profile.color_space.components()));
        dict.set(
            "Alternate",
            Object::Name(profile.color_space.alternate_name().as_bytes().to_vec()),
        );
        let stream = lopdf::Stream::new(dict, profile.icc);
        compress_stream(stream)
    }
}

/// A named reference to an ICC profile embedded elsewhere in the document
/// (`/ICC{n}` in the color space resource dictionary).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IccProfileRef {
    pub name: String,
}

impl IccProfileRef {
    pub fn new(index: usize) -> Self {
        IccProfileRef {
            name: format!("ICC{index}"),
        }
    }
}

/// Builds a `[/ICCBased <ref>]` color space array, given the indirect
/// reference to the already-inserted profile stream.
pub fn icc_based_array(profile_ref: (u32, u16)) -> Object {
    Object::Array(vec![
        Object::Name(b"ICCBased".to_vec()),
        Object::Reference(profile_ref),
    ])
}

/// `[/CalGray << /WhitePoint [x y z] /Gamma g /BlackPoint [x y z]? >>]`.
pub fn cal_gray_array(white_point: [f32; 3], gamma: f32, black_point: Option<[f32; 3]>) -> Object {
    let mut dict = lopdf::Dictionary::new();
    dict.set("WhitePoint", point_array(white_point));
    dict.set("Gamma", Object::Real(gamma as f64));
    if let Some(bp) = black_point {
        dict.set("BlackPoint", point_array(bp));
    }
    Object::Array(vec![Object::Name(b"CalGray".to_vec()), Object::Dictionary(dict)])
}

/// `[/CalRGB << /WhitePoint [x y z] /Gamma [r g b] /Matrix [9 numbers] /BlackPoint [x y z]? >>]`.
pub fn cal_rgb_array(
    white_point: [f32; 3],
    gamma: [f32; 3],
    matrix: [f32; 9],
    black_point: Option<[f32; 3]>,
) -> Object {
    let mut dict = lopdf::Dictionary::new();
    dict.set("WhitePoint", point_array(white_point));
    dict.set("Gamma", point_array(gamma));
    dict.set(
        "Matrix",
        Object::Array(matrix.iter().map(|v| Object::Real(*v as f64)).collect()),
    );
    if let Some(bp) = black_point {
        dict.set("BlackPoint", point_array(bp));
    }
    Object::Array(vec![Object::Name(b"CalRGB".to_vec()), Object::Dictionary(dict)])
}

fn point_array(p: [f32; 3]) -> Object {
    Object::Array(p.iter().map(|v| Object::Real(*v as f64)).collect())
}

/// sRGB's D65 white point and the standard CalRGB transfer matrix, used as
/// the built-in fallback when no ICC profile is supplied.
pub fn srgb_cal_rgb_array() -> Object {
    cal_rgb_array(
        [0.9505, 1.0, 1.089],
        [2.2, 2.2, 2.2],
        [
            0.4124, 0.2126, 0.0193, 0.3576, 0.7152, 0.1192, 0.1805, 0.0722, 0.9505,
        ],
        None,
    )
}

/// Rendering intent, as named by `print-rendering-intent`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RenderingIntent {
    Perceptual,
    RelativeColorimetric,
    RelativeColorimetricBpc,
    AbsoluteColorimetric,
    Saturation,
}

impl RenderingIntent {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Perceptual" | "auto" => Some(RenderingIntent::Perceptual),
            "Relative" => Some(RenderingIntent::RelativeColorimetric),
            "RelativeBpc" => Some(RenderingIntent::RelativeColorimetricBpc),
            "Absolute" => Some(RenderingIntent::AbsoluteColorimetric),
            "Saturation" => Some(RenderingIntent::Saturation),
            _ => None,
        }
    }

    /// The `/Intent` value to place in a PDF graphics state.
    pub fn as_pdf_name(self) -> &'static str {
        match self {
            RenderingIntent::Perceptual => "Perceptual",
            RenderingIntent::RelativeColorimetric | RenderingIntent::RelativeColorimetricBpc => {
                "RelativeColorimetric"
            }
            RenderingIntent::AbsoluteColorimetric => "AbsoluteColorimetric",
            RenderingIntent::Saturation => "Saturation",
        }
    }

    /// Relative colorimetric with black point compensation needs `/BPC true`
    /// alongside the intent name; the other variants don't.
    pub fn wants_black_point_compensation(self) -> bool {
        matches!(self, RenderingIntent::RelativeColorimetricBpc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_profile(sig: &[u8; 4]) -> Vec<u8> {
        let mut bytes = vec![0u8; 20];
        bytes[16..20].copy_from_slice(sig);
        bytes
    }

    #[test]
    fn color_space_detected_from_signature() {
        assert_eq!(
            IccColorSpace::from_profile_bytes(&fake_profile(b"RGB ")),
            Some(IccColorSpace::Rgb)
        );
        assert_eq!(
            IccColorSpace::from_profile_bytes(&fake_profile(b"CMYK")),
            Some(IccColorSpace::Cmyk)
        );
        assert_eq!(IccColorSpace::from_profile_bytes(&fake_profile(b"LAB ")), None);
    }

    #[test]
    fn profile_stream_carries_n_and_alternate() {
        let profile = IccProfile::new(fake_profile(b"GRAY")).unwrap();
        let stream: lopdf::Stream = profile.into();
        assert_eq!(stream.dict.get(b"N").unwrap().as_i64().unwrap(), 1);
        assert_eq!(
            stream.dict.get(b"Alternate").unwrap().as_name_str().unwrap(),
            "DeviceGray"
        );
    }

    #[test]
    fn rendering_intent_maps_relative_bpc_to_relative_colorimetric_with_bpc_flag() {
        let intent = RenderingIntent::from_name("RelativeBpc").unwrap();
        assert_eq!(intent.as_pdf_name(), "RelativeColorimetric");
        assert!(intent.wants_black_point_compensation());
    }

    #[test]
    fn unknown_rendering_intent_name_is_none() {
        assert!(RenderingIntent::from_name("bogus").is_none());
    }
}
