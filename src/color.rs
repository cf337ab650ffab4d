//! CSS color values, color space conversion and gamut mapping

use crate::compat::Feature;
use crate::values::{format_number, ComponentValue};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CssColor {
    CurrentColor,
    Rgba(Rgba),
    Lab(LabColor),
    Predefined(PredefinedColor),
}

/// An sRGB color. Hex, named, `rgb()`, `hsl()` and `hwb()` all end up here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: f64,
}

/// CIE and OK lab-like colors. `l` is 0..100 for CIE, 0..1 for OK spaces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LabColor {
    Lab { l: f64, a: f64, b: f64, alpha: f64 },
    Lch { l: f64, c: f64, h: f64, alpha: f64 },
    Oklab { l: f64, a: f64, b: f64, alpha: f64 },
    Oklch { l: f64, c: f64, h: f64, alpha: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Srgb,
    SrgbLinear,
    DisplayP3,
    A98Rgb,
    ProphotoRgb,
    Rec2020,
    XyzD50,
    XyzD65,
}

impl ColorSpace {
    fn parse(name: &str) -> Option<Self> {
        let space = match name.to_ascii_lowercase().as_str() {
            "srgb" => ColorSpace::Srgb,
            "srgb-linear" => ColorSpace::SrgbLinear,
            "display-p3" => ColorSpace::DisplayP3,
            "a98-rgb" => ColorSpace::A98Rgb,
            "prophoto-rgb" => ColorSpace::ProphotoRgb,
            "rec2020" => ColorSpace::Rec2020,
            "xyz-d50" => ColorSpace::XyzD50,
            "xyz" | "xyz-d65" => ColorSpace::XyzD65,
            _ => return None,
        };
        Some(space)
    }

    pub fn name(self) -> &'static str {
        match self {
            ColorSpace::Srgb => "srgb",
            ColorSpace::SrgbLinear => "srgb-linear",
            ColorSpace::DisplayP3 => "display-p3",
            ColorSpace::A98Rgb => "a98-rgb",
            ColorSpace::ProphotoRgb => "prophoto-rgb",
            ColorSpace::Rec2020 => "rec2020",
            ColorSpace::XyzD50 => "xyz-d50",
            ColorSpace::XyzD65 => "xyz-d65",
        }
    }
}

/// A color in a predefined `color()` space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredefinedColor {
    pub space: ColorSpace,
    pub channels: [f64; 3],
    pub alpha: f64,
}

type Vector = [f64; 3];
type Matrix = [[f64; 3]; 3];

const SRGB_TO_XYZ: Matrix = [
    [0.41239079926595934, 0.357584339383878, 0.1804807884018343],
    [0.21263900587151027, 0.715168678767756, 0.07219231536073371],
    [0.01933081871559182, 0.11919477979462598, 0.9505321522496607],
];

const XYZ_TO_SRGB: Matrix = [
    [3.2409699419045226, -1.537383177570094, -0.4986107602930034],
    [-0.9692436362808796, 1.8759675015077202, 0.04155505740717559],
    [0.05563007969699366, -0.20397695888897652, 1.0569715142428786],
];

const P3_TO_XYZ: Matrix = [
    [0.4865709486482162, 0.26566769316909306, 0.1982172852343625],
    [0.2289745640697488, 0.6917385218365064, 0.079286914093745],
    [0.0, 0.04511338185890264, 1.043944368900976],
];

const XYZ_TO_P3: Matrix = [
    [2.493496911941425, -0.9313836179191239, -0.40271078445071684],
    [-0.8294889695615747, 1.7626640603183463, 0.023624685841943577],
    [0.03584583024378447, -0.07617238926804182, 0.9568845240076872],
];

const A98_TO_XYZ: Matrix = [
    [0.5766690429101305, 0.1855582379065463, 0.1882286462349947],
    [0.29734497525053605, 0.6273635662554661, 0.07529145849399788],
    [0.02703136138641234, 0.07068885253582723, 0.9913375368376388],
];

const PROPHOTO_TO_XYZ_D50: Matrix = [
    [0.7977604896723027, 0.13518583717574031, 0.0313493495815248],
    [0.2880711282292934, 0.7118432178101014, 0.00008565396060525902],
    [0.0, 0.0, 0.8251046025104601],
];

const REC2020_TO_XYZ: Matrix = [
    [0.6369580483012914, 0.14461690358620832, 0.1688809751641721],
    [0.2627002120112671, 0.6779980715188708, 0.05930171646986196],
    [0.0, 0.028072693049087428, 1.060985057710791],
];

const D50_TO_D65: Matrix = [
    [0.9554734527042182, -0.023098536874261423, 0.0632593086610217],
    [-0.028369706963208136, 1.0099954580058226, 0.021041398966943008],
    [0.012314001688319899, -0.020507696433477912, 1.3303659366080753],
];

const D65_TO_D50: Matrix = [
    [1.0479298208405488, 0.022946793341019088, -0.05019222954313557],
    [0.029627815688159344, 0.990434484573249, -0.01707382502938514],
    [-0.009243058152591178, 0.015055144896577895, 0.7518742899580008],
];

const D50_WHITE: Vector = [0.3457 / 0.3585, 1.0, (1.0 - 0.3457 - 0.3585) / 0.3585];

const LAB_KAPPA: f64 = 24389.0 / 27.0;
const LAB_EPSILON: f64 = 216.0 / 24389.0;

/// Just noticeable difference in OKLab used by gamut mapping.
const GAMUT_JND: f64 = 0.02;
const GAMUT_EPSILON: f64 = 0.0001;

fn multiply(m: &Matrix, v: Vector) -> Vector {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

fn srgb_to_linear(c: f64) -> f64 {
    let abs = c.abs();
    if abs <= 0.04045 {
        c / 12.92
    } else {
        c.signum() * ((abs + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f64) -> f64 {
    let abs = c.abs();
    if abs > 0.0031308 {
        c.signum() * (1.055 * abs.powf(1.0 / 2.4) - 0.055)
    } else {
        12.92 * c
    }
}

fn a98_to_linear(c: f64) -> f64 {
    c.signum() * c.abs().powf(563.0 / 256.0)
}

fn prophoto_to_linear(c: f64) -> f64 {
    if c.abs() <= 16.0 / 512.0 {
        c / 16.0
    } else {
        c.signum() * c.abs().powf(1.8)
    }
}

fn rec2020_to_linear(c: f64) -> f64 {
    const ALPHA: f64 = 1.09929682680944;
    const BETA: f64 = 0.018053968510807;
    if c.abs() < BETA * 4.5 {
        c / 4.5
    } else {
        c.signum() * ((c.abs() + ALPHA - 1.0) / ALPHA).powf(1.0 / 0.45)
    }
}

fn lab_to_xyz_d50(lab: Vector) -> Vector {
    let [l, a, b] = lab;
    let f1 = (l + 16.0) / 116.0;
    let f0 = a / 500.0 + f1;
    let f2 = f1 - b / 200.0;

    let x = if f0.powi(3) > LAB_EPSILON {
        f0.powi(3)
    } else {
        (116.0 * f0 - 16.0) / LAB_KAPPA
    };
    let y = if l > LAB_KAPPA * LAB_EPSILON {
        f1.powi(3)
    } else {
        l / LAB_KAPPA
    };
    let z = if f2.powi(3) > LAB_EPSILON {
        f2.powi(3)
    } else {
        (116.0 * f2 - 16.0) / LAB_KAPPA
    };

    [x * D50_WHITE[0], y * D50_WHITE[1], z * D50_WHITE[2]]
}

fn xyz_d50_to_lab(xyz: Vector) -> Vector {
    let f = |v: f64| {
        if v > LAB_EPSILON {
            v.cbrt()
        } else {
            (LAB_KAPPA * v + 16.0) / 116.0
        }
    };
    let f0 = f(xyz[0] / D50_WHITE[0]);
    let f1 = f(xyz[1] / D50_WHITE[1]);
    let f2 = f(xyz[2] / D50_WHITE[2]);

    [116.0 * f1 - 16.0, 500.0 * (f0 - f1), 200.0 * (f1 - f2)]
}

fn oklab_to_linear_srgb(lab: Vector) -> Vector {
    let [l, a, b] = lab;
    let l_ = (l + 0.3963377774 * a + 0.2158037573 * b).powi(3);
    let m_ = (l - 0.1055613458 * a - 0.0638541728 * b).powi(3);
    let s_ = (l - 0.0894841775 * a - 1.2914855480 * b).powi(3);

    [
        4.0767416621 * l_ - 3.3077115913 * m_ + 0.2309699292 * s_,
        -1.2684380046 * l_ + 2.6097574011 * m_ - 0.3413193965 * s_,
        -0.0041960863 * l_ - 0.7034186147 * m_ + 1.7076147010 * s_,
    ]
}

fn linear_srgb_to_oklab(rgb: Vector) -> Vector {
    let [r, g, b] = rgb;
    let l = (0.4122214708 * r + 0.5363325363 * g + 0.0514459929 * b).cbrt();
    let m = (0.2119034982 * r + 0.6806995451 * g + 0.1073969566 * b).cbrt();
    let s = (0.0883024619 * r + 0.2817188376 * g + 0.6299787005 * b).cbrt();

    [
        0.2104542553 * l + 0.7936177850 * m - 0.0040720468 * s,
        1.9779984951 * l - 2.4285922050 * m + 0.4505937099 * s,
        0.0259040371 * l + 0.7827717662 * m - 0.8086757660 * s,
    ]
}

fn polar_to_lab(l: f64, c: f64, h: f64) -> Vector {
    let radians = h.to_radians();
    [l, c * radians.cos(), c * radians.sin()]
}

fn lab_to_polar(lab: Vector) -> Vector {
    let [l, a, b] = lab;
    let mut h = b.atan2(a).to_degrees();
    if h < 0.0 {
        h += 360.0;
    }
    [l, (a * a + b * b).sqrt(), h]
}

fn xyz_to_oklab(xyz: Vector) -> Vector {
    linear_srgb_to_oklab(multiply(&XYZ_TO_SRGB, xyz))
}

fn oklab_to_xyz(lab: Vector) -> Vector {
    multiply(&SRGB_TO_XYZ, oklab_to_linear_srgb(lab))
}

/// RGB gamuts colors can be mapped into.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Gamut {
    Srgb,
    DisplayP3,
}

impl Gamut {
    fn from_xyz(self, xyz: Vector) -> Vector {
        let linear = match self {
            Gamut::Srgb => multiply(&XYZ_TO_SRGB, xyz),
            Gamut::DisplayP3 => multiply(&XYZ_TO_P3, xyz),
        };
        linear.map(linear_to_srgb)
    }

    fn to_xyz(self, rgb: Vector) -> Vector {
        let linear = rgb.map(srgb_to_linear);
        match self {
            Gamut::Srgb => multiply(&SRGB_TO_XYZ, linear),
            Gamut::DisplayP3 => multiply(&P3_TO_XYZ, linear),
        }
    }

    fn contains(rgb: Vector) -> bool {
        rgb.iter().all(|c| (-0.000001..=1.000001).contains(c))
    }

    /// CSS Color 4 gamut mapping: reduce OKLCH chroma until the clipped
    /// color is within a just noticeable difference of the reduced one.
    fn map(self, xyz: Vector) -> Vector {
        let direct = self.from_xyz(xyz);
        if Self::contains(direct) {
            return direct.map(|c| c.clamp(0.0, 1.0));
        }

        let [l, c, h] = lab_to_polar(xyz_to_oklab(xyz));
        if l >= 1.0 {
            return [1.0; 3];
        }
        if l <= 0.0 {
            return [0.0; 3];
        }

        let clip = |rgb: Vector| rgb.map(|c| c.clamp(0.0, 1.0));
        let delta_e = |clipped: Vector, current: Vector| {
            let clipped_lab = xyz_to_oklab(self.to_xyz(clipped));
            clipped_lab
                .iter()
                .zip(current.iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f64>()
                .sqrt()
        };

        let mut current = polar_to_lab(l, c, h);
        let mut clipped = clip(self.from_xyz(oklab_to_xyz(current)));
        if delta_e(clipped, current) < GAMUT_JND {
            return clipped;
        }

        let mut min = 0.0;
        let mut max = c;
        let mut min_in_gamut = true;

        while max - min > GAMUT_EPSILON {
            let chroma = (min + max) / 2.0;
            current = polar_to_lab(l, chroma, h);
            let rgb = self.from_xyz(oklab_to_xyz(current));

            if min_in_gamut && Self::contains(rgb) {
                min = chroma;
                continue;
            }

            clipped = clip(rgb);
            let e = delta_e(clipped, current);
            if e < GAMUT_JND {
                if GAMUT_JND - e < GAMUT_EPSILON {
                    return clipped;
                }
                min_in_gamut = false;
                min = chroma;
            } else {
                max = chroma;
            }
        }

        clipped
    }
}

fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

fn to_byte(value: f64) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> Vector {
    let h = h.rem_euclid(360.0);
    let s = s / 100.0;
    let l = l / 100.0;
    let f = |n: f64| {
        let k = (n + h / 30.0) % 12.0;
        let a = s * l.min(1.0 - l);
        l - a * (k - 3.0).min(9.0 - k).min(1.0).max(-1.0)
    };
    [f(0.0), f(8.0), f(4.0)]
}

fn hwb_to_rgb(h: f64, w: f64, b: f64) -> Vector {
    let w = w / 100.0;
    let b = b / 100.0;
    if w + b >= 1.0 {
        let gray = w / (w + b);
        return [gray; 3];
    }
    hsl_to_rgb(h, 100.0, 50.0).map(|c| c * (1.0 - w - b) + w)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Channel {
    Number(f64),
    Percentage(f64),
    Angle(f64),
    None,
}

impl Channel {
    /// Numeric value where `100%` maps to `scale`.
    fn scaled(self, scale: f64) -> Option<f64> {
        match self {
            Channel::Number(v) => Some(v),
            Channel::Percentage(p) => Some(p / 100.0 * scale),
            Channel::None => Some(0.0),
            Channel::Angle(_) => None,
        }
    }

    fn hue(self) -> Option<f64> {
        match self {
            Channel::Number(v) | Channel::Angle(v) => Some(v),
            Channel::None => Some(0.0),
            Channel::Percentage(_) => None,
        }
    }

    fn alpha(self) -> Option<f64> {
        self.scaled(1.0).map(|a| a.clamp(0.0, 1.0))
    }
}

fn angle_to_degrees(value: f64, unit: &str) -> Option<f64> {
    match unit {
        "deg" => Some(value),
        "rad" => Some(value.to_degrees()),
        "grad" => Some(value * 0.9),
        "turn" => Some(value * 360.0),
        _ => None,
    }
}

/// Split function arguments into three channels and an optional alpha.
fn channels(args: &[ComponentValue]) -> Option<([Channel; 3], Option<Channel>)> {
    let mut values = Vec::new();
    let mut slash_at = None;
    let mut commas = false;

    for arg in args {
        let channel = match arg {
            ComponentValue::Whitespace => continue,
            ComponentValue::Comma => {
                commas = true;
                continue;
            }
            ComponentValue::Delim('/') => {
                slash_at = Some(values.len());
                continue;
            }
            ComponentValue::Number { value, .. } => Channel::Number(*value),
            ComponentValue::Percentage(value) => Channel::Percentage(*value),
            ComponentValue::Dimension { value, unit } => {
                Channel::Angle(angle_to_degrees(*value, unit)?)
            }
            ComponentValue::Ident(ident) if ident.eq_ignore_ascii_case("none") => Channel::None,
            _ => return None,
        };
        values.push(channel);
    }

    match (values.len(), slash_at, commas) {
        (3, None, _) => Some(([values[0], values[1], values[2]], None)),
        (4, Some(3), false) | (4, None, true) => {
            Some(([values[0], values[1], values[2]], Some(values[3])))
        }
        _ => None,
    }
}

impl CssColor {
    pub fn parse_hex(hex: &str) -> Option<Self> {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|d| d * 17);
        let pair = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

        let (red, green, blue, alpha) = match hex.len() {
            3 => (digit(0)?, digit(1)?, digit(2)?, 255),
            4 => (digit(0)?, digit(1)?, digit(2)?, digit(3)?),
            6 => (pair(0)?, pair(2)?, pair(4)?, 255),
            8 => (pair(0)?, pair(2)?, pair(4)?, pair(6)?),
            _ => return None,
        };

        Some(CssColor::Rgba(Rgba {
            red,
            green,
            blue,
            alpha: alpha as f64 / 255.0,
        }))
    }

    pub fn parse_named(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        match lower.as_str() {
            "currentcolor" => return Some(CssColor::CurrentColor),
            "transparent" => {
                return Some(CssColor::Rgba(Rgba { red: 0, green: 0, blue: 0, alpha: 0.0 }))
            }
            _ => {}
        }

        NAMED_COLORS
            .iter()
            .find(|(n, _)| *n == lower)
            .map(|(_, rgb)| {
                CssColor::Rgba(Rgba {
                    red: (rgb >> 16) as u8,
                    green: (rgb >> 8) as u8,
                    blue: *rgb as u8,
                    alpha: 1.0,
                })
            })
    }

    /// Parse a color function from its already parsed arguments. Arguments
    /// that are not plain channel values (`var()`, `calc()`) yield `None`.
    pub fn parse_function(name: &str, args: &[ComponentValue]) -> Option<Self> {
        let name = name.to_ascii_lowercase();

        if name == "color" {
            return Self::parse_predefined(args);
        }

        let ([c0, c1, c2], alpha) = channels(args)?;
        let alpha = match alpha {
            Some(channel) => channel.alpha()?,
            None => 1.0,
        };

        let color = match name.as_str() {
            "rgb" | "rgba" => {
                let rgb = [c0.scaled(255.0)?, c1.scaled(255.0)?, c2.scaled(255.0)?];
                CssColor::from_srgb(rgb.map(|c| c / 255.0), alpha)
            }
            "hsl" | "hsla" => {
                let rgb = hsl_to_rgb(c0.hue()?, c1.scaled(100.0)?, c2.scaled(100.0)?);
                CssColor::from_srgb(rgb, alpha)
            }
            "hwb" => {
                let rgb = hwb_to_rgb(c0.hue()?, c1.scaled(100.0)?, c2.scaled(100.0)?);
                CssColor::from_srgb(rgb, alpha)
            }
            "lab" => CssColor::Lab(LabColor::Lab {
                l: c0.scaled(100.0)?.max(0.0),
                a: c1.scaled(125.0)?,
                b: c2.scaled(125.0)?,
                alpha,
            }),
            "lch" => CssColor::Lab(LabColor::Lch {
                l: c0.scaled(100.0)?.max(0.0),
                c: c1.scaled(150.0)?.max(0.0),
                h: c2.hue()?,
                alpha,
            }),
            "oklab" => CssColor::Lab(LabColor::Oklab {
                l: c0.scaled(1.0)?.max(0.0),
                a: c1.scaled(0.4)?,
                b: c2.scaled(0.4)?,
                alpha,
            }),
            "oklch" => CssColor::Lab(LabColor::Oklch {
                l: c0.scaled(1.0)?.max(0.0),
                c: c1.scaled(0.4)?.max(0.0),
                h: c2.hue()?,
                alpha,
            }),
            _ => return None,
        };

        Some(color)
    }

    fn parse_predefined(args: &[ComponentValue]) -> Option<Self> {
        let mut iter = args.iter().skip_while(|v| matches!(v, ComponentValue::Whitespace));
        let space = match iter.next()? {
            ComponentValue::Ident(name) => ColorSpace::parse(name)?,
            _ => return None,
        };
        let rest: Vec<ComponentValue> = iter.cloned().collect();
        if rest.iter().any(|v| matches!(v, ComponentValue::Comma)) {
            return None;
        }

        let ([c0, c1, c2], alpha) = channels(&rest)?;
        let alpha = match alpha {
            Some(channel) => channel.alpha()?,
            None => 1.0,
        };

        Some(CssColor::Predefined(PredefinedColor {
            space,
            channels: [c0.scaled(1.0)?, c1.scaled(1.0)?, c2.scaled(1.0)?],
            alpha,
        }))
    }

    fn from_srgb(rgb: Vector, alpha: f64) -> Self {
        CssColor::Rgba(Rgba {
            red: to_byte(rgb[0]),
            green: to_byte(rgb[1]),
            blue: to_byte(rgb[2]),
            alpha,
        })
    }

    pub fn alpha(&self) -> f64 {
        match self {
            CssColor::CurrentColor => 1.0,
            CssColor::Rgba(rgba) => rgba.alpha,
            CssColor::Lab(LabColor::Lab { alpha, .. })
            | CssColor::Lab(LabColor::Lch { alpha, .. })
            | CssColor::Lab(LabColor::Oklab { alpha, .. })
            | CssColor::Lab(LabColor::Oklch { alpha, .. }) => *alpha,
            CssColor::Predefined(color) => color.alpha,
        }
    }

    /// The compatibility feature needed to use this color as written.
    pub fn required_feature(&self) -> Option<Feature> {
        match self {
            CssColor::Lab(LabColor::Lab { .. }) | CssColor::Lab(LabColor::Lch { .. }) => {
                Some(Feature::LabColors)
            }
            CssColor::Lab(_) => Some(Feature::OklabColors),
            CssColor::Predefined(PredefinedColor { space: ColorSpace::DisplayP3, .. }) => {
                Some(Feature::P3Colors)
            }
            CssColor::Predefined(_) => Some(Feature::ColorFunction),
            _ => None,
        }
    }

    /// Linear XYZ (D65) coordinates and alpha.
    fn to_xyz(&self) -> Option<(Vector, f64)> {
        let xyz = match self {
            CssColor::CurrentColor => return None,
            CssColor::Rgba(rgba) => {
                let rgb = [rgba.red, rgba.green, rgba.blue].map(|c| c as f64 / 255.0);
                Gamut::Srgb.to_xyz(rgb)
            }
            CssColor::Lab(LabColor::Lab { l, a, b, .. }) => {
                multiply(&D50_TO_D65, lab_to_xyz_d50([*l, *a, *b]))
            }
            CssColor::Lab(LabColor::Lch { l, c, h, .. }) => {
                multiply(&D50_TO_D65, lab_to_xyz_d50(polar_to_lab(*l, *c, *h)))
            }
            CssColor::Lab(LabColor::Oklab { l, a, b, .. }) => oklab_to_xyz([*l, *a, *b]),
            CssColor::Lab(LabColor::Oklch { l, c, h, .. }) => oklab_to_xyz(polar_to_lab(*l, *c, *h)),
            CssColor::Predefined(color) => {
                let c = color.channels;
                match color.space {
                    ColorSpace::Srgb => Gamut::Srgb.to_xyz(c),
                    ColorSpace::SrgbLinear => multiply(&SRGB_TO_XYZ, c),
                    ColorSpace::DisplayP3 => Gamut::DisplayP3.to_xyz(c),
                    ColorSpace::A98Rgb => multiply(&A98_TO_XYZ, c.map(a98_to_linear)),
                    ColorSpace::ProphotoRgb => {
                        multiply(&D50_TO_D65, multiply(&PROPHOTO_TO_XYZ_D50, c.map(prophoto_to_linear)))
                    }
                    ColorSpace::Rec2020 => multiply(&REC2020_TO_XYZ, c.map(rec2020_to_linear)),
                    ColorSpace::XyzD50 => multiply(&D50_TO_D65, c),
                    ColorSpace::XyzD65 => c,
                }
            }
        };
        Some((xyz, self.alpha()))
    }

    /// Gamut-mapped sRGB equivalent.
    pub fn to_rgb(&self) -> Option<CssColor> {
        if let CssColor::Rgba(_) = self {
            return Some(*self);
        }
        let (xyz, alpha) = self.to_xyz()?;
        Some(CssColor::from_srgb(Gamut::Srgb.map(xyz), alpha))
    }

    /// Gamut-mapped `color(display-p3 ...)` equivalent.
    pub fn to_p3(&self) -> Option<CssColor> {
        let (xyz, alpha) = self.to_xyz()?;
        let channels = Gamut::DisplayP3.map(xyz).map(|c| round_to(c, 6));
        Some(CssColor::Predefined(PredefinedColor {
            space: ColorSpace::DisplayP3,
            channels,
            alpha,
        }))
    }

    /// CIE `lab()` equivalent.
    pub fn to_lab(&self) -> Option<CssColor> {
        if let CssColor::Lab(LabColor::Lch { l, c, h, alpha }) = self {
            let [l, a, b] = polar_to_lab(*l, *c, *h);
            return Some(CssColor::Lab(LabColor::Lab {
                l: round_to(l, 4),
                a: round_to(a, 4),
                b: round_to(b, 4),
                alpha: *alpha,
            }));
        }

        let (xyz, alpha) = self.to_xyz()?;
        let [l, a, b] = xyz_d50_to_lab(multiply(&D65_TO_D50, xyz));
        Some(CssColor::Lab(LabColor::Lab {
            l: round_to(l, 4),
            a: round_to(a, 4),
            b: round_to(b, 4),
            alpha,
        }))
    }

    /// Serialize the color. `hex_alpha` allows `#rrggbbaa` for translucent
    /// sRGB colors.
    pub fn to_css(&self, minify: bool, hex_alpha: bool) -> String {
        let num = |v: f64| format_number(v, minify);
        let alpha_suffix = |alpha: f64| {
            if alpha < 1.0 {
                format!(" / {}", num(round_to(alpha, 3)))
            } else {
                String::new()
            }
        };

        match self {
            CssColor::CurrentColor => "currentcolor".to_string(),
            CssColor::Rgba(rgba) => rgba.to_css(minify, hex_alpha),
            CssColor::Lab(LabColor::Lab { l, a, b, alpha }) => {
                format!("lab({}% {} {}{})", num(*l), num(*a), num(*b), alpha_suffix(*alpha))
            }
            CssColor::Lab(LabColor::Lch { l, c, h, alpha }) => {
                format!("lch({}% {} {}{})", num(*l), num(*c), num(*h), alpha_suffix(*alpha))
            }
            CssColor::Lab(LabColor::Oklab { l, a, b, alpha }) => format!(
                "oklab({}% {} {}{})",
                num(round_to(l * 100.0, 6)),
                num(*a),
                num(*b),
                alpha_suffix(*alpha)
            ),
            CssColor::Lab(LabColor::Oklch { l, c, h, alpha }) => format!(
                "oklch({}% {} {}{})",
                num(round_to(l * 100.0, 6)),
                num(*c),
                num(*h),
                alpha_suffix(*alpha)
            ),
            CssColor::Predefined(color) => {
                let [c0, c1, c2] = color.channels;
                format!(
                    "color({} {} {} {}{})",
                    color.space.name(),
                    num(c0),
                    num(c1),
                    num(c2),
                    alpha_suffix(color.alpha)
                )
            }
        }
    }
}

impl Rgba {
    fn hex(&self, with_alpha: bool) -> String {
        let mut bytes = vec![self.red, self.green, self.blue];
        if with_alpha {
            bytes.push(to_byte(self.alpha));
        }

        if bytes.iter().all(|b| b >> 4 == b & 0x0f) {
            let short: String = bytes.iter().map(|b| format!("{:x}", b & 0x0f)).collect();
            format!("#{}", short)
        } else {
            format!("#{}", hex::encode(&bytes))
        }
    }

    fn to_css(&self, minify: bool, hex_alpha: bool) -> String {
        if self.alpha >= 1.0 {
            let hex = self.hex(false);
            let value = (self.red as u32) << 16 | (self.green as u32) << 8 | self.blue as u32;
            return NAMED_COLORS
                .iter()
                .find(|(name, rgb)| *rgb == value && name.len() < hex.len())
                .map(|(name, _)| name.to_string())
                .unwrap_or(hex);
        }

        if self.alpha == 0.0 && self.red == 0 && self.green == 0 && self.blue == 0 && !hex_alpha {
            return "transparent".to_string();
        }

        if hex_alpha {
            return self.hex(true);
        }

        let separator = if minify { "," } else { ", " };
        format!(
            "rgba({}{sep}{}{sep}{}{sep}{})",
            self.red,
            self.green,
            self.blue,
            format_number(round_to(self.alpha, 3), minify),
            sep = separator
        )
    }
}

/// The CSS named colors.
const NAMED_COLORS: &[(&str, u32)] = &[
    ("aliceblue", 0xf0f8ff), ("antiquewhite", 0xfaebd7), ("aqua", 0x00ffff),
    ("aquamarine", 0x7fffd4), ("azure", 0xf0ffff), ("beige", 0xf5f5dc), ("bisque", 0xffe4c4),
    ("black", 0x000000), ("blanchedalmond", 0xffebcd), ("blue", 0x0000ff),
    ("blueviolet", 0x8a2be2), ("brown", 0xa52a2a), ("burlywood", 0xdeb887),
    ("cadetblue", 0x5f9ea0), ("chartreuse", 0x7fff00), ("chocolate", 0xd2691e),
    ("coral", 0xff7f50), ("cornflowerblue", 0x6495ed), ("cornsilk", 0xfff8dc),
    ("crimson", 0xdc143c), ("cyan", 0x00ffff), ("darkblue", 0x00008b), ("darkcyan", 0x008b8b),
    ("darkgoldenrod", 0xb8860b), ("darkgray", 0xa9a9a9), ("darkgreen", 0x006400),
    ("darkgrey", 0xa9a9a9), ("darkkhaki", 0xbdb76b), ("darkmagenta", 0x8b008b),
    ("darkolivegreen", 0x556b2f), ("darkorange", 0xff8c00), ("darkorchid", 0x9932cc),
    ("darkred", 0x8b0000), ("darksalmon", 0xe9967a), ("darkseagreen", 0x8fbc8f),
    ("darkslateblue", 0x483d8b), ("darkslategray", 0x2f4f4f), ("darkslategrey", 0x2f4f4f),
    ("darkturquoise", 0x00ced1), ("darkviolet", 0x9400d3), ("deeppink", 0xff1493),
    ("deepskyblue", 0x00bfff), ("dimgray", 0x696969), ("dimgrey", 0x696969),
    ("dodgerblue", 0x1e90ff), ("firebrick", 0xb22222), ("floralwhite", 0xfffaf0),
    ("forestgreen", 0x228b22), ("fuchsia", 0xff00ff), ("gainsboro", 0xdcdcdc),
    ("ghostwhite", 0xf8f8ff), ("gold", 0xffd700), ("goldenrod", 0xdaa520), ("gray", 0x808080),
    ("green", 0x008000), ("greenyellow", 0xadff2f), ("grey", 0x808080), ("honeydew", 0xf0fff0),
    ("hotpink", 0xff69b4), ("indianred", 0xcd5c5c), ("indigo", 0x4b0082), ("ivory", 0xfffff0),
    ("khaki", 0xf0e68c), ("lavender", 0xe6e6fa), ("lavenderblush", 0xfff0f5),
    ("lawngreen", 0x7cfc00), ("lemonchiffon", 0xfffacd), ("lightblue", 0xadd8e6),
    ("lightcoral", 0xf08080), ("lightcyan", 0xe0ffff), ("lightgoldenrodyellow", 0xfafad2),
    ("lightgray", 0xd3d3d3), ("lightgreen", 0x90ee90), ("lightgrey", 0xd3d3d3),
    ("lightpink", 0xffb6c1), ("lightsalmon", 0xffa07a), ("lightseagreen", 0x20b2aa),
    ("lightskyblue", 0x87cefa), ("lightslategray", 0x778899), ("lightslategrey", 0x778899),
    ("lightsteelblue", 0xb0c4de), ("lightyellow", 0xffffe0), ("lime", 0x00ff00),
    ("limegreen", 0x32cd32), ("linen", 0xfaf0e6), ("magenta", 0xff00ff), ("maroon", 0x800000),
    ("mediumaquamarine", 0x66cdaa), ("mediumblue", 0x0000cd), ("mediumorchid", 0xba55d3),
    ("mediumpurple", 0x9370db), ("mediumseagreen", 0x3cb371), ("mediumslateblue", 0x7b68ee),
    ("mediumspringgreen", 0x00fa9a), ("mediumturquoise", 0x48d1cc),
    ("mediumvioletred", 0xc71585), ("midnightblue", 0x191970), ("mintcream", 0xf5fffa),
    ("mistyrose", 0xffe4e1), ("moccasin", 0xffe4b5), ("navajowhite", 0xffdead),
    ("navy", 0x000080), ("oldlace", 0xfdf5e6), ("olive", 0x808000), ("olivedrab", 0x6b8e23),
    ("orange", 0xffa500), ("orangered", 0xff4500), ("orchid", 0xda70d6),
    ("palegoldenrod", 0xeee8aa), ("palegreen", 0x98fb98), ("paleturquoise", 0xafeeee),
    ("palevioletred", 0xdb7093), ("papayawhip", 0xffefd5), ("peachpuff", 0xffdab9),
    ("peru", 0xcd853f), ("pink", 0xffc0cb), ("plum", 0xdda0dd), ("powderblue", 0xb0e0e6),
    ("purple", 0x800080), ("rebeccapurple", 0x663399), ("red", 0xff0000),
    ("rosybrown", 0xbc8f8f), ("royalblue", 0x4169e1), ("saddlebrown", 0x8b4513),
    ("salmon", 0xfa8072), ("sandybrown", 0xf4a460), ("seagreen", 0x2e8b57),
    ("seashell", 0xfff5ee), ("sienna", 0xa0522d), ("silver", 0xc0c0c0), ("skyblue", 0x87ceeb),
    ("slateblue", 0x6a5acd), ("slategray", 0x708090), ("slategrey", 0x708090),
    ("snow", 0xfffafa), ("springgreen", 0x00ff7f), ("steelblue", 0x4682b4), ("tan", 0xd2b48c),
    ("teal", 0x008080), ("thistle", 0xd8bfd8), ("tomato", 0xff6347), ("turquoise", 0x40e0d0),
    ("violet", 0xee82ee), ("wheat", 0xf5deb3), ("white", 0xffffff), ("whitesmoke", 0xf5f5f5),
    ("yellow", 0xffff00), ("yellowgreen", 0x9acd32),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn num(value: f64) -> ComponentValue {
        ComponentValue::Number { value, is_int: value.fract() == 0.0 }
    }

    fn pct(value: f64) -> ComponentValue {
        ComponentValue::Percentage(value)
    }

    fn rgba(color: CssColor) -> Rgba {
        match color {
            CssColor::Rgba(rgba) => rgba,
            other => panic!("Expected rgba color, got {:?}", other),
        }
    }

    #[test]
    fn test_hex_and_named() {
        let color = CssColor::parse_hex("ff0000").unwrap();
        assert_eq!(color.to_css(false, false), "red");

        let color = CssColor::parse_hex("abc").unwrap();
        assert_eq!(color.to_css(true, false), "#abc");

        let color = CssColor::parse_named("WhiteSmoke").unwrap();
        assert_eq!(color.to_css(false, false), "#f5f5f5");

        assert!(CssColor::parse_hex("abcde").is_none());
        assert!(CssColor::parse_named("notacolor").is_none());
    }

    #[test]
    fn test_alpha_serialization_depends_on_hex_alpha_support() {
        let color = CssColor::parse_hex("ff000080").unwrap();
        assert_eq!(color.to_css(false, true), "#ff000080");
        assert_eq!(color.to_css(false, false), "rgba(255, 0, 0, 0.502)");
        assert_eq!(color.to_css(true, false), "rgba(255,0,0,.502)");
    }

    #[test]
    fn test_rgb_and_hsl_functions() {
        let args = vec![
            num(255.0),
            ComponentValue::Whitespace,
            num(128.0),
            ComponentValue::Whitespace,
            num(0.0),
        ];
        let color = rgba(CssColor::parse_function("rgb", &args).unwrap());
        assert_eq!((color.red, color.green, color.blue), (255, 128, 0));

        let args = vec![
            num(120.0),
            ComponentValue::Comma,
            pct(100.0),
            ComponentValue::Comma,
            pct(50.0),
            ComponentValue::Comma,
            num(0.5),
        ];
        let color = rgba(CssColor::parse_function("hsla", &args).unwrap());
        assert_eq!((color.red, color.green, color.blue), (0, 255, 0));
        assert_eq!(color.alpha, 0.5);
    }

    #[test]
    fn test_non_literal_arguments_are_not_colors() {
        let args = vec![ComponentValue::Ident("foo".to_string())];
        assert!(CssColor::parse_function("rgb", &args).is_none());
    }

    #[test]
    fn test_lch_to_lab() {
        let args = vec![
            pct(50.998),
            ComponentValue::Whitespace,
            num(135.363),
            ComponentValue::Whitespace,
            num(338.0),
        ];
        let color = CssColor::parse_function("lch", &args).unwrap();
        assert_eq!(color.required_feature(), Some(Feature::LabColors));

        match color.to_lab().unwrap() {
            CssColor::Lab(LabColor::Lab { l, a, b, .. }) => {
                assert!((l - 50.998).abs() < 1e-9);
                assert!((a - 125.5064).abs() < 0.001);
                assert!((b + 50.7079).abs() < 0.001);
            }
            other => panic!("Expected lab color, got {:?}", other),
        }
    }

    #[test]
    fn test_out_of_gamut_color_maps_into_srgb() {
        let args = vec![
            pct(50.998),
            ComponentValue::Whitespace,
            num(135.363),
            ComponentValue::Whitespace,
            num(338.0),
        ];
        let color = CssColor::parse_function("lch", &args).unwrap();
        let rgb = rgba(color.to_rgb().unwrap());

        assert_eq!((rgb.red, rgb.green, rgb.blue), (240, 0, 192));
        assert_eq!(rgb.alpha, 1.0);
        assert_eq!(color.to_rgb().unwrap().to_css(false, false), "#f000c0");
    }

    #[test]
    fn test_srgb_round_trips_through_lab() {
        let red = CssColor::parse_named("red").unwrap();
        let lab = red.to_lab().unwrap();
        let back = rgba(lab.to_rgb().unwrap());
        assert_eq!((back.red, back.green, back.blue), (255, 0, 0));
    }

    #[test]
    fn test_predefined_color() {
        let args = vec![
            ComponentValue::Ident("display-p3".to_string()),
            ComponentValue::Whitespace,
            num(1.0),
            ComponentValue::Whitespace,
            num(0.0),
            ComponentValue::Whitespace,
            num(0.0),
        ];
        let color = CssColor::parse_function("color", &args).unwrap();
        assert_eq!(color.required_feature(), Some(Feature::P3Colors));
        assert_eq!(color.to_css(false, false), "color(display-p3 1 0 0)");
        // Pure P3 red lies outside sRGB.
        let rgb = rgba(color.to_rgb().unwrap());
        assert_eq!(rgb.red, 255);
    }

    #[test]
    fn test_oklch_serialization() {
        let color = CssColor::Lab(LabColor::Oklch { l: 0.5, c: 0.2, h: 30.0, alpha: 0.5 });
        assert_eq!(color.to_css(false, false), "oklch(50% 0.2 30 / 0.5)");
        assert_eq!(color.to_css(true, false), "oklch(50% .2 30 / .5)");
    }
}
