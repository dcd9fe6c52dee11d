//! Symbology-aware barcode encoding.
//!
//! Produces module patterns only; placement and scaling happen in the
//! renderer. 1D codes come back as a row of modules (`true` = bar), 2D codes
//! as a square grid in row-major order.
//!
//! Code 39, Code 128, EAN-13, EAN-8 and UPC-A go through `barcoders`, QR
//! through `qrcode`, Aztec through `rxing`. UPC-E is encoded here.

use barcoders::sym::code128::Code128;
use barcoders::sym::code39::Code39;
use barcoders::sym::ean13::EAN13;
use barcoders::sym::ean8::EAN8;

use crate::model::Symbology;

/// Code 128 character set B selector understood by `barcoders`.
const CODE128_SET_B: char = '\u{0181}';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarcodeError {
    /// Nothing to encode.
    Empty,
    /// The value cannot be represented in the symbology.
    Invalid(String),
}

impl std::fmt::Display for BarcodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BarcodeError::Empty => f.write_str("barcode value is empty"),
            BarcodeError::Invalid(msg) => write!(f, "invalid barcode value: {msg}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarcodeMatrix {
    Linear(Vec<bool>),
    Grid {
        width: usize,
        height: usize,
        modules: Vec<bool>,
    },
}

impl BarcodeMatrix {
    /// `(start, length)` of every run of bars in a linear code.
    pub fn bar_runs(&self) -> Vec<(usize, usize)> {
        let BarcodeMatrix::Linear(modules) = self else {
            return Vec::new();
        };
        let mut runs = Vec::new();
        let mut start = None;
        for (i, &dark) in modules.iter().enumerate() {
            match (dark, start) {
                (true, None) => start = Some(i),
                (false, Some(s)) => {
                    runs.push((s, i - s));
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            runs.push((s, modules.len() - s));
        }
        runs
    }

    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        match self {
            BarcodeMatrix::Linear(modules) => modules.get(x).copied().unwrap_or(false),
            BarcodeMatrix::Grid { width, modules, .. } => {
                modules.get(y * width + x).copied().unwrap_or(false)
            }
        }
    }
}

/// A successfully encoded barcode plus the text to print under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBarcode {
    pub matrix: BarcodeMatrix,
    pub human_readable: String,
}

/// Encode `value` in `symbology`.
pub fn encode(symbology: Symbology, value: &str) -> Result<EncodedBarcode, BarcodeError> {
    if value.trim().is_empty() {
        return Err(BarcodeError::Empty);
    }

    match symbology {
        Symbology::Code128 => {
            let prefixed = format!("{CODE128_SET_B}{value}");
            let code = Code128::new(&prefixed)
                .map_err(|e| BarcodeError::Invalid(format!("CODE128: {e}")))?;
            Ok(linear(code.encode(), value.to_string()))
        }
        Symbology::Code39 => {
            let code = Code39::new(value).map_err(|e| BarcodeError::Invalid(format!("CODE39: {e}")))?;
            Ok(linear(code.encode(), value.to_string()))
        }
        Symbology::Ean13 => {
            let body = gtin_body(value, 12, "EAN13")?;
            let code = EAN13::new(&body).map_err(|e| BarcodeError::Invalid(format!("EAN13: {e}")))?;
            Ok(linear(code.encode(), with_check_digit(&body)))
        }
        Symbology::Ean8 => {
            let body = gtin_body(value, 7, "EAN8")?;
            let code = EAN8::new(&body).map_err(|e| BarcodeError::Invalid(format!("EAN8: {e}")))?;
            Ok(linear(code.encode(), with_check_digit(&body)))
        }
        Symbology::UpcA => {
            // UPC-A is EAN-13 with a leading zero.
            let body = gtin_body(value, 11, "UPCA")?;
            let padded = format!("0{body}");
            let code = EAN13::new(&padded)
                .map_err(|e| BarcodeError::Invalid(format!("UPCA: {e}")))?;
            Ok(linear(code.encode(), with_check_digit(&body)))
        }
        Symbology::UpcE => encode_upce(value),
        Symbology::QrCode => {
            let code = qrcode::QrCode::new(value.as_bytes())
                .map_err(|e| BarcodeError::Invalid(format!("QRCODE: {e}")))?;
            let width = code.width();
            let mut modules = Vec::with_capacity(width * width);
            for y in 0..width {
                for x in 0..width {
                    modules.push(code[(x, y)] == qrcode::Color::Dark);
                }
            }
            Ok(EncodedBarcode {
                matrix: BarcodeMatrix::Grid {
                    width,
                    height: width,
                    modules,
                },
                human_readable: value.to_string(),
            })
        }
        Symbology::Aztec => encode_aztec(value),
    }
}

fn linear(encoded: Vec<u8>, human_readable: String) -> EncodedBarcode {
    EncodedBarcode {
        matrix: BarcodeMatrix::Linear(encoded.into_iter().map(|m| m == 1).collect()),
        human_readable,
    }
}

fn encode_aztec(value: &str) -> Result<EncodedBarcode, BarcodeError> {
    use rxing::{BarcodeFormat, MultiFormatWriter, Writer};

    let matrix = MultiFormatWriter::default()
        .encode(value, &BarcodeFormat::AZTEC, 0, 0)
        .map_err(|e| BarcodeError::Invalid(format!("AZTEC: {e}")))?;
    let (width, height) = (matrix.width(), matrix.height());
    let mut modules = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        for x in 0..width {
            modules.push(matrix.get(x, y));
        }
    }
    Ok(EncodedBarcode {
        matrix: BarcodeMatrix::Grid {
            width: width as usize,
            height: height as usize,
            modules,
        },
        human_readable: value.to_string(),
    })
}

// ---------------------------------------------------------------------------
// GTIN helpers
// ---------------------------------------------------------------------------

/// Modulo-10 check digit with alternating 3/1 weights from the right.
pub fn gtin_check_digit(body: &str) -> u8 {
    let sum: u32 = body
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let d = (b - b'0') as u32;
            if i % 2 == 0 {
                d * 3
            } else {
                d
            }
        })
        .sum();
    ((10 - sum % 10) % 10) as u8
}

fn with_check_digit(body: &str) -> String {
    format!("{body}{}", gtin_check_digit(body))
}

/// Accept `body_len` digits, or `body_len + 1` digits with a correct check
/// digit. Returns the body without the check digit.
fn gtin_body(value: &str, body_len: usize, name: &str) -> Result<String, BarcodeError> {
    let value = value.trim();
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BarcodeError::Invalid(format!("{name} accepts digits only")));
    }
    if value.len() == body_len {
        return Ok(value.to_string());
    }
    if value.len() == body_len + 1 {
        let (body, check) = value.split_at(body_len);
        let expected = gtin_check_digit(body);
        if check.as_bytes()[0] - b'0' != expected {
            return Err(BarcodeError::Invalid(format!(
                "{name} check digit {check} does not match computed {expected}"
            )));
        }
        return Ok(body.to_string());
    }
    Err(BarcodeError::Invalid(format!(
        "{name} needs {body_len} or {} digits, got {}",
        body_len + 1,
        value.len()
    )))
}

// ---------------------------------------------------------------------------
// UPC-E
// ---------------------------------------------------------------------------

const UPC_L: [&str; 10] = [
    "0001101", "0011001", "0010011", "0111101", "0100011", "0110001", "0101111", "0111011",
    "0110111", "0001011",
];
const UPC_G: [&str; 10] = [
    "0100111", "0110011", "0011011", "0100001", "0011101", "0111001", "0000101", "0010001",
    "0001001", "0010111",
];
/// Parity per check digit for number system 0; `true` = even (G) code.
const UPCE_PARITY: [[bool; 6]; 10] = [
    [true, true, true, false, false, false],
    [true, true, false, true, false, false],
    [true, true, false, false, true, false],
    [true, true, false, false, false, true],
    [true, false, true, true, false, false],
    [true, false, false, true, true, false],
    [true, false, false, false, true, true],
    [true, false, true, false, true, false],
    [true, false, true, false, false, true],
    [true, false, false, true, false, true],
];

/// Expand a zero-suppressed UPC-E body into the 11-digit UPC-A body.
fn upce_to_upca(number_system: u8, d: &[u8; 6]) -> Vec<u8> {
    let mut out = vec![number_system];
    match d[5] {
        0..=2 => {
            out.extend_from_slice(&[d[0], d[1], d[5], 0, 0, 0, 0, d[2], d[3], d[4]]);
        }
        3 => out.extend_from_slice(&[d[0], d[1], d[2], 0, 0, 0, 0, 0, d[3], d[4]]),
        4 => out.extend_from_slice(&[d[0], d[1], d[2], d[3], 0, 0, 0, 0, 0, d[4]]),
        _ => out.extend_from_slice(&[d[0], d[1], d[2], d[3], d[4], 0, 0, 0, 0, d[5]]),
    }
    out
}

fn encode_upce(value: &str) -> Result<EncodedBarcode, BarcodeError> {
    let value = value.trim();
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BarcodeError::Invalid("UPCE accepts digits only".into()));
    }
    let digits: Vec<u8> = value.bytes().map(|b| b - b'0').collect();
    let (number_system, body, given_check) = match digits.len() {
        6 => (0, &digits[..], None),
        7 => (digits[0], &digits[1..], None),
        8 => (digits[0], &digits[1..7], Some(digits[7])),
        n => {
            return Err(BarcodeError::Invalid(format!(
                "UPCE needs 6, 7 or 8 digits, got {n}"
            )))
        }
    };
    if number_system > 1 {
        return Err(BarcodeError::Invalid(format!(
            "UPCE number system must be 0 or 1, got {number_system}"
        )));
    }
    let mut d = [0u8; 6];
    d.copy_from_slice(body);

    let upca: String = upce_to_upca(number_system, &d)
        .iter()
        .map(|v| char::from(b'0' + v))
        .collect();
    let check = gtin_check_digit(&upca);
    if let Some(given) = given_check {
        if given != check {
            return Err(BarcodeError::Invalid(format!(
                "UPCE check digit {given} does not match computed {check}"
            )));
        }
    }

    let parity = UPCE_PARITY[check as usize];
    let mut pattern = String::from("101");
    for (i, &digit) in d.iter().enumerate() {
        // Number system 1 uses the inverted parity pattern.
        let even = parity[i] != (number_system == 1);
        pattern.push_str(if even {
            UPC_G[digit as usize]
        } else {
            UPC_L[digit as usize]
        });
    }
    pattern.push_str("010101");

    let body_text: String = d.iter().map(|v| char::from(b'0' + v)).collect();
    Ok(EncodedBarcode {
        matrix: BarcodeMatrix::Linear(pattern.bytes().map(|b| b == b'1').collect()),
        human_readable: format!("{number_system}{body_text}{check}"),
    })
}
