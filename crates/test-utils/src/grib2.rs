//! Synthetic GRIB2 tiles.
//!
//! Builds minimal single-message GRIB2 files shaped like the hourly MERGE
//! precipitation product: template 3.0 regular lat/lon grid, template 4.0
//! product, simple packing (template 5.0) and an optional bitmap for missing
//! points.

use std::path::Path;

/// Build a minimal GRIB2 precipitation message.
pub struct Grib2Builder {
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    ni: u32,
    nj: u32,
    /// First (northernmost) latitude, micro-degrees
    la1: i32,
    /// First (westernmost) longitude, micro-degrees in 0..360
    lo1: i32,
    di: u32,
    dj: u32,
    data_values: Vec<f32>,
}

impl Grib2Builder {
    /// 10x10 grid at 0.1° over the Sao Paulo interior, all dry.
    pub fn new_merge() -> Self {
        let ni = 10;
        let nj = 10;
        Self {
            year: 2025,
            month: 1,
            day: 15,
            hour: 13,
            ni,
            nj,
            la1: -20_050_000,
            lo1: 309_950_000, // -50.05
            di: 100_000,
            dj: 100_000,
            data_values: vec![0.0; (ni * nj) as usize],
        }
    }

    pub fn with_reference_time(mut self, year: u16, month: u8, day: u8, hour: u8) -> Self {
        self.year = year;
        self.month = month;
        self.day = day;
        self.hour = hour;
        self
    }

    pub fn with_grid(mut self, ni: u32, nj: u32) -> Self {
        self.ni = ni;
        self.nj = nj;
        self.data_values = vec![0.0; (ni * nj) as usize];
        self
    }

    /// Centre of the first grid point and the spacing, in degrees.
    ///
    /// Longitudes may be given in -180..180; they are stored in 0..360.
    pub fn with_origin(mut self, first_lat: f64, first_lon: f64, spacing: f64) -> Self {
        let lon = if first_lon < 0.0 { first_lon + 360.0 } else { first_lon };
        self.la1 = (first_lat * 1e6).round() as i32;
        self.lo1 = (lon * 1e6).round() as i32;
        self.di = (spacing * 1e6).round() as u32;
        self.dj = self.di;
        self
    }

    pub fn with_constant_value(mut self, value: f32) -> Self {
        self.data_values = vec![value; (self.ni * self.nj) as usize];
        self
    }

    pub fn with_gradient(mut self, min_val: f32, max_val: f32) -> Self {
        let n = (self.ni * self.nj) as usize;
        self.data_values = (0..n)
            .map(|i| min_val + (max_val - min_val) * (i as f32 / n as f32))
            .collect();
        self
    }

    /// Values in scan order (north row first); NaN marks a missing point.
    pub fn with_data(mut self, data: Vec<f32>) -> Self {
        self.data_values = data;
        self
    }

    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.build())
    }

    /// Build the complete GRIB2 message bytes
    pub fn build(&self) -> Vec<u8> {
        let mut message = Vec::new();

        let section1 = self.build_section1();
        let section3 = self.build_section3();
        let section4 = self.build_section4();
        let section5 = self.build_section5();
        let section6 = self.build_section6();
        let section7 = self.build_section7();

        let message_length = 16
            + section1.len()
            + section3.len()
            + section4.len()
            + section5.len()
            + section6.len()
            + section7.len()
            + 4;

        // Section 0: Indicator
        message.extend_from_slice(b"GRIB");
        message.extend_from_slice(&[0, 0]);
        message.push(0); // Meteorological
        message.push(2); // Edition 2
        message.extend_from_slice(&(message_length as u64).to_be_bytes());

        message.extend_from_slice(&section1);
        message.extend_from_slice(&section3);
        message.extend_from_slice(&section4);
        message.extend_from_slice(&section5);
        message.extend_from_slice(&section6);
        message.extend_from_slice(&section7);

        // Section 8: End
        message.extend_from_slice(b"7777");

        message
    }

    fn present(&self) -> impl Iterator<Item = f32> + '_ {
        self.data_values.iter().copied().filter(|v| !v.is_nan())
    }

    fn has_missing(&self) -> bool {
        self.data_values.iter().any(|v| v.is_nan())
    }

    fn build_section1(&self) -> Vec<u8> {
        let mut section = Vec::new();
        let section_length: u32 = 21;

        section.extend_from_slice(&section_length.to_be_bytes());
        section.push(1);

        section.extend_from_slice(&46u16.to_be_bytes()); // CPTEC
        section.extend_from_slice(&0u16.to_be_bytes()); // Sub-center
        section.push(2); // Master table version
        section.push(0); // Local table version
        section.push(0); // Significance of reference time (analysis)

        section.extend_from_slice(&self.year.to_be_bytes());
        section.push(self.month);
        section.push(self.day);
        section.push(self.hour);
        section.push(0);
        section.push(0);

        section.push(0); // Operational
        section.push(0); // Analysis product

        section
    }

    fn build_section3(&self) -> Vec<u8> {
        let mut section = Vec::new();

        // Template 3.0: Latitude/Longitude
        let template_data_len = 58;
        let section_length: u32 = 14 + template_data_len;

        section.extend_from_slice(&section_length.to_be_bytes());
        section.push(3);

        section.push(0);
        section.extend_from_slice(&(self.ni * self.nj).to_be_bytes());
        section.push(0);
        section.push(0);
        section.extend_from_slice(&0u16.to_be_bytes());

        section.push(6); // Spherical earth, radius 6371229 m
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());

        section.extend_from_slice(&self.ni.to_be_bytes());
        section.extend_from_slice(&self.nj.to_be_bytes());
        section.extend_from_slice(&0u32.to_be_bytes()); // Basic angle
        section.extend_from_slice(&0xFFFFFFFFu32.to_be_bytes()); // Subdivisions

        let la2 = self.la1 - ((self.nj - 1) * self.dj) as i32;
        let lo2 = self.lo1 + ((self.ni - 1) * self.di) as i32;

        section.extend_from_slice(&sign_magnitude_i32(self.la1));
        section.extend_from_slice(&sign_magnitude_i32(self.lo1));
        section.push(48); // Resolution and component flags
        section.extend_from_slice(&sign_magnitude_i32(la2));
        section.extend_from_slice(&sign_magnitude_i32(lo2));
        section.extend_from_slice(&self.di.to_be_bytes());
        section.extend_from_slice(&self.dj.to_be_bytes());
        section.push(0); // +i, -j, i consecutive

        section
    }

    fn build_section4(&self) -> Vec<u8> {
        let mut section = Vec::new();
        let section_length: u32 = 34;

        section.extend_from_slice(&section_length.to_be_bytes());
        section.push(4);

        section.extend_from_slice(&0u16.to_be_bytes());
        section.extend_from_slice(&0u16.to_be_bytes()); // Template 4.0

        section.push(1); // Moisture
        section.push(8); // Total precipitation
        section.push(0); // Analysis
        section.push(0);
        section.push(0);
        section.extend_from_slice(&0u16.to_be_bytes());
        section.push(0);
        section.push(1); // Hours
        section.extend_from_slice(&0u32.to_be_bytes());

        section.push(1); // Ground or water surface
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());

        section.push(255);
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());

        section
    }

    fn packing(&self) -> (f32, f32, i16, u8) {
        let (min_val, max_val) = self.present().fold(
            (f32::INFINITY, f32::NEG_INFINITY),
            |(min, max), v| (min.min(v), max.max(v)),
        );
        if !min_val.is_finite() {
            return (0.0, 0.0, 0, 0);
        }
        let range = max_val - min_val;
        if range == 0.0 {
            return (min_val, range, 0, 0);
        }
        // value = reference + packed * 2^E with 16-bit packed values
        let binary_scale_factor = (range / 65535.0).log2().ceil() as i16;
        (min_val, range, binary_scale_factor, 16)
    }

    fn build_section5(&self) -> Vec<u8> {
        let mut section = Vec::new();
        let (reference_value, _, binary_scale_factor, bits_per_value) = self.packing();
        let section_length: u32 = 21;

        section.extend_from_slice(&section_length.to_be_bytes());
        section.push(5);

        section.extend_from_slice(&(self.present().count() as u32).to_be_bytes());
        section.extend_from_slice(&0u16.to_be_bytes()); // Template 5.0

        section.extend_from_slice(&reference_value.to_be_bytes());
        section.extend_from_slice(&sign_magnitude_i16(binary_scale_factor));
        section.extend_from_slice(&0u16.to_be_bytes()); // Decimal scale factor
        section.push(bits_per_value);
        section.push(0); // Floating point

        section
    }

    fn build_section6(&self) -> Vec<u8> {
        let mut section = Vec::new();
        if !self.has_missing() {
            section.extend_from_slice(&6u32.to_be_bytes());
            section.push(6);
            section.push(255); // No bitmap
            return section;
        }

        let mut bitmap = vec![0u8; self.data_values.len().div_ceil(8)];
        for (i, v) in self.data_values.iter().enumerate() {
            if !v.is_nan() {
                bitmap[i / 8] |= 0x80 >> (i % 8);
            }
        }
        section.extend_from_slice(&((6 + bitmap.len()) as u32).to_be_bytes());
        section.push(6);
        section.push(0); // Bitmap follows
        section.extend_from_slice(&bitmap);
        section
    }

    fn build_section7(&self) -> Vec<u8> {
        let mut section = Vec::new();
        let packed_data = self.pack_simple();
        let section_length: u32 = 5 + packed_data.len() as u32;

        section.extend_from_slice(&section_length.to_be_bytes());
        section.push(7);
        section.extend_from_slice(&packed_data);

        section
    }

    fn pack_simple(&self) -> Vec<u8> {
        let (reference_value, range, binary_scale_factor, _) = self.packing();
        if range == 0.0 {
            return Vec::new();
        }

        let binary_scale = 2.0_f32.powi(binary_scale_factor as i32);
        let mut packed = Vec::new();
        for val in self.present() {
            let packed_value = ((val - reference_value) / binary_scale).round() as u16;
            packed.extend_from_slice(&packed_value.to_be_bytes());
        }
        packed
    }
}

/// GRIB2 signed integers use a sign bit, not two's complement.
fn sign_magnitude_i32(v: i32) -> [u8; 4] {
    let magnitude = v.unsigned_abs() & 0x7FFF_FFFF;
    let raw = if v < 0 { magnitude | 0x8000_0000 } else { magnitude };
    raw.to_be_bytes()
}

fn sign_magnitude_i16(v: i16) -> [u8; 2] {
    let magnitude = v.unsigned_abs() & 0x7FFF;
    let raw = if v < 0 { magnitude | 0x8000 } else { magnitude };
    raw.to_be_bytes()
}
