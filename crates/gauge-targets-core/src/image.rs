#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("gray buffer of {got} bytes does not match {width}x{height}")]
pub struct ImageBufferError {
    pub width: usize,
    pub height: usize,
    pub got: usize,
}

impl<'a> GrayImageView<'a> {
    /// Borrow a raw row-major buffer, checking its length.
    pub fn from_slice(
        width: usize,
        height: usize,
        data: &'a [u8],
    ) -> Result<Self, ImageBufferError> {
        if width.checked_mul(height) != Some(data.len()) {
            return Err(ImageBufferError {
                width,
                height,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn row(&self, y: usize) -> &'a [u8] {
        &self.data[y * self.width..(y + 1) * self.width]
    }
}

impl GrayImage {
    /// Image filled with a constant gray value.
    pub fn new_filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Result<Self, ImageBufferError> {
        GrayImageView::from_slice(width, height, &data)?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: u8) {
        self.data[y * self.width + x] = v;
    }

    /// Copy of the `w x h` window whose top-left pixel is `(x0, y0)`.
    ///
    /// Returns `None` if the window does not fit inside the image.
    pub fn crop(&self, x0: usize, y0: usize, w: usize, h: usize) -> Option<GrayImage> {
        if x0 + w > self.width || y0 + h > self.height {
            return None;
        }
        let mut data = Vec::with_capacity(w * h);
        for y in y0..y0 + h {
            let start = y * self.width + x0;
            data.extend_from_slice(&self.data[start..start + w]);
        }
        Some(GrayImage {
            width: w,
            height: h,
            data,
        })
    }
}

#[inline]
fn get_gray_clamped(src: &GrayImageView<'_>, x: i32, y: i32) -> f32 {
    let x = x.clamp(0, src.width as i32 - 1) as usize;
    let y = y.clamp(0, src.height as i32 - 1) as usize;
    src.data[y * src.width + x] as f32
}

const CUBIC_A: f32 = -0.75;

#[inline]
fn cubic_weights(t: f32) -> [f32; 4] {
    let a = CUBIC_A;
    let t1 = t + 1.0;
    let u = 1.0 - t;
    let w0 = ((a * t1 - 5.0 * a) * t1 + 8.0 * a) * t1 - 4.0 * a;
    let w1 = ((a + 2.0) * t - (a + 3.0)) * t * t + 1.0;
    let w2 = ((a + 2.0) * u - (a + 3.0)) * u * u + 1.0;
    [w0, w1, w2, 1.0 - w0 - w1 - w2]
}

/// Bicubic (Keys, a = -0.75) sample with edge replication.
pub fn sample_bicubic(src: &GrayImageView<'_>, x: f32, y: f32) -> f32 {
    if src.is_empty() {
        return 0.0;
    }
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let wx = cubic_weights(x - x0 as f32);
    let wy = cubic_weights(y - y0 as f32);

    let mut acc = 0.0f32;
    for (j, wyj) in wy.iter().enumerate() {
        let sy = y0 - 1 + j as i32;
        let mut row = 0.0f32;
        for (i, wxi) in wx.iter().enumerate() {
            row += wxi * get_gray_clamped(src, x0 - 1 + i as i32, sy);
        }
        acc += wyj * row;
    }
    acc
}

/// Rotate an image about its centre `(w/2, h/2)` by `angle_deg`, bicubic.
///
/// Positive angles turn the content counter-clockwise as displayed (y axis
/// pointing down). The output has the input's size.
pub fn rotate_about_center(src: &GrayImageView<'_>, angle_deg: f64) -> GrayImage {
    let (w, h) = (src.width, src.height);
    let cx = w as f64 / 2.0;
    let cy = h as f64 / 2.0;
    let (sin_t, cos_t) = angle_deg.to_radians().sin_cos();

    let mut out = vec![0u8; w * h];
    for y in 0..h {
        let dy = y as f64 - cy;
        for x in 0..w {
            let dx = x as f64 - cx;
            // inverse of the forward rotation [cos sin; -sin cos]
            let sx = cx + dx * cos_t - dy * sin_t;
            let sy = cy + dx * sin_t + dy * cos_t;
            let v = sample_bicubic(src, sx as f32, sy as f32);
            out[y * w + x] = v.round().clamp(0.0, 255.0) as u8;
        }
    }

    GrayImage {
        width: w,
        height: h,
        data: out,
    }
}
