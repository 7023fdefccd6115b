//! Sample grids: borrowed strided views and owned contiguous buffers.
//!
//! `GridView` is a borrowed 2D view into a 1D `f64` buffer with an explicit
//! stride. The stride counts elements between the starts of consecutive rows,
//! so a stride larger than the width represents padded rows. ROI slices are
//! zero-copy views into the same backing slice and retain the original stride.
//!
//! Coordinates are `(x, y)` = (column, row). Cells may hold NaN to mark an
//! invalid sample; nothing in this module inspects values.

use crate::util::{CoiError, CoiResult};

/// Borrowed 2D grid view with an explicit stride.
#[derive(Copy, Clone, Debug)]
pub struct GridView<'a> {
    data: &'a [f64],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a> GridView<'a> {
    /// Creates a contiguous view with `stride == width`.
    pub fn from_slice(data: &'a [f64], width: usize, height: usize) -> CoiResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Creates a view with an explicit stride.
    pub fn new(data: &'a [f64], width: usize, height: usize, stride: usize) -> CoiResult<Self> {
        let needed = required_len(width, height, stride)?;
        if data.len() < needed {
            return Err(CoiError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// Returns the grid width in cells.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the grid height in cells.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns `width * height`.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// Always false; zero-sized views cannot be constructed.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns the backing slice including any row padding.
    pub fn as_slice(&self) -> &'a [f64] {
        self.data
    }

    /// Returns the sample at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<f64> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y.checked_mul(self.stride)?.checked_add(x)?;
        self.data.get(idx).copied()
    }

    /// Returns a contiguous slice for row `y` with length `width`.
    pub fn row(&self, y: usize) -> Option<&'a [f64]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?;
        let end = start.checked_add(self.width)?;
        self.data.get(start..end)
    }

    /// Iterates over rows, each of length `width`.
    pub fn rows(&self) -> impl Iterator<Item = &'a [f64]> {
        let view = *self;
        (0..self.height).filter_map(move |y| view.row(y))
    }

    /// Fails unless `other` has this view's width and height.
    pub fn ensure_same_shape(&self, other: &GridView<'_>) -> CoiResult<()> {
        if self.width != other.width || self.height != other.height {
            return Err(CoiError::ShapeMismatch {
                expected_width: self.width,
                expected_height: self.height,
                width: other.width,
                height: other.height,
            });
        }
        Ok(())
    }

    /// Returns a zero-copy ROI view into the same backing buffer.
    pub fn roi(&self, x: usize, y: usize, width: usize, height: usize) -> CoiResult<GridView<'a>> {
        if width == 0 || height == 0 {
            return Err(CoiError::InvalidDimensions { width, height });
        }

        let out_of_bounds = CoiError::RoiOutOfBounds {
            x,
            y,
            width,
            height,
            img_width: self.width,
            img_height: self.height,
        };
        let end_x = x.checked_add(width).ok_or_else(|| out_of_bounds.clone())?;
        let end_y = y.checked_add(height).ok_or_else(|| out_of_bounds.clone())?;
        if end_x > self.width || end_y > self.height {
            return Err(out_of_bounds);
        }

        let start = y
            .checked_mul(self.stride)
            .and_then(|v| v.checked_add(x))
            .ok_or(CoiError::InvalidDimensions {
                width: self.width,
                height: self.height,
            })?;
        let data = self.data.get(start..).ok_or(CoiError::BufferTooSmall {
            needed: start.saturating_add(1),
            got: self.data.len(),
        })?;

        GridView::new(data, width, height, self.stride)
    }

    /// Copies the view into a contiguous row-major vector.
    pub fn to_vec(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.len());
        for row in self.rows() {
            out.extend_from_slice(row);
        }
        out
    }
}

/// Owned contiguous grid buffer (`stride == width`).
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    data: Vec<f64>,
    width: usize,
    height: usize,
}

impl Grid {
    /// Wraps a row-major buffer of exactly `width * height` samples.
    pub fn new(data: Vec<f64>, width: usize, height: usize) -> CoiResult<Self> {
        let needed = required_len(width, height, width)?;
        if data.len() < needed {
            return Err(CoiError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(CoiError::InvalidDimensions { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Creates a grid with every cell set to `value`.
    pub fn filled(value: f64, width: usize, height: usize) -> CoiResult<Self> {
        let len = required_len(width, height, width)?;
        Self::new(vec![value; len], width, height)
    }

    /// Builds a grid from equal-length rows.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> CoiResult<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, |row| row.as_ref().len());
        let mut data = Vec::with_capacity(width.saturating_mul(height));
        for row in rows {
            let row = row.as_ref();
            if row.len() != width {
                return Err(CoiError::ShapeMismatch {
                    expected_width: width,
                    expected_height: height,
                    width: row.len(),
                    height,
                });
            }
            data.extend_from_slice(row);
        }
        Self::new(data, width, height)
    }

    /// Copies a (possibly strided) view into an owned grid.
    pub fn from_view(view: GridView<'_>) -> CoiResult<Self> {
        Self::new(view.to_vec(), view.width(), view.height())
    }

    /// Returns a borrowed view of the grid.
    pub fn view(&self) -> GridView<'_> {
        GridView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width,
        }
    }

    /// Returns the grid width in cells.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the grid height in cells.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns `(height, width)`, the numpy-style shape.
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Returns the row-major sample buffer.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Returns the sample at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<f64> {
        self.view().get(x, y)
    }

    /// Returns row `y`.
    pub fn row(&self, y: usize) -> Option<&[f64]> {
        let start = y.checked_mul(self.width)?;
        self.data.get(start..start + self.width)
    }

    /// Consumes the grid and returns its buffer.
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }
}

fn required_len(width: usize, height: usize, stride: usize) -> CoiResult<usize> {
    if width == 0 || height == 0 {
        return Err(CoiError::InvalidDimensions { width, height });
    }
    if stride < width {
        return Err(CoiError::InvalidStride { width, stride });
    }
    (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(CoiError::InvalidDimensions { width, height })
}
