// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF page rasterizer — turns each page of a scanned PDF into a raster at a
// chosen resolution, using the `lopdf` crate.
//
// A scanned page is one embedded image drawn over the page box. The largest
// image XObject of each page is decoded and resampled to the page size, so
// no PDF content stream has to be interpreted.

use std::path::Path;

use image::{DynamicImage, GrayImage, RgbImage};
use kreator_core::error::KreatorError;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info, instrument, warn};

use crate::image::ImageProcessor;

/// US Letter, used when neither the page nor its ancestors carry a MediaBox.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Bound on /Parent chains and nested form XObjects.
const MAX_DEPTH: usize = 16;

/// Renders the pages of a scanned PDF to raster images.
pub struct PageRasterizer {
    /// The underlying lopdf document.
    document: Document,
    /// Output resolution in pixels per inch (72 = one pixel per point).
    dpi: f32,
    /// Source path, if opened from a file (useful for diagnostics).
    source_path: Option<String>,
}

impl PageRasterizer {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display(), dpi))]
    pub fn open(path: impl AsRef<Path>, dpi: f32) -> Result<Self, KreatorError> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());

        let document = Document::load(path_ref).map_err(|err| {
            KreatorError::PdfError(format!("failed to open {}: {}", path_ref.display(), err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded");

        Ok(Self {
            document,
            dpi: checked_dpi(dpi)?,
            source_path: Some(path_ref.display().to_string()),
        })
    }

    /// Create a rasterizer from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len(), dpi))]
    pub fn from_bytes(data: &[u8], dpi: f32) -> Result<Self, KreatorError> {
        let document = Document::load_mem(data).map_err(|err| {
            KreatorError::PdfError(format!("failed to load PDF from memory: {}", err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");

        Ok(Self {
            document,
            dpi: checked_dpi(dpi)?,
            source_path: None,
        })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    pub fn dpi(&self) -> f32 {
        self.dpi
    }

    /// Return the source path if the rasterizer was created via
    /// [`PageRasterizer::open`].
    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    /// Page size in PDF points (width, height) before /Rotate is applied.
    pub fn page_size_points(&self, page_number: u32) -> Result<(f32, f32), KreatorError> {
        let page = self.page_dictionary(page_number)?;
        let [x0, y0, x1, y1] = self.media_box(page);
        Ok(((x1 - x0).abs(), (y1 - y0).abs()))
    }

    // -- Rendering ------------------------------------------------------------

    /// Render one page (1-indexed) to an 8-bit luminance or RGB raster sized
    /// to the page box at the configured resolution.
    #[instrument(skip(self))]
    pub fn render_page(&self, page_number: u32) -> Result<DynamicImage, KreatorError> {
        let page = self.page_dictionary(page_number)?;

        let mut images = Vec::new();
        if let Some(resources) = self.resources(page) {
            self.collect_images(resources, 0, &mut images);
        }
        let largest = images
            .into_iter()
            .max_by_key(|stream| {
                let w = int_entry(&self.document, &stream.dict, b"Width").unwrap_or(0);
                let h = int_entry(&self.document, &stream.dict, b"Height").unwrap_or(0);
                w.saturating_mul(h)
            })
            .ok_or(KreatorError::NoPageImage { page: page_number })?;

        let decoded = self.decode_image(largest, page_number)?;

        let [x0, y0, x1, y1] = self.media_box(page);
        let scale = self.dpi / 72.0;
        let width = (((x1 - x0).abs() * scale).round() as u32).max(1);
        let height = (((y1 - y0).abs() * scale).round() as u32).max(1);
        let rotation = self.rotation(page);

        debug!(
            page_number,
            src_w = decoded.width(),
            src_h = decoded.height(),
            width,
            height,
            rotation,
            "Page image decoded"
        );

        ImageProcessor::from_dynamic(decoded)
            .resize_exact(width, height)
            .rotate_quarter_turns(rotation)
            .into_raster()
    }

    /// Render every page in document order. A page that fails to render
    /// yields an error in its slot.
    pub fn render_all(&self) -> Vec<Result<DynamicImage, KreatorError>> {
        let mut numbers: Vec<u32> = self.document.get_pages().keys().copied().collect();
        numbers.sort_unstable();
        numbers.into_iter().map(|n| self.render_page(n)).collect()
    }

    // -- Helpers --------------------------------------------------------------

    fn page_dictionary(&self, page_number: u32) -> Result<&Dictionary, KreatorError> {
        let pages = self.document.get_pages();
        let page_id: ObjectId = *pages.get(&page_number).ok_or_else(|| {
            KreatorError::PdfError(format!(
                "page {} out of range (document has {} pages)",
                page_number,
                pages.len()
            ))
        })?;
        self.document.get_dictionary(page_id).map_err(|err| {
            KreatorError::PdfError(format!("cannot read page {}: {}", page_number, err))
        })
    }

    /// Look up `key` on the page or, failing that, on its ancestors.
    fn inherited<'a>(&'a self, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
        let mut node = page;
        for _ in 0..MAX_DEPTH {
            if let Ok(value) = node.get(key) {
                return Some(resolve(&self.document, value));
            }
            let parent = node.get(b"Parent").ok()?;
            node = resolve(&self.document, parent).as_dict().ok()?;
        }
        None
    }

    fn resources<'a>(&'a self, page: &'a Dictionary) -> Option<&'a Dictionary> {
        self.inherited(page, b"Resources")?.as_dict().ok()
    }

    fn media_box(&self, page: &Dictionary) -> [f32; 4] {
        let Some(Object::Array(items)) = self.inherited(page, b"MediaBox") else {
            return DEFAULT_MEDIA_BOX;
        };
        let values: Vec<f32> = items
            .iter()
            .filter_map(|item| number(resolve(&self.document, item)))
            .collect();
        match values.as_slice() {
            [x0, y0, x1, y1] => [*x0, *y0, *x1, *y1],
            _ => {
                warn!(len = values.len(), "Malformed MediaBox, assuming Letter");
                DEFAULT_MEDIA_BOX
            }
        }
    }

    fn rotation(&self, page: &Dictionary) -> i64 {
        match self.inherited(page, b"Rotate") {
            Some(Object::Integer(degrees)) => *degrees,
            _ => 0,
        }
    }

    /// Gather image XObjects from `resources`, descending into form XObjects.
    fn collect_images<'a>(
        &'a self,
        resources: &'a Dictionary,
        depth: usize,
        out: &mut Vec<&'a Stream>,
    ) {
        if depth >= MAX_DEPTH {
            return;
        }
        let Some(xobjects) = resources
            .get(b"XObject")
            .ok()
            .and_then(|obj| resolve(&self.document, obj).as_dict().ok())
        else {
            return;
        };

        for (_, entry) in xobjects.iter() {
            let Object::Stream(stream) = resolve(&self.document, entry) else {
                continue;
            };
            match name_entry(&self.document, &stream.dict, b"Subtype") {
                Some(b"Image") => out.push(stream),
                Some(b"Form") => {
                    if let Some(inner) = stream
                        .dict
                        .get(b"Resources")
                        .ok()
                        .and_then(|obj| resolve(&self.document, obj).as_dict().ok())
                    {
                        self.collect_images(inner, depth + 1, out);
                    }
                }
                _ => {}
            }
        }
    }

    fn decode_image(
        &self,
        stream: &Stream,
        page_number: u32,
    ) -> Result<DynamicImage, KreatorError> {
        let filters = filter_names(&self.document, &stream.dict);
        let last = filters.last().map(Vec::as_slice);

        match last {
            Some(b"DCTDecode") => {
                let data = if filters.len() > 1 {
                    self.decompressed(stream, page_number)?
                } else {
                    stream.content.clone()
                };
                image::load_from_memory(&data).map_err(|err| {
                    KreatorError::ImageError(format!(
                        "page {}: failed to decode JPEG image: {}",
                        page_number, err
                    ))
                })
            }
            None | Some(b"FlateDecode") | Some(b"LZWDecode") => {
                let data = if filters.is_empty() {
                    stream.content.clone()
                } else {
                    self.decompressed(stream, page_number)?
                };
                self.decode_raw(stream, &data, page_number)
            }
            Some(other) => Err(KreatorError::UnsupportedDocument(format!(
                "page {} image uses the {} filter",
                page_number,
                String::from_utf8_lossy(other)
            ))),
        }
    }

    fn decompressed(&self, stream: &Stream, page_number: u32) -> Result<Vec<u8>, KreatorError> {
        stream.decompressed_content().map_err(|err| {
            KreatorError::PdfError(format!(
                "page {}: cannot decompress image stream: {}",
                page_number, err
            ))
        })
    }

    /// Decode unfiltered samples described by the stream dictionary.
    fn decode_raw(
        &self,
        stream: &Stream,
        data: &[u8],
        page_number: u32,
    ) -> Result<DynamicImage, KreatorError> {
        let dict = &stream.dict;
        let malformed = |what: &str| {
            KreatorError::MalformedImage(format!("page {}: {}", page_number, what))
        };

        let width = int_entry(&self.document, dict, b"Width")
            .filter(|w| *w > 0)
            .ok_or_else(|| malformed("image has no width"))? as u32;
        let height = int_entry(&self.document, dict, b"Height")
            .filter(|h| *h > 0)
            .ok_or_else(|| malformed("image has no height"))? as u32;
        let bits = int_entry(&self.document, dict, b"BitsPerComponent").unwrap_or(8);
        let pixels = width as usize * height as usize;

        let channels = match name_entry(&self.document, dict, b"ColorSpace") {
            Some(b"DeviceGray") | Some(b"CalGray") => 1,
            Some(b"DeviceRGB") | Some(b"CalRGB") => 3,
            _ if bits == 8 && data.len() >= pixels * 3 => 3,
            _ => 1,
        };

        let decoded = match (bits, channels) {
            (8, 1) => GrayImage::from_raw(width, height, truncate(data, pixels))
                .map(DynamicImage::ImageLuma8),
            (8, 3) => RgbImage::from_raw(width, height, truncate(data, pixels * 3))
                .map(DynamicImage::ImageRgb8),
            (1, 1) => unpack_bilevel(data, width, height).map(DynamicImage::ImageLuma8),
            _ => {
                return Err(KreatorError::UnsupportedDocument(format!(
                    "page {} image has {} bits per component and {} channels",
                    page_number, bits, channels
                )));
            }
        };
        decoded.ok_or_else(|| malformed("image data is shorter than its dimensions"))
    }
}

fn checked_dpi(dpi: f32) -> Result<f32, KreatorError> {
    if dpi.is_finite() && dpi > 0.0 {
        Ok(dpi)
    } else {
        Err(KreatorError::Config(format!("render dpi must be positive, got {}", dpi)))
    }
}

/// Follow a single indirect reference; unresolvable references become Null.
fn resolve<'a>(document: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => document.get_object(*id).unwrap_or(&Object::Null),
        other => other,
    }
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn int_entry(document: &Document, dict: &Dictionary, key: &[u8]) -> Option<i64> {
    match resolve(document, dict.get(key).ok()?) {
        Object::Integer(i) => Some(*i),
        _ => None,
    }
}

fn name_entry<'a>(document: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a [u8]> {
    match resolve(document, dict.get(key).ok()?) {
        Object::Name(name) => Some(name.as_slice()),
        // Indexed and ICC colour spaces are arrays; their first entry names
        // the family.
        Object::Array(items) => match items.first().map(|o| resolve(document, o)) {
            Some(Object::Name(name)) => Some(name.as_slice()),
            _ => None,
        },
        _ => None,
    }
}

fn filter_names(document: &Document, dict: &Dictionary) -> Vec<Vec<u8>> {
    let Ok(filter) = dict.get(b"Filter") else {
        return Vec::new();
    };
    match resolve(document, filter) {
        Object::Name(name) => vec![name.clone()],
        Object::Array(items) => items
            .iter()
            .filter_map(|item| match resolve(document, item) {
                Object::Name(name) => Some(name.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn truncate(data: &[u8], len: usize) -> Vec<u8> {
    data[..len.min(data.len())].to_vec()
}

/// Expand 1-bit samples (rows padded to whole bytes, 1 = white) to 8 bits.
fn unpack_bilevel(data: &[u8], width: u32, height: u32) -> Option<GrayImage> {
    let row_bytes = (width as usize).div_ceil(8);
    if data.len() < row_bytes * height as usize {
        return None;
    }
    Some(GrayImage::from_fn(width, height, |x, y| {
        let byte = data[y as usize * row_bytes + x as usize / 8];
        let bit = (byte >> (7 - (x % 8))) & 1;
        image::Luma([if bit == 1 { 255 } else { 0 }])
    }))
}
