// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Summary report writer — lays out the collected name crops as a bordered
// table and renders it with `printpdf` 0.8.
//
// Table shape:
//
//   | title (merged over all three columns)  |
//   | No.  | Class          | Amount          |
//   | 1    | <crop image>   |                 |
//   | ...                                     |
//   | TOTAL (merged)        |                 |   <- thick border
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`.

use std::path::Path;

use image::{DynamicImage, GrayImage};
use kreator_core::ReportConfig;
use kreator_core::error::KreatorError;
use printpdf::{
    BuiltinFont, Line, LinePoint, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg,
    Point, Pt, RawImage, RawImageData, RawImageFormat, TextItem, XObjectTransform,
};
use tracing::{debug, info, instrument};

const MARGIN_MM: f32 = 15.0;
const NUMBER_COLUMN_MM: f32 = 18.0;
const AMOUNT_COLUMN_MM: f32 = 35.0;
const TITLE_ROW_MM: f32 = 11.0;
const HEADER_ROW_MM: f32 = 9.0;
const TOTAL_ROW_MM: f32 = 9.0;
const MIN_BODY_ROW_MM: f32 = 8.0;
const CELL_PADDING_MM: f32 = 1.0;
/// Resolution crops are placed at; a 173 px wide crop is about 46 mm.
const IMAGE_DPI: f32 = 96.0;
const THIN_BORDER_PT: f32 = 0.5;
const THICK_BORDER_PT: f32 = 1.5;

/// One table row placed on a page. `top` is measured from the top edge of
/// the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowPlacement {
    pub kind: RowKind,
    pub top: Mm,
    pub height: Mm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Title,
    Header,
    /// Index into the crops passed to the report, and the number printed in
    /// the first column.
    Body { index: usize, number: usize },
    Total,
}

/// Renders the summary table of a batch.
pub struct SummaryReport {
    config: ReportConfig,
}

impl SummaryReport {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Paper dimensions in printpdf's Mm units.
    fn page_dimensions(&self) -> (Mm, Mm) {
        let (w_mm, h_mm) = self.config.paper_size.dimensions_mm();
        (Mm(w_mm as f32), Mm(h_mm as f32))
    }

    fn image_column_mm(&self) -> f32 {
        let (page_w, _) = self.page_dimensions();
        (page_w.0 - 2.0 * MARGIN_MM - NUMBER_COLUMN_MM - AMOUNT_COLUMN_MM).max(10.0)
    }

    /// Rendered size of a crop in mm: native size at 96 dpi, shrunk to fit
    /// the image column.
    fn image_size_mm(&self, crop: &GrayImage) -> (f32, f32) {
        let px_to_mm = 25.4 / IMAGE_DPI;
        let (w, h) = (crop.width() as f32 * px_to_mm, crop.height() as f32 * px_to_mm);
        let available = self.image_column_mm() - 2.0 * CELL_PADDING_MM;
        let scale = if w > available { available / w } else { 1.0 };
        (w * scale, h * scale)
    }

    /// Split the table into pages. The title opens the first page, the
    /// column headers repeat on every page and the total closes the last.
    pub fn layout(&self, crops: &[(u32, GrayImage)]) -> Vec<Vec<RowPlacement>> {
        let (_, page_h) = self.page_dimensions();
        let bottom_limit = page_h.0 - MARGIN_MM;

        let mut pages = Vec::new();
        let mut rows = vec![
            RowPlacement {
                kind: RowKind::Title,
                top: Mm(MARGIN_MM),
                height: Mm(TITLE_ROW_MM),
            },
            RowPlacement {
                kind: RowKind::Header,
                top: Mm(MARGIN_MM + TITLE_ROW_MM),
                height: Mm(HEADER_ROW_MM),
            },
        ];
        let mut cursor = MARGIN_MM + TITLE_ROW_MM + HEADER_ROW_MM;

        let body = crops.iter().enumerate().map(|(index, (_, crop))| {
            let (_, h) = self.image_size_mm(crop);
            let height = (h + 2.0 * CELL_PADDING_MM).max(MIN_BODY_ROW_MM);
            (
                RowKind::Body {
                    index,
                    number: index + 1,
                },
                height,
            )
        });

        for (kind, height) in body.chain(std::iter::once((RowKind::Total, TOTAL_ROW_MM))) {
            if cursor + height > bottom_limit && rows.len() > 1 {
                pages.push(std::mem::take(&mut rows));
                rows.push(RowPlacement {
                    kind: RowKind::Header,
                    top: Mm(MARGIN_MM),
                    height: Mm(HEADER_ROW_MM),
                });
                cursor = MARGIN_MM + HEADER_ROW_MM;
            }
            rows.push(RowPlacement {
                kind,
                top: Mm(cursor),
                height: Mm(height),
            });
            cursor += height;
        }
        pages.push(rows);
        pages
    }

    /// Render the table for `crops` (page number, enhanced crop) to PDF bytes.
    #[instrument(skip_all, fields(rows = crops.len()))]
    pub fn render(&self, crops: &[(u32, GrayImage)]) -> Result<Vec<u8>, KreatorError> {
        let (page_w, page_h) = self.page_dimensions();
        info!(
            paper = ?self.config.paper_size,
            title = %self.config.title,
            "Creating summary report"
        );

        let mut doc = PdfDocument::new(&self.config.title);

        let image_ids: Vec<_> = crops
            .iter()
            .map(|(_, crop)| {
                let rgb = DynamicImage::ImageLuma8(crop.clone()).to_rgb8();
                let raw = RawImage {
                    pixels: RawImageData::U8(rgb.into_raw()),
                    width: crop.width() as usize,
                    height: crop.height() as usize,
                    data_format: RawImageFormat::RGB8,
                    tag: Vec::new(),
                };
                doc.add_image(&raw)
            })
            .collect();

        let layout = self.layout(crops);
        let page_h_pt = page_h.into_pt().0;
        let columns = self.column_edges();

        let mut pages = Vec::with_capacity(layout.len());
        for rows in &layout {
            let mut ops: Vec<Op> = Vec::new();
            for row in rows {
                let top_pt = page_h_pt - row.top.into_pt().0;
                let bottom_pt = page_h_pt - Mm(row.top.0 + row.height.0).into_pt().0;
                let band = (top_pt, bottom_pt);
                let cells = self.row_cells(row.kind, &columns);

                let thickness = if row.kind == RowKind::Total {
                    THICK_BORDER_PT
                } else {
                    THIN_BORDER_PT
                };
                ops.push(Op::SetOutlineThickness { pt: Pt(thickness) });
                for &(left, right) in &cells {
                    ops.push(cell_border(left, right, top_pt, bottom_pt));
                }

                match row.kind {
                    RowKind::Title => {
                        ops.extend(centered_text(&self.config.title, 14.0, true, cells[0], band));
                    }
                    RowKind::Header => {
                        let labels = [
                            &self.config.number_header,
                            &self.config.image_header,
                            &self.config.amount_header,
                        ];
                        for (label, &(l, r)) in labels.iter().zip(&cells) {
                            ops.extend(centered_text(label, 12.0, true, (l, r), band));
                        }
                    }
                    RowKind::Body { index, number } => {
                        let label = number.to_string();
                        ops.extend(centered_text(&label, 12.0, false, cells[0], band));

                        let (_, crop) = &crops[index];
                        let (w_mm, h_mm) = self.image_size_mm(crop);
                        let scale = w_mm / (crop.width() as f32 * 25.4 / IMAGE_DPI);
                        let x = cells[1].0 + Mm(CELL_PADDING_MM).into_pt().0;
                        let y = bottom_pt + ((top_pt - bottom_pt) - Mm(h_mm).into_pt().0) / 2.0;
                        ops.push(Op::UseXobject {
                            id: image_ids[index].clone(),
                            transform: XObjectTransform {
                                translate_x: Some(Pt(x)),
                                translate_y: Some(Pt(y)),
                                scale_x: Some(scale),
                                scale_y: Some(scale),
                                dpi: Some(IMAGE_DPI),
                                rotate: None,
                            },
                        });
                    }
                    RowKind::Total => {
                        let label = &self.config.total_label;
                        ops.extend(centered_text(label, 12.0, true, cells[0], band));
                    }
                }
            }
            pages.push(PdfPage::new(page_w, page_h, ops));
        }

        doc.with_pages(pages);
        debug!(pages = layout.len(), "Report layout complete");

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if output.is_empty() {
            return Err(KreatorError::Report("PDF serialisation produced no output".into()));
        }
        Ok(output)
    }

    /// Render the report and write it to `path`.
    pub fn write_to_file(
        &self,
        crops: &[(u32, GrayImage)],
        path: impl AsRef<Path>,
    ) -> Result<(), KreatorError> {
        let bytes = self.render(crops)?;
        std::fs::write(path.as_ref(), &bytes)?;
        info!("Wrote summary report to {}", path.as_ref().display());
        Ok(())
    }

    /// x positions in points of the four vertical grid lines.
    fn column_edges(&self) -> [f32; 4] {
        let left = MARGIN_MM;
        let number = left + NUMBER_COLUMN_MM;
        let image = number + self.image_column_mm();
        let amount = image + AMOUNT_COLUMN_MM;
        [left, number, image, amount].map(|mm| Mm(mm).into_pt().0)
    }

    /// Horizontal extent of each cell of a row; merged cells span several
    /// columns.
    fn row_cells(&self, kind: RowKind, edges: &[f32; 4]) -> Vec<(f32, f32)> {
        match kind {
            RowKind::Title => vec![(edges[0], edges[3])],
            RowKind::Header | RowKind::Body { .. } => vec![
                (edges[0], edges[1]),
                (edges[1], edges[2]),
                (edges[2], edges[3]),
            ],
            RowKind::Total => vec![(edges[0], edges[2]), (edges[2], edges[3])],
        }
    }
}

fn cell_border(left: f32, right: f32, top: f32, bottom: f32) -> Op {
    let corner = |x: f32, y: f32| LinePoint {
        p: Point { x: Pt(x), y: Pt(y) },
        bezier: false,
    };
    Op::DrawLine {
        line: Line {
            points: vec![
                corner(left, top),
                corner(right, top),
                corner(right, bottom),
                corner(left, bottom),
            ],
            is_closed: true,
        },
    }
}

/// Text ops for `text` centred in the cell spanning `columns` (left, right)
/// and `band` (top, bottom).
fn centered_text(
    text: &str,
    size: f32,
    bold: bool,
    (left, right): (f32, f32),
    (top, bottom): (f32, f32),
) -> Vec<Op> {
    let font = if bold {
        BuiltinFont::HelveticaBold
    } else {
        BuiltinFont::Helvetica
    };
    // Average Helvetica glyph width is roughly half the font size.
    let width = text.chars().count() as f32 * size * 0.5;
    let x = left + ((right - left) - width).max(0.0) / 2.0;
    let y = bottom + (top - bottom) / 2.0 - size * 0.35;

    vec![
        Op::StartTextSection,
        Op::SetTextCursor {
            pos: Point { x: Pt(x), y: Pt(y) },
        },
        Op::SetFontSizeBuiltinFont {
            size: Pt(size),
            font,
        },
        Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(text.to_string())],
            font,
        },
        Op::EndTextSection,
    ]
}
