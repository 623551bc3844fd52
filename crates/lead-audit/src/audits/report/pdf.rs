use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Rect, Rgb,
};
use tracing::{debug, warn};

use super::document::{wrap_text, ReportBranding, ReportDocument, ReportPage};
use super::{report_file_name, ReportError, ReportReference, ReportRenderer};
use crate::audits::domain::{AuditId, AuditRecord};
use crate::audits::scoring::ScoreSet;
use crate::config::ReportConfig;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 18.0;
const BAR_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const BAR_HEIGHT: f32 = 6.0;
const WRAP_COLUMNS: usize = 95;
const NAME_ATTEMPTS: i64 = 1000;

const BRAND: (u8, u8, u8) = (0x66, 0x7e, 0xea);
const INK: (u8, u8, u8) = (0x33, 0x33, 0x33);
const MUTED: (u8, u8, u8) = (0x66, 0x66, 0x66);
const TRACK: (u8, u8, u8) = (0xe5, 0xe7, 0xeb);
const WHITE: (u8, u8, u8) = (0xff, 0xff, 0xff);
const PRESENT: (u8, u8, u8) = (0x10, 0xb9, 0x81);
const ABSENT: (u8, u8, u8) = (0xef, 0x44, 0x44);

/// Draws [`ReportDocument`]s as A4 PDFs into a directory.
#[derive(Debug, Clone)]
pub struct PdfReportRenderer {
    output_dir: PathBuf,
    branding: ReportBranding,
}

impl PdfReportRenderer {
    pub fn new(output_dir: impl Into<PathBuf>, branding: ReportBranding) -> Self {
        Self {
            output_dir: output_dir.into(),
            branding,
        }
    }

    pub fn from_config(config: &ReportConfig) -> Self {
        Self::new(
            config.output_dir.clone(),
            ReportBranding {
                brand_name: config.brand_name.clone(),
                booking_url: config.booking_url.clone(),
                website_url: config.website_url.clone(),
            },
        )
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Claim a file name nobody has written yet, stepping the timestamp on collision.
    fn reserve(
        &self,
        id: AuditId,
        generated_at: DateTime<Utc>,
    ) -> Result<(String, PathBuf, File), ReportError> {
        for step in 0..NAME_ATTEMPTS {
            let stamp = generated_at + chrono::Duration::milliseconds(step);
            let file_name = report_file_name(id, stamp);
            let path = self.output_dir.join(&file_name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((file_name, path, file)),
                Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
                Err(source) => return Err(ReportError::Io { path, source }),
            }
        }
        Err(ReportError::NameExhausted(id))
    }
}

impl ReportRenderer for PdfReportRenderer {
    fn render(
        &self,
        record: &AuditRecord,
        scores: &ScoreSet,
        generated_at: DateTime<Utc>,
    ) -> Result<ReportReference, ReportError> {
        fs::create_dir_all(&self.output_dir).map_err(|source| ReportError::Io {
            path: self.output_dir.clone(),
            source,
        })?;

        let document = ReportDocument::build(record, scores, generated_at, &self.branding);
        let (file_name, path, file) = self.reserve(record.id, generated_at)?;

        if let Err(err) = write_document(&document, file, &path) {
            if let Err(cleanup) = fs::remove_file(&path) {
                warn!(path = %path.display(), error = %cleanup, "failed to remove partial report");
            }
            return Err(err);
        }

        debug!(audit_id = %record.id, %file_name, pages = document.pages.len(), "report written");
        Ok(ReportReference { file_name, path })
    }
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

fn encoding_error(err: printpdf::Error) -> ReportError {
    ReportError::Encoding(format!("{err:?}"))
}

fn write_document(document: &ReportDocument, file: File, path: &Path) -> Result<(), ReportError> {
    let (pdf, first_page, first_layer) = PdfDocument::new(
        document.title.as_str(),
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        "content",
    );
    let fonts = Fonts {
        regular: pdf
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(encoding_error)?,
        bold: pdf
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(encoding_error)?,
    };

    for (index, page) in document.pages.iter().enumerate() {
        let layer = if index == 0 {
            pdf.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_index, layer_index) =
                pdf.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "content");
            pdf.get_page(page_index).get_layer(layer_index)
        };
        let mut canvas = Canvas::new(layer, &fonts);
        canvas.draw(page);
    }

    let mut writer = BufWriter::new(file);
    pdf.save(&mut writer).map_err(|err| match err {
        printpdf::Error::Io(source) => ReportError::Io {
            path: path.to_path_buf(),
            source,
        },
        other => encoding_error(other),
    })
}

/// Top-down text cursor over one page layer.
struct Canvas<'a> {
    layer: PdfLayerReference,
    fonts: &'a Fonts,
    y: f32,
}

impl<'a> Canvas<'a> {
    fn new(layer: PdfLayerReference, fonts: &'a Fonts) -> Self {
        Self {
            layer,
            fonts,
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn draw(&mut self, page: &ReportPage) {
        match page {
            ReportPage::Title {
                heading,
                subheading,
                generated_on,
                business_lines,
            } => {
                self.fill(BRAND);
                self.rect(0.0, PAGE_HEIGHT - 55.0, PAGE_WIDTH, PAGE_HEIGHT);
                self.y = PAGE_HEIGHT - 22.0;
                self.bold_line(heading, 26.0, WHITE);
                self.line(subheading, 13.0, WHITE);
                self.line(generated_on, 10.0, WHITE);

                self.y = PAGE_HEIGHT - 75.0;
                self.bold_line("Business Information", 16.0, INK);
                for line in business_lines {
                    self.line(line, 11.0, MUTED);
                }
            }
            ReportPage::Overall { score, level } => {
                self.bold_line("Overall Digital Health Score", 18.0, INK);
                self.gap(20.0);
                self.bold_line(&format!("{score}/100"), 48.0, level.color());
                self.gap(4.0);
                self.bold_line(level.label(), 20.0, level.color());
                self.gap(8.0);
                self.bar(f32::from(*score) / 100.0, level.color());
            }
            ReportPage::Breakdown { bars } => {
                self.bold_line("Detailed Score Breakdown", 18.0, INK);
                self.gap(6.0);
                for bar in bars {
                    self.line(
                        &format!("{} - {}/100 ({})", bar.label, bar.score, bar.level.label()),
                        12.0,
                        INK,
                    );
                    self.bar(bar.fill_ratio(), bar.level.color());
                    self.gap(8.0);
                }
            }
            ReportPage::Checklist { items } => {
                self.bold_line("Current Digital Presence", 18.0, INK);
                self.gap(6.0);
                for item in items {
                    let (marker, color) = if item.present {
                        ("[YES]", PRESENT)
                    } else {
                        ("[NO] ", ABSENT)
                    };
                    self.text(marker, MARGIN, 11.0, color, true);
                    self.text(item.label, MARGIN + 16.0, 11.0, MUTED, false);
                    self.advance(11.0);
                }
            }
            ReportPage::Recommendations { items } => {
                self.bold_line("Recommended Actions", 18.0, INK);
                self.gap(6.0);
                if items.is_empty() {
                    self.line(
                        "Every category scored 70 or higher. Keep building on your strengths.",
                        11.0,
                        MUTED,
                    );
                }
                for (index, item) in items.iter().enumerate() {
                    self.bold_line(&format!("{}. {}", index + 1, item.title), 13.0, INK);
                    self.line(
                        &format!(
                            "Priority: {} | Category: {}",
                            item.priority.label(),
                            item.category
                        ),
                        10.0,
                        item.priority.color(),
                    );
                    for wrapped in wrap_text(item.description, WRAP_COLUMNS) {
                        self.line(&wrapped, 10.0, MUTED);
                    }
                    self.gap(5.0);
                }
            }
            ReportPage::NextSteps {
                steps,
                call_to_action,
                footer,
            } => {
                self.bold_line("Next Steps", 18.0, INK);
                self.gap(6.0);
                for (index, step) in steps.iter().enumerate() {
                    self.line(&format!("{}. {}", index + 1, step), 12.0, INK);
                }
                self.gap(14.0);
                self.bold_line("Ready to take action?", 16.0, BRAND);
                if let Some(cta) = call_to_action {
                    for wrapped in wrap_text(cta, WRAP_COLUMNS) {
                        self.line(&wrapped, 11.0, BRAND);
                    }
                }
                self.y = MARGIN + 10.0;
                for line in footer {
                    self.line(line, 9.0, MUTED);
                }
            }
        }
    }

    fn line(&mut self, text: &str, size: f32, color: (u8, u8, u8)) {
        self.text(text, MARGIN, size, color, false);
        self.advance(size);
    }

    fn bold_line(&mut self, text: &str, size: f32, color: (u8, u8, u8)) {
        self.text(text, MARGIN, size, color, true);
        self.advance(size);
    }

    fn text(&self, text: &str, x: f32, size: f32, color: (u8, u8, u8), bold: bool) {
        let font = if bold {
            &self.fonts.bold
        } else {
            &self.fonts.regular
        };
        self.fill(color);
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
    }

    /// Track plus proportional fill, drawn below the cursor.
    fn bar(&mut self, ratio: f32, color: (u8, u8, u8)) {
        let top = self.y;
        let bottom = top - BAR_HEIGHT;
        self.fill(TRACK);
        self.rect(MARGIN, bottom, MARGIN + BAR_WIDTH, top);
        let filled = BAR_WIDTH * ratio.clamp(0.0, 1.0);
        if filled > 0.0 {
            self.fill(color);
            self.rect(MARGIN, bottom, MARGIN + filled, top);
        }
        self.y = bottom - 2.0;
    }

    fn rect(&self, left: f32, bottom: f32, right: f32, top: f32) {
        self.layer
            .add_rect(Rect::new(Mm(left), Mm(bottom), Mm(right), Mm(top)));
    }

    fn fill(&self, (r, g, b): (u8, u8, u8)) {
        self.layer.set_fill_color(Color::Rgb(Rgb::new(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
            None,
        )));
    }

    /// Point size to millimetres of line height, with leading.
    fn advance(&mut self, size: f32) {
        self.y -= size * 0.3528 * 1.5;
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }
}
