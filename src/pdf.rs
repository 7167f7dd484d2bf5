//! PDF back-end for the register renderer, over `pdf-writer` primitives.
//!
//! Pages collect content-stream operations as the renderer draws; `finish`
//! assembles the document catalog, shared standard-14 fonts, and per-page
//! image resources. Coordinates arrive in millimetres with a top-left origin
//! and are flipped into PDF space here.

use crate::canvas::{approx_text_width, Canvas, Font, RectMm};
use anyhow::Result;
use image::RgbaImage;
use pdf_writer::{Content, Finish, Name, Pdf, Rect, Ref, Str};

const PT_PER_MM: f32 = 72.0 / 25.4;

// Fixed object numbers; dynamic objects (pages, contents, images) follow.
const CATALOG_NUM: i32 = 1;
const PAGE_TREE_NUM: i32 = 2;
const FONT_REGULAR_NUM: i32 = 3;
const FONT_BOLD_NUM: i32 = 4;
const FONT_SYMBOL_NUM: i32 = 5;
const FIRST_DYNAMIC_NUM: i32 = 6;

struct PageDraft {
    content: Content,
    images: Vec<(String, Ref)>,
}

impl PageDraft {
    fn new() -> Self {
        Self {
            content: Content::new(),
            images: Vec::new(),
        }
    }
}

pub struct PdfCanvas {
    pdf: Pdf,
    next_ref: i32,
    done: Vec<PageDraft>,
    current: PageDraft,
    page_w_mm: f32,
    page_h_mm: f32,
    font: Font,
    font_size: f32,
    image_count: usize,
}

impl PdfCanvas {
    pub fn new(page_w_mm: f32, page_h_mm: f32) -> Self {
        Self {
            pdf: Pdf::new(),
            next_ref: FIRST_DYNAMIC_NUM,
            done: Vec::new(),
            current: PageDraft::new(),
            page_w_mm,
            page_h_mm,
            font: Font::Regular,
            font_size: 10.0,
            image_count: 0,
        }
    }

    pub fn a4_landscape() -> Self {
        Self::new(297.0, 210.0)
    }

    pub fn a4_portrait() -> Self {
        Self::new(210.0, 297.0)
    }

    /// Assemble the final PDF byte stream.
    pub fn finish(mut self) -> Vec<u8> {
        self.done.push(self.current);

        let catalog_id = Ref::new(CATALOG_NUM);
        let page_tree_id = Ref::new(PAGE_TREE_NUM);
        let font_regular_id = Ref::new(FONT_REGULAR_NUM);
        let font_bold_id = Ref::new(FONT_BOLD_NUM);
        let font_symbol_id = Ref::new(FONT_SYMBOL_NUM);

        let page_w_pt = self.page_w_mm * PT_PER_MM;
        let page_h_pt = self.page_h_mm * PT_PER_MM;

        let mut assigned = Vec::new();
        let mut page_ids = Vec::new();
        for draft in self.done {
            let page_id = Ref::new(self.next_ref);
            let content_id = Ref::new(self.next_ref + 1);
            self.next_ref += 2;
            page_ids.push(page_id);
            assigned.push((page_id, content_id, draft));
        }

        self.pdf.catalog(catalog_id).pages(page_tree_id);
        self.pdf
            .pages(page_tree_id)
            .kids(page_ids.iter().copied())
            .count(page_ids.len() as i32);

        for (page_id, content_id, draft) in assigned {
            let mut page = self.pdf.page(page_id);
            page.media_box(Rect::new(0.0, 0.0, page_w_pt, page_h_pt));
            page.parent(page_tree_id);
            page.contents(content_id);
            {
                let mut resources = page.resources();
                {
                    let mut fonts = resources.fonts();
                    fonts.pair(Name(b"F1"), font_regular_id);
                    fonts.pair(Name(b"F2"), font_bold_id);
                    fonts.pair(Name(b"F3"), font_symbol_id);
                }
                if !draft.images.is_empty() {
                    let mut xobjects = resources.x_objects();
                    for (name, id) in &draft.images {
                        xobjects.pair(Name(name.as_bytes()), *id);
                    }
                }
            }
            page.finish();
            self.pdf.stream(content_id, &draft.content.finish());
        }

        self.pdf
            .type1_font(font_regular_id)
            .base_font(Name(b"Helvetica"))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
        self.pdf
            .type1_font(font_bold_id)
            .base_font(Name(b"Helvetica-Bold"))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
        self.pdf
            .type1_font(font_symbol_id)
            .base_font(Name(b"ZapfDingbats"));

        self.pdf.finish()
    }

    fn x_pt(&self, x_mm: f32) -> f32 {
        x_mm * PT_PER_MM
    }

    /// Flip a top-origin y coordinate into PDF's bottom-origin space.
    fn y_pt(&self, y_mm: f32) -> f32 {
        (self.page_h_mm - y_mm) * PT_PER_MM
    }

    fn font_name(&self) -> Name<'static> {
        match self.font {
            Font::Regular => Name(b"F1"),
            Font::Bold => Name(b"F2"),
            Font::Symbol => Name(b"F3"),
        }
    }
}

impl Canvas for PdfCanvas {
    fn page_size(&self) -> (f32, f32) {
        (self.page_w_mm, self.page_h_mm)
    }

    fn add_page(&mut self) {
        let finished = std::mem::replace(&mut self.current, PageDraft::new());
        self.done.push(finished);
    }

    fn set_font(&mut self, font: Font, size: f32) {
        self.font = font;
        self.font_size = size;
    }

    fn set_line_width(&mut self, width: f32) {
        self.current.content.set_line_width(width * PT_PER_MM);
    }

    fn text(&mut self, text: &str, x: f32, y: f32) {
        let encoded = encode_text(self.font, text);
        let font_name = self.font_name();
        let size = self.font_size;
        let x_pt = self.x_pt(x);
        let y_pt = self.y_pt(y);
        let content = &mut self.current.content;
        content.begin_text();
        content.set_font(font_name, size);
        content.next_line(x_pt, y_pt);
        content.show(Str(&encoded));
        content.end_text();
    }

    fn text_width(&self, text: &str) -> f32 {
        approx_text_width(text, self.font_size)
    }

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        let (ax, ay) = (self.x_pt(x1), self.y_pt(y1));
        let (bx, by) = (self.x_pt(x2), self.y_pt(y2));
        let content = &mut self.current.content;
        content.move_to(ax, ay);
        content.line_to(bx, by);
        content.stroke();
    }

    fn rect(&mut self, rect: RectMm) {
        let x = self.x_pt(rect.x);
        let y = self.y_pt(rect.y + rect.h);
        let content = &mut self.current.content;
        content.rect(x, y, rect.w * PT_PER_MM, rect.h * PT_PER_MM);
        content.stroke();
    }

    fn image(&mut self, image: &RgbaImage, rect: RectMm) -> Result<()> {
        let rgb = flatten_to_rgb(image);
        let id = Ref::new(self.next_ref);
        self.next_ref += 1;
        let name = format!("Im{}", self.image_count);
        self.image_count += 1;

        let mut xobject = self.pdf.image_xobject(id, &rgb);
        xobject.width(image.width() as i32);
        xobject.height(image.height() as i32);
        xobject.color_space().device_rgb();
        xobject.bits_per_component(8);
        xobject.finish();

        let x = self.x_pt(rect.x);
        let y = self.y_pt(rect.y + rect.h);
        let content = &mut self.current.content;
        content.save_state();
        content.transform([rect.w * PT_PER_MM, 0.0, 0.0, rect.h * PT_PER_MM, x, y]);
        content.x_object(Name(name.as_bytes()));
        content.restore_state();
        self.current.images.push((name, id));
        Ok(())
    }

    fn push_clip(&mut self, rect: RectMm) {
        let x = self.x_pt(rect.x);
        let y = self.y_pt(rect.y + rect.h);
        let content = &mut self.current.content;
        content.save_state();
        content.rect(x, y, rect.w * PT_PER_MM, rect.h * PT_PER_MM);
        content.clip_nonzero();
        content.end_path();
    }

    fn pop_clip(&mut self) {
        self.current.content.restore_state();
    }
}

/// Composite RGBA pixels over a white ground; the registers print on white
/// and flattening avoids carrying a soft mask into the PDF.
fn flatten_to_rgb(image: &RgbaImage) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(image.width() as usize * image.height() as usize * 3);
    for pixel in image.pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as u16;
        for channel in [r, g, b] {
            let blended = (channel as u16 * alpha + 255 * (255 - alpha)) / 255;
            rgb.push(blended as u8);
        }
    }
    rgb
}

fn encode_text(font: Font, text: &str) -> Vec<u8> {
    if matches!(font, Font::Symbol) {
        // ZapfDingbats: the check mark lives at code 0x33.
        return text
            .chars()
            .map(|ch| if ch == '\u{2713}' { 0x33 } else { b'?' })
            .collect();
    }
    text.chars().map(winansi_byte).collect()
}

fn winansi_byte(ch: char) -> u8 {
    let code = ch as u32;
    match code {
        0x20..=0x7e | 0xa0..=0xff => code as u8,
        0x20ac => 0x80,
        0x2018 => 0x91,
        0x2019 => 0x92,
        0x201c => 0x93,
        0x201d => 0x94,
        0x2013 => 0x96,
        0x2014 => 0x97,
        _ => b'?',
    }
}
