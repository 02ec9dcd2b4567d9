use std::fs::{self, File};
use std::path::{Path, PathBuf};
use image::{Rgb, RgbImage};
use rusttype::{Font, Scale, point};
use tracing::debug;

use crate::comment::CommentRecord;
use crate::error::{Result, SorteioError};

pub const FONT_PATH_ENV: &str = "SORTEIAGRAM_FONT_PATH";

// Preferred families, best first. Matched against the file stem.
const PREFERRED_FONTS: &[&str] = &["DejaVuSans", "NotoSans-Regular", "LiberationSans-Regular", "Arial", "Helvetica", "SegoeUI"];

const CARD_W: u32 = 640;
const CARD_H: u32 = 360;
const PADDING: u32 = 24;
const HEADER_H: u32 = 64;
const TITLE_PX: f32 = 28.0;
const BODY_PX: f32 = 20.0;

const BACKGROUND: Rgb<u8> = Rgb([245, 245, 245]);
const HEADER: Rgb<u8> = Rgb([34, 197, 94]);
const ON_HEADER: Rgb<u8> = Rgb([255, 255, 255]);
const INK: Rgb<u8> = Rgb([20, 20, 20]);
const MUTED: Rgb<u8> = Rgb([107, 114, 128]);

fn font_dirs() -> Vec<PathBuf> {
    let home = dirs_next::home_dir();
    if cfg!(target_os = "macos") {
        let mut dirs = vec![PathBuf::from("/System/Library/Fonts"), PathBuf::from("/Library/Fonts")];
        dirs.extend(home.map(|h| h.join("Library/Fonts")));
        dirs
    } else if cfg!(target_os = "windows") {
        let windir = std::env::var_os("WINDIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("C:/Windows"));
        vec![windir.join("Fonts")]
    } else {
        let mut dirs = vec![PathBuf::from("/usr/share/fonts"), PathBuf::from("/usr/local/share/fonts")];
        if let Some(h) = home {
            dirs.push(h.join(".fonts"));
            dirs.push(h.join(".local/share/fonts"));
        }
        dirs
    }
}

fn is_font_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("ttf") || e.eq_ignore_ascii_case("otf"))
        .unwrap_or(false)
}

/// Counts the printable Latin-1 characters a font has glyphs for.
fn latin1_coverage(font: &Font<'_>) -> usize {
    (32u8..=255u8)
        .map(char::from)
        .filter(|c| !c.is_control() && font.glyph(*c).id().0 != 0)
        .count()
}

/// Font bytes for the card: the env override, a preferred family, or the
/// installed font with the widest Latin-1 coverage.
pub(crate) fn load_card_font() -> Option<Vec<u8>> {
    if let Some(path) = std::env::var_os(FONT_PATH_ENV) {
        match fs::read(&path) {
            Ok(bytes) => return Some(bytes),
            Err(e) => debug!(path = %Path::new(&path).display(), error = %e, "font override unreadable"),
        }
    }

    let files: Vec<PathBuf> = font_dirs()
        .into_iter()
        .filter(|d| d.is_dir())
        .flat_map(|d| walkdir::WalkDir::new(d).follow_links(true).into_iter().filter_map(|e| e.ok()))
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && is_font_file(p))
        .collect();

    let preferred = PREFERRED_FONTS.iter().find_map(|name| {
        files.iter().find(|p| p.file_stem().and_then(|s| s.to_str()).is_some_and(|s| s.eq_ignore_ascii_case(name)))
    });
    if let Some(bytes) = preferred.and_then(|p| fs::read(p).ok()) {
        return Some(bytes);
    }

    files
        .iter()
        .filter_map(|p| fs::read(p).ok())
        .filter_map(|bytes| Font::try_from_vec(bytes.clone()).map(|f| (latin1_coverage(&f), bytes)))
        .max_by_key(|(score, _)| *score)
        .map(|(_, bytes)| bytes)
}

/// Greedy word wrap. `width` measures a candidate line; a single word wider
/// than `max_w` still gets its own line.
fn wrap_words(text: &str, max_w: f32, width: impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if line.is_empty() {
            line.push_str(word);
            continue;
        }
        let candidate = format!("{line} {word}");
        if width(&candidate) > max_w {
            lines.push(std::mem::replace(&mut line, word.to_string()));
        } else {
            line = candidate;
        }
    }
    if !line.is_empty() { lines.push(line); }
    lines
}

/// Draws text onto the card with one font at any size.
struct CardPainter {
    font: Font<'static>,
}

impl CardPainter {
    fn new(font_data: Vec<u8>) -> Result<Self> {
        let font = Font::try_from_vec(font_data).ok_or_else(|| SorteioError::Render("invalid font data".into()))?;
        Ok(Self { font })
    }

    fn line_height(&self, px: f32) -> f32 {
        let v = self.font.v_metrics(Scale::uniform(px));
        (v.ascent - v.descent + v.line_gap).ceil()
    }

    fn measure(&self, text: &str, px: f32) -> f32 {
        self.font
            .layout(text, Scale::uniform(px), point(0.0, 0.0))
            .last()
            .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
            .unwrap_or(0.0)
    }

    /// Paints as many wrapped lines as fit in `max_h` and returns the height used.
    fn paragraph(&self, img: &mut RgbImage, text: &str, px: f32, (left, top): (u32, u32), (max_w, max_h): (u32, u32), color: Rgb<u8>) -> u32 {
        let line_h = self.line_height(px);
        let ascent = self.font.v_metrics(Scale::uniform(px)).ascent;
        let fits = (max_h as f32 / line_h).floor() as usize;
        let lines = wrap_words(text, max_w as f32, |s| self.measure(s, px));

        let mut used = 0.0f32;
        for line in lines.iter().take(fits) {
            self.blend_line(img, line, px, left as f32, top as f32 + used + ascent, color);
            used += line_h;
        }
        used as u32
    }

    fn blend_line(&self, img: &mut RgbImage, text: &str, px: f32, x: f32, baseline: f32, color: Rgb<u8>) {
        let (w, h) = img.dimensions();
        for glyph in self.font.layout(text, Scale::uniform(px), point(x, baseline)) {
            let Some(bb) = glyph.pixel_bounding_box() else { continue };
            glyph.draw(|gx, gy, coverage| {
                let (px_x, px_y) = (bb.min.x + gx as i32, bb.min.y + gy as i32);
                if coverage < 0.05 || px_x < 0 || px_y < 0 || px_x as u32 >= w || px_y as u32 >= h { return; }
                let dst = img.get_pixel_mut(px_x as u32, px_y as u32);
                for (d, c) in dst.0.iter_mut().zip(color.0) {
                    *d = (*d as f32 + (c as f32 - *d as f32) * coverage) as u8;
                }
            });
        }
    }
}

fn paint_card(painter: &CardPainter, winner: &CommentRecord, total: usize) -> RgbImage {
    let inner_w = CARD_W - PADDING * 2;
    let mut img = RgbImage::from_fn(CARD_W, CARD_H, |_, y| if y < HEADER_H { HEADER } else { BACKGROUND });

    let title_top = HEADER_H.saturating_sub(painter.line_height(TITLE_PX) as u32) / 2;
    painter.paragraph(&mut img, "Resultado do Sorteio", TITLE_PX, (PADDING, title_top), (inner_w, HEADER_H), ON_HEADER);

    let mut y = HEADER_H + PADDING;
    y += painter.paragraph(&mut img, &format!("@{}", winner.username()), TITLE_PX, (PADDING, y), (inner_w, CARD_H - y), INK) + 8;

    let footer_h = painter.line_height(BODY_PX) as u32 + PADDING;
    let footer_top = CARD_H - footer_h;
    painter.paragraph(&mut img, winner.text(), BODY_PX, (PADDING, y), (inner_w, footer_top.saturating_sub(y)), INK);
    painter.paragraph(&mut img, &format!("Sorteado entre {total} comentários"), BODY_PX, (PADDING, footer_top), (inner_w, footer_h), MUTED);
    img
}

/// Renders the result card: header, winner handle, comment and entry count.
pub fn render_winner_card(winner: &CommentRecord, total: usize, path: impl AsRef<Path>) -> Result<()> {
    let font_data = load_card_font().ok_or_else(|| SorteioError::Render(format!("no font found, set {FONT_PATH_ENV}")))?;
    let painter = CardPainter::new(font_data)?;
    let path = path.as_ref();
    let mut file = File::create(path)?;
    paint_card(&painter, winner, total).write_to(&mut file, image::ImageFormat::Png)?;
    debug!(path = %path.display(), "winner card written");
    Ok(())
}
