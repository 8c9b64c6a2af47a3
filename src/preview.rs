use resvg::{tiny_skia, usvg};
use std::{fmt::Write, sync::Arc};
use thiserror::Error;

use crate::{
    config::AppConfig,
    models::{AcademicLevel, Course, Department, Faculty},
};

pub const WIDTH: u32 = 1200;
pub const HEIGHT: u32 = 630;
const PADDING: u32 = 80;

// Rough glyph budgets per line at the title (64px) and description (28px) sizes.
const TITLE_CHARS_PER_LINE: usize = 30;
const DESCRIPTION_CHARS_PER_LINE: usize = 64;

/// PreviewError
///
/// Failures while turning a card into a PNG.
#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("card markup rejected: {0}")]
    Markup(#[from] usvg::Error),

    #[error("could not allocate the preview canvas")]
    Canvas,

    #[error("png encoding failed: {0}")]
    Encode(String),
}

/// PreviewAssets
///
/// Static inputs shared by every preview image, loaded once at startup.
#[derive(Debug, Clone)]
pub struct PreviewAssets {
    pub site_name: String,
    /// Raw SVG markup of the logo; None if the asset could not be read.
    pub logo_svg: Option<String>,
    /// Fonts available to the rasterizer.
    pub fonts: Arc<usvg::fontdb::Database>,
}

impl Default for PreviewAssets {
    fn default() -> Self {
        Self {
            site_name: "My Campus Library".to_string(),
            logo_svg: None,
            fonts: Arc::new(usvg::fontdb::Database::new()),
        }
    }
}

impl PreviewAssets {
    /// Reads the logo from `config.logo_path` and indexes the system fonts. A
    /// missing logo is not fatal; the header is rendered without it.
    pub async fn load(config: &AppConfig) -> Self {
        let logo_svg = match tokio::fs::read_to_string(&config.logo_path).await {
            Ok(svg) => Some(svg),
            Err(e) => {
                tracing::warn!("logo asset {} unavailable: {}", config.logo_path, e);
                None
            }
        };

        let mut fonts = usvg::fontdb::Database::new();
        fonts.load_system_fonts();
        if fonts.is_empty() {
            tracing::warn!("no system fonts found; preview text will not be drawn");
        } else {
            tracing::info!("preview renderer loaded {} font faces", fonts.len());
        }

        Self {
            site_name: config.site_name.clone(),
            logo_svg,
            fonts: Arc::new(fonts),
        }
    }
}

/// PreviewCard
///
/// The text content of one Open Graph image, computed from catalog rows with
/// fallbacks for anything missing.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewCard {
    pub breadcrumb: Vec<String>,
    pub badge: String,
    pub badge_detail: Option<String>,
    pub title: String,
    pub description: String,
    pub footer_icon: &'static str,
    pub footer: String,
}

/// Keeps the first `max` characters and appends `...` when the text is longer.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

fn level_label(level: Option<&AcademicLevel>) -> String {
    level
        .map(|l| l.level_number.to_string())
        .unwrap_or_else(|| "Level".to_string())
}

fn department_name(department: Option<&Department>) -> String {
    department
        .map(|d| d.full_name.clone())
        .unwrap_or_else(|| "Department".to_string())
}

fn faculty_name(faculty: Option<&Faculty>) -> String {
    faculty
        .map(|f| f.full_name.clone())
        .unwrap_or_else(|| "Faculty".to_string())
}

fn described(description: Option<&String>, fallback: &str) -> String {
    description
        .filter(|d| !d.trim().is_empty())
        .cloned()
        .unwrap_or_else(|| fallback.to_string())
}

impl PreviewCard {
    pub fn faculty(faculty: Option<&Faculty>) -> Self {
        let description = described(
            faculty.and_then(|f| f.description.as_ref()),
            "Explore departments and courses",
        );
        Self {
            breadcrumb: vec![],
            badge: "Faculty".to_string(),
            badge_detail: faculty
                .map(|f| f.short_name.clone())
                .filter(|s| !s.is_empty()),
            title: faculty_name(faculty),
            description: truncate(&description, 140),
            footer_icon: "🏛️",
            footer: "Explore departments and courses".to_string(),
        }
    }

    pub fn department(faculty: Option<&Faculty>, department: Option<&Department>) -> Self {
        let description = described(
            department.and_then(|d| d.description.as_ref()),
            "Explore academic levels",
        );
        Self {
            breadcrumb: vec![faculty_name(faculty), "Department".to_string()],
            badge: "Department".to_string(),
            badge_detail: department
                .map(|d| d.short_name.clone())
                .filter(|s| !s.is_empty()),
            title: department_name(department),
            description: truncate(&description, 140),
            footer_icon: "🎓",
            footer: "Browse academic levels".to_string(),
        }
    }

    pub fn level(
        faculty: Option<&Faculty>,
        department: Option<&Department>,
        level: Option<&AcademicLevel>,
        course_count: i64,
    ) -> Self {
        let level_number = level_label(level);
        let department_name = department_name(department);
        let noun = if course_count == 1 { "course" } else { "courses" };
        Self {
            breadcrumb: vec![
                faculty_name(faculty),
                department_name.clone(),
                "Level".to_string(),
            ],
            badge: format!("Level {}", level_number),
            badge_detail: Some(format!("{} {}", course_count, noun)),
            title: format!("{} Level Courses", level_number),
            description: format!(
                "Explore all courses and resources for {} Level in {}",
                level_number, department_name
            ),
            footer_icon: "📚",
            footer: "Browse course materials and resources".to_string(),
        }
    }

    pub fn course(
        department: Option<&Department>,
        level: Option<&AcademicLevel>,
        course: Option<&Course>,
    ) -> Self {
        let level_number = level_label(level);
        let description = described(
            course.and_then(|c| c.description.as_ref()),
            "Explore course resources",
        );
        let title = course
            .map(|c| c.course_title.clone())
            .unwrap_or_else(|| "Course".to_string());
        Self {
            breadcrumb: vec![
                department_name(department),
                format!("{} Level", level_number),
                "Course".to_string(),
            ],
            badge: course
                .map(|c| c.course_code.clone())
                .unwrap_or_else(|| "COURSE".to_string()),
            badge_detail: Some(format!("{} Level", level_number)),
            title: truncate(&title, 60),
            description: truncate(&description, 150),
            footer_icon: "📦",
            footer: "View course materials and resources".to_string(),
        }
    }

    /// Renders the card as a 1200x630 SVG document.
    pub fn render_svg(&self, assets: &PreviewAssets) -> String {
        let mut svg = String::with_capacity(4096);
        let _ = write!(
            svg,
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="system-ui, -apple-system, sans-serif"><rect width="100%" height="100%" fill="#ffffff"/>"##,
            w = WIDTH,
            h = HEIGHT
        );

        // Header: logo + site name.
        let mut brand_x = PADDING;
        if let Some(logo) = &assets.logo_svg {
            let _ = write!(
                svg,
                r#"<image x="{x}" y="{y}" width="48" height="48" href="data:image/svg+xml,{data}"/>"#,
                x = PADDING,
                y = PADDING,
                data = urlencoding::encode(logo)
            );
            brand_x += 64;
        }
        let _ = write!(
            svg,
            r##"<text x="{x}" y="{y}" font-size="24" font-weight="600" fill="#64748b">{name}</text>"##,
            x = brand_x,
            y = PADDING + 33,
            name = escape_xml(&assets.site_name)
        );

        // Breadcrumb, last segment emphasized.
        let mut y = 220;
        if !self.breadcrumb.is_empty() {
            let _ = write!(
                svg,
                r##"<text x="{x}" y="{y}" font-size="18" fill="#94a3b8">"##,
                x = PADDING
            );
            let last = self.breadcrumb.len() - 1;
            for (i, segment) in self.breadcrumb.iter().enumerate() {
                if i == last {
                    let _ = write!(
                        svg,
                        r##"<tspan fill="#64748b" font-weight="500">{}</tspan>"##,
                        escape_xml(segment)
                    );
                } else {
                    let _ = write!(svg, "<tspan>{}</tspan><tspan> / </tspan>", escape_xml(segment));
                }
            }
            svg.push_str("</text>");
            y += 40;
        }

        // Badge + detail.
        let badge_width = 32 + 10 * self.badge.chars().count() as u32;
        let _ = write!(
            svg,
            r##"<rect x="{x}" y="{ry}" rx="6" width="{bw}" height="38" fill="#e6f2ff"/><text x="{tx}" y="{ty}" font-size="18" font-weight="500" fill="#0256a5">{badge}</text>"##,
            x = PADDING,
            ry = y - 26,
            bw = badge_width,
            tx = PADDING + 16,
            ty = y,
            badge = escape_xml(&self.badge)
        );
        if let Some(detail) = &self.badge_detail {
            let _ = write!(
                svg,
                r##"<text x="{x}" y="{y}" font-size="18" font-weight="500" fill="#94a3b8">{d}</text>"##,
                x = PADDING + badge_width + 16,
                y = y,
                d = escape_xml(detail)
            );
        }

        // Title and description, word-wrapped.
        y += 80;
        for line in wrap_lines(&self.title, TITLE_CHARS_PER_LINE, 2) {
            let _ = write!(
                svg,
                r##"<text x="{x}" y="{y}" font-size="64" font-weight="700" fill="#0f172a" letter-spacing="-1.28">{t}</text>"##,
                x = PADDING,
                y = y,
                t = escape_xml(&line)
            );
            y += 70;
        }
        y += 10;
        for line in wrap_lines(&self.description, DESCRIPTION_CHARS_PER_LINE, 3) {
            let _ = write!(
                svg,
                r##"<text x="{x}" y="{y}" font-size="28" fill="#475569">{t}</text>"##,
                x = PADDING,
                y = y,
                t = escape_xml(&line)
            );
            y += 45;
        }

        // Footer.
        let footer_rule = HEIGHT - PADDING - 20;
        let _ = write!(
            svg,
            r##"<line x1="{x1}" y1="{fy}" x2="{x2}" y2="{fy}" stroke="#e2e8f0" stroke-width="1"/><text x="{x1}" y="{ty}" font-size="20" fill="#94a3b8">{icon} {footer}</text></svg>"##,
            x1 = PADDING,
            x2 = WIDTH - PADDING,
            fy = footer_rule,
            ty = footer_rule + 45,
            icon = self.footer_icon,
            footer = escape_xml(&self.footer)
        );

        svg
    }

    /// Rasterizes the card to a 1200x630 PNG. CPU bound; callers on the runtime
    /// should move it to a blocking thread.
    pub fn render_png(&self, assets: &PreviewAssets) -> Result<Vec<u8>, PreviewError> {
        let svg = self.render_svg(assets);

        let options = usvg::Options {
            fontdb: assets.fonts.clone(),
            ..usvg::Options::default()
        };
        let tree = usvg::Tree::from_str(&svg, &options)?;

        let mut pixmap = tiny_skia::Pixmap::new(WIDTH, HEIGHT).ok_or(PreviewError::Canvas)?;
        resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

        pixmap
            .encode_png()
            .map_err(|e| PreviewError::Encode(e.to_string()))
    }
}

/// Greedy word wrap. Overflow past `max_lines` is folded into an ellipsis on the
/// last line; single words longer than a line are hard-split.
pub fn wrap_lines(text: &str, max_chars: usize, max_lines: usize) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word.to_string();
        while word.chars().count() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let head: String = word.chars().take(max_chars).collect();
            word = word.chars().skip(max_chars).collect();
            lines.push(head);
        }
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }

    if lines.len() > max_lines {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            last.push('…');
        }
    }
    lines
}

pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
