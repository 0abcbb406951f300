use crate::bus::ThemeMode;
use crate::overlay::view::EntryView;
use cosmic_text::{Attrs, Buffer, FontSystem, Metrics, Shaping, SwashCache};
use softbuffer::{Context as SoftbufferContext, Surface as SoftbufferSurface};
use std::num::NonZeroU32;
use std::rc::Rc;
use thiserror::Error;
use tiny_skia::{Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};
use winit::window::Window;

const PLACEHOLDER: &str = "Jot something down…";
const FONT_SIZE: f32 = 22.0;
const LINE_HEIGHT: f32 = 28.0;
const PADDING: f32 = 18.0;
const BORDER_WIDTH: f32 = 1.0;
const CARET_WIDTH: f32 = 2.0;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Could not allocate a {0}x{1} frame")]
    Allocation(u32, u32),
    #[error("Softbuffer error: {0}")]
    Surface(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    fn paint(&self) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.set_color_rgba8(self.0, self.1, self.2, 255);
        paint
    }

    fn text_color(&self) -> cosmic_text::Color {
        cosmic_text::Color::rgb(self.0, self.1, self.2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Rgb,
    pub border: Rgb,
    pub text: Rgb,
    pub placeholder: Rgb,
    pub caret: Rgb,
}

impl Palette {
    pub fn for_theme(mode: ThemeMode) -> Self {
        match mode {
            ThemeMode::Light => Self {
                background: Rgb(250, 250, 250),
                border: Rgb(210, 210, 215),
                text: Rgb(28, 28, 30),
                placeholder: Rgb(150, 150, 155),
                caret: Rgb(0, 122, 255),
            },
            ThemeMode::Dark => Self {
                background: Rgb(32, 32, 36),
                border: Rgb(70, 70, 78),
                text: Rgb(236, 236, 240),
                placeholder: Rgb(120, 120, 128),
                caret: Rgb(10, 132, 255),
            },
        }
    }
}

/// Rasterises the entry field into a pixmap.
pub struct EntryRenderer {
    font_system: FontSystem,
    swash_cache: SwashCache,
}

impl EntryRenderer {
    pub fn new() -> Self {
        Self {
            font_system: FontSystem::new(),
            swash_cache: SwashCache::new(),
        }
    }

    /// `width` and `height` are physical pixels.
    pub fn render(
        &mut self,
        view: &EntryView,
        width: u32,
        height: u32,
        scale: f32,
    ) -> Result<Pixmap, RenderError> {
        let mut pixmap = Pixmap::new(width, height).ok_or(RenderError::Allocation(width, height))?;
        let palette = Palette::for_theme(view.theme());

        let full = Rect::from_xywh(0.0, 0.0, width as f32, height as f32)
            .ok_or(RenderError::Allocation(width, height))?;
        pixmap.fill_rect(full, &palette.background.paint(), Transform::identity(), None);

        let inset = BORDER_WIDTH * scale / 2.0;
        if let Some(border) = Rect::from_ltrb(
            inset,
            inset,
            width as f32 - inset,
            height as f32 - inset,
        ) {
            let path = PathBuilder::from_rect(border);
            let stroke = Stroke {
                width: BORDER_WIDTH * scale,
                ..Stroke::default()
            };
            pixmap.stroke_path(
                &path,
                &palette.border.paint(),
                &stroke,
                Transform::identity(),
                None,
            );
        }

        let (content, color) = if view.text().is_empty() {
            (PLACEHOLDER, palette.placeholder)
        } else {
            (view.text(), palette.text)
        };

        let padding = PADDING * scale;
        let line_height = LINE_HEIGHT * scale;
        let top = ((height as f32 - line_height) / 2.0).max(0.0);
        let text_width = (width as f32 - padding * 2.0).max(0.0);

        let mut buffer = Buffer::new(
            &mut self.font_system,
            Metrics::new(FONT_SIZE * scale, line_height),
        );
        buffer.set_size(&mut self.font_system, Some(text_width), Some(line_height));
        buffer.set_text(&mut self.font_system, content, Attrs::new(), Shaping::Advanced);
        buffer.shape_until_scroll(&mut self.font_system, false);

        let origin_x = padding as i32;
        let origin_y = top as i32;
        buffer.draw(
            &mut self.font_system,
            &mut self.swash_cache,
            color.text_color(),
            |x, y, w, h, glyph| {
                let Some(rect) = Rect::from_xywh(
                    (origin_x + x) as f32,
                    (origin_y + y) as f32,
                    w as f32,
                    h as f32,
                ) else {
                    return;
                };
                let mut paint = Paint::default();
                paint.set_color_rgba8(glyph.r(), glyph.g(), glyph.b(), glyph.a());
                pixmap.fill_rect(rect, &paint, Transform::identity(), None);
            },
        );

        let caret_x = if view.text().is_empty() {
            0.0
        } else {
            buffer
                .layout_runs()
                .map(|run| run.line_w)
                .fold(0.0f32, f32::max)
        };
        if let Some(caret) = Rect::from_xywh(
            padding + caret_x,
            top + scale * 3.0,
            CARET_WIDTH * scale,
            line_height - scale * 6.0,
        ) {
            pixmap.fill_rect(caret, &palette.caret.paint(), Transform::identity(), None);
        }

        Ok(pixmap)
    }
}

impl Default for EntryRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Puts rendered frames on screen through softbuffer.
pub struct SoftbufferPresenter {
    window: Rc<Window>,
    _context: SoftbufferContext<Rc<Window>>,
    surface: SoftbufferSurface<Rc<Window>, Rc<Window>>,
    renderer: EntryRenderer,
}

impl SoftbufferPresenter {
    pub fn new(window: Rc<Window>) -> Result<Self, RenderError> {
        let context = SoftbufferContext::new(window.clone())
            .map_err(|e| RenderError::Surface(format!("Failed to create context: {e}")))?;
        let surface = SoftbufferSurface::new(&context, window.clone())
            .map_err(|e| RenderError::Surface(format!("Failed to create surface: {e}")))?;

        Ok(Self {
            window,
            _context: context,
            surface,
            renderer: EntryRenderer::new(),
        })
    }

    pub fn present(&mut self, view: &EntryView) -> Result<(), RenderError> {
        let size = self.window.inner_size();
        let (Some(width), Some(height)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
        else {
            return Ok(());
        };

        let pixmap = self.renderer.render(
            view,
            size.width,
            size.height,
            self.window.scale_factor() as f32,
        )?;

        self.surface
            .resize(width, height)
            .map_err(|e| RenderError::Surface(format!("Failed to resize surface: {e}")))?;

        let mut buffer = self
            .surface
            .buffer_mut()
            .map_err(|e| RenderError::Surface(format!("Failed to lock buffer: {e}")))?;

        // The frame is opaque, so premultiplied RGBA is plain RGB.
        for (slot, pixel) in buffer.iter_mut().zip(pixmap.pixels()) {
            *slot = (pixel.red() as u32) << 16 | (pixel.green() as u32) << 8 | pixel.blue() as u32;
        }

        buffer
            .present()
            .map_err(|e| RenderError::Surface(format!("Failed to present frame: {e}")))
    }
}
